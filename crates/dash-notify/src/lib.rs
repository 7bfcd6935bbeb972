//! Webhook Notifications
//!
//! Subscription matching and delivery for dashboard events:
//! - [`SubscriptionService`]: validate, allocate an id, persist
//! - [`EventMatcher`]: select subscriptions for an event and country
//! - [`Dispatcher`]: fire-and-forget, bounded delivery of payloads
//! - [`Notifier`]: the trigger point handlers call after their own write

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod id;
pub mod matcher;
pub mod notifier;
pub mod service;
pub mod store;
pub mod subscription;
pub mod validator;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{NotifyError, Result, ValidationError};
pub use event::EventKind;
pub use id::{generate_id, IdAllocator, IdLookup};
pub use matcher::EventMatcher;
pub use notifier::Notifier;
pub use service::SubscriptionService;
pub use store::{InMemorySubscriptionStore, MongoSubscriptionStore, SubscriptionStore};
pub use subscription::{DeliveryPayload, Subscription, TIMESTAMP_FORMAT, WILDCARD_COUNTRY};
pub use validator::{
    CountryLookup, HttpUrlProbe, RestCountriesLookup, SubscriptionRequest, SubscriptionValidator,
    UrlProbe, ValidSubscription,
};
