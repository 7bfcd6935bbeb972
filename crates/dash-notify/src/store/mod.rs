//! Subscription persistence

mod memory;
mod mongo;

pub use memory::InMemorySubscriptionStore;
pub use mongo::MongoSubscriptionStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::event::EventKind;
use crate::id::IdLookup;
use crate::subscription::Subscription;

/// Keyed collection of subscriptions.
///
/// Errors are propagated as `NotifyError::Storage` and never retried here.
#[async_trait]
pub trait SubscriptionStore: IdLookup {
    async fn insert(&self, subscription: &Subscription) -> Result<()>;

    /// Returns whether a subscription was removed
    async fn delete_by_id(&self, id: &str) -> Result<bool>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>>;

    /// Every subscription with `event` equal and `country` in `countries`
    async fn find_by_event_and_country_in(
        &self,
        event: EventKind,
        countries: &[&str],
    ) -> Result<Vec<Subscription>>;

    async fn find_all(&self) -> Result<Vec<Subscription>>;

    async fn count(&self) -> Result<u64>;
}
