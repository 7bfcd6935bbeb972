//! Event Matcher

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::event::EventKind;
use crate::store::SubscriptionStore;
use crate::subscription::{Subscription, WILDCARD_COUNTRY};

/// Selects subscriptions with an equal event whose country is equal to the
/// trigger country or the wildcard. Comparison is case-sensitive.
pub struct EventMatcher {
    store: Arc<dyn SubscriptionStore>,
}

impl EventMatcher {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub async fn matches(&self, event: EventKind, country: &str) -> Result<Vec<Subscription>> {
        let countries = if country == WILDCARD_COUNTRY {
            vec![WILDCARD_COUNTRY]
        } else {
            vec![country, WILDCARD_COUNTRY]
        };

        let matched = self.store.find_by_event_and_country_in(event, &countries).await?;
        debug!(event = %event, country = %country, matched = matched.len(), "Matched subscriptions");
        Ok(matched)
    }
}
