//! Notification trigger point for collaborators

use std::sync::Arc;

use tracing::error;

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::event::EventKind;
use crate::matcher::EventMatcher;

/// Match then dispatch. Call after the triggering write succeeded.
pub struct Notifier {
    matcher: EventMatcher,
    dispatcher: Arc<Dispatcher>,
}

impl Notifier {
    pub fn new(matcher: EventMatcher, dispatcher: Arc<Dispatcher>) -> Self {
        Self { matcher, dispatcher }
    }

    /// Returns the number of deliveries scheduled. Never waits for them.
    pub async fn notify(&self, event: EventKind, country: &str) -> Result<usize> {
        let matched = match self.matcher.matches(event, country).await {
            Ok(matched) => matched,
            Err(e) => {
                error!(event = %event, country = %country, error = %e, "Failed to match subscriptions");
                return Err(e);
            }
        };
        Ok(self.dispatcher.dispatch(matched, event, country))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}
