//! Subscription registration and management

use std::sync::Arc;

use tracing::info;

use crate::error::{NotifyError, Result};
use crate::id::IdAllocator;
use crate::store::SubscriptionStore;
use crate::subscription::Subscription;
use crate::validator::{SubscriptionRequest, SubscriptionValidator};

pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    validator: SubscriptionValidator,
    ids: IdAllocator,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        validator: SubscriptionValidator,
        ids: IdAllocator,
    ) -> Self {
        Self { store, validator, ids }
    }

    /// Validate, allocate an id, persist. Nothing is written when validation fails.
    pub async fn register(&self, request: &SubscriptionRequest) -> Result<Subscription> {
        let valid = self.validator.validate(request).await?;
        let id = self.ids.allocate(self.store.as_ref()).await?;

        let subscription = Subscription::new(id, valid.url, valid.event, valid.country);
        self.store.insert(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            url = %subscription.url,
            event = %subscription.event,
            country = %subscription.country,
            "Webhook registered"
        );
        Ok(subscription)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.store.delete_by_id(id).await? {
            return Err(NotifyError::not_found(id));
        }
        info!(subscription_id = %id, "Webhook deleted");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Subscription> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| NotifyError::not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Subscription>> {
        self.store.find_all().await
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count().await
    }

    pub fn store(&self) -> &Arc<dyn SubscriptionStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Dispatcher, DispatcherConfig};
    use crate::event::EventKind;
    use crate::matcher::EventMatcher;
    use crate::notifier::Notifier;
    use crate::store::InMemorySubscriptionStore;
    use crate::validator::{CountryLookup, UrlProbe};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UrlProbe for CountingProbe {
        async fn probe(&self, _url: &str) -> anyhow::Result<u16> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(404)
        }
    }

    struct Nordics;

    #[async_trait]
    impl CountryLookup for Nordics {
        async fn resolve(&self, code: &str) -> anyhow::Result<bool> {
            Ok(matches!(code, "NO" | "SE" | "DK" | "FI" | "IS"))
        }
    }

    fn service(store: Arc<InMemorySubscriptionStore>) -> (SubscriptionService, Arc<CountingProbe>) {
        let probe = Arc::new(CountingProbe { calls: AtomicUsize::new(0) });
        let validator = SubscriptionValidator::new(probe.clone(), Arc::new(Nordics));
        (SubscriptionService::new(store, validator, IdAllocator::default()), probe)
    }

    #[tokio::test]
    async fn test_register_round_trip() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let (service, _) = service(store.clone());

        let created = service
            .register(&SubscriptionRequest::new("http://localhost:8080/hook", "CHANGE", "no"))
            .await
            .unwrap();
        assert_eq!(created.id.len(), 5);
        assert_eq!(created.country, "NO");

        let fetched = service.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(service.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_rejected_registration_persists_nothing() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let (service, probe) = service(store.clone());

        let err = service
            .register(&SubscriptionRequest::new("http://localhost:80/hook", "CHANGE", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Validation(_)));

        let err = service
            .register(&SubscriptionRequest::new("https://example.com/hook", "CHANGE", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Validation(ref v) if v.kind() == "UNREACHABLE_URL"));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let (service, _) = service(store);

        let created = service
            .register(&SubscriptionRequest::new("http://localhost:8080/hook", "DELETE", ""))
            .await
            .unwrap();
        service.delete(&created.id).await.unwrap();

        assert!(matches!(service.delete(&created.id).await, Err(NotifyError::NotFound { .. })));
        assert!(matches!(service.get(&created.id).await, Err(NotifyError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_register_then_match_scenario() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let (service, probe) = service(store.clone());

        let created = service
            .register(&SubscriptionRequest::new("http://localhost:8080/hook", "REGISTER", ""))
            .await
            .unwrap();
        assert_eq!(created.id.len(), 5);
        assert!(created.id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);

        let matcher = EventMatcher::new(store.clone());
        let matched = matcher.matches(EventKind::Register, "SE").await.unwrap();
        assert_eq!(matched, vec![created]);
        assert!(matcher.matches(EventKind::Delete, "SE").await.unwrap().is_empty());

        // Nothing listens on the port; the failed delivery is logged and dropped
        let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig::default()).unwrap());
        let notifier = Notifier::new(matcher, dispatcher.clone());
        assert_eq!(notifier.notify(EventKind::Delete, "SE").await.unwrap(), 0);
        assert_eq!(notifier.notify(EventKind::Register, "SE").await.unwrap(), 1);
        assert!(dispatcher.wait_idle(std::time::Duration::from_secs(15)).await);
    }
}
