//! In-memory subscription store, insertion ordered

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;

use super::SubscriptionStore;
use crate::error::{NotifyError, Result};
use crate::event::EventKind;
use crate::id::IdLookup;
use crate::subscription::Subscription;

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: RwLock<IndexMap<String, Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }
}

#[async_trait]
impl IdLookup for InMemorySubscriptionStore {
    async fn exists_by_id(&self, id: &str) -> Result<bool> {
        Ok(self.subscriptions.read().contains_key(id))
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> Result<()> {
        let mut subscriptions = self.subscriptions.write();
        if subscriptions.contains_key(&subscription.id) {
            return Err(NotifyError::storage(format!(
                "duplicate key: {}",
                subscription.id
            )));
        }
        subscriptions.insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        Ok(self.subscriptions.write().shift_remove(id).is_some())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.read().get(id).cloned())
    }

    async fn find_by_event_and_country_in(
        &self,
        event: EventKind,
        countries: &[&str],
    ) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .read()
            .values()
            .filter(|s| s.event == event && countries.contains(&s.country.as_str()))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Subscription>> {
        Ok(self.subscriptions.read().values().cloned().collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.subscriptions.read().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(id: &str, event: EventKind, country: &str) -> Subscription {
        Subscription::new(id, format!("http://localhost:8080/{id}"), event, country)
    }

    #[tokio::test]
    async fn test_insert_then_find_by_id() {
        let store = InMemorySubscriptionStore::new();
        let original = Subscription::new("Ab3dE", "https://example.com/hook", EventKind::Invoke, "NO");
        store.insert(&original).await.unwrap();

        let found = store.find_by_id("Ab3dE").await.unwrap().unwrap();
        assert_eq!(found.url, original.url);
        assert_eq!(found.event, original.event);
        assert_eq!(found.country, original.country);
        assert!(store.exists_by_id("Ab3dE").await.unwrap());
        assert!(store.find_by_id("zzzzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_storage_error() {
        let store = InMemorySubscriptionStore::new();
        store.insert(&sub("a", EventKind::Change, "")).await.unwrap();
        let err = store.insert(&sub("a", EventKind::Delete, "")).await.unwrap_err();
        assert!(matches!(err, NotifyError::Storage(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let store = InMemorySubscriptionStore::new();
        store.insert(&sub("a", EventKind::Change, "")).await.unwrap();

        assert!(store.delete_by_id("a").await.unwrap());
        assert!(!store.delete_by_id("a").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_query_by_event_and_country_in() {
        let store = InMemorySubscriptionStore::new();
        store.insert(&sub("a", EventKind::Change, "NO")).await.unwrap();
        store.insert(&sub("b", EventKind::Change, "")).await.unwrap();
        store.insert(&sub("c", EventKind::Change, "SE")).await.unwrap();
        store.insert(&sub("d", EventKind::Delete, "NO")).await.unwrap();

        let found = store
            .find_by_event_and_country_in(EventKind::Change, &["NO", ""])
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert_eq!(store.count().await.unwrap(), 4);
        assert_eq!(store.find_all().await.unwrap().len(), 4);
    }
}
