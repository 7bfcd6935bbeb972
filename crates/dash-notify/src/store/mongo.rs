//! MongoDB subscription store

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};

use super::SubscriptionStore;
use crate::error::Result;
use crate::event::EventKind;
use crate::id::IdLookup;
use crate::subscription::Subscription;

pub const DEFAULT_COLLECTION: &str = "webhooks";

pub struct MongoSubscriptionStore {
    collection: Collection<Subscription>,
}

impl MongoSubscriptionStore {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, DEFAULT_COLLECTION)
    }

    pub fn with_collection(db: &Database, name: &str) -> Self {
        Self {
            collection: db.collection(name),
        }
    }
}

#[async_trait]
impl IdLookup for MongoSubscriptionStore {
    async fn exists_by_id(&self, id: &str) -> Result<bool> {
        let found = self.collection.count_documents(doc! { "_id": id }).limit(1).await?;
        Ok(found > 0)
    }
}

#[async_trait]
impl SubscriptionStore for MongoSubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> Result<()> {
        self.collection.insert_one(subscription).await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Subscription>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_event_and_country_in(
        &self,
        event: EventKind,
        countries: &[&str],
    ) -> Result<Vec<Subscription>> {
        let countries: Vec<String> = countries.iter().map(|c| c.to_string()).collect();
        let cursor = self
            .collection
            .find(doc! { "event": event.as_str(), "country": { "$in": countries } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_all(&self) -> Result<Vec<Subscription>> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}
