//! Registration Repository

use async_trait::async_trait;
use dash_notify::{IdLookup, NotifyError, Result};
use futures::TryStreamExt;
use indexmap::IndexMap;
use mongodb::{bson::doc, Collection, Database};
use parking_lot::RwLock;

use super::entity::Registration;

pub const DEFAULT_COLLECTION: &str = "dashboards";

#[async_trait]
pub trait RegistrationRepository: IdLookup {
    async fn insert(&self, registration: &Registration) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Registration>>;

    async fn find_all(&self) -> Result<Vec<Registration>>;

    /// Returns false when no registration has the id
    async fn replace(&self, registration: &Registration) -> Result<bool>;

    async fn delete_by_id(&self, id: &str) -> Result<bool>;
}

pub struct MongoRegistrationRepository {
    collection: Collection<Registration>,
}

impl MongoRegistrationRepository {
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
impl IdLookup for MongoRegistrationRepository {
    async fn exists_by_id(&self, id: &str) -> Result<bool> {
        let found = self.collection.count_documents(doc! { "_id": id }).limit(1).await?;
        Ok(found > 0)
    }
}

#[async_trait]
impl RegistrationRepository for MongoRegistrationRepository {
    async fn insert(&self, registration: &Registration) -> Result<()> {
        self.collection.insert_one(registration).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Registration>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_all(&self) -> Result<Vec<Registration>> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace(&self, registration: &Registration) -> Result<bool> {
        let result = self
            .collection
            .replace_one(doc! { "_id": registration.id.as_str() }, registration)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[derive(Default)]
pub struct InMemoryRegistrationRepository {
    registrations: RwLock<IndexMap<String, Registration>>,
}

impl InMemoryRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdLookup for InMemoryRegistrationRepository {
    async fn exists_by_id(&self, id: &str) -> Result<bool> {
        Ok(self.registrations.read().contains_key(id))
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRegistrationRepository {
    async fn insert(&self, registration: &Registration) -> Result<()> {
        let mut registrations = self.registrations.write();
        if registrations.contains_key(&registration.id) {
            return Err(NotifyError::storage(format!("duplicate key: {}", registration.id)));
        }
        registrations.insert(registration.id.clone(), registration.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Registration>> {
        Ok(self.registrations.read().get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Registration>> {
        Ok(self.registrations.read().values().cloned().collect())
    }

    async fn replace(&self, registration: &Registration) -> Result<bool> {
        match self.registrations.write().get_mut(&registration.id) {
            Some(existing) => {
                *existing = registration.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        Ok(self.registrations.write().shift_remove(id).is_some())
    }
}
