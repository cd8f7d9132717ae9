//! Resource owner (credential) store.

use async_trait::async_trait;
use dashmap::DashMap;

use ids_model::ResourceOwner;

use crate::error::StorageResult;

/// Read access to the resource-owner directory.
#[async_trait]
pub trait ResourceOwnerStore: Send + Sync {
    /// Returns the owner with the given login name.
    async fn get_by_username(&self, username: &str) -> StorageResult<Option<ResourceOwner>>;

    /// Returns the owner with the given subject identifier.
    async fn get_by_subject(&self, subject: &str) -> StorageResult<Option<ResourceOwner>>;
}

/// In-memory resource-owner directory.
#[derive(Debug, Default)]
pub struct InMemoryResourceOwnerStore {
    by_username: DashMap<String, ResourceOwner>,
}

impl InMemoryResourceOwnerStore {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an owner, replacing any record with the same username.
    pub fn insert(&self, owner: ResourceOwner) {
        self.by_username.insert(owner.username.clone(), owner);
    }
}

#[async_trait]
impl ResourceOwnerStore for InMemoryResourceOwnerStore {
    async fn get_by_username(&self, username: &str) -> StorageResult<Option<ResourceOwner>> {
        Ok(self.by_username.get(username).map(|o| o.clone()))
    }

    async fn get_by_subject(&self, subject: &str) -> StorageResult<Option<ResourceOwner>> {
        Ok(self
            .by_username
            .iter()
            .find(|o| o.subject == subject)
            .map(|o| o.clone()))
    }
}
