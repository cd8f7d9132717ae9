//! UMA storage providers.

use async_trait::async_trait;
use dashmap::DashMap;

use ids_store::StorageResult;

use crate::model::{Policy, ResourceSet, Ticket};

/// Store for protected resource sets.
#[async_trait]
pub trait ResourceSetStore: Send + Sync {
    /// Registers a resource set.
    async fn add(&self, resource_set: ResourceSet) -> StorageResult<()>;

    /// Returns the resource set with the given id.
    async fn get(&self, id: &str) -> StorageResult<Option<ResourceSet>>;
}

/// Store for permission tickets.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Stores a freshly created ticket.
    async fn add(&self, ticket: Ticket) -> StorageResult<()>;

    /// Atomically fetches **and deletes** the ticket.
    ///
    /// Of two concurrent exchanges of the same ticket, exactly one
    /// receives the record.
    async fn take(&self, id: &str) -> StorageResult<Option<Ticket>>;

    /// Removes every expired ticket and returns how many were dropped.
    async fn remove_expired(&self) -> StorageResult<u64>;
}

/// Store for authorization policies.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Registers a policy.
    async fn add(&self, policy: Policy) -> StorageResult<()>;

    /// Returns the policy protecting the given resource set, if any.
    async fn get_by_resource_set(&self, resource_set_id: &str) -> StorageResult<Option<Policy>>;
}

/// In-memory resource set store.
#[derive(Debug, Default)]
pub struct InMemoryResourceSetStore {
    resource_sets: DashMap<String, ResourceSet>,
}

impl InMemoryResourceSetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceSetStore for InMemoryResourceSetStore {
    async fn add(&self, resource_set: ResourceSet) -> StorageResult<()> {
        self.resource_sets
            .insert(resource_set.id.clone(), resource_set);
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<ResourceSet>> {
        Ok(self.resource_sets.get(id).map(|r| r.clone()))
    }
}

/// In-memory ticket store.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tickets: DashMap<String, Ticket>,
}

impl InMemoryTicketStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn add(&self, ticket: Ticket) -> StorageResult<()> {
        self.tickets.insert(ticket.id.clone(), ticket);
        Ok(())
    }

    async fn take(&self, id: &str) -> StorageResult<Option<Ticket>> {
        Ok(self.tickets.remove(id).map(|(_, ticket)| ticket))
    }

    async fn remove_expired(&self) -> StorageResult<u64> {
        let before = self.tickets.len();
        self.tickets.retain(|_, ticket| !ticket.is_expired());
        Ok((before - self.tickets.len()) as u64)
    }
}

/// In-memory policy store.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: DashMap<String, Policy>,
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn add(&self, policy: Policy) -> StorageResult<()> {
        self.policies.insert(policy.id.clone(), policy);
        Ok(())
    }

    async fn get_by_resource_set(&self, resource_set_id: &str) -> StorageResult<Option<Policy>> {
        Ok(self
            .policies
            .iter()
            .find(|p| p.resource_set_ids.iter().any(|id| id == resource_set_id))
            .map(|p| p.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn tickets_are_taken_exactly_once() {
        let store = InMemoryTicketStore::new();
        store
            .add(Ticket {
                id: "t-1".to_string(),
                resource_set_id: "rs-1".to_string(),
                scopes: vec!["read".to_string()],
                client_id: "web".to_string(),
                is_authorized_by_owner: false,
                created_at: Utc::now(),
                expires_in: 300,
            })
            .await
            .unwrap();

        assert!(store.take("t-1").await.unwrap().is_some());
        assert!(store.take("t-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn policies_are_found_by_resource_set() {
        let store = InMemoryPolicyStore::new();
        store
            .add(Policy {
                id: "p-1".to_string(),
                resource_set_ids: vec!["rs-1".to_string(), "rs-2".to_string()],
                rules: Vec::new(),
            })
            .await
            .unwrap();

        assert!(store
            .get_by_resource_set("rs-2")
            .await
            .unwrap()
            .is_some());
        assert!(store.get_by_resource_set("rs-9").await.unwrap().is_none());
    }
}
