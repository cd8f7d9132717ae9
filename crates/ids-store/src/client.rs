//! Client registry provider.

use async_trait::async_trait;
use dashmap::DashMap;

use ids_model::Client;

use crate::error::StorageResult;

/// Read access to the client registry.
///
/// The registry itself (creation, update, deletion of clients) is
/// owned by an external administration surface; the protocol engine
/// only looks clients up.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Returns the client with the given `client_id`.
    async fn get(&self, client_id: &str) -> StorageResult<Option<Client>>;

    /// Returns every registered client.
    async fn get_all(&self) -> StorageResult<Vec<Client>>;
}

/// In-memory client registry.
#[derive(Debug, Default)]
pub struct InMemoryClientStore {
    clients: DashMap<String, Client>,
}

impl InMemoryClientStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client, replacing any previous registration.
    pub fn insert(&self, client: Client) {
        self.clients.insert(client.client_id.clone(), client);
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn get(&self, client_id: &str) -> StorageResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.clone()))
    }

    async fn get_all(&self) -> StorageResult<Vec<Client>> {
        Ok(self.clients.iter().map(|c| c.clone()).collect())
    }
}
