//! Scope registry store.

use async_trait::async_trait;
use dashmap::DashMap;

use ids_model::Scope;

use crate::error::StorageResult;

/// Read access to the scope registry.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Returns the scope with the given name.
    async fn get(&self, name: &str) -> StorageResult<Option<Scope>>;

    /// Returns every registered scope.
    async fn get_all(&self) -> StorageResult<Vec<Scope>>;
}

/// In-memory scope registry.
#[derive(Debug, Default)]
pub struct InMemoryScopeStore {
    scopes: DashMap<String, Scope>,
}

impl InMemoryScopeStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with the standard OIDC scopes.
    #[must_use]
    pub fn with_standard_scopes() -> Self {
        let store = Self::new();
        store.insert(Scope::openid());
        store.insert(Scope::profile());
        store
    }

    /// Registers a scope, replacing any previous registration.
    pub fn insert(&self, scope: Scope) {
        self.scopes.insert(scope.name.clone(), scope);
    }
}

#[async_trait]
impl ScopeStore for InMemoryScopeStore {
    async fn get(&self, name: &str) -> StorageResult<Option<Scope>> {
        Ok(self.scopes.get(name).map(|s| s.clone()))
    }

    async fn get_all(&self) -> StorageResult<Vec<Scope>> {
        Ok(self.scopes.iter().map(|s| s.clone()).collect())
    }
}
