//! Granted token store.

use async_trait::async_trait;
use dashmap::DashMap;

use ids_model::GrantedToken;

use crate::error::StorageResult;

/// Store for issued tokens, addressable by access or refresh token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Records a freshly granted token.
    async fn add(&self, token: GrantedToken) -> StorageResult<()>;

    /// Looks a token up by its access-token value.
    async fn get_by_access_token(&self, access_token: &str) -> StorageResult<Option<GrantedToken>>;

    /// Looks a token up by its refresh-token value.
    async fn get_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> StorageResult<Option<GrantedToken>>;

    /// Removes a token by its access-token value; returns whether a
    /// record was removed.
    async fn remove(&self, access_token: &str) -> StorageResult<bool>;

    /// Removes every expired token and returns how many were dropped.
    async fn remove_expired(&self) -> StorageResult<u64>;
}

/// In-memory token store.
///
/// Tokens are keyed by access token; a secondary index maps refresh
/// tokens to access tokens.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    by_access: DashMap<String, GrantedToken>,
    refresh_index: DashMap<String, String>,
}

impl InMemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn add(&self, token: GrantedToken) -> StorageResult<()> {
        if let Some(refresh) = &token.refresh_token {
            self.refresh_index
                .insert(refresh.clone(), token.access_token.clone());
        }
        self.by_access.insert(token.access_token.clone(), token);
        Ok(())
    }

    async fn get_by_access_token(&self, access_token: &str) -> StorageResult<Option<GrantedToken>> {
        Ok(self.by_access.get(access_token).map(|t| t.clone()))
    }

    async fn get_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> StorageResult<Option<GrantedToken>> {
        let Some(access) = self.refresh_index.get(refresh_token).map(|a| a.clone()) else {
            return Ok(None);
        };
        Ok(self.by_access.get(&access).map(|t| t.clone()))
    }

    async fn remove(&self, access_token: &str) -> StorageResult<bool> {
        let Some((_, token)) = self.by_access.remove(access_token) else {
            return Ok(false);
        };
        if let Some(refresh) = &token.refresh_token {
            self.refresh_index.remove(refresh);
        }
        Ok(true)
    }

    async fn remove_expired(&self) -> StorageResult<u64> {
        let mut dropped = 0;
        let expired: Vec<String> = self
            .by_access
            .iter()
            .filter(|t| t.is_expired())
            .map(|t| t.access_token.clone())
            .collect();
        for access in expired {
            if self.remove(&access).await? {
                dropped += 1;
            }
        }
        Ok(dropped)
    }
}
