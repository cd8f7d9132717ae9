//! Authorization code store.

use async_trait::async_trait;
use dashmap::DashMap;

use ids_model::AuthorizationCode;

use crate::error::StorageResult;

/// Store for short-lived, single-use authorization codes.
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Stores a freshly issued code.
    async fn add(&self, code: AuthorizationCode) -> StorageResult<()>;

    /// Atomically fetches **and deletes** the code.
    ///
    /// This is the only redemption primitive: of two concurrent calls
    /// with the same value, exactly one receives the record. Expired
    /// codes are still returned so the caller can distinguish
    /// "expired" from "unknown"; either way the record is gone.
    async fn take(&self, code: &str) -> StorageResult<Option<AuthorizationCode>>;

    /// Removes every expired code and returns how many were dropped.
    async fn remove_expired(&self) -> StorageResult<u64>;
}

/// In-memory authorization code store.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationCodeStore {
    codes: DashMap<String, AuthorizationCode>,
}

impl InMemoryAuthorizationCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeStore for InMemoryAuthorizationCodeStore {
    async fn add(&self, code: AuthorizationCode) -> StorageResult<()> {
        self.codes.insert(code.code.clone(), code);
        Ok(())
    }

    async fn take(&self, code: &str) -> StorageResult<Option<AuthorizationCode>> {
        // DashMap::remove is the atomic fetch-and-delete.
        Ok(self.codes.remove(code).map(|(_, record)| record))
    }

    async fn remove_expired(&self) -> StorageResult<u64> {
        let before = self.codes.len();
        self.codes.retain(|_, code| !code.is_expired());
        Ok((before - self.codes.len()) as u64)
    }
}
