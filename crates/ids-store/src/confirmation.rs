//! One-time confirmation code store (out-of-band authentication).

use async_trait::async_trait;
use dashmap::DashMap;

use ids_model::ConfirmationCode;

use crate::error::StorageResult;

/// Store for single-use, time-boxed confirmation codes.
#[async_trait]
pub trait ConfirmationCodeStore: Send + Sync {
    /// Stores a freshly issued code.
    async fn add(&self, code: ConfirmationCode) -> StorageResult<()>;

    /// Atomically fetches **and deletes** the code.
    async fn take(&self, value: &str) -> StorageResult<Option<ConfirmationCode>>;

    /// Removes every expired code and returns how many were dropped.
    async fn remove_expired(&self) -> StorageResult<u64>;
}

/// In-memory confirmation code store.
#[derive(Debug, Default)]
pub struct InMemoryConfirmationCodeStore {
    codes: DashMap<String, ConfirmationCode>,
}

impl InMemoryConfirmationCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfirmationCodeStore for InMemoryConfirmationCodeStore {
    async fn add(&self, code: ConfirmationCode) -> StorageResult<()> {
        self.codes.insert(code.value.clone(), code);
        Ok(())
    }

    async fn take(&self, value: &str) -> StorageResult<Option<ConfirmationCode>> {
        Ok(self.codes.remove(value).map(|(_, record)| record))
    }

    async fn remove_expired(&self) -> StorageResult<u64> {
        let before = self.codes.len();
        self.codes.retain(|_, code| !code.is_expired());
        Ok((before - self.codes.len()) as u64)
    }
}
