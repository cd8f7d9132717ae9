//! The server's key store: a versioned arena of immutable keys.
//!
//! Rotation never mutates key material in place. Each `kid` maps to a
//! list of immutable [`KeyVersion`]s; [`KeyStore::rotate`] appends a
//! fresh version under a short write lock, and readers resolve whole
//! `Arc`'d versions, so a verification in flight observes fully-old or
//! fully-new material per `kid`, never a torn key. Tokens signed just
//! before a rotation keep verifying through the version fallback in
//! [`KeyStore::parse_with_fallback`] until their version is pruned.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::claims::JwsPayload;
use crate::error::JoseResult;
use crate::jwk::{JsonWebKey, KeyOperation, KeyType, KeyUse};
use crate::jwks::{JsonWebKeySet, PublicJsonWebKey};
use crate::jws::JwsEngine;

/// One immutable version of a key.
#[derive(Debug)]
pub struct KeyVersion {
    /// Version number, starting at 1 and incremented per rotation.
    pub version: u32,
    /// The key material and metadata.
    pub key: JsonWebKey,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
}

/// Concurrent key store.
///
/// The store is the only owner of private key material; every other
/// component receives `Arc`'d immutable snapshots.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<String, Vec<Arc<KeyVersion>>>>,
}

impl KeyStore {
    /// Creates an empty key store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key as the first version under its `kid`.
    ///
    /// Inserting under an existing `kid` appends a new version, exactly
    /// as a rotation would.
    pub fn insert(&self, key: JsonWebKey) {
        let mut keys = self.keys.write();
        let versions = keys.entry(key.kid.clone()).or_default();
        let version = versions.last().map_or(1, |v| v.version + 1);
        versions.push(Arc::new(KeyVersion {
            version,
            key,
            created_at: Utc::now(),
        }));
    }

    /// Returns the latest version of every key.
    #[must_use]
    pub fn get_all(&self) -> Vec<Arc<KeyVersion>> {
        let keys = self.keys.read();
        let mut all: Vec<Arc<KeyVersion>> = keys
            .values()
            .filter_map(|versions| versions.last().cloned())
            .collect();
        all.sort_by(|a, b| a.key.kid.cmp(&b.key.kid));
        all
    }

    /// Returns the latest version of the key with the given `kid`.
    #[must_use]
    pub fn get_by_kid(&self, kid: &str) -> Option<Arc<KeyVersion>> {
        self.keys.read().get(kid).and_then(|v| v.last().cloned())
    }

    /// Returns every version of the key with the given `kid`,
    /// newest first.
    #[must_use]
    pub fn get_versions(&self, kid: &str) -> Vec<Arc<KeyVersion>> {
        self.keys
            .read()
            .get(kid)
            .map(|versions| versions.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the latest key matching use, algorithm, and operations.
    #[must_use]
    pub fn get_by_alg(
        &self,
        key_use: KeyUse,
        alg: &str,
        ops: &[KeyOperation],
    ) -> Option<Arc<KeyVersion>> {
        self.get_all().into_iter().find(|version| {
            version.key.key_use == key_use
                && version.key.alg == alg
                && ops.iter().all(|op| version.key.permits(*op))
        })
    }

    /// Returns the latest signing key, preferring asymmetric keys so
    /// the JWKS endpoint can advertise a verifier.
    #[must_use]
    pub fn default_signing_key(&self) -> Option<Arc<KeyVersion>> {
        let all = self.get_all();
        all.iter()
            .find(|v| {
                v.key.key_use == KeyUse::Sig
                    && v.key.kty != KeyType::Oct
                    && v.key.permits(KeyOperation::Sign)
            })
            .or_else(|| {
                all.iter()
                    .find(|v| v.key.key_use == KeyUse::Sig && v.key.permits(KeyOperation::Sign))
            })
            .cloned()
    }

    /// Returns the latest encryption key.
    #[must_use]
    pub fn default_encryption_key(&self) -> Option<Arc<KeyVersion>> {
        self.get_all()
            .into_iter()
            .find(|v| v.key.key_use == KeyUse::Enc && v.key.permits(KeyOperation::Decrypt))
    }

    /// Rotates every key: appends a fresh version of each `kid` with
    /// regenerated material and unchanged metadata.
    ///
    /// Returns `false` without touching anything when the store is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if regeneration of any key fails; in that case
    /// no version is appended for any key.
    pub fn rotate(&self) -> JoseResult<bool> {
        // Regenerate outside the lock: key generation is CPU-bound and
        // must not stall readers.
        let current: Vec<Arc<KeyVersion>> = self.get_all();
        if current.is_empty() {
            return Ok(false);
        }

        let mut regenerated = Vec::with_capacity(current.len());
        for version in &current {
            regenerated.push(version.key.regenerate()?);
        }

        let mut keys = self.keys.write();
        for key in regenerated {
            let versions = keys.entry(key.kid.clone()).or_default();
            let version = versions.last().map_or(1, |v| v.version + 1);
            versions.push(Arc::new(KeyVersion {
                version,
                key,
                created_at: Utc::now(),
            }));
        }
        drop(keys);

        tracing::info!(rotated = current.len(), "key set rotated");
        Ok(true)
    }

    /// Drops all but the newest `keep` versions of every key.
    pub fn prune(&self, keep: usize) {
        let keep = keep.max(1);
        let mut keys = self.keys.write();
        for versions in keys.values_mut() {
            if versions.len() > keep {
                let drop_count = versions.len() - keep;
                versions.drain(..drop_count);
            }
        }
    }

    /// Verifies a compact JWS against the key named by its header,
    /// falling back across rotated versions newest-first.
    ///
    /// This is the grace window: a token signed under a previous
    /// version of its `kid` still verifies until that version is
    /// pruned.
    #[must_use]
    pub fn parse_with_fallback(&self, engine: &JwsEngine, token: &str) -> Option<JwsPayload> {
        let header = engine.get_header(token)?;
        let kid = header.kid?;
        self.get_versions(&kid)
            .iter()
            .find_map(|version| engine.parse(token, &version.key))
    }

    /// Exports the public JWKS document: signature keys whose
    /// operations include `verify`, public components only.
    #[must_use]
    pub fn public_jwks(&self) -> JsonWebKeySet {
        let keys = self
            .get_all()
            .iter()
            .filter(|v| v.key.key_use == KeyUse::Sig && v.key.permits(KeyOperation::Verify))
            .filter_map(|v| PublicJsonWebKey::from_key(&v.key))
            .collect();
        JsonWebKeySet { keys }
    }
}
