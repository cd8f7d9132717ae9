//! # ids-store
//!
//! Storage provider traits for the identity server, plus in-memory
//! implementations suitable for tests and single-instance deployments.
//!
//! The single-use artifacts (authorization codes, confirmation codes,
//! JWT-assertion identifiers) expose *atomic* redemption primitives:
//! `take` is a fetch-and-delete and `check_and_insert` a
//! check-and-insert, so two concurrent redemptions of the same record
//! can never both succeed. Callers must not re-implement these checks
//! with separate read and write calls.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod auth_code;
pub mod client;
pub mod confirmation;
pub mod error;
pub mod jti;
pub mod resource_owner;
pub mod scope;
pub mod token;

pub use auth_code::{AuthorizationCodeStore, InMemoryAuthorizationCodeStore};
pub use client::{ClientStore, InMemoryClientStore};
pub use confirmation::{ConfirmationCodeStore, InMemoryConfirmationCodeStore};
pub use error::{StorageError, StorageResult};
pub use jti::{InMemoryJtiReplayCache, JtiReplayCache};
pub use resource_owner::{InMemoryResourceOwnerStore, ResourceOwnerStore};
pub use scope::{InMemoryScopeStore, ScopeStore};
pub use token::{InMemoryTokenStore, TokenStore};
