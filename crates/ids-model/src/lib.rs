//! # ids-model
//!
//! Domain models for the identity server.
//!
//! These records are owned by external registries (client registration,
//! user directory) or by the stores in `ids-store`; the protocol engine
//! reads them as immutable snapshots.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod client;
pub mod code;
pub mod resource_owner;
pub mod scope;
pub mod token;

pub use client::{Client, GrantType, ResponseType, TokenEndpointAuthMethod};
pub use code::{AuthorizationCode, ConfirmationCode};
pub use resource_owner::ResourceOwner;
pub use scope::Scope;
pub use token::GrantedToken;
