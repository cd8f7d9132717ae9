//! # ids-protocol
//!
//! The OAuth 2.0 / OpenID Connect protocol engine.
//!
//! A token request flows through [`ClientAuthenticator`] into
//! [`TokenIssuer`], which dispatches on the grant type, consults the
//! stores, and mints a [`ids_model::GrantedToken`], or raises a typed
//! [`OAuthError`] with a stable error code and human description.
//! Presented tokens re-enter through [`IntrospectionService`] and
//! [`RevocationService`]. HTTP framing is out of scope: the request
//! and response types here are what a transport layer mounts.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod claims;
pub mod client_auth;
pub mod discovery;
pub mod error;
pub mod introspection;
pub mod issuer;
pub mod password;
pub mod request;
pub mod revocation;

pub use claims::{AuthorizationParameter, ClaimsGenerator, Principal};
pub use client_auth::{AuthenticationInstruction, ClientAuthenticator};
pub use discovery::DiscoveryDocument;
pub use error::{ErrorResponse, OAuthError, OAuthResult};
pub use introspection::{IntrospectionResponse, IntrospectionService};
pub use issuer::{TokenIssuer, TokenResponse};
pub use request::{IntrospectionRequest, RevocationRequest, TokenRequest};
pub use revocation::RevocationService;
