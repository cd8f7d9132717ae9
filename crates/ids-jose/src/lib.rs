//! # ids-jose
//!
//! JSON Web Key lifecycle and JOSE engines for the identity server.
//!
//! This crate owns every cryptographic concern of the token pipeline:
//!
//! - [`JsonWebKey`] material and the versioned [`KeyStore`] with atomic
//!   rotation
//! - [`JwsEngine`]: compact JWS signing and verification (HMAC, RSA
//!   PKCS#1 v1.5 and PSS, ECDSA over P-256/P-384/P-521)
//! - [`JweEngine`]: compact JWE encryption and decryption (RSA and AES
//!   key wrapping, direct and password-based key agreement, AES-GCM and
//!   AES-CBC-HMAC content encryption)
//! - [`JwsPayload`]: the claim-set currency shared by the protocol
//!   layers
//!
//! Signature and decryption failures are normal `None` outcomes, never
//! errors: the caller escalates them to protocol errors without
//! learning why the cryptographic check failed.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod alg;
pub mod claims;
pub mod error;
pub mod jwe;
pub mod jwk;
pub mod jwks;
pub mod jws;
pub mod keystore;
pub mod random;

pub use alg::{ContentEncryptionAlgorithm, EllipticCurve, KeyManagementAlgorithm, SignatureAlgorithm};
pub use claims::JwsPayload;
pub use error::{JoseError, JoseResult};
pub use jwe::{JweEngine, JweHeader};
pub use jwk::{JsonWebKey, KeyOperation, KeyType, KeyUse};
pub use jwks::{JsonWebKeySet, PublicJsonWebKey};
pub use jws::{JwsEngine, JwsHeader};
pub use keystore::{KeyStore, KeyVersion};
