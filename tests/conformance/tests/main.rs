//! Conformance test suite for the identity server engine.
//!
//! Exercises the engine the way a transport layer would: form-shaped
//! requests in, token/introspection responses or typed protocol errors
//! out. The suite covers the token endpoint grant types, introspection,
//! revocation, the JOSE round-trip and tamper properties, and the UMA
//! ticket/policy pipeline.
//!
//! Run with:
//! ```bash
//! cargo test -p ids-conformance-tests
//! ```

mod harness;

mod introspection;
mod jose_properties;
mod token_endpoint;
mod uma_authorization;
