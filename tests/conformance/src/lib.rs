//! Conformance test package for the identity server engine.
//!
//! All content lives in the `tests/` directory; this library target
//! exists only so Cargo has a package to attach the test binary to.
