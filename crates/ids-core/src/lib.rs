//! # ids-core
//!
//! Core utilities, configuration, and security event logging for the
//! identity server.
//!
//! This crate provides foundational types used across all other server
//! crates: runtime configuration (issuer identity, token lifetimes,
//! default algorithms), the base error type, and the structured security
//! event layer with its injected logger seam.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;

pub use config::Config;
pub use error::{Error, Result};
pub use event::{Event, EventLogger, EventOutcome, EventType};
