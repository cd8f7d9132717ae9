//! # ids-uma
//!
//! The UMA 2.0 authorization layer.
//!
//! A client denied direct access to a protected resource receives a
//! single-use, short-lived permission [`Ticket`]. It exchanges the
//! ticket, optionally with a claim token, at the token endpoint; the
//! [`PolicyEvaluator`] decides whether the presented claims satisfy
//! the resource owner's [`Policy`], and on success the
//! [`TicketEngine`] mints a requesting-party token (RPT): a signed,
//! optionally encrypted token recorded for later introspection.
//!
//! Rules within a policy are OR'd; the conditions inside one rule are
//! AND'd. A policy with zero rules denies.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod error;
pub mod model;
pub mod policy;
pub mod store;
pub mod ticket;

pub use error::{UmaError, UmaResult};
pub use model::{
    ClaimRequirement, ClaimTokenParameter, Policy, PolicyRule, RequiredClaim, ResourceSet, Ticket,
};
pub use policy::{PolicyDecision, PolicyEvaluator};
pub use store::{
    InMemoryPolicyStore, InMemoryResourceSetStore, InMemoryTicketStore, PolicyStore,
    ResourceSetStore, TicketStore,
};
pub use ticket::{RptRequest, RptResponse, TicketEngine};
