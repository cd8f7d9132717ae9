//! Structured security events.
//!
//! Every security-relevant outcome (client authentication, token grants,
//! introspection, key rotation, UMA authorization) is reported as an
//! [`Event`] through an [`EventLogger`] handed to each component at
//! construction time. There is no process-wide event sink: components
//! that do not receive a logger do not log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Client authentication
    /// A client authenticated at the token endpoint.
    ClientAuthenticated,
    /// Client authentication failed.
    ClientAuthenticationError,

    // Token issuance
    /// A token was granted.
    TokenGranted,
    /// A token grant was refused.
    TokenGrantError,
    /// A refresh token was exchanged.
    TokenRefreshed,
    /// A token was revoked.
    TokenRevoked,
    /// A token was introspected.
    TokenIntrospected,

    // Resource-owner authentication
    /// A resource owner authenticated with credentials.
    ResourceOwnerAuthenticated,
    /// Resource-owner authentication failed.
    ResourceOwnerAuthenticationError,
    /// A one-time confirmation code was redeemed.
    ConfirmationCodeRedeemed,

    // Key lifecycle
    /// The key set was rotated.
    KeysRotated,

    // UMA
    /// A permission ticket was created.
    TicketCreated,
    /// A requesting-party token was issued.
    RptIssued,
    /// A UMA authorization request was denied.
    AuthorizationDenied,
    /// A UMA authorization request needs more claims.
    AuthorizationNeedsInfo,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A security event for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Client ID associated with the event.
    pub client_id: Option<String>,

    /// Subject associated with the event.
    pub subject: Option<String>,

    /// Error code (for failure events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    client_id: Option<String>,
    subject: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            client_id: None,
            subject: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to success.
    #[must_use]
    pub const fn success(mut self) -> Self {
        self.outcome = EventOutcome::Success;
        self
    }

    /// Sets the outcome to failure with an error code.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            client_id: self.client_id,
            subject: self.subject,
            error: self.error,
            details: self.details,
        }
    }
}

/// Trait for logging security events.
///
/// Implementations can write to various destinations: the tracing
/// framework, a database-backed event store, or a message queue.
#[async_trait]
pub trait EventLogger: Send + Sync {
    /// Logs a security event.
    async fn log(&self, event: Event);
}

/// Event logger that writes to the tracing framework.
///
/// Events are logged as structured fields at the INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLogger;

impl TracingEventLogger {
    /// Creates a new tracing logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventLogger for TracingEventLogger {
    async fn log(&self, event: Event) {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            outcome = ?event.outcome,
            client_id = ?event.client_id,
            subject = ?event.subject,
            error = ?event.error,
            "security_event"
        );
    }
}

/// In-memory event logger for testing.
#[derive(Debug, Default)]
pub struct InMemoryEventLogger {
    events: std::sync::RwLock<Vec<Event>>,
}

impl InMemoryEventLogger {
    /// Creates a new in-memory logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all logged events.
    ///
    /// # Panics
    ///
    /// Panics if the inner lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().unwrap().clone()
    }

    /// Clears all logged events.
    ///
    /// # Panics
    ///
    /// Panics if the inner lock is poisoned.
    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }
}

#[async_trait]
impl EventLogger for InMemoryEventLogger {
    async fn log(&self, event: Event) {
        self.events.write().unwrap().push(event);
    }
}
