//! Ticket-layer error types and result alias.
//!
//! [`TicketError`] is the root of every failure surfaced by the factory,
//! the manager and the compactor. Registry failures are wrapped with their
//! source chain intact.
//!
//! [`TicketError::InvalidTicket`] covers an unknown id, a ticket of the wrong
//! kind, an expired ticket and an already consumed ticket alike. The variant
//! carries no reason, so a caller probing ids learns nothing beyond "rejected".

use std::sync::Arc;

use thiserror::Error;

use crate::{registry::RegistryError, ticket::TicketKind};

/// Shared, cloneable boxed error used as a `#[source]` payload.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result alias for ticket operations.
pub type TicketResult<T> = Result<T, TicketError>;

/// Errors produced by the ticket core.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases; downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TicketError {
    /// The ticket is not usable: unknown, wrong kind, expired or consumed.
    #[error("Invalid ticket: {id}")]
    InvalidTicket {
        /// The id presented by the caller.
        id: String,
    },

    /// The factory has no expiration policy registered for this kind.
    #[error("Unsupported ticket kind: {kind}")]
    UnsupportedTicketKind {
        /// The requested kind.
        kind: TicketKind,
    },

    /// A compact ticket string could not be parsed.
    #[error("Malformed ticket: {message}")]
    MalformedTicket {
        /// What was wrong with the input.
        message: String,
    },

    /// A proxy-granting ticket was requested with invalid arguments.
    #[error("Invalid proxy granting ticket request: {message}")]
    ProxyConstruction {
        /// What was wrong with the request.
        message: String,
    },

    /// The ticket was valid but issued for a different service.
    ///
    /// The ticket has been consumed by the attempt.
    #[error("Ticket {id} was not issued for the requested service")]
    ServiceMismatch {
        /// The consumed ticket id.
        id: String,
    },

    /// The ticket registry failed.
    #[error("Ticket registry error: {0}")]
    Registry(
        /// The underlying registry error.
        #[from]
        RegistryError,
    ),
}

impl TicketError {
    /// Creates a [`TicketError::InvalidTicket`].
    #[must_use]
    pub fn invalid_ticket(id: impl Into<String>) -> Self {
        Self::InvalidTicket { id: id.into() }
    }

    /// Creates a [`TicketError::UnsupportedTicketKind`].
    #[must_use]
    pub fn unsupported_kind(kind: TicketKind) -> Self {
        Self::UnsupportedTicketKind { kind }
    }

    /// Creates a [`TicketError::MalformedTicket`].
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedTicket { message: message.into() }
    }

    /// Creates a [`TicketError::ProxyConstruction`].
    #[must_use]
    pub fn proxy_construction(message: impl Into<String>) -> Self {
        Self::ProxyConstruction { message: message.into() }
    }

    /// Creates a [`TicketError::ServiceMismatch`].
    #[must_use]
    pub fn service_mismatch(id: impl Into<String>) -> Self {
        Self::ServiceMismatch { id: id.into() }
    }

    /// Returns `true` for [`TicketError::InvalidTicket`].
    #[must_use]
    pub fn is_invalid_ticket(&self) -> bool {
        matches!(self, Self::InvalidTicket { .. })
    }
}
