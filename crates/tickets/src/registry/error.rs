//! Registry error types and result alias.
//!
//! Every [`TicketRegistry`](super::TicketRegistry) implementation maps its
//! internal failures onto [`RegistryError`]. The ticket manager wraps these
//! in [`TicketError::Registry`](crate::TicketError::Registry) so the full
//! source chain stays available to the caller.
//!
//! # Example
//!
//! ```
//! use casticket::registry::{RegistryError, RegistryResult};
//!
//! fn lookup(id: &str) -> RegistryResult<()> {
//!     Err(RegistryError::not_found(id))
//! }
//! # assert!(lookup("TGT-1").is_err());
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::error::BoxError;

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors produced by ticket registry implementations.
///
/// # Non-exhaustive
///
/// New variants may be added without a breaking change; match with a
/// wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// No ticket is stored under the given id.
    #[error("Ticket not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// A ticket with the same id is already stored.
    #[error("Ticket already exists: {id}")]
    AlreadyExists {
        /// The duplicate id.
        id: String,
    },

    /// The ticket could not be encoded or decoded by the backing store.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable description.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Backend-specific failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable description.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl RegistryError {
    /// Creates a [`RegistryError::NotFound`].
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a [`RegistryError::AlreadyExists`].
    #[must_use]
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    /// Creates a [`RegistryError::Serialization`] without a source.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a [`RegistryError::Serialization`] wrapping `source`.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a [`RegistryError::Internal`] without a source.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a [`RegistryError::Internal`] wrapping `source`.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }
}
