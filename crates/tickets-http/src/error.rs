//! Proxy callback error types.

use thiserror::Error;

/// Result alias for callback operations.
pub type Result<T> = std::result::Result<T, CallbackError>;

/// Errors produced while calling a proxy callback.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases; downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CallbackError {
    /// The client configuration was rejected.
    #[error("Invalid callback client configuration for `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The callback URL cannot be called over HTTP.
    #[error("Invalid callback URL {url}: {reason}")]
    InvalidUrl {
        /// The URL as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request did not complete.
    #[error("Callback request to {url} failed")]
    Transport {
        /// The URL that was called.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The callback answered with a status outside the acceptable set.
    #[error("Callback {url} answered with unacceptable status {status}")]
    UnacceptableStatus {
        /// The URL that was called.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

impl CallbackError {
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { field, reason: reason.into() }
    }

    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into(), reason: reason.into() }
    }
}
