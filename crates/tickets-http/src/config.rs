//! Configuration for [`HttpProxyCallbackClient`](crate::HttpProxyCallbackClient).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CallbackError, Result};

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout (5 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Status codes a proxy callback may answer with by default.
pub const DEFAULT_ACCEPTABLE_CODES: [u16; 5] = [200, 202, 301, 302, 304];

/// HTTP settings for proxy callback delivery.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use casticket_http::CallbackClientConfig;
///
/// let config = CallbackClientConfig::builder().timeout(Duration::from_secs(2)).build();
/// config.validate()?;
/// assert_eq!(config.acceptable_codes, [200, 202, 301, 302, 304]);
/// # Ok::<(), casticket_http::CallbackError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct CallbackClientConfig {
    /// Time allowed to establish the connection.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,

    /// Time allowed for the whole request, connection included.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,

    /// Statuses counted as a successful delivery.
    #[serde(default = "default_acceptable_codes")]
    #[builder(default = default_acceptable_codes())]
    pub acceptable_codes: Vec<u16>,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_acceptable_codes() -> Vec<u16> {
    DEFAULT_ACCEPTABLE_CODES.to_vec()
}

impl Default for CallbackClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CallbackClientConfig {
    /// Checks the settings for values no client can work with.
    ///
    /// # Errors
    ///
    /// [`CallbackError::InvalidConfig`] for a zero timeout, an empty
    /// acceptable set, or a code outside `100..=599`.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(CallbackError::invalid_config("connect_timeout", "must be non-zero"));
        }
        if self.timeout.is_zero() {
            return Err(CallbackError::invalid_config("timeout", "must be non-zero"));
        }
        if self.acceptable_codes.is_empty() {
            return Err(CallbackError::invalid_config("acceptable_codes", "must not be empty"));
        }
        if let Some(code) = self.acceptable_codes.iter().find(|code| !(100..=599).contains(*code)) {
            return Err(CallbackError::invalid_config("acceptable_codes", format!("{code} is not an HTTP status")));
        }
        Ok(())
    }

    /// `true` if `status` counts as a successful delivery.
    #[must_use]
    pub fn accepts(&self, status: u16) -> bool {
        self.acceptable_codes.contains(&status)
    }
}
