//! Ticket configuration.
//!
//! [`TicketConfig`] describes how long each ticket kind lives, how sessions
//! track services, how ids are suffixed and how often expired tickets are
//! swept. It deserializes from any serde format with humantime durations:
//!
//! ```
//! use casticket::TicketConfig;
//!
//! let config: TicketConfig = serde_json::from_str(
//!     r#"{
//!         "tgt": { "max_time_to_live": "8h", "time_to_kill": "2h" },
//!         "st": { "number_of_uses": 1, "time_to_kill": "10s" },
//!         "access_token": { "max_time_to_live": "8h", "time_to_kill": "2h", "sovereign": true }
//!     }"#,
//! )
//! .unwrap();
//! config.validate().unwrap();
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expiration::ExpirationPolicy;

/// Default session lifetime (8 hours).
const DEFAULT_TGT_MAX_TIME_TO_LIVE: Duration = Duration::from_secs(8 * 60 * 60);

/// Default session idle timeout (2 hours).
const DEFAULT_TGT_TIME_TO_KILL: Duration = Duration::from_secs(2 * 60 * 60);

/// Default service and proxy ticket lifetime (10 seconds).
const DEFAULT_ST_TIME_TO_KILL: Duration = Duration::from_secs(10);

/// Default refresh token lifetime (30 days).
const DEFAULT_REFRESH_TOKEN_MAX_TIME_TO_LIVE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default interval between expired-ticket sweeps.
const DEFAULT_CLEANER_INTERVAL: Duration = Duration::from_secs(120);

/// Default delay before the first sweep.
const DEFAULT_CLEANER_START_DELAY: Duration = Duration::from_secs(20);

/// Configuration errors reported by [`TicketConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A field holds a value the ticket core cannot work with.
    #[error("Invalid configuration for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { field, reason: reason.into() }
    }
}

/// Top-level ticket configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct TicketConfig {
    /// Ticket-granting ticket (session) expiration.
    #[serde(default)]
    #[builder(default)]
    pub tgt: TicketGrantingTicketConfig,

    /// Service ticket expiration.
    #[serde(default)]
    #[builder(default)]
    pub st: ServiceTicketConfig,

    /// Proxy-granting ticket expiration.
    #[serde(default)]
    #[builder(default)]
    pub pgt: ProxyGrantingTicketConfig,

    /// Proxy ticket expiration.
    #[serde(default)]
    #[builder(default)]
    pub pt: ServiceTicketConfig,

    /// OAuth access token expiration.
    #[serde(default)]
    #[builder(default)]
    pub access_token: OAuthTokenConfig,

    /// OAuth refresh token expiration.
    #[serde(default = "OAuthTokenConfig::refresh_token_default")]
    #[builder(default = OAuthTokenConfig::refresh_token_default())]
    pub refresh_token: OAuthTokenConfig,

    /// Keep only the newest service ticket per equivalent service in a
    /// session's service map.
    #[serde(default = "default_true")]
    #[builder(default = true)]
    pub only_track_most_recent_session: bool,

    /// Ticket id generation.
    #[serde(default)]
    #[builder(default)]
    pub id: TicketIdConfig,

    /// Background sweep of expired tickets.
    #[serde(default)]
    #[builder(default)]
    pub cleaner: CleanerConfig,
}

fn default_true() -> bool {
    true
}

impl TicketConfig {
    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.st.validate("st")?;
        self.pt.validate("pt")?;
        if let Some(throttled) = &self.tgt.throttled {
            if throttled.time_to_kill.is_zero() {
                return Err(ConfigError::invalid("tgt.throttled.time_to_kill", "must be positive"));
            }
        }
        for (field, token) in
            [("access_token", &self.access_token), ("refresh_token", &self.refresh_token)]
        {
            if token.max_time_to_live.is_zero() {
                return Err(ConfigError::invalid(field, "max_time_to_live must be positive"));
            }
            if token.time_to_kill > token.max_time_to_live {
                return Err(ConfigError::invalid(
                    field,
                    "time_to_kill must not exceed max_time_to_live",
                ));
            }
        }
        if self.cleaner.enabled && self.cleaner.interval.is_zero() {
            return Err(ConfigError::invalid("cleaner.interval", "must be positive"));
        }
        Ok(())
    }
}

/// Session expiration settings.
///
/// The policy is chosen from the settings in this order:
///
/// 1. `max_time_to_live` and `time_to_kill` both zero: never expires
/// 2. `timeout` set: idle timeout
/// 3. `max_time_to_live` and `time_to_kill` both positive: hard maximum plus idle timeout
/// 4. `throttled` set: idle timeout with a minimum gap between uses
/// 5. `hard_timeout` set: hard timeout
/// 6. otherwise: always expired
///
/// A `remember_me` lifetime wraps the result so sessions created with the
/// `rememberMe` authentication attribute get a hard timeout of that length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketGrantingTicketConfig {
    /// Hard maximum session lifetime.
    #[serde(with = "humantime_serde", default = "default_tgt_max_time_to_live")]
    pub max_time_to_live: Duration,

    /// Idle timeout.
    #[serde(with = "humantime_serde", default = "default_tgt_time_to_kill")]
    pub time_to_kill: Duration,

    /// Plain idle timeout, overriding the max/idle pair.
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,

    /// Throttled-use policy.
    #[serde(default)]
    pub throttled: Option<ThrottledConfig>,

    /// Hard timeout policy.
    #[serde(with = "humantime_serde", default)]
    pub hard_timeout: Option<Duration>,

    /// Lifetime of remembered sessions.
    #[serde(with = "humantime_serde", default)]
    pub remember_me: Option<Duration>,
}

fn default_tgt_max_time_to_live() -> Duration {
    DEFAULT_TGT_MAX_TIME_TO_LIVE
}

fn default_tgt_time_to_kill() -> Duration {
    DEFAULT_TGT_TIME_TO_KILL
}

impl Default for TicketGrantingTicketConfig {
    fn default() -> Self {
        Self {
            max_time_to_live: DEFAULT_TGT_MAX_TIME_TO_LIVE,
            time_to_kill: DEFAULT_TGT_TIME_TO_KILL,
            timeout: None,
            throttled: None,
            hard_timeout: None,
            remember_me: None,
        }
    }
}

impl TicketGrantingTicketConfig {
    /// The session policy these settings describe.
    #[must_use]
    pub fn expiration_policy(&self) -> ExpirationPolicy {
        let max = self.max_time_to_live;
        let idle = self.time_to_kill;

        let policy = if max.is_zero() && idle.is_zero() {
            ExpirationPolicy::NeverExpires
        } else if let Some(idle_ttl) = self.timeout {
            ExpirationPolicy::IdleTimeout { idle_ttl }
        } else if !max.is_zero() && !idle.is_zero() {
            ExpirationPolicy::TicketGrantingTicket { max_ttl: max, idle_ttl: idle }
        } else if let Some(throttled) = &self.throttled {
            ExpirationPolicy::ThrottledUseAndTimeout {
                ttl: throttled.time_to_kill,
                time_in_between_uses: throttled.time_in_between_uses,
            }
        } else if let Some(ttl) = self.hard_timeout {
            ExpirationPolicy::HardTimeout { ttl }
        } else {
            ExpirationPolicy::AlwaysExpires
        };

        match self.remember_me {
            Some(ttl) => ExpirationPolicy::RememberMe {
                remember_me: Box::new(ExpirationPolicy::HardTimeout { ttl }),
                default: Box::new(policy),
            },
            None => policy,
        }
    }
}

/// Throttled-use session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottledConfig {
    /// Idle timeout.
    #[serde(with = "humantime_serde")]
    pub time_to_kill: Duration,

    /// Minimum time between two uses.
    #[serde(with = "humantime_serde")]
    pub time_in_between_uses: Duration,
}

/// Service or proxy ticket expiration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceTicketConfig {
    /// Number of validations allowed.
    #[serde(default = "default_number_of_uses")]
    pub number_of_uses: u32,

    /// Lifetime measured from the last use.
    #[serde(with = "humantime_serde", default = "default_st_time_to_kill")]
    pub time_to_kill: Duration,
}

fn default_number_of_uses() -> u32 {
    1
}

fn default_st_time_to_kill() -> Duration {
    DEFAULT_ST_TIME_TO_KILL
}

impl Default for ServiceTicketConfig {
    fn default() -> Self {
        Self { number_of_uses: 1, time_to_kill: DEFAULT_ST_TIME_TO_KILL }
    }
}

impl ServiceTicketConfig {
    /// The policy these settings describe.
    #[must_use]
    pub fn expiration_policy(&self) -> ExpirationPolicy {
        ExpirationPolicy::MultiTimeUseOrTimeout {
            number_of_uses: self.number_of_uses,
            ttl: self.time_to_kill,
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.number_of_uses == 0 {
            return Err(ConfigError::invalid(field, "number_of_uses must be at least 1"));
        }
        Ok(())
    }
}

/// Proxy-granting ticket expiration settings.
///
/// Without a `max_time_to_live` proxy-granting tickets use the session policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyGrantingTicketConfig {
    /// Hard lifetime of proxy-granting tickets.
    #[serde(with = "humantime_serde", default)]
    pub max_time_to_live: Option<Duration>,
}

impl ProxyGrantingTicketConfig {
    /// The policy these settings describe, given the session policy.
    #[must_use]
    pub fn expiration_policy(&self, session: &ExpirationPolicy) -> ExpirationPolicy {
        match self.max_time_to_live {
            Some(ttl) => ExpirationPolicy::HardTimeout { ttl },
            None => session.clone(),
        }
    }
}

/// OAuth token expiration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthTokenConfig {
    /// Hard maximum lifetime.
    #[serde(with = "humantime_serde", default = "default_tgt_max_time_to_live")]
    pub max_time_to_live: Duration,

    /// Idle timeout.
    #[serde(with = "humantime_serde", default = "default_tgt_time_to_kill")]
    pub time_to_kill: Duration,

    /// Let tokens outlive the session that minted them. Individual requests
    /// may override this.
    #[serde(default)]
    pub sovereign: bool,
}

impl Default for OAuthTokenConfig {
    fn default() -> Self {
        Self {
            max_time_to_live: DEFAULT_TGT_MAX_TIME_TO_LIVE,
            time_to_kill: DEFAULT_TGT_TIME_TO_KILL,
            sovereign: false,
        }
    }
}

impl OAuthTokenConfig {
    fn refresh_token_default() -> Self {
        Self {
            max_time_to_live: DEFAULT_REFRESH_TOKEN_MAX_TIME_TO_LIVE,
            time_to_kill: DEFAULT_REFRESH_TOKEN_MAX_TIME_TO_LIVE,
            sovereign: false,
        }
    }

    /// The policy these settings describe.
    #[must_use]
    pub fn expiration_policy(&self) -> ExpirationPolicy {
        let (max_ttl, idle_ttl) = (self.max_time_to_live, self.time_to_kill);
        if self.sovereign {
            ExpirationPolicy::Sovereign { max_ttl, idle_ttl }
        } else {
            ExpirationPolicy::Dependent { max_ttl, idle_ttl }
        }
    }
}

/// Ticket id settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketIdConfig {
    /// Node name appended to every id, usually the host name.
    #[serde(default)]
    pub suffix: Option<String>,
}

/// Expired-ticket sweep settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanerConfig {
    /// Whether the sweep runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time between sweeps.
    #[serde(with = "humantime_serde", default = "default_cleaner_interval")]
    pub interval: Duration,

    /// Delay before the first sweep.
    #[serde(with = "humantime_serde", default = "default_cleaner_start_delay")]
    pub start_delay: Duration,
}

fn default_cleaner_interval() -> Duration {
    DEFAULT_CLEANER_INTERVAL
}

fn default_cleaner_start_delay() -> Duration {
    DEFAULT_CLEANER_START_DELAY
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_CLEANER_INTERVAL,
            start_delay: DEFAULT_CLEANER_START_DELAY,
        }
    }
}
