//! Expiration policies.
//!
//! A policy is a pure function of a ticket's usage state and the current
//! time. Policies know nothing about ancestors: the "own policy OR parent
//! expired" rule of dependent tickets is applied by the ticket manager when
//! it resolves the chain through the registry.
//!
//! ```text
//!   NeverExpires / AlwaysExpires           constant
//!   HardTimeout { ttl }                    now - created   > ttl
//!   IdleTimeout { idle_ttl }               now - last_used > idle_ttl
//!   ThrottledUse { ttl }                   used at least once and idle > ttl
//!   MultiTimeUseOrTimeout { uses, ttl }    uses exhausted or idle > ttl
//!   TicketGrantingTicket { max, idle }     hard max or idle
//!   ThrottledUseAndTimeout { ttl, gap }    idle > ttl or reused within gap
//!   Dependent / Sovereign { max, idle }    hard max or idle (OAuth tokens)
//!   RememberMe { remember_me, default }    chosen by the authentication
//! ```

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::TicketState;

/// How long a ticket stays valid.
///
/// Serialized with an internal `type` tag and humantime durations:
///
/// ```
/// use casticket::ExpirationPolicy;
///
/// let policy: ExpirationPolicy =
///     serde_json::from_str(r#"{"type":"hard_timeout","ttl":"5s"}"#).unwrap();
/// assert_eq!(policy, ExpirationPolicy::HardTimeout { ttl: std::time::Duration::from_secs(5) });
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ExpirationPolicy {
    /// The ticket never expires on its own.
    NeverExpires,

    /// The ticket is expired from the moment it is created.
    AlwaysExpires,

    /// Expires a fixed time after creation.
    HardTimeout {
        /// Lifetime measured from creation.
        #[serde(with = "humantime_serde")]
        ttl: Duration,
    },

    /// Expires after a period without use.
    IdleTimeout {
        /// Maximum time between uses.
        #[serde(with = "humantime_serde")]
        idle_ttl: Duration,
    },

    /// Expires once used and then left idle for longer than `ttl`.
    ThrottledUse {
        /// Idle allowance after the first use.
        #[serde(with = "humantime_serde")]
        ttl: Duration,
    },

    /// Expires after `number_of_uses` uses or after `ttl` of idleness.
    MultiTimeUseOrTimeout {
        /// Number of permitted uses.
        number_of_uses: u32,
        /// Idle allowance.
        #[serde(with = "humantime_serde")]
        ttl: Duration,
    },

    /// Session policy: hard maximum lifetime plus an idle timeout.
    TicketGrantingTicket {
        /// Lifetime measured from creation.
        #[serde(with = "humantime_serde")]
        max_ttl: Duration,
        /// Maximum time between uses.
        #[serde(with = "humantime_serde")]
        idle_ttl: Duration,
    },

    /// Idle timeout that also rejects uses arriving too close together.
    ThrottledUseAndTimeout {
        /// Maximum time between uses.
        #[serde(with = "humantime_serde")]
        ttl: Duration,
        /// Minimum time between two consecutive uses.
        #[serde(with = "humantime_serde")]
        time_in_between_uses: Duration,
    },

    /// OAuth token policy that also expires with the issuing session.
    Dependent {
        /// Lifetime measured from creation.
        #[serde(with = "humantime_serde")]
        max_ttl: Duration,
        /// Maximum time between uses.
        #[serde(with = "humantime_serde")]
        idle_ttl: Duration,
    },

    /// OAuth token policy independent of the issuing session.
    Sovereign {
        /// Lifetime measured from creation.
        #[serde(with = "humantime_serde")]
        max_ttl: Duration,
        /// Maximum time between uses.
        #[serde(with = "humantime_serde")]
        idle_ttl: Duration,
    },

    /// Picks one of two policies from the authentication's `rememberMe` flag.
    RememberMe {
        /// Policy for remembered sessions.
        remember_me: Box<ExpirationPolicy>,
        /// Policy for everything else.
        default: Box<ExpirationPolicy>,
    },
}

impl ExpirationPolicy {
    /// Evaluates the policy against `state` at `now`.
    #[must_use]
    pub fn is_expired(&self, state: &dyn TicketState, now: DateTime<Utc>) -> bool {
        match self {
            Self::NeverExpires => false,
            Self::AlwaysExpires => true,
            Self::HardTimeout { ttl } => elapsed_exceeds(state.creation_time(), now, *ttl),
            Self::IdleTimeout { idle_ttl } => elapsed_exceeds(state.last_time_used(), now, *idle_ttl),
            Self::ThrottledUse { ttl } => {
                state.count_of_uses() > 0 && elapsed_exceeds(state.last_time_used(), now, *ttl)
            },
            Self::MultiTimeUseOrTimeout { number_of_uses, ttl } => {
                state.count_of_uses() >= *number_of_uses
                    || elapsed_exceeds(state.last_time_used(), now, *ttl)
            },
            Self::TicketGrantingTicket { max_ttl, idle_ttl }
            | Self::Dependent { max_ttl, idle_ttl }
            | Self::Sovereign { max_ttl, idle_ttl } => {
                elapsed_exceeds(state.creation_time(), now, *max_ttl)
                    || elapsed_exceeds(state.last_time_used(), now, *idle_ttl)
            },
            Self::ThrottledUseAndTimeout { ttl, time_in_between_uses } => {
                if elapsed_exceeds(state.last_time_used(), now, *ttl) {
                    return true;
                }
                let Ok(gap) = TimeDelta::from_std(*time_in_between_uses) else {
                    return false;
                };
                state
                    .previous_time_used()
                    .is_some_and(|previous| state.last_time_used().signed_duration_since(previous) < gap)
            },
            Self::RememberMe { remember_me, default } => {
                if state.authentication().is_remember_me() {
                    remember_me.is_expired(state, now)
                } else {
                    default.is_expired(state, now)
                }
            },
        }
    }

    /// Returns `true` when a ticket under this policy may be used again after
    /// the uses already recorded in `state`. Only a multi-use policy with uses
    /// left qualifies; every other policy treats the ticket as single use.
    #[must_use]
    pub fn permits_reuse(&self, state: &dyn TicketState) -> bool {
        match self {
            Self::MultiTimeUseOrTimeout { number_of_uses, .. } => state.count_of_uses() < *number_of_uses,
            Self::RememberMe { remember_me, default } => {
                if state.authentication().is_remember_me() {
                    remember_me.permits_reuse(state)
                } else {
                    default.permits_reuse(state)
                }
            },
            _ => false,
        }
    }

    /// Returns `true` when an OAuth token with this policy ignores the
    /// expiration of the session that issued it.
    #[must_use]
    pub fn is_sovereign(&self) -> bool {
        matches!(self, Self::Sovereign { .. })
    }
}

/// `now - since > limit`. A limit too large for chrono never elapses.
fn elapsed_exceeds(since: DateTime<Utc>, now: DateTime<Utc>, limit: Duration) -> bool {
    TimeDelta::from_std(limit).is_ok_and(|limit| now.signed_duration_since(since) > limit)
}
