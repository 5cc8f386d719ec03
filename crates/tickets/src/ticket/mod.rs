//! The ticket model.
//!
//! Every ticket kind shares the same usage state (id, authentication,
//! timestamps, use count, expiration policy) and adds its own references to
//! other tickets. References are ticket ids, never owned values: the
//! registry is the arena and the manager resolves ids on demand.
//!
//! ```text
//!   TicketGrantingTicket ──grants──► ServiceTicket ──authorizes──► ProxyGrantingTicket
//!          │                                                            │
//!          └──grants──► AccessToken / RefreshToken          grants──► ProxyTicket
//! ```
//!
//! Tickets handed out by this crate are read-only to callers: every field
//! is private, getters are public, and the mutators used during validation
//! and creation are `pub(crate)`.

mod granting;
mod oauth;
mod service;

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub use self::{
    granting::{ProxyGrantingTicket, TicketGrantingTicket},
    oauth::{GrantType, OAuthToken, ResponseType},
    service::{ProxyTicket, ServiceTicket},
};
pub(crate) use self::oauth::OAuthTokenFields;
use crate::{
    authentication::{Authentication, Service},
    expiration::ExpirationPolicy,
    id,
};

/// Read access to the usage state every ticket carries.
///
/// [`ExpirationPolicy::is_expired`] is evaluated against this trait.
pub trait TicketState {
    /// The ticket id.
    fn id(&self) -> &str;

    /// The authentication the ticket was issued for.
    fn authentication(&self) -> &Authentication;

    /// When the ticket was created.
    fn creation_time(&self) -> DateTime<Utc>;

    /// When the ticket was last used; equals the creation time until first use.
    fn last_time_used(&self) -> DateTime<Utc>;

    /// The use before the last one, if any.
    fn previous_time_used(&self) -> Option<DateTime<Utc>>;

    /// How many times the ticket has been used.
    fn count_of_uses(&self) -> u32;
}

/// Usage state shared by every ticket kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TicketCore {
    id: String,
    authentication: Authentication,
    creation_time: DateTime<Utc>,
    last_time_used: DateTime<Utc>,
    previous_time_used: Option<DateTime<Utc>>,
    count_of_uses: u32,
    expiration_policy: ExpirationPolicy,
}

impl TicketCore {
    pub(crate) fn new(
        id: String,
        authentication: Authentication,
        expiration_policy: ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            authentication,
            creation_time: now,
            last_time_used: now,
            previous_time_used: None,
            count_of_uses: 0,
            expiration_policy,
        }
    }

    pub(crate) fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.expiration_policy
    }

    /// Records one use at `now`. Time never moves backwards for a ticket.
    pub(crate) fn update(&mut self, now: DateTime<Utc>) {
        self.previous_time_used = Some(self.last_time_used);
        self.last_time_used = now.max(self.last_time_used);
        self.count_of_uses = self.count_of_uses.saturating_add(1);
    }
}

impl TicketState for TicketCore {
    fn id(&self) -> &str {
        &self.id
    }

    fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    fn last_time_used(&self) -> DateTime<Utc> {
        self.last_time_used
    }

    fn previous_time_used(&self) -> Option<DateTime<Utc>> {
        self.previous_time_used
    }

    fn count_of_uses(&self) -> u32 {
        self.count_of_uses
    }
}

/// Implements [`TicketState`], id-keyed equality and hashing for a type with
/// a `core()` accessor.
macro_rules! ticket_state_via_core {
    ($ty:ty) => {
        impl $crate::ticket::TicketState for $ty {
            fn id(&self) -> &str {
                $crate::ticket::TicketState::id(self.core())
            }

            fn authentication(&self) -> &$crate::authentication::Authentication {
                $crate::ticket::TicketState::authentication(self.core())
            }

            fn creation_time(&self) -> chrono::DateTime<chrono::Utc> {
                $crate::ticket::TicketState::creation_time(self.core())
            }

            fn last_time_used(&self) -> chrono::DateTime<chrono::Utc> {
                $crate::ticket::TicketState::last_time_used(self.core())
            }

            fn previous_time_used(&self) -> Option<chrono::DateTime<chrono::Utc>> {
                $crate::ticket::TicketState::previous_time_used(self.core())
            }

            fn count_of_uses(&self) -> u32 {
                $crate::ticket::TicketState::count_of_uses(self.core())
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::ticket::TicketState::id(self) == $crate::ticket::TicketState::id(other)
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash($crate::ticket::TicketState::id(self), state);
            }
        }
    };
}
pub(crate) use ticket_state_via_core;

/// The kinds of ticket the core issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    /// Login session.
    TicketGrantingTicket,
    /// Single-use ticket for one service.
    ServiceTicket,
    /// Session delegated to a proxying service.
    ProxyGrantingTicket,
    /// Single-use ticket issued through a proxy-granting ticket.
    ProxyTicket,
    /// OAuth access token.
    AccessToken,
    /// OAuth refresh token.
    RefreshToken,
}

impl TicketKind {
    /// Every kind, in issuance order.
    pub const ALL: [TicketKind; 6] = [
        Self::TicketGrantingTicket,
        Self::ServiceTicket,
        Self::ProxyGrantingTicket,
        Self::ProxyTicket,
        Self::AccessToken,
        Self::RefreshToken,
    ];

    /// The id prefix of this kind.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::TicketGrantingTicket => id::TICKET_GRANTING_TICKET_PREFIX,
            Self::ServiceTicket => id::SERVICE_TICKET_PREFIX,
            Self::ProxyGrantingTicket => id::PROXY_GRANTING_TICKET_PREFIX,
            Self::ProxyTicket => id::PROXY_TICKET_PREFIX,
            Self::AccessToken => id::ACCESS_TOKEN_PREFIX,
            Self::RefreshToken => id::REFRESH_TOKEN_PREFIX,
        }
    }

    /// Reads the kind from the leading token of a ticket id.
    ///
    /// ```
    /// use casticket::TicketKind;
    ///
    /// assert_eq!(TicketKind::from_ticket_id("PGT-12-abc"), Some(TicketKind::ProxyGrantingTicket));
    /// assert_eq!(TicketKind::from_ticket_id("PGTIOU-12-abc"), None);
    /// assert_eq!(TicketKind::from_ticket_id("garbage"), None);
    /// ```
    #[must_use]
    pub fn from_ticket_id(ticket_id: &str) -> Option<Self> {
        let (prefix, rest) = ticket_id.split_once('-')?;
        if rest.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    /// Returns `true` when a ticket of kind `actual` may be used where
    /// `self` is expected.
    ///
    /// A proxy-granting ticket is a ticket-granting ticket and a proxy
    /// ticket is a service ticket; every other pairing must match exactly.
    #[must_use]
    pub fn accepts(self, actual: TicketKind) -> bool {
        self == actual
            || matches!(
                (self, actual),
                (Self::TicketGrantingTicket, Self::ProxyGrantingTicket)
                    | (Self::ServiceTicket, Self::ProxyTicket)
            )
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A ticket of any kind, as stored in the registry.
///
/// Equality and hashing use the id only.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ticket {
    /// See [`TicketGrantingTicket`].
    TicketGranting(TicketGrantingTicket),
    /// See [`ProxyGrantingTicket`].
    ProxyGranting(ProxyGrantingTicket),
    /// See [`ServiceTicket`].
    Service(ServiceTicket),
    /// See [`ProxyTicket`].
    Proxy(ProxyTicket),
    /// See [`OAuthToken`].
    AccessToken(OAuthToken),
    /// See [`OAuthToken`].
    RefreshToken(OAuthToken),
}

impl Ticket {
    /// The kind of this ticket.
    #[must_use]
    pub fn kind(&self) -> TicketKind {
        match self {
            Self::TicketGranting(_) => TicketKind::TicketGrantingTicket,
            Self::ProxyGranting(_) => TicketKind::ProxyGrantingTicket,
            Self::Service(_) => TicketKind::ServiceTicket,
            Self::Proxy(_) => TicketKind::ProxyTicket,
            Self::AccessToken(_) => TicketKind::AccessToken,
            Self::RefreshToken(_) => TicketKind::RefreshToken,
        }
    }

    pub(crate) fn core(&self) -> &TicketCore {
        match self {
            Self::TicketGranting(t) => t.core(),
            Self::ProxyGranting(t) => t.core(),
            Self::Service(t) => t.core(),
            Self::Proxy(t) => t.core(),
            Self::AccessToken(t) | Self::RefreshToken(t) => t.core(),
        }
    }

    fn core_mut(&mut self) -> &mut TicketCore {
        match self {
            Self::TicketGranting(t) => t.core_mut(),
            Self::ProxyGranting(t) => t.core_mut(),
            Self::Service(t) => t.core_mut(),
            Self::Proxy(t) => t.core_mut(),
            Self::AccessToken(t) | Self::RefreshToken(t) => t.core_mut(),
        }
    }

    /// The policy attached at creation.
    #[must_use]
    pub fn expiration_policy(&self) -> &ExpirationPolicy {
        self.core().expiration_policy()
    }

    /// Evaluates only this ticket's own policy, ignoring ancestors.
    ///
    /// Ticket-granting tickets that were explicitly destroyed count as
    /// expired. Use the manager's `is_expired` for the full chain check.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let marked = self.as_ticket_granting().is_some_and(TicketGrantingTicket::is_marked_expired);
        marked || self.expiration_policy().is_expired(self, now)
    }

    /// `true` for ticket-granting tickets that are not proxy-granting.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::TicketGranting(_))
    }

    /// The session part of a TGT or PGT.
    #[must_use]
    pub fn as_ticket_granting(&self) -> Option<&TicketGrantingTicket> {
        match self {
            Self::TicketGranting(t) => Some(t),
            Self::ProxyGranting(t) => Some(t.granting()),
            _ => None,
        }
    }

    pub(crate) fn as_ticket_granting_mut(&mut self) -> Option<&mut TicketGrantingTicket> {
        match self {
            Self::TicketGranting(t) => Some(t),
            Self::ProxyGranting(t) => Some(t.granting_mut()),
            _ => None,
        }
    }

    /// The proxy-granting ticket, if this is one.
    #[must_use]
    pub fn as_proxy_granting(&self) -> Option<&ProxyGrantingTicket> {
        match self {
            Self::ProxyGranting(t) => Some(t),
            _ => None,
        }
    }

    /// The service-ticket part of an ST or PT.
    #[must_use]
    pub fn as_service_ticket(&self) -> Option<&ServiceTicket> {
        match self {
            Self::Service(t) => Some(t),
            Self::Proxy(t) => Some(t.service_ticket()),
            _ => None,
        }
    }

    /// The proxy ticket, if this is one.
    #[must_use]
    pub fn as_proxy_ticket(&self) -> Option<&ProxyTicket> {
        match self {
            Self::Proxy(t) => Some(t),
            _ => None,
        }
    }

    /// The OAuth token, if this is an access or refresh token.
    #[must_use]
    pub fn as_oauth_token(&self) -> Option<&OAuthToken> {
        match self {
            Self::AccessToken(t) | Self::RefreshToken(t) => Some(t),
            _ => None,
        }
    }

    /// The service an ST, PT or OAuth token was issued for.
    #[must_use]
    pub fn service(&self) -> Option<&Service> {
        match self {
            Self::Service(t) => Some(t.service()),
            Self::Proxy(t) => Some(t.service_ticket().service()),
            Self::AccessToken(t) | Self::RefreshToken(t) => Some(t.service()),
            Self::TicketGranting(_) | Self::ProxyGranting(_) => None,
        }
    }

    /// The id of the ticket whose expiration bounds this one.
    ///
    /// For a PGT this is its parent service ticket; the manager falls back
    /// to [`ProxyGrantingTicket::grantor`] once that ticket is consumed.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::TicketGranting(_) => None,
            Self::ProxyGranting(t) => Some(t.parent()),
            Self::Service(t) => Some(t.grantor()),
            Self::Proxy(t) => Some(t.service_ticket().grantor()),
            Self::AccessToken(t) | Self::RefreshToken(t) => t.ticket_granting_ticket(),
        }
    }

    /// Proxy callback URLs this ticket was delegated through, most recent first.
    #[must_use]
    pub fn proxies(&self) -> &[Url] {
        match self {
            Self::ProxyGranting(t) => t.proxies(),
            Self::Proxy(t) => t.proxies(),
            _ => &[],
        }
    }

    /// Records one use of the ticket at `now`.
    pub(crate) fn update_usage(&mut self, now: DateTime<Utc>) {
        self.core_mut().update(now);
    }
}

impl TicketState for Ticket {
    fn id(&self) -> &str {
        self.core().id()
    }

    fn authentication(&self) -> &Authentication {
        self.core().authentication()
    }

    fn creation_time(&self) -> DateTime<Utc> {
        self.core().creation_time()
    }

    fn last_time_used(&self) -> DateTime<Utc> {
        self.core().last_time_used()
    }

    fn previous_time_used(&self) -> Option<DateTime<Utc>> {
        self.core().previous_time_used()
    }

    fn count_of_uses(&self) -> u32 {
        self.core().count_of_uses()
    }
}

impl PartialEq for Ticket {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Ticket {}

impl Hash for Ticket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
