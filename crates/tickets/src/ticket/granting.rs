//! Ticket-granting and proxy-granting tickets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use url::Url;

use super::{TicketCore, ticket_state_via_core};
use crate::{
    authentication::Service,
    error::{TicketError, TicketResult},
};

/// A login session.
///
/// Tracks the ids of every ticket issued from it so that destroying the
/// session can revoke them, and the service each service ticket was issued
/// for.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketGrantingTicket {
    core: TicketCore,
    #[serde(default)]
    expired: bool,
    #[serde(default)]
    descendants: BTreeSet<String>,
    #[serde(default)]
    services: BTreeMap<String, Service>,
}

ticket_state_via_core!(TicketGrantingTicket);

impl TicketGrantingTicket {
    pub(crate) fn new(core: TicketCore) -> Self {
        Self {
            core,
            expired: false,
            descendants: BTreeSet::new(),
            services: BTreeMap::new(),
        }
    }

    pub(crate) fn core(&self) -> &TicketCore {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut TicketCore {
        &mut self.core
    }

    /// `true` once the session has been explicitly destroyed.
    #[must_use]
    pub fn is_marked_expired(&self) -> bool {
        self.expired
    }

    /// Ids of the tickets issued from this session.
    pub fn descendant_ids(&self) -> impl Iterator<Item = &str> {
        self.descendants.iter().map(String::as_str)
    }

    /// Service tickets issued from this session, keyed by ticket id.
    #[must_use]
    pub fn services(&self) -> &BTreeMap<String, Service> {
        &self.services
    }

    pub(crate) fn mark_expired(&mut self) {
        self.expired = true;
    }

    pub(crate) fn record_descendant(&mut self, ticket_id: impl Into<String>) {
        self.descendants.insert(ticket_id.into());
    }

    pub(crate) fn take_descendants(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.descendants)
    }

    /// Remembers that `ticket_id` was issued for `service`.
    ///
    /// With `only_track_most_recent` an earlier entry for an equivalent
    /// service is dropped first, so each service keeps one session entry.
    pub(crate) fn track_service_session(
        &mut self,
        ticket_id: &str,
        service: &Service,
        only_track_most_recent: bool,
    ) {
        if only_track_most_recent {
            self.services.retain(|_, existing| !existing.matches(service));
        }
        self.services.insert(ticket_id.to_owned(), service.clone());
    }
}

/// A session delegated to a proxying service.
///
/// Created from a validated service (or proxy) ticket. Its own expiration
/// is bounded by that parent ticket; the proxy callback URL must be https.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "StoredProxyGrantingTicket")]
pub struct ProxyGrantingTicket {
    granting: TicketGrantingTicket,
    parent: String,
    grantor: String,
    proxy_id: Url,
    pgt_iou: String,
    proxied_by: Service,
    proxies: Vec<Url>,
}

ticket_state_via_core!(ProxyGrantingTicket);

/// Wire shape of [`ProxyGrantingTicket`]; converted through the same checks
/// as a freshly built ticket.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredProxyGrantingTicket {
    granting: TicketGrantingTicket,
    parent: String,
    grantor: String,
    proxy_id: Url,
    pgt_iou: String,
    proxied_by: Service,
    proxies: Vec<Url>,
}

impl TryFrom<StoredProxyGrantingTicket> for ProxyGrantingTicket {
    type Error = TicketError;

    fn try_from(stored: StoredProxyGrantingTicket) -> TicketResult<Self> {
        check_delegation(&stored.parent, &stored.grantor, &stored.proxy_id, &stored.pgt_iou)?;
        if stored.proxies.first() != Some(&stored.proxy_id) {
            return Err(TicketError::proxy_construction("proxy chain must start with the proxy callback"));
        }
        Ok(Self {
            granting: stored.granting,
            parent: stored.parent,
            grantor: stored.grantor,
            proxy_id: stored.proxy_id,
            pgt_iou: stored.pgt_iou,
            proxied_by: stored.proxied_by,
            proxies: stored.proxies,
        })
    }
}

fn check_delegation(parent: &str, grantor: &str, proxy_id: &Url, pgt_iou: &str) -> TicketResult<()> {
    if parent.is_empty() || grantor.is_empty() {
        return Err(TicketError::proxy_construction("parent ticket is required"));
    }
    if pgt_iou.is_empty() {
        return Err(TicketError::proxy_construction("pgtIou is required"));
    }
    if proxy_id.scheme() != "https" {
        return Err(TicketError::proxy_construction(format!("proxy callback must use https: {proxy_id}")));
    }
    Ok(())
}

impl ProxyGrantingTicket {
    /// Validates the delegation arguments and builds the ticket.
    ///
    /// `upstream_proxies` is the chain of the parent ticket (empty for a
    /// plain service ticket); this ticket's callback is prepended to it.
    pub(crate) fn new(
        core: TicketCore,
        parent: &str,
        grantor: &str,
        proxy_id: Url,
        pgt_iou: String,
        proxied_by: Service,
        upstream_proxies: &[Url],
    ) -> TicketResult<Self> {
        check_delegation(parent, grantor, &proxy_id, &pgt_iou)?;

        let mut proxies = Vec::with_capacity(upstream_proxies.len() + 1);
        proxies.push(proxy_id.clone());
        proxies.extend_from_slice(upstream_proxies);

        Ok(Self {
            granting: TicketGrantingTicket::new(core),
            parent: parent.to_owned(),
            grantor: grantor.to_owned(),
            proxy_id,
            pgt_iou,
            proxied_by,
            proxies,
        })
    }

    pub(crate) fn core(&self) -> &TicketCore {
        self.granting.core()
    }

    pub(crate) fn core_mut(&mut self) -> &mut TicketCore {
        self.granting.core_mut()
    }

    /// The session state shared with ticket-granting tickets.
    #[must_use]
    pub fn granting(&self) -> &TicketGrantingTicket {
        &self.granting
    }

    pub(crate) fn granting_mut(&mut self) -> &mut TicketGrantingTicket {
        &mut self.granting
    }

    /// The service or proxy ticket that authorized this delegation.
    #[must_use]
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// The ticket that granted [`parent`](Self::parent).
    #[must_use]
    pub fn grantor(&self) -> &str {
        &self.grantor
    }

    /// The https callback the ticket is delivered to.
    #[must_use]
    pub fn proxy_id(&self) -> &Url {
        &self.proxy_id
    }

    /// Correlation token handed to the proxying service instead of the id.
    #[must_use]
    pub fn pgt_iou(&self) -> &str {
        &self.pgt_iou
    }

    /// The service that requested the delegation.
    #[must_use]
    pub fn proxied_by(&self) -> &Service {
        &self.proxied_by
    }

    /// Callback URLs of this ticket and every upstream proxy, most recent first.
    #[must_use]
    pub fn proxies(&self) -> &[Url] {
        &self.proxies
    }
}
