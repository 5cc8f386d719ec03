//! Service and proxy tickets.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{TicketCore, ticket_state_via_core};
use crate::authentication::Service;

/// A single-use credential for one service, issued from a session.
///
/// Removed from the registry by its first successful validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceTicket {
    core: TicketCore,
    service: Service,
    grantor: String,
    from_new_login: bool,
}

ticket_state_via_core!(ServiceTicket);

impl ServiceTicket {
    pub(crate) fn new(core: TicketCore, service: Service, grantor: &str, from_new_login: bool) -> Self {
        Self { core, service, grantor: grantor.to_owned(), from_new_login }
    }

    pub(crate) fn core(&self) -> &TicketCore {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut TicketCore {
        &mut self.core
    }

    /// The service the ticket was issued for.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Id of the ticket-granting (or proxy-granting) ticket that issued it.
    #[must_use]
    pub fn grantor(&self) -> &str {
        &self.grantor
    }

    /// `true` if issued during the login that created the grantor.
    #[must_use]
    pub fn is_from_new_login(&self) -> bool {
        self.from_new_login
    }

    /// Returns `true` when `service` is the service this ticket was issued for.
    #[must_use]
    pub fn is_valid_for(&self, service: &Service) -> bool {
        self.service.matches(service)
    }
}

/// A service ticket issued through a proxy-granting ticket.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyTicket {
    ticket: ServiceTicket,
    proxies: Vec<Url>,
}

ticket_state_via_core!(ProxyTicket);

impl ProxyTicket {
    /// `proxies` is the grantor's chain, copied so the ticket stays
    /// self-contained after its grantor is gone.
    pub(crate) fn new(ticket: ServiceTicket, proxies: Vec<Url>) -> Self {
        Self { ticket, proxies }
    }

    pub(crate) fn core(&self) -> &TicketCore {
        self.ticket.core()
    }

    pub(crate) fn core_mut(&mut self) -> &mut TicketCore {
        self.ticket.core_mut()
    }

    /// The service-ticket part of this proxy ticket.
    #[must_use]
    pub fn service_ticket(&self) -> &ServiceTicket {
        &self.ticket
    }

    /// Callback URLs the request was proxied through, most recent first.
    #[must_use]
    pub fn proxies(&self) -> &[Url] {
        &self.proxies
    }
}
