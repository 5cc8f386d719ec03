//! The central ticket service.
//!
//! [`CentralTicketService`] issues, validates and destroys tickets on top of
//! a [`TicketRegistry`]. It owns the rules that span more than one ticket:
//!
//! - expiration is evaluated along the whole grantor chain, so a service
//!   ticket dies with its session;
//! - service and proxy tickets are consumed by their first successful
//!   validation, and the registry's atomic removal decides the winner when
//!   validations race;
//! - destroying a session destroys everything issued from it.
//!
//! # Validation
//!
//! Every `validate_*` call runs the same steps under the ticket's lock:
//!
//! 1. look the ticket up; a missing ticket or one of the wrong kind is invalid;
//! 2. evaluate the chain; an expired ticket is removed and reported invalid;
//! 3. record the use;
//! 4. service and proxy tickets are removed, and the removal must succeed;
//!    only a multi-use service ticket with uses left is written back, as are
//!    all other kinds.
//!
//! Rejections are always [`TicketError::InvalidTicket`] without a reason.
//!
//! # Locking
//!
//! Locks are taken parent first. Issuing a ticket locks only its grantor;
//! the cascading delete locks the session and then each descendant in turn.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use fail::fail_point;
use tracing::{debug, warn};

use crate::{
    authentication::{Authentication, Service},
    clock::Clock,
    config::TicketConfig,
    error::{TicketError, TicketResult},
    factory::{OAuthTokenRequest, TicketFactory, TicketRequest},
    lock::TicketLocks,
    proxy::{ProxyCallbackClient, callback_url},
    registry::{RegistryError, TicketRegistry},
    ticket::{Ticket, TicketKind, TicketState},
};

/// Default bound on a proxy callback round trip.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest grantor chain evaluated before a ticket is treated as expired.
const MAX_CHAIN_DEPTH: usize = 64;

const SESSION_KINDS: &[TicketKind] = &[TicketKind::TicketGrantingTicket, TicketKind::ProxyGrantingTicket];
const ROOT_SESSION: &[TicketKind] = &[TicketKind::TicketGrantingTicket];
const PROXY_GRANTING: &[TicketKind] = &[TicketKind::ProxyGrantingTicket];
const SERVICE: &[TicketKind] = &[TicketKind::ServiceTicket];
const PROXY: &[TicketKind] = &[TicketKind::ProxyTicket];
const SERVICE_OR_PROXY: &[TicketKind] = &[TicketKind::ServiceTicket, TicketKind::ProxyTicket];
const ACCESS_TOKEN: &[TicketKind] = &[TicketKind::AccessToken];
const REFRESH_TOKEN: &[TicketKind] = &[TicketKind::RefreshToken];

/// Issues, validates and destroys tickets.
///
/// # Cloning
///
/// Clones share the registry, the factory and the lock table.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use casticket::{
///     Authentication, CentralTicketService, Principal, Service, SystemClock, TicketConfig,
///     TicketState, registry::MemoryTicketRegistry,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let tickets = CentralTicketService::from_config(
///         &TicketConfig::default(),
///         Arc::new(MemoryTicketRegistry::new()),
///         Arc::new(SystemClock),
///     );
///
///     let authentication = Authentication::builder().principal(Principal::new("alice")).build();
///     let tgt = tickets.create_ticket_granting_ticket(authentication).await?;
///     let st = tickets
///         .create_service_ticket(tgt.id(), Service::new("https://app.example.org"), true)
///         .await?;
///
///     let validated = tickets.validate_service_ticket(st.id()).await?;
///     assert_eq!(validated.authentication().principal.id, "alice");
///     assert!(tickets.validate_service_ticket(st.id()).await.is_err());
///     Ok(())
/// }
/// ```
#[derive(Clone, bon::Builder)]
pub struct CentralTicketService {
    registry: Arc<dyn TicketRegistry>,
    factory: Arc<TicketFactory>,
    #[builder(skip)]
    locks: TicketLocks,
    proxy_callback: Option<Arc<dyn ProxyCallbackClient>>,
    #[builder(default = DEFAULT_CALLBACK_TIMEOUT)]
    callback_timeout: Duration,
    #[builder(default = true)]
    only_track_most_recent_session: bool,
}

impl fmt::Debug for CentralTicketService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CentralTicketService")
            .field("factory", &self.factory)
            .field("proxy_callback", &self.proxy_callback.is_some())
            .field("callback_timeout", &self.callback_timeout)
            .field("only_track_most_recent_session", &self.only_track_most_recent_session)
            .finish_non_exhaustive()
    }
}

impl CentralTicketService {
    /// Creates a service with default settings and no proxy callback client.
    #[must_use]
    pub fn new(registry: Arc<dyn TicketRegistry>, factory: Arc<TicketFactory>) -> Self {
        Self::builder().registry(registry).factory(factory).build()
    }

    /// Creates a service whose factory is configured from `config`.
    #[must_use]
    pub fn from_config(config: &TicketConfig, registry: Arc<dyn TicketRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self::builder()
            .registry(registry)
            .factory(Arc::new(TicketFactory::from_config(config, clock)))
            .only_track_most_recent_session(config.only_track_most_recent_session)
            .build()
    }

    /// Attaches the client used to deliver proxy-granting tickets.
    #[must_use]
    pub fn with_proxy_callback(mut self, client: Arc<dyn ProxyCallbackClient>) -> Self {
        self.proxy_callback = Some(client);
        self
    }

    /// The ticket factory.
    #[must_use]
    pub fn factory(&self) -> &TicketFactory {
        &self.factory
    }

    fn now(&self) -> DateTime<Utc> {
        self.factory.clock().now()
    }

    // ------------------------------------------------------------------
    // Issuance
    // ------------------------------------------------------------------

    /// Starts a login session.
    ///
    /// # Errors
    ///
    /// Factory or registry failures.
    #[tracing::instrument(skip(self, authentication), fields(principal = %authentication.principal.id))]
    pub async fn create_ticket_granting_ticket(&self, authentication: Authentication) -> TicketResult<Ticket> {
        let ticket = self.factory.create(TicketRequest::TicketGranting { authentication })?;
        self.registry.add_ticket(ticket.clone()).await?;
        debug!(ticket_id = %ticket.id(), "ticket created");
        Ok(ticket)
    }

    /// Issues a service ticket from a valid session.
    ///
    /// The session's use count is bumped and the service is recorded in its
    /// service map.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if `tgt_id` is not a live
    /// ticket-granting ticket.
    #[tracing::instrument(skip(self, service), fields(service = %service))]
    pub async fn create_service_ticket(
        &self,
        tgt_id: &str,
        service: Service,
        credentials_provided: bool,
    ) -> TicketResult<Ticket> {
        self.issue_descendant(tgt_id, ROOT_SESSION, Some(&service), |grantor| {
            self.factory.create(TicketRequest::Service {
                grantor,
                service: service.clone(),
                credentials_provided,
            })
        })
        .await
    }

    /// Delegates a session to the service that validated `st_id`.
    ///
    /// `st_id` may name a service or proxy ticket and must not be consumed
    /// or expired yet. The new ticket is recorded under that ticket's
    /// grantor, so it is destroyed with the session.
    ///
    /// # Errors
    ///
    /// - [`TicketError::InvalidTicket`] if the parent ticket or its grantor is
    ///   not live.
    /// - [`TicketError::ProxyConstruction`] if `proxy_id` is not an https URL.
    #[tracing::instrument(skip(self, proxied_by), fields(proxied_by = %proxied_by))]
    pub async fn create_proxy_granting_ticket(
        &self,
        st_id: &str,
        proxied_by: Service,
        proxy_id: &str,
    ) -> TicketResult<Ticket> {
        let parent = self.lookup(st_id, SERVICE_OR_PROXY).await?;
        if self.is_expired(&parent).await? {
            return Err(TicketError::invalid_ticket(st_id));
        }
        let grantor_id = parent
            .as_service_ticket()
            .map(|ticket| ticket.grantor().to_owned())
            .ok_or_else(|| TicketError::invalid_ticket(st_id))?;

        self.issue_descendant(&grantor_id, SESSION_KINDS, None, |_| {
            self.factory.create(TicketRequest::ProxyGranting {
                parent: &parent,
                proxied_by: proxied_by.clone(),
                proxy_id,
            })
        })
        .await
    }

    /// Issues a proxy ticket from a valid proxy-granting ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if `pgt_id` is not live.
    #[tracing::instrument(skip(self, service), fields(service = %service))]
    pub async fn create_proxy_ticket(&self, pgt_id: &str, service: Service) -> TicketResult<Ticket> {
        self.issue_descendant(pgt_id, PROXY_GRANTING, Some(&service), |grantor| {
            self.factory.create(TicketRequest::Proxy { grantor, service: service.clone() })
        })
        .await
    }

    /// Issues an OAuth access token.
    ///
    /// When the request names a session, that session must be live and the
    /// token is recorded as one of its descendants unless it is sovereign.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if the named session is not live.
    #[tracing::instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create_access_token(&self, request: OAuthTokenRequest) -> TicketResult<Ticket> {
        self.issue_token(request, TicketRequest::AccessToken).await
    }

    /// Issues an OAuth refresh token. See [`create_access_token`](Self::create_access_token).
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if the named session is not live.
    #[tracing::instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create_refresh_token(&self, request: OAuthTokenRequest) -> TicketResult<Ticket> {
        self.issue_token(request, TicketRequest::RefreshToken).await
    }

    async fn issue_token(
        &self,
        request: OAuthTokenRequest,
        wrap: fn(OAuthTokenRequest) -> TicketRequest<'static>,
    ) -> TicketResult<Ticket> {
        match request.ticket_granting_ticket.clone() {
            Some(tgt_id) => {
                self.issue_descendant(&tgt_id, ROOT_SESSION, None, move |_| self.factory.create(wrap(request)))
                    .await
            },
            None => {
                let ticket = self.factory.create(wrap(request))?;
                self.registry.add_ticket(ticket.clone()).await?;
                debug!(ticket_id = %ticket.id(), "ticket created");
                Ok(ticket)
            },
        }
    }

    /// Builds and stores a ticket issued by `grantor_id`, then records it on
    /// the grantor. A grantor that cannot be updated rolls the child back.
    async fn issue_descendant<F>(
        &self,
        grantor_id: &str,
        allowed: &[TicketKind],
        session: Option<&Service>,
        build: F,
    ) -> TicketResult<Ticket>
    where
        F: FnOnce(&Ticket) -> TicketResult<Ticket>,
    {
        let _guard = self.locks.lock(grantor_id).await;

        let mut grantor = self.lookup(grantor_id, allowed).await?;
        if self.is_expired(&grantor).await? {
            debug!(ticket_id = %grantor_id, "grantor expired");
            self.remove_ticket(grantor).await?;
            return Err(TicketError::invalid_ticket(grantor_id));
        }

        let child = build(&grantor)?;
        self.registry.add_ticket(child.clone()).await?;

        let now = self.now();
        let only_most_recent = self.only_track_most_recent_session;
        let record = !child.expiration_policy().is_sovereign();
        if let Some(granting) = grantor.as_ticket_granting_mut() {
            if record {
                granting.record_descendant(child.id());
            }
            if let Some(service) = session {
                granting.track_service_session(child.id(), service, only_most_recent);
            }
        }
        if session.is_some() {
            grantor.update_usage(now);
        }

        let updated = async {
            fail_point!("issue-before-grantor-update", |_| {
                Err(RegistryError::internal("injected failure before grantor update"))
            });
            self.registry.update_ticket(grantor).await
        };
        if let Err(err) = updated.await {
            warn!(ticket_id = %child.id(), error = %err, "grantor update failed; rolling back ticket");
            if let Err(rollback) = self.registry.delete_ticket(child.id()).await {
                warn!(ticket_id = %child.id(), error = %rollback, "rollback failed");
            }
            return Err(match err {
                RegistryError::NotFound { .. } => TicketError::invalid_ticket(grantor_id),
                other => other.into(),
            });
        }

        debug!(ticket_id = %child.id(), grantor = %grantor_id, "ticket created");
        Ok(child)
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Validates a session. Proxy-granting tickets are accepted.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if the ticket is unknown, of another
    /// kind or expired.
    #[tracing::instrument(skip(self))]
    pub async fn validate_ticket_granting_ticket(&self, id: &str) -> TicketResult<Ticket> {
        self.validate(id, SESSION_KINDS).await
    }

    /// Validates and consumes a service ticket.
    ///
    /// Proxy tickets are rejected; use
    /// [`validate_proxy_ticket`](Self::validate_proxy_ticket).
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if the ticket is unknown, of another
    /// kind, expired or already consumed.
    #[tracing::instrument(skip(self))]
    pub async fn validate_service_ticket(&self, id: &str) -> TicketResult<Ticket> {
        self.validate(id, SERVICE).await
    }

    /// Validates and consumes a service ticket presented by `service`.
    ///
    /// The ticket is consumed even when the service does not match.
    ///
    /// # Errors
    ///
    /// - [`TicketError::InvalidTicket`] as for
    ///   [`validate_service_ticket`](Self::validate_service_ticket).
    /// - [`TicketError::ServiceMismatch`] if the ticket was issued for another
    ///   service.
    #[tracing::instrument(skip(self, service), fields(service = %service))]
    pub async fn validate_service_ticket_for(&self, id: &str, service: &Service) -> TicketResult<Ticket> {
        let ticket = self.validate(id, SERVICE).await?;
        match ticket.as_service_ticket() {
            Some(st) if st.is_valid_for(service) => Ok(ticket),
            _ => {
                debug!(ticket_id = %id, "service mismatch");
                Err(TicketError::service_mismatch(id))
            },
        }
    }

    /// Validates and consumes a proxy ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if the ticket is unknown, of another
    /// kind, expired or already consumed.
    #[tracing::instrument(skip(self))]
    pub async fn validate_proxy_ticket(&self, id: &str) -> TicketResult<Ticket> {
        self.validate(id, PROXY).await
    }

    /// Validates a proxy-granting ticket.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if the ticket is unknown, of another
    /// kind or expired.
    #[tracing::instrument(skip(self))]
    pub async fn validate_proxy_granting_ticket(&self, id: &str) -> TicketResult<Ticket> {
        self.validate(id, PROXY_GRANTING).await
    }

    /// Validates an OAuth access token.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if the token is unknown or expired.
    #[tracing::instrument(skip(self))]
    pub async fn validate_access_token(&self, id: &str) -> TicketResult<Ticket> {
        self.validate(id, ACCESS_TOKEN).await
    }

    /// Validates an OAuth refresh token.
    ///
    /// # Errors
    ///
    /// [`TicketError::InvalidTicket`] if the token is unknown or expired.
    #[tracing::instrument(skip(self))]
    pub async fn validate_refresh_token(&self, id: &str) -> TicketResult<Ticket> {
        self.validate(id, REFRESH_TOKEN).await
    }

    async fn validate(&self, id: &str, allowed: &[TicketKind]) -> TicketResult<Ticket> {
        let _guard = self.locks.lock(id).await;

        let mut ticket = self.lookup(id, allowed).await?;
        if self.is_expired(&ticket).await? {
            debug!(ticket_id = %id, "ticket expired");
            self.remove_ticket(ticket).await?;
            return Err(TicketError::invalid_ticket(id));
        }

        let now = self.now();
        ticket.update_usage(now);

        let consume = ticket.as_service_ticket().is_some()
            && (ticket.is_expired_at(now) || !ticket.expiration_policy().permits_reuse(&ticket));
        if consume {
            fail_point!("validate-before-consume", |_| {
                Err(TicketError::Registry(RegistryError::internal("injected failure before consume")))
            });
            if !self.registry.delete_ticket(id).await? {
                debug!(ticket_id = %id, "ticket consumed concurrently");
                return Err(TicketError::invalid_ticket(id));
            }
            debug!(ticket_id = %id, "ticket consumed");
        } else {
            match self.registry.update_ticket(ticket.clone()).await {
                Ok(()) => {},
                Err(RegistryError::NotFound { .. }) => return Err(TicketError::invalid_ticket(id)),
                Err(err) => return Err(err.into()),
            }
        }

        Ok(ticket)
    }

    async fn lookup(&self, id: &str, allowed: &[TicketKind]) -> TicketResult<Ticket> {
        match self.registry.get_ticket(id).await? {
            Some(ticket) if allowed.contains(&ticket.kind()) => Ok(ticket),
            _ => Err(TicketError::invalid_ticket(id)),
        }
    }

    /// Evaluates `ticket` and every ticket bounding it.
    ///
    /// A ticket is expired when its own policy says so, when it is a
    /// destroyed session, or when any ancestor is expired or missing.
    /// Service and proxy tickets are bounded by their grantor, proxy-granting
    /// tickets by their parent ticket (or its grantor once the parent is
    /// consumed) and non-sovereign OAuth tokens by their session.
    ///
    /// # Errors
    ///
    /// Registry failures while resolving ancestors.
    #[tracing::instrument(skip(self, ticket), fields(ticket_id = %ticket.id()))]
    pub async fn is_expired(&self, ticket: &Ticket) -> TicketResult<bool> {
        let now = self.now();
        if ticket.is_expired_at(now) {
            return Ok(true);
        }

        let mut parents = bounding_parents(ticket);
        for _ in 0..MAX_CHAIN_DEPTH {
            if parents.is_empty() {
                return Ok(false);
            }
            let Some(parent) = self.first_present(&parents).await? else {
                debug!(ancestor = %parents.join(","), "ancestor missing");
                return Ok(true);
            };
            if parent.is_expired_at(now) {
                return Ok(true);
            }
            parents = bounding_parents(&parent);
        }

        warn!("ticket chain exceeds maximum depth");
        Ok(true)
    }

    async fn first_present(&self, ids: &[String]) -> TicketResult<Option<Ticket>> {
        for id in ids {
            if let Some(ticket) = self.registry.get_ticket(id).await? {
                return Ok(Some(ticket));
            }
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Destruction
    // ------------------------------------------------------------------

    /// Removes a ticket. Sessions take every descendant with them.
    ///
    /// Returns `false` if the ticket was already gone.
    ///
    /// # Errors
    ///
    /// Registry failures while removing the ticket itself; failures on
    /// descendants are logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn delete_ticket(&self, id: &str) -> TicketResult<bool> {
        let _guard = self.locks.lock(id).await;
        match self.registry.get_ticket(id).await? {
            Some(ticket) => self.remove_ticket(ticket).await,
            None => Ok(false),
        }
    }

    /// Removes `ticket`. See [`delete_ticket`](Self::delete_ticket).
    ///
    /// # Errors
    ///
    /// As for [`delete_ticket`](Self::delete_ticket).
    pub async fn delete(&self, ticket: &Ticket) -> TicketResult<bool> {
        self.delete_ticket(ticket.id()).await
    }

    /// Removes a ticket whose lock the caller holds.
    async fn remove_ticket(&self, mut ticket: Ticket) -> TicketResult<bool> {
        let mut pending = Vec::new();
        if let Some(granting) = ticket.as_ticket_granting_mut() {
            granting.mark_expired();
            pending.extend(granting.take_descendants());
            match self.registry.update_ticket(ticket.clone()).await {
                Ok(()) | Err(RegistryError::NotFound { .. }) => {},
                Err(err) => warn!(ticket_id = %ticket.id(), error = %err, "failed to mark session expired"),
            }
        }

        if !pending.is_empty() {
            debug!(ticket_id = %ticket.id(), descendants = pending.len(), "cascade delete");
        }
        while let Some(child_id) = pending.pop() {
            let _guard = self.locks.lock(&child_id).await;
            let mut child = match self.registry.get_ticket(&child_id).await {
                Ok(Some(child)) => child,
                Ok(None) => continue,
                Err(err) => {
                    warn!(ticket_id = %child_id, error = %err, "failed to load descendant");
                    continue;
                },
            };
            if let Some(granting) = child.as_ticket_granting_mut() {
                granting.mark_expired();
                pending.extend(granting.take_descendants());
            }
            if let Err(err) = self.registry.delete_ticket(&child_id).await {
                warn!(ticket_id = %child_id, error = %err, "failed to delete descendant");
            }
        }

        let removed = self.registry.delete_ticket(ticket.id()).await?;
        if removed {
            debug!(ticket_id = %ticket.id(), "ticket deleted");
        }
        Ok(removed)
    }

    /// Removes every expired ticket in the registry.
    ///
    /// Returns the number of tickets removed directly; descendants removed by
    /// a cascade are not counted.
    ///
    /// # Errors
    ///
    /// Registry failures.
    #[tracing::instrument(skip(self))]
    pub async fn clean_expired(&self) -> TicketResult<usize> {
        let mut removed = 0;
        for snapshot in self.registry.get_tickets().await? {
            let id = snapshot.id();
            let _guard = self.locks.lock(id).await;
            let Some(ticket) = self.registry.get_ticket(id).await? else {
                continue;
            };
            if self.is_expired(&ticket).await? && self.remove_ticket(ticket).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "expired tickets removed");
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Proxy delivery
    // ------------------------------------------------------------------

    /// Sends a proxy-granting ticket to its callback.
    ///
    /// Returns the IOU when the callback accepted the ticket and `None` when
    /// it failed, timed out, or no callback client is configured.
    #[tracing::instrument(skip(self, pgt), fields(ticket_id = %pgt.id()))]
    pub async fn deliver_proxy_granting_ticket(&self, pgt: &Ticket) -> Option<String> {
        let proxy = pgt.as_proxy_granting()?;
        let Some(client) = &self.proxy_callback else {
            debug!("no proxy callback client configured");
            return None;
        };

        let url = callback_url(proxy.proxy_id(), proxy.pgt_iou(), pgt.id());
        match tokio::time::timeout(self.callback_timeout, client.send(&url)).await {
            Ok(Ok(())) => {
                debug!(proxy_id = %proxy.proxy_id(), "proxy granting ticket delivered");
                Some(proxy.pgt_iou().to_owned())
            },
            Ok(Err(err)) => {
                warn!(proxy_id = %proxy.proxy_id(), error = %err, "proxy callback failed");
                None
            },
            Err(_) => {
                warn!(proxy_id = %proxy.proxy_id(), timeout = ?self.callback_timeout, "proxy callback timed out");
                None
            },
        }
    }

    /// Creates a proxy-granting ticket and delivers it.
    ///
    /// Returns the IOU on success. A ticket the callback did not accept is
    /// deleted again and `None` is returned.
    ///
    /// # Errors
    ///
    /// As for [`create_proxy_granting_ticket`](Self::create_proxy_granting_ticket).
    #[tracing::instrument(skip(self, proxied_by), fields(proxied_by = %proxied_by))]
    pub async fn grant_proxy_granting_ticket(
        &self,
        st_id: &str,
        proxied_by: Service,
        proxy_id: &str,
    ) -> TicketResult<Option<String>> {
        let pgt = self.create_proxy_granting_ticket(st_id, proxied_by, proxy_id).await?;
        if let Some(iou) = self.deliver_proxy_granting_ticket(&pgt).await {
            return Ok(Some(iou));
        }
        self.delete(&pgt).await?;
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Reads a ticket without validating it.
    ///
    /// # Errors
    ///
    /// Registry failures.
    pub async fn get_ticket(&self, id: &str) -> TicketResult<Option<Ticket>> {
        Ok(self.registry.get_ticket(id).await?)
    }

    /// Number of stored sessions, proxy-granting tickets included.
    ///
    /// # Errors
    ///
    /// Registry failures.
    pub async fn session_count(&self) -> TicketResult<usize> {
        Ok(self.registry.session_count().await?)
    }

    /// Number of stored service tickets, proxy tickets included.
    ///
    /// # Errors
    ///
    /// Registry failures.
    pub async fn service_ticket_count(&self) -> TicketResult<usize> {
        Ok(self.registry.service_ticket_count().await?)
    }
}

/// Ids of the tickets whose expiration bounds `ticket`, in lookup order.
/// The first one still stored is used.
fn bounding_parents(ticket: &Ticket) -> Vec<String> {
    match ticket {
        Ticket::TicketGranting(_) => Vec::new(),
        Ticket::ProxyGranting(pgt) => vec![pgt.parent().to_owned(), pgt.grantor().to_owned()],
        Ticket::Service(_) | Ticket::Proxy(_) => ticket.parent_id().map(str::to_owned).into_iter().collect(),
        Ticket::AccessToken(token) | Ticket::RefreshToken(token) => {
            if ticket.expiration_policy().is_sovereign() {
                Vec::new()
            } else {
                token.ticket_granting_ticket().map(str::to_owned).into_iter().collect()
            }
        },
    }
}
