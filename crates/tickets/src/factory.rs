//! Ticket construction.
//!
//! [`TicketFactory`] turns a [`TicketRequest`] into a fresh [`Ticket`]: it
//! generates the id, attaches the expiration policy registered for the
//! kind and wires the parent references. It never touches the registry;
//! the manager resolves parents before building the request and stores the
//! result afterwards.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use url::Url;

use crate::{
    authentication::{Authentication, Service},
    clock::Clock,
    config::TicketConfig,
    error::{TicketError, TicketResult},
    expiration::ExpirationPolicy,
    id::{self, DefaultUniqueTicketIdGenerator, UniqueTicketIdGenerator},
    ticket::{
        GrantType, OAuthToken, OAuthTokenFields, ProxyGrantingTicket, ProxyTicket, ResponseType,
        ServiceTicket, Ticket, TicketCore, TicketGrantingTicket, TicketKind, TicketState,
    },
};

/// What to build, with every parent already resolved.
#[derive(Debug)]
pub enum TicketRequest<'a> {
    /// A login session.
    TicketGranting {
        /// The primary authentication.
        authentication: Authentication,
    },

    /// A service ticket issued from a session.
    Service {
        /// The issuing ticket-granting ticket.
        grantor: &'a Ticket,
        /// The service the ticket is for.
        service: Service,
        /// Whether the user presented credentials for this request.
        credentials_provided: bool,
    },

    /// A proxy-granting ticket authorized by a service or proxy ticket.
    ProxyGranting {
        /// The authorizing service or proxy ticket.
        parent: &'a Ticket,
        /// The service asking to proxy.
        proxied_by: Service,
        /// The callback URL; must be https.
        proxy_id: &'a str,
    },

    /// A proxy ticket issued from a proxy-granting ticket.
    Proxy {
        /// The issuing proxy-granting ticket.
        grantor: &'a Ticket,
        /// The target service.
        service: Service,
    },

    /// An OAuth access token.
    AccessToken(OAuthTokenRequest),

    /// An OAuth refresh token.
    RefreshToken(OAuthTokenRequest),
}

impl TicketRequest<'_> {
    /// The kind of ticket this request produces.
    #[must_use]
    pub fn kind(&self) -> TicketKind {
        match self {
            Self::TicketGranting { .. } => TicketKind::TicketGrantingTicket,
            Self::Service { .. } => TicketKind::ServiceTicket,
            Self::ProxyGranting { .. } => TicketKind::ProxyGrantingTicket,
            Self::Proxy { .. } => TicketKind::ProxyTicket,
            Self::AccessToken(_) => TicketKind::AccessToken,
            Self::RefreshToken(_) => TicketKind::RefreshToken,
        }
    }
}

/// Parameters of an OAuth access or refresh token.
///
/// # Examples
///
/// ```
/// use casticket::{Authentication, OAuthTokenRequest, Principal};
///
/// let request = OAuthTokenRequest::builder()
///     .authentication(Authentication::builder().principal(Principal::new("alice")).build())
///     .service("https://app.example.org/callback")
///     .client_id("app")
///     .scopes(["openid".to_owned(), "profile".to_owned()].into())
///     .build();
///
/// assert_eq!(request.client_id, "app");
/// assert!(request.ticket_granting_ticket.is_none());
/// ```
#[derive(Debug, Clone, bon::Builder)]
pub struct OAuthTokenRequest {
    /// The authentication the token represents.
    pub authentication: Authentication,

    /// The service (redirect URI) the token is for.
    #[builder(into)]
    pub service: Service,

    /// The registered client.
    #[builder(into)]
    pub client_id: String,

    /// Requested scopes.
    #[builder(default)]
    pub scopes: BTreeSet<String>,

    /// The session minting the token, if any.
    #[builder(into)]
    pub ticket_granting_ticket: Option<String>,

    /// Response type of the authorization request.
    #[builder(default)]
    pub response_type: ResponseType,

    /// Grant type of the token request.
    #[builder(default)]
    pub grant_type: GrantType,

    /// PKCE code challenge.
    #[builder(into)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method.
    #[builder(into)]
    pub code_challenge_method: Option<String>,

    /// Per-service override of the configured token sovereignty.
    pub sovereign: Option<bool>,
}

/// Builds tickets of every registered kind.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use casticket::{
///     Authentication, ExpirationPolicy, Principal, SystemClock, TicketFactory, TicketKind,
///     TicketRequest, TicketState, id::DefaultUniqueTicketIdGenerator,
/// };
///
/// let factory = TicketFactory::new(Arc::new(DefaultUniqueTicketIdGenerator::new()), Arc::new(SystemClock))
///     .with_policy(TicketKind::TicketGrantingTicket, ExpirationPolicy::NeverExpires);
///
/// let tgt = factory
///     .create(TicketRequest::TicketGranting {
///         authentication: Authentication::builder().principal(Principal::new("alice")).build(),
///     })
///     .unwrap();
/// assert!(tgt.id().starts_with("TGT-"));
/// ```
#[derive(Debug, Clone)]
pub struct TicketFactory {
    policies: HashMap<TicketKind, ExpirationPolicy>,
    id_generator: Arc<dyn UniqueTicketIdGenerator>,
    clock: Arc<dyn Clock>,
}

impl TicketFactory {
    /// Creates a factory with no kinds registered.
    #[must_use]
    pub fn new(id_generator: Arc<dyn UniqueTicketIdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { policies: HashMap::new(), id_generator, clock }
    }

    /// Registers (or replaces) the policy for `kind`.
    #[must_use]
    pub fn with_policy(mut self, kind: TicketKind, policy: ExpirationPolicy) -> Self {
        self.policies.insert(kind, policy);
        self
    }

    /// Replaces the id generator.
    #[must_use]
    pub fn with_id_generator(mut self, id_generator: Arc<dyn UniqueTicketIdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// Builds a factory with every kind registered from `config`.
    #[must_use]
    pub fn from_config(config: &TicketConfig, clock: Arc<dyn Clock>) -> Self {
        let id_generator: Arc<dyn UniqueTicketIdGenerator> = match &config.id.suffix {
            Some(suffix) => Arc::new(DefaultUniqueTicketIdGenerator::with_suffix(suffix.as_str())),
            None => Arc::new(DefaultUniqueTicketIdGenerator::new()),
        };
        let session = config.tgt.expiration_policy();

        Self::new(id_generator, clock)
            .with_policy(TicketKind::ProxyGrantingTicket, config.pgt.expiration_policy(&session))
            .with_policy(TicketKind::TicketGrantingTicket, session)
            .with_policy(TicketKind::ServiceTicket, config.st.expiration_policy())
            .with_policy(TicketKind::ProxyTicket, config.pt.expiration_policy())
            .with_policy(TicketKind::AccessToken, config.access_token.expiration_policy())
            .with_policy(TicketKind::RefreshToken, config.refresh_token.expiration_policy())
    }

    /// The policy registered for `kind`.
    #[must_use]
    pub fn policy(&self, kind: TicketKind) -> Option<&ExpirationPolicy> {
        self.policies.get(&kind)
    }

    /// The clock stamped onto new tickets.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The id generator.
    #[must_use]
    pub fn id_generator(&self) -> &Arc<dyn UniqueTicketIdGenerator> {
        &self.id_generator
    }

    /// Builds a ticket.
    ///
    /// # Errors
    ///
    /// - [`TicketError::UnsupportedTicketKind`] if no policy is registered for
    ///   the requested kind.
    /// - [`TicketError::InvalidTicket`] if a parent is of the wrong kind.
    /// - [`TicketError::ProxyConstruction`] if a proxy callback is not an https URL.
    pub fn create(&self, request: TicketRequest<'_>) -> TicketResult<Ticket> {
        let kind = request.kind();
        let policy = self.policy(kind).ok_or_else(|| TicketError::unsupported_kind(kind))?.clone();

        match request {
            TicketRequest::TicketGranting { authentication } => {
                let core = self.core(kind, authentication, policy);
                Ok(Ticket::TicketGranting(TicketGrantingTicket::new(core)))
            },

            TicketRequest::Service { grantor, service, credentials_provided } => {
                if !grantor.is_root() {
                    return Err(TicketError::invalid_ticket(grantor.id()));
                }
                let from_new_login = credentials_provided || grantor.count_of_uses() == 0;
                let core = self.core(kind, grantor.authentication().clone(), policy);
                Ok(Ticket::Service(ServiceTicket::new(core, service, grantor.id(), from_new_login)))
            },

            TicketRequest::ProxyGranting { parent, proxied_by, proxy_id } => {
                let parent_ticket = parent
                    .as_service_ticket()
                    .ok_or_else(|| TicketError::invalid_ticket(parent.id()))?;
                let proxy_url = Url::parse(proxy_id).map_err(|e| {
                    TicketError::proxy_construction(format!("invalid proxy callback {proxy_id}: {e}"))
                })?;
                let pgt_iou = self.id_generator.new_ticket_id(id::PROXY_GRANTING_TICKET_IOU_PREFIX);
                let core = self.core(kind, parent.authentication().clone(), policy);
                let pgt = ProxyGrantingTicket::new(
                    core,
                    parent.id(),
                    parent_ticket.grantor(),
                    proxy_url,
                    pgt_iou,
                    proxied_by,
                    parent.proxies(),
                )?;
                Ok(Ticket::ProxyGranting(pgt))
            },

            TicketRequest::Proxy { grantor, service } => {
                let pgt = grantor
                    .as_proxy_granting()
                    .ok_or_else(|| TicketError::invalid_ticket(grantor.id()))?;
                let core = self.core(kind, grantor.authentication().clone(), policy);
                let ticket =
                    ServiceTicket::new(core, service, grantor.id(), grantor.count_of_uses() == 0);
                Ok(Ticket::Proxy(ProxyTicket::new(ticket, pgt.proxies().to_vec())))
            },

            TicketRequest::AccessToken(request) => {
                Ok(Ticket::AccessToken(self.oauth_token(kind, request, policy)))
            },

            TicketRequest::RefreshToken(request) => {
                Ok(Ticket::RefreshToken(self.oauth_token(kind, request, policy)))
            },
        }
    }

    fn core(&self, kind: TicketKind, authentication: Authentication, policy: ExpirationPolicy) -> TicketCore {
        let id = self.id_generator.new_ticket_id(kind.prefix());
        TicketCore::new(id, authentication, policy, self.clock.now())
    }

    fn oauth_token(&self, kind: TicketKind, request: OAuthTokenRequest, policy: ExpirationPolicy) -> OAuthToken {
        let OAuthTokenRequest {
            authentication,
            service,
            client_id,
            scopes,
            ticket_granting_ticket,
            response_type,
            grant_type,
            code_challenge,
            code_challenge_method,
            sovereign,
        } = request;

        let policy = match sovereign {
            Some(sovereign) => with_sovereignty(policy, sovereign),
            None => policy,
        };
        let core = self.core(kind, authentication, policy);
        OAuthToken::new(core, OAuthTokenFields {
            service,
            client_id,
            scopes,
            ticket_granting_ticket,
            response_type,
            grant_type,
            code_challenge,
            code_challenge_method,
        })
    }
}

/// Switches an OAuth policy between its session-bound and sovereign forms.
/// Other policies are returned unchanged.
fn with_sovereignty(policy: ExpirationPolicy, sovereign: bool) -> ExpirationPolicy {
    match policy {
        ExpirationPolicy::Dependent { max_ttl, idle_ttl } if sovereign => {
            ExpirationPolicy::Sovereign { max_ttl, idle_ttl }
        },
        ExpirationPolicy::Sovereign { max_ttl, idle_ttl } if !sovereign => {
            ExpirationPolicy::Dependent { max_ttl, idle_ttl }
        },
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::{
        authentication::Principal,
        testutil::{ManualClock, SequentialTicketIdGenerator, make_authentication},
    };

    fn factory() -> TicketFactory {
        TicketFactory::from_config(&TicketConfig::default(), Arc::new(ManualClock::default()))
    }

    fn deterministic_factory() -> TicketFactory {
        factory().with_id_generator(Arc::new(SequentialTicketIdGenerator::default()))
    }

    fn tgt(factory: &TicketFactory) -> Ticket {
        factory
            .create(TicketRequest::TicketGranting { authentication: make_authentication("alice") })
            .expect("tgt")
    }

    fn st(factory: &TicketFactory, grantor: &Ticket) -> Ticket {
        factory
            .create(TicketRequest::Service {
                grantor,
                service: Service::new("https://app.example.org"),
                credentials_provided: false,
            })
            .expect("st")
    }

    fn token_request() -> OAuthTokenRequest {
        OAuthTokenRequest::builder()
            .authentication(make_authentication("alice"))
            .service("https://app.example.org/cb")
            .client_id("client")
            .build()
    }

    #[test]
    fn unregistered_kind_is_unsupported() {
        let factory =
            TicketFactory::new(Arc::new(DefaultUniqueTicketIdGenerator::new()), Arc::new(ManualClock::default()));
        let result = factory.create(TicketRequest::TicketGranting {
            authentication: Authentication::builder().principal(Principal::new("bob")).build(),
        });
        assert!(matches!(
            result,
            Err(TicketError::UnsupportedTicketKind { kind: TicketKind::TicketGrantingTicket })
        ));
    }

    #[test]
    fn ids_carry_kind_prefix() {
        let factory = factory();
        let tgt = tgt(&factory);
        let st = st(&factory, &tgt);
        assert_eq!(TicketKind::from_ticket_id(tgt.id()), Some(TicketKind::TicketGrantingTicket));
        assert_eq!(TicketKind::from_ticket_id(st.id()), Some(TicketKind::ServiceTicket));
    }

    #[test]
    fn ids_use_configured_suffix() {
        let mut config = TicketConfig::default();
        config.id.suffix = Some("node-7".to_owned());
        let factory = TicketFactory::from_config(&config, Arc::new(ManualClock::default()));
        assert!(tgt(&factory).id().ends_with("-node-7"));
    }

    #[test]
    fn service_ticket_references_grantor() {
        let factory = deterministic_factory();
        let tgt = tgt(&factory);
        let st = st(&factory, &tgt);

        assert_eq!(tgt.id(), "TGT-1");
        assert_eq!(st.id(), "ST-2");
        let service_ticket = st.as_service_ticket().expect("service ticket");
        assert_eq!(service_ticket.grantor(), tgt.id());
        assert_eq!(st.parent_id(), Some(tgt.id()));
        assert_eq!(st.authentication(), tgt.authentication());
        assert_eq!(
            st.expiration_policy(),
            &ExpirationPolicy::MultiTimeUseOrTimeout { number_of_uses: 1, ttl: Duration::from_secs(10) }
        );
    }

    #[rstest]
    #[case::first_use_without_credentials(0, false, true)]
    #[case::renewed_with_credentials(2, true, true)]
    #[case::sso_reuse(1, false, false)]
    fn from_new_login(#[case] prior_uses: u32, #[case] credentials_provided: bool, #[case] expected: bool) {
        let factory = factory();
        let mut tgt = tgt(&factory);
        for _ in 0..prior_uses {
            tgt.update_usage(chrono::Utc::now());
        }
        let st = factory
            .create(TicketRequest::Service {
                grantor: &tgt,
                service: Service::new("https://app.example.org"),
                credentials_provided,
            })
            .expect("st");
        assert_eq!(st.as_service_ticket().expect("st").is_from_new_login(), expected);
    }

    #[test]
    fn service_ticket_requires_root_grantor() {
        let factory = factory();
        let tgt = tgt(&factory);
        let st = st(&factory, &tgt);
        let result = factory.create(TicketRequest::Service {
            grantor: &st,
            service: Service::new("https://app.example.org"),
            credentials_provided: false,
        });
        assert!(matches!(result, Err(TicketError::InvalidTicket { .. })));
    }

    #[rstest]
    #[case::plain_http("http://proxy.example.org/cb")]
    #[case::not_a_url("not a url")]
    #[case::ftp("ftp://proxy.example.org/cb")]
    fn proxy_granting_ticket_rejects_non_https(#[case] proxy_id: &str) {
        let factory = factory();
        let tgt = tgt(&factory);
        let st = st(&factory, &tgt);
        let result = factory.create(TicketRequest::ProxyGranting {
            parent: &st,
            proxied_by: Service::new("https://proxy.example.org"),
            proxy_id,
        });
        assert!(matches!(result, Err(TicketError::ProxyConstruction { .. })), "{result:?}");
    }

    #[test]
    fn proxy_chain_grows_with_each_hop() {
        let factory = factory();
        let tgt = tgt(&factory);
        let st = st(&factory, &tgt);

        let pgt1 = factory
            .create(TicketRequest::ProxyGranting {
                parent: &st,
                proxied_by: Service::new("https://one.example.org"),
                proxy_id: "https://one.example.org/cb",
            })
            .expect("pgt1");
        let proxy_granting = pgt1.as_proxy_granting().expect("pgt");
        assert_eq!(proxy_granting.parent(), st.id());
        assert_eq!(proxy_granting.grantor(), tgt.id());
        assert!(proxy_granting.pgt_iou().starts_with("PGTIOU-"));

        let pt = factory
            .create(TicketRequest::Proxy { grantor: &pgt1, service: Service::new("https://two.example.org") })
            .expect("pt");
        assert_eq!(pt.proxies(), pgt1.proxies());
        assert_eq!(pt.parent_id(), Some(pgt1.id()));

        let pgt2 = factory
            .create(TicketRequest::ProxyGranting {
                parent: &pt,
                proxied_by: Service::new("https://two.example.org"),
                proxy_id: "https://two.example.org/cb",
            })
            .expect("pgt2");
        let chain: Vec<&str> = pgt2.proxies().iter().map(Url::as_str).collect();
        assert_eq!(chain, vec!["https://two.example.org/cb", "https://one.example.org/cb"]);
        assert_eq!(pgt2.as_proxy_granting().expect("pgt").grantor(), pgt1.id());
    }

    #[test]
    fn proxy_ticket_requires_proxy_granting_grantor() {
        let factory = factory();
        let tgt = tgt(&factory);
        let result =
            factory.create(TicketRequest::Proxy { grantor: &tgt, service: Service::new("https://x.example.org") });
        assert!(matches!(result, Err(TicketError::InvalidTicket { .. })));
    }

    #[rstest]
    #[case::inherit_dependent(false, None, false)]
    #[case::inherit_sovereign(true, None, true)]
    #[case::override_to_sovereign(false, Some(true), true)]
    #[case::override_to_dependent(true, Some(false), false)]
    fn token_sovereignty(#[case] global: bool, #[case] per_service: Option<bool>, #[case] expected: bool) {
        let mut config = TicketConfig::default();
        config.access_token.sovereign = global;
        let factory = TicketFactory::from_config(&config, Arc::new(ManualClock::default()));

        let mut request = token_request();
        request.sovereign = per_service;
        let token = factory.create(TicketRequest::AccessToken(request)).expect("token");
        assert_eq!(token.expiration_policy().is_sovereign(), expected);
    }

    #[test]
    fn oauth_tokens_carry_request_fields() {
        let factory = factory();
        let mut request = token_request();
        request.scopes = ["openid".to_owned(), "email".to_owned()].into();
        request.ticket_granting_ticket = Some("TGT-1".to_owned());
        request.grant_type = GrantType::AuthorizationCode;
        let token = factory.create(TicketRequest::RefreshToken(request)).expect("token");

        assert_eq!(token.kind(), TicketKind::RefreshToken);
        assert!(token.id().starts_with("RT-"));
        let oauth = token.as_oauth_token().expect("oauth");
        assert_eq!(oauth.client_id(), "client");
        assert_eq!(oauth.scopes().len(), 2);
        assert_eq!(oauth.ticket_granting_ticket(), Some("TGT-1"));
        assert_eq!(oauth.grant_type(), GrantType::AuthorizationCode);
    }

    #[test]
    fn new_tickets_start_unused_at_clock_time() {
        let clock = Arc::new(ManualClock::default());
        let factory = TicketFactory::from_config(&TicketConfig::default(), clock.clone());
        let ticket = tgt(&factory);
        assert_eq!(ticket.creation_time(), clock.now());
        assert_eq!(ticket.last_time_used(), clock.now());
        assert_eq!(ticket.count_of_uses(), 0);
        assert!(ticket.previous_time_used().is_none());
    }
}
