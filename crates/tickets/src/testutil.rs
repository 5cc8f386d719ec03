//! Shared test utilities for ticket tests.
//!
//! Feature-gated behind `testutil`. Provides a controllable clock, a
//! deterministic id generator, authentication and ticket builders, a
//! recording proxy callback client, a ready-made [`TestHarness`] and
//! assertion macros for [`TicketResult`](crate::error::TicketResult) values.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! casticket = { path = "../tickets", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use casticket::testutil::{TestHarness, make_authentication};
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use url::Url;

use crate::{
    authentication::{Attributes, Authentication, Principal},
    clock::Clock,
    config::TicketConfig,
    error::BoxError,
    expiration::ExpirationPolicy,
    factory::TicketFactory,
    id::UniqueTicketIdGenerator,
    manager::CentralTicketService,
    proxy::ProxyCallbackClient,
    registry::MemoryTicketRegistry,
    ticket::{ProxyTicket, ServiceTicket, Ticket, TicketCore, TicketGrantingTicket},
};

/// Start of time for [`ManualClock::default`]: 2025-01-01T00:00:00Z.
const EPOCH_SECONDS: i64 = 1_735_689_600;

/// A clock that only moves when told to.
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::from_timestamp(EPOCH_SECONDS, 0).unwrap_or_default())
    }
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Moves the clock forward.
    ///
    /// # Panics
    ///
    /// Panics if `by` does not fit in a chrono [`TimeDelta`].
    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).expect("duration out of range");
        *self.now.lock() += delta;
    }

    /// Jumps to `instant`, which may be in the past.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Generates `PREFIX-1`, `PREFIX-2`, ... with one counter for all prefixes.
#[derive(Debug, Default)]
pub struct SequentialTicketIdGenerator {
    counter: AtomicU64,
}

impl UniqueTicketIdGenerator for SequentialTicketIdGenerator {
    fn new_ticket_id(&self, prefix: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{seq}")
    }
}

/// An authentication for `principal` with a password handler.
#[must_use]
pub fn make_authentication(principal: &str) -> Authentication {
    Authentication::builder()
        .principal(Principal::new(principal))
        .authentication_date(ManualClock::default().now())
        .successful_handlers(vec!["PasswordHandler".to_owned()])
        .credential_types(vec!["UsernamePasswordCredential".to_owned()])
        .build()
}

/// Like [`make_authentication`] with the `rememberMe` attribute set.
#[must_use]
pub fn make_remember_me_authentication(principal: &str) -> Authentication {
    let mut attributes = Attributes::new();
    attributes.insert(Authentication::REMEMBER_ME_ATTRIBUTE.to_owned(), vec!["true".to_owned()]);
    Authentication { attributes, ..make_authentication(principal) }
}

fn core(id: &str) -> TicketCore {
    TicketCore::new(
        id.to_owned(),
        make_authentication("alice"),
        ExpirationPolicy::NeverExpires,
        ManualClock::default().now(),
    )
}

/// A never-expiring ticket-granting ticket with the given id.
#[must_use]
pub fn make_ticket_granting_ticket(id: &str) -> Ticket {
    Ticket::TicketGranting(TicketGrantingTicket::new(core(id)))
}

/// A never-expiring service ticket issued by `grantor`.
#[must_use]
pub fn make_service_ticket(id: &str, grantor: &str) -> Ticket {
    Ticket::Service(ServiceTicket::new(core(id), "https://app.example.org".into(), grantor, false))
}

/// A never-expiring proxy ticket issued by `grantor`.
#[must_use]
pub fn make_proxy_ticket(id: &str, grantor: &str) -> Ticket {
    let ticket = ServiceTicket::new(core(id), "https://backend.example.org".into(), grantor, false);
    Ticket::Proxy(ProxyTicket::new(ticket, Vec::new()))
}

/// A [`ProxyCallbackClient`] that records every URL it is asked to call.
///
/// Clones share the recording and the behavior switches.
#[derive(Debug, Clone, Default)]
pub struct RecordingCallbackClient {
    urls: Arc<Mutex<Vec<Url>>>,
    failing: Arc<AtomicBool>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl RecordingCallbackClient {
    /// Makes subsequent calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes subsequent calls wait before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// URLs called so far.
    #[must_use]
    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl ProxyCallbackClient for RecordingCallbackClient {
    async fn send(&self, url: &Url) -> Result<(), BoxError> {
        self.urls.lock().push(url.clone());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Arc::new(std::io::Error::other("callback rejected")));
        }
        Ok(())
    }
}

/// A ticket service over an in-memory registry, a manual clock, sequential
/// ids and a recording callback client.
#[derive(Debug, Clone)]
pub struct TestHarness {
    /// The service under test.
    pub service: CentralTicketService,
    /// The registry behind it.
    pub registry: MemoryTicketRegistry,
    /// The clock behind it.
    pub clock: Arc<ManualClock>,
    /// The proxy callback client behind it.
    pub callbacks: RecordingCallbackClient,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// A harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&TicketConfig::default())
    }

    /// A harness configured from `config`.
    #[must_use]
    pub fn with_config(config: &TicketConfig) -> Self {
        let registry = MemoryTicketRegistry::new();
        let clock = Arc::new(ManualClock::default());
        let callbacks = RecordingCallbackClient::default();
        let factory = TicketFactory::from_config(config, clock.clone())
            .with_id_generator(Arc::new(SequentialTicketIdGenerator::default()));
        let service = CentralTicketService::builder()
            .registry(Arc::new(registry.clone()))
            .factory(Arc::new(factory))
            .proxy_callback(Arc::new(callbacks.clone()))
            .only_track_most_recent_session(config.only_track_most_recent_session)
            .build();
        Self { service, registry, clock, callbacks }
    }
}

/// Assert that a [`TicketResult`](crate::error::TicketResult) is a
/// [`TicketError::InvalidTicket`](crate::error::TicketError::InvalidTicket).
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use casticket::{TicketError, TicketResult, assert_invalid_ticket};
///
/// let result: TicketResult<()> = Err(TicketError::invalid_ticket("ST-1"));
/// assert_invalid_ticket!(result);
/// ```
#[macro_export]
macro_rules! assert_invalid_ticket {
    ($result:expr) => {
        let result = $result;
        assert!(
            matches!(result, Err($crate::error::TicketError::InvalidTicket { .. })),
            "expected TicketError::InvalidTicket, got: {:?}",
            result,
        );
    };
    ($result:expr, $msg:expr) => {
        let result = $result;
        assert!(
            matches!(result, Err($crate::error::TicketError::InvalidTicket { .. })),
            "{}: expected TicketError::InvalidTicket, got: {:?}",
            $msg,
            result,
        );
    };
}

/// Assert that a [`TicketResult`](crate::error::TicketResult) failed with an
/// error matching `pattern`.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use casticket::{TicketError, TicketResult, assert_ticket_error};
///
/// let result: TicketResult<()> = Err(TicketError::malformed("bad"));
/// assert_ticket_error!(result, TicketError::MalformedTicket { .. });
/// ```
#[macro_export]
macro_rules! assert_ticket_error {
    ($result:expr, $pattern:pat) => {
        let result = $result;
        assert!(matches!(result, Err($pattern)), "expected {}, got: {:?}", stringify!($pattern), result);
    };
}
