//! Unique ticket id generation.
//!
//! Ids have the form `<PREFIX>-<counter>-<random>[-<suffix>]`:
//!
//! - `PREFIX` names the ticket kind so consumers can route an id without a
//!   registry lookup;
//! - `counter` is a sequence number owned by the generator, starting at 1;
//! - `random` is 192 bits from the thread-local CSPRNG, base64url encoded;
//! - `suffix` optionally names the node that issued the id.
//!
//! Everything after the prefix is opaque to consumers.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

/// Prefix of ticket-granting ticket ids.
pub const TICKET_GRANTING_TICKET_PREFIX: &str = "TGT";
/// Prefix of service ticket ids.
pub const SERVICE_TICKET_PREFIX: &str = "ST";
/// Prefix of proxy-granting ticket ids.
pub const PROXY_GRANTING_TICKET_PREFIX: &str = "PGT";
/// Prefix of proxy-granting ticket IOUs.
pub const PROXY_GRANTING_TICKET_IOU_PREFIX: &str = "PGTIOU";
/// Prefix of proxy ticket ids.
pub const PROXY_TICKET_PREFIX: &str = "PT";
/// Prefix of OAuth access token ids.
pub const ACCESS_TOKEN_PREFIX: &str = "AT";
/// Prefix of OAuth refresh token ids.
pub const REFRESH_TOKEN_PREFIX: &str = "RT";
/// Prefix of OAuth authorization codes.
pub const OAUTH_CODE_PREFIX: &str = "CODE";

/// Random bytes per id (192 bits).
const RANDOM_BYTES: usize = 24;

/// Produces collision-resistant ticket ids.
pub trait UniqueTicketIdGenerator: Send + Sync + std::fmt::Debug {
    /// Returns a new id starting with `prefix` followed by `-`.
    fn new_ticket_id(&self, prefix: &str) -> String;
}

/// Default generator: counter plus CSPRNG bytes, with an optional node suffix.
///
/// # Examples
///
/// ```
/// use casticket::id::{DefaultUniqueTicketIdGenerator, UniqueTicketIdGenerator};
///
/// let generator = DefaultUniqueTicketIdGenerator::with_suffix("cas-node-1");
/// let id = generator.new_ticket_id("ST");
/// assert!(id.starts_with("ST-1-"));
/// assert!(id.ends_with("-cas-node-1"));
/// ```
#[derive(Debug, Default)]
pub struct DefaultUniqueTicketIdGenerator {
    counter: AtomicU64,
    suffix: Option<String>,
}

impl DefaultUniqueTicketIdGenerator {
    /// Creates a generator without a node suffix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that appends `suffix` (typically the host name).
    ///
    /// An empty suffix is ignored.
    #[must_use]
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        Self {
            counter: AtomicU64::new(0),
            suffix: (!suffix.is_empty()).then_some(suffix),
        }
    }

    fn random_part() -> String {
        let mut bytes = [0u8; RANDOM_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl UniqueTicketIdGenerator for DefaultUniqueTicketIdGenerator {
    fn new_ticket_id(&self, prefix: &str) -> String {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let random = Self::random_part();
        match &self.suffix {
            Some(suffix) => format!("{prefix}-{sequence}-{random}-{suffix}"),
            None => format!("{prefix}-{sequence}-{random}"),
        }
    }
}
