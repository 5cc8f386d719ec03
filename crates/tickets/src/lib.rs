//! Ticket management core for CAS-style single sign-on.
//!
//! This crate issues, validates and destroys the tickets of a central
//! authentication service: login sessions (ticket-granting tickets),
//! single-use service tickets, proxy delegation through proxy-granting and
//! proxy tickets, and OAuth access and refresh tokens.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Protocol layer (CAS, OAuth)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  CentralTicketService                       │
//! │   (chain expiration, single-use consumption, cascade,       │
//! │    proxy delivery, expired-ticket sweep)                    │
//! ├───────────────────────────┬─────────────────────────────────┤
//! │      TicketFactory        │       TicketRegistry            │
//! │ (ids, expiration policy)  │  (storage SPI, atomic delete)   │
//! ├───────────────────────────┼─────────────────────────────────┤
//! │ ExpirationPolicy │ Clock  │ MemoryTicketRegistry │ plugins  │
//! └───────────────────────────┴─────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use casticket::{
//!     Authentication, CentralTicketService, Principal, Service, SystemClock, TicketConfig,
//!     TicketState, registry::MemoryTicketRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tickets = CentralTicketService::from_config(
//!         &TicketConfig::default(),
//!         Arc::new(MemoryTicketRegistry::new()),
//!         Arc::new(SystemClock),
//!     );
//!
//!     // Login creates a session.
//!     let auth = Authentication::builder().principal(Principal::new("alice")).build();
//!     let tgt = tickets.create_ticket_granting_ticket(auth).await?;
//!
//!     // The session grants a service ticket, which validates exactly once.
//!     let service = Service::new("https://app.example.org");
//!     let st = tickets.create_service_ticket(tgt.id(), service.clone(), true).await?;
//!     tickets.validate_service_ticket_for(st.id(), &service).await?;
//!     assert!(tickets.validate_service_ticket(st.id()).await.is_err());
//!
//!     // Logout destroys the session and everything it issued.
//!     tickets.delete_ticket(tgt.id()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Implementing a Registry
//!
//! 1. Implement [`TicketRegistry`](registry::TicketRegistry).
//! 2. Make `delete_ticket` report `true` to exactly one caller per ticket.
//! 3. Map backend errors to [`RegistryError`](registry::RegistryError).
//! 4. Run the `conformance` suite against it.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module (manual clock, sequential ids, ticket builders,
//!   a test harness, assertion macros) and the registry `conformance` suite.
//! - **`failpoints`**: Enables fail-point injection sites in the ticket manager.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod authentication;
pub mod cleaner;
pub mod clock;
pub mod compactor;
pub mod config;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod conformance;
pub mod error;
pub mod expiration;
pub mod factory;
pub mod id;
mod lock;
pub mod manager;
pub mod proxy;
pub mod registry;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod ticket;

// Re-export primary types at crate root for convenience
pub use authentication::{Attributes, Authentication, Principal, Service};
pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, TicketConfig};
pub use error::{BoxError, TicketError, TicketResult};
pub use expiration::ExpirationPolicy;
pub use factory::{OAuthTokenRequest, TicketFactory, TicketRequest};
pub use manager::CentralTicketService;
pub use ticket::{
    GrantType, OAuthToken, ProxyGrantingTicket, ProxyTicket, ResponseType, ServiceTicket, Ticket,
    TicketGrantingTicket, TicketKind, TicketState,
};
