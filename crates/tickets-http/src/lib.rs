//! HTTP proxy-callback client for the `casticket` ticket core.
//!
//! Delivering a proxy-granting ticket means calling the proxying service's
//! https callback with `pgtIou` and `pgtId` query parameters and checking
//! that it answers with an acceptable status. [`HttpProxyCallbackClient`]
//! does this with `reqwest` and plugs into the ticket manager through
//! [`ProxyCallbackClient`](casticket::proxy::ProxyCallbackClient).
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use casticket::{CentralTicketService, SystemClock, TicketConfig, registry::MemoryTicketRegistry};
//! use casticket_http::{CallbackClientConfig, HttpProxyCallbackClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let callbacks = HttpProxyCallbackClient::new(CallbackClientConfig::default())?;
//! let tickets = CentralTicketService::from_config(
//!     &TicketConfig::default(),
//!     Arc::new(MemoryTicketRegistry::new()),
//!     Arc::new(SystemClock),
//! )
//! .with_proxy_callback(Arc::new(callbacks));
//! # let _ = tickets;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
pub mod config;
pub mod error;

pub use client::HttpProxyCallbackClient;
pub use config::CallbackClientConfig;
pub use error::{CallbackError, Result};
