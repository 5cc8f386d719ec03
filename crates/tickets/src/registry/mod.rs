//! Ticket registry SPI.
//!
//! The registry owns the canonical copy of every ticket, keyed by id. The
//! ticket manager depends only on [`TicketRegistry`]; storage plugins
//! implement it and can check themselves against the
//! [`conformance`](crate::conformance) suite.
//!
//! # Consumption primitive
//!
//! [`TicketRegistry::delete_ticket`] must report `true` to exactly one
//! caller per stored ticket. The manager consumes single-use tickets by
//! deleting them and treats `false` as "someone else got there first", so
//! a registry shared by several manager instances still lets a service
//! ticket validate at most once.

mod error;
mod memory;

use async_trait::async_trait;

pub use self::{
    error::{RegistryError, RegistryResult},
    memory::MemoryTicketRegistry,
};
use crate::ticket::{Ticket, TicketKind};

/// Storage for tickets.
///
/// # Usage
///
/// ```no_run
/// // Demonstrates the trait interface; any implementation works.
/// use casticket::registry::{RegistryResult, TicketRegistry};
/// use casticket::{Ticket, TicketKind};
///
/// async fn find_session<R: TicketRegistry>(
///     registry: &R,
///     id: &str,
/// ) -> RegistryResult<Option<Ticket>> {
///     registry.get_ticket_of(id, TicketKind::TicketGrantingTicket).await
/// }
/// ```
#[async_trait]
pub trait TicketRegistry: Send + Sync {
    /// Stores a new ticket.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyExists`] if the id is taken.
    async fn add_ticket(&self, ticket: Ticket) -> RegistryResult<()>;

    /// Looks up a ticket by id.
    ///
    /// Returns `Ok(None)` for unknown ids.
    async fn get_ticket(&self, id: &str) -> RegistryResult<Option<Ticket>>;

    /// Replaces a stored ticket with a newer copy of itself.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the ticket is no longer stored.
    async fn update_ticket(&self, ticket: Ticket) -> RegistryResult<()>;

    /// Removes a ticket.
    ///
    /// Returns `true` only for the call that actually removed it; deleting
    /// an unknown id is not an error.
    async fn delete_ticket(&self, id: &str) -> RegistryResult<bool>;

    /// Returns a snapshot of every stored ticket.
    async fn get_tickets(&self) -> RegistryResult<Vec<Ticket>>;

    /// Looks up a ticket and checks its kind.
    ///
    /// A ticket whose kind is not accepted by `expected` (see
    /// [`TicketKind::accepts`]) is reported as absent rather than as an error.
    async fn get_ticket_of(&self, id: &str, expected: TicketKind) -> RegistryResult<Option<Ticket>> {
        Ok(self.get_ticket(id).await?.filter(|ticket| expected.accepts(ticket.kind())))
    }

    /// Number of stored ticket-granting tickets (including proxy-granting).
    async fn session_count(&self) -> RegistryResult<usize> {
        Ok(self
            .get_tickets()
            .await?
            .iter()
            .filter(|ticket| ticket.as_ticket_granting().is_some())
            .count())
    }

    /// Number of stored service tickets (including proxy tickets).
    async fn service_ticket_count(&self) -> RegistryResult<usize> {
        Ok(self
            .get_tickets()
            .await?
            .iter()
            .filter(|ticket| ticket.as_service_ticket().is_some())
            .count())
    }
}
