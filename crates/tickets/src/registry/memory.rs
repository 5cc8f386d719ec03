//! In-memory ticket registry.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{RegistryError, RegistryResult, TicketRegistry};
use crate::ticket::{Ticket, TicketState};

/// [`TicketRegistry`] backed by a hash map.
///
/// Suitable for tests, development and single-node deployments. Data does
/// not survive a restart.
///
/// # Cloning
///
/// Clones share the same underlying map.
///
/// # Examples
///
/// ```
/// use casticket::registry::{MemoryTicketRegistry, TicketRegistry};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = MemoryTicketRegistry::new();
///     assert!(registry.get_ticket("TGT-doesnotexist").await?.is_none());
///     assert!(!registry.delete_ticket("TGT-doesnotexist").await?);
///     Ok(())
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryTicketRegistry {
    tickets: Arc<RwLock<HashMap<String, Ticket>>>,
}

impl MemoryTicketRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets of any kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.read().len()
    }

    /// Returns `true` when no tickets are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.read().is_empty()
    }
}

#[async_trait]
impl TicketRegistry for MemoryTicketRegistry {
    #[tracing::instrument(skip(self, ticket), fields(ticket_id = %ticket.id()))]
    async fn add_ticket(&self, ticket: Ticket) -> RegistryResult<()> {
        let mut tickets = self.tickets.write();
        if tickets.contains_key(ticket.id()) {
            return Err(RegistryError::already_exists(ticket.id()));
        }
        tickets.insert(ticket.id().to_owned(), ticket);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_ticket(&self, id: &str) -> RegistryResult<Option<Ticket>> {
        Ok(self.tickets.read().get(id).cloned())
    }

    #[tracing::instrument(skip(self, ticket), fields(ticket_id = %ticket.id()))]
    async fn update_ticket(&self, ticket: Ticket) -> RegistryResult<()> {
        let mut tickets = self.tickets.write();
        let slot = tickets.get_mut(ticket.id()).ok_or_else(|| RegistryError::not_found(ticket.id()))?;
        *slot = ticket;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_ticket(&self, id: &str) -> RegistryResult<bool> {
        Ok(self.tickets.write().remove(id).is_some())
    }

    #[tracing::instrument(skip(self))]
    async fn get_tickets(&self) -> RegistryResult<Vec<Ticket>> {
        Ok(self.tickets.read().values().cloned().collect())
    }

    /// Counts under a single read lock.
    #[tracing::instrument(skip(self))]
    async fn session_count(&self) -> RegistryResult<usize> {
        Ok(self.tickets.read().values().filter(|t| t.as_ticket_granting().is_some()).count())
    }

    /// Counts under a single read lock.
    #[tracing::instrument(skip(self))]
    async fn service_ticket_count(&self) -> RegistryResult<usize> {
        Ok(self.tickets.read().values().filter(|t| t.as_service_ticket().is_some()).count())
    }
}
