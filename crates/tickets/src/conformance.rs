//! Conformance test suite for [`TicketRegistry`] implementations.
//!
//! Each function checks one part of the registry contract. A storage plugin
//! runs the suite against a fresh instance of its registry:
//!
//! ```no_run
//! use casticket::conformance;
//! use casticket::registry::MemoryTicketRegistry;
//!
//! #[tokio::test]
//! async fn get_unknown_ticket_returns_none() {
//!     conformance::get_unknown_ticket_returns_none(&MemoryTicketRegistry::new()).await;
//! }
//! ```
//!
//! | Category | Contract aspect |
//! |----------|-----------------|
//! | CRUD | add, get, update and delete semantics |
//! | Typed lookup | `get_ticket_of` fails closed and accepts sub-kinds |
//! | Consumption | `delete_ticket` reports removal to exactly one caller |
//! | Counting | `session_count` and `service_ticket_count` |

use tokio::task::JoinSet;

use crate::{
    registry::{RegistryError, TicketRegistry},
    testutil::{make_proxy_ticket, make_service_ticket, make_ticket_granting_ticket},
    ticket::{TicketKind, TicketState},
};

// ============================================================================
// CRUD
// ============================================================================

/// `get_ticket` of an unknown id returns `Ok(None)`.
pub async fn get_unknown_ticket_returns_none<R: TicketRegistry>(registry: &R) {
    let result = registry.get_ticket("TGT-unknown").await;
    assert!(matches!(result, Ok(None)), "unknown id should be absent: {result:?}");
}

/// `add_ticket` then `get_ticket` returns the stored ticket.
pub async fn add_then_get_returns_ticket<R: TicketRegistry>(registry: &R) {
    registry.add_ticket(make_ticket_granting_ticket("TGT-1")).await.expect("add");
    let ticket = registry.get_ticket("TGT-1").await.expect("get").expect("ticket should be stored");
    assert_eq!(ticket.id(), "TGT-1");
    assert_eq!(ticket.kind(), TicketKind::TicketGrantingTicket);
}

/// Adding a second ticket under an existing id fails with `AlreadyExists`.
pub async fn add_duplicate_id_fails<R: TicketRegistry>(registry: &R) {
    registry.add_ticket(make_ticket_granting_ticket("TGT-1")).await.expect("first add");
    let result = registry.add_ticket(make_ticket_granting_ticket("TGT-1")).await;
    assert!(matches!(result, Err(RegistryError::AlreadyExists { .. })), "duplicate add: {result:?}");
}

/// `update_ticket` replaces the stored copy.
pub async fn update_replaces_stored_copy<R: TicketRegistry>(registry: &R) {
    let mut ticket = make_ticket_granting_ticket("TGT-1");
    registry.add_ticket(ticket.clone()).await.expect("add");

    ticket.update_usage(ticket.creation_time());
    registry.update_ticket(ticket).await.expect("update");

    let stored = registry.get_ticket("TGT-1").await.expect("get").expect("stored");
    assert_eq!(stored.count_of_uses(), 1, "update should be visible to readers");
}

/// `update_ticket` of an id that is not stored fails with `NotFound`.
pub async fn update_missing_ticket_fails<R: TicketRegistry>(registry: &R) {
    let result = registry.update_ticket(make_ticket_granting_ticket("TGT-ghost")).await;
    assert!(matches!(result, Err(RegistryError::NotFound { .. })), "update of missing: {result:?}");
    assert!(registry.get_ticket("TGT-ghost").await.expect("get").is_none(), "update must not insert");
}

/// `delete_ticket` reports `true` once and `false` afterwards.
pub async fn delete_reports_removal_once<R: TicketRegistry>(registry: &R) {
    registry.add_ticket(make_service_ticket("ST-1", "TGT-1")).await.expect("add");
    assert!(registry.delete_ticket("ST-1").await.expect("first delete"));
    assert!(!registry.delete_ticket("ST-1").await.expect("second delete"));
    assert!(registry.get_ticket("ST-1").await.expect("get").is_none());
}

// ============================================================================
// Typed lookup
// ============================================================================

/// `get_ticket_of` with a non-matching kind returns `Ok(None)`.
pub async fn get_ticket_of_wrong_kind_returns_none<R: TicketRegistry>(registry: &R) {
    registry.add_ticket(make_service_ticket("ST-1", "TGT-1")).await.expect("add");
    let result = registry.get_ticket_of("ST-1", TicketKind::TicketGrantingTicket).await;
    assert!(matches!(result, Ok(None)), "wrong kind should be absent: {result:?}");
    let result = registry.get_ticket_of("ST-1", TicketKind::ProxyTicket).await;
    assert!(matches!(result, Ok(None)), "a service ticket is not a proxy ticket: {result:?}");
}

/// `get_ticket_of` accepts a proxy ticket where a service ticket is expected.
pub async fn get_ticket_of_accepts_subkind<R: TicketRegistry>(registry: &R) {
    registry.add_ticket(make_proxy_ticket("PT-1", "PGT-1")).await.expect("add");
    let ticket = registry
        .get_ticket_of("PT-1", TicketKind::ServiceTicket)
        .await
        .expect("get")
        .expect("proxy ticket is a service ticket");
    assert_eq!(ticket.kind(), TicketKind::ProxyTicket);
}

// ============================================================================
// Consumption
// ============================================================================

/// Concurrent deletes of one ticket produce exactly one `true`.
pub async fn concurrent_delete_has_single_winner<R>(registry: R)
where
    R: TicketRegistry + Clone + 'static,
{
    registry.add_ticket(make_service_ticket("ST-race", "TGT-1")).await.expect("add");

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let registry = registry.clone();
        tasks.spawn(async move { registry.delete_ticket("ST-race").await });
    }

    let mut winners = 0;
    while let Some(result) = tasks.join_next().await {
        if result.expect("task panicked").expect("delete") {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one delete should report removal");
}

// ============================================================================
// Counting
// ============================================================================

/// Counts include sub-kinds and ignore other kinds.
pub async fn counts_sessions_and_service_tickets<R: TicketRegistry>(registry: &R) {
    registry.add_ticket(make_ticket_granting_ticket("TGT-1")).await.expect("add tgt");
    registry.add_ticket(make_service_ticket("ST-1", "TGT-1")).await.expect("add st");
    registry.add_ticket(make_service_ticket("ST-2", "TGT-1")).await.expect("add st");
    registry.add_ticket(make_proxy_ticket("PT-1", "PGT-1")).await.expect("add pt");

    assert_eq!(registry.session_count().await.expect("session count"), 1);
    assert_eq!(registry.service_ticket_count().await.expect("service ticket count"), 3);
}
