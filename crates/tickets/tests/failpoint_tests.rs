#![allow(clippy::expect_used, clippy::panic)]
//! Integration tests for fail-point injection.
//!
//! These tests require the `failpoints` feature:
//! ```bash
//! cargo test -p casticket --features failpoints,testutil --test failpoint_tests
//! ```

use casticket::{
    Service, TicketError, TicketState, assert_invalid_ticket, assert_ticket_error,
    testutil::{TestHarness, make_authentication},
};

fn app() -> Service {
    Service::new("https://app.example.org")
}

#[tokio::test]
async fn consume_failpoint_leaves_ticket_unconsumed() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("validate-before-consume", "return").expect("failed to configure fail point");

    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), app(), false).await.expect("st");

    assert_ticket_error!(h.service.validate_service_ticket(st.id()).await, TicketError::Registry(_));
    let stored = h.service.get_ticket(st.id()).await.expect("get").expect("ticket should survive the failure");
    assert_eq!(stored.count_of_uses(), 0, "a failed validation records no use");

    fail::remove("validate-before-consume");
    h.service.validate_service_ticket(st.id()).await.expect("validation succeeds once the fault clears");
    assert_invalid_ticket!(h.service.validate_service_ticket(st.id()).await);

    scenario.teardown();
}

#[tokio::test]
async fn consume_without_failpoint_succeeds() {
    let scenario = fail::FailScenario::setup();
    // No fail point configured

    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), app(), false).await.expect("st");

    h.service.validate_service_ticket(st.id()).await.expect("validate");

    scenario.teardown();
}

#[tokio::test]
async fn grantor_update_failpoint_rolls_back_child() {
    let scenario = fail::FailScenario::setup();

    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");

    fail::cfg("issue-before-grantor-update", "return").expect("failed to configure fail point");
    assert_ticket_error!(h.service.create_service_ticket(tgt.id(), app(), false).await, TicketError::Registry(_));

    assert_eq!(h.service.service_ticket_count().await.expect("count"), 0, "the orphan must be removed");
    let session = h.service.get_ticket(tgt.id()).await.expect("get").expect("session");
    assert_eq!(session.count_of_uses(), 0);
    assert_eq!(session.as_ticket_granting().expect("session").descendant_ids().count(), 0);

    fail::remove("issue-before-grantor-update");
    h.service.create_service_ticket(tgt.id(), app(), false).await.expect("issuance succeeds once the fault clears");
    assert_eq!(h.service.service_ticket_count().await.expect("count"), 1);

    scenario.teardown();
}

#[tokio::test]
async fn proxy_granting_rollback_keeps_session_live() {
    let scenario = fail::FailScenario::setup();

    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), app(), false).await.expect("st");

    fail::cfg("issue-before-grantor-update", "return").expect("failed to configure fail point");
    assert_ticket_error!(
        h.service.create_proxy_granting_ticket(st.id(), app(), "https://app.example.org/pgt").await,
        TicketError::Registry(_)
    );
    fail::remove("issue-before-grantor-update");

    assert_eq!(h.service.session_count().await.expect("count"), 1, "no proxy-granting ticket left behind");
    h.service.validate_ticket_granting_ticket(tgt.id()).await.expect("session unaffected");

    scenario.teardown();
}
