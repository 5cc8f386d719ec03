//! End-to-end ticket lifecycles through the public API.

#![allow(clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use casticket::{
    CentralTicketService, Clock, ExpirationPolicy, OAuthTokenRequest, Service, TicketConfig, TicketError,
    TicketFactory, TicketKind, TicketState, assert_invalid_ticket, assert_ticket_error,
    config::ServiceTicketConfig,
    registry::MemoryTicketRegistry,
    testutil::{ManualClock, TestHarness, make_authentication},
};

fn app() -> Service {
    Service::new("https://app.example.org")
}

// ----------------------------------------------------------------------------
// Login, service access, logout
// ----------------------------------------------------------------------------

#[tokio::test]
async fn login_validate_logout() {
    let h = TestHarness::new();

    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    assert_eq!(tgt.kind(), TicketKind::TicketGrantingTicket);

    let st = h.service.create_service_ticket(tgt.id(), app(), true).await.expect("service ticket");
    let validated = h.service.validate_service_ticket_for(st.id(), &app()).await.expect("first validation");
    assert_eq!(validated.authentication().principal.id, "alice");
    assert!(validated.as_service_ticket().expect("service ticket").is_from_new_login());

    assert_invalid_ticket!(h.service.validate_service_ticket(st.id()).await, "service tickets are single use");

    let session = h.service.validate_ticket_granting_ticket(tgt.id()).await.expect("session still valid");
    assert!(session.as_ticket_granting().expect("session").services().contains_key(st.id()));

    assert!(h.service.delete_ticket(tgt.id()).await.expect("logout"));
    assert_invalid_ticket!(h.service.validate_ticket_granting_ticket(tgt.id()).await);
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn logout_destroys_every_descendant() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");

    let st1 = h.service.create_service_ticket(tgt.id(), app(), false).await.expect("st1");
    let st2 =
        h.service.create_service_ticket(tgt.id(), Service::new("https://mail.example.org"), false).await.expect("st2");
    let pgt = h
        .service
        .create_proxy_granting_ticket(st1.id(), app(), "https://app.example.org/pgt")
        .await
        .expect("pgt");
    let pt = h.service.create_proxy_ticket(pgt.id(), Service::new("https://backend.example.org")).await.expect("pt");
    let at = h
        .service
        .create_access_token(
            OAuthTokenRequest::builder()
                .authentication(make_authentication("alice"))
                .service("https://app.example.org")
                .client_id("app")
                .ticket_granting_ticket(tgt.id())
                .build(),
        )
        .await
        .expect("access token");
    assert_eq!(h.registry.len(), 6);

    assert!(h.service.delete_ticket(tgt.id()).await.expect("logout"));

    for id in [st1.id(), st2.id(), pgt.id(), pt.id(), at.id()] {
        assert!(h.service.get_ticket(id).await.expect("get").is_none(), "{id} should be gone");
    }
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn second_logout_reports_nothing_removed() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    assert!(h.service.delete_ticket(tgt.id()).await.expect("first"));
    assert!(!h.service.delete_ticket(tgt.id()).await.expect("second"));
}

// ----------------------------------------------------------------------------
// Expiration
// ----------------------------------------------------------------------------

#[tokio::test]
async fn service_ticket_dies_with_idle_session() {
    let config = TicketConfig::builder()
        .st(ServiceTicketConfig { number_of_uses: 1, time_to_kill: Duration::from_secs(24 * 60 * 60) })
        .build();
    let h = TestHarness::with_config(&config);
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), app(), false).await.expect("st");

    h.clock.advance(Duration::from_secs(3 * 60 * 60));
    let stored = h.service.get_ticket(st.id()).await.expect("get").expect("stored");
    assert!(!stored.is_expired_at(h.clock.now()), "the ticket's own policy still holds");
    assert!(h.service.is_expired(&stored).await.expect("is_expired"), "the idle session bounds it");
    assert_invalid_ticket!(h.service.validate_service_ticket(st.id()).await);
}

#[tokio::test]
async fn expired_service_ticket_is_removed_on_validation() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), app(), false).await.expect("st");

    h.clock.advance(Duration::from_secs(11));
    assert_invalid_ticket!(h.service.validate_service_ticket(st.id()).await);
    assert!(h.service.get_ticket(st.id()).await.expect("get").is_none());
    assert!(h.service.get_ticket(tgt.id()).await.expect("get").is_some(), "session outlives its ticket");
}

#[tokio::test]
async fn clean_expired_sweeps_stale_sessions() {
    let h = TestHarness::new();
    let stale = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    h.service.create_service_ticket(stale.id(), app(), false).await.expect("st");
    h.clock.advance(Duration::from_secs(3 * 60 * 60));
    let fresh = h.service.create_ticket_granting_ticket(make_authentication("bob")).await.expect("login");

    let removed = h.service.clean_expired().await.expect("clean");
    assert!(removed >= 1);
    assert_eq!(h.service.session_count().await.expect("count"), 1);
    assert_eq!(h.service.service_ticket_count().await.expect("count"), 0);
    assert!(h.service.get_ticket(fresh.id()).await.expect("get").is_some());
}

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

#[tokio::test]
async fn multi_use_service_ticket_from_config() {
    let config = TicketConfig::builder()
        .st(ServiceTicketConfig { number_of_uses: 3, time_to_kill: Duration::from_secs(10) })
        .build();
    let h = TestHarness::with_config(&config);
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), app(), false).await.expect("st");

    for use_number in 1..=3 {
        h.service.validate_service_ticket(st.id()).await.unwrap_or_else(|err| panic!("use {use_number}: {err}"));
    }
    assert_invalid_ticket!(h.service.validate_service_ticket(st.id()).await, "fourth use");
}

#[tokio::test]
async fn wrong_kind_is_invalid() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    assert_invalid_ticket!(h.service.validate_service_ticket(tgt.id()).await);
    assert_invalid_ticket!(h.service.validate_access_token(tgt.id()).await);
    assert!(h.service.get_ticket(tgt.id()).await.expect("get").is_some(), "a kind mismatch consumes nothing");
}

#[tokio::test]
async fn service_mismatch_still_consumes() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), app(), false).await.expect("st");

    let other = Service::new("https://evil.example.org");
    assert_ticket_error!(
        h.service.validate_service_ticket_for(st.id(), &other).await,
        TicketError::ServiceMismatch { .. }
    );
    assert_invalid_ticket!(h.service.validate_service_ticket_for(st.id(), &app()).await);
}

// ----------------------------------------------------------------------------
// Single use under a time-only policy
// ----------------------------------------------------------------------------

/// Sessions never expire; service and proxy tickets only carry a 5s hard
/// timeout and so say nothing about how often they may be used.
fn hard_timeout_service() -> CentralTicketService {
    let five_seconds = ExpirationPolicy::HardTimeout { ttl: Duration::from_secs(5) };
    let factory = TicketFactory::from_config(&TicketConfig::default(), Arc::new(ManualClock::default()))
        .with_policy(TicketKind::TicketGrantingTicket, ExpirationPolicy::NeverExpires)
        .with_policy(TicketKind::ServiceTicket, five_seconds.clone())
        .with_policy(TicketKind::ProxyTicket, five_seconds);
    CentralTicketService::new(Arc::new(MemoryTicketRegistry::new()), Arc::new(factory))
}

#[tokio::test]
async fn hard_timeout_service_ticket_is_single_use() {
    let tickets = hard_timeout_service();
    let tgt = tickets.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = tickets.create_service_ticket(tgt.id(), app(), false).await.expect("st");

    let validated = tickets.validate_service_ticket(st.id()).await.expect("first validation");
    assert_eq!(validated.count_of_uses(), 1);
    assert!(tickets.get_ticket(st.id()).await.expect("get").is_none(), "consumed on first use");
    assert_invalid_ticket!(tickets.validate_service_ticket(st.id()).await, "second validation");
    assert!(tickets.get_ticket(tgt.id()).await.expect("get").is_some());
}

#[tokio::test]
async fn hard_timeout_proxy_ticket_is_single_use() {
    let tickets = hard_timeout_service();
    let tgt = tickets.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = tickets.create_service_ticket(tgt.id(), app(), false).await.expect("st");
    let pgt = tickets.create_proxy_granting_ticket(st.id(), app(), "https://app.example.org/pgt").await.expect("pgt");
    let pt = tickets.create_proxy_ticket(pgt.id(), Service::new("https://backend.example.org")).await.expect("pt");

    let validated = tickets.validate_proxy_ticket(pt.id()).await.expect("first validation");
    assert_eq!(validated.count_of_uses(), 1);
    assert!(tickets.get_ticket(pt.id()).await.expect("get").is_none(), "consumed on first use");
    assert_invalid_ticket!(tickets.validate_proxy_ticket(pt.id()).await, "second validation");
    tickets.validate_proxy_granting_ticket(pgt.id()).await.expect("the proxy-granting ticket lives on");
}
