//! Proxy delegation: chains, https enforcement and callback delivery.

#![allow(clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use casticket::{
    CentralTicketService, Service, TicketError, TicketState, assert_invalid_ticket, assert_ticket_error,
    proxy::{PGT_ID_PARAMETER, PGT_IOU_PARAMETER},
    testutil::{TestHarness, make_authentication},
};
use url::Url;

const FIRST_CALLBACK: &str = "https://portal.example.org/pgt";
const SECOND_CALLBACK: &str = "https://backend.example.org/pgt";

fn portal() -> Service {
    Service::new("https://portal.example.org")
}

fn url(s: &str) -> Url {
    Url::parse(s).expect("valid url")
}

// ----------------------------------------------------------------------------
// Chains
// ----------------------------------------------------------------------------

#[tokio::test]
async fn proxy_chain_lists_most_recent_proxy_first() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st1 = h.service.create_service_ticket(tgt.id(), portal(), false).await.expect("st1");

    let pgt1 = h.service.create_proxy_granting_ticket(st1.id(), portal(), FIRST_CALLBACK).await.expect("pgt1");
    let pt1 = h.service.create_proxy_ticket(pgt1.id(), Service::new("https://backend.example.org")).await.expect("pt1");
    assert_eq!(pt1.proxies(), [url(FIRST_CALLBACK)]);

    let pgt2 = h
        .service
        .create_proxy_granting_ticket(pt1.id(), Service::new("https://backend.example.org"), SECOND_CALLBACK)
        .await
        .expect("pgt2");
    let pt2 = h.service.create_proxy_ticket(pgt2.id(), Service::new("https://db.example.org")).await.expect("pt2");
    assert_eq!(pt2.proxies(), [url(SECOND_CALLBACK), url(FIRST_CALLBACK)]);

    let validated = h.service.validate_proxy_ticket(pt2.id()).await.expect("pt2 validates");
    assert_eq!(validated.authentication().principal.id, "alice");
    assert_invalid_ticket!(h.service.validate_proxy_ticket(pt2.id()).await, "proxy tickets are single use");
}

#[tokio::test]
async fn proxy_granting_ticket_outlives_consumed_parent() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), portal(), false).await.expect("st");
    let pgt = h.service.create_proxy_granting_ticket(st.id(), portal(), FIRST_CALLBACK).await.expect("pgt");

    h.service.validate_service_ticket(st.id()).await.expect("consume parent");
    h.service.validate_proxy_granting_ticket(pgt.id()).await.expect("bounded by the session once parent is gone");
    h.service.create_proxy_ticket(pgt.id(), Service::new("https://backend.example.org")).await.expect("pt");
}

#[tokio::test]
async fn service_ticket_validation_rejects_proxy_tickets() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), portal(), false).await.expect("st");
    let pgt = h.service.create_proxy_granting_ticket(st.id(), portal(), FIRST_CALLBACK).await.expect("pgt");
    let pt = h.service.create_proxy_ticket(pgt.id(), Service::new("https://backend.example.org")).await.expect("pt");

    assert_invalid_ticket!(h.service.validate_service_ticket(pt.id()).await);
    h.service.validate_proxy_ticket(pt.id()).await.expect("still unconsumed");
}

#[tokio::test]
async fn logout_revokes_whole_chain() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), portal(), false).await.expect("st");
    let pgt1 = h.service.create_proxy_granting_ticket(st.id(), portal(), FIRST_CALLBACK).await.expect("pgt1");
    let pt1 = h.service.create_proxy_ticket(pgt1.id(), Service::new("https://backend.example.org")).await.expect("pt1");
    let pgt2 = h
        .service
        .create_proxy_granting_ticket(pt1.id(), Service::new("https://backend.example.org"), SECOND_CALLBACK)
        .await
        .expect("pgt2");

    h.service.delete_ticket(tgt.id()).await.expect("logout");

    assert_invalid_ticket!(h.service.validate_proxy_granting_ticket(pgt2.id()).await);
    assert!(h.registry.is_empty());
}

// ----------------------------------------------------------------------------
// https enforcement
// ----------------------------------------------------------------------------

#[tokio::test]
async fn insecure_callback_is_rejected_before_storage() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), portal(), false).await.expect("st");
    let before = h.registry.len();

    assert_ticket_error!(
        h.service.create_proxy_granting_ticket(st.id(), portal(), "http://insecure.example.org/callback").await,
        TicketError::ProxyConstruction { .. }
    );
    assert_ticket_error!(
        h.service.create_proxy_granting_ticket(st.id(), portal(), "not a url").await,
        TicketError::ProxyConstruction { .. }
    );
    assert_eq!(h.registry.len(), before, "nothing stored");
    assert!(h.callbacks.urls().is_empty());
}

// ----------------------------------------------------------------------------
// Callback delivery
// ----------------------------------------------------------------------------

#[tokio::test]
async fn granted_ticket_is_delivered_to_callback() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), portal(), false).await.expect("st");

    let iou = h
        .service
        .grant_proxy_granting_ticket(st.id(), portal(), "https://portal.example.org/pgt?tenant=7")
        .await
        .expect("grant")
        .expect("callback accepted");
    assert!(iou.starts_with("PGTIOU-"), "iou: {iou}");

    let urls = h.callbacks.urls();
    assert_eq!(urls.len(), 1);
    let called = &urls[0];
    assert_eq!(called.host_str(), Some("portal.example.org"));
    let params: Vec<(String, String)> = called.query_pairs().into_owned().collect();
    assert_eq!(params[0], ("tenant".to_owned(), "7".to_owned()));
    assert_eq!(params[1], (PGT_IOU_PARAMETER.to_owned(), iou.clone()));
    assert_eq!(params[2].0, PGT_ID_PARAMETER);

    let pgt_id = &params[2].1;
    let pgt = h.service.validate_proxy_granting_ticket(pgt_id).await.expect("delivered ticket is live");
    assert_eq!(pgt.as_proxy_granting().expect("pgt").pgt_iou(), iou);
}

#[tokio::test]
async fn failed_callback_deletes_ticket() {
    let h = TestHarness::new();
    let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = h.service.create_service_ticket(tgt.id(), portal(), false).await.expect("st");
    h.callbacks.set_failing(true);

    let iou = h.service.grant_proxy_granting_ticket(st.id(), portal(), FIRST_CALLBACK).await.expect("grant");
    assert!(iou.is_none());
    assert_eq!(h.callbacks.urls().len(), 1);
    assert_eq!(h.service.session_count().await.expect("count"), 1, "only the login session remains");
}

#[tokio::test(start_paused = true)]
async fn slow_callback_times_out() {
    let h = TestHarness::new();
    let service = CentralTicketService::builder()
        .registry(Arc::new(h.registry.clone()))
        .factory(Arc::new(h.service.factory().clone()))
        .proxy_callback(Arc::new(h.callbacks.clone()))
        .callback_timeout(Duration::from_millis(100))
        .build();
    let tgt = service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = service.create_service_ticket(tgt.id(), portal(), false).await.expect("st");
    h.callbacks.set_delay(Some(Duration::from_secs(5)));

    let iou = service.grant_proxy_granting_ticket(st.id(), portal(), FIRST_CALLBACK).await.expect("grant");
    assert!(iou.is_none(), "timed out callback counts as failure");
    assert_eq!(service.session_count().await.expect("count"), 1);
}

#[tokio::test]
async fn delivery_without_client_fails() {
    let h = TestHarness::new();
    let service = CentralTicketService::new(
        Arc::new(h.registry.clone()),
        Arc::new(h.service.factory().clone()),
    );
    let tgt = service.create_ticket_granting_ticket(make_authentication("alice")).await.expect("login");
    let st = service.create_service_ticket(tgt.id(), portal(), false).await.expect("st");

    let pgt = service.create_proxy_granting_ticket(st.id(), portal(), FIRST_CALLBACK).await.expect("pgt");
    assert!(service.deliver_proxy_granting_ticket(&pgt).await.is_none());
    assert!(service.deliver_proxy_granting_ticket(&st).await.is_none(), "not a proxy-granting ticket");
}
