#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use url::Url;

use common::{MockBackend, page, record};
use netsight_core::{
    CoreError, MacAddress, Route, Session, SessionConfig, SessionState, SubscriptionKind, View,
};

fn config(live_feeds: bool) -> SessionConfig {
    let mut config = SessionConfig::new(Url::parse("http://127.0.0.1:9/graphql").unwrap());
    config.live_feeds = live_feeds;
    config.customer_name = Some("Clarian".into());
    config
}

fn keys(session: &Session) -> Vec<String> {
    session
        .devices_snapshot()
        .iter()
        .filter_map(|d| d.key().map(str::to_owned))
        .collect()
}

/// Wait until the session holds `n` devices.
async fn wait_for_len(session: &Session, n: usize) {
    let mut stream = session.devices().unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        while stream.latest().len() < n {
            stream.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn activation_sweeps_into_store() {
    let backend = Arc::new(MockBackend::paged(vec![
        page(&["AA:01", "AA:02"], Some("x")),
        page(&["AA:03"], None),
    ]));
    let session = Session::with_backend(config(false), backend);
    assert_eq!(session.state(), SessionState::Inactive);

    session.activate().await.unwrap();
    let outcome = session.wait_for_sweep().await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(keys(&session), ["AA:01", "AA:02", "AA:03"]);

    session.deactivate().await;
    assert_eq!(session.state(), SessionState::Inactive);
}

#[tokio::test]
async fn live_events_append_to_swept_devices() {
    let backend = Arc::new(MockBackend::paged(vec![page(&["AA:01"], None)]));
    let session = Session::with_backend(config(true), backend.clone());

    session.activate().await.unwrap();
    session.wait_for_sweep().await.unwrap();
    backend.wait_subscribed(SubscriptionKind::Updated).await;
    backend.wait_subscribed(SubscriptionKind::Created).await;

    assert!(backend.push(SubscriptionKind::Updated, record("AA:01")).await);
    assert!(backend.push(SubscriptionKind::Created, record("AA:09")).await);
    wait_for_len(&session, 3).await;

    let mut all = keys(&session);
    assert_eq!(all[0], "AA:01");
    all.sort();
    // duplicates are kept
    assert_eq!(all, ["AA:01", "AA:01", "AA:09"]);

    session.deactivate().await;
}

#[tokio::test]
async fn deactivation_stops_feeds_and_reactivation_starts_empty() {
    let backend = Arc::new(MockBackend::new(|call, _| {
        Ok(if call == 0 {
            page(&["AA:01", "AA:02"], None)
        } else {
            page(&[], None)
        })
    }));
    let session = Session::with_backend(config(true), backend.clone());

    session.activate().await.unwrap();
    session.wait_for_sweep().await.unwrap();
    backend.wait_subscribed(SubscriptionKind::Updated).await;
    assert_eq!(session.devices_snapshot().len(), 2);

    session.deactivate().await;
    assert!(!backend.is_subscribed(SubscriptionKind::Updated));
    assert!(!backend.push(SubscriptionKind::Updated, record("AA:03")).await);
    assert!(session.devices_snapshot().is_empty());
    assert!(matches!(session.devices(), Err(CoreError::SessionInactive)));

    session.activate().await.unwrap();
    session.wait_for_sweep().await.unwrap();
    assert!(session.devices_snapshot().is_empty());
    session.deactivate().await;
}

#[tokio::test]
async fn dropping_the_last_handle_ends_the_activation() {
    let backend = Arc::new(
        MockBackend::new(|call, _| {
            let mac = format!("AA:{call:04}");
            Ok(page(&[mac.as_str()], Some("more")))
        })
        .with_page_delay(Duration::from_millis(5)),
    );
    let session = Session::with_backend(config(true), backend.clone());

    session.activate().await.unwrap();
    backend.wait_subscribed(SubscriptionKind::Updated).await;
    backend.wait_subscribed(SubscriptionKind::Created).await;
    assert_eq!(session.state(), SessionState::Sweeping);

    drop(session);

    tokio::time::timeout(Duration::from_secs(2), async {
        while backend.is_subscribed(SubscriptionKind::Updated)
            || backend.is_subscribed(SubscriptionKind::Created)
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let calls = backend.calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.calls(), calls);
    assert!(!backend.push(SubscriptionKind::Updated, record("AA:FF")).await);
}

#[tokio::test]
async fn feed_failure_does_not_stop_the_sweep() {
    let backend = Arc::new(
        MockBackend::paged(vec![page(&["AA:01"], None)]).failing_subscriptions(),
    );
    let session = Session::with_backend(config(true), backend);

    session.activate().await.unwrap();
    let outcome = session.wait_for_sweep().await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(keys(&session), ["AA:01"]);
    session.deactivate().await;
}

#[tokio::test]
async fn run_once_hands_over_the_sweep() {
    let backend = Arc::new(MockBackend::paged(vec![page(&["AA:01"], None)]));
    let session = Session::with_backend(config(false), backend);

    let count = session
        .run_once(|session, outcome| async move {
            assert!(outcome.is_complete());
            Ok(session.devices_snapshot().len())
        })
        .await
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(session.state(), SessionState::Inactive);
}

#[tokio::test]
async fn views_resolve_against_the_snapshot() {
    let backend = Arc::new(MockBackend::paged(vec![page(
        &["AC:CC:8E:0A:69:26", "AA:02"],
        None,
    )]));
    let session = Session::with_backend(config(false), backend);
    session.activate().await.unwrap();
    session.wait_for_sweep().await.unwrap();

    assert!(matches!(
        session.view(Route::parse("/unknown/path")),
        View::NotFound(path) if path == "/unknown/path"
    ));
    assert!(matches!(
        session.view(Route::parse("/devices/ac-cc-8e-0a-69-26")),
        View::DeviceDetail(_)
    ));
    assert!(matches!(
        session.view(Route::Devices),
        View::DeviceList(list) if list.len() == 2
    ));

    let report = session.report();
    assert_eq!(report.customer_name.as_deref(), Some("Clarian"));
    assert_eq!(report.total_devices, 2);

    let mac = MacAddress::new("AA:02");
    assert!(session.device_by_mac(&mac).is_some());
    session.deactivate().await;
}

#[tokio::test]
async fn inactive_session_reports_inactive() {
    let session = Session::with_backend(config(false), Arc::new(MockBackend::paged(Vec::new())));

    assert!(matches!(session.wait_for_sweep().await, Err(CoreError::SessionInactive)));
    assert!(matches!(session.dispatcher(), Err(CoreError::SessionInactive)));
    assert!(matches!(session.view(Route::Devices), View::DeviceList(list) if list.is_empty()));
}

#[tokio::test]
async fn seeding_validates_then_creates() {
    let backend = Arc::new(MockBackend::paged(Vec::new()));
    let session = Session::with_backend(config(false), backend.clone());

    let value = session.seed(None).await.unwrap();
    assert_eq!(
        value["data"]["createDevice"]["macAddress"],
        "AC:CC:8E:0A:69:26"
    );
    assert_eq!(value["data"]["createDevice"]["id"], "dev-1");

    let mut bad = record("NOT_FOUND");
    let err = session.seed(Some(bad.clone())).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));

    bad.mac_address = None;
    assert!(session.seed(Some(bad)).await.is_err());
    assert_eq!(backend.created().len(), 1);
}
