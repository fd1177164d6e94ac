//! Contract Test: Reconfiguration
//!
//! Constraints verified:
//! - Each changed dimension restarts exactly its dependent component
//! - Invalid or unreadable candidates leave the active config in force
//! - An identical candidate is a no-op
//! - Reloads preserve the cached IP and the health log
//! - The run loop stops everything on shutdown

mod common;

use common::*;
use ddns_core::config::{Configuration, DEFAULT_HEALTH_PORT};
use ddns_core::{ConfigDiff, Error, ReloadOutcome};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_stream::wrappers::UnboundedReceiverStream;

const SETTLE: Duration = Duration::from_millis(10);

#[tokio::test(start_paused = true)]
async fn bootstrap_starts_listener_and_scheduler() {
    let h = Harness::new(ip("1.2.3.4"), None);

    h.controller.bootstrap(test_config()).await.unwrap();
    sleep(SETTLE).await;

    assert_eq!(h.listener.starts(), vec![DEFAULT_HEALTH_PORT]);
    assert_eq!(h.controller.listener_port().await, Some(DEFAULT_HEALTH_PORT));
    assert_eq!(h.scheduler.interval().await, Some(Duration::from_secs(120)));
    assert_eq!(h.controller.active_config().await, Some(test_config()));
    assert_eq!(h.health.log_len().await, 1);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn invalid_bootstrap_waits_for_valid_config() {
    let h = Harness::new(ip("1.2.3.4"), None);
    let invalid = Configuration::new("", "b", "x.example");

    h.controller.bootstrap(invalid).await.unwrap();
    sleep(SETTLE).await;

    assert_eq!(h.listener.running_port(), Some(DEFAULT_HEALTH_PORT));
    assert!(!h.scheduler.is_running().await);
    assert_eq!(h.controller.active_config().await, None);
    assert_eq!(h.health.log_len().await, 0, "status stays 'starting'");

    let outcome = h.controller.apply(Ok(test_config())).await.unwrap();
    sleep(SETTLE).await;

    assert!(matches!(outcome, ReloadOutcome::Applied(_)));
    assert!(h.scheduler.is_running().await);
    assert_eq!(h.health.log_len().await, 1);
    assert_eq!(h.listener.starts().len(), 1, "same port, listener untouched");

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn interval_change_restarts_only_the_scheduler() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();
    sleep(SETTLE).await;

    let outcome = h
        .controller
        .apply(Ok(test_config().with_interval(600)))
        .await
        .unwrap();
    sleep(SETTLE).await;

    assert_eq!(
        outcome,
        ReloadOutcome::Applied(ConfigDiff {
            interval: true,
            health_port: false,
            target: false,
        })
    );
    assert_eq!(h.scheduler.interval().await, Some(Duration::from_secs(600)));
    assert_eq!(h.listener.stop_count(), 0);
    assert_eq!(h.listener.starts().len(), 1);

    // History and cache survive the restart
    assert_eq!(h.health.log_len().await, 2);
    assert_eq!(h.cycle.cached_ip().await, Some(ip("1.2.3.4")));
    assert_eq!(h.updater.update_call_count(), 1);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn port_change_restarts_only_the_listener() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();
    sleep(SETTLE).await;
    let checks_before = h.discovery.call_count();

    let outcome = h
        .controller
        .apply(Ok(test_config().with_health_port(9090)))
        .await
        .unwrap();
    sleep(SETTLE).await;

    assert_eq!(
        outcome,
        ReloadOutcome::Applied(ConfigDiff {
            interval: false,
            health_port: true,
            target: false,
        })
    );
    assert_eq!(h.listener.starts(), vec![DEFAULT_HEALTH_PORT, 9090]);
    assert_eq!(h.listener.stop_count(), 1);
    assert_eq!(h.controller.listener_port().await, Some(9090));
    assert_eq!(
        h.discovery.call_count(),
        checks_before,
        "scheduler was not restarted (a restart checks immediately)"
    );
    assert_eq!(h.scheduler.interval().await, Some(Duration::from_secs(120)));

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn invalid_reload_keeps_previous_config() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();
    sleep(SETTLE).await;

    let mut invalid = test_config().with_interval(600);
    invalid.user = String::new();

    let outcome = h.controller.apply(Ok(invalid)).await.unwrap();

    assert_eq!(outcome, ReloadOutcome::Rejected);
    assert_eq!(h.controller.active_config().await, Some(test_config()));
    assert_eq!(h.scheduler.interval().await, Some(Duration::from_secs(120)));
    assert!(h.scheduler.is_running().await);

    // A later valid reload resumes normal restarts
    let outcome = h
        .controller
        .apply(Ok(test_config().with_interval(600)))
        .await
        .unwrap();
    assert!(matches!(outcome, ReloadOutcome::Applied(diff) if diff.interval));
    assert_eq!(h.scheduler.interval().await, Some(Duration::from_secs(600)));

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unreadable_reload_is_ignored() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();

    let parse_error = Configuration::from_json("{ not json").unwrap_err();
    let outcome = h.controller.apply(Err(parse_error)).await.unwrap();

    assert_eq!(outcome, ReloadOutcome::Rejected);
    assert_eq!(h.controller.active_config().await, Some(test_config()));
    assert!(h.scheduler.is_running().await);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn identical_reload_is_a_noop() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();
    sleep(SETTLE).await;
    let checks_before = h.discovery.call_count();

    let outcome = h.controller.apply(Ok(test_config())).await.unwrap();
    sleep(SETTLE).await;

    assert_eq!(outcome, ReloadOutcome::Unchanged);
    assert_eq!(h.discovery.call_count(), checks_before);
    assert_eq!(h.listener.starts().len(), 1);
    assert_eq!(h.listener.stop_count(), 0);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn target_change_pushes_to_new_target_without_waiting() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();
    sleep(SETTLE).await;

    let mut moved = test_config();
    moved.ddns = "y.example".to_string();
    let outcome = h.controller.apply(Ok(moved)).await.unwrap();
    sleep(SETTLE).await;

    assert!(matches!(outcome, ReloadOutcome::Applied(diff) if diff.target && !diff.interval));
    assert_eq!(
        h.updater.pushes(),
        vec![
            ("x.example".to_string(), ip("1.2.3.4")),
            ("y.example".to_string(), ip("1.2.3.4")),
        ],
        "new target is updated right after the reload, not a full interval later"
    );
    assert_eq!(h.cycle.cached_ip().await, Some(ip("1.2.3.4")));
    assert_eq!(h.scheduler.interval().await, Some(Duration::from_secs(120)));

    // The regular cadence carries on and finds nothing to push
    sleep(Duration::from_secs(120)).await;
    assert_eq!(h.updater.update_call_count(), 2);
    assert_eq!(h.health.log_len().await, 3);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn target_change_during_push_does_not_cache_old_target() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.updater.set_delay(Some(Duration::from_secs(5)));
    h.controller.bootstrap(test_config()).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.updater.update_call_count(), 1, "push to x.example in flight");

    let mut moved = test_config();
    moved.ddns = "y.example".to_string();
    h.controller.apply(Ok(moved)).await.unwrap();
    assert_eq!(h.cycle.cached_ip().await, None);

    sleep(Duration::from_secs(15)).await;

    assert_eq!(
        h.updater.pushes(),
        vec![
            ("x.example".to_string(), ip("1.2.3.4")),
            ("y.example".to_string(), ip("1.2.3.4")),
        ]
    );
    assert_eq!(h.cycle.cached_ip().await, Some(ip("1.2.3.4")));

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn listener_bind_failure_is_fatal() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();
    h.listener.refuse(9090);

    let err = h
        .controller
        .apply(Ok(test_config().with_health_port(9090)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Listener(_)), "got {:?}", err);
    assert_eq!(h.controller.listener_port().await, None);

    h.controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn run_applies_events_until_shutdown() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(Ok(test_config().with_interval(300))).unwrap();

    let shutdown = sleep(Duration::from_secs(5));
    h.controller
        .run(UnboundedReceiverStream::new(rx), shutdown)
        .await
        .expect("clean shutdown");

    assert_eq!(
        h.controller.active_config().await.map(|c| c.interval),
        Some(300)
    );
    assert!(!h.scheduler.is_running().await);
    assert_eq!(h.listener.running_port(), None);
    assert_eq!(h.controller.listener_port().await, None);

    // Nothing runs after shutdown
    let checks = h.discovery.call_count();
    sleep(Duration::from_secs(900)).await;
    assert_eq!(h.discovery.call_count(), checks);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn run_stops_everything_on_fatal_listener_error() {
    let h = Harness::new(ip("1.2.3.4"), None);
    h.controller.bootstrap(test_config()).await.unwrap();
    h.listener.refuse(9090);

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(Ok(test_config().with_health_port(9090))).unwrap();

    let result = h
        .controller
        .run(UnboundedReceiverStream::new(rx), std::future::pending())
        .await;

    assert!(matches!(result, Err(Error::Listener(_))));
    assert!(!h.scheduler.is_running().await);
}
