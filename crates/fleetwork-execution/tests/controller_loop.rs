//! The worker loop driven by store events, and reconcile deadlines

mod common;

use common::*;
use fleetwork_execution::*;
use fleetwork_types::*;
use std::time::Duration;
use tokio::sync::watch;

async fn wait_for<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn run_applies_and_finalizes_from_events() {
    let config = ExecutionConfig {
        workers: 2,
        requeue_delay_ms: 10,
        ..Default::default()
    };
    let h = Harness::with_config(config).await;
    h.set_cluster(true, false).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let existing = h.create_work("existing", vec![config_map("pre")]).await;
    let handle = tokio::spawn(h.controller.clone().run(
        h.works.list_works().await,
        h.works.watch(),
        shutdown_rx,
    ));

    let fresh = h.create_work("fresh", vec![config_map("post")]).await;
    let (hr, existing_key, fresh_key) = (&h, &existing, &fresh);
    wait_for(move || async move {
        let a = hr.works.get_work(existing_key).await.unwrap();
        let b = hr.works.get_work(fresh_key).await.unwrap();
        a.applied_condition().is_some() && b.applied_condition().is_some()
    })
    .await;
    assert_eq!(h.remote_names().await, vec!["post", "pre"]);

    h.works.mark_for_deletion(&fresh).await.unwrap();
    wait_for(move || async move { hr.works.get_work(fresh_key).await.is_err() }).await;
    assert_eq!(h.remote_names().await, vec!["pre"]);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn run_retries_until_cluster_is_ready() {
    let config = ExecutionConfig {
        workers: 1,
        requeue_delay_ms: 10,
        ..Default::default()
    };
    let h = Harness::with_config(config).await;
    h.set_cluster(false, false).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(h.controller.clone().run(Vec::new(), h.works.watch(), shutdown_rx));

    let key = h.create_work("late", vec![config_map("a")]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.remote_names().await.is_empty());

    h.set_cluster(true, false).await;
    let hr = &h;
    wait_for(move || async move { hr.remote_names().await == vec!["a"] }).await;
    let work = h.works.get_work(&key).await.unwrap();
    assert!(is_condition_true(&work.status.conditions, WORK_APPLIED));

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn run_keeps_retrying_teardown_blocked_by_malformed_manifest() {
    let config = ExecutionConfig {
        workers: 1,
        requeue_delay_ms: 10,
        stuck_requeue_delay_ms: 20,
        ..Default::default()
    };
    let h = Harness::with_config(config).await;
    h.set_cluster(true, false).await;
    let key = h.create_work("broken", vec![config_map("a"), malformed()]).await;
    h.works.mark_for_deletion(&key).await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(h.controller.clone().run(
        h.works.list_works().await,
        h.works.watch(),
        shutdown_rx,
    ));

    // Each pass deletes "a" and then stops at the malformed manifest
    let hr = &h;
    wait_for(move || async move {
        let deletes = hr
            .gateway
            .calls()
            .iter()
            .filter(|(op, name)| *op == RemoteOperation::Delete && name == "a")
            .count();
        deletes >= 2
    })
    .await;
    let work = h.works.get_work(&key).await.unwrap();
    assert!(work.metadata.finalizers.contains(EXECUTION_FINALIZER));

    // Dropping the bad manifest lets the next pass release the Work
    h.works
        .update_work_spec(&key, vec![config_map("a")])
        .await
        .unwrap();
    let key_ref = &key;
    wait_for(move || async move { hr.works.get_work(key_ref).await.is_err() }).await;

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn pull_mode_clusters_are_ignored() {
    let h = Harness::new().await;
    let mut pull = cluster(true, false);
    pull.spec.sync_mode = SyncMode::Pull;
    h.clusters.upsert_cluster(pull).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(h.controller.clone().run(Vec::new(), h.works.watch(), shutdown_rx));

    let key = h.create_work("pulled", vec![config_map("a")]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.gateway.calls().is_empty());
    assert!(h.works.get_work(&key).await.unwrap().applied_condition().is_none());

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

// ---------------------------------------------------------------------------
// Deadlines
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_deadline_issues_no_remote_calls() {
    let h = Harness::new().await;
    h.set_cluster(true, false).await;
    let key = h.create_work("late", vec![config_map("a")]).await;

    let ctx = ReconcileContext::with_deadline(tokio::time::Instant::now());
    let err = h.controller.reconcile(&key, &ctx).await.unwrap_err();

    assert!(matches!(err, ExecutionError::DeadlineExceeded));
    assert!(h.gateway.calls().is_empty());
    let work = h.works.get_work(&key).await.unwrap();
    assert!(work.applied_condition().is_none());
}

#[tokio::test(start_paused = true)]
async fn deadline_stops_batch_midway() {
    let h = Harness::new().await;
    h.set_cluster(true, false).await;
    h.gateway.set_latency(Duration::from_millis(10));
    let key = h
        .create_work(
            "slow",
            vec![config_map("a"), config_map("b"), config_map("c"), config_map("d")],
        )
        .await;

    let ctx = ReconcileContext::with_timeout(Duration::from_millis(15));
    let err = h.controller.reconcile(&key, &ctx).await.unwrap_err();

    assert!(matches!(err, ExecutionError::DeadlineExceeded));
    assert_eq!(h.gateway.written_names(), vec!["a", "b"]);
}

#[tokio::test]
async fn expired_deadline_blocks_teardown() {
    let h = Harness::new().await;
    h.set_cluster(true, false).await;
    let key = h.create_work("late", vec![config_map("a")]).await;
    h.reconcile(&key).await.unwrap();
    h.works.mark_for_deletion(&key).await.unwrap();

    let ctx = ReconcileContext::with_deadline(tokio::time::Instant::now());
    let err = h.controller.reconcile(&key, &ctx).await.unwrap_err();

    assert!(matches!(err, ExecutionError::DeadlineExceeded));
    assert_eq!(h.remote_names().await, vec!["a"]);
    let work = h.works.get_work(&key).await.unwrap();
    assert!(work.metadata.finalizers.contains(EXECUTION_FINALIZER));
}
