//! Manifests are applied strictly in batch order

mod common;

use common::*;

async fn applied_order(names: &[&str]) -> Vec<String> {
    let h = Harness::new().await;
    h.set_cluster(true, false).await;
    let key = h
        .create_work("ordered", names.iter().map(|n| config_map(n)).collect())
        .await;
    h.reconcile(&key).await.unwrap();
    h.gateway.written_names()
}

#[tokio::test]
async fn manifests_apply_in_order() {
    let names = ["zeta", "alpha", "mid", "beta"];
    assert_eq!(applied_order(&names).await, names);
}

#[tokio::test]
async fn reversing_input_reverses_applied_order() {
    let forward = ["one", "two", "three", "four", "five"];
    let mut backward = forward;
    backward.reverse();

    let mut observed = applied_order(&backward).await;
    observed.reverse();
    assert_eq!(observed, applied_order(&forward).await);
}
