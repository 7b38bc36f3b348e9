//! Composition keeps running for a grace period after the last subscriber
//! leaves, then pauses until someone subscribes again.

mod common;

use std::time::Duration;

use common::*;
use rulesync::store::RuleStore;

#[tokio::test(start_paused = true)]
async fn updates_publish_within_grace_period() {
    let mut h = spawn_replace(vec![rule(1, "A", 1)]);
    wait_until(&mut h.state, |s| s.base.items.len() == 1).await;
    drop(h.state);
    settle().await;

    tokio::time::sleep(SHARE_STOP / 2).await;
    h.store.upsert_all(vec![rule(2, "B", 2)]).await.unwrap();
    settle().await;
    assert_eq!(h.engine.current().base.items.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn composition_pauses_after_grace_period_and_resumes() {
    let mut h = spawn_replace(vec![rule(1, "A", 1)]);
    wait_until(&mut h.state, |s| s.base.items.len() == 1).await;
    drop(h.state);
    settle().await;

    tokio::time::sleep(SHARE_STOP + Duration::from_secs(1)).await;
    h.store.upsert_all(vec![rule(2, "B", 2)]).await.unwrap();
    settle().await;
    assert_eq!(h.engine.current().base.items.len(), 1);

    let mut rx = h.engine.subscribe();
    let state = wait_until(&mut rx, |s| s.base.items.len() == 2).await;
    assert_eq!(ids(&state.base.items), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn resubscribing_within_grace_period_keeps_state_live() {
    let mut h = spawn_replace(vec![rule(1, "A", 1)]);
    wait_until(&mut h.state, |s| s.base.items.len() == 1).await;
    drop(h.state);
    settle().await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    let mut rx = h.engine.subscribe();
    settle().await;

    tokio::time::sleep(SHARE_STOP * 2).await;
    h.store.upsert_all(vec![rule(2, "B", 2)]).await.unwrap();
    wait_until(&mut rx, |s| s.base.items.len() == 2).await;
}
