//! Selection, bulk delete and bulk enable on a live engine.

mod common;

use std::collections::HashSet;

use common::*;
use rulesync::features::ReplaceRule;

fn rules() -> Vec<ReplaceRule> {
    vec![
        rule(1, "Remove ads", 1),
        rule(2, "Fix quotes", 2),
        rule(3, "Strip ads banner", 3),
    ]
}

fn set(ids: &[i64]) -> HashSet<i64> {
    ids.iter().copied().collect()
}

#[tokio::test]
async fn toggle_twice_restores_selection() {
    let mut h = spawn_replace(rules());
    h.engine.toggle_selection(2);
    let state = wait_until(&mut h.state, |s| !s.base.selected_ids.is_empty()).await;
    assert!(state.base.is_selected(&2));

    h.engine.toggle_selection(2);
    wait_until(&mut h.state, |s| s.base.selected_ids.is_empty()).await;
}

#[tokio::test(start_paused = true)]
async fn select_all_covers_only_rows_on_screen() {
    let mut h = spawn_replace(rules());
    h.engine.set_search_key("ads");
    wait_until(&mut h.state, |s| s.base.items.len() == 2).await;

    h.engine.select_all(true);
    let state = wait_until(&mut h.state, |s| !s.base.selected_ids.is_empty()).await;
    assert_eq!(state.base.selected_ids, set(&[1, 3]));

    h.engine.select_all(false);
    wait_until(&mut h.state, |s| s.base.selected_ids.is_empty()).await;
}

#[tokio::test]
async fn invert_flips_visible_rows() {
    let mut h = spawn_replace(rules());
    wait_until(&mut h.state, |s| s.base.items.len() == 3).await;
    h.engine.set_selection(set(&[1]));
    h.engine.invert_selection();
    let state = wait_until(&mut h.state, |s| s.base.selected_ids.len() == 2).await;
    assert_eq!(state.base.selected_ids, set(&[2, 3]));
}

#[tokio::test(start_paused = true)]
async fn hidden_selection_survives_filtering() {
    let mut h = spawn_replace(rules());
    h.engine.set_selection(set(&[1, 2]));
    h.engine.set_search_key("quotes");
    let state = wait_until(&mut h.state, |s| s.base.items.len() == 1).await;

    assert_eq!(state.base.selected_ids, set(&[1, 2]));
    let shown: Vec<i64> = state.base.selected_items().iter().map(|i| i.id).collect();
    assert_eq!(shown, vec![2]);
}

#[tokio::test(start_paused = true)]
async fn delete_selected_removes_displayed_rows_only() {
    let mut h = spawn_replace(rules());
    h.engine.set_selection(set(&[1, 2]));
    h.engine.set_search_key("ads");
    wait_until(&mut h.state, |s| s.base.items.len() == 2).await;

    h.engine.delete_selected();
    let state = wait_until(&mut h.state, |s| s.base.items.len() == 1).await;
    assert_eq!(ids(&state.base.items), vec![3]);
    assert_eq!(state.base.selected_ids, set(&[2]));

    let stored: Vec<i64> = h.store.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(stored, vec![2, 3]);
}

#[tokio::test]
async fn set_enabled_updates_selected_rules() {
    let mut h = spawn_replace(rules());
    wait_until(&mut h.state, |s| s.base.items.len() == 3).await;
    h.engine.set_selection(set(&[1, 3]));
    h.engine.set_enabled_selected(false);

    let state = wait_until(&mut h.state, |s| {
        s.base.items.iter().filter(|i| !i.is_enabled).count() == 2
    })
    .await;
    let enabled: Vec<i64> = state
        .base
        .items
        .iter()
        .filter(|i| i.is_enabled)
        .map(|i| i.id)
        .collect();
    assert_eq!(enabled, vec![2]);
}

#[tokio::test]
async fn set_enabled_without_flag_notifies() {
    let mut h = spawn_with(RecordingFeature::default(), rules(), options());
    wait_until(&mut h.state, |s| s.base.items.len() == 3).await;
    h.engine.set_selection(set(&[1]));
    h.engine.set_enabled_selected(false);

    let notice = next_notification(&mut h.notifications).await;
    assert_eq!(notice.message, "These rules cannot be enabled or disabled");
    assert_eq!(h.store.upsert_count(), 0);
}

#[tokio::test]
async fn failed_delete_is_reported() {
    let mut h = spawn_replace(rules());
    wait_until(&mut h.state, |s| s.base.items.len() == 3).await;
    h.store
        .fail_writes
        .store(true, std::sync::atomic::Ordering::SeqCst);
    h.engine.set_selection(set(&[1]));
    h.engine.delete_selected();

    let notice = next_notification(&mut h.notifications).await;
    assert!(notice.message.starts_with("Delete failed: "), "{}", notice.message);
    assert!(notice.message.contains("disk full"), "{}", notice.message);
    assert_eq!(h.store.snapshot().len(), 3);
}
