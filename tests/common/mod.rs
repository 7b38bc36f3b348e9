//! Shared test utilities: engine setup, instrumented stores and features,
//! scripted uploaders.

#![allow(dead_code, unused_imports)]

pub mod mock_server;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rulesync::config::ImportConfig;
use rulesync::engine::{EngineOptions, RuleEngine};
use rulesync::events::{Notification, Notifications};
use rulesync::export::{UploadError, Uploader};
use rulesync::feature::RuleFeature;
use rulesync::features::{ReplaceRule, ReplaceRuleFeature, ReplaceRuleItem, ReplaceRuleUiState};
use rulesync::import::{BaseImportUiState, ImportItemWrapper, ImportOptions, SourceResolver};
use rulesync::model::RuleActionState;
use rulesync::store::{MemoryStore, RuleStore, StoreError};
use tokio::sync::{watch, Notify};

pub const DEBOUNCE: Duration = Duration::from_millis(300);
pub const SHARE_STOP: Duration = Duration::from_secs(5);
const WAIT: Duration = Duration::from_secs(10);

/// Replace rule with a fixed id and position.
pub fn rule(id: i64, name: &str, order: i32) -> ReplaceRule {
    let mut rule = ReplaceRule::new(name, format!("{}-pattern", name), "");
    rule.id = id;
    rule.order = order;
    rule
}

pub fn options() -> EngineOptions {
    EngineOptions {
        search_debounce: DEBOUNCE,
        share_stop_timeout: SHARE_STOP,
        upload_file_name: "rules.json".to_string(),
        uploader: None,
        resolver: Arc::new(
            SourceResolver::new(&ImportConfig::default()).expect("Failed to build resolver"),
        ),
    }
}

pub struct Harness<F: RuleFeature> {
    pub engine: RuleEngine<F>,
    pub store: Arc<CountingStore<F::Entity>>,
    pub notifications: Notifications,
    pub state: watch::Receiver<F::State>,
}

pub fn spawn_with<F: RuleFeature>(
    feature: F,
    rules: Vec<F::Entity>,
    options: EngineOptions,
) -> Harness<F> {
    let store = Arc::new(CountingStore::new(rules));
    let dyn_store: Arc<dyn RuleStore<F::Entity>> = store.clone();
    let (engine, notifications) = RuleEngine::spawn(Arc::new(feature), dyn_store, options);
    let state = engine.subscribe();
    Harness {
        engine,
        store,
        notifications,
        state,
    }
}

pub fn spawn_replace(rules: Vec<ReplaceRule>) -> Harness<ReplaceRuleFeature> {
    spawn_with(ReplaceRuleFeature, rules, options())
}

/// Wait until the published state satisfies `predicate`.
pub async fn wait_until<S: Clone>(rx: &mut watch::Receiver<S>, predicate: impl FnMut(&S) -> bool) -> S {
    let state = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("Timed out waiting for state")
        .expect("Engine stopped");
    (*state).clone()
}

pub async fn next_notification(notifications: &mut Notifications) -> Notification {
    tokio::time::timeout(WAIT, notifications.recv())
        .await
        .expect("Timed out waiting for notification")
        .expect("Notification channel closed")
}

/// Let spawned tasks and the engine actor run to quiescence.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn ids(items: &[ReplaceRuleItem]) -> Vec<i64> {
    items.iter().map(|item| item.id).collect()
}

pub fn base(state: &ReplaceRuleUiState) -> &RuleActionState<ReplaceRuleItem> {
    &state.base
}

/// Memory store counting writes, optionally failing them.
pub struct CountingStore<E: rulesync::model::RuleEntity> {
    inner: MemoryStore<E>,
    pub upserts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl<E: rulesync::model::RuleEntity> CountingStore<E> {
    pub fn new(rules: Vec<E>) -> Self {
        Self {
            inner: MemoryStore::with_rules(rules),
            upserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Vec<E> {
        self.inner.snapshot()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: "memory".to_string(),
                source: std::io::Error::other("disk full"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<E: rulesync::model::RuleEntity> RuleStore<E> for CountingStore<E> {
    fn observe(&self) -> watch::Receiver<Vec<E>> {
        self.inner.observe()
    }

    async fn find(&self, key: &E::Key) -> Result<Option<E>, StoreError> {
        self.inner.find(key).await
    }

    async fn upsert_all(&self, rules: Vec<E>) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.upsert_all(rules).await
    }

    async fn delete(&self, keys: &[E::Key]) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.delete(keys).await
    }
}

/// Replace rule feature that records every filter key it is asked for.
#[derive(Default)]
pub struct RecordingFeature {
    inner: ReplaceRuleFeature,
    pub keys: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl RuleFeature for RecordingFeature {
    type Entity = ReplaceRule;
    type Item = ReplaceRuleItem;
    type State = ReplaceRuleUiState;

    fn filter_data(&self, data: &[ReplaceRule], key: &str) -> Vec<ReplaceRule> {
        self.keys.lock().push(key.to_string());
        self.inner.filter_data(data, key)
    }

    fn to_ui_item(&self, entity: &ReplaceRule) -> ReplaceRuleItem {
        self.inner.to_ui_item(entity)
    }

    fn rule_item_to_entity(&self, item: &ReplaceRuleItem) -> ReplaceRule {
        self.inner.rule_item_to_entity(item)
    }

    fn has_changed(&self, new: &ReplaceRule, old: &ReplaceRule) -> bool {
        self.inner.has_changed(new, old)
    }

    async fn find_old_rule(
        &self,
        store: &dyn RuleStore<ReplaceRule>,
        candidate: &ReplaceRule,
    ) -> Result<Option<ReplaceRule>, StoreError> {
        self.inner.find_old_rule(store, candidate).await
    }

    fn prepare_import(&self, wrapper: &ImportItemWrapper<ReplaceRule>, options: &ImportOptions) -> ReplaceRule {
        self.inner.prepare_import(wrapper, options)
    }

    fn compose_ui_state(
        &self,
        base: RuleActionState<ReplaceRuleItem>,
        import: &BaseImportUiState<ReplaceRule>,
    ) -> ReplaceRuleUiState {
        self.inner.compose_ui_state(base, import)
    }

    fn import_state<'a>(&self, state: &'a ReplaceRuleUiState) -> &'a BaseImportUiState<ReplaceRule> {
        &state.import
    }
}

/// Uploader that holds every upload until released, then answers with a
/// scripted outcome.
pub struct GatedUploader {
    gate: Notify,
    outcome: Result<String, u16>,
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl GatedUploader {
    pub fn succeeding(url: &str) -> Arc<Self> {
        Arc::new(Self {
            gate: Notify::new(),
            outcome: Ok(url.to_string()),
            uploads: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            gate: Notify::new(),
            outcome: Err(status),
            uploads: Mutex::new(Vec::new()),
        })
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Uploader for GatedUploader {
    async fn upload(
        &self,
        file_name: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, UploadError> {
        self.uploads.lock().push((file_name.to_string(), content));
        self.gate.notified().await;
        match &self.outcome {
            Ok(url) => Ok(url.clone()),
            Err(status) => Err(UploadError::Status { status: *status }),
        }
    }
}
