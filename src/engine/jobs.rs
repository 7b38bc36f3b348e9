//! Background work spawned by the engine actor.
//!
//! Jobs never touch actor state. They report back through `JobEvent`s or
//! the notification channel.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::events::{Notification, NotificationSender};
use crate::export::{collect_selected, UploadError, Uploader, JSON_CONTENT_TYPE};
use crate::feature::RuleFeature;
use crate::import::{ImportError, ImportItemWrapper, ImportOptions, SourceResolver};
use crate::model::RuleEntity;
use crate::store::{RuleStore, StoreError};

use super::command::{ItemId, JobEvent};

pub(crate) type Resolved<E> = (String, Vec<ImportItemWrapper<E>>);

/// Resolve, parse and classify import text.
pub(crate) async fn resolve_import<F: RuleFeature>(
    feature: &F,
    store: &dyn RuleStore<F::Entity>,
    resolver: &SourceResolver,
    text: &str,
) -> Result<Resolved<F::Entity>, ImportError> {
    let source = resolver.resolve(text).await?;
    let candidates = feature.parse_import_rules(&source)?;

    let mut items = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let old = feature.find_old_rule(store, &candidate).await?;
        items.push(ImportItemWrapper::classify(candidate, old, |new, old| {
            feature.has_changed(new, old)
        }));
    }
    tracing::info!(count = items.len(), "Import source classified");
    Ok((source, items))
}

/// Write the selected import candidates in one upsert.
///
/// Replaced rules keep their stored position; new rules are appended after
/// the current last rule in import order.
pub(crate) async fn commit_import<F: RuleFeature>(
    feature: &F,
    store: &dyn RuleStore<F::Entity>,
    wrappers: &[ImportItemWrapper<F::Entity>],
    options: &ImportOptions,
) -> Result<usize, StoreError> {
    let selected: Vec<_> = wrappers.iter().filter(|w| w.is_selected).collect();
    if selected.is_empty() {
        return Ok(0);
    }

    let mut next_order = store
        .observe()
        .borrow()
        .iter()
        .map(RuleEntity::sort_order)
        .max()
        .unwrap_or(0);

    let rules: Vec<F::Entity> = selected
        .into_iter()
        .map(|wrapper| {
            let mut rule = feature.prepare_import(wrapper, options);
            match &wrapper.old_data {
                Some(old) => rule.set_sort_order(old.sort_order()),
                None => {
                    next_order += 1;
                    rule.set_sort_order(next_order);
                }
            }
            rule
        })
        .collect();

    let count = rules.len();
    store.upsert_all(rules).await?;
    tracing::info!(count, "Imported rules written");
    Ok(count)
}

pub(crate) struct UploadJob<F: RuleFeature> {
    pub feature: Arc<F>,
    pub uploader: Arc<dyn Uploader>,
    pub file_name: String,
    pub rules: Vec<F::Item>,
    pub selected_ids: HashSet<ItemId<F>>,
    pub notifier: NotificationSender,
    pub events: mpsc::UnboundedSender<JobEvent<F>>,
}

impl<F: RuleFeature> UploadJob<F> {
    pub(crate) async fn run(self) {
        // Reports the upload as settled however this future ends, including
        // when it is dropped mid-flight.
        let _settled = scopeguard::guard(self.events, |events| {
            if events.send(JobEvent::UploadSettled).is_err() {
                tracing::debug!("Rule engine stopped before the upload settled");
            }
        });

        let feature = self.feature;
        let rules = self.rules;
        let selected_ids = self.selected_ids;
        let serialized = tokio::task::spawn_blocking(move || {
            let entities = collect_selected(feature.as_ref(), &rules, &selected_ids);
            feature.generate_json(&entities)
        })
        .await;

        let result = match serialized {
            Ok(Ok(json)) => {
                self.uploader
                    .upload(&self.file_name, json.into_bytes(), JSON_CONTENT_TYPE)
                    .await
            }
            Ok(Err(e)) => Err(UploadError::Serialize(e.to_string())),
            Err(e) => Err(UploadError::Serialize(e.to_string())),
        };

        match result {
            Ok(url) => self
                .notifier
                .send(Notification::link("Upload succeeded", url)),
            Err(e) => {
                tracing::warn!(error = %e, "Upload failed");
                self.notifier
                    .send(Notification::failure("Upload failed", &e));
            }
        }
    }
}
