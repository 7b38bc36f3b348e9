use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use crate::events::{Notification, NotificationSender};
use crate::export::Uploader;
use crate::feature::RuleFeature;
use crate::import::{BaseImportUiState, ImportIntent, ImportReducer, SourceResolver};
use crate::model::{RuleActionState, RuleEntity, SelectableItem};
use crate::mvi::Reducer;
use crate::selection::{SelectionIntent, SelectionReducer, SelectionState};
use crate::store::RuleStore;

use super::command::{Command, JobEvent};
use super::jobs::{commit_import, resolve_import, UploadJob};

/// Single owner of every mutable cell of one engine.
///
/// Commands from handles and job completions are applied one at a time;
/// after each one the composed state is re-derived and published.
pub(crate) struct EngineActor<F: RuleFeature> {
    pub feature: Arc<F>,
    pub store: Arc<dyn RuleStore<F::Entity>>,
    pub resolver: Arc<SourceResolver>,
    pub uploader: Option<Arc<dyn Uploader>>,
    pub upload_file_name: String,
    pub search_debounce: Duration,
    pub share_stop_timeout: Duration,

    pub commands: mpsc::UnboundedReceiver<Command<F>>,
    pub state_tx: Arc<watch::Sender<F::State>>,
    pub notifier: NotificationSender,
    pub store_rx: watch::Receiver<Vec<F::Entity>>,
}

struct Cells<F: RuleFeature> {
    snapshot: Vec<F::Entity>,
    store_open: bool,
    /// Store snapshot filtered with `debounced_key`.
    filtered: Vec<F::Item>,
    debounced_key: String,
    debounce_deadline: Option<Instant>,
    selection: SelectionState<F::Item>,
    import: BaseImportUiState<F::Entity>,
    /// Confirmation screen parked while its commit is in flight.
    import_saving: Option<BaseImportUiState<F::Entity>>,
    import_generation: u64,
    uploads_in_flight: usize,
    /// When the last subscriber detached; `None` while someone listens.
    idle_since: Option<Instant>,
}

impl<F: RuleFeature> EngineActor<F> {
    pub(crate) async fn run(mut self) {
        let snapshot = self.store_rx.borrow_and_update().clone();
        let (job_tx, mut job_rx) = mpsc::unbounded_channel();
        let mut cells = Cells {
            snapshot,
            store_open: true,
            filtered: Vec::new(),
            debounced_key: String::new(),
            debounce_deadline: None,
            selection: SelectionState::default(),
            import: BaseImportUiState::default(),
            import_saving: None,
            import_generation: 0,
            uploads_in_flight: 0,
            idle_since: None,
        };
        self.refilter(&mut cells);
        self.publish(&cells);

        loop {
            let debounce_deadline = cells.debounce_deadline;
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(&mut cells, command, &job_tx),
                    None => break,
                },
                Some(event) = job_rx.recv() => self.handle_job(&mut cells, event),
                changed = self.store_rx.changed(), if cells.store_open => match changed {
                    Ok(()) => {
                        cells.snapshot = self.store_rx.borrow_and_update().clone();
                        self.refilter(&mut cells);
                        self.refresh_override(&mut cells);
                    }
                    Err(_) => {
                        tracing::warn!("Rule store stream closed; keeping last snapshot");
                        cells.store_open = false;
                    }
                },
                _ = sleep_until(debounce_deadline.unwrap_or_else(Instant::now)), if debounce_deadline.is_some() => {
                    cells.debounce_deadline = None;
                    cells.debounced_key = cells.selection.search_key.clone();
                    self.refilter(&mut cells);
                },
                _ = self.state_tx.closed(), if cells.idle_since.is_none() => {
                    cells.idle_since = Some(Instant::now());
                },
            }
            self.publish(&cells);
        }
        tracing::debug!("Rule engine stopped");
    }

    fn handle_command(
        &self,
        cells: &mut Cells<F>,
        command: Command<F>,
        job_tx: &mpsc::UnboundedSender<JobEvent<F>>,
    ) {
        match command {
            Command::ToggleSelection(id) => self.select(cells, SelectionIntent::Toggle { id }),
            Command::SetSelection(ids) => self.select(cells, SelectionIntent::Set { ids }),
            Command::SelectAll(selected) => {
                let visible = displayed_ids(cells);
                self.select(cells, SelectionIntent::SelectAll { visible, selected });
            }
            Command::InvertSelection => {
                let visible = displayed_ids(cells);
                self.select(cells, SelectionIntent::Invert { visible });
            }
            Command::SetSearchMode(enabled) => {
                self.select(cells, SelectionIntent::SetSearchMode { enabled });
            }
            Command::SetSearchKey(key) => self.select(cells, SelectionIntent::SetSearchKey { key }),
            Command::MoveItem { from, to } => {
                let displayed = displayed(cells);
                self.select(cells, SelectionIntent::MoveItem { from, to, displayed });
            }
            Command::SaveSortOrder => self.save_sort_order(cells, job_tx),
            Command::DeleteSelected => self.delete_selected(cells),
            Command::SetEnabledSelected(enabled) => self.set_enabled_selected(cells, enabled),
            Command::ImportSource(text) => self.import_source(cells, text, job_tx),
            Command::EditImport(intent) => self.edit_import(cells, intent),
            Command::CancelImport => {
                // Results of a resolution still in flight are now stale.
                cells.import_generation += 1;
                self.edit_import(cells, ImportIntent::Reset);
            }
            Command::SaveImportedRules => self.save_imported_rules(cells, job_tx),
            Command::Upload {
                selected_ids,
                rules,
            } => {
                let Some(uploader) = self.uploader.clone() else {
                    return;
                };
                if selected_ids.is_empty() {
                    return;
                }
                cells.uploads_in_flight += 1;
                let job = UploadJob {
                    feature: Arc::clone(&self.feature),
                    uploader,
                    file_name: self.upload_file_name.clone(),
                    rules,
                    selected_ids,
                    notifier: self.notifier.clone(),
                    events: job_tx.clone(),
                };
                tokio::spawn(job.run());
            }
            Command::Subscribed => {
                if self.state_tx.receiver_count() > 0 {
                    cells.idle_since = None;
                }
            }
        }
    }

    fn handle_job(&self, cells: &mut Cells<F>, event: JobEvent<F>) {
        match event {
            JobEvent::ImportResolved {
                generation,
                outcome,
            } => {
                if generation != cells.import_generation {
                    tracing::debug!(generation, "Dropping superseded import result");
                    return;
                }
                let intent = match outcome {
                    Ok((source, items)) => ImportIntent::Loaded { source, items },
                    Err(message) => ImportIntent::Failed { message },
                };
                self.edit_import(cells, intent);
            }
            JobEvent::ImportCommitted { generation, count } => {
                tracing::info!(count, "Import committed");
                cells.import_saving = None;
                if generation == cells.import_generation {
                    self.edit_import(cells, ImportIntent::Reset);
                }
            }
            JobEvent::ImportCommitFailed { generation } => {
                let pending = cells.import_saving.take();
                if generation == cells.import_generation {
                    if let Some(pending) = pending {
                        cells.import = pending;
                    }
                }
            }
            JobEvent::SortOrderSaved { generation } => {
                self.select(cells, SelectionIntent::OverrideCommitted { generation });
            }
            JobEvent::UploadSettled => {
                cells.uploads_in_flight = cells.uploads_in_flight.saturating_sub(1);
            }
        }
    }

    fn select(&self, cells: &mut Cells<F>, intent: SelectionIntent<F::Item>) {
        let previous_key = cells.selection.search_key.clone();
        cells.selection =
            SelectionReducer::<F::Item>::reduce(std::mem::take(&mut cells.selection), intent);
        if cells.selection.search_key != previous_key {
            cells.debounce_deadline = Some(Instant::now() + self.search_debounce);
        }
    }

    fn edit_import(&self, cells: &mut Cells<F>, intent: ImportIntent<F::Entity>) {
        cells.import = ImportReducer::<F::Entity>::reduce(std::mem::take(&mut cells.import), intent);
    }

    fn refilter(&self, cells: &mut Cells<F>) {
        let key = cells.debounced_key.as_str();
        cells.filtered = self
            .feature
            .filter_data(&cells.snapshot, key)
            .iter()
            .map(|entity| self.feature.to_ui_item(entity))
            .collect();
        tracing::debug!(
            key,
            total = cells.snapshot.len(),
            shown = cells.filtered.len(),
            "Rules filtered"
        );
    }

    /// Keep override rows in step with the store after any write.
    fn refresh_override(&self, cells: &mut Cells<F>) {
        if cells.selection.local_override.is_none() {
            return;
        }
        let current = cells
            .snapshot
            .iter()
            .map(|entity| self.feature.to_ui_item(entity))
            .collect();
        self.select(cells, SelectionIntent::RefreshOverride { current });
    }

    fn save_sort_order(&self, cells: &mut Cells<F>, job_tx: &mpsc::UnboundedSender<JobEvent<F>>) {
        let Some(ordered) = cells.selection.local_override.as_ref() else {
            return;
        };
        let generation = cells.selection.override_generation;
        let mut rules = stored_versions(self.feature.as_ref(), &cells.snapshot, ordered);
        for (index, rule) in rules.iter_mut().enumerate() {
            let Some(order) = position_order(index) else {
                tracing::warn!(count = ordered.len(), "Too many rules to number; order not saved");
                self.notifier
                    .send(Notification::message("Too many rules to save their order"));
                return;
            };
            rule.set_sort_order(order);
        }

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        let events = job_tx.clone();
        tokio::spawn(async move {
            match store.upsert_all(rules).await {
                Ok(()) => {
                    if events.send(JobEvent::SortOrderSaved { generation }).is_err() {
                        tracing::debug!("Rule engine stopped before the order save landed");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to save rule order");
                    notifier.send(Notification::failure("Failed to save order", &e));
                }
            }
        });
    }

    fn delete_selected(&self, cells: &mut Cells<F>) {
        let targets: Vec<F::Item> = displayed(cells)
            .into_iter()
            .filter(|item| cells.selection.selected_ids.contains(&item.id()))
            .collect();
        if targets.is_empty() {
            return;
        }

        let mut selected = cells.selection.selected_ids.clone();
        let mut ids = Vec::with_capacity(targets.len());
        let keys: Vec<_> = targets
            .iter()
            .map(|item| {
                selected.remove(&item.id());
                ids.push(item.id());
                self.feature.rule_item_to_entity(item).key()
            })
            .collect();
        self.select(cells, SelectionIntent::Set { ids: selected });
        self.select(cells, SelectionIntent::RemoveFromOverride { ids });

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = store.delete(&keys).await {
                tracing::warn!(error = %e, "Failed to delete rules");
                notifier.send(Notification::failure("Delete failed", &e));
            }
        });
    }

    fn set_enabled_selected(&self, cells: &Cells<F>, enabled: bool) {
        let targets: Vec<F::Item> = displayed(cells)
            .into_iter()
            .filter(|item| cells.selection.selected_ids.contains(&item.id()))
            .collect();
        let rules: Option<Vec<F::Entity>> =
            stored_versions(self.feature.as_ref(), &cells.snapshot, &targets)
                .iter()
                .map(|rule| self.feature.with_enabled(rule, enabled))
                .collect();

        let Some(rules) = rules else {
            self.notifier
                .send(Notification::message("These rules cannot be enabled or disabled"));
            return;
        };
        if rules.is_empty() {
            return;
        }

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = store.upsert_all(rules).await {
                tracing::warn!(error = %e, "Failed to update rules");
                notifier.send(Notification::failure("Update failed", &e));
            }
        });
    }

    fn import_source(
        &self,
        cells: &mut Cells<F>,
        text: String,
        job_tx: &mpsc::UnboundedSender<JobEvent<F>>,
    ) {
        cells.import_generation += 1;
        let generation = cells.import_generation;
        self.edit_import(cells, ImportIntent::Start);

        let feature = Arc::clone(&self.feature);
        let store = Arc::clone(&self.store);
        let resolver = Arc::clone(&self.resolver);
        let events = job_tx.clone();
        tokio::spawn(async move {
            let outcome = resolve_import(feature.as_ref(), store.as_ref(), &resolver, &text)
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, "Import failed");
                    e.to_string()
                });
            if events
                .send(JobEvent::ImportResolved {
                    generation,
                    outcome,
                })
                .is_err()
            {
                tracing::debug!("Rule engine stopped; dropping import result");
            }
        });
    }

    fn save_imported_rules(
        &self,
        cells: &mut Cells<F>,
        job_tx: &mpsc::UnboundedSender<JobEvent<F>>,
    ) {
        let (BaseImportUiState::Success { items, .. }, Some(options)) =
            (&cells.import, cells.import.options())
        else {
            return;
        };
        let wrappers = items.clone();
        let generation = cells.import_generation;
        // Leave Success until the commit settles; repeated saves are no-ops.
        cells.import_saving = Some(std::mem::take(&mut cells.import));
        self.edit_import(cells, ImportIntent::Start);

        let feature = Arc::clone(&self.feature);
        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        let events = job_tx.clone();
        tokio::spawn(async move {
            match commit_import(feature.as_ref(), store.as_ref(), &wrappers, &options).await {
                Ok(count) => {
                    if events
                        .send(JobEvent::ImportCommitted { generation, count })
                        .is_err()
                    {
                        tracing::debug!(count, "Rule engine stopped after import commit");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to write imported rules");
                    if events
                        .send(JobEvent::ImportCommitFailed { generation })
                        .is_err()
                    {
                        tracing::debug!("Rule engine stopped after failed import commit");
                    }
                    notifier.send(Notification::failure("Import failed", &e));
                }
            }
        });
    }

    /// Publish a fresh snapshot if anyone is (or was recently) listening.
    fn publish(&self, cells: &Cells<F>) {
        let active = self.state_tx.receiver_count() > 0
            || cells
                .idle_since
                .map_or(true, |since| since.elapsed() < self.share_stop_timeout);
        if !active {
            return;
        }

        let base = RuleActionState {
            items: displayed(cells),
            selected_ids: cells.selection.selected_ids.clone(),
            search_key: cells.selection.search_key.clone(),
            is_search_mode: cells.selection.is_search_mode,
            is_uploading: cells.uploads_in_flight > 0,
        };
        let state = self.feature.compose_ui_state(base, &cells.import);
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

/// Rows currently on screen: the reorder override while it applies,
/// otherwise the filtered store snapshot.
fn displayed<F: RuleFeature>(cells: &Cells<F>) -> Vec<F::Item> {
    match cells.selection.active_override() {
        Some(items) => items.to_vec(),
        None => cells.filtered.clone(),
    }
}

fn displayed_ids<F: RuleFeature>(cells: &Cells<F>) -> Vec<<F::Item as SelectableItem>::Id> {
    match cells.selection.active_override() {
        Some(items) => items.iter().map(SelectableItem::id).collect(),
        None => cells.filtered.iter().map(SelectableItem::id).collect(),
    }
}

/// Current stored version of each row, in row order. Rows whose rule is
/// no longer stored are skipped.
fn stored_versions<F: RuleFeature>(
    feature: &F,
    snapshot: &[F::Entity],
    rows: &[F::Item],
) -> Vec<F::Entity> {
    let stored: HashMap<_, _> = snapshot.iter().map(|rule| (rule.key(), rule)).collect();
    rows.iter()
        .filter_map(|row| {
            let key = feature.rule_item_to_entity(row).key();
            stored.get(&key).map(|rule| (*rule).clone())
        })
        .collect()
}

/// 1-based sort order for the row at `index`, if it fits the order type.
fn position_order(index: usize) -> Option<i32> {
    i32::try_from(index).ok()?.checked_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_number_from_one_and_stop_at_i32_max() {
        assert_eq!(position_order(0), Some(1));
        assert_eq!(position_order(41), Some(42));
        assert_eq!(position_order(i32::MAX as usize - 1), Some(i32::MAX));
        assert_eq!(position_order(i32::MAX as usize), None);
        assert_eq!(position_order(usize::MAX), None);
    }
}
