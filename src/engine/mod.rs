//! The rule engine: a per-feature actor that keeps a searchable,
//! selectable, reorderable rule list in sync with a [`RuleStore`].
//!
//! ```text
//! store stream ─→ filter (debounced key) ─┐
//! selection / override ───────────────────┼─→ compose ─→ watch<State>
//! import state / upload flag ─────────────┘
//! ```
//!
//! All operations on [`RuleEngine`] are fire-and-forget; results show up in
//! the composed state or on the [`Notifications`] channel.

mod actor;
mod command;
mod jobs;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::events::{notification_channel, Notification, NotificationSender, Notifications};
use crate::export::{collect_selected, write_export, ExportError, HttpUploader, Uploader};
use crate::feature::RuleFeature;
use crate::import::{to_single_json, ImportIntent, SourceResolver};
use crate::store::RuleStore;

use actor::EngineActor;
pub use command::ItemId;

use command::Command;

/// Collaborators and timings for one engine instance.
pub struct EngineOptions {
    pub search_debounce: Duration,
    /// How long composition continues after the last subscriber leaves.
    pub share_stop_timeout: Duration,
    pub upload_file_name: String,
    pub uploader: Option<Arc<dyn Uploader>>,
    pub resolver: Arc<SourceResolver>,
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let resolver = Arc::new(SourceResolver::new(&config.import)?);
        let uploader: Option<Arc<dyn Uploader>> = if config.upload.is_enabled() {
            let timeout = Duration::from_secs(config.import.timeout_seconds);
            Some(Arc::new(HttpUploader::new(
                config.upload.endpoint.trim(),
                timeout,
            )?))
        } else {
            None
        };

        Ok(Self {
            search_debounce: config.engine.search_debounce(),
            share_stop_timeout: config.engine.share_stop_timeout(),
            upload_file_name: config.upload.file_name.clone(),
            uploader,
            resolver,
        })
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }
}

/// Handle to a running engine. Cheap to clone; the actor stops when the
/// last handle is dropped.
pub struct RuleEngine<F: RuleFeature> {
    commands: mpsc::UnboundedSender<Command<F>>,
    state: Arc<watch::Sender<F::State>>,
    feature: Arc<F>,
    notifier: NotificationSender,
}

impl<F: RuleFeature> Clone for RuleEngine<F> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            state: Arc::clone(&self.state),
            feature: Arc::clone(&self.feature),
            notifier: self.notifier.clone(),
        }
    }
}

impl<F: RuleFeature> RuleEngine<F> {
    /// Start the engine actor on the current tokio runtime.
    pub fn spawn(
        feature: Arc<F>,
        store: Arc<dyn RuleStore<F::Entity>>,
        options: EngineOptions,
    ) -> (Self, Notifications) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(F::State::default());
        let state_tx = Arc::new(state_tx);
        let (notifier, notifications) = notification_channel();

        let actor = EngineActor {
            feature: Arc::clone(&feature),
            store_rx: store.observe(),
            store,
            resolver: options.resolver,
            uploader: options.uploader,
            upload_file_name: options.upload_file_name,
            search_debounce: options.search_debounce,
            share_stop_timeout: options.share_stop_timeout,
            commands: command_rx,
            state_tx: Arc::clone(&state_tx),
            notifier: notifier.clone(),
        };
        tokio::spawn(actor.run());

        let engine = Self {
            commands: command_tx,
            state: state_tx,
            feature,
            notifier,
        };
        (engine, notifications)
    }

    /// Observe the composed state. Composition resumes if it had paused
    /// for lack of subscribers.
    pub fn subscribe(&self) -> watch::Receiver<F::State> {
        let rx = self.state.subscribe();
        self.send(Command::Subscribed);
        rx
    }

    /// Last published snapshot.
    pub fn current(&self) -> F::State {
        self.state.borrow().clone()
    }

    pub fn feature(&self) -> &F {
        &self.feature
    }

    pub fn toggle_selection(&self, id: ItemId<F>) {
        self.send(Command::ToggleSelection(id));
    }

    pub fn set_selection(&self, ids: HashSet<ItemId<F>>) {
        self.send(Command::SetSelection(ids));
    }

    /// Select every row on screen, or clear the whole selection.
    pub fn select_all(&self, selected: bool) {
        self.send(Command::SelectAll(selected));
    }

    pub fn invert_selection(&self) {
        self.send(Command::InvertSelection);
    }

    pub fn set_search_mode(&self, enabled: bool) {
        self.send(Command::SetSearchMode(enabled));
    }

    pub fn set_search_key(&self, key: impl Into<String>) {
        self.send(Command::SetSearchKey(key.into()));
    }

    /// Reorder the displayed list locally. Persist with
    /// [`save_sort_order`](Self::save_sort_order).
    pub fn move_item_in_list(&self, from: usize, to: usize) {
        self.send(Command::MoveItem { from, to });
    }

    pub fn save_sort_order(&self) {
        self.send(Command::SaveSortOrder);
    }

    /// Delete the selected rows currently on screen.
    pub fn delete_selected(&self) {
        self.send(Command::DeleteSelected);
    }

    pub fn set_enabled_selected(&self, enabled: bool) {
        self.send(Command::SetEnabledSelected(enabled));
    }

    /// Start an import from a URL, a `file://` reference or literal JSON.
    /// Supersedes any import still resolving.
    pub fn import_source(&self, text: impl Into<String>) {
        self.send(Command::ImportSource(text.into()));
    }

    pub fn toggle_import_selection(&self, index: usize) {
        self.send(Command::EditImport(ImportIntent::ToggleItem { index }));
    }

    pub fn toggle_import_all(&self, selected: bool) {
        self.send(Command::EditImport(ImportIntent::ToggleAll { selected }));
    }

    pub fn set_keep_original_name(&self, keep: bool) {
        self.send(Command::EditImport(ImportIntent::SetKeepOriginalName { keep }));
    }

    pub fn set_custom_group(&self, group: Option<String>, is_add: bool) {
        self.send(Command::EditImport(ImportIntent::SetCustomGroup { group, is_add }));
    }

    pub fn cancel_import(&self) {
        self.send(Command::CancelImport);
    }

    /// Write the selected import candidates and return to idle.
    pub fn save_imported_rules(&self) {
        self.send(Command::SaveImportedRules);
    }

    pub fn upload_selected_rules(&self, selected_ids: HashSet<ItemId<F>>, rules: Vec<F::Item>) {
        self.send(Command::Upload {
            selected_ids,
            rules,
        });
    }

    /// Export the selected rows to `dest` as a JSON array.
    ///
    /// Outcomes are reported on the notification channel; returns whether
    /// anything was written.
    pub async fn export_to<W>(
        &self,
        dest: &mut W,
        rules: &[F::Item],
        selected_ids: &HashSet<ItemId<F>>,
    ) -> bool
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let result = write_export(self.feature.as_ref(), dest, rules, selected_ids).await;
        self.report_export(result)
    }

    /// Like [`export_to`](Self::export_to), creating the file at `path`
    /// only when there is something to write.
    pub async fn export_to_path(
        &self,
        path: &Path,
        rules: &[F::Item],
        selected_ids: &HashSet<ItemId<F>>,
    ) -> bool {
        if collect_selected(self.feature.as_ref(), rules, selected_ids).is_empty() {
            return self.report_export(Err(ExportError::Nothing));
        }
        let mut file = match tokio::fs::File::create(path).await {
            Ok(file) => file,
            Err(e) => return self.report_export(Err(ExportError::Io(e))),
        };
        self.export_to(&mut file, rules, selected_ids).await
    }

    /// One rule as a standalone JSON object, for clipboard or sharing.
    pub fn copy_rule_json(&self, item: &F::Item) -> Result<String, serde_json::Error> {
        to_single_json(&self.feature.rule_item_to_entity(item))
    }

    fn report_export(&self, result: Result<usize, ExportError>) -> bool {
        match result {
            Ok(count) => {
                tracing::info!(count, "Rules exported");
                self.notifier
                    .send(Notification::message(format!("Exported {} rules", count)));
                true
            }
            Err(ExportError::Nothing) => {
                self.notifier
                    .send(Notification::message("Nothing to export"));
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Export failed");
                self.notifier.send(Notification::failure("Export failed", &e));
                false
            }
        }
    }

    fn send(&self, command: Command<F>) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Rule engine is not running; command dropped");
        }
    }
}
