use std::collections::HashSet;

use crate::feature::RuleFeature;
use crate::import::{ImportIntent, ImportItemWrapper};
use crate::model::SelectableItem;

/// Identifier type of a feature's display rows.
pub type ItemId<F> = <<F as RuleFeature>::Item as SelectableItem>::Id;

/// Operations sent from an engine handle to its actor.
pub(crate) enum Command<F: RuleFeature> {
    ToggleSelection(ItemId<F>),
    SetSelection(HashSet<ItemId<F>>),
    SelectAll(bool),
    InvertSelection,
    SetSearchMode(bool),
    SetSearchKey(String),
    MoveItem { from: usize, to: usize },
    SaveSortOrder,
    DeleteSelected,
    SetEnabledSelected(bool),
    ImportSource(String),
    EditImport(ImportIntent<F::Entity>),
    CancelImport,
    SaveImportedRules,
    Upload {
        selected_ids: HashSet<ItemId<F>>,
        rules: Vec<F::Item>,
    },
    /// A new state subscriber attached.
    Subscribed,
}

/// Completions of background jobs, marshaled back onto the actor.
pub(crate) enum JobEvent<F: RuleFeature> {
    ImportResolved {
        generation: u64,
        outcome: Result<(String, Vec<ImportItemWrapper<F::Entity>>), String>,
    },
    ImportCommitted { generation: u64, count: usize },
    ImportCommitFailed { generation: u64 },
    SortOrderSaved { generation: u64 },
    UploadSettled,
}
