use std::collections::HashSet;

use crate::model::SelectableItem;
use crate::mvi::Intent;

#[derive(Debug, Clone)]
pub enum SelectionIntent<I: SelectableItem> {
    /// Add the id if absent, remove it if present.
    Toggle { id: I::Id },
    /// Replace the whole selection.
    Set { ids: HashSet<I::Id> },
    /// Select every visible id, or clear the selection entirely.
    SelectAll { visible: Vec<I::Id>, selected: bool },
    /// Flip the selection state of every visible id.
    Invert { visible: Vec<I::Id> },
    /// Leaving search mode resets the search key.
    SetSearchMode { enabled: bool },
    /// New search key; always drops the reorder override.
    SetSearchKey { key: String },
    /// Move a row within the list currently on screen.
    MoveItem {
        from: usize,
        to: usize,
        displayed: Vec<I>,
    },
    /// Take deleted rows out of the override.
    RemoveFromOverride { ids: Vec<I::Id> },
    /// Swap override rows for their current versions, dropping rows that
    /// no longer exist. Order and generation are kept.
    RefreshOverride { current: Vec<I> },
    /// Drop the override once the reorder it holds has been persisted.
    /// Ignored when a newer reorder replaced it meanwhile.
    OverrideCommitted { generation: u64 },
}

impl<I: SelectableItem> Intent for SelectionIntent<I> {}
