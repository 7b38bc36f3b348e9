use std::collections::HashSet;

use crate::model::SelectableItem;
use crate::mvi::UiState;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState<I: SelectableItem> {
    pub selected_ids: HashSet<I::Id>,
    /// Raw search key as typed; filtering uses the debounced copy.
    pub search_key: String,
    pub is_search_mode: bool,
    /// Unsaved drag-reorder result. Displayed instead of the store-derived
    /// list while `search_key` is empty.
    pub local_override: Option<Vec<I>>,
    /// Bumped on every reorder so a late commit cannot drop a newer one.
    pub override_generation: u64,
}

impl<I: SelectableItem> Default for SelectionState<I> {
    fn default() -> Self {
        Self {
            selected_ids: HashSet::new(),
            search_key: String::new(),
            is_search_mode: false,
            local_override: None,
            override_generation: 0,
        }
    }
}

impl<I: SelectableItem> UiState for SelectionState<I> {}

impl<I: SelectableItem> SelectionState<I> {
    /// Override that currently wins over the filtered list, if any.
    pub fn active_override(&self) -> Option<&[I]> {
        if self.search_key.is_empty() {
            self.local_override.as_deref()
        } else {
            None
        }
    }
}
