//! Core data model shared by every rule feature.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A display row with a stable identifier.
///
/// Ids must be unique within one snapshot; list order is display order.
pub trait SelectableItem: Clone + PartialEq + Debug + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

/// A persisted rule.
pub trait RuleEntity:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Identity used by stores for lookup and upsert.
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;

    fn sort_order(&self) -> i32;

    fn set_sort_order(&mut self, order: i32);
}

/// Generic snapshot of a rule list screen.
///
/// `selected_ids` may contain ids that are not in `items`: selections hidden
/// by the current filter are kept until cleared explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleActionState<I: SelectableItem> {
    pub items: Vec<I>,
    pub selected_ids: HashSet<I::Id>,
    pub search_key: String,
    pub is_search_mode: bool,
    pub is_uploading: bool,
}

impl<I: SelectableItem> Default for RuleActionState<I> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected_ids: HashSet::new(),
            search_key: String::new(),
            is_search_mode: false,
            is_uploading: false,
        }
    }
}

impl<I: SelectableItem> RuleActionState<I> {
    pub fn is_selected(&self, id: &I::Id) -> bool {
        self.selected_ids.contains(id)
    }

    /// Selected rows in display order, ignoring hidden selections.
    pub fn selected_items(&self) -> Vec<&I> {
        self.items
            .iter()
            .filter(|item| self.selected_ids.contains(&item.id()))
            .collect()
    }
}
