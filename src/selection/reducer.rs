use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use crate::model::SelectableItem;
use crate::mvi::Reducer;

use super::intent::SelectionIntent;
use super::state::SelectionState;

pub struct SelectionReducer<I>(PhantomData<I>);

impl<I: SelectableItem> Reducer for SelectionReducer<I> {
    type State = SelectionState<I>;
    type Intent = SelectionIntent<I>;

    fn reduce(mut state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            SelectionIntent::Toggle { id } => {
                if !state.selected_ids.remove(&id) {
                    state.selected_ids.insert(id);
                }
                state
            }
            SelectionIntent::Set { ids } => {
                state.selected_ids = ids;
                state
            }
            SelectionIntent::SelectAll { visible, selected } => {
                if selected {
                    state.selected_ids.extend(visible);
                } else {
                    state.selected_ids.clear();
                }
                state
            }
            SelectionIntent::Invert { visible } => {
                for id in visible {
                    if !state.selected_ids.remove(&id) {
                        state.selected_ids.insert(id);
                    }
                }
                state
            }
            SelectionIntent::SetSearchMode { enabled } => {
                state.is_search_mode = enabled;
                if !enabled {
                    state.search_key.clear();
                    state.local_override = None;
                }
                state
            }
            SelectionIntent::SetSearchKey { key } => {
                state.search_key = key;
                state.local_override = None;
                state
            }
            SelectionIntent::MoveItem {
                from,
                to,
                mut displayed,
            } => {
                // Reordering a filtered view has no meaningful persisted order.
                if !state.search_key.is_empty() {
                    return state;
                }
                if from >= displayed.len() || to >= displayed.len() {
                    return state;
                }
                let item = displayed.remove(from);
                displayed.insert(to, item);
                state.local_override = Some(displayed);
                state.override_generation += 1;
                state
            }
            SelectionIntent::RemoveFromOverride { ids } => {
                if let Some(rows) = state.local_override.as_mut() {
                    let ids: HashSet<I::Id> = ids.into_iter().collect();
                    rows.retain(|row| !ids.contains(&row.id()));
                }
                state
            }
            SelectionIntent::RefreshOverride { current } => {
                if let Some(rows) = state.local_override.take() {
                    let mut current: HashMap<I::Id, I> =
                        current.into_iter().map(|row| (row.id(), row)).collect();
                    let rows = rows
                        .into_iter()
                        .filter_map(|row| current.remove(&row.id()))
                        .collect();
                    state.local_override = Some(rows);
                }
                state
            }
            SelectionIntent::OverrideCommitted { generation } => {
                if state.override_generation == generation {
                    state.local_override = None;
                }
                state
            }
        }
    }
}
