use std::marker::PhantomData;

use crate::model::RuleEntity;
use crate::mvi::Reducer;

use super::intent::ImportIntent;
use super::state::BaseImportUiState;

pub struct ImportReducer<E>(PhantomData<E>);

impl<E: RuleEntity> Reducer for ImportReducer<E> {
    type State = BaseImportUiState<E>;
    type Intent = ImportIntent<E>;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            ImportIntent::Start => BaseImportUiState::Loading,

            ImportIntent::Loaded { source, items } => BaseImportUiState::Success {
                source,
                items,
                keep_original_name: false,
                custom_group: None,
                is_add_group: false,
            },

            ImportIntent::Failed { message } => BaseImportUiState::Error { message },

            ImportIntent::ToggleItem { index } => match state {
                BaseImportUiState::Success {
                    source,
                    mut items,
                    keep_original_name,
                    custom_group,
                    is_add_group,
                } => {
                    if let Some(item) = items.get_mut(index) {
                        item.is_selected = !item.is_selected;
                    }
                    BaseImportUiState::Success {
                        source,
                        items,
                        keep_original_name,
                        custom_group,
                        is_add_group,
                    }
                }
                other => other,
            },

            ImportIntent::ToggleAll { selected } => match state {
                BaseImportUiState::Success {
                    source,
                    mut items,
                    keep_original_name,
                    custom_group,
                    is_add_group,
                } => {
                    for item in &mut items {
                        item.is_selected = selected;
                    }
                    BaseImportUiState::Success {
                        source,
                        items,
                        keep_original_name,
                        custom_group,
                        is_add_group,
                    }
                }
                other => other,
            },

            ImportIntent::SetKeepOriginalName { keep } => match state {
                BaseImportUiState::Success {
                    source,
                    items,
                    custom_group,
                    is_add_group,
                    ..
                } => BaseImportUiState::Success {
                    source,
                    items,
                    keep_original_name: keep,
                    custom_group,
                    is_add_group,
                },
                other => other,
            },

            ImportIntent::SetCustomGroup { group, is_add } => match state {
                BaseImportUiState::Success {
                    source,
                    items,
                    keep_original_name,
                    ..
                } => BaseImportUiState::Success {
                    source,
                    items,
                    keep_original_name,
                    custom_group: group.filter(|g| !g.trim().is_empty()),
                    is_add_group: is_add,
                },
                other => other,
            },

            ImportIntent::Reset => BaseImportUiState::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportItemWrapper, ImportStatus};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Rule {
        name: String,
        body: String,
    }

    impl RuleEntity for Rule {
        type Key = String;

        fn key(&self) -> String {
            self.name.clone()
        }

        fn sort_order(&self) -> i32 {
            0
        }

        fn set_sort_order(&mut self, _order: i32) {}
    }

    fn rule(name: &str, body: &str) -> Rule {
        Rule {
            name: name.into(),
            body: body.into(),
        }
    }

    fn reduce(state: BaseImportUiState<Rule>, intent: ImportIntent<Rule>) -> BaseImportUiState<Rule> {
        ImportReducer::<Rule>::reduce(state, intent)
    }

    fn loaded() -> BaseImportUiState<Rule> {
        let items = vec![
            ImportItemWrapper::classify(rule("a", "1"), None, |_, _| true),
            ImportItemWrapper::classify(rule("b", "1"), Some(rule("b", "1")), |n, o| n != o),
        ];
        reduce(
            BaseImportUiState::Loading,
            ImportIntent::Loaded {
                source: "[]".into(),
                items,
            },
        )
    }

    #[test]
    fn classify_covers_all_statuses() {
        let new = ImportItemWrapper::classify(rule("a", "1"), None, |_, _| panic!("not called"));
        assert_eq!(new.status, ImportStatus::New);
        assert!(new.is_selected);

        let update = ImportItemWrapper::classify(rule("a", "2"), Some(rule("a", "1")), |n, o| n != o);
        assert_eq!(update.status, ImportStatus::Update);
        assert!(update.is_selected);

        let same = ImportItemWrapper::classify(rule("a", "1"), Some(rule("a", "1")), |n, o| n != o);
        assert_eq!(same.status, ImportStatus::Existing);
        assert!(!same.is_selected);
    }

    #[test]
    fn start_then_failure() {
        let state = reduce(BaseImportUiState::Idle, ImportIntent::Start);
        assert!(state.is_loading());
        let state = reduce(
            state,
            ImportIntent::Failed {
                message: "bad".into(),
            },
        );
        assert_eq!(state.error_message(), Some("bad"));
    }

    #[test]
    fn success_replaces_error() {
        let state = reduce(
            BaseImportUiState::Error {
                message: "old".into(),
            },
            ImportIntent::Loaded {
                source: String::new(),
                items: Vec::new(),
            },
        );
        assert!(matches!(state, BaseImportUiState::Success { .. }));
        assert_eq!(state.error_message(), None);
    }

    #[test]
    fn toggle_item_flips_only_that_item() {
        let state = reduce(loaded(), ImportIntent::ToggleItem { index: 1 });
        assert!(state.items()[0].is_selected);
        assert!(state.items()[1].is_selected);
        let state = reduce(state, ImportIntent::ToggleItem { index: 7 });
        assert_eq!(state.selected_count(), 2);
    }

    #[test]
    fn toggle_all_sets_every_item() {
        let state = reduce(loaded(), ImportIntent::ToggleAll { selected: false });
        assert_eq!(state.selected_count(), 0);
        let state = reduce(state, ImportIntent::ToggleAll { selected: true });
        assert_eq!(state.selected_count(), 2);
    }

    #[test]
    fn toggles_outside_success_are_noops() {
        for state in [
            BaseImportUiState::Idle,
            BaseImportUiState::Loading,
            BaseImportUiState::Error {
                message: "x".into(),
            },
        ] {
            let after = reduce(state.clone(), ImportIntent::ToggleItem { index: 0 });
            assert_eq!(after, state);
            let after = reduce(state.clone(), ImportIntent::ToggleAll { selected: true });
            assert_eq!(after, state);
            let after = reduce(state.clone(), ImportIntent::SetKeepOriginalName { keep: true });
            assert_eq!(after, state);
        }
    }

    #[test]
    fn options_are_tracked() {
        let state = reduce(loaded(), ImportIntent::SetKeepOriginalName { keep: true });
        let state = reduce(
            state,
            ImportIntent::SetCustomGroup {
                group: Some("net".into()),
                is_add: true,
            },
        );
        let options = state.options().unwrap();
        assert!(options.keep_original_name);
        assert_eq!(options.custom_group.as_deref(), Some("net"));
        assert!(options.is_add_group);

        let state = reduce(
            state,
            ImportIntent::SetCustomGroup {
                group: Some("  ".into()),
                is_add: false,
            },
        );
        assert_eq!(state.options().unwrap().custom_group, None);
    }

    #[test]
    fn reset_from_any_state() {
        assert_eq!(reduce(loaded(), ImportIntent::Reset), BaseImportUiState::Idle);
        assert_eq!(
            reduce(BaseImportUiState::Loading, ImportIntent::Reset),
            BaseImportUiState::Idle
        );
    }
}
