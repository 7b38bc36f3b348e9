//! Chapter detection rules for plain-text books.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::feature::RuleFeature;
use crate::import::{BaseImportUiState, ImportItemWrapper, ImportOptions};
use crate::model::{RuleActionState, RuleEntity, SelectableItem};
use crate::mvi::UiState;
use crate::store::{RuleStore, StoreError};

use super::{contains_ignore_case, find_in_snapshot, next_rule_id};

fn default_enable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxtTocRule {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    /// Regex matched against each line to find chapter titles.
    pub rule: String,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub serial_number: i32,
    #[serde(default = "default_enable")]
    pub enable: bool,
}

impl RuleEntity for TxtTocRule {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn sort_order(&self) -> i32 {
        self.serial_number
    }

    fn set_sort_order(&mut self, order: i32) {
        self.serial_number = order;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TocRuleItem {
    pub id: i64,
    pub name: String,
    pub example: Option<String>,
    pub enable: bool,
    pub rule: TxtTocRule,
}

impl SelectableItem for TocRuleItem {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TocRuleUiState {
    pub base: RuleActionState<TocRuleItem>,
    pub import: BaseImportUiState<TxtTocRule>,
    pub enabled_count: usize,
}

impl UiState for TocRuleUiState {}

#[derive(Debug, Default)]
pub struct TocRuleFeature;

#[async_trait]
impl RuleFeature for TocRuleFeature {
    type Entity = TxtTocRule;
    type Item = TocRuleItem;
    type State = TocRuleUiState;

    fn filter_data(&self, data: &[TxtTocRule], key: &str) -> Vec<TxtTocRule> {
        let key = key.trim();
        data.iter()
            .filter(|r| {
                contains_ignore_case(&r.name, key)
                    || r.example
                        .as_deref()
                        .is_some_and(|e| contains_ignore_case(e, key))
            })
            .cloned()
            .collect()
    }

    fn to_ui_item(&self, entity: &TxtTocRule) -> TocRuleItem {
        TocRuleItem {
            id: entity.id,
            name: entity.name.clone(),
            example: entity.example.clone(),
            enable: entity.enable,
            rule: entity.clone(),
        }
    }

    fn rule_item_to_entity(&self, item: &TocRuleItem) -> TxtTocRule {
        item.rule.clone()
    }

    fn has_changed(&self, new: &TxtTocRule, old: &TxtTocRule) -> bool {
        new.name != old.name || new.rule != old.rule || new.example != old.example
    }

    async fn find_old_rule(
        &self,
        store: &dyn RuleStore<TxtTocRule>,
        candidate: &TxtTocRule,
    ) -> Result<Option<TxtTocRule>, StoreError> {
        if candidate.id != 0 {
            return store.find(&candidate.id).await;
        }
        Ok(find_in_snapshot(store, |r| r.name == candidate.name))
    }

    fn prepare_import(
        &self,
        wrapper: &ImportItemWrapper<TxtTocRule>,
        options: &ImportOptions,
    ) -> TxtTocRule {
        let mut rule = wrapper.data.clone();
        if let Some(old) = &wrapper.old_data {
            rule.id = old.id;
            if options.keep_original_name {
                rule.name = old.name.clone();
            }
        } else if rule.id == 0 {
            rule.id = next_rule_id();
        }
        rule
    }

    fn with_enabled(&self, entity: &TxtTocRule, enabled: bool) -> Option<TxtTocRule> {
        let mut rule = entity.clone();
        rule.enable = enabled;
        Some(rule)
    }

    fn compose_ui_state(
        &self,
        base: RuleActionState<TocRuleItem>,
        import: &BaseImportUiState<TxtTocRule>,
    ) -> TocRuleUiState {
        let enabled_count = base.items.iter().filter(|item| item.enable).count();
        TocRuleUiState {
            base,
            import: import.clone(),
            enabled_count,
        }
    }

    fn import_state<'a>(&self, state: &'a TocRuleUiState) -> &'a BaseImportUiState<TxtTocRule> {
        &state.import
    }
}
