//! Online dictionary lookup rules, keyed by name.

use serde::{Deserialize, Serialize};

use crate::feature::RuleFeature;
use crate::import::BaseImportUiState;
use crate::model::{RuleActionState, RuleEntity, SelectableItem};
use crate::mvi::UiState;

use super::contains_ignore_case;

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictRule {
    pub name: String,
    pub url_rule: String,
    #[serde(default)]
    pub show_rule: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_number: i32,
}

impl RuleEntity for DictRule {
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }

    fn sort_order(&self) -> i32 {
        self.sort_number
    }

    fn set_sort_order(&mut self, order: i32) {
        self.sort_number = order;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictRuleItem {
    pub name: String,
    pub url_rule: String,
    pub enabled: bool,
    pub rule: DictRule,
}

impl SelectableItem for DictRuleItem {
    type Id = String;

    fn id(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DictRuleUiState {
    pub base: RuleActionState<DictRuleItem>,
    pub import: BaseImportUiState<DictRule>,
}

impl UiState for DictRuleUiState {}

#[derive(Debug, Default)]
pub struct DictRuleFeature;

impl RuleFeature for DictRuleFeature {
    type Entity = DictRule;
    type Item = DictRuleItem;
    type State = DictRuleUiState;

    fn filter_data(&self, data: &[DictRule], key: &str) -> Vec<DictRule> {
        let key = key.trim();
        data.iter()
            .filter(|r| contains_ignore_case(&r.name, key))
            .cloned()
            .collect()
    }

    fn to_ui_item(&self, entity: &DictRule) -> DictRuleItem {
        DictRuleItem {
            name: entity.name.clone(),
            url_rule: entity.url_rule.clone(),
            enabled: entity.enabled,
            rule: entity.clone(),
        }
    }

    fn rule_item_to_entity(&self, item: &DictRuleItem) -> DictRule {
        item.rule.clone()
    }

    fn has_changed(&self, new: &DictRule, old: &DictRule) -> bool {
        new.url_rule != old.url_rule || new.show_rule != old.show_rule
    }

    fn with_enabled(&self, entity: &DictRule, enabled: bool) -> Option<DictRule> {
        Some(DictRule {
            enabled,
            ..entity.clone()
        })
    }

    fn compose_ui_state(
        &self,
        base: RuleActionState<DictRuleItem>,
        import: &BaseImportUiState<DictRule>,
    ) -> DictRuleUiState {
        DictRuleUiState {
            base,
            import: import.clone(),
        }
    }

    fn import_state<'a>(&self, state: &'a DictRuleUiState) -> &'a BaseImportUiState<DictRule> {
        &state.import
    }
}
