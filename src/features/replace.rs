//! Text replacement rules applied to book content.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::feature::RuleFeature;
use crate::import::{BaseImportUiState, ImportItemWrapper, ImportOptions};
use crate::model::{RuleActionState, RuleEntity, SelectableItem};
use crate::mvi::UiState;
use crate::store::{RuleStore, StoreError};

use super::{contains_ignore_case, find_in_snapshot, next_rule_id};

/// Search prefix restricting the filter to one group.
const GROUP_PREFIX: &str = "group:";

fn default_true() -> bool {
    true
}

fn default_timeout_millisecond() -> i64 {
    3000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceRule {
    /// Zero until assigned; imports without an id match by name.
    #[serde(default)]
    pub id: i64,
    pub name: String,
    /// Comma-separated group labels.
    #[serde(default)]
    pub group: Option<String>,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    /// Book names or sources the rule is limited to; `None` applies everywhere.
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub scope_title: bool,
    #[serde(default = "default_true")]
    pub scope_content: bool,
    #[serde(default)]
    pub exclude_scope: Option<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default = "default_true")]
    pub is_regex: bool,
    #[serde(default = "default_timeout_millisecond")]
    pub timeout_millisecond: i64,
    #[serde(default)]
    pub order: i32,
}

impl ReplaceRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            id: next_rule_id(),
            name: name.into(),
            group: None,
            pattern: pattern.into(),
            replacement: replacement.into(),
            scope: None,
            scope_title: false,
            scope_content: true,
            exclude_scope: None,
            is_enabled: true,
            is_regex: true,
            timeout_millisecond: default_timeout_millisecond(),
            order: 0,
        }
    }

    pub fn groups(&self) -> Vec<String> {
        split_groups(self.group.as_deref())
    }

    /// Fields an import can change, ignoring identity, position and the
    /// user's enabled toggle.
    fn content_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.group == other.group
            && self.pattern == other.pattern
            && self.replacement == other.replacement
            && self.scope == other.scope
            && self.scope_title == other.scope_title
            && self.scope_content == other.scope_content
            && self.exclude_scope == other.exclude_scope
            && self.is_regex == other.is_regex
            && self.timeout_millisecond == other.timeout_millisecond
    }
}

impl RuleEntity for ReplaceRule {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn sort_order(&self) -> i32 {
        self.order
    }

    fn set_sort_order(&mut self, order: i32) {
        self.order = order;
    }
}

/// Split a group label list on `,`, `;` or the full-width comma.
pub fn split_groups(group: Option<&str>) -> Vec<String> {
    group
        .unwrap_or_default()
        .split([',', ';', '，'])
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Union of `existing` labels and `added` labels, keeping first-seen order.
pub fn merge_groups(existing: Option<&str>, added: &str) -> Option<String> {
    let mut groups = split_groups(existing);
    for group in split_groups(Some(added)) {
        if !groups.contains(&group) {
            groups.push(group);
        }
    }
    if groups.is_empty() {
        None
    } else {
        Some(groups.join(","))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceRuleItem {
    pub id: i64,
    pub name: String,
    pub group: Option<String>,
    pub is_enabled: bool,
    pub rule: ReplaceRule,
}

impl SelectableItem for ReplaceRuleItem {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplaceRuleUiState {
    pub base: RuleActionState<ReplaceRuleItem>,
    pub import: BaseImportUiState<ReplaceRule>,
    /// Distinct group labels of the rows on screen, sorted.
    pub groups: Vec<String>,
}

impl UiState for ReplaceRuleUiState {}

#[derive(Debug, Default)]
pub struct ReplaceRuleFeature;

#[async_trait]
impl RuleFeature for ReplaceRuleFeature {
    type Entity = ReplaceRule;
    type Item = ReplaceRuleItem;
    type State = ReplaceRuleUiState;

    /// `group:<label>` matches one group exactly; any other key matches
    /// name or group by substring.
    fn filter_data(&self, data: &[ReplaceRule], key: &str) -> Vec<ReplaceRule> {
        let key = key.trim();
        if let Some(group) = key.strip_prefix(GROUP_PREFIX) {
            let group = group.trim();
            return data
                .iter()
                .filter(|r| r.groups().iter().any(|g| g == group))
                .cloned()
                .collect();
        }
        data.iter()
            .filter(|r| {
                contains_ignore_case(&r.name, key)
                    || r.group
                        .as_deref()
                        .is_some_and(|g| contains_ignore_case(g, key))
            })
            .cloned()
            .collect()
    }

    fn to_ui_item(&self, entity: &ReplaceRule) -> ReplaceRuleItem {
        ReplaceRuleItem {
            id: entity.id,
            name: entity.name.clone(),
            group: entity.group.clone(),
            is_enabled: entity.is_enabled,
            rule: entity.clone(),
        }
    }

    fn rule_item_to_entity(&self, item: &ReplaceRuleItem) -> ReplaceRule {
        item.rule.clone()
    }

    fn has_changed(&self, new: &ReplaceRule, old: &ReplaceRule) -> bool {
        !new.content_eq(old)
    }

    async fn find_old_rule(
        &self,
        store: &dyn RuleStore<ReplaceRule>,
        candidate: &ReplaceRule,
    ) -> Result<Option<ReplaceRule>, StoreError> {
        if candidate.id != 0 {
            return store.find(&candidate.id).await;
        }
        Ok(find_in_snapshot(store, |r| r.name == candidate.name))
    }

    fn prepare_import(
        &self,
        wrapper: &ImportItemWrapper<ReplaceRule>,
        options: &ImportOptions,
    ) -> ReplaceRule {
        let mut rule = wrapper.data.clone();
        match &wrapper.old_data {
            Some(old) => {
                rule.id = old.id;
                if options.keep_original_name {
                    rule.name = old.name.clone();
                }
            }
            None if rule.id == 0 => rule.id = next_rule_id(),
            None => {}
        }
        if let Some(group) = &options.custom_group {
            rule.group = if options.is_add_group {
                merge_groups(rule.group.as_deref(), group)
            } else {
                Some(group.clone())
            };
        }
        rule
    }

    fn with_enabled(&self, entity: &ReplaceRule, enabled: bool) -> Option<ReplaceRule> {
        let mut rule = entity.clone();
        rule.is_enabled = enabled;
        Some(rule)
    }

    fn compose_ui_state(
        &self,
        base: RuleActionState<ReplaceRuleItem>,
        import: &BaseImportUiState<ReplaceRule>,
    ) -> ReplaceRuleUiState {
        let groups: BTreeSet<String> = base
            .items
            .iter()
            .flat_map(|item| split_groups(item.group.as_deref()))
            .collect();
        ReplaceRuleUiState {
            base,
            import: import.clone(),
            groups: groups.into_iter().collect(),
        }
    }

    fn import_state<'a>(&self, state: &'a ReplaceRuleUiState) -> &'a BaseImportUiState<ReplaceRule> {
        &state.import
    }
}
