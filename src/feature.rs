//! Capability trait each rule feature implements to plug into the engine.

use async_trait::async_trait;

use crate::import::{parse_rules, BaseImportUiState, ImportError, ImportItemWrapper, ImportOptions};
use crate::model::{RuleActionState, RuleEntity, SelectableItem};
use crate::mvi::UiState;
use crate::store::{RuleStore, StoreError};

/// Everything the engine needs to know about one kind of rule.
///
/// The engine never looks inside entities or rows; it only moves them
/// through these projections and hooks.
#[async_trait]
pub trait RuleFeature: Send + Sync + 'static {
    type Entity: RuleEntity;
    type Item: SelectableItem;
    /// Feature snapshot. `Default` is the empty state shown before the
    /// first composition.
    type State: UiState;

    /// Text filter applied after debouncing. `key` may be empty.
    fn filter_data(&self, data: &[Self::Entity], key: &str) -> Vec<Self::Entity>;

    fn to_ui_item(&self, entity: &Self::Entity) -> Self::Item;

    fn rule_item_to_entity(&self, item: &Self::Item) -> Self::Entity;

    /// Transfer format for a collection: an order-preserving JSON array.
    fn generate_json(&self, entities: &[Self::Entity]) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(entities)
    }

    fn parse_import_rules(&self, text: &str) -> Result<Vec<Self::Entity>, ImportError> {
        parse_rules(text)
    }

    /// Whether an imported candidate differs from the stored rule it matched.
    fn has_changed(&self, new: &Self::Entity, old: &Self::Entity) -> bool;

    async fn find_old_rule(
        &self,
        store: &dyn RuleStore<Self::Entity>,
        candidate: &Self::Entity,
    ) -> Result<Option<Self::Entity>, StoreError> {
        store.find(&candidate.key()).await
    }

    /// Final form of a confirmed import candidate before it is written.
    fn prepare_import(
        &self,
        wrapper: &ImportItemWrapper<Self::Entity>,
        _options: &ImportOptions,
    ) -> Self::Entity {
        wrapper.data.clone()
    }

    /// Copy of `entity` with its enabled flag set, for features that have one.
    fn with_enabled(&self, _entity: &Self::Entity, _enabled: bool) -> Option<Self::Entity> {
        None
    }

    fn compose_ui_state(
        &self,
        base: RuleActionState<Self::Item>,
        import: &BaseImportUiState<Self::Entity>,
    ) -> Self::State;

    /// The import part of a composed snapshot.
    fn import_state<'a>(&self, state: &'a Self::State) -> &'a BaseImportUiState<Self::Entity>;
}
