use crate::mvi::Intent;

use super::state::ImportItemWrapper;

#[derive(Debug, Clone)]
pub enum ImportIntent<E> {
    /// Resolution started.
    Start,
    /// Resolution finished; candidates are classified.
    Loaded {
        source: String,
        items: Vec<ImportItemWrapper<E>>,
    },
    Failed { message: String },
    ToggleItem { index: usize },
    ToggleAll { selected: bool },
    SetKeepOriginalName { keep: bool },
    SetCustomGroup {
        group: Option<String>,
        is_add: bool,
    },
    /// Cancel, or the confirmed rules were written.
    Reset,
}

impl<E: Send + 'static> Intent for ImportIntent<E> {}
