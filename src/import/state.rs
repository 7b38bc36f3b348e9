use crate::model::RuleEntity;
use crate::mvi::UiState;

/// Classification of an imported candidate against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    /// No stored rule has the candidate's identity.
    New,
    /// A stored rule matches and differs.
    Update,
    /// A stored rule matches and is identical.
    Existing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportItemWrapper<E> {
    pub data: E,
    pub old_data: Option<E>,
    pub status: ImportStatus,
    pub is_selected: bool,
}

impl<E: RuleEntity> ImportItemWrapper<E> {
    /// Classify `data` against its stored match.
    ///
    /// `has_changed` is only consulted when a match exists. Unchanged
    /// candidates start unselected.
    pub fn classify(data: E, old_data: Option<E>, has_changed: impl FnOnce(&E, &E) -> bool) -> Self {
        let status = match &old_data {
            None => ImportStatus::New,
            Some(old) => {
                if has_changed(&data, old) {
                    ImportStatus::Update
                } else {
                    ImportStatus::Existing
                }
            }
        };
        Self {
            data,
            old_data,
            status,
            is_selected: status != ImportStatus::Existing,
        }
    }
}

/// Options the user picks on the import confirmation screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Keep the stored rule's name when overwriting it.
    pub keep_original_name: bool,
    /// Group label applied to every imported rule.
    pub custom_group: Option<String>,
    /// Merge `custom_group` into existing groups instead of replacing them.
    pub is_add_group: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BaseImportUiState<E> {
    Idle,
    Loading,
    Success {
        /// Resolved import text, kept for display.
        source: String,
        items: Vec<ImportItemWrapper<E>>,
        keep_original_name: bool,
        custom_group: Option<String>,
        is_add_group: bool,
    },
    Error {
        message: String,
    },
}

impl<E> Default for BaseImportUiState<E> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<E: RuleEntity> UiState for BaseImportUiState<E> {}

impl<E> BaseImportUiState<E> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn items(&self) -> &[ImportItemWrapper<E>] {
        match self {
            Self::Success { items, .. } => items,
            _ => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn options(&self) -> Option<ImportOptions> {
        match self {
            Self::Success {
                keep_original_name,
                custom_group,
                is_add_group,
                ..
            } => Some(ImportOptions {
                keep_original_name: *keep_original_name,
                custom_group: custom_group.clone(),
                is_add_group: *is_add_group,
            }),
            _ => None,
        }
    }

    pub fn selected_count(&self) -> usize {
        self.items().iter().filter(|w| w.is_selected).count()
    }
}
