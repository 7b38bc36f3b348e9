//! Import reconciler: resolves import text, parses candidate rules and
//! classifies them against the store before the user confirms.

mod error;
mod intent;
mod parse;
mod reducer;
mod source;
mod state;

pub use error::ImportError;
pub use intent::ImportIntent;
pub use parse::{parse_rules, to_single_json};
pub use reducer::ImportReducer;
pub use source::{SourceResolver, NO_USER_AGENT_SUFFIX};
pub use state::{BaseImportUiState, ImportItemWrapper, ImportOptions, ImportStatus};
