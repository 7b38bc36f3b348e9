//! Selection tracker: selected ids, search mode, search key and the
//! local reorder override.

mod intent;
mod reducer;
mod state;

pub use intent::SelectionIntent;
pub use reducer::SelectionReducer;
pub use state::SelectionState;
