//! Model-View-Intent primitives shared by the engine's state cells.
//!
//! # Architecture
//!
//! ```text
//! Intent ──→ Reducer ──→ State ──→ Composed snapshot
//!    ↑                                   │
//!    └───────────────────────────────────┘
//! ```
//!
//! - **State**: immutable value owned by the engine actor
//! - **Intent**: a user operation or a completed background job
//! - **Reducer**: pure transition `(State, Intent) -> State`

mod intent;
mod reducer;
mod state;

pub use intent::Intent;
pub use reducer::Reducer;
pub use state::UiState;
