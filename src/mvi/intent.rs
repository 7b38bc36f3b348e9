//! Base trait for intents in MVI architecture.

/// Marker trait for intent objects.
///
/// Intents represent:
/// - User operations (toggle a row, start an import)
/// - Results of background jobs (import resolved, upload settled)
///
/// Intents are processed by reducers to produce new states.
pub trait Intent: Send + 'static {}
