//! Base trait for state cells in MVI architecture.

/// Marker trait for state objects.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Comparable (PartialEq so unchanged snapshots are not re-published)
/// - Constructible empty (Default is the initial snapshot)
/// - Shareable across tasks (published through `watch` channels)
pub trait UiState: Clone + PartialEq + Default + Send + Sync + 'static {}
