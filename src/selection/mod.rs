// Selection module - click picking, single-marker highlight and host notifications
//
// Submodules:
// - state: ViewSelection / Highlight components and selection events
// - picker: Ray picking against a view's marker group
// - highlight: Outline shell that follows the highlighted marker

mod highlight;
mod picker;
mod state;

pub use highlight::{spawn_outline_shell, update_highlight_system, OutlineShell};
pub use picker::{clear_selection_system, pick_marker, pick_markers_system};
pub use state::{ClearSelection, Highlight, LocationSelected, ViewSelection};
