// Interactive 3D location map: markers, picking, fly-to, highlight and labels
//
// Modules:
// - scene: map view lifecycle (spawn / dispose)
// - camera: damped orbit rig and fly-to animation
// - markers: marker registry rebuilt from the host's location list
// - input / selection: pointer handling, picking, highlight
// - labels: screen-space label overlay
// - viewport: resize handling
// - feed / config: location feed and TOML configuration

pub mod camera;
pub mod config;
pub mod constants;
pub mod error;
pub mod feed;
pub mod input;
pub mod labels;
pub mod markers;
pub mod math_utils;
pub mod scene;
pub mod selection;
pub mod types;
pub mod viewport;

use bevy::prelude::*;
use bevy::render::camera::CameraUpdateSystem;
use bevy::ui::UiSystem;

pub use camera::FlyToRequest;
pub use config::MapViewConfig;
pub use error::MapError;
pub use markers::MapInput;
pub use scene::{dispose_map_view, queue_dispose, spawn_map_view, FillWindow, MapView, MapViewHandle, ViewContainer};
pub use selection::{ClearSelection, LocationSelected};
pub use types::{Location, LocationId, OwnerProfile};

/// Per-frame work of all mounted map views.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapViewSystems;

pub struct MapViewPlugin;

impl Plugin for MapViewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapViewConfig>()
            .init_resource::<scene::ViewLayers>()
            .add_event::<FlyToRequest>()
            .add_event::<LocationSelected>()
            .add_event::<ClearSelection>()
            .add_event::<input::PointerClick>()
            .add_systems(
                Update,
                (
                    viewport::follow_window_system,
                    viewport::sync_container_system,
                    markers::rebuild_markers_system,
                    input::pointer_input_system,
                    selection::pick_markers_system,
                    selection::clear_selection_system,
                    camera::fly_to_request_system,
                    camera::advance_camera_system,
                    selection::update_highlight_system,
                )
                    .chain()
                    .in_set(MapViewSystems),
            )
            .add_systems(
                PostUpdate,
                labels::project_labels_system
                    .after(CameraUpdateSystem)
                    .before(UiSystem::Layout),
            );
    }
}
