// Tuned defaults for the map view. MapViewConfig starts from these.
use bevy::prelude::*;

// Scene
pub const BACKGROUND_COLOR: Color = Color::srgb(0.102, 0.102, 0.102); // #1a1a1a
pub const AMBIENT_BRIGHTNESS: f32 = 1200.0;
pub const GRID_SIZE: f32 = 200.0;
pub const GRID_DIVISIONS: u32 = 200;
pub const GRID_CENTER_COLOR: Color = Color::srgb(0.8, 0.8, 0.8); // #cccccc
pub const GRID_LINE_COLOR: Color = Color::srgb(0.533, 0.533, 0.533); // #888888

// Camera
pub const CAMERA_FOV_DEGREES: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;
pub const CAMERA_INITIAL_POSITION: Vec3 = Vec3::new(20.0, 20.0, 20.0);

// Orbit rig
pub const ORBIT_DAMPING_FACTOR: f32 = 0.05; // fraction of pending motion applied per frame
pub const ORBIT_ROTATE_SPEED: f32 = 0.005; // radians per pixel dragged
pub const ORBIT_PAN_SPEED: f32 = 0.0015; // world units per pixel, scaled by orbit distance
pub const ORBIT_ZOOM_SPEED: f32 = 0.1; // fraction of distance per wheel line
pub const ORBIT_MIN_DISTANCE: f32 = 1.0;
pub const ORBIT_MAX_DISTANCE: f32 = 500.0;
pub const ORBIT_POLAR_MARGIN: f32 = 0.01; // keeps the rig off the poles
pub const ORBIT_SETTLE_EPSILON: f32 = 1e-5;

// Fly-to
pub const FLY_TO_OFFSET: Vec3 = Vec3::new(5.0, 5.0, 5.0);
pub const FLY_TO_DURATION_SECS: f32 = 1.0; // 60 frames at 60 Hz

// Markers
pub const MARKER_RADIUS: f32 = 0.5;
pub const MARKER_SECTORS: u32 = 16;
pub const MARKER_STACKS: u32 = 16;
pub const OWNED_MARKER_COLOR: Color = Color::srgb(0.0, 1.0, 0.0);
pub const MARKER_SATURATION: f32 = 0.75;
pub const MARKER_LIGHTNESS: f32 = 0.55;

// Highlight
pub const OUTLINE_COLOR: Color = Color::WHITE;
pub const OUTLINE_THICKNESS: f32 = 0.12; // shell radius grows by this fraction

// Picking
pub const CLICK_DRAG_THRESHOLD: f32 = 5.0; // pixels before a press counts as an orbit drag

// Labels
pub const LABEL_FONT_SIZE: f32 = 13.0;
pub const LABEL_OWNER_FONT_SIZE: f32 = 11.0;
pub const LABEL_OFFSET_PX: f32 = 14.0; // gap between marker and label bottom
pub const LABEL_AVATAR_SIZE_PX: f32 = 20.0;
pub const LABEL_BACKGROUND: Color = Color::srgba(0.0, 0.0, 0.0, 0.6);
