// Runtime configuration for map views, loadable from TOML.
// Every field defaults to the matching value in constants.rs.
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::MapError;

#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapViewConfig {
    pub camera: CameraConfig,
    pub fly_to: FlyToConfig,
    pub markers: MarkerConfig,
    pub highlight: HighlightConfig,
    pub labels: LabelConfig,
    pub grid: GridConfig,
    pub picking: PickingConfig,
}

impl MapViewConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, MapError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, MapError> {
        let source = std::fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
        Self::from_toml_str(&source)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub initial_position: [f32; 3],
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: CAMERA_FOV_DEGREES,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            initial_position: CAMERA_INITIAL_POSITION.to_array(),
            damping_factor: ORBIT_DAMPING_FACTOR,
            rotate_speed: ORBIT_ROTATE_SPEED,
            pan_speed: ORBIT_PAN_SPEED,
            zoom_speed: ORBIT_ZOOM_SPEED,
            min_distance: ORBIT_MIN_DISTANCE,
            max_distance: ORBIT_MAX_DISTANCE,
        }
    }
}

impl CameraConfig {
    pub fn initial_position(&self) -> Vec3 {
        Vec3::from_array(self.initial_position)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyToConfig {
    pub offset: [f32; 3],
    pub duration_secs: f32,
}

impl Default for FlyToConfig {
    fn default() -> Self {
        Self {
            offset: FLY_TO_OFFSET.to_array(),
            duration_secs: FLY_TO_DURATION_SECS,
        }
    }
}

impl FlyToConfig {
    pub fn offset(&self) -> Vec3 {
        Vec3::from_array(self.offset)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub radius: f32,
    pub owned_color: [f32; 3],
    pub saturation: f32,
    pub lightness: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            radius: MARKER_RADIUS,
            owned_color: srgb_array(OWNED_MARKER_COLOR),
            saturation: MARKER_SATURATION,
            lightness: MARKER_LIGHTNESS,
        }
    }
}

impl MarkerConfig {
    pub fn owned_color(&self) -> Color {
        let [r, g, b] = self.owned_color;
        Color::srgb(r, g, b)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub color: [f32; 3],
    pub thickness: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            color: srgb_array(OUTLINE_COLOR),
            thickness: OUTLINE_THICKNESS,
        }
    }
}

impl HighlightConfig {
    pub fn color(&self) -> Color {
        let [r, g, b] = self.color;
        Color::srgb(r, g, b)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub enabled: bool,
    pub font_size: f32,
    pub owner_font_size: f32,
    pub offset_px: f32,
    pub avatar_size_px: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            font_size: LABEL_FONT_SIZE,
            owner_font_size: LABEL_OWNER_FONT_SIZE,
            offset_px: LABEL_OFFSET_PX,
            avatar_size_px: LABEL_AVATAR_SIZE_PX,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: f32,
    pub divisions: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: GRID_SIZE,
            divisions: GRID_DIVISIONS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingConfig {
    pub click_drag_threshold_px: f32,
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            click_drag_threshold_px: CLICK_DRAG_THRESHOLD,
        }
    }
}

fn srgb_array(color: Color) -> [f32; 3] {
    let srgba = color.to_srgba();
    [srgba.red, srgba.green, srgba.blue]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = MapViewConfig::from_toml_str(
            r#"
            [fly_to]
            duration_secs = 0.5

            [markers]
            owned_color = [0.2, 0.4, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.fly_to.duration_secs, 0.5);
        assert_eq!(config.fly_to.offset(), FLY_TO_OFFSET);
        assert_eq!(config.markers.owned_color, [0.2, 0.4, 1.0]);
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(config.labels, LabelConfig::default());
    }

    #[test]
    fn empty_toml_is_the_default_config() {
        assert_eq!(MapViewConfig::from_toml_str("").unwrap(), MapViewConfig::default());
    }

    #[test]
    fn bad_toml_reports_a_config_error() {
        let err = MapViewConfig::from_toml_str("[camera]\nfov_degrees = \"wide\"").unwrap_err();
        assert!(matches!(err, MapError::Config(_)));
    }
}
