// Pointer input: orbit drags, wheel zoom and click detection per view
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::camera::OrbitRig;
use crate::config::MapViewConfig;
use crate::scene::{MapView, ViewContainer};

/// Per-view pointer state. Each view owns its own copy, so two mounted
/// views never share a press or a ray.
#[derive(Component, Debug, Default, Clone)]
pub struct PointerScratch {
    press: Option<(MouseButton, Vec2)>,
    dragged: bool,
    /// NDC of the last click inside the view.
    pub ndc: Option<Vec2>,
    /// Pick ray of the last click.
    pub last_ray: Option<Ray3d>,
}

impl PointerScratch {
    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }
}

/// A press and release of the left button that stayed under the drag
/// threshold. `cursor` is in logical window pixels.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct PointerClick {
    pub view: Entity,
    pub cursor: Vec2,
}

const ORBIT_BUTTONS: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

/// System: Feed mouse input into the orbit rig of the view under the cursor
pub fn pointer_input_system(
    mouse: Res<ButtonInput<MouseButton>>,
    mut motion_events: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
    windows: Query<&Window, With<PrimaryWindow>>,
    config: Res<MapViewConfig>,
    mut views: Query<(Entity, &MapView, &ViewContainer, &mut PointerScratch)>,
    mut rigs: Query<&mut OrbitRig>,
    mut clicks: EventWriter<PointerClick>,
) {
    let motion: Vec2 = motion_events.read().map(|event| event.delta).sum();
    let scroll: f32 = scroll_events
        .read()
        .map(|event| match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y * 0.01,
        })
        .sum();

    let Ok(window) = windows.single() else { return };
    let cursor = window.cursor_position();
    let scale_factor = window.scale_factor();
    let camera = &config.camera;

    for (view_entity, view, container, mut scratch) in views.iter_mut() {
        let rect = container.logical_rect(scale_factor);
        let inside = cursor.is_some_and(|c| container.has_area() && rect.contains(c));
        let Ok(mut rig) = rigs.get_mut(view.camera) else { continue };

        if scratch.press.is_none() && inside {
            if let (Some(button), Some(position)) =
                (ORBIT_BUTTONS.into_iter().find(|b| mouse.just_pressed(*b)), cursor)
            {
                scratch.press = Some((button, position));
                scratch.dragged = false;
            }
        }

        if inside && scroll != 0.0 {
            rig.zoom(scroll, camera.zoom_speed);
        }

        let Some((button, pressed_at)) = scratch.press else { continue };

        if let Some(position) = cursor {
            if position.distance(pressed_at) > config.picking.click_drag_threshold_px {
                scratch.dragged = true;
            }
        }

        // Motion under the click threshold never moves the rig.
        if scratch.dragged && mouse.pressed(button) && motion != Vec2::ZERO {
            match button {
                MouseButton::Left => rig.rotate(motion, camera.rotate_speed),
                _ => rig.pan(motion, camera.pan_speed),
            }
        }

        if mouse.just_released(button) || !mouse.pressed(button) {
            if button == MouseButton::Left && !scratch.dragged {
                if let Some(position) = cursor.filter(|_| inside) {
                    clicks.write(PointerClick {
                        view: view_entity,
                        cursor: position,
                    });
                }
            }
            scratch.press = None;
            scratch.dragged = false;
        }
    }
}
