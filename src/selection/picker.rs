// Click picking: ray cast from the view camera against its marker group only
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::camera::{FlyToRequest, MapCamera};
use crate::input::{PointerClick, PointerScratch};
use crate::markers::{Marker, MarkerGroup};
use crate::math_utils::{cursor_to_ndc, ray_sphere_intersection};
use crate::scene::{MapView, ViewContainer};

use super::state::{ClearSelection, Highlight, LocationSelected, ViewSelection};

/// Nearest marker hit by `ray`, with its distance along the ray.
pub fn pick_marker<'a>(
    ray: Ray3d,
    markers: impl IntoIterator<Item = (Entity, &'a Marker)>,
) -> Option<(Entity, f32)> {
    markers
        .into_iter()
        .filter_map(|(entity, marker)| {
            ray_sphere_intersection(ray, marker.position, marker.radius).map(|distance| (entity, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// System: Resolve pointer clicks into a selection (hit) or a deselect (miss)
pub fn pick_markers_system(
    mut clicks: EventReader<PointerClick>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut views: Query<(
        &MapView,
        &ViewContainer,
        &mut ViewSelection,
        &mut Highlight,
        &mut PointerScratch,
    )>,
    cameras: Query<(&Camera, &Transform), With<MapCamera>>,
    groups: Query<&MarkerGroup>,
    markers: Query<&Marker>,
    mut fly_to: EventWriter<FlyToRequest>,
    mut selected: EventWriter<LocationSelected>,
) {
    let scale_factor = windows.single().map(|window| window.scale_factor()).unwrap_or(1.0);

    for click in clicks.read() {
        let Ok((view, container, mut selection, mut highlight, mut scratch)) = views.get_mut(click.view) else {
            continue;
        };
        let Ok((camera, camera_transform)) = cameras.get(view.camera) else { continue };

        scratch.ndc = cursor_to_ndc(click.cursor, container.logical_rect(scale_factor));
        // Cursor stays in window coordinates, the camera offsets by its own viewport
        scratch.last_ray = camera
            .viewport_to_world(&GlobalTransform::from(*camera_transform), click.cursor)
            .ok();

        let hit = match (scratch.last_ray, groups.get(view.markers)) {
            (Some(ray), Ok(group)) => pick_marker(
                ray,
                group
                    .entities()
                    .filter_map(|entity| markers.get(entity).ok().map(|marker| (entity, marker))),
            ),
            _ => None,
        };

        match hit.and_then(|(entity, _)| markers.get(entity).ok().map(|marker| (entity, marker))) {
            Some((entity, marker)) => {
                info!("Selected location {} ({})", marker.location.id, marker.location.name);
                selection.select(marker.location.clone(), entity);
                highlight.set(Some(entity));
                fly_to.write(FlyToRequest {
                    view: click.view,
                    point: marker.position,
                });
                selected.write(LocationSelected {
                    view: click.view,
                    location: Some(marker.location.clone()),
                });
            }
            None => {
                debug!("Click at {:?} missed every marker", click.cursor);
                selection.clear();
                highlight.set(None);
                selected.write(LocationSelected {
                    view: click.view,
                    location: None,
                });
            }
        }
    }
}

/// System: Host-driven clear of a view's selection
pub fn clear_selection_system(
    mut requests: EventReader<ClearSelection>,
    mut views: Query<(&mut ViewSelection, &mut Highlight)>,
    mut selected: EventWriter<LocationSelected>,
) {
    for request in requests.read() {
        let Ok((mut selection, mut highlight)) = views.get_mut(request.view) else { continue };
        selection.clear();
        highlight.set(None);
        selected.write(LocationSelected {
            view: request.view,
            location: None,
        });
    }
}
