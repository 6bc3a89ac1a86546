// Outline effect: an inverted-hull shell drawn around the highlighted marker
use bevy::pbr::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;
use bevy::render::render_resource::Face;
use bevy::render::view::RenderLayers;

use crate::config::MapViewConfig;
use crate::markers::Marker;
use crate::scene::MapView;

use super::state::Highlight;

/// The single outline shell of a view. Only back faces are drawn, so the
/// marker inside covers the middle and a rim remains visible.
#[derive(Component, Debug, Clone, Copy)]
pub struct OutlineShell {
    pub view: Entity,
}

pub fn spawn_outline_shell(
    world: &mut World,
    view: Entity,
    config: &MapViewConfig,
    layers: RenderLayers,
) -> Entity {
    let mesh = world
        .get_resource_or_init::<Assets<Mesh>>()
        .add(Sphere::new(1.0).mesh().uv(32, 18));
    let material = world
        .get_resource_or_init::<Assets<StandardMaterial>>()
        .add(StandardMaterial {
            base_color: config.highlight.color(),
            unlit: true,
            cull_mode: Some(Face::Front),
            ..default()
        });

    world
        .spawn((
            Name::new("Selection Outline"),
            Mesh3d(mesh),
            MeshMaterial3d(material),
            Transform::default(),
            Visibility::Hidden,
            NotShadowCaster,
            NotShadowReceiver,
            OutlineShell { view },
            layers,
            ChildOf(view),
        ))
        .id()
}

/// System: Move the outline shell onto the highlighted marker, or hide it.
/// Position and visibility change in the same frame, so the old and new
/// outline never render together.
pub fn update_highlight_system(
    config: Res<MapViewConfig>,
    views: Query<(&MapView, &Highlight)>,
    markers: Query<&Marker>,
    mut shells: Query<(&mut Transform, &mut Visibility), With<OutlineShell>>,
) {
    for (view, highlight) in views.iter() {
        let Ok((mut transform, mut visibility)) = shells.get_mut(view.outline) else { continue };

        match highlight.selected().and_then(|entity| markers.get(entity).ok()) {
            Some(marker) => {
                let scale = marker.radius * (1.0 + config.highlight.thickness.max(0.0));
                transform.set_if_neq(Transform::from_translation(marker.position).with_scale(Vec3::splat(scale)));
                visibility.set_if_neq(Visibility::Visible);
            }
            None => {
                visibility.set_if_neq(Visibility::Hidden);
            }
        }
    }
}
