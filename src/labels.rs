// Label overlay: one screen-space UI node per marker, re-projected every frame
use bevy::prelude::*;

use crate::camera::MapCamera;
use crate::config::{LabelConfig, MapViewConfig};
use crate::constants::LABEL_BACKGROUND;
use crate::scene::MapView;
use crate::types::Location;

/// UI root of a view's labels, rendered by the view camera only.
#[derive(Component, Debug, Clone, Copy)]
pub struct LabelOverlay {
    pub view: Entity,
}

/// World-anchored label of one marker.
#[derive(Component, Debug, Clone, Copy)]
pub struct MarkerLabel {
    pub view: Entity,
    pub anchor: Vec3,
}

#[derive(Component, Debug)]
pub struct LabelName;

#[derive(Component, Debug)]
pub struct LabelOwner;

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Build the label node for `location` under `overlay`. The avatar is only
/// shown when it names a local asset; anything else leaves a text-only label.
pub fn spawn_marker_label(
    commands: &mut Commands,
    overlay: Entity,
    view: Entity,
    location: &Location,
    anchor: Vec3,
    config: &LabelConfig,
    asset_server: Option<&AssetServer>,
) -> Entity {
    let label = commands
        .spawn((
            Name::new(format!("Label {}", location.id)),
            Node {
                position_type: PositionType::Absolute,
                flex_direction: FlexDirection::Row,
                align_items: AlignItems::Center,
                column_gap: Val::Px(6.0),
                padding: UiRect::axes(Val::Px(6.0), Val::Px(3.0)),
                ..default()
            },
            BackgroundColor(LABEL_BACKGROUND),
            BorderRadius::all(Val::Px(4.0)),
            Visibility::Hidden,
            MarkerLabel { view, anchor },
            ChildOf(overlay),
        ))
        .id();

    if let Some(reference) = location.owner_avatar_ref() {
        match asset_server {
            Some(server) if !is_remote(reference) => {
                let size = Val::Px(config.avatar_size_px);
                commands.spawn((
                    ImageNode::new(server.load(reference.to_string())),
                    Node {
                        width: size,
                        height: size,
                        ..default()
                    },
                    BorderRadius::MAX,
                    ChildOf(label),
                ));
            }
            _ => debug!("Avatar {} for location {} not loaded", reference, location.id),
        }
    }

    let text = commands
        .spawn((
            Node {
                flex_direction: FlexDirection::Column,
                ..default()
            },
            ChildOf(label),
        ))
        .id();

    commands.spawn((
        Text::new(location.name.clone()),
        TextFont {
            font_size: config.font_size,
            ..default()
        },
        TextColor(Color::WHITE),
        LabelName,
        ChildOf(text),
    ));

    if let Some(owner) = location.owner_display_name() {
        commands.spawn((
            Text::new(owner.to_string()),
            TextFont {
                font_size: config.owner_font_size,
                ..default()
            },
            TextColor(Color::srgb(0.75, 0.75, 0.75)),
            LabelOwner,
            ChildOf(text),
        ));
    }

    label
}

/// System: Project every label to its marker's screen position, centred
/// above it. Labels behind the camera are hidden, as are all labels of an
/// inactive view.
pub fn project_labels_system(
    config: Res<MapViewConfig>,
    views: Query<&MapView>,
    cameras: Query<(&Camera, &Transform), With<MapCamera>>,
    mut labels: Query<(&MarkerLabel, &ComputedNode, &mut Node, &mut Visibility)>,
) {
    for (label, computed, mut node, mut visibility) in labels.iter_mut() {
        let Ok(view) = views.get(label.view) else { continue };
        let Ok((camera, transform)) = cameras.get(view.camera) else { continue };

        let screen = camera
            .is_active
            .then(|| camera.world_to_viewport(&GlobalTransform::from(*transform), label.anchor).ok())
            .flatten();
        let (Some(screen), Some(rect)) = (screen, camera.logical_viewport_rect()) else {
            visibility.set_if_neq(Visibility::Hidden);
            continue;
        };
        // UI of a viewport camera is laid out relative to the viewport corner
        let screen = screen - rect.min;

        let size = computed.size() * computed.inverse_scale_factor();
        node.left = Val::Px(screen.x - size.x * 0.5);
        node.top = Val::Px(screen.y - size.y - config.labels.offset_px);
        visibility.set_if_neq(Visibility::Inherited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerProfile;

    fn texts<T: Component>(world: &mut World) -> Vec<String> {
        world
            .query_filtered::<&Text, With<T>>()
            .iter(world)
            .map(|text| text.0.clone())
            .collect()
    }

    fn spawn(world: &mut World, location: &Location) -> Entity {
        let overlay = world.spawn(Node::default()).id();
        let view = world.spawn_empty().id();
        let label = spawn_marker_label(
            &mut world.commands(),
            overlay,
            view,
            location,
            Vec3::ZERO,
            &LabelConfig::default(),
            None,
        );
        world.flush();
        label
    }

    #[test]
    fn label_shows_name_and_owner() {
        let mut world = World::new();
        let location = Location::new(3, "u3", "Lighthouse", Vec3::ZERO).with_owner(OwnerProfile {
            display_name: Some("keeper".into()),
            avatar_ref: Some("https://cdn.discordapp.com/avatars/1/2.png".into()),
        });
        let label = spawn(&mut world, &location);

        assert_eq!(texts::<LabelName>(&mut world), vec!["Lighthouse".to_string()]);
        assert_eq!(texts::<LabelOwner>(&mut world), vec!["keeper".to_string()]);
        assert_eq!(world.query::<&ImageNode>().iter(&world).count(), 0);
        assert_eq!(world.get::<Visibility>(label), Some(&Visibility::Hidden));
    }

    #[test]
    fn label_without_owner_is_name_only() {
        let mut world = World::new();
        spawn(&mut world, &Location::new(4, "u4", "Quarry", Vec3::ONE));
        assert_eq!(texts::<LabelName>(&mut world), vec!["Quarry".to_string()]);
        assert!(texts::<LabelOwner>(&mut world).is_empty());
    }

    #[test]
    fn remote_references_are_detected() {
        assert!(is_remote("https://cdn.discordapp.com/avatars/1/2.png"));
        assert!(!is_remote("avatars/local.png"));
    }

    mod projection {
        use super::*;
        use crate::markers::MapInput;
        use crate::scene::{spawn_map_view, ViewContainer};
        use crate::viewport::testing::{compute_camera_values, spawn_primary_window};
        use bevy::ecs::system::RunSystemOnce;

        fn world() -> (World, Entity) {
            let mut world = World::new();
            world.init_resource::<MapViewConfig>();
            world.init_resource::<Assets<Mesh>>();
            world.init_resource::<Assets<StandardMaterial>>();
            spawn_primary_window(&mut world, UVec2::new(1280, 720));
            let container = ViewContainer::new(UVec2::new(200, 40), UVec2::new(800, 600));
            let view = spawn_map_view(&mut world, container, MapInput::default()).view;
            compute_camera_values(&mut world);
            (world, view)
        }

        fn label(world: &mut World, view: Entity, anchor: Vec3) -> Entity {
            world
                .spawn((Node::default(), Visibility::Hidden, MarkerLabel { view, anchor }))
                .id()
        }

        #[test]
        fn label_sits_above_its_anchor_inside_the_viewport() {
            let (mut world, view) = world();
            let label = label(&mut world, view, Vec3::ZERO);
            world.run_system_once(project_labels_system).unwrap();

            let offset = world.resource::<MapViewConfig>().labels.offset_px;
            let node = world.get::<Node>(label).unwrap();
            let (Val::Px(left), Val::Px(top)) = (node.left, node.top) else {
                panic!("label was not positioned");
            };
            assert!((left - 400.0).abs() < 1e-2);
            assert!((top - (300.0 - offset)).abs() < 1e-2);
            assert_eq!(world.get::<Visibility>(label), Some(&Visibility::Inherited));
        }

        #[test]
        fn label_behind_the_camera_is_hidden() {
            let (mut world, view) = world();
            let eye = world.resource::<MapViewConfig>().camera.initial_position();
            let label = label(&mut world, view, eye * 2.0);
            world.entity_mut(label).insert(Visibility::Inherited);
            world.run_system_once(project_labels_system).unwrap();
            assert_eq!(world.get::<Visibility>(label), Some(&Visibility::Hidden));
        }

        #[test]
        fn inactive_view_hides_its_labels() {
            let (mut world, view) = world();
            let camera = world.get::<MapView>(view).unwrap().camera;
            world.get_mut::<Camera>(camera).unwrap().is_active = false;
            let label = label(&mut world, view, Vec3::ZERO);
            world.entity_mut(label).insert(Visibility::Inherited);
            world.run_system_once(project_labels_system).unwrap();
            assert_eq!(world.get::<Visibility>(label), Some(&Visibility::Hidden));
        }
    }
}
