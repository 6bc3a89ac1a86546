// Marker registry: derives marker entities from the host's location list
use std::hash::{Hash, Hasher};

use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use rustc_hash::{FxHashMap, FxHasher};

use crate::config::{MapViewConfig, MarkerConfig};
use crate::constants::{MARKER_SECTORS, MARKER_STACKS};
use crate::labels::spawn_marker_label;
use crate::scene::MapView;
use crate::selection::{Highlight, LocationSelected, ViewSelection};
use crate::types::{Location, LocationId};

/// Host input of one view. Replacing or mutating it triggers a full rebuild
/// of the view's markers and labels.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct MapInput {
    pub locations: Vec<Location>,
    pub mine_only: bool,
    pub viewer_id: Option<String>,
}

impl MapInput {
    pub fn new(locations: Vec<Location>) -> Self {
        Self {
            locations,
            ..default()
        }
    }

    pub fn with_viewer(mut self, viewer_id: impl Into<String>) -> Self {
        self.viewer_id = Some(viewer_id.into());
        self
    }

    pub fn with_mine_only(mut self, mine_only: bool) -> Self {
        self.mine_only = mine_only;
        self
    }
}

/// One rendered location. Carries its source record for picking.
#[derive(Component, Clone, Debug)]
pub struct Marker {
    pub view: Entity,
    pub location: Location,
    pub position: Vec3,
    pub radius: f32,
    pub color: Color,
    pub label: Option<Entity>,
}

/// GPU assets and overlay nodes created by one rebuild pass.
#[derive(Debug, Default)]
pub struct MarkerResources {
    meshes: Vec<Handle<Mesh>>,
    materials: Vec<Handle<StandardMaterial>>,
    entities: Vec<Entity>,
}

impl MarkerResources {
    fn release_assets(&mut self, meshes: &mut Assets<Mesh>, materials: &mut Assets<StandardMaterial>) {
        for mesh in self.meshes.drain(..) {
            meshes.remove(&mesh);
        }
        for material in self.materials.drain(..) {
            materials.remove(&material);
        }
    }

    /// Release assets and despawn markers and labels immediately.
    pub fn release(mut self, world: &mut World) {
        if let Some(mut meshes) = world.get_resource_mut::<Assets<Mesh>>() {
            for mesh in self.meshes.drain(..) {
                meshes.remove(&mesh);
            }
        }
        if let Some(mut materials) = world.get_resource_mut::<Assets<StandardMaterial>>() {
            for material in self.materials.drain(..) {
                materials.remove(&material);
            }
        }
        for entity in self.entities.drain(..) {
            if let Ok(entity) = world.get_entity_mut(entity) {
                entity.despawn();
            }
        }
    }
}

/// Parent of a view's markers. Owns everything the last rebuild created.
#[derive(Component, Debug)]
pub struct MarkerGroup {
    pub view: Entity,
    markers: Vec<(LocationId, Entity)>,
    resources: MarkerResources,
}

impl MarkerGroup {
    pub fn new(view: Entity) -> Self {
        Self {
            view,
            markers: Vec::new(),
            resources: MarkerResources::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = LocationId> + '_ {
        self.markers.iter().map(|(id, _)| *id)
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.markers.iter().map(|(_, entity)| *entity)
    }

    pub fn marker_for(&self, id: LocationId) -> Option<Entity> {
        self.markers.iter().find(|(marker_id, _)| *marker_id == id).map(|(_, entity)| *entity)
    }

    /// Detach everything the last rebuild created so it can be released.
    pub fn take_resources(&mut self) -> MarkerResources {
        self.markers.clear();
        std::mem::take(&mut self.resources)
    }
}

/// Locations that pass the mine-only filter. Without a viewer the filter is a no-op.
pub fn visible_locations(input: &MapInput) -> impl Iterator<Item = &Location> + '_ {
    let owner_filter = input.viewer_id.as_deref().filter(|_| input.mine_only);
    input
        .locations
        .iter()
        .filter(move |location| owner_filter.is_none_or(|viewer| location.owner_id == viewer))
}

/// Stable hue in degrees for an owner id.
pub fn owner_hue(owner_id: &str) -> f32 {
    let mut hasher = FxHasher::default();
    owner_id.hash(&mut hasher);
    (hasher.finish() % 360) as f32
}

/// Fixed colour for the viewer's own markers, hashed hue for everyone else.
pub fn marker_color(owner_id: &str, viewer_id: Option<&str>, config: &MarkerConfig) -> Color {
    if viewer_id == Some(owner_id) {
        config.owned_color()
    } else {
        Color::hsl(owner_hue(owner_id), config.saturation, config.lightness)
    }
}

/// System: Rebuild a view's markers and labels whenever its MapInput changes
pub fn rebuild_markers_system(
    mut commands: Commands,
    config: Res<MapViewConfig>,
    asset_server: Option<Res<AssetServer>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut views: Query<(Entity, &MapView, &MapInput, &mut ViewSelection, &mut Highlight), Changed<MapInput>>,
    mut groups: Query<&mut MarkerGroup>,
    mut selected: EventWriter<LocationSelected>,
) {
    for (view_entity, view, input, mut selection, mut highlight) in views.iter_mut() {
        let Ok(mut group) = groups.get_mut(view.markers) else {
            warn!("View {:?} has no marker group", view_entity);
            continue;
        };

        // Clear-then-rebuild: nothing from the previous pass survives
        let mut previous = group.take_resources();
        previous.release_assets(&mut meshes, &mut materials);
        for entity in previous.entities.drain(..) {
            commands.entity(entity).try_despawn();
        }

        let layers = RenderLayers::layer(view.layer);
        let radius = config.markers.radius;
        let mesh = meshes.add(Sphere::new(radius).mesh().uv(MARKER_SECTORS, MARKER_STACKS));
        let mut resources = MarkerResources {
            meshes: vec![mesh.clone()],
            ..default()
        };
        let mut owner_materials: FxHashMap<&str, Handle<StandardMaterial>> = FxHashMap::default();
        // First occurrence of each id, the one its marker shows
        let mut accepted: FxHashMap<LocationId, &Location> = FxHashMap::default();
        let mut skipped = 0;
        let viewer = input.viewer_id.as_deref();

        for location in visible_locations(input) {
            let Some(position) = location.position() else {
                warn!("Skipping location {} ({}): non-finite coordinates", location.id, location.name);
                skipped += 1;
                continue;
            };
            if accepted.contains_key(&location.id) {
                warn!("Skipping duplicate location id {}", location.id);
                skipped += 1;
                continue;
            }

            let color = marker_color(&location.owner_id, viewer, &config.markers);
            let material = owner_materials
                .entry(location.owner_id.as_str())
                .or_insert_with(|| {
                    let handle = materials.add(StandardMaterial {
                        base_color: color,
                        perceptual_roughness: 0.6,
                        ..default()
                    });
                    resources.materials.push(handle.clone());
                    handle
                })
                .clone();

            let marker = commands
                .spawn((
                    Name::new(format!("Marker {}", location.id)),
                    Mesh3d(mesh.clone()),
                    MeshMaterial3d(material),
                    Transform::from_translation(position),
                    layers.clone(),
                    ChildOf(view.markers),
                ))
                .id();

            let label = config.labels.enabled.then(|| {
                spawn_marker_label(
                    &mut commands,
                    view.overlay,
                    view_entity,
                    location,
                    position,
                    &config.labels,
                    asset_server.as_deref(),
                )
            });

            commands.entity(marker).insert(Marker {
                view: view_entity,
                location: location.clone(),
                position,
                radius,
                color,
                label,
            });

            accepted.insert(location.id, location);
            group.markers.push((location.id, marker));
            resources.entities.push(marker);
            resources.entities.extend(label);
        }
        group.resources = resources;

        // Keep the selection only if its location is still on the map
        if let Some(selected_id) = selection.location().map(|location| location.id) {
            match (group.marker_for(selected_id), accepted.get(&selected_id)) {
                (Some(marker), Some(location)) => {
                    selection.select((*location).clone(), marker);
                    highlight.set(Some(marker));
                }
                _ => {
                    info!("Selected location {} left the map, clearing selection", selected_id);
                    selection.clear();
                    highlight.set(None);
                    selected.write(LocationSelected {
                        view: view_entity,
                        location: None,
                    });
                }
            }
        }

        info!(
            "Rebuilt {} markers for view {:?} ({} skipped, mine_only={})",
            group.len(),
            view_entity,
            skipped,
            input.mine_only
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{spawn_map_view, ViewContainer};
    use bevy::ecs::system::RunSystemOnce;

    fn loc(id: LocationId, owner: &str, position: Vec3) -> Location {
        Location::new(id, owner, format!("Place {id}"), position)
    }

    fn world() -> World {
        let mut world = World::new();
        world.init_resource::<MapViewConfig>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world.init_resource::<Events<LocationSelected>>();
        world
    }

    fn mount(world: &mut World, input: MapInput) -> Entity {
        let container = ViewContainer::new(UVec2::ZERO, UVec2::new(800, 600));
        spawn_map_view(world, container, input).view
    }

    fn rebuild(world: &mut World) {
        world.run_system_once(rebuild_markers_system).unwrap();
    }

    fn marker_ids(world: &mut World, view: Entity) -> Vec<LocationId> {
        let mut ids: Vec<LocationId> = world
            .query::<&Marker>()
            .iter(world)
            .filter(|marker| marker.view == view)
            .map(|marker| marker.location.id)
            .collect();
        ids.sort();
        ids
    }

    fn set_input(world: &mut World, view: Entity, input: MapInput) {
        *world.get_mut::<MapInput>(view).unwrap() = input;
    }

    #[test]
    fn filter_is_a_no_op_without_viewer() {
        let input = MapInput::new(vec![loc(1, "a", Vec3::ZERO), loc(2, "b", Vec3::ONE)]).with_mine_only(true);
        assert_eq!(visible_locations(&input).count(), 2);
        let input = input.with_viewer("b");
        let ids: Vec<_> = visible_locations(&input).map(|l| l.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn marker_set_matches_filtered_ids_across_rebuilds() {
        let mut world = world();
        let locations = vec![
            loc(1, "a", Vec3::ZERO),
            loc(2, "b", Vec3::X),
            loc(3, "a", Vec3::Z),
        ];
        let view = mount(&mut world, MapInput::new(locations.clone()).with_viewer("a"));
        rebuild(&mut world);
        assert_eq!(marker_ids(&mut world, view), vec![1, 2, 3]);

        set_input(&mut world, view, MapInput::new(locations.clone()).with_viewer("a").with_mine_only(true));
        rebuild(&mut world);
        assert_eq!(marker_ids(&mut world, view), vec![1, 3]);

        set_input(&mut world, view, MapInput::new(locations[1..].to_vec()));
        rebuild(&mut world);
        assert_eq!(marker_ids(&mut world, view), vec![2, 3]);
        assert_eq!(world.query::<&crate::labels::MarkerLabel>().iter(&world).count(), 2);
    }

    #[test]
    fn rebuild_releases_previous_assets() {
        let mut world = world();
        let locations = vec![loc(1, "a", Vec3::ZERO), loc(2, "b", Vec3::X), loc(3, "c", Vec3::Y)];
        let view = mount(&mut world, MapInput::new(locations.clone()));
        rebuild(&mut world);
        let meshes = world.resource::<Assets<Mesh>>().len();
        let materials = world.resource::<Assets<StandardMaterial>>().len();

        for _ in 0..5 {
            set_input(&mut world, view, MapInput::new(locations.clone()));
            rebuild(&mut world);
        }
        assert_eq!(world.resource::<Assets<Mesh>>().len(), meshes);
        assert_eq!(world.resource::<Assets<StandardMaterial>>().len(), materials);
    }

    #[test]
    fn invalid_and_duplicate_locations_are_skipped() {
        let mut world = world();
        let locations = vec![
            loc(1, "a", Vec3::ZERO),
            loc(2, "a", Vec3::new(f32::NAN, 0.0, 0.0)),
            loc(1, "b", Vec3::ONE),
            loc(3, "b", Vec3::new(0.0, f32::INFINITY, 0.0)),
            loc(4, "b", Vec3::X),
        ];
        let view = mount(&mut world, MapInput::new(locations));
        rebuild(&mut world);
        assert_eq!(marker_ids(&mut world, view), vec![1, 4]);
    }

    #[test]
    fn marker_color_is_a_pure_function_of_owner() {
        let config = MarkerConfig::default();
        let first = marker_color("carol", Some("alice"), &config);
        let second = marker_color("carol", None, &config);
        assert_eq!(first, second);
        assert_eq!(marker_color("alice", Some("alice"), &config), config.owned_color());
        assert_ne!(marker_color("alice", Some("bob"), &config), config.owned_color());
    }

    #[test]
    fn colors_are_stable_across_rebuilds() {
        let mut world = world();
        let locations = vec![loc(7, "dave", Vec3::ZERO)];
        let view = mount(&mut world, MapInput::new(locations.clone()).with_viewer("erin"));
        rebuild(&mut world);
        let before: Vec<Color> = world.query::<&Marker>().iter(&world).map(|m| m.color).collect();

        set_input(&mut world, view, MapInput::new(locations).with_viewer("erin").with_mine_only(false));
        rebuild(&mut world);
        let after: Vec<Color> = world.query::<&Marker>().iter(&world).map(|m| m.color).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn mine_only_scenario() {
        let mut world = world();
        let locations = vec![loc(1, "A", Vec3::ZERO)];
        let view = mount(&mut world, MapInput::new(locations.clone()).with_mine_only(true).with_viewer("B"));
        rebuild(&mut world);
        assert!(marker_ids(&mut world, view).is_empty());

        set_input(&mut world, view, MapInput::new(locations).with_mine_only(true).with_viewer("A"));
        rebuild(&mut world);
        let markers: Vec<Marker> = world.query::<&Marker>().iter(&world).cloned().collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].color, MarkerConfig::default().owned_color());
    }

    #[test]
    fn selection_survives_rebuild_only_if_id_remains() {
        let mut world = world();
        let locations = vec![loc(1, "a", Vec3::ZERO), loc(2, "b", Vec3::X)];
        let view = mount(&mut world, MapInput::new(locations.clone()));
        rebuild(&mut world);

        let group = world.get::<MapView>(view).unwrap().markers;
        let marker = world.get::<MarkerGroup>(group).unwrap().marker_for(2).unwrap();
        world.get_mut::<ViewSelection>(view).unwrap().select(locations[1].clone(), marker);
        world.get_mut::<Highlight>(view).unwrap().set(Some(marker));

        set_input(&mut world, view, MapInput::new(locations.clone()));
        rebuild(&mut world);
        let selection = world.get::<ViewSelection>(view).unwrap();
        assert_eq!(selection.location().map(|l| l.id), Some(2));
        let new_marker = selection.marker().unwrap();
        assert_ne!(new_marker, marker);
        assert_eq!(world.get::<Highlight>(view).unwrap().selected(), Some(new_marker));

        set_input(&mut world, view, MapInput::new(locations[..1].to_vec()));
        rebuild(&mut world);
        assert!(world.get::<ViewSelection>(view).unwrap().location().is_none());
        assert_eq!(world.get::<Highlight>(view).unwrap().selected(), None);
        let events: Vec<_> = world
            .resource::<Events<LocationSelected>>()
            .iter_current_update_events()
            .cloned()
            .collect();
        assert_eq!(events, vec![LocationSelected { view, location: None }]);
    }

    #[test]
    fn reselected_location_is_the_one_on_the_map() {
        let mut world = world();
        let bad = Location::new(1, "a", "Bad", Vec3::new(f32::NAN, 0.0, 0.0));
        let good = Location::new(1, "a", "Good", Vec3::ZERO);
        let view = mount(&mut world, MapInput::new(vec![bad, good.clone()]));
        rebuild(&mut world);

        let group = world.get::<MapView>(view).unwrap().markers;
        let marker = world.get::<MarkerGroup>(group).unwrap().marker_for(1).unwrap();
        world.get_mut::<ViewSelection>(view).unwrap().select(good.clone(), marker);

        let input = world.get::<MapInput>(view).unwrap().clone();
        set_input(&mut world, view, input);
        rebuild(&mut world);

        let selection = world.get::<ViewSelection>(view).unwrap();
        let location = selection.location().unwrap();
        assert_eq!(location.name, "Good");
        assert_eq!(location.position(), Some(Vec3::ZERO));
    }
}
