// Map view lifecycle: spawning the scene of one view and tearing it down again
use bevy::pbr::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;
use bevy::render::camera::Viewport;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::view::RenderLayers;
use bevy::ui::UiTargetCamera;

use crate::camera::{CameraFlight, MapCamera, OrbitRig};
use crate::config::{GridConfig, MapViewConfig};
use crate::constants::*;
use crate::input::PointerScratch;
use crate::labels::LabelOverlay;
use crate::markers::{MapInput, MarkerGroup};
use crate::selection::{spawn_outline_shell, Highlight, ViewSelection};

/// Root entity of a mounted map view. Everything else the view owns hangs
/// off the entities listed here.
#[derive(Component, Debug, Clone, Copy)]
pub struct MapView {
    pub camera: Entity,
    pub markers: Entity,
    pub overlay: Entity,
    pub outline: Entity,
    pub grid: Entity,
    pub layer: usize,
}

/// Host-owned screen region the view renders into, in physical pixels
/// relative to the window's top-left corner.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewContainer {
    pub origin: UVec2,
    pub size: UVec2,
}

impl ViewContainer {
    pub fn new(origin: UVec2, size: UVec2) -> Self {
        Self { origin, size }
    }

    pub fn has_area(&self) -> bool {
        self.size.x > 0 && self.size.y > 0
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        self.has_area().then(|| self.size.x as f32 / self.size.y as f32)
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.has_area().then(|| Viewport {
            physical_position: self.origin,
            physical_size: self.size,
            ..default()
        })
    }

    /// The container in logical pixels, the space cursor positions live in.
    pub fn logical_rect(&self, scale_factor: f32) -> Rect {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        let min = self.origin.as_vec2() / scale;
        Rect::from_corners(min, min + self.size.as_vec2() / scale)
    }
}

/// Keeps the view's container equal to the whole primary window.
#[derive(Component, Debug, Default)]
pub struct FillWindow;

/// Hands out one render layer per view so views never draw each other's meshes.
/// Layers of disposed views are handed out again before new ones.
#[derive(Resource, Debug, Default)]
pub struct ViewLayers {
    next: usize,
    free: Vec<usize>,
}

impl ViewLayers {
    fn allocate(&mut self) -> usize {
        if let Some(layer) = self.free.pop() {
            return layer;
        }
        self.next += 1;
        self.next
    }

    fn release(&mut self, layer: usize) {
        if layer > 0 && layer <= self.next && !self.free.contains(&layer) {
            self.free.push(layer);
        }
    }
}

/// Returned by [`spawn_map_view`]. Holds every top-level entity the view
/// created so teardown still works when some of them are already gone.
/// Not `Clone`: a view is disposed once.
#[derive(Debug)]
pub struct MapViewHandle {
    pub view: Entity,
    camera: Entity,
    markers: Entity,
    overlay: Entity,
    outline: Entity,
    grid: Entity,
    layer: usize,
}

/// Mount a map view into `container` and show `input`. Markers appear on the
/// next update, when the rebuild system sees the new `MapInput`.
pub fn spawn_map_view(world: &mut World, container: ViewContainer, input: MapInput) -> MapViewHandle {
    let config = world.get_resource::<MapViewConfig>().cloned().unwrap_or_default();
    let layer = world.get_resource_or_init::<ViewLayers>().allocate();
    let layers = RenderLayers::layer(layer);

    let grid_mesh = world.get_resource_or_init::<Assets<Mesh>>().add(grid_mesh(&config.grid));
    let grid_material = world
        .get_resource_or_init::<Assets<StandardMaterial>>()
        .add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            ..default()
        });

    let view = world
        .spawn((
            Name::new("Map View"),
            Transform::default(),
            Visibility::default(),
            container,
            input,
            ViewSelection::default(),
            Highlight::default(),
            PointerScratch::default(),
        ))
        .id();

    let rig = OrbitRig::new(config.camera.initial_position(), Vec3::ZERO, &config.camera);
    let camera = world
        .spawn((
            Name::new("Map View Camera"),
            Camera3d::default(),
            Camera {
                order: layer as isize,
                is_active: container.has_area(),
                viewport: container.viewport(),
                clear_color: ClearColorConfig::Custom(BACKGROUND_COLOR),
                ..default()
            },
            Projection::Perspective(PerspectiveProjection {
                fov: config.camera.fov_degrees.to_radians(),
                near: config.camera.near,
                far: config.camera.far,
                aspect_ratio: container.aspect_ratio().unwrap_or(1.0),
            }),
            // Per-camera light, the host's AmbientLight resource is left alone
            AmbientLight {
                color: Color::WHITE,
                brightness: AMBIENT_BRIGHTNESS,
                ..default()
            },
            rig.transform(),
            rig,
            CameraFlight::default(),
            MapCamera { view },
            layers.clone(),
        ))
        .id();

    let grid = world
        .spawn((
            Name::new("Reference Grid"),
            Mesh3d(grid_mesh),
            MeshMaterial3d(grid_material),
            Transform::default(),
            NotShadowCaster,
            NotShadowReceiver,
            layers.clone(),
            ChildOf(view),
        ))
        .id();

    let markers = world
        .spawn((
            Name::new("Markers"),
            Transform::default(),
            Visibility::default(),
            MarkerGroup::new(view),
            ChildOf(view),
        ))
        .id();

    let outline = spawn_outline_shell(world, view, &config, layers);

    let logical = container.logical_rect(1.0);
    let overlay = world
        .spawn((
            Name::new("Label Overlay"),
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(0.0),
                top: Val::Px(0.0),
                width: Val::Px(logical.width()),
                height: Val::Px(logical.height()),
                overflow: Overflow::clip(),
                ..default()
            },
            UiTargetCamera(camera),
            LabelOverlay { view },
        ))
        .id();

    world.entity_mut(view).insert(MapView {
        camera,
        markers,
        overlay,
        outline,
        grid,
        layer,
    });

    info!(
        "Map view {:?} mounted on layer {} ({}x{} px)",
        view, layer, container.size.x, container.size.y
    );

    MapViewHandle {
        view,
        camera,
        markers,
        overlay,
        outline,
        grid,
        layer,
    }
}

/// Unmount a view: release its GPU assets and despawn everything it spawned.
/// Entities that are already gone are skipped.
pub fn dispose_map_view(world: &mut World, handle: MapViewHandle) {
    let resources = world
        .get_mut::<MarkerGroup>(handle.markers)
        .map(|mut group| group.take_resources());
    if let Some(resources) = resources {
        resources.release(world);
    }
    release_mesh_assets(world, handle.grid);
    release_mesh_assets(world, handle.outline);

    for entity in [handle.overlay, handle.camera, handle.view] {
        if let Ok(entity) = world.get_entity_mut(entity) {
            entity.despawn();
        }
    }

    if let Some(mut layers) = world.get_resource_mut::<ViewLayers>() {
        layers.release(handle.layer);
    }

    info!("Map view {:?} disposed, layer {} free", handle.view, handle.layer);
}

/// Deferred form of [`dispose_map_view`] for use from systems.
pub fn queue_dispose(commands: &mut Commands, handle: MapViewHandle) {
    commands.queue(move |world: &mut World| dispose_map_view(world, handle));
}

fn release_mesh_assets(world: &mut World, entity: Entity) {
    let Ok(entity_ref) = world.get_entity(entity) else { return };
    let mesh = entity_ref.get::<Mesh3d>().map(|mesh| mesh.0.id());
    let material = entity_ref
        .get::<MeshMaterial3d<StandardMaterial>>()
        .map(|material| material.0.id());

    if let (Some(id), Some(mut meshes)) = (mesh, world.get_resource_mut::<Assets<Mesh>>()) {
        meshes.remove(id);
    }
    if let (Some(id), Some(mut materials)) = (material, world.get_resource_mut::<Assets<StandardMaterial>>()) {
        materials.remove(id);
    }
}

/// Square reference grid on the XZ plane, centre lines brighter.
fn grid_mesh(grid: &GridConfig) -> Mesh {
    let divisions = grid.divisions.max(1);
    let half = grid.size * 0.5;
    let step = grid.size / divisions as f32;
    let center = LinearRgba::from(GRID_CENTER_COLOR).to_f32_array();
    let line = LinearRgba::from(GRID_LINE_COLOR).to_f32_array();

    let mut positions = Vec::with_capacity((divisions as usize + 1) * 4);
    let mut colors = Vec::with_capacity(positions.capacity());
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let color = if i * 2 == divisions { center } else { line };
        positions.extend_from_slice(&[[-half, 0.0, k], [half, 0.0, k], [k, 0.0, -half], [k, 0.0, half]]);
        colors.extend_from_slice(&[color; 4]);
    }
    let indices: Vec<u32> = (0..positions.len() as u32).collect();

    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
        .with_inserted_indices(Indices::U32(indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn world() -> World {
        let mut world = World::new();
        world.init_resource::<MapViewConfig>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world
    }

    fn container() -> ViewContainer {
        ViewContainer::new(UVec2::new(300, 0), UVec2::new(800, 600))
    }

    #[test]
    fn spawn_creates_view_parts() {
        let mut world = world();
        let input = MapInput::new(vec![Location::new(1, "u", "A", Vec3::ZERO)]);
        let handle = spawn_map_view(&mut world, container(), input);

        let view = *world.get::<MapView>(handle.view).unwrap();
        assert_eq!(view.camera, handle.camera);
        let camera = world.get::<Camera>(view.camera).unwrap();
        assert!(camera.is_active);
        let viewport = camera.viewport.as_ref().unwrap();
        assert_eq!(viewport.physical_position, UVec2::new(300, 0));
        assert_eq!(viewport.physical_size, UVec2::new(800, 600));
        assert!(world.get::<MarkerGroup>(view.markers).is_some());
        assert_eq!(world.get::<Visibility>(view.outline), Some(&Visibility::Hidden));
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 2);
    }

    #[test]
    fn zero_sized_container_renders_nothing() {
        let mut world = world();
        let handle = spawn_map_view(&mut world, ViewContainer::default(), MapInput::default());
        let camera = world.get::<Camera>(handle.camera).unwrap();
        assert!(!camera.is_active);
        assert!(camera.viewport.is_none());
    }

    #[test]
    fn views_get_distinct_layers() {
        let mut world = world();
        let a = spawn_map_view(&mut world, container(), MapInput::default());
        let b = spawn_map_view(&mut world, container(), MapInput::default());
        let layer_a = world.get::<MapView>(a.view).unwrap().layer;
        let layer_b = world.get::<MapView>(b.view).unwrap().layer;
        assert_ne!(layer_a, layer_b);
    }

    #[test]
    fn dispose_removes_entities_and_assets() {
        let mut world = world();
        let before = world.entities().len();
        let handle = spawn_map_view(&mut world, container(), MapInput::default());
        let camera = handle.camera;
        dispose_map_view(&mut world, handle);

        assert!(world.get_entity(camera).is_err());
        assert_eq!(world.entities().len(), before);
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 0);
        assert_eq!(world.resource::<Assets<StandardMaterial>>().len(), 0);
    }

    #[test]
    fn dispose_tolerates_detached_parts() {
        let mut world = world();
        let handle = spawn_map_view(&mut world, container(), MapInput::default());
        world.despawn(handle.overlay);
        world.despawn(handle.view);
        dispose_map_view(&mut world, handle);
        assert_eq!(world.query::<&MapCamera>().iter(&world).count(), 0);
    }

    #[test]
    fn disposed_layer_is_reused() {
        let mut world = world();
        let kept = spawn_map_view(&mut world, container(), MapInput::default());
        let first = spawn_map_view(&mut world, container(), MapInput::default());
        let layer = first.layer;
        dispose_map_view(&mut world, first);

        let again = spawn_map_view(&mut world, container(), MapInput::default());
        assert_eq!(again.layer, layer);
        assert_ne!(again.layer, kept.layer);
        assert_eq!(world.get::<Camera>(again.camera).unwrap().order, layer as isize);

        let fresh = spawn_map_view(&mut world, container(), MapInput::default());
        assert!(fresh.layer > layer);
    }

    #[test]
    fn host_ambient_light_survives_mount_and_dispose() {
        let mut world = world();
        world.insert_resource(AmbientLight {
            brightness: 42.0,
            ..default()
        });

        let handle = spawn_map_view(&mut world, container(), MapInput::default());
        assert_eq!(world.resource::<AmbientLight>().brightness, 42.0);
        let own = world.get::<AmbientLight>(handle.camera).unwrap();
        assert_eq!(own.brightness, AMBIENT_BRIGHTNESS);

        dispose_map_view(&mut world, handle);
        assert_eq!(world.resource::<AmbientLight>().brightness, 42.0);
        assert_eq!(world.query::<&AmbientLight>().iter(&world).count(), 0);
    }

    #[test]
    fn logical_rect_divides_by_scale() {
        let rect = container().logical_rect(2.0);
        assert_eq!(rect.min, Vec2::new(150.0, 0.0));
        assert_eq!(rect.size(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn grid_has_two_lines_per_division_step() {
        let mesh = grid_mesh(&GridConfig { size: 10.0, divisions: 10 });
        assert_eq!(mesh.count_vertices(), 44);
    }
}
