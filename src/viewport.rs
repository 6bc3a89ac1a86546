// Resize handling: keeps camera viewport, projection and label overlay in step
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::scene::{FillWindow, MapView, ViewContainer};

/// Apply a container size to everything sized by it. The camera renders
/// nothing while the container has no area.
pub fn apply_resize(
    container: &ViewContainer,
    scale_factor: f32,
    camera: &mut Camera,
    projection: &mut Projection,
    overlay: &mut Node,
) {
    camera.viewport = container.viewport();
    camera.is_active = container.has_area();

    if let (Projection::Perspective(perspective), Some(aspect_ratio)) = (projection, container.aspect_ratio()) {
        perspective.aspect_ratio = aspect_ratio;
    }

    let logical = container.logical_rect(scale_factor);
    overlay.width = Val::Px(logical.width());
    overlay.height = Val::Px(logical.height());
}

/// System: Track the primary window size for views mounted with FillWindow
pub fn follow_window_system(
    windows: Query<&Window, With<PrimaryWindow>>,
    mut views: Query<&mut ViewContainer, With<FillWindow>>,
) {
    let Ok(window) = windows.single() else { return };
    let size = UVec2::new(window.physical_width(), window.physical_height());
    for mut container in views.iter_mut() {
        container.set_if_neq(ViewContainer::new(UVec2::ZERO, size));
    }
}

/// System: Push container changes into the view's camera and overlay
pub fn sync_container_system(
    windows: Query<&Window, With<PrimaryWindow>>,
    views: Query<(Entity, &MapView, &ViewContainer), Changed<ViewContainer>>,
    mut cameras: Query<(&mut Camera, &mut Projection)>,
    mut overlays: Query<&mut Node>,
) {
    let scale_factor = windows.single().map(|window| window.scale_factor()).unwrap_or(1.0);

    for (entity, view, container) in views.iter() {
        let Ok((mut camera, mut projection)) = cameras.get_mut(view.camera) else { continue };
        let Ok(mut overlay) = overlays.get_mut(view.overlay) else { continue };

        apply_resize(container, scale_factor, &mut camera, &mut projection, &mut overlay);
        debug!(
            "View {:?} resized to {}x{} at {:?}",
            entity, container.size.x, container.size.y, container.origin
        );
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapViewConfig;
    use crate::markers::MapInput;
    use crate::scene::spawn_map_view;
    use bevy::ecs::system::RunSystemOnce;

    fn world() -> World {
        let mut world = World::new();
        world.init_resource::<MapViewConfig>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world
    }

    fn sizes(world: &World, view: Entity) -> (UVec2, f32, Val, Val) {
        let map_view = world.get::<MapView>(view).unwrap();
        let camera = world.get::<Camera>(map_view.camera).unwrap();
        let Projection::Perspective(perspective) = world.get::<Projection>(map_view.camera).unwrap() else {
            panic!("map camera is not perspective");
        };
        let overlay = world.get::<Node>(map_view.overlay).unwrap();
        (
            camera.viewport.as_ref().unwrap().physical_size,
            perspective.aspect_ratio,
            overlay.width,
            overlay.height,
        )
    }

    #[test]
    fn resize_keeps_viewport_aspect_and_overlay_in_sync() {
        let mut world = world();
        let view = spawn_map_view(
            &mut world,
            ViewContainer::new(UVec2::ZERO, UVec2::new(640, 480)),
            MapInput::default(),
        )
        .view;

        *world.get_mut::<ViewContainer>(view).unwrap() = ViewContainer::new(UVec2::new(10, 20), UVec2::new(1000, 250));
        world.run_system_once(sync_container_system).unwrap();

        let (size, aspect, width, height) = sizes(&world, view);
        assert_eq!(size, UVec2::new(1000, 250));
        assert_eq!(aspect, 4.0);
        assert_eq!(width, Val::Px(1000.0));
        assert_eq!(height, Val::Px(250.0));
    }

    #[test]
    fn zero_size_deactivates_until_resized() {
        let mut world = world();
        let handle = spawn_map_view(&mut world, ViewContainer::default(), MapInput::default());
        let camera = world.get::<MapView>(handle.view).unwrap().camera;
        assert!(!world.get::<Camera>(camera).unwrap().is_active);

        *world.get_mut::<ViewContainer>(handle.view).unwrap() = ViewContainer::new(UVec2::ZERO, UVec2::new(300, 300));
        world.run_system_once(sync_container_system).unwrap();
        assert!(world.get::<Camera>(camera).unwrap().is_active);
        assert_eq!(sizes(&world, handle.view).1, 1.0);
    }

    #[test]
    fn fill_window_follows_primary_window() {
        let mut world = world();
        let mut window = Window::default();
        window.resolution.set_physical_resolution(1920, 1080);
        world.spawn((window, PrimaryWindow));
        let view = spawn_map_view(&mut world, ViewContainer::default(), MapInput::default()).view;
        world.entity_mut(view).insert(FillWindow);

        world.run_system_once(follow_window_system).unwrap();
        assert_eq!(world.get::<ViewContainer>(view).unwrap().size, UVec2::new(1920, 1080));
    }
}
