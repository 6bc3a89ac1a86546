// Camera module - damped orbit navigation plus fly-to animation
//
// Submodules:
// - orbit: OrbitRig component (damped rotate/zoom/pan)
// - flight: CameraFlight component and FlyToRequest event

mod flight;
mod orbit;

use bevy::prelude::*;

use crate::config::MapViewConfig;
use crate::scene::MapView;

pub use flight::{CameraFlight, FlyToRequest};
pub use orbit::OrbitRig;

/// Tags the camera entity of a map view.
#[derive(Component, Debug, Clone, Copy)]
pub struct MapCamera {
    pub view: Entity,
}

/// System: Start (or supersede) fly-to animations from host and picker requests
pub fn fly_to_request_system(
    mut requests: EventReader<FlyToRequest>,
    config: Res<MapViewConfig>,
    views: Query<&MapView>,
    mut cameras: Query<(&mut OrbitRig, &mut CameraFlight)>,
) {
    for request in requests.read() {
        let Ok(view) = views.get(request.view) else {
            debug!("Fly-to for unknown view {:?} ignored", request.view);
            continue;
        };
        let Ok((mut rig, mut flight)) = cameras.get_mut(view.camera) else { continue };
        if !request.point.is_finite() {
            warn!("Fly-to with non-finite target {:?} ignored", request.point);
            continue;
        }

        let superseded = flight.is_active();
        let generation = flight.start(
            &mut rig,
            request.point,
            config.fly_to.offset(),
            config.fly_to.duration_secs,
        );
        if superseded {
            info!("Fly-to #{} to {:?} supersedes the previous flight", generation, request.point);
        } else {
            info!("Fly-to #{} to {:?}", generation, request.point);
        }
    }
}

/// System: Per-frame camera step - fly-to interpolation, then orbit damping
pub fn advance_camera_system(
    time: Res<Time>,
    mut cameras: Query<(&mut OrbitRig, &mut CameraFlight, &mut Transform), With<MapCamera>>,
) {
    let dt = time.delta_secs();
    for (mut rig, mut flight, mut transform) in cameras.iter_mut() {
        let flew = flight.step(dt, &mut rig);
        let damped = rig.update();
        if flew || damped {
            *transform = rig.transform();
        }
    }
}
