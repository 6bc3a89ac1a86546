// Fly-to animation: eased camera move onto a point plus a fixed offset
use bevy::prelude::*;

use crate::math_utils::smoothstep;

use super::orbit::OrbitRig;

/// Request a fly-to on a view. Both the host and the picker go through this.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct FlyToRequest {
    pub view: Entity,
    pub point: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FlightTask {
    generation: u64,
    start_eye: Vec3,
    start_target: Vec3,
    end_eye: Vec3,
    end_target: Vec3,
    elapsed: f32,
    duration: f32,
}

impl FlightTask {
    fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }
}

/// At most one flight per camera. Starting a new one bumps the generation
/// and replaces the in-flight task, so only the latest destination is ever
/// reached.
#[derive(Component, Debug, Default)]
pub struct CameraFlight {
    generation: u64,
    task: Option<FlightTask>,
}

impl CameraFlight {
    pub fn start(&mut self, rig: &mut OrbitRig, point: Vec3, offset: Vec3, duration: f32) -> u64 {
        self.generation += 1;
        // Leftover drag inertia would keep pushing the rig off the destination
        rig.clear_inertia();
        self.task = Some(FlightTask {
            generation: self.generation,
            start_eye: rig.eye,
            start_target: rig.target,
            end_eye: point + offset,
            end_target: point,
            elapsed: 0.0,
            duration,
        });
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Advance the active flight by `dt` seconds and write the interpolated
    /// pose into the rig. Returns whether a flight moved the rig this frame.
    pub fn step(&mut self, dt: f32, rig: &mut OrbitRig) -> bool {
        let Some(task) = self.task.as_mut() else { return false };

        task.elapsed += dt.max(0.0);
        let t = task.progress();
        let k = smoothstep(t);
        rig.eye = task.start_eye.lerp(task.end_eye, k);
        rig.target = task.start_target.lerp(task.end_target, k);

        if t >= 1.0 {
            debug!("Fly-to #{} arrived at {:?}", task.generation, task.end_target);
            self.task = None;
        }
        true
    }
}
