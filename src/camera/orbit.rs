// Damped orbit rig: rotate/zoom/pan around a target point
use std::f32::consts::PI;

use bevy::prelude::*;

use crate::config::CameraConfig;
use crate::constants::{ORBIT_POLAR_MARGIN, ORBIT_SETTLE_EPSILON};

/// Camera state of one view. `eye` and `target` are the only values the
/// renderer sees; user input only accumulates pending motion which `update`
/// releases a damped fraction at a time.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitRig {
    pub eye: Vec3,
    pub target: Vec3,
    damping: f32,
    min_distance: f32,
    max_distance: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_pan: Vec3,
    pending_zoom: f32, // multiplicative, 1.0 = no zoom
}

impl OrbitRig {
    pub fn new(eye: Vec3, target: Vec3, config: &CameraConfig) -> Self {
        Self {
            eye,
            target,
            damping: config.damping_factor.clamp(0.001, 1.0),
            min_distance: config.min_distance,
            max_distance: config.max_distance.max(config.min_distance),
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_pan: Vec3::ZERO,
            pending_zoom: 1.0,
        }
    }

    pub fn distance(&self) -> f32 {
        self.eye.distance(self.target)
    }

    /// Horizontal drag orbits around the up axis, vertical drag tilts.
    pub fn rotate(&mut self, delta_px: Vec2, speed: f32) {
        self.pending_theta -= delta_px.x * speed;
        self.pending_phi -= delta_px.y * speed;
    }

    /// Screen-space pan; scaled by orbit distance so it feels constant on screen.
    pub fn pan(&mut self, delta_px: Vec2, speed: f32) {
        let forward = (self.target - self.eye).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let scale = speed * self.distance();
        self.pending_pan += (-right * delta_px.x + up * delta_px.y) * scale;
    }

    /// Positive `lines` zooms in.
    pub fn zoom(&mut self, lines: f32, speed: f32) {
        let step = (1.0 - speed).clamp(0.01, 0.99);
        self.pending_zoom *= step.powf(lines);
    }

    pub fn is_settled(&self) -> bool {
        self.pending_theta.abs() < ORBIT_SETTLE_EPSILON
            && self.pending_phi.abs() < ORBIT_SETTLE_EPSILON
            && self.pending_pan.length() < ORBIT_SETTLE_EPSILON
            && (self.pending_zoom - 1.0).abs() < ORBIT_SETTLE_EPSILON
    }

    /// Drop residual inertia from earlier drags.
    pub fn clear_inertia(&mut self) {
        self.pending_theta = 0.0;
        self.pending_phi = 0.0;
        self.pending_pan = Vec3::ZERO;
        self.pending_zoom = 1.0;
    }

    /// Apply one frame of damped motion. Returns false, and leaves `eye`
    /// untouched, once all pending motion has settled.
    pub fn update(&mut self) -> bool {
        if self.is_settled() {
            self.clear_inertia();
            return false;
        }

        let f = self.damping;
        let offset = self.eye - self.target;
        let radius = offset.length().max(f32::EPSILON);
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        theta += self.pending_theta * f;
        phi = (phi + self.pending_phi * f).clamp(ORBIT_POLAR_MARGIN, PI - ORBIT_POLAR_MARGIN);
        let zoom_step = 1.0 + (self.pending_zoom - 1.0) * f;
        let radius = (radius * zoom_step).clamp(self.min_distance, self.max_distance);
        self.target += self.pending_pan * f;

        self.eye = self.target + spherical_to_offset(radius, phi, theta);

        let decay = 1.0 - f;
        self.pending_theta *= decay;
        self.pending_phi *= decay;
        self.pending_pan *= decay;
        self.pending_zoom = 1.0 + (self.pending_zoom - 1.0) * decay;
        true
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye).looking_at(self.target, Vec3::Y)
    }
}

fn spherical_to_offset(radius: f32, phi: f32, theta: f32) -> Vec3 {
    let sin_phi = phi.sin();
    Vec3::new(
        radius * sin_phi * theta.sin(),
        radius * phi.cos(),
        radius * sin_phi * theta.cos(),
    )
}
