// Picking and animation math shared by the camera and selection modules
use bevy::prelude::*;

/// Ray-sphere intersection test.
/// Returns the distance along the ray to the nearest intersection in front of the origin.
pub fn ray_sphere_intersection(ray: Ray3d, sphere_center: Vec3, sphere_radius: f32) -> Option<f32> {
    let direction = *ray.direction;
    let oc = ray.origin - sphere_center;
    let b = oc.dot(direction);
    let c = oc.dot(oc) - sphere_radius * sphere_radius;
    // direction is unit length, so a == 1
    let discriminant = b * b - c;

    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    // Entry point first, exit point when the origin is inside the sphere
    [-b - root, -b + root].into_iter().find(|t| *t > 0.0)
}

/// Hermite smoothstep on `t` clamped to [0, 1]: `t*t*(3 - 2t)`.
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Convert a cursor position to normalized device coordinates of `rect`.
/// x grows right and y grows up, both in [-1, 1] inside the rect.
pub fn cursor_to_ndc(cursor: Vec2, rect: Rect) -> Option<Vec2> {
    let size = rect.size();
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        (cursor.x - rect.min.x) / size.x * 2.0 - 1.0,
        -((cursor.y - rect.min.y) / size.y) * 2.0 + 1.0,
    ))
}
