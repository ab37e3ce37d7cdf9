//! Surface interaction math - ricochet gate, reflection and lateral scatter.

use bevy::prelude::*;
use rand::Rng;

use crate::components::SurfaceMaterial;

/// Nudge applied along a ray when starting a new cast from a surface point,
/// and the floor for distances used as divisors.
pub const SURFACE_EPSILON: f32 = 0.001;

/// Orthonormal lateral axes `(right, up)` for a normalized direction.
///
/// Falls back to the X axis as reference when the direction is nearly vertical.
pub fn lateral_basis(direction: Vec3) -> (Vec3, Vec3) {
    let reference = if direction.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
    let right = direction.cross(reference).normalize();
    let up = right.cross(direction).normalize();
    (right, up)
}

/// Shift a direction sideways by `(x, y)` in its lateral plane.
///
/// The forward axis is preserved and the result is re-normalized.
pub fn offset_lateral(direction: Vec3, offset: Vec2) -> Vec3 {
    if offset == Vec2::ZERO {
        return direction;
    }
    let (right, up) = lateral_basis(direction);
    (direction + right * offset.x + up * offset.y).normalize_or(direction)
}

/// Random lateral deflection with each axis drawn from `range` and multiplied by `scale`.
///
/// Used both for refraction when leaving a penetrated object and for fragment
/// scattering.
pub fn scatter(direction: Vec3, range: [f32; 2], scale: f32, rng: &mut impl Rng) -> Vec3 {
    let [min, max] = range;
    if min >= max {
        return offset_lateral(direction, Vec2::splat(min * scale));
    }
    let offset = Vec2::new(rng.random_range(min..=max), rng.random_range(min..=max)) * scale;
    offset_lateral(direction, offset)
}

/// Angle between the incoming direction and the surface normal, in degrees.
///
/// A head-on hit is 180, a grazing hit approaches 90.
pub fn incidence_angle_deg(direction: Vec3, normal: Vec3) -> f32 {
    direction.angle_between(normal).to_degrees()
}

/// Whether the hit is shallow enough to bounce.
///
/// # Arguments
/// * `direction` - Normalized incoming direction
/// * `normal` - Surface normal at the hit point
/// * `max_incident_angle_deg` - Largest angle above the surface plane that may bounce
pub fn ricochet_angle_allowed(direction: Vec3, normal: Vec3, max_incident_angle_deg: f32) -> bool {
    incidence_angle_deg(direction, normal) - 90.0 <= max_incident_angle_deg
}

/// Reflect `direction` about `normal`.
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Bounce direction: the reflection scaled per axis by a factor drawn from
/// `[0.5 - deflection / 2, 0.5 + deflection / 2]`.
///
/// # Returns
/// The normalized outgoing direction, or the plain reflection when the
/// scaled vector degenerates.
pub fn ricochet_direction(
    direction: Vec3,
    normal: Vec3,
    deflection: f32,
    rng: &mut impl Rng,
) -> Vec3 {
    let reflected = reflect(direction, normal).normalize_or(normal);
    let low = 0.5 - deflection * 0.5;
    let high = 0.5 + deflection * 0.5;
    let mut factor = || {
        if low < high {
            rng.random_range(low..=high)
        } else {
            low
        }
    };
    let scale = Vec3::new(factor(), factor(), factor());
    (reflected * scale).normalize_or(reflected)
}

/// Surface material presets for common surfaces.
pub mod materials {
    use super::*;
    use crate::types::SurfaceType;

    /// Poured concrete. Dense enough to bounce most rounds.
    pub fn concrete() -> SurfaceMaterial {
        SurfaceMaterial {
            density: 2.0,
            penetrable: true,
            decal_eligible: true,
            surface_type: SurfaceType::Concrete,
        }
    }

    /// Steel plate.
    pub fn metal() -> SurfaceMaterial {
        SurfaceMaterial {
            density: 6.0,
            penetrable: true,
            decal_eligible: true,
            surface_type: SurfaceType::Metal,
        }
    }

    pub fn wood() -> SurfaceMaterial {
        SurfaceMaterial {
            density: 0.6,
            penetrable: true,
            decal_eligible: true,
            surface_type: SurfaceType::Wood,
        }
    }

    /// Characters and creatures. No decals, they bleed instead.
    pub fn flesh() -> SurfaceMaterial {
        SurfaceMaterial {
            density: 1.0,
            penetrable: true,
            decal_eligible: false,
            surface_type: SurfaceType::Flesh,
        }
    }

    pub fn glass() -> SurfaceMaterial {
        SurfaceMaterial {
            density: 0.3,
            penetrable: true,
            decal_eligible: true,
            surface_type: SurfaceType::Glass,
        }
    }

    pub fn water() -> SurfaceMaterial {
        SurfaceMaterial {
            density: 1.0,
            penetrable: true,
            decal_eligible: false,
            surface_type: SurfaceType::Water,
        }
    }

    /// Packed earth. Stops everything.
    pub fn dirt() -> SurfaceMaterial {
        SurfaceMaterial {
            density: 1.5,
            penetrable: false,
            decal_eligible: true,
            surface_type: SurfaceType::Dirt,
        }
    }
}
