//! Accuracy model - spread sampling and bloom recovery.

use bevy::prelude::*;
use rand::Rng;

use crate::components::Weapon;
use crate::systems::surface::offset_lateral;

/// Accuracy at or above this value fires perfectly straight.
pub const PERFECT_ACCURACY: f32 = 0.9999;

/// Sample a lateral spread offset for one shot.
///
/// # Arguments
/// * `accuracy` - Current accuracy in `[0, 1]`
/// * `max_spread_degrees` - Spread at zero accuracy
/// * `rng` - Random source
///
/// # Returns
/// An `(x, y)` offset where each axis lies in `±(1 - accuracy) * max_spread_degrees / 10`
pub fn sample_spread(accuracy: f32, max_spread_degrees: f32, rng: &mut impl Rng) -> Vec2 {
    if accuracy >= PERFECT_ACCURACY {
        return Vec2::ZERO;
    }
    let scale = (1.0 - accuracy) * max_spread_degrees / 10.0;
    Vec2::new(rng.random_range(-1.0..=1.0), rng.random_range(-1.0..=1.0)) * scale
}

/// Aim direction with a sampled spread applied.
pub fn spread_direction(
    aim: Vec3,
    accuracy: f32,
    max_spread_degrees: f32,
    rng: &mut impl Rng,
) -> Vec3 {
    offset_lateral(aim, sample_spread(accuracy, max_spread_degrees, rng))
}

/// Accuracy the weapon is recovering toward this tick.
///
/// Firing while aiming drops to hip accuracy, firing from the hip drops to
/// base accuracy.
pub fn target_accuracy(weapon: &Weapon, aiming: bool, fired: bool) -> f32 {
    match (aiming, fired) {
        (true, true) => weapon.hip_accuracy,
        (true, false) => weapon.aim_accuracy,
        (false, true) => weapon.base_accuracy,
        (false, false) => weapon.hip_accuracy,
    }
}

/// Move `current` toward `target` with an exponential approach.
///
/// The rate is `decay_rate_shooting` on ticks that fired and
/// `decay_rate_walking` otherwise. The result is clamped to
/// `[base_accuracy, aim_accuracy]`.
pub fn advance(current: f32, target: f32, weapon: &Weapon, fired: bool, dt: f32) -> f32 {
    let rate = if fired {
        weapon.decay_rate_shooting
    } else {
        weapon.decay_rate_walking
    };
    let blend = 1.0 - (-rate * dt.max(0.0)).exp();
    let next = current + (target - current) * blend;
    next.clamp(weapon.base_accuracy, weapon.aim_accuracy)
}
