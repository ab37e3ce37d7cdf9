//! Cartridge ballistic parameters.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{
    check_non_negative, check_positive, check_probability, check_range, ConfigError,
};
use crate::types::DamageMode;

/// Upper bound on fragments per impact. Fragments carry at most a quarter of
/// the shot each, so four of them never exceed the fragmentation multiplier.
pub const MAX_FRAGMENTS: u32 = 4;

/// A single point on a [`FalloffCurve`].
#[derive(Clone, Copy, Debug, PartialEq, Reflect, Serialize, Deserialize)]
pub struct FalloffKey {
    /// Fraction of max range, `0..=1`
    pub distance: f32,
    /// Fraction of base damage, `0..=1`
    pub damage: f32,
}

/// Piecewise-linear mapping from range fraction to damage fraction.
///
/// Keys are sorted by distance. Inputs outside the keyed span clamp to the
/// nearest key.
#[derive(Clone, Debug, PartialEq, Reflect, Serialize, Deserialize)]
pub struct FalloffCurve {
    pub keys: Vec<FalloffKey>,
}

impl Default for FalloffCurve {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

impl FalloffCurve {
    pub fn constant(damage: f32) -> Self {
        Self {
            keys: vec![FalloffKey { distance: 0.0, damage }],
        }
    }

    /// Full damage up to `start`, dropping linearly to `floor` at max range.
    pub fn linear(start: f32, floor: f32) -> Self {
        Self {
            keys: vec![
                FalloffKey { distance: 0.0, damage: 1.0 },
                FalloffKey { distance: start, damage: 1.0 },
                FalloffKey { distance: 1.0, damage: floor },
            ],
        }
    }

    /// Evaluate the curve at `fraction` of max range.
    pub fn evaluate(&self, fraction: f32) -> f32 {
        let t = fraction.clamp(0.0, 1.0);
        let Some(first) = self.keys.first() else {
            return 1.0;
        };
        if t <= first.distance {
            return first.damage.clamp(0.0, 1.0);
        }

        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.distance {
                let span = b.distance - a.distance;
                if span <= f32::EPSILON {
                    return b.damage.clamp(0.0, 1.0);
                }
                let s = (t - a.distance) / span;
                return (a.damage + (b.damage - a.damage) * s).clamp(0.0, 1.0);
            }
        }

        self.keys
            .last()
            .map_or(1.0, |key| key.damage.clamp(0.0, 1.0))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keys.is_empty() {
            return Err(ConfigError::FalloffCurve("needs at least one key"));
        }
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if self.keys.iter().any(|k| !in_unit(k.distance) || !in_unit(k.damage)) {
            return Err(ConfigError::FalloffCurve("keys must lie within [0, 1]"));
        }
        if self.keys.windows(2).any(|w| w[1].distance < w[0].distance) {
            return Err(ConfigError::FalloffCurve("keys must be sorted by distance"));
        }
        Ok(())
    }
}

/// Immutable ballistic parameters of a cartridge type.
///
/// Ranges are `[min, max]` pairs. Call [`AmmoProfile::validate`] (or load
/// through [`AmmoProfile::from_ron`]) before handing a profile to the engine.
#[derive(Clone, Debug, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct AmmoProfile {
    pub name: String,
    /// Projectile mass (kg)
    pub projectile_mass: f32,
    /// Muzzle speed (m/s)
    pub projectile_speed: f32,
    /// Cap on the impulse handed to rigid bodies
    pub max_impact_force: f32,

    pub damage_range: [f32; 2],
    pub damage_mode: DamageMode,
    pub damage_falloff: FalloffCurve,

    pub can_penetrate: bool,
    /// Distance budget spent crossing material, scaled by density
    pub penetration_power: f32,
    /// Lateral deflection sampled when leaving a penetrated object
    pub refraction_range: [f32; 2],
    pub density_influence: f32,

    pub ricochet_enabled: bool,
    pub ricochet_chance: f32,
    /// Largest grazing angle (degrees above the surface plane) that can bounce
    pub max_incident_angle_deg: f32,
    pub trajectory_deflection: f32,
    pub ricochet_density_threshold: f32,

    pub fragmentation_enabled: bool,
    pub fragmentation_chance: f32,
    pub max_fragments: u32,
    pub fragment_scattering: [f32; 2],
    pub fragmentation_density_threshold: f32,
    pub fragmentation_damage_multiplier: f32,
}

impl Default for AmmoProfile {
    /// A plain full metal jacket rifle round.
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            projectile_mass: 0.004,
            projectile_speed: 900.0,
            max_impact_force: 15.0,
            damage_range: [30.0, 35.0],
            damage_mode: DamageMode::ConstantPerShot,
            damage_falloff: FalloffCurve::default(),
            can_penetrate: true,
            penetration_power: 1.0,
            refraction_range: [-0.05, 0.05],
            density_influence: 1.0,
            ricochet_enabled: false,
            ricochet_chance: 0.0,
            max_incident_angle_deg: 15.0,
            trajectory_deflection: 0.2,
            ricochet_density_threshold: 2.0,
            fragmentation_enabled: false,
            fragmentation_chance: 0.0,
            max_fragments: 1,
            fragment_scattering: [-0.2, 0.2],
            fragmentation_density_threshold: 1.0,
            fragmentation_damage_multiplier: 1.0,
        }
    }
}

impl AmmoProfile {
    /// Parse a profile from RON text and validate it.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let profile: Self = ron::from_str(source)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("damage_range", self.damage_range)?;
        check_non_negative("damage_range", self.damage_range[0])?;
        self.damage_falloff.validate()?;

        check_positive("projectile_mass", self.projectile_mass)?;
        check_non_negative("projectile_speed", self.projectile_speed)?;
        check_non_negative("max_impact_force", self.max_impact_force)?;

        check_non_negative("penetration_power", self.penetration_power)?;
        check_range("refraction_range", self.refraction_range)?;
        check_non_negative("density_influence", self.density_influence)?;

        check_probability("ricochet_chance", self.ricochet_chance)?;
        check_probability("trajectory_deflection", self.trajectory_deflection)?;
        check_non_negative("max_incident_angle_deg", self.max_incident_angle_deg)?;

        check_probability("fragmentation_chance", self.fragmentation_chance)?;
        check_range("fragment_scattering", self.fragment_scattering)?;
        if !(1..=MAX_FRAGMENTS).contains(&self.max_fragments) {
            return Err(ConfigError::FragmentCount {
                value: self.max_fragments,
                max: MAX_FRAGMENTS,
            });
        }
        if !(self.fragmentation_damage_multiplier >= 1.0) {
            return Err(ConfigError::FragmentMultiplier(
                self.fragmentation_damage_multiplier,
            ));
        }
        Ok(())
    }

    /// Kinetic energy over distance, capped at `max_impact_force`.
    pub fn impact_force(&self, distance: f32) -> f32 {
        let energy = 0.5 * self.projectile_mass * self.projectile_speed * self.projectile_speed;
        (energy / distance.max(crate::systems::surface::SURFACE_EPSILON)).min(self.max_impact_force)
    }
}

/// Ammo presets for common cartridges.
pub mod presets {
    use super::*;

    /// 9mm full metal jacket. Penetrates thin cover, never bounces.
    pub fn pistol_fmj() -> AmmoProfile {
        AmmoProfile {
            name: "9mm FMJ".to_string(),
            projectile_mass: 0.008,
            projectile_speed: 360.0,
            max_impact_force: 8.0,
            damage_range: [18.0, 24.0],
            damage_mode: DamageMode::DistanceFalloff,
            damage_falloff: FalloffCurve::linear(0.3, 0.5),
            penetration_power: 0.4,
            ..Default::default()
        }
    }

    /// 5.56mm full metal jacket with occasional ricochets off hard surfaces.
    pub fn rifle_fmj() -> AmmoProfile {
        AmmoProfile {
            name: "5.56 FMJ".to_string(),
            damage_mode: DamageMode::DistanceFalloff,
            damage_falloff: FalloffCurve::linear(0.5, 0.6),
            ricochet_enabled: true,
            ricochet_chance: 0.35,
            max_incident_angle_deg: 20.0,
            ..Default::default()
        }
    }

    /// Hardened core that punches through dense cover.
    pub fn armor_piercing() -> AmmoProfile {
        AmmoProfile {
            name: "7.62 AP".to_string(),
            projectile_mass: 0.0097,
            projectile_speed: 850.0,
            max_impact_force: 25.0,
            damage_range: [45.0, 55.0],
            penetration_power: 3.0,
            refraction_range: [-0.02, 0.02],
            density_influence: 0.5,
            ricochet_enabled: true,
            ricochet_chance: 0.1,
            max_incident_angle_deg: 10.0,
            ricochet_density_threshold: 4.0,
            ..Default::default()
        }
    }

    /// 12 gauge buckshot. One pellet's worth of damage per profile.
    pub fn buckshot() -> AmmoProfile {
        AmmoProfile {
            name: "12ga Buckshot".to_string(),
            projectile_mass: 0.0035,
            projectile_speed: 400.0,
            max_impact_force: 6.0,
            damage_range: [8.0, 12.0],
            damage_mode: DamageMode::DistanceFalloff,
            damage_falloff: FalloffCurve::linear(0.1, 0.1),
            can_penetrate: false,
            penetration_power: 0.0,
            ricochet_enabled: true,
            ricochet_chance: 0.5,
            max_incident_angle_deg: 25.0,
            ..Default::default()
        }
    }

    /// Expanding round that breaks apart inside soft targets.
    pub fn hollow_point() -> AmmoProfile {
        AmmoProfile {
            name: ".45 HP".to_string(),
            projectile_mass: 0.012,
            projectile_speed: 260.0,
            max_impact_force: 10.0,
            damage_range: [28.0, 34.0],
            penetration_power: 0.5,
            fragmentation_enabled: true,
            fragmentation_chance: 0.6,
            max_fragments: 3,
            fragment_scattering: [-0.3, 0.3],
            fragmentation_density_threshold: 0.8,
            fragmentation_damage_multiplier: 1.5,
            ..Default::default()
        }
    }
}
