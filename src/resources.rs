//! Global resources for the ballistics system.

use std::collections::HashMap;

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ammo::{presets, AmmoProfile};
use crate::error::ConfigError;
use crate::systems::surface::SURFACE_EPSILON;
use crate::types::AmmoId;

/// Global configuration for shot resolution and effect intents.
///
/// # Example
/// ```
/// use bevy_fire_control::resources::BallisticsConfig;
///
/// let config = BallisticsConfig {
///     tracer_speed: 600.0,
///     max_branch_depth: 2,
///     ..Default::default()
/// };
/// ```
#[derive(Resource, Reflect, Clone, Debug, PartialEq)]
#[reflect(Resource)]
pub struct BallisticsConfig {
    /// Apparent tracer speed used to derive tracer duration (m/s)
    pub tracer_speed: f32,
    /// Tracer duration for shots that hit nothing (seconds)
    pub tracer_duration: f32,
    /// Tracers shorter than this are not emitted (seconds)
    pub min_tracer_duration: f32,
    /// Offset applied along a ray when casting from a surface point
    pub surface_epsilon: f32,
    /// Ricochets and fragments only spawn below this depth
    pub max_branch_depth: u32,
    pub impact_audio_min_distance: f32,
    pub impact_audio_max_distance: f32,
    pub impact_audio_volume: f32,
    pub ricochet_audio_volume: f32,
}

impl Default for BallisticsConfig {
    /// Primary hits may branch once; ricochets and fragments only penetrate.
    fn default() -> Self {
        Self {
            tracer_speed: 400.0,
            tracer_duration: 0.3,
            min_tracer_duration: 0.02,
            surface_epsilon: SURFACE_EPSILON,
            max_branch_depth: 1,
            impact_audio_min_distance: 1.0,
            impact_audio_max_distance: 40.0,
            impact_audio_volume: 0.8,
            ricochet_audio_volume: 0.6,
        }
    }
}

/// Random source for spread and branch draws.
///
/// Seed it for reproducible resolution in tests and replays.
#[derive(Resource)]
pub struct BallisticsRng(pub StdRng);

impl BallisticsRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for BallisticsRng {
    fn default() -> Self {
        Self(StdRng::from_os_rng())
    }
}

/// Registered ammo profiles, keyed by [`AmmoId`].
///
/// Profiles are validated on insertion, so everything the engine reads from
/// the library is known to be well formed.
#[derive(Resource, Clone, Debug)]
pub struct AmmoLibrary {
    profiles: HashMap<AmmoId, AmmoProfile>,
}

impl AmmoLibrary {
    pub const RIFLE_FMJ: AmmoId = AmmoId(0);
    pub const PISTOL_FMJ: AmmoId = AmmoId(1);
    pub const ARMOR_PIERCING: AmmoId = AmmoId(2);
    pub const BUCKSHOT: AmmoId = AmmoId(3);
    pub const HOLLOW_POINT: AmmoId = AmmoId(4);

    /// An empty library.
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Library holding the built-in cartridge presets.
    pub fn with_presets() -> Self {
        let profiles = [
            (Self::RIFLE_FMJ, presets::rifle_fmj()),
            (Self::PISTOL_FMJ, presets::pistol_fmj()),
            (Self::ARMOR_PIERCING, presets::armor_piercing()),
            (Self::BUCKSHOT, presets::buckshot()),
            (Self::HOLLOW_POINT, presets::hollow_point()),
        ]
        .into_iter()
        .collect();
        Self { profiles }
    }

    /// Validate and register a profile, replacing any previous one under `id`.
    pub fn insert(&mut self, id: AmmoId, profile: AmmoProfile) -> Result<(), ConfigError> {
        profile.validate()?;
        self.profiles.insert(id, profile);
        Ok(())
    }

    /// Parse, validate and register a profile from RON text.
    pub fn insert_ron(&mut self, id: AmmoId, source: &str) -> Result<(), ConfigError> {
        let profile = AmmoProfile::from_ron(source)?;
        self.profiles.insert(id, profile);
        Ok(())
    }

    pub fn get(&self, id: AmmoId) -> Option<&AmmoProfile> {
        self.profiles.get(&id)
    }

    /// Like [`get`](Self::get) but reports a missing profile as a configuration error.
    pub fn require(&self, id: AmmoId) -> Result<&AmmoProfile, ConfigError> {
        self.get(id).ok_or(ConfigError::MissingAmmo(id))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for AmmoLibrary {
    fn default() -> Self {
        Self::with_presets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_library_presets() {
        let library = AmmoLibrary::default();
        assert_eq!(library.len(), 5);
        assert!(library.get(AmmoLibrary::BUCKSHOT).is_some());
        assert!(library.require(AmmoLibrary::HOLLOW_POINT).is_ok());
        assert_eq!(
            library.require(AmmoId(99)).err(),
            Some(ConfigError::MissingAmmo(AmmoId(99)))
        );
    }

    #[test]
    fn test_library_rejects_invalid_profile() {
        let mut library = AmmoLibrary::empty();
        let bad = AmmoProfile {
            ricochet_chance: 2.0,
            ..Default::default()
        };
        assert!(library.insert(AmmoId(7), bad).is_err());
        assert!(library.is_empty());

        library
            .insert_ron(AmmoId(7), "(name: \"Slug\", damage_range: (60.0, 70.0))")
            .expect("valid profile");
        assert_eq!(library.get(AmmoId(7)).map(|p| p.name.as_str()), Some("Slug"));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = BallisticsRng::seeded(42);
        let mut b = BallisticsRng::seeded(42);
        let x: f32 = a.0.random();
        let y: f32 = b.0.random();
        assert_eq!(x, y);
    }
}
