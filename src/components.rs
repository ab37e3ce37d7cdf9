//! Core components for weapons, surfaces and damage receivers.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{check_non_negative, check_positive, ConfigError};
use crate::types::{AmmoId, AmmoReserve, FireMode, LayerMask, ReloadMode, SurfaceType};

/// Authored weapon configuration.
///
/// Validated once when the weapon is activated; a weapon that fails
/// validation never receives a [`WeaponFireState`] and stays inert.
///
/// # Example
/// ```
/// use bevy_fire_control::components::Weapon;
/// use bevy_fire_control::types::FireMode;
///
/// let smg = Weapon {
///     fire_mode: FireMode::FullAuto,
///     fire_interval: 0.07,
///     rounds_per_magazine: 32,
///     ..Default::default()
/// };
/// assert!(smg.validate().is_ok());
/// ```
#[derive(Component, Reflect, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct Weapon {
    pub name: String,
    /// Cartridge fired by this weapon
    pub ammo: AmmoId,
    /// Entity whose hierarchy must never be damaged by this weapon
    #[serde(skip)]
    pub owner: Option<Entity>,

    pub rounds_per_magazine: u32,
    /// A round stays in the chamber during a tactical magazine reload, so the
    /// reload capacity becomes `rounds_per_magazine + 1`. Empty magazine
    /// reloads and bullet-by-bullet reloads fill to `rounds_per_magazine`.
    pub has_chamber: bool,

    pub fire_mode: FireMode,
    /// Seconds between shots
    pub fire_interval: f32,
    pub secondary_fire_mode: Option<FireMode>,
    pub secondary_fire_interval: f32,
    /// Pellets per trigger pull in shotgun modes
    pub bullets_per_shoot: u32,
    pub bullets_per_burst: u32,

    /// Maximum shot range (meters)
    pub max_range: f32,
    pub layer_mask: LayerMask,

    pub max_spread_degrees: f32,
    pub base_accuracy: f32,
    pub hip_accuracy: f32,
    pub aim_accuracy: f32,
    /// Accuracy approach rate while firing (per second)
    pub decay_rate_shooting: f32,
    /// Accuracy approach rate otherwise (per second)
    pub decay_rate_walking: f32,

    pub reload_mode: ReloadMode,
    /// Start a reload instead of dry-firing when the magazine is empty
    pub auto_reload: bool,
    /// Magazine swap with a round still loaded
    pub reload_duration: f32,
    /// Magazine swap from empty
    pub full_reload_duration: f32,
    pub start_reload_duration: f32,
    /// Both halves of chambering the first round
    pub insert_in_chamber_duration: f32,
    pub insert_duration: f32,
    pub stop_reload_duration: f32,

    pub melee_duration: f32,
    /// Wind-up before the strike lands, within `melee_duration`
    pub melee_impact_delay: f32,
    pub melee_range: f32,
    pub melee_damage: f32,
    pub melee_force: f32,

    pub switch_mode_duration: f32,
    pub interact_animation_length: f32,
    pub interact_delay: f32,
    /// Refractory period after an empty trigger pull
    pub dry_fire_cooldown: f32,
}

impl Default for Weapon {
    /// A semi-automatic rifle with a 30 round magazine.
    fn default() -> Self {
        Self {
            name: "Rifle".to_string(),
            ammo: AmmoId(0),
            owner: None,
            rounds_per_magazine: 30,
            has_chamber: true,
            fire_mode: FireMode::Single,
            fire_interval: 0.1,
            secondary_fire_mode: None,
            secondary_fire_interval: 0.1,
            bullets_per_shoot: 1,
            bullets_per_burst: 3,
            max_range: 500.0,
            layer_mask: LayerMask::ALL,
            max_spread_degrees: 5.0,
            base_accuracy: 0.6,
            hip_accuracy: 0.8,
            aim_accuracy: 0.97,
            decay_rate_shooting: 8.0,
            decay_rate_walking: 3.0,
            reload_mode: ReloadMode::Magazines,
            auto_reload: true,
            reload_duration: 2.0,
            full_reload_duration: 2.6,
            start_reload_duration: 0.4,
            insert_in_chamber_duration: 0.8,
            insert_duration: 0.5,
            stop_reload_duration: 0.4,
            melee_duration: 0.8,
            melee_impact_delay: 0.25,
            melee_range: 1.5,
            melee_damage: 50.0,
            melee_force: 5.0,
            switch_mode_duration: 0.3,
            interact_animation_length: 0.6,
            interact_delay: 0.5,
            dry_fire_cooldown: 0.25,
        }
    }
}

impl Weapon {
    /// Parse a weapon from RON text and validate it.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let weapon: Self = ron::from_str(source)?;
        weapon.validate()?;
        Ok(weapon)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounds_per_magazine == 0 {
            return Err(ConfigError::EmptyCount {
                field: "rounds_per_magazine",
            });
        }
        if self.bullets_per_shoot == 0 {
            return Err(ConfigError::EmptyCount {
                field: "bullets_per_shoot",
            });
        }
        if self.bullets_per_burst == 0 {
            return Err(ConfigError::EmptyCount {
                field: "bullets_per_burst",
            });
        }

        check_positive("fire_interval", self.fire_interval)?;
        if self.secondary_fire_mode.is_some() {
            check_positive("secondary_fire_interval", self.secondary_fire_interval)?;
        }
        check_positive("max_range", self.max_range)?;
        check_non_negative("max_spread_degrees", self.max_spread_degrees)?;

        let unit = 0.0..=1.0;
        if !(unit.contains(&self.base_accuracy)
            && unit.contains(&self.aim_accuracy)
            && self.base_accuracy <= self.hip_accuracy
            && self.hip_accuracy <= self.aim_accuracy)
        {
            return Err(ConfigError::AccuracyBounds {
                base: self.base_accuracy,
                hip: self.hip_accuracy,
                aim: self.aim_accuracy,
            });
        }
        check_non_negative("decay_rate_shooting", self.decay_rate_shooting)?;
        check_non_negative("decay_rate_walking", self.decay_rate_walking)?;

        for (field, value) in [
            ("reload_duration", self.reload_duration),
            ("full_reload_duration", self.full_reload_duration),
            ("start_reload_duration", self.start_reload_duration),
            ("insert_in_chamber_duration", self.insert_in_chamber_duration),
            ("stop_reload_duration", self.stop_reload_duration),
            ("melee_duration", self.melee_duration),
            ("melee_impact_delay", self.melee_impact_delay),
            ("melee_range", self.melee_range),
            ("melee_damage", self.melee_damage),
            ("melee_force", self.melee_force),
            ("switch_mode_duration", self.switch_mode_duration),
            ("interact_animation_length", self.interact_animation_length),
            ("interact_delay", self.interact_delay),
            ("dry_fire_cooldown", self.dry_fire_cooldown),
        ] {
            check_non_negative(field, value)?;
        }
        check_positive("insert_duration", self.insert_duration)?;
        if self.melee_impact_delay > self.melee_duration {
            return Err(ConfigError::InvertedRange {
                field: "melee_impact_delay",
                min: self.melee_impact_delay,
                max: self.melee_duration,
            });
        }
        Ok(())
    }

    /// Seconds an interaction keeps the weapon busy.
    pub fn interact_duration(&self) -> f32 {
        self.interact_animation_length.max(self.interact_delay)
    }
}

/// Weapon presets for common archetypes.
pub mod presets {
    use super::*;
    use crate::resources::AmmoLibrary;

    pub fn pistol() -> Weapon {
        Weapon {
            name: "Pistol".to_string(),
            ammo: AmmoLibrary::PISTOL_FMJ,
            rounds_per_magazine: 15,
            fire_interval: 0.15,
            max_range: 150.0,
            max_spread_degrees: 4.0,
            base_accuracy: 0.7,
            hip_accuracy: 0.85,
            aim_accuracy: 0.97,
            reload_duration: 1.4,
            full_reload_duration: 1.8,
            ..Default::default()
        }
    }

    /// Full-auto rifle that can drop to single shots.
    pub fn assault_rifle() -> Weapon {
        Weapon {
            name: "Assault Rifle".to_string(),
            ammo: AmmoLibrary::RIFLE_FMJ,
            fire_mode: FireMode::FullAuto,
            fire_interval: 0.09,
            secondary_fire_mode: Some(FireMode::Single),
            secondary_fire_interval: 0.12,
            ..Default::default()
        }
    }

    pub fn burst_rifle() -> Weapon {
        Weapon {
            name: "Burst Rifle".to_string(),
            ammo: AmmoLibrary::RIFLE_FMJ,
            fire_mode: FireMode::Burst,
            fire_interval: 0.07,
            bullets_per_burst: 3,
            secondary_fire_mode: Some(FireMode::Single),
            secondary_fire_interval: 0.15,
            ..Default::default()
        }
    }

    /// Pump-action shotgun loaded one shell at a time.
    pub fn pump_shotgun() -> Weapon {
        Weapon {
            name: "Pump Shotgun".to_string(),
            ammo: AmmoLibrary::BUCKSHOT,
            rounds_per_magazine: 6,
            fire_mode: FireMode::ShotgunSingle,
            fire_interval: 0.9,
            bullets_per_shoot: 8,
            max_range: 60.0,
            max_spread_degrees: 9.0,
            base_accuracy: 0.3,
            hip_accuracy: 0.4,
            aim_accuracy: 0.5,
            reload_mode: ReloadMode::BulletByBullet,
            ..Default::default()
        }
    }

    pub fn auto_shotgun() -> Weapon {
        Weapon {
            name: "Auto Shotgun".to_string(),
            fire_mode: FireMode::ShotgunAuto,
            fire_interval: 0.3,
            rounds_per_magazine: 8,
            ..pump_shotgun()
        }
    }
}

/// Sub-phase of an in-flight reload.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub enum ReloadPhase {
    /// Single timed magazine swap
    Magazine { ends_at: f64, tactical: bool },
    Start { ends_at: f64 },
    /// Chambering the first round; runs as two halves
    InsertInChamber { ends_at: f64, second_half: bool },
    Insert { ends_at: f64 },
    Stop { ends_at: f64 },
}

impl ReloadPhase {
    pub fn ends_at(&self) -> f64 {
        match *self {
            Self::Magazine { ends_at, .. }
            | Self::Start { ends_at }
            | Self::InsertInChamber { ends_at, .. }
            | Self::Insert { ends_at }
            | Self::Stop { ends_at } => ends_at,
        }
    }
}

/// Timed state a weapon can be in. Only one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Default, Reflect)]
pub enum Activity {
    #[default]
    Idle,
    Reloading(ReloadPhase),
    MeleeAttacking {
        impact_at: f64,
        impact_applied: bool,
        ends_at: f64,
    },
    SwitchingFireMode { ends_at: f64 },
    Interacting { ends_at: f64 },
}

/// Remaining shots of a burst in progress.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct BurstState {
    pub remaining: u32,
    pub next_shot_at: f64,
}

/// Mutable per-weapon fire-control state.
///
/// Created when the weapon is activated and advanced once per fixed tick.
/// Deadlines are absolute times on the fixed clock, in seconds.
#[derive(Component, Reflect, Clone, Debug, PartialEq)]
#[reflect(Component)]
pub struct WeaponFireState {
    pub(crate) current_rounds: u32,
    pub(crate) fire_mode: FireMode,
    pub(crate) fire_interval: f32,
    pub(crate) secondary: Option<(FireMode, f32)>,
    pub(crate) accuracy: f32,

    pub(crate) next_fire_time: f64,
    pub(crate) next_reload_time: f64,
    pub(crate) next_switch_mode_time: f64,
    pub(crate) next_interact_time: f64,
    pub(crate) is_reloading: bool,
    pub(crate) is_attacking: bool,

    pub(crate) activity: Activity,
    pub(crate) burst: Option<BurstState>,
    pub(crate) trigger_held: bool,
    pub(crate) out_of_ammo: bool,
}

impl WeaponFireState {
    pub fn current_rounds(&self) -> u32 {
        self.current_rounds
    }

    pub fn accuracy(&self) -> f32 {
        self.accuracy
    }

    pub fn fire_mode(&self) -> FireMode {
        self.fire_mode
    }

    pub fn is_reloading(&self) -> bool {
        self.is_reloading
    }

    pub fn is_attacking(&self) -> bool {
        self.is_attacking
    }

    /// Magazine empty and nothing left in reserve at the last tick.
    pub fn out_of_ammo(&self) -> bool {
        self.out_of_ammo
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn next_fire_time(&self) -> f64 {
        self.next_fire_time
    }

    pub fn next_reload_time(&self) -> f64 {
        self.next_reload_time
    }

    /// Whether a timed state or a burst is in progress at `now`.
    pub fn is_busy(&self, now: f64) -> bool {
        self.activity != Activity::Idle
            || self.burst.is_some()
            || now < self.next_reload_time
            || now < self.next_switch_mode_time
            || now < self.next_interact_time
    }
}

/// Per-tick controls written by the player or AI controller.
///
/// `fire` and `aim` are held states. The other flags are one-shot requests
/// and are cleared once a fixed tick has seen them.
#[derive(Component, Reflect, Clone, Debug, PartialEq)]
#[reflect(Component)]
pub struct WeaponInput {
    /// Muzzle or camera position shots are fired from
    pub aim_origin: Vec3,
    /// Normalized aim direction
    pub aim_direction: Vec3,
    pub fire: bool,
    pub aim: bool,
    pub reload: bool,
    pub melee: bool,
    pub switch_fire_mode: bool,
    pub interact: bool,
}

impl Default for WeaponInput {
    fn default() -> Self {
        Self {
            aim_origin: Vec3::ZERO,
            aim_direction: Vec3::NEG_Z,
            fire: false,
            aim: false,
            reload: false,
            melee: false,
            switch_fire_mode: false,
            interact: false,
        }
    }
}

impl WeaponInput {
    pub(crate) fn clear_requests(&mut self) {
        self.reload = false;
        self.melee = false;
        self.switch_fire_mode = false;
        self.interact = false;
    }
}

/// Ballistic properties of a collider.
///
/// Looked up on the hit collider first, then on its rigid body.
///
/// # Example
/// ```
/// use bevy_fire_control::components::SurfaceMaterial;
/// use bevy_fire_control::types::SurfaceType;
///
/// let plywood = SurfaceMaterial {
///     density: 0.6,
///     penetrable: true,
///     decal_eligible: true,
///     surface_type: SurfaceType::Wood,
/// };
/// ```
#[derive(Component, Reflect, Clone, Debug, PartialEq)]
#[reflect(Component)]
pub struct SurfaceMaterial {
    /// Budget multiplier per meter crossed, always positive
    pub density: f32,
    pub penetrable: bool,
    pub decal_eligible: bool,
    pub surface_type: SurfaceType,
}

impl Default for SurfaceMaterial {
    /// Solid, non-penetrable generic surface.
    fn default() -> Self {
        Self {
            density: 1.0,
            penetrable: false,
            decal_eligible: true,
            surface_type: SurfaceType::Generic,
        }
    }
}

/// Anything that can take damage from a shot or a melee strike.
pub trait Damageable {
    /// # Arguments
    /// * `damage` - Damage to apply
    /// * `origin` - Position the attack came from
    /// * `hit_point` - World-space impact point
    /// * `penetration_power` - Budget the projectile still carried
    fn apply_damage(&mut self, damage: f32, origin: Vec3, hit_point: Vec3, penetration_power: f32);
}

/// Simple hit point pool.
#[derive(Component, Reflect, Clone, Debug, PartialEq)]
#[reflect(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }
}

impl Damageable for Health {
    fn apply_damage(&mut self, damage: f32, _origin: Vec3, _hit_point: Vec3, _penetration_power: f32) {
        self.current = (self.current - damage.max(0.0)).max(0.0);
    }
}

/// Reserve ammunition carried by a shooter, keyed by cartridge.
///
/// Weapons draw from the inventory on their owner, or on themselves when
/// they have no owner.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct AmmoInventory {
    rounds: HashMap<AmmoId, u32>,
}

impl AmmoInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rounds(mut self, ammo: AmmoId, count: u32) -> Self {
        self.add(ammo, count);
        self
    }

    pub fn add(&mut self, ammo: AmmoId, count: u32) {
        *self.rounds.entry(ammo).or_insert(0) += count;
    }
}

impl AmmoReserve for AmmoInventory {
    fn available(&self, ammo: AmmoId) -> u32 {
        self.rounds.get(&ammo).copied().unwrap_or(0)
    }

    fn request(&mut self, ammo: AmmoId, amount: u32) -> u32 {
        let Some(held) = self.rounds.get_mut(&ammo) else {
            return 0;
        };
        let granted = amount.min(*held);
        *held -= granted;
        granted
    }
}

/// Marks a body that is pushed by bullet impacts.
///
/// Impulses are divided by `mass` before being added to the body velocity.
#[derive(Component, Reflect, Clone, Debug, PartialEq)]
#[reflect(Component)]
pub struct ImpactResponse {
    pub mass: f32,
}

impl Default for ImpactResponse {
    fn default() -> Self {
        Self { mass: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weapon_is_valid() {
        assert_eq!(Weapon::default().validate(), Ok(()));
    }

    #[test]
    fn test_presets_are_valid() {
        for weapon in [
            presets::pistol(),
            presets::assault_rifle(),
            presets::burst_rifle(),
            presets::pump_shotgun(),
            presets::auto_shotgun(),
        ] {
            assert_eq!(weapon.validate(), Ok(()), "{}", weapon.name);
        }
        assert_eq!(presets::auto_shotgun().reload_mode, ReloadMode::BulletByBullet);
    }

    #[test]
    fn test_weapon_validation() {
        let empty = Weapon {
            rounds_per_magazine: 0,
            ..Default::default()
        };
        assert!(matches!(
            empty.validate(),
            Err(ConfigError::EmptyCount { field: "rounds_per_magazine" })
        ));

        let accuracy = Weapon {
            base_accuracy: 0.9,
            hip_accuracy: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            accuracy.validate(),
            Err(ConfigError::AccuracyBounds { .. })
        ));

        let wind_up = Weapon {
            melee_duration: 0.2,
            melee_impact_delay: 0.5,
            ..Default::default()
        };
        assert!(wind_up.validate().is_err());

        let interval = Weapon {
            fire_interval: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            interval.validate(),
            Err(ConfigError::NotPositive { field: "fire_interval", .. })
        ));
    }

    #[test]
    fn test_interact_duration_takes_longer_of_both() {
        let weapon = Weapon {
            interact_animation_length: 0.4,
            interact_delay: 0.9,
            ..Default::default()
        };
        assert_eq!(weapon.interact_duration(), 0.9);
    }

    #[test]
    fn test_weapon_from_ron() {
        let weapon = Weapon::from_ron(
            r#"(
                name: "Shotgun",
                ammo: (3),
                fire_mode: ShotgunSingle,
                bullets_per_shoot: 8,
                reload_mode: BulletByBullet,
                rounds_per_magazine: 6,
            )"#,
        )
        .expect("valid weapon");
        assert_eq!(weapon.ammo, AmmoId(3));
        assert_eq!(weapon.fire_mode, FireMode::ShotgunSingle);
        assert_eq!(weapon.reload_mode, ReloadMode::BulletByBullet);
        assert_eq!(weapon.owner, None);
    }

    #[test]
    fn test_ammo_inventory_grants_partial_requests() {
        let mut inventory = AmmoInventory::new().with_rounds(AmmoId(0), 10);
        assert_eq!(inventory.request(AmmoId(0), 4), 4);
        assert_eq!(inventory.available(AmmoId(0)), 6);
        assert_eq!(inventory.request(AmmoId(0), 30), 6);
        assert_eq!(inventory.available(AmmoId(0)), 0);
        assert_eq!(inventory.request(AmmoId(5), 1), 0);
    }

    #[test]
    fn test_health_damage() {
        let mut health = Health::new(100.0);
        health.apply_damage(30.0, Vec3::ZERO, Vec3::X, 0.0);
        assert_eq!(health.current, 70.0);
        health.apply_damage(500.0, Vec3::ZERO, Vec3::X, 0.0);
        assert_eq!(health.current, 0.0);
        assert!(health.is_dead());
    }
}
