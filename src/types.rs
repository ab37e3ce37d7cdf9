//! Common types, collaborator traits and shot intents.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Identifier of an ammo profile in the [`AmmoLibrary`](crate::resources::AmmoLibrary).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Reflect, Serialize, Deserialize)]
pub struct AmmoId(pub u32);

/// Collision layer bitmask handed through to the spatial query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// No layer.
    pub const NONE: Self = Self(0);

    pub fn contains(self, layer: u32) -> bool {
        self.0 & layer != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Surface category used to pick decals and impact sounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum SurfaceType {
    #[default]
    Generic,
    Metal,
    Concrete,
    Wood,
    Dirt,
    Flesh,
    Glass,
    Water,
}

/// Trigger response pattern of a weapon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum FireMode {
    /// One shot per trigger press.
    #[default]
    Single,
    /// Fires every tick the trigger is held, limited by the fire interval.
    FullAuto,
    /// A fixed number of shots per trigger press.
    Burst,
    /// Several pellets per trigger press.
    ShotgunSingle,
    /// Several pellets per shot while the trigger is held.
    ShotgunAuto,
}

impl FireMode {
    /// Whether the mode fires while the trigger is held rather than on press.
    pub fn is_automatic(self) -> bool {
        matches!(self, Self::FullAuto | Self::ShotgunAuto)
    }

    pub fn is_shotgun(self) -> bool {
        matches!(self, Self::ShotgunSingle | Self::ShotgunAuto)
    }
}

/// How ammunition is replenished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum ReloadMode {
    #[default]
    Magazines,
    BulletByBullet,
}

/// How the sampled base damage is scaled with distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum DamageMode {
    #[default]
    ConstantPerShot,
    DistanceFalloff,
}

/// Result of a single ray query against the world.
///
/// `root` is the top-level owner of the hit collider; a shot never damages
/// the root it was fired from.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceHit {
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
    /// Distance from ray origin
    pub distance: f32,
    /// Material density, always positive
    pub density: f32,
    pub penetrable: bool,
    pub decal_eligible: bool,
    pub surface_type: SurfaceType,
    pub collider: Entity,
    pub root: Entity,
    /// Dynamic body attached to the collider, if any
    pub rigid_body: Option<Entity>,
}

/// Spatial query seam between the ballistics engine and the physics backend.
///
/// Implementations must be synchronous and free of side effects. A ray that
/// starts inside a solid does not report that solid.
pub trait SurfaceQuery {
    /// Cast a ray and return the first surface hit within `max_distance`.
    ///
    /// # Arguments
    /// * `origin` - Starting point of the ray in world space
    /// * `direction` - Normalized direction of the ray
    /// * `max_distance` - Maximum distance to cast the ray
    /// * `layer_mask` - Layers the ray may hit
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layer_mask: LayerMask,
    ) -> Option<SurfaceHit>;
}

/// Ammunition pool owned by the inventory.
///
/// Asking for more than is held is not an error; `request` grants what it can.
pub trait AmmoReserve {
    /// Rounds currently held for `ammo`.
    fn available(&self, ammo: AmmoId) -> u32;

    /// Removes up to `amount` rounds and returns how many were granted.
    fn request(&mut self, ammo: AmmoId, amount: u32) -> u32;
}

/// Sound selector for audio intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCue {
    /// Bullet impact on a surface
    Impact(SurfaceType),
    /// Bullet bouncing off a surface
    Ricochet,
    /// Empty trigger pull
    DryFire,
    /// Melee strike landing
    MeleeImpact(SurfaceType),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DamageIntent {
    /// Root entity that receives the damage
    pub target: Entity,
    /// Shooter root
    pub source: Entity,
    pub damage: f32,
    /// Position the shot was fired from
    pub origin: Vec3,
    pub point: Vec3,
    /// Penetration budget left when the damage was dealt
    pub penetration_power: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecalIntent {
    pub surface_type: SurfaceType,
    pub point: Vec3,
    pub normal: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioIntent {
    pub cue: AudioCue,
    pub point: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub volume: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForceIntent {
    pub body: Entity,
    pub point: Vec3,
    pub direction: Vec3,
    pub magnitude: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TracerIntent {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Seconds the tracer stays visible
    pub duration: f32,
}

/// Budgets handed to a child ray spawned by a ricochet or a fragment.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchIntent {
    pub point: Vec3,
    pub direction: Vec3,
    pub range: f32,
    pub penetration_power: f32,
    pub damage: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PenetrationIntent {
    pub entry_point: Vec3,
    pub exit_point: Vec3,
    /// Penetrated object root
    pub target: Entity,
    /// Budget spent crossing the object
    pub distance_traveled: f32,
    pub remaining_power: f32,
}

/// Everything a resolved shot asks the outside world to do.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Damage(DamageIntent),
    Decal(DecalIntent),
    Audio(AudioIntent),
    Force(ForceIntent),
    Tracer(TracerIntent),
    Ricochet(BranchIntent),
    Fragment(BranchIntent),
    Penetration(PenetrationIntent),
}

impl Intent {
    pub fn as_damage(&self) -> Option<&DamageIntent> {
        match self {
            Self::Damage(damage) => Some(damage),
            _ => None,
        }
    }

    pub fn as_decal(&self) -> Option<&DecalIntent> {
        match self {
            Self::Decal(decal) => Some(decal),
            _ => None,
        }
    }
}
