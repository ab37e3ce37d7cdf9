//! # Bevy Fire Control
//!
//! Hitscan ballistics and weapon fire control for first-person shooters on Bevy 0.18.
//!
//! ## Features
//! - Timer-driven fire control: single, burst, full-auto and shotgun modes
//! - Magazine and bullet-by-bullet reloads with interruption
//! - Melee strikes, fire-mode switching and interactions
//! - Dynamic accuracy with bloom while firing and recovery while aiming
//! - Shot resolution with penetration, ricochets and fragmentation
//! - Damage falloff curves and RON-authored ammo profiles
//! - Effects emitted as intents (damage, decals, audio, impulses, tracers)
//!
//! ## Quick Start
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_fire_control::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(BallisticsPluginGroup)
//!         .run();
//! }
//! ```

pub mod ammo;
pub mod components;
pub mod error;
pub mod events;
pub mod resources;
pub mod systems;
pub mod types;

#[cfg(test)]
mod test_support;

pub mod prelude {
    pub use crate::ammo::{AmmoProfile, FalloffCurve, FalloffKey};
    pub use crate::components::*;
    pub use crate::error::ConfigError;
    pub use crate::events::*;
    pub use crate::resources::*;
    pub use crate::systems::ballistics::{resolve_shot, ShotRequest};
    pub use crate::systems::fire_control::{FireContext, TickOutput, WeaponEvent};
    pub use crate::types::*;
    pub use crate::BallisticsPluginGroup;
    pub use crate::{BallisticsCorePlugin, BallisticsSurfacePlugin};
}

use bevy::prelude::*;

/// Main plugin group that includes all fire control subsystems.
///
/// # Example
/// ```no_run
/// use bevy::prelude::*;
/// use bevy_fire_control::prelude::*;
///
/// fn main() {
///     App::new()
///         .add_plugins(DefaultPlugins)
///         .add_plugins(BallisticsPluginGroup)
///         .run();
/// }
/// ```
#[derive(Default)]
pub struct BallisticsPluginGroup;

impl PluginGroup for BallisticsPluginGroup {
    fn build(self) -> bevy::app::PluginGroupBuilder {
        bevy::app::PluginGroupBuilder::start::<Self>()
            .add(BallisticsCorePlugin)
            .add(BallisticsSurfacePlugin)
    }
}

/// Weapon activation, fire control and damage dispatch.
///
/// # Systems
/// - `equip_weapons` - Validates new weapons and attaches their fire state
/// - `unequip_weapons` - Drops fire state when a weapon is removed
/// - `update_fire_control` - Ticks every weapon and forwards its intents (`dim3` only)
/// - `apply_damage::<Health>` - Applies damage messages to [`components::Health`]
pub struct BallisticsCorePlugin;

impl Plugin for BallisticsCorePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<components::Weapon>()
            .register_type::<components::WeaponFireState>()
            .register_type::<components::WeaponInput>()
            .register_type::<components::Health>()
            .register_type::<resources::BallisticsConfig>()
            .init_resource::<resources::BallisticsConfig>()
            .init_resource::<resources::BallisticsRng>()
            .init_resource::<resources::AmmoLibrary>()
            .add_message::<events::ShotFired>()
            .add_message::<events::ReloadStarted>()
            .add_message::<events::ReloadCompleted>()
            .add_message::<events::MeleeHit>()
            .add_message::<events::DryFired>()
            .add_message::<events::FireModeSwitched>()
            .add_message::<events::InteractionStarted>()
            .add_message::<events::DamageEvent>()
            .add_message::<events::DecalEvent>()
            .add_message::<events::AudioEvent>()
            .add_message::<events::ImpulseEvent>()
            .add_message::<events::TracerEvent>()
            .add_message::<events::RicochetEvent>()
            .add_message::<events::FragmentEvent>()
            .add_message::<events::PenetrationEvent>()
            .add_systems(
                PreUpdate,
                (
                    systems::fire_control::equip_weapons,
                    systems::fire_control::unequip_weapons,
                )
                    .chain(),
            )
            .add_systems(FixedUpdate, systems::damage::apply_damage::<components::Health>);

        // 3D Physics Systems
        #[cfg(feature = "dim3")]
        {
            use avian3d::prelude::SpatialQueryPipeline;
            app.add_systems(
                FixedUpdate,
                systems::fire_control::update_fire_control
                    .before(systems::damage::apply_damage::<components::Health>)
                    .run_if(resource_exists::<SpatialQueryPipeline>),
            );
        }
    }
}

/// Surface materials and impact impulses.
///
/// # Systems
/// - `apply_impact_impulses` - Pushes dynamic bodies hit by bullets and melee (`dim3` only)
pub struct BallisticsSurfacePlugin;

impl Plugin for BallisticsSurfacePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<components::SurfaceMaterial>()
            .register_type::<components::ImpactResponse>();

        #[cfg(feature = "dim3")]
        app.add_systems(
            FixedUpdate,
            systems::collision::apply_impact_impulses
                .after(systems::fire_control::update_fire_control),
        );
    }
}
