//! Messages emitted by fire control and shot resolution.
//!
//! Note: In Bevy 0.18, buffered events use the `Message` trait instead of `Event`.

use bevy::ecs::message::Message;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::systems::fire_control::WeaponEvent;
use crate::types::{
    AudioIntent, BranchIntent, DamageIntent, DecalIntent, FireMode, ForceIntent, Intent,
    PenetrationIntent, TracerIntent,
};

/// A weapon fired one trigger resolution.
///
/// Shotgun modes fire several pellets per message; bursts send one message
/// per shot.
#[derive(Message, Clone, Debug)]
pub struct ShotFired {
    pub weapon: Entity,
    pub shooter: Entity,
    pub origin: Vec3,
    pub direction: Vec3,
    pub pellets: u32,
    /// Rounds left in the magazine after the shot
    pub rounds_left: u32,
}

#[derive(Message, Clone, Debug)]
pub struct ReloadStarted {
    pub weapon: Entity,
    /// Magazine still held rounds when the reload began
    pub tactical: bool,
}

#[derive(Message, Clone, Debug)]
pub struct ReloadCompleted {
    pub weapon: Entity,
    pub rounds: u32,
}

/// A melee strike landed on something.
#[derive(Message, Clone, Debug)]
pub struct MeleeHit {
    pub weapon: Entity,
    pub target: Entity,
    pub point: Vec3,
}

/// The trigger was pulled on an empty weapon.
#[derive(Message, Clone, Debug)]
pub struct DryFired {
    pub weapon: Entity,
    pub point: Vec3,
}

#[derive(Message, Clone, Debug)]
pub struct FireModeSwitched {
    pub weapon: Entity,
    pub mode: FireMode,
}

#[derive(Message, Clone, Debug)]
pub struct InteractionStarted {
    pub weapon: Entity,
    pub duration: f32,
}

/// Damage to apply to a root entity's [`Damageable`](crate::components::Damageable).
#[derive(Message, Clone, Debug)]
pub struct DamageEvent(pub DamageIntent);

/// Request to place a bullet hole.
#[derive(Message, Clone, Debug)]
pub struct DecalEvent(pub DecalIntent);

/// Request to play a positional sound.
#[derive(Message, Clone, Debug)]
pub struct AudioEvent(pub AudioIntent);

/// Impulse for a dynamic body.
#[derive(Message, Clone, Debug)]
pub struct ImpulseEvent(pub ForceIntent);

/// Request to spawn a tracer.
#[derive(Message, Clone, Debug)]
pub struct TracerEvent(pub TracerIntent);

#[derive(Message, Clone, Debug)]
pub struct RicochetEvent(pub BranchIntent);

#[derive(Message, Clone, Debug)]
pub struct FragmentEvent(pub BranchIntent);

#[derive(Message, Clone, Debug)]
pub struct PenetrationEvent(pub PenetrationIntent);

/// Writers for every intent message, so systems can forward a resolved shot
/// in one call.
#[derive(SystemParam)]
pub struct IntentWriters<'w> {
    damage: MessageWriter<'w, DamageEvent>,
    decals: MessageWriter<'w, DecalEvent>,
    audio: MessageWriter<'w, AudioEvent>,
    impulses: MessageWriter<'w, ImpulseEvent>,
    tracers: MessageWriter<'w, TracerEvent>,
    ricochets: MessageWriter<'w, RicochetEvent>,
    fragments: MessageWriter<'w, FragmentEvent>,
    penetrations: MessageWriter<'w, PenetrationEvent>,
}

impl IntentWriters<'_> {
    pub fn dispatch(&mut self, intents: impl IntoIterator<Item = Intent>) {
        for intent in intents {
            match intent {
                Intent::Damage(damage) => {
                    self.damage.write(DamageEvent(damage));
                }
                Intent::Decal(decal) => {
                    self.decals.write(DecalEvent(decal));
                }
                Intent::Audio(audio) => {
                    self.audio.write(AudioEvent(audio));
                }
                Intent::Force(force) => {
                    self.impulses.write(ImpulseEvent(force));
                }
                Intent::Tracer(tracer) => {
                    self.tracers.write(TracerEvent(tracer));
                }
                Intent::Ricochet(branch) => {
                    self.ricochets.write(RicochetEvent(branch));
                }
                Intent::Fragment(branch) => {
                    self.fragments.write(FragmentEvent(branch));
                }
                Intent::Penetration(penetration) => {
                    self.penetrations.write(PenetrationEvent(penetration));
                }
            }
        }
    }
}

/// Writers for the weapon lifecycle messages.
#[derive(SystemParam)]
pub struct WeaponEventWriters<'w> {
    shots: MessageWriter<'w, ShotFired>,
    reload_started: MessageWriter<'w, ReloadStarted>,
    reload_completed: MessageWriter<'w, ReloadCompleted>,
    melee_hits: MessageWriter<'w, MeleeHit>,
    dry_fires: MessageWriter<'w, DryFired>,
    mode_switches: MessageWriter<'w, FireModeSwitched>,
    interactions: MessageWriter<'w, InteractionStarted>,
}

impl WeaponEventWriters<'_> {
    /// Forward the events of one weapon tick, tagged with the weapon entity.
    pub fn dispatch(
        &mut self,
        weapon: Entity,
        shooter: Entity,
        events: impl IntoIterator<Item = WeaponEvent>,
    ) {
        for event in events {
            match event {
                WeaponEvent::ShotFired {
                    origin,
                    direction,
                    pellets,
                    rounds_left,
                } => {
                    self.shots.write(ShotFired {
                        weapon,
                        shooter,
                        origin,
                        direction,
                        pellets,
                        rounds_left,
                    });
                }
                WeaponEvent::ReloadStarted { tactical } => {
                    self.reload_started.write(ReloadStarted { weapon, tactical });
                }
                WeaponEvent::ReloadCompleted { rounds } => {
                    self.reload_completed.write(ReloadCompleted { weapon, rounds });
                }
                WeaponEvent::MeleeHit { target, point } => {
                    self.melee_hits.write(MeleeHit {
                        weapon,
                        target,
                        point,
                    });
                }
                WeaponEvent::DryFired { point } => {
                    self.dry_fires.write(DryFired { weapon, point });
                }
                WeaponEvent::FireModeSwitched(mode) => {
                    self.mode_switches.write(FireModeSwitched { weapon, mode });
                }
                WeaponEvent::InteractionStarted { duration } => {
                    self.interactions
                        .write(InteractionStarted { weapon, duration });
                }
            }
        }
    }
}
