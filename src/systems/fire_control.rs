//! Fire control - timer-gated firing, reloading, melee and mode switching.
//!
//! All waiting is expressed as absolute deadlines on the fixed clock. Each
//! tick first advances whatever timed state is in flight, then continues a
//! running burst, then evaluates input against the gating predicates, and
//! finally moves accuracy toward its target. An action whose gate is closed
//! is ignored without error.

use bevy::prelude::*;
use rand::Rng;

use crate::ammo::AmmoProfile;
use crate::components::{
    Activity, AmmoInventory, BurstState, ReloadPhase, Weapon, WeaponFireState, WeaponInput,
};
use crate::error::ConfigError;
use crate::resources::{AmmoLibrary, BallisticsConfig};
#[cfg(feature = "dim3")]
use crate::{
    events::{IntentWriters, WeaponEventWriters},
    resources::BallisticsRng,
    systems::collision::PhysicsSurfaceQuery,
};
use crate::systems::accuracy::{advance, spread_direction, target_accuracy};
use crate::systems::ballistics::{resolve_shot, ShotRequest};
use crate::types::{
    AmmoReserve, AudioCue, AudioIntent, DamageIntent, FireMode, ForceIntent, Intent, ReloadMode,
    SurfaceQuery,
};

/// Collaborators a weapon needs for one tick.
pub struct FireContext<'a, Q: ?Sized, A: ?Sized, R> {
    pub query: &'a Q,
    pub reserve: &'a mut A,
    pub profile: &'a AmmoProfile,
    pub config: &'a BallisticsConfig,
    pub rng: &'a mut R,
    /// Root entity of the shooter
    pub shooter: Entity,
}

/// Something observable that happened to a weapon during a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum WeaponEvent {
    ShotFired {
        origin: Vec3,
        direction: Vec3,
        pellets: u32,
        rounds_left: u32,
    },
    ReloadStarted {
        tactical: bool,
    },
    ReloadCompleted {
        rounds: u32,
    },
    MeleeHit {
        target: Entity,
        point: Vec3,
    },
    DryFired {
        point: Vec3,
    },
    FireModeSwitched(FireMode),
    InteractionStarted {
        duration: f32,
    },
}

/// Output of one tick.
#[derive(Clone, Debug, Default)]
pub struct TickOutput {
    pub intents: Vec<Intent>,
    pub events: Vec<WeaponEvent>,
    /// Shots (not pellets) fired this tick
    pub shots: u32,
}

impl WeaponFireState {
    /// Build the fire state for a freshly equipped weapon.
    ///
    /// The weapon must validate and its ammo profile must be registered.
    /// Failures here are fatal for the weapon; it never fires.
    pub fn activate(weapon: &Weapon, library: &AmmoLibrary) -> Result<Self, ConfigError> {
        weapon.validate()?;
        library.require(weapon.ammo)?;

        Ok(Self {
            current_rounds: weapon.rounds_per_magazine,
            fire_mode: weapon.fire_mode,
            fire_interval: weapon.fire_interval,
            secondary: weapon
                .secondary_fire_mode
                .map(|mode| (mode, weapon.secondary_fire_interval)),
            accuracy: weapon.hip_accuracy,
            next_fire_time: 0.0,
            next_reload_time: 0.0,
            next_switch_mode_time: 0.0,
            next_interact_time: 0.0,
            is_reloading: false,
            is_attacking: false,
            activity: Activity::Idle,
            burst: None,
            trigger_held: false,
            out_of_ammo: false,
        })
    }

    /// Replace the magazine contents, e.g. when restoring a weapon from the inventory.
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.current_rounds = rounds;
        self
    }

    /// Advance the weapon by one tick.
    ///
    /// # Arguments
    /// * `weapon` - Weapon configuration
    /// * `input` - Controls for this tick
    /// * `now` - Current time on the fixed clock (seconds)
    /// * `dt` - Tick length (seconds)
    /// * `ctx` - World query, ammo reserve, profile and random source
    pub fn tick<Q, A, R>(
        &mut self,
        weapon: &Weapon,
        input: &WeaponInput,
        now: f64,
        dt: f32,
        ctx: &mut FireContext<'_, Q, A, R>,
    ) -> TickOutput
    where
        Q: SurfaceQuery + ?Sized,
        A: AmmoReserve + ?Sized,
        R: Rng,
    {
        let mut out = TickOutput::default();

        self.advance_activity(weapon, input, now, ctx, &mut out);
        self.continue_burst(weapon, input, now, ctx, &mut out);
        self.handle_input(weapon, input, now, ctx, &mut out);

        let fired = out.shots > 0;
        let target = target_accuracy(weapon, input.aim, fired);
        self.accuracy = advance(self.accuracy, target, weapon, fired, dt);
        self.out_of_ammo = self.current_rounds == 0 && ctx.reserve.available(weapon.ammo) == 0;

        out
    }

    /// Rounds a magazine reload fills to, chamber round included.
    fn magazine_capacity(&self, weapon: &Weapon, tactical: bool) -> u32 {
        weapon.rounds_per_magazine + u32::from(weapon.has_chamber && tactical)
    }

    fn can_fire(&self, now: f64) -> bool {
        now >= self.next_fire_time
            && now >= self.next_reload_time
            && now >= self.next_switch_mode_time
            && now >= self.next_interact_time
            && !self.is_reloading
            && !self.is_attacking
            && self.burst.is_none()
            && self.activity == Activity::Idle
    }

    fn can_reload<A: AmmoReserve + ?Sized>(&self, weapon: &Weapon, reserve: &A, now: f64) -> bool {
        self.activity == Activity::Idle
            && self.burst.is_none()
            && !self.is_reloading
            && !self.is_attacking
            && now >= self.next_fire_time
            && now >= self.next_switch_mode_time
            && now >= self.next_interact_time
            && self.current_rounds < weapon.rounds_per_magazine
            && reserve.available(weapon.ammo) > 0
    }

    fn can_start_timed_action(&self, now: f64) -> bool {
        self.activity == Activity::Idle
            && self.burst.is_none()
            && !self.is_reloading
            && !self.is_attacking
            && now >= self.next_reload_time
            && now >= self.next_switch_mode_time
            && now >= self.next_interact_time
    }

    fn advance_activity<Q, A, R>(
        &mut self,
        weapon: &Weapon,
        input: &WeaponInput,
        now: f64,
        ctx: &mut FireContext<'_, Q, A, R>,
        out: &mut TickOutput,
    ) where
        Q: SurfaceQuery + ?Sized,
        A: AmmoReserve + ?Sized,
        R: Rng,
    {
        match self.activity {
            Activity::Idle => {}
            Activity::Reloading(_) => self.advance_reload(weapon, &mut *ctx.reserve, now, out),
            Activity::MeleeAttacking {
                impact_at,
                impact_applied,
                ends_at,
            } => {
                if !impact_applied && now >= impact_at {
                    self.melee_strike(weapon, input, ctx, out);
                    self.activity = Activity::MeleeAttacking {
                        impact_at,
                        impact_applied: true,
                        ends_at,
                    };
                }
                if now >= ends_at {
                    self.activity = Activity::Idle;
                    self.is_attacking = false;
                }
            }
            Activity::SwitchingFireMode { ends_at } | Activity::Interacting { ends_at } => {
                if now >= ends_at {
                    self.activity = Activity::Idle;
                }
            }
        }
    }

    /// Step through every reload phase whose deadline has passed.
    ///
    /// Phases chain from the previous deadline rather than from `now`, so
    /// tick length never stretches a reload.
    fn advance_reload<A: AmmoReserve + ?Sized>(
        &mut self,
        weapon: &Weapon,
        reserve: &mut A,
        now: f64,
        out: &mut TickOutput,
    ) {
        while let Activity::Reloading(phase) = self.activity {
            let ends_at = phase.ends_at();
            if now < ends_at {
                return;
            }

            let next = match phase {
                ReloadPhase::Magazine { tactical, .. } => {
                    let capacity = self.magazine_capacity(weapon, tactical);
                    let wanted = capacity.saturating_sub(self.current_rounds);
                    self.current_rounds += reserve.request(weapon.ammo, wanted);
                    None
                }
                ReloadPhase::Start { .. } => {
                    let chamber_empty = weapon.has_chamber && self.current_rounds == 0;
                    if chamber_empty && reserve.available(weapon.ammo) > 0 {
                        Some(ReloadPhase::InsertInChamber {
                            ends_at: ends_at + f64::from(weapon.insert_in_chamber_duration) * 0.5,
                            second_half: false,
                        })
                    } else {
                        Some(self.next_insert(weapon, reserve, ends_at))
                    }
                }
                ReloadPhase::InsertInChamber {
                    second_half: false, ..
                } => Some(ReloadPhase::InsertInChamber {
                    ends_at: ends_at + f64::from(weapon.insert_in_chamber_duration) * 0.5,
                    second_half: true,
                }),
                ReloadPhase::InsertInChamber {
                    second_half: true, ..
                }
                | ReloadPhase::Insert { .. } => {
                    self.current_rounds += reserve.request(weapon.ammo, 1);
                    Some(self.next_insert(weapon, reserve, ends_at))
                }
                ReloadPhase::Stop { .. } => None,
            };

            match next {
                Some(phase) => {
                    debug!("Reload phase {:?}, {} rounds", phase, self.current_rounds);
                    self.next_reload_time = phase.ends_at();
                    self.activity = Activity::Reloading(phase);
                }
                None => {
                    self.activity = Activity::Idle;
                    self.is_reloading = false;
                    self.next_reload_time = ends_at;
                    debug!("Reload complete with {} rounds", self.current_rounds);
                    out.events.push(WeaponEvent::ReloadCompleted {
                        rounds: self.current_rounds,
                    });
                }
            }
        }
    }

    /// Insert another round, or wind down when there is nothing left to do.
    fn next_insert<A: AmmoReserve + ?Sized>(&self, weapon: &Weapon, reserve: &A, from: f64) -> ReloadPhase {
        if self.current_rounds >= weapon.rounds_per_magazine
            || reserve.available(weapon.ammo) == 0
        {
            ReloadPhase::Stop {
                ends_at: from + f64::from(weapon.stop_reload_duration),
            }
        } else {
            ReloadPhase::Insert {
                ends_at: from + f64::from(weapon.insert_duration),
            }
        }
    }

    fn continue_burst<Q, A, R>(
        &mut self,
        weapon: &Weapon,
        input: &WeaponInput,
        now: f64,
        ctx: &mut FireContext<'_, Q, A, R>,
        out: &mut TickOutput,
    ) where
        Q: SurfaceQuery + ?Sized,
        A: AmmoReserve + ?Sized,
        R: Rng,
    {
        while let Some(burst) = self.burst {
            if now < burst.next_shot_at {
                return;
            }
            if self.current_rounds == 0 {
                debug!("Burst aborted, magazine empty");
                self.burst = None;
                return;
            }
            self.discharge(weapon, input, ctx, out);
            let remaining = burst.remaining - 1;
            self.burst = (remaining > 0).then_some(BurstState {
                remaining,
                next_shot_at: burst.next_shot_at + f64::from(self.fire_interval),
            });
        }
    }

    fn handle_input<Q, A, R>(
        &mut self,
        weapon: &Weapon,
        input: &WeaponInput,
        now: f64,
        ctx: &mut FireContext<'_, Q, A, R>,
        out: &mut TickOutput,
    ) where
        Q: SurfaceQuery + ?Sized,
        A: AmmoReserve + ?Sized,
        R: Rng,
    {
        let pressed = input.fire && !self.trigger_held;
        let continuing = input.fire && self.trigger_held;
        self.trigger_held = input.fire;

        // A fresh trigger press during the insert loop winds the reload down
        if pressed {
            if let Activity::Reloading(ReloadPhase::Insert { .. }) = self.activity {
                let stop = ReloadPhase::Stop {
                    ends_at: now + f64::from(weapon.stop_reload_duration),
                };
                debug!("Reload interrupted by trigger");
                self.next_reload_time = stop.ends_at();
                self.activity = Activity::Reloading(stop);
            }
        }

        if input.melee && self.can_start_timed_action(now) {
            let impact_at = now + f64::from(weapon.melee_impact_delay);
            let ends_at = now + f64::from(weapon.melee_duration);
            self.is_attacking = true;
            self.activity = Activity::MeleeAttacking {
                impact_at,
                impact_applied: false,
                ends_at,
            };
            // Zero wind-up lands on the same tick
            self.advance_activity(weapon, input, now, ctx, out);
        }

        if input.reload && self.can_reload(weapon, &*ctx.reserve, now) {
            self.start_reload(weapon, now, out);
        }

        if input.switch_fire_mode && self.secondary.is_some() && self.can_start_timed_action(now) && now >= self.next_fire_time {
            if let Some((mode, interval)) = self.secondary.replace((self.fire_mode, self.fire_interval)) {
                self.fire_mode = mode;
                self.fire_interval = interval;
            }
            let ends_at = now + f64::from(weapon.switch_mode_duration);
            self.next_switch_mode_time = ends_at;
            self.activity = Activity::SwitchingFireMode { ends_at };
            debug!("Fire mode switched to {:?}", self.fire_mode);
            out.events.push(WeaponEvent::FireModeSwitched(self.fire_mode));
        }

        if input.interact && self.can_start_timed_action(now) {
            let duration = weapon.interact_duration();
            let ends_at = now + f64::from(duration);
            self.next_interact_time = ends_at;
            self.activity = Activity::Interacting { ends_at };
            out.events.push(WeaponEvent::InteractionStarted { duration });
        }

        let wants_fire = if self.fire_mode.is_automatic() {
            input.fire
        } else {
            pressed
        };
        if !wants_fire || !self.can_fire(now) {
            return;
        }

        if self.current_rounds == 0 {
            if weapon.auto_reload && self.can_reload(weapon, &*ctx.reserve, now) {
                self.start_reload(weapon, now, out);
            } else {
                self.dry_fire(weapon, input, now, ctx.config, out);
            }
            return;
        }

        let interval = f64::from(self.fire_interval);
        self.discharge(weapon, input, ctx, out);
        match self.fire_mode {
            FireMode::Burst => {
                let shots = weapon.bullets_per_burst;
                self.next_fire_time = now + interval * f64::from(shots + 1);
                self.burst = (shots > 1).then_some(BurstState {
                    remaining: shots - 1,
                    next_shot_at: now + interval,
                });
            }
            FireMode::FullAuto | FireMode::ShotgunAuto => {
                // Keep the cadence while the trigger stays down
                let on_schedule = continuing && now - self.next_fire_time < interval;
                let base = if on_schedule { self.next_fire_time } else { now };
                self.next_fire_time = base + interval;
            }
            FireMode::Single | FireMode::ShotgunSingle => {
                self.next_fire_time = now + interval;
            }
        }
    }

    fn start_reload(&mut self, weapon: &Weapon, now: f64, out: &mut TickOutput) {
        let tactical = self.current_rounds > 0;
        let phase = match weapon.reload_mode {
            ReloadMode::Magazines => {
                let duration = if tactical {
                    weapon.reload_duration
                } else {
                    weapon.full_reload_duration
                };
                ReloadPhase::Magazine {
                    ends_at: now + f64::from(duration),
                    tactical,
                }
            }
            ReloadMode::BulletByBullet => ReloadPhase::Start {
                ends_at: now + f64::from(weapon.start_reload_duration),
            },
        };
        debug!("Reload started ({:?}), tactical: {}", weapon.reload_mode, tactical);
        self.is_reloading = true;
        self.next_reload_time = phase.ends_at();
        self.activity = Activity::Reloading(phase);
        out.events.push(WeaponEvent::ReloadStarted { tactical });
    }

    fn dry_fire(
        &mut self,
        weapon: &Weapon,
        input: &WeaponInput,
        now: f64,
        config: &BallisticsConfig,
        out: &mut TickOutput,
    ) {
        self.next_fire_time = now + f64::from(weapon.dry_fire_cooldown);
        out.intents.push(Intent::Audio(AudioIntent {
            cue: AudioCue::DryFire,
            point: input.aim_origin,
            min_distance: config.impact_audio_min_distance,
            max_distance: config.impact_audio_max_distance,
            volume: config.impact_audio_volume,
        }));
        out.events.push(WeaponEvent::DryFired {
            point: input.aim_origin,
        });
    }

    /// Fire one round: a single bullet or a full load of pellets.
    fn discharge<Q, A, R>(
        &mut self,
        weapon: &Weapon,
        input: &WeaponInput,
        ctx: &mut FireContext<'_, Q, A, R>,
        out: &mut TickOutput,
    ) where
        Q: SurfaceQuery + ?Sized,
        A: AmmoReserve + ?Sized,
        R: Rng,
    {
        let pellets = if self.fire_mode.is_shotgun() {
            weapon.bullets_per_shoot
        } else {
            1
        };
        let aim = input.aim_direction.normalize_or(Vec3::NEG_Z);

        for _ in 0..pellets {
            let direction = spread_direction(aim, self.accuracy, weapon.max_spread_degrees, &mut *ctx.rng);
            let shot = ShotRequest {
                origin: input.aim_origin,
                direction,
                max_range: weapon.max_range,
                layer_mask: weapon.layer_mask,
                shooter: ctx.shooter,
            };
            out.intents
                .extend(resolve_shot(ctx.query, ctx.profile, ctx.config, &shot, &mut *ctx.rng));
        }

        self.current_rounds = self.current_rounds.saturating_sub(1);
        out.shots += 1;
        out.events.push(WeaponEvent::ShotFired {
            origin: input.aim_origin,
            direction: aim,
            pellets,
            rounds_left: self.current_rounds,
        });
    }

    fn melee_strike<Q, A, R>(
        &mut self,
        weapon: &Weapon,
        input: &WeaponInput,
        ctx: &mut FireContext<'_, Q, A, R>,
        out: &mut TickOutput,
    ) where
        Q: SurfaceQuery + ?Sized,
        A: AmmoReserve + ?Sized,
        R: Rng,
    {
        let direction = input.aim_direction.normalize_or(Vec3::NEG_Z);
        let Some(hit) = ctx
            .query
            .cast(input.aim_origin, direction, weapon.melee_range, weapon.layer_mask)
        else {
            return;
        };
        if hit.root == ctx.shooter {
            return;
        }

        out.intents.push(Intent::Damage(DamageIntent {
            target: hit.root,
            source: ctx.shooter,
            damage: weapon.melee_damage,
            origin: input.aim_origin,
            point: hit.point,
            penetration_power: 0.0,
        }));
        if let Some(body) = hit.rigid_body {
            out.intents.push(Intent::Force(ForceIntent {
                body,
                point: hit.point,
                direction,
                magnitude: weapon.melee_force,
            }));
        }
        out.intents.push(Intent::Audio(AudioIntent {
            cue: AudioCue::MeleeImpact(hit.surface_type),
            point: hit.point,
            min_distance: ctx.config.impact_audio_min_distance,
            max_distance: ctx.config.impact_audio_max_distance,
            volume: ctx.config.impact_audio_volume,
        }));
        out.events.push(WeaponEvent::MeleeHit {
            target: hit.root,
            point: hit.point,
        });
    }
}

/// Attach fire state to weapons as they are spawned.
///
/// A weapon whose configuration fails validation, or whose ammo is not in
/// the [`AmmoLibrary`], is logged and left without fire state.
pub fn equip_weapons(
    mut commands: Commands,
    library: Res<AmmoLibrary>,
    weapons: Query<(Entity, &Weapon), Added<Weapon>>,
    inventories: Query<(), With<AmmoInventory>>,
) {
    for (entity, weapon) in &weapons {
        match WeaponFireState::activate(weapon, &library) {
            Ok(state) => {
                info!(
                    "Equipped '{}' on {:?} ({} rounds, {:?})",
                    weapon.name, entity, weapon.rounds_per_magazine, weapon.fire_mode
                );
                let shooter = weapon.owner.unwrap_or(entity);
                if !inventories.contains(shooter) {
                    warn!(
                        "'{}' has no ammo inventory on {:?}; it will not reload",
                        weapon.name, shooter
                    );
                }
                commands
                    .entity(entity)
                    .insert(state)
                    .insert_if_new(WeaponInput::default());
            }
            Err(err) => {
                error!("Weapon '{}' on {:?} disabled: {}", weapon.name, entity, err);
            }
        }
    }
}

/// Drop fire state from entities that lost their weapon.
pub fn unequip_weapons(mut commands: Commands, mut removed: RemovedComponents<Weapon>) {
    for entity in removed.read() {
        if let Ok(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.try_remove::<WeaponFireState>();
        }
    }
}

/// Tick every equipped weapon on the fixed clock.
///
/// Ammo is drawn from the [`AmmoInventory`] on the weapon's owner, or on the
/// weapon itself when it has no owner. A weapon with no inventory anywhere
/// can empty its magazine but never reloads.
///
/// # Arguments
/// * `time` - Fixed timestep clock
/// * `surfaces` - Physics-backed ray queries
/// * `weapons` - Equipped weapons with their state and input
/// * `inventories` - Ammo reserves
/// * `intents` - Writers for resolved shot effects
/// * `weapon_events` - Writers for weapon lifecycle messages
#[cfg(feature = "dim3")]
#[allow(clippy::too_many_arguments)]
pub fn update_fire_control(
    time: Res<Time<Fixed>>,
    config: Res<BallisticsConfig>,
    library: Res<AmmoLibrary>,
    mut rng: ResMut<BallisticsRng>,
    surfaces: PhysicsSurfaceQuery,
    mut weapons: Query<(Entity, &Weapon, &mut WeaponFireState, &mut WeaponInput)>,
    mut inventories: Query<&mut AmmoInventory>,
    mut intents: IntentWriters,
    mut weapon_events: WeaponEventWriters,
) {
    let now = time.elapsed_secs_f64();
    let dt = time.delta_secs();

    for (entity, weapon, mut state, mut input) in &mut weapons {
        let Some(profile) = library.get(weapon.ammo) else {
            continue;
        };
        let shooter = weapon.owner.unwrap_or(entity);

        let mut no_reserve = AmmoInventory::new();
        let reserve = match inventories.get_mut(shooter) {
            Ok(inventory) => inventory.into_inner(),
            Err(_) => &mut no_reserve,
        };

        let mut ctx = FireContext {
            query: &surfaces,
            reserve,
            profile,
            config: &*config,
            rng: &mut rng.0,
            shooter,
        };
        let output = state.tick(weapon, &input, now, dt, &mut ctx);
        input.clear_requests();

        if output.shots > 0 {
            debug!(
                "'{}' fired {} shot(s), {} rounds left",
                weapon.name,
                output.shots,
                state.current_rounds()
            );
        }
        intents.dispatch(output.intents);
        weapon_events.dispatch(entity, shooter, output.events);
    }
}
