//! Shot resolution - penetration chains, ricochets and fragmentation.
//!
//! A shot is an instantaneous ray. Every branch spends a budget (range,
//! penetration power or damage) that strictly shrinks, and the branch
//! probabilities are drawn once per impact, so resolution always terminates.
//! The engine only talks to the world through [`SurfaceQuery`] and reports
//! everything it wants done as a list of [`Intent`]s.

use bevy::prelude::*;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use crate::ammo::{AmmoProfile, MAX_FRAGMENTS};
use crate::resources::BallisticsConfig;
use crate::systems::surface::{ricochet_angle_allowed, ricochet_direction, scatter};
use crate::types::{
    AudioCue, AudioIntent, BranchIntent, DamageIntent, DamageMode, DecalIntent, ForceIntent,
    Intent, LayerMask, PenetrationIntent, SurfaceHit, SurfaceQuery, TracerIntent,
};

/// Share of the parent's range, power and damage a ricochet or fragment keeps.
pub const RESIDUAL_FRACTION: [f32; 2] = [0.01, 0.25];

/// Hard cap on objects crossed by one penetration chain.
pub const MAX_PENETRATION_STEPS: usize = 32;

/// One trigger resolution for a single pellet.
#[derive(Clone, Debug, PartialEq)]
pub struct ShotRequest {
    pub origin: Vec3,
    /// Normalized shot direction, spread already applied
    pub direction: Vec3,
    pub max_range: f32,
    pub layer_mask: LayerMask,
    /// Root entity of the shooter, never damaged by its own shot
    pub shooter: Entity,
}

/// Budgets carried by a ray segment.
#[derive(Clone, Copy, Debug)]
struct Bullet {
    direction: Vec3,
    /// Range left from the current point
    range: f32,
    power: f32,
    damage: f32,
    /// Path length from the muzzle, used for impact force
    travelled: f32,
}

struct Resolver<'a, Q: ?Sized, R> {
    query: &'a Q,
    profile: &'a AmmoProfile,
    config: &'a BallisticsConfig,
    origin: Vec3,
    shooter: Entity,
    layer_mask: LayerMask,
    rng: &'a mut R,
    intents: Vec<Intent>,
}

/// Resolve one shot against the world.
///
/// # Arguments
/// * `query` - Spatial query into the world
/// * `profile` - Cartridge being fired
/// * `config` - Tracer, audio and branching settings
/// * `shot` - Origin, direction, range and shooter of the shot
/// * `rng` - Random source for damage and branch draws
///
/// # Returns
/// Every damage, decal, audio, force, tracer and branch intent the shot produced,
/// in the order they happened.
///
/// # Example
/// ```
/// use bevy::prelude::*;
/// use bevy_fire_control::ammo::AmmoProfile;
/// use bevy_fire_control::resources::BallisticsConfig;
/// use bevy_fire_control::systems::ballistics::{resolve_shot, ShotRequest};
/// use bevy_fire_control::types::{LayerMask, SurfaceHit, SurfaceQuery, Intent};
/// use rand::SeedableRng;
///
/// struct Empty;
/// impl SurfaceQuery for Empty {
///     fn cast(&self, _: Vec3, _: Vec3, _: f32, _: LayerMask) -> Option<SurfaceHit> {
///         None
///     }
/// }
///
/// let shot = ShotRequest {
///     origin: Vec3::ZERO,
///     direction: Vec3::NEG_Z,
///     max_range: 100.0,
///     layer_mask: LayerMask::ALL,
///     shooter: Entity::PLACEHOLDER,
/// };
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let intents = resolve_shot(&Empty, &AmmoProfile::default(), &BallisticsConfig::default(), &shot, &mut rng);
/// assert!(matches!(intents.as_slice(), [Intent::Tracer(_)]));
/// ```
pub fn resolve_shot<Q, R>(
    query: &Q,
    profile: &AmmoProfile,
    config: &BallisticsConfig,
    shot: &ShotRequest,
    rng: &mut R,
) -> Vec<Intent>
where
    Q: SurfaceQuery + ?Sized,
    R: Rng,
{
    let direction = shot.direction.normalize_or(Vec3::NEG_Z);
    let mut resolver = Resolver {
        query,
        profile,
        config,
        origin: shot.origin,
        shooter: shot.shooter,
        layer_mask: shot.layer_mask,
        rng,
        intents: Vec::new(),
    };

    let [min, max] = profile.damage_range;
    let base_damage = if max > min {
        resolver.rng.random_range(min..=max)
    } else {
        min
    };

    let hit = query.cast(shot.origin, direction, shot.max_range, shot.layer_mask);
    resolver.tracer(direction, hit.as_ref().map(|hit| hit.distance));

    if let Some(hit) = hit {
        let damage = match profile.damage_mode {
            DamageMode::ConstantPerShot => base_damage,
            DamageMode::DistanceFalloff => {
                let fraction = hit.distance / shot.max_range.max(config.surface_epsilon);
                base_damage * profile.damage_falloff.evaluate(fraction)
            }
        };
        let bullet = Bullet {
            direction,
            range: shot.max_range - hit.distance,
            power: profile.penetration_power,
            damage,
            travelled: hit.distance,
        };
        resolver.impact(&hit, bullet, 0);
    }

    debug!(
        "Resolved shot of {} from {:?}: {} intents",
        profile.name,
        shot.origin,
        resolver.intents.len()
    );
    resolver.intents
}

impl<Q, R> Resolver<'_, Q, R>
where
    Q: SurfaceQuery + ?Sized,
    R: Rng,
{
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<SurfaceHit> {
        if max_distance <= 0.0 {
            return None;
        }
        self.query
            .cast(origin, direction, max_distance, self.layer_mask)
    }

    fn chance(&mut self, probability: f32) -> bool {
        Bernoulli::new(probability as f64)
            .map(|draw| draw.sample(&mut *self.rng))
            .unwrap_or(false)
    }

    fn residual(&mut self) -> f32 {
        let [low, high] = RESIDUAL_FRACTION;
        self.rng.random_range(low..=high)
    }

    fn tracer(&mut self, direction: Vec3, hit_distance: Option<f32>) {
        let duration = match hit_distance {
            Some(distance) => {
                (distance / self.config.tracer_speed.max(self.config.surface_epsilon))
                    .min(self.config.tracer_duration)
            }
            None => self.config.tracer_duration,
        };
        if duration > self.config.min_tracer_duration {
            self.intents.push(Intent::Tracer(TracerIntent {
                origin: self.origin,
                direction,
                duration,
            }));
        }
    }

    /// Decal and impact sound for a surface the bullet enters.
    fn surface_effects(&mut self, hit: &SurfaceHit) {
        if hit.decal_eligible {
            self.intents.push(Intent::Decal(DecalIntent {
                surface_type: hit.surface_type,
                point: hit.point,
                normal: hit.normal,
            }));
        }
        self.intents.push(Intent::Audio(AudioIntent {
            cue: AudioCue::Impact(hit.surface_type),
            point: hit.point,
            min_distance: self.config.impact_audio_min_distance,
            max_distance: self.config.impact_audio_max_distance,
            volume: self.config.impact_audio_volume,
        }));
    }

    /// Damage and impulse at the hit point.
    fn strike(&mut self, hit: &SurfaceHit, bullet: &Bullet) {
        if hit.root != self.shooter {
            self.intents.push(Intent::Damage(DamageIntent {
                target: hit.root,
                source: self.shooter,
                damage: bullet.damage,
                origin: self.origin,
                point: hit.point,
                penetration_power: bullet.power,
            }));
        }
        if let Some(body) = hit.rigid_body {
            self.intents.push(Intent::Force(ForceIntent {
                body,
                point: hit.point,
                direction: bullet.direction,
                magnitude: self.profile.impact_force(bullet.travelled),
            }));
        }
    }

    fn impact(&mut self, hit: &SurfaceHit, bullet: Bullet, depth: u32) {
        self.surface_effects(hit);
        self.strike(hit, &bullet);

        let profile = self.profile;
        let can_penetrate = profile.can_penetrate && bullet.power > 0.0 && hit.penetrable;

        if depth < self.config.max_branch_depth {
            let can_ricochet = profile.ricochet_enabled
                && (!can_penetrate || hit.density >= profile.ricochet_density_threshold)
                && self.chance(profile.ricochet_chance);
            if can_ricochet
                && ricochet_angle_allowed(bullet.direction, hit.normal, profile.max_incident_angle_deg)
            {
                self.ricochet(hit, bullet, depth);
                return;
            }

            let can_fragment = profile.fragmentation_enabled
                && can_penetrate
                && hit.density >= profile.fragmentation_density_threshold
                && self.chance(profile.fragmentation_chance);
            if can_fragment {
                self.fragment(hit, bullet);
                return;
            }
        }

        if can_penetrate {
            self.penetrate(hit, bullet);
        }
    }

    fn ricochet(&mut self, hit: &SurfaceHit, bullet: Bullet, depth: u32) {
        let direction = ricochet_direction(
            bullet.direction,
            hit.normal,
            self.profile.trajectory_deflection,
            &mut *self.rng,
        );
        // One draw scales range, power and damage alike
        let u = self.residual();
        let branch = BranchIntent {
            point: hit.point,
            direction,
            range: bullet.range * u,
            penetration_power: bullet.power * u,
            damage: bullet.damage * u,
        };
        self.intents.push(Intent::Ricochet(branch.clone()));
        self.intents.push(Intent::Audio(AudioIntent {
            cue: AudioCue::Ricochet,
            point: hit.point,
            min_distance: self.config.impact_audio_min_distance,
            max_distance: self.config.impact_audio_max_distance,
            volume: self.config.ricochet_audio_volume,
        }));

        let origin = branch.point + direction * self.config.surface_epsilon;
        if let Some(next) = self.cast(origin, direction, branch.range) {
            let child = Bullet {
                direction,
                range: branch.range - next.distance,
                power: branch.penetration_power,
                damage: branch.damage,
                travelled: bullet.travelled + next.distance,
            };
            self.impact(&next, child, depth + 1);
        }
    }

    fn fragment(&mut self, hit: &SurfaceHit, bullet: Bullet) {
        let max = self.profile.max_fragments.clamp(1, MAX_FRAGMENTS);
        let count = self.rng.random_range(1..=max);
        let multiplier = self.profile.fragmentation_damage_multiplier;

        for _ in 0..count {
            let u = self.residual();
            let direction = scatter(bullet.direction, self.profile.fragment_scattering, 1.0, &mut *self.rng);
            let fragment = Bullet {
                direction,
                range: bullet.range * u,
                power: bullet.power * u,
                damage: bullet.damage * u * multiplier,
                travelled: bullet.travelled,
            };
            self.intents.push(Intent::Fragment(BranchIntent {
                point: hit.point,
                direction,
                range: fragment.range,
                penetration_power: fragment.power,
                damage: fragment.damage,
            }));
            if fragment.power > 0.0 {
                self.penetrate(hit, fragment);
            }
        }
    }

    /// Push through `entry` and whatever penetrable surfaces follow it.
    fn penetrate(&mut self, entry: &SurfaceHit, mut bullet: Bullet) {
        let epsilon = self.config.surface_epsilon;
        let full_power = self.profile.penetration_power.max(epsilon);
        let mut current = entry.clone();

        for _ in 0..MAX_PENETRATION_STEPS {
            if bullet.power <= 0.0 || bullet.range <= 0.0 || !current.penetrable {
                return;
            }
            let direction = bullet.direction;

            // Look ahead as far as the budget could carry us through this material
            let reach = (bullet.power / current.density.max(epsilon)).min(bullet.range);
            let ahead = self.cast(current.point + direction * epsilon, direction, reach);
            let probe = match &ahead {
                Some(next) => next.point - direction * epsilon,
                None => current.point + direction * (reach + epsilon),
            };

            // Looking back from the probe finds the far face, unless we are still inside
            let Some(exit) = self.cast(probe, -direction, probe.distance(current.point)) else {
                return;
            };
            let thickness = current.point.distance(exit.point);
            let travelled = thickness * exit.density;
            if bullet.power <= travelled {
                return;
            }

            bullet.power -= travelled;
            bullet.range -= thickness;
            bullet.travelled += thickness;
            bullet.damage *= travelled / full_power;

            if exit.decal_eligible {
                self.intents.push(Intent::Decal(DecalIntent {
                    surface_type: exit.surface_type,
                    point: exit.point,
                    normal: exit.normal,
                }));
            }
            self.intents.push(Intent::Penetration(PenetrationIntent {
                entry_point: current.point,
                exit_point: exit.point,
                target: exit.root,
                distance_traveled: travelled,
                remaining_power: bullet.power,
            }));
            self.strike(&exit, &bullet);

            let scale = exit.density * self.profile.density_influence;
            bullet.direction = scatter(direction, self.profile.refraction_range, scale, &mut *self.rng);

            let Some(next) = self.cast(exit.point + bullet.direction * epsilon, bullet.direction, bullet.range) else {
                return;
            };
            bullet.range -= next.distance;
            bullet.travelled += next.distance;
            self.surface_effects(&next);
            self.strike(&next, &bullet);
            current = next;
        }
    }
}
