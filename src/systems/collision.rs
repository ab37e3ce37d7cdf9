//! Physics adapter - ray queries and impulses through avian3d.

use bevy::ecs::message::MessageReader;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use avian3d::prelude::{ColliderOf, LinearVelocity, RigidBody, SpatialQuery, SpatialQueryFilter};

use crate::components::{ImpactResponse, SurfaceMaterial};
use crate::events::ImpulseEvent;
use crate::types::{LayerMask, SurfaceHit, SurfaceQuery};

/// Upper bound on nested colliders a ray may start inside of.
pub const MAX_INTERIOR_SKIPS: usize = 8;

/// Hits closer than this to the ray origin belong to a collider the ray
/// started inside of and are skipped.
const INTERIOR_HIT_DISTANCE: f32 = 1.0e-5;

/// [`SurfaceQuery`] over the avian3d spatial query pipeline.
///
/// Materials are read from the hit collider, then from its rigid body. The
/// body doubles as the hit root; colliders without a body are their own root.
/// A rigid body is only reported when it is dynamic.
#[derive(SystemParam)]
pub struct PhysicsSurfaceQuery<'w, 's> {
    spatial: SpatialQuery<'w, 's>,
    materials: Query<'w, 's, &'static SurfaceMaterial>,
    colliders: Query<'w, 's, &'static ColliderOf>,
    bodies: Query<'w, 's, &'static RigidBody>,
}

impl SurfaceQuery for PhysicsSurfaceQuery<'_, '_> {
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layer_mask: LayerMask,
    ) -> Option<SurfaceHit> {
        let direction = Dir3::new(direction).ok()?;

        // Solid casts report a collider containing the origin at distance zero;
        // exclude it and cast again
        let mut excluded = Vec::new();
        let hit = loop {
            let filter = SpatialQueryFilter::from_mask(layer_mask.0)
                .with_excluded_entities(excluded.iter().copied());
            let hit = self
                .spatial
                .cast_ray(origin, direction, max_distance, true, &filter)?;
            if hit.distance > INTERIOR_HIT_DISTANCE {
                break hit;
            }
            if excluded.len() >= MAX_INTERIOR_SKIPS {
                return None;
            }
            excluded.push(hit.entity);
        };

        let root = self
            .colliders
            .get(hit.entity)
            .map_or(hit.entity, |collider_of| collider_of.body);
        let material = self
            .materials
            .get(hit.entity)
            .or_else(|_| self.materials.get(root))
            .cloned()
            .unwrap_or_default();
        let rigid_body = self
            .bodies
            .get(root)
            .ok()
            .filter(|body| body.is_dynamic())
            .map(|_| root);

        Some(SurfaceHit {
            point: origin + *direction * hit.distance,
            normal: hit.normal,
            distance: hit.distance,
            density: material.density.max(f32::EPSILON),
            penetrable: material.penetrable,
            decal_eligible: material.decal_eligible,
            surface_type: material.surface_type,
            collider: hit.entity,
            root,
            rigid_body,
        })
    }
}

/// Push bodies hit by bullets and melee strikes.
///
/// The impulse is divided by the body's [`ImpactResponse::mass`] and added to
/// its linear velocity. Bodies without an `ImpactResponse` are left alone.
///
/// # Arguments
/// * `impulses` - Message reader for impulse events
/// * `bodies` - Query for bodies that respond to impacts
pub fn apply_impact_impulses(
    mut impulses: MessageReader<ImpulseEvent>,
    mut bodies: Query<(&ImpactResponse, &mut LinearVelocity)>,
) {
    for ImpulseEvent(force) in impulses.read() {
        let Ok((response, mut velocity)) = bodies.get_mut(force.body) else {
            continue;
        };
        let mass = if response.mass > 0.0 { response.mass } else { 1.0 };
        velocity.0 += force.direction * (force.magnitude / mass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use avian3d::prelude::{Collider, PhysicsPlugins};
    use bevy::ecs::message::Messages;
    use bevy::ecs::system::RunSystemOnce;
    use bevy::time::TimeUpdateStrategy;

    use crate::systems::surface::materials;
    use crate::types::{ForceIntent, SurfaceType};

    /// Headless physics app with `count` walls 0.2m thick, centered at
    /// `z = -5, -7, -9, ...`.
    fn wall_app(count: usize) -> (App, Vec<Entity>) {
        let mut app = App::new();
        app.add_plugins((
            MinimalPlugins,
            TransformPlugin,
            bevy::asset::AssetPlugin::default(),
            bevy::mesh::MeshPlugin,
            bevy::scene::ScenePlugin,
            PhysicsPlugins::default(),
        ))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )));

        // Spawn back to front so spawn order never matches distance order
        let walls: Vec<Entity> = (0..count)
            .rev()
            .map(|i| {
                let material = if i == 0 {
                    materials::metal()
                } else {
                    materials::wood()
                };
                app.world_mut()
                    .spawn((
                        RigidBody::Static,
                        Collider::cuboid(100.0, 100.0, 0.2),
                        Transform::from_xyz(0.0, 0.0, -5.0 - 2.0 * i as f32),
                        material,
                    ))
                    .id()
            })
            .collect();

        app.finish();
        app.cleanup();
        for _ in 0..4 {
            app.update();
        }
        (app, walls)
    }

    fn cast(app: &mut App, origin: Vec3) -> Option<SurfaceHit> {
        app.world_mut()
            .run_system_once(move |surfaces: PhysicsSurfaceQuery| {
                surfaces.cast(origin, Vec3::NEG_Z, 500.0, LayerMask::ALL)
            })
            .ok()
            .flatten()
    }

    #[test]
    fn test_nearest_of_many_walls_is_reported() {
        let (mut app, walls) = wall_app(24);
        let nearest = walls[walls.len() - 1];

        let hit = cast(&mut app, Vec3::ZERO).expect("wall ahead");
        assert!((hit.distance - 4.9).abs() < 1e-3);
        assert_eq!(hit.collider, nearest);
        assert_eq!(hit.root, nearest);
        assert_eq!(hit.surface_type, SurfaceType::Metal);
        assert_eq!(hit.rigid_body, None);
    }

    #[test]
    fn test_ray_starting_inside_skips_its_own_collider() {
        let (mut app, walls) = wall_app(24);
        let second = walls[walls.len() - 2];

        let hit = cast(&mut app, Vec3::new(0.0, 0.0, -5.0)).expect("next wall");
        assert!((hit.distance - 1.9).abs() < 1e-3);
        assert_eq!(hit.collider, second);
        assert_eq!(hit.surface_type, SurfaceType::Wood);
    }

    #[test]
    fn test_impulse_scales_with_mass() {
        let mut app = App::new();
        app.add_message::<ImpulseEvent>();
        app.add_systems(Update, apply_impact_impulses);

        let light = app
            .world_mut()
            .spawn((ImpactResponse { mass: 1.0 }, LinearVelocity::default()))
            .id();
        let heavy = app
            .world_mut()
            .spawn((ImpactResponse { mass: 4.0 }, LinearVelocity::default()))
            .id();
        let inert = app.world_mut().spawn(LinearVelocity::default()).id();

        for body in [light, heavy, inert] {
            app.world_mut()
                .resource_mut::<Messages<ImpulseEvent>>()
                .write(ImpulseEvent(ForceIntent {
                    body,
                    point: Vec3::ZERO,
                    direction: Vec3::X,
                    magnitude: 8.0,
                }));
        }
        app.update();

        let velocity = |entity| app.world().get::<LinearVelocity>(entity).map(|v| v.0);
        assert_eq!(velocity(light), Some(Vec3::new(8.0, 0.0, 0.0)));
        assert_eq!(velocity(heavy), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(velocity(inert), Some(Vec3::ZERO));
    }
}
