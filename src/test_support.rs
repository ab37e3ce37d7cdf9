//! Deterministic surface world for unit tests.

use bevy::prelude::*;

use crate::components::SurfaceMaterial;
use crate::types::{LayerMask, SurfaceHit, SurfaceQuery};

/// Axis-aligned solid box.
#[derive(Clone, Debug)]
pub struct Slab {
    pub min: Vec3,
    pub max: Vec3,
    pub material: SurfaceMaterial,
    pub collider: Entity,
    pub root: Entity,
    pub rigid_body: Option<Entity>,
    pub layers: u32,
}

/// A world made of boxes.
///
/// Rays that start inside a box do not report that box, and rays that start
/// on a box face while moving away from it do not report it either.
pub struct SlabWorld {
    ids: World,
    pub slabs: Vec<Slab>,
}

impl Default for SlabWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SlabWorld {
    pub fn new() -> Self {
        Self {
            ids: World::new(),
            slabs: Vec::new(),
        }
    }

    /// Allocate a fresh entity id, e.g. for a shooter.
    pub fn entity(&mut self) -> Entity {
        self.ids.spawn_empty().id()
    }

    /// Add a box that is its own root. Returns the root.
    pub fn add(&mut self, min: Vec3, max: Vec3, material: SurfaceMaterial) -> Entity {
        let root = self.entity();
        self.add_part(root, min, max, material, None)
    }

    /// Add a box owned by `root`, optionally backed by a dynamic body.
    pub fn add_part(
        &mut self,
        root: Entity,
        min: Vec3,
        max: Vec3,
        material: SurfaceMaterial,
        rigid_body: Option<Entity>,
    ) -> Entity {
        let collider = self.entity();
        self.slabs.push(Slab {
            min,
            max,
            material,
            collider,
            root,
            rigid_body,
            layers: 1,
        });
        root
    }

    /// Wall spanning X and Y, with its near face at `z = -near` and
    /// `thickness` meters deep along -Z.
    pub fn wall(&mut self, near: f32, thickness: f32, material: SurfaceMaterial) -> Entity {
        self.add(
            Vec3::new(-50.0, -50.0, -near - thickness),
            Vec3::new(50.0, 50.0, -near),
            material,
        )
    }

    fn intersect(slab: &Slab, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (slab.min[axis], slab.max[axis]);
            if d.abs() < 1e-9 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let (mut t0, mut t1) = ((lo - o) / d, (hi - o) / d);
            let mut face = Vec3::ZERO;
            face[axis] = -d.signum();
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_enter {
                t_enter = t0;
                normal = face;
            }
            t_exit = t_exit.min(t1);
        }

        (t_enter > 1e-6 && t_enter <= t_exit).then_some((t_enter, normal))
    }
}

impl SurfaceQuery for SlabWorld {
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layer_mask: LayerMask,
    ) -> Option<SurfaceHit> {
        self.slabs
            .iter()
            .filter(|slab| layer_mask.contains(slab.layers))
            .filter_map(|slab| {
                let (t, normal) = Self::intersect(slab, origin, direction)?;
                (t <= max_distance).then_some((t, normal, slab))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, normal, slab)| SurfaceHit {
                point: origin + direction * t,
                normal,
                distance: t,
                density: slab.material.density,
                penetrable: slab.material.penetrable,
                decal_eligible: slab.material.decal_eligible,
                surface_type: slab.material.surface_type,
                collider: slab.collider,
                root: slab.root,
                rigid_body: slab.rigid_body,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_world_reports_nearest_face_and_skips_interior_starts() {
        let mut world = SlabWorld::new();
        world.wall(5.0, 0.5, SurfaceMaterial::default());
        world.wall(10.0, 1.0, SurfaceMaterial::default());

        let hit = world
            .cast(Vec3::ZERO, Vec3::NEG_Z, 100.0, LayerMask::ALL)
            .expect("wall ahead");
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::Z);

        // From inside the first wall the second one is next
        let inner = world
            .cast(Vec3::new(0.0, 0.0, -5.2), Vec3::NEG_Z, 100.0, LayerMask::ALL)
            .expect("second wall");
        assert!((inner.point.z + 10.0).abs() < 1e-5);

        // Looking back from between the walls finds the first wall's far face
        let back = world
            .cast(Vec3::new(0.0, 0.0, -7.0), Vec3::Z, 100.0, LayerMask::ALL)
            .expect("back face");
        assert!((back.point.z + 5.5).abs() < 1e-5);
        assert_eq!(back.normal, Vec3::NEG_Z);

        assert!(world.cast(Vec3::ZERO, Vec3::NEG_Z, 4.0, LayerMask::ALL).is_none());
        assert!(world.cast(Vec3::ZERO, Vec3::NEG_Z, 100.0, LayerMask::NONE).is_none());
    }
}
