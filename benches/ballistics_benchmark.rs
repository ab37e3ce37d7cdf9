//! Benchmark for shot resolution and spread sampling.

use bevy::prelude::*;
use bevy_fire_control::ammo::presets;
use bevy_fire_control::components::SurfaceMaterial;
use bevy_fire_control::resources::BallisticsConfig;
use bevy_fire_control::systems::accuracy::spread_direction;
use bevy_fire_control::systems::ballistics::{resolve_shot, ShotRequest};
use bevy_fire_control::systems::surface::materials;
use bevy_fire_control::types::{LayerMask, SurfaceHit, SurfaceQuery};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Infinite walls facing +Z, each `[near, far]` deep along -Z.
struct WallCorridor {
    walls: Vec<(f32, f32, SurfaceMaterial, Entity)>,
}

impl WallCorridor {
    fn new(count: usize, material: SurfaceMaterial) -> Self {
        let mut ids = World::new();
        let walls = (0..count)
            .map(|i| {
                let near = 5.0 + i as f32 * 4.0;
                (near, near + 0.3, material.clone(), ids.spawn_empty().id())
            })
            .collect();
        Self { walls }
    }
}

impl SurfaceQuery for WallCorridor {
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        _layer_mask: LayerMask,
    ) -> Option<SurfaceHit> {
        if direction.z.abs() < 1e-6 {
            return None;
        }
        self.walls
            .iter()
            .filter_map(|(near, far, material, entity)| {
                // Depth along -Z
                let depth = -origin.z;
                let (face, normal) = if direction.z < 0.0 {
                    (*near, Vec3::Z)
                } else {
                    (*far, Vec3::NEG_Z)
                };
                let t = (face - depth) / -direction.z;
                (t > 1e-6 && t <= max_distance).then_some((t, normal, material, *entity))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, normal, material, entity)| SurfaceHit {
                point: origin + direction * t,
                normal,
                distance: t,
                density: material.density,
                penetrable: material.penetrable,
                decal_eligible: material.decal_eligible,
                surface_type: material.surface_type,
                collider: entity,
                root: entity,
                rigid_body: None,
            })
    }
}

fn benchmark_resolve_shot(c: &mut Criterion) {
    let config = BallisticsConfig::default();
    let shooter = World::new().spawn_empty().id();
    let mut group = c.benchmark_group("Resolve Shot");

    let cases = [
        ("rifle_wood", presets::rifle_fmj(), materials::wood()),
        ("ap_metal", presets::armor_piercing(), materials::metal()),
        ("hollow_point_flesh", presets::hollow_point(), materials::flesh()),
    ];

    for (name, profile, material) in cases {
        let world = WallCorridor::new(8, material);
        let mut rng = StdRng::seed_from_u64(42);
        group.bench_with_input(BenchmarkId::from_parameter(name), &world, |b, world| {
            b.iter(|| {
                let shot = ShotRequest {
                    origin: Vec3::ZERO,
                    direction: Vec3::new(0.05, 0.0, -1.0).normalize(),
                    max_range: 100.0,
                    layer_mask: LayerMask::ALL,
                    shooter,
                };
                resolve_shot(world, &profile, &config, &shot, &mut rng)
            });
        });
    }

    group.finish();
}

fn benchmark_spread(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    c.bench_function("spread_direction", |b| {
        b.iter(|| spread_direction(Vec3::NEG_Z, 0.6, 4.0, &mut rng));
    });
}

criterion_group!(benches, benchmark_resolve_shot, benchmark_spread);
criterion_main!(benches);
