use super::helpers::*;

use bevy::prelude::*;
use embers::asset::{EmitterSettings, ScalarDistribution, SpawnSettings, VectorDistribution};
use embers::modules::ModuleConfig;
use embers::particle::ParticleFlags;

#[test]
fn rate_of_thirty_at_sixty_fps_spawns_exactly_sixty_over_two_seconds() {
    let lod = test_lod(30.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    let dt = 1.0 / 60.0;
    let mut total = 0;
    for _ in 0..120 {
        total += instance.rate_spawn_count(&lod.spawn, dt);
    }

    assert_eq!(total, 60, "cumulative spawn count must not drift");
}

#[test]
fn fractional_rate_carries_across_ticks() {
    let lod = test_lod(0.5, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    assert_eq!(instance.rate_spawn_count(&lod.spawn, 1.0), 0);
    assert!((instance.spawn_fraction() - 0.5).abs() < 1e-6);
    assert_eq!(instance.rate_spawn_count(&lod.spawn, 1.0), 1);
    assert!(instance.spawn_fraction() < 1e-6);
}

#[test]
fn rate_scale_multiplies_the_sampled_rate() {
    let mut lod = test_lod(10.0, vec![]);
    lod.spawn.rate_scale = ScalarDistribution::constant(3.0);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    assert_eq!(instance.rate_spawn_count(&lod.spawn, 1.0), 30);
}

#[test]
fn spawn_truncates_silently_at_capacity() {
    let mut lod = test_lod(0.0, vec![]);
    lod.settings = EmitterSettings {
        max_particles: 5,
        ..Default::default()
    };
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);
    assert_eq!(instance.max_active(), 5);

    let spawned = instance.spawn(&lod, 10, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);

    assert_eq!(spawned, 5, "request beyond capacity is truncated");
    assert_eq!(instance.active_count(), 5);
}

#[test]
fn spawn_seeds_record_with_location_and_velocity() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(
        &lod,
        1,
        0.0,
        0.0,
        Vec3::new(1.0, 2.0, 3.0),
        Vec3::new(4.0, 5.0, 6.0),
    );

    let arena = instance.arena().unwrap();
    let particle = arena.particle(arena.slot_at(0));
    assert_eq!(particle.position, [1.0, 2.0, 3.0]);
    assert_eq!(particle.old_position, [1.0, 2.0, 3.0]);
    assert_eq!(particle.velocity, [4.0, 5.0, 6.0]);
    assert_eq!(particle.base_velocity, [4.0, 5.0, 6.0]);
    assert_eq!(particle.relative_time, 0.0);
}

#[test]
fn spawn_runs_modules_in_configured_order() {
    let lod = test_lod(
        0.0,
        vec![
            ModuleConfig::InitialSize {
                size: VectorDistribution::constant(Vec3::splat(2.0)),
            },
            ModuleConfig::Lifetime {
                lifetime: ScalarDistribution::constant(3.0),
            },
        ],
    );
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 1, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);

    let arena = instance.arena().unwrap();
    let particle = arena.particle(arena.slot_at(0));
    assert_eq!(particle.size, [2.0, 2.0, 2.0]);
    assert_eq!(particle.lifetime, 3.0);
}

#[test]
fn midframe_births_are_forward_integrated() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 1, 0.5, 0.0, Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));

    let arena = instance.arena().unwrap();
    let particle = arena.particle(arena.slot_at(0));
    assert_eq!(particle.position, [1.0, 0.0, 0.0]);
}

#[test]
fn batch_spawns_spread_across_the_frame() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    // Four particles over a 0.4s frame: offsets 0.4, 0.3, 0.2, 0.1.
    instance.spawn(&lod, 4, 0.4, 0.1, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));

    let arena = instance.arena().unwrap();
    let mut xs: Vec<f32> = (0..4)
        .map(|i| arena.particle(arena.slot_at(i)).position[0])
        .collect();
    xs.sort_by(f32::total_cmp);
    for (x, expected) in xs.iter().zip([0.1, 0.2, 0.3, 0.4]) {
        assert!((x - expected).abs() < 1e-6, "got {x}, expected {expected}");
    }
}

#[test]
fn spawned_particles_carry_lifecycle_flags() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 1, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);

    let arena = instance.arena().unwrap();
    let flags = arena.particle(arena.slot_at(0)).flags();
    assert!(flags.contains(ParticleFlags::ACTIVE));
    assert!(flags.contains(ParticleFlags::JUST_SPAWNED));
}

#[test]
fn particle_ids_are_monotonic_and_never_reused() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 3, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);
    assert_eq!(instance.particles_spawned(), 3);

    instance.reset();
    instance.spawn(&lod, 2, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);
    assert_eq!(instance.particles_spawned(), 5);
}

#[test]
fn idle_instance_spawns_nothing() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.deactivate();
    let spawned = instance.spawn(&lod, 4, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);

    assert_eq!(spawned, 0);
    assert_eq!(instance.active_count(), 0);
}

#[test]
fn identical_seeds_spawn_identical_counts() {
    let mut lod = test_lod(0.0, vec![]);
    lod.spawn = SpawnSettings {
        rate: ScalarDistribution::uniform(5.0, 50.0),
        ..Default::default()
    };
    let emitter = test_emitter(vec![lod.clone()]);

    let mut a = init_instance(&emitter);
    let mut b = init_instance(&emitter);

    for _ in 0..30 {
        assert_eq!(
            a.rate_spawn_count(&lod.spawn, 0.016),
            b.rate_spawn_count(&lod.spawn, 0.016)
        );
    }
}
