use super::helpers::*;

use bevy::prelude::*;
use embers::asset::ScalarDistribution;
use embers::modules::ModuleConfig;
use embers::particle::ParticleFlags;

fn lifetime_module(seconds: f32) -> ModuleConfig {
    ModuleConfig::Lifetime {
        lifetime: ScalarDistribution::constant(seconds),
    }
}

#[test]
fn particle_ages_then_dies_on_schedule() {
    let lod = test_lod(0.0, vec![lifetime_module(1.0)]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 1, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);

    instance.tick(&emitter, &lod, Vec3::ZERO, 0.5);
    assert_eq!(instance.active_count(), 1, "alive after half a lifetime");
    let arena = instance.arena().unwrap();
    let particle = arena.particle(arena.slot_at(0));
    assert!((particle.relative_time - 0.5).abs() < 1e-6);

    instance.tick(&emitter, &lod, Vec3::ZERO, 0.5);
    assert_eq!(instance.active_count(), 0, "removed at end of lifetime");
}

#[test]
fn whole_batch_can_expire_in_one_tick() {
    let lod = test_lod(0.0, vec![lifetime_module(0.1)]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 8, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);
    assert_eq!(instance.active_count(), 8);

    instance.tick(&emitter, &lod, Vec3::ZERO, 0.2);
    assert_eq!(instance.active_count(), 0);
}

#[test]
fn staggered_expiry_keeps_the_live_set_valid() {
    let lod = test_lod(
        0.0,
        vec![ModuleConfig::Lifetime {
            lifetime: ScalarDistribution::uniform(0.2, 1.0),
        }],
    );
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 10, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);

    let mut previous = instance.active_count();
    for _ in 0..12 {
        instance.tick(&emitter, &lod, Vec3::ZERO, 0.1);
        let arena = instance.arena().unwrap();
        let mut seen = std::collections::HashSet::new();
        for &slot in arena.live_slots() {
            assert!(slot < arena.capacity());
            assert!(seen.insert(slot), "duplicate slot {slot} after removal");
        }
        assert!(arena.active() <= previous);
        previous = arena.active();
    }

    assert_eq!(instance.active_count(), 0, "all lifetimes under 1.2s elapsed");
}

#[test]
fn integration_advances_position_and_captures_old_position() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 1, 0.0, 0.0, Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
    instance.tick(&emitter, &lod, Vec3::ZERO, 0.25);

    let arena = instance.arena().unwrap();
    let particle = arena.particle(arena.slot_at(0));
    assert_eq!(particle.position, [1.0, 0.0, 0.0]);
    assert_eq!(particle.old_position, [0.0, 0.0, 0.0]);
}

#[test]
fn rotation_integrates_from_rotation_rate() {
    let lod = test_lod(
        0.0,
        vec![ModuleConfig::RotationRate {
            rate: ScalarDistribution::constant(2.0),
        }],
    );
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 1, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);
    instance.tick(&emitter, &lod, Vec3::ZERO, 0.5);

    let arena = instance.arena().unwrap();
    assert!((arena.particle(arena.slot_at(0)).rotation - 1.0).abs() < 1e-6);
}

#[test]
fn just_spawned_flag_clears_after_the_first_tick() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 1, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);
    instance.tick(&emitter, &lod, Vec3::ZERO, 0.1);

    let arena = instance.arena().unwrap();
    let flags = arena.particle(arena.slot_at(0)).flags();
    assert!(!flags.contains(ParticleFlags::JUST_SPAWNED));
    assert!(flags.contains(ParticleFlags::ACTIVE));
}

#[test]
fn idle_instance_keeps_aging_existing_particles() {
    let lod = test_lod(0.0, vec![lifetime_module(1.0)]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 2, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);
    instance.deactivate();

    instance.tick(&emitter, &lod, Vec3::ZERO, 0.5);
    assert_eq!(instance.active_count(), 2);

    instance.tick(&emitter, &lod, Vec3::ZERO, 0.6);
    assert_eq!(instance.active_count(), 0, "idle particles still age out");
}

#[test]
fn reset_discards_particles_instantly() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = init_instance(&emitter);

    instance.spawn(&lod, 6, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO);
    let capacity = instance.max_active();

    instance.reset();

    assert_eq!(instance.active_count(), 0);
    assert_eq!(instance.max_active(), capacity, "reset never resizes");
    assert_eq!(instance.spawn_fraction(), 0.0);
}

#[test]
fn uninitialized_instance_is_inert() {
    let lod = test_lod(0.0, vec![]);
    let emitter = test_emitter(vec![lod.clone()]);
    let mut instance = embers::emitter::EmitterInstance::new(0, None);

    assert_eq!(instance.spawn(&lod, 3, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO), 0);
    instance.tick(&emitter, &lod, Vec3::ZERO, 0.1);
    assert!(instance.fill_replay_data(&emitter).is_none());
}

#[test]
fn missing_lod_level_simulates_nothing() {
    let emitter = test_emitter(vec![]);
    let lod = test_lod(0.0, vec![]);
    let mut instance = embers::emitter::EmitterInstance::new(0, None);
    instance.initialize(&emitter, 0).unwrap();

    assert_eq!(instance.lod_index(), None);
    assert_eq!(instance.spawn(&lod, 3, 0.0, 0.0, Vec3::ZERO, Vec3::ZERO), 0);
    assert!(
        instance.fill_replay_data(&emitter).is_none(),
        "no dynamic data required"
    );
}
