use embers::arena::ParticleArena;
use embers::particle::Particle;
use rand::{Rng, SeedableRng, rngs::SmallRng};

const STRIDE: usize = Particle::SIZE;

#[test]
fn new_arena_starts_empty() {
    let arena = ParticleArena::new(STRIDE, 8).unwrap();
    assert_eq!(arena.capacity(), 8);
    assert_eq!(arena.active(), 0);
    assert!(arena.is_empty());
}

#[test]
fn acquire_hands_out_identity_slots_in_order() {
    let mut arena = ParticleArena::new(STRIDE, 4).unwrap();
    assert_eq!(arena.acquire(), Some(0));
    assert_eq!(arena.acquire(), Some(1));
    assert_eq!(arena.acquire(), Some(2));
    assert_eq!(arena.active(), 3);
}

#[test]
fn acquire_returns_none_when_full() {
    let mut arena = ParticleArena::new(STRIDE, 2).unwrap();
    assert!(arena.acquire().is_some());
    assert!(arena.acquire().is_some());
    assert_eq!(arena.acquire(), None);
    assert_eq!(arena.active(), 2);
}

#[test]
fn swap_remove_keeps_live_range_dense() {
    let mut arena = ParticleArena::new(STRIDE, 4).unwrap();
    for _ in 0..3 {
        arena.acquire();
    }

    arena.swap_remove(0);

    assert_eq!(arena.active(), 2);
    assert_eq!(arena.live_slots(), &[2, 1]);
}

#[test]
fn removed_slot_id_is_reused_by_next_acquire() {
    let mut arena = ParticleArena::new(STRIDE, 4).unwrap();
    for _ in 0..3 {
        arena.acquire();
    }
    arena.swap_remove(0);

    assert_eq!(arena.acquire(), Some(0), "freed slot should come back");
}

#[test]
fn particle_view_roundtrips_through_slot_bytes() {
    let mut arena = ParticleArena::new(STRIDE, 4).unwrap();
    let slot = arena.acquire().unwrap();

    let particle = arena.particle_mut(slot);
    *particle = Particle::default();
    particle.position = [1.0, 2.0, 3.0];
    particle.lifetime = 4.5;

    let read = arena.particle(slot);
    assert_eq!(read.position, [1.0, 2.0, 3.0]);
    assert_eq!(read.lifetime, 4.5);
}

#[test]
fn record_mut_splits_base_record_from_payload() {
    let stride = STRIDE + 32;
    let mut arena = ParticleArena::new(stride, 2).unwrap();
    let slot = arena.acquire().unwrap();

    let (particle, payload) = arena.record_mut(slot);
    particle.lifetime = 2.0;
    assert_eq!(payload.len(), 32);
    payload[0] = 0xAB;

    assert_eq!(arena.particle(slot).lifetime, 2.0);
    assert_eq!(arena.slot_bytes(slot)[Particle::SIZE], 0xAB);
}

#[test]
fn clear_forgets_everything_without_shrinking() {
    let mut arena = ParticleArena::new(STRIDE, 4).unwrap();
    for _ in 0..4 {
        arena.acquire();
    }

    arena.clear();

    assert_eq!(arena.active(), 0);
    assert_eq!(arena.capacity(), 4);
    let reused = arena.acquire().expect("cleared arena has room again");
    assert!(reused < 4);
}

#[test]
fn grow_preserves_existing_bytes() {
    let mut arena = ParticleArena::new(STRIDE, 2).unwrap();
    let slot = arena.acquire().unwrap();
    arena.particle_mut(slot).position = [9.0, 8.0, 7.0];

    arena.grow(16).unwrap();

    assert_eq!(arena.capacity(), 16);
    assert_eq!(arena.particle(slot).position, [9.0, 8.0, 7.0]);
}

#[test]
fn grow_to_smaller_or_equal_capacity_is_a_noop() {
    let mut arena = ParticleArena::new(STRIDE, 8).unwrap();
    arena.grow(4).unwrap();
    assert_eq!(arena.capacity(), 8);
    arena.grow(8).unwrap();
    assert_eq!(arena.capacity(), 8);
}

#[test]
fn grown_slots_become_acquirable() {
    let mut arena = ParticleArena::new(STRIDE, 2).unwrap();
    arena.acquire();
    arena.acquire();
    assert_eq!(arena.acquire(), None);

    arena.grow(4).unwrap();

    assert_eq!(arena.acquire(), Some(2));
    assert_eq!(arena.acquire(), Some(3));
}

fn assert_index_set_valid(arena: &ParticleArena) {
    let mut seen = std::collections::HashSet::new();
    for &slot in arena.live_slots() {
        assert!(slot < arena.capacity(), "slot id out of range");
        assert!(seen.insert(slot), "duplicate slot id {slot} in live range");
    }
}

#[test]
fn index_set_invariant_holds_under_random_churn() {
    let mut rng = SmallRng::seed_from_u64(1234);
    let mut arena = ParticleArena::new(STRIDE, 32).unwrap();

    for step in 0..2000 {
        let spawn = arena.is_empty() || (arena.active() < arena.capacity() && rng.gen_bool(0.55));
        if spawn {
            arena.acquire();
        } else {
            let victim = rng.gen_range(0..arena.active());
            arena.swap_remove(victim);
        }
        if step % 97 == 0 {
            arena.grow(arena.capacity() + rng.gen_range(0..4)).unwrap();
        }
        assert_index_set_valid(&arena);
    }
}
