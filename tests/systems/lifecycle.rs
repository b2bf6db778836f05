use super::helpers::*;

use embers::emitter::InstanceState;
use embers::runtime::{EffectInstances, EffectReplay, EffectRuntime, ParticleEffect};

#[test]
fn loaded_effect_gets_runtime_components() {
    let (mut app, _, entity) = setup_loaded_effect("minimal_effect.ron");

    assert!(app.world().get::<EffectInstances>(entity).is_some());
    assert!(app.world().get::<EffectReplay>(entity).is_some());

    let runtime = app
        .world()
        .get::<EffectRuntime>(entity)
        .expect("effect should have a runtime component");
    assert!(!runtime.paused, "effects start unpaused");
}

#[test]
fn instances_are_initialized_per_emitter() {
    let (app, _, entity) = setup_loaded_effect("minimal_effect.ron");

    let instances = app.world().get::<EffectInstances>(entity).unwrap();
    assert_eq!(instances.emitters.len(), 1);
    assert_eq!(instances.template.len(), 1);

    let instance = &instances.emitters[0];
    assert_eq!(instance.state(), InstanceState::Active);
    assert_eq!(instance.lod_index(), Some(0));
    assert!(instance.max_active() >= 10);
}

#[test]
fn removing_the_effect_component_cleans_up() {
    let (mut app, _, entity) = setup_loaded_effect("minimal_effect.ron");

    app.world_mut()
        .entity_mut(entity)
        .remove::<ParticleEffect>();
    advance_frames(&mut app, 2);

    assert!(app.world().get::<EffectInstances>(entity).is_none());
    assert!(app.world().get::<EffectReplay>(entity).is_none());
    assert!(app.world().get::<EffectRuntime>(entity).is_none());
}

#[test]
fn two_effects_own_independent_instances() {
    let mut app = create_minimal_app();
    let handle = load_fixture(&mut app, "minimal_effect.ron");
    let first = spawn_effect(&mut app, handle.clone());
    let second = spawn_effect(&mut app, handle.clone());
    assert!(run_until_loaded(&mut app, &handle, 100));
    advance_frames(&mut app, 3);

    let world = app.world();
    let a = world.get::<EffectInstances>(first).unwrap();
    let b = world.get::<EffectInstances>(second).unwrap();
    assert_eq!(a.emitters.len(), 1);
    assert_eq!(b.emitters.len(), 1);
}
