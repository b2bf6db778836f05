use bevy::prelude::*;

use crate::asset::{EmitterData, EmitterShape, ParticleEffectAsset};
use crate::emitter::{EmitterInstance, InstanceState};
use crate::replay::ViewInfo;
use crate::runtime::{EffectInstances, EffectReplay, EffectRuntime, ParticleEffect};

const MAX_FRAME_DELTA: f32 = 0.1;

/// Inserts the owning-component machinery on entities whose effect asset has
/// finished loading.
pub fn setup_particle_effects(
    mut commands: Commands,
    query: Query<(Entity, &ParticleEffect), Without<EffectInstances>>,
    assets: Res<Assets<ParticleEffectAsset>>,
) {
    for (entity, effect) in query.iter() {
        let Some(asset) = assets.get(&effect.handle) else {
            continue;
        };
        commands.entity(entity).insert((
            EffectInstances::from_asset(asset),
            EffectRuntime::default(),
            EffectReplay::default(),
        ));
    }
}

/// Rebuilds instances whose template changed, e.g. after an asset hot-reload.
/// The stride may differ under the new module list, so the old buffers are
/// destroyed rather than migrated.
pub fn sync_effect_assets(
    assets: Res<Assets<ParticleEffectAsset>>,
    mut query: Query<(&ParticleEffect, &mut EffectInstances)>,
) {
    if !assets.is_changed() {
        return;
    }
    for (effect, mut instances) in query.iter_mut() {
        let Some(asset) = assets.get(&effect.handle) else {
            continue;
        };
        if instances.template != asset.emitters {
            for instance in &mut instances.emitters {
                instance.destroy();
            }
            *instances = EffectInstances::from_asset(asset);
        }
    }
}

/// Per-frame driver: advances every emitter instance of every effect.
/// Spawning always precedes ticking within the frame.
pub fn update_particle_effects(
    time: Res<Time>,
    mut query: Query<(&EffectRuntime, &GlobalTransform, &mut EffectInstances)>,
) {
    let dt = time.delta_secs().min(MAX_FRAME_DELTA);
    if dt <= 0.0 {
        return;
    }

    for (runtime, transform, mut instances) in query.iter_mut() {
        if runtime.paused {
            continue;
        }
        let EffectInstances { template, emitters } = &mut *instances;
        for instance in emitters.iter_mut() {
            let Some(emitter) = template.get(instance.emitter_index()) else {
                continue;
            };
            if !emitter.enabled {
                continue;
            }
            // World transform read once per spawn batch.
            let origin = transform.transform_point(emitter.position);
            step_emitter(instance, emitter, origin, dt);
        }
    }
}

/// Advances one emitter instance by one frame: clock, spawn counts, capacity,
/// spawn, tick.
///
/// Particles of one batch are spread evenly across the frame's time span via
/// the spawn increment, which avoids visible stepping when several particles
/// share a tick.
pub fn step_emitter(instance: &mut EmitterInstance, emitter: &EmitterData, origin: Vec3, dt: f32) {
    let Some(lod_index) = instance.lod_index() else {
        return;
    };
    let Some(lod) = emitter.lods.get(lod_index) else {
        return;
    };

    let was_spawning = instance.state() == InstanceState::Active
        && !matches!(emitter.variant, EmitterShape::Beam { .. });
    instance.advance_clock(&lod.settings, dt);

    if was_spawning {
        let count = instance.rate_spawn_count(&lod.spawn, dt)
            + instance.burst_spawn_count(&lod.spawn, lod.settings.duration);
        if count > 0 {
            let needed = instance.active_count().saturating_add(count);
            instance.ensure_capacity(needed, lod.settings.max_particles);
            let increment = dt / count as f32;
            instance.spawn(lod, count, dt, increment, origin, Vec3::ZERO);
        }
    }

    instance.tick(emitter, lod, origin, dt);
}

/// Render-collection pass: snapshots every emitter after all simulation for
/// the frame is done, replacing last frame's snapshots.
pub fn collect_replay_data(
    camera_query: Query<&GlobalTransform, With<Camera3d>>,
    mut query: Query<(&EffectInstances, &mut EffectReplay)>,
) {
    let view = camera_query
        .iter()
        .next()
        .map(ViewInfo::from_camera_transform);

    for (instances, mut replay) in query.iter_mut() {
        replay.emitters = instances
            .emitters
            .iter()
            .map(|instance| {
                let emitter = instances.template.get(instance.emitter_index())?;
                let mut data = instance.fill_replay_data(emitter)?;
                if let Some(view) = view.as_ref() {
                    data.sort_for_view(view);
                }
                Some(data)
            })
            .collect();
    }
}

/// Drops the runtime components of entities whose [`ParticleEffect`] was
/// removed.
pub fn cleanup_particle_effects(
    mut commands: Commands,
    orphans: Query<Entity, (With<EffectInstances>, Without<ParticleEffect>)>,
) {
    for entity in orphans.iter() {
        commands
            .entity(entity)
            .remove::<(EffectInstances, EffectRuntime, EffectReplay)>();
    }
}
