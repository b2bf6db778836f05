use bevy::prelude::*;

use crate::asset::{EmitterData, ParticleEffectAsset};
use crate::emitter::EmitterInstance;
use crate::replay::EmitterReplayData;

/// Attaches a particle effect to an entity. The owning component machinery
/// (instances, playback state, replay storage) is inserted automatically once
/// the referenced asset has loaded.
#[derive(Component)]
pub struct ParticleEffect {
    pub handle: Handle<ParticleEffectAsset>,
}

/// Playback state of one particle effect.
#[derive(Component, Default)]
pub struct EffectRuntime {
    pub paused: bool,
}

impl EffectRuntime {
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle(&mut self) {
        self.paused = !self.paused;
    }
}

/// The emitter instances simulating one effect, together with the template
/// they run against.
///
/// The template is a deserialized copy of the asset's emitter list; it is the
/// read-only configuration the instances borrow every frame, and swapping it
/// (on asset change) rebuilds the instances from scratch.
#[derive(Component)]
pub struct EffectInstances {
    pub template: Vec<EmitterData>,
    pub emitters: Vec<EmitterInstance>,
}

impl EffectInstances {
    pub fn from_asset(asset: &ParticleEffectAsset) -> Self {
        let template = asset.emitters.clone();
        let emitters = template
            .iter()
            .enumerate()
            .map(|(index, emitter)| {
                let fixed_seed = emitter
                    .lods
                    .first()
                    .and_then(|lod| lod.settings.fixed_seed);
                let mut instance = EmitterInstance::new(index, fixed_seed);
                if let Err(err) = instance.initialize(emitter, 0) {
                    warn!("emitter \"{}\" failed to initialize: {err}", emitter.name);
                    instance.destroy();
                }
                instance
            })
            .collect();
        Self { template, emitters }
    }

    /// Total live particles across all emitters.
    pub fn active_count(&self) -> u32 {
        self.emitters
            .iter()
            .map(EmitterInstance::active_count)
            .sum()
    }
}

/// Last frame's replay snapshots, one entry per emitter.
///
/// Replaced wholesale every render-collection pass; `None` entries had
/// nothing to render that frame.
#[derive(Component, Default)]
pub struct EffectReplay {
    pub emitters: Vec<Option<EmitterReplayData>>,
}
