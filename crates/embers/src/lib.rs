pub mod arena;
pub mod asset;
pub mod emitter;
pub mod layout;
pub mod modules;
pub mod particle;
pub mod prelude;
pub mod render_data;
pub mod replay;
pub mod runtime;
pub mod systems;

use bevy::prelude::*;

use asset::{ParticleEffectAsset, ParticleEffectAssetLoader};
use systems::{
    cleanup_particle_effects, collect_replay_data, setup_particle_effects, sync_effect_assets,
    update_particle_effects,
};

pub struct EmbersPlugin;

impl Plugin for EmbersPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<ParticleEffectAsset>()
            .init_asset_loader::<ParticleEffectAssetLoader>();

        // The chain keeps the per-frame ordering explicit: spawn and tick
        // always precede the snapshot pass, and last frame's snapshots stay
        // untouched while the live buffers mutate.
        app.add_systems(
            Update,
            (
                setup_particle_effects,
                sync_effect_assets,
                update_particle_effects,
                collect_replay_data,
                cleanup_particle_effects,
            )
                .chain(),
        );
    }
}

pub use asset::{
    BurstEvent, ColorDistribution, Curve, CurvePoint, EmitterData, EmitterSettings, EmitterShape,
    Gradient, GradientInterpolation, GradientStop, LodData, ParticleAlphaMode, ParticleMaterialDesc,
    ParticleMesh, ScalarDistribution, SortMode, SpawnSettings, VectorDistribution,
};
pub use emitter::{EmitterInstance, InstanceState, LodLevel};
pub use modules::{EmissionShape, ModuleConfig};
pub use particle::{Particle, ParticleFlags};
pub use replay::{EmitterReplayData, ReplayVariant, ViewInfo};
pub use runtime::{EffectInstances, EffectReplay, EffectRuntime, ParticleEffect};
