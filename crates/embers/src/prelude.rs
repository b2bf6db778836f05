//! Commonly used types, re-exported for glob import.

pub use crate::EmbersPlugin;
pub use crate::asset::{
    BurstEvent, EmitterData, EmitterSettings, EmitterShape, LodData, ParticleEffectAsset,
    ScalarDistribution, SortMode, SpawnSettings, VectorDistribution,
};
pub use crate::emitter::{EmitterInstance, InstanceState};
pub use crate::modules::{EmissionShape, ModuleConfig};
pub use crate::particle::{Particle, ParticleFlags};
pub use crate::replay::{EmitterReplayData, ReplayVariant, ViewInfo};
pub use crate::runtime::{EffectInstances, EffectReplay, EffectRuntime, ParticleEffect};
