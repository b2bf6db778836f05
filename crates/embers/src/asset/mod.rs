pub mod distribution;
pub mod material;
pub(crate) mod serde_helpers;
/// Asset format version tracking and compatibility validation.
pub mod versioning;

pub use distribution::{
    ColorDistribution, Curve, CurvePoint, Gradient, GradientInterpolation, GradientStop,
    ScalarDistribution, VectorDistribution,
};
pub use material::{ParticleAlphaMode, ParticleMaterialDesc};

use bevy::{
    asset::{AssetLoader, LoadContext, io::Reader},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modules::ModuleConfig;
use serde_helpers::*;
use versioning::{VersionStatus, current_format_version};

/// Asset loader for [`ParticleEffectAsset`] files in RON format.
#[derive(Default, TypePath)]
pub struct ParticleEffectAssetLoader;

/// Errors that can occur when loading a [`ParticleEffectAsset`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ParticleEffectAssetLoaderError {
    /// An I/O error occurred while reading the asset file.
    #[error("Could not load asset: {0}")]
    Io(#[from] std::io::Error),
    /// The asset file contained invalid RON syntax.
    #[error("Could not parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// The asset file has an unknown format version, likely from a newer Embers.
    #[error("Unknown embers_version. You may need a newer version of Embers.")]
    UnknownVersion,
    /// The asset file has a version that requires breaking changes to upgrade.
    #[error(
        "Asset version \"{found}\" is incompatible with current version \"{current}\". Manual migration is required."
    )]
    IncompatibleVersion {
        /// The version found in the asset file.
        found: String,
        /// The current format version.
        current: String,
    },
}

impl AssetLoader for ParticleEffectAssetLoader {
    type Asset = ParticleEffectAsset;
    type Settings = ();
    type Error = ParticleEffectAssetLoaderError;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &(),
        load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let mut asset = ron::de::from_bytes::<ParticleEffectAsset>(&bytes)?;

        match asset.try_upgrade_version() {
            VersionStatus::Current => {}
            VersionStatus::Outdated { found, current } => {
                let path = load_context.path();
                warn!(
                    "{path:?}: loaded asset with embers_version \"{found}\", current is \"{current}\""
                );
            }
            VersionStatus::Incompatible { found, current } => {
                return Err(ParticleEffectAssetLoaderError::IncompatibleVersion {
                    found,
                    current: current.to_string(),
                });
            }
            VersionStatus::Unknown => {
                return Err(ParticleEffectAssetLoaderError::UnknownVersion);
            }
        }

        Ok(asset)
    }

    fn extensions(&self) -> &[&str] {
        &["ron"]
    }
}

/// Presentation-only draw ordering applied to a snapshot's copied index range,
/// never to the live simulation buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Reflect)]
pub enum SortMode {
    /// Particles keep the order of the live index range.
    #[default]
    Unsorted,
    /// Back-to-front by view-space depth. Best for alpha-blended quads.
    ViewDepth,
    /// Back-to-front by squared distance to the viewer.
    DistanceToView,
    /// Oldest particles first.
    OldestFirst,
    /// Newest particles first.
    NewestFirst,
}

impl SortMode {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// The mesh shape rendered for each particle of a mesh emitter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub enum ParticleMesh {
    /// A flat quadrilateral.
    Quad {
        /// Size of the quad in world units.
        size: Vec2,
    },
    /// An axis-aligned box.
    Cuboid {
        /// Half-extents of the box along each axis.
        half_size: Vec3,
    },
    /// A sphere.
    Sphere {
        /// Radius of the sphere.
        radius: f32,
    },
}

impl Default for ParticleMesh {
    fn default() -> Self {
        Self::Quad { size: Vec2::ONE }
    }
}

fn default_beam_segments() -> u32 {
    16
}

/// What an emitter renders, and the data that rendering needs.
///
/// The variant set is closed: every emitter is one of these three, sharing the
/// same spawn/tick machinery except where noted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub enum EmitterShape {
    /// Camera-facing quad per particle, four vertices each.
    Sprite,
    /// One mesh instance per particle.
    Mesh {
        /// The instanced mesh.
        mesh: ParticleMesh,
    },
    /// A chain of interpolated points between two world-space endpoints.
    ///
    /// Beam emitters do not age or integrate individual particles; each tick
    /// recomputes the point list instead.
    Beam {
        /// Source endpoint offset from the emitter origin.
        source_offset: Vec3,
        /// Target endpoint offset from the emitter origin.
        target_offset: Vec3,
        /// Number of interpolated points, including both endpoints.
        #[serde(default = "default_beam_segments")]
        segments: u32,
    },
}

impl Default for EmitterShape {
    fn default() -> Self {
        Self::Sprite
    }
}

fn default_duration() -> f32 {
    1.0
}

fn default_max_particles() -> u32 {
    1000
}

fn default_peak_safety_margin() -> f32 {
    1.25
}

/// Emitter-level configuration every LOD level carries: the loop clock and the
/// allocation policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub struct EmitterSettings {
    /// Length of one emitter loop, in seconds. Burst times are expressed on
    /// this clock. Defaults to `1.0`.
    #[serde(default = "default_duration")]
    pub duration: f32,
    /// How many loops to run before the emitter stops spawning.
    /// `0` loops forever. Defaults to `0`.
    #[serde(default)]
    pub loops: u32,
    /// Hard ceiling the particle buffers may grow to. Defaults to `1000`.
    #[serde(default = "default_max_particles")]
    pub max_particles: u32,
    /// Optional fixed random seed for deterministic spawn behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_seed: Option<u32>,
    /// Multiplier applied to the peak-particle estimate when sizing the
    /// initial allocation. Defaults to `1.25`.
    #[serde(default = "default_peak_safety_margin")]
    pub peak_safety_margin: f32,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            loops: 0,
            max_particles: default_max_particles(),
            fixed_seed: None,
            peak_safety_margin: default_peak_safety_margin(),
        }
    }
}

/// A scheduled mass spawn at a fixed time on the emitter's loop clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Reflect)]
pub struct BurstEvent {
    /// Time of the burst within `[0, duration)`.
    pub time: f32,
    /// Number of particles to spawn.
    pub count: u32,
    /// When set, the actual count is a uniform draw in `[count_low, count]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_low: Option<u32>,
}

fn default_rate() -> ScalarDistribution {
    ScalarDistribution::Constant(10.0)
}

fn default_scale() -> ScalarDistribution {
    ScalarDistribution::Constant(1.0)
}

fn is_default_scale(value: &ScalarDistribution) -> bool {
    *value == default_scale()
}

/// Spawn-distribution configuration every LOD level carries: continuous rate
/// plus scheduled bursts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub struct SpawnSettings {
    /// Continuous spawn rate in particles per second. Defaults to `10.0`.
    #[serde(default = "default_rate")]
    pub rate: ScalarDistribution,
    /// Multiplier sampled independently of [`rate`](Self::rate) each tick.
    /// Defaults to `1.0`.
    #[serde(default = "default_scale", skip_serializing_if = "is_default_scale")]
    pub rate_scale: ScalarDistribution,
    /// Scheduled burst events on the emitter's loop clock.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bursts: Vec<BurstEvent>,
    /// Multiplier applied to every burst's drawn count. Defaults to `1.0`.
    #[serde(default = "default_scale", skip_serializing_if = "is_default_scale")]
    pub burst_scale: ScalarDistribution,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            rate_scale: default_scale(),
            bursts: Vec::new(),
            burst_scale: default_scale(),
        }
    }
}

/// One level-of-detail of an emitter: its spawn distribution, its emitter
/// configuration, and the ordered behavior module list.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Reflect)]
pub struct LodData {
    /// Loop clock and allocation policy.
    #[serde(default)]
    pub settings: EmitterSettings,
    /// Continuous-rate and burst spawn distribution.
    #[serde(default)]
    pub spawn: SpawnSettings,
    /// Behavior modules, run in this order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleConfig>,
}

impl LodData {
    /// Estimates the peak simultaneously-active particle count from the spawn
    /// rate, the mean lifetime, and the scheduled burst totals, scaled by the
    /// configured safety margin. Used as a buffer-sizing hint only.
    pub fn estimate_peak_active(&self) -> u32 {
        let mean_lifetime = self
            .modules
            .iter()
            .find_map(|module| match module {
                ModuleConfig::Lifetime { lifetime } => Some(lifetime.mean()),
                _ => None,
            })
            .unwrap_or(1.0)
            .max(0.0);

        let rate = self.spawn.rate.max_value().max(0.0) * self.spawn.rate_scale.max_value().max(0.0);
        let burst_total: u32 = self.spawn.bursts.iter().map(|burst| burst.count).sum();
        let bursts = burst_total as f32 * self.spawn.burst_scale.max_value().max(0.0);

        let estimate = (rate * mean_lifetime + bursts) * self.settings.peak_safety_margin.max(1.0);
        estimate.ceil() as u32
    }
}

fn default_enabled() -> bool {
    default_true()
}

/// An emitter template: the asset-level definition of one kind of particle
/// effect, with one or more LOD levels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub struct EmitterData {
    /// Display name for this emitter.
    pub name: String,
    /// Whether this emitter is active. Disabled emitters do not simulate.
    ///
    /// Defaults to `true`.
    #[serde(default = "default_enabled", skip_serializing_if = "is_true")]
    pub enabled: bool,
    /// Position offset of this emitter relative to the owning entity.
    ///
    /// Defaults to [`Vec3::ZERO`].
    #[serde(default, skip_serializing_if = "is_zero_vec3")]
    pub position: Vec3,
    /// What this emitter renders. Defaults to [`EmitterShape::Sprite`].
    #[serde(default)]
    pub variant: EmitterShape,
    /// Material description passed through to the render consumer.
    #[serde(default)]
    pub material: ParticleMaterialDesc,
    /// Draw ordering applied to snapshots. Defaults to [`SortMode::Unsorted`].
    #[serde(default, skip_serializing_if = "SortMode::is_default")]
    pub sort_mode: SortMode,
    /// World scale hint passed through to the render consumer. Defaults to `1.0`.
    #[serde(default = "default_one_f32", skip_serializing_if = "is_one_f32")]
    pub spatial_scale: f32,
    /// Levels of detail, most detailed first. Index 0 is the default level.
    pub lods: Vec<LodData>,
}

impl Default for EmitterData {
    fn default() -> Self {
        Self {
            name: "Emitter".to_string(),
            enabled: true,
            position: Vec3::ZERO,
            variant: EmitterShape::default(),
            material: ParticleMaterialDesc::default(),
            sort_mode: SortMode::default(),
            spatial_scale: 1.0,
            lods: vec![LodData::default()],
        }
    }
}

impl EmitterData {
    /// The cached peak-particle estimate of the default LOD level, or `0`
    /// when the emitter has no LOD levels at all.
    pub fn peak_estimate(&self) -> u32 {
        self.lods
            .first()
            .map(LodData::estimate_peak_active)
            .unwrap_or(0)
    }
}

/// A complete particle effect asset, loadable from RON files.
///
/// Contains the emitter templates that together define one effect. Reference
/// it from a [`ParticleEffect`](crate::runtime::ParticleEffect) component to
/// simulate it.
#[derive(Asset, TypePath, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticleEffectAsset {
    embers_version: String,
    /// Display name for this effect.
    pub name: String,
    /// The emitter templates that make up this effect.
    pub emitters: Vec<EmitterData>,
}

impl ParticleEffectAsset {
    /// Creates a new particle effect asset with the current format version.
    pub fn new(name: String, emitters: Vec<EmitterData>) -> Self {
        Self {
            embers_version: current_format_version().to_string(),
            name,
            emitters,
        }
    }

    /// Validates this asset's `embers_version` against the current format version.
    ///
    /// If the version is outdated but compatible, it is automatically upgraded.
    /// Returns the original [`VersionStatus`] so the caller can react accordingly.
    pub fn try_upgrade_version(&mut self) -> VersionStatus {
        let status = versioning::validate_version(&self.embers_version);
        if matches!(status, VersionStatus::Outdated { .. }) {
            self.embers_version = current_format_version().to_string();
        }
        status
    }
}
