use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::serde_helpers::{is_false, is_true};

/// Sets how the material's base color alpha channel is used for transparency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Reflect)]
pub enum ParticleAlphaMode {
    /// Alpha values are overridden to be fully opaque.
    Opaque,
    /// Standard alpha blending.
    #[default]
    Blend,
    /// Additive blending, producing lighter results. Useful for sparks,
    /// lasers and other energy-like effects.
    Add,
}

fn default_base_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn default_unlit() -> bool {
    true
}

/// Material description carried by a snapshot so the render consumer knows how
/// to shade the copied particles. This core never creates GPU resources from
/// it; it is an opaque reference as far as the simulation is concerned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub struct ParticleMaterialDesc {
    /// Base RGBA color multiplied with each particle's color.
    #[serde(default = "default_base_color")]
    pub base_color: [f32; 4],
    /// Optional asset path of a base color texture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    /// How alpha is applied. Defaults to [`ParticleAlphaMode::Blend`].
    #[serde(default)]
    pub alpha_mode: ParticleAlphaMode,
    /// Whether the material ignores lighting. Defaults to `true`.
    #[serde(default = "default_unlit", skip_serializing_if = "is_true")]
    pub unlit: bool,
    /// Whether both faces are rendered. Defaults to `false`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub double_sided: bool,
}

impl Default for ParticleMaterialDesc {
    fn default() -> Self {
        Self {
            base_color: default_base_color(),
            texture: None,
            alpha_mode: ParticleAlphaMode::default(),
            unlit: true,
            double_sided: false,
        }
    }
}
