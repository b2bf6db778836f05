use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::arena::ParticleArena;
use crate::asset::distribution::{
    ColorDistribution, Curve, Gradient, ScalarDistribution, VectorDistribution,
};
use crate::layout::PayloadSlice;
use crate::particle::Particle;

/// The region new particles are placed in, relative to the emitter origin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Reflect)]
pub enum EmissionShape {
    /// All particles start at the emitter origin.
    #[default]
    Point,
    /// Particles start inside the volume of a sphere.
    Sphere { radius: f32 },
    /// Particles start on the surface of a sphere.
    SphereSurface { radius: f32 },
    /// Particles start inside a box. The extents are half-sizes per axis.
    Box { extents: Vec3 },
}

impl EmissionShape {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec3 {
        match *self {
            Self::Point => Vec3::ZERO,
            Self::Sphere { radius } => {
                // Cube-root keeps the draw uniform over the volume.
                unit_direction(rng) * radius * rng.gen_range(0.0..1.0f32).cbrt()
            }
            Self::SphereSurface { radius } => unit_direction(rng) * radius,
            Self::Box { extents } => Vec3::new(
                rng.gen_range(-1.0..1.0f32) * extents.x,
                rng.gen_range(-1.0..1.0f32) * extents.y,
                rng.gen_range(-1.0..1.0f32) * extents.z,
            ),
        }
    }
}

fn unit_direction<R: Rng>(rng: &mut R) -> Vec3 {
    let cos_theta = rng.gen_range(-1.0..1.0f32);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = rng.gen_range(0.0..std::f32::consts::TAU);
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Samples a direction within `spread_deg` degrees of `axis`.
fn cone_direction<R: Rng>(rng: &mut R, axis: Vec3, spread_deg: f32) -> Vec3 {
    let axis = axis.try_normalize().unwrap_or(Vec3::X);
    let spread = spread_deg.clamp(0.0, 180.0).to_radians();
    if spread <= f32::EPSILON {
        return axis;
    }
    let cos_spread = spread.cos();
    let cos_theta = 1.0 - rng.gen_range(0.0..1.0f32) * (1.0 - cos_spread);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = rng.gen_range(0.0..std::f32::consts::TAU);
    let (tangent, bitangent) = axis.any_orthonormal_pair();
    (axis * cos_theta + (tangent * phi.cos() + bitangent * phi.sin()) * sin_theta).normalize()
}

fn default_direction() -> Vec3 {
    Vec3::X
}

fn default_spread() -> f32 {
    45.0
}

fn default_flipbook_fps() -> f32 {
    8.0
}

/// A single behavior unit of an emitter.
///
/// Modules contribute to spawn-time initialization, per-tick update, or both,
/// and may request extra per-particle payload bytes. A LOD level runs its
/// spawn-capable modules once per new particle in configured order, and its
/// update-capable modules once per tick over the whole active range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Reflect)]
pub enum ModuleConfig {
    /// Sets each particle's total lifetime, in seconds.
    Lifetime { lifetime: ScalarDistribution },
    /// Offsets each particle's start position by a point drawn from a shape.
    InitialLocation {
        #[serde(default)]
        shape: EmissionShape,
        #[serde(default)]
        offset: Vec3,
    },
    /// Adds a velocity drawn from a cone around `direction`.
    InitialVelocity {
        speed: ScalarDistribution,
        /// Base emission direction. Defaults to `Vec3::X`.
        #[serde(default = "default_direction")]
        direction: Vec3,
        /// Half-angle of the emission cone, in degrees. Defaults to `45.0`.
        #[serde(default = "default_spread")]
        spread_deg: f32,
    },
    /// Sets each particle's per-axis size.
    InitialSize { size: VectorDistribution },
    /// Sets each particle's color.
    InitialColor { color: ColorDistribution },
    /// Sets each particle's rotation, in radians.
    InitialRotation { angle: ScalarDistribution },
    /// Sets each particle's rotation rate, in radians per second.
    RotationRate { rate: ScalarDistribution },
    /// Applies a constant acceleration to every particle.
    Acceleration { acceleration: Vec3 },
    /// Proportionally damps velocity each tick.
    Drag { coefficient: f32 },
    /// Rescales size over lifetime. Stores the spawn-time size in its payload
    /// slice, so configure it after any size-setting module.
    SizeOverLife { curve: Curve },
    /// Modulates the spawn-time color by a gradient over lifetime. Stores the
    /// spawn-time color in its payload slice.
    ColorOverLife { gradient: Gradient },
    /// Per-axis rotation for mesh particles, stored in its payload slice as a
    /// rotation triplet plus a rotation-rate triplet.
    MeshRotation { rate: VectorDistribution },
    /// Advances a fractional sub-image index through a texture sheet of
    /// `columns x rows` frames.
    Flipbook {
        columns: u32,
        rows: u32,
        #[serde(default = "default_flipbook_fps")]
        frames_per_second: f32,
    },
}

impl ModuleConfig {
    /// Extra payload bytes this module needs per particle. Queried once while
    /// computing the instance stride; always a multiple of four so typed
    /// payload views stay aligned.
    pub fn required_bytes(&self) -> u32 {
        match self {
            Self::SizeOverLife { .. } => 12,
            Self::ColorOverLife { .. } => 16,
            Self::MeshRotation { .. } => 24,
            Self::Flipbook { .. } => 4,
            _ => 0,
        }
    }

    pub fn is_spawn_capable(&self) -> bool {
        !matches!(self, Self::Acceleration { .. } | Self::Drag { .. })
    }

    pub fn is_update_capable(&self) -> bool {
        matches!(
            self,
            Self::Acceleration { .. }
                | Self::Drag { .. }
                | Self::SizeOverLife { .. }
                | Self::ColorOverLife { .. }
                | Self::MeshRotation { .. }
                | Self::Flipbook { .. }
        )
    }

    /// Initializes one newly spawned particle. `payload` is this module's own
    /// slice when it requested storage; a module whose payload is missing
    /// skips its payload writes and nothing else.
    pub fn spawn<R: Rng>(
        &self,
        particle: &mut Particle,
        payload: Option<&mut [u8]>,
        rng: &mut R,
    ) {
        match self {
            Self::Lifetime { lifetime } => {
                particle.lifetime = lifetime.sample(rng);
            }
            Self::InitialLocation { shape, offset } => {
                let delta = *offset + shape.sample(rng);
                particle.position = (Vec3::from(particle.position) + delta).to_array();
                particle.old_position = particle.position;
            }
            Self::InitialVelocity {
                speed,
                direction,
                spread_deg,
            } => {
                let velocity = cone_direction(rng, *direction, *spread_deg) * speed.sample(rng);
                particle.velocity = (Vec3::from(particle.velocity) + velocity).to_array();
                particle.base_velocity = particle.velocity;
            }
            Self::InitialSize { size } => {
                particle.size = size.sample(rng).to_array();
            }
            Self::InitialColor { color } => {
                particle.color = color.sample(rng);
            }
            Self::InitialRotation { angle } => {
                particle.rotation = angle.sample(rng);
            }
            Self::RotationRate { rate } => {
                particle.rotation_rate = rate.sample(rng);
            }
            Self::SizeOverLife { .. } => {
                if let Some(payload) = payload {
                    payload[..12].copy_from_slice(bytemuck::cast_slice(&particle.size));
                }
            }
            Self::ColorOverLife { .. } => {
                if let Some(payload) = payload {
                    payload[..16].copy_from_slice(bytemuck::cast_slice(&particle.color));
                }
            }
            Self::MeshRotation { rate } => {
                if let Some(payload) = payload {
                    let data: &mut MeshRotationPayload = bytemuck::from_bytes_mut(payload);
                    data.rotation = [0.0; 3];
                    data.rate = rate.sample(rng).to_array();
                }
            }
            Self::Flipbook { .. } => {
                if let Some(payload) = payload {
                    payload[..4].copy_from_slice(&0.0f32.to_ne_bytes());
                }
            }
            Self::Acceleration { .. } | Self::Drag { .. } => {}
        }
    }

    /// Advances every live particle by one tick. Grouping the iteration by
    /// module keeps each module's data accesses hot instead of interleaving
    /// all modules per particle.
    pub fn update(&self, arena: &mut ParticleArena, payload: Option<PayloadSlice>, dt: f32) {
        match self {
            Self::Acceleration { acceleration } => {
                let delta = *acceleration * dt;
                for i in 0..arena.active() {
                    let particle = arena.particle_mut(arena.slot_at(i));
                    particle.velocity = (Vec3::from(particle.velocity) + delta).to_array();
                    particle.base_velocity =
                        (Vec3::from(particle.base_velocity) + delta).to_array();
                }
            }
            Self::Drag { coefficient } => {
                let factor = (1.0 - coefficient * dt).max(0.0);
                for i in 0..arena.active() {
                    let particle = arena.particle_mut(arena.slot_at(i));
                    particle.velocity = (Vec3::from(particle.velocity) * factor).to_array();
                }
            }
            Self::SizeOverLife { curve } => {
                let Some(payload) = payload else { return };
                for i in 0..arena.active() {
                    let slot = arena.slot_at(i);
                    let (particle, bytes) = arena.record_mut(slot);
                    let base: [f32; 3] =
                        bytemuck::pod_read_unaligned(module_bytes(bytes, payload, 12));
                    let scale = curve.sample(particle.relative_time);
                    particle.size = [base[0] * scale, base[1] * scale, base[2] * scale];
                }
            }
            Self::ColorOverLife { gradient } => {
                let Some(payload) = payload else { return };
                for i in 0..arena.active() {
                    let slot = arena.slot_at(i);
                    let (particle, bytes) = arena.record_mut(slot);
                    let base: [f32; 4] =
                        bytemuck::pod_read_unaligned(module_bytes(bytes, payload, 16));
                    let tint = gradient.sample(particle.relative_time);
                    particle.color = [
                        base[0] * tint[0],
                        base[1] * tint[1],
                        base[2] * tint[2],
                        base[3] * tint[3],
                    ];
                }
            }
            Self::MeshRotation { .. } => {
                let Some(payload) = payload else { return };
                for i in 0..arena.active() {
                    let slot = arena.slot_at(i);
                    let (_, bytes) = arena.record_mut(slot);
                    let data: &mut MeshRotationPayload =
                        bytemuck::from_bytes_mut(module_bytes_mut(bytes, payload, 24));
                    for axis in 0..3 {
                        data.rotation[axis] += data.rate[axis] * dt;
                    }
                }
            }
            Self::Flipbook {
                columns,
                rows,
                frames_per_second,
            } => {
                let Some(payload) = payload else { return };
                let frame_count = (columns * rows).max(1) as f32;
                for i in 0..arena.active() {
                    let slot = arena.slot_at(i);
                    let (_, bytes) = arena.record_mut(slot);
                    let raw = module_bytes_mut(bytes, payload, 4);
                    let mut frame = f32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]);
                    frame = (frame + frames_per_second * dt) % frame_count;
                    raw.copy_from_slice(&frame.to_ne_bytes());
                }
            }
            _ => {}
        }
    }
}

/// Payload record of [`ModuleConfig::MeshRotation`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshRotationPayload {
    /// Per-axis rotation in radians.
    pub rotation: [f32; 3],
    /// Per-axis rotation rate in radians per second.
    pub rate: [f32; 3],
}

fn module_bytes(payload_region: &[u8], slice: PayloadSlice, len: usize) -> &[u8] {
    let start = slice.offset - Particle::SIZE;
    &payload_region[start..start + len]
}

fn module_bytes_mut(payload_region: &mut [u8], slice: PayloadSlice, len: usize) -> &mut [u8] {
    let start = slice.offset - Particle::SIZE;
    &mut payload_region[start..start + len]
}
