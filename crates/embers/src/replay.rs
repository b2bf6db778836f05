use bevy::prelude::*;

use crate::asset::{ParticleMaterialDesc, ParticleMesh, SortMode};
use crate::particle::Particle;

/// Viewer information captured once per render-collection pass, used for
/// presentation-only sorting and for billboarding derived geometry.
#[derive(Debug, Clone, Copy)]
pub struct ViewInfo {
    pub position: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    /// World-to-view matrix.
    pub view: Mat4,
}

impl ViewInfo {
    pub fn from_camera_transform(transform: &GlobalTransform) -> Self {
        Self {
            position: transform.translation(),
            right: transform.right().as_vec3(),
            up: transform.up().as_vec3(),
            view: transform.to_matrix().inverse(),
        }
    }

    /// Distance along the view direction; larger is farther from the viewer.
    fn depth_of(&self, position: Vec3) -> f32 {
        -self.view.transform_point3(position).z
    }
}

/// Variant-specific metadata carried alongside the copied particle bytes.
#[derive(Debug, Clone)]
pub enum ReplayVariant {
    /// Camera-facing quads; four vertices per particle.
    Sprite { material: ParticleMaterialDesc },
    /// One mesh instance per particle.
    Mesh {
        mesh: ParticleMesh,
        material: ParticleMaterialDesc,
    },
    /// Interpolated beam points between two world-space endpoints.
    Beam {
        source: Vec3,
        target: Vec3,
        points: Vec<Vec3>,
    },
}

/// An immutable per-frame copy of one emitter's simulation state, handed to
/// the render consumer.
///
/// The copy is complete: once produced, later mutation of the live buffers
/// never changes it, which is what lets a render thread keep reading last
/// frame's snapshot while the next simulation step runs.
#[derive(Debug, Clone)]
pub struct EmitterReplayData {
    /// Position of the source emitter in the owning effect's emitter list.
    pub emitter_index: usize,
    /// Number of copied particles.
    pub active_count: u32,
    /// Byte size of each copied slot.
    pub stride: usize,
    /// `active_count x stride` bytes, densely packed in live-range order.
    pub particles: Vec<u8>,
    /// Draw-order indices into the dense copy. Sorting permutes these.
    pub indices: Vec<u32>,
    pub sort_mode: SortMode,
    pub spatial_scale: f32,
    pub variant: ReplayVariant,
}

impl EmitterReplayData {
    /// The raw bytes of the dense record at `dense_index`.
    pub fn record_bytes(&self, dense_index: u32) -> &[u8] {
        let start = dense_index as usize * self.stride;
        &self.particles[start..start + self.stride]
    }

    /// The base record of the particle drawn at position `draw_index`.
    pub fn particle(&self, draw_index: usize) -> Particle {
        let dense = self.indices[draw_index];
        bytemuck::pod_read_unaligned(&self.record_bytes(dense)[..Particle::SIZE])
    }

    /// A payload slice of the particle drawn at position `draw_index`, as
    /// located by the instance's payload layout.
    pub fn payload(&self, draw_index: usize, offset: usize, len: usize) -> &[u8] {
        let dense = self.indices[draw_index];
        &self.record_bytes(dense)[offset..offset + len]
    }

    /// Applies this snapshot's sort mode to the copied index range.
    ///
    /// Stable, comparison-based, and strictly presentation-side: the live
    /// simulation buffers are never reordered.
    pub fn sort_for_view(&mut self, view: &ViewInfo) {
        let keys: Vec<f32> = match self.sort_mode {
            SortMode::Unsorted => return,
            SortMode::ViewDepth => self
                .dense_particles()
                .map(|particle| view.depth_of(Vec3::from(particle.position)))
                .collect(),
            SortMode::DistanceToView => self
                .dense_particles()
                .map(|particle| (Vec3::from(particle.position) - view.position).length_squared())
                .collect(),
            SortMode::OldestFirst => self
                .dense_particles()
                .map(|particle| particle.relative_time)
                .collect(),
            SortMode::NewestFirst => self
                .dense_particles()
                .map(|particle| -particle.relative_time)
                .collect(),
        };
        // Back-to-front: larger keys draw first.
        self.indices
            .sort_by(|a, b| keys[*b as usize].total_cmp(&keys[*a as usize]));
    }

    fn dense_particles(&self) -> impl Iterator<Item = Particle> + '_ {
        (0..self.active_count).map(|dense| {
            bytemuck::pod_read_unaligned(&self.record_bytes(dense)[..Particle::SIZE])
        })
    }
}
