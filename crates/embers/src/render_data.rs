use bevy::prelude::*;
use bytemuck::{Pod, Zeroable};

use crate::asset::LodData;
use crate::layout::PayloadLayout;
use crate::modules::{MeshRotationPayload, ModuleConfig};
use crate::replay::{EmitterReplayData, ViewInfo};

/// One corner of a camera-facing particle quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// Per-particle instance data for mesh emitters.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct MeshInstance {
    /// Column-major world transform.
    pub transform: [f32; 16],
    pub color: [f32; 4],
    pub velocity: [f32; 3],
    pub _pad: f32,
}

/// Where a snapshot's flipbook payload lives and how the sheet is tiled.
#[derive(Debug, Clone, Copy)]
pub struct FlipbookParams {
    pub payload_offset: usize,
    pub columns: u32,
    pub rows: u32,
}

/// Locates the flipbook payload for snapshots taken from `lod`, if the LOD
/// runs a flipbook module.
pub fn flipbook_params(lod: &LodData, layout: &PayloadLayout) -> Option<FlipbookParams> {
    lod.modules.iter().enumerate().find_map(|(index, module)| {
        let ModuleConfig::Flipbook { columns, rows, .. } = module else {
            return None;
        };
        let slice = layout.slice_of(index)?;
        Some(FlipbookParams {
            payload_offset: slice.offset,
            columns: (*columns).max(1),
            rows: (*rows).max(1),
        })
    })
}

/// Locates the mesh-rotation payload for snapshots taken from `lod`, if the
/// LOD runs a mesh-rotation module.
pub fn mesh_rotation_offset(lod: &LodData, layout: &PayloadLayout) -> Option<usize> {
    lod.modules.iter().enumerate().find_map(|(index, module)| {
        matches!(module, ModuleConfig::MeshRotation { .. })
            .then(|| layout.slice_of(index))
            .flatten()
            .map(|slice| slice.offset)
    })
}

const QUAD_CORNERS: [(f32, f32); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
const QUAD_UVS: [(f32, f32); 4] = [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)];

/// Expands a sprite snapshot into four camera-facing vertices per particle,
/// in draw order. The byte range of the result is what a GPU buffer updater
/// uploads; this core does no upload itself.
pub fn build_sprite_vertices(
    replay: &EmitterReplayData,
    view: &ViewInfo,
    flipbook: Option<FlipbookParams>,
) -> Vec<SpriteVertex> {
    let mut vertices = Vec::with_capacity(replay.active_count as usize * 4);

    for draw_index in 0..replay.indices.len() {
        let particle = replay.particle(draw_index);
        let position = Vec3::from(particle.position);
        let half_width = particle.size[0] * replay.spatial_scale;
        let half_height = particle.size[1] * replay.spatial_scale;
        let (sin, cos) = particle.rotation.sin_cos();

        let (uv_origin, uv_size) = match flipbook {
            Some(params) => {
                let raw = replay.payload(draw_index, params.payload_offset, 4);
                let frame = f32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]);
                let total = params.columns * params.rows;
                let index = (frame.max(0.0) as u32).min(total.saturating_sub(1));
                let size = Vec2::new(
                    1.0 / params.columns as f32,
                    1.0 / params.rows as f32,
                );
                let origin = Vec2::new(
                    (index % params.columns) as f32 * size.x,
                    (index / params.columns) as f32 * size.y,
                );
                (origin, size)
            }
            None => (Vec2::ZERO, Vec2::ONE),
        };

        for (corner, uv) in QUAD_CORNERS.iter().zip(QUAD_UVS.iter()) {
            let local_x = corner.0 * half_width;
            let local_y = corner.1 * half_height;
            let rotated_x = local_x * cos - local_y * sin;
            let rotated_y = local_x * sin + local_y * cos;
            let world = position + view.right * rotated_x + view.up * rotated_y;
            vertices.push(SpriteVertex {
                position: world.to_array(),
                uv: [
                    uv_origin.x + uv.0 * uv_size.x,
                    uv_origin.y + uv.1 * uv_size.y,
                ],
                color: particle.color,
            });
        }
    }

    vertices
}

/// Expands a mesh snapshot into one instance per particle, in draw order.
///
/// When the LOD runs a mesh-rotation module its payload triplet drives the
/// instance orientation; otherwise the scalar view-axis rotation is used.
pub fn build_mesh_instances(
    replay: &EmitterReplayData,
    mesh_rotation: Option<usize>,
) -> Vec<MeshInstance> {
    let mut instances = Vec::with_capacity(replay.active_count as usize);

    for draw_index in 0..replay.indices.len() {
        let particle = replay.particle(draw_index);
        let rotation = match mesh_rotation {
            Some(offset) => {
                let data: MeshRotationPayload = bytemuck::pod_read_unaligned(replay.payload(
                    draw_index,
                    offset,
                    size_of::<MeshRotationPayload>(),
                ));
                Quat::from_euler(
                    EulerRot::XYZ,
                    data.rotation[0],
                    data.rotation[1],
                    data.rotation[2],
                )
            }
            None => Quat::from_rotation_z(particle.rotation),
        };
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::from(particle.size) * replay.spatial_scale,
            rotation,
            Vec3::from(particle.position),
        );
        instances.push(MeshInstance {
            transform: transform.to_cols_array(),
            color: particle.color,
            velocity: particle.velocity,
            _pad: 0.0,
        });
    }

    instances
}
