use bevy::prelude::*;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::arena::{ParticleArena, ResizeError};
use crate::asset::{EmitterData, EmitterSettings, EmitterShape, LodData, SpawnSettings};
use crate::layout::PayloadLayout;
use crate::particle::{Particle, ParticleFlags};
use crate::replay::{EmitterReplayData, ReplayVariant};

/// Initial buffer sizes are clamped to this range; the peak estimate is only
/// a hint and the buffers grow on demand up to the configured ceiling.
pub const INITIAL_CAPACITY_MIN: u32 = 10;
pub const INITIAL_CAPACITY_MAX: u32 = 100;

/// Lifecycle state of an [`EmitterInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceState {
    /// Created but not initialized; simulates nothing.
    #[default]
    Uninitialized,
    /// Spawning and ticking every frame.
    Active,
    /// No new particles spawn, but existing ones keep aging and rendering.
    Idle,
    /// Buffers released; the instance is about to be dropped or rebuilt.
    Destroyed,
}

/// Precomputed execution data for one LOD level: the payload layout and the
/// capability sub-lists. Only these sub-lists are iterated per frame, never
/// the full module list.
#[derive(Debug, Clone)]
pub struct LodLevel {
    lod_index: usize,
    layout: PayloadLayout,
    spawn_modules: Vec<usize>,
    update_modules: Vec<usize>,
}

impl LodLevel {
    pub fn new(lod_index: usize, data: &LodData) -> Self {
        let layout = PayloadLayout::compute(&data.modules);
        let capable = |pred: fn(&crate::modules::ModuleConfig) -> bool| {
            data.modules
                .iter()
                .enumerate()
                .filter(move |(_, module)| pred(module))
                .map(|(index, _)| index)
                .collect::<Vec<_>>()
        };
        Self {
            lod_index,
            layout,
            spawn_modules: capable(crate::modules::ModuleConfig::is_spawn_capable),
            update_modules: capable(crate::modules::ModuleConfig::is_update_capable),
        }
    }

    pub fn lod_index(&self) -> usize {
        self.lod_index
    }

    pub fn layout(&self) -> &PayloadLayout {
        &self.layout
    }

    /// Indices into the LOD's module list, in configured order.
    pub fn spawn_modules(&self) -> &[usize] {
        &self.spawn_modules
    }

    pub fn update_modules(&self) -> &[usize] {
        &self.update_modules
    }
}

/// The runtime engine executing one emitter template for one owning component.
///
/// Owns the particle buffers exclusively; the template is read-only and owned
/// by the asset layer, so every operation that needs configuration takes the
/// emitter/LOD data as a parameter.
pub struct EmitterInstance {
    state: InstanceState,
    emitter_index: usize,
    lod: Option<LodLevel>,
    arena: Option<ParticleArena>,
    rng: SmallRng,
    next_particle_id: u64,
    spawn_fraction: f32,
    time: f32,
    prev_time: f32,
    loop_count: u32,
    beam_points: Vec<Vec3>,
}

impl EmitterInstance {
    pub fn new(emitter_index: usize, fixed_seed: Option<u32>) -> Self {
        Self {
            state: InstanceState::Uninitialized,
            emitter_index,
            lod: None,
            arena: None,
            rng: seeded_rng(fixed_seed),
            next_particle_id: 0,
            spawn_fraction: 0.0,
            time: 0.0,
            prev_time: 0.0,
            loop_count: 0,
            beam_points: Vec::new(),
        }
    }

    /// Selects a LOD level and sizes the particle buffers for it.
    ///
    /// A missing LOD level is not an error: the instance becomes active but
    /// simulates nothing and produces no replay data. Switching levels later
    /// rebuilds the buffers, since the stride may change.
    pub fn initialize(
        &mut self,
        emitter: &EmitterData,
        lod_index: usize,
    ) -> Result<(), ResizeError> {
        self.state = InstanceState::Active;
        let Some(lod_data) = emitter.lods.get(lod_index) else {
            self.lod = None;
            self.arena = None;
            return Ok(());
        };

        let level = LodLevel::new(lod_index, lod_data);
        let ceiling = lod_data.settings.max_particles.max(1);
        let capacity = lod_data
            .estimate_peak_active()
            .clamp(INITIAL_CAPACITY_MIN, INITIAL_CAPACITY_MAX)
            .min(ceiling);
        let arena = ParticleArena::new(level.layout().stride(), capacity)?;

        self.lod = Some(level);
        self.arena = Some(arena);
        Ok(())
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn emitter_index(&self) -> usize {
        self.emitter_index
    }

    pub fn lod_index(&self) -> Option<usize> {
        self.lod.as_ref().map(LodLevel::lod_index)
    }

    pub fn lod_level(&self) -> Option<&LodLevel> {
        self.lod.as_ref()
    }

    /// Read-only view of the particle buffers, if initialized.
    pub fn arena(&self) -> Option<&ParticleArena> {
        self.arena.as_ref()
    }

    pub fn active_count(&self) -> u32 {
        self.arena.as_ref().map_or(0, ParticleArena::active)
    }

    pub fn max_active(&self) -> u32 {
        self.arena.as_ref().map_or(0, ParticleArena::capacity)
    }

    pub fn stride(&self) -> usize {
        self.lod.as_ref().map_or(0, |level| level.layout().stride())
    }

    /// Total particles ever spawned. Ids are never reused.
    pub fn particles_spawned(&self) -> u64 {
        self.next_particle_id
    }

    /// Position on the emitter's loop clock, in `[0, duration]`.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Carried sub-integer remainder of the rate calculation.
    pub fn spawn_fraction(&self) -> f32 {
        self.spawn_fraction
    }

    /// World-space points of a beam emitter, recomputed every tick.
    pub fn beam_points(&self) -> &[Vec3] {
        &self.beam_points
    }

    /// Advances the loop-wrapped clock. When the configured loop count runs
    /// out the instance goes idle, so existing particles age out but nothing
    /// new spawns.
    pub fn advance_clock(&mut self, settings: &EmitterSettings, dt: f32) {
        self.prev_time = self.time;
        self.time += dt;
        let duration = settings.duration;
        if duration > 0.0 && self.time >= duration {
            if settings.loops > 0 && self.loop_count + 1 >= settings.loops {
                self.time = duration;
                if self.state == InstanceState::Active {
                    self.state = InstanceState::Idle;
                }
            } else {
                self.time %= duration;
                self.loop_count += 1;
            }
        }
    }

    /// Number of particles the continuous rate asks for this tick.
    ///
    /// The fractional remainder carries across ticks, so the long-run total
    /// converges to `rate x elapsed` within one particle at any frame rate.
    pub fn rate_spawn_count(&mut self, spawn: &SpawnSettings, dt: f32) -> u32 {
        let rate = spawn.rate.sample(&mut self.rng) * spawn.rate_scale.sample(&mut self.rng);
        let desired = self.spawn_fraction + (rate * dt).max(0.0);
        let count = desired.floor();
        self.spawn_fraction = desired - count;
        count as u32
    }

    /// Number of particles the burst schedule asks for this tick.
    ///
    /// Evaluates the half-open window between the previous and current clock
    /// positions; a window that straddles the loop boundary is treated as two
    /// sub-windows, so a burst at time zero fires exactly once per loop.
    pub fn burst_spawn_count(&mut self, spawn: &SpawnSettings, duration: f32) -> u32 {
        if spawn.bursts.is_empty() || duration <= 0.0 {
            return 0;
        }
        let old = self.prev_time;
        let new = self.time;

        let mut total: u64 = 0;
        for burst in &spawn.bursts {
            let hit = if new >= old {
                burst.time >= old && burst.time < new
            } else {
                burst.time >= old || burst.time < new
            };
            if !hit {
                continue;
            }
            let count = match burst.count_low {
                Some(low) if low < burst.count => self.rng.gen_range(low..=burst.count),
                Some(low) => low.min(burst.count),
                None => burst.count,
            };
            total += u64::from(count);
        }
        if total == 0 {
            return 0;
        }
        let scale = spawn.burst_scale.sample(&mut self.rng).max(0.0);
        (total as f32 * scale).round() as u32
    }

    /// Spawns up to `count` particles, stopping silently when the arena is
    /// full.
    ///
    /// Particle `i` gets the sub-frame offset `start_time - i * increment`;
    /// a positive offset forward-integrates the particle's position so that
    /// particles born mid-frame do not all appear at the emitter origin.
    /// Returns how many particles were actually spawned.
    pub fn spawn(
        &mut self,
        lod_data: &LodData,
        count: u32,
        start_time: f32,
        increment: f32,
        location: Vec3,
        velocity: Vec3,
    ) -> u32 {
        if count == 0 || self.state != InstanceState::Active {
            return 0;
        }
        let Some(level) = self.lod.as_ref() else {
            return 0;
        };
        let Some(arena) = self.arena.as_mut() else {
            return 0;
        };

        let mut spawned = 0;
        for i in 0..count {
            let Some(slot) = arena.acquire() else {
                break;
            };
            let offset = (start_time - increment * i as f32).max(0.0);

            let (particle, payload) = arena.record_mut(slot);
            *particle = Particle {
                position: location.to_array(),
                old_position: location.to_array(),
                velocity: velocity.to_array(),
                base_velocity: velocity.to_array(),
                flags: (ParticleFlags::ACTIVE | ParticleFlags::JUST_SPAWNED).bits(),
                ..Default::default()
            };

            for &module_index in level.spawn_modules() {
                let bytes = level.layout().module_bytes(payload, module_index);
                lod_data.modules[module_index].spawn(particle, bytes, &mut self.rng);
            }

            if offset > 0.0 {
                let velocity = Vec3::from(particle.velocity);
                particle.position = (Vec3::from(particle.position) + velocity * offset).to_array();
            }

            self.next_particle_id += 1;
            spawned += 1;
        }
        spawned
    }

    /// Ages, integrates and removes particles, then runs the update-capable
    /// modules over the surviving range.
    ///
    /// Beam emitters skip all of that and recompute their point list from the
    /// given origin instead.
    pub fn tick(&mut self, emitter: &EmitterData, lod_data: &LodData, origin: Vec3, dt: f32) {
        if matches!(
            self.state,
            InstanceState::Uninitialized | InstanceState::Destroyed
        ) {
            return;
        }

        if let EmitterShape::Beam {
            source_offset,
            target_offset,
            segments,
        } = &emitter.variant
        {
            self.rebuild_beam(origin + *source_offset, origin + *target_offset, *segments);
            return;
        }

        let Some(level) = self.lod.as_ref() else {
            return;
        };
        let Some(arena) = self.arena.as_mut() else {
            return;
        };

        // Aging pass, in reverse so a swap removal never skips an entry.
        let mut i = arena.active();
        while i > 0 {
            i -= 1;
            let slot = arena.slot_at(i);
            let expired = {
                let particle = arena.particle_mut(slot);
                particle.relative_time += dt / particle.lifetime.max(f32::EPSILON);
                particle.relative_time >= 1.0
            };
            if expired {
                arena.swap_remove(i);
                continue;
            }
            let particle = arena.particle_mut(slot);
            particle.old_position = particle.position;
            let velocity = Vec3::from(particle.velocity);
            particle.position = (Vec3::from(particle.position) + velocity * dt).to_array();
            particle.rotation += particle.rotation_rate * dt;
            particle.set_flag(ParticleFlags::JUST_SPAWNED, false);
        }

        // Module pass over the (possibly shrunk) active range.
        for &module_index in level.update_modules() {
            let payload = level.layout().slice_of(module_index);
            lod_data.modules[module_index].update(arena, payload, dt);
        }
    }

    fn rebuild_beam(&mut self, source: Vec3, target: Vec3, segments: u32) {
        let count = segments.max(2);
        self.beam_points.clear();
        for i in 0..count {
            let t = i as f32 / (count - 1) as f32;
            self.beam_points.push(source.lerp(target, t));
        }
    }

    /// Grows the particle buffers. A no-op for targets at or below the
    /// current capacity; on failure the previous buffers stay usable.
    pub fn resize(&mut self, new_max: u32) -> Result<(), ResizeError> {
        match self.arena.as_mut() {
            Some(arena) => arena.grow(new_max),
            None => Ok(()),
        }
    }

    /// Makes room for `needed_active` live particles, growing up to `ceiling`.
    ///
    /// Returns `false` when the instance stays at its current capacity, either
    /// because the ceiling was reached or because the allocation failed; the
    /// caller then simply spawns fewer particles than requested.
    pub fn ensure_capacity(&mut self, needed_active: u32, ceiling: u32) -> bool {
        let Some(arena) = self.arena.as_mut() else {
            return false;
        };
        let needed = needed_active.min(ceiling.max(1));
        if needed <= arena.capacity() {
            return true;
        }
        let target = arena
            .capacity()
            .saturating_mul(2)
            .clamp(needed, ceiling.max(1));
        match arena.grow(target) {
            Ok(()) => true,
            Err(err) => {
                warn!("emitter {} degraded: {err}", self.emitter_index);
                false
            }
        }
    }

    /// Discards all live particles instantly without touching buffer sizes.
    pub fn reset(&mut self) {
        if let Some(arena) = self.arena.as_mut() {
            arena.clear();
        }
        self.spawn_fraction = 0.0;
    }

    /// [`reset`](Self::reset) plus a clock rewind and a reseed, so the emitter
    /// replays from the start.
    pub fn restart(&mut self, fixed_seed: Option<u32>) {
        self.reset();
        self.time = 0.0;
        self.prev_time = 0.0;
        self.loop_count = 0;
        self.beam_points.clear();
        self.rng = seeded_rng(fixed_seed);
        if self.state == InstanceState::Idle {
            self.state = InstanceState::Active;
        }
    }

    /// Stops spawning; existing particles keep aging and rendering.
    pub fn deactivate(&mut self) {
        if self.state == InstanceState::Active {
            self.state = InstanceState::Idle;
        }
    }

    pub fn activate(&mut self) {
        if self.state == InstanceState::Idle {
            self.state = InstanceState::Active;
        }
    }

    /// Releases the buffers ahead of a rebuild or drop.
    pub fn destroy(&mut self) {
        self.state = InstanceState::Destroyed;
        self.lod = None;
        self.arena = None;
        self.beam_points.clear();
    }

    /// Produces the per-frame snapshot for the render consumer, or `None`
    /// when there is nothing to render.
    ///
    /// The copy is compacted: live slots are written densely in index order
    /// and the copied index entries address the dense records, so the
    /// snapshot is self-contained at `active_count x stride` bytes. Sorting
    /// is applied to the copy afterwards, never to the live buffers.
    pub fn fill_replay_data(&self, emitter: &EmitterData) -> Option<EmitterReplayData> {
        if matches!(
            self.state,
            InstanceState::Uninitialized | InstanceState::Destroyed
        ) {
            return None;
        }

        if matches!(emitter.variant, EmitterShape::Beam { .. }) {
            let (source, target) = match (self.beam_points.first(), self.beam_points.last()) {
                (Some(first), Some(last)) => (*first, *last),
                _ => return None,
            };
            return Some(EmitterReplayData {
                emitter_index: self.emitter_index,
                active_count: 0,
                stride: 0,
                particles: Vec::new(),
                indices: Vec::new(),
                sort_mode: emitter.sort_mode,
                spatial_scale: emitter.spatial_scale,
                variant: ReplayVariant::Beam {
                    source,
                    target,
                    points: self.beam_points.clone(),
                },
            });
        }

        self.lod.as_ref()?;
        let arena = self.arena.as_ref()?;
        if arena.is_empty() {
            return None;
        }

        let stride = arena.stride();
        let active = arena.active();
        let mut particles = vec![0u8; active as usize * stride];
        for (dense, &slot) in arena.live_slots().iter().enumerate() {
            particles[dense * stride..(dense + 1) * stride]
                .copy_from_slice(arena.slot_bytes(slot));
        }

        // Beams returned above, so anything else renders as a sprite unless
        // it carries a mesh.
        let variant = if let EmitterShape::Mesh { mesh } = &emitter.variant {
            ReplayVariant::Mesh {
                mesh: mesh.clone(),
                material: emitter.material.clone(),
            }
        } else {
            ReplayVariant::Sprite {
                material: emitter.material.clone(),
            }
        };

        Some(EmitterReplayData {
            emitter_index: self.emitter_index,
            active_count: active,
            stride,
            particles,
            indices: (0..active).collect(),
            sort_mode: emitter.sort_mode,
            spatial_scale: emitter.spatial_scale,
            variant,
        })
    }
}

fn seeded_rng(fixed_seed: Option<u32>) -> SmallRng {
    match fixed_seed {
        Some(seed) => SmallRng::seed_from_u64(u64::from(seed)),
        None => SmallRng::from_entropy(),
    }
}
