use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

bitflags! {
    /// Lifecycle bits stored in [`Particle::flags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParticleFlags: u32 {
        /// Set for the whole time the particle occupies a live slot.
        const ACTIVE = 1 << 0;
        /// Set at spawn, cleared by the first aging pass that sees the particle.
        const JUST_SPAWNED = 1 << 1;
    }
}

/// Fixed-size base record for one particle.
///
/// Every particle in an emitter instance occupies one stride-sized slot in the
/// instance's [`ParticleArena`](crate::arena::ParticleArena): this record,
/// followed by the payload region granted to payload-bearing modules, padded
/// to a 16-byte boundary. The record size is the same for every particle of a
/// given instance and never changes after initialization.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Particle {
    /// World-space position.
    pub position: [f32; 3],
    /// Position at the end of the previous tick, captured before integration.
    pub old_position: [f32; 3],
    /// Current velocity, in units per second.
    pub velocity: [f32; 3],
    /// Velocity before per-tick module adjustments such as drag.
    pub base_velocity: [f32; 3],
    /// Normalized lifetime progress in `[0, 1)`. Reaching `1.0` kills the particle.
    pub relative_time: f32,
    /// Total lifetime in seconds.
    pub lifetime: f32,
    /// Rotation around the view axis, in radians.
    pub rotation: f32,
    /// Rotation rate, in radians per second.
    pub rotation_rate: f32,
    /// Per-axis size in world units.
    pub size: [f32; 3],
    /// RGBA color.
    pub color: [f32; 4],
    /// Raw [`ParticleFlags`] bits.
    pub flags: u32,
}

impl Particle {
    /// Byte size of the base record. Payload offsets start here.
    pub const SIZE: usize = size_of::<Particle>();

    pub fn flags(&self) -> ParticleFlags {
        ParticleFlags::from_bits_retain(self.flags)
    }

    pub fn set_flag(&mut self, flag: ParticleFlags, on: bool) {
        let mut flags = self.flags();
        flags.set(flag, on);
        self.flags = flags.bits();
    }

    pub fn is_active(&self) -> bool {
        self.flags().contains(ParticleFlags::ACTIVE)
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            old_position: [0.0; 3],
            velocity: [0.0; 3],
            base_velocity: [0.0; 3],
            relative_time: 0.0,
            lifetime: 1.0,
            rotation: 0.0,
            rotation_rate: 0.0,
            size: [1.0; 3],
            color: [1.0, 1.0, 1.0, 1.0],
            flags: 0,
        }
    }
}
