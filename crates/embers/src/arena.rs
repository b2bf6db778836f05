use std::collections::TryReserveError;

use thiserror::Error;

use crate::layout::STRIDE_ALIGNMENT;
use crate::particle::Particle;

/// Growing the arena failed. The previous buffers are left intact, so the
/// caller can keep simulating at the old capacity.
#[derive(Debug, Error)]
#[error("could not grow particle buffers to {requested} slots")]
pub struct ResizeError {
    /// The capacity that was requested.
    pub requested: u32,
    #[source]
    source: TryReserveError,
}

/// Packed storage for the particles of one emitter instance.
///
/// One contiguous buffer holds `capacity` stride-sized slots. A slot id is a
/// stable handle to one slot for as long as the particle in it lives; the
/// index array keeps the ids of all live particles densely packed in
/// `[0, active)`, which makes removal an O(1) swap and iteration a linear
/// walk. Slot bytes are never cleared on removal, only forgotten.
///
/// The backing storage is 16-byte aligned and the stride is a multiple of 16,
/// so a typed view of any slot's base record is always aligned.
pub struct ParticleArena {
    data: Vec<u128>,
    indices: Vec<u32>,
    stride: usize,
    capacity: u32,
    active: u32,
}

impl ParticleArena {
    /// Allocates an arena of `capacity` slots with an identity slot mapping.
    ///
    /// `stride` must be a multiple of 16 and large enough for the base record,
    /// as computed by [`PayloadLayout`](crate::layout::PayloadLayout).
    pub fn new(stride: usize, capacity: u32) -> Result<Self, ResizeError> {
        debug_assert!(stride >= Particle::SIZE && stride % STRIDE_ALIGNMENT == 0);
        let mut arena = Self {
            data: Vec::new(),
            indices: Vec::new(),
            stride,
            capacity: 0,
            active: 0,
        };
        arena.grow(capacity)?;
        Ok(arena)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn active(&self) -> u32 {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Slot ids of all live particles, densely packed. Order is arbitrary
    /// except for the transient effect of swap removal.
    pub fn live_slots(&self) -> &[u32] {
        &self.indices[..self.active as usize]
    }

    /// The slot id stored at position `live_idx` of the live range.
    pub fn slot_at(&self, live_idx: u32) -> u32 {
        self.indices[live_idx as usize]
    }

    /// Claims the next free slot and extends the live range over it.
    /// Returns `None` when the arena is full.
    pub fn acquire(&mut self) -> Option<u32> {
        if self.active == self.capacity {
            return None;
        }
        let slot = self.indices[self.active as usize];
        self.active += 1;
        Some(slot)
    }

    /// Removes the live entry at position `live_idx` by swapping it with the
    /// last live entry and shrinking the live range. O(1); the slot's bytes
    /// are left as-is and its id becomes reusable.
    pub fn swap_remove(&mut self, live_idx: u32) {
        debug_assert!(live_idx < self.active);
        self.indices
            .swap(live_idx as usize, self.active as usize - 1);
        self.active -= 1;
    }

    /// Forgets all live particles at once. Buffers keep their size and the
    /// index array keeps its (permuted) mapping.
    pub fn clear(&mut self) {
        self.active = 0;
    }

    /// Grows both buffers to `new_capacity` slots, preserving existing bytes
    /// and extending the index array with an identity mapping. A no-op when
    /// `new_capacity` does not exceed the current capacity; never shrinks.
    pub fn grow(&mut self, new_capacity: u32) -> Result<(), ResizeError> {
        if new_capacity <= self.capacity {
            return Ok(());
        }

        let words_per_slot = self.stride / size_of::<u128>();
        let total_words = new_capacity as usize * words_per_slot;
        let map_err = |source| ResizeError {
            requested: new_capacity,
            source,
        };
        self.data
            .try_reserve_exact(total_words - self.data.len())
            .map_err(map_err)?;
        self.indices
            .try_reserve_exact(new_capacity as usize + 1 - self.indices.len())
            .map_err(map_err)?;

        self.data.resize(total_words, 0);
        // The spare entry at the old capacity position already holds the old
        // capacity value, which is a valid slot id from now on.
        let first_new = if self.capacity == 0 { 0 } else { self.capacity + 1 };
        self.indices.extend(first_new..=new_capacity);
        self.capacity = new_capacity;
        Ok(())
    }

    /// The whole buffer as raw bytes.
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// The raw bytes of one slot.
    pub fn slot_bytes(&self, slot: u32) -> &[u8] {
        let start = slot as usize * self.stride;
        &self.bytes()[start..start + self.stride]
    }

    fn slot_bytes_mut(&mut self, slot: u32) -> &mut [u8] {
        let start = slot as usize * self.stride;
        let stride = self.stride;
        &mut bytemuck::cast_slice_mut(&mut self.data)[start..start + stride]
    }

    /// Typed view of a slot's base record.
    pub fn particle(&self, slot: u32) -> &Particle {
        bytemuck::from_bytes(&self.slot_bytes(slot)[..Particle::SIZE])
    }

    pub fn particle_mut(&mut self, slot: u32) -> &mut Particle {
        bytemuck::from_bytes_mut(&mut self.slot_bytes_mut(slot)[..Particle::SIZE])
    }

    /// Splits a slot into its base record and payload region.
    pub fn record_mut(&mut self, slot: u32) -> (&mut Particle, &mut [u8]) {
        let (record, payload) = self.slot_bytes_mut(slot).split_at_mut(Particle::SIZE);
        (bytemuck::from_bytes_mut(record), payload)
    }
}
