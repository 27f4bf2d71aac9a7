//! Jump flood propagation of nearest-seed records.
//!
//! One step with jump distance `d` reads the current field at the pixel itself
//! and at the eight positions `d` pixels away along both axes and diagonals,
//! keeps the candidate whose seed is closest to the pixel, and writes it to the
//! next field. Steps run over a halving jump sequence ending at 1.

use bevy::math::{IVec2, UVec2};
use constants::jump_flood::{MAX_JUMP, MIN_JUMP, THREAD_GROUP_SIZE_X, THREAD_GROUP_SIZE_Y};
use rayon::prelude::*;

use crate::engine::field::{FieldBuffer, FieldRecord};

/// Stencil offsets in scan order. Ties keep the first minimum in this order.
pub const STENCIL: [IVec2; 9] = [
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 0),
    IVec2::new(0, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

/// First jump distance for an outline `width_px` wide:
/// `max(1, next_power_of_two(ceil(width_px)) / 2)`.
pub fn initial_jump(width_px: f32) -> u32 {
    let width = if width_px.is_finite() && width_px > 1.0 {
        width_px.ceil() as u32
    } else {
        1
    };
    // Widths past 2^31 have no u32 power of two above them.
    let ceiling = width.checked_next_power_of_two().unwrap_or(MAX_JUMP * 2);
    (ceiling / 2).max(MIN_JUMP)
}

/// Halving sequence of jump distances, from a power of two down to exactly 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpSequence {
    next: u32,
}

impl JumpSequence {
    /// Starts at `first`, rounded down to a power of two and never below 1.
    pub fn starting_at(first: u32) -> Self {
        let first = first.max(MIN_JUMP);
        Self {
            next: 1 << (31 - first.leading_zeros()),
        }
    }

    pub fn for_width(width_px: f32) -> Self {
        Self::starting_at(initial_jump(width_px))
    }

    /// Largest offset, per axis, a seed can travel over the whole sequence.
    pub fn reach(&self) -> u32 {
        self.next.saturating_mul(2).saturating_sub(1)
    }
}

impl Iterator for JumpSequence {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next == 0 {
            return None;
        }
        let jump = self.next;
        self.next /= 2;
        Some(jump)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl ExactSizeIterator for JumpSequence {
    fn len(&self) -> usize {
        (u32::BITS - self.next.leading_zeros()) as usize
    }
}

/// Parameters of one jump flood dispatch over a `size` grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpFloodDispatch {
    pub size: UVec2,
    pub jump: u32,
    pub groups: UVec2,
}

impl JumpFloodDispatch {
    pub fn new(size: UVec2, jump: u32) -> Self {
        Self {
            size,
            jump,
            groups: UVec2::new(
                size.x.div_ceil(THREAD_GROUP_SIZE_X),
                size.y.div_ceil(THREAD_GROUP_SIZE_Y),
            ),
        }
    }
}

/// CPU kernel mirroring `jfa_step.wgsl`. Rows are processed in parallel.
pub struct JumpFloodStepper;

impl JumpFloodStepper {
    /// Runs one step from `current` into `next`. Both buffers must share a size
    /// and must be distinct, which the borrow rules already guarantee here.
    pub fn step(current: &FieldBuffer, next: &mut FieldBuffer, jump: u32) {
        debug_assert_eq!(current.size(), next.size());
        debug_assert!(jump >= MIN_JUMP);

        let width = current.width() as usize;
        if width == 0 {
            return;
        }

        next.records_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    *out = Self::nearest_candidate(current, UVec2::new(x as u32, y as u32), jump);
                }
            });
    }

    /// The stencil search for a single pixel.
    pub fn nearest_candidate(current: &FieldBuffer, pixel: UVec2, jump: u32) -> FieldRecord {
        let origin = pixel.as_ivec2();
        let jump = jump as i32;

        let mut best = FieldRecord::SENTINEL;
        for offset in STENCIL {
            let candidate = current.sample(origin + offset * jump).relative_to(pixel);
            let Some(dist_sq) = candidate.distance_sq() else {
                continue;
            };
            match best.distance_sq() {
                Some(best_sq) if best_sq <= dist_sq => {}
                _ => best = candidate,
            }
        }
        best
    }
}
