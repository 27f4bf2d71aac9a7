//! Nearest-seed field records and the CPU-side field buffer.
//!
//! A record is either empty (no seed known yet) or names the pixel coordinate
//! of the nearest seed seen so far together with the squared distance to it.
//! On the GPU the same record is packed into one `Rgba32Float` texel.

use bevy::math::{IVec2, UVec2};
use constants::field::{FIELD_CHANNELS, SENTINEL_TEXEL};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FieldRecord {
    #[default]
    Empty,
    Seed { x: u32, y: u32, dist_sq: f32 },
}

impl FieldRecord {
    /// The record every pixel starts from before seeding.
    pub const SENTINEL: FieldRecord = FieldRecord::Empty;

    /// Record for a pixel covered by seed geometry: its own coordinate at distance 0.
    pub fn seed_at(pixel: UVec2) -> Self {
        FieldRecord::Seed {
            x: pixel.x,
            y: pixel.y,
            dist_sq: 0.0,
        }
    }

    pub fn seed(&self) -> Option<UVec2> {
        match *self {
            FieldRecord::Seed { x, y, .. } => Some(UVec2::new(x, y)),
            FieldRecord::Empty => None,
        }
    }

    pub fn has_seed(&self) -> bool {
        matches!(self, FieldRecord::Seed { .. })
    }

    pub fn distance_sq(&self) -> Option<f32> {
        match *self {
            FieldRecord::Seed { dist_sq, .. } => Some(dist_sq),
            FieldRecord::Empty => None,
        }
    }

    /// Re-targets this record's seed at `pixel`, recomputing the squared distance.
    /// Empty records stay empty.
    pub fn relative_to(&self, pixel: UVec2) -> FieldRecord {
        match *self {
            FieldRecord::Seed { x, y, .. } => FieldRecord::Seed {
                x,
                y,
                dist_sq: squared_distance(UVec2::new(x, y), pixel),
            },
            FieldRecord::Empty => FieldRecord::Empty,
        }
    }

    /// Packs the record into the texel layout the shaders read.
    pub fn to_texel(&self) -> [f32; FIELD_CHANNELS] {
        match *self {
            FieldRecord::Seed { x, y, dist_sq } => [x as f32, y as f32, dist_sq, 0.0],
            FieldRecord::Empty => SENTINEL_TEXEL,
        }
    }

    /// Unpacks a texel. Seed coordinates are never negative, so a negative
    /// coordinate channel alone marks the sentinel.
    pub fn from_texel(texel: [f32; FIELD_CHANNELS]) -> Self {
        let [x, y, dist_sq, _] = texel;
        if x < 0.0 || y < 0.0 || !x.is_finite() || !y.is_finite() {
            return FieldRecord::Empty;
        }
        FieldRecord::Seed {
            x: x as u32,
            y: y as u32,
            dist_sq,
        }
    }
}

/// Exact squared pixel distance, computed in integers before the float conversion.
pub fn squared_distance(a: UVec2, b: UVec2) -> f32 {
    let d = a.as_i64vec2() - b.as_i64vec2();
    (d.x * d.x + d.y * d.y) as f32
}

/// A `width * height` grid of field records, row-major with y growing downwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBuffer {
    size: UVec2,
    records: Vec<FieldRecord>,
}

impl FieldBuffer {
    pub fn new(size: UVec2) -> Self {
        Self {
            size,
            records: vec![FieldRecord::SENTINEL; (size.x * size.y) as usize],
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.x
    }

    pub fn height(&self) -> u32 {
        self.size.y
    }

    pub fn contains(&self, pixel: IVec2) -> bool {
        pixel.x >= 0
            && pixel.y >= 0
            && (pixel.x as u32) < self.size.x
            && (pixel.y as u32) < self.size.y
    }

    pub fn get(&self, pixel: UVec2) -> FieldRecord {
        self.records[self.index(pixel)]
    }

    /// Like [`FieldBuffer::get`], but positions outside the grid read as the sentinel.
    pub fn sample(&self, pixel: IVec2) -> FieldRecord {
        if self.contains(pixel) {
            self.get(pixel.as_uvec2())
        } else {
            FieldRecord::SENTINEL
        }
    }

    pub fn set(&mut self, pixel: UVec2, record: FieldRecord) {
        let index = self.index(pixel);
        self.records[index] = record;
    }

    pub fn fill(&mut self, record: FieldRecord) {
        self.records.fill(record);
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [FieldRecord] {
        &mut self.records
    }

    /// Iterates `(pixel, record)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (UVec2, FieldRecord)> + '_ {
        let width = self.size.x.max(1);
        self.records.iter().enumerate().map(move |(i, record)| {
            let i = i as u32;
            (UVec2::new(i % width, i / width), *record)
        })
    }

    pub fn seeded_pixels(&self) -> usize {
        self.records.iter().filter(|r| r.has_seed()).count()
    }

    pub fn is_all_sentinel(&self) -> bool {
        self.records.iter().all(|r| !r.has_seed())
    }

    fn index(&self, pixel: UVec2) -> usize {
        debug_assert!(pixel.x < self.size.x && pixel.y < self.size.y);
        (pixel.y * self.size.x + pixel.x) as usize
    }
}
