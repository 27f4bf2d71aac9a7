//! Seed rasterization: geometry selection by layer mask and the CPU seed pass.

use bevy::math::{IVec2, UVec2, Vec2};
use bevy::prelude::*;
use bevy::render::extract_component::ExtractComponent;
use constants::render_settings::LAYER_COUNT;
use serde::{Deserialize, Serialize};

use crate::engine::field::{FieldBuffer, FieldRecord};

/// 32-bit mask of outline layers. Bit `n` selects geometry on layer `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);

    pub fn layer(layer: u8) -> Self {
        LayerMask(0).with(layer)
    }

    pub fn with(self, layer: u8) -> Self {
        if layer < LAYER_COUNT {
            LayerMask(self.0 | (1 << layer))
        } else {
            self
        }
    }

    pub fn contains(&self, layer: u8) -> bool {
        layer < LAYER_COUNT && self.0 & (1 << layer) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Outline layer of a mesh entity. Each entity sits on exactly one layer.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, ExtractComponent)]
pub struct OutlineLayer(pub u8);

/// Anything the software backend can rasterize into a seed buffer.
///
/// Coverage follows the usual raster rule: a pixel is covered when its centre
/// lies inside the shape.
pub trait Drawable: Send + Sync {
    fn layer(&self) -> u8;

    /// Calls `emit` once for every covered pixel inside a `size` grid.
    fn rasterize(&self, size: UVec2, emit: &mut dyn FnMut(UVec2));
}

/// An explicit list of pixels; entries outside the grid are dropped.
#[derive(Debug, Clone)]
pub struct PixelSet {
    pub layer: u8,
    pub pixels: Vec<UVec2>,
}

impl Drawable for PixelSet {
    fn layer(&self) -> u8 {
        self.layer
    }

    fn rasterize(&self, size: UVec2, emit: &mut dyn FnMut(UVec2)) {
        self.pixels
            .iter()
            .filter(|p| p.x < size.x && p.y < size.y)
            .for_each(|p| emit(*p));
    }
}

/// Axis-aligned rectangle covering `min..max` (max exclusive), clipped to the grid.
#[derive(Debug, Clone, Copy)]
pub struct RectShape {
    pub layer: u8,
    pub min: IVec2,
    pub max: IVec2,
}

impl Drawable for RectShape {
    fn layer(&self) -> u8 {
        self.layer
    }

    fn rasterize(&self, size: UVec2, emit: &mut dyn FnMut(UVec2)) {
        let lo = self.min.max(IVec2::ZERO);
        let hi = self.max.min(size.as_ivec2());
        for y in lo.y..hi.y {
            for x in lo.x..hi.x {
                emit(UVec2::new(x as u32, y as u32));
            }
        }
    }
}

/// Filled disc in pixel space.
#[derive(Debug, Clone, Copy)]
pub struct DiscShape {
    pub layer: u8,
    pub center: Vec2,
    pub radius: f32,
}

impl Drawable for DiscShape {
    fn layer(&self) -> u8 {
        self.layer
    }

    fn rasterize(&self, size: UVec2, emit: &mut dyn FnMut(UVec2)) {
        let lo = (self.center - self.radius).floor().max(Vec2::ZERO).as_uvec2();
        let hi = (self.center + self.radius).ceil().as_uvec2().min(size);
        let radius_sq = self.radius * self.radius;
        for y in lo.y..hi.y {
            for x in lo.x..hi.x {
                let centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if centre.distance_squared(self.center) <= radius_sq {
                    emit(UVec2::new(x, y));
                }
            }
        }
    }
}

/// The drawables whose layer the configured mask selects. Order is irrelevant
/// to the resulting field.
pub struct GeometrySelection<'a> {
    items: Vec<&'a dyn Drawable>,
}

impl<'a> GeometrySelection<'a> {
    pub fn filter<I>(scene: I, mask: LayerMask) -> Self
    where
        I: IntoIterator<Item = &'a dyn Drawable>,
    {
        Self {
            items: scene
                .into_iter()
                .filter(|drawable| mask.contains(drawable.layer()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a dyn Drawable> + '_ {
        self.items.iter().copied()
    }
}

/// CPU seed pass, the software twin of `jfa_seed.wgsl`.
pub struct SeedRasterizer;

impl SeedRasterizer {
    /// Clears `target` to `clear` and writes a zero-distance self record at
    /// every pixel covered by the selection. Returns the number of fragments drawn.
    pub fn rasterize(
        target: &mut FieldBuffer,
        selection: &GeometrySelection,
        clear: FieldRecord,
    ) -> usize {
        target.fill(clear);

        let size = target.size();
        let mut fragments = 0;
        for drawable in selection.iter() {
            drawable.rasterize(size, &mut |pixel| {
                target.set(pixel, FieldRecord::seed_at(pixel));
                fragments += 1;
            });
        }
        fragments
    }
}
