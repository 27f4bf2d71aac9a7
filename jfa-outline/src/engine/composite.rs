//! Outline compositing from a converged distance field.

use image::{GrayImage, Luma, Rgba, Rgba32FImage};

use crate::engine::field::{FieldBuffer, FieldRecord};

/// Per-draw parameters of the composite pass, shared by both backends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub width_px: f32,
    /// Linear RGBA. Alpha is the blend weight.
    pub color: [f32; 4],
}

impl CompositeParams {
    /// Hard-edged coverage: inside when the seed lies within `width_px`.
    pub fn covers(&self, record: FieldRecord) -> bool {
        record
            .distance_sq()
            .is_some_and(|dist_sq| dist_sq.sqrt() <= self.width_px)
    }

    /// Blends the outline colour over `dst`, keeping the stronger alpha.
    pub fn blend(&self, dst: [f32; 4]) -> [f32; 4] {
        let [r, g, b, a] = self.color;
        let mix = |from: f32, to: f32| from * (1.0 - a) + to * a;
        [mix(dst[0], r), mix(dst[1], g), mix(dst[2], b), dst[3].max(a)]
    }
}

pub struct OutlineCompositor;

impl OutlineCompositor {
    /// Read-modify-write of `target`. Pixels outside the outline are never
    /// touched. Returns the number of pixels written.
    pub fn composite(
        field: &FieldBuffer,
        params: &CompositeParams,
        target: &mut Rgba32FImage,
    ) -> usize {
        debug_assert_eq!((target.width(), target.height()), (field.width(), field.height()));

        let mut written = 0;
        for (pixel, record) in field.iter() {
            if !params.covers(record) {
                continue;
            }
            let dst = target.get_pixel_mut(pixel.x, pixel.y);
            *dst = Rgba(params.blend(dst.0));
            written += 1;
        }
        written
    }

    /// 8-bit coverage mask of the outline, 255 inside and 0 outside.
    pub fn coverage_mask(field: &FieldBuffer, params: &CompositeParams) -> GrayImage {
        let mut mask = GrayImage::new(field.width(), field.height());
        for (pixel, record) in field.iter() {
            if params.covers(record) {
                mask.put_pixel(pixel.x, pixel.y, Luma([255]));
            }
        }
        mask
    }
}
