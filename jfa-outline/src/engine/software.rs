//! CPU reference backend. Field buffers live in an arena addressed by handle
//! and the camera color target is an `Rgba32FImage`.

use std::convert::Infallible;

use bevy::math::UVec2;
use image::Rgba32FImage;

use crate::engine::camera::{CameraCategory, CameraFilter};
use crate::engine::composite::{CompositeParams, OutlineCompositor};
use crate::engine::field::{FieldBuffer, FieldRecord};
use crate::engine::jump_flood::{JumpFloodDispatch, JumpFloodStepper};
use crate::engine::pipeline::{FrameGate, OutlineBackend};
use crate::engine::seed::{GeometrySelection, SeedRasterizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHandle(usize);

pub struct SoftwareBackend<'a> {
    selection: GeometrySelection<'a>,
    color: Rgba32FImage,
    fields: Vec<FieldBuffer>,
    dispatches: Vec<JumpFloodDispatch>,
    seed_fragments: usize,
    composited: Option<usize>,
    outline_pixels: usize,
}

impl<'a> SoftwareBackend<'a> {
    pub fn new(color: Rgba32FImage, selection: GeometrySelection<'a>) -> Self {
        Self {
            selection,
            color,
            fields: Vec::new(),
            dispatches: Vec::new(),
            seed_fragments: 0,
            composited: None,
            outline_pixels: 0,
        }
    }

    /// The gate for this frame. The CPU path can always "dispatch".
    pub fn frame_gate(&self, filter: &impl CameraFilter, category: CameraCategory) -> FrameGate {
        FrameGate {
            compute_supported: true,
            camera_included: filter.includes(category),
            selection_count: self.selection.len(),
        }
    }

    pub fn field(&self, handle: FieldHandle) -> &FieldBuffer {
        &self.fields[handle.0]
    }

    /// The field the composite read, once the pipeline has completed.
    pub fn converged_field(&self) -> Option<&FieldBuffer> {
        self.composited.map(|index| &self.fields[index])
    }

    pub fn color_target(&self) -> &Rgba32FImage {
        &self.color
    }

    pub fn into_color_target(self) -> Rgba32FImage {
        self.color
    }

    /// Number of field buffers allocated so far.
    pub fn allocations(&self) -> usize {
        self.fields.len()
    }

    pub fn dispatches(&self) -> &[JumpFloodDispatch] {
        &self.dispatches
    }

    pub fn seed_fragments(&self) -> usize {
        self.seed_fragments
    }

    /// Pixels the composite wrote.
    pub fn outline_pixels(&self) -> usize {
        self.outline_pixels
    }
}

impl OutlineBackend for SoftwareBackend<'_> {
    type Field = FieldHandle;
    type Error = Infallible;

    fn target_size(&self) -> UVec2 {
        UVec2::new(self.color.width(), self.color.height())
    }

    fn allocate_field_pair(&mut self, size: UVec2) -> [FieldHandle; 2] {
        let first = self.fields.len();
        self.fields.push(FieldBuffer::new(size));
        self.fields.push(FieldBuffer::new(size));
        [FieldHandle(first), FieldHandle(first + 1)]
    }

    fn rasterize_seeds(
        &mut self,
        target: &FieldHandle,
        clear: FieldRecord,
    ) -> Result<(), Infallible> {
        self.seed_fragments =
            SeedRasterizer::rasterize(&mut self.fields[target.0], &self.selection, clear);
        Ok(())
    }

    fn dispatch_jump_flood(
        &mut self,
        input: &FieldHandle,
        output: &FieldHandle,
        dispatch: JumpFloodDispatch,
    ) -> Result<(), Infallible> {
        debug_assert_ne!(input, output, "a dispatch must not read and write the same field");

        let (current, next) = if input.0 < output.0 {
            let (lo, hi) = self.fields.split_at_mut(output.0);
            (&lo[input.0], &mut hi[0])
        } else {
            let (lo, hi) = self.fields.split_at_mut(input.0);
            (&hi[0], &mut lo[output.0])
        };
        debug_assert_eq!(current.size(), dispatch.size);

        JumpFloodStepper::step(current, next, dispatch.jump);
        self.dispatches.push(dispatch);
        Ok(())
    }

    fn composite_outline(
        &mut self,
        field: &FieldHandle,
        params: &CompositeParams,
    ) -> Result<(), Infallible> {
        self.outline_pixels =
            OutlineCompositor::composite(&self.fields[field.0], params, &mut self.color);
        self.composited = Some(field.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::camera::CategoryFilter;
    use crate::engine::seed::{Drawable, LayerMask, PixelSet};
    use image::Rgba;

    #[test]
    fn stepping_between_handles_in_either_direction() {
        let seed = PixelSet {
            layer: 0,
            pixels: vec![UVec2::new(1, 1)],
        };
        let scene: [&dyn Drawable; 1] = [&seed];
        let selection = GeometrySelection::filter(scene, LayerMask::layer(0));
        let mut backend = SoftwareBackend::new(Rgba32FImage::new(4, 4), selection);

        let size = backend.target_size();
        let [a, b] = backend.allocate_field_pair(size);
        backend.rasterize_seeds(&a, FieldRecord::SENTINEL).unwrap();
        backend.dispatch_jump_flood(&a, &b, JumpFloodDispatch::new(size, 2)).unwrap();
        backend.dispatch_jump_flood(&b, &a, JumpFloodDispatch::new(size, 1)).unwrap();

        assert_eq!(backend.allocations(), 2);
        assert_eq!(backend.dispatches().len(), 2);
        assert_eq!(backend.field(a).get(UVec2::new(2, 2)).distance_sq(), Some(2.0));
    }

    #[test]
    fn gate_reflects_camera_policy_and_selection() {
        let backend = SoftwareBackend::new(
            Rgba32FImage::from_pixel(2, 2, Rgba([0.0; 4])),
            GeometrySelection::filter(std::iter::empty(), LayerMask::layer(0)),
        );
        let gate = backend.frame_gate(&CategoryFilter::default(), CameraCategory::Preview);
        assert!(gate.compute_supported);
        assert!(!gate.camera_included);
        assert_eq!(gate.selection_count, 0);
    }
}
