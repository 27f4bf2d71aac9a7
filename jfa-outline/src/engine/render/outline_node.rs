//! Render graph node running the outline pipeline for one view.

use bevy::ecs::query::QueryItem;
use bevy::prelude::*;
use bevy::render::render_graph::{NodeRunError, RenderGraphContext, RenderLabel, ViewNode};
use bevy::render::render_phase::{DrawError, SortedRenderPhase, ViewSortedRenderPhases};
use bevy::render::render_resource::{
    BindGroupEntries, ComputePassDescriptor, ComputePipeline, Extent3d, LoadOp, Operations,
    PipelineCache, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, StoreOp,
    Texture, TextureDescriptor, TextureDimension, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use bevy::render::renderer::{RenderContext, RenderDevice};
use bevy::render::view::{ExtractedView, ViewTarget};

use crate::engine::camera::{CameraCategory, CameraFilter};
use crate::engine::composite::CompositeParams;
use crate::engine::field::FieldRecord;
use crate::engine::jump_flood::JumpFloodDispatch;
use crate::engine::pipeline::{FrameGate, GateDecision, OutlineBackend, PipelineOrchestrator};
use crate::engine::render::pipelines::{CompositePipeline, FIELD_TEXTURE_FORMAT, JumpFloodPipeline};
use crate::engine::render::seed_phase::SeedPhase;
use crate::engine::settings::OutlineSettings;

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct JfaOutlineLabel;

#[derive(Default)]
pub struct JfaOutlineNode;

impl ViewNode for JfaOutlineNode {
    type ViewQuery = (
        &'static ExtractedView,
        &'static ViewTarget,
        &'static OutlineSettings,
        Option<&'static CameraCategory>,
    );

    fn run<'w>(
        &self,
        graph: &mut RenderGraphContext,
        render_context: &mut RenderContext<'w>,
        (view, view_target, settings, category): QueryItem<'w, Self::ViewQuery>,
        world: &'w World,
    ) -> Result<(), NodeRunError> {
        let Some(seed_phases) = world.get_resource::<ViewSortedRenderPhases<SeedPhase>>() else {
            return Ok(());
        };
        let Some(seed_phase) = seed_phases.get(&view.retained_view_entity) else {
            return Ok(());
        };

        let gate = FrameGate {
            compute_supported: world
                .resource::<RenderDevice>()
                .limits()
                .max_compute_workgroups_per_dimension
                > 0,
            camera_included: settings
                .camera_filter
                .includes(category.copied().unwrap_or_default()),
            selection_count: seed_phase.items.len(),
        };
        if let GateDecision::Skip(reason) = gate.evaluate() {
            reason.report();
            return Ok(());
        }

        // Pipelines still compiling: try again next frame.
        let pipeline_cache = world.resource::<PipelineCache>();
        let jump_flood_pipeline = world.resource::<JumpFloodPipeline>();
        let composite_pipeline = world.resource::<CompositePipeline>();
        let Some(jump_flood) = jump_flood_pipeline
            .pipeline_id
            .and_then(|id| pipeline_cache.get_compute_pipeline(id))
        else {
            return Ok(());
        };
        let Some(composite) =
            pipeline_cache.get_render_pipeline(composite_pipeline.pipeline_id(view_target.is_hdr()))
        else {
            return Ok(());
        };

        let mut backend = GpuOutlineBackend {
            render_context,
            world,
            view_entity: graph.view_entity(),
            view_target,
            seed_phase,
            jump_flood_pipeline,
            jump_flood,
            composite_pipeline,
            composite,
        };

        PipelineOrchestrator::new(settings)
            .execute(&mut backend)
            .map(|_| ())
            .map_err(|draw_err| {
                error!("Seed phase render failed: {:?}", draw_err);
                NodeRunError::DrawError(draw_err)
            })
    }
}

/// A field texture created for a single view and frame.
pub struct FieldTexture {
    _texture: Texture,
    view: TextureView,
}

struct GpuOutlineBackend<'a, 'w> {
    render_context: &'a mut RenderContext<'w>,
    world: &'w World,
    view_entity: Entity,
    view_target: &'w ViewTarget,
    seed_phase: &'w SortedRenderPhase<SeedPhase>,
    jump_flood_pipeline: &'w JumpFloodPipeline,
    jump_flood: &'w ComputePipeline,
    composite_pipeline: &'w CompositePipeline,
    composite: &'w RenderPipeline,
}

impl GpuOutlineBackend<'_, '_> {
    fn create_field(&self, size: UVec2, label: &'static str) -> FieldTexture {
        let texture = self.render_context.render_device().create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: FIELD_TEXTURE_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT
                | TextureUsages::TEXTURE_BINDING
                | TextureUsages::STORAGE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&TextureViewDescriptor::default());
        FieldTexture {
            _texture: texture,
            view,
        }
    }
}

impl OutlineBackend for GpuOutlineBackend<'_, '_> {
    type Field = FieldTexture;
    type Error = DrawError;

    fn target_size(&self) -> UVec2 {
        let size = self.view_target.main_texture().size();
        UVec2::new(size.width, size.height)
    }

    fn allocate_field_pair(&mut self, size: UVec2) -> [FieldTexture; 2] {
        [
            self.create_field(size, "jfa_field_a"),
            self.create_field(size, "jfa_field_b"),
        ]
    }

    fn rasterize_seeds(
        &mut self,
        target: &FieldTexture,
        clear: FieldRecord,
    ) -> Result<(), DrawError> {
        let [r, g, b, a] = clear.to_texel();
        let mut render_pass = self.render_context.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("jfa_seed_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(LinearRgba::new(r, g, b, a).into()),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.seed_phase.render(&mut render_pass, self.world, self.view_entity)
    }

    fn dispatch_jump_flood(
        &mut self,
        input: &FieldTexture,
        output: &FieldTexture,
        dispatch: JumpFloodDispatch,
    ) -> Result<(), DrawError> {
        let render_device = self.render_context.render_device();
        let params = JumpFloodPipeline::params_buffer(render_device, &dispatch);
        let bind_group = render_device.create_bind_group(
            "jfa_step_bind_group",
            &self.jump_flood_pipeline.layout,
            &BindGroupEntries::sequential((&input.view, &output.view, params.as_entire_binding())),
        );

        let mut pass = self
            .render_context
            .command_encoder()
            .begin_compute_pass(&ComputePassDescriptor {
                label: Some("jfa_step_pass"),
                timestamp_writes: None,
            });
        pass.set_pipeline(self.jump_flood);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(dispatch.groups.x, dispatch.groups.y, 1);
        Ok(())
    }

    fn composite_outline(
        &mut self,
        field: &FieldTexture,
        params: &CompositeParams,
    ) -> Result<(), DrawError> {
        let render_device = self.render_context.render_device();
        let params = CompositePipeline::params_buffer(render_device, params);
        let bind_group = render_device.create_bind_group(
            "jfa_composite_bind_group",
            &self.composite_pipeline.layout,
            &BindGroupEntries::sequential((&field.view, params.as_entire_binding())),
        );

        // Loaded, not cleared: only fragments inside the outline survive the
        // shader and blend over the existing color.
        let mut render_pass = self.render_context.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("jfa_composite_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: self.view_target.main_texture_view(),
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Load,
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_render_pipeline(self.composite);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
        Ok(())
    }
}
