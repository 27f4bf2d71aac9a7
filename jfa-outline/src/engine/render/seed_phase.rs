//! Seed render phase: meshes on a selected outline layer drawn with the seed
//! program into the first field texture.
//!
//! - **@group(0)**: View uniforms via `SetMeshViewBindGroup`
//! - **@group(1)**: Mesh transforms via `SetMeshBindGroup`
//!
//! The fragment stage writes the fragment's own pixel coordinate and a zero
//! squared distance, so covered pixels become seeds of themselves.

use std::ops::Range;

use bevy::math::FloatOrd;
use bevy::pbr::{
    DrawMesh, MeshPipeline, MeshPipelineKey, MeshPipelineViewLayoutKey, RenderMeshInstances,
    SetMeshBindGroup, SetMeshViewBindGroup,
};
use bevy::prelude::*;
use bevy::render::mesh::{MeshVertexBufferLayoutRef, RenderMesh};
use bevy::render::render_asset::RenderAssets;
use bevy::render::render_phase::{
    CachedRenderPipelinePhaseItem, DrawFunctionId, DrawFunctions, PhaseItem, PhaseItemExtraIndex,
    SetItemPipeline, SortedPhaseItem, ViewSortedRenderPhases,
};
use bevy::render::render_resource::{
    CachedRenderPipelineId, ColorTargetState, ColorWrites, FragmentState, FrontFace,
    MultisampleState, PipelineCache, PolygonMode, PrimitiveState, RenderPipelineDescriptor,
    SpecializedMeshPipeline, SpecializedMeshPipelineError, SpecializedMeshPipelines, VertexState,
};
use bevy::render::sync_world::MainEntity;
use bevy::render::view::{ExtractedView, RenderVisibleEntities};

use crate::engine::render::pipelines::FIELD_TEXTURE_FORMAT;
use crate::engine::seed::OutlineLayer;
use crate::engine::settings::{OutlinePrograms, OutlineSettings};

/// Specialized mesh pipeline drawing seeds.
#[derive(Resource)]
pub struct SeedPipeline {
    mesh_pipeline: MeshPipeline,
    shader_handle: Handle<Shader>,
}

impl FromWorld for SeedPipeline {
    fn from_world(world: &mut World) -> Self {
        let path = world.resource::<OutlinePrograms>().seed.clone();
        Self {
            mesh_pipeline: MeshPipeline::from_world(world),
            shader_handle: world.resource::<AssetServer>().load(path),
        }
    }
}

impl SpecializedMeshPipeline for SeedPipeline {
    type Key = MeshPipelineKey;

    fn specialize(
        &self,
        key: Self::Key,
        layout: &MeshVertexBufferLayoutRef,
    ) -> Result<RenderPipelineDescriptor, SpecializedMeshPipelineError> {
        // Coverage is all that matters, so position is the only attribute.
        let vertex_buffer_layout = layout
            .0
            .get_layout(&[Mesh::ATTRIBUTE_POSITION.at_shader_location(0)])?;

        Ok(RenderPipelineDescriptor {
            label: Some("jfa_seed_pipeline".into()),
            layout: vec![
                self.mesh_pipeline
                    .get_view_layout(MeshPipelineViewLayoutKey::from(key))
                    .clone(),
                self.mesh_pipeline.mesh_layouts.model_only.clone(),
            ],
            push_constant_ranges: vec![],
            vertex: VertexState {
                shader: self.shader_handle.clone(),
                entry_point: "vertex".into(),
                shader_defs: vec![],
                buffers: vec![vertex_buffer_layout],
            },
            fragment: Some(FragmentState {
                shader: self.shader_handle.clone(),
                entry_point: "fragment".into(),
                shader_defs: vec![],
                targets: vec![Some(ColorTargetState {
                    format: FIELD_TEXTURE_FORMAT,
                    blend: None,
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: key.primitive_topology(),
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                ..default()
            },
            // Overlapping seeds all sit at distance zero, so depth is irrelevant.
            depth_stencil: None,
            // The field texture is single sampled whatever the camera uses.
            multisample: MultisampleState::default(),
            zero_initialize_workgroup_memory: false,
        })
    }
}

pub type DrawSeed = (SetItemPipeline, SetMeshViewBindGroup<0>, SetMeshBindGroup<1>, DrawMesh);

/// Phase item for one seed mesh.
pub struct SeedPhase {
    pub sort_key: FloatOrd,
    pub entity: (Entity, MainEntity),
    pub pipeline: CachedRenderPipelineId,
    pub draw_function: DrawFunctionId,
    pub batch_range: Range<u32>,
    pub extra_index: PhaseItemExtraIndex,
    pub indexed: bool,
}

impl PhaseItem for SeedPhase {
    fn entity(&self) -> Entity {
        self.entity.0
    }

    fn main_entity(&self) -> MainEntity {
        self.entity.1
    }

    fn draw_function(&self) -> DrawFunctionId {
        self.draw_function
    }

    fn batch_range(&self) -> &Range<u32> {
        &self.batch_range
    }

    fn batch_range_mut(&mut self) -> &mut Range<u32> {
        &mut self.batch_range
    }

    fn extra_index(&self) -> PhaseItemExtraIndex {
        self.extra_index.clone()
    }

    fn batch_range_and_extra_index_mut(&mut self) -> (&mut Range<u32>, &mut PhaseItemExtraIndex) {
        (&mut self.batch_range, &mut self.extra_index)
    }
}

impl SortedPhaseItem for SeedPhase {
    type SortKey = FloatOrd;

    fn sort_key(&self) -> Self::SortKey {
        self.sort_key
    }

    fn sort(items: &mut [Self]) {
        items.sort_by_key(SortedPhaseItem::sort_key);
    }

    fn indexed(&self) -> bool {
        self.indexed
    }
}

impl CachedRenderPipelinePhaseItem for SeedPhase {
    fn cached_pipeline(&self) -> CachedRenderPipelineId {
        self.pipeline
    }
}

/// Queues every visible mesh whose outline layer the view's mask selects.
///
/// The number of queued items is the view's selection count for the frame gate.
pub fn queue_seed_meshes(
    seed_draw_functions: Res<DrawFunctions<SeedPhase>>,
    mut pipelines: ResMut<SpecializedMeshPipelines<SeedPipeline>>,
    pipeline_cache: Res<PipelineCache>,
    seed_pipeline: Res<SeedPipeline>,
    render_meshes: Res<RenderAssets<RenderMesh>>,
    render_mesh_instances: Res<RenderMeshInstances>,
    mut seed_phases: ResMut<ViewSortedRenderPhases<SeedPhase>>,
    views: Query<(&ExtractedView, &RenderVisibleEntities, &Msaa, &OutlineSettings)>,
    outline_layers: Query<&OutlineLayer>,
) {
    let draw_function = seed_draw_functions.read().id::<DrawSeed>();

    for (view, visible_entities, msaa, settings) in &views {
        let Some(seed_phase) = seed_phases.get_mut(&view.retained_view_entity) else {
            continue;
        };

        let view_key = MeshPipelineKey::from_msaa_samples(msaa.samples())
            | MeshPipelineKey::from_hdr(view.hdr);
        let rangefinder = view.rangefinder3d();

        for (render_entity, visible_entity) in visible_entities.iter::<Mesh3d>() {
            let Ok(layer) = outline_layers.get(*render_entity) else {
                continue;
            };
            if !settings.layer_mask.contains(layer.0) {
                continue;
            }

            let Some(mesh_instance) = render_mesh_instances.render_mesh_queue_data(*visible_entity)
            else {
                continue;
            };
            let Some(mesh) = render_meshes.get(mesh_instance.mesh_asset_id) else {
                continue;
            };

            let mesh_key =
                view_key | MeshPipelineKey::from_primitive_topology(mesh.primitive_topology());
            let specialized =
                pipelines.specialize(&pipeline_cache, &seed_pipeline, mesh_key, &mesh.layout);
            let pipeline_id = match specialized {
                Ok(id) => id,
                Err(err) => {
                    error!("Seed pipeline specialization failed: {}", err);
                    continue;
                }
            };

            seed_phase.add(SeedPhase {
                sort_key: FloatOrd(rangefinder.distance_translation(&mesh_instance.translation)),
                entity: (*render_entity, *visible_entity),
                pipeline: pipeline_id,
                draw_function,
                batch_range: 0..1,
                extra_index: PhaseItemExtraIndex::None,
                indexed: mesh.indexed(),
            });
        }
    }
}
