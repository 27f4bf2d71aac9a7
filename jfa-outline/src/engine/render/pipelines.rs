//! Cached GPU pipelines for the jump flood step and the outline composite.

use bevy::core_pipeline::fullscreen_vertex_shader::fullscreen_shader_vertex_state;
use bevy::image::BevyDefault;
use bevy::prelude::*;
use bevy::render::render_resource::{
    BindGroupLayout, BindGroupLayoutEntry, BindingType, BlendComponent, BlendFactor,
    BlendOperation, BlendState, Buffer, BufferBindingType, BufferInitDescriptor, BufferUsages,
    CachedComputePipelineId, CachedRenderPipelineId, ColorTargetState, ColorWrites,
    ComputePipelineDescriptor, FragmentState, MultisampleState, PipelineCache, PrimitiveState,
    RenderPipelineDescriptor, ShaderStages, StorageTextureAccess, TextureFormat,
    TextureSampleType, TextureViewDimension,
};
use bevy::render::renderer::RenderDevice;
use bevy::render::view::ViewTarget;
use bytemuck::{Pod, Zeroable};

use crate::engine::composite::CompositeParams;
use crate::engine::jump_flood::JumpFloodDispatch;
use crate::engine::settings::OutlinePrograms;

/// Texel format of both field buffers.
pub const FIELD_TEXTURE_FORMAT: TextureFormat = TextureFormat::Rgba32Float;

/// Matches `JumpFloodParams` in `jfa_step.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct JumpFloodUniform {
    resolution: [u32; 2], // 0
    jump: u32,            // 8
    _padding: u32,        // 12
}

/// Matches `CompositeParams` in `jfa_composite.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CompositeUniform {
    color: [f32; 4],    // 0
    width_px: f32,      // 16
    _padding: [f32; 3], // 20
}

fn field_texture_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: false },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Compute pipeline running one jump flood step.
///
/// ```wgsl
/// @group(0) @binding(0) var current_field: texture_2d<f32>;
/// @group(0) @binding(1) var next_field: texture_storage_2d<rgba32float, write>;
/// @group(0) @binding(2) var<uniform> params: JumpFloodParams;
/// ```
#[derive(Resource)]
pub struct JumpFloodPipeline {
    pub layout: BindGroupLayout,
    /// `None` when the device cannot dispatch compute work.
    pub pipeline_id: Option<CachedComputePipelineId>,
}

impl FromWorld for JumpFloodPipeline {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();
        let compute_supported = render_device.limits().max_compute_workgroups_per_dimension > 0;

        let layout = render_device.create_bind_group_layout(
            "jfa_step_layout",
            &[
                field_texture_entry(0, ShaderStages::COMPUTE),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::COMPUTE,
                    ty: BindingType::StorageTexture {
                        access: StorageTextureAccess::WriteOnly,
                        format: FIELD_TEXTURE_FORMAT,
                        view_dimension: TextureViewDimension::D2,
                    },
                    count: None,
                },
                uniform_entry(2, ShaderStages::COMPUTE),
            ],
        );

        if !compute_supported {
            return Self {
                layout,
                pipeline_id: None,
            };
        }

        let path = world.resource::<OutlinePrograms>().jump_flood.clone();
        let shader = world.load_asset(path);
        let pipeline_id =
            world
                .resource::<PipelineCache>()
                .queue_compute_pipeline(ComputePipelineDescriptor {
                    label: Some("jfa_step_pipeline".into()),
                    layout: vec![layout.clone()],
                    push_constant_ranges: Vec::new(),
                    shader,
                    shader_defs: vec![],
                    entry_point: "main".into(),
                    zero_initialize_workgroup_memory: false,
                });

        Self {
            layout,
            pipeline_id: Some(pipeline_id),
        }
    }
}

impl JumpFloodPipeline {
    pub fn params_buffer(render_device: &RenderDevice, dispatch: &JumpFloodDispatch) -> Buffer {
        let uniform = JumpFloodUniform {
            resolution: dispatch.size.to_array(),
            jump: dispatch.jump,
            _padding: 0,
        };
        render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("jfa_step_params"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: BufferUsages::UNIFORM,
        })
    }
}

/// Fullscreen pass blending the outline over the camera color.
///
/// Draws straight onto the main texture with fixed-function blending; the
/// fragment stage discards every pixel outside the outline, so nothing else
/// is written. One pipeline per main texture format, as the view target is
/// either HDR or not.
///
/// ```wgsl
/// @group(0) @binding(0) var field_texture: texture_2d<f32>;
/// @group(0) @binding(1) var<uniform> params: CompositeParams;
/// ```
#[derive(Resource)]
pub struct CompositePipeline {
    pub layout: BindGroupLayout,
    pub hdr_pipeline_id: CachedRenderPipelineId,
    pub sdr_pipeline_id: CachedRenderPipelineId,
}

/// `rgb = mix(dst, color, color.a)`, `a = max(dst.a, color.a)`.
const OUTLINE_BLEND: BlendState = BlendState {
    color: BlendComponent {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    },
    alpha: BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Max,
    },
};

impl FromWorld for CompositePipeline {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();
        let layout = render_device.create_bind_group_layout(
            "jfa_composite_layout",
            &[
                // Converged field.
                field_texture_entry(0, ShaderStages::FRAGMENT),
                uniform_entry(1, ShaderStages::FRAGMENT),
            ],
        );

        let path = world.resource::<OutlinePrograms>().composite.clone();
        let shader = world.load_asset(path);

        let descriptor = |format: TextureFormat, label: &'static str| RenderPipelineDescriptor {
            label: Some(label.into()),
            layout: vec![layout.clone()],
            vertex: fullscreen_shader_vertex_state(),
            fragment: Some(FragmentState {
                shader: shader.clone(),
                shader_defs: vec![],
                entry_point: "fragment".into(),
                targets: vec![Some(ColorTargetState {
                    format,
                    blend: Some(OUTLINE_BLEND),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            push_constant_ranges: vec![],
            zero_initialize_workgroup_memory: false,
        };

        let pipeline_cache = world.resource::<PipelineCache>();
        let hdr_pipeline_id = pipeline_cache.queue_render_pipeline(descriptor(
            ViewTarget::TEXTURE_FORMAT_HDR,
            "jfa_composite_hdr_pipeline",
        ));
        let sdr_pipeline_id = pipeline_cache.queue_render_pipeline(descriptor(
            TextureFormat::bevy_default(),
            "jfa_composite_pipeline",
        ));

        Self {
            layout,
            hdr_pipeline_id,
            sdr_pipeline_id,
        }
    }
}

impl CompositePipeline {
    pub fn pipeline_id(&self, hdr: bool) -> CachedRenderPipelineId {
        if hdr { self.hdr_pipeline_id } else { self.sdr_pipeline_id }
    }

    pub fn params_buffer(render_device: &RenderDevice, params: &CompositeParams) -> Buffer {
        let uniform = CompositeUniform {
            color: params.color,
            width_px: params.width_px,
            _padding: [0.0; 3],
        };
        render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("jfa_composite_params"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: BufferUsages::UNIFORM,
        })
    }
}
