//! Render world side of the jump flood outline.
//!
//! Seeds are drawn by a custom sorted phase, the jump flood steps run as
//! compute dispatches and the composite is a fullscreen post-process pass,
//! all recorded by one view node between tonemapping and the end of
//! post-processing.

/// Per-frame seed phase creation for outlined cameras.
pub mod extraction;

/// View node recording the seed, jump flood and composite passes.
pub mod outline_node;

/// Jump flood compute pipeline and the composite render pipelines.
pub mod pipelines;

/// Seed phase item, its specialized mesh pipeline and the queue system.
pub mod seed_phase;

use bevy::core_pipeline::core_3d::graph::Core3d;
use bevy::pbr::MeshPipeline;
use bevy::prelude::*;
use bevy::render::extract_component::ExtractComponentPlugin;
use bevy::render::render_graph::{RenderGraphApp, ViewNodeRunner};
use bevy::render::render_phase::{
    AddRenderCommand, DrawFunctions, SortedRenderPhasePlugin, ViewSortedRenderPhases,
    sort_phase_system,
};
use bevy::render::render_resource::SpecializedMeshPipelines;
use bevy::render::{ExtractSchedule, Render, RenderApp, RenderDebugFlags, RenderSet};

use crate::engine::camera::CameraCategory;
use crate::engine::render::extraction::extract_seed_phases;
use crate::engine::render::outline_node::{JfaOutlineLabel, JfaOutlineNode};
use crate::engine::render::pipelines::{CompositePipeline, JumpFloodPipeline};
use crate::engine::render::seed_phase::{DrawSeed, SeedPhase, SeedPipeline, queue_seed_meshes};
use crate::engine::seed::OutlineLayer;
use crate::engine::settings::{
    OutlineConfig, OutlineDefaults, OutlineDisabled, OutlinePrograms, OutlineSettings,
};

/// Adds the outline to every 3D camera.
///
/// The configuration is validated once when the plugin is built. An invalid
/// configuration disables the feature with a single error and the app keeps
/// rendering without it.
pub struct JfaOutlinePlugin {
    pub config: OutlineConfig,
}

impl JfaOutlinePlugin {
    pub fn new(config: OutlineConfig) -> Self {
        Self { config }
    }
}

impl Plugin for JfaOutlinePlugin {
    fn build(&self, app: &mut App) {
        let (settings, programs) = match self
            .config
            .validate()
            .and_then(|settings| Ok((settings, self.config.programs()?)))
        {
            Ok(valid) => valid,
            Err(err) => {
                error!("Jump flood outline disabled: {}", err);
                return;
            }
        };
        info!(
            "Jump flood outline enabled: layers {:#034b}, width {}px",
            settings.layer_mask.0, settings.width_px
        );

        let stage = self.config.render_stage;
        app.insert_resource(OutlineDefaults(settings))
            .insert_resource(programs.clone())
            .insert_resource(stage)
            .add_plugins((
                ExtractComponentPlugin::<OutlineSettings>::default(),
                ExtractComponentPlugin::<CameraCategory>::default(),
                ExtractComponentPlugin::<OutlineLayer>::default(),
                SortedRenderPhasePlugin::<SeedPhase, MeshPipeline>::new(
                    RenderDebugFlags::default(),
                ),
            ))
            .add_systems(PostUpdate, attach_outline_settings);

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        let (after, before) = stage.graph_edges();
        render_app
            .insert_resource(programs)
            .init_resource::<SpecializedMeshPipelines<SeedPipeline>>()
            .init_resource::<DrawFunctions<SeedPhase>>()
            .add_render_command::<SeedPhase, DrawSeed>()
            .init_resource::<ViewSortedRenderPhases<SeedPhase>>()
            .add_systems(ExtractSchedule, extract_seed_phases)
            .add_systems(
                Render,
                (
                    queue_seed_meshes.in_set(RenderSet::QueueMeshes),
                    sort_phase_system::<SeedPhase>.in_set(RenderSet::PhaseSort),
                ),
            )
            .add_render_graph_node::<ViewNodeRunner<JfaOutlineNode>>(Core3d, JfaOutlineLabel)
            .add_render_graph_edges(Core3d, (after, JfaOutlineLabel, before));
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };
        // Nothing was registered when validation failed.
        if !render_app.world().contains_resource::<OutlinePrograms>() {
            return;
        }

        render_app
            .init_resource::<SeedPipeline>()
            .init_resource::<JumpFloodPipeline>()
            .init_resource::<CompositePipeline>();
    }
}

/// Gives new 3D cameras the default outline unless they already carry
/// settings or were disabled.
fn attach_outline_settings(
    mut commands: Commands,
    defaults: Res<OutlineDefaults>,
    cameras: Query<Entity, (Added<Camera3d>, Without<OutlineSettings>, Without<OutlineDisabled>)>,
) {
    for camera in &cameras {
        commands.entity(camera).insert(defaults.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::seed::LayerMask;
    use crate::engine::settings::OutlineStage;

    fn outlined() -> OutlineConfig {
        OutlineConfig {
            layer_mask: LayerMask::layer(1),
            ..default()
        }
    }

    #[test]
    fn invalid_config_registers_nothing() {
        let mut app = App::new();
        app.add_plugins(JfaOutlinePlugin::new(OutlineConfig::default()));

        assert!(!app.world().contains_resource::<OutlineDefaults>());
        assert!(!app.world().contains_resource::<OutlinePrograms>());
        assert!(!app.world().contains_resource::<OutlineStage>());

        let camera = app.world_mut().spawn(Camera3d::default()).id();
        app.update();
        assert!(!app.world().entity(camera).contains::<OutlineSettings>());
    }

    #[test]
    fn missing_program_registers_nothing() {
        let mut app = App::new();
        app.add_plugins(JfaOutlinePlugin::new(OutlineConfig {
            jump_flood_shader: None,
            ..outlined()
        }));

        assert!(!app.world().contains_resource::<OutlinePrograms>());
    }

    #[test]
    fn new_cameras_get_the_default_settings() {
        let mut app = App::new();
        app.add_plugins(JfaOutlinePlugin::new(outlined()));
        let expected = outlined().validate().unwrap();
        assert_eq!(app.world().resource::<OutlineDefaults>().0, expected);
        assert_eq!(*app.world().resource::<OutlinePrograms>(), OutlinePrograms::default());
        assert_eq!(*app.world().resource::<OutlineStage>(), OutlineStage::AfterPostProcessing);

        let plain = app.world_mut().spawn(Camera3d::default()).id();
        let custom_settings = OutlineSettings {
            width_px: 9.0,
            ..expected
        };
        let custom = app.world_mut().spawn((Camera3d::default(), custom_settings)).id();
        let disabled = app.world_mut().spawn((Camera3d::default(), OutlineDisabled)).id();
        app.update();

        assert_eq!(app.world().entity(plain).get::<OutlineSettings>(), Some(&expected));
        assert_eq!(app.world().entity(custom).get::<OutlineSettings>(), Some(&custom_settings));
        assert!(!app.world().entity(disabled).contains::<OutlineSettings>());
    }
}
