//! Outline configuration: the serialized form, its validation, and the
//! validated per-camera settings the render world extracts.

use bevy::asset::Asset;
use bevy::core_pipeline::core_3d::graph::Node3d;
use bevy::prelude::*;
use bevy::render::extract_component::ExtractComponent;
use constants::render_settings::{
    DEFAULT_OUTLINE_COLOR, DEFAULT_OUTLINE_WIDTH_PX, MIN_OUTLINE_WIDTH_PX,
};
use constants::shaders::{COMPOSITE_SHADER_PATH, JUMP_FLOOD_SHADER_PATH, SEED_SHADER_PATH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::camera::CategoryFilter;
use crate::engine::composite::CompositeParams;
use crate::engine::jump_flood::JumpSequence;
use crate::engine::seed::LayerMask;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OutlineConfigError {
    #[error("no seed shader supplied, set `seed_shader` (usually shaders/jfa_seed.wgsl)")]
    MissingSeedShader,
    #[error(
        "no composite shader supplied, \
         set `composite_shader` (usually shaders/jfa_composite.wgsl)"
    )]
    MissingCompositeShader,
    #[error(
        "no jump flood kernel supplied, \
         set `jump_flood_shader` (usually shaders/jfa_step.wgsl)"
    )]
    MissingJumpFloodShader,
    #[error("outline layer mask selects no layers")]
    EmptyLayerMask,
    #[error("outline width must be finite, got {0}")]
    InvalidWidth(f32),
}

/// Outline configuration as authored on disk (`*.outline.json`).
#[derive(Asset, TypePath, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub layer_mask: LayerMask,
    pub outline_width_px: f32,
    pub outline_color: [f32; 4],
    #[serde(flatten)]
    pub camera_filter: CategoryFilter,
    pub render_stage: OutlineStage,
    pub seed_shader: Option<String>,
    pub jump_flood_shader: Option<String>,
    pub composite_shader: Option<String>,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            layer_mask: LayerMask::NONE,
            outline_width_px: DEFAULT_OUTLINE_WIDTH_PX,
            outline_color: DEFAULT_OUTLINE_COLOR,
            camera_filter: CategoryFilter::default(),
            render_stage: OutlineStage::default(),
            seed_shader: Some(SEED_SHADER_PATH.to_string()),
            jump_flood_shader: Some(JUMP_FLOOD_SHADER_PATH.to_string()),
            composite_shader: Some(COMPOSITE_SHADER_PATH.to_string()),
        }
    }
}

impl OutlineConfig {
    /// Checks everything the pipeline needs before it may run and returns the
    /// per-camera settings. Widths below one pixel are raised to one.
    pub fn validate(&self) -> Result<OutlineSettings, OutlineConfigError> {
        self.programs()?;

        if self.layer_mask.is_empty() {
            return Err(OutlineConfigError::EmptyLayerMask);
        }
        if !self.outline_width_px.is_finite() {
            return Err(OutlineConfigError::InvalidWidth(self.outline_width_px));
        }

        Ok(OutlineSettings {
            layer_mask: self.layer_mask,
            width_px: self.outline_width_px.max(MIN_OUTLINE_WIDTH_PX),
            color: self.outline_color,
            camera_filter: self.camera_filter,
        })
    }

    /// The three shader programs. An empty path counts as missing.
    pub fn programs(&self) -> Result<OutlinePrograms, OutlineConfigError> {
        fn present(path: &Option<String>) -> Option<String> {
            path.as_deref().map(str::trim).filter(|p| !p.is_empty()).map(String::from)
        }

        let seed = present(&self.seed_shader).ok_or(OutlineConfigError::MissingSeedShader)?;
        let composite = present(&self.composite_shader)
            .ok_or(OutlineConfigError::MissingCompositeShader)?;
        let jump_flood = present(&self.jump_flood_shader)
            .ok_or(OutlineConfigError::MissingJumpFloodShader)?;

        Ok(OutlinePrograms {
            seed,
            jump_flood,
            composite,
        })
    }
}

/// Where the outline node sits in the 3D render graph. Fixed once the
/// plugin is built.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineStage {
    /// Between the main pass and tonemapping, so bloom and tonemapping see the outline.
    BeforePostProcessing,
    /// After tonemapping, drawn in display colours.
    #[default]
    AfterPostProcessing,
}

impl OutlineStage {
    /// The graph nodes the outline runs after and before.
    pub fn graph_edges(self) -> (Node3d, Node3d) {
        match self {
            OutlineStage::BeforePostProcessing => (Node3d::EndMainPass, Node3d::Tonemapping),
            OutlineStage::AfterPostProcessing => {
                (Node3d::Tonemapping, Node3d::EndMainPassPostProcessing)
            }
        }
    }
}

/// Validated outline settings. Cameras carrying this component get the outline.
#[derive(Component, Debug, Clone, Copy, PartialEq, ExtractComponent)]
pub struct OutlineSettings {
    pub layer_mask: LayerMask,
    pub width_px: f32,
    pub color: [f32; 4],
    pub camera_filter: CategoryFilter,
}

impl OutlineSettings {
    pub fn jump_sequence(&self) -> JumpSequence {
        JumpSequence::for_width(self.width_px)
    }

    pub fn composite_params(&self) -> CompositeParams {
        CompositeParams {
            width_px: self.width_px,
            color: self.color,
        }
    }
}

/// Settings given to 3D cameras that do not bring their own.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct OutlineDefaults(pub OutlineSettings);

/// Marks a camera whose configuration failed validation.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct OutlineDisabled;

/// Asset paths of the seed, jump flood and composite programs.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct OutlinePrograms {
    pub seed: String,
    pub jump_flood: String,
    pub composite: String,
}

impl Default for OutlinePrograms {
    fn default() -> Self {
        Self {
            seed: SEED_SHADER_PATH.to_string(),
            jump_flood: JUMP_FLOOD_SHADER_PATH.to_string(),
            composite: COMPOSITE_SHADER_PATH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> OutlineConfig {
        OutlineConfig {
            layer_mask: LayerMask::layer(1),
            ..default()
        }
    }

    #[test]
    fn defaults_follow_the_authoring_defaults() {
        let config = OutlineConfig::default();
        assert_eq!(config.outline_width_px, 4.0);
        assert_eq!(config.outline_color, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(config.camera_filter, CategoryFilter::default());
        assert_eq!(config.programs(), Ok(OutlinePrograms::default()));
    }

    #[test]
    fn missing_programs_are_reported_in_order() {
        let config = OutlineConfig {
            seed_shader: None,
            composite_shader: None,
            ..valid()
        };
        assert_eq!(config.validate(), Err(OutlineConfigError::MissingSeedShader));

        let config = OutlineConfig {
            composite_shader: Some("  ".into()),
            jump_flood_shader: None,
            ..valid()
        };
        assert_eq!(config.validate(), Err(OutlineConfigError::MissingCompositeShader));

        let config = OutlineConfig {
            jump_flood_shader: None,
            ..valid()
        };
        assert_eq!(config.validate(), Err(OutlineConfigError::MissingJumpFloodShader));
    }

    #[test]
    fn width_is_clamped_not_rejected() {
        let settings = OutlineConfig {
            outline_width_px: 0.0,
            ..valid()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.width_px, 1.0);
        assert_eq!(settings.jump_sequence().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn stage_defaults_to_after_post_processing() {
        assert_eq!(OutlineConfig::default().render_stage, OutlineStage::AfterPostProcessing);
        assert_eq!(
            OutlineStage::AfterPostProcessing.graph_edges(),
            (Node3d::Tonemapping, Node3d::EndMainPassPostProcessing)
        );
        assert_eq!(
            OutlineStage::BeforePostProcessing.graph_edges(),
            (Node3d::EndMainPass, Node3d::Tonemapping)
        );
    }

    #[test]
    fn stage_parses_from_json() {
        let config: OutlineConfig =
            serde_json::from_str(r#"{ "layer_mask": 2, "render_stage": "before_post_processing" }"#)
                .unwrap();
        assert_eq!(config.render_stage, OutlineStage::BeforePostProcessing);
    }

    #[test]
    fn config_parses_from_json() {
        let config: OutlineConfig = serde_json::from_str(
            r#"{ "layer_mask": 6, "outline_width_px": 3.0, "render_in_scene_view": true }"#,
        )
        .unwrap();
        assert_eq!(config.layer_mask, LayerMask(6));
        assert!(config.camera_filter.render_in_scene_view);
        assert_eq!(config.seed_shader.as_deref(), Some(SEED_SHADER_PATH));
        assert!(config.validate().is_ok());
    }
}
