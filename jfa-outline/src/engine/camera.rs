//! Camera categories and the inclusion policy consulted every frame.

use bevy::prelude::*;
use bevy::render::extract_component::ExtractComponent;
use serde::{Deserialize, Serialize};

/// What a camera is used for. Cameras without the component count as `Game`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ExtractComponent)]
pub enum CameraCategory {
    #[default]
    Game,
    SceneView,
    Preview,
    Overlay,
}

/// Decides whether a camera of a given category receives the outline.
pub trait CameraFilter {
    fn includes(&self, category: CameraCategory) -> bool;
}

/// Flag-based policy. Game cameras are always included; the other
/// categories are opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFilter {
    pub render_in_scene_view: bool,
    pub render_in_preview_cameras: bool,
    pub render_in_overlay_cameras: bool,
}

impl CameraFilter for CategoryFilter {
    fn includes(&self, category: CameraCategory) -> bool {
        match category {
            CameraCategory::Game => true,
            CameraCategory::SceneView => self.render_in_scene_view,
            CameraCategory::Preview => self.render_in_preview_cameras,
            CameraCategory::Overlay => self.render_in_overlay_cameras,
        }
    }
}
