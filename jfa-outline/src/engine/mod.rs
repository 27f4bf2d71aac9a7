/// Camera categories and the policy deciding which cameras get the outline.
pub mod camera;

/// Hard-edged outline composite over the camera color.
pub mod composite;

/// Outline configuration read from JSON assets, with hot reload.
pub mod config_asset;

/// Nearest-seed records and the CPU field buffer.
pub mod field;

/// Jump flood stepping, the jump sequence and dispatch sizing.
pub mod jump_flood;

/// Backend abstraction, per-frame gate and stage sequencing.
pub mod pipeline;

/// Render world integration: seed phase, compute steps and composite node.
pub mod render;

/// Layer masks, drawables and the CPU seed rasterizer.
pub mod seed;

/// Outline configuration, validation and per-camera settings.
pub mod settings;

/// CPU reference backend driving the same pipeline without a GPU.
pub mod software;
