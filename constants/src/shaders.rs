/// Seed override program: writes each fragment's own pixel coordinate.
pub const SEED_SHADER_PATH: &str = "shaders/jfa_seed.wgsl";

/// Jump flood compute kernel, entry point `main`.
pub const JUMP_FLOOD_SHADER_PATH: &str = "shaders/jfa_step.wgsl";

/// Full-screen outline composite program.
pub const COMPOSITE_SHADER_PATH: &str = "shaders/jfa_composite.wgsl";
