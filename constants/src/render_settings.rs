/// Outline width used when the configuration does not name one.
pub const DEFAULT_OUTLINE_WIDTH_PX: f32 = 4.0;

/// Widths below this are clamped during validation.
pub const MIN_OUTLINE_WIDTH_PX: f32 = 1.0;

/// Linear RGBA, opaque blue.
pub const DEFAULT_OUTLINE_COLOR: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Number of addressable outline layers (bits in the layer mask).
pub const LAYER_COUNT: u8 = 32;
