/// Channels per field texel: seed x, seed y, squared distance, reserved.
pub const FIELD_CHANNELS: usize = 4;

/// Squared distance stored in the sentinel texel, large enough to lose every comparison.
pub const SENTINEL_DISTANCE_SQ: f32 = 1e10;

/// Texel written wherever no seed is known: negative coordinates plus the sentinel distance.
pub const SENTINEL_TEXEL: [f32; FIELD_CHANNELS] = [-1.0, -1.0, SENTINEL_DISTANCE_SQ, 1.0];
