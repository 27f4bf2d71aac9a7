/// Workgroup size of the jump flood kernel in x. Must match `@workgroup_size` in jfa_step.wgsl.
pub const THREAD_GROUP_SIZE_X: u32 = 8;

/// Workgroup size of the jump flood kernel in y.
pub const THREAD_GROUP_SIZE_Y: u32 = 8;

/// Smallest jump distance ever dispatched.
pub const MIN_JUMP: u32 = 1;

/// Largest jump distance: half of the largest power of two a `u32` holds.
pub const MAX_JUMP: u32 = 1 << 30;
