pub mod field;
pub mod jump_flood;
pub mod render_settings;
pub mod shaders;
