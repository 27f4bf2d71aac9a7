//! Screen-space outlines around selected geometry using the jump flood algorithm.
//!
//! Covered pixels are rasterized as seeds, a nearest-seed field is propagated
//! over two ping-ponged buffers with halving jump distances, and every pixel
//! within the outline width of a seed is blended with the outline colour.

pub mod engine;

pub use engine::pipeline::{OutlineBackend, PipelineOrchestrator, PipelineOutcome};
pub use engine::render::JfaOutlinePlugin;
pub use engine::settings::{OutlineConfig, OutlineSettings};
