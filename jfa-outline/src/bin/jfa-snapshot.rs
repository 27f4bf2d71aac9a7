/// Renders a small outlined scene on the CPU backend and writes it as a PNG.
use std::env;

use bevy::math::{IVec2, Vec2};
use image::{DynamicImage, Rgba, Rgba32FImage};
use jfa_outline::engine::camera::{CameraCategory, CategoryFilter};
use jfa_outline::engine::pipeline::{PipelineOrchestrator, PipelineOutcome};
use jfa_outline::engine::seed::{DiscShape, Drawable, GeometrySelection, LayerMask, RectShape};
use jfa_outline::engine::settings::OutlineConfig;
use jfa_outline::engine::software::SoftwareBackend;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 200;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if !(2..=3).contains(&args.len()) {
        eprintln!("Usage: {} <output.png> [outline_width_px]", args[0]);
        std::process::exit(1);
    }

    let output_path = &args[1];
    let outline_width_px = match args.get(2) {
        Some(width) => width.parse()?,
        None => 4.0,
    };

    let settings = OutlineConfig {
        layer_mask: LayerMask::layer(1),
        outline_width_px,
        ..Default::default()
    }
    .validate()?;

    let crate_box = RectShape {
        layer: 1,
        min: IVec2::new(40, 60),
        max: IVec2::new(110, 140),
    };
    let ball = DiscShape {
        layer: 1,
        center: Vec2::new(210.0, 100.0),
        radius: 36.0,
    };
    let ground = RectShape {
        layer: 0,
        min: IVec2::new(0, 170),
        max: IVec2::new(WIDTH as i32, HEIGHT as i32),
    };
    let scene: [&dyn Drawable; 3] = [&crate_box, &ball, &ground];

    let mut color = Rgba32FImage::from_pixel(WIDTH, HEIGHT, Rgba([0.15, 0.15, 0.18, 1.0]));
    for drawable in scene {
        let fill = if drawable.layer() == 1 { [0.9, 0.5, 0.2, 1.0] } else { [0.4, 0.4, 0.4, 1.0] };
        drawable.rasterize(bevy::math::UVec2::new(WIDTH, HEIGHT), &mut |pixel| {
            color.put_pixel(pixel.x, pixel.y, Rgba(fill));
        });
    }

    let selection = GeometrySelection::filter(scene, settings.layer_mask);
    let mut backend = SoftwareBackend::new(color, selection);
    let gate = backend.frame_gate(&CategoryFilter::default(), CameraCategory::Game);

    match PipelineOrchestrator::new(&settings).run(&mut backend, &gate)? {
        PipelineOutcome::Completed { size, steps } => println!(
            "Outlined {}x{} in {} jump flood steps, {} outline pixels",
            size.x,
            size.y,
            steps,
            backend.outline_pixels()
        ),
        PipelineOutcome::Skipped(reason) => println!("Outline skipped: {:?}", reason),
    }

    DynamicImage::ImageRgba32F(backend.into_color_target())
        .to_rgba8()
        .save(output_path)?;
    println!("Wrote {}", output_path);

    Ok(())
}
