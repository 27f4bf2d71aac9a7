// tests/test_jump_flood.rs: Jump flood convergence checked against a
// brute-force nearest-seed oracle.

use bevy::math::{IVec2, UVec2, Vec2};
use jfa_outline::engine::composite::{CompositeParams, OutlineCompositor};
use jfa_outline::engine::field::{squared_distance, FieldBuffer, FieldRecord};
use jfa_outline::engine::jump_flood::{JumpFloodStepper, JumpSequence};
use jfa_outline::engine::seed::{
    DiscShape, Drawable, GeometrySelection, LayerMask, RectShape, SeedRasterizer,
};

// ===== Helpers =====

fn seeded(size: UVec2, seeds: &[UVec2]) -> FieldBuffer {
    let mut field = FieldBuffer::new(size);
    for &seed in seeds {
        field.set(seed, FieldRecord::seed_at(seed));
    }
    field
}

fn rasterized(size: UVec2, drawable: &dyn Drawable) -> FieldBuffer {
    let mut field = FieldBuffer::new(size);
    let selection = GeometrySelection::filter([drawable], LayerMask::layer(drawable.layer()));
    SeedRasterizer::rasterize(&mut field, &selection, FieldRecord::SENTINEL);
    field
}

/// Ping-pongs `field` through every jump of `jumps` and returns the result.
fn flood(field: FieldBuffer, jumps: JumpSequence) -> FieldBuffer {
    let mut buffers = [field.clone(), field];
    let mut current = 0;
    for jump in jumps {
        let next = current ^ 1;
        let (front, back) = buffers.split_at_mut(1);
        if current == 0 {
            JumpFloodStepper::step(&front[0], &mut back[0], jump);
        } else {
            JumpFloodStepper::step(&back[0], &mut front[0], jump);
        }
        current = next;
    }
    let [first, second] = buffers;
    if current == 0 {
        first
    } else {
        second
    }
}

fn seeds_of(field: &FieldBuffer) -> Vec<UVec2> {
    field.iter().filter_map(|(_, record)| record.seed()).collect()
}

/// Exact squared distance from `pixel` to the nearest of `seeds`.
fn oracle(seeds: &[UVec2], pixel: UVec2) -> Option<f32> {
    seeds
        .iter()
        .map(|&seed| squared_distance(pixel, seed))
        .min_by(f32::total_cmp)
}

/// Deterministic 64-bit LCG, enough to scatter seeds reproducibly.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn scattered_seeds(state: u64, size: UVec2, count: usize) -> Vec<UVec2> {
    let mut rng = Lcg(state);
    let mut seeds: Vec<UVec2> = Vec::new();
    for _ in 0..count {
        let x = (rng.next() % size.x as u64) as u32;
        let y = (rng.next() % size.y as u64) as u32;
        let seed = UVec2::new(x, y);
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    seeds
}

// ===== Full sequences =====

#[test]
fn full_sequence_matches_oracle() {
    let size = UVec2::new(32, 24);
    let cases: [&[UVec2]; 4] = [
        &[UVec2::new(5, 7)],
        &[UVec2::new(3, 3), UVec2::new(28, 20)],
        &[UVec2::new(0, 0)],
        &[UVec2::new(31, 23)],
    ];

    for seeds in cases {
        let field = flood(seeded(size, seeds), JumpSequence::starting_at(16));
        for (pixel, record) in field.iter() {
            assert_eq!(
                record.distance_sq(),
                oracle(seeds, pixel),
                "seeds {:?}, pixel {}",
                seeds,
                pixel
            );
        }
    }
}

#[test]
fn converged_field_is_a_fixed_point() {
    let size = UVec2::new(32, 24);
    let seeds = [
        UVec2::new(14, 10),
        UVec2::new(15, 10),
        UVec2::new(14, 11),
        UVec2::new(15, 11),
    ];
    let converged = flood(seeded(size, &seeds), JumpSequence::starting_at(16));
    let again = flood(converged.clone(), JumpSequence::starting_at(16));
    assert_eq!(converged, again);
}

#[test]
fn scattered_seeds_never_underestimate() {
    let size = UVec2::new(24, 18);
    for state in 0..5 {
        let seeds = scattered_seeds(state, size, 6);
        let field = flood(seeded(size, &seeds), JumpSequence::starting_at(16));

        for (pixel, record) in field.iter() {
            let stored_seed = record.seed().expect("every pixel reached");
            assert!(seeds.contains(&stored_seed), "stored seed {} is not a seed", stored_seed);

            let stored = record.distance_sq().expect("every pixel reached");
            assert_eq!(stored, squared_distance(pixel, stored_seed));

            let exact = oracle(&seeds, pixel).expect("seeds present");
            assert!(stored >= exact, "pixel {} stored {} below exact {}", pixel, stored, exact);
        }
    }
}

#[test]
fn no_seeds_stays_sentinel_through_every_step() {
    let field = flood(FieldBuffer::new(UVec2::new(9, 7)), JumpSequence::starting_at(8));
    assert!(field.is_all_sentinel());
}

// ===== Width-bounded sequences =====

#[test]
fn disc_outline_matches_oracle_mask() {
    let size = UVec2::new(40, 30);
    let disc = DiscShape {
        layer: 1,
        center: Vec2::new(20.0, 15.0),
        radius: 6.0,
    };
    let seed_field = rasterized(size, &disc);
    assert_eq!(seed_field.seeded_pixels(), 112);
    assert_outline_matches_oracle(seed_field, 5.0, 368);
}

#[test]
fn rect_outline_matches_oracle_mask() {
    let size = UVec2::new(32, 24);
    let rect = RectShape {
        layer: 1,
        min: IVec2::new(10, 8),
        max: IVec2::new(18, 14),
    };
    let seed_field = rasterized(size, &rect);
    let seeds = seeds_of(&seed_field);
    let field = assert_outline_matches_oracle(seed_field, 3.0, 148);

    let params = CompositeParams {
        width_px: 3.0,
        color: [1.0; 4],
    };
    for (pixel, record) in field.iter().filter(|(_, record)| params.covers(*record)) {
        assert_eq!(record.distance_sq(), oracle(&seeds, pixel), "pixel {}", pixel);
    }
}

/// Floods `seed_field` for `width_px` and checks the composite coverage is
/// exactly the pixels within `width_px` of some seed.
fn assert_outline_matches_oracle(
    seed_field: FieldBuffer,
    width_px: f32,
    expected_pixels: usize,
) -> FieldBuffer {
    let seeds = seeds_of(&seed_field);
    let field = flood(seed_field, JumpSequence::for_width(width_px));
    let params = CompositeParams {
        width_px,
        color: [1.0; 4],
    };
    let mask = OutlineCompositor::coverage_mask(&field, &params);

    let mut covered = 0;
    for (pixel, _) in field.iter() {
        let expected = oracle(&seeds, pixel).is_some_and(|dist_sq| dist_sq.sqrt() <= width_px);
        let actual = mask.get_pixel(pixel.x, pixel.y).0[0] == 255;
        assert_eq!(actual, expected, "pixel {} for width {}", pixel, width_px);
        covered += actual as usize;
    }
    assert_eq!(covered, expected_pixels);
    field
}
