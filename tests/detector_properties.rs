use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use motion_kernel::detect::{count_regions, diff, dilate, filter, segment, segment_union_find};
use motion_kernel::{BinaryMask, BoundingBox, Component, GrayFrame};

const CASES: usize = 64;

fn random_frame(rng: &mut StdRng, width: u32, height: u32) -> GrayFrame {
    let data = (0..width * height).map(|_| rng.gen()).collect();
    GrayFrame::new(width, height, data).unwrap()
}

fn random_mask(rng: &mut StdRng) -> BinaryMask {
    let width = rng.gen_range(1..=24);
    let height = rng.gen_range(1..=24);
    let density: f64 = rng.gen_range(0.05..0.7);
    let data = (0..width * height)
        .map(|_| if rng.gen_bool(density) { 255 } else { 0 })
        .collect();
    BinaryMask::from_raw(width, height, data).unwrap()
}

/// Straightforward breadth-first labeling used as a reference partition.
fn reference_components(mask: &BinaryMask) -> Vec<Component> {
    let (width, height) = mask.dimensions();
    let mut label = vec![false; mask.len()];
    let mut out = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let index = (y * width + x) as usize;
            if !mask.is_foreground(x, y) || label[index] {
                continue;
            }
            let mut bbox = BoundingBox::point(x, y);
            let mut count = 0;
            let mut queue = VecDeque::from([(x, y)]);
            label[index] = true;
            while let Some((cx, cy)) = queue.pop_front() {
                bbox.include(cx, cy);
                count += 1;
                for ny in cy.saturating_sub(1)..=(cy + 1).min(height - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(width - 1) {
                        let n = (ny * width + nx) as usize;
                        if mask.is_foreground(nx, ny) && !label[n] {
                            label[n] = true;
                            queue.push_back((nx, ny));
                        }
                    }
                }
            }
            out.push(Component {
                bbox,
                pixel_count: count,
            });
        }
    }
    out
}

#[test]
fn diff_of_a_frame_with_itself_is_empty() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..CASES {
        let (w, h) = (rng.gen_range(1..=16), rng.gen_range(1..=16));
        let frame = random_frame(&mut rng, w, h);
        let threshold = rng.gen();
        assert_eq!(diff(frame.view(), frame.view(), threshold).unwrap().foreground_count(), 0);
    }
}

#[test]
fn foreground_shrinks_as_threshold_grows() {
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..CASES / 4 {
        let (w, h) = (rng.gen_range(1..=16), rng.gen_range(1..=16));
        let a = random_frame(&mut rng, w, h);
        let b = random_frame(&mut rng, w, h);
        let mut last = usize::MAX;
        for threshold in 0..=255u8 {
            let count = diff(a.view(), b.view(), threshold).unwrap().foreground_count();
            assert!(count <= last);
            last = count;
        }
        assert_eq!(last, 0);
    }
}

#[test]
fn dilation_keeps_interior_foreground() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..CASES {
        let mask = random_mask(&mut rng);
        let dilated = dilate(&mask).unwrap();
        let (width, height) = mask.dimensions();
        for y in 0..height {
            for x in 0..width {
                let border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
                if border {
                    assert!(!dilated.is_foreground(x, y));
                } else if mask.is_foreground(x, y) {
                    assert!(dilated.is_foreground(x, y));
                }
            }
        }
    }
}

#[test]
fn labeling_partitions_the_foreground() {
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..CASES {
        let mask = random_mask(&mut rng);
        let components = segment(&mask).unwrap();

        let total: usize = components.iter().map(|c| c.pixel_count).sum();
        assert_eq!(total, mask.foreground_count());
        assert_eq!(components, reference_components(&mask));
        assert_eq!(count_regions(&mask).unwrap(), components.len());
    }
}

#[test]
fn union_find_matches_flood_fill() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..CASES {
        let mask = random_mask(&mut rng);
        assert_eq!(segment_union_find(&mask).unwrap(), segment(&mask).unwrap());
    }
}

#[test]
fn filter_never_returns_small_components() {
    let mut rng = StdRng::seed_from_u64(6);
    for _ in 0..CASES {
        let mask = random_mask(&mut rng);
        let min_pixels = rng.gen_range(1..=8);
        let components = segment(&mask).unwrap();
        let kept = filter(components, mask.foreground_count(), mask.len(), min_pixels);
        assert!(kept.iter().all(|c| c.pixel_count >= min_pixels));
    }
}

#[test]
fn fully_lit_mask_is_suppressed() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..CASES / 4 {
        let (width, height) = (rng.gen_range(2..=24), rng.gen_range(1..=24));
        let mask = BinaryMask::from_raw(width, height, vec![255; (width * height) as usize]).unwrap();
        let components = segment(&mask).unwrap();
        assert_eq!(components.len(), 1);
        assert!(filter(components, mask.foreground_count(), mask.len(), 1).is_empty());
    }
}
