//! Connected-component labeling over a binary mask (8-connectivity).
//!
//! Two strategies produce the same observable output:
//! - `FloodFill`: raster scan, iterative fill from each unvisited seed using an
//!   explicit heap stack sized to the pixel count.
//! - `UnionFind`: classic two-pass labeling with a growable equivalence table.
//!
//! Components are emitted in the raster order of their first pixel
//! (top-to-bottom, left-to-right). Every foreground pixel belongs to exactly
//! one component; background yields nothing.

use serde::{Deserialize, Serialize};

use crate::error::{MotionError, MotionResult};
use crate::frame::{scratch_vec, scratch_with_capacity, BinaryMask, BoundingBox, Component, FOREGROUND};

/// Offsets of the 8 neighbours of a pixel.
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Labeling algorithm used by the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelingStrategy {
    #[default]
    FloodFill,
    UnionFind,
}

impl LabelingStrategy {
    pub fn segment(self, mask: &BinaryMask) -> MotionResult<Vec<Component>> {
        match self {
            LabelingStrategy::FloodFill => segment(mask),
            LabelingStrategy::UnionFind => segment_union_find(mask),
        }
    }
}

impl std::str::FromStr for LabelingStrategy {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flood-fill" | "flood_fill" => Ok(Self::FloodFill),
            "union-find" | "union_find" => Ok(Self::UnionFind),
            other => Err(MotionError::InvalidParameter(format!(
                "unknown labeling strategy '{}'",
                other
            ))),
        }
    }
}

/// Segment `mask` into components using an iterative flood fill.
pub fn segment(mask: &BinaryMask) -> MotionResult<Vec<Component>> {
    let mut components = Vec::new();
    flood_fill(mask, |component| {
        components
            .try_reserve(1)
            .map_err(|_| MotionError::AllocationFailure {
                buffer: "component list",
                bytes: std::mem::size_of::<Component>(),
            })?;
        components.push(component);
        Ok(())
    })?;
    Ok(components)
}

/// Number of 8-connected components in `mask`.
pub fn count_regions(mask: &BinaryMask) -> MotionResult<usize> {
    let mut count = 0;
    flood_fill(mask, |_| {
        count += 1;
        Ok(())
    })?;
    Ok(count)
}

fn flood_fill(
    mask: &BinaryMask,
    mut emit: impl FnMut(Component) -> MotionResult<()>,
) -> MotionResult<()> {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let pixels = mask.as_slice();

    let mut visited = scratch_vec(pixels.len(), false, "visited bitmap")?;
    // Pixels are marked on push, so each is pushed at most once.
    let mut stack: Vec<usize> = scratch_with_capacity(pixels.len(), "fill stack")?;

    for seed in 0..pixels.len() {
        if pixels[seed] != FOREGROUND || visited[seed] {
            continue;
        }
        let mut bbox = BoundingBox::point((seed % width) as u32, (seed / width) as u32);
        let mut pixel_count = 0usize;

        visited[seed] = true;
        stack.push(seed);
        while let Some(index) = stack.pop() {
            let x = index % width;
            let y = index / width;
            bbox.include(x as u32, y as u32);
            pixel_count += 1;

            for (dx, dy) in NEIGHBOURS {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let next = ny as usize * width + nx as usize;
                if pixels[next] == FOREGROUND && !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
        emit(Component { bbox, pixel_count })?;
    }
    Ok(())
}

/// Segment `mask` with two-pass union-find labeling.
pub fn segment_union_find(mask: &BinaryMask) -> MotionResult<Vec<Component>> {
    let width = mask.width() as usize;
    let pixels = mask.as_slice();

    // Label 0 is background; parent[0] is a placeholder.
    let mut labels = scratch_vec(pixels.len(), 0u32, "label map")?;
    let mut parent: Vec<u32> = scratch_with_capacity(64, "label table")?;
    parent.push(0);

    // Pass 1: provisional labels from the already-scanned neighbours (W, NW, N, NE).
    for index in 0..pixels.len() {
        if pixels[index] != FOREGROUND {
            continue;
        }
        let x = index % width;
        let y = index / width;
        let mut current = 0u32;
        let mut visit = |neighbour: usize, parent: &mut Vec<u32>| {
            let label = labels[neighbour];
            if label == 0 {
                return;
            }
            if current == 0 {
                current = label;
            } else {
                union(parent, current, label);
            }
        };
        if x > 0 {
            visit(index - 1, &mut parent);
        }
        if y > 0 {
            let up = index - width;
            if x > 0 {
                visit(up - 1, &mut parent);
            }
            visit(up, &mut parent);
            if x + 1 < width {
                visit(up + 1, &mut parent);
            }
        }
        if current == 0 {
            current = u32::try_from(parent.len()).map_err(|_| MotionError::AllocationFailure {
                buffer: "label table",
                bytes: parent.len().saturating_mul(4),
            })?;
            parent
                .try_reserve(1)
                .map_err(|_| MotionError::AllocationFailure {
                    buffer: "label table",
                    bytes: (parent.len() + 1).saturating_mul(4),
                })?;
            parent.push(current);
        }
        labels[index] = current;
    }

    // Pass 2: resolve roots and accumulate components in first-pixel order.
    let mut slot = scratch_vec(parent.len(), usize::MAX, "component slots")?;
    let mut components: Vec<Component> = Vec::new();
    for index in 0..pixels.len() {
        let label = labels[index];
        if label == 0 {
            continue;
        }
        let root = find(&mut parent, label) as usize;
        let x = (index % width) as u32;
        let y = (index / width) as u32;
        if slot[root] == usize::MAX {
            components
                .try_reserve(1)
                .map_err(|_| MotionError::AllocationFailure {
                    buffer: "component list",
                    bytes: std::mem::size_of::<Component>(),
                })?;
            slot[root] = components.len();
            components.push(Component {
                bbox: BoundingBox::point(x, y),
                pixel_count: 0,
            });
        }
        let component = &mut components[slot[root]];
        component.bbox.include(x, y);
        component.pixel_count += 1;
    }
    Ok(components)
}

fn find(parent: &mut [u32], mut label: u32) -> u32 {
    while parent[label as usize] != label {
        let grand = parent[parent[label as usize] as usize];
        parent[label as usize] = grand;
        label = grand;
    }
    label
}

// The smaller root wins, so a root is always the oldest label of its set.
fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra < rb {
        parent[rb as usize] = ra;
    } else if rb < ra {
        parent[ra as usize] = rb;
    }
}
