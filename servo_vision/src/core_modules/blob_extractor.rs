// THEORY:
// The `BlobExtractor` is the spatial grouping layer. It takes the binary
// foreground mask of one frame and turns it into a list of candidate blobs.
//
// Algorithm steps:
// 1.  **Exterior Flood**: Background pixels reachable from the image border
//     (4-connected) are marked as "outside". Background pixels that are not
//     outside are holes enclosed by some foreground region.
// 2.  **Component Growing**: The mask is scanned row by row, left to right. Each
//     unvisited foreground pixel seeds a breadth-first region grow over its
//     8-connected foreground neighbours.
// 3.  **External Filter**: A component that touches neither the image border nor
//     an outside background pixel sits inside a hole of another component. Only
//     external components become blobs, as with external-contour retrieval.
// 4.  **Area Filter**: Components whose pixel count does not exceed the minimum
//     area are sensor noise and are dropped.
//
// The output order is the scan order of each component's first pixel. That order
// is what the target selector relies on, so it is never sorted.
//
// The extractor is stateless: one mask in, one list of blobs out.

use crate::core_modules::background_model::{ForegroundMask, BACKGROUND_VALUE};
use crate::core_modules::blob::{Blob, BoundingBox, Point};

/// Blobs at or below this many pixels are discarded.
pub const DEFAULT_MIN_BLOB_AREA: u32 = 500;

pub mod blob_extractor {
    use super::*;
    use std::collections::VecDeque;

    const NEIGHBOURS_4: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
    const NEIGHBOURS_8: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// Finds the external foreground components of `mask` whose area exceeds
    /// `min_area`, in scan order.
    pub fn find_blobs(mask: &ForegroundMask, min_area: u32) -> Vec<Blob> {
        let width = mask.width() as i32;
        let height = mask.height() as i32;
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let pixels = mask.as_raw();
        let is_foreground = |x: i32, y: i32| pixels[(y * width + x) as usize] != BACKGROUND_VALUE;

        // --- 1. Exterior Flood ---
        let outside = flood_exterior(pixels, width, height);

        // --- 2. Component Growing ---
        let mut visited = vec![false; pixels.len()];
        let mut blobs = Vec::new();
        let mut queue: VecDeque<(i32, i32)> = VecDeque::new();

        for y in 0..height {
            for x in 0..width {
                let index = (y * width + x) as usize;
                if visited[index] || !is_foreground(x, y) {
                    continue;
                }

                visited[index] = true;
                queue.push_back((x, y));
                let mut min = Point { x, y };
                let mut max = Point { x, y };
                let mut area: u32 = 0;
                let mut external = false;

                while let Some((cx, cy)) = queue.pop_front() {
                    area += 1;
                    min.x = min.x.min(cx);
                    min.y = min.y.min(cy);
                    max.x = max.x.max(cx);
                    max.y = max.y.max(cy);

                    if cx == 0 || cy == 0 || cx == width - 1 || cy == height - 1 {
                        external = true;
                    }

                    for (dx, dy) in NEIGHBOURS_4 {
                        let (nx, ny) = (cx + dx, cy + dy);
                        if in_bounds(nx, ny, width, height) && outside[(ny * width + nx) as usize] {
                            external = true;
                        }
                    }

                    for (dx, dy) in NEIGHBOURS_8 {
                        let (nx, ny) = (cx + dx, cy + dy);
                        if !in_bounds(nx, ny, width, height) {
                            continue;
                        }
                        let n_index = (ny * width + nx) as usize;
                        if !visited[n_index] && is_foreground(nx, ny) {
                            visited[n_index] = true;
                            queue.push_back((nx, ny));
                        }
                    }
                }

                // --- 3. External Filter & 4. Area Filter ---
                if external && area > min_area {
                    blobs.push(Blob::new(BoundingBox::from_extent(min, max), area));
                }
            }
        }

        blobs
    }

    fn in_bounds(x: i32, y: i32, width: i32, height: i32) -> bool {
        x >= 0 && y >= 0 && x < width && y < height
    }

    /// Marks every background pixel 4-connected to the image border.
    fn flood_exterior(pixels: &[u8], width: i32, height: i32) -> Vec<bool> {
        let mut outside = vec![false; pixels.len()];
        let mut stack: Vec<(i32, i32)> = Vec::new();

        let seed = |x: i32, y: i32, outside: &mut Vec<bool>, stack: &mut Vec<(i32, i32)>| {
            let index = (y * width + x) as usize;
            if !outside[index] && pixels[index] == BACKGROUND_VALUE {
                outside[index] = true;
                stack.push((x, y));
            }
        };

        for x in 0..width {
            seed(x, 0, &mut outside, &mut stack);
            seed(x, height - 1, &mut outside, &mut stack);
        }
        for y in 0..height {
            seed(0, y, &mut outside, &mut stack);
            seed(width - 1, y, &mut outside, &mut stack);
        }

        while let Some((x, y)) = stack.pop() {
            for (dx, dy) in NEIGHBOURS_4 {
                let (nx, ny) = (x + dx, y + dy);
                if in_bounds(nx, ny, width, height) {
                    seed(nx, ny, &mut outside, &mut stack);
                }
            }
        }

        outside
    }
}
