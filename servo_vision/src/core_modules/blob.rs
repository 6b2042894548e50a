// THEORY:
// A `Blob` is a single, spatially coherent region of foreground pixels in one
// frame. It is a stateless data container: a snapshot with a bounding box, a
// pixel area and a centroid, and no memory of earlier frames. Blobs are derived
// fresh every frame and are never persisted.
//
// The centroid is the center of the bounding box in integer pixel coordinates,
// which is the point the actuator controller steers towards.

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// An axis-aligned rectangle given by its top-left corner and size.
/// `width` and `height` count pixels, so a single pixel has size 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Smallest box containing the inclusive pixel range `[min, max]`.
    pub fn from_extent(min: Point, max: Point) -> Self {
        Self {
            x: min.x,
            y: min.y,
            width: max.x - min.x + 1,
            height: max.y - min.y + 1,
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2,
            y: self.y + self.height / 2,
        }
    }
}

/// A filtered foreground region detected in a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bounding_box: BoundingBox,
    /// Number of foreground pixels in the region.
    pub area: u32,
    pub centroid: Point,
}

impl Blob {
    pub fn new(bounding_box: BoundingBox, area: u32) -> Self {
        Self {
            centroid: bounding_box.center(),
            bounding_box,
            area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_is_inclusive() {
        let bbox = BoundingBox::from_extent(Point { x: 370, y: 210 }, Point { x: 429, y: 269 });
        assert_eq!((bbox.width, bbox.height), (60, 60));
        assert_eq!(bbox.center(), Point { x: 400, y: 240 });
    }

    #[test]
    fn centroid_rounds_down() {
        let blob = Blob::new(BoundingBox { x: 10, y: 20, width: 5, height: 3 }, 15);
        assert_eq!(blob.centroid, Point { x: 12, y: 21 });
    }
}
