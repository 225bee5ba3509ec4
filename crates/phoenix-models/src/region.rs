use serde::{Deserialize, Serialize};

/// Axis-aligned box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Left edge x-coordinate
    pub x: i32,
    /// Top edge y-coordinate
    pub y: i32,
    /// Box width
    pub width: i32,
    /// Box height
    pub height: i32,
}

impl Region {
    /// Create a new region.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a region from inclusive-exclusive corner coordinates.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> i32 {
        self.y + self.height
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Multiply every coordinate by `factor`.
    ///
    /// Used to map boxes found on a downscaled frame back to frame space.
    pub fn scale(&self, factor: i32) -> Region {
        Region {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    /// Return a new region with padding added on all sides.
    pub fn pad(&self, padding: i32) -> Region {
        Region {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + 2 * padding,
            height: self.height + 2 * padding,
        }
    }

    /// Intersect with the frame rectangle.
    pub fn clamp(&self, frame_width: u32, frame_height: u32) -> Region {
        let x1 = self.x.clamp(0, frame_width as i32);
        let y1 = self.y.clamp(0, frame_height as i32);
        let x2 = self.x2().clamp(0, frame_width as i32);
        let y2 = self.y2().clamp(0, frame_height as i32);
        Region::from_corners(x1, y1, x2, y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_back_to_frame_space() {
        let small = Region::new(10, 20, 30, 40);
        assert_eq!(small.scale(4), Region::new(40, 80, 120, 160));
    }

    #[test]
    fn test_clamp_to_frame() {
        let r = Region::new(-10, 350, 50, 50).clamp(640, 360);
        assert_eq!(r, Region::new(0, 350, 40, 10));
    }

    #[test]
    fn test_from_corners_normalizes_order() {
        let r = Region::from_corners(50, 60, 10, 20);
        assert_eq!(r, Region::new(10, 20, 40, 40));
        assert_eq!(r.area(), 1600);
    }
}
