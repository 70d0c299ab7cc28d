//! Rectangular pixel region of one pyramid level

/// Region for extraction, in pixel coordinates of a level
///
/// (0,0) is the top-left corner of the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Region { x, y, width, height }
    }

    /// X coordinate just past the right edge
    pub fn end_x(&self) -> u32 {
        self.x + self.width
    }

    /// Y coordinate just past the bottom edge
    pub fn end_y(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the region lies entirely inside a `width` x `height` level
    pub fn fits_within(&self, width: u64, height: u64) -> bool {
        self.width > 0
            && self.height > 0
            && self.end_x() as u64 <= width
            && self.end_y() as u64 <= height
    }

    /// Whether level pixel (x, y) is inside the region
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.end_x() && y >= self.y && y < self.end_y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_within_requires_the_whole_region() {
        let region = Region::new(96, 0, 32, 32);
        assert!(region.fits_within(128, 32));
        assert!(!region.fits_within(127, 32));
        assert!(!Region::new(0, 0, 0, 10).fits_within(128, 128));
    }

    #[test]
    fn contains_is_end_exclusive() {
        let region = Region::new(10, 10, 5, 5);
        assert!(region.contains(10, 14));
        assert!(!region.contains(15, 10));
    }
}
