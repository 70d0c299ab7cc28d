//! The pyramid abstraction shared by every slide backend

use image::DynamicImage;

use crate::tiff::errors::PatchResult;

/// One resolution level of a pyramid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    /// Position in the pyramid, 0 is full resolution
    pub index: usize,
    pub width: u64,
    pub height: u64,
    /// Scale relative to level 0 (1.0 for level 0, non-decreasing with index)
    pub downsample: f64,
}

impl Level {
    pub fn new(index: usize, width: u64, height: u64, downsample: f64) -> Self {
        Level { index, width, height, downsample }
    }

    /// Magnification this level reaches for a given level-0 magnification
    pub fn effective_magnification(&self, base_magnification: f64) -> f64 {
        base_magnification / self.downsample
    }
}

/// Read-only multi-resolution image
///
/// Implementations are immutable once opened. `read_region` takes `&self`
/// so a pool of workers can read patches of the same image concurrently.
pub trait PyramidSource: Send + Sync {
    /// Identity of the image, used to name outputs and report rows
    fn name(&self) -> &str;

    /// Levels ordered from full resolution to coarsest
    fn levels(&self) -> &[Level];

    /// Magnification of level 0, if known
    fn base_magnification(&self) -> Option<f64>;

    /// Reads a `size` region of `level` whose top-left corner is
    /// `location` in level-0 coordinates
    ///
    /// Fails with `SourceRead` when the region leaves the level extent.
    fn read_region(&self, location: (i64, i64), level: usize, size: (u32, u32)) -> PatchResult<DynamicImage>;

    fn level(&self, index: usize) -> Option<&Level> {
        self.levels().get(index)
    }

    fn level_count(&self) -> usize {
        self.levels().len()
    }
}

/// Maps a level-0 location to the top-left pixel of `level`
pub(crate) fn level_origin(location: (i64, i64), level: &Level) -> Option<(u32, u32)> {
    if location.0 < 0 || location.1 < 0 {
        return None;
    }

    let x = (location.0 as f64 / level.downsample).floor();
    let y = (location.1 as f64 / level.downsample).floor();
    if x > u32::MAX as f64 || y > u32::MAX as f64 {
        return None;
    }
    Some((x as u32, y as u32))
}
