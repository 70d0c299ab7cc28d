//! Non-overlapping patch grid over one pyramid level

use crate::patching::types::PatchDescriptor;

/// Grid geometry for one level
///
/// Rows and columns are the rounded number of `level_patch_edge` squares
/// that fit the level, so a trailing remainder of less than half a patch is
/// left uncovered and a larger one becomes a full patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlan {
    pub level: usize,
    pub level_downsample: f64,
    pub patch_edge: u32,
    /// Patch edge in pixels of `level`
    pub level_patch_edge: u32,
    pub rows: usize,
    pub cols: usize,
    pub resize_factor: f64,
}

impl GridPlan {
    pub fn new(
        level: usize,
        level_width: u64,
        level_height: u64,
        level_downsample: f64,
        patch_edge: u32,
        resize_factor: f64,
    ) -> Self {
        let level_patch_edge = (patch_edge as f64 * resize_factor).round_ties_even().max(1.0) as u32;
        let rows = (level_height as f64 / level_patch_edge as f64).round_ties_even() as usize;
        let cols = (level_width as f64 / level_patch_edge as f64).round_ties_even() as usize;

        GridPlan {
            level,
            level_downsample,
            patch_edge,
            level_patch_edge,
            rows,
            cols,
            resize_factor,
        }
    }

    /// Number of grid cells
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptor of cell (`row`, `col`)
    pub fn descriptor(&self, row: usize, col: usize) -> PatchDescriptor {
        let stride = self.patch_edge as f64 * self.level_downsample;
        let mut x = (col as f64 * stride).trunc() as i64;
        let mut y = (row as f64 * stride).trunc() as i64;

        // First row and first column (but not the origin) sit one source
        // pixel short of where the level read lands. On a level that tiles
        // exactly, the last cell of row 0 and of column 0 then overrun it.
        let shift = self.level_downsample.trunc() as i64;
        if row == 0 && col != 0 {
            x += shift;
        } else if col == 0 && row != 0 {
            y += shift;
        }

        PatchDescriptor {
            grid_index: (row, col),
            read_location: (x, y),
            level: self.level,
            read_size: (self.level_patch_edge, self.level_patch_edge),
            output_size: (self.patch_edge, self.patch_edge),
            resize_factor: self.resize_factor,
        }
    }

    /// Row-major iterator over every descriptor
    pub fn iter(&self) -> GridIter {
        GridIter { plan: *self, next: 0 }
    }
}

impl IntoIterator for GridPlan {
    type Item = PatchDescriptor;
    type IntoIter = GridIter;

    fn into_iter(self) -> GridIter {
        GridIter { plan: self, next: 0 }
    }
}

/// Lazy row-major walk over a `GridPlan`
///
/// Cloning yields an independent iterator from the same position.
#[derive(Debug, Clone)]
pub struct GridIter {
    plan: GridPlan,
    next: usize,
}

impl Iterator for GridIter {
    type Item = PatchDescriptor;

    fn next(&mut self) -> Option<PatchDescriptor> {
        if self.next >= self.plan.len() {
            return None;
        }
        let (row, col) = (self.next / self.plan.cols, self.next % self.plan.cols);
        self.next += 1;
        Some(self.plan.descriptor(row, col))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.plan.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter {}

pub struct GridPlanner;

impl GridPlanner {
    /// Plans the patch grid of one level
    pub fn plan(
        level: usize,
        level_width: u64,
        level_height: u64,
        level_downsample: f64,
        patch_edge: u32,
        resize_factor: f64,
    ) -> GridIter {
        GridPlan::new(level, level_width, level_height, level_downsample, patch_edge, resize_factor).iter()
    }
}
