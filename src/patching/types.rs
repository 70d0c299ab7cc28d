//! Value types flowing through the patching pipeline

use std::fmt;

use crate::tiff::errors::{PatchError, PatchResult};

/// What to extract: square patches of `patch_edge` pixels at `magnification`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSpec {
    pub patch_edge: u32,
    pub magnification: f64,
}

impl TargetSpec {
    pub fn new(patch_edge: u32, magnification: f64) -> PatchResult<Self> {
        if patch_edge == 0 {
            return Err(PatchError::Configuration("patch edge must be positive".to_string()));
        }
        if !magnification.is_finite() || magnification <= 0.0 {
            return Err(PatchError::Configuration(format!(
                "magnification must be positive, got {}", magnification
            )));
        }
        Ok(TargetSpec { patch_edge, magnification })
    }
}

/// Where and how to read one patch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchDescriptor {
    /// (row, col) in the grid
    pub grid_index: (usize, usize),
    /// Top-left corner in level-0 pixels
    pub read_location: (i64, i64),
    pub level: usize,
    /// Region size in pixels of `level`
    pub read_size: (u32, u32),
    /// Always `(patch_edge, patch_edge)`
    pub output_size: (u32, u32),
    /// `read_size / output_size`, never below 1
    pub resize_factor: f64,
}

impl PatchDescriptor {
    pub fn row(&self) -> usize {
        self.grid_index.0
    }

    pub fn col(&self) -> usize {
        self.grid_index.1
    }
}

/// Outcome of the background test for one patch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterVerdict {
    /// Percentage of background pixels, 0 to 100
    pub white_fraction: f64,
    pub accepted: bool,
}

/// Terminal state of one image
#[derive(Debug, Clone, PartialEq)]
pub enum ImageStatus {
    Completed,
    /// Processing stopped on a per-image error
    Failed(String),
}

impl ImageStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, ImageStatus::Completed)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageStatus::Completed => write!(f, "completed"),
            ImageStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Counters for one processed image
///
/// `total_candidate_patches` counts every planned grid cell. Of those,
/// `sampled_patches` passed the sampler and were read; each read ends as
/// accepted, rejected or a read error.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageExtractionResult {
    pub source_name: String,
    pub status: ImageStatus,
    /// Pyramid level the patches were read from
    pub level: Option<usize>,
    pub total_candidate_patches: usize,
    pub sampled_patches: usize,
    pub accepted_patches: usize,
    pub rejected_patches: usize,
    pub read_errors: usize,
    /// `accepted / total`, `None` when nothing was planned
    pub accepted_fraction: Option<f64>,
}

impl ImageExtractionResult {
    pub fn completed(
        source_name: &str,
        level: usize,
        total_candidate_patches: usize,
        counts: PatchCounts,
    ) -> Self {
        ImageExtractionResult {
            source_name: source_name.to_string(),
            status: ImageStatus::Completed,
            level: Some(level),
            total_candidate_patches,
            sampled_patches: counts.sampled,
            accepted_patches: counts.accepted,
            rejected_patches: counts.rejected,
            read_errors: counts.read_errors,
            accepted_fraction: accepted_fraction(counts.accepted, total_candidate_patches),
        }
    }

    /// Result for an image that stopped early
    ///
    /// Counters gathered before the failure are kept.
    pub fn failed(
        source_name: &str,
        level: Option<usize>,
        total_candidate_patches: usize,
        counts: PatchCounts,
        error: &PatchError,
    ) -> Self {
        ImageExtractionResult {
            source_name: source_name.to_string(),
            status: ImageStatus::Failed(error.to_string()),
            level,
            total_candidate_patches,
            sampled_patches: counts.sampled,
            accepted_patches: counts.accepted,
            rejected_patches: counts.rejected,
            read_errors: counts.read_errors,
            accepted_fraction: accepted_fraction(counts.accepted, total_candidate_patches),
        }
    }
}

/// Snapshot of the per-image patch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchCounts {
    pub sampled: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub read_errors: usize,
}

fn accepted_fraction(accepted: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(accepted as f64 / total as f64)
    }
}

/// Results of a batch, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchExtractionResult {
    pub images: Vec<ImageExtractionResult>,
}

impl BatchExtractionResult {
    pub fn new(images: Vec<ImageExtractionResult>) -> Self {
        BatchExtractionResult { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageExtractionResult> {
        self.images.iter()
    }

    pub fn completed_count(&self) -> usize {
        self.images.iter().filter(|r| r.status.is_completed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.images.len() - self.completed_count()
    }

    pub fn total_accepted(&self) -> usize {
        self.images.iter().map(|r| r.accepted_patches).sum()
    }
}
