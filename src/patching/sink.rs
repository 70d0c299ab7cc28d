//! Destinations for accepted patches

use std::fs;
use std::path::{Path, PathBuf};

use log::trace;

use crate::patching::patch_reader::PatchPixels;
use crate::patching::types::PatchDescriptor;
use crate::tiff::errors::{PatchError, PatchResult};

/// Receives every accepted patch
///
/// Called concurrently from pool workers, so implementations must be
/// thread-safe. A failure aborts the image being processed.
pub trait PatchSink: Send + Sync {
    fn save(&self, source_name: &str, descriptor: &PatchDescriptor, pixels: &PatchPixels) -> PatchResult<()>;
}

/// File name of an accepted patch: `<source>_<row>_<col>.png`
pub fn patch_file_name(source_name: &str, descriptor: &PatchDescriptor) -> String {
    format!("{}_{:03}_{:03}.png", source_name, descriptor.row(), descriptor.col())
}

/// Writes accepted patches as PNG files into one directory
pub struct PngDirectorySink {
    directory: PathBuf,
}

impl PngDirectorySink {
    /// Creates `directory` (and its parents) if needed
    pub fn new(directory: &Path) -> PatchResult<Self> {
        fs::create_dir_all(directory).map_err(|e| PatchError::OutputWrite(format!(
            "cannot create output directory {}: {}", directory.display(), e
        )))?;
        Ok(PngDirectorySink { directory: directory.to_path_buf() })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl PatchSink for PngDirectorySink {
    fn save(&self, source_name: &str, descriptor: &PatchDescriptor, pixels: &PatchPixels) -> PatchResult<()> {
        let path = self.directory.join(patch_file_name(source_name, descriptor));
        pixels.save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| PatchError::OutputWrite(format!("{}: {}", path.display(), e)))?;
        trace!("Saved {}", path.display());
        Ok(())
    }
}

/// Drops every patch; only the counters of a run are kept
pub struct DiscardSink;

impl PatchSink for DiscardSink {
    fn save(&self, _source_name: &str, _descriptor: &PatchDescriptor, _pixels: &PatchPixels) -> PatchResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patching::grid_planner::GridPlan;

    #[test]
    fn file_names_pad_grid_indices() {
        let descriptor = GridPlan::new(0, 4000, 4000, 1.0, 100, 1.0).descriptor(3, 12);
        assert_eq!(patch_file_name("TCGA-01", &descriptor), "TCGA-01_003_012.png");
    }
}
