//! Pipe-separated batch summary

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::patching::types::{BatchExtractionResult, ImageExtractionResult, ImageStatus};
use crate::tiff::errors::{PatchError, PatchResult};

pub const SUMMARY_HEADER: &str =
    "source_name|status|level|total_candidate_patches|sampled_patches|accepted_patches|rejected_patches|read_errors|accepted_fraction";

/// Field separators and line breaks cannot appear inside a cell
fn sanitize(field: &str) -> String {
    field.replace('|', "/").replace(['\r', '\n'], " ")
}

/// One summary line, without the terminator
pub fn summary_row(result: &ImageExtractionResult) -> String {
    let status = match &result.status {
        ImageStatus::Completed => "completed".to_string(),
        ImageStatus::Failed(reason) => format!("failed: {}", sanitize(reason)),
    };
    let level = result.level.map(|level| level.to_string()).unwrap_or_default();
    let fraction = result.accepted_fraction
        .map(|fraction| format!("{:.4}", fraction))
        .unwrap_or_else(|| "NaN".to_string());

    format!("{}|{}|{}|{}|{}|{}|{}|{}|{}",
            sanitize(&result.source_name), status, level,
            result.total_candidate_patches, result.sampled_patches,
            result.accepted_patches, result.rejected_patches, result.read_errors,
            fraction)
}

/// Writes the header and one row per image, in batch order
pub fn write_summary<W: Write>(writer: &mut W, batch: &BatchExtractionResult) -> PatchResult<()> {
    writeln!(writer, "{}", SUMMARY_HEADER)?;
    for result in batch.iter() {
        writeln!(writer, "{}", summary_row(result))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the summary file at `path`
pub fn save_summary(path: &Path, batch: &BatchExtractionResult) -> PatchResult<()> {
    let file = File::create(path)
        .map_err(|e| PatchError::OutputWrite(format!("{}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    write_summary(&mut writer, batch)
        .map_err(|e| PatchError::OutputWrite(format!("{}: {}", path.display(), e)))?;

    info!("Wrote summary of {} images to {}", batch.len(), path.display());
    Ok(())
}
