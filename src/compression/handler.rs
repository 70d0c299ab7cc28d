//! Compression handler trait definition

use crate::tiff::errors::PatchResult;

/// Strategy for decoding one compressed tile or strip
pub trait CompressionHandler: Send + Sync {
    /// Decode to interleaved 8-bit samples
    fn decompress(&self, data: &[u8]) -> PatchResult<Vec<u8>>;

    fn name(&self) -> &'static str;

    /// TIFF compression code handled
    fn code(&self) -> u64;

    /// Samples per pixel of the decoded buffer, given the stored count
    fn decoded_samples(&self, stored: usize) -> usize {
        stored
    }
}
