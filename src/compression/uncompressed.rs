//! Handler for uncompressed data

use crate::tiff::errors::PatchResult;
use super::handler::CompressionHandler;

/// Compression code 1
pub struct UncompressedHandler;

impl CompressionHandler for UncompressedHandler {
    fn decompress(&self, data: &[u8]) -> PatchResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "Uncompressed"
    }

    fn code(&self) -> u64 {
        1
    }
}
