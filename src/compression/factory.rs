//! Factory for creating compression handlers

use crate::tiff::constants::compression;
use crate::tiff::errors::{PatchError, PatchResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::jpeg::JpegHandler;
use super::zstd::ZstdHandler;

/// Maps TIFF compression codes to handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Handler for `code`; `jpeg_tables` is the level's JPEGTables tag, if any
    pub fn create_handler(code: u64, jpeg_tables: Option<Vec<u8>>) -> PatchResult<Box<dyn CompressionHandler>> {
        match u16::try_from(code).unwrap_or(0) {
            compression::NONE => Ok(Box::new(UncompressedHandler)),
            compression::DEFLATE | 32946 => Ok(Box::new(AdobeDeflateHandler)),
            compression::ZSTD => Ok(Box::new(ZstdHandler)),
            compression::JPEG => Ok(Box::new(JpegHandler::new(jpeg_tables))),
            _ => Err(PatchError::UnsupportedCompression(code))
        }
    }

    /// Whether `code` can be decoded, for inspection output
    pub fn is_supported(code: u64) -> bool {
        Self::create_handler(code, None).is_ok()
    }
}
