//! Handler for JPEG compressed tiles
//!
//! Aperio and most other slide scanners store levels as abbreviated JPEG
//! streams: quantization and Huffman tables live once in the JPEGTables tag
//! and every tile carries only its scan. The two are spliced back into a
//! full interchange stream before decoding with the `image` crate.

use image::ImageFormat;
use log::trace;

use crate::tiff::errors::PatchResult;
use super::handler::CompressionHandler;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// JPEG ("new-style"), compression code 7
pub struct JpegHandler {
    tables: Option<Vec<u8>>,
}

impl JpegHandler {
    pub fn new(tables: Option<Vec<u8>>) -> Self {
        JpegHandler { tables }
    }

    /// Prepends the shared tables to a tile stream
    ///
    /// The tables segment is `SOI ... EOI`; its EOI and the tile's SOI are
    /// dropped so the result is a single well-formed stream.
    fn splice_tables(&self, data: &[u8]) -> Vec<u8> {
        match &self.tables {
            Some(tables) if tables.len() >= 4 && data.starts_with(&SOI) => {
                let table_body = if tables.ends_with(&EOI) { &tables[..tables.len() - 2] } else { &tables[..] };
                let mut stream = Vec::with_capacity(table_body.len() + data.len());
                stream.extend_from_slice(table_body);
                stream.extend_from_slice(&data[2..]);
                trace!("Spliced {} bytes of JPEG tables into tile stream", table_body.len());
                stream
            },
            _ => data.to_vec(),
        }
    }
}

impl CompressionHandler for JpegHandler {
    fn decompress(&self, data: &[u8]) -> PatchResult<Vec<u8>> {
        let stream = self.splice_tables(data);
        let decoded = image::load_from_memory_with_format(&stream, ImageFormat::Jpeg)?;
        Ok(decoded.to_rgb8().into_raw())
    }

    fn name(&self) -> &'static str {
        "JPEG"
    }

    fn code(&self) -> u64 {
        7
    }

    fn decoded_samples(&self, _stored: usize) -> usize {
        3
    }
}
