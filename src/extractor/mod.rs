//! Pixel extraction from slide pyramid levels
//!
//! Levels are stored either in tiles or in strips; each layout has its own
//! reader that decodes the overlapping blocks and copies the requested
//! region into an RGB buffer.

mod region;
mod tile_reader;
mod strip_reader;

pub use region::Region;
pub use tile_reader::TileReader;
pub use strip_reader::StripReader;

use log::debug;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::errors::PatchResult;
use crate::tiff::ifd::IFD;
use crate::tiff::TiffReader;

/// Decoder for the blocks of one level, with JPEGTables attached when present
fn block_decoder<R: SeekableReader>(
    reader: &mut R,
    ifd: &IFD,
    tiff_reader: &TiffReader,
) -> PatchResult<Box<dyn CompressionHandler>> {
    let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
    let jpeg_tables = if ifd.has_tag(tags::JPEG_TABLES) {
        Some(tiff_reader.read_tag_bytes(reader, ifd, tags::JPEG_TABLES)?)
    } else {
        None
    };

    let handler = CompressionFactory::create_handler(compression, jpeg_tables)?;
    debug!("IFD #{} uses {} compression", ifd.number, handler.name());
    Ok(handler)
}
