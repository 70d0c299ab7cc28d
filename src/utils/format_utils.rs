//! TIFF header utilities
//!
//! Byte order and TIFF/BigTIFF flavour detection at the start of a file.

use log::debug;
use crate::io::seekable::SeekableReader;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::tiff::errors::{PatchError, PatchResult};
use crate::tiff::constants::header;
use crate::tiff::validation;

/// Reads the byte order marker at the start of the file
pub fn detect_byte_order(reader: &mut dyn SeekableReader) -> PatchResult<ByteOrder> {
    let byte_order = ByteOrder::detect(reader)?;
    debug!("Detected byte order: {}", byte_order.name());
    Ok(byte_order)
}

/// Reads the version word and returns whether the file is a BigTIFF
pub fn detect_tiff_format(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler
) -> PatchResult<bool> {
    let version = byte_order_handler.read_u16(reader)?;
    debug!("TIFF version: {}", version);

    match version {
        header::BIG_TIFF_VERSION => {
            validation::validate_bigtiff_header(reader, byte_order_handler)?;
            Ok(true)
        },
        header::TIFF_VERSION => Ok(false),
        _ => Err(PatchError::UnsupportedVersion(version)),
    }
}
