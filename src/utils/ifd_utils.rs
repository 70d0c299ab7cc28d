//! IFD layout utilities

use std::io::Cursor;

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::PatchResult;
use crate::tiff::ifd::IFD;
use crate::utils::tag_utils;

/// Size in bytes of an IFD, up to and including its next-IFD pointer
pub fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
    if is_big_tiff {
        // 8 (entry count) + 20 per entry + 8 (next IFD offset)
        8 + (20 * ifd.entries.len() as u64) + 8
    } else {
        // 2 (entry count) + 12 per entry + 4 (next IFD offset)
        2 + (12 * ifd.entries.len() as u64) + 4
    }
}

/// Decodes the first value stored inline in an entry's raw value field
///
/// A SHORT in a big-endian file sits in the first two bytes of the field,
/// so the field cannot simply be read back as one wide integer.
pub fn decode_inline_value(
    raw: &[u8],
    field_type: u16,
    handler: &dyn ByteOrderHandler,
) -> PatchResult<u64> {
    let mut cursor = Cursor::new(raw);
    tag_utils::read_single_value(&mut cursor, field_type, handler)
}

/// Decodes a value-field offset (4 or 8 bytes wide)
pub fn decode_offset(raw: &[u8], is_big_tiff: bool, handler: &dyn ByteOrderHandler) -> PatchResult<u64> {
    let mut cursor = Cursor::new(raw);
    Ok(handler.read_offset(&mut cursor, is_big_tiff)?)
}
