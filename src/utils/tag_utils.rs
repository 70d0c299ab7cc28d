//! TIFF tag utilities
//!
//! Value-size rules, array decoding and display names for tag entries.

use byteorder::ReadBytesExt;

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::{PatchError, PatchResult};
use crate::tiff::ifd::IFDEntry;
use crate::tiff::constants::{compression, field_types, tags};

/// Size in bytes of one value of the given field type
pub fn field_type_size(field_type: u16) -> u64 {
    match field_type {
        field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => 1,
        field_types::SHORT | field_types::SSHORT => 2,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE |
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
        _ => 1,
    }
}

/// Whether a value of `count` items fits in the entry's value field
///
/// The field is 4 bytes wide in classic TIFF and 8 bytes in BigTIFF.
pub fn is_value_inline(field_type: u16, count: u64, is_big_tiff: bool) -> bool {
    let total_size = field_type_size(field_type).saturating_mul(count);
    total_size <= if is_big_tiff { 8 } else { 4 }
}

/// Decodes `entry.count` integer values from the reader's current position
///
/// Rationals are packed as `numerator << 32 | denominator`.
pub fn read_tag_value_array(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
    values: &mut Vec<u64>
) -> PatchResult<()> {
    for _ in 0..entry.count {
        let value = read_single_value(reader, entry.field_type, handler)?;
        values.push(value);
    }

    Ok(())
}

/// Decodes one integer value of the given field type
pub fn read_single_value(
    reader: &mut dyn SeekableReader,
    field_type: u16,
    handler: &dyn ByteOrderHandler,
) -> PatchResult<u64> {
    let value = match field_type {
        field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => reader.read_u8()? as u64,
        field_types::SHORT | field_types::SSHORT => handler.read_u16(reader)? as u64,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => handler.read_u32(reader)? as u64,
        field_types::RATIONAL | field_types::SRATIONAL => {
            let (num, den) = handler.read_rational(reader)?;
            ((num as u64) << 32) | (den as u64)
        },
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(reader)?,
        _ => return Err(PatchError::UnsupportedFieldType(field_type)),
    };

    Ok(value)
}

/// Human-readable tag name for logs and inspection output
pub fn get_tag_name(tag: u16) -> &'static str {
    match tag {
        tags::NEW_SUBFILE_TYPE => "NewSubfileType",
        tags::IMAGE_WIDTH => "ImageWidth",
        tags::IMAGE_LENGTH => "ImageLength",
        tags::BITS_PER_SAMPLE => "BitsPerSample",
        tags::COMPRESSION => "Compression",
        tags::PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        tags::IMAGE_DESCRIPTION => "ImageDescription",
        tags::STRIP_OFFSETS => "StripOffsets",
        tags::SAMPLES_PER_PIXEL => "SamplesPerPixel",
        tags::ROWS_PER_STRIP => "RowsPerStrip",
        tags::STRIP_BYTE_COUNTS => "StripByteCounts",
        tags::PLANAR_CONFIGURATION => "PlanarConfiguration",
        tags::PREDICTOR => "Predictor",
        tags::TILE_WIDTH => "TileWidth",
        tags::TILE_LENGTH => "TileLength",
        tags::TILE_OFFSETS => "TileOffsets",
        tags::TILE_BYTE_COUNTS => "TileByteCounts",
        tags::JPEG_TABLES => "JPEGTables",
        _ => "Unknown",
    }
}

pub fn get_field_type_name(field_type: u16) -> &'static str {
    match field_type {
        field_types::BYTE => "BYTE",
        field_types::ASCII => "ASCII",
        field_types::SHORT => "SHORT",
        field_types::LONG => "LONG",
        field_types::RATIONAL => "RATIONAL",
        field_types::SBYTE => "SBYTE",
        field_types::UNDEFINED => "UNDEFINED",
        field_types::SSHORT => "SSHORT",
        field_types::SLONG => "SLONG",
        field_types::SRATIONAL => "SRATIONAL",
        field_types::FLOAT => "FLOAT",
        field_types::DOUBLE => "DOUBLE",
        field_types::LONG8 => "LONG8",
        field_types::SLONG8 => "SLONG8",
        field_types::IFD8 => "IFD8",
        _ => "Unknown",
    }
}

pub fn get_compression_name(compression_code: u64) -> &'static str {
    match compression_code as u16 {
        compression::NONE => "None",
        compression::LZW => "LZW",
        compression::JPEG => "JPEG",
        compression::DEFLATE => "Adobe Deflate",
        compression::ZSTD => "Zstandard",
        compression::JPEG_2000_APERIO | compression::JPEG_2000_APERIO_RGB => "Aperio JPEG 2000",
        _ => "Unknown",
    }
}
