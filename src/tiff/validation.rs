//! TIFF and parameter validation
//!
//! Guards against malformed files (offsets past the end, broken BigTIFF
//! headers) and out-of-range run parameters.

use log::{error, warn};
use std::io::SeekFrom;

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{PatchError, PatchResult};
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::header;

/// Rejects IFD offsets that point into the header or past the end of file
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> PatchResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(PatchError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// File size, or `u64::MAX` when the reader cannot seek to its end
pub fn get_file_size(reader: &mut dyn SeekableReader) -> PatchResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(file_size)
}

/// Checks the BigTIFF offset-size word (8) and the reserved word (0)
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler
) -> PatchResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(PatchError::InvalidBigTIFFHeader);
    }

    Ok(())
}

/// Checks `min <= value <= max`, reporting a configuration error otherwise
pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> PatchResult<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if !(value >= min && value <= max) {
        return Err(PatchError::Configuration(format!(
            "Invalid {}: {} (must be between {} and {})",
            name, value, min, max
        )));
    }

    Ok(())
}
