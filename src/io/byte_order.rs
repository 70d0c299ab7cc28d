//! Byte order handling for slide files
//!
//! TIFF-based slides declare their endianness in the first two bytes of the
//! header. Every multi-byte read after that goes through a
//! `ByteOrderHandler` picked once per file.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Result;

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{PatchError, PatchResult};

/// Byte order declared by a TIFF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// "II", Intel order
    LittleEndian,
    /// "MM", Motorola order
    BigEndian,
}

impl ByteOrder {
    /// Reads the two-byte marker at the current position
    pub fn detect(reader: &mut dyn SeekableReader) -> PatchResult<Self> {
        let marker = reader.read_u16::<LittleEndian>()?;
        match marker {
            0x4949 => Ok(ByteOrder::LittleEndian),
            0x4D4D => Ok(ByteOrder::BigEndian),
            _ => Err(PatchError::InvalidByteOrder(marker)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// Creates the read strategy for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndianHandler),
            ByteOrder::BigEndian => Box::new(BigEndianHandler),
        }
    }
}

/// Endian-aware primitive reads
pub trait ByteOrderHandler: Send + Sync {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64>;

    /// Reads a numerator/denominator pair
    fn read_rational(&self, reader: &mut dyn SeekableReader) -> Result<(u32, u32)> {
        let numerator = self.read_u32(reader)?;
        let denominator = self.read_u32(reader)?;
        Ok((numerator, denominator))
    }

    /// Reads a file offset or count, 8 bytes wide in BigTIFF and 4 otherwise
    fn read_offset(&self, reader: &mut dyn SeekableReader, is_big_tiff: bool) -> Result<u64> {
        if is_big_tiff {
            self.read_u64(reader)
        } else {
            self.read_u32(reader).map(u64::from)
        }
    }
}

/// Little-endian reads
pub struct LittleEndianHandler;

impl ByteOrderHandler for LittleEndianHandler {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<LittleEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<LittleEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<LittleEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<LittleEndian>()
    }
}

/// Big-endian reads
pub struct BigEndianHandler;

impl ByteOrderHandler for BigEndianHandler {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<BigEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<BigEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<BigEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<BigEndian>()
    }
}
