//! TIFF container parsing
//!
//! Whole-slide formats such as Aperio SVS are TIFF or BigTIFF files whose
//! IFD chain stores one image per pyramid level. This module parses that
//! chain; `crate::slide` turns it into a pyramid.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
#[cfg(test)]
mod tests;
pub(crate) mod constants;
pub(crate) mod validation;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{PatchError, PatchResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
