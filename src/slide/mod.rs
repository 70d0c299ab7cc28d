//! Multi-resolution slide sources
//!
//! `PyramidSource` is the read-only view the patching pipeline works
//! against. `TiffSlide` implements it over TIFF/BigTIFF pyramids (Aperio
//! SVS and generic tiled TIFF); `MemorySlide` holds the levels in memory.

mod pyramid;
mod tiff_slide;
mod memory;

pub use pyramid::{Level, PyramidSource};
pub use tiff_slide::TiffSlide;
pub use memory::MemorySlide;
