//! Low-level I/O for slide files
//!
//! Seekable reader abstraction plus endian-aware primitive reads used by
//! the TIFF container parser.

pub mod seekable;
pub mod byte_order;
