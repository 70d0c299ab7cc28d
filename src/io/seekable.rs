//! Seekable reader trait
//!
//! Slides are parsed from files on disk in production and from in-memory
//! cursors in tests; both go through this trait object.

use std::io::{Read, Seek};

/// Any byte source the slide parser can both read and reposition
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
