//! Shared helpers

pub mod logger;
pub(crate) mod progress;
pub(crate) mod ifd_utils;
pub(crate) mod string_utils;
pub(crate) mod format_utils;
pub(crate) mod tag_utils;
pub(crate) mod pixel_utils;
