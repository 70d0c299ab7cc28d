//! Error types for slide parsing and patch extraction
//!
//! One enum covers both the TIFF container layer and the patching pipeline
//! so that errors flow through `?` from the lowest byte read up to the
//! batch orchestrator, which decides per variant whether a failure is
//! absorbed, aborts an image, or aborts the run.

use std::fmt;
use std::io;

/// Errors raised while reading slides or extracting patches
#[derive(Debug)]
pub enum PatchError {
    /// I/O error
    IoError(io::Error),
    /// Invalid TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Image dimensions not found
    MissingDimensions,
    /// The slide carries no magnification and no fallback was configured
    MissingMagnification,
    /// No pyramid level reaches the requested magnification
    UnsatisfiableMagnification {
        /// Magnification asked for
        requested: f64,
        /// Magnification of level 0
        available: f64,
    },
    /// A planned region could not be read from the source
    SourceRead(String),
    /// Invalid run parameters
    Configuration(String),
    /// An accepted patch or a summary row could not be persisted
    OutputWrite(String),
    /// Pixel decoding or encoding failed
    ImageError(image::ImageError),
    /// Generic error with message
    GenericError(String),
}

impl PatchError {
    /// Whether this error must stop the processing of the current image
    ///
    /// Read errors are patch-local and only bump a counter; everything else
    /// ends the image (and is recorded in its result).
    pub fn is_fatal_for_image(&self) -> bool {
        !matches!(self, PatchError::SourceRead(_))
    }
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::IoError(e) => write!(f, "I/O error: {}", e),
            PatchError::InvalidHeader => write!(f, "Invalid TIFF header"),
            PatchError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            PatchError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            PatchError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            PatchError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            PatchError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            PatchError::UnsupportedCompression(c) => write!(f, "Unsupported compression method: {}", c),
            PatchError::MissingDimensions => write!(f, "Image dimensions not found"),
            PatchError::MissingMagnification => {
                write!(f, "Slide has no magnification metadata and no base magnification was configured")
            },
            PatchError::UnsatisfiableMagnification { requested, available } => write!(
                f,
                "Requested magnification {}x exceeds the native {}x of level 0",
                requested, available
            ),
            PatchError::SourceRead(msg) => write!(f, "Source read error: {}", msg),
            PatchError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            PatchError::OutputWrite(msg) => write!(f, "Output write error: {}", msg),
            PatchError::ImageError(e) => write!(f, "Image error: {}", e),
            PatchError::GenericError(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::IoError(e) => Some(e),
            PatchError::ImageError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PatchError {
    fn from(error: io::Error) -> Self {
        PatchError::IoError(error)
    }
}

impl From<image::ImageError> for PatchError {
    fn from(error: image::ImageError) -> Self {
        PatchError::ImageError(error)
    }
}

impl From<String> for PatchError {
    fn from(msg: String) -> Self {
        PatchError::GenericError(msg)
    }
}

/// Result type for slide and patching operations
pub type PatchResult<T> = Result<T, PatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_read_errors_are_patch_local() {
        assert!(!PatchError::SourceRead("edge".to_string()).is_fatal_for_image());
        assert!(PatchError::OutputWrite("disk full".to_string()).is_fatal_for_image());
        assert!(PatchError::UnsatisfiableMagnification { requested: 50.0, available: 40.0 }
            .is_fatal_for_image());
    }

    #[test]
    fn unsatisfiable_magnification_message_names_both_values() {
        let msg = PatchError::UnsatisfiableMagnification { requested: 50.0, available: 40.0 }.to_string();
        assert!(msg.contains("50"));
        assert!(msg.contains("40"));
    }
}
