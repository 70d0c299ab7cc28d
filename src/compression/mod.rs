//! Tile and strip decompression
//!
//! Slides store pixel data compressed per tile or strip. Each supported
//! TIFF compression code maps to a `CompressionHandler`.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;
mod jpeg;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use zstd::ZstdHandler;
pub use jpeg::JpegHandler;
