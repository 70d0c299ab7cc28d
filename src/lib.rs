pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod extractor;
pub mod slide;
pub mod patching;
pub mod config;
pub mod commands;
pub mod api;

pub use crate::api::SlidePatcher;

pub use config::ExtractionConfig;
pub use slide::{Level, MemorySlide, PyramidSource, TiffSlide};
pub use patching::{
    BackgroundFilter, BatchExtractionResult, ExtractionOptions, ExtractionOrchestrator, GridPlanner,
    ImageExtractionResult, ImageStatus, LevelSelector, PatchDescriptor, PatchReader, Sampler, TargetSpec,
};
pub use tiff::{PatchError, PatchResult, TiffReader};
