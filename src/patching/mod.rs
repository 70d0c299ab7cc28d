//! Magnification-aware patch extraction
//!
//! `LevelSelector` picks the pyramid level, `GridPlanner` lays the patch
//! grid over it, and the `ExtractionOrchestrator` runs each planned cell
//! through the `Sampler`, `PatchReader` and `BackgroundFilter` before
//! handing accepted patches to a `PatchSink`.

pub mod types;
pub mod level_selector;
pub mod grid_planner;
pub mod patch_reader;
pub mod background_filter;
pub mod sampler;
pub mod sink;
pub mod orchestrator;
pub mod report;

pub use types::{
    BatchExtractionResult, FilterVerdict, ImageExtractionResult, ImageStatus, PatchCounts,
    PatchDescriptor, TargetSpec,
};
pub use level_selector::{LevelSelection, LevelSelector};
pub use grid_planner::{GridIter, GridPlan, GridPlanner};
pub use patch_reader::{PatchPixels, PatchReader};
pub use background_filter::BackgroundFilter;
pub use sampler::Sampler;
pub use sink::{DiscardSink, PatchSink, PngDirectorySink};
pub use orchestrator::{ExtractionOptions, ExtractionOrchestrator};
