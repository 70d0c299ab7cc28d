//! Library facade
//!
//! `SlidePatcher` bundles slide inspection and batch extraction behind a
//! few calls for programs embedding the crate.

use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::ExtractionConfig;
use crate::patching::report;
use crate::patching::{
    BatchExtractionResult, ExtractionOrchestrator, ImageExtractionResult, PatchSink, PngDirectorySink,
};
use crate::slide::{PyramidSource, TiffSlide};
use crate::tiff::errors::PatchResult;
use crate::utils::logger::Logger;

/// Main interface to the slidepatch library
pub struct SlidePatcher {
    config: ExtractionConfig,
    logger: Logger,
}

impl SlidePatcher {
    /// Validates `config` and opens the report log (`slidepatch.log` by default)
    pub fn new(config: ExtractionConfig, log_file: Option<&Path>) -> PatchResult<Self> {
        config.validate()?;
        let logger = Logger::new(log_file.unwrap_or(Path::new("slidepatch.log")))?;
        Ok(SlidePatcher { config, logger })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Pyramid description of one slide
    pub fn inspect(&self, input_path: &Path) -> PatchResult<String> {
        let slide = TiffSlide::open(input_path, self.config.base_magnification)?;
        let report = slide.to_string();
        self.logger.log_report(&format!("Inspection of {}", input_path.display()), &report)?;
        Ok(report)
    }

    /// Extracts every slide into the configured output directory and
    /// writes the summary file
    pub fn extract(&self, inputs: &[PathBuf]) -> PatchResult<BatchExtractionResult> {
        let sink = PngDirectorySink::new(&self.config.output_directory)?;
        let orchestrator = ExtractionOrchestrator::new(self.config.to_options()?, sink)?;

        let base_magnification = self.config.base_magnification;
        let batch = orchestrator.extract_batch(inputs, |path: &Path| TiffSlide::open(path, base_magnification));

        let summary_path = self.config.summary_path();
        report::save_summary(&summary_path, &batch)?;
        self.logger.log(&format!(
            "Extracted {} patches from {} slides ({} failed)",
            batch.total_accepted(), batch.len(), batch.failed_count()
        ))?;
        Ok(batch)
    }

    /// Runs one already opened source through the pipeline into `sink`
    ///
    /// Uses the configured seed, or entropy when none is set.
    pub fn extract_source<S: PatchSink>(&self, source: &dyn PyramidSource, sink: S) -> PatchResult<ImageExtractionResult> {
        let orchestrator = ExtractionOrchestrator::new(self.config.to_options()?, sink)?;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let result = orchestrator.extract_image(source, &mut rng);
        info!("{}: {}", result.source_name, result.status);
        Ok(result)
    }
}
