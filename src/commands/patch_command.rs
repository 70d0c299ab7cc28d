//! Batch patch extraction command

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use log::{info, warn};

use crate::commands::command_traits::Command;
use crate::commands::{input_paths, parse_arg};
use crate::config::ExtractionConfig;
use crate::patching::report;
use crate::patching::{ExtractionOrchestrator, PngDirectorySink};
use crate::slide::TiffSlide;
use crate::tiff::errors::PatchResult;
use crate::utils::logger::Logger;

/// Extracts patches from every input slide and writes the summary file
pub struct PatchCommand<'a> {
    inputs: Vec<PathBuf>,
    config: ExtractionConfig,
    logger: &'a Logger,
}

impl<'a> PatchCommand<'a> {
    /// Loads `--config` (if any) and applies the command-line overrides
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> PatchResult<Self> {
        let inputs = input_paths(args)?;

        let mut config = match args.get_one::<String>("config") {
            Some(path) => {
                info!("Loading configuration from {}", path);
                ExtractionConfig::load(Path::new(path))?
            },
            None => ExtractionConfig::default(),
        };
        Self::apply_overrides(&mut config, args)?;
        config.validate()?;

        Ok(PatchCommand {
            inputs,
            config,
            logger,
        })
    }

    fn apply_overrides(config: &mut ExtractionConfig, args: &ArgMatches) -> PatchResult<()> {
        if let Some(output) = args.get_one::<String>("output") {
            config.output_directory = PathBuf::from(output);
        }
        if let Some(summary) = args.get_one::<String>("summary") {
            config.summary_file = Some(PathBuf::from(summary));
        }
        if let Some(patch_size) = parse_arg(args, "patch-size")? {
            config.patch_size = patch_size;
        }
        if let Some(magnification) = parse_arg(args, "magnification")? {
            config.magnification = magnification;
        }
        if let Some(threshold) = parse_arg(args, "white-threshold")? {
            config.white_pixel_threshold = Some(threshold);
        }
        if let Some(max_value) = parse_arg(args, "white-max")? {
            config.white_max_channel_value = max_value;
        }
        if let Some(sampling) = parse_arg(args, "sampling")? {
            config.sampling = sampling;
        }
        if let Some(seed) = parse_arg(args, "seed")? {
            config.seed = Some(seed);
        }
        if let Some(base) = parse_arg(args, "base-magnification")? {
            config.base_magnification = Some(base);
        }
        if let Some(workers) = parse_arg(args, "workers")? {
            config.workers = workers;
        }
        if args.get_flag("parallel-images") {
            config.parallel_images = true;
        }
        Ok(())
    }
}

impl Command for PatchCommand<'_> {
    fn execute(&self) -> PatchResult<()> {
        let options = self.config.to_options()?;
        let sink = PngDirectorySink::new(&self.config.output_directory)?;
        info!("Writing patches of {} px at {}x to {}",
              self.config.patch_size, self.config.magnification, sink.directory().display());

        let orchestrator = ExtractionOrchestrator::new(options, sink)?.with_progress(true);
        let base_magnification = self.config.base_magnification;
        let batch = orchestrator.extract_batch(&self.inputs, |path: &Path| TiffSlide::open(path, base_magnification));

        let summary_path = self.config.summary_path();
        report::save_summary(&summary_path, &batch)?;

        let rows: Vec<String> = batch.iter().map(report::summary_row).collect();
        self.logger.log_report(
            &format!("Summary ({})", summary_path.display()),
            &format!("{}\n{}", report::SUMMARY_HEADER, rows.join("\n")),
        )?;

        if batch.failed_count() > 0 {
            warn!("{} of {} slides failed, see {}", batch.failed_count(), batch.len(), summary_path.display());
        }
        Ok(())
    }
}
