//! Slide structure inspection
//!
//! Prints the pyramid of each input: levels, downsamples, base and
//! per-level magnification, and, when a target magnification is given,
//! the level patches would be read from.

use std::path::PathBuf;

use clap::ArgMatches;
use log::{error, info};

use crate::commands::command_traits::Command;
use crate::commands::{input_paths, parse_arg};
use crate::compression::CompressionFactory;
use crate::patching::LevelSelector;
use crate::slide::TiffSlide;
use crate::tiff::constants::tags;
use crate::tiff::errors::{PatchError, PatchResult};
use crate::utils::logger::Logger;
use crate::utils::tag_utils;

pub struct InspectCommand<'a> {
    inputs: Vec<PathBuf>,
    /// Used when a slide carries no AppMag
    base_magnification: Option<f64>,
    /// Shows the level selected for this magnification
    magnification: Option<f64>,
    verbose: bool,
    logger: &'a Logger,
}

impl<'a> InspectCommand<'a> {
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> PatchResult<Self> {
        Ok(InspectCommand {
            inputs: input_paths(args)?,
            base_magnification: parse_arg(args, "base-magnification")?,
            magnification: parse_arg(args, "magnification")?,
            verbose: args.get_flag("verbose"),
            logger,
        })
    }

    fn describe(&self, slide: &TiffSlide) -> String {
        let mut report = slide.to_string();

        if let Some(magnification) = self.magnification {
            match LevelSelector::select(slide, magnification) {
                Ok(selection) => report.push_str(&format!(
                    "  {}x reads level {} with resize factor {:.4}\n",
                    magnification, selection.level, selection.resize_factor
                )),
                Err(e) => report.push_str(&format!("  {}x: {}\n", magnification, e)),
            }
        }

        if self.verbose {
            if let Some(description) = slide.description() {
                report.push_str(&format!("  Description: {}\n", description));
            }
            for ifd in slide.level_ifds() {
                let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
                report.push_str(&format!(
                    "  Compression of IFD #{}: {} ({})\n",
                    ifd.number,
                    tag_utils::get_compression_name(compression),
                    if CompressionFactory::is_supported(compression) { "supported" } else { "not supported" }
                ));
                report.push_str(&ifd.to_string());
            }
        }

        report
    }
}

impl Command for InspectCommand<'_> {
    fn execute(&self) -> PatchResult<()> {
        let mut failures = 0;

        for input in &self.inputs {
            match TiffSlide::open(input, self.base_magnification) {
                Ok(slide) => {
                    let report = self.describe(&slide);
                    for line in report.lines() {
                        info!("{}", line);
                    }
                    self.logger.log_report(&format!("Inspection of {}", input.display()), &report)?;
                },
                Err(e) => {
                    error!("Cannot inspect {}: {}", input.display(), e);
                    failures += 1;
                },
            }
        }

        if failures > 0 {
            return Err(PatchError::GenericError(format!(
                "{} of {} slides could not be inspected", failures, self.inputs.len()
            )));
        }
        Ok(())
    }
}
