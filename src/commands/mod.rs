//! CLI command implementations

pub mod command_traits;
pub mod inspect_command;
pub mod patch_command;

pub use command_traits::{Command, CommandFactory};
pub use inspect_command::InspectCommand;
pub use patch_command::PatchCommand;

use std::path::PathBuf;
use std::str::FromStr;

use clap::ArgMatches;
use crate::utils::logger::Logger;
use crate::tiff::errors::{PatchError, PatchResult};

/// Picks `inspect` when asked for, patch extraction otherwise
pub struct SlidepatchCommandFactory;

impl SlidepatchCommandFactory {
    pub fn new() -> Self {
        SlidepatchCommandFactory
    }
}

impl Default for SlidepatchCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for SlidepatchCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> PatchResult<Box<dyn Command + 'a>> {
        if args.get_flag("inspect") {
            Ok(Box::new(InspectCommand::new(args, logger)?))
        } else {
            Ok(Box::new(PatchCommand::new(args, logger)?))
        }
    }
}

/// Input slide paths given on the command line
pub(crate) fn input_paths(args: &ArgMatches) -> PatchResult<Vec<PathBuf>> {
    let inputs: Vec<PathBuf> = args.get_many::<String>("input")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();

    if inputs.is_empty() {
        return Err(PatchError::Configuration("No input slides given".to_string()));
    }
    Ok(inputs)
}

/// Parses an optional string argument into `T`
pub(crate) fn parse_arg<T: FromStr>(args: &ArgMatches, name: &str) -> PatchResult<Option<T>> {
    match args.get_one::<String>(name) {
        Some(raw) => raw.parse::<T>()
            .map(Some)
            .map_err(|_| PatchError::Configuration(format!("Invalid value for --{}: {}", name, raw))),
        None => Ok(None),
    }
}
