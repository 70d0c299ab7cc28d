//! Command pattern interfaces for the CLI

use crate::utils::logger::Logger;
use crate::tiff::errors::PatchResult;

/// An executable CLI operation
pub trait Command {
    fn execute(&self) -> PatchResult<()>;
}

/// Builds the command selected by the parsed arguments
pub trait CommandFactory<'a> {
    /// `logger` receives the reports a command writes besides its log records
    fn create_command(&self, args: &clap::ArgMatches, logger: &'a Logger) -> PatchResult<Box<dyn Command + 'a>>;
}
