//! File-backed logger
//!
//! Implements `log::Log` so the whole crate logs through the `log` facade;
//! records go to a log file and, at the configured level, to the console.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Log, Record, Level, Metadata, LevelFilter};

/// Logger writing to a file and echoing to stderr
pub struct Logger {
    file: Mutex<Option<File>>,
    console_level: LevelFilter,
}

impl Logger {
    /// Creates (truncates) `log_file`
    pub fn new(log_file: &Path) -> io::Result<Self> {
        let file = File::create(log_file)?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            console_level: LevelFilter::Info,
        })
    }

    /// Level at or above which records are also printed to the console
    pub fn with_console_level(mut self, level: LevelFilter) -> Self {
        self.console_level = level;
        self
    }

    /// Appends one line to the log file
    pub fn log(&self, message: &str) -> io::Result<()> {
        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Writes a multi-line report, such as a slide inspection, to the log file
    pub fn log_report(&self, title: &str, report: &str) -> io::Result<()> {
        self.log(title)?;
        for line in report.lines() {
            self.log(&format!("  {}", line))?;
        }
        Ok(())
    }

    /// Installs a logger as the global `log` backend
    ///
    /// Debug records always reach the file; `verbose` also prints them.
    pub fn init_global_logger(log_file: &Path, verbose: bool) -> io::Result<()> {
        let console_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
        let global_logger = Logger::new(log_file)?.with_console_level(console_level);

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(LevelFilter::Debug);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.log(&message);

            if record.level() <= self.console_level {
                eprintln!("{}", message);
            }
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reports_are_indented_in_the_file() {
        let path = std::env::temp_dir().join(format!("slidepatch-logger-{}.log", std::process::id()));
        let logger = Logger::new(&path).unwrap();
        logger.log_report("Slide: a.svs", "Levels: 3\nBase: 40x").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Slide: a.svs\n  Levels: 3\n  Base: 40x\n");
        let _ = fs::remove_file(&path);
    }
}
