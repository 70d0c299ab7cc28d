//! Run configuration
//!
//! Settings come from an optional TOML file with a `[wsi]` and an
//! `[output]` table; command-line flags override individual values. The
//! whole configuration is validated before any slide is opened.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::patching::{BackgroundFilter, ExtractionOptions, TargetSpec};
use crate::tiff::errors::{PatchError, PatchResult};
use crate::tiff::validation::validate_range;

const WSI_KEYS: &[&str] = &[
    "patch_size", "magnification", "white_pixel_threshold", "white_max_channel_value",
    "grey_tolerance", "sampling", "seed", "base_magnification", "workers", "parallel_images",
];
const OUTPUT_KEYS: &[&str] = &["directory", "summary_file"];

pub const DEFAULT_SUMMARY_FILE: &str = "patching_results.csv";

/// Every knob of a patching run
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Edge of the emitted square patches, in pixels
    pub patch_size: u32,
    /// Target magnification
    pub magnification: f64,
    /// Maximum background percentage; `None` keeps every patch
    pub white_pixel_threshold: Option<f64>,
    pub white_max_channel_value: u8,
    pub grey_tolerance: Option<u8>,
    /// Share of grid cells to read, in (0, 1]
    pub sampling: f64,
    pub seed: Option<u64>,
    /// Used for slides without magnification metadata
    pub base_magnification: Option<f64>,
    pub workers: usize,
    pub parallel_images: bool,
    pub output_directory: PathBuf,
    /// Defaults to `patching_results.csv` inside the output directory
    pub summary_file: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            patch_size: 256,
            magnification: 20.0,
            white_pixel_threshold: None,
            white_max_channel_value: 220,
            grey_tolerance: None,
            sampling: 1.0,
            seed: None,
            base_magnification: None,
            workers: 1,
            parallel_images: false,
            output_directory: PathBuf::from("patches"),
            summary_file: None,
        }
    }
}

impl ExtractionConfig {
    /// Parses and validates a TOML document
    ///
    /// Missing keys keep their defaults; unknown keys are logged and ignored.
    pub fn from_toml_str(content: &str) -> PatchResult<Self> {
        let toml_value: toml::Value = content.parse()
            .map_err(|e| PatchError::Configuration(format!("Failed to parse TOML: {}", e)))?;

        let mut config = ExtractionConfig::default();

        if let Some(wsi) = toml_value.get("wsi") {
            let table = wsi.as_table()
                .ok_or_else(|| PatchError::Configuration("[wsi] must be a table".to_string()))?;
            warn_unknown_keys("wsi", table, WSI_KEYS);

            if let Some(value) = table.get("patch_size") {
                config.patch_size = integer_in::<u32>(value, "wsi.patch_size")?;
            }
            if let Some(value) = table.get("magnification") {
                config.magnification = number(value, "wsi.magnification")?;
            }
            if let Some(value) = table.get("white_pixel_threshold") {
                config.white_pixel_threshold = Some(number(value, "wsi.white_pixel_threshold")?);
            }
            if let Some(value) = table.get("white_max_channel_value") {
                config.white_max_channel_value = integer_in::<u8>(value, "wsi.white_max_channel_value")?;
            }
            if let Some(value) = table.get("grey_tolerance") {
                config.grey_tolerance = Some(integer_in::<u8>(value, "wsi.grey_tolerance")?);
            }
            if let Some(value) = table.get("sampling") {
                config.sampling = number(value, "wsi.sampling")?;
            }
            if let Some(value) = table.get("seed") {
                config.seed = Some(integer_in::<u64>(value, "wsi.seed")?);
            }
            if let Some(value) = table.get("base_magnification") {
                config.base_magnification = Some(number(value, "wsi.base_magnification")?);
            }
            if let Some(value) = table.get("workers") {
                config.workers = integer_in::<usize>(value, "wsi.workers")?;
            }
            if let Some(value) = table.get("parallel_images") {
                config.parallel_images = value.as_bool()
                    .ok_or_else(|| PatchError::Configuration("wsi.parallel_images must be a boolean".to_string()))?;
            }
        }

        if let Some(output) = toml_value.get("output") {
            let table = output.as_table()
                .ok_or_else(|| PatchError::Configuration("[output] must be a table".to_string()))?;
            warn_unknown_keys("output", table, OUTPUT_KEYS);

            if let Some(value) = table.get("directory") {
                config.output_directory = PathBuf::from(string(value, "output.directory")?);
            }
            if let Some(value) = table.get("summary_file") {
                config.summary_file = Some(PathBuf::from(string(value, "output.summary_file")?));
            }
        }

        config.validate()?;
        debug!("Parsed configuration: {:?}", config);
        Ok(config)
    }

    /// Reads and validates a TOML configuration file
    pub fn load(path: &Path) -> PatchResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PatchError::Configuration(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Checks every value range
    pub fn validate(&self) -> PatchResult<()> {
        if self.patch_size == 0 {
            return Err(PatchError::Configuration("Invalid patch_size: must be positive".to_string()));
        }
        if !self.magnification.is_finite() || self.magnification <= 0.0 {
            return Err(PatchError::Configuration(format!(
                "Invalid magnification: {} (must be positive)", self.magnification
            )));
        }
        if let Some(threshold) = self.white_pixel_threshold {
            validate_range(threshold, 0.0, 100.0, "white_pixel_threshold")?;
        }
        if !(self.sampling > 0.0 && self.sampling <= 1.0) {
            return Err(PatchError::Configuration(format!(
                "Invalid sampling: {} (must be in (0, 1])", self.sampling
            )));
        }
        if let Some(base) = self.base_magnification {
            if !base.is_finite() || base <= 0.0 {
                return Err(PatchError::Configuration(format!(
                    "Invalid base_magnification: {} (must be positive)", base
                )));
            }
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(PatchError::Configuration("Output directory must not be empty".to_string()));
        }
        Ok(())
    }

    /// Where the batch summary is written
    pub fn summary_path(&self) -> PathBuf {
        match &self.summary_file {
            Some(path) if path.is_absolute() || path.parent().is_some_and(|p| !p.as_os_str().is_empty()) => path.clone(),
            Some(path) => self.output_directory.join(path),
            None => self.output_directory.join(DEFAULT_SUMMARY_FILE),
        }
    }

    /// Orchestrator options for this configuration
    pub fn to_options(&self) -> PatchResult<ExtractionOptions> {
        self.validate()?;

        let filter = BackgroundFilter::new(
            self.white_pixel_threshold.unwrap_or(100.0),
            self.white_max_channel_value,
        ).with_grey_tolerance(self.grey_tolerance);

        Ok(ExtractionOptions {
            target: TargetSpec::new(self.patch_size, self.magnification)?,
            filter,
            sampling_rate: self.sampling,
            seed: self.seed,
            workers: self.workers,
            parallel_images: self.parallel_images,
        })
    }
}

fn warn_unknown_keys(table_name: &str, table: &toml::value::Table, known: &[&str]) {
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            warn!("Ignoring unknown configuration key {}.{}", table_name, key);
        }
    }
}

/// Accepts TOML integers and floats
fn number(value: &toml::Value, name: &str) -> PatchResult<f64> {
    match value {
        toml::Value::Float(f) => Ok(*f),
        toml::Value::Integer(i) => Ok(*i as f64),
        _ => Err(PatchError::Configuration(format!("{} must be a number", name))),
    }
}

fn integer_in<T: TryFrom<i64>>(value: &toml::Value, name: &str) -> PatchResult<T> {
    let raw = value.as_integer()
        .ok_or_else(|| PatchError::Configuration(format!("{} must be an integer", name)))?;
    T::try_from(raw)
        .map_err(|_| PatchError::Configuration(format!("{} is out of range: {}", name, raw)))
}

fn string<'v>(value: &'v toml::Value, name: &str) -> PatchResult<&'v str> {
    value.as_str()
        .ok_or_else(|| PatchError::Configuration(format!("{} must be a string", name)))
}
