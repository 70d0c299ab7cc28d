//! Pyramid source backed by a TIFF/BigTIFF slide file
//!
//! Aperio SVS files keep every pyramid level as a tiled IFD and add
//! stripped thumbnail, label and macro images; plain pyramidal TIFFs chain
//! reduced-resolution subfiles after the full image. Both are recognised
//! by `TIFF::pyramid_ifds`.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::compression::CompressionFactory;
use crate::extractor::{Region, StripReader, TileReader};
use crate::tiff::constants::{planar_config, tags};
use crate::tiff::errors::{PatchError, PatchResult};
use crate::tiff::ifd::IFD;
use crate::tiff::TiffReader;

use super::pyramid::{level_origin, Level, PyramidSource};

lazy_static! {
    /// Aperio writes the scan objective as `AppMag = 40` in ImageDescription
    static ref APP_MAG: Option<Regex> = Regex::new(r"AppMag\s*=\s*([0-9]+(?:\.[0-9]+)?)").ok();
}

/// A slide file opened for region reads
///
/// Only the IFD chain is held in memory. Every `read_region` opens its own
/// file handle, so reads from several threads never share a cursor.
pub struct TiffSlide {
    path: PathBuf,
    name: String,
    tiff_reader: TiffReader,
    level_ifds: Vec<IFD>,
    levels: Vec<Level>,
    base_magnification: Option<f64>,
    description: Option<String>,
}

impl TiffSlide {
    /// Parses the slide at `path`
    ///
    /// `fallback_magnification` is used when the slide's description does
    /// not carry one.
    pub fn open(path: &Path, fallback_magnification: Option<f64>) -> PatchResult<Self> {
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.load(path)?;

        let level_ifds: Vec<IFD> = tiff.pyramid_ifds().into_iter().cloned().collect();
        if level_ifds.is_empty() {
            return Err(PatchError::MissingDimensions);
        }
        for ifd in &level_ifds {
            Self::check_level_layout(&tiff_reader, ifd)?;
        }

        let levels = Self::build_levels(&level_ifds)?;

        let description = match tiff.main_ifd() {
            Some(ifd) if ifd.has_tag(tags::IMAGE_DESCRIPTION) => {
                let mut reader = tiff_reader.create_reader()?;
                Some(tiff_reader.read_ascii_tag(&mut reader, ifd, tags::IMAGE_DESCRIPTION)?)
            },
            _ => None,
        };

        let base_magnification = match description.as_deref().and_then(parse_app_mag) {
            Some(magnification) => Some(magnification),
            None => {
                if fallback_magnification.is_some() {
                    debug!("{} carries no AppMag, using configured base magnification", path.display());
                }
                fallback_magnification
            },
        };

        let name = path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!("Opened {} with {} levels, base magnification {:?}", name, levels.len(), base_magnification);

        Ok(TiffSlide {
            path: path.to_path_buf(),
            name,
            tiff_reader,
            level_ifds,
            levels,
            base_magnification,
            description,
        })
    }

    /// Rejects level layouts the extractor cannot decode
    fn check_level_layout(tiff_reader: &TiffReader, ifd: &IFD) -> PatchResult<()> {
        let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
        if !CompressionFactory::is_supported(compression) {
            return Err(PatchError::UnsupportedCompression(compression));
        }

        let planar = ifd.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(planar_config::CHUNKY as u64);
        if planar != planar_config::CHUNKY as u64 && ifd.get_samples_per_pixel() > 1 {
            return Err(PatchError::GenericError(format!(
                "IFD #{} uses planar configuration {}, only chunky samples are supported", ifd.number, planar
            )));
        }

        if ifd.has_tag(tags::BITS_PER_SAMPLE) {
            let mut reader = tiff_reader.create_reader()?;
            let bits = tiff_reader.read_tag_values(&mut reader, ifd, tags::BITS_PER_SAMPLE)?;
            if bits.iter().any(|&b| b != 8) {
                return Err(PatchError::GenericError(format!(
                    "IFD #{} has {:?} bits per sample, only 8-bit samples are supported", ifd.number, bits
                )));
            }
        }

        Ok(())
    }

    /// Levels from the IFD dimensions; downsample averages both axes
    fn build_levels(level_ifds: &[IFD]) -> PatchResult<Vec<Level>> {
        let (base_width, base_height) = level_ifds[0].get_dimensions()
            .ok_or(PatchError::MissingDimensions)?;

        let mut levels = Vec::with_capacity(level_ifds.len());
        for (index, ifd) in level_ifds.iter().enumerate() {
            let (width, height) = ifd.get_dimensions().ok_or(PatchError::MissingDimensions)?;
            if width == 0 || height == 0 {
                return Err(PatchError::MissingDimensions);
            }

            let downsample = if index == 0 {
                1.0
            } else {
                (base_width as f64 / width as f64 + base_height as f64 / height as f64) / 2.0
            };
            debug!("Level {}: IFD #{} {}x{} downsample {:.4}", index, ifd.number, width, height, downsample);
            levels.push(Level::new(index, width, height, downsample));
        }

        Ok(levels)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// IFDs backing each level, in level order
    pub fn level_ifds(&self) -> &[IFD] {
        &self.level_ifds
    }

    /// ImageDescription of the first IFD, if present
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn read_level_region(&self, ifd: &IFD, region: Region) -> PatchResult<RgbImage> {
        let reader = self.tiff_reader.create_reader()?;
        let mut image = RgbImage::new(region.width, region.height);

        if ifd.is_tiled() {
            TileReader::new(reader, ifd, &self.tiff_reader).extract(&mut image, region)?;
        } else {
            StripReader::new(reader, ifd, &self.tiff_reader).extract(&mut image, region)?;
        }

        Ok(image)
    }
}

impl PyramidSource for TiffSlide {
    fn name(&self) -> &str {
        &self.name
    }

    fn levels(&self) -> &[Level] {
        &self.levels
    }

    fn base_magnification(&self) -> Option<f64> {
        self.base_magnification
    }

    fn read_region(&self, location: (i64, i64), level: usize, size: (u32, u32)) -> PatchResult<DynamicImage> {
        let (level_info, ifd) = match (self.levels.get(level), self.level_ifds.get(level)) {
            (Some(level_info), Some(ifd)) => (level_info, ifd),
            _ => return Err(PatchError::SourceRead(format!("{} has no level {}", self.name, level))),
        };

        let region = level_origin(location, level_info)
            .map(|(x, y)| Region::new(x, y, size.0, size.1))
            .filter(|region| region.fits_within(level_info.width, level_info.height))
            .ok_or_else(|| PatchError::SourceRead(format!(
                "{}x{} region at level-0 {:?} exceeds level {} ({}x{})",
                size.0, size.1, location, level, level_info.width, level_info.height
            )))?;

        match self.read_level_region(ifd, region) {
            Ok(image) => Ok(DynamicImage::ImageRgb8(image)),
            Err(PatchError::SourceRead(msg)) => Err(PatchError::SourceRead(msg)),
            Err(e) => {
                warn!("Failed reading {:?} from {} level {}: {}", region, self.name, level, e);
                Err(PatchError::SourceRead(e.to_string()))
            },
        }
    }
}

impl fmt::Display for TiffSlide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Slide: {}", self.path.display())?;
        match self.base_magnification {
            Some(magnification) => writeln!(f, "  Base magnification: {}x", magnification)?,
            None => writeln!(f, "  Base magnification: unknown")?,
        }
        writeln!(f, "  Levels: {}", self.levels.len())?;
        for (level, ifd) in self.levels.iter().zip(&self.level_ifds) {
            let magnification = self.base_magnification
                .map(|base| format!("{:.2}x", level.effective_magnification(base)))
                .unwrap_or_else(|| "-".to_string());
            writeln!(f, "    [{}] {}x{} downsample {:.4} magnification {} (IFD #{}, {})",
                     level.index, level.width, level.height, level.downsample, magnification,
                     ifd.number, if ifd.is_tiled() { "tiled" } else { "stripped" })?;
        }
        Ok(())
    }
}

/// Extracts the `AppMag` value from an Aperio ImageDescription
pub fn parse_app_mag(description: &str) -> Option<f64> {
    APP_MAG.as_ref()?
        .captures(description)
        .and_then(|captures| captures.get(1))
        .and_then(|value| value.as_str().parse::<f64>().ok())
        .filter(|magnification| *magnification > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_mag_is_read_from_aperio_description() {
        let description = "Aperio Image Library v10.0.51\r\n46920x33014 [0,100 46000x32914] (256x256) JPEG/RGB Q=30|AppMag = 20|StripeWidth = 2040|MPP = 0.4990";
        assert_eq!(parse_app_mag(description), Some(20.0));
        assert_eq!(parse_app_mag("AppMag=40.5|MPP = 0.25"), Some(40.5));
    }

    #[test]
    fn missing_or_zero_app_mag_yields_none() {
        assert_eq!(parse_app_mag("Generic TIFF"), None);
        assert_eq!(parse_app_mag("AppMag = 0"), None);
    }
}
