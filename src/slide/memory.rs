//! In-memory pyramid source
//!
//! Useful for callers that already hold decoded levels, and for exercising
//! the patching pipeline without slide files.

use std::collections::HashSet;

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::tiff::errors::{PatchError, PatchResult};

use super::pyramid::{level_origin, Level, PyramidSource};

enum LevelPixels {
    Image(DynamicImage),
    Uniform(Rgba<u8>),
}

/// Pyramid whose levels live in memory
pub struct MemorySlide {
    name: String,
    levels: Vec<Level>,
    pixels: Vec<LevelPixels>,
    base_magnification: Option<f64>,
    failing_reads: HashSet<(usize, i64, i64)>,
}

impl MemorySlide {
    /// Builds a pyramid from decoded level images, full resolution first
    ///
    /// Downsamples average the width and height ratios to the first image.
    pub fn from_images(name: &str, images: Vec<DynamicImage>, base_magnification: Option<f64>) -> PatchResult<Self> {
        let (base_width, base_height) = images.first()
            .map(|image| image.dimensions())
            .ok_or(PatchError::MissingDimensions)?;

        let mut levels = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let (width, height) = image.dimensions();
            if width == 0 || height == 0 {
                return Err(PatchError::MissingDimensions);
            }
            let downsample = (base_width as f64 / width as f64 + base_height as f64 / height as f64) / 2.0;
            levels.push(Level::new(index, width as u64, height as u64, downsample));
        }

        Ok(MemorySlide {
            name: name.to_string(),
            levels,
            pixels: images.into_iter().map(LevelPixels::Image).collect(),
            base_magnification,
            failing_reads: HashSet::new(),
        })
    }

    /// Pyramid of single-colour levels, described by dimensions only
    pub fn uniform(name: &str, levels: &[(u64, u64, f64)], colour: Rgba<u8>, base_magnification: Option<f64>) -> Self {
        MemorySlide {
            name: name.to_string(),
            levels: levels.iter()
                .enumerate()
                .map(|(index, &(width, height, downsample))| Level::new(index, width, height, downsample))
                .collect(),
            pixels: levels.iter().map(|_| LevelPixels::Uniform(colour)).collect(),
            base_magnification,
            failing_reads: HashSet::new(),
        }
    }

    /// Makes reads at these `(level, x, y)` level-0 locations fail with `SourceRead`
    pub fn with_failing_reads(mut self, locations: impl IntoIterator<Item = (usize, i64, i64)>) -> Self {
        self.failing_reads.extend(locations);
        self
    }
}

impl PyramidSource for MemorySlide {
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
        if self.failing_reads.contains(&(level, location.0, location.1)) {
            return Err(PatchError::SourceRead(format!("{}: injected failure at {:?}", self.name, location)));
        }

        let (level_info, pixels) = match (self.levels.get(level), self.pixels.get(level)) {
            (Some(level_info), Some(pixels)) => (level_info, pixels),
            _ => return Err(PatchError::SourceRead(format!("{} has no level {}", self.name, level))),
        };

        let (x, y) = level_origin(location, level_info)
            .filter(|&(x, y)| {
                size.0 > 0 && size.1 > 0
                    && x as u64 + size.0 as u64 <= level_info.width
                    && y as u64 + size.1 as u64 <= level_info.height
            })
            .ok_or_else(|| PatchError::SourceRead(format!(
                "{}x{} region at level-0 {:?} exceeds level {}", size.0, size.1, location, level
            )))?;

        Ok(match pixels {
            LevelPixels::Image(image) => image.crop_imm(x, y, size.0, size.1),
            LevelPixels::Uniform(colour) => DynamicImage::ImageRgba8(RgbaImage::from_pixel(size.0, size.1, *colour)),
        })
    }
}
