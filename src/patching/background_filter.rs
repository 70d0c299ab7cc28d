//! Background rejection by white-pixel share

use image::Rgb;

use crate::patching::patch_reader::PatchPixels;
use crate::patching::types::FilterVerdict;

/// Luma above which a pixel counts as background
pub const DEFAULT_MAX_CHANNEL_VALUE: u8 = 220;

/// Accepts a patch when at most `white_threshold` percent of it is background
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundFilter {
    /// Percentage in [0, 100]; 100 accepts everything
    pub white_threshold: f64,
    /// Luma at or above which a pixel is white
    pub max_channel_value: u8,
    /// When set, pixels whose channels all lie within this distance of each
    /// other are background too
    pub grey_tolerance: Option<u8>,
}

impl Default for BackgroundFilter {
    fn default() -> Self {
        BackgroundFilter {
            white_threshold: 100.0,
            max_channel_value: DEFAULT_MAX_CHANNEL_VALUE,
            grey_tolerance: None,
        }
    }
}

impl BackgroundFilter {
    pub fn new(white_threshold: f64, max_channel_value: u8) -> Self {
        BackgroundFilter {
            white_threshold,
            max_channel_value,
            grey_tolerance: None,
        }
    }

    pub fn with_grey_tolerance(mut self, tolerance: Option<u8>) -> Self {
        self.grey_tolerance = tolerance;
        self
    }

    /// Whether every patch is accepted without looking at it
    pub fn is_disabled(&self) -> bool {
        self.white_threshold >= 100.0
    }

    pub fn evaluate(&self, pixels: &PatchPixels) -> FilterVerdict {
        let total = pixels.width() as usize * pixels.height() as usize;
        if total == 0 {
            return FilterVerdict { white_fraction: 0.0, accepted: true };
        }

        let background = pixels.pixels().filter(|pixel| self.is_background(pixel)).count();
        let white_fraction = 100.0 * background as f64 / total as f64;

        FilterVerdict {
            white_fraction,
            accepted: white_fraction <= self.white_threshold,
        }
    }

    fn is_background(&self, pixel: &Rgb<u8>) -> bool {
        if luma(pixel) >= self.max_channel_value as f64 {
            return true;
        }

        match self.grey_tolerance {
            Some(tolerance) => {
                let [r, g, b] = pixel.0;
                r.abs_diff(g) <= tolerance && r.abs_diff(b) <= tolerance && g.abs_diff(b) <= tolerance
            },
            None => false,
        }
    }
}

/// ITU-R BT.601 luma
pub fn luma(pixel: &Rgb<u8>) -> f64 {
    let [r, g, b] = pixel.0;
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}
