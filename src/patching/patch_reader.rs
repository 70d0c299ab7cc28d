//! Materialising patch pixels

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::patching::types::PatchDescriptor;
use crate::slide::PyramidSource;
use crate::tiff::errors::PatchResult;

/// Pixels of one patch, always RGB at the descriptor's output size
pub type PatchPixels = RgbImage;

pub struct PatchReader;

impl PatchReader {
    /// Reads the region of `descriptor` and brings it to `output_size`
    ///
    /// Reads leaving the level extent fail with `SourceRead`, which callers
    /// count and skip. Downscaling uses a Lanczos3 kernel.
    pub fn read(source: &dyn PyramidSource, descriptor: &PatchDescriptor) -> PatchResult<PatchPixels> {
        let region = source.read_region(descriptor.read_location, descriptor.level, descriptor.read_size)?;
        let pixels = region.to_rgb8();

        let (width, height) = descriptor.output_size;
        if descriptor.resize_factor > 1.0 || pixels.dimensions() != descriptor.output_size {
            Ok(imageops::resize(&pixels, width, height, FilterType::Lanczos3))
        } else {
            Ok(pixels)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patching::grid_planner::GridPlan;
    use crate::slide::MemorySlide;
    use crate::tiff::errors::PatchError;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[test]
    fn alpha_is_dropped() {
        let slide = MemorySlide::uniform("rgba", &[(64, 64, 1.0)], Rgba([10, 20, 30, 0]), Some(20.0));
        let descriptor = GridPlan::new(0, 64, 64, 1.0, 32, 1.0).descriptor(0, 0);

        let pixels = PatchReader::read(&slide, &descriptor).unwrap();
        assert_eq!(pixels.dimensions(), (32, 32));
        assert_eq!(pixels.get_pixel(5, 5).0, [10, 20, 30]);
    }

    #[test]
    fn oversized_reads_are_resized_to_the_patch_edge() {
        let mut base = RgbaImage::from_pixel(80, 80, Rgba([200, 40, 40, 255]));
        for x in 0..40 {
            for y in 0..80 {
                base.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let slide = MemorySlide::from_images("s", vec![DynamicImage::ImageRgba8(base)], Some(40.0)).unwrap();
        let descriptor = GridPlan::new(0, 80, 80, 1.0, 30, 40.0 / 15.0).descriptor(0, 0);
        assert_eq!(descriptor.read_size, (80, 80));

        let pixels = PatchReader::read(&slide, &descriptor).unwrap();
        assert_eq!(pixels.dimensions(), (30, 30));
        assert_eq!(pixels.get_pixel(2, 15).0, [0, 0, 0]);
        assert_eq!(pixels.get_pixel(27, 15).0, [200, 40, 40]);
    }

    #[test]
    fn out_of_extent_reads_fail() {
        let slide = MemorySlide::uniform("small", &[(50, 50, 1.0)], Rgba([0, 0, 0, 255]), Some(20.0));
        let descriptor = GridPlan::new(0, 60, 60, 1.0, 40, 1.0).descriptor(1, 1);
        assert!(matches!(PatchReader::read(&slide, &descriptor), Err(PatchError::SourceRead(_))));
    }
}
