//! Region reads from stripped levels
//!
//! Strips span the full level width, so untiled slides (and the small
//! single-image files used for thumbnails) decode whole rows at a time.

use log::{debug, trace};
use std::io::SeekFrom;
use image::RgbImage;

use crate::compression::CompressionHandler;
use crate::io::seekable::SeekableReader;
use crate::tiff::TiffReader;
use crate::tiff::errors::{PatchError, PatchResult};
use crate::tiff::ifd::IFD;
use crate::tiff::constants::{tags, predictor as pred_consts};
use crate::utils::pixel_utils;

use super::region::Region;

/// Reads pixel regions from a stripped IFD
pub struct StripReader<'a, R: SeekableReader> {
    reader: R,
    ifd: &'a IFD,
    tiff_reader: &'a TiffReader,
}

impl<'a, R: SeekableReader> StripReader<'a, R> {
    pub fn new(reader: R, ifd: &'a IFD, tiff_reader: &'a TiffReader) -> Self {
        StripReader {
            reader,
            ifd,
            tiff_reader
        }
    }

    /// Rows per strip (whole image when absent) and level width
    fn get_strip_parameters(&self) -> PatchResult<(u32, u32)> {
        let (img_width, img_height) = self.ifd.get_dimensions()
            .ok_or(PatchError::MissingDimensions)?;

        let rows_per_strip = self.ifd.get_tag_value(tags::ROWS_PER_STRIP)
            .unwrap_or(img_height)
            .min(img_height)
            .max(1) as u32;

        Ok((rows_per_strip, img_width as u32))
    }

    fn read_strip(
        &mut self,
        offset: u64,
        byte_count: u64,
        compression_handler: &dyn CompressionHandler,
        predictor: u64,
        width: usize,
        rows_per_strip: usize,
        samples: usize,
    ) -> PatchResult<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut compressed_data = vec![0u8; byte_count as usize];
        self.reader.read_exact(&mut compressed_data)?;

        let mut strip_data = compression_handler.decompress(&compressed_data)?;

        if predictor == pred_consts::HORIZONTAL_DIFFERENCING as u64 {
            pixel_utils::apply_horizontal_predictor(&mut strip_data, width, rows_per_strip, samples);
        }

        Ok(strip_data)
    }

    /// Decodes every strip overlapping `region` into `image`
    pub fn extract(&mut self, image: &mut RgbImage, region: Region) -> PatchResult<()> {
        let (rows_per_strip, img_width) = self.get_strip_parameters()?;

        let compression_handler = super::block_decoder(&mut self.reader, self.ifd, self.tiff_reader)?;
        let predictor = self.ifd.get_tag_value(tags::PREDICTOR).unwrap_or(1);
        let samples = compression_handler.decoded_samples(self.ifd.get_samples_per_pixel() as usize);

        let strip_offsets = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::STRIP_OFFSETS)?;
        let strip_byte_counts = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::STRIP_BYTE_COUNTS)?;

        let start_strip = region.y / rows_per_strip;
        let end_strip = region.end_y().div_ceil(rows_per_strip);
        trace!("Region {:?} spans strips {}..{} of {}", region, start_strip, end_strip, strip_offsets.len());

        for strip_idx in start_strip..end_strip {
            let (offset, byte_count) = match (
                strip_offsets.get(strip_idx as usize),
                strip_byte_counts.get(strip_idx as usize),
            ) {
                (Some(&offset), Some(&byte_count)) => (offset, byte_count),
                _ => {
                    return Err(PatchError::SourceRead(format!(
                        "strip {} of IFD #{} is missing from the offset table", strip_idx, self.ifd.number
                    )));
                }
            };

            debug!("Reading strip {} at offset {} with {} bytes", strip_idx, offset, byte_count);

            let strip_data = self.read_strip(
                offset,
                byte_count,
                compression_handler.as_ref(),
                predictor,
                img_width as usize,
                rows_per_strip as usize,
                samples,
            ).map_err(|e| PatchError::SourceRead(format!("strip {}: {}", strip_idx, e)))?;

            self.copy_strip_to_image(
                &strip_data,
                samples,
                image,
                img_width,
                rows_per_strip,
                strip_idx * rows_per_strip,
                region
            ).map_err(|e| PatchError::SourceRead(format!("strip {}: {}", strip_idx, e)))?;
        }

        Ok(())
    }

    /// Fails when the decoded strip is too short for the rows `region` needs
    fn copy_strip_to_image(
        &self,
        strip_data: &[u8],
        samples: usize,
        image: &mut RgbImage,
        width: u32,
        rows_in_strip: u32,
        strip_start_y: u32,
        region: Region
    ) -> PatchResult<()> {
        let y_from = region.y.max(strip_start_y);
        let y_to = region.end_y().min(strip_start_y + rows_in_strip);

        for global_y in y_from..y_to {
            let row_start = ((global_y - strip_start_y) * width) as usize;
            for x in region.x..region.end_x().min(width) {
                if !pixel_utils::copy_pixel(strip_data, samples, image, x, global_y, row_start + x as usize, region) {
                    return Err(PatchError::SourceRead(format!(
                        "decoded strip holds {} bytes, pixel ({},{}) is missing",
                        strip_data.len(), x, global_y
                    )));
                }
            }
        }

        Ok(())
    }
}
