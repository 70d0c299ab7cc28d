//! Region reads from tiled levels
//!
//! Tiled levels split the image into equally sized blocks, so a patch read
//! only decodes the handful of tiles it overlaps.

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

/// Reads pixel regions from a tiled IFD
pub struct TileReader<'a, R: SeekableReader> {
    reader: R,
    ifd: &'a IFD,
    tiff_reader: &'a TiffReader,
}

impl<'a, R: SeekableReader> TileReader<'a, R> {
    pub fn new(reader: R, ifd: &'a IFD, tiff_reader: &'a TiffReader) -> Self {
        TileReader {
            reader,
            ifd,
            tiff_reader
        }
    }

    /// Tile width and height (256x256 when the tags are absent)
    fn get_tile_dimensions(&self) -> (u32, u32) {
        let tile_width = self.ifd.get_tag_value(tags::TILE_WIDTH)
            .unwrap_or(256) as u32;
        let tile_height = self.ifd.get_tag_value(tags::TILE_LENGTH)
            .unwrap_or(256) as u32;

        (tile_width, tile_height)
    }

    fn read_tile(
        &mut self,
        offset: u64,
        byte_count: u64,
        compression_handler: &dyn CompressionHandler,
        predictor: u64,
        tile_width: usize,
        tile_height: usize,
        samples: usize,
    ) -> PatchResult<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut compressed_data = vec![0u8; byte_count as usize];
        self.reader.read_exact(&mut compressed_data)?;

        let mut tile_data = compression_handler.decompress(&compressed_data)?;

        if predictor == pred_consts::HORIZONTAL_DIFFERENCING as u64 {
            pixel_utils::apply_horizontal_predictor(&mut tile_data, tile_width, tile_height, samples);
        }

        Ok(tile_data)
    }

    /// Decodes every tile overlapping `region` into `image`
    ///
    /// `image` must be `region.width` x `region.height`. Any tile that
    /// cannot be read fails the whole region.
    pub fn extract(&mut self, image: &mut RgbImage, region: Region) -> PatchResult<()> {
        let (tile_width, tile_height) = self.get_tile_dimensions();
        if tile_width == 0 || tile_height == 0 {
            return Err(PatchError::SourceRead(format!("IFD #{} declares an empty tile size", self.ifd.number)));
        }

        let compression_handler = super::block_decoder(&mut self.reader, self.ifd, self.tiff_reader)?;
        let predictor = self.ifd.get_tag_value(tags::PREDICTOR).unwrap_or(1);
        let samples = compression_handler.decoded_samples(self.ifd.get_samples_per_pixel() as usize);

        let tile_offsets = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::TILE_OFFSETS)?;
        let tile_byte_counts = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::TILE_BYTE_COUNTS)?;

        let (img_width, _) = self.ifd.get_dimensions()
            .ok_or(PatchError::MissingDimensions)?;
        let tiles_across = (img_width as u32).div_ceil(tile_width);

        let start_tile_x = region.x / tile_width;
        let start_tile_y = region.y / tile_height;
        let end_tile_x = region.end_x().div_ceil(tile_width);
        let end_tile_y = region.end_y().div_ceil(tile_height);

        trace!("Region {:?} spans tiles ({},{})..({},{})",
               region, start_tile_x, start_tile_y, end_tile_x, end_tile_y);

        for tile_y in start_tile_y..end_tile_y {
            for tile_x in start_tile_x..end_tile_x {
                let tile_index = (tile_y * tiles_across + tile_x) as usize;

                let (offset, byte_count) = match (tile_offsets.get(tile_index), tile_byte_counts.get(tile_index)) {
                    (Some(&offset), Some(&byte_count)) => (offset, byte_count),
                    _ => {
                        return Err(PatchError::SourceRead(format!(
                            "tile {} of IFD #{} is missing from the offset table", tile_index, self.ifd.number
                        )));
                    }
                };

                debug!("Reading tile ({},{}) at offset {} with {} bytes",
                       tile_x, tile_y, offset, byte_count);

                let tile_data = self.read_tile(
                    offset,
                    byte_count,
                    compression_handler.as_ref(),
                    predictor,
                    tile_width as usize,
                    tile_height as usize,
                    samples,
                ).map_err(|e| PatchError::SourceRead(format!("tile ({},{}): {}", tile_x, tile_y, e)))?;

                self.copy_tile_to_image(
                    &tile_data,
                    samples,
                    image,
                    tile_width,
                    tile_height,
                    tile_x * tile_width,
                    tile_y * tile_height,
                    region
                ).map_err(|e| PatchError::SourceRead(format!("tile ({},{}): {}", tile_x, tile_y, e)))?;
            }
        }

        Ok(())
    }

    /// Copies the part of one decoded tile that falls inside `region`
    ///
    /// Fails when the decoded buffer is too short to cover that part.
    fn copy_tile_to_image(
        &self,
        tile_data: &[u8],
        samples: usize,
        image: &mut RgbImage,
        tile_width: u32,
        tile_height: u32,
        tile_start_x: u32,
        tile_start_y: u32,
        region: Region
    ) -> PatchResult<()> {
        let y_from = region.y.max(tile_start_y);
        let y_to = region.end_y().min(tile_start_y + tile_height);
        let x_from = region.x.max(tile_start_x);
        let x_to = region.end_x().min(tile_start_x + tile_width);

        for global_y in y_from..y_to {
            let row_start = ((global_y - tile_start_y) * tile_width) as usize;
            for global_x in x_from..x_to {
                let tile_idx = row_start + (global_x - tile_start_x) as usize;
                if !pixel_utils::copy_pixel(tile_data, samples, image, global_x, global_y, tile_idx, region) {
                    return Err(PatchError::SourceRead(format!(
                        "decoded tile holds {} bytes, pixel ({},{}) needs {}",
                        tile_data.len(), global_x, global_y, (tile_idx + 1) * samples
                    )));
                }
            }
        }

        Ok(())
    }
}
