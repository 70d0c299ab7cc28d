//! Helpers for decoded 8-bit sample buffers

use image::{Rgb, RgbImage};

use crate::extractor::Region;

/// Undoes TIFF horizontal differencing (predictor 2) in place
///
/// Each sample is stored as the difference to the same channel of the
/// previous pixel in its row.
pub fn apply_horizontal_predictor(data: &mut [u8], width: usize, height: usize, samples: usize) {
    let row_len = width * samples;
    for row in 0..height {
        let start = row * row_len;
        let end = (start + row_len).min(data.len());
        if start >= end {
            break;
        }

        for i in (start + samples)..end {
            data[i] = data[i].wrapping_add(data[i - samples]);
        }
    }
}

/// Converts one decoded pixel to RGB
///
/// Grey (and grey+alpha) samples are replicated, a trailing alpha sample is
/// dropped.
pub fn to_rgb(pixel: &[u8]) -> Rgb<u8> {
    match pixel.len() {
        0 => Rgb([0, 0, 0]),
        1 | 2 => Rgb([pixel[0], pixel[0], pixel[0]]),
        _ => Rgb([pixel[0], pixel[1], pixel[2]]),
    }
}

/// Copies the pixel at `pixel_index` of `data` into `image`
///
/// `global_x`/`global_y` are level coordinates; the pixel lands at its
/// offset inside `region`. Returns `false` when the pixel is outside the
/// region or the buffer.
pub fn copy_pixel(
    data: &[u8],
    samples: usize,
    image: &mut RgbImage,
    global_x: u32,
    global_y: u32,
    pixel_index: usize,
    region: Region,
) -> bool {
    if !region.contains(global_x, global_y) {
        return false;
    }

    let start = pixel_index * samples;
    let Some(pixel) = data.get(start..start + samples) else {
        return false;
    };

    image.put_pixel(global_x - region.x, global_y - region.y, to_rgb(pixel));
    true
}
