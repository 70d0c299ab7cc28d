//! Tests for IFD chain parsing and tag decoding

use std::io::Cursor;
use byteorder::{BigEndian, WriteBytesExt};

use super::test_utils::{aperio_like_slide, create_test_bigtiff_buffer, create_test_tiff_buffer};
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{compression, field_types, tags};
use crate::tiff::reader::TiffReader;

#[test]
fn test_read_classic_header() {
    let mut cursor = create_test_tiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert!(!tiff.is_big_tiff);
    assert_eq!(reader.byte_order(), Some(ByteOrder::LittleEndian));
    assert_eq!(tiff.ifd_count(), 1);
    assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((800, 600)));
}

#[test]
fn test_read_bigtiff_header() {
    let mut cursor = create_test_bigtiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert!(tiff.is_big_tiff);
    assert!(reader.is_big_tiff());
    assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((1024, 768)));
}

#[test]
fn test_unknown_version_is_rejected() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"II");
    buffer.extend_from_slice(&[44, 0, 8, 0, 0, 0]);

    assert!(TiffReader::new().read(&mut Cursor::new(buffer)).is_err());
}

#[test]
fn test_follows_the_whole_ifd_chain() {
    let mut cursor = Cursor::new(aperio_like_slide());
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert_eq!(tiff.ifd_count(), 4);
    let widths: Vec<u64> = tiff.ifds.iter().map(|ifd| ifd.get_dimensions().unwrap().0).collect();
    assert_eq!(widths, vec![512, 64, 256, 128]);
    assert!(tiff.ifds[0].is_tiled());
    assert!(!tiff.ifds[1].is_tiled());

    let levels: Vec<usize> = tiff.pyramid_ifds().iter().map(|ifd| ifd.number).collect();
    assert_eq!(levels, vec![0, 2, 3]);
}

#[test]
fn test_reads_offset_arrays_and_short_arrays() {
    let mut cursor = Cursor::new(aperio_like_slide());
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let level0 = &tiff.ifds[0];

    // 512x384 in 128px tiles
    let offsets = reader.read_tag_values(&mut cursor, level0, tags::TILE_OFFSETS).unwrap();
    assert_eq!(offsets.len(), 12);
    assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));

    let bits = reader.read_tag_values(&mut cursor, level0, tags::BITS_PER_SAMPLE).unwrap();
    assert_eq!(bits, vec![8, 8, 8]);

    assert_eq!(level0.get_tag_value(tags::COMPRESSION), Some(compression::NONE as u64));
    assert_eq!(tiff.ifds[2].get_tag_value(tags::COMPRESSION), Some(compression::DEFLATE as u64));
}

#[test]
fn test_reads_image_description() {
    let mut cursor = Cursor::new(aperio_like_slide());
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let description = reader.read_ascii_tag(&mut cursor, &tiff.ifds[0], tags::IMAGE_DESCRIPTION).unwrap();
    assert!(description.starts_with("Aperio Image Library"));
    assert!(description.ends_with("MPP = 0.2520"));

    assert!(reader.read_ascii_tag(&mut cursor, &tiff.ifds[1], tags::IMAGE_DESCRIPTION).is_err());
}

#[test]
fn test_big_endian_inline_short_is_read_from_leading_bytes() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"MM");
    buffer.write_u16::<BigEndian>(42).unwrap();
    buffer.write_u32::<BigEndian>(8).unwrap();

    buffer.write_u16::<BigEndian>(3).unwrap();
    for (tag, value) in [(tags::IMAGE_WIDTH, 300u16), (tags::IMAGE_LENGTH, 200), (tags::SAMPLES_PER_PIXEL, 3)] {
        buffer.write_u16::<BigEndian>(tag).unwrap();
        buffer.write_u16::<BigEndian>(field_types::SHORT).unwrap();
        buffer.write_u32::<BigEndian>(1).unwrap();
        buffer.write_u16::<BigEndian>(value).unwrap();
        buffer.write_u16::<BigEndian>(0).unwrap();
    }
    buffer.write_u32::<BigEndian>(0).unwrap();

    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut Cursor::new(buffer)).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    assert_eq!(reader.byte_order(), Some(ByteOrder::BigEndian));
    assert_eq!(ifd.get_dimensions(), Some((300, 200)));
    assert_eq!(ifd.get_samples_per_pixel(), 3);
}

#[test]
fn test_cyclic_chain_terminates() {
    let mut buffer = create_test_tiff_buffer().into_inner();
    // Point the next-IFD link back at the first IFD
    let next = buffer.len() - 4;
    buffer[next..].copy_from_slice(&8u32.to_le_bytes());

    let tiff = TiffReader::new().read(&mut Cursor::new(buffer)).unwrap();
    assert!(tiff.ifd_count() >= 1);
    assert!(tiff.ifd_count() <= 100);
}
