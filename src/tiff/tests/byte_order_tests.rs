//! Tests for the byte order module

use std::io::Cursor;
use byteorder::{LittleEndian, BigEndian, WriteBytesExt};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler, LittleEndianHandler, BigEndianHandler};

#[test]
fn test_byte_order_detection_little_endian() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II
    let mut cursor = Cursor::new(buffer);

    assert_eq!(ByteOrder::detect(&mut cursor).unwrap(), ByteOrder::LittleEndian);
}

#[test]
fn test_byte_order_detection_big_endian() {
    let mut buffer = Vec::new();
    buffer.write_u16::<BigEndian>(0x4D4D).unwrap(); // MM
    let mut cursor = Cursor::new(buffer);

    assert_eq!(ByteOrder::detect(&mut cursor).unwrap(), ByteOrder::BigEndian);
}

#[test]
fn test_byte_order_detection_invalid() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x1234).unwrap();
    let mut cursor = Cursor::new(buffer);

    assert!(ByteOrder::detect(&mut cursor).is_err());
}

#[test]
fn test_little_endian_handler() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x1234).unwrap();
    buffer.write_u32::<LittleEndian>(0x12345678).unwrap();
    buffer.write_u64::<LittleEndian>(0x1234567890ABCDEF).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = LittleEndianHandler;

    assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0x1234);
    assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0x12345678);
    assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x1234567890ABCDEF);
}

#[test]
fn test_big_endian_handler() {
    let mut buffer = Vec::new();
    buffer.write_u16::<BigEndian>(0x1234).unwrap();
    buffer.write_u32::<BigEndian>(0x12345678).unwrap();
    buffer.write_u64::<BigEndian>(0x1234567890ABCDEF).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = BigEndianHandler;

    assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0x1234);
    assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0x12345678);
    assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x1234567890ABCDEF);
}

#[test]
fn test_offset_width_follows_format() {
    let mut buffer = Vec::new();
    buffer.write_u32::<LittleEndian>(0xDEAD).unwrap();
    buffer.write_u64::<LittleEndian>(0x1_0000_0000).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = LittleEndianHandler;

    assert_eq!(handler.read_offset(&mut cursor, false).unwrap(), 0xDEAD);
    assert_eq!(handler.read_offset(&mut cursor, true).unwrap(), 0x1_0000_0000);
}

#[test]
fn test_rational_reads_numerator_first() {
    let mut buffer = Vec::new();
    buffer.write_u32::<BigEndian>(72).unwrap();
    buffer.write_u32::<BigEndian>(1).unwrap();
    let mut cursor = Cursor::new(buffer);

    assert_eq!(BigEndianHandler.read_rational(&mut cursor).unwrap(), (72, 1));
}
