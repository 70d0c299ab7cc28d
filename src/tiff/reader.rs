//! TIFF/BigTIFF container reader
//!
//! Walks the IFD chain of a slide file and decodes tag values. Pixel data
//! is not touched here; the extractor module reads tiles and strips.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Cursor, SeekFrom};
use std::path::{Path, PathBuf};

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::field_types;
use crate::tiff::errors::{PatchError, PatchResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;
use crate::utils::{format_utils, ifd_utils, string_utils, tag_utils};

/// Upper bound on IFDs followed before assuming a cyclic chain
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF files
///
/// Holds the byte order and format flavour detected on the last `load` or
/// `read`, which later tag reads need.
pub struct TiffReader {
    byte_order: Option<ByteOrder>,
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    current_file: Option<PathBuf>,
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    pub fn new() -> Self {
        TiffReader {
            byte_order: None,
            byte_order_handler: None,
            current_file: None,
            is_big_tiff: false,
        }
    }

    /// Opens a fresh buffered handle on the loaded file
    ///
    /// Each caller gets its own handle, so concurrent region reads never
    /// share a file cursor.
    pub fn create_reader(&self) -> PatchResult<BufReader<File>> {
        match &self.current_file {
            Some(path) => Ok(BufReader::with_capacity(1024 * 1024, File::open(path)?)),
            None => Err(PatchError::GenericError("No file path specified".to_string())),
        }
    }

    pub(crate) fn handler(&self) -> PatchResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| PatchError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Parses the IFD chain of the file at `filepath`
    pub fn load(&mut self, filepath: &Path) -> PatchResult<TIFF> {
        info!("Loading TIFF file: {}", filepath.display());
        self.current_file = Some(filepath.to_path_buf());

        let file = File::open(filepath)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        self.read(&mut reader)
    }

    /// Parses the IFD chain from any seekable source
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> PatchResult<TIFF> {
        let byte_order = format_utils::detect_byte_order(reader)?;
        let handler = byte_order.create_handler();

        self.is_big_tiff = format_utils::detect_tiff_format(reader, handler.as_ref())?;
        let first_ifd_offset = handler.read_offset(reader, self.is_big_tiff)?;
        debug!("First IFD offset: {}", first_ifd_offset);

        self.byte_order = Some(byte_order);
        self.byte_order_handler = Some(handler);

        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(self.is_big_tiff);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        info!("Read {} IFDs ({})", tiff.ifds.len(), if self.is_big_tiff { "BigTIFF" } else { "TIFF" });
        Ok(tiff)
    }

    /// Follows next-IFD pointers, stopping early on any malformed link
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> PatchResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;
        let handler = self.handler()?;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };

            let next_offset_position = ifd_offset + ifd_utils::calculate_ifd_size(&ifd, self.is_big_tiff)
                - if self.is_big_tiff { 8 } else { 4 };
            reader.seek(SeekFrom::Start(next_offset_position))?;

            let next_ifd_offset = match handler.read_offset(reader, self.is_big_tiff) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    ifds.push(ifd);
                    break;
                }
            };

            ifds.push(ifd);

            if next_ifd_offset != 0 && (next_ifd_offset >= file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD: entry count followed by fixed-size entries
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> PatchResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }

        debug!("Read IFD #{} with {} entries", number, ifd.entry_count());
        Ok(ifd)
    }

    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> PatchResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = handler.read_offset(reader, self.is_big_tiff)?;

        let mut raw = vec![0u8; if self.is_big_tiff { 8 } else { 4 }];
        reader.read_exact(&mut raw)?;

        if tag_utils::is_value_inline(field_type, count, self.is_big_tiff) {
            let value = if count == 0 {
                0
            } else {
                ifd_utils::decode_inline_value(&raw, field_type, handler)
                    .unwrap_or_else(|_| ifd_utils::decode_offset(&raw, self.is_big_tiff, handler).unwrap_or(0))
            };
            Ok(IFDEntry::new(tag, field_type, count, value).with_inline_bytes(raw))
        } else {
            let offset = ifd_utils::decode_offset(&raw, self.is_big_tiff, handler)?;
            Ok(IFDEntry::new(tag, field_type, count, offset))
        }
    }

    /// Reads every value of a tag as u64
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> PatchResult<Vec<u64>> {
        let entry = ifd.get_entry(tag)
            .ok_or(PatchError::TagNotFound(tag))?;
        let handler = self.handler()?;

        let mut values = Vec::with_capacity(entry.count as usize);
        if entry.inline_bytes.is_empty() {
            reader.seek(SeekFrom::Start(entry.value_offset))?;
            tag_utils::read_tag_value_array(reader, entry, handler, &mut values)?;
        } else {
            let mut cursor = Cursor::new(entry.inline_bytes.as_slice());
            tag_utils::read_tag_value_array(&mut cursor, entry, handler, &mut values)?;
        }

        Ok(values)
    }

    /// Raw bytes of a BYTE/UNDEFINED/ASCII tag, such as JPEGTables
    pub fn read_tag_bytes(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> PatchResult<Vec<u8>> {
        let entry = ifd.get_entry(tag)
            .ok_or(PatchError::TagNotFound(tag))?;

        if !matches!(entry.field_type, field_types::BYTE | field_types::UNDEFINED | field_types::ASCII) {
            return Err(PatchError::UnsupportedFieldType(entry.field_type));
        }

        let count = entry.count as usize;
        if !entry.inline_bytes.is_empty() {
            return Ok(entry.inline_bytes[..count.min(entry.inline_bytes.len())].to_vec());
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut buffer = vec![0u8; count];
        reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Reads an ASCII tag, dropping the trailing NUL terminator(s)
    pub fn read_ascii_tag(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> PatchResult<String> {
        let mut buffer = self.read_tag_bytes(reader, ifd, tag)?;
        string_utils::trim_trailing_nulls(&mut buffer);
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }
}
