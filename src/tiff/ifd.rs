//! Image File Directory (IFD) structures
//!
//! Every image stored in a slide file (each pyramid level, the thumbnail,
//! the label and the macro photo) is described by one IFD. This module
//! holds the parsed tag entries and answers the layout questions the
//! pyramid builder needs: dimensions, tiling, subfile flags, channels.

use std::collections::HashMap;
use std::fmt;
use log::{debug, trace};

use crate::tiff::constants::{new_subfile_type, tags};
use crate::utils::tag_utils;

/// One Image File Directory
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in file order
    pub entries: Vec<IFDEntry>,
    /// Position in the IFD chain (0-based)
    pub number: usize,
    /// Offset of this IFD in the file
    pub offset: u64,
    tag_map: HashMap<u16, IFDEntry>,
}

/// One tag entry of an IFD
///
/// `value_offset` holds the value itself when it fits inline, otherwise the
/// file offset of the value array.
#[derive(Debug, Clone)]
pub struct IFDEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u64,
    pub value_offset: u64,
    /// Raw bytes of the value field when the value is stored inline
    pub inline_bytes: Vec<u8>,
}

impl IFDEntry {
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        trace!("IFD entry: tag={} ({}), type={} ({}), count={}, value/offset={}",
               tag, tag_utils::get_tag_name(tag),
               field_type, tag_utils::get_field_type_name(field_type),
               count, value_offset);

        Self {
            tag,
            field_type,
            count,
            value_offset,
            inline_bytes: Vec::new(),
        }
    }

    /// Attaches the raw value field, for entries whose data lives in the IFD
    pub fn with_inline_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.inline_bytes = bytes;
        self
    }

    /// Human-readable one-line description, used in verbose inspection output
    pub fn description(&self) -> String {
        let value_display = match self.tag {
            tags::COMPRESSION => format!("{} ({})",
                                         self.value_offset,
                                         tag_utils::get_compression_name(self.value_offset)),
            _ => self.value_offset.to_string(),
        };

        format!("Tag: {} ({}), Type: {}, Count: {}, Value/Offset: {}",
                self.tag, tag_utils::get_tag_name(self.tag),
                tag_utils::get_field_type_name(self.field_type),
                self.count, value_display)
    }
}

impl IFD {
    pub fn new(number: usize, offset: u64) -> Self {
        debug!("Creating IFD #{} at offset {}", number, offset);

        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry and indexes it by tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        self.tag_map.insert(entry.tag, entry.clone());
        self.entries.push(entry);
    }

    /// Inline value (or offset) of a tag
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.tag_map.get(&tag).map(|entry| entry.value_offset)
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag)
    }

    /// Width and height, if both tags are present
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Channels per pixel (TIFF default is 1)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Whether the pixel data is organised in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) && self.has_tag(tags::TILE_LENGTH)
    }

    /// Whether NewSubfileType flags this image as a reduced-resolution copy
    pub fn is_reduced_resolution(&self) -> bool {
        self.get_tag_value(tags::NEW_SUBFILE_TYPE)
            .map(|flags| flags & new_subfile_type::REDUCED_RESOLUTION != 0)
            .unwrap_or(false)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }

        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;
        writeln!(f, "  Layout: {}", if self.is_tiled() { "tiled" } else { "stripped" })?;

        writeln!(f, "  Tags:")?;
        for entry in &self.entries {
            writeln!(f, "    {}", entry.description())?;
        }

        Ok(())
    }
}
