//! Parsed slide container

use crate::tiff::ifd::IFD;
use log::debug;
use std::fmt;

/// A parsed TIFF/BigTIFF file: its IFD chain and format flavour
#[derive(Debug)]
pub struct TIFF {
    pub ifds: Vec<IFD>,
    pub is_big_tiff: bool,
}

impl TIFF {
    pub fn new(is_big_tiff: bool) -> Self {
        TIFF {
            ifds: Vec::new(),
            is_big_tiff,
        }
    }

    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    /// IFDs that make up the resolution pyramid, full resolution first
    ///
    /// When the file contains tiled images, only those count as levels; the
    /// stripped IFDs of an Aperio slide are the thumbnail, label and macro
    /// photo. Plain untiled files contribute IFD 0 plus any IFD flagged as
    /// a reduced-resolution subfile. Levels are ordered by decreasing width.
    pub fn pyramid_ifds(&self) -> Vec<&IFD> {
        let has_tiles = self.ifds.iter().any(|ifd| ifd.is_tiled());

        let mut levels: Vec<&IFD> = self.ifds.iter()
            .filter(|ifd| ifd.get_dimensions().is_some())
            .filter(|ifd| {
                if has_tiles {
                    ifd.is_tiled()
                } else {
                    ifd.number == 0 || ifd.is_reduced_resolution()
                }
            })
            .collect();

        levels.sort_by_key(|ifd| std::cmp::Reverse(ifd.get_dimensions().map(|(w, _)| w).unwrap_or(0)));

        debug!("Pyramid uses IFDs {:?}", levels.iter().map(|ifd| ifd.number).collect::<Vec<_>>());
        levels
    }
}

impl fmt::Display for TIFF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIFF File:")?;
        writeln!(f, "  Format: {}", if self.is_big_tiff { "BigTIFF" } else { "TIFF" })?;
        writeln!(f, "  Number of IFDs: {}", self.ifds.len())?;

        if let Some(ifd) = self.main_ifd() {
            write!(f, "{}", ifd)?;
        }

        Ok(())
    }
}
