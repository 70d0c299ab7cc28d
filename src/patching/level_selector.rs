//! Choosing the pyramid level to read patches from
//!
//! The coarsest level whose magnification still reaches the target is the
//! cheapest to read; whatever magnification it has in excess is removed by
//! resizing each patch down.

use log::debug;

use crate::slide::{Level, PyramidSource};
use crate::tiff::errors::{PatchError, PatchResult};

/// Level to read and the residual downscale to apply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSelection {
    pub level: usize,
    /// Effective magnification of `level` over the target, at least 1
    pub resize_factor: f64,
}

pub struct LevelSelector;

impl LevelSelector {
    /// Selects the level of `source` for `magnification`
    pub fn select(source: &dyn PyramidSource, magnification: f64) -> PatchResult<LevelSelection> {
        let base_magnification = source.base_magnification()
            .ok_or(PatchError::MissingMagnification)?;
        let selection = Self::select_from_levels(source.levels(), base_magnification, magnification)?;

        debug!("{}: level {} with resize factor {:.4} for {}x",
               source.name(), selection.level, selection.resize_factor, magnification);
        Ok(selection)
    }

    /// Scans `levels` in order and keeps the last one reaching `magnification`
    ///
    /// Effective magnification never increases with the level index, so the
    /// scan stops at the first level that falls short.
    pub fn select_from_levels(levels: &[Level], base_magnification: f64, magnification: f64) -> PatchResult<LevelSelection> {
        let first = levels.first().ok_or(PatchError::MissingDimensions)?;

        let mut chosen = None;
        for level in levels {
            let effective = level.effective_magnification(base_magnification);
            if effective >= magnification {
                chosen = Some((level.index, effective));
            } else {
                break;
            }
        }

        match chosen {
            Some((level, effective)) => Ok(LevelSelection {
                level,
                resize_factor: effective / magnification,
            }),
            None => Err(PatchError::UnsatisfiableMagnification {
                requested: magnification,
                available: first.effective_magnification(base_magnification),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn three_levels() -> Vec<Level> {
        vec![
            Level::new(0, 4096, 4096, 1.0),
            Level::new(1, 2048, 2048, 2.0),
            Level::new(2, 1024, 1024, 4.0),
        ]
    }

    #[test]
    fn exact_level_match_needs_no_resize() {
        let selection = LevelSelector::select_from_levels(&three_levels(), 40.0, 20.0).unwrap();
        assert_eq!(selection, LevelSelection { level: 1, resize_factor: 1.0 });
    }

    #[test]
    fn between_levels_reads_the_finer_one_and_resizes() {
        let selection = LevelSelector::select_from_levels(&three_levels(), 40.0, 15.0).unwrap();
        assert_eq!(selection.level, 1);
        assert!((selection.resize_factor - 20.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn coarsest_level_is_used_for_low_magnification() {
        let selection = LevelSelector::select_from_levels(&three_levels(), 40.0, 2.5).unwrap();
        assert_eq!(selection.level, 2);
        assert_eq!(selection.resize_factor, 4.0);
    }

    #[test]
    fn magnification_above_level_zero_is_an_error() {
        match LevelSelector::select_from_levels(&three_levels(), 40.0, 50.0) {
            Err(PatchError::UnsatisfiableMagnification { requested, available }) => {
                assert_eq!(requested, 50.0);
                assert_eq!(available, 40.0);
            },
            other => panic!("unexpected selection: {:?}", other),
        }
    }

    #[test]
    fn selection_is_coarsest_satisfying_level() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let count = rng.gen_range(1..6);
            let mut downsample = 1.0;
            let levels: Vec<Level> = (0..count)
                .map(|index| {
                    if index > 0 {
                        downsample *= rng.gen_range(1.0..4.0);
                    }
                    Level::new(index, 1000, 1000, downsample)
                })
                .collect();
            let base = rng.gen_range(5.0..80.0);
            let target = rng.gen_range(0.5..base);

            let selection = LevelSelector::select_from_levels(&levels, base, target).unwrap();
            assert!(selection.resize_factor >= 1.0);
            if let Some(next) = levels.get(selection.level + 1) {
                assert!(next.effective_magnification(base) < target);
            }
        }
    }
}
