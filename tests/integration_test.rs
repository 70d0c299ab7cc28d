//! End-to-end patch extraction from slide files built on disk

use std::fs;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use image::GenericImageView;

use slidepatch::patching::{DiscardSink, ExtractionOrchestrator, ImageStatus};
use slidepatch::{ExtractionConfig, PyramidSource, SlidePatcher, TiffSlide};

const TISSUE: [u8; 3] = [150, 60, 140];
const GLASS: [u8; 3] = [245, 245, 245];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("slidepatch-it-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

struct Level<F: Fn(u32, u32) -> [u8; 3]> {
    width: u32,
    height: u32,
    tile: u32,
    pixel: F,
}

/// Little-endian tiled RGB TIFF, one uncompressed IFD per level
fn write_slide<F: Fn(u32, u32) -> [u8; 3]>(path: &Path, description: &str, levels: &[Level<F>]) {
    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.write_u16::<LittleEndian>(42).unwrap();
    let mut link = out.len();
    out.write_u32::<LittleEndian>(0).unwrap();

    for (index, level) in levels.iter().enumerate() {
        let across = level.width.div_ceil(level.tile);
        let down = level.height.div_ceil(level.tile);

        let mut offsets = Vec::new();
        for ty in 0..down {
            for tx in 0..across {
                offsets.push(out.len() as u32);
                for y in ty * level.tile..(ty + 1) * level.tile {
                    for x in tx * level.tile..(tx + 1) * level.tile {
                        if x < level.width && y < level.height {
                            out.extend_from_slice(&(level.pixel)(x, y));
                        } else {
                            out.extend_from_slice(&[0, 0, 0]);
                        }
                    }
                }
            }
        }
        let tile_bytes = level.tile * level.tile * 3;

        let offsets_at = out.len() as u32;
        for offset in &offsets {
            out.write_u32::<LittleEndian>(*offset).unwrap();
        }
        let counts_at = out.len() as u32;
        for _ in &offsets {
            out.write_u32::<LittleEndian>(tile_bytes).unwrap();
        }
        let bits_at = out.len() as u32;
        for _ in 0..3 {
            out.write_u16::<LittleEndian>(8).unwrap();
        }
        let description_at = out.len() as u32;
        let mut text = description.as_bytes().to_vec();
        text.push(0);
        if index == 0 {
            out.extend_from_slice(&text);
        }
        if out.len() % 2 == 1 {
            out.push(0);
        }

        let count = offsets.len() as u32;
        let mut entries: Vec<(u16, u16, u32, u32)> = vec![
            (256, 4, 1, level.width),
            (257, 4, 1, level.height),
            (258, 3, 3, bits_at),
            (259, 3, 1, 1),
            (262, 3, 1, 2),
            (277, 3, 1, 3),
            (284, 3, 1, 1),
            (322, 4, 1, level.tile),
            (323, 4, 1, level.tile),
            (324, 4, count, offsets_at),
            (325, 4, count, counts_at),
        ];
        if count == 1 {
            entries[9].3 = offsets[0];
            entries[10].3 = tile_bytes;
        }
        if index == 0 {
            entries.push((270, 2, text.len() as u32, description_at));
        }
        entries.sort_by_key(|entry| entry.0);

        let ifd_at = out.len() as u32;
        out[link..link + 4].copy_from_slice(&ifd_at.to_le_bytes());
        out.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
        for (tag, field_type, count, value) in entries {
            out.write_u16::<LittleEndian>(tag).unwrap();
            out.write_u16::<LittleEndian>(field_type).unwrap();
            out.write_u32::<LittleEndian>(count).unwrap();
            out.write_u32::<LittleEndian>(value).unwrap();
        }
        link = out.len();
        out.write_u32::<LittleEndian>(0).unwrap();
    }

    fs::write(path, out).unwrap();
}

/// 544x288 at 40x over a 272x144 level; tissue covers the left half
fn write_half_tissue_slide(path: &Path) {
    let left_half = |x: u32, _y: u32| if x < 272 { TISSUE } else { GLASS };
    let left_half_level1 = |x: u32, _y: u32| if x < 136 { TISSUE } else { GLASS };
    write_slide(path, "Aperio Image Library v12.0.5\r\n544x288 (64x64) RGB|AppMag = 40|MPP = 0.25", &[
        Level { width: 544, height: 288, tile: 64, pixel: &left_half as &dyn Fn(u32, u32) -> [u8; 3] },
        Level { width: 272, height: 144, tile: 64, pixel: &left_half_level1 as &dyn Fn(u32, u32) -> [u8; 3] },
    ]);
}

fn config_for(output: &Path) -> ExtractionConfig {
    ExtractionConfig {
        patch_size: 64,
        magnification: 20.0,
        white_pixel_threshold: Some(50.0),
        output_directory: output.to_path_buf(),
        ..ExtractionConfig::default()
    }
}

fn png_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir).unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".png"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_slide_file_is_read_as_pyramid() {
    init_logging();
    let dir = scratch_dir("pyramid");
    let path = dir.join("tissue.svs");
    write_half_tissue_slide(&path);

    let slide = TiffSlide::open(&path, None).unwrap();
    assert_eq!(slide.name(), "tissue");
    assert_eq!(slide.base_magnification(), Some(40.0));
    assert_eq!(slide.level_count(), 2);
    assert_eq!(slide.level(1).unwrap().downsample, 2.0);

    let region = slide.read_region((256, 0), 0, (32, 8)).unwrap().to_rgb8();
    assert_eq!(region.get_pixel(15, 0).0, TISSUE);
    assert_eq!(region.get_pixel(16, 0).0, GLASS);
}

#[test]
fn test_batch_writes_tissue_patches_and_summary() {
    init_logging();
    let dir = scratch_dir("batch");
    let slide_path = dir.join("tissue.svs");
    write_half_tissue_slide(&slide_path);
    let output = dir.join("patches");

    let patcher = SlidePatcher::new(config_for(&output), Some(&dir.join("run.log"))).unwrap();
    let batch = patcher.extract(&[slide_path.clone(), dir.join("missing.svs")]).unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.completed_count(), 1);
    assert_eq!(batch.failed_count(), 1);

    let tissue = &batch.images[0];
    assert_eq!(tissue.status, ImageStatus::Completed);
    assert_eq!(tissue.level, Some(1));
    assert_eq!(tissue.total_candidate_patches, 8);
    assert_eq!(tissue.sampled_patches, 8);
    assert_eq!(tissue.accepted_patches, 4);
    assert_eq!(tissue.rejected_patches, 4);
    assert_eq!(tissue.read_errors, 0);
    assert_eq!(tissue.accepted_fraction, Some(0.5));

    assert_eq!(png_names(&output), vec![
        "tissue_000_000.png", "tissue_000_001.png", "tissue_001_000.png", "tissue_001_001.png",
    ]);
    let patch = image::open(output.join("tissue_001_001.png")).unwrap();
    assert_eq!(patch.dimensions(), (64, 64));

    let summary = fs::read_to_string(output.join("patching_results.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("source_name|status|level"));
    assert_eq!(lines[1], "tissue|completed|1|8|8|4|4|0|0.5000");
    assert!(lines[2].starts_with("missing|failed: "));
    assert!(lines[2].ends_with("|0|0|0|0|0|NaN"));
}

#[test]
fn test_unreachable_magnification_fails_only_that_image() {
    init_logging();
    let dir = scratch_dir("magnification");
    let slide_path = dir.join("tissue.svs");
    write_half_tissue_slide(&slide_path);

    let config = ExtractionConfig { magnification: 80.0, ..config_for(&dir.join("patches")) };
    let patcher = SlidePatcher::new(config, Some(&dir.join("run.log"))).unwrap();
    let batch = patcher.extract(&[slide_path]).unwrap();

    assert_eq!(batch.failed_count(), 1);
    assert_eq!(batch.images[0].accepted_patches, 0);
    assert!(png_names(&dir.join("patches")).is_empty());
}

#[test]
fn test_seeded_sampling_matches_across_worker_counts() {
    init_logging();
    let dir = scratch_dir("sampling");
    let slide_path = dir.join("tissue.svs");
    write_half_tissue_slide(&slide_path);

    let sequential = ExtractionConfig {
        sampling: 0.5,
        seed: Some(7),
        white_pixel_threshold: None,
        ..config_for(&dir.join("sequential"))
    };
    let parallel = ExtractionConfig { workers: 4, ..sequential.clone() };
    let parallel = ExtractionConfig { output_directory: dir.join("parallel"), ..parallel };

    let first = SlidePatcher::new(sequential, Some(&dir.join("run.log"))).unwrap()
        .extract(&[slide_path.clone()]).unwrap();
    let second = SlidePatcher::new(parallel, Some(&dir.join("run.log"))).unwrap()
        .extract(&[slide_path]).unwrap();

    assert_eq!(first.images[0], second.images[0]);
    assert_eq!(first.images[0].accepted_patches, first.images[0].sampled_patches);
    assert_eq!(png_names(&dir.join("sequential")), png_names(&dir.join("parallel")));
}

#[test]
fn test_orchestrator_over_opened_slide() {
    init_logging();
    let dir = scratch_dir("orchestrator");
    let slide_path = dir.join("tissue.svs");
    write_half_tissue_slide(&slide_path);

    let options = config_for(&dir).to_options().unwrap();
    let orchestrator = ExtractionOrchestrator::new(options, DiscardSink).unwrap();
    let batch = orchestrator.extract_batch(&[slide_path], |path: &Path| TiffSlide::open(path, None));

    assert_eq!(batch.total_accepted(), 4);
}
