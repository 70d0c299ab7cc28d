//! Per-image and per-batch extraction driver
//!
//! For every image: select a level, plan the grid, then for each planned
//! cell draw the sampling decision and, when admitted, read, filter and
//! hand the patch to the sink. Per-image counters are atomics so a worker
//! pool can process the cells of one image concurrently.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelBridge, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::patching::background_filter::BackgroundFilter;
use crate::patching::grid_planner::GridPlan;
use crate::patching::level_selector::LevelSelector;
use crate::patching::patch_reader::PatchReader;
use crate::patching::sampler::Sampler;
use crate::patching::sink::PatchSink;
use crate::patching::types::{
    BatchExtractionResult, ImageExtractionResult, PatchCounts, PatchDescriptor, TargetSpec,
};
use crate::slide::PyramidSource;
use crate::tiff::errors::{PatchError, PatchResult};
use crate::tiff::validation::validate_range;
use crate::utils::progress::ProgressTracker;

/// Run parameters shared by every image of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOptions {
    pub target: TargetSpec,
    pub filter: BackgroundFilter,
    /// Admission probability in (0, 1]
    pub sampling_rate: f64,
    /// Seed of the sampling generator; image `i` of a batch uses `seed + i`
    pub seed: Option<u64>,
    /// Pool size; 0 or 1 runs everything on the calling thread
    pub workers: usize,
    /// Also process several images at once (needs `workers > 1`)
    pub parallel_images: bool,
}

impl ExtractionOptions {
    pub fn new(target: TargetSpec) -> Self {
        ExtractionOptions {
            target,
            filter: BackgroundFilter::default(),
            sampling_rate: 1.0,
            seed: None,
            workers: 1,
            parallel_images: false,
        }
    }
}

#[derive(Default)]
struct PatchCounters {
    sampled: AtomicUsize,
    accepted: AtomicUsize,
    rejected: AtomicUsize,
    read_errors: AtomicUsize,
}

impl PatchCounters {
    fn snapshot(&self) -> PatchCounts {
        PatchCounts {
            sampled: self.sampled.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Drives patch extraction for single images and batches
pub struct ExtractionOrchestrator<S: PatchSink> {
    options: ExtractionOptions,
    sampler: Sampler,
    sink: S,
    pool: Option<ThreadPool>,
    show_progress: bool,
}

impl<S: PatchSink> ExtractionOrchestrator<S> {
    /// Fails with `Configuration` on out-of-range options, before any image
    /// is touched
    pub fn new(options: ExtractionOptions, sink: S) -> PatchResult<Self> {
        validate_range(options.filter.white_threshold, 0.0, 100.0, "white_pixel_threshold")?;
        let sampler = Sampler::new(options.sampling_rate)?;

        let pool = if options.workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(options.workers)
                .thread_name(|index| format!("slidepatch-worker-{}", index))
                .build()
                .map_err(|e| PatchError::Configuration(format!("cannot start worker pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        Ok(ExtractionOrchestrator {
            sampler,
            options,
            sink,
            pool,
            show_progress: false,
        })
    }

    /// Shows a progress bar over the images of a batch
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Sampling generator of the `index`-th image of a run
    fn image_rng(&self, index: usize) -> StdRng {
        match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        }
    }

    /// Extracts one opened image, drawing sampling decisions from `rng`
    ///
    /// Decisions are drawn in row-major grid order whatever the worker
    /// count, so a seeded generator gives the same counts in both modes.
    pub fn extract_image<R: Rng + Send>(&self, source: &dyn PyramidSource, rng: &mut R) -> ImageExtractionResult {
        let name = source.name().to_string();
        let counters = PatchCounters::default();

        let selection = match LevelSelector::select(source, self.options.target.magnification) {
            Ok(selection) => selection,
            Err(e) => {
                warn!("{}: {}", name, e);
                return ImageExtractionResult::failed(&name, None, 0, counters.snapshot(), &e);
            },
        };

        let level = match source.level(selection.level) {
            Some(level) => *level,
            None => {
                let e = PatchError::SourceRead(format!("level {} disappeared", selection.level));
                return ImageExtractionResult::failed(&name, Some(selection.level), 0, counters.snapshot(), &e);
            },
        };

        let plan = GridPlan::new(
            level.index,
            level.width,
            level.height,
            level.downsample,
            self.options.target.patch_edge,
            selection.resize_factor,
        );
        let total = plan.len();
        info!("{}: level {} ({}x{}), {}x{} grid of {} px reads",
              name, level.index, level.width, level.height, plan.rows, plan.cols, plan.level_patch_edge);

        let sampler = self.sampler;
        let admitted = plan.iter().filter(move |_| sampler.admit(&mut *rng));

        let outcome = match &self.pool {
            Some(pool) => pool.install(|| {
                admitted
                    .par_bridge()
                    .try_for_each(|descriptor| self.process_patch(source, &descriptor, &counters))
            }),
            None => {
                let mut outcome = Ok(());
                for descriptor in admitted {
                    if let Err(e) = self.process_patch(source, &descriptor, &counters) {
                        outcome = Err(e);
                        break;
                    }
                }
                outcome
            },
        };

        let counts = counters.snapshot();
        match outcome {
            Ok(()) => {
                info!("{}: accepted {} of {} candidates ({} read, {} rejected, {} read errors)",
                      name, counts.accepted, total, counts.sampled, counts.rejected, counts.read_errors);
                ImageExtractionResult::completed(&name, level.index, total, counts)
            },
            Err(e) => {
                warn!("{}: stopped after {} patches: {}", name, counts.sampled, e);
                ImageExtractionResult::failed(&name, Some(level.index), total, counts, &e)
            },
        }
    }

    /// Read, filter and persist one admitted cell
    ///
    /// Read errors are counted and absorbed; anything else stops the image.
    fn process_patch(&self, source: &dyn PyramidSource, descriptor: &PatchDescriptor, counters: &PatchCounters) -> PatchResult<()> {
        counters.sampled.fetch_add(1, Ordering::Relaxed);

        let pixels = match PatchReader::read(source, descriptor) {
            Ok(pixels) => pixels,
            Err(e) if !e.is_fatal_for_image() => {
                debug!("{}: skipping patch {:?}: {}", source.name(), descriptor.grid_index, e);
                counters.read_errors.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            },
            Err(e) => return Err(e),
        };

        let accepted = self.options.filter.is_disabled() || {
            let verdict = self.options.filter.evaluate(&pixels);
            debug!("{}: patch {:?} is {:.2}% background",
                   source.name(), descriptor.grid_index, verdict.white_fraction);
            verdict.accepted
        };

        if accepted {
            self.sink.save(source.name(), descriptor, &pixels)?;
            counters.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.rejected.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Opens each input with `open`, extracts it and drops it
    ///
    /// Images are isolated: a failure to open or extract one is recorded in
    /// its result and the batch goes on. Results keep the input order.
    pub fn extract_batch<P, T, O>(&self, inputs: &[P], open: O) -> BatchExtractionResult
    where
        P: AsRef<Path> + Sync,
        T: PyramidSource,
        O: Fn(&Path) -> PatchResult<T> + Sync,
    {
        let progress = if self.show_progress {
            Some(ProgressTracker::new(inputs.len() as u64, "Extracting patches"))
        } else {
            None
        };

        let run_one = |index: usize, input: &P| {
            let result = self.extract_path(index, input.as_ref(), &open);
            if let Some(progress) = &progress {
                progress.set_message(&result.source_name);
                progress.increment(1);
            }
            result
        };

        let images: Vec<ImageExtractionResult> = match (&self.pool, self.options.parallel_images) {
            (Some(pool), true) => pool.install(|| {
                inputs.par_iter()
                    .enumerate()
                    .map(|(index, input)| run_one(index, input))
                    .collect()
            }),
            _ => inputs.iter()
                .enumerate()
                .map(|(index, input)| run_one(index, input))
                .collect(),
        };

        if let Some(progress) = &progress {
            progress.finish();
        }

        let batch = BatchExtractionResult::new(images);
        info!("Batch finished: {} completed, {} failed, {} patches accepted",
              batch.completed_count(), batch.failed_count(), batch.total_accepted());
        batch
    }

    fn extract_path<T, O>(&self, index: usize, path: &Path, open: &O) -> ImageExtractionResult
    where
        T: PyramidSource,
        O: Fn(&Path) -> PatchResult<T>,
    {
        match open(path) {
            Ok(source) => {
                let mut rng = self.image_rng(index);
                self.extract_image(&source, &mut rng)
            },
            Err(e) => {
                warn!("Cannot open {}: {}", path.display(), e);
                let name = path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                ImageExtractionResult::failed(&name, None, 0, PatchCounts::default(), &e)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use image::{DynamicImage, Rgba, RgbaImage};

    use crate::patching::patch_reader::PatchPixels;
    use crate::patching::sink::DiscardSink;
    use crate::patching::types::ImageStatus;
    use crate::slide::MemorySlide;

    /// Remembers which grid cells were saved
    #[derive(Default)]
    struct RecordingSink {
        saved: Mutex<Vec<(String, (usize, usize))>>,
    }

    impl PatchSink for RecordingSink {
        fn save(&self, source_name: &str, descriptor: &PatchDescriptor, _pixels: &PatchPixels) -> PatchResult<()> {
            if let Ok(mut saved) = self.saved.lock() {
                saved.push((source_name.to_string(), descriptor.grid_index));
            }
            Ok(())
        }
    }

    struct FailingSink;

    impl PatchSink for FailingSink {
        fn save(&self, _: &str, _: &PatchDescriptor, _: &PatchPixels) -> PatchResult<()> {
            Err(PatchError::OutputWrite("read-only volume".to_string()))
        }
    }

    fn options(patch_edge: u32, magnification: f64) -> ExtractionOptions {
        ExtractionOptions::new(TargetSpec::new(patch_edge, magnification).unwrap())
    }

    /// 401x201 slide, left half tissue and right half background
    fn half_tissue_slide(name: &str) -> MemorySlide {
        let image = RgbaImage::from_fn(401, 201, |x, _| {
            if x < 200 { Rgba([150, 60, 120, 255]) } else { Rgba([245, 245, 245, 255]) }
        });
        MemorySlide::from_images(name, vec![DynamicImage::ImageRgba8(image)], Some(20.0)).unwrap()
    }

    #[test]
    fn background_patches_are_rejected() {
        let mut opts = options(100, 20.0);
        opts.filter = BackgroundFilter::new(30.0, 220);
        let orchestrator = ExtractionOrchestrator::new(opts, RecordingSink::default()).unwrap();

        let result = orchestrator.extract_image(&half_tissue_slide("half"), &mut StdRng::seed_from_u64(0));
        assert_eq!(result.status, ImageStatus::Completed);
        assert_eq!(result.total_candidate_patches, 8);
        assert_eq!(result.accepted_patches, 4);
        assert_eq!(result.rejected_patches, 4);
        assert_eq!(result.accepted_fraction, Some(0.5));

        let saved = orchestrator.sink().saved.lock().unwrap();
        assert!(saved.iter().all(|(_, (_, col))| *col < 2));
    }

    #[test]
    fn disabled_filter_accepts_everything() {
        let orchestrator = ExtractionOrchestrator::new(options(100, 20.0), DiscardSink).unwrap();
        let result = orchestrator.extract_image(&half_tissue_slide("half"), &mut StdRng::seed_from_u64(0));
        assert_eq!(result.accepted_patches, 8);
        assert_eq!(result.rejected_patches, 0);
    }

    #[test]
    fn unsatisfiable_magnification_fails_only_that_image() {
        let orchestrator = ExtractionOrchestrator::new(options(100, 40.0), DiscardSink).unwrap();
        let result = orchestrator.extract_image(&half_tissue_slide("low"), &mut StdRng::seed_from_u64(0));
        assert!(matches!(result.status, ImageStatus::Failed(_)));
        assert_eq!(result.level, None);
        assert_eq!(result.total_candidate_patches, 0);
        assert_eq!(result.accepted_fraction, None);
    }

    #[test]
    fn output_failure_aborts_the_image() {
        let orchestrator = ExtractionOrchestrator::new(options(100, 20.0), FailingSink).unwrap();
        let result = orchestrator.extract_image(&half_tissue_slide("ro"), &mut StdRng::seed_from_u64(0));
        assert!(matches!(result.status, ImageStatus::Failed(ref reason) if reason.contains("read-only")));
        assert_eq!(result.sampled_patches, 1);
        assert_eq!(result.accepted_patches, 0);
    }

    #[test]
    fn read_errors_are_counted_per_patch() {
        // One extra pixel keeps the border-corrected first row and column in bounds
        let slide = MemorySlide::uniform("flaky", &[(1001, 501, 1.0)], Rgba([30, 30, 30, 255]), Some(20.0))
            .with_failing_reads([(0, 0, 101), (0, 301, 0)]);
        let orchestrator = ExtractionOrchestrator::new(options(100, 20.0), DiscardSink).unwrap();

        let result = orchestrator.extract_image(&slide, &mut StdRng::seed_from_u64(0));
        assert_eq!(result.status, ImageStatus::Completed);
        assert_eq!(result.total_candidate_patches, 50);
        assert_eq!(result.read_errors, 2);
        assert_eq!(result.accepted_patches, 48);
    }

    #[test]
    fn worker_pool_matches_sequential_counts() {
        let slide = MemorySlide::uniform("big", &[(2000, 1200, 1.0), (1000, 600, 2.0)], Rgba([40, 40, 40, 255]), Some(40.0));

        let mut sequential = options(50, 20.0);
        sequential.sampling_rate = 0.4;
        let mut pooled = sequential.clone();
        pooled.workers = 4;

        let a = ExtractionOrchestrator::new(sequential, RecordingSink::default()).unwrap();
        let b = ExtractionOrchestrator::new(pooled, RecordingSink::default()).unwrap();
        let ra = a.extract_image(&slide, &mut StdRng::seed_from_u64(9));
        let rb = b.extract_image(&slide, &mut StdRng::seed_from_u64(9));

        assert_eq!(ra, rb);
        assert!(ra.sampled_patches < ra.total_candidate_patches);

        let cells = |sink: &RecordingSink| -> HashSet<(usize, usize)> {
            sink.saved.lock().unwrap().iter().map(|(_, cell)| *cell).collect()
        };
        assert_eq!(cells(a.sink()), cells(b.sink()));
    }

    #[test]
    fn batch_isolates_failures_and_keeps_order() {
        let inputs: Vec<PathBuf> = ["first", "missing", "third"].iter().map(PathBuf::from).collect();
        let mut opts = options(100, 20.0);
        opts.workers = 3;
        opts.parallel_images = true;
        opts.seed = Some(5);
        let orchestrator = ExtractionOrchestrator::new(opts, DiscardSink).unwrap();

        let batch = orchestrator.extract_batch(&inputs, |path: &Path| {
            let name = path.to_string_lossy().into_owned();
            if name == "missing" {
                return Err(PatchError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "no such slide")));
            }
            let slide = MemorySlide::uniform(&name, &[(1001, 501, 1.0)], Rgba([30, 30, 30, 255]), Some(20.0));
            Ok(if name == "third" { slide.with_failing_reads([(0, 0, 101), (0, 301, 0)]) } else { slide })
        });

        let names: Vec<&str> = batch.iter().map(|r| r.source_name.as_str()).collect();
        assert_eq!(names, vec!["first", "missing", "third"]);
        assert_eq!(batch.images[0].accepted_patches, 50);
        assert!(matches!(batch.images[1].status, ImageStatus::Failed(_)));
        assert_eq!(batch.images[2].total_candidate_patches, 50);
        assert!(batch.images[2].accepted_patches <= 48);
        assert_eq!(batch.completed_count(), 2);
    }

    #[test]
    fn out_of_range_options_are_rejected_before_any_image() {
        for rate in [f64::NAN, 0.0, -0.1, 1.01] {
            let mut opts = options(100, 20.0);
            opts.sampling_rate = rate;
            assert!(matches!(ExtractionOrchestrator::new(opts, DiscardSink), Err(PatchError::Configuration(_))),
                    "sampling rate {}", rate);
        }

        for threshold in [-5.0, 100.5, f64::NAN] {
            let mut opts = options(100, 20.0);
            opts.filter = BackgroundFilter::new(threshold, 220);
            assert!(matches!(ExtractionOrchestrator::new(opts, DiscardSink), Err(PatchError::Configuration(_))),
                    "white threshold {}", threshold);
        }
    }

    #[test]
    fn exactly_tiling_level_loses_two_border_cells() {
        let slide = MemorySlide::uniform("exact", &[(400, 200, 1.0)], Rgba([30, 30, 30, 255]), Some(20.0));
        let orchestrator = ExtractionOrchestrator::new(options(100, 20.0), RecordingSink::default()).unwrap();

        let result = orchestrator.extract_image(&slide, &mut StdRng::seed_from_u64(0));
        assert_eq!(result.status, ImageStatus::Completed);
        assert_eq!(result.total_candidate_patches, 8);
        assert_eq!(result.read_errors, 2);
        assert_eq!(result.accepted_patches, 6);

        let saved: HashSet<(usize, usize)> = orchestrator.sink().saved.lock().unwrap()
            .iter().map(|(_, cell)| *cell).collect();
        assert!(!saved.contains(&(0, 3)));
        assert!(!saved.contains(&(1, 0)));
    }
}
