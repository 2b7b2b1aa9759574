use super::manifest::{
    processed_manifest_path, read_input_manifest, ExistingOutput, ManifestEntry, OutputWriter,
};
use crate::api::{ClassificationRecord, ImageRecognizer};
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Receives progress updates from a batch run
pub trait ProgressSink {
    /// Called once with the number of images about to be processed
    fn start(&mut self, total: usize);

    /// Called after each image
    fn advance(&mut self, im_path: &str);

    /// Called once after the last image
    fn finish(&mut self);
}

/// Terminal progress bar
pub struct ProgressBarSink {
    bar: Option<ProgressBar>,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        Self { bar: None }
    }
}

impl Default for ProgressBarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ProgressBarSink {
    fn start(&mut self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} (eta {eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        self.bar = Some(bar);
    }

    fn advance(&mut self, im_path: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(im_path.to_string());
            bar.inc(1);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Progress sink that reports nothing
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&mut self, _total: usize) {}
    fn advance(&mut self, _im_path: &str) {}
    fn finish(&mut self) {}
}

/// Counters of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Output manifest path
    pub output_path: PathBuf,

    /// Whether an existing output manifest was resumed
    pub resumed: bool,

    /// Input rows skipped because a previous run already wrote them
    pub already_processed: usize,

    /// Rows processed in this run
    pub processed: usize,

    /// Input rows skipped because their path appeared earlier in the manifest
    pub duplicates_skipped: usize,

    /// FOV cells written in this run, by label (`error` included)
    pub fov_counts: BTreeMap<String, usize>,

    /// Phase cells written in this run, by label (`error` included)
    pub phase_counts: BTreeMap<String, usize>,

    /// Rows with at least one failed classifier
    pub rows_with_errors: usize,
}

impl BatchSummary {
    fn record(&mut self, record: &ClassificationRecord) {
        self.processed += 1;
        if let Some(fov) = &record.fov {
            *self.fov_counts.entry(fov.to_string()).or_default() += 1;
        }
        if let Some(phase) = &record.phase {
            *self.phase_counts.entry(phase.to_string()).or_default() += 1;
        }
        if record.has_errors() {
            self.rows_with_errors += 1;
        }
    }
}

/// Drives the per-image pipeline over a manifest, resuming previous runs
///
/// Rows are processed in manifest order. Each record is appended to the output
/// manifest and flushed before the next image is loaded.
pub struct BatchRunner {
    recognizer: ImageRecognizer,
}

impl BatchRunner {
    pub fn new(recognizer: ImageRecognizer) -> Self {
        Self { recognizer }
    }

    /// Runs the batch over `input`
    ///
    /// # Errors
    ///
    /// Fails before processing any row if the manifest cannot be read, lacks
    /// an `im_path` column, or an existing output manifest has different
    /// columns. Afterwards only output write failures abort the run; image
    /// failures are recorded as `error` cells.
    pub fn run(&self, input: &Path, progress: &mut dyn ProgressSink) -> Result<BatchSummary> {
        let entries = read_input_manifest(input)?;
        let output_path = processed_manifest_path(input);
        let columns = self.recognizer.columns();

        let existing = ExistingOutput::load(&output_path)?;
        if let Some(existing) = &existing {
            existing.check_columns(&columns)?;
            info!(
                "Resuming {}: {} images already processed",
                output_path.display(),
                existing.processed.len()
            );
        } else {
            info!("Writing results to {}", output_path.display());
        }

        let mut summary = BatchSummary {
            output_path: output_path.clone(),
            resumed: existing.is_some(),
            ..BatchSummary::default()
        };
        let done = existing.map(|e| e.processed).unwrap_or_default();
        let pending = self.pending(entries, &done, &mut summary);
        info!(
            "{} images to process ({} already processed, {} duplicates)",
            pending.len(),
            summary.already_processed,
            summary.duplicates_skipped
        );

        let mut writer = OutputWriter::open(&output_path, &columns, !summary.resumed)?;
        progress.start(pending.len());
        for entry in &pending {
            let record = self.recognizer.process(entry.index, &entry.im_path);
            writer.write(&record)?;
            summary.record(&record);
            progress.advance(&entry.im_path);
        }
        progress.finish();

        Ok(summary)
    }

    /// Drops rows already written by a previous run and repeated paths
    fn pending(
        &self,
        entries: Vec<ManifestEntry>,
        done: &HashSet<String>,
        summary: &mut BatchSummary,
    ) -> Vec<ManifestEntry> {
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|entry| {
                if done.contains(&entry.im_path) {
                    summary.already_processed += 1;
                    false
                } else if !seen.insert(entry.im_path.clone()) {
                    warn!(
                        "Skipping duplicate row {} for {}",
                        entry.index, entry.im_path
                    );
                    summary.duplicates_skipped += 1;
                    false
                } else {
                    true
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FovcatError;
    use crate::test_utils::{textured_volume, FakePhase, FakeSegmenter, LabelPainter};
    use crate::types::Modality;
    use tempfile::TempDir;

    /// Progress sink recording every call
    #[derive(Default)]
    struct RecordingProgress {
        total: Option<usize>,
        advanced: Vec<String>,
        finished: bool,
    }

    impl ProgressSink for RecordingProgress {
        fn start(&mut self, total: usize) {
            self.total = Some(total);
        }
        fn advance(&mut self, im_path: &str) {
            self.advanced.push(im_path.to_string());
        }
        fn finish(&mut self) {
            self.finished = true;
        }
    }

    struct Fixture {
        dir: TempDir,
        images: Vec<String>,
    }

    impl Fixture {
        /// Writes `count` 12-slice volumes
        fn new(count: usize) -> Self {
            let dir = TempDir::new().unwrap();
            let images = (0..count)
                .map(|i| {
                    let path = dir.path().join(format!("scan{}.nii.gz", i));
                    textured_volume(12).save(&path).unwrap();
                    path.display().to_string()
                })
                .collect();
            Self { dir, images }
        }

        fn manifest(&self, paths: &[&str]) -> PathBuf {
            let path = self.dir.path().join("scans.csv");
            let mut content = String::from("im_path\n");
            for p in paths {
                content.push_str(p);
                content.push('\n');
            }
            std::fs::write(&path, content).unwrap();
            path
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("scans_fov_phase_processed.csv")
        }

        fn output_rows(&self) -> Vec<Vec<String>> {
            let mut reader = csv::Reader::from_path(self.output()).unwrap();
            reader
                .records()
                .map(|r| r.unwrap().iter().map(String::from).collect())
                .collect()
        }
    }

    fn fov_recognizer() -> ImageRecognizer {
        let labels = LabelPainter::new(Modality::Ct, 12)
            .paint("liver", 2..8)
            .paint("kidney_left", 3..6)
            .build();
        ImageRecognizer::new(Modality::Ct).with_fov(Box::new(FakeSegmenter::new(labels)))
    }

    #[test]
    fn test_fresh_run_writes_every_row() {
        let fixture = Fixture::new(3);
        let paths: Vec<&str> = fixture.images.iter().map(String::as_str).collect();
        let manifest = fixture.manifest(&paths);
        let mut progress = RecordingProgress::default();

        let summary = BatchRunner::new(fov_recognizer())
            .run(&manifest, &mut progress)
            .unwrap();

        assert!(!summary.resumed);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.fov_counts.get("abdomen"), Some(&3));
        assert_eq!(summary.output_path, fixture.output());
        assert_eq!(progress.total, Some(3));
        assert_eq!(progress.advanced, fixture.images);
        assert!(progress.finished);

        let rows = fixture.output_rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r[1] == "abdomen"));
    }

    #[test]
    fn test_resume_processes_only_missing_rows() {
        let fixture = Fixture::new(4);
        let paths: Vec<&str> = fixture.images.iter().map(String::as_str).collect();
        let manifest = fixture.manifest(&paths);
        std::fs::write(
            fixture.output(),
            format!("im_path,fov\n{},thorax\n{},error\n", paths[1], paths[3]),
        )
        .unwrap();
        let mut progress = RecordingProgress::default();

        let summary = BatchRunner::new(fov_recognizer())
            .run(&manifest, &mut progress)
            .unwrap();

        assert!(summary.resumed);
        assert_eq!(summary.already_processed, 2);
        assert_eq!(summary.processed, 2);
        assert_eq!(progress.advanced, vec![paths[0].to_string(), paths[2].to_string()]);

        let rows = fixture.output_rows();
        let unique: HashSet<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(unique.len(), 4);
        // Previous error cells are kept, not retried
        assert!(rows.contains(&vec![paths[3].to_string(), "error".to_string()]));
    }

    #[test]
    fn test_column_mismatch_fails_before_processing() {
        let fixture = Fixture::new(2);
        let paths: Vec<&str> = fixture.images.iter().map(String::as_str).collect();
        let manifest = fixture.manifest(&paths);
        let previous = format!("im_path,fov\n{},thorax\n", paths[0]);
        std::fs::write(fixture.output(), &previous).unwrap();

        // Phase-only run against a FOV output
        let recognizer =
            ImageRecognizer::new(Modality::Ct).with_phase(Box::new(FakePhase::new("native")));
        let mut progress = RecordingProgress::default();
        let err = BatchRunner::new(recognizer)
            .run(&manifest, &mut progress)
            .unwrap_err();

        assert!(matches!(err, FovcatError::ManifestMismatch { .. }));
        assert!(progress.total.is_none());
        assert_eq!(std::fs::read_to_string(fixture.output()).unwrap(), previous);
    }

    #[test]
    fn test_bad_images_are_isolated() {
        let fixture = Fixture::new(2);
        let manifest = fixture.manifest(&[
            fixture.images[0].as_str(),
            "/nonexistent/broken.nii.gz",
            fixture.images[1].as_str(),
        ]);

        let summary = BatchRunner::new(fov_recognizer())
            .run(&manifest, &mut NoProgress)
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.rows_with_errors, 1);
        assert_eq!(summary.fov_counts.get("error"), Some(&1));
        let rows = fixture.output_rows();
        assert_eq!(rows[1], vec!["/nonexistent/broken.nii.gz", "error"]);
        assert_eq!(rows[2][1], "abdomen");
    }

    #[test]
    fn test_duplicate_paths_are_processed_once() {
        let fixture = Fixture::new(2);
        let a = fixture.images[0].as_str();
        let b = fixture.images[1].as_str();
        let manifest = fixture.manifest(&[a, b, a]);

        let summary = BatchRunner::new(fov_recognizer())
            .run(&manifest, &mut NoProgress)
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(fixture.output_rows().len(), 2);
    }

    #[test]
    fn test_completed_run_is_a_no_op() {
        let fixture = Fixture::new(2);
        let paths: Vec<&str> = fixture.images.iter().map(String::as_str).collect();
        let manifest = fixture.manifest(&paths);
        let runner = BatchRunner::new(fov_recognizer());

        runner.run(&manifest, &mut NoProgress).unwrap();
        let before = std::fs::read_to_string(fixture.output()).unwrap();
        let summary = runner.run(&manifest, &mut NoProgress).unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.already_processed, 2);
        assert_eq!(std::fs::read_to_string(fixture.output()).unwrap(), before);
    }

    #[test]
    fn test_row_index_names_artifacts() {
        let fixture = Fixture::new(2);
        let out = TempDir::new().unwrap();
        let manifest = fixture.manifest(&[fixture.images[0].as_str(), fixture.images[1].as_str()]);
        std::fs::write(
            fixture.output(),
            format!("im_path,fov\n{},thorax\n", fixture.images[0]),
        )
        .unwrap();

        let labels = LabelPainter::new(Modality::Ct, 12).paint("liver", 2..8).build();
        let recognizer = ImageRecognizer::new(Modality::Ct)
            .with_fov(Box::new(FakeSegmenter::new(labels)))
            .with_output_dir(out.path());
        BatchRunner::new(recognizer)
            .run(&manifest, &mut NoProgress)
            .unwrap();

        // Row 1 of the manifest, even though it is the first one processed
        assert!(out.path().join("1.nii.gz").exists());
        assert!(!out.path().join("0.nii.gz").exists());
    }
}
