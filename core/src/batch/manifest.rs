use crate::api::ClassificationRecord;
use crate::error::{FovcatError, Result};
use crate::types::IM_PATH_COLUMN;
use csv::{Reader, ReaderBuilder, Writer, WriterBuilder};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Suffix inserted before the extension of the input manifest
pub const PROCESSED_SUFFIX: &str = "_fov_phase_processed";

/// One row of the input manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// 0-based row position in the input manifest
    pub index: usize,

    /// Image path
    pub im_path: String,
}

fn open_reader(path: &Path) -> Result<Reader<File>> {
    Ok(ReaderBuilder::new().flexible(true).from_path(path)?)
}

fn column_position(reader: &mut Reader<File>, column: &str) -> Result<usize> {
    reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| FovcatError::MissingColumn(column.to_string()))
}

/// Reads the `im_path` column of an input manifest, in row order
///
/// # Errors
///
/// Returns [`FovcatError::MissingColumn`] if the manifest has no `im_path`
/// column, or an I/O / CSV error if it cannot be read.
pub fn read_input_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let mut reader = open_reader(path)?;
    let column = column_position(&mut reader, IM_PATH_COLUMN)?;

    let mut entries = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let im_path = row.get(column).unwrap_or_default().to_string();
        entries.push(ManifestEntry { index, im_path });
    }
    Ok(entries)
}

/// Returns the output manifest path for an input manifest
///
/// `scans.csv` becomes `scans_fov_phase_processed.csv`; an input without an
/// extension gets `.csv`.
pub fn processed_manifest_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    input.with_file_name(format!("{}{}.{}", stem, PROCESSED_SUFFIX, extension))
}

/// Output manifest left by a previous run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingOutput {
    /// Header of the existing file
    pub columns: Vec<String>,

    /// Image paths already written
    pub processed: HashSet<String>,
}

impl ExistingOutput {
    /// Loads an existing output manifest
    ///
    /// Returns `None` when the file does not exist or is empty, in which
    /// case the run starts fresh.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() || std::fs::metadata(path)?.len() == 0 {
            return Ok(None);
        }

        let mut reader = open_reader(path)?;
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut processed = HashSet::new();
        if let Some(column) = columns.iter().position(|c| c == IM_PATH_COLUMN) {
            for row in reader.records() {
                if let Some(im_path) = row?.get(column) {
                    processed.insert(im_path.to_string());
                }
            }
        }

        Ok(Some(Self { columns, processed }))
    }

    /// Checks that the existing columns are exactly the expected ones
    ///
    /// # Errors
    ///
    /// Returns [`FovcatError::ManifestMismatch`] on any difference.
    pub fn check_columns(&self, expected: &[&str]) -> Result<()> {
        if self.columns.iter().map(String::as_str).eq(expected.iter().copied()) {
            Ok(())
        } else {
            Err(FovcatError::ManifestMismatch {
                expected: expected.iter().map(|c| c.to_string()).collect(),
                found: self.columns.clone(),
            })
        }
    }
}

/// Append-only writer of the output manifest
///
/// Every record is flushed as soon as it is written.
pub struct OutputWriter {
    writer: Writer<File>,
}

impl OutputWriter {
    /// Opens the output manifest for appending
    ///
    /// The header is written when `fresh` is set; the file is truncated in
    /// that case.
    pub fn open(path: &Path, columns: &[&str], fresh: bool) -> Result<Self> {
        let file = if fresh {
            File::create(path)?
        } else {
            OpenOptions::new().append(true).open(path)?
        };

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if fresh {
            writer.write_record(columns)?;
            writer.flush()?;
        }
        Ok(Self { writer })
    }

    /// Writes one record and flushes it
    pub fn write(&mut self, record: &ClassificationRecord) -> Result<()> {
        self.writer.write_record(record.cells())?;
        self.writer.flush()?;
        Ok(())
    }
}
