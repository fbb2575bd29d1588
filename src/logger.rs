//! Request log: the CSV file every [`ResultRecord`] is persisted to.
//!
//! The file is created, together with any missing parent directory, when the log is opened,
//! and the header row is written immediately. Each record is flushed to disk as soon as it
//! is written, so an interrupted run still leaves a consistent file behind.
//!
//! Two layouts are supported:
//!  - `timestamp,duration_ms,status_code`: used by configurable tests
//!  - `request_num,duration_ms,status_code`: used by simple sequential tests
//!
//! Rows are built by hand: every field is a number, a timestamp or the `ERROR` label, none
//! of which require quoting.

use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::metrics::ResultRecord;
use crate::LoadSuiteError;

/// Name of the column holding request durations.
pub const DURATION_COLUMN: &str = "duration_ms";

/// Column layout of a request log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordLayout {
    /// `timestamp,duration_ms,status_code`
    Timestamped,
    /// `request_num,duration_ms,status_code`, numbered from 1.
    Numbered,
}

impl RecordLayout {
    pub fn header(&self) -> &'static str {
        match self {
            RecordLayout::Timestamped => "timestamp,duration_ms,status_code",
            RecordLayout::Numbered => "request_num,duration_ms,status_code",
        }
    }

    /// Format one record as a CSV row, without the trailing line feed.
    pub fn format_row(&self, request_number: usize, record: &ResultRecord) -> String {
        match self {
            RecordLayout::Timestamped => format!(
                "{},{},{}",
                record.formatted_timestamp(),
                record.duration_ms,
                record.status
            ),
            RecordLayout::Numbered => format!(
                "{},{},{}",
                request_number, record.duration_ms, record.status
            ),
        }
    }
}

/// Exclusive writer for one test's record file.
#[derive(Debug)]
pub struct RequestLog {
    path: PathBuf,
    layout: RecordLayout,
    file: BufWriter<File>,
    rows: usize,
}

impl RequestLog {
    /// Create (or truncate) the record file and write its header.
    pub async fn create(path: &Path, layout: RecordLayout) -> Result<RequestLog, LoadSuiteError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = File::create(path).await?;
        info!("writing records to {}", path.display());

        let mut request_log = RequestLog {
            path: path.to_path_buf(),
            layout,
            file: BufWriter::new(file),
            rows: 0,
        };
        request_log.write_line(layout.header()).await?;

        Ok(request_log)
    }

    /// Append one record and flush it to disk.
    pub async fn write_record(&mut self, record: &ResultRecord) -> Result<(), LoadSuiteError> {
        self.rows += 1;
        let row = self.layout.format_row(self.rows, record);
        self.write_line(&row).await
    }

    async fn write_line(&mut self, line: &str) -> Result<(), LoadSuiteError> {
        self.file.write_all(format!("{}\n", line).as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }

    /// Number of data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read the `duration_ms` column back from a record file of either layout.
pub async fn read_durations(path: &Path) -> Result<Vec<f64>, LoadSuiteError> {
    let contents = fs::read_to_string(path).await?;
    parse_durations(&contents).map_err(|detail| LoadSuiteError::MalformedRecords {
        path: path.display().to_string(),
        detail,
    })
}

fn parse_durations(contents: &str) -> Result<Vec<f64>, String> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());

    let header = match lines.next() {
        Some(header) => header,
        None => return Err("missing header row".to_string()),
    };
    let column = match header
        .split(',')
        .position(|name| name.trim() == DURATION_COLUMN)
    {
        Some(column) => column,
        None => return Err(format!("no {} column in header: {}", DURATION_COLUMN, header)),
    };

    let mut durations = Vec::new();
    for (index, line) in lines.enumerate() {
        let field = match line.split(',').nth(column) {
            Some(field) => field.trim(),
            None => return Err(format!("row {} has no {} field", index + 1, DURATION_COLUMN)),
        };
        match field.parse::<f64>() {
            Ok(duration) if duration.is_finite() => durations.push(duration),
            _ => {
                return Err(format!(
                    "row {} has an invalid duration: {:?}",
                    index + 1,
                    field
                ))
            }
        }
    }

    Ok(durations)
}
