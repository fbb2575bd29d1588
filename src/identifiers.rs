//! The identifier pool substituted into a test's URL template.
//!
//! Identifiers come either inline from the test configuration (`IDS`) or from the `PPID`
//! column of a spreadsheet (`ID_EXCEL_PATH`). They are consumed round-robin: request `i`
//! always uses identifier `i % len`, regardless of how requests are grouped into rounds.

use calamine::{open_workbook_auto, Reader};
use std::path::{Path, PathBuf};

use crate::LoadSuiteError;

/// Spreadsheet column holding identifiers.
pub const SPREADSHEET_COLUMN: &str = "PPID";

/// Where a test's identifiers come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentifierSource {
    /// Identifiers listed in the test configuration.
    Inline(Vec<String>),
    /// Identifiers read from the `PPID` column of the first sheet of a spreadsheet.
    Spreadsheet(PathBuf),
    /// The test configuration names no identifiers.
    Missing,
}

/// A non-empty, ordered sequence of identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifierPool {
    identifiers: Vec<String>,
}

impl IdentifierPool {
    /// Build a pool, refusing an empty set of identifiers.
    pub fn new(identifiers: Vec<String>) -> Result<IdentifierPool, LoadSuiteError> {
        if identifiers.is_empty() {
            return Err(LoadSuiteError::NoIdentifiers {
                detail: "the identifier pool is empty".to_string(),
            });
        }
        Ok(IdentifierPool { identifiers })
    }

    /// Resolve an [`IdentifierSource`] into a pool.
    ///
    /// Spreadsheets are read on tokio's blocking thread pool.
    pub async fn load(source: &IdentifierSource) -> Result<IdentifierPool, LoadSuiteError> {
        match source {
            IdentifierSource::Inline(identifiers) => {
                info!("loaded {} ids from the test configuration", identifiers.len());
                IdentifierPool::new(identifiers.clone())
            }
            IdentifierSource::Spreadsheet(path) => {
                let spreadsheet = path.clone();
                let identifiers = tokio::task::spawn_blocking(move || {
                    read_spreadsheet_column(&spreadsheet, SPREADSHEET_COLUMN)
                })
                .await??;
                info!("loaded {} ids from {}", identifiers.len(), path.display());
                IdentifierPool::new(identifiers)
            }
            IdentifierSource::Missing => Err(LoadSuiteError::NoIdentifiers {
                detail: "neither IDS nor ID_EXCEL_PATH is configured".to_string(),
            }),
        }
    }

    /// The identifier used by the given (zero-based) request number.
    pub fn get(&self, request_number: usize) -> &str {
        &self.identifiers[request_number % self.identifiers.len()]
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Always false, a pool can't be built without identifiers.
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Read every non-empty cell below the header `column` of a spreadsheet's first sheet.
pub fn read_spreadsheet_column(path: &Path, column: &str) -> Result<Vec<String>, LoadSuiteError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => {
            return Err(LoadSuiteError::InvalidOption {
                option: "ID_EXCEL_PATH".to_string(),
                value: path.display().to_string(),
                detail: "the spreadsheet contains no sheets".to_string(),
            })
        }
    };

    let mut rows = range.rows();
    let index = rows
        .next()
        .and_then(|header| {
            header
                .iter()
                .position(|cell| cell.to_string().trim() == column)
        })
        .ok_or_else(|| LoadSuiteError::InvalidOption {
            option: "ID_EXCEL_PATH".to_string(),
            value: path.display().to_string(),
            detail: format!("the first sheet has no {} column", column),
        })?;

    let identifiers = rows
        .filter_map(|row| row.get(index))
        .map(|cell| cell.to_string().trim().to_string())
        .filter(|identifier| !identifier.is_empty())
        .collect();

    Ok(identifiers)
}
