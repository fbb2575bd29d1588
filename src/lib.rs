//! # loadsuite
//!
//! A configurable HTTP latency test suite.
//!
//! loadsuite issues repeated HTTP requests against an endpoint, either one at a time or in
//! concurrent batches, records the latency and status code of every request in a CSV file,
//! and appends a markdown section with percentile statistics, a distribution chart and
//! monitoring links to a shared report.
//!
//! ## Running a single configurable test
//!
//! A configurable test is described by a JSON file:
//!
//! ```json
//! {
//!     "MODE": "batch",
//!     "BATCH_SIZE": 10,
//!     "TOTAL_REQUESTS": 200,
//!     "SINGLE_REQUEST_DELAY": 1,
//!     "URL_TEMPLATE": "https://api.example.com/blocks/{bhash}",
//!     "USERNAME": "tester",
//!     "PASSWORD": "secret",
//!     "IDS": ["a1", "b2", "c3"]
//! }
//! ```
//!
//! The single placeholder in `URL_TEMPLATE` is replaced with identifiers taken round-robin
//! from `IDS`, or from the `PPID` column of the spreadsheet named by `ID_EXCEL_PATH`.
//!
//! ```bash
//! $ loadsuite --report-folder report/manual --config test_script/configs/delete_blocks.json
//! ```
//!
//! This writes `report/manual/delete_blocks.csv`, renders `report/manual/delete_blocks.svg`
//! and appends a section to `report/manual/report.md`.
//!
//! ## Running the suite
//!
//! ```bash
//! $ loadsuite --suite "nightly run" --configs-dir test_script/configs
//! ```
//!
//! The suite creates `report/nightly_run_<timestamp>/`, writes the report header, runs the
//! built-in test and then every `*.json` test configuration it finds, waiting between tests
//! (one minute by default, see `--test-delay`).
//!
//! ## Library use
//!
//! The same building blocks are available programmatically:
//!
//! ```rust,no_run
//! use loadsuite::report::MonitoringLinks;
//! use loadsuite::runner::TestRunner;
//! use loadsuite::test_config::TestConfiguration;
//!
//! # async fn run() -> Result<(), loadsuite::LoadSuiteError> {
//! let config = TestConfiguration::from_file("test_script/configs/delete_blocks.json")?;
//! let runner = TestRunner::new(
//!     loadsuite::build_client(false)?,
//!     "report/manual",
//!     MonitoringLinks::default(),
//! );
//! let outcome = runner.run_configurable_test("delete_blocks", &config).await?;
//! println!("{} requests written to {}", outcome.requests, outcome.records_file.display());
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod config;
pub mod executor;
pub mod graph;
pub mod identifiers;
pub mod logger;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod stats;
pub mod suite;
pub mod test_config;
pub mod util;

use std::{fmt, io};

pub use crate::config::SuiteConfiguration;

/// User agent sent with every request.
static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An enumeration of all errors loadsuite can return.
#[derive(Debug)]
pub enum LoadSuiteError {
    /// Wraps a [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    Io(io::Error),
    /// Wraps a [`reqwest::Error`](https://docs.rs/reqwest/*/reqwest/struct.Error.html).
    Reqwest(reqwest::Error),
    /// Wraps a [`serde_json::Error`](https://docs.rs/serde_json/*/serde_json/struct.Error.html).
    Json(serde_json::Error),
    /// Wraps a [`calamine::Error`](https://docs.rs/calamine/*/calamine/enum.Error.html).
    Spreadsheet(calamine::Error),
    /// Wraps a ['tokio::task::JoinError'](https://docs.rs/tokio/*/tokio/task/struct.JoinError.html).
    TokioJoin(tokio::task::JoinError),
    /// Invalid option or value specified, may only be invalid in context.
    InvalidOption {
        /// The invalid option that caused this error, may be only invalid in context.
        option: String,
        /// The invalid value that caused this error, may be only invalid in context.
        value: String,
        /// An optional explanation of the error.
        detail: String,
    },
    /// The identifier pool resolved to no identifiers, so no request can be built.
    NoIdentifiers {
        /// An optional explanation of the error.
        detail: String,
    },
    /// A persisted record file could not be interpreted.
    MalformedRecords {
        /// The record file that failed to parse.
        path: String,
        /// An optional explanation of the error.
        detail: String,
    },
}

/// Implement a helper to provide a text description of all possible types of errors.
impl LoadSuiteError {
    fn describe(&self) -> &str {
        match *self {
            LoadSuiteError::Io(_) => "io::Error",
            LoadSuiteError::Reqwest(_) => "reqwest::Error",
            LoadSuiteError::Json(_) => "serde_json::Error",
            LoadSuiteError::Spreadsheet(_) => "calamine::Error",
            LoadSuiteError::TokioJoin(_) => "tokio::task::JoinError",
            LoadSuiteError::InvalidOption { .. } => "invalid option or value specified",
            LoadSuiteError::NoIdentifiers { .. } => "no identifiers available",
            LoadSuiteError::MalformedRecords { .. } => "malformed record file",
        }
    }
}

/// Implement format trait to allow displaying errors.
impl fmt::Display for LoadSuiteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LoadSuiteError::Io(ref source) => {
                write!(f, "LoadSuiteError: {} ({})", self.describe(), source)
            }
            LoadSuiteError::Reqwest(ref source) => {
                write!(f, "LoadSuiteError: {} ({})", self.describe(), source)
            }
            LoadSuiteError::Json(ref source) => {
                write!(f, "LoadSuiteError: {} ({})", self.describe(), source)
            }
            LoadSuiteError::Spreadsheet(ref source) => {
                write!(f, "LoadSuiteError: {} ({})", self.describe(), source)
            }
            LoadSuiteError::TokioJoin(ref source) => {
                write!(f, "LoadSuiteError: {} ({})", self.describe(), source)
            }
            LoadSuiteError::InvalidOption {
                ref option,
                ref value,
                ref detail,
            } => write!(
                f,
                "LoadSuiteError: {} ({} = {:?}: {})",
                self.describe(),
                option,
                value,
                detail
            ),
            LoadSuiteError::NoIdentifiers { ref detail } => {
                write!(f, "LoadSuiteError: {} ({})", self.describe(), detail)
            }
            LoadSuiteError::MalformedRecords {
                ref path,
                ref detail,
            } => write!(f, "LoadSuiteError: {} ({}: {})", self.describe(), path, detail),
        }
    }
}

// Define the lower level source of this error, if any.
impl std::error::Error for LoadSuiteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            LoadSuiteError::Io(ref source) => Some(source),
            LoadSuiteError::Reqwest(ref source) => Some(source),
            LoadSuiteError::Json(ref source) => Some(source),
            LoadSuiteError::Spreadsheet(ref source) => Some(source),
            LoadSuiteError::TokioJoin(ref source) => Some(source),
            _ => None,
        }
    }
}

/// Auto-convert Reqwest errors.
impl From<reqwest::Error> for LoadSuiteError {
    fn from(err: reqwest::Error) -> LoadSuiteError {
        LoadSuiteError::Reqwest(err)
    }
}

/// Auto-convert IO errors.
impl From<io::Error> for LoadSuiteError {
    fn from(err: io::Error) -> LoadSuiteError {
        LoadSuiteError::Io(err)
    }
}

/// Auto-convert serde_json errors.
impl From<serde_json::Error> for LoadSuiteError {
    fn from(err: serde_json::Error) -> LoadSuiteError {
        LoadSuiteError::Json(err)
    }
}

/// Auto-convert TokioJoin errors.
impl From<tokio::task::JoinError> for LoadSuiteError {
    fn from(err: tokio::task::JoinError) -> LoadSuiteError {
        LoadSuiteError::TokioJoin(err)
    }
}

/// Auto-convert calamine errors.
impl From<calamine::Error> for LoadSuiteError {
    fn from(err: calamine::Error) -> LoadSuiteError {
        LoadSuiteError::Spreadsheet(err)
    }
}

/// Build the HTTP client shared by every request of a run.
///
/// Timeouts are applied per request by the [`executor`](./executor/index.html), so the
/// client itself carries none.
pub fn build_client(accept_invalid_certs: bool) -> Result<reqwest::Client, LoadSuiteError> {
    let client = reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?;
    Ok(client)
}
