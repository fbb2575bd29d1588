//! Run-time options of the `loadsuite` command.
//!
//! Options are derived with [`gumdrop`](https://docs.rs/gumdrop/). String options are empty
//! when not set on the command line; the accessor methods apply the defaults.

use gumdrop::Options;
use simplelog::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::report::{MonitoringLinks, DEFAULT_DASHBOARD_URL, DEFAULT_TRACE_URL};
use crate::util;
use crate::LoadSuiteError;

/// Default folder holding the `*.json` test configurations of a suite.
pub const DEFAULT_CONFIGS_DIR: &str = "test_script/configs";
/// Default parent folder of the per-run report folders created by a suite.
pub const DEFAULT_REPORTS_DIR: &str = "report";
/// Default pause between two tests of a suite.
pub const DEFAULT_TEST_DELAY: &str = "60";
/// Default target of the built-in test.
pub const DEFAULT_BUILTIN_URL: &str = "https://www.google.de";
/// Name of the report template looked up next to the configs folder.
pub const DEFAULT_TEMPLATE_NAME: &str = "default.md";

/// Runtime options available when launching loadsuite.
///
/// Either run a whole suite with `--suite NAME`, or a single test into an existing report
/// folder with `--report-folder DIR` (the built-in test) or `--report-folder DIR --config
/// FILE` (one configurable test).
#[derive(Options, Debug, Clone, Default)]
#[options(
    help = r#"loadsuite issues repeated HTTP requests against an endpoint and reports on their latency.

The following runtime options are available:"#
)]
pub struct SuiteConfiguration {
    /// Displays this help
    #[options(short = "h")]
    pub help: bool,
    /// Prints version information
    #[options(short = "V", help = "Prints version information\n")]
    pub version: bool,

    /// Writes a single test into this report folder
    #[options(short = "r", meta = "DIR")]
    pub report_folder: String,
    /// Runs the configurable test described by this file
    #[options(short = "c", meta = "FILE")]
    pub config: String,
    /// Runs every test as a suite with this name
    #[options(short = "s", meta = "NAME")]
    pub suite: String,
    /// Sets the folder of test configurations (default: test_script/configs)
    #[options(no_short, meta = "DIR")]
    pub configs_dir: String,
    /// Sets the parent folder of suite reports (default: report)
    #[options(no_short, meta = "DIR")]
    pub reports_dir: String,
    /// Sets the report template (default: default.md in the parent of --configs-dir, so test_script/default.md)
    #[options(no_short, meta = "FILE")]
    pub report_template: String,
    /// Pauses between suite tests (30s, 2m, etc, default: 60)
    #[options(short = "t", meta = "TIME")]
    pub test_delay: String,
    /// Sets the target of the built-in test (default: https://www.google.de)
    #[options(no_short, meta = "URL")]
    pub builtin_url: String,
    /// Sets the dashboard linked from the report
    #[options(no_short, meta = "URL")]
    pub dashboard_url: String,
    /// Sets the trace explorer linked from the report
    #[options(no_short, meta = "URL")]
    pub trace_url: String,
    /// Disables validation of https certificates
    #[options(no_short, help = "Disables validation of https certificates\n")]
    pub accept_invalid_certs: bool,

    /// Enables the log file and sets its name
    #[options(short = "G", meta = "NAME")]
    pub log_file: String,
    /// Increases log file level (-g, -gg, etc)
    #[options(short = "g", count)]
    pub log_level: u8,
    /// Decreases verbosity (-q, -qq, etc)
    #[options(short = "q", count)]
    pub quiet: u8,
    /// Increases verbosity (-v, -vv, etc)
    #[options(short = "v", count)]
    pub verbose: u8,
}

/// What a validated configuration asks to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// The built-in test followed by every test configuration.
    Suite { name: String },
    /// One configurable test, appended to the report in `report_folder`.
    Configurable {
        report_folder: PathBuf,
        config: PathBuf,
    },
    /// The built-in test only, appended to the report in `report_folder`.
    Builtin { report_folder: PathBuf },
}

/// Return `value` trimmed, or `default` if nothing was set.
fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

impl SuiteConfiguration {
    pub fn configs_dir(&self) -> PathBuf {
        PathBuf::from(or_default(&self.configs_dir, DEFAULT_CONFIGS_DIR))
    }

    pub fn reports_dir(&self) -> PathBuf {
        PathBuf::from(or_default(&self.reports_dir, DEFAULT_REPORTS_DIR))
    }

    /// The report template, by default `default.md` in the parent of the configs folder.
    pub fn report_template(&self) -> PathBuf {
        if !self.report_template.trim().is_empty() {
            return PathBuf::from(self.report_template.trim());
        }
        let configs_dir = self.configs_dir();
        configs_dir
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(DEFAULT_TEMPLATE_NAME)
    }

    pub fn builtin_url(&self) -> String {
        or_default(&self.builtin_url, DEFAULT_BUILTIN_URL)
    }

    pub fn test_delay(&self) -> Result<Duration, LoadSuiteError> {
        let value = or_default(&self.test_delay, DEFAULT_TEST_DELAY);
        match util::parse_timespan(&value) {
            Some(seconds) => Ok(Duration::from_secs(seconds as u64)),
            None => Err(LoadSuiteError::InvalidOption {
                option: "--test-delay".to_string(),
                value,
                detail: "expected a time span such as 60, 30s or 1m30s".to_string(),
            }),
        }
    }

    pub fn monitoring_links(&self) -> Result<MonitoringLinks, LoadSuiteError> {
        MonitoringLinks::new(
            &or_default(&self.dashboard_url, DEFAULT_DASHBOARD_URL),
            &or_default(&self.trace_url, DEFAULT_TRACE_URL),
        )
    }

    /// Check the options are consistent and work out what to run.
    pub fn validate(&self) -> Result<RunMode, LoadSuiteError> {
        let suite = self.suite.trim();
        let report_folder = self.report_folder.trim();
        let config = self.config.trim();

        // Surface malformed values before anything runs.
        self.test_delay()?;
        self.monitoring_links()?;

        if !suite.is_empty() {
            if !report_folder.is_empty() || !config.is_empty() {
                return Err(LoadSuiteError::InvalidOption {
                    option: "--suite".to_string(),
                    value: suite.to_string(),
                    detail: "--suite can not be combined with --report-folder or --config"
                        .to_string(),
                });
            }
            return Ok(RunMode::Suite {
                name: suite.to_string(),
            });
        }

        if report_folder.is_empty() {
            let (option, value) = if config.is_empty() {
                ("--report-folder", "")
            } else {
                ("--config", config)
            };
            return Err(LoadSuiteError::InvalidOption {
                option: option.to_string(),
                value: value.to_string(),
                detail: "either --suite or --report-folder must be set".to_string(),
            });
        }

        if config.is_empty() {
            Ok(RunMode::Builtin {
                report_folder: PathBuf::from(report_folder),
            })
        } else {
            Ok(RunMode::Configurable {
                report_folder: PathBuf::from(report_folder),
                config: PathBuf::from(config),
            })
        }
    }

    /// Initialize the stdout logger and, if `--log-file` is set, the file logger.
    pub fn initialize_logger(&self) {
        // Configure stdout level.
        let debug_level = match self.verbose {
            0 => match self.quiet {
                0 => LevelFilter::Info,
                _ => LevelFilter::Warn,
            },
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Configure log file level.
        let log_level = match self.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        let mut loggers: Vec<Box<dyn SharedLogger>> =
            vec![SimpleLogger::new(debug_level, Config::default())];

        let log_file = self.log_file.trim();
        if !log_file.is_empty() {
            match std::fs::File::create(log_file) {
                Ok(file) => loggers.push(WriteLogger::new(log_level, Config::default(), file)),
                Err(e) => eprintln!("failed to create log file {}: {}", log_file, e),
            }
        }

        if let Err(e) = CombinedLogger::init(loggers) {
            info!("failed to initialize CombinedLogger: {}", e);
        }
        if !log_file.is_empty() {
            info!("Writing to log file: {}", log_file);
        }

        info!("Output verbosity level: {}", debug_level);
        info!("Logfile verbosity level: {}", log_level);
    }
}
