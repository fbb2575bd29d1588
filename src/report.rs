//! The shared markdown run report.
//!
//! One `report.md` is created per suite invocation. Each test appends a section to it once
//! all of its requests have completed; sections are never rewritten.

mod markdown;

use chrono::{DateTime, Duration as ChronoDuration, Local, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::stats::LatencySummary;
use crate::LoadSuiteError;

pub use markdown::write_report_section;

/// File name of the run report inside a report folder.
pub const REPORT_FILE_NAME: &str = "report.md";

/// Seconds added before and after a test's window when linking to monitoring systems, to
/// account for clock skew between the load generator and the monitored systems.
pub const MONITORING_PADDING_SECONDS: i64 = 30;

/// Default dashboard url, extended with `from` and `to` epoch milliseconds.
pub const DEFAULT_DASHBOARD_URL: &str =
    "https://grafana.example.com/d/service-overview/service-overview?orgId=1";

/// Default trace explorer url, extended with `rangeFrom` and `rangeTo` ISO-8601 timestamps.
pub const DEFAULT_TRACE_URL: &str = "https://kibana.example.com/app/apm/services/service/overview?comparisonEnabled=true&environment=integration&latencyAggregationType=avg&transactionType=request";

/// The wall-clock window a test ran in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunWindow {
    pub started: DateTime<Utc>,
    pub stopped: DateTime<Utc>,
}

impl RunWindow {
    /// The window widened by [`MONITORING_PADDING_SECONDS`] on both sides.
    pub fn padded(&self) -> RunWindow {
        let padding = ChronoDuration::seconds(MONITORING_PADDING_SECONDS);
        RunWindow {
            started: self.started - padding,
            stopped: self.stopped + padding,
        }
    }
}

/// Base urls of the dashboard and trace explorer linked from every report section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitoringLinks {
    pub dashboard_url: Url,
    pub trace_url: Url,
}

impl Default for MonitoringLinks {
    fn default() -> Self {
        MonitoringLinks {
            // Both constants are valid urls.
            dashboard_url: Url::parse(DEFAULT_DASHBOARD_URL).expect("valid dashboard url"),
            trace_url: Url::parse(DEFAULT_TRACE_URL).expect("valid trace url"),
        }
    }
}

impl MonitoringLinks {
    pub fn new(dashboard_url: &str, trace_url: &str) -> Result<MonitoringLinks, LoadSuiteError> {
        Ok(MonitoringLinks {
            dashboard_url: parse_monitoring_url("--dashboard-url", dashboard_url)?,
            trace_url: parse_monitoring_url("--trace-url", trace_url)?,
        })
    }

    /// Dashboard link over the padded window, in epoch milliseconds.
    pub fn dashboard_link(&self, window: &RunWindow) -> String {
        let padded = window.padded();
        let mut url = self.dashboard_url.clone();
        url.query_pairs_mut()
            .append_pair("from", &padded.started.timestamp_millis().to_string())
            .append_pair("to", &padded.stopped.timestamp_millis().to_string());
        url.to_string()
    }

    /// Trace explorer link over the padded window, in ISO-8601 with milliseconds and `Z`.
    pub fn trace_link(&self, window: &RunWindow) -> String {
        let padded = window.padded();
        let mut url = self.trace_url.clone();
        url.query_pairs_mut()
            .append_pair("rangeFrom", &iso_millis(&padded.started))
            .append_pair("rangeTo", &iso_millis(&padded.stopped));
        url.to_string()
    }
}

fn parse_monitoring_url(option: &str, value: &str) -> Result<Url, LoadSuiteError> {
    Url::parse(value).map_err(|e| LoadSuiteError::InvalidOption {
        option: option.to_string(),
        value: value.to_string(),
        detail: format!("failed to parse url: {}", e),
    })
}

/// Format a timestamp as `2024-03-01T12:30:00.000Z`.
pub fn iso_millis(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Everything needed to render one test's report section.
#[derive(Clone, Debug)]
pub struct ReportSection<'r> {
    pub test_name: &'r str,
    /// `None` when no metrics could be computed.
    pub summary: Option<&'r LatencySummary>,
    /// Chart file name, relative to the report.
    pub chart_file: &'r str,
    pub window: RunWindow,
    pub links: &'r MonitoringLinks,
    /// Append the resource usage placeholder tables.
    pub detailed: bool,
}

impl ReportSection<'_> {
    /// Render the section as markdown.
    pub fn to_markdown(&self) -> Result<String, LoadSuiteError> {
        let mut buffer = Vec::new();
        write_report_section(&mut buffer, self)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Handle on the `report.md` of a report folder.
#[derive(Clone, Debug)]
pub struct RunReport {
    path: PathBuf,
}

impl RunReport {
    /// Refer to the report inside `report_folder`, without touching the file system.
    pub fn in_folder<P: AsRef<Path>>(report_folder: P) -> RunReport {
        RunReport {
            path: report_folder.as_ref().join(REPORT_FILE_NAME),
        }
    }

    /// Create (or truncate) the report and write its header.
    ///
    /// The optional template is copied below the header; a missing template is logged and
    /// skipped.
    pub async fn create<P: AsRef<Path>>(
        report_folder: P,
        suite_name: &str,
        template: Option<&Path>,
    ) -> Result<RunReport, LoadSuiteError> {
        let report = RunReport::in_folder(report_folder);

        let template_content = match template {
            Some(template) => match fs::read_to_string(template).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(
                        "report template not readable at {}, skipping: {}",
                        template.display(),
                        e
                    );
                    String::new()
                }
            },
            None => String::new(),
        };

        let mut header = Vec::new();
        markdown::write_report_header(
            &mut header,
            suite_name,
            &Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            &template_content,
        )?;
        fs::write(&report.path, header).await?;

        info!("run report created at {}", report.path.display());
        Ok(report)
    }

    /// Append a test's section, creating the report if it doesn't exist yet.
    pub async fn append_section(&self, section: &ReportSection<'_>) -> Result<(), LoadSuiteError> {
        let mut buffer = Vec::new();
        write_report_section(&mut buffer, section)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buffer).await?;
        file.flush().await?;

        debug!(
            "appended section for {} to {}",
            section.test_name,
            self.path.display()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
