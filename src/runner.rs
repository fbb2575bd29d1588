//! Drives the requests of one test and turns the results into report artifacts.
//!
//! A configurable test dispatches its requests in rounds. In `single` mode every round holds
//! one request; in `batch` mode a round holds up to `BATCH_SIZE` requests which run
//! concurrently. Every request of a round completes before the round's records are written
//! (in completion order) and before the configured delay starts; only then does the next
//! round begin. A request that outlasts the delay simply delays the next round, rounds never
//! overlap.
//!
//! Request `i` always uses identifier `i % pool_size`, so the sequence of identifiers is the
//! same in both modes.
//!
//! Once every request completed, the record file is read back to compute a
//! [`LatencySummary`], which feeds both the chart and the report section.

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use std::future::Future;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::executor::execute;
use crate::graph;
use crate::identifiers::IdentifierPool;
use crate::logger::{read_durations, RecordLayout, RequestLog};
use crate::metrics::ResultRecord;
use crate::report::{MonitoringLinks, ReportSection, RunReport, RunWindow};
use crate::stats::LatencySummary;
use crate::test_config::TestConfiguration;
use crate::util;
use crate::LoadSuiteError;

/// Extension of rendered charts.
pub const CHART_EXTENSION: &str = "svg";

/// What a completed test produced.
#[derive(Clone, Debug)]
pub struct TestOutcome {
    pub test_name: String,
    /// The CSV file holding one row per request.
    pub records_file: PathBuf,
    pub chart_file: PathBuf,
    /// Whether the chart was rendered.
    pub chart_rendered: bool,
    /// Number of requests issued.
    pub requests: usize,
    pub window: RunWindow,
    /// `None` if the record file couldn't be read back or held no records.
    pub summary: Option<LatencySummary>,
}

/// Split `total_requests` into consecutive rounds of at most `width` requests.
///
/// Each round is the range of (zero-based) request numbers it dispatches.
pub fn plan_rounds(total_requests: usize, width: usize) -> Vec<Range<usize>> {
    let width = width.max(1);
    (0..total_requests)
        .step_by(width)
        .map(|start| start..(start + width).min(total_requests))
        .collect()
}

/// Runs tests against one report folder.
#[derive(Clone, Debug)]
pub struct TestRunner {
    client: Client,
    report_folder: PathBuf,
    report: RunReport,
    links: MonitoringLinks,
}

impl TestRunner {
    pub fn new<P: AsRef<Path>>(client: Client, report_folder: P, links: MonitoringLinks) -> Self {
        TestRunner {
            client,
            report_folder: report_folder.as_ref().to_path_buf(),
            report: RunReport::in_folder(report_folder),
            links,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Path of the CSV file written by `test_name`.
    pub fn records_file(&self, test_name: &str) -> PathBuf {
        self.report_folder.join(format!("{}.csv", test_name))
    }

    /// Path of the chart rendered for `test_name`.
    pub fn chart_file(&self, test_name: &str) -> PathBuf {
        self.report_folder
            .join(format!("{}.{}", test_name, CHART_EXTENSION))
    }

    /// Run a configurable test, then append its section to the run report.
    ///
    /// Fails without issuing any request, creating the record file or touching the report
    /// if the url template is invalid or the identifier pool is empty.
    pub async fn run_configurable_test(
        &self,
        test_name: &str,
        config: &TestConfiguration,
    ) -> Result<TestOutcome, LoadSuiteError> {
        info!("--- running test: {} ---", test_name);
        info!(
            "mode: {}, batch size: {}, total requests: {}",
            config.mode, config.batch_size, config.total_requests
        );

        let template = config.url_template()?;
        let timeout = config.timeout()?;
        let delay = config.delay()?;
        let pool = match IdentifierPool::load(&config.identifier_source()).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("no ids found for {}, aborting test: {}", test_name, e);
                return Err(e);
            }
        };

        let credentials = config.credentials();
        let credentials = credentials.as_ref();
        let client = &self.client;
        let verb = config.verb;
        let width = config.round_width();

        let records_file = self.records_file(test_name);
        let mut request_log = RequestLog::create(&records_file, RecordLayout::Timestamped).await?;

        let started = Utc::now();
        for round in plan_rounds(config.total_requests, width) {
            // Fork: every request of the round runs concurrently.
            let mut in_flight = round
                .clone()
                .map(|request_number| {
                    let url = template.render(pool.get(request_number));
                    async move { execute(client, &url, credentials, verb, timeout).await }
                })
                .collect::<FuturesUnordered<_>>();

            // Join: wait for all of them, in completion order.
            let mut records = Vec::with_capacity(round.len());
            while let Some(record) = in_flight.next().await {
                records.push(record);
            }
            for record in &records {
                request_log.write_record(record).await?;
            }

            if width == 1 {
                info!(
                    "request {}/{} done: {}",
                    round.end, config.total_requests, records[0].status
                );
            } else {
                info!(
                    "progress: {}/{} requests",
                    round.end, config.total_requests
                );
            }

            util::pause(delay).await;
        }
        let stopped = Utc::now();
        let requests = request_log.rows();
        drop(request_log);

        self.finish_test(
            test_name,
            records_file,
            requests,
            RunWindow { started, stopped },
            config.detailed,
        )
        .await
    }

    /// Run a simple sequential test: `request_fn` is awaited `num_requests` times, one
    /// request after the other, with no delay in between.
    pub async fn run_simple_test<F, Fut>(
        &self,
        test_name: &str,
        num_requests: usize,
        mut request_fn: F,
    ) -> Result<TestOutcome, LoadSuiteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResultRecord>,
    {
        info!("--- starting simple test: {} ---", test_name);

        let records_file = self.records_file(test_name);
        let mut request_log = RequestLog::create(&records_file, RecordLayout::Numbered).await?;

        let started = Utc::now();
        for request_number in 1..=num_requests {
            let record = request_fn().await;
            request_log.write_record(&record).await?;
            info!(
                "request {}/{} -> status: {}, duration: {:.2} ms",
                request_number, num_requests, record.status, record.duration_ms
            );
        }
        let stopped = Utc::now();
        drop(request_log);

        self.finish_test(
            test_name,
            records_file,
            num_requests,
            RunWindow { started, stopped },
            false,
        )
        .await
    }

    /// Summarize the record file, render the chart and append the report section.
    async fn finish_test(
        &self,
        test_name: &str,
        records_file: PathBuf,
        requests: usize,
        window: RunWindow,
        detailed: bool,
    ) -> Result<TestOutcome, LoadSuiteError> {
        info!("data generation complete, generating artifacts for {}", test_name);

        let durations = match read_durations(&records_file).await {
            Ok(durations) => durations,
            Err(e) => {
                error!(
                    "could not calculate metrics from {}: {}",
                    records_file.display(),
                    e
                );
                Vec::new()
            }
        };
        let summary = LatencySummary::from_durations(&durations);

        let chart_file = self.chart_file(test_name);
        let chart_rendered = match &summary {
            Some(summary) => graph::render_chart(test_name, &durations, summary, &chart_file),
            None => {
                warn!("no durations recorded for {}, skipping graph", test_name);
                false
            }
        };

        let chart_name = format!("{}.{}", test_name, CHART_EXTENSION);
        let section = ReportSection {
            test_name,
            summary: summary.as_ref(),
            chart_file: &chart_name,
            window,
            links: &self.links,
            detailed,
        };
        self.report.append_section(&section).await?;
        info!("test {} complete", test_name);

        Ok(TestOutcome {
            test_name: test_name.to_string(),
            records_file,
            chart_file,
            chart_rendered,
            requests,
            window,
            summary,
        })
    }
}
