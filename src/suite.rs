//! Runs the built-in test and every configurable test into one report folder.

use chrono::{DateTime, Local};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{RunMode, SuiteConfiguration};
use crate::executor::{self, HttpVerb, DEFAULT_TIMEOUT};
use crate::report::RunReport;
use crate::runner::{TestOutcome, TestRunner};
use crate::test_config::{test_name_from_path, TestConfiguration};
use crate::util;
use crate::LoadSuiteError;

/// Name of the built-in test, and of its record file.
pub const BUILTIN_TEST_NAME: &str = "google_request_example";
/// Number of sequential GET requests issued by the built-in test.
pub const BUILTIN_REQUESTS: usize = 50;

/// How a suite went.
#[derive(Clone, Debug, Default)]
pub struct SuiteOutcome {
    pub report_folder: PathBuf,
    pub report_file: PathBuf,
    /// Tests that ran to completion, in the order they ran.
    pub completed: Vec<TestOutcome>,
    /// Names of tests that failed to load or run.
    pub failed: Vec<String>,
}

/// Folder name of a suite run: the slugified suite name and the local start time.
pub fn report_folder_name(suite_name: &str, started: &DateTime<Local>) -> String {
    format!(
        "{}_{}",
        util::slugify(suite_name),
        started.format("%Y%m%d_%H%M%S")
    )
}

/// All `*.json` files directly inside `configs_dir`, sorted by name.
///
/// A missing or unreadable folder yields no configurations.
pub fn find_test_configs(configs_dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(configs_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                "no test configurations read from {}: {}",
                configs_dir.display(),
                e
            );
            return Vec::new();
        }
    };

    let mut configs = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<PathBuf>>();
    configs.sort();
    configs
}

/// Issue [`BUILTIN_REQUESTS`] sequential GET requests against `url`.
pub async fn run_builtin_test(
    runner: &TestRunner,
    url: &str,
) -> Result<TestOutcome, LoadSuiteError> {
    let client = runner.client();
    runner
        .run_simple_test(BUILTIN_TEST_NAME, BUILTIN_REQUESTS, || {
            executor::execute(client, url, None, HttpVerb::Get, DEFAULT_TIMEOUT)
        })
        .await
}

/// Load the configuration at `config_path` and run it, named after the file stem.
pub async fn run_test_config(
    runner: &TestRunner,
    config_path: &Path,
) -> Result<TestOutcome, LoadSuiteError> {
    let test_name = test_name_from_path(config_path);
    let config = match TestConfiguration::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(
                "failed to load config file {}: {}",
                config_path.display(),
                e
            );
            return Err(e);
        }
    };
    runner.run_configurable_test(&test_name, &config).await
}

/// Run a full suite: create `<reports_dir>/<name>_<timestamp>/`, write the report header,
/// run the built-in test, then every test configuration, pausing `test_delay` between tests.
///
/// A failing test is logged and the suite moves on.
pub async fn run_suite(
    configuration: &SuiteConfiguration,
    suite_name: &str,
    client: Client,
) -> Result<SuiteOutcome, LoadSuiteError> {
    let test_delay = configuration.test_delay()?;
    let links = configuration.monitoring_links()?;

    let report_folder = configuration
        .reports_dir()
        .join(report_folder_name(suite_name, &Local::now()));
    tokio::fs::create_dir_all(&report_folder).await?;
    info!("created report directory: {}", report_folder.display());

    let template = configuration.report_template();
    let report = RunReport::create(&report_folder, suite_name, Some(&template)).await?;
    let runner = TestRunner::new(client, &report_folder, links);

    let mut outcome = SuiteOutcome {
        report_folder: report_folder.clone(),
        report_file: report.path().to_path_buf(),
        ..Default::default()
    };

    info!("--- running built-in test ---");
    record(
        &mut outcome,
        BUILTIN_TEST_NAME,
        run_builtin_test(&runner, &configuration.builtin_url()).await,
    );

    let configs = find_test_configs(&configuration.configs_dir());
    info!(
        "found {} test configurations in {}",
        configs.len(),
        configuration.configs_dir().display()
    );

    for config_path in &configs {
        pause_between_tests(test_delay).await;
        let test_name = test_name_from_path(config_path);
        let result = run_test_config(&runner, config_path).await;
        record(&mut outcome, &test_name, result);
    }

    info!(
        "all tests complete, {} succeeded and {} failed, report at {}",
        outcome.completed.len(),
        outcome.failed.len(),
        outcome.report_file.display()
    );
    Ok(outcome)
}

fn record(
    outcome: &mut SuiteOutcome,
    test_name: &str,
    result: Result<TestOutcome, LoadSuiteError>,
) {
    match result {
        Ok(test) => outcome.completed.push(test),
        Err(e) => {
            error!("test {} failed: {}", test_name, e);
            outcome.failed.push(test_name.to_string());
        }
    }
}

async fn pause_between_tests(test_delay: Duration) {
    if !test_delay.is_zero() {
        info!("waiting {} seconds before the next test", test_delay.as_secs());
    }
    util::pause(test_delay).await;
}

/// Run whatever the validated `configuration` asks for.
pub async fn run(
    configuration: &SuiteConfiguration,
    run_mode: RunMode,
    client: Client,
) -> Result<(), LoadSuiteError> {
    match run_mode {
        RunMode::Suite { name } => {
            run_suite(configuration, &name, client).await?;
        }
        RunMode::Configurable {
            report_folder,
            config,
        } => {
            let runner = TestRunner::new(client, report_folder, configuration.monitoring_links()?);
            run_test_config(&runner, &config).await?;
        }
        RunMode::Builtin { report_folder } => {
            let runner = TestRunner::new(client, report_folder, configuration.monitoring_links()?);
            run_builtin_test(&runner, &configuration.builtin_url()).await?;
        }
    }
    Ok(())
}
