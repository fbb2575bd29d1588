use gumdrop::Options;
use httpmock::MockServer;
use std::future::Future;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use loadsuite::report::MonitoringLinks;
use loadsuite::runner::TestRunner;
use loadsuite::SuiteConfiguration;

/// Not all functions are used by all tests, so we enable allow(dead_code) to avoid
/// compiler warnings during testing.

/// Return an empty scratch folder for `name`, removing anything left by an earlier run.
#[allow(dead_code)]
pub fn scratch_folder(name: &str) -> PathBuf {
    let folder = std::env::temp_dir()
        .join("loadsuite-tests")
        .join(format!("{}-{}", name, std::process::id()));
    cleanup_folders(vec![&folder]);
    std::fs::create_dir_all(&folder).expect("failed to create scratch folder");
    folder
}

/// Build a runner writing into `report_folder`, with the default monitoring links.
#[allow(dead_code)]
pub fn build_runner(report_folder: &Path) -> TestRunner {
    TestRunner::new(
        loadsuite::build_client(false).expect("failed to build client"),
        report_folder,
        MonitoringLinks::default(),
    )
}

/// Write a test configuration as `<folder>/<name>.json`.
#[allow(dead_code)]
pub fn write_config(folder: &Path, name: &str, config: &serde_json::Value) -> PathBuf {
    let path = folder.join(format!("{}.json", name));
    std::fs::write(&path, config.to_string()).expect("failed to write config");
    path
}

/// The following options are configured by default, if not set to a custom value:
///  --builtin-url <mock-server>/builtin
///  --test-delay 0
#[allow(dead_code)]
pub fn build_configuration(server: &MockServer, custom: Vec<&str>) -> SuiteConfiguration {
    let mut configuration: Vec<&str> = vec![];
    // Declare builtin_url here no matter what, so its lifetime is sufficient when needed.
    let builtin_url = server.url("/builtin");

    configuration.extend_from_slice(&custom);

    if !configuration.contains(&"--builtin-url") {
        configuration.extend_from_slice(&["--builtin-url", &builtin_url]);
    }
    if !configuration.contains(&"--test-delay") {
        configuration.extend_from_slice(&["--test-delay", "0"]);
    }

    SuiteConfiguration::parse_args_default(&configuration)
        .expect("failed to parse options and generate a configuration")
}

/// Run a future to completion on a fresh runtime.
#[allow(dead_code)]
pub fn run<F: Future>(future: F) -> F::Output {
    tokio::runtime::Runtime::new()
        .expect("failed to start runtime")
        .block_on(future)
}

/// Helper to count the number of lines in a test artifact.
#[allow(dead_code)]
pub fn file_length(path: &Path) -> usize {
    if let Ok(file) = std::fs::File::open(path) {
        io::BufReader::new(file).lines().count()
    } else {
        0
    }
}

/// Helper to split a record file into its data rows, skipping the header.
#[allow(dead_code)]
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .expect("failed to read record file")
        .lines()
        .skip(1)
        .map(|line| line.split(',').map(|field| field.to_string()).collect())
        .collect()
}

/// Helper to delete test folders, if existing.
#[allow(dead_code)]
pub fn cleanup_folders(folders: Vec<&Path>) {
    for folder in folders {
        if folder.exists() {
            std::fs::remove_dir_all(folder).expect("failed to remove folder");
        }
    }
}
