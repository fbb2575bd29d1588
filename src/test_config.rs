//! Configurable test definitions, loaded from JSON files.
//!
//! ```json
//! {
//!     "MODE": "single",
//!     "SINGLE_REQUEST_DELAY": 0.5,
//!     "TOTAL_REQUESTS": 100,
//!     "URL_TEMPLATE": "https://api.example.com/blocks/{bhash}",
//!     "IDS": ["a1", "b2"]
//! }
//! ```
//!
//! Omitted keys fall back to their defaults: `single` mode, a one second delay, batches of
//! 30, 100 requests, DELETE requests with a 10 second timeout and a detailed report section.

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum_macros::Display;

use crate::executor::{Credentials, HttpVerb, DEFAULT_TIMEOUT};
use crate::identifiers::IdentifierSource;
use crate::LoadSuiteError;

/// How requests are dispatched.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestMode {
    /// One request at a time, sleeping after each.
    #[default]
    Single,
    /// Rounds of up to `BATCH_SIZE` concurrent requests, sleeping after each round.
    Batch,
}

/// An identifier as it may appear in the `IDS` array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Text(String),
    Number(serde_json::Number),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Text(text) => text,
            IdValue::Number(number) => number.to_string(),
        }
    }
}

/// A configurable test, as read from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TestConfiguration {
    #[serde(default)]
    pub mode: TestMode,
    /// Seconds to sleep after each request (single) or each round (batch).
    #[serde(rename = "SINGLE_REQUEST_DELAY", default = "default_delay")]
    pub delay: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_total_requests")]
    pub total_requests: usize,
    pub url_template: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ids: Option<Vec<IdValue>>,
    #[serde(default)]
    pub id_excel_path: Option<PathBuf>,
    #[serde(default)]
    pub verb: HttpVerb,
    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Whether to append the resource usage placeholder tables to the report section.
    #[serde(default = "default_detailed")]
    pub detailed: bool,
}

fn default_delay() -> f64 {
    1.0
}

fn default_batch_size() -> usize {
    30
}

fn default_total_requests() -> usize {
    100
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT.as_secs_f64()
}

fn default_detailed() -> bool {
    true
}

impl TestConfiguration {
    /// Load and validate a test configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<TestConfiguration, LoadSuiteError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        TestConfiguration::from_json(&contents)
    }

    /// Parse and validate a test configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<TestConfiguration, LoadSuiteError> {
        let configuration: TestConfiguration = serde_json::from_str(json)?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Reject values that can't describe a runnable test.
    pub fn validate(&self) -> Result<(), LoadSuiteError> {
        if self.batch_size == 0 {
            return Err(LoadSuiteError::InvalidOption {
                option: "BATCH_SIZE".to_string(),
                value: self.batch_size.to_string(),
                detail: "BATCH_SIZE must be at least 1.".to_string(),
            });
        }

        if self.total_requests == 0 {
            return Err(LoadSuiteError::InvalidOption {
                option: "TOTAL_REQUESTS".to_string(),
                value: self.total_requests.to_string(),
                detail: "TOTAL_REQUESTS must be at least 1.".to_string(),
            });
        }

        if self.timeout <= 0.0 {
            return Err(LoadSuiteError::InvalidOption {
                option: "TIMEOUT".to_string(),
                value: self.timeout.to_string(),
                detail: "TIMEOUT must be a positive number of seconds.".to_string(),
            });
        }
        self.delay()?;
        self.timeout()?;

        UrlTemplate::parse(&self.url_template)?;

        Ok(())
    }

    pub fn url_template(&self) -> Result<UrlTemplate, LoadSuiteError> {
        UrlTemplate::parse(&self.url_template)
    }

    /// Pause after each round. Negative, non-finite or overflowing values are rejected.
    pub fn delay(&self) -> Result<Duration, LoadSuiteError> {
        seconds("SINGLE_REQUEST_DELAY", self.delay)
    }

    pub fn timeout(&self) -> Result<Duration, LoadSuiteError> {
        seconds("TIMEOUT", self.timeout)
    }

    /// Number of requests dispatched together: 1 in single mode.
    pub fn round_width(&self) -> usize {
        match self.mode {
            TestMode::Single => 1,
            TestMode::Batch => self.batch_size,
        }
    }

    /// Basic authentication is only sent when a username is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        self.username.as_ref().map(|username| Credentials {
            username: username.to_string(),
            password: self.password.clone(),
        })
    }

    /// `IDS` takes precedence over `ID_EXCEL_PATH`.
    pub fn identifier_source(&self) -> IdentifierSource {
        if let Some(ids) = &self.ids {
            IdentifierSource::Inline(ids.iter().cloned().map(IdValue::into_string).collect())
        } else if let Some(path) = &self.id_excel_path {
            IdentifierSource::Spreadsheet(path.clone())
        } else {
            IdentifierSource::Missing
        }
    }
}

/// Derive a test name from its configuration file: the file name without extension.
pub fn test_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Convert a number of seconds from the configuration into a `Duration`.
fn seconds(option: &str, value: f64) -> Result<Duration, LoadSuiteError> {
    Duration::try_from_secs_f64(value).map_err(|e| LoadSuiteError::InvalidOption {
        option: option.to_string(),
        value: value.to_string(),
        detail: format!("{} must be a non-negative number of seconds: {}", option, e),
    })
}

/// A URL containing exactly one named placeholder, such as `http://host/items/{id}`.
///
/// The placeholder may appear more than once; every occurrence is replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
    placeholder: String,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<UrlTemplate, LoadSuiteError> {
        let re = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            LoadSuiteError::InvalidOption {
                option: "URL_TEMPLATE".to_string(),
                value: template.to_string(),
                detail: e.to_string(),
            }
        })?;

        let names = re
            .captures_iter(template)
            .map(|captures| captures[1].to_string())
            .unique()
            .collect::<Vec<String>>();

        match names.len() {
            1 => Ok(UrlTemplate {
                template: template.to_string(),
                placeholder: format!("{{{}}}", names[0]),
            }),
            0 => Err(LoadSuiteError::InvalidOption {
                option: "URL_TEMPLATE".to_string(),
                value: template.to_string(),
                detail: "URL_TEMPLATE must contain a placeholder such as {id}.".to_string(),
            }),
            _ => Err(LoadSuiteError::InvalidOption {
                option: "URL_TEMPLATE".to_string(),
                value: template.to_string(),
                detail: format!(
                    "URL_TEMPLATE must contain a single placeholder, found: {}",
                    names.join(", ")
                ),
            }),
        }
    }

    /// Substitute an identifier into the template.
    pub fn render(&self, identifier: &str) -> String {
        self.template.replace(&self.placeholder, identifier)
    }

    /// The placeholder, braces included.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let configuration =
            TestConfiguration::from_json(r#"{"URL_TEMPLATE": "http://x/{id}"}"#).unwrap();
        assert_eq!(configuration.mode, TestMode::Single);
        assert_eq!(configuration.delay().unwrap(), Duration::from_secs(1));
        assert_eq!(configuration.batch_size, 30);
        assert_eq!(configuration.total_requests, 100);
        assert_eq!(configuration.verb, HttpVerb::Delete);
        assert_eq!(configuration.timeout().unwrap(), Duration::from_secs(10));
        assert!(configuration.detailed);
        assert!(configuration.credentials().is_none());
        assert_eq!(configuration.identifier_source(), IdentifierSource::Missing);
        assert_eq!(configuration.round_width(), 1);
    }

    #[test]
    fn full_configuration() {
        let configuration = TestConfiguration::from_json(
            r#"{
                "MODE": "batch",
                "SINGLE_REQUEST_DELAY": 0.25,
                "BATCH_SIZE": 2,
                "TOTAL_REQUESTS": 5,
                "URL_TEMPLATE": "http://x/{bhash}",
                "USERNAME": "user",
                "PASSWORD": "pass",
                "IDS": ["a", 17, "b"],
                "ID_EXCEL_PATH": "ids.xlsx",
                "VERB": "GET",
                "TIMEOUT": 3,
                "DETAILED": false
            }"#,
        )
        .unwrap();
        assert_eq!(configuration.mode, TestMode::Batch);
        assert_eq!(configuration.delay().unwrap(), Duration::from_millis(250));
        assert_eq!(configuration.round_width(), 2);
        assert_eq!(configuration.verb, HttpVerb::Get);
        assert_eq!(configuration.timeout().unwrap(), Duration::from_secs(3));
        assert!(!configuration.detailed);
        assert_eq!(
            configuration.credentials(),
            Some(Credentials {
                username: "user".to_string(),
                password: Some("pass".to_string()),
            })
        );
        // IDS wins over ID_EXCEL_PATH.
        assert_eq!(
            configuration.identifier_source(),
            IdentifierSource::Inline(vec!["a".to_string(), "17".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn spreadsheet_source() {
        let configuration = TestConfiguration::from_json(
            r#"{"URL_TEMPLATE": "http://x/{id}", "ID_EXCEL_PATH": "ids.xlsx"}"#,
        )
        .unwrap();
        assert_eq!(
            configuration.identifier_source(),
            IdentifierSource::Spreadsheet(PathBuf::from("ids.xlsx"))
        );
    }

    #[test]
    fn invalid_values() {
        for json in [
            r#"{"URL_TEMPLATE": "http://x/{id}", "BATCH_SIZE": 0}"#,
            r#"{"URL_TEMPLATE": "http://x/{id}", "TOTAL_REQUESTS": 0}"#,
            r#"{"URL_TEMPLATE": "http://x/{id}", "SINGLE_REQUEST_DELAY": -1}"#,
            r#"{"URL_TEMPLATE": "http://x/{id}", "TIMEOUT": 0}"#,
            r#"{"URL_TEMPLATE": "http://x/{id}", "SINGLE_REQUEST_DELAY": 1e30}"#,
            r#"{"URL_TEMPLATE": "http://x/{id}", "TIMEOUT": 1e30}"#,
            r#"{"URL_TEMPLATE": "http://x/"}"#,
        ] {
            assert!(matches!(
                TestConfiguration::from_json(json),
                Err(LoadSuiteError::InvalidOption { .. })
            ));
        }

        assert!(matches!(
            TestConfiguration::from_json(r#"{"MODE": "single"}"#),
            Err(LoadSuiteError::Json(_))
        ));
        assert!(matches!(
            TestConfiguration::from_json(r#"{"URL_TEMPLATE": "http://x/{id}", "MODE": "burst"}"#),
            Err(LoadSuiteError::Json(_))
        ));
        assert!(matches!(
            TestConfiguration::from_json("not json"),
            Err(LoadSuiteError::Json(_))
        ));
    }

    #[test]
    fn oversized_durations() {
        match TestConfiguration::from_json(
            r#"{"URL_TEMPLATE": "http://x/{id}", "SINGLE_REQUEST_DELAY": 1e30}"#,
        ) {
            Err(LoadSuiteError::InvalidOption { option, .. }) => {
                assert_eq!(option, "SINGLE_REQUEST_DELAY")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        match TestConfiguration::from_json(r#"{"URL_TEMPLATE": "http://x/{id}", "TIMEOUT": 1e30}"#)
        {
            Err(LoadSuiteError::InvalidOption { option, .. }) => assert_eq!(option, "TIMEOUT"),
            other => panic!("unexpected result: {:?}", other),
        }

        // Values changed after loading are still refused instead of panicking.
        let mut configuration =
            TestConfiguration::from_json(r#"{"URL_TEMPLATE": "http://x/{id}"}"#).unwrap();
        configuration.delay = f64::INFINITY;
        assert!(configuration.delay().is_err());
        configuration.timeout = -1.0;
        assert!(configuration.timeout().is_err());
    }

    #[test]
    fn url_template() {
        let template = UrlTemplate::parse("http://x/{id}/children?parent={id}").unwrap();
        assert_eq!(template.placeholder(), "{id}");
        assert_eq!(template.render("a1"), "http://x/a1/children?parent=a1");

        assert!(UrlTemplate::parse("http://x/{id}/{other}").is_err());
        assert!(UrlTemplate::parse("http://x/{id}/{other}/{id}").is_err());
        assert!(UrlTemplate::parse("http://x/").is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(
            test_name_from_path(Path::new("test_script/configs/delete_blocks.json")),
            "delete_blocks"
        );
    }
}
