//! Executes a single HTTP request and turns the outcome into a [`ResultRecord`].
//!
//! The executor never retries and never returns an error: a failure to reach the server is
//! recorded as [`RequestStatus::Failed`] together with the time spent failing, so a load test
//! measures the raw behavior of the endpoint, failures included.

use chrono::Utc;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use strum_macros::Display;

use crate::metrics::{RequestStatus, ResultRecord};

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP methods a load test can issue.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpVerb {
    #[serde(rename = "GET", alias = "get")]
    Get,
    #[default]
    #[serde(rename = "DELETE", alias = "delete")]
    Delete,
}

impl HttpVerb {
    fn method(&self) -> Method {
        match self {
            HttpVerb::Get => Method::GET,
            HttpVerb::Delete => Method::DELETE,
        }
    }
}

/// Basic authentication credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

/// Issue one request and record how long it took and how it ended.
///
/// The duration is measured with a monotonic clock from the moment the request is built
/// until the response body is fully received, or until the transport fails. Any status code
/// returned by the server, including 4xx and 5xx, is recorded as is.
pub async fn execute(
    client: &Client,
    url: &str,
    credentials: Option<&Credentials>,
    verb: HttpVerb,
    timeout: Duration,
) -> ResultRecord {
    let started = Instant::now();

    let mut request_builder = client.request(verb.method(), url).timeout(timeout);
    if let Some(credentials) = credentials {
        request_builder =
            request_builder.basic_auth(&credentials.username, credentials.password.as_ref());
    }

    let status = match request_builder.send().await {
        Ok(response) => {
            let status_code = response.status();
            // Read the body so the duration covers the complete response.
            match response.bytes().await {
                Ok(_) => {
                    if !status_code.is_success() {
                        debug!("{} {}: status_code {}", verb, url, status_code);
                    }
                    RequestStatus::Completed(status_code.as_u16())
                }
                Err(e) => {
                    warn!("{} {}: failed to read response body: {}", verb, url, e);
                    RequestStatus::Failed
                }
            }
        }
        Err(e) => {
            warn!("{} {}: {}", verb, url, e);
            RequestStatus::Failed
        }
    };

    ResultRecord::new(Utc::now(), started.elapsed(), status)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verb_display() {
        assert_eq!(HttpVerb::Get.to_string(), "GET");
        assert_eq!(HttpVerb::Delete.to_string(), "DELETE");
        assert_eq!(HttpVerb::default(), HttpVerb::Delete);
    }

    #[test]
    fn verb_deserialize() {
        let verb: HttpVerb = serde_json::from_str("\"GET\"").unwrap();
        assert_eq!(verb, HttpVerb::Get);
        let verb: HttpVerb = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(verb, HttpVerb::Delete);
        assert!(serde_json::from_str::<HttpVerb>("\"POST\"").is_err());
    }

    #[tokio::test]
    async fn connection_failure() {
        let client = Client::new();
        // Nothing listens on port 1 of the loopback interface.
        let record = execute(
            &client,
            "http://127.0.0.1:1/unreachable",
            None,
            HttpVerb::Get,
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(record.status, RequestStatus::Failed);
        assert!(record.duration_ms >= 0.0);
    }

    #[tokio::test]
    async fn invalid_url() {
        let client = Client::new();
        let record = execute(
            &client,
            "not a url",
            None,
            HttpVerb::Delete,
            DEFAULT_TIMEOUT,
        )
        .await;
        assert_eq!(record.status, RequestStatus::Failed);
        assert!(record.duration_ms >= 0.0);
    }
}
