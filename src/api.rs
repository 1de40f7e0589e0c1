use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

/// Errors that can occur while interacting with the remote detection
/// service.
#[derive(Debug)]
pub enum DetectorError {
    Http(reqwest::Error),
    UnexpectedStatus { status: StatusCode, body: String },
    MalformedBody(String),
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorError::Http(err) => write!(f, "http error: {err}"),
            DetectorError::UnexpectedStatus { status, body } => {
                write!(f, "unexpected status {status}: {body}")
            }
            DetectorError::MalformedBody(err) => write!(f, "malformed response body: {err}"),
        }
    }
}

impl std::error::Error for DetectorError {}

impl From<reqwest::Error> for DetectorError {
    fn from(value: reqwest::Error) -> Self {
        DetectorError::Http(value)
    }
}

/// Classification outcome for one sampled frame. The service answers with
/// either a full classification or an `error` object; the latter can arrive
/// with a 2xx status when the model itself fails, so both arms share one
/// wire type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Verdict {
    Classified {
        is_real: bool,
        confidence: f64,
        status: String,
    },
    Error {
        error: String,
    },
}

impl Verdict {
    /// The verdict synthesized for transport and parse failures.
    pub fn connection_failed() -> Self {
        Verdict::Error {
            error: "Connection failed".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error { .. })
    }
}

/// Service self-report from the health endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    image: &'a str,
}

/// Blocking HTTP client for the detection service endpoints.
#[derive(Debug, Clone)]
pub struct DetectorClient {
    base_url: String,
    http: Client,
}

impl DetectorClient {
    /// Create a new client targeting the provided base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DetectorError> {
        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Submits one sampled frame to the `/detect/` endpoint and parses the
    /// verdict. Any non-2xx status or unparsable body is an error; callers
    /// decide whether to surface it or fold it into an error verdict.
    pub fn analyze(&self, image_data_url: &str) -> Result<Verdict, DetectorError> {
        let url = format!("{}/detect/", self.base_url);
        let request = DetectRequest {
            image: image_data_url,
        };
        let response = self.http.post(url).json(&request).send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(DetectorError::UnexpectedStatus { status, body });
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|err| DetectorError::MalformedBody(err.to_string()))
    }

    /// Probes the `/health/` endpoint. Connectivity check only; detection
    /// never depends on it.
    pub fn health(&self) -> Result<HealthReport, DetectorError> {
        let url = format!("{}/health/", self.base_url);
        let response = self.http.get(url).send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(DetectorError::UnexpectedStatus { status, body });
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|err| DetectorError::MalformedBody(err.to_string()))
    }

    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
