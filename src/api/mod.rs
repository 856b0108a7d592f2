//! HTTP client for the analysis server's job endpoints.

pub mod types;
pub mod upload;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::http_client::{self, HttpTimeouts};

pub use types::{
    BacteriaBreakdown, BacteriaEntry, CreatedJob, JobFile, JobRecord, JobStatus, JobStatusSnapshot,
    ResultRecord,
};
pub use upload::UploadForm;

const MAX_JSON_RESPONSE_BYTES: usize = 1024 * 1024;
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;
const MAX_ARTIFACT_BYTES: u64 = 4 * 1024 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered 404 for a job resource.
    #[error("Job not found")]
    NotFound,
    /// Any other non-success status, with the best message the body offered.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// No response at all: DNS, connect, TLS or timeout failures.
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),
    #[error("Cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// URL builder for the job endpoints under one base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST /api/jobs/upload/`
    pub fn upload(&self) -> String {
        self.jobs_url(&["upload"])
    }

    /// `GET /api/jobs/{id}/`
    pub fn job_detail(&self, job_id: &str) -> String {
        self.jobs_url(&[job_id])
    }

    /// `GET /api/jobs/{id}/status/`
    pub fn job_status(&self, job_id: &str) -> String {
        self.jobs_url(&[job_id, "status"])
    }

    /// `GET /api/jobs/{id}/results/`
    pub fn job_results(&self, job_id: &str) -> String {
        self.jobs_url(&[job_id, "results"])
    }

    /// `GET /api/jobs/{id}/bacteria/`
    pub fn job_bacteria(&self, job_id: &str) -> String {
        self.jobs_url(&[job_id, "bacteria"])
    }

    /// Make an artifact link absolute. Server-relative paths are appended to the base.
    pub fn resolve_artifact(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            return link.to_string();
        }
        let base = self.base.as_str().trim_end_matches('/');
        if link.starts_with('/') {
            format!("{base}{link}")
        } else {
            format!("{base}/{link}")
        }
    }

    fn jobs_url(&self, tail: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "jobs"])
                .extend(tail)
                .push("");
        }
        url.to_string()
    }
}

/// Blocking client for the job endpoints. Cheap to clone; clones share one agent.
#[derive(Clone, Debug)]
pub struct ApiClient {
    endpoints: Endpoints,
    agent: ureq::Agent,
    timeouts: HttpTimeouts,
}

impl ApiClient {
    pub fn new(base: Url, timeouts: HttpTimeouts) -> Self {
        Self {
            endpoints: Endpoints::new(base),
            agent: http_client::agent(timeouts),
            timeouts,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Upload a prepared form and return the identity the server assigned.
    pub fn create_job(&self, form: UploadForm) -> Result<CreatedJob, ApiError> {
        let url = self.endpoints.upload();
        let file_count = form.file_names().len();
        let multipart = form.into_multipart()?;
        let client = http_client::upload_client(self.timeouts)
            .map_err(|err| ApiError::Transport(error_chain(&err)))?;
        tracing::info!("Uploading job to {url} ({file_count} file(s))");
        let response = client
            .post(&url)
            .header("Accept", "application/json")
            .multipart(multipart)
            .send()
            .map_err(|err| ApiError::Transport(error_chain(&err)))?;
        let status = response.status();
        if !status.is_success() {
            let body = http_client::read_upload_response(response, MAX_ERROR_BODY_BYTES).ok();
            return Err(rejected(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                body.as_deref(),
            ));
        }
        let bytes = http_client::read_upload_response(response, MAX_JSON_RESPONSE_BYTES)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    pub fn job_detail(&self, job_id: &str) -> Result<JobRecord, ApiError> {
        self.get_json(&self.endpoints.job_detail(job_id))
    }

    pub fn job_status(&self, job_id: &str) -> Result<JobStatusSnapshot, ApiError> {
        self.get_json(&self.endpoints.job_status(job_id))
    }

    pub fn job_results(&self, job_id: &str) -> Result<ResultRecord, ApiError> {
        self.get_json(&self.endpoints.job_results(job_id))
    }

    pub fn bacteria(&self, job_id: &str) -> Result<BacteriaBreakdown, ApiError> {
        self.get_json(&self.endpoints.job_bacteria(job_id))
    }

    /// Stream an artifact to `destination`, returning the number of bytes saved.
    ///
    /// A partially written file is removed when the transfer fails.
    pub fn download(&self, link: &str, destination: &Path) -> Result<u64, ApiError> {
        let url = self.endpoints.resolve_artifact(link);
        let response = self.call_get(&url)?;
        let write_error = |source| ApiError::WriteFile {
            path: destination.to_path_buf(),
            source,
        };
        let mut file = std::fs::File::create(destination).map_err(write_error)?;
        match http_client::copy_response_to_writer(response, &mut file, MAX_ARTIFACT_BYTES) {
            Ok(bytes) => {
                tracing::info!("Saved {url} to {} ({bytes} bytes)", destination.display());
                Ok(bytes)
            }
            Err(err) => {
                drop(file);
                let _ = std::fs::remove_file(destination);
                Err(write_error(err))
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        tracing::debug!("GET {url}");
        parse_json(self.call_get(url)?)
    }

    fn call_get(&self, url: &str) -> Result<ureq::Response, ApiError> {
        match self.agent.get(url).set("Accept", "application/json").call() {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(404, _)) => Err(ApiError::NotFound),
            Err(ureq::Error::Status(code, response)) => Err(rejection(code, response)),
            Err(ureq::Error::Transport(err)) => Err(ApiError::Transport(err.to_string())),
        }
    }
}

fn parse_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ApiError> {
    let bytes = http_client::read_response_bytes(response, MAX_JSON_RESPONSE_BYTES)
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

fn rejection(code: u16, response: ureq::Response) -> ApiError {
    let status_text = response.status_text().trim().to_string();
    let body = http_client::read_response_bytes(response, MAX_ERROR_BODY_BYTES).ok();
    rejected(code, &status_text, body.as_deref())
}

fn rejected(code: u16, status_text: &str, body: Option<&[u8]>) -> ApiError {
    let status_text = status_text.trim();
    let message = body
        .and_then(error_message_from_body)
        .unwrap_or_else(|| {
            if status_text.is_empty() {
                format!("HTTP {code}")
            } else {
                status_text.to_string()
            }
        });
    ApiError::Rejected {
        status: code,
        message,
    }
}

/// Display an error with its causes; reqwest keeps the useful part in `source`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Pull a readable message out of a JSON error body.
///
/// Looks at `message`, `error` and `detail` first, then at field-keyed
/// validation errors such as `{"email": ["Enter a valid email address."]}`.
pub(crate) fn error_message_from_body(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;
    for key in ["message", "error", "detail"] {
        if let Some(text) = object.get(key).and_then(first_text) {
            return Some(text);
        }
    }
    object
        .iter()
        .find_map(|(field, value)| first_text(value).map(|text| format!("{field}: {text}")))
}

fn first_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        serde_json::Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(base: &str) -> Endpoints {
        Endpoints::new(Url::parse(base).unwrap())
    }

    #[test]
    fn builds_job_urls() {
        let endpoints = endpoints("http://localhost:8000");
        let id = "123e4567-e89b-12d3-a456-426614174000";
        assert_eq!(endpoints.upload(), "http://localhost:8000/api/jobs/upload/");
        assert_eq!(
            endpoints.job_detail(id),
            format!("http://localhost:8000/api/jobs/{id}/")
        );
        assert_eq!(
            endpoints.job_status(id),
            format!("http://localhost:8000/api/jobs/{id}/status/")
        );
        assert_eq!(
            endpoints.job_results(id),
            format!("http://localhost:8000/api/jobs/{id}/results/")
        );
        assert_eq!(
            endpoints.job_bacteria(id),
            format!("http://localhost:8000/api/jobs/{id}/bacteria/")
        );
    }

    #[test]
    fn keeps_base_path_prefix_and_escapes_ids() {
        let endpoints = endpoints("https://lab.example.org/pipeline/");
        assert_eq!(
            endpoints.job_detail("a b"),
            "https://lab.example.org/pipeline/api/jobs/a%20b/"
        );
    }

    #[test]
    fn resolves_relative_artifacts() {
        let endpoints = endpoints("http://localhost:8000");
        assert_eq!(
            endpoints.resolve_artifact("/media/results/report.html"),
            "http://localhost:8000/media/results/report.html"
        );
        assert_eq!(
            endpoints.resolve_artifact("https://cdn.example.org/alpha.png"),
            "https://cdn.example.org/alpha.png"
        );
    }

    #[test]
    fn extracts_error_messages() {
        assert_eq!(
            error_message_from_body(br#"{"message": "Quota exceeded"}"#).as_deref(),
            Some("Quota exceeded")
        );
        assert_eq!(
            error_message_from_body(br#"{"error": "Analysis not completed yet"}"#).as_deref(),
            Some("Analysis not completed yet")
        );
        assert_eq!(
            error_message_from_body(br#"{"files": ["This list may not be empty."]}"#).as_deref(),
            Some("files: This list may not be empty.")
        );
        assert_eq!(error_message_from_body(b"<html>502</html>"), None);
        assert_eq!(error_message_from_body(b"{}"), None);
    }
}
