// StockSync - platform/backend.rs
//
// HTTP client for the local processing backend.
//
// Every processor and analytic is a multipart POST of one or more files.
// Processors answer with a binary workbook (or ZIP); analytics answer with
// JSON. A non-2xx answer carries `{ "error": "..." }`, which becomes the
// user-facing message; when that body is missing or unreadable the message
// falls back to `Server responded with status <code>`.

use crate::core::analytics::AnalyticFetch;
use crate::core::model::{Artifact, InputFile};
use crate::core::processor::ProcessRequest;
use crate::core::submission::JobProcessor;
use crate::util::constants;
use crate::util::error::BackendError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Stock-rupture analytic endpoint.
pub const STOCK_RUPTURES_ENDPOINT: &str = "/processors/stock_ruptures";

/// Client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Build a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| BackendError::Client { source })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// POST `files` (and text `fields`) as multipart to `endpoint`.
    ///
    /// Files are read from disk here, at send time.
    async fn post_files(
        &self,
        endpoint: &str,
        files: &[(&str, &InputFile)],
        fields: &[(&str, String)],
    ) -> Result<reqwest::Response, BackendError> {
        let mut form = Form::new();
        for (field, file) in files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| BackendError::ReadInput {
                    path: file.path.clone(),
                    source,
                })?;
            tracing::debug!(endpoint, field, file = %file.name, bytes = bytes.len(), "Attaching input file");
            form = form.part(field.to_string(), Part::bytes(bytes).file_name(file.name.clone()));
        }
        for (name, value) in fields {
            form = form.text(name.to_string(), value.clone());
        }

        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        ensure_success(endpoint, response).await
    }

    /// Run one processing job and return its artifact.
    pub async fn process(&self, request: &ProcessRequest) -> Result<Artifact, BackendError> {
        let endpoint = request.kind.endpoint();
        let files: Vec<(&str, &InputFile)> =
            request.files.iter().map(|(field, file)| (*field, file)).collect();
        let fields: Vec<(&str, String)> = request
            .movement_type
            .map(|m| vec![("movement_type", m.to_string())])
            .unwrap_or_default();

        let response = self.post_files(endpoint, &files, &fields).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition);

        let bytes = response
            .bytes()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        tracing::info!(
            endpoint,
            bytes = bytes.len(),
            content_type = %content_type,
            file_name = ?file_name,
            "Processor returned artifact"
        );

        Ok(Artifact {
            bytes: bytes.to_vec(),
            content_type,
            file_name,
        })
    }

    /// Fetch the daily stock-rupture counts for an "Etat Journalier" report.
    pub async fn stock_ruptures(&self, file: &InputFile) -> Result<Value, BackendError> {
        let response = self
            .post_files(STOCK_RUPTURES_ENDPOINT, &[("file", file)], &[])
            .await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::MalformedBody {
                endpoint: STOCK_RUPTURES_ENDPOINT.to_string(),
                reason: e.to_string(),
            })
    }

    /// Ask the backend to exit. Best effort: the caller kills the process anyway.
    pub async fn shutdown(&self) -> Result<(), BackendError> {
        let endpoint = constants::BACKEND_SHUTDOWN_PATH;
        self.client
            .get(self.url(endpoint))
            .timeout(Duration::from_millis(constants::SHUTDOWN_REQUEST_TIMEOUT_MS))
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        tracing::debug!("Backend shutdown request sent");
        Ok(())
    }
}

#[async_trait]
impl JobProcessor for BackendClient {
    async fn process(&self, request: &ProcessRequest) -> Result<Artifact, BackendError> {
        BackendClient::process(self, request).await
    }
}

/// The stock-rupture analytic, backed by [`BackendClient::stock_ruptures`].
#[derive(Debug, Clone)]
pub struct StockRuptureFetcher {
    client: Arc<BackendClient>,
}

impl StockRuptureFetcher {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalyticFetch for StockRuptureFetcher {
    async fn fetch(&self, file: &InputFile) -> Result<Value, BackendError> {
        self.client.stock_ruptures(file).await
    }
}

/// Turn a non-2xx response into [`BackendError::Status`].
async fn ensure_success(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status.as_u16(), &body);
    tracing::warn!(endpoint, status = status.as_u16(), error = %message, "Backend returned an error");
    Err(BackendError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// User-facing message for an error response body.
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Server responded with status {status}"))
}

/// File name from a `Content-Disposition` header value.
///
/// Handles `filename="x"`, bare `filename=x` and RFC 5987 `filename*=UTF-8''x`.
/// The extended form wins when both are present.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    static PATTERNS: OnceLock<Option<(Regex, Regex)>> = OnceLock::new();
    let (extended, plain) = PATTERNS
        .get_or_init(|| {
            let extended = Regex::new(r#"(?i)filename\*\s*=\s*(?:[\w-]+'[^']*')?"?([^";]+)"?"#).ok()?;
            let plain = Regex::new(r#"(?i)filename\s*=\s*"?([^";]+)"?"#).ok()?;
            Some((extended, plain))
        })
        .as_ref()?;

    extended
        .captures(header)
        .or_else(|| plain.captures(header))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}
