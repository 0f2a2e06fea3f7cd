use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::ArenaConfig;
use crate::error::Result;
use crate::request::ExecutionPayload;
use crate::types::ExecutionResult;

/// Error reported to users when the execution service could not be reached
/// or answered with something unreadable.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Failed to execute code";

/// Something that can execute one payload and always produces a result.
#[async_trait]
pub trait ExecutionBackend: Send + Sync + 'static {
    async fn execute(&self, payload: &ExecutionPayload) -> ExecutionResult;
}

/// Client for the remote execution service.
///
/// One multipart `POST /execute` per call, no retries.
#[derive(Debug, Clone)]
pub struct RemoteExecutionClient {
    client: Client,
    execute_url: String,
}

/// Body returned by the service. Everything is optional: rejected uploads only
/// carry `detail`, compile failures carry no timing, and so on.
#[derive(Debug, Deserialize)]
struct ServiceResponse {
    language: Option<String>,
    output: Option<String>,
    success: Option<bool>,
    compilation_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bytes")]
    compilation_memory_bytes: Option<u64>,
    execution_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bytes")]
    execution_memory_bytes: Option<u64>,
    error: Option<String>,
    detail: Option<String>,
}

/// Memory figures are byte counts, but some runners report them as floats.
/// Anything that is not a non-negative number is dropped rather than failing
/// the whole response.
fn lenient_bytes<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| {
        value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|bytes| bytes.is_finite() && *bytes >= 0.0)
                .map(|bytes| bytes.round() as u64)
        })
    }))
}

impl RemoteExecutionClient {
    pub fn new(config: &ArenaConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            execute_url: config.execute_url(),
        })
    }

    pub fn execute_url(&self) -> &str {
        &self.execute_url
    }

    async fn send(&self, payload: &ExecutionPayload) -> Result<ExecutionResult> {
        let part = Part::bytes(payload.code.clone())
            .file_name(payload.filename.clone())
            .mime_str("text/plain")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.execute_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let parsed: ServiceResponse = serde_json::from_slice(&body)?;

        debug!(
            status = status.as_u16(),
            language = %payload.language,
            "Execution service responded"
        );

        Ok(normalize(parsed, payload, status))
    }
}

#[async_trait]
impl ExecutionBackend for RemoteExecutionClient {
    async fn execute(&self, payload: &ExecutionPayload) -> ExecutionResult {
        match self.send(payload).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    language = %payload.language,
                    url = %self.execute_url,
                    error = %e,
                    "Execution request failed"
                );
                transport_failure(payload)
            }
        }
    }
}

/// Result synthesized when the exchange itself failed.
pub fn transport_failure(payload: &ExecutionPayload) -> ExecutionResult {
    ExecutionResult::failure(payload.language.value(), TRANSPORT_FAILURE_MESSAGE)
}

fn normalize(
    response: ServiceResponse,
    payload: &ExecutionPayload,
    status: StatusCode,
) -> ExecutionResult {
    let mut error = response.error.or(response.detail);
    let success = match response.success {
        Some(success) => success,
        None if status.is_success() && error.is_none() => true,
        None => {
            // A failure decided here must say why
            error.get_or_insert_with(|| format!("Execution service returned HTTP {}", status));
            false
        }
    };

    let language = response
        .language
        .filter(|lang| !lang.is_empty())
        .unwrap_or_else(|| payload.language.value().to_string());

    ExecutionResult {
        language,
        output: response.output.unwrap_or_default(),
        success,
        compilation_time: response.compilation_time,
        compilation_memory_bytes: response.compilation_memory_bytes,
        execution_time: response.execution_time,
        execution_memory_bytes: response.execution_memory_bytes,
        error,
    }
}
