use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use serde_json::Value;

use super::{
    AiError, AiOutcome, AnalysisRequest, GenerateContentRequest, GenerateContentResponse,
    interpret, truncate_value,
};
use crate::config::AiOptions;

/// Transport for `generateContent` calls.
pub trait GenerationBackend: Send + Sync + 'static {
    fn generate(
        &self,
        api_key: &str,
        body: &GenerateContentRequest,
    ) -> impl Future<Output = Result<GenerateContentResponse, AiError>> + Send;
}

/// HTTPS backend for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn new(options: &AiOptions) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|err| AiError::Http(err.without_url()))?;
        let url = format!(
            "{}/models/{}:generateContent",
            options.endpoint.trim_end_matches('/'),
            options.model
        );
        Ok(Self { client, url })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl GenerationBackend for HttpBackend {
    async fn generate(
        &self,
        api_key: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, AiError> {
        debug!(url = %self.url, "sending generateContent request");
        // strip the URL from errors; it carries the key as a query parameter
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await
            .map_err(|err| AiError::Http(err.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response
            .text()
            .await
            .map_err(|err| AiError::Http(err.without_url()))?;
        let value: Value =
            serde_json::from_str(&text).map_err(|err| AiError::MalformedResponse {
                reason: err.to_string(),
                response: Some(truncate_value(&Value::String(text.clone()))),
            })?;
        GenerateContentResponse::from_value(value)
    }
}

/// One request/response round trip, without timeout or cancellation.
pub async fn analyze<B: GenerationBackend>(
    backend: &B,
    api_key: &str,
    request: &AnalysisRequest,
) -> Result<AiOutcome, AiError> {
    let body = GenerateContentRequest::from_request(request);
    let response = backend.generate(api_key, &body).await?;
    let outcome = interpret(response.first_text()?);
    match &outcome {
        AiOutcome::Structured { assessment, .. } => {
            info!(score = assessment.intensity_score, "AI analysis complete");
        }
        AiOutcome::FreeText { parse_error, .. } => {
            warn!(error = %parse_error, "AI reply had no usable assessment; keeping free text");
        }
    }
    Ok(outcome)
}

/// Run [`analyze`] as a task bounded by `timeout` and `cancel`.
///
/// A missing key resolves immediately to [`AiError::MissingCredential`].
pub fn spawn_analysis<B: GenerationBackend>(
    backend: Arc<B>,
    api_key: Option<String>,
    request: AnalysisRequest,
    timeout: Duration,
    cancel: CancellationToken,
) -> JoinHandle<Result<AiOutcome, AiError>> {
    tokio::spawn(async move {
        let Some(api_key) = api_key else {
            return Err(AiError::MissingCredential);
        };
        select! {
            _ = cancel.cancelled() => Err(AiError::Cancelled),
            res = tokio::time::timeout(timeout, analyze(backend.as_ref(), &api_key, &request)) => {
                res.unwrap_or(Err(AiError::Timeout(timeout)))
            }
        }
    })
}
