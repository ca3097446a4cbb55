use crate::constants::endpoints;
use crate::error::ApiError;
use crate::llm::traits::*;
use serde::Deserialize;
use std::time::Duration;

/// Client for an OpenRouter-compatible `/chat/completions` endpoint.
///
/// Holds only immutable transport settings; the key and model arrive with
/// every call through [`RequestConfig`].
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    referer: String,
    app_title: String,
}

impl OpenRouterClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(endpoints::DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: endpoints::OPENROUTER_BASE_URL.to_string(),
            referer: endpoints::DEFAULT_REFERER.to_string(),
            app_title: endpoints::DEFAULT_APP_TITLE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Identification headers sent with every request.
    pub fn with_identity(mut self, referer: impl Into<String>, app_title: impl Into<String>) -> Self {
        self.referer = referer.into();
        self.app_title = app_title.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}{}", self.base_url, endpoints::CHAT_COMPLETIONS_PATH)
    }
}

impl Default for OpenRouterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Interpret a 2xx body. Anything without non-blank text in the first
/// choice is [`Completion::NoResponse`].
pub fn interpret_success_body(body: &str) -> Completion {
    let parsed: CompletionResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Unparseable completion response: {}", e);
            return Completion::NoResponse;
        }
    };

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .map(Completion::Reply)
        .unwrap_or(Completion::NoResponse)
}

#[async_trait::async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(
        &self,
        config: &RequestConfig,
        messages: &[ApiMessage],
    ) -> Result<Completion, ApiError> {
        let url = self.completions_url();
        let request_body = ChatRequest {
            model: &config.model,
            messages,
        };

        tracing::debug!(
            model = %config.model,
            messages = messages.len(),
            has_image = messages.iter().any(ApiMessage::has_image),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", self.referer.as_str())
            .header("X-Title", self.app_title.as_str())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Completion request failed: {}", e);
                ApiError::ConnectionFailed
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Completion endpoint returned {}", status);
            return Err(ApiError::from_status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            tracing::warn!("Failed to read completion body: {}", e);
            ApiError::ConnectionFailed
        })?;

        Ok(interpret_success_body(&body))
    }
}
