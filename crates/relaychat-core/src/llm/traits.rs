use crate::constants::text;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
}

/// One block of a multi-part message body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// A message in the shape the completion endpoint expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ApiMessage {
    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn assistant(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn has_image(&self) -> bool {
        self.content
            .iter()
            .any(|part| matches!(part, ContentPart::ImageUrl { .. }))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ApiMessage],
}

/// Credentials and model for one request. Passed per call so a settings
/// change never affects a request already in flight.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub api_key: String,
    pub model: String,
}

impl RequestConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// A successful exchange with the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Reply(String),
    /// The endpoint answered but carried no usable content.
    NoResponse,
}

impl Completion {
    /// Text to show as the assistant's message.
    pub fn display_text(&self) -> &str {
        match self {
            Completion::Reply(text) => text,
            Completion::NoResponse => text::NO_RESPONSE,
        }
    }

    pub fn into_reply(self) -> Option<String> {
        match self {
            Completion::Reply(text) => Some(text),
            Completion::NoResponse => None,
        }
    }
}

/// Issues exactly one completion request per call; no retries.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        config: &RequestConfig,
        messages: &[ApiMessage],
    ) -> Result<Completion, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_part_wire_shape() {
        let message = ApiMessage::user(vec![
            ContentPart::image_url("data:image/jpeg;base64,AAAA"),
            ContentPart::text("what is this?"),
        ]);
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "image_url");
        assert_eq!(json["content"][0]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
        assert_eq!(json["content"][1]["type"], "text");
        assert_eq!(json["content"][1]["text"], "what is this?");
        assert!(json["content"][1].get("image_url").is_none());
    }

    #[test]
    fn test_request_config_debug_hides_key() {
        let config = RequestConfig::new("sk-or-secret", "openai/gpt-oss-20b:free");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-or-secret"));
        assert!(debug.contains("openai/gpt-oss-20b:free"));
    }

    #[test]
    fn test_no_response_display_text() {
        assert_eq!(Completion::NoResponse.display_text(), "No response received");
        assert_eq!(Completion::Reply("hi".into()).display_text(), "hi");
    }
}
