use crate::constants::{limits, text};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One entry of a conversation, as shown to the user and as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub text: String,
    pub is_user: bool,
    #[serde(default)]
    pub has_image: bool,
    /// Session-local handle to the source image; may not resolve after a restart.
    #[serde(default, alias = "imageUri", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Base64 JPEG kept so the image outlives `image_ref`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            has_image: false,
            image_ref: None,
            image_data: None,
            timestamp: now_millis(),
        }
    }

    /// A user message carrying an image. The text gets the image marker
    /// prefix; at least one of `image_ref` / `image_data` should be set.
    pub fn user_with_image(
        text: &str,
        image_ref: Option<String>,
        image_data: Option<String>,
    ) -> Self {
        Self {
            text: format!("{}{}", text::IMAGE_MARKER, text),
            is_user: true,
            has_image: true,
            image_ref,
            image_data,
            timestamp: now_millis(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            has_image: false,
            image_ref: None,
            image_data: None,
            timestamp: now_millis(),
        }
    }

    pub fn role(&self) -> &'static str {
        if self.is_user {
            "user"
        } else {
            "assistant"
        }
    }

    /// Text with the image marker removed and surrounding whitespace trimmed.
    pub fn clean_text(&self) -> String {
        strip_image_marker(&self.text)
    }
}

/// Drop every image marker and trim.
pub fn strip_image_marker(text: &str) -> String {
    text.replace(text::IMAGE_MARKER, "").trim().to_string()
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The live, in-progress message list. Appending beyond the cap drops the
/// oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: VecDeque<ChatMessage>,
    max_messages: usize,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages: limits::MAX_CONVERSATION_MESSAGES,
        }
    }

    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max.max(1);
        self.trim_if_needed();
        self
    }

    pub fn from_messages(messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        let mut conversation = Self::new();
        conversation.extend(messages);
        conversation
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        self.trim_if_needed();
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        for message in messages {
            self.push(message);
        }
    }

    pub fn messages(&self) -> impl DoubleEndedIterator<Item = &ChatMessage> + ExactSizeIterator {
        self.messages.iter()
    }

    /// The trailing `n` messages, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().skip(self.messages.len().saturating_sub(n))
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn first_user_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.is_user)
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn trim_if_needed(&mut self) {
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_beyond_cap_drops_oldest() {
        let mut conversation = Conversation::new();
        for i in 0..150 {
            conversation.push(ChatMessage::user(format!("message {i}")));
        }

        assert_eq!(conversation.len(), 100);
        assert_eq!(conversation.messages().next().unwrap().text, "message 50");
        assert_eq!(conversation.last_message().unwrap().text, "message 149");
    }

    #[test]
    fn test_tail_returns_trailing_in_order() {
        let conversation =
            Conversation::from_messages((0..5).map(|i| ChatMessage::assistant(i.to_string())));
        let tail: Vec<_> = conversation.tail(2).map(|m| m.text.as_str()).collect();
        assert_eq!(tail, vec!["3", "4"]);

        assert_eq!(conversation.tail(50).count(), 5);
    }

    #[test]
    fn test_user_with_image_prefixes_marker() {
        let msg = ChatMessage::user_with_image("what is this?", Some("/tmp/a.png".into()), None);
        assert!(msg.has_image);
        assert!(msg.text.starts_with(text::IMAGE_MARKER));
        assert_eq!(msg.clean_text(), "what is this?");
    }

    #[test]
    fn test_image_uri_alias_is_accepted() {
        let json = r#"{"text":"hi","isUser":true,"hasImage":true,"imageUri":"content://x","timestamp":7}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.image_ref.as_deref(), Some("content://x"));
        assert_eq!(msg.timestamp, 7);
    }
}
