use crate::attachment::EncodedImage;
use crate::constants::limits;
use crate::context::history::Conversation;
use crate::error::EncodingError;
use crate::llm::{ApiMessage, ContentPart, Role};

/// Outbound message list plus anything that went wrong on the side.
#[derive(Debug)]
pub struct BuiltMessages {
    pub messages: Vec<ApiMessage>,
    /// Set when an image was attached but could not be encoded; the request
    /// still goes out without it.
    pub image_error: Option<EncodingError>,
}

/// Turns the live conversation plus the current input into the request body.
///
/// The conversation is expected to already contain the entry for the
/// current turn; that entry is left out of the history window and re-sent
/// in full (with its image) as the final message.
pub struct MessageBuilder<'a> {
    conversation: &'a Conversation,
    text: String,
    image: Option<Result<EncodedImage, EncodingError>>,
    window: usize,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(conversation: &'a Conversation) -> Self {
        Self {
            conversation,
            text: String::new(),
            image: None,
            window: limits::REQUEST_HISTORY_WINDOW,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Attach the outcome of encoding the pending image.
    pub fn with_image(mut self, image: Result<EncodedImage, EncodingError>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn build(self) -> BuiltMessages {
        let mut messages = self.history();

        let mut current = Vec::new();
        let mut image_error = None;
        match self.image {
            Some(Ok(image)) => current.push(ContentPart::image_url(image.data_url())),
            Some(Err(e)) => {
                tracing::warn!("Sending without image: {}", e);
                image_error = Some(e);
            }
            None => {}
        }

        let text = self.text.trim();
        if !text.is_empty() {
            current.push(ContentPart::text(text));
        }
        if !current.is_empty() {
            messages.push(ApiMessage::user(current));
        }

        tracing::debug!("Built {} outbound messages", messages.len());
        BuiltMessages {
            messages,
            image_error,
        }
    }

    fn history(&self) -> Vec<ApiMessage> {
        let window: Vec<_> = self.conversation.tail(self.window).collect();
        let prior = &window[..window.len().saturating_sub(1)];

        prior
            .iter()
            .filter_map(|message| {
                let cleaned = message.clean_text();
                if cleaned.is_empty() {
                    return None;
                }
                let role = if message.is_user {
                    Role::User
                } else {
                    Role::Assistant
                };
                Some(ApiMessage {
                    role,
                    content: vec![ContentPart::text(cleaned)],
                })
            })
            .collect()
    }
}
