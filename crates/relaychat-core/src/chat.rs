use crate::attachment::{encode_image_async, ImageSource};
use crate::constants::limits;
use crate::context::{ChatSession, Conversation, ConversationCheckpoint, HistoryStore, MessageBuilder};
use crate::context::history::ChatMessage;
use crate::error::{ApiError, ChatError, EncodingError, StorageError, ValidationError};
use crate::llm::{Completion, CompletionClient, RequestConfig};
use std::future::Future;
use std::sync::Arc;

/// What one submitted turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    /// The assistant message appended to the conversation.
    pub reply: ChatMessage,
    pub response: Result<Completion, ApiError>,
    /// Present when the attached image could not be encoded and the turn
    /// went out as text only.
    pub image_error: Option<EncodingError>,
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        self.response.is_ok()
    }
}

/// The live chat: conversation, pending image and the completion client.
///
/// All mutation goes through `&mut self`, so a turn's user message and its
/// reply are always adjacent.
pub struct Chat {
    client: Arc<dyn CompletionClient>,
    conversation: Conversation,
    pending_image: Option<ImageSource>,
    model_used: Option<String>,
}

impl Chat {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            conversation: Conversation::new(),
            pending_image: None,
            model_used: None,
        }
    }

    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = conversation;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Model of the most recent request or loaded session.
    pub fn model_used(&self) -> Option<&str> {
        self.model_used.as_deref()
    }

    pub fn attach_image(&mut self, source: impl Into<ImageSource>) {
        self.pending_image = Some(source.into());
    }

    pub fn clear_image(&mut self) {
        self.pending_image = None;
    }

    pub fn pending_image(&self) -> Option<&ImageSource> {
        self.pending_image.as_ref()
    }

    pub async fn submit(&mut self, input: &str, config: &RequestConfig) -> Result<TurnOutcome, ChatError> {
        self.submit_until(input, config, std::future::pending::<()>())
            .await
    }

    /// Like [`Chat::submit`], but gives up as soon as `cancel` resolves.
    ///
    /// A cancelled turn keeps its user message and gets no reply.
    pub async fn submit_until<F>(
        &mut self,
        input: &str,
        config: &RequestConfig,
        cancel: F,
    ) -> Result<TurnOutcome, ChatError>
    where
        F: Future<Output = ()>,
    {
        let text = input.trim();
        if text.is_empty() && self.pending_image.is_none() {
            return Err(ValidationError::Empty.into());
        }
        let len = text.chars().count();
        if len > limits::MAX_INPUT_CHARS {
            return Err(ValidationError::TooLong {
                len,
                max: limits::MAX_INPUT_CHARS,
            }
            .into());
        }

        let mut builder_image = None;
        let user_message = match self.pending_image.take() {
            Some(source) => {
                let image_ref = source.reference();
                let encoded = encode_image_async(source).await;
                let image_data = encoded.as_ref().ok().map(|image| image.base64.clone());
                builder_image = Some(encoded);
                if image_ref.is_none() && image_data.is_none() {
                    // Nothing left that could show the image later.
                    ChatMessage::user(text)
                } else {
                    ChatMessage::user_with_image(text, image_ref, image_data)
                }
            }
            None => ChatMessage::user(text),
        };
        self.conversation.push(user_message);

        let mut builder = MessageBuilder::new(&self.conversation).with_text(text);
        if let Some(image) = builder_image {
            builder = builder.with_image(image);
        }
        let built = builder.build();

        let response = tokio::select! {
            response = self.client.complete(config, &built.messages) => response,
            _ = cancel => {
                tracing::info!("Completion request cancelled");
                return Err(ChatError::Cancelled);
            }
        };

        let reply_text = match &response {
            Ok(completion) => completion.display_text().to_string(),
            Err(e) => {
                tracing::warn!("Completion failed: {}", e);
                e.to_string()
            }
        };
        let reply = ChatMessage::assistant(reply_text);
        self.conversation.push(reply.clone());
        self.model_used = Some(config.model.clone());

        Ok(TurnOutcome {
            reply,
            response,
            image_error: built.image_error,
        })
    }

    pub fn checkpoint(&self, checkpoint: &ConversationCheckpoint) -> Result<(), StorageError> {
        checkpoint.save(&self.conversation)
    }

    /// Put the current conversation into history and start over.
    /// The conversation is left untouched if saving fails.
    pub fn start_new(
        &mut self,
        history: &HistoryStore,
        model_id: &str,
    ) -> Result<Option<String>, StorageError> {
        let saved = history.save(&self.conversation, model_id)?;
        self.conversation.clear();
        self.pending_image = None;
        Ok(saved)
    }

    /// Replace the live conversation with a saved session.
    pub fn load_session(&mut self, session: ChatSession) {
        tracing::debug!("Loading chat session {} ({} messages)", session.id, session.messages.len());
        self.conversation = Conversation::from_messages(session.messages);
        self.model_used = Some(session.model_used);
        self.pending_image = None;
    }

    /// Replace the live conversation with the last checkpoint.
    pub fn restore(&mut self, checkpoint: &ConversationCheckpoint) {
        self.conversation = checkpoint.load();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ApiMessage;
    use crate::prefs::{MemoryPreferences, PreferenceStore};
    use std::sync::Mutex;

    struct ScriptedClient {
        response: Result<Completion, ApiError>,
        seen: Mutex<Vec<Vec<ApiMessage>>>,
    }

    impl ScriptedClient {
        fn new(response: Result<Completion, ApiError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            _config: &RequestConfig,
            messages: &[ApiMessage],
        ) -> Result<Completion, ApiError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.response.clone()
        }
    }

    struct HangingClient;

    #[async_trait::async_trait]
    impl CompletionClient for HangingClient {
        async fn complete(
            &self,
            _config: &RequestConfig,
            _messages: &[ApiMessage],
        ) -> Result<Completion, ApiError> {
            std::future::pending().await
        }
    }

    fn config() -> RequestConfig {
        RequestConfig::new("sk-test", "openai/gpt-oss-20b:free")
    }

    #[tokio::test]
    async fn test_submit_appends_user_and_reply() {
        let client = ScriptedClient::new(Ok(Completion::Reply("Hello!".into())));
        let mut chat = Chat::new(client.clone());

        let outcome = chat.submit("  hi there  ", &config()).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.reply.text, "Hello!");

        let texts: Vec<_> = chat.conversation().messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hi there", "Hello!"]);
        assert_eq!(chat.model_used(), Some("openai/gpt-oss-20b:free"));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_too_long_input_rejected() {
        let client = ScriptedClient::new(Ok(Completion::NoResponse));
        let mut chat = Chat::new(client.clone());

        let err = chat.submit("   ", &config()).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(ValidationError::Empty)));

        let long = "x".repeat(limits::MAX_INPUT_CHARS + 1);
        let err = chat.submit(&long, &config()).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(ValidationError::TooLong { .. })));

        assert!(chat.conversation().is_empty());
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_error_becomes_reply_text() {
        let client = ScriptedClient::new(Err(ApiError::RateLimited));
        let mut chat = Chat::new(client);

        let outcome = chat.submit("hello", &config()).await.unwrap();
        assert_eq!(outcome.reply.text, "Rate limit exceeded. Please wait.");
        assert_eq!(outcome.response, Err(ApiError::RateLimited));
        assert_eq!(chat.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_no_response_sentinel() {
        let mut chat = Chat::new(ScriptedClient::new(Ok(Completion::NoResponse)));
        let outcome = chat.submit("hello", &config()).await.unwrap();
        assert_eq!(outcome.reply.text, "No response received");
    }

    #[tokio::test]
    async fn test_bad_image_is_sent_as_text_and_cleared() {
        let client = ScriptedClient::new(Ok(Completion::Reply("ok".into())));
        let mut chat = Chat::new(client.clone());
        chat.attach_image(b"not an image".to_vec());

        let outcome = chat.submit("what is this", &config()).await.unwrap();
        assert!(matches!(outcome.image_error, Some(EncodingError::Decode(_))));
        assert!(chat.pending_image().is_none());

        let user = chat.conversation().messages().next().unwrap();
        assert!(!user.has_image);
        assert_eq!(user.text, "what is this");

        let seen = client.seen.lock().unwrap();
        assert!(!seen[0][0].has_image());
    }

    #[tokio::test]
    async fn test_cancel_leaves_user_message_only() {
        let mut chat = Chat::new(Arc::new(HangingClient));
        let err = chat
            .submit_until("hello", &config(), async {})
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Cancelled));
        assert_eq!(chat.conversation().len(), 1);
        assert!(chat.conversation().last_message().unwrap().is_user);
    }

    #[tokio::test]
    async fn test_start_new_saves_and_clears() {
        let prefs = Arc::new(MemoryPreferences::new());
        let history = HistoryStore::new(prefs);
        let mut chat = Chat::new(ScriptedClient::new(Ok(Completion::Reply("Sure".into()))));
        chat.submit("tell me about rust lifetimes", &config()).await.unwrap();

        let id = chat.start_new(&history, "m").unwrap().unwrap();
        assert!(chat.conversation().is_empty());

        let session = history.get(&id).unwrap();
        assert_eq!(session.title, "Tell me about rust lifetimes");
        chat.load_session(session);
        assert_eq!(chat.conversation().len(), 2);
        assert_eq!(chat.model_used(), Some("m"));

        assert_eq!(Chat::new(Arc::new(HangingClient)).start_new(&history, "m").unwrap(), None);
    }

    #[tokio::test]
    async fn test_checkpoint_and_restore() {
        let prefs = Arc::new(MemoryPreferences::new());
        let checkpoint = ConversationCheckpoint::new(prefs);
        let mut chat = Chat::new(ScriptedClient::new(Ok(Completion::Reply("pong".into()))));
        chat.submit("ping", &config()).await.unwrap();
        chat.checkpoint(&checkpoint).unwrap();

        let mut fresh = Chat::new(Arc::new(HangingClient));
        fresh.restore(&checkpoint);
        assert_eq!(fresh.conversation(), chat.conversation());
    }

    #[tokio::test]
    async fn test_checkpoint_does_not_persist_request_model() {
        let prefs = Arc::new(MemoryPreferences::new());
        let checkpoint = ConversationCheckpoint::new(prefs.clone());
        let mut chat = Chat::new(ScriptedClient::new(Ok(Completion::Reply("pong".into()))));

        let request = RequestConfig::new("sk-test", "override/model");
        chat.submit("ping", &request).await.unwrap();
        chat.checkpoint(&checkpoint).unwrap();

        assert_eq!(chat.model_used(), Some("override/model"));
        assert!(prefs.get_string(crate::constants::keys::SELECTED_MODEL).is_none());
    }
}
