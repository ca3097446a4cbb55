pub mod attachment;
pub mod chat;
pub mod config;
pub mod constants;
pub mod context;
pub mod enhance;
pub mod error;
pub mod llm;
pub mod prefs;

// Re-export key types
pub use attachment::{encode_image, encode_image_async, EncodedImage, ImageSource};
pub use chat::{Chat, TurnOutcome};
pub use config::{AppConfig, Settings};
pub use context::{
    derive_title, ChatMessage, ChatSession, Conversation, ConversationCheckpoint, HistoryStore,
    MessageBuilder,
};
pub use enhance::{display_text, enhance, extract_code_blocks};
pub use error::{ApiError, ChatError, EncodingError, Result, StorageError, ValidationError};
pub use llm::{
    ApiMessage, Completion, CompletionClient, ContentPart, ModelCatalog, ModelDescriptor,
    OpenRouterClient, RequestConfig, Role,
};
pub use prefs::{Edit, FilePreferences, MemoryPreferences, PreferenceStore};
