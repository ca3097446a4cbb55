mod builder;
pub mod history;
pub mod persistence;

pub use builder::{BuiltMessages, MessageBuilder};
pub use history::{strip_image_marker, ChatMessage, Conversation};
pub use persistence::{
    decode_session, derive_title, encode_session, title_from_text, ChatSession,
    ConversationCheckpoint, HistoryStore,
};
