use crate::constants::{keys, limits, text};
use crate::context::history::{now_millis, strip_image_marker, ChatMessage, Conversation};
use crate::error::StorageError;
use crate::prefs::{map_string, Edit, PrefMap, PreferenceStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A persisted, named snapshot of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    /// Creation time, milliseconds since the epoch.
    pub timestamp: i64,
    pub messages: Vec<ChatMessage>,
    pub model_used: String,
}

impl ChatSession {
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
    }

    pub fn conversation(&self) -> Conversation {
        Conversation::from_messages(self.messages.iter().cloned())
    }
}

pub fn encode_session(session: &ChatSession) -> Result<String, StorageError> {
    Ok(serde_json::to_string(session)?)
}

/// Decode a stored session record. Any shape mismatch is reported as
/// [`StorageError::Malformed`]; callers treat that as "record absent".
pub fn decode_session(key: &str, payload: &str) -> Result<ChatSession, StorageError> {
    serde_json::from_str(payload).map_err(|e| StorageError::malformed(key, e))
}

/// Title for a conversation, derived from its first user message.
pub fn derive_title(conversation: &Conversation) -> String {
    match conversation.first_user_message() {
        Some(message) => title_from_text(&message.text),
        None => text::NEW_CHAT_TITLE.to_string(),
    }
}

pub fn title_from_text(raw: &str) -> String {
    let cleaned = strip_image_marker(raw);
    let len = cleaned.chars().count();

    if len == 0 {
        return text::NEW_CHAT_TITLE.to_string();
    }
    if len < text::TITLE_MIN_CHARS {
        return text::SHORT_CHAT_TITLE.to_string();
    }

    let title = if len > text::TITLE_MAX_CHARS {
        let head: String = cleaned.chars().take(text::TITLE_TRUNCATE_CHARS).collect();
        format!("{head}...")
    } else {
        cleaned
    };

    capitalize_first(&title)
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => s.to_string(),
    }
}

/// The stored id list. A malformed `chat_list` reads as empty, so the next
/// save starts a fresh index and the records it named are no longer
/// reachable through the store.
fn decode_index(map: &PrefMap) -> Vec<String> {
    parse_index(map_string(map, keys::CHAT_LIST))
}

fn parse_index(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed chat index: {}", e);
        Vec::new()
    })
}

fn encode_index(ids: &[String]) -> String {
    // Vec<String> serialization cannot fail.
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Bounded, most-recent-first catalog of saved sessions.
///
/// Each session lives under its own key; the ordered id list lives under
/// `chat_list`. Every mutation is one [`PreferenceStore::update`], so the
/// index and the records it points at always change together.
#[derive(Clone)]
pub struct HistoryStore {
    prefs: Arc<dyn PreferenceStore>,
    max_sessions: usize,
}

impl HistoryStore {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            prefs,
            max_sessions: limits::MAX_HISTORY_SESSIONS,
        }
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max.max(1);
        self
    }

    /// Snapshot `conversation` as a new session.
    ///
    /// Returns `None` without touching the store when the conversation is
    /// empty. Saving the same conversation twice yields two sessions.
    pub fn save(
        &self,
        conversation: &Conversation,
        model_id: &str,
    ) -> Result<Option<String>, StorageError> {
        if conversation.is_empty() {
            return Ok(None);
        }

        let title = derive_title(conversation);
        let messages = conversation.to_vec();
        let created = now_millis();
        let mut saved_id = None;
        let mut encode_error = None;

        self.prefs.update(&mut |map: &PrefMap| {
            let id = mint_id(map, created);
            let session = ChatSession {
                id: id.clone(),
                title: title.clone(),
                timestamp: created,
                messages: messages.clone(),
                model_used: model_id.to_string(),
            };
            let payload = match encode_session(&session) {
                Ok(payload) => payload,
                Err(e) => {
                    encode_error = Some(e);
                    return Edit::new();
                }
            };

            let mut index = decode_index(map);
            index.insert(0, id.clone());

            let mut edit = Edit::new().put_string(id.clone(), payload);
            while index.len() > self.max_sessions {
                if let Some(evicted) = index.pop() {
                    tracing::info!("Evicting oldest chat session {}", evicted);
                    edit = edit.remove(evicted);
                }
            }

            saved_id = Some(id);
            edit.put_string(keys::CHAT_LIST, encode_index(&index))
        })?;

        if let Some(e) = encode_error {
            return Err(e);
        }
        Ok(saved_id)
    }

    /// Session ids, most recent first.
    pub fn ids(&self) -> Vec<String> {
        parse_index(self.prefs.get_string(keys::CHAT_LIST).as_deref())
    }

    /// Every readable session in index order. Ids whose record is missing or
    /// malformed are skipped.
    pub fn list(&self) -> Vec<ChatSession> {
        self.ids().iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn get(&self, id: &str) -> Option<ChatSession> {
        let payload = self.prefs.get_string(id)?;
        match decode_session(id, &payload) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Skipping unreadable chat session: {}", e);
                None
            }
        }
    }

    /// Case-insensitive match on session titles.
    pub fn search(&self, query: &str) -> Vec<ChatSession> {
        let query_lower = query.to_lowercase();
        self.list()
            .into_iter()
            .filter(|s| s.title.to_lowercase().contains(&query_lower))
            .collect()
    }

    /// Remove a session and its index entry. Unknown ids are ignored, and
    /// keys that hold anything other than a session record are never touched.
    pub fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.prefs.update(&mut |map: &PrefMap| {
            let mut index = decode_index(map);
            let before = index.len();
            index.retain(|existing| existing != id);
            let indexed = index.len() != before;

            let is_session = map_string(map, id)
                .is_some_and(|payload| decode_session(id, payload).is_ok());

            let mut edit = Edit::new();
            if map.contains_key(id) && (indexed || is_session) {
                edit = edit.remove(id);
            }
            if indexed {
                edit = edit.put_string(keys::CHAT_LIST, encode_index(&index));
            }
            edit
        })
    }

    /// Remove every indexed session and the index itself.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.prefs.update(&mut |map: &PrefMap| {
            decode_index(map)
                .into_iter()
                .fold(Edit::new(), |edit, id| edit.remove(id))
                .remove(keys::CHAT_LIST)
        })
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }
}

/// `chat_<millis>`, bumped forward until it names a free key.
fn mint_id(map: &PrefMap, millis: i64) -> String {
    let mut stamp = millis;
    loop {
        let id = format!("{}{}", keys::CHAT_ID_PREFIX, stamp);
        if !map.contains_key(&id) {
            return id;
        }
        stamp += 1;
    }
}

/// Crash-recovery copy of the live conversation, kept apart from history.
#[derive(Clone)]
pub struct ConversationCheckpoint {
    prefs: Arc<dyn PreferenceStore>,
}

impl ConversationCheckpoint {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    /// Persist the trailing messages of `conversation`. The selected model
    /// is a setting and is left alone.
    pub fn save(&self, conversation: &Conversation) -> Result<(), StorageError> {
        let tail: Vec<&ChatMessage> = conversation.tail(limits::CHECKPOINT_MESSAGES).collect();
        let payload = serde_json::to_string(&tail)?;
        self.prefs.apply(Edit::new().put_string(keys::MESSAGES, payload))
    }

    /// The last checkpointed conversation; empty when nothing usable is stored.
    pub fn load(&self) -> Conversation {
        let Some(raw) = self.prefs.get_string(keys::MESSAGES) else {
            return Conversation::new();
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => {
                let skip = messages.len().saturating_sub(limits::CHECKPOINT_MESSAGES);
                Conversation::from_messages(messages.into_iter().skip(skip))
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed conversation checkpoint: {}", e);
                Conversation::new()
            }
        }
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.prefs.apply(Edit::new().remove(keys::MESSAGES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferences;

    fn conversation_with(first: &str) -> Conversation {
        Conversation::from_messages([
            ChatMessage::user(first),
            ChatMessage::assistant("Sure, here you go."),
        ])
    }

    #[test]
    fn test_title_short_message_uses_fallback() {
        assert_eq!(title_from_text("hi"), "AI Assistant");
        assert_eq!(title_from_text("🖼️ hi"), "AI Assistant");
    }

    #[test]
    fn test_title_truncates_long_message() {
        let title = title_from_text("  Explain quantum computing please  ");
        assert_eq!(title, "Explain quantum computing p...");
        assert_eq!(title.chars().count(), 30);
    }

    #[test]
    fn test_title_capitalizes_first_char() {
        assert_eq!(title_from_text("tell me a story"), "Tell me a story");
        assert_eq!(title_from_text("exactly thirty characters long"), "Exactly thirty characters long");
    }

    #[test]
    fn test_title_without_user_message() {
        let conversation = Conversation::from_messages([ChatMessage::assistant("hello there friend")]);
        assert_eq!(derive_title(&conversation), "New Chat");
    }

    #[test]
    fn test_title_counts_chars_not_bytes() {
        let title = title_from_text("ééééééééééééééééééééééééééééééééééé");
        assert_eq!(title.chars().count(), 30);
        assert!(title.starts_with('É'));
    }

    #[test]
    fn test_title_is_deterministic() {
        let conversation = conversation_with("how do lifetimes work in rust?");
        assert_eq!(derive_title(&conversation), derive_title(&conversation));
    }

    #[test]
    fn test_session_codec_round_trip() {
        let mut with_image =
            ChatMessage::user_with_image("look", Some("file:///a.png".into()), Some("QUJD".into()));
        with_image.timestamp = 42;
        let session = ChatSession {
            id: "chat_1".into(),
            title: "Look".into(),
            timestamp: 1_700_000_000_000,
            messages: vec![with_image, ChatMessage::assistant("A cat.")],
            model_used: "google/gemma-3-4b-it:free".into(),
        };

        let payload = encode_session(&session).unwrap();
        assert!(payload.contains("\"modelUsed\""));
        let decoded = decode_session("chat_1", &payload).unwrap();
        assert_eq!(decoded, session);
    }

    #[test]
    fn test_decode_malformed_is_error() {
        let err = decode_session("chat_9", r#"{"id": 5}"#).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { ref key, .. } if key == "chat_9"));
    }

    #[test]
    fn test_save_empty_conversation_is_noop() {
        let prefs = Arc::new(MemoryPreferences::new());
        let store = HistoryStore::new(prefs.clone());

        assert_eq!(store.save(&Conversation::new(), "m").unwrap(), None);
        assert!(prefs.is_empty());
    }

    #[test]
    fn test_mint_id_skips_taken_keys() {
        let mut map = PrefMap::new();
        map.insert("chat_10".into(), crate::prefs::PrefValue::String("{}".into()));
        map.insert("chat_11".into(), crate::prefs::PrefValue::String("{}".into()));
        assert_eq!(mint_id(&map, 10), "chat_12");
        assert_eq!(mint_id(&map, 5), "chat_5");
    }

    #[test]
    fn test_checkpoint_keeps_last_fifty() {
        let prefs = Arc::new(MemoryPreferences::new());
        let checkpoint = ConversationCheckpoint::new(prefs.clone());
        let conversation =
            Conversation::from_messages((0..80).map(|i| ChatMessage::user(format!("m{i}"))));

        checkpoint.save(&conversation).unwrap();
        let restored = checkpoint.load();

        assert_eq!(restored.len(), 50);
        assert_eq!(restored.messages().next().unwrap().text, "m30");
    }

    #[test]
    fn test_checkpoint_leaves_selected_model_alone() {
        let prefs = Arc::new(MemoryPreferences::new());
        prefs
            .apply(Edit::new().put_string(keys::SELECTED_MODEL, "openai/gpt-oss-20b:free"))
            .unwrap();

        ConversationCheckpoint::new(prefs.clone())
            .save(&conversation_with("hello"))
            .unwrap();

        assert_eq!(
            prefs.get_string(keys::SELECTED_MODEL).as_deref(),
            Some("openai/gpt-oss-20b:free")
        );
        assert!(prefs.contains(keys::MESSAGES));
    }

    #[test]
    fn test_checkpoint_malformed_loads_empty() {
        let prefs = Arc::new(MemoryPreferences::new());
        prefs
            .apply(Edit::new().put_string(keys::MESSAGES, "not json"))
            .unwrap();
        assert!(ConversationCheckpoint::new(prefs).load().is_empty());
    }
}
