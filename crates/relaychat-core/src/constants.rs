/// RelayChat — centralized constants.
/// All magic numbers, strings, and limits live here.
/// Never hardcode these values elsewhere.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    /// Model selected on first launch (first image+chat model in the catalog).
    pub const DEFAULT_MODEL: &str = "mistralai/mistral-small-3.2-24b-instruct:free";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
    pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
    pub const DEFAULT_REFERER: &str = "https://relaychat.dev";
    pub const DEFAULT_APP_TITLE: &str = "RelayChat";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
}

// ─── Conversation Limits ──────────────────────────────────────────────────────

pub mod limits {
    /// Live conversation length before the oldest message is dropped.
    pub const MAX_CONVERSATION_MESSAGES: usize = 100;
    /// Messages written to (and read back from) the crash-recovery checkpoint.
    pub const CHECKPOINT_MESSAGES: usize = 50;
    /// Sessions retained in the history index.
    pub const MAX_HISTORY_SESSIONS: usize = 50;
    /// Trailing conversation entries considered for the request window.
    pub const REQUEST_HISTORY_WINDOW: usize = 20;
    pub const MAX_INPUT_CHARS: usize = 4000;

    pub const MAX_IMAGE_DIMENSION: u32 = 1024;
    pub const JPEG_QUALITY: u8 = 90;
    pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;
}

// ─── Titles & Markers ─────────────────────────────────────────────────────────

pub mod text {
    /// Prefix put on user messages that carried an image.
    pub const IMAGE_MARKER: &str = "🖼️ ";
    pub const NEW_CHAT_TITLE: &str = "New Chat";
    pub const SHORT_CHAT_TITLE: &str = "AI Assistant";
    pub const TITLE_MIN_CHARS: usize = 10;
    pub const TITLE_MAX_CHARS: usize = 30;
    pub const TITLE_TRUNCATE_CHARS: usize = 27;
    pub const NO_RESPONSE: &str = "No response received";
    /// Placeholder shipped in sample configs; never a usable key.
    pub const API_KEY_PLACEHOLDER: &str = "YOUR_REAL_OPENROUTER_API_KEY_HERE";
}

// ─── Preference Keys ──────────────────────────────────────────────────────────

pub mod keys {
    pub const CHAT_LIST: &str = "chat_list";
    pub const MESSAGES: &str = "messages";
    pub const SELECTED_MODEL: &str = "selected_model";
    pub const CUSTOM_MODELS: &str = "custom_models";
    pub const CHAT_BACKGROUND: &str = "chat_background";
    pub const CUSTOM_CHAT_BACKGROUND: &str = "custom_chat_background";
    pub const API_KEY: &str = "api_key";
    pub const THEME_MODE: &str = "theme_mode";
    pub const FIRST_LAUNCH: &str = "first_launch";

    /// Prefix of every session id (and so every session record key).
    pub const CHAT_ID_PREFIX: &str = "chat_";
}

// ─── Settings Defaults ────────────────────────────────────────────────────────

pub mod defaults {
    pub const CHAT_BACKGROUND: &str = "default";
    pub const CUSTOM_BACKGROUND: &str = "custom";
    pub const THEME_MODE: &str = "system";
    pub const BACKGROUND_PRESETS: &[&str] = &[
        "default",
        "gradient_blue",
        "gradient_purple",
        "gradient_green",
        "dark_pattern",
        "neural_network",
    ];
}

// ─── Config Paths ─────────────────────────────────────────────────────────────

pub mod paths {
    pub const CONFIG_DIR: &str = "relaychat";
    pub const CONFIG_FILE: &str = "config.toml";
    pub const PREFERENCES_FILE: &str = "preferences.json";
}
