use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{defaults, endpoints, keys, models, paths, text};
use crate::error::{ChatError, StorageError, ValidationError};
use crate::llm::{OpenRouterClient, RequestConfig};
use crate::prefs::{Edit, FilePreferences, PreferenceStore};

/// Application config, read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub referer: String,
    pub app_title: String,
    /// Environment variable consulted when no key is stored in preferences.
    pub api_key_env: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: endpoints::OPENROUTER_BASE_URL.to_string(),
            timeout_secs: endpoints::DEFAULT_TIMEOUT_SECS,
            referer: endpoints::DEFAULT_REFERER.to_string(),
            app_title: endpoints::DEFAULT_APP_TITLE.to_string(),
            api_key_env: endpoints::DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Where `preferences.json` lives. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(paths::CONFIG_DIR)
            .join(paths::CONFIG_FILE)
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Missing or unreadable files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), ChatError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ChatError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::from)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ChatError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(StorageError::from)?;
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        match &self.storage.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(paths::CONFIG_DIR),
        }
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir().join(paths::PREFERENCES_FILE)
    }

    pub fn open_preferences(&self) -> Result<Arc<FilePreferences>, StorageError> {
        Ok(Arc::new(FilePreferences::open(self.preferences_path())?))
    }

    pub fn build_client(&self) -> OpenRouterClient {
        OpenRouterClient::with_timeout(Duration::from_secs(self.api.timeout_secs))
            .with_base_url(&self.api.base_url)
            .with_identity(&self.api.referer, &self.api.app_title)
    }

    /// The key from the configured environment variable, if usable.
    pub fn env_api_key(&self) -> Option<String> {
        std::env::var(&self.api.api_key_env)
            .ok()
            .and_then(|key| usable_key(&key))
    }
}

fn usable_key(key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() || key == text::API_KEY_PLACEHOLDER {
        None
    } else {
        Some(key.to_string())
    }
}

/// Typed access to user settings kept in the preference store.
#[derive(Clone)]
pub struct Settings {
    prefs: Arc<dyn PreferenceStore>,
    fallback_api_key: Option<String>,
}

impl Settings {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            prefs,
            fallback_api_key: None,
        }
    }

    /// Key to use when none is stored, typically from the environment.
    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        self.fallback_api_key = key.as_deref().and_then(usable_key);
        self
    }

    pub fn prefs(&self) -> &Arc<dyn PreferenceStore> {
        &self.prefs
    }

    /// Stored key, else the fallback. Blank values and the sample
    /// placeholder count as unset.
    pub fn api_key(&self) -> Option<String> {
        self.prefs
            .get_string(keys::API_KEY)
            .and_then(|key| usable_key(&key))
            .or_else(|| self.fallback_api_key.clone())
    }

    pub fn set_api_key(&self, key: &str) -> Result<(), StorageError> {
        self.prefs
            .apply(Edit::new().put_string(keys::API_KEY, key.trim()))
    }

    pub fn selected_model(&self) -> String {
        self.prefs
            .get_string(keys::SELECTED_MODEL)
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| models::DEFAULT_MODEL.to_string())
    }

    pub fn set_selected_model(&self, model_id: &str) -> Result<(), StorageError> {
        self.prefs
            .apply(Edit::new().put_string(keys::SELECTED_MODEL, model_id))
    }

    pub fn chat_background(&self) -> String {
        self.prefs
            .get_string(keys::CHAT_BACKGROUND)
            .unwrap_or_else(|| defaults::CHAT_BACKGROUND.to_string())
    }

    /// Choose a preset. Any custom background is forgotten.
    pub fn set_chat_background(&self, preset: &str) -> Result<(), ChatError> {
        if !defaults::BACKGROUND_PRESETS.contains(&preset) {
            return Err(ValidationError::UnknownBackground(preset.to_string()).into());
        }
        self.prefs.apply(
            Edit::new()
                .put_string(keys::CHAT_BACKGROUND, preset)
                .remove(keys::CUSTOM_CHAT_BACKGROUND),
        )?;
        Ok(())
    }

    pub fn set_custom_chat_background(&self, image_ref: &str) -> Result<(), StorageError> {
        self.prefs.apply(
            Edit::new()
                .put_string(keys::CUSTOM_CHAT_BACKGROUND, image_ref)
                .put_string(keys::CHAT_BACKGROUND, defaults::CUSTOM_BACKGROUND),
        )
    }

    pub fn custom_chat_background(&self) -> Option<String> {
        self.prefs.get_string(keys::CUSTOM_CHAT_BACKGROUND)
    }

    pub fn reset_background(&self) -> Result<(), StorageError> {
        self.prefs.apply(
            Edit::new()
                .put_string(keys::CHAT_BACKGROUND, defaults::CHAT_BACKGROUND)
                .remove(keys::CUSTOM_CHAT_BACKGROUND),
        )
    }

    pub fn theme_mode(&self) -> String {
        self.prefs
            .get_string(keys::THEME_MODE)
            .unwrap_or_else(|| defaults::THEME_MODE.to_string())
    }

    pub fn set_theme_mode(&self, mode: &str) -> Result<(), StorageError> {
        self.prefs
            .apply(Edit::new().put_string(keys::THEME_MODE, mode))
    }

    pub fn is_first_launch(&self) -> bool {
        self.prefs.get_bool(keys::FIRST_LAUNCH).unwrap_or(true)
    }

    pub fn complete_first_launch(&self) -> Result<(), StorageError> {
        self.prefs
            .apply(Edit::new().put_bool(keys::FIRST_LAUNCH, false))
    }

    /// Wipe every stored setting, history and checkpoint included.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.prefs.apply(Edit::new().clear())
    }

    /// Snapshot of key and model for one request.
    pub fn request_config(&self) -> Result<RequestConfig, ValidationError> {
        let api_key = self.api_key().ok_or(ValidationError::MissingApiKey)?;
        Ok(RequestConfig::new(api_key, self.selected_model()))
    }
}
