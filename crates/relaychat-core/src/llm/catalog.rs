use crate::constants::keys;
use crate::error::{StorageError, ValidationError};
use crate::prefs::{Edit, PreferenceStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub supports_images: bool,
}

impl ModelDescriptor {
    pub fn custom(name: impl Into<String>, id: impl Into<String>, supports_images: bool) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            is_default: false,
            supports_images,
        }
    }

    fn builtin(name: &str, id: &str, supports_images: bool) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            is_default: true,
            supports_images,
        }
    }
}

// (display name, id)
const IMAGE_MODELS: &[(&str, &str)] = &[
    ("Mistral Small 3.2 24B", "mistralai/mistral-small-3.2-24b-instruct:free"),
    ("Kimi VL A3B Thinking", "moonshotai/kimi-vl-a3b-thinking:free"),
    ("Llama 4 Maverick", "meta-llama/llama-4-maverick:free"),
    ("Llama 4 Scout", "meta-llama/llama-4-scout:free"),
    ("Qwen2.5 VL 32B", "qwen/qwen2.5-vl-32b-instruct:free"),
    ("Mistral Small 3.1 24B", "mistralai/mistral-small-3.1-24b-instruct:free"),
    ("Gemma 3 4B IT", "google/gemma-3-4b-it:free"),
    ("Gemma 3 12B IT", "google/gemma-3-12b-it:free"),
    ("Gemma 3 27B IT", "google/gemma-3-27b-it:free"),
    ("Qwen2.5 VL 72B", "qwen/qwen2.5-vl-72b-instruct:free"),
    ("Gemini 2.0 Flash", "google/gemini-2.0-flash-exp:free"),
];

const CHAT_MODELS: &[(&str, &str)] = &[
    ("Tongyi DeepResearch 30B", "alibaba/tongyi-deepresearch-30b-a3b:free"),
    ("Longcat Flash Chat", "meituan/longcat-flash-chat:free"),
    ("Nemotron Nano 9B V2", "nvidia/nemotron-nano-9b-v2:free"),
    ("DeepSeek Chat V3.1", "deepseek/deepseek-chat-v3.1:free"),
    ("GPT OSS 20B", "openai/gpt-oss-20b:free"),
    ("GLM 4.5 Air", "z-ai/glm-4.5-air:free"),
    ("Qwen3 Coder", "qwen/qwen3-coder:free"),
    ("Kimi K2", "moonshotai/kimi-k2:free"),
    ("Dolphin Mistral 24B Venice", "cognitivecomputations/dolphin-mistral-24b-venice-edition:free"),
    ("Gemma 3N E2B IT", "google/gemma-3n-e2b-it:free"),
    ("Hunyuan A13B", "tencent/hunyuan-a13b-instruct:free"),
    ("DeepSeek R1T2 Chimera", "tngtech/deepseek-r1t2-chimera:free"),
    ("Kimi Dev 72B", "moonshotai/kimi-dev-72b:free"),
    ("DeepSeek R1 Qwen3 8B", "deepseek/deepseek-r1-0528-qwen3-8b:free"),
    ("DeepSeek R1 0528", "deepseek/deepseek-r1-0528:free"),
    ("Devstral Small 2505", "mistralai/devstral-small-2505:free"),
    ("Gemma 3N E4B IT", "google/gemma-3n-e4b-it:free"),
    ("Llama 3.3 8B", "meta-llama/llama-3.3-8b-instruct:free"),
    ("Qwen3 4B", "qwen/qwen3-4b:free"),
    ("Qwen3 30B A3B", "qwen/qwen3-30b-a3b:free"),
    ("Qwen3 8B", "qwen/qwen3-8b:free"),
    ("Qwen3 14B", "qwen/qwen3-14b:free"),
    ("Qwen3 235B A22B", "qwen/qwen3-235b-a22b:free"),
    ("DeepSeek R1T Chimera", "tngtech/deepseek-r1t-chimera:free"),
    ("MAI DS R1", "microsoft/mai-ds-r1:free"),
    ("Shisa V2 Llama3.3 70B", "shisa-ai/shisa-v2-llama3.3-70b:free"),
    ("QwQ 32B ArliAI RPR V1", "arliai/qwq-32b-arliai-rpr-v1:free"),
    ("DeepCoder 14B Preview", "agentica-org/deepcoder-14b-preview:free"),
];

/// The built-in catalog: image-capable models first, then chat-only ones.
pub fn default_models() -> Vec<ModelDescriptor> {
    IMAGE_MODELS
        .iter()
        .map(|(name, id)| ModelDescriptor::builtin(name, id, true))
        .chain(
            CHAT_MODELS
                .iter()
                .map(|(name, id)| ModelDescriptor::builtin(name, id, false)),
        )
        .collect()
}

pub fn is_default_model(id: &str) -> bool {
    IMAGE_MODELS
        .iter()
        .chain(CHAT_MODELS.iter())
        .any(|(_, default_id)| *default_id == id)
}

/// Built-in models merged with user-added ones. Only user entries are
/// persisted, under `custom_models`.
#[derive(Clone)]
pub struct ModelCatalog {
    prefs: Arc<dyn PreferenceStore>,
}

impl ModelCatalog {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    /// User entries as stored, minus anything that collides with a
    /// built-in id. Malformed storage reads as no entries.
    pub fn custom_models(&self) -> Vec<ModelDescriptor> {
        let Some(raw) = self.prefs.get_string(keys::CUSTOM_MODELS) else {
            return Vec::new();
        };
        let stored: Vec<ModelDescriptor> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Ignoring malformed custom models: {}", e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        stored
            .into_iter()
            .filter(|m| !is_default_model(&m.id) && seen.insert(m.id.clone()))
            .map(|m| ModelDescriptor {
                is_default: false,
                ..m
            })
            .collect()
    }

    pub fn all(&self) -> Vec<ModelDescriptor> {
        let mut models = default_models();
        models.extend(self.custom_models());
        models
    }

    pub fn find(&self, id: &str) -> Option<ModelDescriptor> {
        self.all().into_iter().find(|m| m.id == id)
    }

    pub fn supports_images(&self, id: &str) -> bool {
        self.find(id).is_some_and(|m| m.supports_images)
    }

    pub fn add_custom(&self, model: ModelDescriptor) -> crate::error::Result<()> {
        let name = model.name.trim();
        let id = model.id.trim();
        if name.is_empty() || id.is_empty() {
            return Err(ValidationError::InvalidModel.into());
        }
        if self.find(id).is_some() {
            return Err(ValidationError::DuplicateModel(id.to_string()).into());
        }

        let mut custom = self.custom_models();
        custom.push(ModelDescriptor::custom(name, id, model.supports_images));
        self.persist(&custom)?;
        Ok(())
    }

    pub fn remove_custom(&self, id: &str) -> crate::error::Result<()> {
        if is_default_model(id) {
            return Err(ValidationError::DefaultModelImmutable(id.to_string()).into());
        }

        let mut custom = self.custom_models();
        let before = custom.len();
        custom.retain(|m| m.id != id);
        if custom.len() == before {
            return Err(ValidationError::UnknownModel(id.to_string()).into());
        }
        self.persist(&custom)?;
        Ok(())
    }

    fn persist(&self, models: &[ModelDescriptor]) -> Result<(), StorageError> {
        let user_models: Vec<&ModelDescriptor> = models.iter().filter(|m| !m.is_default).collect();
        let payload = serde_json::to_string(&user_models)?;
        self.prefs
            .apply(Edit::new().put_string(keys::CUSTOM_MODELS, payload))
    }
}
