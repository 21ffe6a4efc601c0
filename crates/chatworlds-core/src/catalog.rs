use serde::{Deserialize, Serialize};

use chatworlds_persist::CustomModel;

/// Display tier for the model picker. No access rules hang off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
    Enterprise,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier sent to the relay
    pub id: String,
    pub name: String,
    pub provider: String,
    pub description: String,
    /// `None` for user-defined entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub custom: bool,
}

impl ModelInfo {
    fn builtin(id: &str, name: &str, provider: &str, description: &str, tier: Tier) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            provider: provider.to_string(),
            description: description.to_string(),
            tier: Some(tier),
            custom: false,
        }
    }
}

impl From<&CustomModel> for ModelInfo {
    fn from(model: &CustomModel) -> Self {
        Self {
            id: model.model_id.clone(),
            name: model.name.clone(),
            provider: model.provider.clone(),
            description: model.description.clone().unwrap_or_default(),
            tier: None,
            custom: true,
        }
    }
}

pub fn builtin_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::builtin(
            "openai/gpt-4-turbo",
            "GPT-4 Turbo",
            "OpenAI",
            "Most capable model for complex tasks",
            Tier::Premium,
        ),
        ModelInfo::builtin(
            "anthropic/claude-3-opus",
            "Claude 3 Opus",
            "Anthropic",
            "Top reasoning and creative writing",
            Tier::Premium,
        ),
        ModelInfo::builtin(
            "anthropic/claude-3-sonnet",
            "Claude 3 Sonnet",
            "Anthropic",
            "Balanced model for reasoning and creativity",
            Tier::Premium,
        ),
        ModelInfo::builtin(
            "openai/gpt-3.5-turbo",
            "GPT-3.5 Turbo",
            "OpenAI",
            "Fast and efficient for most tasks",
            Tier::Free,
        ),
        ModelInfo::builtin(
            "google/gemini-pro-1.5",
            "Gemini Pro 1.5",
            "Google",
            "Google's advanced language model",
            Tier::Premium,
        ),
        ModelInfo::builtin(
            "meta-llama/llama-3.3-70b-instruct",
            "Llama 3.3 70B Instruct",
            "Meta",
            "Latest open-source model with strong capabilities",
            Tier::Free,
        ),
    ]
}

/// Built-in models followed by the owner's custom entries
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self {
            models: builtin_models(),
        }
    }

    /// Custom entries whose id shadows a built-in are skipped
    pub fn with_custom(custom: &[CustomModel]) -> Self {
        let mut catalog = Self::new();
        for model in custom {
            if catalog.find(&model.model_id).is_none() {
                catalog.models.push(ModelInfo::from(model));
            }
        }
        catalog
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn into_models(self) -> Vec<ModelInfo> {
        self.models
    }

    pub fn find(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}
