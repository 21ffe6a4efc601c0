use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// User-defined entry extending the built-in model catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomModel {
    pub id: String,
    pub owner: String,
    pub name: String,
    /// External API identifier, e.g. `mistralai/mixtral-8x7b-instruct`
    pub model_id: String,
    pub provider: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Editable fields of a custom model (used for both add and update)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomModelInput {
    pub name: String,
    pub model_id: String,
    pub provider: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CustomModelInput {
    pub fn new(
        name: impl Into<String>,
        model_id: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model_id: model_id.into(),
            provider: provider.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
