use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Database-agnostic thread model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub system_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a thread; the store assigns id and timestamps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
    pub title: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl NewThread {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Partial update. Every applied patch bumps `updated_at`, an empty patch only touches it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ThreadPatch {
    pub fn touch() -> Self {
        Self::default()
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            system_prompt: None,
        }
    }

    pub fn apply(&self, thread: &mut Thread) {
        if let Some(title) = &self.title {
            thread.title = title.clone();
        }
        if let Some(prompt) = &self.system_prompt {
            thread.system_prompt = Some(prompt.clone());
        }
    }
}
