use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use chatworlds_llm::ApiKey;

/// The caller's OpenRouter key. At most one per owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub owner: String,
    pub api_key: ApiKey,
    pub updated_at: DateTime<Utc>,
}
