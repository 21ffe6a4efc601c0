use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use chatworlds_llm::ApiKey;

use crate::models::{Credential, CustomModel, Message, MessageRole, Thread};

/// MongoDB-specific Thread document (uses ObjectId)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub owner: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub thread_id: ObjectId,
    pub owner: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCustomModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub owner: String,
    pub name: String,
    pub model_id: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// One document per owner, keyed by the owner id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCredential {
    #[serde(rename = "_id")]
    pub owner: String,
    pub api_key: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<MongoThread> for Thread {
    fn from(thread: MongoThread) -> Self {
        Self {
            id: thread.id.to_hex(),
            owner: thread.owner,
            title: thread.title,
            system_prompt: thread.system_prompt,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id.to_hex(),
            thread_id: msg.thread_id.to_hex(),
            role: msg.role,
            content: msg.content,
            model_id: msg.model_id,
            created_at: msg.created_at,
        }
    }
}

impl From<MongoCustomModel> for CustomModel {
    fn from(model: MongoCustomModel) -> Self {
        Self {
            id: model.id.to_hex(),
            owner: model.owner,
            name: model.name,
            model_id: model.model_id,
            provider: model.provider,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

impl From<MongoCredential> for Credential {
    fn from(credential: MongoCredential) -> Self {
        Self {
            owner: credential.owner,
            api_key: ApiKey::new(credential.api_key),
            updated_at: credential.updated_at,
        }
    }
}
