use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoThread;
use crate::error::Result;
use crate::models::{NewThread, ThreadPatch};

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("threads");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "owner": 1, "updated_at": -1 })
            .options(IndexOptions::builder().name("owner_recency".to_string()).build())
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }

    pub async fn create_thread(&self, owner: &str, new: NewThread) -> Result<MongoThread> {
        let now = bson::DateTime::now().to_chrono();
        let thread = MongoThread {
            id: ObjectId::new(),
            owner: owner.to_string(),
            title: new.title,
            system_prompt: new.system_prompt,
            created_at: now,
            updated_at: now,
        };

        self.collection.insert_one(&thread).await?;
        Ok(thread)
    }

    pub async fn get_thread(&self, thread_id: ObjectId) -> Result<Option<MongoThread>> {
        Ok(self.collection.find_one(doc! { "_id": thread_id }).await?)
    }

    /// Owner's threads, most recently updated first
    pub async fn list_threads(&self, owner: &str) -> Result<Vec<MongoThread>> {
        let threads = self
            .collection
            .find(doc! { "owner": owner })
            .sort(doc! { "updated_at": -1, "_id": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(threads)
    }

    /// Apply `patch` and set `updated_at`, returning the stored document
    pub async fn update_thread(
        &self,
        thread_id: ObjectId,
        owner: &str,
        patch: &ThreadPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<MongoThread>> {
        let mut set = Document::new();
        set.insert("updated_at", bson::DateTime::from_chrono(updated_at));
        if let Some(title) = &patch.title {
            set.insert("title", title.as_str());
        }
        if let Some(prompt) = &patch.system_prompt {
            set.insert("system_prompt", prompt.as_str());
        }

        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": thread_id, "owner": owner }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    pub async fn delete_thread(&self, thread_id: ObjectId, owner: &str) -> Result<()> {
        self.collection
            .delete_one(doc! { "_id": thread_id, "owner": owner })
            .await?;
        Ok(())
    }
}
