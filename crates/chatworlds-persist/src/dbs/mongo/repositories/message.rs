use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "thread_id": 1, "created_at": 1 })
            .options(IndexOptions::builder().name("thread_order".to_string()).build())
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }

    pub async fn save_message(&self, message: &MongoMessage) -> Result<()> {
        self.collection.insert_one(message).await?;
        Ok(())
    }

    /// Thread messages, oldest first. `_id` breaks timestamp ties in insert order.
    pub async fn get_messages(&self, thread_id: ObjectId) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "thread_id": thread_id })
            .sort(doc! { "created_at": 1, "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn latest_message(&self, thread_id: ObjectId) -> Result<Option<MongoMessage>> {
        Ok(self
            .collection
            .find_one(doc! { "thread_id": thread_id })
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?)
    }

    pub async fn delete_thread_messages(&self, thread_id: ObjectId) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "thread_id": thread_id })
            .await?;
        Ok(result.deleted_count)
    }
}
