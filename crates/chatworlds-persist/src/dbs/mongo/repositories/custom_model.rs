use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoCustomModel;
use crate::error::Result;
use crate::models::CustomModelInput;

#[derive(Clone)]
pub struct MongoCustomModelRepository {
    collection: Collection<MongoCustomModel>,
}

impl MongoCustomModelRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("custom_models");
        Self { collection }
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<MongoCustomModel>> {
        let models = self
            .collection
            .find(doc! { "owner": owner })
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(models)
    }

    pub async fn create(&self, owner: &str, input: CustomModelInput) -> Result<MongoCustomModel> {
        let model = MongoCustomModel {
            id: ObjectId::new(),
            owner: owner.to_string(),
            name: input.name,
            model_id: input.model_id,
            provider: input.provider,
            description: input.description,
            created_at: bson::DateTime::now().to_chrono(),
        };
        self.collection.insert_one(&model).await?;
        Ok(model)
    }

    pub async fn update(
        &self,
        id: ObjectId,
        owner: &str,
        input: CustomModelInput,
    ) -> Result<Option<MongoCustomModel>> {
        let update = doc! {
            "$set": {
                "name": input.name,
                "model_id": input.model_id,
                "provider": input.provider,
                "description": input.description,
            }
        };
        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": id, "owner": owner }, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: ObjectId, owner: &str) -> Result<()> {
        self.collection
            .delete_one(doc! { "_id": id, "owner": owner })
            .await?;
        Ok(())
    }
}
