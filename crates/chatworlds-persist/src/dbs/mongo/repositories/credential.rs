use mongodb::bson::{self, doc};
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoCredential;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoCredentialRepository {
    collection: Collection<MongoCredential>,
}

impl MongoCredentialRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("credentials");
        Self { collection }
    }

    pub async fn get(&self, owner: &str) -> Result<Option<MongoCredential>> {
        Ok(self.collection.find_one(doc! { "_id": owner }).await?)
    }

    pub async fn upsert(&self, owner: &str, api_key: &str) -> Result<MongoCredential> {
        let updated_at = bson::DateTime::now().to_chrono();
        let update = doc! {
            "$set": {
                "api_key": api_key,
                "updated_at": bson::DateTime::from_chrono(updated_at),
            }
        };
        self.collection
            .update_one(doc! { "_id": owner }, update)
            .upsert(true)
            .await?;

        Ok(MongoCredential {
            owner: owner.to_string(),
            api_key: api_key.to_string(),
            updated_at,
        })
    }
}
