use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{FindOptions, ReplaceOptions},
    Client, Collection, Database,
};

use super::{DocumentStore, StoreError};

/// MongoDB-backed store. Records keep their own `id` field; it is mirrored
/// into `_id` on write and stripped again on read.
pub struct MongoRep {
    database: Database,
}

impl MongoRep {
    pub async fn init(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        Ok(MongoRep {
            database: client.database(database),
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

fn strip_id(mut doc: Document) -> Document {
    doc.remove("_id");
    doc
}

#[async_trait]
impl DocumentStore for MongoRep {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        match self
            .collection(collection)
            .find_one(doc! {"_id": id}, None)
            .await?
        {
            Some(doc) => Ok(strip_id(doc)),
            None => Err(StoreError::NotFound),
        }
    }

    async fn put(&self, collection: &str, id: &str, mut doc: Document) -> Result<(), StoreError> {
        doc.insert("_id", id);
        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection(collection)
            .replace_one(doc! {"_id": id}, doc, options)
            .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let result = self
            .collection(collection)
            .update_one(doc! {"_id": id}, doc! {"$set": fields}, None)
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
    ) -> Result<Vec<Document>, StoreError> {
        let mut filter = Document::new();
        filter.insert(field, value);
        let cursor = self.collection(collection).find(filter, None).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(strip_id).collect())
    }

    async fn list(
        &self,
        collection: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        let options = FindOptions::builder().limit(limit).build();
        let cursor = self.collection(collection).find(doc! {}, options).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(strip_id).collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = self
            .collection(collection)
            .delete_one(doc! {"_id": id}, None)
            .await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_repo(database: &str) -> MongoRep {
        MongoRep::init("mongodb://localhost:27017/", database)
            .await
            .unwrap()
    }

    #[rocket::async_test]
    #[ignore = "needs a mongod on localhost:27017"]
    async fn test_put_get_delete_against_local_mongo() {
        let rep = init_repo("smart_recipe_test").await;
        rep.put("probe", "p1", doc! {"id": "p1", "name": "apple"})
            .await
            .unwrap();
        let fetched = rep.get("probe", "p1").await.unwrap();
        assert_eq!(fetched.get_str("name").unwrap(), "apple");
        assert!(fetched.get("_id").is_none());
        rep.delete("probe", "p1").await.unwrap();
        assert!(matches!(
            rep.get("probe", "p1").await,
            Err(StoreError::NotFound)
        ));
    }

    #[rocket::async_test]
    #[ignore = "needs a mongod on localhost:27017"]
    async fn test_update_unknown_id_is_not_found() {
        let rep = init_repo("smart_recipe_test").await;
        let err = rep
            .update("probe", "missing", doc! {"name": "pear"})
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
