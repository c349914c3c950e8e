use std::collections::HashMap;

use async_trait::async_trait;
use futures::{AsyncReadExt, TryStreamExt};
use mongodb::{
    bson::{doc, oid::ObjectId, Bson},
    gridfs::GridFsBucket,
    options::{GridFsBucketOptions, GridFsUploadOptions},
    Database,
};
use rocket::tokio::sync::RwLock;

use super::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    /// Full object name, `folder/filename`.
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Object storage for ingredient photos and generated recipe images.
#[async_trait]
pub trait ImageBucket: Send + Sync {
    /// Stores `bytes` under `folder/filename` and returns the object id.
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError>;

    async fn download(&self, id: &str) -> Result<StoredImage, StoreError>;
}

pub struct GridFsImages {
    bucket: GridFsBucket,
}

impl GridFsImages {
    pub fn new(database: &Database, bucket_name: &str) -> Self {
        let options = GridFsBucketOptions::builder()
            .bucket_name(bucket_name.to_string())
            .build();
        GridFsImages {
            bucket: database.gridfs_bucket(options),
        }
    }
}

#[async_trait]
impl ImageBucket for GridFsImages {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        let options = GridFsUploadOptions::builder()
            .metadata(doc! {"contentType": content_type})
            .build();
        let id = self
            .bucket
            .upload_from_futures_0_3_reader(
                format!("{folder}/{filename}"),
                bytes.as_slice(),
                options,
            )
            .await?;
        Ok(id.to_hex())
    }

    async fn download(&self, id: &str) -> Result<StoredImage, StoreError> {
        let oid = ObjectId::parse_str(id).map_err(|_| StoreError::NotFound)?;
        let mut files = self.bucket.find(doc! {"_id": oid}, None).await?;
        let file = files.try_next().await?.ok_or(StoreError::NotFound)?;
        let content_type = file
            .metadata
            .as_ref()
            .and_then(|m| m.get_str("contentType").ok())
            .map(str::to_string);
        let filename = file.filename.unwrap_or_default();

        let mut stream = self.bucket.open_download_stream(Bson::ObjectId(oid)).await?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;

        Ok(StoredImage {
            content_type: content_type.unwrap_or_else(|| guess_content_type(&filename)),
            filename,
            bytes,
        })
    }
}

fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[derive(Default)]
pub struct MemoryImages {
    objects: RwLock<HashMap<String, StoredImage>>,
}

#[async_trait]
impl ImageBucket for MemoryImages {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        let id = ObjectId::new().to_hex();
        let image = StoredImage {
            filename: format!("{folder}/{filename}"),
            content_type: content_type.to_string(),
            bytes,
        };
        self.objects.write().await.insert(id.clone(), image);
        Ok(id)
    }

    async fn download(&self, id: &str) -> Result<StoredImage, StoreError> {
        self.objects
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}
