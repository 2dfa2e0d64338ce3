use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;

use crate::sops::ObjectLocation;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new_with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .context("Failed to get object from S3")?;

        let body = resp
            .body
            .collect()
            .await
            .context("Failed to read S3 object body")?;

        Ok(body.into_bytes().to_vec())
    }
}
