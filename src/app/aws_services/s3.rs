use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use super::ObjectStore;

pub struct S3ObjectStore {
    client: s3::Client,
}

impl S3ObjectStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: s3::Client::new(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "PutObject s3://{}/{} failed: {}",
                    bucket,
                    key,
                    s3::error::DisplayErrorContext(&e)
                )
            })?;
        info!("Uploaded {} bytes to s3://{}/{}", size, bucket, key);
        Ok(())
    }
}
