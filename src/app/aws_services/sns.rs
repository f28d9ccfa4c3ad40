use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_sns as sns;
use tracing::debug;

use super::Notifier;

pub struct SnsNotifier {
    client: sns::Client,
}

impl SnsNotifier {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: sns::Client::new(config),
        }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "Publish to {} failed: {}",
                    topic_arn,
                    sns::error::DisplayErrorContext(&e)
                )
            })?;
        debug!(
            "Published notification {:?} to {}",
            response.message_id, topic_arn
        );
        Ok(())
    }
}
