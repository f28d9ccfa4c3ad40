use anyhow::{anyhow, Result};
use aws_sdk_ssm as ssm;
use tracing::debug;

/// Reads configuration documents stored as SSM parameters.
pub struct SsmParameters {
    client: ssm::Client,
}

impl SsmParameters {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: ssm::Client::new(config),
        }
    }

    /// Fetch a parameter value, decrypting SecureString parameters.
    pub async fn get_parameter(&self, name: &str) -> Result<String> {
        let response = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "GetParameter {} failed: {}",
                    name,
                    ssm::error::DisplayErrorContext(&e)
                )
            })?;

        let value = response
            .parameter
            .and_then(|p| p.value)
            .ok_or_else(|| anyhow!("Parameter {} has no value", name))?;
        debug!("Read {} bytes from parameter {}", value.len(), name);
        Ok(value)
    }
}
