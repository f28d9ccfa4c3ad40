use anyhow::{anyhow, Context, Result};
use aws_sdk_secretsmanager as secretsmanager;
use serde::Deserialize;

use crate::app::quicksight::CredentialPairInput;

/// Database credentials stored as a JSON secret.
#[derive(Deserialize)]
struct SecretCredentials {
    username: String,
    password: String,
}

pub fn parse_credential_secret(secret: &str) -> Result<CredentialPairInput> {
    let parsed: SecretCredentials = serde_json::from_str(secret)
        .context("secret is not a JSON object with username and password")?;
    Ok(CredentialPairInput {
        username: parsed.username,
        password: parsed.password,
    })
}

pub struct SecretsManagerStore {
    client: secretsmanager::Client,
}

impl SecretsManagerStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: secretsmanager::Client::new(config),
        }
    }

    pub async fn get_credential_pair(&self, secret_id: &str) -> Result<CredentialPairInput> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "GetSecretValue {} failed: {}",
                    secret_id,
                    secretsmanager::error::DisplayErrorContext(&e)
                )
            })?;

        let secret = response
            .secret_string
            .ok_or_else(|| anyhow!("Secret {} has no string value", secret_id))?;
        parse_credential_secret(&secret).with_context(|| format!("Invalid secret {}", secret_id))
    }
}
