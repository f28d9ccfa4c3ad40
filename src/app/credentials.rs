//! STS role assumption and per-account SDK configuration.

use anyhow::{anyhow, Context, Result};
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_types::region::Region;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::config::AccountConfig;

/// Session name used for every assumed role.
pub const ROLE_SESSION_NAME: &str = "quicksight";

const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Temporary credentials for one account/role pair, obtained through STS.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account_id: String,
    pub role_name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

impl AccountCredentials {
    /// Check if credentials are expired or will expire within the next 5 minutes
    pub fn is_expired(&self) -> bool {
        let now = Utc::now();
        let buffer = chrono::Duration::minutes(5);
        now + buffer >= self.expiration
    }

    /// Create AWS SDK Credentials from this account's credentials
    pub fn to_aws_credentials(&self) -> Credentials {
        Credentials::from_keys(
            &self.access_key_id,
            &self.secret_access_key,
            Some(self.session_token.clone()),
        )
    }
}

pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}

/// SDK max attempts, from `AWS_MAX_ATTEMPTS` when set and valid.
pub fn max_attempts_from_env() -> u32 {
    std::env::var("AWS_MAX_ATTEMPTS")
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_ATTEMPTS)
}

/// Hands out SDK configs for the accounts a run touches, assuming roles
/// through STS from the ambient credentials and caching the results.
#[derive(Debug, Clone)]
pub struct CredentialCoordinator {
    /// Cache of credentials per role ARN
    credential_cache: Arc<RwLock<HashMap<String, AccountCredentials>>>,
    /// Region used for the STS client
    home_region: String,
    max_attempts: u32,
}

impl CredentialCoordinator {
    pub fn new(home_region: impl Into<String>) -> Self {
        Self {
            credential_cache: Arc::new(RwLock::new(HashMap::new())),
            home_region: home_region.into(),
            max_attempts: max_attempts_from_env(),
        }
    }

    /// Config built from the default provider chain.
    pub async fn ambient_config(&self, region: &str) -> aws_config::SdkConfig {
        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::standard().with_max_attempts(self.max_attempts))
            .load()
            .await
    }

    /// Get or request credentials for a role in an account
    pub async fn get_credentials_for_account(
        &self,
        account_id: &str,
        role_name: &str,
    ) -> Result<AccountCredentials> {
        let arn = role_arn(account_id, role_name);

        if let Some(cached_creds) = self.get_cached_credentials(&arn).await {
            if !cached_creds.is_expired() {
                debug!("Using cached credentials for {}", arn);
                return Ok(cached_creds);
            }
            debug!("Cached credentials for {} are expired, assuming role again", arn);
        }

        let fresh_creds = self
            .assume_role(account_id, role_name)
            .await
            .with_context(|| format!("Failed to assume role {}", arn))?;

        self.cache_credentials(&arn, &fresh_creds).await;
        Ok(fresh_creds)
    }

    async fn get_cached_credentials(&self, role_arn: &str) -> Option<AccountCredentials> {
        let cache = self.credential_cache.read().await;
        cache.get(role_arn).cloned()
    }

    async fn cache_credentials(&self, role_arn: &str, credentials: &AccountCredentials) {
        let mut cache = self.credential_cache.write().await;
        cache.insert(role_arn.to_string(), credentials.clone());
        debug!(
            "Cached credentials for {} until {}",
            role_arn, credentials.expiration
        );
    }

    async fn assume_role(&self, account_id: &str, role_name: &str) -> Result<AccountCredentials> {
        let arn = role_arn(account_id, role_name);
        info!("Assuming role {}", arn);

        let base_config = self.ambient_config(&self.home_region).await;
        let sts = aws_sdk_sts::Client::new(&base_config);
        let response = sts
            .assume_role()
            .role_arn(&arn)
            .role_session_name(ROLE_SESSION_NAME)
            .send()
            .await
            .map_err(|e| anyhow!("{}", aws_sdk_sts::error::DisplayErrorContext(&e)))?;

        let creds = response
            .credentials
            .ok_or_else(|| anyhow!("AssumeRole returned no credentials for {}", arn))?;
        let expiration = DateTime::<Utc>::from_timestamp(creds.expiration.secs(), 0)
            .ok_or_else(|| anyhow!("AssumeRole returned an invalid expiration for {}", arn))?;

        Ok(AccountCredentials {
            account_id: account_id.to_string(),
            role_name: role_name.to_string(),
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_access_key,
            session_token: creds.session_token,
            expiration,
        })
    }

    /// Create an AWS SDK config for an account.
    ///
    /// With a role name the role is assumed through STS; without one the
    /// ambient credentials are used as-is.
    pub async fn create_aws_config_for_account(
        &self,
        account_id: &str,
        role_name: Option<&str>,
        region: &str,
    ) -> Result<aws_config::SdkConfig> {
        let Some(role_name) = role_name else {
            debug!(
                "Using ambient credentials for account {} in region {}",
                account_id, region
            );
            return Ok(self.ambient_config(region).await);
        };

        let creds = self.get_credentials_for_account(account_id, role_name).await?;

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(creds.to_aws_credentials())
            .retry_config(RetryConfig::standard().with_max_attempts(self.max_attempts))
            .load()
            .await;

        debug!(
            "Created AWS config for account {} in region {} using role {}",
            account_id, region, role_name
        );
        Ok(config)
    }

    pub async fn config_for(&self, account: &AccountConfig) -> Result<aws_config::SdkConfig> {
        self.create_aws_config_for_account(
            &account.account_id,
            account.role_name.as_deref(),
            &account.region,
        )
        .await
        .with_context(|| {
            format!(
                "Failed to create AWS config for account {} in region {}",
                account.account_id, account.region
            )
        })
    }

    /// Account id of the ambient credentials.
    pub async fn caller_account_id(&self) -> Result<String> {
        let config = self.ambient_config(&self.home_region).await;
        let sts = aws_sdk_sts::Client::new(&config);
        let identity = sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| anyhow!("{}", aws_sdk_sts::error::DisplayErrorContext(&e)))?;
        identity
            .account
            .ok_or_else(|| anyhow!("GetCallerIdentity returned no account"))
    }

    /// Clear expired credentials from cache
    pub async fn cleanup_expired_credentials(&self) -> usize {
        let mut cache = self.credential_cache.write().await;
        let initial_count = cache.len();

        cache.retain(|role_arn, creds| {
            let expired = creds.is_expired();
            if expired {
                debug!("Removing expired credentials for {}", role_arn);
            }
            !expired
        });

        let removed_count = initial_count - cache.len();
        if removed_count > 0 {
            info!("Cleaned up {} expired credential entries", removed_count);
        }

        removed_count
    }

    #[cfg(test)]
    async fn insert_for_test(&self, credentials: AccountCredentials) {
        let arn = role_arn(&credentials.account_id, &credentials.role_name);
        self.cache_credentials(&arn, &credentials).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(account_id: &str, expires_in_minutes: i64) -> AccountCredentials {
        AccountCredentials {
            account_id: account_id.to_string(),
            role_name: "Migrator".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
            expiration: Utc::now() + chrono::Duration::minutes(expires_in_minutes),
        }
    }

    #[test]
    fn test_expiry_buffer() {
        assert!(!creds("1", 60).is_expired());
        assert!(creds("1", 4).is_expired());
        assert!(creds("1", -1).is_expired());
    }

    #[test]
    fn test_role_arn() {
        assert_eq!(
            role_arn("123456789012", "QuickSightMigration"),
            "arn:aws:iam::123456789012:role/QuickSightMigration"
        );
    }

    #[tokio::test]
    async fn test_cached_credentials_are_reused() {
        let coordinator = CredentialCoordinator::new("us-east-1");
        coordinator.insert_for_test(creds("111", 60)).await;

        let found = coordinator
            .get_credentials_for_account("111", "Migrator")
            .await
            .unwrap();
        assert_eq!(found.access_key_id, "AKIDEXAMPLE");
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let coordinator = CredentialCoordinator::new("us-east-1");
        coordinator.insert_for_test(creds("111", 60)).await;
        coordinator.insert_for_test(creds("222", 1)).await;

        assert_eq!(coordinator.cleanup_expired_credentials().await, 1);
        assert_eq!(coordinator.cleanup_expired_credentials().await, 0);
    }
}
