//! Dashboard embedding for users signed in through Cognito.
//!
//! Dashboards live in one region while QuickSight identities may live in
//! another, so the service holds one client per role. Readers who have never
//! opened the dashboard are registered on the fly.

pub mod server;
pub mod token;

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::app::config::EmbedConfig;
use crate::app::quicksight::{arn, QuickSightApi};
use token::EmbedClaims;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedSettings {
    pub dashboard_id: String,
    pub identity_region: String,
    pub namespace: String,
    pub reader_group: Option<String>,
    pub session_lifetime_minutes: i64,
    pub register_missing_users: bool,
}

impl EmbedSettings {
    /// `fallback_region` stands in for an unset identity region.
    pub fn from_config(config: &EmbedConfig, fallback_region: &str) -> Self {
        Self {
            dashboard_id: config.dashboard_id.clone(),
            identity_region: config
                .identity_region
                .clone()
                .or_else(|| config.region.clone())
                .unwrap_or_else(|| fallback_region.to_string()),
            namespace: config.namespace.clone(),
            reader_group: config.reader_group.clone(),
            session_lifetime_minutes: config.session_lifetime_minutes,
            register_missing_users: config.register_missing_users,
        }
    }
}

pub struct EmbedService {
    dashboards: Arc<dyn QuickSightApi>,
    identities: Arc<dyn QuickSightApi>,
    settings: EmbedSettings,
}

impl EmbedService {
    pub fn new(
        dashboards: Arc<dyn QuickSightApi>,
        identities: Arc<dyn QuickSightApi>,
        settings: EmbedSettings,
    ) -> Self {
        Self {
            dashboards,
            identities,
            settings,
        }
    }

    pub fn settings(&self) -> &EmbedSettings {
        &self.settings
    }

    /// QuickSight user ARN for a reader identified by email.
    pub fn user_arn(&self, email: &str) -> String {
        arn::user_arn(
            &self.settings.identity_region,
            self.identities.account_id(),
            &self.settings.namespace,
            email,
        )
    }

    /// Make sure a QuickSight user named after `email` exists, registering a
    /// reader (and adding it to the reader group) when it does not.
    pub async fn ensure_reader(&self, email: &str) -> Result<()> {
        let namespace = &self.settings.namespace;
        if self.identities.describe_user(namespace, email).await?.is_some() {
            return Ok(());
        }
        if !self.settings.register_missing_users {
            return Err(anyhow!("QuickSight user {} is not registered", email));
        }

        qs_info!("Registering reader {}", email);
        self.identities
            .register_reader(namespace, email, email)
            .await?;
        if let Some(group) = &self.settings.reader_group {
            self.identities
                .add_group_member(namespace, group, email)
                .await?;
            qs_info!("Added reader {} to group {}", email, group);
        }
        Ok(())
    }

    /// Embed URL for the configured dashboard on behalf of `claims`.
    pub async fn embed_url_for(&self, claims: &EmbedClaims) -> Result<String> {
        qs_info!("Embed request from {} ({})", claims.username, claims.email);
        self.ensure_reader(&claims.email).await?;
        self.dashboards
            .generate_dashboard_embed_url(
                &self.user_arn(&claims.email),
                &self.settings.dashboard_id,
                self.settings.session_lifetime_minutes,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_region_fallbacks() {
        let mut config = EmbedConfig::resolve(None, |key| {
            (key == "DASHBOARD_ID").then(|| "d-1".to_string())
        })
        .unwrap();
        assert_eq!(
            EmbedSettings::from_config(&config, "us-west-2").identity_region,
            "us-west-2"
        );

        config.region = Some("eu-west-1".into());
        assert_eq!(
            EmbedSettings::from_config(&config, "us-west-2").identity_region,
            "eu-west-1"
        );

        config.identity_region = Some("us-east-1".into());
        let settings = EmbedSettings::from_config(&config, "us-west-2");
        assert_eq!(settings.identity_region, "us-east-1");
        assert_eq!(settings.session_lifetime_minutes, 100);
    }
}
