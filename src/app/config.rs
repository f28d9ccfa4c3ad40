//! Settings loader.
//!
//! All commands read one JSON document. Every section is optional so a file
//! that only configures, say, ingestion stays valid; commands that need a
//! missing section fail with a message naming it.
//!
//! # Format
//!
//! ```json
//! {
//!   "account": { "account_id": "111111111111", "region": "us-east-1" },
//!   "migration": {
//!     "source": { "account_id": "111111111111", "region": "us-east-1", "admin_user": "admin" },
//!     "target": { "account_id": "222222222222", "region": "us-east-1",
//!                 "role_name": "QuickSightMigration", "admin_user": "admin" },
//!     "source_suffix": "DEV",
//!     "target_suffix": "UAT",
//!     "data_source_target": { "rds_instance_id": "uat-db", "vpc_connection_id": "uat-vpc" }
//!   },
//!   "ingestion": { "topic_arn": "arn:aws:sns:us-east-1:111111111111:IngestionDone" },
//!   "embed": { "dashboard_id": "d-123", "reader_group": "EmbedReaders" }
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_NAMESPACE: &str = "default";

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_true() -> bool {
    true
}

/// Top-level settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Account the single-account commands operate on.
    pub account: Option<AccountConfig>,
    pub migration: Option<MigrationConfig>,
    pub ingestion: IngestionConfig,
    pub provisioning: ProvisioningConfig,
    pub monitoring: MonitoringConfig,
    pub embed: Option<EmbedConfig>,
}

impl Settings {
    /// Parse settings from a JSON string.
    pub fn from_json(contents: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(contents).context("Failed to parse settings JSON")?;
        debug!(
            "Parsed settings: account={}, migration={}, embed={}",
            settings.account.is_some(),
            settings.migration.is_some(),
            settings.embed.is_some()
        );
        Ok(settings)
    }

    /// Load settings from a file on disk.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings = Self::from_json(&contents)
            .with_context(|| format!("Invalid settings file {:?}", path))?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn require_account(&self) -> Result<&AccountConfig> {
        self.account
            .as_ref()
            .ok_or_else(|| anyhow!("settings have no \"account\" section"))
    }

    pub fn require_migration(&self) -> Result<&MigrationConfig> {
        self.migration
            .as_ref()
            .ok_or_else(|| anyhow!("settings have no \"migration\" section"))
    }
}

/// One QuickSight account/region pair and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub account_id: String,
    pub region: String,
    /// Role assumed through STS; ambient credentials are used when absent.
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Region hosting QuickSight identities. Defaults to `region`.
    #[serde(default)]
    pub identity_region: Option<String>,
    /// QuickSight user that owns assets written into this account.
    #[serde(default)]
    pub admin_user: Option<String>,
}

impl AccountConfig {
    pub fn identity_region(&self) -> &str {
        self.identity_region.as_deref().unwrap_or(&self.region)
    }
}

/// Asset lists for a `migrate --kind all` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationManifest {
    pub data_sources: Vec<String>,
    pub data_sets: Vec<String>,
    pub themes: Vec<String>,
    pub analyses: Vec<String>,
    pub dashboards: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub source: AccountConfig,
    pub target: AccountConfig,
    #[serde(default)]
    pub source_suffix: Option<String>,
    #[serde(default)]
    pub target_suffix: Option<String>,
    #[serde(default)]
    pub data_source_target: DataSourceTargetConfig,
    #[serde(default)]
    pub poll: PollConfig,
    /// Folder in the target account receiving every migrated asset.
    #[serde(default)]
    pub target_folder_id: Option<String>,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default)]
    pub publish: PublishConfig,
    /// Built-in theme ids that exist everywhere and are never copied.
    #[serde(default = "default_builtin_themes")]
    pub builtin_themes: Vec<String>,
    #[serde(default)]
    pub manifest: MigrationManifest,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("Migration_Results")
}

fn default_builtin_themes() -> Vec<String> {
    ["CLASSIC", "MIDNIGHT", "SEASIDE", "RAINIER"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Where migrated data sources point in the target environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceTargetConfig {
    pub rds_instance_id: Option<String>,
    pub redshift: Option<RedshiftTargetConfig>,
    /// VPC connection id in the target account.
    pub vpc_connection_id: Option<String>,
    /// Secrets Manager secret holding `{"username", "password"}` for RDS-family sources.
    pub rds_credentials_secret: Option<String>,
    pub redshift_credentials_secret: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedshiftTargetConfig {
    pub host: String,
    pub database: String,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub port: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: 60,
        }
    }
}

/// Dashboard publish options applied on create and update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub ad_hoc_filtering: bool,
    pub export_to_csv: bool,
    pub sheet_controls_expanded: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            ad_hoc_filtering: true,
            export_to_csv: true,
            sheet_controls_expanded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub topic_arn: Option<String>,
    /// Skip the refresh when the previous one ran longer than this.
    pub max_previous_duration_secs: i64,
    /// Poll the new ingestion until it finishes before notifying.
    pub wait_for_completion: bool,
    pub poll: PollConfig,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            topic_arn: None,
            max_previous_duration_secs: 1500,
            wait_for_completion: false,
            poll: PollConfig {
                interval_secs: 30,
                max_attempts: 120,
            },
        }
    }
}

/// Access granted to a newly created group whose name contains `group_contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRule {
    pub group_contains: String,
    #[serde(flatten)]
    pub grant: GroupGrant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum GroupGrant {
    /// Reader access on the dashboards with these names.
    ReadDashboards { dashboards: Vec<String> },
    /// Owner access on every data source, dataset and dashboard.
    OwnAllAssets,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    pub group_rules: Vec<GroupRule>,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        let read = |group: &str, dashboard: &str| GroupRule {
            group_contains: group.to_string(),
            grant: GroupGrant::ReadDashboards {
                dashboards: vec![dashboard.to_string()],
            },
        };
        let own = |group: &str| GroupRule {
            group_contains: group.to_string(),
            grant: GroupGrant::OwnAllAssets,
        };
        Self {
            group_rules: vec![
                read("Marketing", "Marketing Dashboard"),
                read("HR", "HR Dashboard"),
                own("BI-Developer"),
                own("BI-Admin"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Report bucket; `admin-console<account>` when unset.
    pub bucket: Option<String>,
    pub window_secs: i64,
    pub period_secs: i32,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            window_secs: 1800,
            period_secs: 300,
        }
    }
}

impl MonitoringConfig {
    pub fn bucket_for(&self, account_id: &str) -> String {
        self.bucket
            .clone()
            .unwrap_or_else(|| format!("admin-console{}", account_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedConfig {
    pub dashboard_id: String,
    /// Region serving the dashboard. Falls back to the account region.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub identity_region: Option<String>,
    /// Group new readers are added to.
    #[serde(default)]
    pub reader_group: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_minutes: i64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_true")]
    pub register_missing_users: bool,
}

fn default_session_lifetime() -> i64 {
    100
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl EmbedConfig {
    /// Merge the configured section with `QS_REGION`, `QS_IDENTITY_REGION`,
    /// `DASHBOARD_ID` and `QS_GROUP`. Environment values win.
    pub fn resolve<F>(configured: Option<EmbedConfig>, env: F) -> Result<EmbedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match (configured, env("DASHBOARD_ID")) {
            (Some(config), _) => config,
            (None, Some(dashboard_id)) => EmbedConfig {
                dashboard_id,
                region: None,
                identity_region: None,
                reader_group: None,
                namespace: default_namespace(),
                session_lifetime_minutes: default_session_lifetime(),
                bind_addr: default_bind_addr(),
                register_missing_users: true,
            },
            (None, None) => {
                return Err(anyhow!(
                    "no \"embed\" settings section and DASHBOARD_ID is not set"
                ))
            }
        };

        if let Some(dashboard_id) = env("DASHBOARD_ID") {
            config.dashboard_id = dashboard_id;
        }
        if let Some(region) = env("QS_REGION") {
            config.region = Some(region);
        }
        if let Some(region) = env("QS_IDENTITY_REGION") {
            config.identity_region = Some(region);
        }
        if let Some(group) = env("QS_GROUP") {
            config.reader_group = Some(group);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert!(settings.account.is_none());
        assert_eq!(settings.ingestion.max_previous_duration_secs, 1500);
        assert_eq!(settings.monitoring.window_secs, 1800);
        assert_eq!(settings.provisioning.group_rules.len(), 4);
        assert!(settings.require_migration().is_err());
    }

    #[test]
    fn test_migration_section_defaults() {
        let json = r#"{
            "migration": {
                "source": { "account_id": "111111111111", "region": "us-east-1" },
                "target": { "account_id": "222222222222", "region": "eu-west-1", "role_name": "Migrator" }
            }
        }"#;
        let settings = Settings::from_json(json).unwrap();
        let migration = settings.require_migration().unwrap();
        assert_eq!(migration.source.namespace, "default");
        assert_eq!(migration.target.identity_region(), "eu-west-1");
        assert_eq!(migration.poll, PollConfig::default());
        assert_eq!(migration.results_dir, PathBuf::from("Migration_Results"));
        assert!(migration.builtin_themes.contains(&"MIDNIGHT".to_string()));
        assert!(migration.publish.ad_hoc_filtering);
    }

    #[test]
    fn test_group_rules_parse() {
        let json = r#"{
            "provisioning": { "group_rules": [
                { "group_contains": "Sales", "access": "read_dashboards", "dashboards": ["Sales"] },
                { "group_contains": "Ops", "access": "own_all_assets" }
            ]}
        }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(
            settings.provisioning.group_rules[0].grant,
            GroupGrant::ReadDashboards {
                dashboards: vec!["Sales".to_string()]
            }
        );
        assert_eq!(
            settings.provisioning.group_rules[1].grant,
            GroupGrant::OwnAllAssets
        );
    }

    #[test]
    fn test_bucket_default_uses_account() {
        let monitoring = MonitoringConfig::default();
        assert_eq!(monitoring.bucket_for("123"), "admin-console123");
    }

    #[test]
    fn test_embed_env_overrides() {
        let env: HashMap<&str, &str> =
            [("DASHBOARD_ID", "dash-env"), ("QS_GROUP", "Readers")].into();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let config = EmbedConfig::resolve(None, lookup).unwrap();
        assert_eq!(config.dashboard_id, "dash-env");
        assert_eq!(config.reader_group.as_deref(), Some("Readers"));
        assert_eq!(config.session_lifetime_minutes, 100);

        let missing = EmbedConfig::resolve(None, |_| None);
        assert!(missing.is_err());
    }

    #[test]
    fn test_load_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from_path(dir.path().join("absent.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("absent.json"));
    }
}
