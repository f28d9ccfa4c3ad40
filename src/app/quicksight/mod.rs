//! QuickSight control-plane seam.
//!
//! [`QuickSightApi`] is the only way the operations talk to QuickSight. One
//! value is bound to one account and region; migrations hold two. Describe
//! calls return `Ok(None)` when the resource does not exist so callers can
//! branch between create and update without inspecting errors.

pub mod arn;
pub mod client;
pub(crate) mod fields;
pub mod model;
pub mod permissions;

use anyhow::Result;
use async_trait::async_trait;

pub use client::SdkQuickSight;
pub use model::*;

#[async_trait]
pub trait QuickSightApi: Send + Sync {
    fn account_id(&self) -> &str;
    fn region(&self) -> &str;

    // Data sources
    async fn list_data_sources(&self) -> Result<Vec<DataSourceDefinition>>;
    async fn describe_data_source(&self, id: &str) -> Result<Option<DataSourceDefinition>>;
    async fn create_data_source(&self, request: &DataSourceCreate) -> Result<()>;
    async fn delete_data_source(&self, id: &str) -> Result<()>;

    // Datasets
    async fn list_data_sets(&self) -> Result<Vec<AssetSummary>>;
    async fn describe_data_set(&self, id: &str) -> Result<Option<DataSetDefinition>>;
    async fn create_data_set(
        &self,
        definition: &DataSetDefinition,
        permissions: &[Permission],
    ) -> Result<()>;
    async fn update_data_set(&self, definition: &DataSetDefinition) -> Result<()>;

    // Themes
    async fn list_themes(&self) -> Result<Vec<AssetSummary>>;
    async fn describe_theme(&self, id: &str) -> Result<Option<ThemeDefinition>>;
    async fn create_theme(&self, definition: &ThemeDefinition) -> Result<()>;

    // Templates
    async fn create_template_from_analysis(
        &self,
        template_id: &str,
        name: &str,
        analysis_arn: &str,
        data_set_references: &[DataSetReference],
    ) -> Result<()>;
    async fn copy_template(
        &self,
        template_id: &str,
        name: &str,
        source_template_arn: &str,
    ) -> Result<()>;
    async fn describe_template(&self, id: &str) -> Result<Option<TemplateDefinition>>;
    async fn delete_template(&self, id: &str) -> Result<()>;

    // Analyses
    async fn list_analyses(&self) -> Result<Vec<AssetSummary>>;
    async fn describe_analysis(&self, id: &str) -> Result<Option<AnalysisDefinition>>;
    async fn create_analysis(&self, request: &AnalysisRequest) -> Result<()>;
    async fn update_analysis(&self, request: &AnalysisRequest) -> Result<()>;
    async fn delete_analysis(&self, id: &str) -> Result<()>;

    // Dashboards
    async fn list_dashboards(&self) -> Result<Vec<AssetSummary>>;
    async fn describe_dashboard(&self, id: &str) -> Result<Option<DashboardDefinition>>;
    async fn create_dashboard(&self, request: &DashboardRequest) -> Result<()>;
    /// Returns the number of the version the update produced, when reported.
    async fn update_dashboard(&self, request: &DashboardRequest) -> Result<Option<i64>>;
    async fn publish_dashboard_version(&self, id: &str, version_number: i64) -> Result<()>;
    async fn delete_dashboard(&self, id: &str) -> Result<()>;

    // Permissions
    async fn grant_permissions(
        &self,
        kind: AssetKind,
        id: &str,
        permission: &Permission,
    ) -> Result<()>;
    async fn describe_permissions(&self, kind: AssetKind, id: &str) -> Result<Vec<Permission>>;

    // Folders
    async fn list_folders(&self) -> Result<Vec<AssetSummary>>;
    async fn describe_folder(&self, folder_id: &str) -> Result<Option<FolderDefinition>>;
    /// Assets directly inside the folder; subfolders are not listed.
    async fn list_folder_members(&self, folder_id: &str) -> Result<Vec<FolderMember>>;
    async fn add_folder_member(&self, folder_id: &str, kind: AssetKind, member_id: &str)
        -> Result<()>;

    // Users and groups
    async fn list_users(&self, namespace: &str) -> Result<Vec<UserSummary>>;
    async fn describe_user(&self, namespace: &str, user_name: &str)
        -> Result<Option<UserSummary>>;
    async fn register_reader(
        &self,
        namespace: &str,
        user_name: &str,
        email: &str,
    ) -> Result<UserSummary>;
    async fn list_groups(&self, namespace: &str) -> Result<Vec<String>>;
    /// Returns `false` when the group already existed.
    async fn create_group(&self, namespace: &str, group_name: &str) -> Result<bool>;
    async fn add_group_member(
        &self,
        namespace: &str,
        group_name: &str,
        user_name: &str,
    ) -> Result<()>;

    // SPICE ingestion
    async fn create_ingestion(&self, data_set_id: &str, ingestion_id: &str) -> Result<()>;
    async fn describe_ingestion(
        &self,
        data_set_id: &str,
        ingestion_id: &str,
    ) -> Result<Option<IngestionSummary>>;
    async fn list_ingestions(&self, data_set_id: &str) -> Result<Vec<IngestionSummary>>;

    // Embedding
    async fn generate_dashboard_embed_url(
        &self,
        user_arn: &str,
        dashboard_id: &str,
        session_lifetime_minutes: i64,
    ) -> Result<String>;
}

/// Find the first asset whose name or id matches `key`.
pub fn find_by_name_or_id<'a>(assets: &'a [AssetSummary], key: &str) -> Option<&'a AssetSummary> {
    assets
        .iter()
        .find(|asset| asset.name == key)
        .or_else(|| assets.iter().find(|asset| asset.id == key))
}
