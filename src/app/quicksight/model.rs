//! Domain model shared by the QuickSight seam and the operations built on it.
//!
//! Definitions keep SDK shapes for the parts that are copied verbatim between
//! accounts (physical tables, theme configuration, data source parameters) and
//! flatten everything the orchestration inspects into plain fields.

use aws_sdk_quicksight::types::{
    ColumnGroup, DataSetImportMode, DataSourceParameters, DataSourceType, LogicalTable,
    PhysicalTable, SslProperties, ThemeConfiguration,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::arn;

use crate::app::config::PublishConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    DataSource,
    DataSet,
    Theme,
    Analysis,
    Dashboard,
    Template,
    Folder,
}

impl AssetKind {
    /// Resource type segment used in ARNs.
    pub fn arn_segment(&self) -> &'static str {
        match self {
            AssetKind::DataSource => "datasource",
            AssetKind::DataSet => "dataset",
            AssetKind::Theme => "theme",
            AssetKind::Analysis => "analysis",
            AssetKind::Dashboard => "dashboard",
            AssetKind::Template => "template",
            AssetKind::Folder => "folder",
        }
    }

    pub fn from_arn_segment(segment: &str) -> Option<Self> {
        match segment {
            "datasource" => Some(AssetKind::DataSource),
            "dataset" => Some(AssetKind::DataSet),
            "theme" => Some(AssetKind::Theme),
            "analysis" => Some(AssetKind::Analysis),
            "dashboard" => Some(AssetKind::Dashboard),
            "template" => Some(AssetKind::Template),
            "folder" => Some(AssetKind::Folder),
            _ => None,
        }
    }

    /// Folder member type, for the kinds that can live in a folder.
    pub fn member_type(&self) -> Option<&'static str> {
        match self {
            AssetKind::DataSource => Some("DATASOURCE"),
            AssetKind::DataSet => Some("DATASET"),
            AssetKind::Analysis => Some("ANALYSIS"),
            AssetKind::Dashboard => Some("DASHBOARD"),
            AssetKind::Theme | AssetKind::Template | AssetKind::Folder => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssetKind::DataSource => "Datasource",
            AssetKind::DataSet => "Dataset",
            AssetKind::Theme => "Theme",
            AssetKind::Analysis => "Analysis",
            AssetKind::Dashboard => "Dashboard",
            AssetKind::Template => "Template",
            AssetKind::Folder => "Folder",
        };
        f.write_str(label)
    }
}

/// Lifecycle status shared by data sources, analyses, templates and dashboard versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    CreationInProgress,
    CreationSuccessful,
    CreationFailed,
    UpdateInProgress,
    UpdateSuccessful,
    UpdateFailed,
    Deleted,
    Other(String),
}

impl AssetStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "CREATION_IN_PROGRESS" => AssetStatus::CreationInProgress,
            "CREATION_SUCCESSFUL" => AssetStatus::CreationSuccessful,
            "CREATION_FAILED" => AssetStatus::CreationFailed,
            "UPDATE_IN_PROGRESS" => AssetStatus::UpdateInProgress,
            "UPDATE_SUCCESSFUL" => AssetStatus::UpdateSuccessful,
            "UPDATE_FAILED" => AssetStatus::UpdateFailed,
            "DELETED" => AssetStatus::Deleted,
            other => AssetStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssetStatus::CreationInProgress => "CREATION_IN_PROGRESS",
            AssetStatus::CreationSuccessful => "CREATION_SUCCESSFUL",
            AssetStatus::CreationFailed => "CREATION_FAILED",
            AssetStatus::UpdateInProgress => "UPDATE_IN_PROGRESS",
            AssetStatus::UpdateSuccessful => "UPDATE_SUCCESSFUL",
            AssetStatus::UpdateFailed => "UPDATE_FAILED",
            AssetStatus::Deleted => "DELETED",
            AssetStatus::Other(value) => value,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            AssetStatus::CreationInProgress | AssetStatus::UpdateInProgress
        )
    }

    pub fn is_successful(&self) -> bool {
        matches!(
            self,
            AssetStatus::CreationSuccessful | AssetStatus::UpdateSuccessful
        )
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id/name/arn triple returned by list calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub id: String,
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub principal: String,
    pub actions: Vec<String>,
}

impl Permission {
    pub fn new(principal: impl Into<String>, actions: &[&str]) -> Self {
        Self {
            principal: principal.into(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceDefinition {
    pub id: String,
    pub name: String,
    pub arn: String,
    pub source_type: Option<DataSourceType>,
    pub parameters: Option<DataSourceParameters>,
    pub vpc_connection_arn: Option<String>,
    pub ssl_properties: Option<SslProperties>,
    pub status: Option<AssetStatus>,
}

impl DataSourceDefinition {
    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            arn: self.arn.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPairInput {
    pub username: String,
    pub password: String,
}

/// Everything needed to create a data source in a target account.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceCreate {
    pub definition: DataSourceDefinition,
    pub credentials: Option<CredentialPairInput>,
    pub permissions: Vec<Permission>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSetDefinition {
    pub id: String,
    pub name: String,
    pub arn: String,
    pub physical_tables: HashMap<String, PhysicalTable>,
    pub logical_tables: HashMap<String, LogicalTable>,
    pub import_mode: Option<DataSetImportMode>,
    pub column_groups: Option<Vec<ColumnGroup>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeDefinition {
    pub id: String,
    pub name: String,
    pub arn: String,
    pub base_theme_id: Option<String>,
    pub configuration: Option<ThemeConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisDefinition {
    pub id: String,
    pub name: String,
    pub arn: String,
    pub status: Option<AssetStatus>,
    pub data_set_arns: Vec<String>,
    pub theme_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDefinition {
    pub id: String,
    pub name: String,
    pub arn: String,
    pub status: Option<AssetStatus>,
    /// Dataset placeholders declared by the template's latest version.
    pub placeholders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardDefinition {
    pub id: String,
    pub name: String,
    pub arn: String,
    pub status: Option<AssetStatus>,
    pub version_number: Option<i64>,
    pub source_entity_arn: Option<String>,
    pub data_set_arns: Vec<String>,
    pub theme_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetReference {
    pub placeholder: String,
    pub data_set_arn: String,
}

/// Create/update input for an analysis built from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub id: String,
    pub name: String,
    pub template_arn: String,
    pub data_set_references: Vec<DataSetReference>,
    pub theme_arn: Option<String>,
    pub permissions: Vec<Permission>,
}

/// Create/update input for a dashboard built from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRequest {
    pub id: String,
    pub name: String,
    pub template_arn: String,
    pub data_set_references: Vec<DataSetReference>,
    pub theme_arn: Option<String>,
    pub permissions: Vec<Permission>,
    pub publish: PublishConfig,
    pub version_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDefinition {
    pub id: String,
    pub name: String,
    pub arn: String,
    /// Ancestor folder ARNs, outermost first.
    pub folder_path: Vec<String>,
}

impl FolderDefinition {
    pub fn parent_id(&self) -> Option<&str> {
        self.folder_path.last().and_then(|parent| arn::resource_id(parent))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMember {
    pub member_id: String,
    pub member_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_name: String,
    pub arn: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestionState {
    Initialized,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl IngestionState {
    pub fn parse(value: &str) -> Self {
        match value {
            "INITIALIZED" => IngestionState::Initialized,
            "QUEUED" => IngestionState::Queued,
            "RUNNING" => IngestionState::Running,
            "COMPLETED" => IngestionState::Completed,
            "FAILED" => IngestionState::Failed,
            "CANCELLED" => IngestionState::Cancelled,
            other => IngestionState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IngestionState::Initialized => "INITIALIZED",
            IngestionState::Queued => "QUEUED",
            IngestionState::Running => "RUNNING",
            IngestionState::Completed => "COMPLETED",
            IngestionState::Failed => "FAILED",
            IngestionState::Cancelled => "CANCELLED",
            IngestionState::Other(value) => value,
        }
    }

    /// Still occupying the dataset's refresh slot.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            IngestionState::Initialized | IngestionState::Queued | IngestionState::Running
        )
    }
}

impl fmt::Display for IngestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub id: String,
    pub state: IngestionState,
    pub created_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub error: Option<String>,
}
