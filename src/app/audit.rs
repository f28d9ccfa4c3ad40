//! Account-wide inventory exports for the admin console.
//!
//! Five CSVs land under `monitoring/quicksight/` in the report bucket:
//! permissions per principal, the user list, dashboard to data source
//! lineage, SPICE ingestion history and folder contents.

use anyhow::Result;
use aws_sdk_quicksight::types::PhysicalTable;
use std::collections::HashMap;

use crate::app::aws_services::ObjectStore;
use crate::app::csv;
use crate::app::quicksight::arn::{self, PrincipalRef, ResourceArn};
use crate::app::quicksight::{
    AssetKind, AssetSummary, DashboardDefinition, IngestionSummary, Permission, QuickSightApi,
    UserSummary,
};

pub const ACCESS_AUDIT_KEY: &str = "monitoring/quicksight/access_audit/access_audit.csv";
pub const USER_INVENTORY_KEY: &str = "monitoring/quicksight/user_inventory/user_inventory.csv";
pub const DATA_SET_LINEAGE_KEY: &str = "monitoring/quicksight/datsets_info/datsets_info.csv";
pub const DATA_SET_INGESTION_KEY: &str =
    "monitoring/quicksight/datsets_ingestion/datsets_ingestion.csv";
pub const FOLDER_ASSETS_KEY: &str = "monitoring/quicksight/folder_assets/folder_assets.csv";

pub const ACCESS_AUDIT_HEADER: [&str; 9] = [
    "account_id",
    "region",
    "asset_type",
    "asset_name",
    "asset_id",
    "principal_type",
    "principal",
    "namespace",
    "actions",
];

pub const USER_INVENTORY_HEADER: [&str; 6] =
    ["account_id", "region", "user_name", "email", "role", "arn"];

pub const DATA_SET_LINEAGE_HEADER: [&str; 14] = [
    "region",
    "dashboard_name",
    "dashboard_id",
    "analysis_name",
    "analysis_id",
    "dataset_name",
    "dataset_id",
    "datasource_name",
    "datasource_id",
    "table_type",
    "catalog",
    "schema",
    "table_name",
    "sql_query",
];

pub const DATA_SET_INGESTION_HEADER: [&str; 8] = [
    "region",
    "dataset_name",
    "dataset_id",
    "ingestion_id",
    "status",
    "created_time",
    "duration_secs",
    "error",
];

pub const FOLDER_ASSETS_HEADER: [&str; 4] = ["region", "folder_id", "member_id", "member_type"];

const AUDITED_KINDS: [AssetKind; 6] = [
    AssetKind::Dashboard,
    AssetKind::Analysis,
    AssetKind::DataSet,
    AssetKind::DataSource,
    AssetKind::Theme,
    AssetKind::Folder,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRow {
    pub asset_type: AssetKind,
    pub asset_name: String,
    pub asset_id: String,
    pub principal: PrincipalRef,
    pub actions: Vec<String>,
}

impl AccessRow {
    fn to_fields(&self, account_id: &str, region: &str) -> Vec<String> {
        vec![
            account_id.to_string(),
            region.to_string(),
            self.asset_type.to_string(),
            self.asset_name.clone(),
            self.asset_id.clone(),
            self.principal.principal_type.clone(),
            self.principal.name.clone(),
            self.principal.namespace.clone().unwrap_or_default(),
            self.actions.join("|"),
        ]
    }
}

fn rows_for(kind: AssetKind, asset: &AssetSummary, permissions: Vec<Permission>) -> Vec<AccessRow> {
    permissions
        .into_iter()
        .map(|permission| AccessRow {
            asset_type: kind,
            asset_name: asset.name.clone(),
            asset_id: asset.id.clone(),
            principal: PrincipalRef::parse(&permission.principal),
            actions: permission.actions,
        })
        .collect()
}

async fn list_assets(api: &dyn QuickSightApi, kind: AssetKind) -> Result<Vec<AssetSummary>> {
    Ok(match kind {
        AssetKind::Dashboard => api.list_dashboards().await?,
        AssetKind::Analysis => api.list_analyses().await?,
        AssetKind::DataSet => api.list_data_sets().await?,
        AssetKind::DataSource => api
            .list_data_sources()
            .await?
            .iter()
            .map(|d| d.summary())
            .collect(),
        AssetKind::Theme => api.list_themes().await?,
        AssetKind::Folder => api.list_folders().await?,
        AssetKind::Template => Vec::new(),
    })
}

/// One row per principal on every audited asset. Assets whose permissions
/// cannot be read are logged and left out.
pub async fn collect_access(api: &dyn QuickSightApi) -> Result<Vec<AccessRow>> {
    let mut rows = Vec::new();
    for kind in AUDITED_KINDS {
        let assets = list_assets(api, kind).await?;
        qs_debug!("Auditing {} {} asset(s)", assets.len(), kind);
        for asset in &assets {
            match api.describe_permissions(kind, &asset.id).await {
                Ok(permissions) => rows.extend(rows_for(kind, asset, permissions)),
                Err(e) => qs_warn!("Skipping {} {}: {:#}", kind, asset.id, e),
            }
        }
    }
    Ok(rows)
}

/// One physical table of a dataset used by a dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageRow {
    pub dashboard_name: String,
    pub dashboard_id: String,
    pub analysis_name: String,
    pub analysis_id: String,
    pub data_set_name: String,
    pub data_set_id: String,
    pub data_source_name: String,
    pub data_source_id: String,
    pub table_type: &'static str,
    pub catalog: String,
    pub schema: String,
    pub table_name: String,
    pub sql_query: String,
}

impl LineageRow {
    fn to_fields(&self, region: &str) -> Vec<String> {
        vec![
            region.to_string(),
            self.dashboard_name.clone(),
            self.dashboard_id.clone(),
            self.analysis_name.clone(),
            self.analysis_id.clone(),
            self.data_set_name.clone(),
            self.data_set_id.clone(),
            self.data_source_name.clone(),
            self.data_source_id.clone(),
            self.table_type.to_string(),
            self.catalog.clone(),
            self.schema.clone(),
            self.table_name.clone(),
            self.sql_query.clone(),
        ]
    }
}

struct TableSource<'t> {
    table_type: &'static str,
    data_source_arn: &'t str,
    catalog: String,
    schema: String,
    table_name: String,
    sql_query: String,
}

fn table_source(table: &PhysicalTable) -> Option<TableSource<'_>> {
    let source = match table {
        PhysicalTable::RelationalTable(t) => TableSource {
            table_type: "relational",
            data_source_arn: &t.data_source_arn,
            catalog: t.catalog.clone().unwrap_or_default(),
            schema: t.schema.clone().unwrap_or_default(),
            table_name: t.name.clone(),
            sql_query: String::new(),
        },
        PhysicalTable::CustomSql(t) => TableSource {
            table_type: "custom_sql",
            data_source_arn: &t.data_source_arn,
            catalog: String::new(),
            schema: String::new(),
            table_name: t.name.clone(),
            sql_query: t.sql_query.replace(['\n', '\r'], " "),
        },
        PhysicalTable::S3Source(t) => TableSource {
            table_type: "s3",
            data_source_arn: &t.data_source_arn,
            catalog: String::new(),
            schema: String::new(),
            table_name: String::new(),
            sql_query: String::new(),
        },
        _ => return None,
    };
    Some(source)
}

/// Data source names looked up once per run.
struct DataSourceNames<'a> {
    api: &'a dyn QuickSightApi,
    cache: HashMap<String, String>,
}

impl<'a> DataSourceNames<'a> {
    async fn name(&mut self, id: &str) -> String {
        if let Some(name) = self.cache.get(id) {
            return name.clone();
        }
        let name = match self.api.describe_data_source(id).await {
            Ok(Some(source)) => source.name,
            Ok(None) => String::new(),
            Err(e) => {
                qs_warn!("Could not describe data source {}: {:#}", id, e);
                String::new()
            }
        };
        self.cache.insert(id.to_string(), name.clone());
        name
    }
}

async fn lineage_for(
    api: &dyn QuickSightApi,
    dashboard: &DashboardDefinition,
    sources: &mut DataSourceNames<'_>,
) -> Vec<LineageRow> {
    let analysis_id = dashboard
        .source_entity_arn
        .as_deref()
        .and_then(ResourceArn::parse)
        .filter(|parsed| parsed.kind() == Some(AssetKind::Analysis))
        .map(|parsed| parsed.resource_id.to_string())
        .unwrap_or_default();
    let analysis_name = if analysis_id.is_empty() {
        String::new()
    } else {
        match api.describe_analysis(&analysis_id).await {
            Ok(analysis) => analysis.map(|a| a.name).unwrap_or_default(),
            Err(e) => {
                qs_warn!("Could not describe analysis {}: {:#}", analysis_id, e);
                String::new()
            }
        }
    };

    let mut rows = Vec::new();
    for data_set_arn in &dashboard.data_set_arns {
        let Some(data_set_id) = arn::resource_id(data_set_arn) else {
            continue;
        };
        let data_set = match api.describe_data_set(data_set_id).await {
            Ok(Some(data_set)) => data_set,
            Ok(None) => continue,
            Err(e) => {
                qs_warn!("Skipping dataset {} of {}: {:#}", data_set_id, dashboard.id, e);
                continue;
            }
        };

        let mut tables: Vec<(&String, &PhysicalTable)> = data_set.physical_tables.iter().collect();
        tables.sort_by(|a, b| a.0.cmp(b.0));
        for (_, table) in tables {
            let Some(source) = table_source(table) else {
                continue;
            };
            let data_source_id = arn::resource_id(source.data_source_arn)
                .unwrap_or_default()
                .to_string();
            rows.push(LineageRow {
                dashboard_name: dashboard.name.clone(),
                dashboard_id: dashboard.id.clone(),
                analysis_name: analysis_name.clone(),
                analysis_id: analysis_id.clone(),
                data_set_name: data_set.name.clone(),
                data_set_id: data_set.id.clone(),
                data_source_name: sources.name(&data_source_id).await,
                data_source_id,
                table_type: source.table_type,
                catalog: source.catalog,
                schema: source.schema,
                table_name: source.table_name,
                sql_query: source.sql_query,
            });
        }
    }
    rows
}

/// Dashboard to analysis to dataset to data source lineage, one row per
/// physical table. Assets that cannot be described are logged and left out.
pub async fn collect_lineage(api: &dyn QuickSightApi) -> Result<Vec<LineageRow>> {
    let mut sources = DataSourceNames {
        api,
        cache: HashMap::new(),
    };
    let mut rows = Vec::new();
    for summary in api.list_dashboards().await? {
        match api.describe_dashboard(&summary.id).await {
            Ok(Some(dashboard)) => rows.extend(lineage_for(api, &dashboard, &mut sources).await),
            Ok(None) => {}
            Err(e) => qs_warn!("Skipping dashboard {}: {:#}", summary.id, e),
        }
    }
    Ok(rows)
}

fn ingestion_fields(
    region: &str,
    data_set: &AssetSummary,
    ingestion: &IngestionSummary,
) -> Vec<String> {
    vec![
        region.to_string(),
        data_set.name.clone(),
        data_set.id.clone(),
        ingestion.id.clone(),
        ingestion.state.as_str().to_string(),
        ingestion
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        ingestion
            .duration_secs
            .map(|d| d.to_string())
            .unwrap_or_default(),
        ingestion.error.clone().unwrap_or_default(),
    ]
}

/// SPICE ingestion history of every dataset. Direct-query datasets have no
/// history and are skipped along with unreadable ones.
pub async fn collect_ingestion_history(
    api: &dyn QuickSightApi,
) -> Result<Vec<(AssetSummary, IngestionSummary)>> {
    let mut rows = Vec::new();
    for data_set in api.list_data_sets().await? {
        match api.list_ingestions(&data_set.id).await {
            Ok(ingestions) => rows.extend(
                ingestions
                    .into_iter()
                    .map(|ingestion| (data_set.clone(), ingestion)),
            ),
            Err(e) => qs_debug!("No ingestion history for {}: {:#}", data_set.id, e),
        }
    }
    Ok(rows)
}

/// A folder member, or a subfolder under its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderAssetRow {
    pub folder_id: String,
    pub member_id: String,
    pub member_type: String,
}

/// Folder contents and the folder tree, flattened into parent/child rows.
pub async fn collect_folder_assets(api: &dyn QuickSightApi) -> Result<Vec<FolderAssetRow>> {
    let mut rows = Vec::new();
    for folder in api.list_folders().await? {
        match api.list_folder_members(&folder.id).await {
            Ok(members) => rows.extend(members.into_iter().map(|member| FolderAssetRow {
                member_type: ResourceArn::parse(&member.member_arn)
                    .and_then(|parsed| parsed.kind())
                    .map(|kind| kind.to_string())
                    .unwrap_or_default(),
                folder_id: folder.id.clone(),
                member_id: member.member_id,
            })),
            Err(e) => qs_warn!("Could not list members of folder {}: {:#}", folder.id, e),
        }

        match api.describe_folder(&folder.id).await {
            Ok(Some(definition)) => {
                if let Some(parent) = definition.parent_id() {
                    rows.push(FolderAssetRow {
                        folder_id: parent.to_string(),
                        member_id: folder.id.clone(),
                        member_type: AssetKind::Folder.to_string(),
                    });
                }
            }
            Ok(None) => {}
            Err(e) => qs_warn!("Could not describe folder {}: {:#}", folder.id, e),
        }
    }
    Ok(rows)
}

fn user_fields(user: &UserSummary, account_id: &str, region: &str) -> Vec<String> {
    vec![
        account_id.to_string(),
        region.to_string(),
        user.user_name.clone(),
        user.email.clone().unwrap_or_default(),
        user.role.clone().unwrap_or_default(),
        user.arn.clone(),
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub access_rows: usize,
    pub users: usize,
    pub lineage_rows: usize,
    pub ingestion_rows: usize,
    pub folder_rows: usize,
}

async fn upload_csv(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    header: &[&str],
    rows: &[Vec<String>],
) -> Result<()> {
    store
        .put_object(bucket, key, csv::render(header, rows).into_bytes(), "text/csv")
        .await
}

/// Build every report and upload it to `bucket`.
pub async fn export_audit(
    api: &dyn QuickSightApi,
    store: &dyn ObjectStore,
    bucket: &str,
    namespace: &str,
) -> Result<AuditSummary> {
    let (account_id, region) = (api.account_id(), api.region());

    let access: Vec<Vec<String>> = collect_access(api)
        .await?
        .iter()
        .map(|row| row.to_fields(account_id, region))
        .collect();
    upload_csv(store, bucket, ACCESS_AUDIT_KEY, &ACCESS_AUDIT_HEADER, &access).await?;

    let users: Vec<Vec<String>> = api
        .list_users(namespace)
        .await?
        .iter()
        .map(|user| user_fields(user, account_id, region))
        .collect();
    upload_csv(store, bucket, USER_INVENTORY_KEY, &USER_INVENTORY_HEADER, &users).await?;

    let lineage: Vec<Vec<String>> = collect_lineage(api)
        .await?
        .iter()
        .map(|row| row.to_fields(region))
        .collect();
    upload_csv(store, bucket, DATA_SET_LINEAGE_KEY, &DATA_SET_LINEAGE_HEADER, &lineage).await?;

    let ingestions: Vec<Vec<String>> = collect_ingestion_history(api)
        .await?
        .iter()
        .map(|(data_set, ingestion)| ingestion_fields(region, data_set, ingestion))
        .collect();
    upload_csv(
        store,
        bucket,
        DATA_SET_INGESTION_KEY,
        &DATA_SET_INGESTION_HEADER,
        &ingestions,
    )
    .await?;

    let folders: Vec<Vec<String>> = collect_folder_assets(api)
        .await?
        .into_iter()
        .map(|row| vec![region.to_string(), row.folder_id, row.member_id, row.member_type])
        .collect();
    upload_csv(store, bucket, FOLDER_ASSETS_KEY, &FOLDER_ASSETS_HEADER, &folders).await?;

    let summary = AuditSummary {
        access_rows: access.len(),
        users: users.len(),
        lineage_rows: lineage.len(),
        ingestion_rows: ingestions.len(),
        folder_rows: folders.len(),
    };
    qs_info!("Audit uploaded to s3://{}: {:?}", bucket, summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_fields() {
        let asset = AssetSummary {
            id: "d-1".into(),
            name: "Sales, EMEA".into(),
            arn: "arn:aws:quicksight:us-east-1:111:dashboard/d-1".into(),
        };
        let rows = rows_for(
            AssetKind::Dashboard,
            &asset,
            vec![Permission::new(
                "arn:aws:quicksight:us-east-1:111:user/default/BI-Admin/jane",
                &["quicksight:DescribeDashboard", "quicksight:QueryDashboard"],
            )],
        );
        assert_eq!(
            rows[0].to_fields("111", "us-east-1"),
            vec![
                "111",
                "us-east-1",
                "Dashboard",
                "Sales, EMEA",
                "d-1",
                "user",
                "BI-Admin/jane",
                "default",
                "quicksight:DescribeDashboard|quicksight:QueryDashboard",
            ]
        );
    }

    #[test]
    fn test_user_fields_blank_optional() {
        let user = UserSummary {
            user_name: "svc".into(),
            arn: "arn:aws:quicksight:us-east-1:111:user/default/svc".into(),
            email: None,
            role: Some("AUTHOR".into()),
            active: true,
        };
        assert_eq!(
            user_fields(&user, "111", "us-east-1"),
            vec![
                "111",
                "us-east-1",
                "svc",
                "",
                "AUTHOR",
                "arn:aws:quicksight:us-east-1:111:user/default/svc"
            ]
        );
    }
}
