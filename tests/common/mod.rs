//! In-memory stand-ins for the AWS seams.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_quicksight::types::{
    DataSourceParameters, DataSourceType, InputColumn, InputColumnDataType, LogicalTable,
    LogicalTableSource, PhysicalTable, RdsParameters, RelationalTable,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use qsops::app::aws_services::{MetricQuery, MetricSeries, MetricsSource, Notifier, ObjectStore};
use qsops::app::quicksight::arn;
use qsops::app::quicksight::{
    AnalysisDefinition, AnalysisRequest, AssetKind, AssetStatus, AssetSummary, DashboardDefinition,
    DashboardRequest, DataSetDefinition, DataSetReference, DataSourceCreate, DataSourceDefinition,
    FolderDefinition, FolderMember, IngestionState, IngestionSummary, Permission, QuickSightApi, TemplateDefinition,
    ThemeDefinition, UserSummary,
};

#[derive(Default)]
pub struct FakeState {
    pub data_sources: BTreeMap<String, DataSourceDefinition>,
    pub data_sets: BTreeMap<String, DataSetDefinition>,
    pub themes: BTreeMap<String, ThemeDefinition>,
    pub templates: BTreeMap<String, TemplateDefinition>,
    pub analyses: BTreeMap<String, AnalysisDefinition>,
    pub dashboards: BTreeMap<String, DashboardDefinition>,
    pub folders: BTreeMap<String, Vec<(AssetKind, String)>>,
    /// Child folder id to parent folder id.
    pub folder_parents: BTreeMap<String, String>,
    pub permissions: BTreeMap<(AssetKind, String), Vec<Permission>>,
    pub users: Vec<UserSummary>,
    pub groups: BTreeMap<String, Vec<String>>,
    pub ingestions: BTreeMap<String, Vec<IngestionSummary>>,
    /// State new ingestions report when described.
    pub ingestion_result: Option<IngestionState>,
    /// Status new data sources settle in.
    pub data_source_status: Option<AssetStatus>,

    pub data_source_creates: Vec<DataSourceCreate>,
    pub analysis_requests: Vec<AnalysisRequest>,
    pub dashboard_requests: Vec<DashboardRequest>,
    pub published_versions: Vec<(String, i64)>,
    pub embed_requests: Vec<(String, String, i64)>,
    pub calls: Vec<String>,
    failures: HashMap<String, String>,
}

pub struct FakeQuickSight {
    account_id: String,
    region: String,
    pub state: Mutex<FakeState>,
}

impl FakeQuickSight {
    pub fn new(account_id: &str, region: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            region: region.to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Make every later call to `operation` fail with `message`.
    pub fn fail_on(&self, operation: &str, message: &str) {
        self.state()
            .failures
            .insert(operation.to_string(), message.to_string());
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.state().calls.iter().filter(|c| *c == operation).count()
    }

    fn call(&self, operation: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(operation.to_string());
        match state.failures.get(operation) {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }

    fn arn(&self, kind: AssetKind, id: &str) -> String {
        arn::asset_arn(&self.region, &self.account_id, kind, id)
    }

    pub fn asset_arn(&self, kind: AssetKind, id: &str) -> String {
        self.arn(kind, id)
    }

    pub fn add_data_source(&self, id: &str, name: &str) {
        let definition = rds_data_source(self, id, name);
        self.state().data_sources.insert(id.to_string(), definition);
    }

    pub fn add_folder(&self, id: &str, parent: Option<&str>) {
        let mut state = self.state();
        state.folders.entry(id.to_string()).or_default();
        if let Some(parent) = parent {
            state
                .folder_parents
                .insert(id.to_string(), parent.to_string());
        }
    }

    pub fn add_data_set(&self, definition: DataSetDefinition) {
        self.state()
            .data_sets
            .insert(definition.id.clone(), definition);
    }

    pub fn add_analysis(&self, id: &str, name: &str, data_set_ids: &[&str], theme_arn: Option<String>) {
        let definition = AnalysisDefinition {
            id: id.to_string(),
            name: name.to_string(),
            arn: self.arn(AssetKind::Analysis, id),
            status: Some(AssetStatus::CreationSuccessful),
            data_set_arns: data_set_ids
                .iter()
                .map(|d| self.arn(AssetKind::DataSet, d))
                .collect(),
            theme_arn,
        };
        self.state().analyses.insert(id.to_string(), definition);
    }

    pub fn add_dashboard(&self, id: &str, name: &str, analysis_id: &str, data_set_ids: &[&str]) {
        let definition = DashboardDefinition {
            id: id.to_string(),
            name: name.to_string(),
            arn: self.arn(AssetKind::Dashboard, id),
            status: Some(AssetStatus::CreationSuccessful),
            version_number: Some(1),
            source_entity_arn: Some(self.arn(AssetKind::Analysis, analysis_id)),
            data_set_arns: data_set_ids
                .iter()
                .map(|d| self.arn(AssetKind::DataSet, d))
                .collect(),
            theme_arn: None,
        };
        self.state().dashboards.insert(id.to_string(), definition);
    }

    pub fn add_theme(&self, id: &str, name: &str) {
        let definition = ThemeDefinition {
            id: id.to_string(),
            name: name.to_string(),
            arn: self.arn(AssetKind::Theme, id),
            base_theme_id: Some("CLASSIC".to_string()),
            configuration: None,
        };
        self.state().themes.insert(id.to_string(), definition);
    }

    pub fn add_user(&self, user_name: &str, email: Option<&str>, role: &str) {
        let user = UserSummary {
            user_name: user_name.to_string(),
            arn: arn::user_arn(&self.region, &self.account_id, "default", user_name),
            email: email.map(String::from),
            role: Some(role.to_string()),
            active: true,
        };
        self.state().users.push(user);
    }

    pub fn add_group(&self, group_name: &str) {
        self.state().groups.insert(group_name.to_string(), Vec::new());
    }

    pub fn add_ingestion(&self, data_set_id: &str, ingestion: IngestionSummary) {
        self.state()
            .ingestions
            .entry(data_set_id.to_string())
            .or_default()
            .push(ingestion);
    }

    pub fn permissions_on(&self, kind: AssetKind, id: &str) -> Vec<Permission> {
        self.state()
            .permissions
            .get(&(kind, id.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

fn summaries<'a, I>(items: I) -> Vec<AssetSummary>
where
    I: Iterator<Item = (&'a String, &'a String, &'a String)>,
{
    items
        .map(|(id, name, arn)| AssetSummary {
            id: id.clone(),
            name: name.clone(),
            arn: arn.clone(),
        })
        .collect()
}

#[async_trait]
impl QuickSightApi for FakeQuickSight {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn list_data_sources(&self) -> Result<Vec<DataSourceDefinition>> {
        self.call("ListDataSources")?;
        Ok(self.state().data_sources.values().cloned().collect())
    }

    async fn describe_data_source(&self, id: &str) -> Result<Option<DataSourceDefinition>> {
        self.call("DescribeDataSource")?;
        Ok(self.state().data_sources.get(id).cloned())
    }

    async fn create_data_source(&self, request: &DataSourceCreate) -> Result<()> {
        self.call("CreateDataSource")?;
        let mut state = self.state();
        let mut definition = request.definition.clone();
        definition.status = Some(
            state
                .data_source_status
                .clone()
                .unwrap_or(AssetStatus::CreationSuccessful),
        );
        state.data_sources.insert(definition.id.clone(), definition);
        state.data_source_creates.push(request.clone());
        Ok(())
    }

    async fn delete_data_source(&self, id: &str) -> Result<()> {
        self.call("DeleteDataSource")?;
        self.state().data_sources.remove(id);
        Ok(())
    }

    async fn list_data_sets(&self) -> Result<Vec<AssetSummary>> {
        self.call("ListDataSets")?;
        let state = self.state();
        Ok(summaries(
            state.data_sets.values().map(|d| (&d.id, &d.name, &d.arn)),
        ))
    }

    async fn describe_data_set(&self, id: &str) -> Result<Option<DataSetDefinition>> {
        self.call("DescribeDataSet")?;
        Ok(self.state().data_sets.get(id).cloned())
    }

    async fn create_data_set(
        &self,
        definition: &DataSetDefinition,
        permissions: &[Permission],
    ) -> Result<()> {
        self.call("CreateDataSet")?;
        let mut state = self.state();
        state
            .data_sets
            .insert(definition.id.clone(), definition.clone());
        state
            .permissions
            .entry((AssetKind::DataSet, definition.id.clone()))
            .or_default()
            .extend(permissions.iter().cloned());
        Ok(())
    }

    async fn update_data_set(&self, definition: &DataSetDefinition) -> Result<()> {
        self.call("UpdateDataSet")?;
        self.state()
            .data_sets
            .insert(definition.id.clone(), definition.clone());
        Ok(())
    }

    async fn list_themes(&self) -> Result<Vec<AssetSummary>> {
        self.call("ListThemes")?;
        let state = self.state();
        Ok(summaries(state.themes.values().map(|t| (&t.id, &t.name, &t.arn))))
    }

    async fn describe_theme(&self, id: &str) -> Result<Option<ThemeDefinition>> {
        self.call("DescribeTheme")?;
        Ok(self.state().themes.get(id).cloned())
    }

    async fn create_theme(&self, definition: &ThemeDefinition) -> Result<()> {
        self.call("CreateTheme")?;
        self.state()
            .themes
            .insert(definition.id.clone(), definition.clone());
        Ok(())
    }

    async fn create_template_from_analysis(
        &self,
        template_id: &str,
        name: &str,
        _analysis_arn: &str,
        data_set_references: &[DataSetReference],
    ) -> Result<()> {
        self.call("CreateTemplate")?;
        let template = TemplateDefinition {
            id: template_id.to_string(),
            name: name.to_string(),
            arn: self.arn(AssetKind::Template, template_id),
            status: Some(AssetStatus::CreationSuccessful),
            placeholders: data_set_references
                .iter()
                .map(|r| r.placeholder.clone())
                .collect(),
        };
        self.state()
            .templates
            .insert(template_id.to_string(), template);
        Ok(())
    }

    async fn copy_template(
        &self,
        template_id: &str,
        name: &str,
        _source_template_arn: &str,
    ) -> Result<()> {
        self.call("CopyTemplate")?;
        let template = TemplateDefinition {
            id: template_id.to_string(),
            name: name.to_string(),
            arn: self.arn(AssetKind::Template, template_id),
            status: Some(AssetStatus::CreationSuccessful),
            placeholders: Vec::new(),
        };
        self.state()
            .templates
            .insert(template_id.to_string(), template);
        Ok(())
    }

    async fn describe_template(&self, id: &str) -> Result<Option<TemplateDefinition>> {
        self.call("DescribeTemplate")?;
        Ok(self.state().templates.get(id).cloned())
    }

    async fn delete_template(&self, id: &str) -> Result<()> {
        self.call("DeleteTemplate")?;
        self.state().templates.remove(id);
        Ok(())
    }

    async fn list_analyses(&self) -> Result<Vec<AssetSummary>> {
        self.call("ListAnalyses")?;
        let state = self.state();
        Ok(summaries(
            state.analyses.values().map(|a| (&a.id, &a.name, &a.arn)),
        ))
    }

    async fn describe_analysis(&self, id: &str) -> Result<Option<AnalysisDefinition>> {
        self.call("DescribeAnalysis")?;
        Ok(self.state().analyses.get(id).cloned())
    }

    async fn create_analysis(&self, request: &AnalysisRequest) -> Result<()> {
        self.call("CreateAnalysis")?;
        self.store_analysis(request, AssetStatus::CreationSuccessful);
        Ok(())
    }

    async fn update_analysis(&self, request: &AnalysisRequest) -> Result<()> {
        self.call("UpdateAnalysis")?;
        self.store_analysis(request, AssetStatus::UpdateSuccessful);
        Ok(())
    }

    async fn delete_analysis(&self, id: &str) -> Result<()> {
        self.call("DeleteAnalysis")?;
        self.state().analyses.remove(id);
        Ok(())
    }

    async fn list_dashboards(&self) -> Result<Vec<AssetSummary>> {
        self.call("ListDashboards")?;
        let state = self.state();
        Ok(summaries(
            state.dashboards.values().map(|d| (&d.id, &d.name, &d.arn)),
        ))
    }

    async fn describe_dashboard(&self, id: &str) -> Result<Option<DashboardDefinition>> {
        self.call("DescribeDashboard")?;
        Ok(self.state().dashboards.get(id).cloned())
    }

    async fn create_dashboard(&self, request: &DashboardRequest) -> Result<()> {
        self.call("CreateDashboard")?;
        self.store_dashboard(request, AssetStatus::CreationSuccessful);
        Ok(())
    }

    async fn update_dashboard(&self, request: &DashboardRequest) -> Result<Option<i64>> {
        self.call("UpdateDashboard")?;
        Ok(self.store_dashboard(request, AssetStatus::UpdateSuccessful))
    }

    async fn publish_dashboard_version(&self, id: &str, version_number: i64) -> Result<()> {
        self.call("UpdateDashboardPublishedVersion")?;
        self.state()
            .published_versions
            .push((id.to_string(), version_number));
        Ok(())
    }

    async fn delete_dashboard(&self, id: &str) -> Result<()> {
        self.call("DeleteDashboard")?;
        self.state().dashboards.remove(id);
        Ok(())
    }

    async fn grant_permissions(
        &self,
        kind: AssetKind,
        id: &str,
        permission: &Permission,
    ) -> Result<()> {
        self.call("UpdatePermissions")?;
        self.state()
            .permissions
            .entry((kind, id.to_string()))
            .or_default()
            .push(permission.clone());
        Ok(())
    }

    async fn describe_permissions(&self, kind: AssetKind, id: &str) -> Result<Vec<Permission>> {
        self.call("DescribePermissions")?;
        Ok(self.permissions_on(kind, id))
    }

    async fn list_folders(&self) -> Result<Vec<AssetSummary>> {
        self.call("ListFolders")?;
        Ok(self
            .state()
            .folders
            .keys()
            .map(|id| AssetSummary {
                id: id.clone(),
                name: id.clone(),
                arn: self.arn(AssetKind::Folder, id),
            })
            .collect())
    }

    async fn describe_folder(&self, folder_id: &str) -> Result<Option<FolderDefinition>> {
        self.call("DescribeFolder")?;
        let state = self.state();
        if !state.folders.contains_key(folder_id) {
            return Ok(None);
        }
        let mut folder_path = Vec::new();
        let mut current = folder_id;
        while let Some(parent) = state.folder_parents.get(current) {
            folder_path.insert(0, self.arn(AssetKind::Folder, parent));
            current = parent.as_str();
        }
        Ok(Some(FolderDefinition {
            id: folder_id.to_string(),
            name: folder_id.to_string(),
            arn: self.arn(AssetKind::Folder, folder_id),
            folder_path,
        }))
    }

    async fn list_folder_members(&self, folder_id: &str) -> Result<Vec<FolderMember>> {
        self.call("ListFolderMembers")?;
        Ok(self
            .state()
            .folders
            .get(folder_id)
            .map(|members| {
                members
                    .iter()
                    .map(|(kind, id)| FolderMember {
                        member_id: id.clone(),
                        member_arn: self.arn(*kind, id),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_folder_member(
        &self,
        folder_id: &str,
        kind: AssetKind,
        member_id: &str,
    ) -> Result<()> {
        self.call("CreateFolderMembership")?;
        self.state()
            .folders
            .entry(folder_id.to_string())
            .or_default()
            .push((kind, member_id.to_string()));
        Ok(())
    }

    async fn list_users(&self, _namespace: &str) -> Result<Vec<UserSummary>> {
        self.call("ListUsers")?;
        Ok(self.state().users.clone())
    }

    async fn describe_user(&self, _namespace: &str, user_name: &str) -> Result<Option<UserSummary>> {
        self.call("DescribeUser")?;
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.user_name == user_name)
            .cloned())
    }

    async fn register_reader(
        &self,
        namespace: &str,
        user_name: &str,
        email: &str,
    ) -> Result<UserSummary> {
        self.call("RegisterUser")?;
        let user = UserSummary {
            user_name: user_name.to_string(),
            arn: arn::user_arn(&self.region, &self.account_id, namespace, user_name),
            email: Some(email.to_string()),
            role: Some("READER".to_string()),
            active: true,
        };
        self.state().users.push(user.clone());
        Ok(user)
    }

    async fn list_groups(&self, _namespace: &str) -> Result<Vec<String>> {
        self.call("ListGroups")?;
        Ok(self.state().groups.keys().cloned().collect())
    }

    async fn create_group(&self, _namespace: &str, group_name: &str) -> Result<bool> {
        self.call("CreateGroup")?;
        let mut state = self.state();
        if state.groups.contains_key(group_name) {
            return Ok(false);
        }
        state.groups.insert(group_name.to_string(), Vec::new());
        Ok(true)
    }

    async fn add_group_member(
        &self,
        _namespace: &str,
        group_name: &str,
        user_name: &str,
    ) -> Result<()> {
        self.call("CreateGroupMembership")?;
        let mut state = self.state();
        let members = state
            .groups
            .get_mut(group_name)
            .ok_or_else(|| anyhow!("ResourceNotFoundException: group {} not found", group_name))?;
        members.push(user_name.to_string());
        Ok(())
    }

    async fn create_ingestion(&self, data_set_id: &str, ingestion_id: &str) -> Result<()> {
        self.call("CreateIngestion")?;
        let mut state = self.state();
        let ingestion_state = state
            .ingestion_result
            .clone()
            .unwrap_or(IngestionState::Completed);
        state
            .ingestions
            .entry(data_set_id.to_string())
            .or_default()
            .push(IngestionSummary {
                id: ingestion_id.to_string(),
                state: ingestion_state,
                created_at: Some(Utc::now()),
                duration_secs: None,
                error: None,
            });
        Ok(())
    }

    async fn describe_ingestion(
        &self,
        data_set_id: &str,
        ingestion_id: &str,
    ) -> Result<Option<IngestionSummary>> {
        self.call("DescribeIngestion")?;
        Ok(self
            .state()
            .ingestions
            .get(data_set_id)
            .and_then(|all| all.iter().find(|i| i.id == ingestion_id).cloned()))
    }

    async fn list_ingestions(&self, data_set_id: &str) -> Result<Vec<IngestionSummary>> {
        self.call("ListIngestions")?;
        Ok(self
            .state()
            .ingestions
            .get(data_set_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn generate_dashboard_embed_url(
        &self,
        user_arn: &str,
        dashboard_id: &str,
        session_lifetime_minutes: i64,
    ) -> Result<String> {
        self.call("GenerateEmbedUrlForRegisteredUser")?;
        self.state().embed_requests.push((
            user_arn.to_string(),
            dashboard_id.to_string(),
            session_lifetime_minutes,
        ));
        Ok(format!(
            "https://{}.quicksight.aws.amazon.com/embed/{}",
            self.region, dashboard_id
        ))
    }
}

impl FakeQuickSight {
    fn store_analysis(&self, request: &AnalysisRequest, status: AssetStatus) {
        let mut state = self.state();
        state.analysis_requests.push(request.clone());
        let definition = AnalysisDefinition {
            id: request.id.clone(),
            name: request.name.clone(),
            arn: self.arn(AssetKind::Analysis, &request.id),
            status: Some(status),
            data_set_arns: request
                .data_set_references
                .iter()
                .map(|r| r.data_set_arn.clone())
                .collect(),
            theme_arn: request.theme_arn.clone(),
        };
        state.analyses.insert(request.id.clone(), definition);
    }

    fn store_dashboard(&self, request: &DashboardRequest, status: AssetStatus) -> Option<i64> {
        let mut state = self.state();
        state.dashboard_requests.push(request.clone());
        let version = state
            .dashboards
            .get(&request.id)
            .and_then(|d| d.version_number)
            .map(|v| v + 1)
            .unwrap_or(1);
        let definition = DashboardDefinition {
            id: request.id.clone(),
            name: request.name.clone(),
            arn: self.arn(AssetKind::Dashboard, &request.id),
            status: Some(status),
            version_number: Some(version),
            source_entity_arn: Some(request.template_arn.clone()),
            data_set_arns: request
                .data_set_references
                .iter()
                .map(|r| r.data_set_arn.clone())
                .collect(),
            theme_arn: request.theme_arn.clone(),
        };
        state.dashboards.insert(request.id.clone(), definition);
        Some(version)
    }
}

pub fn rds_data_source(api: &FakeQuickSight, id: &str, name: &str) -> DataSourceDefinition {
    DataSourceDefinition {
        id: id.to_string(),
        name: name.to_string(),
        arn: api.asset_arn(AssetKind::DataSource, id),
        source_type: Some(DataSourceType::from("POSTGRESQL")),
        parameters: Some(DataSourceParameters::RdsParameters(
            RdsParameters::builder()
                .instance_id("dev-db")
                .database("sales")
                .build()
                .unwrap(),
        )),
        vpc_connection_arn: None,
        ssl_properties: None,
        status: Some(AssetStatus::CreationSuccessful),
    }
}

/// A dataset reading one table from `data_source_id`, optionally joined to a
/// parent dataset.
pub fn relational_data_set(
    api: &FakeQuickSight,
    id: &str,
    name: &str,
    data_source_id: &str,
    parent: Option<&str>,
) -> DataSetDefinition {
    let table = PhysicalTable::RelationalTable(
        RelationalTable::builder()
            .data_source_arn(api.asset_arn(AssetKind::DataSource, data_source_id))
            .name(id)
            .input_columns(
                InputColumn::builder()
                    .name("amount")
                    .r#type(InputColumnDataType::from("DECIMAL"))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap(),
    );
    let mut logical_tables = HashMap::new();
    if let Some(parent) = parent {
        logical_tables.insert(
            "parent".to_string(),
            LogicalTable::builder()
                .alias("parent")
                .source(
                    LogicalTableSource::builder()
                        .data_set_arn(api.asset_arn(AssetKind::DataSet, parent))
                        .build(),
                )
                .build()
                .unwrap(),
        );
    }
    DataSetDefinition {
        id: id.to_string(),
        name: name.to_string(),
        arn: api.asset_arn(AssetKind::DataSet, id),
        physical_tables: HashMap::from([("t1".to_string(), table)]),
        logical_tables,
        import_mode: None,
        column_groups: None,
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub objects: Mutex<Vec<(String, String, String, String)>>,
}

impl RecordingStore {
    pub fn body(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(_, k, _, _)| k == key)
            .map(|(_, _, body, _)| body.clone())
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.objects.lock().unwrap().push((
            bucket.to_string(),
            key.to_string(),
            String::from_utf8(body)?,
            content_type.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, topic_arn: &str, _subject: &str, message: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("AuthorizationErrorException: not allowed to publish"));
        }
        self.messages
            .lock()
            .unwrap()
            .push((topic_arn.to_string(), message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMetrics {
    pub series: Vec<MetricSeries>,
    pub queries: Mutex<Vec<MetricQuery>>,
}

#[async_trait]
impl MetricsSource for FakeMetrics {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.series.clone())
    }
}
