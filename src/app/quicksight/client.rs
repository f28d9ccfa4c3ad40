use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_quicksight as quicksight;
use aws_sdk_quicksight::error::DisplayErrorContext;
use aws_sdk_quicksight::types::{
    AdHocFilteringOption, AnalysisSourceEntity, AnalysisSourceTemplate, CredentialPair,
    DashboardBehavior, DashboardPublishOptions, DashboardSourceEntity, DashboardSourceTemplate,
    DashboardUiState, DataSetReference as SdkDataSetReference, DataSourceCredentials,
    ExportToCsvOption, IdentityType, IngestionType, MemberType,
    RegisteredUserDashboardEmbeddingConfiguration,
    RegisteredUserEmbeddingExperienceConfiguration, ResourcePermission, ResourceStatus,
    SheetControlsOption, Tag, TemplateSourceAnalysis, TemplateSourceEntity,
    TemplateSourceTemplate, UserRole, VpcConnectionProperties,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::arn;
use super::fields::FieldValue;
use super::model::*;
use super::QuickSightApi;
use crate::app::config::PublishConfig;

/// [`QuickSightApi`] over `aws-sdk-quicksight`, bound to one account and region.
#[derive(Debug, Clone)]
pub struct SdkQuickSight {
    client: quicksight::Client,
    account_id: String,
    region: String,
}

impl SdkQuickSight {
    pub fn new(config: &aws_config::SdkConfig, account_id: impl Into<String>) -> Result<Self> {
        let region = config
            .region()
            .map(|r| r.as_ref().to_string())
            .ok_or_else(|| anyhow!("AWS config has no region"))?;
        Ok(Self {
            client: quicksight::Client::new(config),
            account_id: account_id.into(),
            region,
        })
    }
}

fn service_error<E>(operation: &str, target: &str, err: E) -> anyhow::Error
where
    E: std::error::Error,
{
    anyhow!("{} {} failed: {}", operation, target, DisplayErrorContext(&err))
}


fn status_from_sdk(status: Option<&ResourceStatus>) -> Option<AssetStatus> {
    status.map(|s| AssetStatus::parse(s.as_str()))
}

fn permission_to_sdk(permission: &Permission) -> Result<ResourcePermission> {
    Ok(ResourcePermission::builder()
        .principal(&permission.principal)
        .set_actions(Some(permission.actions.clone()))
        .build()?)
}

fn permissions_to_sdk(permissions: &[Permission]) -> Result<Vec<ResourcePermission>> {
    permissions.iter().map(permission_to_sdk).collect()
}

fn permission_from_sdk(permission: ResourcePermission) -> Option<Permission> {
    Some(Permission {
        principal: permission.principal.into_field()?,
        actions: permission.actions.into_field().unwrap_or_default(),
    })
}

fn references_to_sdk(references: &[DataSetReference]) -> Result<Vec<SdkDataSetReference>> {
    references
        .iter()
        .map(|reference| {
            Ok(SdkDataSetReference::builder()
                .data_set_placeholder(&reference.placeholder)
                .data_set_arn(&reference.data_set_arn)
                .build()?)
        })
        .collect()
}

fn publish_options(publish: &PublishConfig) -> DashboardPublishOptions {
    let availability = |enabled: bool| {
        if enabled {
            DashboardBehavior::Enabled
        } else {
            DashboardBehavior::Disabled
        }
    };
    let sheet_controls = if publish.sheet_controls_expanded {
        DashboardUiState::Expanded
    } else {
        DashboardUiState::Collapsed
    };
    DashboardPublishOptions::builder()
        .ad_hoc_filtering_option(
            AdHocFilteringOption::builder()
                .availability_status(availability(publish.ad_hoc_filtering))
                .build(),
        )
        .export_to_csv_option(
            ExportToCsvOption::builder()
                .availability_status(availability(publish.export_to_csv))
                .build(),
        )
        .sheet_controls_option(
            SheetControlsOption::builder()
                .visibility_state(sheet_controls)
                .build(),
        )
        .build()
}

fn summary(id: Option<String>, name: Option<String>, arn: Option<String>) -> Option<AssetSummary> {
    let id = id?;
    Some(AssetSummary {
        name: name.unwrap_or_else(|| id.clone()),
        arn: arn.unwrap_or_default(),
        id,
    })
}

fn data_source_from_sdk(data_source: quicksight::types::DataSource) -> Option<DataSourceDefinition> {
    let id = data_source.data_source_id?;
    Some(DataSourceDefinition {
        name: data_source.name.unwrap_or_else(|| id.clone()),
        arn: data_source.arn.unwrap_or_default(),
        source_type: data_source.r#type,
        parameters: data_source.data_source_parameters,
        vpc_connection_arn: data_source
            .vpc_connection_properties
            .and_then(|vpc| vpc.vpc_connection_arn.into_field()),
        ssl_properties: data_source.ssl_properties,
        status: status_from_sdk(data_source.status.as_ref()),
        id,
    })
}

fn user_from_sdk(user: quicksight::types::User) -> Option<UserSummary> {
    Some(UserSummary {
        user_name: user.user_name?,
        arn: user.arn.unwrap_or_default(),
        email: user.email,
        role: user.role.map(|role| role.as_str().to_string()),
        active: user.active.into_field().unwrap_or(false),
    })
}

fn ingestion_from_sdk(ingestion: quicksight::types::Ingestion) -> IngestionSummary {
    let state = ingestion
        .ingestion_status
        .into_field()
        .map(|status| IngestionState::parse(status.as_str()))
        .unwrap_or_else(|| IngestionState::Other("UNKNOWN".to_string()));
    let created_at = ingestion
        .created_time
        .into_field()
        .and_then(|time| DateTime::<Utc>::from_timestamp(time.secs(), 0));
    IngestionSummary {
        id: ingestion.ingestion_id.unwrap_or_default(),
        state,
        created_at,
        duration_secs: ingestion.ingestion_time_in_seconds,
        error: ingestion.error_info.and_then(|info| info.message),
    }
}

/// Turn a describe result into `Ok(None)` on ResourceNotFoundException.
macro_rules! describe_or_none {
    ($result:expr, $operation:expr, $id:expr) => {
        match $result {
            Ok(output) => Some(output),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false) =>
            {
                debug!("{} {}: not found", $operation, $id);
                None
            }
            Err(err) => return Err(service_error($operation, $id, err)),
        }
    };
}

#[async_trait]
impl QuickSightApi for SdkQuickSight {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn list_data_sources(&self) -> Result<Vec<DataSourceDefinition>> {
        let mut data_sources = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self
                .client
                .list_data_sources()
                .aws_account_id(&self.account_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListDataSources", &self.account_id, e))?;

            data_sources.extend(
                response
                    .data_sources
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(data_source_from_sdk),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        debug!("Listed {} data sources in {}", data_sources.len(), self.account_id);
        Ok(data_sources)
    }

    async fn describe_data_source(&self, id: &str) -> Result<Option<DataSourceDefinition>> {
        let result = self
            .client
            .describe_data_source()
            .aws_account_id(&self.account_id)
            .data_source_id(id)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeDataSource", id);
        Ok(output
            .and_then(|o| o.data_source)
            .and_then(data_source_from_sdk))
    }

    async fn create_data_source(&self, request: &DataSourceCreate) -> Result<()> {
        let definition = &request.definition;
        let mut builder = self
            .client
            .create_data_source()
            .aws_account_id(&self.account_id)
            .data_source_id(&definition.id)
            .name(&definition.name)
            .set_type(definition.source_type.clone())
            .set_data_source_parameters(definition.parameters.clone())
            .set_ssl_properties(definition.ssl_properties.clone())
            .set_permissions(Some(permissions_to_sdk(&request.permissions)?));

        if let Some(vpc_arn) = &definition.vpc_connection_arn {
            builder = builder.vpc_connection_properties(
                VpcConnectionProperties::builder()
                    .vpc_connection_arn(vpc_arn)
                    .build()?,
            );
        }
        if let Some(credentials) = &request.credentials {
            builder = builder.credentials(
                DataSourceCredentials::builder()
                    .credential_pair(
                        CredentialPair::builder()
                            .username(&credentials.username)
                            .password(&credentials.password)
                            .build()?,
                    )
                    .build(),
            );
        }
        for (key, value) in &request.tags {
            builder = builder.tags(Tag::builder().key(key).value(value).build()?);
        }

        builder
            .send()
            .await
            .map_err(|e| service_error("CreateDataSource", &definition.id, e))?;
        Ok(())
    }

    async fn delete_data_source(&self, id: &str) -> Result<()> {
        self.client
            .delete_data_source()
            .aws_account_id(&self.account_id)
            .data_source_id(id)
            .send()
            .await
            .map_err(|e| service_error("DeleteDataSource", id, e))?;
        Ok(())
    }

    async fn list_data_sets(&self) -> Result<Vec<AssetSummary>> {
        let mut data_sets = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self.client.list_data_sets().aws_account_id(&self.account_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListDataSets", &self.account_id, e))?;

            data_sets.extend(
                response
                    .data_set_summaries
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|s| summary(s.data_set_id, s.name, s.arn)),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(data_sets)
    }

    async fn describe_data_set(&self, id: &str) -> Result<Option<DataSetDefinition>> {
        let result = self
            .client
            .describe_data_set()
            .aws_account_id(&self.account_id)
            .data_set_id(id)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeDataSet", id);

        Ok(output.and_then(|o| o.data_set).and_then(|data_set| {
            let id = data_set.data_set_id?;
            Some(DataSetDefinition {
                name: data_set.name.unwrap_or_else(|| id.clone()),
                arn: data_set.arn.unwrap_or_default(),
                physical_tables: data_set.physical_table_map.unwrap_or_default(),
                logical_tables: data_set.logical_table_map.unwrap_or_default(),
                import_mode: data_set.import_mode,
                column_groups: data_set.column_groups,
                id,
            })
        }))
    }

    async fn create_data_set(
        &self,
        definition: &DataSetDefinition,
        permissions: &[Permission],
    ) -> Result<()> {
        let logical_tables =
            (!definition.logical_tables.is_empty()).then(|| definition.logical_tables.clone());
        self.client
            .create_data_set()
            .aws_account_id(&self.account_id)
            .data_set_id(&definition.id)
            .name(&definition.name)
            .set_physical_table_map(Some(definition.physical_tables.clone()))
            .set_logical_table_map(logical_tables)
            .set_import_mode(definition.import_mode.clone())
            .set_column_groups(definition.column_groups.clone())
            .set_permissions(Some(permissions_to_sdk(permissions)?))
            .send()
            .await
            .map_err(|e| service_error("CreateDataSet", &definition.id, e))?;
        Ok(())
    }

    async fn update_data_set(&self, definition: &DataSetDefinition) -> Result<()> {
        let logical_tables =
            (!definition.logical_tables.is_empty()).then(|| definition.logical_tables.clone());
        self.client
            .update_data_set()
            .aws_account_id(&self.account_id)
            .data_set_id(&definition.id)
            .name(&definition.name)
            .set_physical_table_map(Some(definition.physical_tables.clone()))
            .set_logical_table_map(logical_tables)
            .set_import_mode(definition.import_mode.clone())
            .set_column_groups(definition.column_groups.clone())
            .send()
            .await
            .map_err(|e| service_error("UpdateDataSet", &definition.id, e))?;
        Ok(())
    }

    async fn list_themes(&self) -> Result<Vec<AssetSummary>> {
        let mut themes = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self.client.list_themes().aws_account_id(&self.account_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListThemes", &self.account_id, e))?;

            themes.extend(
                response
                    .theme_summary_list
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|s| summary(s.theme_id, s.name, s.arn)),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(themes)
    }

    async fn describe_theme(&self, id: &str) -> Result<Option<ThemeDefinition>> {
        let result = self
            .client
            .describe_theme()
            .aws_account_id(&self.account_id)
            .theme_id(id)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeTheme", id);

        Ok(output.and_then(|o| o.theme).and_then(|theme| {
            let id = theme.theme_id?;
            let version = theme.version;
            Some(ThemeDefinition {
                name: theme.name.unwrap_or_else(|| id.clone()),
                arn: theme.arn.unwrap_or_default(),
                base_theme_id: version.as_ref().and_then(|v| v.base_theme_id.clone()),
                configuration: version.and_then(|v| v.configuration),
                id,
            })
        }))
    }

    async fn create_theme(&self, definition: &ThemeDefinition) -> Result<()> {
        self.client
            .create_theme()
            .aws_account_id(&self.account_id)
            .theme_id(&definition.id)
            .name(&definition.name)
            .set_base_theme_id(definition.base_theme_id.clone())
            .set_configuration(definition.configuration.clone())
            .send()
            .await
            .map_err(|e| service_error("CreateTheme", &definition.id, e))?;
        Ok(())
    }

    async fn create_template_from_analysis(
        &self,
        template_id: &str,
        name: &str,
        analysis_arn: &str,
        data_set_references: &[DataSetReference],
    ) -> Result<()> {
        let source = TemplateSourceEntity::builder()
            .source_analysis(
                TemplateSourceAnalysis::builder()
                    .arn(analysis_arn)
                    .set_data_set_references(Some(references_to_sdk(data_set_references)?))
                    .build()?,
            )
            .build();
        self.client
            .create_template()
            .aws_account_id(&self.account_id)
            .template_id(template_id)
            .name(name)
            .source_entity(source)
            .send()
            .await
            .map_err(|e| service_error("CreateTemplate", template_id, e))?;
        Ok(())
    }

    async fn copy_template(
        &self,
        template_id: &str,
        name: &str,
        source_template_arn: &str,
    ) -> Result<()> {
        let source = TemplateSourceEntity::builder()
            .source_template(
                TemplateSourceTemplate::builder()
                    .arn(source_template_arn)
                    .build()?,
            )
            .build();
        self.client
            .create_template()
            .aws_account_id(&self.account_id)
            .template_id(template_id)
            .name(name)
            .source_entity(source)
            .send()
            .await
            .map_err(|e| service_error("CreateTemplate", template_id, e))?;
        Ok(())
    }

    async fn describe_template(&self, id: &str) -> Result<Option<TemplateDefinition>> {
        let result = self
            .client
            .describe_template()
            .aws_account_id(&self.account_id)
            .template_id(id)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeTemplate", id);

        Ok(output.and_then(|o| o.template).and_then(|template| {
            let id = template.template_id?;
            let version = template.version;
            Some(TemplateDefinition {
                name: template.name.unwrap_or_else(|| id.clone()),
                arn: template.arn.unwrap_or_default(),
                status: status_from_sdk(version.as_ref().and_then(|v| v.status.as_ref())),
                placeholders: version
                    .and_then(|v| v.data_set_configurations)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|config| config.placeholder)
                    .collect(),
                id,
            })
        }))
    }

    async fn delete_template(&self, id: &str) -> Result<()> {
        self.client
            .delete_template()
            .aws_account_id(&self.account_id)
            .template_id(id)
            .send()
            .await
            .map_err(|e| service_error("DeleteTemplate", id, e))?;
        Ok(())
    }

    async fn list_analyses(&self) -> Result<Vec<AssetSummary>> {
        let mut analyses = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self.client.list_analyses().aws_account_id(&self.account_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListAnalyses", &self.account_id, e))?;

            for analysis in response.analysis_summary_list.unwrap_or_default() {
                // Deleted analyses linger in listings during their recovery window
                if matches!(analysis.status, Some(ResourceStatus::Deleted)) {
                    continue;
                }
                if let Some(s) = summary(analysis.analysis_id, analysis.name, analysis.arn) {
                    analyses.push(s);
                }
            }

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(analyses)
    }

    async fn describe_analysis(&self, id: &str) -> Result<Option<AnalysisDefinition>> {
        let result = self
            .client
            .describe_analysis()
            .aws_account_id(&self.account_id)
            .analysis_id(id)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeAnalysis", id);

        Ok(output.and_then(|o| o.analysis).and_then(|analysis| {
            let id = analysis.analysis_id?;
            Some(AnalysisDefinition {
                name: analysis.name.unwrap_or_else(|| id.clone()),
                arn: analysis.arn.unwrap_or_default(),
                status: status_from_sdk(analysis.status.as_ref()),
                data_set_arns: analysis.data_set_arns.unwrap_or_default(),
                theme_arn: analysis.theme_arn,
                id,
            })
        }))
    }

    async fn create_analysis(&self, request: &AnalysisRequest) -> Result<()> {
        let source = AnalysisSourceEntity::builder()
            .source_template(
                AnalysisSourceTemplate::builder()
                    .arn(&request.template_arn)
                    .set_data_set_references(Some(references_to_sdk(
                        &request.data_set_references,
                    )?))
                    .build()?,
            )
            .build();
        self.client
            .create_analysis()
            .aws_account_id(&self.account_id)
            .analysis_id(&request.id)
            .name(&request.name)
            .source_entity(source)
            .set_theme_arn(request.theme_arn.clone())
            .set_permissions(Some(permissions_to_sdk(&request.permissions)?))
            .send()
            .await
            .map_err(|e| service_error("CreateAnalysis", &request.id, e))?;
        Ok(())
    }

    async fn update_analysis(&self, request: &AnalysisRequest) -> Result<()> {
        let source = AnalysisSourceEntity::builder()
            .source_template(
                AnalysisSourceTemplate::builder()
                    .arn(&request.template_arn)
                    .set_data_set_references(Some(references_to_sdk(
                        &request.data_set_references,
                    )?))
                    .build()?,
            )
            .build();
        self.client
            .update_analysis()
            .aws_account_id(&self.account_id)
            .analysis_id(&request.id)
            .name(&request.name)
            .source_entity(source)
            .set_theme_arn(request.theme_arn.clone())
            .send()
            .await
            .map_err(|e| service_error("UpdateAnalysis", &request.id, e))?;
        Ok(())
    }

    async fn delete_analysis(&self, id: &str) -> Result<()> {
        self.client
            .delete_analysis()
            .aws_account_id(&self.account_id)
            .analysis_id(id)
            .force_delete_without_recovery(true)
            .send()
            .await
            .map_err(|e| service_error("DeleteAnalysis", id, e))?;
        Ok(())
    }

    async fn list_dashboards(&self) -> Result<Vec<AssetSummary>> {
        let mut dashboards = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self
                .client
                .list_dashboards()
                .aws_account_id(&self.account_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListDashboards", &self.account_id, e))?;

            dashboards.extend(
                response
                    .dashboard_summary_list
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|s| summary(s.dashboard_id, s.name, s.arn)),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(dashboards)
    }

    async fn describe_dashboard(&self, id: &str) -> Result<Option<DashboardDefinition>> {
        let result = self
            .client
            .describe_dashboard()
            .aws_account_id(&self.account_id)
            .dashboard_id(id)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeDashboard", id);

        Ok(output.and_then(|o| o.dashboard).and_then(|dashboard| {
            let id = dashboard.dashboard_id?;
            let version = dashboard.version;
            Some(DashboardDefinition {
                name: dashboard.name.unwrap_or_else(|| id.clone()),
                arn: dashboard.arn.unwrap_or_default(),
                status: status_from_sdk(version.as_ref().and_then(|v| v.status.as_ref())),
                version_number: version.as_ref().and_then(|v| v.version_number),
                source_entity_arn: version.as_ref().and_then(|v| v.source_entity_arn.clone()),
                data_set_arns: version
                    .as_ref()
                    .and_then(|v| v.data_set_arns.clone())
                    .unwrap_or_default(),
                theme_arn: version.and_then(|v| v.theme_arn),
                id,
            })
        }))
    }

    async fn create_dashboard(&self, request: &DashboardRequest) -> Result<()> {
        let source = DashboardSourceEntity::builder()
            .source_template(
                DashboardSourceTemplate::builder()
                    .arn(&request.template_arn)
                    .set_data_set_references(Some(references_to_sdk(
                        &request.data_set_references,
                    )?))
                    .build()?,
            )
            .build();
        self.client
            .create_dashboard()
            .aws_account_id(&self.account_id)
            .dashboard_id(&request.id)
            .name(&request.name)
            .source_entity(source)
            .set_theme_arn(request.theme_arn.clone())
            .set_version_description(request.version_description.clone())
            .dashboard_publish_options(publish_options(&request.publish))
            .set_permissions(Some(permissions_to_sdk(&request.permissions)?))
            .send()
            .await
            .map_err(|e| service_error("CreateDashboard", &request.id, e))?;
        Ok(())
    }

    async fn update_dashboard(&self, request: &DashboardRequest) -> Result<Option<i64>> {
        let source = DashboardSourceEntity::builder()
            .source_template(
                DashboardSourceTemplate::builder()
                    .arn(&request.template_arn)
                    .set_data_set_references(Some(references_to_sdk(
                        &request.data_set_references,
                    )?))
                    .build()?,
            )
            .build();
        let response = self
            .client
            .update_dashboard()
            .aws_account_id(&self.account_id)
            .dashboard_id(&request.id)
            .name(&request.name)
            .source_entity(source)
            .set_theme_arn(request.theme_arn.clone())
            .set_version_description(request.version_description.clone())
            .dashboard_publish_options(publish_options(&request.publish))
            .send()
            .await
            .map_err(|e| service_error("UpdateDashboard", &request.id, e))?;

        Ok(response
            .version_arn
            .as_deref()
            .and_then(arn::version_number))
    }

    async fn publish_dashboard_version(&self, id: &str, version_number: i64) -> Result<()> {
        self.client
            .update_dashboard_published_version()
            .aws_account_id(&self.account_id)
            .dashboard_id(id)
            .version_number(version_number)
            .send()
            .await
            .map_err(|e| service_error("UpdateDashboardPublishedVersion", id, e))?;
        Ok(())
    }

    async fn delete_dashboard(&self, id: &str) -> Result<()> {
        self.client
            .delete_dashboard()
            .aws_account_id(&self.account_id)
            .dashboard_id(id)
            .send()
            .await
            .map_err(|e| service_error("DeleteDashboard", id, e))?;
        Ok(())
    }

    async fn grant_permissions(
        &self,
        kind: AssetKind,
        id: &str,
        permission: &Permission,
    ) -> Result<()> {
        let grant = permission_to_sdk(permission)?;
        let account = &self.account_id;
        match kind {
            AssetKind::DataSource => self
                .client
                .update_data_source_permissions()
                .aws_account_id(account)
                .data_source_id(id)
                .grant_permissions(grant)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| service_error("UpdateDataSourcePermissions", id, e)),
            AssetKind::DataSet => self
                .client
                .update_data_set_permissions()
                .aws_account_id(account)
                .data_set_id(id)
                .grant_permissions(grant)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| service_error("UpdateDataSetPermissions", id, e)),
            AssetKind::Theme => self
                .client
                .update_theme_permissions()
                .aws_account_id(account)
                .theme_id(id)
                .grant_permissions(grant)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| service_error("UpdateThemePermissions", id, e)),
            AssetKind::Analysis => self
                .client
                .update_analysis_permissions()
                .aws_account_id(account)
                .analysis_id(id)
                .grant_permissions(grant)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| service_error("UpdateAnalysisPermissions", id, e)),
            AssetKind::Dashboard => self
                .client
                .update_dashboard_permissions()
                .aws_account_id(account)
                .dashboard_id(id)
                .grant_permissions(grant)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| service_error("UpdateDashboardPermissions", id, e)),
            AssetKind::Template => self
                .client
                .update_template_permissions()
                .aws_account_id(account)
                .template_id(id)
                .grant_permissions(grant)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| service_error("UpdateTemplatePermissions", id, e)),
            AssetKind::Folder => self
                .client
                .update_folder_permissions()
                .aws_account_id(account)
                .folder_id(id)
                .grant_permissions(grant)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| service_error("UpdateFolderPermissions", id, e)),
        }
    }

    async fn describe_permissions(&self, kind: AssetKind, id: &str) -> Result<Vec<Permission>> {
        let account = &self.account_id;
        let permissions = match kind {
            AssetKind::DataSource => self
                .client
                .describe_data_source_permissions()
                .aws_account_id(account)
                .data_source_id(id)
                .send()
                .await
                .map_err(|e| service_error("DescribeDataSourcePermissions", id, e))?
                .permissions,
            AssetKind::DataSet => self
                .client
                .describe_data_set_permissions()
                .aws_account_id(account)
                .data_set_id(id)
                .send()
                .await
                .map_err(|e| service_error("DescribeDataSetPermissions", id, e))?
                .permissions,
            AssetKind::Theme => self
                .client
                .describe_theme_permissions()
                .aws_account_id(account)
                .theme_id(id)
                .send()
                .await
                .map_err(|e| service_error("DescribeThemePermissions", id, e))?
                .permissions,
            AssetKind::Analysis => self
                .client
                .describe_analysis_permissions()
                .aws_account_id(account)
                .analysis_id(id)
                .send()
                .await
                .map_err(|e| service_error("DescribeAnalysisPermissions", id, e))?
                .permissions,
            AssetKind::Dashboard => self
                .client
                .describe_dashboard_permissions()
                .aws_account_id(account)
                .dashboard_id(id)
                .send()
                .await
                .map_err(|e| service_error("DescribeDashboardPermissions", id, e))?
                .permissions,
            AssetKind::Template => self
                .client
                .describe_template_permissions()
                .aws_account_id(account)
                .template_id(id)
                .send()
                .await
                .map_err(|e| service_error("DescribeTemplatePermissions", id, e))?
                .permissions,
            AssetKind::Folder => self
                .client
                .describe_folder_permissions()
                .aws_account_id(account)
                .folder_id(id)
                .send()
                .await
                .map_err(|e| service_error("DescribeFolderPermissions", id, e))?
                .permissions,
        };

        Ok(permissions
            .unwrap_or_default()
            .into_iter()
            .filter_map(permission_from_sdk)
            .collect())
    }

    async fn list_folders(&self) -> Result<Vec<AssetSummary>> {
        let mut folders = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self.client.list_folders().aws_account_id(&self.account_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListFolders", &self.account_id, e))?;

            folders.extend(
                response
                    .folder_summary_list
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|s| summary(s.folder_id, s.name, s.arn)),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(folders)
    }

    async fn describe_folder(&self, folder_id: &str) -> Result<Option<FolderDefinition>> {
        let result = self
            .client
            .describe_folder()
            .aws_account_id(&self.account_id)
            .folder_id(folder_id)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeFolder", folder_id);

        Ok(output.and_then(|o| o.folder).and_then(|folder| {
            let id = folder.folder_id?;
            Some(FolderDefinition {
                name: folder.name.unwrap_or_else(|| id.clone()),
                arn: folder.arn.unwrap_or_default(),
                folder_path: folder.folder_path.unwrap_or_default(),
                id,
            })
        }))
    }

    async fn list_folder_members(&self, folder_id: &str) -> Result<Vec<FolderMember>> {
        let mut members = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self
                .client
                .list_folder_members()
                .aws_account_id(&self.account_id)
                .folder_id(folder_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListFolderMembers", folder_id, e))?;

            members.extend(
                response
                    .folder_member_list
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|pair| {
                        Some(FolderMember {
                            member_id: pair.member_id?,
                            member_arn: pair.member_arn.unwrap_or_default(),
                        })
                    }),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(members)
    }

    async fn add_folder_member(
        &self,
        folder_id: &str,
        kind: AssetKind,
        member_id: &str,
    ) -> Result<()> {
        let member_type = kind
            .member_type()
            .ok_or_else(|| anyhow!("{} assets cannot be placed in folders", kind))?;
        self.client
            .create_folder_membership()
            .aws_account_id(&self.account_id)
            .folder_id(folder_id)
            .member_id(member_id)
            .member_type(MemberType::from(member_type))
            .send()
            .await
            .map_err(|e| service_error("CreateFolderMembership", member_id, e))?;
        Ok(())
    }

    async fn list_users(&self, namespace: &str) -> Result<Vec<UserSummary>> {
        let mut users = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self
                .client
                .list_users()
                .aws_account_id(&self.account_id)
                .namespace(namespace);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListUsers", namespace, e))?;

            users.extend(
                response
                    .user_list
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(user_from_sdk),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(users)
    }

    async fn describe_user(
        &self,
        namespace: &str,
        user_name: &str,
    ) -> Result<Option<UserSummary>> {
        let result = self
            .client
            .describe_user()
            .aws_account_id(&self.account_id)
            .namespace(namespace)
            .user_name(user_name)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeUser", user_name);
        Ok(output.and_then(|o| o.user).and_then(user_from_sdk))
    }

    async fn register_reader(
        &self,
        namespace: &str,
        user_name: &str,
        email: &str,
    ) -> Result<UserSummary> {
        let response = self
            .client
            .register_user()
            .aws_account_id(&self.account_id)
            .namespace(namespace)
            .identity_type(IdentityType::from("QUICKSIGHT"))
            .user_role(UserRole::from("READER"))
            .user_name(user_name)
            .email(email)
            .send()
            .await
            .map_err(|e| service_error("RegisterUser", user_name, e))?;

        response
            .user
            .and_then(user_from_sdk)
            .with_context(|| format!("RegisterUser {} returned no user", user_name))
    }

    async fn list_groups(&self, namespace: &str) -> Result<Vec<String>> {
        let mut groups = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self
                .client
                .list_groups()
                .aws_account_id(&self.account_id)
                .namespace(namespace);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListGroups", namespace, e))?;

            groups.extend(
                response
                    .group_list
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|group| group.group_name),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(groups)
    }

    async fn create_group(&self, namespace: &str, group_name: &str) -> Result<bool> {
        let result = self
            .client
            .create_group()
            .aws_account_id(&self.account_id)
            .namespace(namespace)
            .group_name(group_name)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_resource_exists_exception())
                    .unwrap_or(false) =>
            {
                debug!("Group {} already exists", group_name);
                Ok(false)
            }
            Err(err) => Err(service_error("CreateGroup", group_name, err)),
        }
    }

    async fn add_group_member(
        &self,
        namespace: &str,
        group_name: &str,
        user_name: &str,
    ) -> Result<()> {
        self.client
            .create_group_membership()
            .aws_account_id(&self.account_id)
            .namespace(namespace)
            .group_name(group_name)
            .member_name(user_name)
            .send()
            .await
            .map_err(|e| service_error("CreateGroupMembership", user_name, e))?;
        Ok(())
    }

    async fn create_ingestion(&self, data_set_id: &str, ingestion_id: &str) -> Result<()> {
        let result = self
            .client
            .create_ingestion()
            .aws_account_id(&self.account_id)
            .data_set_id(data_set_id)
            .ingestion_id(ingestion_id)
            .ingestion_type(IngestionType::from("FULL_REFRESH"))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_limit_exceeded_exception())
                    .unwrap_or(false) =>
            {
                Err(anyhow!(
                    "CreateIngestion {} failed: LimitExceededException: {}",
                    data_set_id,
                    DisplayErrorContext(&err)
                ))
            }
            Err(err) => Err(service_error("CreateIngestion", data_set_id, err)),
        }
    }

    async fn describe_ingestion(
        &self,
        data_set_id: &str,
        ingestion_id: &str,
    ) -> Result<Option<IngestionSummary>> {
        let result = self
            .client
            .describe_ingestion()
            .aws_account_id(&self.account_id)
            .data_set_id(data_set_id)
            .ingestion_id(ingestion_id)
            .send()
            .await;
        let output = describe_or_none!(result, "DescribeIngestion", ingestion_id);
        Ok(output.and_then(|o| o.ingestion).map(ingestion_from_sdk))
    }

    async fn list_ingestions(&self, data_set_id: &str) -> Result<Vec<IngestionSummary>> {
        let mut ingestions = Vec::new();
        let mut next_token = None;

        loop {
            let mut request = self
                .client
                .list_ingestions()
                .aws_account_id(&self.account_id)
                .data_set_id(data_set_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| service_error("ListIngestions", data_set_id, e))?;

            ingestions.extend(
                response
                    .ingestions
                    .unwrap_or_default()
                    .into_iter()
                    .map(ingestion_from_sdk),
            );

            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(ingestions)
    }

    async fn generate_dashboard_embed_url(
        &self,
        user_arn: &str,
        dashboard_id: &str,
        session_lifetime_minutes: i64,
    ) -> Result<String> {
        let experience = RegisteredUserEmbeddingExperienceConfiguration::builder()
            .dashboard(
                RegisteredUserDashboardEmbeddingConfiguration::builder()
                    .initial_dashboard_id(dashboard_id)
                    .build()?,
            )
            .build();

        let response = self
            .client
            .generate_embed_url_for_registered_user()
            .aws_account_id(&self.account_id)
            .user_arn(user_arn)
            .session_lifetime_in_minutes(session_lifetime_minutes)
            .experience_configuration(experience)
            .send()
            .await
            .map_err(|e| service_error("GenerateEmbedUrlForRegisteredUser", dashboard_id, e))?;

        response
            .embed_url
            .into_field()
            .filter(|url| !url.is_empty())
            .with_context(|| format!("No embed URL returned for dashboard {}", dashboard_id))
    }
}
