//! Incremental asset migration between QuickSight accounts and regions.
//!
//! A run resolves the requested assets in the source, pulls in what they
//! depend on, and then walks the stages in dependency order: data sources,
//! datasets, themes, analyses, dashboards. Every asset goes through
//! describe, transform, create-or-update and a bounded status poll. Failures
//! are recorded and the run moves on; nothing is rolled back.

pub mod naming;
pub mod poll;
pub mod report;
pub mod target;

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;

use crate::app::config::{MigrationConfig, MigrationManifest, PublishConfig};
use crate::app::quicksight::arn::{self, ResourceArn};
use crate::app::quicksight::permissions::{
    ANALYSIS_OWNER_ACTIONS, DASHBOARD_OWNER_ACTIONS, DATA_SET_OWNER_ACTIONS,
    DATA_SOURCE_OWNER_ACTIONS, TEMPLATE_SHARE_ACTIONS, THEME_OWNER_ACTIONS,
};
use crate::app::quicksight::{
    find_by_name_or_id, AnalysisDefinition, AnalysisRequest, AssetKind, AssetStatus, AssetSummary,
    DashboardRequest, DataSetDefinition, DataSetReference, Permission, QuickSightApi,
    TemplateDefinition,
};
use crate::app::sdk_errors::categorize_error;

use naming::EnvironmentNaming;
use poll::{PollOutcome, PollPolicy};
use report::{FailureRecord, MigrationReport};
use target::{
    referenced_data_source_ids, referenced_parent_data_set_ids, retarget_data_set,
    DataSourceTarget,
};

/// Asset type named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MigrationKind {
    DataSource,
    DataSet,
    Theme,
    Analysis,
    Dashboard,
    /// Every list in the configured manifest.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    pub kind: MigrationKind,
    /// Asset names or ids in the source account.
    pub items: Vec<String>,
}

impl MigrationRequest {
    /// Names to migrate per asset type.
    pub fn plan(&self, manifest: &MigrationManifest) -> MigrationManifest {
        let mut plan = MigrationManifest::default();
        let items = self.items.clone();
        match self.kind {
            MigrationKind::DataSource => plan.data_sources = items,
            MigrationKind::DataSet => plan.data_sets = items,
            MigrationKind::Theme => plan.themes = items,
            MigrationKind::Analysis => plan.analyses = items,
            MigrationKind::Dashboard => plan.dashboards = items,
            MigrationKind::All => plan = manifest.clone(),
        }
        plan
    }
}

#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub naming: EnvironmentNaming,
    pub data_source_target: DataSourceTarget,
    /// Principal receiving owner permissions on everything created in the target.
    pub target_owner: String,
    pub poll: PollPolicy,
    pub target_folder_id: Option<String>,
    pub publish: PublishConfig,
    pub builtin_themes: Vec<String>,
}

impl MigrationSettings {
    pub fn from_config(config: &MigrationConfig, data_source_target: DataSourceTarget) -> Self {
        let target = &config.target;
        Self {
            naming: EnvironmentNaming::new(
                config.source_suffix.clone(),
                config.target_suffix.clone(),
            ),
            data_source_target,
            target_owner: arn::user_arn(
                target.identity_region(),
                &target.account_id,
                &target.namespace,
                target.admin_user.as_deref().unwrap_or("root"),
            ),
            poll: config.poll.into(),
            target_folder_id: config.target_folder_id.clone(),
            publish: config.publish,
            builtin_themes: config.builtin_themes.clone(),
        }
    }
}

/// Ids to migrate, per stage, in the order they will run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StagePlan {
    data_sources: Vec<String>,
    data_sets: Vec<String>,
    themes: Vec<String>,
    analyses: Vec<String>,
    dashboards: Vec<String>,
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}

/// A failed step inside one asset's migration.
struct StepFailure {
    step: &'static str,
    error: anyhow::Error,
}

trait StepContext<T> {
    fn step(self, step: &'static str) -> std::result::Result<T, StepFailure>;
}

impl<T> StepContext<T> for Result<T> {
    fn step(self, step: &'static str) -> std::result::Result<T, StepFailure> {
        self.map_err(|error| StepFailure { step, error })
    }
}

type StepResult<T> = std::result::Result<T, StepFailure>;

/// Turn a poll outcome into success or an error naming the final state.
fn require_success(what: &str, outcome: PollOutcome<AssetStatus>) -> Result<AssetStatus> {
    match outcome {
        PollOutcome::Settled(status) if status.is_successful() => Ok(status),
        PollOutcome::Settled(status) => Err(anyhow!("{} ended in {}", what, status)),
        PollOutcome::TimedOut(last) => Err(anyhow!(
            "{} timed out waiting for a terminal status (last seen: {})",
            what,
            last.map(|s| s.to_string())
                .unwrap_or_else(|| "not visible".to_string())
        )),
    }
}

/// Order datasets so every parent dataset in the batch precedes its children.
fn parents_first(definitions: Vec<DataSetDefinition>) -> Vec<DataSetDefinition> {
    let batch: HashSet<String> = definitions.iter().map(|d| d.id.clone()).collect();
    let mut placed: HashSet<String> = HashSet::new();
    let mut pending = definitions;
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|definition| {
            referenced_parent_data_set_ids(definition)
                .iter()
                .all(|parent| !batch.contains(parent) || placed.contains(parent))
        });
        if ready.is_empty() {
            // Cycle or self-reference; keep the remaining order.
            ordered.extend(blocked);
            break;
        }
        placed.extend(ready.iter().map(|d| d.id.clone()));
        ordered.extend(ready);
        pending = blocked;
    }
    ordered
}

pub struct MigrationDriver<'a> {
    source: &'a dyn QuickSightApi,
    target: &'a dyn QuickSightApi,
    settings: MigrationSettings,
}

impl<'a> MigrationDriver<'a> {
    pub fn new(
        source: &'a dyn QuickSightApi,
        target: &'a dyn QuickSightApi,
        settings: MigrationSettings,
    ) -> Self {
        Self {
            source,
            target,
            settings,
        }
    }

    fn cross_account(&self) -> bool {
        self.source.account_id() != self.target.account_id()
    }

    fn owner(&self, actions: &[&str]) -> Permission {
        Permission::new(self.settings.target_owner.clone(), actions)
    }

    fn fail(
        &self,
        report: &mut MigrationReport,
        kind: AssetKind,
        asset_id: &str,
        name: &str,
        failure: StepFailure,
    ) {
        let error_type = categorize_error(&failure.error, "quicksight", failure.step).kind();
        let error = format!("{:#}", failure.error);
        qs_outcome!(kind, asset_id, err = error);
        report.failed(
            kind,
            FailureRecord {
                asset_id: asset_id.to_string(),
                name: name.to_string(),
                step: failure.step.to_string(),
                error,
                error_type,
            },
        );
    }

    /// Record the same failure against every asset of a stage that cannot start.
    fn fail_all(
        &self,
        report: &mut MigrationReport,
        kind: AssetKind,
        ids: &[String],
        step: &'static str,
        error: &anyhow::Error,
    ) {
        qs_error!("{} stage could not start: {:#}", kind, error);
        for id in ids {
            let name = self.settings.naming.map(id);
            self.fail(
                report,
                kind,
                id,
                &name,
                StepFailure {
                    step,
                    error: anyhow!("{:#}", error),
                },
            );
        }
    }

    /// Dataset listings of both accounts, used to bind template placeholders.
    async fn data_set_listings(&self) -> Result<(Vec<AssetSummary>, Vec<AssetSummary>)> {
        let source_sets = self
            .source
            .list_data_sets()
            .await
            .context("Failed to list source datasets")?;
        let target_sets = self
            .target
            .list_data_sets()
            .await
            .context("Failed to list target datasets")?;
        Ok((source_sets, target_sets))
    }

    fn succeed(&self, report: &mut MigrationReport, kind: AssetKind, asset: AssetSummary) {
        qs_outcome!(kind, asset.id, ok);
        report.succeeded(kind, asset);
    }

    /// Run one migration request and return the per-stage outcome lists.
    pub async fn run(
        &self,
        request: &MigrationRequest,
        manifest: &MigrationManifest,
    ) -> Result<MigrationReport> {
        let names = request.plan(manifest);
        let mut report = MigrationReport::default();
        qs_info!(
            "Migrating {:?} from {}:{} to {}:{}",
            request.kind,
            self.source.account_id(),
            self.source.region(),
            self.target.account_id(),
            self.target.region()
        );

        let mut plan = self.resolve(&names, &mut report).await;
        self.add_dependencies(&mut plan).await;

        self.migrate_data_sources(&plan.data_sources, &mut report).await;
        self.migrate_data_sets(&plan.data_sets, &mut report).await;
        self.migrate_themes(&plan.themes, &mut report).await;
        self.migrate_analyses(&plan.analyses, &mut report).await;
        self.migrate_dashboards(&plan.dashboards, &mut report).await;
        self.place_in_folder(&mut report).await;

        qs_info!(
            "Migration finished: {} succeeded, {} failed",
            report.success_count(),
            report.failure_count()
        );
        Ok(report)
    }

    async fn resolve(
        &self,
        names: &MigrationManifest,
        report: &mut MigrationReport,
    ) -> StagePlan {
        let mut plan = StagePlan::default();
        let wanted = [
            (AssetKind::DataSource, &names.data_sources),
            (AssetKind::DataSet, &names.data_sets),
            (AssetKind::Theme, &names.themes),
            (AssetKind::Analysis, &names.analyses),
            (AssetKind::Dashboard, &names.dashboards),
        ];

        for (kind, items) in wanted {
            if items.is_empty() {
                continue;
            }
            let listed: Result<Vec<AssetSummary>> = match kind {
                AssetKind::DataSource => self
                    .source
                    .list_data_sources()
                    .await
                    .map(|sources| sources.iter().map(|d| d.summary()).collect()),
                AssetKind::DataSet => self.source.list_data_sets().await,
                AssetKind::Theme => self.source.list_themes().await,
                AssetKind::Analysis => self.source.list_analyses().await,
                _ => self.source.list_dashboards().await,
            };
            let available = match listed {
                Ok(available) => available,
                Err(error) => {
                    qs_error!("Could not list source {}s: {:#}", kind, error);
                    for item in items {
                        self.fail(
                            report,
                            kind,
                            item,
                            item,
                            StepFailure {
                                step: "resolve",
                                error: anyhow!("{:#}", error),
                            },
                        );
                    }
                    continue;
                }
            };

            for item in items {
                let Some(found) = find_by_name_or_id(&available, item) else {
                    self.fail(
                        report,
                        kind,
                        item,
                        item,
                        StepFailure {
                            step: "resolve",
                            error: anyhow!("ResourceNotFoundException: {} not found in source", item),
                        },
                    );
                    continue;
                };
                let ids = match kind {
                    AssetKind::DataSource => &mut plan.data_sources,
                    AssetKind::DataSet => &mut plan.data_sets,
                    AssetKind::Theme => &mut plan.themes,
                    AssetKind::Analysis => &mut plan.analyses,
                    _ => &mut plan.dashboards,
                };
                push_unique(ids, &found.id);
            }
        }
        plan
    }

    /// Add the datasets, data sources and themes the planned assets need.
    async fn add_dependencies(&self, plan: &mut StagePlan) {
        let mut referenced: Vec<(Vec<String>, Option<String>)> = Vec::new();
        for id in &plan.dashboards {
            match self.source.describe_dashboard(id).await {
                Ok(Some(dashboard)) => referenced.push((dashboard.data_set_arns, dashboard.theme_arn)),
                Ok(None) => {}
                Err(e) => qs_warn!("Could not read dependencies of dashboard {}: {:#}", id, e),
            }
        }
        for id in &plan.analyses {
            match self.source.describe_analysis(id).await {
                Ok(Some(analysis)) => referenced.push((analysis.data_set_arns, analysis.theme_arn)),
                Ok(None) => {}
                Err(e) => qs_warn!("Could not read dependencies of analysis {}: {:#}", id, e),
            }
        }

        for (data_set_arns, theme_arn) in referenced {
            for data_set_arn in &data_set_arns {
                if let Some(id) = arn::resource_id(data_set_arn) {
                    push_unique(&mut plan.data_sets, id);
                }
            }
            if let Some(theme_id) = theme_arn.as_deref().and_then(|t| self.copyable_theme(t)) {
                push_unique(&mut plan.themes, &theme_id);
            }
        }

        // Parent datasets and the data sources behind every planned dataset.
        let mut pending: Vec<String> = plan.data_sets.clone();
        let mut seen: HashSet<String> = HashSet::new();
        while let Some(id) = pending.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let definition = match self.source.describe_data_set(&id).await {
                Ok(Some(definition)) => definition,
                Ok(None) => continue,
                Err(e) => {
                    qs_warn!("Could not read dependencies of dataset {}: {:#}", id, e);
                    continue;
                }
            };
            for data_source_id in referenced_data_source_ids(&definition) {
                push_unique(&mut plan.data_sources, &data_source_id);
            }
            for parent in referenced_parent_data_set_ids(&definition) {
                push_unique(&mut plan.data_sets, &parent);
                pending.push(parent);
            }
        }
        qs_debug!("Stage plan after dependency expansion: {:?}", plan);
    }

    /// Theme id to copy for `theme_arn`, when it is not a built-in theme and
    /// the target is another account.
    fn copyable_theme(&self, theme_arn: &str) -> Option<String> {
        if !self.cross_account() {
            return None;
        }
        let parsed = ResourceArn::parse(theme_arn)?;
        if parsed.is_builtin() || self.is_builtin_theme(parsed.resource_id) {
            return None;
        }
        Some(parsed.resource_id.to_string())
    }

    fn is_builtin_theme(&self, id: &str) -> bool {
        self.settings.builtin_themes.iter().any(|b| b == id)
    }

    /// Theme ARN the target asset should use. Built-in themes are shared by
    /// every account; custom themes keep their id in the target.
    fn target_theme_arn(&self, source_theme_arn: Option<&str>) -> Option<String> {
        let theme_arn = source_theme_arn?;
        let parsed = ResourceArn::parse(theme_arn)?;
        if parsed.is_builtin() || self.is_builtin_theme(parsed.resource_id) {
            return Some(theme_arn.to_string());
        }
        arn::retarget(
            theme_arn,
            self.target.region(),
            self.target.account_id(),
            parsed.resource_id,
        )
    }

    async fn poll_status(
        &self,
        api: &dyn QuickSightApi,
        kind: AssetKind,
        id: &str,
    ) -> Result<PollOutcome<AssetStatus>> {
        let what = format!("{} {}", kind, id);
        self.settings
            .poll
            .wait_for_status(&what, move || async move {
                Ok(match kind {
                    AssetKind::DataSource => api.describe_data_source(id).await?.and_then(|d| d.status),
                    AssetKind::Analysis => api.describe_analysis(id).await?.and_then(|a| a.status),
                    AssetKind::Dashboard => api.describe_dashboard(id).await?.and_then(|d| d.status),
                    AssetKind::Template => api.describe_template(id).await?.and_then(|t| t.status),
                    _ => Some(AssetStatus::CreationSuccessful),
                })
            })
            .await
    }

    async fn migrate_data_sources(&self, ids: &[String], report: &mut MigrationReport) {
        qs_info!("Migrating {} data source(s)", ids.len());
        for id in ids {
            if let Err(failure) = self.migrate_data_source(id, report).await {
                self.fail(report, AssetKind::DataSource, id, id, failure);
            }
        }
    }

    async fn migrate_data_source(&self, id: &str, report: &mut MigrationReport) -> StepResult<()> {
        let kind = AssetKind::DataSource;
        let source = self
            .source
            .describe_data_source(id)
            .await
            .step("describe")?
            .ok_or_else(|| anyhow!("ResourceNotFoundException: data source {} not found", id))
            .step("describe")?;

        if source.parameters.is_none() {
            report.skipped(kind, id, "no connection parameters");
            return Ok(());
        }

        let target_id = self.settings.naming.map(id);
        if self
            .target
            .describe_data_source(&target_id)
            .await
            .step("describe target")?
            .is_some()
        {
            qs_info!("Data source {} already exists in target, using it", target_id);
            report.skipped(kind, &target_id, "already exists in target");
            return Ok(());
        }

        let request = self
            .settings
            .data_source_target
            .apply(
                &source,
                self.target.region(),
                self.target.account_id(),
                &self.settings.naming,
                &self.owner(DATA_SOURCE_OWNER_ACTIONS),
            )
            .step("transform")?;
        self.target
            .create_data_source(&request)
            .await
            .step("create")?;

        let outcome = self
            .poll_status(self.target, kind, &target_id)
            .await
            .step("poll")?;
        if outcome == PollOutcome::Settled(AssetStatus::CreationFailed) {
            if let Err(e) = self.target.delete_data_source(&target_id).await {
                qs_warn!("Could not delete failed data source {}: {:#}", target_id, e);
            }
        }
        require_success(&format!("data source {}", target_id), outcome).step("poll")?;

        self.succeed(report, kind, request.definition.summary());
        Ok(())
    }

    async fn migrate_data_sets(&self, ids: &[String], report: &mut MigrationReport) {
        qs_info!("Migrating {} dataset(s)", ids.len());
        let kind = AssetKind::DataSet;
        let mut definitions = Vec::new();
        for id in ids {
            match self.source.describe_data_set(id).await {
                Ok(Some(definition)) => definitions.push(definition),
                Ok(None) => self.fail(
                    report,
                    kind,
                    id,
                    id,
                    StepFailure {
                        step: "describe",
                        error: anyhow!("ResourceNotFoundException: dataset {} not found", id),
                    },
                ),
                Err(error) => self.fail(
                    report,
                    kind,
                    id,
                    id,
                    StepFailure {
                        step: "describe",
                        error,
                    },
                ),
            }
        }

        for source in parents_first(definitions) {
            let target_definition = retarget_data_set(
                &source,
                &self.settings.naming,
                self.target.region(),
                self.target.account_id(),
            );
            match self.upsert_data_set(&target_definition).await {
                Ok(()) => self.succeed(
                    report,
                    kind,
                    AssetSummary {
                        id: target_definition.id.clone(),
                        name: target_definition.name.clone(),
                        arn: target_definition.arn.clone(),
                    },
                ),
                Err(failure) => self.fail(report, kind, &source.id, &source.name, failure),
            }
        }
    }

    async fn upsert_data_set(&self, definition: &DataSetDefinition) -> StepResult<()> {
        let existing = self
            .target
            .describe_data_set(&definition.id)
            .await
            .step("describe target")?;
        match existing {
            Some(_) => {
                qs_info!("Dataset {} exists in target, updating", definition.id);
                self.target
                    .update_data_set(definition)
                    .await
                    .step("update")
            }
            None => self
                .target
                .create_data_set(definition, &[self.owner(DATA_SET_OWNER_ACTIONS)])
                .await
                .step("create"),
        }
    }

    async fn migrate_themes(&self, ids: &[String], report: &mut MigrationReport) {
        qs_info!("Migrating {} theme(s)", ids.len());
        for id in ids {
            if self.is_builtin_theme(id) {
                report.skipped(AssetKind::Theme, id, "built-in theme");
                continue;
            }
            match self.migrate_theme(id, report).await {
                Ok(()) => {}
                Err(failure) => self.fail(report, AssetKind::Theme, id, id, failure),
            }
        }
    }

    async fn migrate_theme(&self, id: &str, report: &mut MigrationReport) -> StepResult<()> {
        if self
            .target
            .describe_theme(id)
            .await
            .step("describe target")?
            .is_some()
        {
            report.skipped(AssetKind::Theme, id, "already exists in target");
            return Ok(());
        }
        let mut theme = self
            .source
            .describe_theme(id)
            .await
            .step("describe")?
            .ok_or_else(|| anyhow!("ResourceNotFoundException: theme {} not found", id))
            .step("describe")?;
        theme.arn = arn::asset_arn(
            self.target.region(),
            self.target.account_id(),
            AssetKind::Theme,
            id,
        );

        self.target.create_theme(&theme).await.step("create")?;
        self.target
            .grant_permissions(AssetKind::Theme, id, &self.owner(THEME_OWNER_ACTIONS))
            .await
            .step("permissions")?;

        self.succeed(
            report,
            AssetKind::Theme,
            AssetSummary {
                id: theme.id,
                name: theme.name,
                arn: theme.arn,
            },
        );
        Ok(())
    }

    /// Build a template from a source analysis and share it with the target
    /// account. Any earlier template with the same id is replaced.
    async fn publish_source_template(
        &self,
        analysis: &AnalysisDefinition,
        source_sets: &[AssetSummary],
    ) -> StepResult<TemplateDefinition> {
        let template_id = analysis.id.as_str();
        if self
            .source
            .describe_template(template_id)
            .await
            .step("template")?
            .is_some()
        {
            self.source
                .delete_template(template_id)
                .await
                .step("template")?;
        }

        let references: Vec<DataSetReference> = analysis
            .data_set_arns
            .iter()
            .map(|data_set_arn| {
                let id = arn::resource_id(data_set_arn).unwrap_or(data_set_arn);
                let placeholder = source_sets
                    .iter()
                    .find(|set| set.arn == *data_set_arn || set.id == id)
                    .map(|set| set.name.clone())
                    .unwrap_or_else(|| id.to_string());
                DataSetReference {
                    placeholder,
                    data_set_arn: data_set_arn.clone(),
                }
            })
            .collect();

        self.source
            .create_template_from_analysis(template_id, &analysis.name, &analysis.arn, &references)
            .await
            .step("template")?;
        let outcome = self
            .poll_status(self.source, AssetKind::Template, template_id)
            .await
            .step("template")?;
        require_success(&format!("template {}", template_id), outcome).step("template")?;

        self.source
            .grant_permissions(
                AssetKind::Template,
                template_id,
                &Permission::new(arn::root_arn(self.target.account_id()), TEMPLATE_SHARE_ACTIONS),
            )
            .await
            .step("share template")?;

        let mut template = self
            .source
            .describe_template(template_id)
            .await
            .step("template")?
            .ok_or_else(|| anyhow!("template {} vanished after creation", template_id))
            .step("template")?;
        if template.placeholders.is_empty() {
            template.placeholders = references.into_iter().map(|r| r.placeholder).collect();
        }
        Ok(template)
    }

    /// Bind template placeholders to the renamed datasets in the target.
    fn map_references(
        &self,
        placeholders: &[String],
        target_sets: &[AssetSummary],
    ) -> Result<Vec<DataSetReference>> {
        placeholders
            .iter()
            .map(|placeholder| {
                let wanted = self.settings.naming.map(placeholder);
                find_by_name_or_id(target_sets, &wanted)
                    .map(|set| DataSetReference {
                        placeholder: placeholder.clone(),
                        data_set_arn: set.arn.clone(),
                    })
                    .ok_or_else(|| {
                        anyhow!(
                            "ResourceNotFoundException: dataset {} for placeholder {} is missing in target",
                            wanted,
                            placeholder
                        )
                    })
            })
            .collect()
    }

    async fn migrate_analyses(&self, ids: &[String], report: &mut MigrationReport) {
        qs_info!("Migrating {} analysis(es)", ids.len());
        if ids.is_empty() {
            return;
        }
        let (source_sets, target_sets) = match self.data_set_listings().await {
            Ok(listings) => listings,
            Err(error) => {
                self.fail_all(report, AssetKind::Analysis, ids, "list datasets", &error);
                return;
            }
        };
        for id in ids {
            let name = self.settings.naming.map(id);
            match self.migrate_analysis(id, &source_sets, &target_sets).await {
                Ok(summary) => self.succeed(report, AssetKind::Analysis, summary),
                Err(failure) => self.fail(report, AssetKind::Analysis, id, &name, failure),
            }
        }
    }

    async fn migrate_analysis(
        &self,
        id: &str,
        source_sets: &[AssetSummary],
        target_sets: &[AssetSummary],
    ) -> StepResult<AssetSummary> {
        let analysis = self
            .source
            .describe_analysis(id)
            .await
            .step("describe")?
            .ok_or_else(|| anyhow!("ResourceNotFoundException: analysis {} not found", id))
            .step("describe")?;
        let template = self.publish_source_template(&analysis, source_sets).await?;
        let references = self
            .map_references(&template.placeholders, target_sets)
            .step("map datasets")?;

        let request = AnalysisRequest {
            id: self.settings.naming.map(&analysis.id),
            name: self.settings.naming.map(&analysis.name),
            template_arn: template.arn.clone(),
            data_set_references: references,
            theme_arn: self.target_theme_arn(analysis.theme_arn.as_deref()),
            permissions: vec![self.owner(ANALYSIS_OWNER_ACTIONS)],
        };

        let existing = self
            .target
            .describe_analysis(&request.id)
            .await
            .step("describe target")?;
        match existing.and_then(|a| a.status) {
            None => self.target.create_analysis(&request).await.step("create")?,
            Some(AssetStatus::Deleted) | Some(AssetStatus::CreationFailed) => {
                qs_info!("Recreating analysis {} in target", request.id);
                self.target
                    .delete_analysis(&request.id)
                    .await
                    .step("delete")?;
                self.target.create_analysis(&request).await.step("create")?;
            }
            Some(_) => self.target.update_analysis(&request).await.step("update")?,
        }

        let outcome = self
            .poll_status(self.target, AssetKind::Analysis, &request.id)
            .await
            .step("poll")?;
        require_success(&format!("analysis {}", request.id), outcome).step("poll")?;

        Ok(AssetSummary {
            arn: arn::asset_arn(
                self.target.region(),
                self.target.account_id(),
                AssetKind::Analysis,
                &request.id,
            ),
            id: request.id,
            name: request.name,
        })
    }

    async fn migrate_dashboards(&self, ids: &[String], report: &mut MigrationReport) {
        qs_info!("Migrating {} dashboard(s)", ids.len());
        if ids.is_empty() {
            return;
        }
        let (source_sets, target_sets) = match self.data_set_listings().await {
            Ok(listings) => listings,
            Err(error) => {
                self.fail_all(report, AssetKind::Dashboard, ids, "list datasets", &error);
                return;
            }
        };
        for id in ids {
            let name = self.settings.naming.map(id);
            match self.migrate_dashboard(id, &source_sets, &target_sets).await {
                Ok(summary) => self.succeed(report, AssetKind::Dashboard, summary),
                Err(failure) => self.fail(report, AssetKind::Dashboard, id, &name, failure),
            }
        }
    }

    async fn migrate_dashboard(
        &self,
        id: &str,
        source_sets: &[AssetSummary],
        target_sets: &[AssetSummary],
    ) -> StepResult<AssetSummary> {
        let dashboard = self
            .source
            .describe_dashboard(id)
            .await
            .step("describe")?
            .ok_or_else(|| anyhow!("ResourceNotFoundException: dashboard {} not found", id))
            .step("describe")?;

        let analysis_id = dashboard
            .source_entity_arn
            .as_deref()
            .and_then(ResourceArn::parse)
            .filter(|parsed| parsed.kind() == Some(AssetKind::Analysis))
            .map(|parsed| parsed.resource_id.to_string())
            .ok_or_else(|| anyhow!("dashboard {} was not published from an analysis", id))
            .step("source analysis")?;
        let analysis = self
            .source
            .describe_analysis(&analysis_id)
            .await
            .step("source analysis")?
            .ok_or_else(|| {
                anyhow!(
                    "ResourceNotFoundException: source analysis {} of dashboard {} not found",
                    analysis_id,
                    id
                )
            })
            .step("source analysis")?;

        let source_template = self.publish_source_template(&analysis, source_sets).await?;

        let target_id = self.settings.naming.map(&dashboard.id);
        let target_name = self.settings.naming.map(&dashboard.name);
        if self
            .target
            .describe_template(&target_id)
            .await
            .step("copy template")?
            .is_some()
        {
            self.target
                .delete_template(&target_id)
                .await
                .step("copy template")?;
        }
        self.target
            .copy_template(&target_id, &target_name, &source_template.arn)
            .await
            .step("copy template")?;
        let outcome = self
            .poll_status(self.target, AssetKind::Template, &target_id)
            .await
            .step("copy template")?;
        require_success(&format!("template {}", target_id), outcome).step("copy template")?;
        let target_template = self
            .target
            .describe_template(&target_id)
            .await
            .step("copy template")?
            .ok_or_else(|| anyhow!("copied template {} not visible in target", target_id))
            .step("copy template")?;

        let placeholders = if target_template.placeholders.is_empty() {
            &source_template.placeholders
        } else {
            &target_template.placeholders
        };
        let references = self
            .map_references(placeholders, target_sets)
            .step("map datasets")?;

        let request = DashboardRequest {
            id: target_id.clone(),
            name: target_name.clone(),
            template_arn: target_template.arn.clone(),
            data_set_references: references,
            theme_arn: self.target_theme_arn(dashboard.theme_arn.as_deref()),
            permissions: vec![self.owner(DASHBOARD_OWNER_ACTIONS)],
            publish: self.settings.publish,
            version_description: Some(format!(
                "Migrated from {}:{}",
                self.source.account_id(),
                self.source.region()
            )),
        };

        let existing = self
            .target
            .describe_dashboard(&target_id)
            .await
            .step("describe target")?;
        let new_version = match existing.and_then(|d| d.status) {
            None => {
                self.target.create_dashboard(&request).await.step("create")?;
                None
            }
            Some(AssetStatus::CreationFailed) | Some(AssetStatus::Deleted) => {
                qs_info!("Recreating dashboard {} in target", target_id);
                self.target
                    .delete_dashboard(&target_id)
                    .await
                    .step("delete")?;
                self.target.create_dashboard(&request).await.step("create")?;
                None
            }
            Some(_) => self.target.update_dashboard(&request).await.step("update")?,
        };

        let outcome = self
            .poll_status(self.target, AssetKind::Dashboard, &target_id)
            .await
            .step("poll")?;
        require_success(&format!("dashboard {}", target_id), outcome).step("poll")?;

        if let Some(version) = new_version {
            self.target
                .publish_dashboard_version(&target_id, version)
                .await
                .step("publish")?;
        }

        Ok(AssetSummary {
            arn: arn::asset_arn(
                self.target.region(),
                self.target.account_id(),
                AssetKind::Dashboard,
                &target_id,
            ),
            id: target_id,
            name: target_name,
        })
    }

    async fn place_in_folder(&self, report: &mut MigrationReport) {
        let Some(folder_id) = self.settings.target_folder_id.as_deref() else {
            return;
        };
        let members: Vec<(AssetKind, AssetSummary)> = report
            .stages
            .iter()
            .filter(|(kind, _)| kind.member_type().is_some())
            .flat_map(|(kind, stage)| stage.succeeded.iter().map(|asset| (*kind, asset.clone())))
            .collect();

        let mut placed = 0;
        for (kind, asset) in members {
            match self.target.add_folder_member(folder_id, kind, &asset.id).await {
                Ok(()) => {
                    placed += 1;
                    report.succeeded(AssetKind::Folder, asset);
                }
                Err(error) => self.fail(
                    report,
                    AssetKind::Folder,
                    &asset.id,
                    &asset.name,
                    StepFailure {
                        step: "folder",
                        error,
                    },
                ),
            }
        }
        qs_info!("Placed {} asset(s) in folder {}", placed, folder_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_quicksight::types::{LogicalTable, LogicalTableSource};
    use std::collections::HashMap;

    fn data_set(id: &str, parent: Option<&str>) -> DataSetDefinition {
        let mut logical_tables = HashMap::new();
        if let Some(parent) = parent {
            logical_tables.insert(
                "l1".to_string(),
                LogicalTable::builder()
                    .alias("parent")
                    .source(
                        LogicalTableSource::builder()
                            .data_set_arn(format!("arn:aws:quicksight:us-east-1:111:dataset/{}", parent))
                            .build(),
                    )
                    .build()
                    .unwrap(),
            );
        }
        DataSetDefinition {
            id: id.to_string(),
            name: id.to_string(),
            arn: format!("arn:aws:quicksight:us-east-1:111:dataset/{}", id),
            physical_tables: HashMap::new(),
            logical_tables,
            import_mode: None,
            column_groups: None,
        }
    }

    #[test]
    fn test_parents_first() {
        let ordered = parents_first(vec![
            data_set("child", Some("middle")),
            data_set("middle", Some("root")),
            data_set("root", None),
            data_set("outside", Some("elsewhere")),
        ]);
        let ids: Vec<&str> = ordered.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "outside", "middle", "child"]);
    }

    #[test]
    fn test_parents_first_tolerates_cycles() {
        let ordered = parents_first(vec![data_set("a", Some("b")), data_set("b", Some("a"))]);
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn test_plan_uses_manifest_for_all() {
        let manifest = MigrationManifest {
            dashboards: vec!["Sales".into()],
            themes: vec!["Corporate".into()],
            ..Default::default()
        };
        let all = MigrationRequest {
            kind: MigrationKind::All,
            items: vec!["ignored".into()],
        };
        assert_eq!(all.plan(&manifest), manifest);

        let single = MigrationRequest {
            kind: MigrationKind::Analysis,
            items: vec!["Ops".into()],
        };
        let plan = single.plan(&manifest);
        assert_eq!(plan.analyses, vec!["Ops".to_string()]);
        assert!(plan.dashboards.is_empty());
    }

    #[test]
    fn test_require_success_reports_last_status() {
        assert!(require_success("x", PollOutcome::Settled(AssetStatus::UpdateSuccessful)).is_ok());
        let err = require_success("analysis a", PollOutcome::TimedOut(None)).unwrap_err();
        assert!(err.to_string().contains("timed out"));
        let err = require_success(
            "dashboard d",
            PollOutcome::Settled(AssetStatus::CreationFailed),
        )
        .unwrap_err();
        assert!(err.to_string().contains("CREATION_FAILED"));
    }
}
