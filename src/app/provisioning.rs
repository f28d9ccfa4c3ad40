//! Access provisioning driven by QuickSight user and group creation events.
//!
//! Both handlers receive the CloudTrail record EventBridge forwards. A new
//! user is placed in a group named after the IAM role it signed in with; a
//! new group gets dashboard or asset permissions according to the configured
//! rules.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::app::config::{GroupGrant, GroupRule};
use crate::app::quicksight::arn;
use crate::app::quicksight::permissions::{
    DASHBOARD_OWNER_ACTIONS, DASHBOARD_READER_ACTIONS, DATA_SET_OWNER_ACTIONS,
    DATA_SOURCE_OWNER_ACTIONS,
};
use crate::app::quicksight::{AssetKind, Permission, QuickSightApi};

fn string_at<'v>(event: &'v Value, pointer: &str) -> Result<&'v str> {
    event
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("event is missing {}", pointer))
}

/// A QuickSight user was created (first federated sign-in).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreatedEvent {
    pub region: String,
    /// `Role/session` form of the federated user name.
    pub user_name: String,
    /// IAM role the user signed in with; doubles as the group name.
    pub role: String,
}

impl UserCreatedEvent {
    pub fn from_value(event: &Value) -> Result<Self> {
        let region = string_at(event, "/detail/awsRegion")?.to_string();
        let user_name = string_at(
            event,
            "/detail/serviceEventDetails/eventRequestDetails/userName",
        )?
        .replace(':', "/");
        let role = user_name
            .split('/')
            .next()
            .filter(|role| !role.is_empty())
            .ok_or_else(|| anyhow!("user name {:?} carries no role", user_name))?
            .to_string();
        Ok(Self {
            region,
            user_name,
            role,
        })
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(contents).context("Invalid event JSON")?;
        Self::from_value(&value)
    }
}

/// Put the new user into the group named after their role. The group is
/// created first when missing. Errors propagate so the caller's retry
/// policy applies.
pub async fn on_user_created(
    api: &dyn QuickSightApi,
    namespace: &str,
    event: &UserCreatedEvent,
) -> Result<()> {
    let groups = api.list_groups(namespace).await?;
    if !groups.iter().any(|g| g == &event.role) {
        if api.create_group(namespace, &event.role).await? {
            qs_info!("Created group {}", event.role);
        } else {
            qs_debug!("Group {} already existed", event.role);
        }
    }
    api.add_group_member(namespace, &event.role, &event.user_name)
        .await
        .with_context(|| format!("Failed to add {} to group {}", event.user_name, event.role))?;
    qs_info!("Added {} to group {}", event.user_name, event.role);
    Ok(())
}

/// A QuickSight group was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCreatedEvent {
    pub region: Option<String>,
    pub group_name: String,
}

impl GroupCreatedEvent {
    pub fn from_value(event: &Value) -> Result<Self> {
        Ok(Self {
            region: event
                .pointer("/detail/awsRegion")
                .and_then(Value::as_str)
                .map(String::from),
            group_name: string_at(event, "/detail/requestParameters/groupName")?.to_string(),
        })
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(contents).context("Invalid event JSON")?;
        Self::from_value(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub kind: AssetKind,
    pub asset_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantReport {
    pub granted: Vec<Grant>,
    pub failed: Vec<(Grant, String)>,
}

impl GrantReport {
    async fn grant(
        &mut self,
        api: &dyn QuickSightApi,
        kind: AssetKind,
        asset_id: &str,
        permission: &Permission,
    ) {
        let grant = Grant {
            kind,
            asset_id: asset_id.to_string(),
        };
        match api.grant_permissions(kind, asset_id, permission).await {
            Ok(()) => self.granted.push(grant),
            Err(e) => {
                qs_warn!("Granting {} {} to {} failed: {:#}", kind, asset_id, permission.principal, e);
                self.failed.push((grant, format!("{:#}", e)));
            }
        }
    }
}

/// Rules whose marker appears in `group_name`.
pub fn matching_rules<'r>(rules: &'r [GroupRule], group_name: &str) -> Vec<&'r GroupRule> {
    rules
        .iter()
        .filter(|rule| group_name.contains(&rule.group_contains))
        .collect()
}

/// Grant the new group what its matching rules call for. Individual grant
/// failures are recorded and do not stop the rest.
pub async fn on_group_created(
    api: &dyn QuickSightApi,
    rules: &[GroupRule],
    namespace: &str,
    identity_region: &str,
    event: &GroupCreatedEvent,
) -> Result<GrantReport> {
    let principal = arn::group_arn(identity_region, api.account_id(), namespace, &event.group_name);
    qs_info!("Provisioning group {}", principal);

    let mut report = GrantReport::default();
    let rules = matching_rules(rules, &event.group_name);
    if rules.is_empty() {
        qs_info!("No provisioning rule matches group {}", event.group_name);
        return Ok(report);
    }

    let mut own_all = false;
    let mut dashboards_to_read: Vec<&str> = Vec::new();
    for rule in rules {
        match &rule.grant {
            GroupGrant::ReadDashboards { dashboards } => {
                dashboards_to_read.extend(dashboards.iter().map(String::as_str))
            }
            GroupGrant::OwnAllAssets => own_all = true,
        }
    }

    if !dashboards_to_read.is_empty() {
        let dashboards = api.list_dashboards().await?;
        let reader = Permission::new(principal.clone(), DASHBOARD_READER_ACTIONS);
        for name in dashboards_to_read {
            let matches: Vec<_> = dashboards.iter().filter(|d| d.name == name).collect();
            if matches.is_empty() {
                qs_warn!("Dashboard {} not found for group {}", name, event.group_name);
                report.failed.push((
                    Grant {
                        kind: AssetKind::Dashboard,
                        asset_id: name.to_string(),
                    },
                    "dashboard not found".to_string(),
                ));
            }
            for dashboard in matches {
                report
                    .grant(api, AssetKind::Dashboard, &dashboard.id, &reader)
                    .await;
            }
        }
    }

    if own_all {
        let data_source_owner = Permission::new(principal.clone(), DATA_SOURCE_OWNER_ACTIONS);
        for data_source in api.list_data_sources().await? {
            report
                .grant(api, AssetKind::DataSource, &data_source.id, &data_source_owner)
                .await;
        }
        let data_set_owner = Permission::new(principal.clone(), DATA_SET_OWNER_ACTIONS);
        for data_set in api.list_data_sets().await? {
            report
                .grant(api, AssetKind::DataSet, &data_set.id, &data_set_owner)
                .await;
        }
        let dashboard_owner = Permission::new(principal.clone(), DASHBOARD_OWNER_ACTIONS);
        for dashboard in api.list_dashboards().await? {
            report
                .grant(api, AssetKind::Dashboard, &dashboard.id, &dashboard_owner)
                .await;
        }
    }

    qs_info!(
        "Group {}: {} grant(s), {} failure(s)",
        event.group_name,
        report.granted.len(),
        report.failed.len()
    );
    Ok(report)
}
