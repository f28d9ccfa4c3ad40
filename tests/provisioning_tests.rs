mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{relational_data_set, FakeQuickSight};
use qsops::app::config::{GroupGrant, GroupRule, ProvisioningConfig};
use qsops::app::provisioning::{
    on_group_created, on_user_created, Grant, GroupCreatedEvent, UserCreatedEvent,
};
use qsops::app::quicksight::permissions::{DASHBOARD_OWNER_ACTIONS, DASHBOARD_READER_ACTIONS};
use qsops::app::quicksight::{AssetKind, Permission};

const GROUP_ARN_PREFIX: &str = "arn:aws:quicksight:us-east-1:111111111111:group/default/";

fn user_event(user_name: &str) -> serde_json::Value {
    json!({
        "detail-type": "AWS Service Event via CloudTrail",
        "source": "aws.quicksight",
        "detail": {
            "eventName": "CreateUser",
            "awsRegion": "us-east-1",
            "serviceEventDetails": {
                "eventRequestDetails": { "userName": user_name }
            }
        }
    })
}

fn group_event(group_name: &str) -> serde_json::Value {
    json!({
        "detail": {
            "eventName": "CreateGroup",
            "awsRegion": "us-east-1",
            "requestParameters": { "groupName": group_name, "namespace": "default" }
        }
    })
}

fn account() -> FakeQuickSight {
    let api = FakeQuickSight::new("111111111111", "us-east-1");
    api.add_data_source("sales-db", "Sales DB");
    api.add_data_set(relational_data_set(&api, "sales", "Sales", "sales-db", None));
    api.add_dashboard("mkt-1", "Marketing Dashboard", "mkt-analysis", &["sales"]);
    api.add_dashboard("ops-1", "Ops Dashboard", "ops-analysis", &["sales"]);
    api
}

#[test]
fn test_user_event_parsing() {
    let event = UserCreatedEvent::from_value(&user_event("BI-Developer:jdoe@example.com")).unwrap();
    assert_eq!(
        event,
        UserCreatedEvent {
            region: "us-east-1".into(),
            user_name: "BI-Developer/jdoe@example.com".into(),
            role: "BI-Developer".into(),
        }
    );

    assert!(UserCreatedEvent::from_value(&json!({ "detail": {} })).is_err());
    assert!(UserCreatedEvent::from_json("not json").is_err());
}

#[tokio::test]
async fn test_user_joins_new_role_group() {
    let api = account();
    let event = UserCreatedEvent::from_value(&user_event("Marketing:ana")).unwrap();

    on_user_created(&api, "default", &event).await.unwrap();

    assert_eq!(api.state().groups["Marketing"], vec!["Marketing/ana".to_string()]);
    assert_eq!(api.calls_to("CreateGroup"), 1);
}

#[tokio::test]
async fn test_user_joins_existing_group() {
    let api = account();
    api.add_group("Marketing");
    let event = UserCreatedEvent::from_value(&user_event("Marketing/bo")).unwrap();

    on_user_created(&api, "default", &event).await.unwrap();

    assert_eq!(api.calls_to("CreateGroup"), 0);
    assert_eq!(api.state().groups["Marketing"], vec!["Marketing/bo".to_string()]);
}

#[tokio::test]
async fn test_membership_failure_propagates() {
    let api = account();
    api.fail_on("CreateGroupMembership", "ThrottlingException: Rate exceeded");
    let event = UserCreatedEvent::from_value(&user_event("HR:kim")).unwrap();

    let err = on_user_created(&api, "default", &event).await.unwrap_err();
    assert!(format!("{:#}", err).contains("ThrottlingException"));
}

#[tokio::test]
async fn test_reader_group_gets_named_dashboards() {
    let api = account();
    let event = GroupCreatedEvent::from_value(&group_event("Marketing-EU")).unwrap();
    let rules = ProvisioningConfig::default().group_rules;

    let report = on_group_created(&api, &rules, "default", "us-east-1", &event)
        .await
        .unwrap();

    assert_eq!(
        report.granted,
        vec![Grant {
            kind: AssetKind::Dashboard,
            asset_id: "mkt-1".into()
        }]
    );
    assert!(report.failed.is_empty());
    assert_eq!(
        api.permissions_on(AssetKind::Dashboard, "mkt-1"),
        vec![Permission::new(
            format!("{}Marketing-EU", GROUP_ARN_PREFIX),
            DASHBOARD_READER_ACTIONS
        )]
    );
    assert!(api.permissions_on(AssetKind::Dashboard, "ops-1").is_empty());
}

#[tokio::test]
async fn test_missing_dashboard_is_reported() {
    let api = account();
    let event = GroupCreatedEvent::from_value(&group_event("HR-Managers")).unwrap();
    let rules = ProvisioningConfig::default().group_rules;

    let report = on_group_created(&api, &rules, "default", "us-east-1", &event)
        .await
        .unwrap();

    assert!(report.granted.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.asset_id, "HR Dashboard");
}

#[tokio::test]
async fn test_admin_group_owns_everything() {
    let api = account();
    let event = GroupCreatedEvent::from_value(&group_event("BI-Admin")).unwrap();
    let rules = ProvisioningConfig::default().group_rules;

    let report = on_group_created(&api, &rules, "default", "us-east-1", &event)
        .await
        .unwrap();

    let kinds: Vec<AssetKind> = report.granted.iter().map(|g| g.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AssetKind::DataSource,
            AssetKind::DataSet,
            AssetKind::Dashboard,
            AssetKind::Dashboard
        ]
    );
    assert_eq!(
        api.permissions_on(AssetKind::Dashboard, "ops-1")[0].actions.len(),
        DASHBOARD_OWNER_ACTIONS.len()
    );
}

#[tokio::test]
async fn test_grant_failures_do_not_stop_others() {
    let api = account();
    api.fail_on("UpdatePermissions", "AccessDeniedException: denied");
    let event = GroupCreatedEvent::from_value(&group_event("Ops-Team")).unwrap();
    let rules = vec![GroupRule {
        group_contains: "Ops".into(),
        grant: GroupGrant::ReadDashboards {
            dashboards: vec!["Ops Dashboard".into(), "Marketing Dashboard".into()],
        },
    }];

    let report = on_group_created(&api, &rules, "default", "us-east-1", &event)
        .await
        .unwrap();
    assert_eq!(report.failed.len(), 2);
    assert_eq!(api.calls_to("UpdatePermissions"), 2);
}

#[tokio::test]
async fn test_unmatched_group_is_left_alone() {
    let api = account();
    let event = GroupCreatedEvent::from_value(&group_event("Finance")).unwrap();
    let rules = ProvisioningConfig::default().group_rules;

    let report = on_group_created(&api, &rules, "default", "us-east-1", &event)
        .await
        .unwrap();
    assert!(report.granted.is_empty() && report.failed.is_empty());
    assert_eq!(api.calls_to("ListDashboards"), 0);
}
