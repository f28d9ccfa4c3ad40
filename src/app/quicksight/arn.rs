//! ARN construction and parsing for QuickSight resources and principals.

use super::model::AssetKind;

/// Principal ARN for a QuickSight user, or the account root for `root`.
pub fn user_arn(region: &str, account_id: &str, namespace: &str, user_name: &str) -> String {
    if user_name == "root" {
        root_arn(account_id)
    } else {
        format!(
            "arn:aws:quicksight:{}:{}:user/{}/{}",
            region, account_id, namespace, user_name
        )
    }
}

pub fn root_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{}:root", account_id)
}

pub fn group_arn(region: &str, account_id: &str, namespace: &str, group_name: &str) -> String {
    format!(
        "arn:aws:quicksight:{}:{}:group/{}/{}",
        region, account_id, namespace, group_name
    )
}

pub fn asset_arn(region: &str, account_id: &str, kind: AssetKind, id: &str) -> String {
    format!(
        "arn:aws:quicksight:{}:{}:{}/{}",
        region,
        account_id,
        kind.arn_segment(),
        id
    )
}

pub fn vpc_connection_arn(region: &str, account_id: &str, vpc_connection_id: &str) -> String {
    format!(
        "arn:aws:quicksight:{}:{}:vpcConnection/{}",
        region, account_id, vpc_connection_id
    )
}

/// Parsed `arn:aws:quicksight:<region>:<account>:<type>/<id>[/...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceArn<'a> {
    pub region: &'a str,
    pub account_id: &'a str,
    pub resource_type: &'a str,
    pub resource_id: &'a str,
}

impl<'a> ResourceArn<'a> {
    pub fn parse(arn: &'a str) -> Option<Self> {
        let mut parts = arn.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let _partition = parts.next()?;
        let _service = parts.next()?;
        let region = parts.next()?;
        let account_id = parts.next()?;
        let resource = parts.next()?;
        let (resource_type, rest) = resource.split_once('/')?;
        let resource_id = rest.split('/').next()?;
        if resource_id.is_empty() {
            return None;
        }
        Some(Self {
            region,
            account_id,
            resource_type,
            resource_id,
        })
    }

    pub fn kind(&self) -> Option<AssetKind> {
        AssetKind::from_arn_segment(self.resource_type)
    }

    /// Built-in resources (default themes) are owned by the `aws` pseudo-account.
    pub fn is_builtin(&self) -> bool {
        self.account_id == "aws"
    }
}

/// Trailing resource id of a QuickSight ARN.
pub fn resource_id(arn: &str) -> Option<&str> {
    ResourceArn::parse(arn).map(|parsed| parsed.resource_id)
}

/// Version number from `.../dashboard/<id>/version/<n>`.
pub fn version_number(version_arn: &str) -> Option<i64> {
    let (head, number) = version_arn.rsplit_once('/')?;
    if !head.ends_with("/version") {
        return None;
    }
    number.parse().ok()
}

/// Rewrite an asset ARN so it points at the same kind in another account/region.
pub fn retarget(arn: &str, region: &str, account_id: &str, new_id: &str) -> Option<String> {
    let parsed = ResourceArn::parse(arn)?;
    let kind = parsed.kind()?;
    Some(asset_arn(region, account_id, kind, new_id))
}

/// Principal named in a permission entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRef {
    /// `user`, `group`, `root` or the raw resource type.
    pub principal_type: String,
    pub name: String,
    /// Namespace for QuickSight principals.
    pub namespace: Option<String>,
}

impl PrincipalRef {
    /// Parse a permission principal.
    ///
    /// Federated users carry a role segment (`user/default/Role/session`) and
    /// are reported as `Role/session`.
    pub fn parse(principal: &str) -> Self {
        if let Some(account) = principal
            .strip_prefix("arn:aws:iam::")
            .and_then(|rest| rest.strip_suffix(":root"))
        {
            return Self {
                principal_type: "root".to_string(),
                name: account.to_string(),
                namespace: None,
            };
        }

        let segments: Vec<&str> = principal.split('/').collect();
        let principal_type = segments[0]
            .rsplit(':')
            .next()
            .unwrap_or_default()
            .to_string();

        match segments.len() {
            n if n >= 4 => Self {
                principal_type,
                name: segments[2..].join("/"),
                namespace: Some(segments[1].to_string()),
            },
            3 => Self {
                principal_type,
                name: segments[2].to_string(),
                namespace: Some(segments[1].to_string()),
            },
            2 => Self {
                principal_type,
                name: segments[1].to_string(),
                namespace: None,
            },
            _ => Self {
                principal_type: "unknown".to_string(),
                name: principal.to_string(),
                namespace: None,
            },
        }
    }
}
