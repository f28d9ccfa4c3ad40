//! Rewrites that make a source definition valid in the target account.

use anyhow::{anyhow, Result};
use aws_sdk_quicksight::types::{DataSourceParameters, PhysicalTable};
use std::collections::BTreeMap;

use super::naming::EnvironmentNaming;
use crate::app::config::{DataSourceTargetConfig, RedshiftTargetConfig};
use crate::app::quicksight::arn;
use crate::app::quicksight::fields::FieldMut;
use crate::app::quicksight::{
    AssetKind, CredentialPairInput, DataSetDefinition, DataSourceCreate, DataSourceDefinition,
    Permission,
};

/// Engine types whose credentials come from the RDS secret.
const RELATIONAL_ENGINES: &[&str] = &[
    "AURORA",
    "AURORA_POSTGRESQL",
    "MARIADB",
    "MYSQL",
    "POSTGRESQL",
    "SQLSERVER",
];

/// Target-side endpoints and credentials for migrated data sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceTarget {
    pub rds_instance_id: Option<String>,
    pub redshift: Option<RedshiftTargetConfig>,
    pub vpc_connection_id: Option<String>,
    pub rds_credentials: Option<CredentialPairInput>,
    pub redshift_credentials: Option<CredentialPairInput>,
    pub tags: BTreeMap<String, String>,
}

impl DataSourceTarget {
    /// Endpoints from config; credentials are resolved separately.
    pub fn from_config(config: &DataSourceTargetConfig) -> Self {
        Self {
            rds_instance_id: config.rds_instance_id.clone(),
            redshift: config.redshift.clone(),
            vpc_connection_id: config.vpc_connection_id.clone(),
            rds_credentials: None,
            redshift_credentials: None,
            tags: config.tags.clone(),
        }
    }

    /// Build the create request for `source` in the target account.
    pub fn apply(
        &self,
        source: &DataSourceDefinition,
        target_region: &str,
        target_account: &str,
        naming: &EnvironmentNaming,
        owner: &Permission,
    ) -> Result<DataSourceCreate> {
        let engine = source
            .source_type
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default();

        let parameters = match source.parameters.clone() {
            Some(DataSourceParameters::RdsParameters(mut rds)) => {
                if let Some(instance_id) = &self.rds_instance_id {
                    rds.instance_id = instance_id.clone();
                }
                Some(DataSourceParameters::RdsParameters(rds))
            }
            Some(DataSourceParameters::RedshiftParameters(mut redshift)) => {
                if let Some(target) = &self.redshift {
                    redshift.host = Some(target.host.clone());
                    redshift.database = target.database.clone();
                    if target.cluster_id.is_some() {
                        redshift.cluster_id = target.cluster_id.clone();
                    }
                    if let Some(port) = target.port {
                        redshift.port = port;
                    }
                }
                Some(DataSourceParameters::RedshiftParameters(redshift))
            }
            other => other,
        };

        let vpc_connection_arn = match (&source.vpc_connection_arn, &self.vpc_connection_id) {
            (None, _) => None,
            (Some(_), Some(vpc_id)) => Some(arn::vpc_connection_arn(
                target_region,
                target_account,
                vpc_id,
            )),
            (Some(_), None) => {
                return Err(anyhow!(
                    "data source {} uses a VPC connection but no target VPC connection is configured",
                    source.id
                ))
            }
        };

        let credentials = if engine == "REDSHIFT" {
            self.redshift_credentials.clone()
        } else if RELATIONAL_ENGINES.contains(&engine.as_str()) {
            self.rds_credentials.clone()
        } else {
            None
        };

        let id = naming.map(&source.id);
        let definition = DataSourceDefinition {
            arn: arn::asset_arn(target_region, target_account, AssetKind::DataSource, &id),
            name: naming.map(&source.name),
            id,
            source_type: source.source_type.clone(),
            parameters,
            vpc_connection_arn,
            ssl_properties: source.ssl_properties.clone(),
            status: None,
        };

        Ok(DataSourceCreate {
            definition,
            credentials,
            permissions: vec![owner.clone()],
            tags: self.tags.clone(),
        })
    }
}

/// Point an asset ARN at the mapped id in the target account.
fn remap_arn(value: &mut String, naming: &EnvironmentNaming, region: &str, account: &str) {
    let remapped = arn::resource_id(value)
        .and_then(|id| arn::retarget(value, region, account, &naming.map(id)));
    if let Some(remapped) = remapped {
        *value = remapped;
    }
}

/// Copy of a dataset definition whose data source and parent dataset
/// references point into the target account.
pub fn retarget_data_set(
    source: &DataSetDefinition,
    naming: &EnvironmentNaming,
    target_region: &str,
    target_account: &str,
) -> DataSetDefinition {
    let mut definition = source.clone();
    definition.id = naming.map(&source.id);
    definition.name = naming.map(&source.name);
    definition.arn = arn::asset_arn(target_region, target_account, AssetKind::DataSet, &definition.id);

    for table in definition.physical_tables.values_mut() {
        match table {
            PhysicalTable::RelationalTable(relational) => {
                remap_arn(&mut relational.data_source_arn, naming, target_region, target_account)
            }
            PhysicalTable::CustomSql(custom) => {
                remap_arn(&mut custom.data_source_arn, naming, target_region, target_account)
            }
            PhysicalTable::S3Source(s3) => {
                remap_arn(&mut s3.data_source_arn, naming, target_region, target_account)
            }
            _ => {}
        }
    }

    for table in definition.logical_tables.values_mut() {
        if let Some(source) = table.source.field_mut() {
            if let Some(parent) = source.data_set_arn.as_mut() {
                remap_arn(parent, naming, target_region, target_account);
            }
        }
    }

    definition
}

/// Data source ids referenced by a dataset's physical tables.
pub fn referenced_data_source_ids(definition: &DataSetDefinition) -> Vec<String> {
    let mut ids: Vec<String> = definition
        .physical_tables
        .values()
        .filter_map(|table| match table {
            PhysicalTable::RelationalTable(t) => Some(t.data_source_arn.as_str()),
            PhysicalTable::CustomSql(t) => Some(t.data_source_arn.as_str()),
            PhysicalTable::S3Source(t) => Some(t.data_source_arn.as_str()),
            _ => None,
        })
        .filter_map(arn::resource_id)
        .map(String::from)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Parent dataset ids referenced by a dataset's logical tables.
pub fn referenced_parent_data_set_ids(definition: &DataSetDefinition) -> Vec<String> {
    let mut tables = definition.logical_tables.clone();
    let mut ids: Vec<String> = tables
        .values_mut()
        .filter_map(|table| table.source.field_mut().and_then(|s| s.data_set_arn.clone()))
        .filter_map(|parent| arn::resource_id(&parent).map(String::from))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
