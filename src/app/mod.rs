//! Core modules for qsops.
//!
//! # Module Organization
//!
//! ## Ambient
//! - [`config`] - JSON settings file and environment overrides
//! - [`credentials`] - STS role assumption and SDK config per account
//! - [`sdk_errors`] - failure categorization for fail lists and throttling checks
//! - [`csv`] - CSV rendering for the monitoring reports
//! - [`cli`] - command line surface
//!
//! ## AWS Integration
//! - [`quicksight`] - control-plane seam, domain model and SDK implementation
//! - [`aws_services`] - S3, SNS, CloudWatch, SSM and Secrets Manager seams
//!
//! ## Operations
//! - [`migration`] - incremental asset migration driver
//! - [`ingestion`] - SPICE refresh triggering
//! - [`provisioning`] - user/group creation handlers
//! - [`metrics`] - visual load metrics export
//! - [`audit`] - access audit export
//! - [`embed`] - embed URL generation and login proxy

pub mod audit;
pub mod aws_services;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod csv;
pub mod embed;
pub mod ingestion;
pub mod metrics;
pub mod migration;
pub mod provisioning;
pub mod quicksight;
pub mod sdk_errors;
