//! qsops - operational automation for Amazon QuickSight
//!
//! A command line toolkit that drives the QuickSight control plane for the
//! chores an analytics platform team runs over and over:
//!
//! - **Asset migration**: copy data sources, datasets, themes, analyses and
//!   dashboards between accounts, regions and environment suffixes
//!   ([`app::migration`]).
//! - **Permission provisioning**: react to user/group creation events with
//!   group memberships and asset grants ([`app::provisioning`]).
//! - **SPICE ingestion**: trigger refreshes with duplicate-run and duration
//!   guards plus SNS notification ([`app::ingestion`]).
//! - **Monitoring**: visual load metrics and access audits rendered to CSV
//!   and uploaded to S3 ([`app::metrics`], [`app::audit`]).
//! - **Embedding**: registered-user embed URLs behind a bearer-token proxy
//!   ([`app::embed`]).
//!
//! # Architecture Overview
//!
//! Every external API sits behind a trait ([`app::quicksight::QuickSightApi`],
//! [`app::aws_services::ObjectStore`], [`app::aws_services::Notifier`],
//! [`app::aws_services::MetricsSource`]) with one SDK-backed implementation.
//! The orchestration modules only see the traits, which lets the integration
//! tests under `tests/` drive full runs against in-memory fakes.
//!
//! Credentials come from STS role assumption per account, cached by
//! [`app::credentials::CredentialCoordinator`].

#![warn(clippy::all, rust_2018_idioms)]

#[macro_use]
pub mod logging_macros;
pub mod app;
