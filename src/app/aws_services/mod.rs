//! Seams over the non-QuickSight services and their SDK implementations.

pub mod cloudwatch;
pub mod s3;
pub mod secretsmanager;
pub mod sns;
pub mod ssm;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use cloudwatch::CloudWatchMetrics;
pub use s3::S3ObjectStore;
pub use secretsmanager::SecretsManagerStore;
pub use sns::SnsNotifier;
pub use ssm::SsmParameters;

/// Destination for generated reports.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;
}

/// Fire-and-forget notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<()>;
}

/// A CloudWatch Metrics Insights query over a time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub id: String,
    pub expression: String,
    pub label: String,
    pub period_secs: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One labelled series returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub label: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>>;
}
