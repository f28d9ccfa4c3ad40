use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatch as cloudwatch;
use aws_sdk_cloudwatch::types::MetricDataQuery;
use aws_smithy_types::DateTime as SmithyDateTime;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{MetricQuery, MetricSeries, MetricsSource};

pub struct CloudWatchMetrics {
    client: cloudwatch::Client,
}

impl CloudWatchMetrics {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: cloudwatch::Client::new(config),
        }
    }
}

#[async_trait]
impl MetricsSource for CloudWatchMetrics {
    async fn query(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>> {
        let data_query = MetricDataQuery::builder()
            .id(&query.id)
            .expression(&query.expression)
            .label(&query.label)
            .period(query.period_secs)
            .build();

        let mut paginator = self
            .client
            .get_metric_data()
            .start_time(SmithyDateTime::from_secs(query.start.timestamp()))
            .end_time(SmithyDateTime::from_secs(query.end.timestamp()))
            .metric_data_queries(data_query)
            .into_paginator()
            .send();

        let mut series = Vec::new();
        while let Some(page) = paginator.next().await {
            let page = page.map_err(|e| {
                anyhow!(
                    "GetMetricData {} failed: {}",
                    query.id,
                    cloudwatch::error::DisplayErrorContext(&e)
                )
            })?;
            for result in page.metric_data_results.unwrap_or_default() {
                series.push(MetricSeries {
                    label: result.label.unwrap_or_default(),
                    timestamps: result
                        .timestamps
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|t| DateTime::<Utc>::from_timestamp(t.secs(), 0))
                        .collect(),
                    values: result.values.unwrap_or_default(),
                });
            }
        }

        debug!("Query {} returned {} series", query.id, series.len());
        Ok(series)
    }
}
