//! Visual load metrics exported from CloudWatch to S3 as CSV.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::app::aws_services::{MetricQuery, MetricSeries, MetricsSource, ObjectStore};
use crate::app::config::MonitoringConfig;
use crate::app::csv;

const SERIES_LABEL: &str = "qs_visuals";
const QUERY_ID: &str = "qs_visuals";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualMetric {
    LoadTime,
    LoadCount,
}

impl VisualMetric {
    pub const ALL: [VisualMetric; 2] = [VisualMetric::LoadTime, VisualMetric::LoadCount];

    fn aggregate(&self) -> &'static str {
        match self {
            VisualMetric::LoadTime => "AVG",
            VisualMetric::LoadCount => "COUNT",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            VisualMetric::LoadTime => "visual_load_time",
            VisualMetric::LoadCount => "visual_load_count",
        }
    }

    /// Metrics Insights query grouping load times per visual.
    pub fn expression(&self) -> String {
        format!(
            "SELECT {}(VisualLoadTime) FROM SCHEMA(\"AWS/QuickSight\", DashboardId,SheetId,VisualId) GROUP BY SheetId, VisualId,DashboardId",
            self.aggregate()
        )
    }

    /// S3 key for an export whose window ends at `end_secs`.
    pub fn object_key(&self, end_secs: i64) -> String {
        format!(
            "monitoring/quicksight/{name}/{name}{end}.csv",
            name = self.name(),
            end = end_secs
        )
    }

    pub fn query(&self, config: &MonitoringConfig, end: DateTime<Utc>) -> MetricQuery {
        MetricQuery {
            id: QUERY_ID.to_string(),
            expression: self.expression(),
            label: SERIES_LABEL.to_string(),
            period_secs: config.period_secs,
            start: end - Duration::seconds(config.window_secs),
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualRow {
    pub timestamp: i64,
    pub dashboard_id: String,
    pub sheet_id: String,
    pub visual_id: String,
    pub value: f64,
}

impl VisualRow {
    fn to_fields(&self) -> Vec<String> {
        vec![
            self.timestamp.to_string(),
            self.dashboard_id.clone(),
            self.sheet_id.clone(),
            self.visual_id.clone(),
            self.value.to_string(),
        ]
    }
}

/// Split `qs_visuals <sheet> <visual> <dashboard>` into its ids.
pub fn parse_label(label: &str) -> Option<(&str, &str, &str)> {
    let mut parts = label.split(' ');
    let _label = parts.next()?;
    let sheet = parts.next()?;
    let visual = parts.next()?;
    let dashboard = parts.next()?;
    Some((sheet, visual, dashboard))
}

/// One row per series, from its first datapoint.
pub fn rows_from_series(series: &[MetricSeries]) -> Vec<VisualRow> {
    series
        .iter()
        .filter_map(|s| {
            let Some((sheet, visual, dashboard)) = parse_label(&s.label) else {
                qs_warn!("Skipping series with unexpected label {:?}", s.label);
                return None;
            };
            let timestamp = s.timestamps.first()?;
            let value = s.values.first()?;
            Some(VisualRow {
                timestamp: timestamp.timestamp(),
                dashboard_id: dashboard.to_string(),
                sheet_id: sheet.to_string(),
                visual_id: visual.to_string(),
                value: *value,
            })
        })
        .collect()
}

/// Run both visual queries for the window ending at `end` and upload one
/// CSV per metric. Returns the keys written.
pub async fn export_visual_metrics(
    source: &dyn MetricsSource,
    store: &dyn ObjectStore,
    bucket: &str,
    config: &MonitoringConfig,
    end: DateTime<Utc>,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for metric in VisualMetric::ALL {
        let series = source.query(&metric.query(config, end)).await?;
        let rows: Vec<Vec<String>> = rows_from_series(&series)
            .iter()
            .map(VisualRow::to_fields)
            .collect();
        let key = metric.object_key(end.timestamp());
        store
            .put_object(bucket, &key, csv::render(&[], &rows).into_bytes(), "text/csv")
            .await?;
        qs_info!("Uploaded {} row(s) to s3://{}/{}", rows.len(), bucket, key);
        keys.push(key);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expression_and_key() {
        assert!(VisualMetric::LoadCount
            .expression()
            .starts_with("SELECT COUNT(VisualLoadTime) FROM SCHEMA(\"AWS/QuickSight\""));
        assert_eq!(
            VisualMetric::LoadTime.object_key(1700000000),
            "monitoring/quicksight/visual_load_time/visual_load_time1700000000.csv"
        );
    }

    #[test]
    fn test_query_window() {
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let query = VisualMetric::LoadTime.query(&MonitoringConfig::default(), end);
        assert_eq!((query.end - query.start).num_seconds(), 1800);
        assert_eq!(query.period_secs, 300);
        assert_eq!(query.label, "qs_visuals");
    }

    #[test]
    fn test_rows_use_first_datapoint() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let series = vec![
            MetricSeries {
                label: "qs_visuals sheet-1 visual-9 dash-3".into(),
                timestamps: vec![t0, t0 - Duration::minutes(5)],
                values: vec![812.5, 400.0],
            },
            MetricSeries {
                label: "qs_visuals broken".into(),
                timestamps: vec![t0],
                values: vec![1.0],
            },
            MetricSeries {
                label: "qs_visuals s v d".into(),
                timestamps: vec![],
                values: vec![],
            },
        ];
        let rows = rows_from_series(&series);
        assert_eq!(
            rows,
            vec![VisualRow {
                timestamp: t0.timestamp(),
                dashboard_id: "dash-3".into(),
                sheet_id: "sheet-1".into(),
                visual_id: "visual-9".into(),
                value: 812.5,
            }]
        );
        assert_eq!(
            rows[0].to_fields(),
            vec![
                t0.timestamp().to_string(),
                "dash-3".to_string(),
                "sheet-1".to_string(),
                "visual-9".to_string(),
                "812.5".to_string()
            ]
        );
    }
}
