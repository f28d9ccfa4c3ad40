//! SPICE refresh trigger with overlap and duration guards.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::app::aws_services::Notifier;
use crate::app::config::IngestionConfig;
use crate::app::migration::poll::{PollOutcome, PollPolicy};
use crate::app::quicksight::{find_by_name_or_id, IngestionState, IngestionSummary, QuickSightApi};
use crate::app::sdk_errors::{categorize_error, FailureKind};

pub const SUCCESS_MESSAGE: &str = "Ingestion is finished successfully!!";
const NOTIFICATION_SUBJECT: &str = "QuickSight ingestion";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestionOutcome {
    /// Created; completion was not awaited.
    Started { ingestion_id: String },
    Completed { ingestion_id: String },
    Failed { ingestion_id: String, reason: String },
    /// A refresh for the dataset is already queued or running.
    AlreadyRunning { ingestion_id: String },
    /// The previous refresh ran longer than the configured guard.
    OverSchedule { previous_secs: i64 },
    /// The account's concurrent ingestion limit was hit.
    Throttled { message: String },
    TimedOut { ingestion_id: String },
}

impl fmt::Display for IngestionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestionOutcome::Started { ingestion_id } => write!(f, "started {}", ingestion_id),
            IngestionOutcome::Completed { ingestion_id } => {
                write!(f, "completed {}", ingestion_id)
            }
            IngestionOutcome::Failed {
                ingestion_id,
                reason,
            } => write!(f, "failed {}: {}", ingestion_id, reason),
            IngestionOutcome::AlreadyRunning { ingestion_id } => {
                write!(f, "skipped, {} still running", ingestion_id)
            }
            IngestionOutcome::OverSchedule { previous_secs } => write!(
                f,
                "skipped, previous refresh took {}s",
                previous_secs
            ),
            IngestionOutcome::Throttled { message } => write!(f, "throttled: {}", message),
            IngestionOutcome::TimedOut { ingestion_id } => {
                write!(f, "timed out waiting for {}", ingestion_id)
            }
        }
    }
}

/// Reason to skip a new refresh, judged from the dataset's ingestion history.
fn guard(history: &[IngestionSummary], max_previous_secs: i64) -> Option<IngestionOutcome> {
    if let Some(active) = history.iter().find(|i| i.state.is_active()) {
        return Some(IngestionOutcome::AlreadyRunning {
            ingestion_id: active.id.clone(),
        });
    }
    let latest = history
        .iter()
        .filter(|i| i.created_at.is_some())
        .max_by_key(|i| i.created_at)?;
    match latest.duration_secs {
        Some(secs) if secs > max_previous_secs => {
            Some(IngestionOutcome::OverSchedule { previous_secs: secs })
        }
        _ => None,
    }
}

pub struct IngestionTrigger<'a> {
    api: &'a dyn QuickSightApi,
    notifier: Option<&'a dyn Notifier>,
    config: &'a IngestionConfig,
    poll: PollPolicy,
}

impl<'a> IngestionTrigger<'a> {
    pub fn new(
        api: &'a dyn QuickSightApi,
        notifier: Option<&'a dyn Notifier>,
        config: &'a IngestionConfig,
    ) -> Self {
        Self {
            api,
            notifier,
            config,
            poll: config.poll.into(),
        }
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Start a full refresh of the dataset named or identified by `data_set`.
    pub async fn trigger(&self, data_set: &str) -> Result<IngestionOutcome> {
        let data_sets = self.api.list_data_sets().await?;
        let data_set_id = find_by_name_or_id(&data_sets, data_set)
            .map(|summary| summary.id.clone())
            .ok_or_else(|| anyhow!("Dataset {} not found", data_set))?;

        let history = self.api.list_ingestions(&data_set_id).await?;
        if let Some(skip) = guard(&history, self.config.max_previous_duration_secs) {
            qs_info!("Not refreshing {}: {}", data_set_id, skip);
            return Ok(skip);
        }

        let ingestion_id = Uuid::new_v4().to_string();
        if let Err(error) = self.api.create_ingestion(&data_set_id, &ingestion_id).await {
            let category = categorize_error(&error, "quicksight", "CreateIngestion");
            if category.kind() == FailureKind::Throttled {
                qs_warn!("Ingestion for {} throttled: {:#}", data_set_id, error);
                return Ok(IngestionOutcome::Throttled {
                    message: category.user_message(),
                });
            }
            return Err(error);
        }
        qs_info!("Started ingestion {} for dataset {}", ingestion_id, data_set_id);

        if !self.config.wait_for_completion {
            return Ok(IngestionOutcome::Started { ingestion_id });
        }

        let outcome = self.wait(&data_set_id, &ingestion_id).await?;
        self.notify(&data_set_id, &outcome).await;
        Ok(outcome)
    }

    async fn wait(&self, data_set_id: &str, ingestion_id: &str) -> Result<IngestionOutcome> {
        let api = self.api;
        let what = format!("ingestion {}", ingestion_id);
        let outcome = self
            .poll
            .wait_until(
                &what,
                move || async move { api.describe_ingestion(data_set_id, ingestion_id).await },
                |ingestion: &IngestionSummary| !ingestion.state.is_active(),
            )
            .await?;

        let ingestion_id = ingestion_id.to_string();
        Ok(match outcome {
            PollOutcome::Settled(IngestionSummary {
                state: IngestionState::Completed,
                ..
            }) => IngestionOutcome::Completed { ingestion_id },
            PollOutcome::Settled(ingestion) => IngestionOutcome::Failed {
                ingestion_id,
                reason: ingestion
                    .error
                    .unwrap_or_else(|| ingestion.state.to_string()),
            },
            PollOutcome::TimedOut(_) => IngestionOutcome::TimedOut { ingestion_id },
        })
    }

    async fn notify(&self, data_set_id: &str, outcome: &IngestionOutcome) {
        let (Some(notifier), Some(topic_arn)) = (self.notifier, self.config.topic_arn.as_deref())
        else {
            return;
        };
        let message = match outcome {
            IngestionOutcome::Completed { .. } => SUCCESS_MESSAGE.to_string(),
            other => format!("Ingestion of dataset {} {}", data_set_id, other),
        };
        if let Err(e) = notifier
            .publish(topic_arn, NOTIFICATION_SUBJECT, &message)
            .await
        {
            qs_warn!("Failed to publish ingestion notification: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ingestion(id: &str, state: IngestionState, minute: u32, secs: Option<i64>) -> IngestionSummary {
        IngestionSummary {
            id: id.to_string(),
            state,
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, minute, 0).unwrap()),
            duration_secs: secs,
            error: None,
        }
    }

    #[test]
    fn test_guard_running() {
        let history = vec![
            ingestion("old", IngestionState::Completed, 0, Some(60)),
            ingestion("now", IngestionState::Queued, 30, None),
        ];
        assert_eq!(
            guard(&history, 1500),
            Some(IngestionOutcome::AlreadyRunning {
                ingestion_id: "now".into()
            })
        );
    }

    #[test]
    fn test_guard_uses_latest_duration() {
        let history = vec![
            ingestion("slow", IngestionState::Completed, 0, Some(4000)),
            ingestion("fast", IngestionState::Completed, 30, Some(90)),
        ];
        assert_eq!(guard(&history, 1500), None);

        let history = vec![
            ingestion("fast", IngestionState::Completed, 0, Some(90)),
            ingestion("slow", IngestionState::Failed, 30, Some(1600)),
        ];
        assert_eq!(
            guard(&history, 1500),
            Some(IngestionOutcome::OverSchedule {
                previous_secs: 1600
            })
        );
    }

    #[test]
    fn test_guard_empty_history() {
        assert_eq!(guard(&[], 1500), None);
    }
}
