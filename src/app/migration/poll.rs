//! Fixed-interval polling with an attempt bound.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::app::config::PollConfig;
use crate::app::quicksight::AssetStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollConfig::default().into()
    }
}

impl From<PollConfig> for PollPolicy {
    fn from(config: PollConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe reported a terminal value.
    Settled(T),
    /// Attempts ran out; carries the last value seen, if any.
    TimedOut(Option<T>),
}

impl PollPolicy {
    /// Probe until `is_done` accepts the value or attempts run out.
    ///
    /// `Ok(None)` from the probe means "not visible yet" and keeps polling.
    /// Probe errors end the wait immediately.
    pub async fn wait_until<T, F, Fut, D>(&self, what: &str, mut probe: F, is_done: D) -> Result<PollOutcome<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
        D: Fn(&T) -> bool,
        T: std::fmt::Debug,
    {
        let mut last = None;
        for attempt in 1..=self.max_attempts {
            match probe().await? {
                Some(value) if is_done(&value) => return Ok(PollOutcome::Settled(value)),
                Some(value) => {
                    debug!("{}: attempt {} saw {:?}", what, attempt, value);
                    last = Some(value);
                }
                None => debug!("{}: attempt {} not visible yet", what, attempt),
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        Ok(PollOutcome::TimedOut(last))
    }

    /// Wait for an asset to leave its `*_IN_PROGRESS` state.
    pub async fn wait_for_status<F, Fut>(&self, what: &str, probe: F) -> Result<PollOutcome<AssetStatus>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<AssetStatus>>>,
    {
        self.wait_until(what, probe, |status: &AssetStatus| !status.is_in_progress())
            .await
    }
}
