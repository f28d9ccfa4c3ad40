//! Success and fail lists collected during one migration run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::quicksight::{AssetKind, AssetSummary};
use crate::app::sdk_errors::FailureKind;

/// Timestamp prefix on report file names.
pub const REPORT_TIME_FORMAT: &str = "%m-%d-%Y_%H_%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub asset_id: String,
    pub name: String,
    /// Step that failed, e.g. `create`, `template`, `poll`.
    pub step: String,
    pub error: String,
    pub error_type: FailureKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub succeeded: Vec<AssetSummary>,
    pub failed: Vec<FailureRecord>,
    /// Assets left alone, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl StageReport {
    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub stages: BTreeMap<AssetKind, StageReport>,
}

impl MigrationReport {
    pub fn stage(&self, kind: AssetKind) -> Option<&StageReport> {
        self.stages.get(&kind)
    }

    pub fn stage_mut(&mut self, kind: AssetKind) -> &mut StageReport {
        self.stages.entry(kind).or_default()
    }

    pub fn succeeded(&mut self, kind: AssetKind, asset: AssetSummary) {
        self.stage_mut(kind).succeeded.push(asset);
    }

    pub fn failed(&mut self, kind: AssetKind, record: FailureRecord) {
        self.stage_mut(kind).failed.push(record);
    }

    pub fn skipped(&mut self, kind: AssetKind, id: &str, reason: impl Into<String>) {
        self.stage_mut(kind)
            .skipped
            .push((id.to_string(), reason.into()));
    }

    pub fn failure_count(&self) -> usize {
        self.stages.values().map(|s| s.failed.len()).sum()
    }

    pub fn success_count(&self) -> usize {
        self.stages.values().map(|s| s.succeeded.len()).sum()
    }

    /// Write `Successful/<now>_<Stage>_Success.json` and
    /// `Fail/<now>_<Stage>_Error.json` under `dir` for every stage that ran.
    pub fn write_to(&self, dir: &Path, now: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        let stamp = now.format(REPORT_TIME_FORMAT).to_string();
        let success_dir = dir.join("Successful");
        let fail_dir = dir.join("Fail");
        fs::create_dir_all(&success_dir)
            .with_context(|| format!("Failed to create {}", success_dir.display()))?;
        fs::create_dir_all(&fail_dir)
            .with_context(|| format!("Failed to create {}", fail_dir.display()))?;

        let mut written = Vec::new();
        for (kind, stage) in &self.stages {
            if stage.is_empty() {
                continue;
            }
            let success_path = success_dir.join(format!("{}_{}_Success.json", stamp, kind));
            write_json(&success_path, &stage.succeeded)?;
            written.push(success_path);

            let fail_path = fail_dir.join(format!("{}_{}_Error.json", stamp, kind));
            write_json(&fail_path, &stage.failed)?;
            written.push(fail_path);
        }
        Ok(written)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
