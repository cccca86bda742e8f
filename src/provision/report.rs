//! Progress, result and failure types of a provisioning run.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::services::dashboard_api::{ChartId, DashboardId, DatabaseId, DatasetId};

/// How far a run has got. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Start,
    ConnectionCreated,
    DatasetCreated,
    ChartsCreated,
    DashboardCreated,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A connection or dataset identifier, and whether it was found rather than
/// created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Provisioned<T> {
    pub id: T,
    pub reused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedChart {
    pub name: String,
    pub id: ChartId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedChart {
    pub name: String,
    pub reason: String,
}

/// Everything a run has created so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionProgress {
    pub stage: Stage,
    pub database: Option<Provisioned<DatabaseId>>,
    pub dataset: Option<Provisioned<DatasetId>>,
    pub charts: Vec<CreatedChart>,
    pub skipped: Vec<SkippedChart>,
    pub dashboard: Option<DashboardId>,
}

impl Default for ProvisionProgress {
    fn default() -> Self {
        Self {
            stage: Stage::Start,
            database: None,
            dataset: None,
            charts: Vec::new(),
            skipped: Vec::new(),
            dashboard: None,
        }
    }
}

impl ProvisionProgress {
    pub(crate) fn advance(&mut self, stage: Stage) {
        self.stage = self.stage.max(stage);
    }

    fn log_created(&self) {
        if let Some(db) = &self.database {
            info!(database_id = %db.id, reused = db.reused, "Database connection");
        }
        if let Some(ds) = &self.dataset {
            info!(dataset_id = %ds.id, reused = ds.reused, "Dataset");
        }
        for chart in &self.charts {
            info!(chart_id = %chart.id, chart = %chart.name, "Chart");
        }
        for skipped in &self.skipped {
            warn!(chart = %skipped.name, reason = %skipped.reason, "Chart skipped");
        }
    }
}

/// Outcome of a run that reached the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisioningResult {
    pub database: Provisioned<DatabaseId>,
    pub dataset: Provisioned<DatasetId>,
    pub charts: Vec<CreatedChart>,
    pub skipped: Vec<SkippedChart>,
    pub dashboard_id: DashboardId,
    pub dashboard_url: Option<String>,
}

impl ProvisioningResult {
    pub fn chart_ids(&self) -> Vec<ChartId> {
        self.charts.iter().map(|c| c.id).collect()
    }

    /// Logs what was created and what was skipped, and why.
    pub fn log_summary(&self) {
        let progress = ProvisionProgress {
            stage: Stage::Done,
            database: Some(self.database),
            dataset: Some(self.dataset),
            charts: self.charts.clone(),
            skipped: self.skipped.clone(),
            dashboard: Some(self.dashboard_id),
        };
        progress.log_created();

        info!(
            dashboard_id = %self.dashboard_id,
            url = self.dashboard_url.as_deref().unwrap_or("-"),
            charts_created = self.charts.len(),
            charts_skipped = self.skipped.len(),
            "Provisioning complete"
        );
    }
}

/// A run that stopped early, with whatever it had created by then.
#[derive(Debug, Error)]
#[error("provisioning stopped at stage {}: {error}", .progress.stage)]
pub struct ProvisioningFailure {
    #[source]
    pub error: Error,
    pub progress: ProvisionProgress,
}

impl ProvisioningFailure {
    pub fn log_summary(&self) {
        self.progress.log_created();
        error!(
            stage = %self.progress.stage,
            error = %self.error,
            charts_created = self.progress.charts.len(),
            charts_skipped = self.progress.skipped.len(),
            "Provisioning stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_never_moves_backwards() {
        let mut progress = ProvisionProgress::default();
        progress.advance(Stage::DatasetCreated);
        progress.advance(Stage::ConnectionCreated);
        assert_eq!(progress.stage, Stage::DatasetCreated);
    }

    #[test]
    fn test_failure_message_names_the_stage() {
        let failure = ProvisioningFailure {
            error: Error::Authentication("bad password".into()),
            progress: ProvisionProgress::default(),
        };
        assert_eq!(
            failure.to_string(),
            "provisioning stopped at stage Start: authentication failed: bad password"
        );
    }
}
