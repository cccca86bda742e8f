use tracing::{error, info, warn};

use super::ProvisionConfig;
use super::report::{
    CreatedChart, ProvisionProgress, Provisioned, ProvisioningFailure, ProvisioningResult,
    SkippedChart, Stage,
};
use crate::error::{Error, Result};
use crate::services::dashboard_api::{
    DashboardApi, DashboardId, DatabaseId, DatabaseSpec, DatasetId, DatasetSpec,
};

/// Drives the dependency chain connection → dataset → charts → dashboard
/// against a [`DashboardApi`], one call at a time.
///
/// Connection and dataset failures stop the run. A chart the service rejects
/// is recorded as skipped and the next chart is attempted. The dashboard is
/// created however many charts succeeded.
pub struct Orchestrator<A> {
    api: A,
    config: ProvisionConfig,
    progress: ProvisionProgress,
}

impl<A: DashboardApi> Orchestrator<A> {
    pub fn new(api: A, config: ProvisionConfig) -> Self {
        Self {
            api,
            config,
            progress: ProvisionProgress::default(),
        }
    }

    pub fn progress(&self) -> &ProvisionProgress {
        &self.progress
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Lets the caller repair the service handle (e.g. authenticate again)
    /// before resuming with another [`provision`](Self::provision).
    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    /// Runs every step in order and reports what was created.
    #[tracing::instrument(skip(self), fields(database = %self.config.database_name, table = %self.config.table_name))]
    pub async fn provision(&mut self) -> std::result::Result<ProvisioningResult, ProvisioningFailure> {
        match self.run_steps().await {
            Ok(result) => Ok(result),
            Err(error) => Err(ProvisioningFailure {
                error,
                progress: self.progress.clone(),
            }),
        }
    }

    async fn run_steps(&mut self) -> Result<ProvisioningResult> {
        let database = self.ensure_connection().await?;
        let dataset = self.ensure_dataset().await?;
        self.create_charts().await?;
        let dashboard_id = self.create_dashboard().await?;
        self.progress.advance(Stage::Done);

        Ok(ProvisioningResult {
            database: Provisioned {
                id: database,
                reused: self.progress.database.is_some_and(|p| p.reused),
            },
            dataset: Provisioned {
                id: dataset,
                reused: self.progress.dataset.is_some_and(|p| p.reused),
            },
            charts: self.progress.charts.clone(),
            skipped: self.progress.skipped.clone(),
            dashboard_id,
            dashboard_url: self.api.dashboard_url(dashboard_id),
        })
    }

    /// Finds the connection by name (when reuse is enabled) or registers it.
    pub async fn ensure_connection(&mut self) -> Result<DatabaseId> {
        if let Some(db) = self.progress.database {
            return Ok(db.id);
        }

        let name = &self.config.database_name;
        if self.config.reuse_existing {
            let existing = self.api.find_databases(name).await?;
            if let Some(found) = existing.iter().find(|d| &d.database_name == name) {
                info!(database_id = %found.id, name = %name, "Reusing existing database connection");
                self.progress.database = Some(Provisioned {
                    id: found.id,
                    reused: true,
                });
                self.progress.advance(Stage::ConnectionCreated);
                return Ok(found.id);
            }
        }

        let spec = DatabaseSpec::read_only(name, &self.config.sqlalchemy_uri);
        let id = self
            .api
            .create_database(&spec)
            .await
            .inspect_err(|e| error!(name = %name, error = %e, "Failed to create database connection"))?;

        info!(database_id = %id, name = %name, "Created database connection");
        self.progress.database = Some(Provisioned { id, reused: false });
        self.progress.advance(Stage::ConnectionCreated);
        Ok(id)
    }

    /// Finds or registers the aggregate dataset. Requires a connection id.
    pub async fn ensure_dataset(&mut self) -> Result<DatasetId> {
        if let Some(ds) = self.progress.dataset {
            return Ok(ds.id);
        }
        let database = self
            .progress
            .database
            .map(|db| db.id)
            .ok_or(Error::DependencyUnmet {
                resource: "dataset",
                requires: "database connection",
            })?;

        let schema = &self.config.schema;
        let table = &self.config.table_name;
        if self.config.reuse_existing {
            let existing = self.api.find_datasets(table).await?;
            if let Some(found) = existing.iter().find(|d| {
                &d.table_name == table
                    && d.schema.as_ref() == Some(schema)
                    && d.database_id == Some(database)
            }) {
                info!(dataset_id = %found.id, %schema, %table, "Reusing existing dataset");
                self.progress.dataset = Some(Provisioned {
                    id: found.id,
                    reused: true,
                });
                self.progress.advance(Stage::DatasetCreated);
                return Ok(found.id);
            }
        }

        let spec = DatasetSpec {
            database,
            schema: schema.clone(),
            table_name: table.clone(),
            description: self.config.dataset_description.clone(),
        };
        let id = self
            .api
            .create_dataset(&spec)
            .await
            .inspect_err(|e| error!(%schema, %table, error = %e, "Failed to create dataset"))?;

        info!(dataset_id = %id, %schema, %table, "Created dataset");
        self.progress.dataset = Some(Provisioned { id, reused: false });
        self.progress.advance(Stage::DatasetCreated);
        Ok(id)
    }

    /// Creates every configured chart under the dataset, in configured order.
    /// Returns how many were created; rejected charts are recorded as skipped.
    ///
    /// Charts already created by an earlier run are left alone. Charts skipped
    /// earlier are attempted again.
    pub async fn create_charts(&mut self) -> Result<usize> {
        let dataset = self
            .progress
            .dataset
            .map(|ds| ds.id)
            .ok_or(Error::DependencyUnmet {
                resource: "chart",
                requires: "dataset",
            })?;

        self.progress.skipped.clear();
        let mut created = 0;
        for template in &self.config.charts {
            if self.progress.charts.iter().any(|c| c.name == template.name) {
                continue;
            }
            let outcome = match template.instantiate(dataset) {
                Ok(spec) => self.api.create_chart(&spec).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(id) => {
                    info!(chart_id = %id, chart = %template.name, "Created chart");
                    self.progress.charts.push(CreatedChart {
                        name: template.name.clone(),
                        id,
                    });
                    created += 1;
                }
                Err(
                    e @ (Error::RemoteRejection { .. }
                    | Error::InvalidResponse { .. }
                    | Error::Config(_)),
                ) => {
                    warn!(chart = %template.name, error = %e, "Chart not created, skipping");
                    self.progress.skipped.push(SkippedChart {
                        name: template.name.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(chart = %template.name, error = %e, "Chart creation aborted the run");
                    return Err(e);
                }
            }
        }

        self.progress.advance(Stage::ChartsCreated);
        Ok(created)
    }

    /// Creates the dashboard shell. Has no prerequisite id.
    pub async fn create_dashboard(&mut self) -> Result<DashboardId> {
        if let Some(id) = self.progress.dashboard {
            return Ok(id);
        }
        let spec = self.config.dashboard.to_spec()?;
        let id = self
            .api
            .create_dashboard(&spec)
            .await
            .inspect_err(|e| error!(title = %spec.dashboard_title, error = %e, "Failed to create dashboard"))?;

        info!(dashboard_id = %id, title = %spec.dashboard_title, "Created dashboard");
        self.progress.dashboard = Some(id);
        self.progress.advance(Stage::DashboardCreated);
        Ok(id)
    }
}
