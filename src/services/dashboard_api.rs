//! Trait and types for provisioning resources in a dashboarding service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

macro_rules! resource_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

resource_id!(DatabaseId);
resource_id!(DatasetId);
resource_id!(ChartId);
resource_id!(DashboardId);

/// Body of a database-connection registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSpec {
    pub database_name: String,
    pub sqlalchemy_uri: String,
    pub expose_in_sqllab: bool,
    pub allow_ctas: bool,
    pub allow_cvas: bool,
    pub allow_dml: bool,
    pub allow_multi_schema_metadata_fetch: bool,
    pub allow_run_async: bool,
    pub cache_timeout: u32,
}

impl DatabaseSpec {
    /// Read-only connection exposed in SQL Lab, with an hour of result cache.
    pub fn read_only(database_name: &str, sqlalchemy_uri: &str) -> Self {
        Self {
            database_name: database_name.to_string(),
            sqlalchemy_uri: sqlalchemy_uri.to_string(),
            expose_in_sqllab: true,
            allow_ctas: false,
            allow_cvas: false,
            allow_dml: false,
            allow_multi_schema_metadata_fetch: true,
            allow_run_async: true,
            cache_timeout: 3600,
        }
    }
}

/// Body of a dataset registration; requires the owning connection's id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSpec {
    pub database: DatabaseId,
    pub schema: String,
    pub table_name: String,
    pub description: String,
}

/// Body of a chart creation; requires the dataset's id.
///
/// `params` is a JSON document serialized to a string, which is how the
/// service stores chart form data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub slice_name: String,
    pub viz_type: String,
    pub datasource_id: DatasetId,
    pub datasource_type: String,
    pub params: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSpec {
    pub dashboard_title: String,
    pub description: String,
    pub published: bool,
    pub json_metadata: String,
    pub position_json: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseSummary {
    pub id: DatabaseId,
    pub database_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub id: DatasetId,
    pub table_name: String,
    pub schema: Option<String>,
    pub database_id: Option<DatabaseId>,
}

/// Abstraction over a dashboarding service (e.g., Superset).
///
/// Methods take `&mut self`: implementations own an authenticated session
/// whose state a failed call may change.
#[async_trait]
pub trait DashboardApi: Send {
    async fn create_database(&mut self, spec: &DatabaseSpec) -> Result<DatabaseId>;

    /// Existing connections registered under `database_name`.
    async fn find_databases(&mut self, database_name: &str) -> Result<Vec<DatabaseSummary>>;

    async fn create_dataset(&mut self, spec: &DatasetSpec) -> Result<DatasetId>;

    /// Existing datasets over a table named `table_name`, in any schema or
    /// connection.
    async fn find_datasets(&mut self, table_name: &str) -> Result<Vec<DatasetSummary>>;

    async fn create_chart(&mut self, spec: &ChartSpec) -> Result<ChartId>;

    async fn create_dashboard(&mut self, spec: &DashboardSpec) -> Result<DashboardId>;

    /// Where an operator can open the dashboard, if the service has a UI.
    fn dashboard_url(&self, _id: DashboardId) -> Option<String> {
        None
    }
}
