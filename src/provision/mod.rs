//! Provisioning of the NYC taxi dashboard: connection, dataset, charts and
//! dashboard, created in dependency order.

pub mod orchestrator;
pub mod report;
pub mod templates;

pub use orchestrator::Orchestrator;
pub use report::{
    CreatedChart, ProvisionProgress, Provisioned, ProvisioningFailure, ProvisioningResult,
    SkippedChart, Stage,
};
pub use templates::{ChartTemplate, default_templates, load_templates};

use serde_json::json;

use crate::aggregate::view::AGGREGATE_VIEW;
use crate::error::Result;
use crate::services::dashboard_api::DashboardSpec;

pub const DEFAULT_DATABASE_NAME: &str = "NYC Taxi Trino";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardTemplate {
    pub title: String,
    pub description: String,
    pub published: bool,
}

impl DashboardTemplate {
    /// An empty published dashboard. Charts are attached by the operator.
    pub fn to_spec(&self) -> Result<DashboardSpec> {
        let metadata = json!({
            "color_scheme": "",
            "label_colors": {},
            "shared_label_colors": {},
            "expanded_slices": {},
        });
        Ok(DashboardSpec {
            dashboard_title: self.title.clone(),
            description: self.description.clone(),
            published: self.published,
            json_metadata: serde_json::to_string(&metadata)?,
            position_json: "{}".to_string(),
        })
    }
}

/// Everything a provisioning run creates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionConfig {
    pub database_name: String,
    pub sqlalchemy_uri: String,
    pub schema: String,
    pub table_name: String,
    pub dataset_description: String,
    pub charts: Vec<ChartTemplate>,
    pub dashboard: DashboardTemplate,
    /// Look up the connection and dataset by name before creating them.
    pub reuse_existing: bool,
}

impl ProvisionConfig {
    /// The taxi dashboard over the aggregate view, with the default charts.
    pub fn nyc_taxi(sqlalchemy_uri: &str, schema: &str) -> Self {
        Self {
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            sqlalchemy_uri: sqlalchemy_uri.to_string(),
            schema: schema.to_string(),
            table_name: AGGREGATE_VIEW.to_string(),
            dataset_description: "Hourly NYC taxi trip aggregates by pickup location and taxi type"
                .to_string(),
            charts: default_templates(),
            dashboard: DashboardTemplate {
                title: "NYC Taxi Analytics Dashboard".to_string(),
                description: "Trip volume, revenue and pickup patterns for NYC taxis".to_string(),
                published: true,
            },
            reuse_existing: true,
        }
    }

    pub fn with_charts(mut self, charts: Vec<ChartTemplate>) -> Self {
        self.charts = charts;
        self
    }

    pub fn always_create(mut self) -> Self {
        self.reuse_existing = false;
        self
    }
}
