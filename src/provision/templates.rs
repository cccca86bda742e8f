//! Chart templates instantiated against the aggregate dataset.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;

use crate::error::{Error, Result};
use crate::services::dashboard_api::{ChartSpec, DatasetId};

/// A chart to create under the dataset, minus the dataset id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTemplate {
    pub name: String,
    pub viz_type: String,
    /// Form data for the visualization; `viz_type` and `datasource` are
    /// filled in when the template is instantiated.
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub description: String,
}

impl ChartTemplate {
    pub fn new(name: &str, viz_type: &str, params: Value, description: &str) -> Self {
        Self {
            name: name.to_string(),
            viz_type: viz_type.to_string(),
            params,
            description: description.to_string(),
        }
    }

    /// Binds the template to a dataset.
    pub fn instantiate(&self, dataset: DatasetId) -> Result<ChartSpec> {
        let mut params = match &self.params {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(Error::Config(format!(
                    "chart '{}': params must be a JSON object, got {other}",
                    self.name
                )));
            }
        };
        params.insert("viz_type".into(), Value::String(self.viz_type.clone()));
        params.insert("datasource".into(), Value::String(format!("{dataset}__table")));

        Ok(ChartSpec {
            slice_name: self.name.clone(),
            viz_type: self.viz_type.clone(),
            datasource_id: dataset,
            datasource_type: "table".to_string(),
            params: serde_json::to_string(&Value::Object(params))?,
            description: self.description.clone(),
        })
    }
}

fn kpi(name: &str, metric: &str, format: &str) -> ChartTemplate {
    ChartTemplate::new(
        name,
        "big_number_total",
        json!({
            "metric": metric,
            "header_font_size": 0.4,
            "subheader_font_size": 0.15,
            "y_axis_format": format,
            "adhoc_filters": [],
        }),
        &format!("KPI: {name}"),
    )
}

/// KPI tiles, hourly trend, busy-hours bars and the top pickup zones.
pub fn default_templates() -> Vec<ChartTemplate> {
    vec![
        kpi("Total Trips", "SUM(number)", ",.0f"),
        kpi("Total Revenue", "SUM(Total_Amount)", "$,.2f"),
        kpi("Average Fare", "AVG(AVG_Total_Amount)", "$,.2f"),
        kpi("Total Miles", "SUM(Total_Trip_Distance)", ",.1f"),
        ChartTemplate::new(
            "Trips Over Time",
            "echarts_timeseries_line",
            json!({
                "x_axis": "Pickup_Time",
                "metrics": ["SUM(number)"],
                "groupby": ["taxi_type"],
                "time_grain_sqla": "PT1H",
                "row_limit": 10000,
                "show_legend": true,
                "rich_tooltip": true,
                "show_markers": false,
            }),
            "Hourly trip count by taxi type",
        ),
        ChartTemplate::new(
            "Busy Hours Analysis",
            "echarts_timeseries_bar",
            json!({
                "x_axis": "Pickup_Time",
                "metrics": ["SUM(number)"],
                "groupby": ["taxi_type"],
                "row_limit": 24,
                "show_legend": true,
            }),
            "Trip volume by hour of day",
        ),
        ChartTemplate::new(
            "Top Pickup Locations",
            "table",
            json!({
                "groupby": ["Pickup_Location"],
                "metrics": ["SUM(number)", "SUM(Total_Amount)", "AVG(AVG_Trip_Distance)"],
                "row_limit": 20,
                "page_length": 25,
                "show_cell_bars": true,
                "order_desc": true,
            }),
            "Top 20 busiest pickup locations",
        ),
    ]
}

/// Loads templates from a JSON array on disk:
/// ```json
/// [
///   { "name": "Total Trips", "viz_type": "big_number_total",
///     "params": { "metric": "SUM(number)" } }
/// ]
/// ```
pub fn load_templates(path: impl AsRef<Path>) -> Result<Vec<ChartTemplate>> {
    let content = std::fs::read_to_string(path)?;
    let templates: Vec<ChartTemplate> = serde_json::from_str(&content)?;
    Ok(templates)
}
