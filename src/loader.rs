//! Loads a raw batch into the query engine and defines the views over it.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::aggregate::aggregate_trips;
use crate::aggregate::view::{
    AGGREGATE_VIEW, aggregate_view_sql, analysis_views, kpi_queries, top_groups_sql,
    top_zones_sql, view_count_sql,
};
use crate::engine::{QueryEngine, RowSet};
use crate::error::Result;
use crate::trips::{RawBatch, TripFormat};
use crate::zones::{LocationZone, ZONES_TABLE, zones_table};

const TOP_GROUPS: usize = 5;

/// A headline figure; `None` when the query failed or returned nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: &'static str,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub format: TripFormat,
    pub raw_rows: usize,
    /// Rows the validity filter drops from the aggregate.
    pub excluded_rows: usize,
    /// Groups the in-process aggregation produced for the same batch.
    pub expected_groups: usize,
    /// Rows the engine reports for the aggregate view, if the count succeeded.
    pub view_rows: Option<u64>,
    pub zones_loaded: bool,
    /// Analysis views that were created.
    pub views: Vec<&'static str>,
    pub kpis: Vec<Kpi>,
}

/// Replaces the raw table, defines the aggregate view and its companions,
/// then verifies the view and computes KPIs.
///
/// Only the raw table and the aggregate view are required; zones, analysis
/// views, verification and KPIs log their failures and carry on.
#[tracing::instrument(skip_all, fields(format = %batch.format, rows = batch.len()))]
pub async fn load(
    engine: &impl QueryEngine,
    batch: &RawBatch,
    zones: &[LocationZone],
) -> Result<LoadReport> {
    let mapping = batch.format.mapping();

    let raw_rows = engine.replace_table(&batch.to_table()).await?;
    info!(table = mapping.raw_table, rows = raw_rows, "Raw table loaded");

    engine
        .execute(&aggregate_view_sql(mapping))
        .await
        .inspect_err(|e| error!(view = AGGREGATE_VIEW, error = %e, "Failed to create aggregate view"))?;
    info!(view = AGGREGATE_VIEW, "Aggregate view created");

    let zones_loaded = match engine.replace_table(&zones_table(zones)).await {
        Ok(n) => {
            info!(table = ZONES_TABLE, rows = n, "Zone reference table loaded");
            true
        }
        Err(e) => {
            warn!(table = ZONES_TABLE, error = %e, "Zone reference table not loaded");
            false
        }
    };

    let mut views = Vec::new();
    for view in analysis_views(mapping, |c| batch.has_column(c)) {
        match engine.execute(&view.sql).await {
            Ok(()) => {
                info!(view = view.name, "Analysis view created");
                views.push(view.name);
            }
            Err(e) => warn!(view = view.name, error = %e, "Analysis view not created"),
        }
    }

    let aggregation = aggregate_trips(&batch.records()?);
    let view_rows = verify(engine, aggregation.records.len(), mapping.has_location() && zones_loaded).await;

    let mut kpis = Vec::new();
    for (label, sql) in kpi_queries(mapping) {
        let value = match engine.query(&sql).await {
            Ok(rows) => rows.scalar().and_then(numeric),
            Err(e) => {
                warn!(kpi = label, error = %e, "KPI query failed");
                None
            }
        };
        info!(kpi = label, value = ?value, "KPI");
        kpis.push(Kpi { label, value });
    }

    Ok(LoadReport {
        format: batch.format,
        raw_rows,
        excluded_rows: aggregation.excluded,
        expected_groups: aggregation.records.len(),
        view_rows,
        zones_loaded,
        views,
        kpis,
    })
}

/// Compares the view's row count with the in-process group count and logs
/// the busiest groups. Returns the view's row count.
async fn verify(engine: &impl QueryEngine, expected: usize, join_zones: bool) -> Option<u64> {
    let view_rows = match engine.query(&view_count_sql()).await {
        Ok(rows) => rows.scalar().and_then(Value::as_u64),
        Err(e) => {
            warn!(view = AGGREGATE_VIEW, error = %e, "View count query failed");
            None
        }
    };

    match view_rows {
        Some(0) => warn!(view = AGGREGATE_VIEW, "Aggregate view is empty"),
        Some(n) if n as usize != expected => {
            warn!(view = AGGREGATE_VIEW, view_rows = n, expected, "Aggregate view row count differs from local aggregation")
        }
        Some(n) => info!(view = AGGREGATE_VIEW, view_rows = n, "Aggregate view verified"),
        None => {}
    }

    match engine.query(&top_groups_sql(TOP_GROUPS)).await {
        Ok(rows) => log_rows("Top group", &rows),
        Err(e) => warn!(error = %e, "Top groups query failed"),
    }

    if join_zones {
        match engine.query(&top_zones_sql(ZONES_TABLE, TOP_GROUPS)).await {
            Ok(rows) => log_rows("Top zone", &rows),
            Err(e) => warn!(error = %e, "Top zones query failed"),
        }
    }

    view_rows
}

fn log_rows(message: &str, rows: &RowSet) {
    for row in &rows.rows {
        let fields: Vec<String> = rows
            .columns
            .iter()
            .zip(row)
            .map(|(c, v)| format!("{c}={v}"))
            .collect();
        info!(row = %fields.join(" "), "{message}");
    }
}

/// Trino returns DECIMAL as a JSON string.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
