//! Data types produced by the aggregation pipeline.

use serde::Serialize;

use crate::trips::TripFormat;

/// One row of the unified aggregate relation: a pickup hour, and for
/// location-keyed sources a pickup zone.
///
/// Serialized column names match the `nyc_taxi_aggregated` view so CSV
/// exports and the engine-side view share one contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedAggregateRecord {
    /// Pickup hour, `YYYY-MM-DD HH`.
    #[serde(rename = "Pickup_Time")]
    pub pickup_time: String,
    /// Always `None` for coordinate-keyed sources.
    #[serde(rename = "Pickup_Location")]
    pub pickup_location: Option<i64>,
    #[serde(rename = "Total_Amount")]
    pub total_amount: f64,
    #[serde(rename = "AVG_Total_Amount")]
    pub avg_total_amount: f64,
    #[serde(rename = "Total_Trip_Distance")]
    pub total_trip_distance: f64,
    #[serde(rename = "AVG_Trip_Distance")]
    pub avg_trip_distance: f64,
    #[serde(rename = "Total_Passenger_Count")]
    pub total_passenger_count: Option<i64>,
    #[serde(rename = "AVG_Passenger_Count")]
    pub avg_passenger_count: Option<f64>,
    #[serde(rename = "Fare_Amount")]
    pub fare_amount: Option<f64>,
    #[serde(rename = "Extra")]
    pub extra: Option<f64>,
    #[serde(rename = "tip_amount")]
    pub tip_amount: Option<f64>,
    #[serde(rename = "tolls_amount")]
    pub tolls_amount: Option<f64>,
    /// Trip count of the group.
    pub number: u64,
    pub taxi_type: TripFormat,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub records: Vec<UnifiedAggregateRecord>,
    /// Rows that passed the validity filter.
    pub admitted: usize,
    /// Rows dropped by the validity filter.
    pub excluded: usize,
}
