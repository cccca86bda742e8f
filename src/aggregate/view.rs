//! SQL definitions of the unified aggregate view and its companion views.
//!
//! Every statement is derived from a [`FieldMapping`], so both source formats
//! go through the same builder and the view applies the same filter,
//! grouping and metrics as [`super::aggregate_trips`].

use crate::engine::quote_literal;
use crate::trips::{FieldMapping, UnifiedField};

pub const AGGREGATE_VIEW: &str = "nyc_taxi_aggregated";

/// Engine-side expression of [`super::hour_bucket`].
fn bucket_expr(pickup: &str) -> String {
    format!("DATE_FORMAT({pickup}, '%Y-%m-%d %H')")
}

/// Columns every format supplies; guaranteed by the schema check.
struct Core {
    pickup: &'static str,
    location: Option<&'static str>,
    total: &'static str,
    distance: &'static str,
    passengers: &'static str,
    fare: &'static str,
    extra: &'static str,
    tip: &'static str,
    tolls: &'static str,
}

impl Core {
    fn of(mapping: &FieldMapping) -> Self {
        let column = |field| mapping.source(field).unwrap_or("NULL");
        Core {
            pickup: column(UnifiedField::PickupTime),
            location: mapping.source(UnifiedField::PickupLocation),
            total: column(UnifiedField::TotalAmount),
            distance: column(UnifiedField::TripDistance),
            passengers: column(UnifiedField::PassengerCount),
            fare: column(UnifiedField::FareAmount),
            extra: column(UnifiedField::Extra),
            tip: column(UnifiedField::TipAmount),
            tolls: column(UnifiedField::TollsAmount),
        }
    }
}

/// `CREATE OR REPLACE VIEW nyc_taxi_aggregated` for the given format.
///
/// Coordinate-keyed formats get a typed `NULL` pickup location and are
/// grouped by hour only.
pub fn aggregate_view_sql(mapping: &FieldMapping) -> String {
    let c = Core::of(mapping);
    let bucket = bucket_expr(c.pickup);
    let tag = quote_literal(mapping.format.tag());

    let location_select = c.location.unwrap_or("CAST(NULL AS BIGINT)");
    let (location_filter, location_group) = match c.location {
        Some(loc) => (format!("\n    AND {loc} IS NOT NULL"), format!(",\n    {loc}")),
        None => (String::new(), String::new()),
    };

    format!(
        "CREATE OR REPLACE VIEW {AGGREGATE_VIEW} AS
SELECT
    {bucket} AS Pickup_Time,
    {location_select} AS Pickup_Location,
    SUM({total}) AS Total_Amount,
    AVG({total}) AS AVG_Total_Amount,
    SUM({distance}) AS Total_Trip_Distance,
    AVG({distance}) AS AVG_Trip_Distance,
    SUM({passengers}) AS Total_Passenger_Count,
    AVG(CAST({passengers} AS DOUBLE)) AS AVG_Passenger_Count,
    SUM({fare}) AS Fare_Amount,
    SUM({extra}) AS Extra,
    SUM({tip}) AS tip_amount,
    SUM({tolls}) AS tolls_amount,
    COUNT(*) AS number,
    {tag} AS taxi_type
FROM {table}
WHERE {pickup} IS NOT NULL
    AND {total} > 0
    AND {distance} > 0{location_filter}
GROUP BY
    {bucket}{location_group}",
        total = c.total,
        distance = c.distance,
        passengers = c.passengers,
        fare = c.fare,
        extra = c.extra,
        tip = c.tip,
        tolls = c.tolls,
        pickup = c.pickup,
        table = mapping.raw_table,
    )
}

/// A supplementary analysis view over the raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub name: &'static str,
    pub sql: String,
}

/// Analysis views for the format. Views that need a vendor or payment column
/// are only produced when `has_column` reports that column present.
pub fn analysis_views(mapping: &FieldMapping, has_column: impl Fn(&str) -> bool) -> Vec<AnalysisView> {
    let c = Core::of(mapping);
    let table = mapping.raw_table;
    let bucket = bucket_expr(c.pickup);
    let mut views = vec![
        AnalysisView {
            name: "hourly_metrics",
            sql: format!(
                "CREATE OR REPLACE VIEW hourly_metrics AS
SELECT
    CAST(SUBSTR({bucket}, 12, 2) AS INTEGER) AS hour_of_day,
    COUNT(*) AS total_trips,
    AVG({total}) AS avg_fare,
    AVG({distance}) AS avg_distance,
    AVG(CAST({passengers} AS DOUBLE)) AS avg_passengers,
    SUM({total}) AS total_revenue
FROM {table}
WHERE {pickup} IS NOT NULL AND {total} > 0
GROUP BY 1
ORDER BY 1",
                total = c.total,
                distance = c.distance,
                passengers = c.passengers,
                pickup = c.pickup,
            ),
        },
        AnalysisView {
            name: "fare_distribution",
            sql: format!(
                "CREATE OR REPLACE VIEW fare_distribution AS
SELECT
    CASE
        WHEN {total} < 5 THEN '$0-5'
        WHEN {total} < 10 THEN '$5-10'
        WHEN {total} < 15 THEN '$10-15'
        WHEN {total} < 20 THEN '$15-20'
        WHEN {total} < 30 THEN '$20-30'
        ELSE '$30+'
    END AS fare_bucket,
    COUNT(*) AS trip_count
FROM {table}
WHERE {total} > 0 AND {total} < 100
GROUP BY 1
ORDER BY MIN({total})",
                total = c.total,
            ),
        },
    ];

    if let Some(payment) = mapping
        .source(UnifiedField::PaymentType)
        .filter(|col| has_column(col))
    {
        views.push(AnalysisView {
            name: "payment_analysis",
            sql: format!(
                "CREATE OR REPLACE VIEW payment_analysis AS
SELECT
    {payment} AS payment_type,
    COUNT(*) AS trip_count,
    AVG({total}) AS avg_fare,
    AVG({tip}) AS avg_tip,
    AVG({tip} / NULLIF({fare}, 0) * 100) AS avg_tip_pct,
    SUM({total}) AS total_revenue
FROM {table}
WHERE {total} > 0
GROUP BY 1
ORDER BY trip_count DESC",
                total = c.total,
                tip = c.tip,
                fare = c.fare,
            ),
        });
    }

    if let Some(vendor) = mapping
        .source(UnifiedField::Vendor)
        .filter(|col| has_column(col))
    {
        views.push(AnalysisView {
            name: "vendor_performance",
            sql: format!(
                "CREATE OR REPLACE VIEW vendor_performance AS
SELECT
    {vendor} AS vendor,
    COUNT(*) AS trip_count,
    AVG({total}) AS avg_fare,
    AVG({distance}) AS avg_distance,
    AVG({tip}) AS avg_tip,
    SUM({total}) AS total_revenue
FROM {table}
GROUP BY 1
ORDER BY trip_count DESC",
                total = c.total,
                distance = c.distance,
                tip = c.tip,
            ),
        });
    }

    views
}

/// Headline figures over the raw table, as (label, scalar query) pairs.
pub fn kpi_queries(mapping: &FieldMapping) -> Vec<(&'static str, String)> {
    let c = Core::of(mapping);
    let table = mapping.raw_table;
    vec![
        ("Total Trips", format!("SELECT COUNT(*) FROM {table}")),
        (
            "Total Revenue",
            format!("SELECT CAST(SUM({}) AS DECIMAL(12,2)) FROM {table}", c.total),
        ),
        (
            "Average Fare",
            format!(
                "SELECT CAST(AVG({t}) AS DECIMAL(8,2)) FROM {table} WHERE {t} > 0",
                t = c.total
            ),
        ),
        (
            "Total Miles",
            format!("SELECT CAST(SUM({}) AS DECIMAL(12,2)) FROM {table}", c.distance),
        ),
        (
            "Avg Distance",
            format!(
                "SELECT CAST(AVG({d}) AS DECIMAL(8,2)) FROM {table} WHERE {d} > 0",
                d = c.distance
            ),
        ),
    ]
}

pub fn view_count_sql() -> String {
    format!("SELECT COUNT(*) FROM {AGGREGATE_VIEW}")
}

/// Busiest groups of the view, trip count descending.
pub fn top_groups_sql(limit: usize) -> String {
    format!(
        "SELECT Pickup_Time, Pickup_Location, number AS trips, \
CAST(Total_Amount AS DOUBLE) AS revenue, taxi_type \
FROM {AGGREGATE_VIEW} ORDER BY trips DESC, Pickup_Time LIMIT {limit}"
    )
}

/// Busiest groups joined with their zone names.
pub fn top_zones_sql(zones_table: &str, limit: usize) -> String {
    format!(
        "SELECT t.Pickup_Time, z.Zone, z.Borough, t.number AS trips, \
CAST(t.Total_Amount AS DOUBLE) AS revenue \
FROM {AGGREGATE_VIEW} t LEFT JOIN {zones_table} z ON t.Pickup_Location = z.LocationID \
ORDER BY t.number DESC, t.Pickup_Time LIMIT {limit}"
    )
}
