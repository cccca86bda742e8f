use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::accumulator::{Accumulator, IntAccumulator};
use super::types::{Aggregation, UnifiedAggregateRecord};
use crate::trips::{TripFormat, TripRecord};

/// Truncates a pickup timestamp to its hour, formatted `YYYY-MM-DD HH` so
/// that lexical order is chronological order.
pub fn hour_bucket(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H").to_string()
}

/// Validity filter applied before aggregation: a pickup time, a strictly
/// positive total and distance, and a pickup zone for formats that have one.
pub fn is_admissible(trip: &TripRecord) -> bool {
    let needs_location = trip.format.mapping().has_location();

    trip.pickup.is_some()
        && trip.total_amount.is_some_and(|v| v > 0.0)
        && trip.trip_distance.is_some_and(|v| v > 0.0)
        && (!needs_location || trip.pickup_location.is_some())
}

#[derive(Default)]
struct Group {
    count: u64,
    total: Accumulator,
    distance: Accumulator,
    passengers: IntAccumulator,
    fare: Accumulator,
    extra: Accumulator,
    tip: Accumulator,
    tolls: Accumulator,
}

/// Groups admitted trips by pickup hour, plus pickup zone for location-keyed
/// formats, and computes the per-group metrics.
///
/// Averages are over the admitted rows only. Output is ordered by
/// (pickup hour, pickup zone); an empty input yields an empty aggregation.
pub fn aggregate_trips(trips: &[TripRecord]) -> Aggregation {
    let mut groups: BTreeMap<(String, Option<i64>, &'static str), (TripFormat, Group)> =
        BTreeMap::new();
    let mut excluded = 0usize;

    for trip in trips {
        if !is_admissible(trip) {
            excluded += 1;
            continue;
        }
        let Some(pickup) = trip.pickup else {
            continue;
        };

        let key = (hour_bucket(&pickup), trip.pickup_location, trip.format.tag());
        let (_, group) = groups
            .entry(key)
            .or_insert_with(|| (trip.format, Group::default()));

        group.count += 1;
        group.total.push(trip.total_amount);
        group.distance.push(trip.trip_distance);
        group.passengers.push(trip.passenger_count);
        group.fare.push(trip.fare_amount);
        group.extra.push(trip.extra);
        group.tip.push(trip.tip_amount);
        group.tolls.push(trip.tolls_amount);
    }

    let admitted = trips.len() - excluded;
    let records = groups
        .into_iter()
        .map(|((pickup_time, pickup_location, _), (format, g))| UnifiedAggregateRecord {
            pickup_time,
            pickup_location,
            total_amount: g.total.total().unwrap_or_default(),
            avg_total_amount: g.total.mean().unwrap_or_default(),
            total_trip_distance: g.distance.total().unwrap_or_default(),
            avg_trip_distance: g.distance.mean().unwrap_or_default(),
            total_passenger_count: g.passengers.total(),
            avg_passenger_count: g.passengers.mean(),
            fare_amount: g.fare.total(),
            extra: g.extra.total(),
            tip_amount: g.tip.total(),
            tolls_amount: g.tolls.total(),
            number: g.count,
            taxi_type: format,
        })
        .collect();

    Aggregation {
        records,
        admitted,
        excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn green(pickup: Option<NaiveDateTime>, location: Option<i64>, total: f64, dist: f64) -> TripRecord {
        TripRecord {
            format: TripFormat::Green,
            pickup,
            dropoff: None,
            pickup_location: location,
            passenger_count: Some(1),
            trip_distance: Some(dist),
            fare_amount: Some(total - 1.0),
            extra: Some(0.5),
            tip_amount: Some(0.5),
            tolls_amount: None,
            total_amount: Some(total),
        }
    }

    fn yellow(pickup: NaiveDateTime, total: f64) -> TripRecord {
        TripRecord {
            format: TripFormat::Yellow,
            pickup_location: None,
            ..green(Some(pickup), None, total, 1.0)
        }
    }

    #[test]
    fn test_hour_bucket_format() {
        assert_eq!(hour_bucket(&at(8, 59)), "2020-01-01 08");
    }

    #[test]
    fn test_validity_filter() {
        assert!(is_admissible(&green(Some(at(8, 0)), Some(168), 10.0, 1.0)));
        assert!(!is_admissible(&green(None, Some(168), 10.0, 1.0)));
        assert!(!is_admissible(&green(Some(at(8, 0)), Some(168), 0.0, 1.0)));
        assert!(!is_admissible(&green(Some(at(8, 0)), Some(168), -3.0, 1.0)));
        assert!(!is_admissible(&green(Some(at(8, 0)), Some(168), 10.0, 0.0)));
        assert!(!is_admissible(&green(Some(at(8, 0)), None, 10.0, 1.0)));
        // yellow has no zone to require
        assert!(is_admissible(&yellow(at(8, 0), 10.0)));
    }

    #[test]
    fn test_green_groups_by_hour_and_location() {
        let trips = vec![
            green(Some(at(8, 5)), Some(168), 10.0, 2.0),
            green(Some(at(8, 40)), Some(168), 15.0, 3.0),
            green(Some(at(8, 50)), Some(78), 7.0, 1.0),
            green(Some(at(9, 1)), Some(168), 5.0, 1.0),
            green(Some(at(8, 30)), Some(168), 0.0, 1.0),
        ];

        let agg = aggregate_trips(&trips);
        assert_eq!(agg.admitted, 4);
        assert_eq!(agg.excluded, 1);
        assert_eq!(agg.records.len(), 3);

        let first = &agg.records[0];
        assert_eq!(first.pickup_time, "2020-01-01 08");
        assert_eq!(first.pickup_location, Some(78));

        let busy = &agg.records[1];
        assert_eq!(busy.pickup_location, Some(168));
        assert_eq!(busy.number, 2);
        assert_eq!(busy.total_amount, 25.0);
        assert_eq!(busy.avg_total_amount, 12.5);
        assert_eq!(busy.total_trip_distance, 5.0);
        assert_eq!(busy.avg_trip_distance, 2.5);
        assert_eq!(busy.total_passenger_count, Some(2));
        assert_eq!(busy.avg_passenger_count, Some(1.0));
        assert_eq!(busy.fare_amount, Some(23.0));
        assert_eq!(busy.extra, Some(1.0));
        assert_eq!(busy.tolls_amount, None);
        assert_eq!(busy.taxi_type, TripFormat::Green);
    }

    #[test]
    fn test_yellow_groups_by_hour_only() {
        let trips = vec![yellow(at(8, 5), 10.0), yellow(at(8, 45), 20.0)];

        let agg = aggregate_trips(&trips);
        assert_eq!(agg.records.len(), 1);
        assert_eq!(agg.records[0].pickup_location, None);
        assert_eq!(agg.records[0].number, 2);
        assert_eq!(agg.records[0].taxi_type, TripFormat::Yellow);
    }

    #[test]
    fn test_empty_after_filter_is_not_an_error() {
        let trips = vec![green(Some(at(8, 5)), Some(168), 0.0, 2.0)];
        let agg = aggregate_trips(&trips);
        assert!(agg.records.is_empty());
        assert_eq!(agg.excluded, 1);
    }

    #[test]
    fn test_passenger_average_ignores_missing_counts() {
        let mut a = green(Some(at(8, 5)), Some(168), 10.0, 2.0);
        a.passenger_count = Some(3);
        let mut b = green(Some(at(8, 6)), Some(168), 10.0, 2.0);
        b.passenger_count = None;

        let agg = aggregate_trips(&[a, b]);
        assert_eq!(agg.records[0].number, 2);
        assert_eq!(agg.records[0].total_passenger_count, Some(3));
        assert_eq!(agg.records[0].avg_passenger_count, Some(3.0));
    }
}
