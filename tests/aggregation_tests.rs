mod common;

use taxi_dashboard::aggregate::aggregate_trips;
use taxi_dashboard::error::Error;
use taxi_dashboard::output::{top_by_trips, write_aggregates};
use taxi_dashboard::trips::{RawBatch, TripFormat};

#[test]
fn test_green_batch_end_to_end() {
    let batch = RawBatch::from_path(TripFormat::Green, common::fixture("green_sample.csv"))
        .expect("Failed to read green sample");
    let aggregation = aggregate_trips(&batch.records().unwrap());

    assert_eq!(aggregation.admitted, 2);
    assert_eq!(aggregation.excluded, 1);
    assert_eq!(aggregation.records.len(), 1);

    let group = &aggregation.records[0];
    assert_eq!(group.pickup_time, "2020-01-01 08");
    assert_eq!(group.pickup_location, Some(168));
    assert_eq!(group.number, 2);
    assert!((group.total_amount - 25.0).abs() < 1e-9);
    assert!((group.avg_total_amount - 12.5).abs() < 1e-9);
    assert!((group.total_trip_distance - 6.0).abs() < 1e-9);
    assert_eq!(group.total_passenger_count, Some(3));
    assert_eq!(group.avg_passenger_count, Some(1.5));
    assert_eq!(group.extra, Some(1.0));
    assert_eq!(group.taxi_type, TripFormat::Green);
}

#[test]
fn test_yellow_batch_has_no_location_dimension() {
    let batch = RawBatch::from_path(TripFormat::Yellow, common::fixture("yellow_sample.csv"))
        .expect("Failed to read yellow sample");
    let aggregation = aggregate_trips(&batch.records().unwrap());

    assert_eq!(aggregation.admitted, 3);
    assert_eq!(aggregation.excluded, 1);
    let hours: Vec<_> = aggregation
        .records
        .iter()
        .map(|r| r.pickup_time.as_str())
        .collect();
    assert_eq!(hours, vec!["2009-01-04 02", "2009-01-04 03", "2009-01-04 04"]);
    assert!(aggregation.records.iter().all(|r| r.pickup_location.is_none()));
    assert!(aggregation
        .records
        .iter()
        .all(|r| r.taxi_type == TripFormat::Yellow));

    // surcharge is reported under the unified Extra column
    assert!(aggregation.records.iter().all(|r| r.extra == Some(0.5)));
}

#[test]
fn test_batch_in_the_wrong_format_is_rejected_whole() {
    let err = RawBatch::from_path(TripFormat::Green, common::fixture("yellow_sample.csv"))
        .unwrap_err();
    match err {
        Error::Schema { format, missing } => {
            assert_eq!(format, "green");
            assert!(missing.contains(&"pulocationid".to_string()));
            assert!(missing.contains(&"lpep_pickup_datetime".to_string()));
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn test_aggregate_export_and_top_groups() {
    let batch =
        RawBatch::from_path(TripFormat::Yellow, common::fixture("yellow_sample.csv")).unwrap();
    let aggregation = aggregate_trips(&batch.records().unwrap());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yellow.csv");
    write_aggregates(&path, &aggregation.records, false).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 4);
    assert!(content.lines().nth(1).unwrap().starts_with("2009-01-04 02,,9.4"));

    let top = top_by_trips(&aggregation.records, 5);
    assert_eq!(top.len(), 3);
    assert_eq!(top[0].pickup_time, "2009-01-04 02");
}
