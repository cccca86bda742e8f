//! Maps a raw row of either format onto the unified trip vocabulary.

use chrono::NaiveDateTime;
use csv::StringRecord;
use serde::Serialize;
use std::collections::HashMap;

use super::format::{FieldMapping, TripFormat, UnifiedField};
use crate::engine::{parse_float, parse_int, parse_timestamp};
use crate::error::{Error, Result};

/// One raw trip expressed in the unified vocabulary.
///
/// Fields the source format cannot supply are `None`, never a placeholder;
/// `pickup_location` is always `None` for [`TripFormat::Yellow`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    pub format: TripFormat,
    pub pickup: Option<NaiveDateTime>,
    pub dropoff: Option<NaiveDateTime>,
    pub pickup_location: Option<i64>,
    pub passenger_count: Option<i64>,
    pub trip_distance: Option<f64>,
    pub fare_amount: Option<f64>,
    pub extra: Option<f64>,
    pub tip_amount: Option<f64>,
    pub tolls_amount: Option<f64>,
    pub total_amount: Option<f64>,
}

/// Fails with [`Error::Schema`] naming every required column absent from
/// `headers`. Headers are expected in lower case.
pub fn check_schema(mapping: &FieldMapping, headers: &[String]) -> Result<()> {
    let missing: Vec<String> = mapping
        .required_columns()
        .filter(|required| !headers.iter().any(|h| h == required))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Schema {
            format: mapping.format.to_string(),
            missing,
        })
    }
}

/// Column positions of one batch, resolved once against its header row.
pub struct Reconciler {
    format: TripFormat,
    positions: HashMap<UnifiedField, usize>,
}

impl Reconciler {
    pub fn new(format: TripFormat, headers: &[String]) -> Result<Self> {
        let mapping = format.mapping();
        check_schema(mapping, headers)?;

        let positions = UnifiedField::ALL
            .into_iter()
            .filter_map(|field| {
                let column = mapping.source(field)?;
                let index = headers.iter().position(|h| h == column)?;
                Some((field, index))
            })
            .collect();

        Ok(Self { format, positions })
    }

    pub fn format(&self) -> TripFormat {
        self.format
    }

    fn cell<'r>(&self, row: &'r StringRecord, field: UnifiedField) -> Option<&'r str> {
        self.positions.get(&field).and_then(|&i| row.get(i))
    }

    fn timestamp(&self, row: &StringRecord, field: UnifiedField) -> Option<NaiveDateTime> {
        self.cell(row, field).and_then(parse_timestamp)
    }

    fn int(&self, row: &StringRecord, field: UnifiedField) -> Option<i64> {
        self.cell(row, field).and_then(parse_int)
    }

    fn float(&self, row: &StringRecord, field: UnifiedField) -> Option<f64> {
        self.cell(row, field).and_then(parse_float)
    }

    pub fn reconcile(&self, row: &StringRecord) -> TripRecord {
        TripRecord {
            format: self.format,
            pickup: self.timestamp(row, UnifiedField::PickupTime),
            dropoff: self.timestamp(row, UnifiedField::DropoffTime),
            pickup_location: self.int(row, UnifiedField::PickupLocation),
            passenger_count: self.int(row, UnifiedField::PassengerCount),
            trip_distance: self.float(row, UnifiedField::TripDistance),
            fare_amount: self.float(row, UnifiedField::FareAmount),
            extra: self.float(row, UnifiedField::Extra),
            tip_amount: self.float(row, UnifiedField::TipAmount),
            tolls_amount: self.float(row, UnifiedField::TollsAmount),
            total_amount: self.float(row, UnifiedField::TotalAmount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const YELLOW_HEADERS: &[&str] = &[
        "vendor_name",
        "trip_pickup_datetime",
        "trip_dropoff_datetime",
        "passenger_count",
        "trip_distance",
        "start_lon",
        "start_lat",
        "end_lon",
        "end_lat",
        "payment_type",
        "fare_amt",
        "surcharge",
        "tip_amt",
        "tolls_amt",
        "total_amt",
    ];

    #[test]
    fn test_missing_columns_fail_the_whole_batch() {
        let err = Reconciler::new(
            TripFormat::Green,
            &headers(&["lpep_pickup_datetime", "total_amount"]),
        )
        .err()
        .unwrap();

        match err {
            Error::Schema { format, missing } => {
                assert_eq!(format, "green");
                assert!(missing.contains(&"pulocationid".to_string()));
                assert!(missing.contains(&"trip_distance".to_string()));
                assert!(!missing.contains(&"total_amount".to_string()));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_yellow_row_uses_its_own_vocabulary() {
        let reconciler = Reconciler::new(TripFormat::Yellow, &headers(YELLOW_HEADERS)).unwrap();
        let row = StringRecord::from(vec![
            "VTS",
            "2009-01-04 02:52:00",
            "2009-01-04 03:02:00",
            "1",
            "2.63",
            "-73.991957",
            "40.721567",
            "-73.993803",
            "40.695922",
            "CASH",
            "8.9",
            "0.5",
            "0",
            "0",
            "9.4",
        ]);

        let trip = reconciler.reconcile(&row);
        assert_eq!(trip.format, TripFormat::Yellow);
        assert_eq!(trip.pickup_location, None);
        assert_eq!(trip.extra, Some(0.5));
        assert_eq!(trip.total_amount, Some(9.4));
        assert_eq!(trip.fare_amount, Some(8.9));
        assert_eq!(trip.passenger_count, Some(1));
    }

    #[test]
    fn test_bad_cells_become_none() {
        let reconciler = Reconciler::new(TripFormat::Yellow, &headers(YELLOW_HEADERS)).unwrap();
        let row = StringRecord::from(vec![
            "VTS", "", "", "x", "abc", "", "", "", "", "", "", "", "", "", "",
        ]);

        let trip = reconciler.reconcile(&row);
        assert_eq!(trip.pickup, None);
        assert_eq!(trip.passenger_count, None);
        assert_eq!(trip.trip_distance, None);
        assert_eq!(trip.total_amount, None);
    }
}
