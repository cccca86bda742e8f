//! The two raw trip vocabularies and their mapping onto the unified one.

use serde::Serialize;
use std::fmt;

use crate::engine::SqlType;

/// Source format of a raw batch, also the discriminant on aggregate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TripFormat {
    /// Location-keyed records (green taxi, 2013+): integer pickup zone id.
    Green,
    /// Coordinate-keyed records (yellow taxi, 2009): lat/lon pairs, no zone.
    Yellow,
}

impl TripFormat {
    pub fn mapping(self) -> &'static FieldMapping {
        match self {
            TripFormat::Green => &GREEN,
            TripFormat::Yellow => &YELLOW,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            TripFormat::Green => "green",
            TripFormat::Yellow => "yellow",
        }
    }
}

impl fmt::Display for TripFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Fields of the unified vocabulary that a raw column can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnifiedField {
    PickupTime,
    DropoffTime,
    PickupLocation,
    PassengerCount,
    TripDistance,
    FareAmount,
    Extra,
    TipAmount,
    TollsAmount,
    TotalAmount,
    Vendor,
    PaymentType,
}

impl UnifiedField {
    pub const ALL: [UnifiedField; 12] = [
        UnifiedField::PickupTime,
        UnifiedField::DropoffTime,
        UnifiedField::PickupLocation,
        UnifiedField::PassengerCount,
        UnifiedField::TripDistance,
        UnifiedField::FareAmount,
        UnifiedField::Extra,
        UnifiedField::TipAmount,
        UnifiedField::TollsAmount,
        UnifiedField::TotalAmount,
        UnifiedField::Vendor,
        UnifiedField::PaymentType,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: SqlType,
    pub required: bool,
}

const fn req(name: &'static str, ty: SqlType) -> ColumnSpec {
    ColumnSpec {
        name,
        ty,
        required: true,
    }
}

const fn opt(name: &'static str, ty: SqlType) -> ColumnSpec {
    ColumnSpec {
        name,
        ty,
        required: false,
    }
}

/// Column vocabulary of one source format and where each unified field
/// comes from. Column names are lower case.
#[derive(Debug)]
pub struct FieldMapping {
    pub format: TripFormat,
    /// Raw table the batch is loaded into.
    pub raw_table: &'static str,
    pub columns: &'static [ColumnSpec],
    sources: &'static [(UnifiedField, &'static str)],
}

impl FieldMapping {
    /// Raw column that supplies `field`, or `None` when the format has no
    /// such concept (the yellow format has no pickup zone).
    pub fn source(&self, field: UnifiedField) -> Option<&'static str> {
        self.sources
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, column)| *column)
    }

    /// Unified fields this format can never populate.
    pub fn unavailable(&self) -> Vec<UnifiedField> {
        UnifiedField::ALL
            .into_iter()
            .filter(|f| self.source(*f).is_none())
            .collect()
    }

    /// Whether aggregates from this format are grouped by pickup location.
    pub fn has_location(&self) -> bool {
        self.source(UnifiedField::PickupLocation).is_some()
    }

    /// Type of a raw column; columns outside the known vocabulary load as text.
    pub fn column_type(&self, name: &str) -> SqlType {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.ty)
            .unwrap_or(SqlType::Varchar)
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().filter(|c| c.required).map(|c| c.name)
    }
}

static GREEN: FieldMapping = FieldMapping {
    format: TripFormat::Green,
    raw_table: "nyc_greentrip",
    columns: &[
        opt("vendorid", SqlType::Bigint),
        req("lpep_pickup_datetime", SqlType::Timestamp),
        req("lpep_dropoff_datetime", SqlType::Timestamp),
        opt("store_and_fwd_flag", SqlType::Varchar),
        opt("ratecodeid", SqlType::Bigint),
        req("pulocationid", SqlType::Bigint),
        opt("dolocationid", SqlType::Bigint),
        req("passenger_count", SqlType::Bigint),
        req("trip_distance", SqlType::Double),
        req("fare_amount", SqlType::Double),
        req("extra", SqlType::Double),
        opt("mta_tax", SqlType::Double),
        req("tip_amount", SqlType::Double),
        req("tolls_amount", SqlType::Double),
        opt("ehail_fee", SqlType::Double),
        opt("improvement_surcharge", SqlType::Double),
        req("total_amount", SqlType::Double),
        opt("payment_type", SqlType::Bigint),
        opt("trip_type", SqlType::Bigint),
        opt("congestion_surcharge", SqlType::Double),
    ],
    sources: &[
        (UnifiedField::PickupTime, "lpep_pickup_datetime"),
        (UnifiedField::DropoffTime, "lpep_dropoff_datetime"),
        (UnifiedField::PickupLocation, "pulocationid"),
        (UnifiedField::PassengerCount, "passenger_count"),
        (UnifiedField::TripDistance, "trip_distance"),
        (UnifiedField::FareAmount, "fare_amount"),
        (UnifiedField::Extra, "extra"),
        (UnifiedField::TipAmount, "tip_amount"),
        (UnifiedField::TollsAmount, "tolls_amount"),
        (UnifiedField::TotalAmount, "total_amount"),
        (UnifiedField::Vendor, "vendorid"),
        (UnifiedField::PaymentType, "payment_type"),
    ],
};

static YELLOW: FieldMapping = FieldMapping {
    format: TripFormat::Yellow,
    raw_table: "nyc_yellowtrip",
    columns: &[
        req("vendor_name", SqlType::Varchar),
        req("trip_pickup_datetime", SqlType::Timestamp),
        req("trip_dropoff_datetime", SqlType::Timestamp),
        req("passenger_count", SqlType::Bigint),
        req("trip_distance", SqlType::Double),
        req("start_lon", SqlType::Double),
        req("start_lat", SqlType::Double),
        opt("rate_code", SqlType::Bigint),
        opt("store_and_forward", SqlType::Varchar),
        req("end_lon", SqlType::Double),
        req("end_lat", SqlType::Double),
        req("payment_type", SqlType::Varchar),
        req("fare_amt", SqlType::Double),
        req("surcharge", SqlType::Double),
        opt("mta_tax", SqlType::Double),
        req("tip_amt", SqlType::Double),
        req("tolls_amt", SqlType::Double),
        req("total_amt", SqlType::Double),
    ],
    sources: &[
        (UnifiedField::PickupTime, "trip_pickup_datetime"),
        (UnifiedField::DropoffTime, "trip_dropoff_datetime"),
        (UnifiedField::PassengerCount, "passenger_count"),
        (UnifiedField::TripDistance, "trip_distance"),
        (UnifiedField::FareAmount, "fare_amt"),
        (UnifiedField::Extra, "surcharge"),
        (UnifiedField::TipAmount, "tip_amt"),
        (UnifiedField::TollsAmount, "tolls_amt"),
        (UnifiedField::TotalAmount, "total_amt"),
        (UnifiedField::Vendor, "vendor_name"),
        (UnifiedField::PaymentType, "payment_type"),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_and_surcharge_map_to_the_same_field() {
        assert_eq!(
            TripFormat::Green.mapping().source(UnifiedField::Extra),
            Some("extra")
        );
        assert_eq!(
            TripFormat::Yellow.mapping().source(UnifiedField::Extra),
            Some("surcharge")
        );
    }

    #[test]
    fn test_yellow_has_no_location_dimension() {
        let yellow = TripFormat::Yellow.mapping();
        assert!(!yellow.has_location());
        assert_eq!(yellow.unavailable(), vec![UnifiedField::PickupLocation]);
        assert!(TripFormat::Green.mapping().unavailable().is_empty());
    }

    #[test]
    fn test_every_source_column_is_in_the_vocabulary() {
        for format in [TripFormat::Green, TripFormat::Yellow] {
            let mapping = format.mapping();
            for field in UnifiedField::ALL {
                if let Some(column) = mapping.source(field) {
                    assert!(
                        mapping.columns.iter().any(|c| c.name == column),
                        "{format}: {column} missing from vocabulary"
                    );
                }
            }
        }
    }

    #[test]
    fn test_unknown_columns_load_as_varchar() {
        let green = TripFormat::Green.mapping();
        assert_eq!(green.column_type("pulocationid"), SqlType::Bigint);
        assert_eq!(green.column_type("something_new"), SqlType::Varchar);
    }
}
