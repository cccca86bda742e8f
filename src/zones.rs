//! Static taxi-zone reference data, joined to aggregates by location id.

use serde::Deserialize;
use std::path::Path;

use crate::engine::{Column, SqlType, SqlValue, Table};
use crate::error::Result;

pub const ZONES_TABLE: &str = "taxi_zones";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationZone {
    #[serde(rename = "LocationID")]
    pub location_id: i64,
    #[serde(rename = "Borough")]
    pub borough: String,
    #[serde(rename = "Zone")]
    pub zone: String,
    pub service_zone: String,
    pub latitude: f64,
    pub longitude: f64,
}

const BUILTIN: &[(i64, &str, &str, &str, f64, f64)] = &[
    (168, "Queens", "Steinway", "Boro Zone", 40.7740, -73.9030),
    (78, "Manhattan", "East Harlem South", "Boro Zone", 40.7957, -73.9389),
    (95, "Queens", "Woodhaven", "Boro Zone", 40.6892, -73.8569),
    (130, "Queens", "Jamaica", "Boro Zone", 40.6902, -73.8063),
    (260, "Queens", "Far Rockaway", "Boro Zone", 40.5990, -73.7565),
    (82, "Manhattan", "East Village", "Yellow Zone", 40.7264, -73.9818),
    (106, "Manhattan", "Gramercy", "Yellow Zone", 40.7368, -73.9830),
    (134, "Queens", "Jamaica Estates", "Boro Zone", 40.7197, -73.7874),
    (255, "Queens", "Forest Park", "Boro Zone", 40.7016, -73.8563),
    (66, "Manhattan", "East Chelsea", "Yellow Zone", 40.7465, -73.9972),
    (254, "Queens", "Forest Hills", "Boro Zone", 40.7183, -73.8448),
    (60, "Manhattan", "Midtown East", "Yellow Zone", 40.7549, -73.9709),
    (159, "Queens", "Ridgewood", "Boro Zone", 40.7021, -73.9053),
    (42, "Manhattan", "Central Park", "Yellow Zone", 40.7829, -73.9654),
    (91, "Queens", "Elmhurst", "Boro Zone", 40.7361, -73.8820),
    (216, "Manhattan", "West Village", "Yellow Zone", 40.7357, -74.0023),
    (118, "Manhattan", "Harlem", "Boro Zone", 40.8116, -73.9465),
    (198, "Queens", "Sunnyside", "Boro Zone", 40.7433, -73.9196),
];

/// The zones that appear in the bundled sample trips.
pub fn builtin_zones() -> Vec<LocationZone> {
    BUILTIN
        .iter()
        .map(
            |&(location_id, borough, zone, service_zone, latitude, longitude)| LocationZone {
                location_id,
                borough: borough.to_string(),
                zone: zone.to_string(),
                service_zone: service_zone.to_string(),
                latitude,
                longitude,
            },
        )
        .collect()
}

/// Reads zones from a CSV with columns
/// `LocationID,Borough,Zone,service_zone,latitude,longitude`.
pub fn load_zones(path: impl AsRef<Path>) -> Result<Vec<LocationZone>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut zones = Vec::new();
    for result in rdr.deserialize() {
        let zone: LocationZone = result?;
        zones.push(zone);
    }
    Ok(zones)
}

pub fn zones_table(zones: &[LocationZone]) -> Table {
    Table {
        name: ZONES_TABLE.to_string(),
        columns: vec![
            Column::new("LocationID", SqlType::Bigint),
            Column::new("Borough", SqlType::Varchar),
            Column::new("Zone", SqlType::Varchar),
            Column::new("service_zone", SqlType::Varchar),
            Column::new("latitude", SqlType::Double),
            Column::new("longitude", SqlType::Double),
        ],
        rows: zones
            .iter()
            .map(|z| {
                vec![
                    SqlValue::Int(z.location_id),
                    SqlValue::Text(z.borough.clone()),
                    SqlValue::Text(z.zone.clone()),
                    SqlValue::Text(z.service_zone.clone()),
                    SqlValue::Float(z.latitude),
                    SqlValue::Float(z.longitude),
                ]
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_zones_are_unique() {
        let zones = builtin_zones();
        assert_eq!(zones.len(), 18);
        let mut ids: Vec<_> = zones.iter().map(|z| z.location_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 18);
    }

    #[test]
    fn test_zones_table_shape() {
        let table = zones_table(&builtin_zones());
        assert_eq!(table.name, "taxi_zones");
        assert_eq!(table.columns.len(), 6);
        assert_eq!(table.rows[0][0], SqlValue::Int(168));
        assert_eq!(table.rows[0][2], SqlValue::Text("Steinway".into()));
    }

    #[test]
    fn test_load_zones_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "LocationID,Borough,Zone,service_zone,latitude,longitude").unwrap();
        writeln!(file, "1,EWR,Newark Airport,EWR,40.6895,-74.1745").unwrap();
        file.flush().unwrap();

        let zones = load_zones(file.path()).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].zone, "Newark Airport");
        assert_eq!(zones[0].service_zone, "EWR");
    }
}
