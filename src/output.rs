//! Output of unified aggregate records to CSV.
//!
//! Supports plain and gzip-compressed files.

use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::aggregate::UnifiedAggregateRecord;
use crate::error::{Error, Result};

/// Writes records with a header row, in the order given. With `gzip` the
/// file is a gzip stream of the same CSV.
pub fn write_aggregates(
    path: impl AsRef<Path>,
    records: &[UnifiedAggregateRecord],
    gzip: bool,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    debug!(path = %path.display(), records = records.len(), gzip, "Writing aggregate CSV");

    let file = File::create(path)?;
    if gzip {
        let encoder = GzEncoder::new(file, Compression::default());
        let encoder = write_csv(encoder, records)?;
        encoder.finish()?;
    } else {
        write_csv(file, records)?;
    }

    info!(path = %path.display(), records = records.len(), "Aggregates written");
    Ok(())
}

fn write_csv<W: Write>(inner: W, records: &[UnifiedAggregateRecord]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(inner);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

/// The `n` busiest groups, trip count descending, earliest hour first on ties.
pub fn top_by_trips(records: &[UnifiedAggregateRecord], n: usize) -> Vec<&UnifiedAggregateRecord> {
    let mut sorted: Vec<_> = records.iter().collect();
    sorted.sort_by(|a, b| {
        b.number
            .cmp(&a.number)
            .then_with(|| a.pickup_time.cmp(&b.pickup_time))
    });
    sorted.truncate(n);
    sorted
}
