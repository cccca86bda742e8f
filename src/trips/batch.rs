//! CSV reader for raw trip files.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::format::TripFormat;
use super::reconcile::{Reconciler, TripRecord, check_schema};
use crate::engine::{Column, SqlValue, Table};
use crate::error::Result;

/// A raw record set of one format, as read from disk: lower-cased headers
/// plus untyped rows.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub format: TripFormat,
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl RawBatch {
    /// Reads a batch and checks its header row before any data row is
    /// touched. A missing required column fails the whole batch.
    pub fn from_reader<R: Read>(format: TripFormat, reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();
        check_schema(format.mapping(), &headers)?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            rows.push(result?);
        }
        debug!(%format, columns = headers.len(), rows = rows.len(), "Raw batch read");

        Ok(Self {
            format,
            headers,
            rows,
        })
    }

    pub fn from_path(format: TripFormat, path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(format, file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Projects every row onto the unified vocabulary.
    pub fn records(&self) -> Result<Vec<TripRecord>> {
        let reconciler = Reconciler::new(self.format, &self.headers)?;
        Ok(self.rows.iter().map(|r| reconciler.reconcile(r)).collect())
    }

    /// The batch as a typed relation for the format's raw table. Every source
    /// column is kept; columns outside the known vocabulary load as text.
    pub fn to_table(&self) -> Table {
        let mapping = self.format.mapping();
        let columns: Vec<Column> = self
            .headers
            .iter()
            .map(|h| Column::new(h.clone(), mapping.column_type(h)))
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| SqlValue::parse(col.ty, row.get(i).unwrap_or("")))
                    .collect()
            })
            .collect();

        Table {
            name: mapping.raw_table.to_string(),
            columns,
            rows,
        }
    }
}
