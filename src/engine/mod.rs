//! Query engine seam.
//!
//! [`QueryEngine`] is the SQL-speaking collaborator the loader talks to.
//! [`TrinoClient`] implements it over Trino's HTTP statement protocol.

mod table;
mod trino;

pub use table::{
    Column, RowSet, SqlType, SqlValue, Table, parse_float, parse_int, parse_timestamp,
    quote_ident, quote_literal,
};
pub use trino::{TrinoClient, replace_statements};

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Loads `table` under its name, discarding whatever was there before.
    /// Returns the number of rows written.
    async fn replace_table(&self, table: &Table) -> Result<usize>;

    /// Runs a statement whose result is not needed (DDL, view definitions).
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Runs a read query and returns its rows.
    async fn query(&self, sql: &str) -> Result<RowSet>;
}
