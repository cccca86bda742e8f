//! Aggregation of raw trips into the unified hourly relation.
//!
//! The pipeline runs in-process over reconciled [`crate::trips::TripRecord`]s;
//! [`view`] expresses the same filter, grouping and metrics as SQL for the
//! query engine.

mod accumulator;
pub mod pipeline;
pub mod types;
pub mod view;

pub use pipeline::{aggregate_trips, hour_bucket, is_admissible};
pub use types::{Aggregation, UnifiedAggregateRecord};
