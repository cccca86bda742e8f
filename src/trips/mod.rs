//! Raw trip batches and the reconciliation of their two source formats.

pub mod batch;
pub mod format;
pub mod reconcile;

pub use batch::RawBatch;
pub use format::{ColumnSpec, FieldMapping, TripFormat, UnifiedField};
pub use reconcile::{Reconciler, TripRecord, check_schema};
