pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod loader;
pub mod output;
pub mod provision;
pub mod services;
pub mod trips;
pub mod zones;

pub use error::{Error, Result};
