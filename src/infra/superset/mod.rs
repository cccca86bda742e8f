//! Superset REST client.
//!
//! [`Session`] owns the bearer credential and the request policy;
//! [`SupersetClient`] implements [`crate::services::dashboard_api::DashboardApi`]
//! on top of it.

mod client;
mod session;

pub use client::SupersetClient;
pub use session::{AuthState, Credentials, Session};
