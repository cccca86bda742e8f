//! HTTP transport shared by the Trino and Superset clients.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;
