//! Error types shared by the loader, the query engine client and the
//! provisioning orchestrator.

use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The query engine or the dashboard service could not be reached, or a
    /// call exceeded its timeout.
    #[error("cannot reach {service}: {message}")]
    Connectivity { service: String, message: String },

    /// Credentials were rejected, or the session is no longer authenticated.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A raw batch is missing required columns. Fatal for the whole batch.
    #[error("{format} batch is missing required columns: {}", missing.join(", "))]
    Schema { format: String, missing: Vec<String> },

    /// A resource was requested before the resource it depends on exists.
    #[error("cannot create {resource}: no {requires} identifier available")]
    DependencyUnmet {
        resource: &'static str,
        requires: &'static str,
    },

    /// The remote service answered with a non-success status.
    #[error("{service} rejected {target} (status {status}): {body}")]
    RemoteRejection {
        service: String,
        target: String,
        status: u16,
        body: String,
    },

    /// The remote service answered successfully but with a body we cannot use.
    #[error("unexpected response from {service}: {message}")]
    InvalidResponse { service: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Only connectivity failures are worth retrying; credentials and schemas
    /// do not fix themselves.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Connectivity { .. })
    }

    pub(crate) fn connectivity(service: &str, err: impl std::fmt::Display) -> Self {
        Error::Connectivity {
            service: service.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_response(service: &str, err: impl std::fmt::Display) -> Self {
        Error::InvalidResponse {
            service: service.to_string(),
            message: err.to_string(),
        }
    }
}
