use std::path::PathBuf;

use thiserror::Error;

use basync_core::StoreError;

/// Error surface for the bridge protocol, the launcher and the connector.
#[derive(Debug, Error)]
pub enum OfficeError {
    #[error("I/O error on {endpoint}: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Nothing accepts connections on the endpoint yet.
    #[error("no office process is listening on {endpoint}")]
    NoListener { endpoint: String },

    #[error("{}: office executable not found", program.display())]
    ExecutableNotFound { program: PathBuf },

    #[error("{}: failed to start the office process: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("office process on {endpoint} still unreachable after {attempts} attempts")]
    Unreachable { endpoint: String, attempts: u32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bridge protocol error: {0}")]
    Protocol(String),

    /// The office side answered, but refused the operation.
    #[error("remote {op} failed: {message}")]
    Remote { op: &'static str, message: String },
}

impl From<OfficeError> for StoreError {
    fn from(err: OfficeError) -> Self {
        match err {
            OfficeError::Remote { op, message } => StoreError::Remote { op, message },
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

pub(crate) fn io_err(endpoint: impl Into<String>, source: std::io::Error) -> OfficeError {
    OfficeError::Io {
        endpoint: endpoint.into(),
        source,
    }
}
