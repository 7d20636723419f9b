//! Error types for basync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`ModuleStore`](crate::store::ModuleStore) or a
/// [`LibraryContainer`](crate::store::LibraryContainer).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure, with the path that caused it.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A module file exists but its bytes are not UTF-8.
    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },

    /// A module name that cannot be turned into a file inside the directory.
    #[error("module name {name:?} is not a valid file name")]
    InvalidName { name: String },

    /// Two files in one directory map to the same module name.
    #[error("{} and {} both hold module {name}", first.display(), second.display())]
    DuplicateModule {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The remote side rejected an operation.
    #[error("remote {op} failed: {message}")]
    Remote { op: &'static str, message: String },

    /// Transport or protocol failure underneath a remote store.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    /// Shorthand for [`StoreError::Remote`].
    pub fn remote(op: &'static str, message: impl Into<String>) -> Self {
        Self::Remote {
            op,
            message: message.into(),
        }
    }
}

/// Errors from loading `~/.basync/config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the file path and serde_yaml's line context.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`StoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
