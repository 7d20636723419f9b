//! Error types for basync-sync.

use thiserror::Error;

use basync_core::StoreError;

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Failure inside the local or the remote store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The source collection does not exist; the target is left untouched.
    #[error("{collection} does not exist")]
    SourceMissing { collection: String },

    /// The source collection holds no modules; the target is left untouched.
    #[error("found no source modules in {collection}")]
    EmptySource { collection: String },

    /// The post-upload macro could not be resolved or failed.
    #[error("macro {name} failed: {source}")]
    Macro {
        name: String,
        #[source]
        source: StoreError,
    },
}
