//! # basync-sync
//!
//! Two-way reconciliation between a directory of module files and a library
//! inside a script-library container.
//!
//! Call [`pipeline::run`] for a whole CLI run, or [`reconcile::reconcile`] to
//! sync any two [`ModuleStore`](basync_core::ModuleStore)s.

pub mod diff;
pub mod error;
pub mod local;
pub mod memory;
pub mod pipeline;
pub mod reconcile;
pub mod remote;

pub use error::SyncError;
pub use local::LocalStore;
pub use memory::MemoryContainer;
pub use pipeline::{SyncOutcome, SyncRequest};
pub use reconcile::{Plan, SyncEvent, SyncReport};
pub use remote::RemoteLibrary;
