//! basync core library: domain types, capability traits, settings, errors.
//!
//! - [`types`]: newtypes, [`ModuleSet`], line-ending normalization
//! - [`store`]: [`ModuleStore`] and [`LibraryContainer`]
//! - [`config`]: `~/.basync/config.yaml`
//! - [`error`]: [`StoreError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{Endpoint, RetryPolicy, Settings};
pub use error::{ConfigError, StoreError};
pub use store::{LibraryContainer, ModuleStore};
pub use types::{
    contents_match, normalize_line_endings, script_uri, Direction, LibraryName, ModuleName,
    ModuleSet,
};
