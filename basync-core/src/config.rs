//! User settings stored in `<home>/.basync/config.yaml`.
//!
//! Every key is optional; a missing file is the same as an empty one.
//!
//! ```yaml
//! endpoint:
//!   host: localhost
//!   port: 2002
//! office_program: /opt/openoffice4/program/soffice
//! module_suffix: .vb
//! connect:
//!   max_attempts: 15
//!   retry_delay_ms: 2000
//! ```
//!
//! # API pattern
//!
//! - `load_at(home: &Path)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 2002;
pub const DEFAULT_OFFICE_PROGRAM: &str = "soffice";
pub const DEFAULT_MODULE_SUFFIX: &str = ".vb";

/// Host and port of the office process's bridge listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// How long the connection manager keeps trying before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Resolve attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    /// Sleep after each launch before resolving again.
    pub retry_delay_ms: u64,
}

impl RetryPolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            retry_delay_ms: 2000,
        }
    }
}

/// Contents of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: Endpoint,
    /// Office executable started when nothing listens on the endpoint.
    pub office_program: PathBuf,
    /// File suffix of local module files, matched case-insensitively.
    pub module_suffix: String,
    pub connect: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            office_program: PathBuf::from(DEFAULT_OFFICE_PROGRAM),
            module_suffix: DEFAULT_MODULE_SUFFIX.to_string(),
            connect: RetryPolicy::default(),
        }
    }
}

/// `<home>/.basync/config.yaml`: pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".basync").join("config.yaml")
}

/// Load settings rooted at `home`. Defaults when the file is absent.
pub fn load_at(home: &Path) -> Result<Settings, ConfigError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    // An empty file deserializes to YAML null, which `#[serde(default)]` rejects.
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    let mut settings: Settings =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
    settings.connect.max_attempts = settings.connect.max_attempts.max(1);
    Ok(settings)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    load_at(&home)
}
