//! Domain types shared by the local and remote module stores.
//!
//! Module content is kept exactly as read; comparisons go through
//! [`normalize_line_endings`] so CRLF and LF copies of the same text are equal.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of a single script module, unique within its collection.
///
/// Ordering is plain lexicographic on the underlying string, which is the
/// order every sync run processes names in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleName(pub String);

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of a script library inside the remote library container.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LibraryName(pub String);

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for LibraryName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LibraryName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Module name → module content. Iteration order is name order.
pub type ModuleSet = BTreeMap<ModuleName, String>;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which side of a sync run is the source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local directory → remote library.
    #[default]
    Upload,
    /// Remote library → local directory.
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Upload => "upload",
            Direction::Download => "download",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Content helpers
// ---------------------------------------------------------------------------

/// Replace every `\r\n` with `\n`. Borrows when there is nothing to replace.
pub fn normalize_line_endings(content: &str) -> Cow<'_, str> {
    if content.contains("\r\n") {
        Cow::Owned(content.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(content)
    }
}

/// `true` when both texts are equal after line-ending normalization.
pub fn contents_match(a: &str, b: &str) -> bool {
    normalize_line_endings(a) == normalize_line_endings(b)
}

/// Script URI for a Basic macro stored in an application-level library.
///
/// `macro_path` is `Module.Macro`.
pub fn script_uri(library: &LibraryName, macro_path: &str) -> String {
    format!("vnd.sun.star.script:{library}.{macro_path}?language=Basic&location=application")
}
