//! Local module store: one directory, one file per module.
//!
//! Module name = file name minus the module suffix, matched
//! case-insensitively, so `Foo.vb` and `Foo.VB` both map to `Foo`. A file keeps
//! its original spelling when it is updated or removed; new files get the
//! configured suffix.
//!
//! A module name is only written if its file name stays inside the directory
//! and maps back to the same name on the next scan. Two files with the same
//! stem (`Foo.vb` next to `Foo.VB`) make the scan fail.
//!
//! ## Writes
//!
//! 1. Write to `<path>.basync.tmp` (never matches the module suffix).
//! 2. Rename to the final path (atomic on POSIX).
//! 3. On rename failure, remove the `.tmp` and report the error.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use basync_core::error::io_err;
use basync_core::{normalize_line_endings, ModuleName, ModuleStore, StoreError};

/// A directory of module files.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
    suffix: String,
    /// Module name → on-disk path, refreshed by every [`ModuleStore::names`].
    index: BTreeMap<ModuleName, PathBuf>,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
            index: BTreeMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `Foo.vb` → `Foo`. `None` for other suffixes and for a bare suffix.
    pub fn module_name(&self, file_name: &str) -> Option<ModuleName> {
        let stem_len = file_name.len().checked_sub(self.suffix.len())?;
        if stem_len == 0 || !file_name.is_char_boundary(stem_len) {
            return None;
        }
        let (stem, suffix) = file_name.split_at(stem_len);
        suffix
            .eq_ignore_ascii_case(&self.suffix)
            .then(|| ModuleName::from(stem))
    }

    /// `Foo` → `Foo.vb`.
    pub fn file_name(&self, name: &ModuleName) -> String {
        format!("{}{}", name.0, self.suffix)
    }

    /// [`file_name`](Self::file_name), refusing names that would leave the
    /// directory or not scan back as `name`.
    pub fn checked_file_name(&self, name: &ModuleName) -> Result<String, StoreError> {
        let stem = name.0.as_str();
        let unsafe_stem = matches!(stem, "" | "." | "..")
            || stem.contains(|c: char| matches!(c, '/' | '\\' | '\0'));
        let file_name = self.file_name(name);
        if unsafe_stem || self.module_name(&file_name).as_ref() != Some(name) {
            return Err(StoreError::InvalidName {
                name: name.0.clone(),
            });
        }
        Ok(file_name)
    }

    fn path_for(&self, name: &ModuleName) -> Result<PathBuf, StoreError> {
        match self.index.get(name) {
            Some(path) => Ok(path.clone()),
            None => Ok(self.dir.join(self.checked_file_name(name)?)),
        }
    }

    fn scan(&self) -> Result<BTreeMap<ModuleName, PathBuf>, StoreError> {
        let mut entries: Vec<_> = std::fs::read_dir(&self.dir)
            .map_err(|e| io_err(&self.dir, e))?
            .collect::<Result<_, _>>()
            .map_err(|e| io_err(&self.dir, e))?;
        entries.sort_by_key(|e| e.file_name());

        let mut found: BTreeMap<ModuleName, PathBuf> = BTreeMap::new();
        for entry in entries {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::debug!("skipping non-UTF-8 file name: {}", path.display());
                continue;
            };
            let Some(name) = self.module_name(&file_name) else {
                continue;
            };
            if let Some(first) = found.get(&name) {
                return Err(StoreError::DuplicateModule {
                    name: name.0,
                    first: first.clone(),
                    second: path,
                });
            }
            found.insert(name, path);
        }
        Ok(found)
    }
}

impl ModuleStore for LocalStore {
    fn describe(&self) -> String {
        format!("Directory {}", self.dir.display())
    }

    fn label(&self, name: &ModuleName) -> String {
        self.index
            .get(name)
            .and_then(|path| path.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_name(name))
    }

    fn exists(&mut self) -> Result<bool, StoreError> {
        Ok(self.dir.is_dir())
    }

    fn create(&mut self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))
    }

    fn names(&mut self) -> Result<BTreeSet<ModuleName>, StoreError> {
        self.index = self.scan()?;
        Ok(self.index.keys().cloned().collect())
    }

    /// Reads the file as UTF-8 and normalizes line endings to `\n`.
    fn read(&mut self, name: &ModuleName) -> Result<String, StoreError> {
        let path = self.path_for(name)?;
        let bytes = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
        let text = String::from_utf8(bytes).map_err(|_| StoreError::NotUtf8 { path })?;
        Ok(normalize_line_endings(&text).into_owned())
    }

    fn insert(&mut self, name: &ModuleName, content: &str) -> Result<(), StoreError> {
        let path = self.dir.join(self.checked_file_name(name)?);
        atomic_write(&path, content)?;
        self.index.insert(name.clone(), path);
        Ok(())
    }

    fn replace(&mut self, name: &ModuleName, content: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        atomic_write(&path, content)
    }

    fn remove(&mut self, name: &ModuleName) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        self.index.remove(name);
        Ok(())
    }
}

/// Write `content` byte-for-byte through a `.basync.tmp` sibling.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), StoreError> {
    let tmp = PathBuf::from(format!("{}.basync.tmp", path.display()));
    atomic_write_with_tmp(path, content, &tmp)
}

fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), StoreError> {
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!("wrote: {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
