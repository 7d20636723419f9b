//! Capability traits the reconciler and the sync pipeline are written against.
//!
//! - [`ModuleStore`]: one flat collection of modules (a directory, or one
//!   library inside a container). Both sync directions use it as source and
//!   as target.
//! - [`LibraryContainer`]: the remote script-library container, i.e. the
//!   operations a remote office process has to offer.

use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::types::{LibraryName, ModuleName, ModuleSet};

/// A named collection of text modules that can be enumerated and mutated.
pub trait ModuleStore {
    /// Collection description used in progress lines, e.g. `Library Tools`.
    fn describe(&self) -> String;

    /// Per-module label used in progress lines, e.g. `Module Foo` or `Foo.vb`.
    fn label(&self, name: &ModuleName) -> String;

    /// Whether the collection exists at all.
    fn exists(&mut self) -> Result<bool, StoreError>;

    /// Create the (empty) collection.
    fn create(&mut self) -> Result<(), StoreError>;

    /// Names of every module currently in the collection.
    fn names(&mut self) -> Result<BTreeSet<ModuleName>, StoreError>;

    /// Content of one module.
    fn read(&mut self, name: &ModuleName) -> Result<String, StoreError>;

    fn insert(&mut self, name: &ModuleName, content: &str) -> Result<(), StoreError>;

    fn replace(&mut self, name: &ModuleName, content: &str) -> Result<(), StoreError>;

    fn remove(&mut self, name: &ModuleName) -> Result<(), StoreError>;

    /// Persist buffered changes. Returns `true` if anything was flushed.
    ///
    /// Called once per sync run, after all mutations.
    fn commit(&mut self) -> Result<bool, StoreError> {
        Ok(false)
    }

    /// Every module with its content. Empty when the collection does not exist.
    fn list(&mut self) -> Result<ModuleSet, StoreError> {
        if !self.exists()? {
            return Ok(ModuleSet::new());
        }
        let mut modules = ModuleSet::new();
        for name in self.names()? {
            let content = self.read(&name)?;
            modules.insert(name, content);
        }
        Ok(modules)
    }
}

/// Operations required of a remote script-library container.
pub trait LibraryContainer {
    fn has_library(&mut self, library: &LibraryName) -> Result<bool, StoreError>;

    fn create_library(&mut self, library: &LibraryName) -> Result<(), StoreError>;

    /// Make a library's modules visible. Must precede any element access.
    fn load_library(&mut self, library: &LibraryName) -> Result<(), StoreError>;

    fn element_names(&mut self, library: &LibraryName) -> Result<Vec<ModuleName>, StoreError>;

    fn get_module(&mut self, library: &LibraryName, module: &ModuleName)
        -> Result<String, StoreError>;

    fn insert_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
        source: &str,
    ) -> Result<(), StoreError>;

    fn replace_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
        source: &str,
    ) -> Result<(), StoreError>;

    fn remove_module(&mut self, library: &LibraryName, module: &ModuleName)
        -> Result<(), StoreError>;

    /// Whether the container holds changes not yet written to storage.
    fn is_modified(&mut self) -> Result<bool, StoreError>;

    fn store_libraries(&mut self) -> Result<(), StoreError>;

    /// Resolve a script by URI and invoke it with no arguments.
    fn invoke_script(&mut self, uri: &str) -> Result<(), StoreError>;
}
