//! Remote module store: one library inside a [`LibraryContainer`].
//!
//! The library is loaded lazily, before the first element access, because a
//! container only exposes a library's modules after `load_library`. A library
//! created through this adapter counts as loaded.

use std::collections::BTreeSet;

use basync_core::{script_uri, LibraryContainer, LibraryName, ModuleName, ModuleStore, StoreError};

/// A [`ModuleStore`] view of one named library.
pub struct RemoteLibrary<'c, C: LibraryContainer + ?Sized> {
    container: &'c mut C,
    library: LibraryName,
    loaded: bool,
}

impl<'c, C: LibraryContainer + ?Sized> RemoteLibrary<'c, C> {
    pub fn new(container: &'c mut C, library: LibraryName) -> Self {
        Self {
            container,
            library,
            loaded: false,
        }
    }

    pub fn library(&self) -> &LibraryName {
        &self.library
    }

    /// Invoke `Module.Macro` from this library with no arguments.
    pub fn run_macro(&mut self, macro_path: &str) -> Result<(), StoreError> {
        let uri = script_uri(&self.library, macro_path);
        tracing::debug!("invoking {uri}");
        self.container.invoke_script(&uri)
    }

    fn ensure_loaded(&mut self) -> Result<(), StoreError> {
        if !self.loaded {
            self.container.load_library(&self.library)?;
            self.loaded = true;
        }
        Ok(())
    }
}

impl<C: LibraryContainer + ?Sized> ModuleStore for RemoteLibrary<'_, C> {
    fn describe(&self) -> String {
        format!("Library {}", self.library)
    }

    fn label(&self, name: &ModuleName) -> String {
        format!("Module {name}")
    }

    fn exists(&mut self) -> Result<bool, StoreError> {
        self.container.has_library(&self.library)
    }

    fn create(&mut self) -> Result<(), StoreError> {
        self.container.create_library(&self.library)?;
        self.loaded = true;
        Ok(())
    }

    fn names(&mut self) -> Result<BTreeSet<ModuleName>, StoreError> {
        self.ensure_loaded()?;
        Ok(self
            .container
            .element_names(&self.library)?
            .into_iter()
            .collect())
    }

    fn read(&mut self, name: &ModuleName) -> Result<String, StoreError> {
        self.ensure_loaded()?;
        self.container.get_module(&self.library, name)
    }

    fn insert(&mut self, name: &ModuleName, content: &str) -> Result<(), StoreError> {
        self.ensure_loaded()?;
        self.container.insert_module(&self.library, name, content)
    }

    fn replace(&mut self, name: &ModuleName, content: &str) -> Result<(), StoreError> {
        self.ensure_loaded()?;
        self.container.replace_module(&self.library, name, content)
    }

    fn remove(&mut self, name: &ModuleName) -> Result<(), StoreError> {
        self.ensure_loaded()?;
        self.container.remove_module(&self.library, name)
    }

    /// Stores the container once if it reports pending modifications.
    fn commit(&mut self) -> Result<bool, StoreError> {
        if !self.container.is_modified()? {
            return Ok(false);
        }
        self.container.store_libraries()?;
        tracing::debug!("stored libraries after updating {}", self.library);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryContainer;
    use basync_core::ModuleSet;

    fn lib() -> LibraryName {
        LibraryName::from("Tools")
    }

    #[test]
    fn list_of_missing_library_is_empty() {
        let mut container = MemoryContainer::default();
        let mut remote = RemoteLibrary::new(&mut container, lib());
        assert!(!remote.exists().unwrap());
        assert!(remote.list().unwrap().is_empty());
    }

    #[test]
    fn list_loads_library_before_reading() {
        let mut modules = ModuleSet::new();
        modules.insert(ModuleName::from("Main"), "Sub Main\nEnd Sub\n".to_string());
        let mut container = MemoryContainer::default().with_library("Tools", modules.clone());

        let listed = RemoteLibrary::new(&mut container, lib()).list().unwrap();
        assert_eq!(listed, modules);
        assert!(container.is_loaded(&lib()));
    }

    #[test]
    fn created_library_accepts_inserts_without_load() {
        let mut container = MemoryContainer::default();
        {
            let mut remote = RemoteLibrary::new(&mut container, lib());
            remote.create().unwrap();
            remote.insert(&ModuleName::from("A"), "1").unwrap();
        }
        assert_eq!(container.load_count(), 0);
        assert_eq!(container.library(&lib()).unwrap()[&ModuleName::from("A")], "1");
    }

    #[test]
    fn commit_stores_only_when_modified() {
        let mut container = MemoryContainer::default().with_library("Tools", ModuleSet::new());
        {
            let mut remote = RemoteLibrary::new(&mut container, lib());
            assert!(!remote.commit().unwrap());
            remote.insert(&ModuleName::from("A"), "1").unwrap();
            assert!(remote.commit().unwrap());
            assert!(!remote.commit().unwrap());
        }
        assert_eq!(container.store_count(), 1);
    }

    #[test]
    fn run_macro_builds_application_uri() {
        let mut modules = ModuleSet::new();
        modules.insert(ModuleName::from("Module1"), "Sub Main\nEnd Sub\n".to_string());
        let mut container = MemoryContainer::default().with_library("Tools", modules);
        RemoteLibrary::new(&mut container, lib())
            .run_macro("Module1.Main")
            .unwrap();
        assert_eq!(
            container.invoked(),
            ["vnd.sun.star.script:Tools.Module1.Main?language=Basic&location=application"]
        );
    }

    #[test]
    fn labels_name_the_module() {
        let mut container = MemoryContainer::default();
        let remote = RemoteLibrary::new(&mut container, lib());
        assert_eq!(remote.describe(), "Library Tools");
        assert_eq!(remote.label(&ModuleName::from("Foo")), "Module Foo");
    }
}
