//! In-process [`LibraryContainer`].
//!
//! Behaves like a real container where it matters to a sync run: libraries
//! must be loaded before element access, duplicate inserts and missing
//! replaces fail, and mutations mark the container modified until
//! `store_libraries`. Used by tests and by bridge servers that hold libraries
//! in memory.

use std::collections::BTreeMap;

use basync_core::{LibraryContainer, LibraryName, ModuleName, ModuleSet, StoreError};

const SCRIPT_SCHEME: &str = "vnd.sun.star.script:";

#[derive(Debug, Clone, Default)]
struct MemoryLibrary {
    modules: ModuleSet,
    loaded: bool,
}

/// Libraries held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    libraries: BTreeMap<LibraryName, MemoryLibrary>,
    modified: bool,
    loads: usize,
    stores: usize,
    invoked: Vec<String>,
}

impl MemoryContainer {
    /// Seed a stored (not yet loaded) library.
    pub fn with_library(mut self, name: impl Into<LibraryName>, modules: ModuleSet) -> Self {
        self.libraries.insert(
            name.into(),
            MemoryLibrary {
                modules,
                loaded: false,
            },
        );
        self
    }

    pub fn library(&self, name: &LibraryName) -> Option<&ModuleSet> {
        self.libraries.get(name).map(|l| &l.modules)
    }

    pub fn is_loaded(&self, name: &LibraryName) -> bool {
        self.libraries.get(name).is_some_and(|l| l.loaded)
    }

    /// Number of `load_library` calls.
    pub fn load_count(&self) -> usize {
        self.loads
    }

    /// Number of `store_libraries` calls.
    pub fn store_count(&self) -> usize {
        self.stores
    }

    /// Script URIs invoked so far, oldest first.
    pub fn invoked(&self) -> &[String] {
        &self.invoked
    }

    fn loaded(&self, op: &'static str, name: &LibraryName) -> Result<&MemoryLibrary, StoreError> {
        match self.libraries.get(name) {
            Some(lib) if lib.loaded => Ok(lib),
            Some(_) => Err(StoreError::remote(op, format!("library {name} is not loaded"))),
            None => Err(StoreError::remote(op, format!("no library named {name}"))),
        }
    }

    fn loaded_mut(
        &mut self,
        op: &'static str,
        name: &LibraryName,
    ) -> Result<&mut ModuleSet, StoreError> {
        self.loaded(op, name)?;
        self.libraries
            .get_mut(name)
            .map(|l| &mut l.modules)
            .ok_or_else(|| StoreError::remote(op, format!("no library named {name}")))
    }
}

impl LibraryContainer for MemoryContainer {
    fn has_library(&mut self, library: &LibraryName) -> Result<bool, StoreError> {
        Ok(self.libraries.contains_key(library))
    }

    fn create_library(&mut self, library: &LibraryName) -> Result<(), StoreError> {
        if self.libraries.contains_key(library) {
            return Err(StoreError::remote(
                "create_library",
                format!("library {library} already exists"),
            ));
        }
        self.libraries.insert(
            library.clone(),
            MemoryLibrary {
                modules: ModuleSet::new(),
                loaded: true,
            },
        );
        self.modified = true;
        Ok(())
    }

    fn load_library(&mut self, library: &LibraryName) -> Result<(), StoreError> {
        let lib = self.libraries.get_mut(library).ok_or_else(|| {
            StoreError::remote("load_library", format!("no library named {library}"))
        })?;
        lib.loaded = true;
        self.loads += 1;
        Ok(())
    }

    fn element_names(&mut self, library: &LibraryName) -> Result<Vec<ModuleName>, StoreError> {
        let lib = self.loaded("element_names", library)?;
        Ok(lib.modules.keys().cloned().collect())
    }

    fn get_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
    ) -> Result<String, StoreError> {
        let lib = self.loaded("get_module", library)?;
        lib.modules
            .get(module)
            .cloned()
            .ok_or_else(|| StoreError::remote("get_module", format!("no module named {module}")))
    }

    fn insert_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
        source: &str,
    ) -> Result<(), StoreError> {
        let modules = self.loaded_mut("insert_module", library)?;
        if modules.contains_key(module) {
            return Err(StoreError::remote(
                "insert_module",
                format!("module {module} already exists"),
            ));
        }
        modules.insert(module.clone(), source.to_string());
        self.modified = true;
        Ok(())
    }

    fn replace_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
        source: &str,
    ) -> Result<(), StoreError> {
        let modules = self.loaded_mut("replace_module", library)?;
        let slot = modules.get_mut(module).ok_or_else(|| {
            StoreError::remote("replace_module", format!("no module named {module}"))
        })?;
        *slot = source.to_string();
        self.modified = true;
        Ok(())
    }

    fn remove_module(
        &mut self,
        library: &LibraryName,
        module: &ModuleName,
    ) -> Result<(), StoreError> {
        let modules = self.loaded_mut("remove_module", library)?;
        if modules.remove(module).is_none() {
            return Err(StoreError::remote(
                "remove_module",
                format!("no module named {module}"),
            ));
        }
        self.modified = true;
        Ok(())
    }

    fn is_modified(&mut self) -> Result<bool, StoreError> {
        Ok(self.modified)
    }

    fn store_libraries(&mut self) -> Result<(), StoreError> {
        self.modified = false;
        self.stores += 1;
        Ok(())
    }

    /// Resolves `vnd.sun.star.script:<Library>.<Module>.<Macro>?...` against the
    /// held libraries; the macro itself is not executed.
    fn invoke_script(&mut self, uri: &str) -> Result<(), StoreError> {
        let unresolved = || StoreError::remote("invoke_script", format!("cannot resolve {uri}"));
        let path = uri.strip_prefix(SCRIPT_SCHEME).ok_or_else(unresolved)?;
        let path = path.split('?').next().unwrap_or(path);
        let mut parts = path.splitn(3, '.');
        let (Some(library), Some(module), Some(_macro)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(unresolved());
        };
        let found = self
            .libraries
            .get(&LibraryName::from(library))
            .is_some_and(|l| l.modules.contains_key(&ModuleName::from(module)));
        if !found {
            return Err(unresolved());
        }
        self.invoked.push(uri.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib() -> LibraryName {
        LibraryName::from("Tools")
    }

    #[test]
    fn element_access_requires_load() {
        let mut c = MemoryContainer::default().with_library("Tools", ModuleSet::new());
        let err = c.element_names(&lib()).unwrap_err();
        assert!(err.to_string().contains("not loaded"), "got: {err}");
        c.load_library(&lib()).unwrap();
        assert!(c.element_names(&lib()).unwrap().is_empty());
    }

    #[test]
    fn duplicate_insert_and_missing_replace_fail() {
        let mut c = MemoryContainer::default();
        c.create_library(&lib()).unwrap();
        let name = ModuleName::from("A");
        c.insert_module(&lib(), &name, "1").unwrap();
        assert!(c.insert_module(&lib(), &name, "2").is_err());
        assert!(c
            .replace_module(&lib(), &ModuleName::from("B"), "x")
            .is_err());
        assert!(c.remove_module(&lib(), &ModuleName::from("B")).is_err());
    }

    #[test]
    fn rejected_mutations_leave_container_clean() {
        let mut modules = ModuleSet::new();
        modules.insert(ModuleName::from("A"), "1".to_string());
        let mut c = MemoryContainer::default().with_library("Tools", modules);
        c.load_library(&lib()).unwrap();

        assert!(c.insert_module(&lib(), &ModuleName::from("A"), "2").is_err());
        assert!(c.replace_module(&lib(), &ModuleName::from("B"), "x").is_err());
        assert!(c.remove_module(&lib(), &ModuleName::from("B")).is_err());
        assert!(!c.is_modified().unwrap());

        c.replace_module(&lib(), &ModuleName::from("A"), "2").unwrap();
        assert!(c.is_modified().unwrap());
    }

    #[test]
    fn store_clears_modified() {
        let mut c = MemoryContainer::default();
        assert!(!c.is_modified().unwrap());
        c.create_library(&lib()).unwrap();
        assert!(c.is_modified().unwrap());
        c.store_libraries().unwrap();
        assert!(!c.is_modified().unwrap());
        assert_eq!(c.store_count(), 1);
    }

    #[test]
    fn invoke_rejects_unknown_module() {
        let mut c = MemoryContainer::default().with_library("Tools", ModuleSet::new());
        let err = c
            .invoke_script("vnd.sun.star.script:Tools.Nope.Main?language=Basic&location=application")
            .unwrap_err();
        assert!(err.to_string().contains("cannot resolve"));
        assert!(c.invoke_script("not-a-script-uri").is_err());
        assert!(c.invoked().is_empty());
    }
}
