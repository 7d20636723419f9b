//! Shared sync pipeline entrypoint used by the CLI.
//!
//! One run = one direction between a project directory and one library of a
//! connected container, followed (uploads only) by an optional macro call.

use std::path::{Path, PathBuf};

use basync_core::config::DEFAULT_MODULE_SUFFIX;
use basync_core::{Direction, LibraryContainer, LibraryName, ModuleStore};

use crate::diff::{self, ModuleDiff};
use crate::local::LocalStore;
use crate::reconcile::{self, SyncReport};
use crate::remote::RemoteLibrary;
use crate::SyncError;

/// Everything a single run needs; built once by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub project_dir: PathBuf,
    pub library: LibraryName,
    pub direction: Direction,
    /// `Module.Macro` to invoke after an upload.
    pub run: Option<String>,
    pub dry_run: bool,
    /// Collect unified diffs. Implies `dry_run`.
    pub diff: bool,
    pub module_suffix: String,
}

impl SyncRequest {
    /// An upload of `project_dir` into `library` with default options.
    pub fn new(project_dir: impl Into<PathBuf>, library: LibraryName) -> Self {
        Self {
            project_dir: project_dir.into(),
            library,
            direction: Direction::Upload,
            run: None,
            dry_run: false,
            diff: false,
            module_suffix: DEFAULT_MODULE_SUFFIX.to_string(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run || self.diff
    }
}

/// Result of [`run`].
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub direction: Direction,
    pub library: LibraryName,
    pub report: SyncReport,
    pub diffs: Vec<ModuleDiff>,
    /// The macro invoked after the upload, if any.
    pub macro_run: Option<String>,
}

/// Library name derived from the project directory's base name.
pub fn default_library_name(project_dir: &Path) -> Option<LibraryName> {
    project_dir
        .file_name()
        .map(|name| LibraryName::from(name.to_string_lossy().into_owned()))
}

/// Run one sync between `request.project_dir` and `request.library`.
pub fn run<C: LibraryContainer + ?Sized>(
    container: &mut C,
    request: &SyncRequest,
) -> Result<SyncOutcome, SyncError> {
    let dry_run = request.is_dry_run();
    let mut local = LocalStore::new(&request.project_dir, &request.module_suffix);
    let mut remote = RemoteLibrary::new(container, request.library.clone());

    let (report, diffs) = match request.direction {
        Direction::Upload => sync_pair(&mut local, &mut remote, dry_run, request.diff)?,
        Direction::Download => sync_pair(&mut remote, &mut local, dry_run, request.diff)?,
    };

    let mut macro_run = None;
    if request.direction == Direction::Upload && !dry_run {
        if let Some(name) = &request.run {
            remote.run_macro(name).map_err(|source| SyncError::Macro {
                name: name.clone(),
                source,
            })?;
            tracing::info!("Macro {name} invoked.");
            macro_run = Some(name.clone());
        }
    }

    Ok(SyncOutcome {
        direction: request.direction,
        library: request.library.clone(),
        report,
        diffs,
        macro_run,
    })
}

fn sync_pair<S, T>(
    source: &mut S,
    target: &mut T,
    dry_run: bool,
    with_diffs: bool,
) -> Result<(SyncReport, Vec<ModuleDiff>), SyncError>
where
    S: ModuleStore + ?Sized,
    T: ModuleStore + ?Sized,
{
    let modules = reconcile::read_source(source)?;
    let plan = reconcile::plan(&modules, target)?;
    let diffs = if with_diffs {
        diff::diff_modules(&plan, &modules, target)?
    } else {
        Vec::new()
    };
    let report = reconcile::apply(&plan, &modules, target, dry_run)?;
    Ok((report, diffs))
}
