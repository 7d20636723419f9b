//! basync: keep a directory of Basic modules and an office macro library in sync.
//!
//! # Usage
//!
//! ```text
//! basync [DIR] [LIBRARY] [--get] [-r Module.Macro] [--dry-run] [--diff] [--json] [--office PATH]
//! basync -v
//! ```
//!
//! `DIR` defaults to the current directory and `LIBRARY` to the base name of
//! `DIR`. Without `--get` the directory is uploaded into the library.

mod output;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use basync_core::{config, ConfigError, Direction, LibraryName, Settings};
use basync_sync::{pipeline, SyncRequest};

#[derive(Parser, Debug)]
#[command(
    name = "basync",
    version,
    about = "Synchronize a directory of Basic modules with an office macro library",
    long_about = None,
    disable_version_flag = true,
)]
struct Cli {
    /// Project directory holding one file per module.
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Library name; defaults to the base name of DIR.
    library: Option<String>,

    /// Download the library into DIR instead of uploading.
    #[arg(long = "get", visible_alias = "download")]
    get: bool,

    /// After an upload, invoke Module.Macro from the library.
    #[arg(short = 'r', long = "run", value_name = "Module.Macro")]
    run: Option<String>,

    /// Report what would change without touching the target.
    #[arg(long)]
    dry_run: bool,

    /// Print unified diffs of pending changes. Implies --dry-run.
    #[arg(long)]
    diff: bool,

    /// Print the sync report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Office executable to start when nothing listens on the endpoint.
    #[arg(long, value_name = "PATH")]
    office: Option<PathBuf>,

    /// Print version.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    fn direction(&self) -> Direction {
        if self.get {
            Direction::Download
        } else {
            Direction::Upload
        }
    }

    fn library_name(&self) -> Result<LibraryName> {
        if let Some(name) = &self.library {
            return Ok(LibraryName::from(name.as_str()));
        }
        let dir = absolute_dir(&self.dir)?;
        pipeline::default_library_name(&dir).with_context(|| {
            format!(
                "cannot derive a library name from {}; pass LIBRARY explicitly",
                dir.display()
            )
        })
    }

    fn request(&self, settings: &Settings) -> Result<SyncRequest> {
        let mut request = SyncRequest::new(&self.dir, self.library_name()?);
        request.direction = self.direction();
        request.run = self.run.clone();
        request.dry_run = self.dry_run;
        request.diff = self.diff;
        request.module_suffix = settings.module_suffix.clone();
        Ok(request)
    }
}

/// `dir` made absolute without requiring it to exist, so a download target can
/// still name the library.
fn absolute_dir(dir: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = dir.canonicalize() {
        return Ok(canonical);
    }
    let cwd = std::env::current_dir().context("could not determine current directory")?;
    Ok(cwd.join(dir))
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match config::load() {
        Ok(settings) => settings,
        Err(ConfigError::HomeNotFound) => Settings::default(),
        Err(err) => return Err(err).context("failed to load settings"),
    };
    if let Some(office) = &cli.office {
        settings.office_program = office.clone();
    }
    Ok(settings)
}

fn main() -> Result<()> {
    let started = Instant::now();
    let cli = Cli::parse();
    basync_office::init_tracing();

    let settings = load_settings(&cli)?;
    let request = cli.request(&settings)?;

    let mut session = basync_office::connect(&settings)
        .with_context(|| format!("could not connect to the office at {}", settings.endpoint))?;
    let outcome = pipeline::run(&mut session, &request).with_context(|| {
        format!(
            "{} of library {} failed",
            request.direction, request.library
        )
    })?;

    if cli.json {
        output::print_json(&outcome)?;
    } else {
        output::print_summary(&outcome);
    }
    if cli.diff {
        output::print_diffs(&outcome.diffs);
    }
    output::print_elapsed(started.elapsed());
    Ok(())
}
