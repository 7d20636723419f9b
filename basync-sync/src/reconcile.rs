//! Direction-agnostic reconciliation.
//!
//! 1. Read the source collection; refuse to continue if it is missing or empty.
//! 2. Plan against the target: names to add, to update (normalized content
//!    differs), to remove. A missing target is planned as "create, then add
//!    everything".
//! 3. Apply in the order create, additions, updates, removals; each group in
//!    name order. Identical modules are never written.
//! 4. Commit the target once.
//!
//! Every applied change is logged as one line (`Module Foo added.`).

use std::collections::BTreeSet;

use serde::Serialize;

use basync_core::{contents_match, ModuleName, ModuleSet, ModuleStore, StoreError};

use crate::SyncError;

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// What a run has to do to make the target match the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// The target collection does not exist yet.
    pub create: bool,
    pub add: Vec<ModuleName>,
    pub update: Vec<ModuleName>,
    pub remove: Vec<ModuleName>,
    /// Modules present on both sides with matching content.
    pub unchanged: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        !self.create && self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }
}

/// Compare a source mapping with the target's names and contents.
///
/// `lookup` is only called for names present on both sides.
pub fn diff<F>(
    source: &ModuleSet,
    target_names: &BTreeSet<ModuleName>,
    mut lookup: F,
) -> Result<Plan, StoreError>
where
    F: FnMut(&ModuleName) -> Result<String, StoreError>,
{
    let mut plan = Plan::default();
    for (name, content) in source {
        if !target_names.contains(name) {
            plan.add.push(name.clone());
        } else if contents_match(content, &lookup(name)?) {
            plan.unchanged += 1;
        } else {
            plan.update.push(name.clone());
        }
    }
    plan.remove = target_names
        .iter()
        .filter(|name| !source.contains_key(*name))
        .cloned()
        .collect();
    Ok(plan)
}

/// Plan `source` against the live `target`.
pub fn plan<T: ModuleStore + ?Sized>(source: &ModuleSet, target: &mut T) -> Result<Plan, SyncError> {
    if !target.exists()? {
        return Ok(Plan {
            create: true,
            add: source.keys().cloned().collect(),
            ..Plan::default()
        });
    }
    let names = target.names()?;
    Ok(diff(source, &names, |name| target.read(name))?)
}

/// Read every source module, refusing a missing or empty source.
pub fn read_source<S: ModuleStore + ?Sized>(source: &mut S) -> Result<ModuleSet, SyncError> {
    if !source.exists()? {
        return Err(SyncError::SourceMissing {
            collection: source.describe(),
        });
    }
    let modules = source.list()?;
    if modules.is_empty() {
        return Err(SyncError::EmptySource {
            collection: source.describe(),
        });
    }
    Ok(modules)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One change to the target, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "module", rename_all = "snake_case")]
pub enum SyncEvent {
    Created,
    Added(ModuleName),
    Updated(ModuleName),
    Removed(ModuleName),
}

/// Outcome of applying a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub target: String,
    pub events: Vec<SyncEvent>,
    pub unchanged: usize,
    /// `true` if the target was asked to persist and had something to persist.
    pub committed: bool,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn added(&self) -> usize {
        self.count(|e| matches!(e, SyncEvent::Added(_)))
    }

    pub fn updated(&self) -> usize {
        self.count(|e| matches!(e, SyncEvent::Updated(_)))
    }

    pub fn removed(&self) -> usize {
        self.count(|e| matches!(e, SyncEvent::Removed(_)))
    }

    pub fn created(&self) -> bool {
        self.events.contains(&SyncEvent::Created)
    }

    fn count(&self, pred: impl Fn(&SyncEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Apply `plan` to `target`, taking contents from `source`.
///
/// In dry-run mode nothing is written and nothing is committed; the report
/// lists what would have happened.
pub fn apply<T: ModuleStore + ?Sized>(
    plan: &Plan,
    source: &ModuleSet,
    target: &mut T,
    dry_run: bool,
) -> Result<SyncReport, SyncError> {
    let mut events = Vec::new();

    if plan.create {
        if !dry_run {
            target.create()?;
        }
        log_line(dry_run, &target.describe(), "created");
        events.push(SyncEvent::Created);
    }

    for name in &plan.add {
        if !dry_run {
            target.insert(name, source_content(source, name)?)?;
        }
        log_line(dry_run, &target.label(name), "added");
        events.push(SyncEvent::Added(name.clone()));
    }

    for name in &plan.update {
        if !dry_run {
            target.replace(name, source_content(source, name)?)?;
        }
        log_line(dry_run, &target.label(name), "updated");
        events.push(SyncEvent::Updated(name.clone()));
    }

    for name in &plan.remove {
        // Label before removal; a local file's spelling is forgotten afterwards.
        let label = target.label(name);
        if !dry_run {
            target.remove(name)?;
        }
        log_line(dry_run, &label, "removed");
        events.push(SyncEvent::Removed(name.clone()));
    }

    let committed = if dry_run { false } else { target.commit()? };

    Ok(SyncReport {
        target: target.describe(),
        events,
        unchanged: plan.unchanged,
        committed,
        dry_run,
    })
}

/// Read the source, plan against the target and apply.
pub fn reconcile<S, T>(source: &mut S, target: &mut T, dry_run: bool) -> Result<SyncReport, SyncError>
where
    S: ModuleStore + ?Sized,
    T: ModuleStore + ?Sized,
{
    let modules = read_source(source)?;
    let plan = plan(&modules, target)?;
    apply(&plan, &modules, target, dry_run)
}

fn source_content<'a>(source: &'a ModuleSet, name: &ModuleName) -> Result<&'a str, StoreError> {
    source
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| StoreError::remote("plan", format!("module {name} missing from source")))
}

fn log_line(dry_run: bool, subject: &str, verb: &str) {
    if dry_run {
        tracing::info!("[dry-run] {subject} would be {verb}.");
    } else {
        tracing::info!("{subject} {verb}.");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
