//! Unified diffs of what a sync run would change, for `basync --diff`.

use similar::TextDiff;

use basync_core::{normalize_line_endings, ModuleName, ModuleSet, ModuleStore};

use crate::reconcile::Plan;
use crate::SyncError;

/// Diff of a single module between target (old) and source (new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDiff {
    pub name: ModuleName,
    pub unified_diff: String,
}

/// Render a diff for every added, updated and removed module in `plan`.
///
/// Contents are compared with normalized line endings. Nothing is written.
pub fn diff_modules<T: ModuleStore + ?Sized>(
    plan: &Plan,
    source: &ModuleSet,
    target: &mut T,
) -> Result<Vec<ModuleDiff>, SyncError> {
    let mut diffs = Vec::new();

    for name in &plan.add {
        let new = source.get(name).map(String::as_str).unwrap_or_default();
        diffs.push(render(name, "", new));
    }
    for name in &plan.update {
        let old = target.read(name)?;
        let new = source.get(name).map(String::as_str).unwrap_or_default();
        diffs.push(render(name, &old, new));
    }
    for name in &plan.remove {
        let old = target.read(name)?;
        diffs.push(render(name, &old, ""));
    }

    Ok(diffs)
}

fn render(name: &ModuleName, old: &str, new: &str) -> ModuleDiff {
    let old = normalize_line_endings(old);
    let new = normalize_line_endings(new);
    let old_header = format!("a/{name}");
    let new_header = format!("b/{name}");
    let unified = TextDiff::from_lines(&*old, &*new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();
    ModuleDiff {
        name: name.clone(),
        unified_diff: unified,
    }
}
