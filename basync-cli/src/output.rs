//! Terminal output for a finished run.

use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use basync_core::{Direction, LibraryName};
use basync_sync::diff::ModuleDiff;
use basync_sync::{SyncEvent, SyncOutcome};

#[derive(Serialize)]
struct OutcomeJson<'a> {
    direction: Direction,
    library: &'a LibraryName,
    target: &'a str,
    dry_run: bool,
    events: &'a [SyncEvent],
    unchanged: usize,
    committed: bool,
    macro_run: Option<&'a str>,
}

pub fn print_json(outcome: &SyncOutcome) -> Result<()> {
    let report = &outcome.report;
    let payload = OutcomeJson {
        direction: outcome.direction,
        library: &outcome.library,
        target: &report.target,
        dry_run: report.dry_run,
        events: &report.events,
        unchanged: report.unchanged,
        committed: report.committed,
        macro_run: outcome.macro_run.as_deref(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize sync report")?
    );
    Ok(())
}

/// One line on stderr; per-module lines were already logged as they happened.
pub fn print_summary(outcome: &SyncOutcome) {
    let report = &outcome.report;
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    if report.events.is_empty() {
        eprintln!("{prefix}{} is up to date.", report.target);
        return;
    }
    eprintln!(
        "{prefix}{}: {} added, {} updated, {} removed, {} unchanged.",
        report.target,
        report.added(),
        report.updated(),
        report.removed(),
        report.unchanged
    );
}

pub fn print_diffs(diffs: &[ModuleDiff]) {
    if diffs.is_empty() {
        println!("No differences.");
        return;
    }
    for diff in diffs {
        for line in diff.unified_diff.lines() {
            println!("{}", colorize(line));
        }
    }
}

fn colorize(line: &str) -> String {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold().to_string()
    } else if line.starts_with("@@") {
        line.cyan().to_string()
    } else if line.starts_with('+') {
        line.green().to_string()
    } else if line.starts_with('-') {
        line.red().to_string()
    } else {
        line.to_string()
    }
}

pub fn print_elapsed(elapsed: Duration) {
    eprintln!("Done.  {} elapsed.", format_elapsed(elapsed));
}

/// `MM:SS`, minutes uncapped.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_millis(900)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "01:15");
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "60:00");
    }

    #[test]
    fn diff_lines_keep_their_text() {
        colored::control::set_override(false);
        assert_eq!(colorize("+Sub Main"), "+Sub Main");
        assert_eq!(colorize("@@ -1 +1 @@"), "@@ -1 +1 @@");
        assert_eq!(colorize(" context"), " context");
    }
}
