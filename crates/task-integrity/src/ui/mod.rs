//! Terminal UI helpers for integrity reports.
//!
//! This module uses println! for CLI output, which is appropriate
//! for terminal user interfaces.

#![allow(clippy::disallowed_macros)]

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::engine::{CrossTagOutcome, IssueKind, MoveOutcome, RepairStats, ValidationReport};
use crate::entities::Reference;

/// Table color for an issue kind
fn kind_color(kind: IssueKind) -> Color {
    match kind {
        IssueKind::CircularReference | IssueKind::DuplicateId | IssueKind::InvalidId => {
            Color::Red
        }
        IssueKind::MissingReference | IssueKind::MalformedReference => Color::Yellow,
        IssueKind::SelfReference | IssueKind::DuplicateDependency => Color::Magenta,
        IssueKind::OrphanedSubtask | IssueKind::NoStartableSubtask => Color::Blue,
    }
}

/// Create a table listing every issue in a report
pub fn issue_table(report: &ValidationReport) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Entity").fg(Color::Cyan),
        Cell::new("Kind").fg(Color::Cyan),
        Cell::new("Detail").fg(Color::Cyan),
    ]);

    for issue in &report.issues {
        table.add_row(vec![
            Cell::new(issue.entity()),
            Cell::new(issue.kind()).fg(kind_color(issue.kind())),
            Cell::new(issue),
        ]);
    }

    table
}

/// Create a table of repair counts, skipping zero rows
pub fn repair_table(stats: &RepairStats) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Fix").fg(Color::Cyan),
        Cell::new("Count").fg(Color::Cyan),
    ]);

    let rows = [
        ("Duplicate ids renumbered", stats.ids_renumbered),
        ("Duplicate dependencies removed", stats.duplicates_removed),
        ("Missing references removed", stats.missing_removed),
        ("Malformed references removed", stats.malformed_removed),
        ("Self references removed", stats.self_removed),
        ("Cycles broken", stats.circular_fixed),
        ("Subtask dependencies cleared", stats.subtasks_fixed),
        ("Orphaned subtasks reattached", stats.orphans_fixed),
    ];
    for (label, count) in rows.into_iter().filter(|(_, n)| *n > 0) {
        table.add_row(vec![Cell::new(label), Cell::new(count).fg(Color::Green)]);
    }

    table
}

/// Print a validation report with a one-line verdict
pub fn display_report(report: &ValidationReport) {
    if report.is_valid() {
        print_success(&format!("Tag '{}': no dependency issues", report.tag));
        return;
    }

    print_warning(&format!(
        "Tag '{}': {} issue(s) found",
        report.tag,
        report.issues.len()
    ));
    println!("{}", issue_table(report));

    let summary: Vec<String> = report
        .summary()
        .into_iter()
        .map(|(kind, count)| format!("{count} {kind}"))
        .collect();
    println!("{} {}", "Summary:".bold(), summary.join(", ").dimmed());
}

/// Print applied moves and any issues they left behind
pub fn display_move(outcome: &MoveOutcome) {
    if outcome.moved.is_empty() {
        print_info("Nothing to move");
        return;
    }
    for (from, to) in &outcome.moved {
        print_success(&format!("Moved {} → {}", from.to_string().cyan(), to.to_string().cyan()));
    }
    if !outcome.report.is_valid() {
        display_report(&outcome.report);
    }
}

/// Print a cross-tag move summary
pub fn display_cross_tag(outcome: &CrossTagOutcome) {
    let ids: Vec<String> = outcome.moved.iter().map(ToString::to_string).collect();
    print_success(&format!(
        "Moved {} task(s) from '{}' to '{}': {}",
        outcome.moved.len(),
        outcome.source.name,
        outcome.destination.name,
        ids.join(", ")
    ));
    for edge in &outcome.dropped_edges {
        print_warning(&format!("Dropped dependency {edge}"));
    }
}

/// Print a list of references under a heading
pub fn display_references(heading: &str, references: &[Reference]) {
    println!("{}", heading.bold().underline());
    if references.is_empty() {
        println!("  {}", "none".dimmed());
        return;
    }
    for reference in references {
        println!("  {} {}", "•".dimmed(), reference);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
