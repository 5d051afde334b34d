//! Terminal and JSON output for scenario reports.

use std::fmt::Write as _;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use livelist_model::{ChangeEvent, ChangeKind};

use crate::commands::{CheckReport, RunReport};
use crate::scenario::Item;

pub fn print_run(report: &RunReport) {
    println!("Scenario: {}", report.name);
    println!("Initial: {}", join(&report.initial));
    println!("{}", event_table(report));
    println!("Final: {}", join(&report.final_contents));
    if !report.mirror_matches {
        eprintln!("warning: replayed events do not reproduce the final contents");
    }
}

pub fn print_check(report: &CheckReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Scenario"),
        header_cell("Steps"),
        header_cell("Events"),
        header_cell("Size"),
        header_cell("Result"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=3 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let result = if report.passed() {
        Cell::new("ok").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        Cell::new(format!("{} failed", report.failures.len()))
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    };
    table.add_row(vec![
        Cell::new(&report.name),
        Cell::new(report.steps),
        Cell::new(report.events),
        Cell::new(report.size),
        result,
    ]);
    println!("{table}");
    for failure in &report.failures {
        eprintln!("- {failure}");
    }
}

/// One row per event, grouped under the step that produced it.
pub fn event_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Step"),
        header_cell("Event"),
        header_cell("Range"),
        header_cell("Values"),
        header_cell("Size"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for step in &report.steps {
        if step.events.is_empty() {
            table.add_row(vec![
                Cell::new(step.index),
                Cell::new(&step.step),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                Cell::new(step.size),
            ]);
            continue;
        }
        for (position, event) in step.events.iter().enumerate() {
            let first = position == 0;
            table.add_row(vec![
                if first { Cell::new(step.index) } else { dim_cell("") },
                if first { Cell::new(&step.step) } else { dim_cell("") },
                kind_cell(event.kind()),
                Cell::new(range_label(event)),
                Cell::new(values_label(event)),
                if first { Cell::new(step.size) } else { dim_cell("") },
            ]);
        }
    }
    table
}

/// Plain-text event log, one line per event.
pub fn event_log(report: &RunReport) -> String {
    let mut out = String::new();
    for step in &report.steps {
        let _ = writeln!(out, "{}. {}", step.index, step.step);
        for event in &step.events {
            let _ = writeln!(
                out,
                "   {} {} {}",
                event.kind(),
                range_label(event),
                values_label(event)
            );
        }
    }
    let _ = write!(out, "=> {}", join(&report.final_contents));
    out
}

pub fn to_json<T: serde::Serialize>(report: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

fn range_label(event: &ChangeEvent<Item>) -> String {
    let range = event.range();
    format!("{}..{}", range.start, range.end)
}

fn values_label(event: &ChangeEvent<Item>) -> String {
    match event {
        ChangeEvent::Initialization { elements } => join(elements),
        ChangeEvent::Insertion { added, .. } => join(added),
        ChangeEvent::Removal { removed, .. } => join(removed),
        ChangeEvent::Update { values, .. } => join(values),
        ChangeEvent::Permutation { permutation, .. } => {
            let targets: Vec<String> = permutation.iter().map(usize::to_string).collect();
            format!("[{}]", targets.join(", "))
        }
    }
}

fn join(items: &[Item]) -> String {
    format!("[{}]", items.join(", "))
}

fn kind_cell(kind: ChangeKind) -> Cell {
    let color = match kind {
        ChangeKind::Initialization => Color::Cyan,
        ChangeKind::Insertion => Color::Green,
        ChangeKind::Removal => Color::Red,
        ChangeKind::Update => Color::Yellow,
        ChangeKind::Permutation => Color::Magenta,
    };
    Cell::new(kind.label()).fg(color)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
