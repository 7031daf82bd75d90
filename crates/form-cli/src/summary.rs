use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use form_cli::commands::{GroupCount, ProgressReport};
use form_engine::Completion;
use form_model::LogEntry;
use form_schema::CatalogSummary;

pub fn print_progress(report: &ProgressReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Page"),
        header_cell("Title"),
        header_cell("Answered"),
        header_cell("Applicable"),
        header_cell("Complete"),
        header_cell("Document fields"),
    ]);
    apply_summary_table_style(&mut table);
    for column in 2..=5 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    let mut document_fields = 0usize;
    for page in &report.pages {
        document_fields += page.document_fields;
        table.add_row(vec![
            Cell::new(&page.page)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&page.title),
            Cell::new(page.completion.answered),
            Cell::new(page.completion.applicable),
            percent_cell(page.completion),
            Cell::new(page.document_fields),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new("All pages")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(report.total.answered).add_attribute(Attribute::Bold),
        Cell::new(report.total.applicable).add_attribute(Attribute::Bold),
        percent_cell(report.total).add_attribute(Attribute::Bold),
        Cell::new(document_fields).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

pub fn print_groups(groups: &[GroupCount]) {
    if groups.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Page"),
        header_cell("Group"),
        header_cell("Instances"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for group in groups {
        table.add_row(vec![
            Cell::new(&group.page),
            Cell::new(&group.group),
            count_cell(group.instances),
        ]);
    }
    println!("{table}");
}

pub fn print_catalog_summary(summary: &CatalogSummary) {
    println!("Catalog: {}", summary.catalog_dir.display());
    let mut table = Table::new();
    table.set_header(vec![header_cell("Item"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let rows = [
        ("Pages", summary.page_count),
        ("Fields", summary.field_count),
        ("Dependency rules", summary.rule_count),
        ("Mapping entries", summary.mapping_count),
        ("Pinned files", summary.pinned_file_count),
    ];
    for (label, count) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(count)]);
    }
    let unpinned = if summary.unpinned_file_count > 0 {
        Cell::new(summary.unpinned_file_count).fg(Color::Yellow)
    } else {
        dim_cell(summary.unpinned_file_count)
    };
    table.add_row(vec![Cell::new("Unpinned files"), unpinned]);
    println!("{table}");
}

/// Diagnostics go to stderr so stdout stays machine-readable.
pub fn print_diagnostics(entries: &[LogEntry]) {
    if entries.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Scope"),
        header_cell("Message"),
        header_cell("Details"),
    ]);
    apply_table_style(&mut table);
    for entry in entries {
        let details = entry
            .data
            .as_ref()
            .map_or_else(|| dim_cell("-"), |data| Cell::new(data.to_string()));
        table.add_row(vec![
            Cell::new(&entry.scope).fg(Color::Yellow),
            Cell::new(&entry.message),
            details,
        ]);
    }
    eprintln!("Diagnostics:");
    eprintln!("{table}");
}

fn percent_cell(completion: Completion) -> Cell {
    let cell = Cell::new(format!("{:.0}%", completion.percent()));
    if completion.is_complete() {
        cell.fg(Color::Green)
    } else {
        cell.fg(Color::Yellow)
    }
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
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

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
