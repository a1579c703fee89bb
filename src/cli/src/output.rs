//! Terminal rendering for command results.
//!
//! Tables are the human-facing default; `--output json|yaml` switches the
//! same data to machine-readable form, and in those modes nothing else is
//! mixed into stdout so the result stays pipeable. Paginated listings get
//! a footer with the page position so a truncated page is never mistaken
//! for the whole set.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::client::{PageMetadata, Paginated};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

/// Section heading for multi-line detail views such as `whoami`.
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
}

/// Indented key-value line under a heading.
pub fn print_detail(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Render one page of a listing. Table mode appends the page position and,
/// when more pages exist, the flag to reach the next one; json/yaml emit
/// the items together with the page metadata.
pub fn print_page<T: Tabled + Serialize>(page: &Paginated<T>, noun: &str, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if page.items.is_empty() {
                println!("{}", format!("No {noun} found.").dimmed());
            } else {
                print_table(&page.items);
            }
            println!("{}", page_summary(&page.pagination, noun).dimmed());
        }
        OutputFormat::Json | OutputFormat::Yaml => print_item(page, format),
    }
}

/// Render an unpaginated collection, such as a task's attachments.
pub fn print_list<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No results found.".dimmed());
            } else {
                print_table(items);
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => print_item(&items, format),
    }
}

/// Render a single value. Single resources have no natural column layout,
/// so table mode falls back to pretty JSON.
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).expect("serialize to JSON");
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(item).expect("serialize to YAML");
            print!("{yaml}");
        }
    }
}

fn print_table<T: Tabled>(rows: &[T]) {
    println!("{}", Table::new(rows).with(Style::sharp()));
}

fn page_summary(meta: &PageMetadata, noun: &str) -> String {
    let mut summary = format!(
        "page {}/{} ({} {})",
        meta.page,
        meta.total_pages.max(1),
        meta.total_items,
        noun
    );
    if meta.has_next {
        summary.push_str(&format!(", next: --page {}", meta.page + 1));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(page: u64, total_pages: u64, total_items: u64, has_next: bool) -> PageMetadata {
        PageMetadata {
            page,
            per_page: 20,
            total_items,
            total_pages,
            has_previous: page > 1,
            has_next,
        }
    }

    #[test]
    fn test_page_summary_shows_position() {
        assert_eq!(
            page_summary(&meta(2, 5, 87, true), "tasks"),
            "page 2/5 (87 tasks), next: --page 3"
        );
    }

    #[test]
    fn test_page_summary_last_page_has_no_hint() {
        assert_eq!(page_summary(&meta(5, 5, 87, false), "tasks"), "page 5/5 (87 tasks)");
    }

    #[test]
    fn test_page_summary_empty_set_reads_as_one_page() {
        assert_eq!(page_summary(&meta(1, 0, 0, false), "projects"), "page 1/1 (0 projects)");
    }
}
