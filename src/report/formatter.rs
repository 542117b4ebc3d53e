//! Turns decoded database sections into report pages.

use super::page::ReportPage;
use crate::api::{value_text, DatabaseSection};
use serde_json::Value;

/// Appended to pages that had to be cut.
pub const TRUNCATION_NOTICE: &str = "Message truncated - too much data";

/// Section name the API uses for its empty-result placeholder
const NO_RESULTS_SECTION: &str = "No results found";

/// A page longer than `max_length - TRUNCATE_ABOVE_MARGIN` gets cut ...
const TRUNCATE_ABOVE_MARGIN: usize = 100;
/// ... down to `max_length - TRUNCATE_TO_MARGIN`, leaving room for the notice.
const TRUNCATE_TO_MARGIN: usize = 150;

/// Formats every section into its own page, preserving API order.
#[must_use]
pub fn format_sections(sections: &[DatabaseSection], max_length: usize) -> Vec<ReportPage> {
    sections
        .iter()
        .map(|section| format_section(section, max_length))
        .collect()
}

/// Formats one section, truncating it to fit `max_length` rendered characters.
#[must_use]
pub fn format_section(section: &DatabaseSection, max_length: usize) -> ReportPage {
    let mut page = ReportPage::new();
    page.bold(format!("📊 {}", section.name)).newline().newline();

    if let Some(info) = section.info.as_deref().filter(|info| !info.trim().is_empty()) {
        page.plain(format!("ℹ️ {info}")).newline().newline();
    }

    if section.name != NO_RESULTS_SECTION {
        for (idx, record) in section.records.iter().enumerate() {
            page.bold(format!("Record #{}", idx + 1)).newline();
            for (field, value) in record {
                write_field(&mut page, field, value);
            }
            page.newline();
        }
    }

    page.trim_end();

    if page.html_len() > max_length.saturating_sub(TRUNCATE_ABOVE_MARGIN) {
        page.truncate_html(max_length.saturating_sub(TRUNCATE_TO_MARGIN));
        page.trim_end();
        page.plain("\n\n⚠️ ").italic(TRUNCATION_NOTICE);
    }

    page
}

fn write_field(page: &mut ReportPage, name: &str, value: &Value) {
    page.plain("  • ").bold(name).plain(":");
    if value.is_object() || value.is_array() {
        page.newline();
        write_nested(page, value, 2);
    } else {
        page.plain(format!(" {}", value_text(value))).newline();
    }
}

fn write_nested(page: &mut ReportPage, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if nested.is_object() || nested.is_array() {
                    page.plain(format!("{indent}• {key}:")).newline();
                    write_nested(page, nested, depth + 1);
                } else {
                    page.plain(format!("{indent}• {key}: {}", value_text(nested)))
                        .newline();
                }
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    page.plain(format!("{indent}[{}]", idx + 1)).newline();
                    write_nested(page, item, depth + 1);
                } else {
                    page.plain(format!("{indent}• {}", value_text(item))).newline();
                }
            }
        }
        scalar => {
            page.plain(format!("{indent}{}", value_text(scalar))).newline();
        }
    }
}
