//! Terminal display utilities for CLI output.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::models::RecordTable;

/// Widest cell shown in a preview before it is cut.
const MAX_CELL_WIDTH: usize = 40;

/// Truncate text to `max_width` characters, appending an ellipsis when cut.
///
/// # Examples
///
/// ```
/// use cdli_scraper::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let kept: String = text.chars().take(max_width - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Render the first `max_rows` rows of a record table
pub fn table_preview(table: &RecordTable, max_rows: usize) -> Table {
    let mut preview = Table::new();
    preview
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(table.columns());

    for row in table.rows().iter().take(max_rows) {
        preview.add_row(
            row.iter()
                .map(|cell| truncate_with_ellipsis(cell, MAX_CELL_WIDTH)),
        );
    }
    preview
}

/// One-line description of a table's size
pub fn table_summary(table: &RecordTable) -> String {
    format!(
        "{} records, {} columns",
        table.len(),
        table.columns().len()
    )
}
