//! Text summary builder for CLI output.

use crate::model::{SortKey, SortOrder, Student};
use crate::roster::RosterTable;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build the text table for a roster followed by a count line.
pub(crate) fn build_text_summary(
    students: &[Student],
    sorted_by: Option<(SortKey, SortOrder)>,
) -> TextSummary {
    let table = RosterTable::from_students(students);
    let mut lines = table.render_text();

    let mut footer = format!("{} student(s)", table.len());
    if let Some((key, order)) = sorted_by {
        footer.push_str(&format!(", sorted by {key:?} ({order:?})"));
    }
    lines.push(String::new());
    lines.push(footer);

    TextSummary { lines }
}
