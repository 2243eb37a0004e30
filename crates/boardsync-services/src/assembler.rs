//! Board data assembler: joined rows -> ordered column/task tree.
//!
//! Rows must already be ordered by `(column.position, task.position)`; the
//! assembler keeps arrival order and never re-sorts.

use std::collections::HashMap;

use boardsync_core::BoardError;

use crate::model::{BoardRow, Column, Label, Priority, Task};

/// Build columns from joined rows in a single pass.
///
/// Columns are created on first sighting, which keeps display order without
/// a sort. Rows for one column must be contiguous; a row that returns to a
/// column after another column has started means the upstream join or its
/// ordering is broken.
///
/// # Errors
/// `BoardError::DataIntegrity` for a task row with no column, or rows of a
/// column that are not contiguous.
pub fn assemble(rows: &[BoardRow]) -> Result<Vec<Column>, BoardError> {
    let mut columns: Vec<Column> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        let column_id = row.column_id.trim();
        if column_id.is_empty() {
            if let Some(task_id) = &row.task_id {
                return Err(BoardError::data_integrity(format!(
                    "task {task_id} references no column"
                )));
            }
            continue;
        }

        let slot = match index.get(column_id) {
            Some(&slot) if slot + 1 == columns.len() => slot,
            Some(_) => {
                return Err(BoardError::data_integrity(format!(
                    "rows for column {column_id} are not contiguous (task {})",
                    row.task_id.as_deref().unwrap_or("-")
                )));
            }
            None => {
                columns.push(Column {
                    id: column_id.to_string(),
                    title: row.column_title.clone(),
                    position: row.column_position,
                    terminal: row.column_terminal,
                    tasks: Vec::new(),
                });
                index.insert(column_id, columns.len() - 1);
                columns.len() - 1
            }
        };

        if let Some(task) = task_from_row(row) {
            columns[slot].tasks.push(task);
        }
    }

    Ok(columns)
}

fn task_from_row(row: &BoardRow) -> Option<Task> {
    let task_id = row.task_id.as_deref()?;

    let labels = parse_labels(task_id, row.labels.as_deref());

    // Snapshot repo wins; older rows linked before the snapshot existed fall
    // back to the project's repo.
    let github_repo = row.task_github_repo.clone().or_else(|| {
        row.github_issue_number
            .and(row.project_github_repo.clone())
    });

    Some(Task {
        id: task_id.trim().to_string(),
        content: row.content.clone().unwrap_or_default(),
        description: row.description.clone().unwrap_or_default(),
        priority: row
            .priority
            .as_deref()
            .map(Priority::parse)
            .unwrap_or_default(),
        column_id: row.column_id.trim().to_string(),
        project_id: row.project_id.as_deref().map(|id| id.trim().to_string()),
        project_name: row.project_name.clone(),
        project_color: row.project_color.clone(),
        position: row.task_position.unwrap_or_default(),
        is_archived: row.is_archived.unwrap_or(false),
        github_issue_number: row.github_issue_number,
        github_repo,
        labels,
    })
}

fn parse_labels(task_id: &str, raw: Option<&str>) -> Vec<Label> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") => Vec::new(),
        Some(json) => serde_json::from_str(json).unwrap_or_else(|e| {
            tracing::warn!(task_id, error = %e, "Ignoring malformed labels");
            Vec::new()
        }),
    }
}
