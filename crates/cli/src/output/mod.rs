//! Output formatting module for Docket
//!
//! Provides table formatting and display utilities for CLI output.

use chrono::{DateTime, Utc};
use docket_db::{Project, Task};

/// Maximum width for name columns before truncation
const MAX_NAME_WIDTH: usize = 30;

/// Maximum width for the description column before truncation
const MAX_DESCRIPTION_WIDTH: usize = 40;

/// Truncate a string to the specified maximum width, adding ellipsis if needed.
fn truncate(s: &str, max_width: usize) -> String {
    let length = s.chars().count();
    if length <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{}...", kept)
    }
}

/// Format a date for tables: `YYYY-MM-DD`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn format_optional_date(date: Option<&DateTime<Utc>>) -> String {
    date.map(format_date).unwrap_or_else(|| "-".to_string())
}

/// Render rows under headers with columns padded to the widest cell.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect();

    let render_row = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.iter().map(|h| h.to_string()).collect()));
    lines.push(render_row(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        lines.push(render_row(row.clone()));
    }
    lines.join("\n")
}

/// Format projects into an aligned table string.
///
/// ```text
/// ID            Name     Status  Priority  Start       Completed
/// ------------  -------  ------  --------  ----------  ----------
/// a1b2c3d4e5f6  Website  active  3         2024-01-01  -
/// ```
pub fn format_project_table(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects found.".to_string();
    }

    let rows: Vec<Vec<String>> = projects
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                truncate(&p.name, MAX_NAME_WIDTH),
                p.status.to_string(),
                p.priority.to_string(),
                format_date(&p.start_date),
                format_optional_date(p.completion_date.as_ref()),
            ]
        })
        .collect();

    render_table(
        &["ID", "Name", "Status", "Priority", "Start", "Completed"],
        &rows,
    )
}

/// Format tasks into an aligned table string.
pub fn format_task_table(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }

    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|t| {
            let description = if t.description.is_empty() {
                "-".to_string()
            } else {
                truncate(&t.description, MAX_DESCRIPTION_WIDTH)
            };
            vec![
                t.id.clone(),
                truncate(&t.name, MAX_NAME_WIDTH),
                t.status.to_string(),
                t.priority.to_string(),
                description,
            ]
        })
        .collect();

    render_table(&["ID", "Name", "Status", "Priority", "Description"], &rows)
}

/// Format a project with its tasks for `project show`.
pub fn format_project_details(project: &Project, tasks: &[Task]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Project: {}\n", project.id));
    output.push_str(&format!("Name: {}\n", project.name));
    output.push_str(&format!("Status: {}\n", project.status));
    output.push_str(&format!("Priority: {}\n", project.priority));
    output.push_str(&format!("Start: {}\n", format_date(&project.start_date)));
    output.push_str(&format!(
        "Completed: {}\n",
        format_optional_date(project.completion_date.as_ref())
    ));
    output.push('\n');
    output.push_str(&format!("Tasks ({}):\n", tasks.len()));
    output.push_str(&format_task_table(tasks));
    output
}

/// Format a single task for `task show`.
pub fn format_task_details(task: &Task) -> String {
    let description = if task.description.is_empty() {
        "-"
    } else {
        task.description.as_str()
    };
    format!(
        "Task: {}\nProject: {}\nName: {}\nStatus: {}\nPriority: {}\nDescription: {}",
        task.id, task.project_id, task.name, task.status, task.priority, description
    )
}
