//! Plain-text rendering of tasks for the terminal.

use crate::types::{Task, DATE_FORMAT};

/// Line printed under the heading and after each task.
pub const SEPARATOR: &str = "----------------------------------------";

/// Shown by the list command when there is nothing to print.
pub const NO_TASKS: &str = "No tasks found.";

/// Shown by the filter command when nothing matched.
pub const NO_MATCHING_TASKS: &str = "No tasks found matching the filters.";

/// Renders one task as two lines, e.g.
///
/// ```text
/// [✓] 1. Buy milk
///    Due: 2024-01-15, Priority: low
/// ```
pub fn render_task(task: &Task) -> String {
    let status = if task.completed { '✓' } else { ' ' };
    format!(
        "[{status}] {}. {}\n   Due: {}, Priority: {}\n",
        task.id,
        task.description,
        task.due_date.format(DATE_FORMAT),
        task.priority
    )
}

/// Renders a heading followed by every task, or `empty_message` alone when
/// `tasks` is empty.
pub fn render_tasks(heading: &str, tasks: &[Task], empty_message: &str) -> String {
    if tasks.is_empty() {
        return format!("{empty_message}\n");
    }

    let mut out = format!("\n{heading}:\n{SEPARATOR}\n");
    for task in tasks {
        out.push_str(&render_task(task));
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out
}
