//! Core task types.
//!
//! This module defines the data structures stored in the task list and the
//! value types used to query it. A [`Task`] serializes with snake_case field
//! names and an RFC 3339 `due_date`, which is the on-disk and HTTP format.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TodoError;

/// Date format accepted from users (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Importance of a task.
///
/// Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Lowercase name as stored on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TodoError;

    /// Parses a priority name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TodoError::validation(format!(
                "unknown priority '{other}', expected low, medium or high"
            ))),
        }
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub completed: bool,
}

impl Task {
    /// Creates an incomplete task.
    pub fn new(
        id: u32,
        description: impl Into<String>,
        due_date: DateTime<Utc>,
        priority: Priority,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            due_date,
            priority,
            completed: false,
        }
    }
}

/// Ordering applied when listing tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Ascending due date.
    Date,
    /// High first, then medium, then low.
    Priority,
    /// Insertion order.
    #[default]
    None,
}

impl SortBy {
    /// Sorts `tasks` in place. The sort is stable, so ties keep list order.
    pub fn apply(self, tasks: &mut [Task]) {
        match self {
            Self::Date => tasks.sort_by_key(|task| task.due_date),
            Self::Priority => tasks.sort_by_key(|task| Reverse(task.priority)),
            Self::None => {}
        }
    }
}

impl From<&str> for SortBy {
    /// Any value other than `date` or `priority` means insertion order.
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => Self::Date,
            "priority" => Self::Priority,
            _ => Self::None,
        }
    }
}

/// Criteria for selecting tasks.
///
/// Unset fields match every task; set fields must match exactly.
///
/// # Example
///
/// ```rust
/// use todolist::types::{Priority, TaskFilter};
///
/// let filter = TaskFilter::new()
///     .with_priority(Priority::High)
///     .with_completed(true);
/// assert!(!filter.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

impl TaskFilter {
    /// Creates a filter that matches all tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Returns `true` if no criteria are set.
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.completed.is_none()
    }

    /// Checks a task against every set criterion.
    pub fn matches(&self, task: &Task) -> bool {
        self.priority.is_none_or(|p| p == task.priority)
            && self.completed.is_none_or(|c| c == task.completed)
    }
}

/// Parses a `YYYY-MM-DD` date into midnight UTC.
///
/// # Errors
///
/// Returns [`TodoError::Validation`] when the input is not a calendar date in
/// that exact format. Unpadded fields, signs and surrounding whitespace are
/// rejected.
pub fn parse_due_date(input: &str) -> Result<DateTime<Utc>, TodoError> {
    let invalid = || TodoError::validation("Invalid date format, expected YYYY-MM-DD");

    if !is_date_shaped(input) {
        return Err(invalid());
    }
    let date = NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| invalid())?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// `DDDD-DD-DD` with ASCII digits only. chrono alone accepts `2024-1-5`.
fn is_date_shaped(input: &str) -> bool {
    input.len() == 10
        && input.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}
