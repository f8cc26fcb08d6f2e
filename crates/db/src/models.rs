//! Data models for Docket project tracking
//!
//! Defines the Project and Task records and their status enums. Models are
//! plain data; persistence mapping lives in the repository modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    /// Returns the string representation used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
        }
    }

    /// Parse a status string (as stored in the database)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProjectStatus::Active),
            "completed" => Some(ProjectStatus::Completed),
            "on_hold" => Some(ProjectStatus::OnHold),
            _ => None,
        }
    }

    /// All statuses in declaration order
    pub fn all() -> &'static [ProjectStatus] {
        &[
            ProjectStatus::Active,
            ProjectStatus::Completed,
            ProjectStatus::OnHold,
        ]
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task status
///
/// Represents the current state of a task in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Returns the string representation used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    /// Parse a status string (as stored in the database)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    /// All statuses in declaration order
    pub fn all() -> &'static [TaskStatus] {
        &[TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done]
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A project owning a set of tasks
///
/// Deleting a project removes its tasks (enforced by the store). No ordering
/// is enforced between `start_date` and `completion_date`. Both dates must
/// fall in years 0000 through 9999; the store rejects anything wider at
/// commit with `DbError::Commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Opaque record id
    pub id: String,

    /// Project name, must be non-empty
    pub name: String,

    pub start_date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,

    pub status: ProjectStatus,

    pub priority: u32,
}

impl Project {
    /// Create a new active project with a freshly generated id
    pub fn new(name: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            id: crate::id::generate(),
            name: name.into(),
            start_date,
            completion_date: None,
            status: ProjectStatus::Active,
            priority: 0,
        }
    }

    /// Set the completion date
    pub fn with_completion_date(mut self, completion_date: DateTime<Utc>) -> Self {
        self.completion_date = Some(completion_date);
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// A unit of work inside a project
///
/// Every task belongs to exactly one project through `project_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque record id
    pub id: String,

    /// Task name
    pub name: String,

    /// Task description
    pub description: String,

    pub status: TaskStatus,

    pub priority: u32,

    /// Owning project id
    #[serde(default)]
    pub project_id: String,
}

impl Task {
    /// Create a new task in `Todo` status with a freshly generated id.
    ///
    /// The owning project is assigned when the task is staged through
    /// `TaskRepository::create_task`.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: crate::id::generate(),
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Todo,
            priority: 0,
            project_id: String::new(),
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the owning project id
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }
}
