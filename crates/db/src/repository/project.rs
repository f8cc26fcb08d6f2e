//! Project repository
//!
//! Listing with priority and date filters plus dynamic ordering, lookup by
//! id, and staged create/delete. Also holds the creation and partial-update
//! shapes used by the command layer.

use super::base::{Assignment, BaseRepository, Condition, Entity, FieldValue, record_key};
use super::filter::ProjectDateWindow;
use super::params::ProjectParameters;
use super::sort::{OrderBy, SortField, Sortable};
use super::task::NewTask;
use crate::error::DbResult;
use crate::models::{Project, ProjectStatus};
use crate::session::{Loaded, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use surrealdb::sql::{Datetime, Thing};
use tracing::debug;

/// Project as stored
#[derive(Debug, Deserialize)]
pub struct ProjectRow {
    id: Thing,
    name: String,
    start_date: Datetime,
    #[serde(default)]
    completion_date: Option<Datetime>,
    status: ProjectStatus,
    priority: u32,
}

impl Entity for Project {
    const TABLE: &'static str = "project";

    type Row = ProjectRow;

    fn from_row(row: ProjectRow) -> Self {
        Self {
            id: record_key(&row.id),
            name: row.name,
            start_date: row.start_date.0,
            completion_date: row.completion_date.map(|dt| dt.0),
            status: row.status,
            priority: row.priority,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn assignments(&self) -> Vec<Assignment> {
        vec![
            ("name", FieldValue::Plain(Value::from(self.name.clone()))),
            ("start_date", FieldValue::Datetime(self.start_date)),
            (
                "completion_date",
                FieldValue::OptionalDatetime(self.completion_date),
            ),
            ("status", FieldValue::Plain(Value::from(self.status.as_str()))),
            ("priority", FieldValue::Plain(Value::from(self.priority))),
        ]
    }
}

static PROJECT_SORT_FIELDS: [SortField<Project>; 6] = [
    SortField {
        name: "id",
        aliases: &[],
        compare: |a, b| a.id.cmp(&b.id),
    },
    SortField {
        name: "name",
        aliases: &[],
        compare: |a, b| a.name.cmp(&b.name),
    },
    SortField {
        name: "start_date",
        aliases: &[],
        compare: |a, b| a.start_date.cmp(&b.start_date),
    },
    SortField {
        name: "completion_date",
        aliases: &[],
        compare: |a, b| a.completion_date.cmp(&b.completion_date),
    },
    SortField {
        name: "status",
        aliases: &[],
        compare: |a, b| a.status.cmp(&b.status),
    },
    SortField {
        name: "priority",
        aliases: &[],
        compare: |a, b| a.priority.cmp(&b.priority),
    },
];

impl Sortable for Project {
    fn sort_fields() -> &'static [SortField<Self>] {
        &PROJECT_SORT_FIELDS
    }
}

/// Shape for creating a project, optionally with its initial tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
    #[serde(default = "default_project_status")]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<NewTask>,
}

fn default_project_status() -> ProjectStatus {
    ProjectStatus::Active
}

impl NewProject {
    pub fn new(name: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            start_date,
            completion_date: None,
            status: ProjectStatus::Active,
            priority: 0,
            tasks: Vec::new(),
        }
    }

    /// Build the project entity (fresh id); nested tasks are left to the
    /// caller since they need the project's id.
    pub fn to_entity(&self) -> Project {
        Project {
            id: crate::id::generate(),
            name: self.name.clone(),
            start_date: self.start_date,
            completion_date: self.completion_date,
            status: self.status,
            priority: self.priority,
        }
    }
}

/// Partial update for a project; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    /// `Some(None)` clears the completion date
    pub completion_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<u32>,
}

impl ProjectUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_completion_date(mut self, completion_date: DateTime<Utc>) -> Self {
        self.completion_date = Some(Some(completion_date));
        self
    }

    pub fn clear_completion_date(mut self) -> Self {
        self.completion_date = Some(None);
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Check if any updates are specified
    pub fn has_updates(&self) -> bool {
        self.name.is_some()
            || self.start_date.is_some()
            || self.completion_date.is_some()
            || self.status.is_some()
            || self.priority.is_some()
    }

    /// Write the specified fields onto `project`.
    pub fn apply(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(start_date) = self.start_date {
            project.start_date = start_date;
        }
        if let Some(completion_date) = self.completion_date {
            project.completion_date = completion_date;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(priority) = self.priority {
            project.priority = priority;
        }
    }
}

/// Repository for projects
#[derive(Clone)]
pub struct ProjectRepository {
    base: BaseRepository<Project>,
}

impl ProjectRepository {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            base: BaseRepository::new(session),
        }
    }

    /// List projects matching the priority and date bounds, ordered by
    /// `params.base.order_by`.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn get_all_projects(
        &self,
        params: &ProjectParameters,
        track_changes: bool,
    ) -> DbResult<Vec<Loaded<Project>>> {
        debug!("Listing projects with {:?}", params);

        let order_by = OrderBy::<Project>::parse(&params.base.order_by);
        let window = ProjectDateWindow::from(params);

        let projects = self
            .base
            .find_all(track_changes)
            .await?
            .filter_priority(params.base.min_priority, params.base.max_priority)
            .filter_dates(&window)
            .sort(&order_by)
            .to_list();

        debug!("Found {} projects", projects.len());
        Ok(projects)
    }

    /// Look up one project. `None` when no project has this id.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn get_project_by_id(
        &self,
        id: &str,
        track_changes: bool,
    ) -> DbResult<Option<Loaded<Project>>> {
        debug!("Getting project: {}", id);
        let condition = Condition::new().with_id(Project::TABLE, id);
        self.base
            .find_by_condition(&condition, track_changes)
            .await?
            .single()
    }

    /// Stage a new project and return its id.
    pub fn create_project(&self, project: Project) -> String {
        self.base.create(project)
    }

    /// Stage removal of a project. Its tasks go with it on commit.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Detached` if the project was not read or created
    /// through this session.
    pub fn delete_project(&self, project: &Project) -> DbResult<()> {
        self.base.delete(project)
    }
}
