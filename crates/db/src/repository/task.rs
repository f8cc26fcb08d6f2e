//! Task repository
//!
//! Tasks are always addressed through their owning project: listing and
//! lookup are scoped by project id, and creation forces the task onto the
//! project it is created under.

use super::base::{Assignment, BaseRepository, Condition, Entity, FieldValue, record_key};
use super::params::TaskParameters;
use super::sort::{OrderBy, SortField, Sortable};
use crate::error::DbResult;
use crate::models::{Project, Task, TaskStatus};
use crate::session::{Loaded, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use surrealdb::sql::Thing;
use tracing::{debug, trace};

/// Task as stored; the owner is a record link
#[derive(Debug, Deserialize)]
pub struct TaskRow {
    id: Thing,
    name: String,
    description: String,
    status: TaskStatus,
    priority: u32,
    project: Thing,
}

impl Entity for Task {
    const TABLE: &'static str = "task";

    type Row = TaskRow;

    fn from_row(row: TaskRow) -> Self {
        Self {
            id: record_key(&row.id),
            name: row.name,
            description: row.description,
            status: row.status,
            priority: row.priority,
            project_id: record_key(&row.project),
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
            (
                "description",
                FieldValue::Plain(Value::from(self.description.clone())),
            ),
            ("status", FieldValue::Plain(Value::from(self.status.as_str()))),
            ("priority", FieldValue::Plain(Value::from(self.priority))),
            (
                "project",
                FieldValue::Link {
                    table: Project::TABLE,
                    id: self.project_id.clone(),
                },
            ),
        ]
    }
}

static TASK_SORT_FIELDS: [SortField<Task>; 6] = [
    SortField {
        name: "id",
        aliases: &[],
        compare: |a, b| a.id.cmp(&b.id),
    },
    SortField {
        name: "name",
        aliases: &["taskname"],
        compare: |a, b| a.name.cmp(&b.name),
    },
    SortField {
        name: "description",
        aliases: &["taskdescription"],
        compare: |a, b| a.description.cmp(&b.description),
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
    SortField {
        name: "project_id",
        aliases: &[],
        compare: |a, b| a.project_id.cmp(&b.project_id),
    },
];

impl Sortable for Task {
    fn sort_fields() -> &'static [SortField<Self>] {
        &TASK_SORT_FIELDS
    }
}

/// Shape for creating a task; the owner comes from the enclosing scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_task_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: u32,
}

fn default_task_status() -> TaskStatus {
    TaskStatus::Todo
}

impl NewTask {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Todo,
            priority: 0,
        }
    }

    /// Build the task entity with a fresh id and no owner.
    pub fn to_entity(&self) -> Task {
        Task::new(self.name.clone(), self.description.clone())
            .with_status(self.status)
            .with_priority(self.priority)
    }
}

/// Partial update for a task; `None` leaves a field unchanged
///
/// There is no way to move a task to another project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<u32>,
}

impl TaskUpdate {
    /// Create a new empty update
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
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
            || self.description.is_some()
            || self.status.is_some()
            || self.priority.is_some()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
    }
}

/// Repository for tasks
#[derive(Clone)]
pub struct TaskRepository {
    base: BaseRepository<Task>,
}

impl TaskRepository {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            base: BaseRepository::new(session),
        }
    }

    /// List the tasks of one project within the priority bounds, ordered by
    /// `params.order_by`.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn get_tasks_by_project_id(
        &self,
        project_id: &str,
        params: &TaskParameters,
        track_changes: bool,
    ) -> DbResult<Vec<Loaded<Task>>> {
        debug!("Listing tasks for project: {}", project_id);
        trace!("Parameters: {:?}", params);

        let order_by = OrderBy::<Task>::parse(&params.order_by);
        let condition = Condition::new().with_link("project", Project::TABLE, project_id);

        let tasks = self
            .base
            .find_by_condition(&condition, track_changes)
            .await?
            .filter_priority(params.min_priority, params.max_priority)
            .sort(&order_by)
            .to_list();

        debug!("Found {} tasks", tasks.len());
        Ok(tasks)
    }

    /// Look up one task within a project. `None` when the task does not
    /// exist or belongs to another project.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn get_task_by_id(
        &self,
        project_id: &str,
        id: &str,
        track_changes: bool,
    ) -> DbResult<Option<Loaded<Task>>> {
        debug!("Getting task {} of project {}", id, project_id);
        let condition = Condition::new()
            .with_link("project", Project::TABLE, project_id)
            .with_id(Task::TABLE, id);
        self.base
            .find_by_condition(&condition, track_changes)
            .await?
            .single()
    }

    /// Stage a new task under `project_id` and return its id.
    ///
    /// Any owner already set on `task` is replaced.
    pub fn create_task(&self, project_id: &str, mut task: Task) -> String {
        if !task.project_id.is_empty() && task.project_id != project_id {
            debug!(
                "Overriding task owner {} with {}",
                task.project_id, project_id
            );
        }
        task.project_id = project_id.to_string();
        self.base.create(task)
    }

    /// Stage removal of a task.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Detached` if the task was not read or created
    /// through this session.
    pub fn delete_task(&self, task: &Task) -> DbResult<()> {
        self.base.delete(task)
    }
}
