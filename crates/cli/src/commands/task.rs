//! Task commands
//!
//! Implements `dkt task list|show|add|update|delete`. Every task command is
//! scoped by its owning project, which must exist.

use super::{parse_task_status, project_not_found, task_not_found};
use crate::output::{format_task_details, format_task_table};
use clap::{Args, Subcommand};
use docket_db::{
    Database, DbError, Loaded, RepositoryManager, Task, TaskParameters, TaskStatus, TaskUpdate,
};
use tracing::debug;

/// Task subcommands
#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// List the tasks of a project
    List(ListTasksCommand),
    /// Show one task
    Show(ShowTaskCommand),
    /// Create a task in a project
    Add(AddTaskCommand),
    /// Change fields of a task
    Update(UpdateTaskCommand),
    /// Delete a task
    Delete(DeleteTaskCommand),
}

impl TaskCommand {
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        match self {
            TaskCommand::List(cmd) => cmd.execute(db).await,
            TaskCommand::Show(cmd) => cmd.execute(db).await,
            TaskCommand::Add(cmd) => cmd.execute(db).await,
            TaskCommand::Update(cmd) => cmd.execute(db).await,
            TaskCommand::Delete(cmd) => cmd.execute(db).await,
        }
    }
}

/// Fail with `NotFound` unless the project exists.
async fn ensure_project(manager: &RepositoryManager, project_id: &str) -> Result<(), DbError> {
    manager
        .project()
        .get_project_by_id(project_id, false)
        .await?
        .map(|_| ())
        .ok_or_else(|| project_not_found(project_id))
}

/// List tasks of a project
#[derive(Debug, Args)]
pub struct ListTasksCommand {
    /// Owning project ID
    pub project: String,

    /// Ordering, e.g. "priority desc,name" (unknown fields are ignored)
    #[arg(long, default_value = "name")]
    pub order_by: String,

    /// Lowest priority to include
    #[arg(long, default_value_t = 0)]
    pub min_priority: u32,

    /// Highest priority to include
    #[arg(long, default_value_t = u32::MAX)]
    pub max_priority: u32,
}

impl ListTasksCommand {
    /// Execute the list command.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if the project does not exist,
    /// `DbError::ValidationError` for an inverted priority range.
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let params = TaskParameters::new()
            .with_order_by(self.order_by.clone())
            .with_priority_range(self.min_priority, self.max_priority);
        // The repository answers an inverted range with an empty list; listing
        // rejects it here instead.
        if !params.is_valid_priority_range() {
            return Err(DbError::ValidationError {
                message: "Max priority can't be less than min priority".to_string(),
            });
        }

        let manager = db.repository_manager();
        ensure_project(&manager, &self.project).await?;

        let tasks: Vec<Task> = manager
            .task()
            .get_tasks_by_project_id(&self.project, &params, false)
            .await?
            .into_iter()
            .map(Loaded::into_inner)
            .collect();

        Ok(format_task_table(&tasks))
    }
}

/// Show one task
#[derive(Debug, Args)]
pub struct ShowTaskCommand {
    /// Owning project ID
    pub project: String,

    /// Task ID
    pub id: String,
}

impl ShowTaskCommand {
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let manager = db.repository_manager();
        ensure_project(&manager, &self.project).await?;

        let task = manager
            .task()
            .get_task_by_id(&self.project, &self.id, false)
            .await?
            .ok_or_else(|| task_not_found(&self.id))?
            .into_inner();

        Ok(format_task_details(&task))
    }
}

/// Create a task
#[derive(Debug, Args)]
pub struct AddTaskCommand {
    /// Owning project ID
    pub project: String,

    /// Task name
    pub name: String,

    /// Task description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Status: todo, in_progress, done
    #[arg(long, value_parser = parse_task_status, default_value = "todo")]
    pub status: TaskStatus,

    /// Priority (higher is more important)
    #[arg(short, long, default_value_t = 0)]
    pub priority: u32,
}

impl AddTaskCommand {
    /// Execute the add command. Returns a message naming the new id.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if the project does not exist,
    /// `DbError::ValidationError` for an empty name.
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DbError::ValidationError {
                message: "Task name cannot be empty".to_string(),
            });
        }

        let manager = db.repository_manager();
        ensure_project(&manager, &self.project).await?;

        let task = Task::new(name, self.description.clone())
            .with_status(self.status)
            .with_priority(self.priority);
        let id = manager.task().create_task(&self.project, task);
        manager.save().await?;

        debug!("Created task {} in project {}", id, self.project);
        Ok(format!("Created task: {}", id))
    }
}

/// Change fields of a task
#[derive(Debug, Args)]
pub struct UpdateTaskCommand {
    /// Owning project ID
    pub project: String,

    /// Task ID
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New status
    #[arg(long, value_parser = parse_task_status)]
    pub status: Option<TaskStatus>,

    /// New priority
    #[arg(short, long)]
    pub priority: Option<u32>,
}

impl UpdateTaskCommand {
    /// Execute the update command through a tracked read.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if the project or task does not exist,
    /// `DbError::ValidationError` if nothing would change.
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let update = TaskUpdate {
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
        };
        if !update.has_updates() {
            return Err(DbError::ValidationError {
                message: "No updates specified".to_string(),
            });
        }

        let manager = db.repository_manager();
        ensure_project(&manager, &self.project).await?;

        let mut task = manager
            .task()
            .get_task_by_id(&self.project, &self.id, true)
            .await?
            .ok_or_else(|| task_not_found(&self.id))?;

        task.modify(|t| update.apply(t));
        let written = manager.save().await?;

        if written == 0 {
            Ok(format!("Task '{}' is unchanged", self.id))
        } else {
            Ok(format!("Updated task: {}", self.id))
        }
    }
}

/// Delete a task
#[derive(Debug, Args)]
pub struct DeleteTaskCommand {
    /// Owning project ID
    pub project: String,

    /// Task ID
    pub id: String,
}

impl DeleteTaskCommand {
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let manager = db.repository_manager();
        ensure_project(&manager, &self.project).await?;

        let task = manager
            .task()
            .get_task_by_id(&self.project, &self.id, false)
            .await?
            .ok_or_else(|| task_not_found(&self.id))?
            .into_inner();

        manager.task().delete_task(&task)?;
        manager.save().await?;

        Ok(format!("Deleted task: {}", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use docket_db::Project;

    async fn setup_with_project() -> (Database, String) {
        let db = Database::connect_in_memory().await.unwrap();
        db.init().await.unwrap();

        let manager = db.repository_manager();
        let id = manager.project().create_project(Project::new(
            "Owner",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        manager.save().await.unwrap();

        (db, id)
    }

    fn add_cmd(project: &str, name: &str, priority: u32) -> AddTaskCommand {
        AddTaskCommand {
            project: project.to_string(),
            name: name.to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority,
        }
    }

    fn created_id(message: &str) -> String {
        message.strip_prefix("Created task: ").unwrap().to_string()
    }

    #[tokio::test]
    async fn test_add_to_missing_project_fails() {
        let (db, _) = setup_with_project().await;
        let err = add_cmd("ghost", "A", 0).execute(&db).await.unwrap_err();
        assert_eq!(err.to_string(), "Project 'ghost' not found");
    }

    #[tokio::test]
    async fn test_add_then_show() {
        let (db, project) = setup_with_project().await;
        let id = created_id(&add_cmd(&project, "Draft", 3).execute(&db).await.unwrap());

        let shown = ShowTaskCommand {
            project: project.clone(),
            id,
        }
        .execute(&db)
        .await
        .unwrap();
        assert!(shown.contains("Name: Draft"));
        assert!(shown.contains(&format!("Project: {}", project)));
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_priority_range_rather_than_listing_nothing() {
        let (db, project) = setup_with_project().await;
        add_cmd(&project, "mid", 5).execute(&db).await.unwrap();

        let err = ListTasksCommand {
            project: project.clone(),
            order_by: String::new(),
            min_priority: 6,
            max_priority: 4,
        }
        .execute(&db)
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::ValidationError { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_list_filters_priority_and_orders() {
        let (db, project) = setup_with_project().await;
        add_cmd(&project, "low", 1).execute(&db).await.unwrap();
        add_cmd(&project, "mid", 5).execute(&db).await.unwrap();
        add_cmd(&project, "high", 9).execute(&db).await.unwrap();

        let table = ListTasksCommand {
            project: project.clone(),
            order_by: "priority desc".to_string(),
            min_priority: 2,
            max_priority: u32::MAX,
        }
        .execute(&db)
        .await
        .unwrap();

        let names: Vec<&str> = table
            .lines()
            .skip(2)
            .map(|line| line.split_whitespace().nth(1).unwrap())
            .collect();
        assert_eq!(names, vec!["high", "mid"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (db, project) = setup_with_project().await;
        let id = created_id(&add_cmd(&project, "Draft", 0).execute(&db).await.unwrap());

        let message = UpdateTaskCommand {
            project: project.clone(),
            id: id.clone(),
            name: None,
            description: Some("Now with words".to_string()),
            status: Some(TaskStatus::Done),
            priority: None,
        }
        .execute(&db)
        .await
        .unwrap();
        assert_eq!(message, format!("Updated task: {}", id));

        let shown = ShowTaskCommand {
            project: project.clone(),
            id: id.clone(),
        }
        .execute(&db)
        .await
        .unwrap();
        assert!(shown.contains("Status: done"));
        assert!(shown.contains("Description: Now with words"));

        DeleteTaskCommand {
            project: project.clone(),
            id: id.clone(),
        }
        .execute(&db)
        .await
        .unwrap();
        let err = ShowTaskCommand { project, id }
            .execute(&db)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "Task", .. }));
    }

    #[tokio::test]
    async fn test_task_is_not_visible_through_other_project() {
        let (db, project) = setup_with_project().await;
        let other = {
            let manager = db.repository_manager();
            let id = manager.project().create_project(Project::new(
                "Other",
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ));
            manager.save().await.unwrap();
            id
        };
        let id = created_id(&add_cmd(&project, "Mine", 0).execute(&db).await.unwrap());

        let err = ShowTaskCommand { project: other, id }
            .execute(&db)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "Task", .. }));
    }

    #[tokio::test]
    async fn test_update_without_fields_is_rejected() {
        let (db, project) = setup_with_project().await;
        let err = UpdateTaskCommand {
            project,
            id: "t1".to_string(),
            name: None,
            description: None,
            status: None,
            priority: None,
        }
        .execute(&db)
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::ValidationError { .. }));
    }
}
