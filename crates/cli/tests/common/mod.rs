//! Test infrastructure for integration tests
//!
//! Provides isolated database setup/teardown and command builder helpers.
//! Each test gets its own on-disk database so no state is shared.

use std::path::PathBuf;
use docket_cli::commands::project::{
    AddProjectCommand, DeleteProjectCommand, ListProjectsCommand, ShowProjectCommand,
    UpdateProjectCommand,
};
use docket_cli::commands::task::{AddTaskCommand, ListTasksCommand, UpdateTaskCommand};
use docket_db::{Database, ProjectStatus, TaskStatus};

/// Test context containing an isolated database and temp directory
pub struct TestContext {
    pub db: Database,
    pub temp_dir: PathBuf,
}

impl TestContext {
    /// Create a new test context with an isolated database.
    ///
    /// Each call creates a uniquely named temp directory using process ID,
    /// thread ID, and nanosecond timestamp to guarantee isolation.
    pub async fn new() -> Self {
        let temp_dir = std::env::temp_dir().join(format!(
            "docket-integration-test-{}-{:?}-{}",
            std::process::id(),
            std::thread::current().id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));

        let db = Database::connect(&temp_dir).await.unwrap();
        db.init().await.unwrap();

        Self { db, temp_dir }
    }

    /// Create a project and return its id.
    pub async fn add_project(&self, name: &str, start: &str, priority: u32) -> String {
        let mut cmd = add_project_cmd(name, start);
        cmd.priority = priority;
        created_id(&cmd.execute(&self.db).await.unwrap())
    }

    /// Create a task and return its id.
    pub async fn add_task(&self, project: &str, name: &str, priority: u32) -> String {
        let mut cmd = add_task_cmd(project, name);
        cmd.priority = priority;
        created_id(&cmd.execute(&self.db).await.unwrap())
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.temp_dir);
    }
}

/// Extract the id from a "Created ...: <id>" message.
pub fn created_id(message: &str) -> String {
    message
        .rsplit(": ")
        .next()
        .expect("creation message carries an id")
        .to_string()
}

/// Parse a `YYYY-MM-DD` test date.
pub fn date(value: &str) -> chrono::DateTime<chrono::Utc> {
    docket_cli::commands::parse_date(value).unwrap()
}

/// Names in the second column of a rendered table, in row order.
pub fn table_names(table: &str) -> Vec<String> {
    table
        .lines()
        .skip(2)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Command Builder Helpers
// =============================================================================

/// Create an AddProjectCommand with default optional fields filled in.
pub fn add_project_cmd(name: &str, start: &str) -> AddProjectCommand {
    AddProjectCommand {
        name: name.to_string(),
        start: date(start),
        completed: None,
        status: ProjectStatus::Active,
        priority: 0,
    }
}

/// Create a ListProjectsCommand with no filters.
pub fn list_projects_cmd(order_by: &str) -> ListProjectsCommand {
    ListProjectsCommand {
        order_by: order_by.to_string(),
        min_priority: 0,
        max_priority: u32::MAX,
        min_start: None,
        max_start: None,
        min_completion: None,
        max_completion: None,
    }
}

pub fn show_project_cmd(id: &str) -> ShowProjectCommand {
    ShowProjectCommand { id: id.to_string() }
}

/// Create an UpdateProjectCommand that changes nothing yet.
pub fn update_project_cmd(id: &str) -> UpdateProjectCommand {
    UpdateProjectCommand {
        id: id.to_string(),
        name: None,
        start: None,
        completed: None,
        clear_completed: false,
        status: None,
        priority: None,
    }
}

pub fn delete_project_cmd(id: &str) -> DeleteProjectCommand {
    DeleteProjectCommand { id: id.to_string() }
}

/// Create an AddTaskCommand with default optional fields filled in.
pub fn add_task_cmd(project: &str, name: &str) -> AddTaskCommand {
    AddTaskCommand {
        project: project.to_string(),
        name: name.to_string(),
        description: String::new(),
        status: TaskStatus::Todo,
        priority: 0,
    }
}

/// Create a ListTasksCommand with no filters.
pub fn list_tasks_cmd(project: &str, order_by: &str) -> ListTasksCommand {
    ListTasksCommand {
        project: project.to_string(),
        order_by: order_by.to_string(),
        min_priority: 0,
        max_priority: u32::MAX,
    }
}

/// Create an UpdateTaskCommand that changes nothing yet.
pub fn update_task_cmd(project: &str, id: &str) -> UpdateTaskCommand {
    UpdateTaskCommand {
        project: project.to_string(),
        id: id.to_string(),
        name: None,
        description: None,
        status: None,
        priority: None,
    }
}
