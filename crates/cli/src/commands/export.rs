//! Export command for dumping projects and tasks to JSON
//!
//! Implements the `dkt export` command. The output is a JSON array of
//! projects with their tasks nested, readable by `dkt import`.

use chrono::{DateTime, Utc};
use clap::Args;
use docket_db::{
    Database, DbError, Loaded, Project, ProjectParameters, ProjectStatus, Task, TaskParameters,
    TaskStatus,
};
use serde::Serialize;
use std::path::PathBuf;

/// Export all projects and tasks as JSON
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Output file path (defaults to stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// A project in the export document
#[derive(Debug, Serialize)]
pub struct ExportedProject {
    pub id: String,
    pub name: String,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
    pub status: ProjectStatus,
    pub priority: u32,
    pub tasks: Vec<ExportedTask>,
}

/// A task in the export document; its owner is the enclosing project
#[derive(Debug, Serialize)]
pub struct ExportedTask {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: u32,
}

impl From<Task> for ExportedTask {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            name: task.name,
            description: task.description,
            status: task.status,
            priority: task.priority,
        }
    }
}

impl ExportedProject {
    fn new(project: Project, tasks: Vec<Task>) -> Self {
        Self {
            id: project.id,
            name: project.name,
            start_date: project.start_date,
            completion_date: project.completion_date,
            status: project.status,
            priority: project.priority,
            tasks: tasks.into_iter().map(ExportedTask::from).collect(),
        }
    }
}

/// Result of the export command
#[derive(Debug)]
pub struct ExportResult {
    /// Number of projects exported
    pub projects: usize,
    /// Number of tasks exported
    pub tasks: usize,
    /// File written, or `None` when the document goes to stdout
    pub destination: Option<PathBuf>,
    /// The JSON document
    pub document: String,
}

impl std::fmt::Display for ExportResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.destination {
            Some(path) => {
                writeln!(f, "Export complete!")?;
                writeln!(f, "  Projects: {}", self.projects)?;
                writeln!(f, "  Tasks: {}", self.tasks)?;
                write!(f, "  Output: {}", path.display())
            }
            None => write!(f, "{}", self.document),
        }
    }
}

impl ExportCommand {
    /// Execute the export command.
    ///
    /// Projects are ordered by name, tasks within a project by name.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database queries fail or the file cannot be
    /// written.
    pub async fn execute(&self, db: &Database) -> Result<ExportResult, DbError> {
        let manager = db.repository_manager();
        let projects = manager
            .project()
            .get_all_projects(&ProjectParameters::default(), false)
            .await?;

        let mut exported = Vec::with_capacity(projects.len());
        let mut task_count = 0;
        for project in projects.into_iter().map(Loaded::into_inner) {
            let tasks: Vec<Task> = manager
                .task()
                .get_tasks_by_project_id(&project.id, &TaskParameters::default(), false)
                .await?
                .into_iter()
                .map(Loaded::into_inner)
                .collect();
            task_count += tasks.len();
            exported.push(ExportedProject::new(project, tasks));
        }

        let document = serde_json::to_string_pretty(&exported).map_err(|e| {
            DbError::InvalidPath {
                path: self
                    .output
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("<stdout>")),
                reason: format!("JSON serialization error: {}", e),
            }
        })?;

        if let Some(path) = &self.output {
            std::fs::write(path, &document).map_err(|e| DbError::InvalidPath {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(ExportResult {
            projects: exported.len(),
            tasks: task_count,
            destination: self.output.clone(),
            document,
        })
    }
}
