//! Project commands
//!
//! Implements `dkt project list|show|add|update|delete`.

use super::{parse_date, parse_project_status, project_not_found};
use crate::output::{format_project_details, format_project_table};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use docket_db::{
    Database, DbError, Loaded, Project, ProjectParameters, ProjectStatus, ProjectUpdate,
    TaskParameters,
};
use tracing::debug;

/// Project subcommands
#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// List projects with optional filters and ordering
    List(ListProjectsCommand),
    /// Show a project and its tasks
    Show(ShowProjectCommand),
    /// Create a project
    Add(AddProjectCommand),
    /// Change fields of a project
    Update(UpdateProjectCommand),
    /// Delete a project and all of its tasks
    Delete(DeleteProjectCommand),
}

impl ProjectCommand {
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        match self {
            ProjectCommand::List(cmd) => cmd.execute(db).await,
            ProjectCommand::Show(cmd) => cmd.execute(db).await,
            ProjectCommand::Add(cmd) => cmd.execute(db).await,
            ProjectCommand::Update(cmd) => cmd.execute(db).await,
            ProjectCommand::Delete(cmd) => cmd.execute(db).await,
        }
    }
}

/// List projects
#[derive(Debug, Args)]
pub struct ListProjectsCommand {
    /// Ordering, e.g. "priority desc,name" (unknown fields are ignored)
    #[arg(long, default_value = "name")]
    pub order_by: String,

    /// Lowest priority to include
    #[arg(long, default_value_t = 0)]
    pub min_priority: u32,

    /// Highest priority to include
    #[arg(long, default_value_t = u32::MAX)]
    pub max_priority: u32,

    /// Earliest start date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date)]
    pub min_start: Option<DateTime<Utc>>,

    /// Latest start date
    #[arg(long, value_parser = parse_date)]
    pub max_start: Option<DateTime<Utc>>,

    /// Earliest completion date; excludes projects without one
    #[arg(long, value_parser = parse_date)]
    pub min_completion: Option<DateTime<Utc>>,

    /// Latest completion date; excludes projects without one
    #[arg(long, value_parser = parse_date)]
    pub max_completion: Option<DateTime<Utc>>,
}

impl ListProjectsCommand {
    fn parameters(&self) -> ProjectParameters {
        let defaults = ProjectParameters::default();
        ProjectParameters::new()
            .with_order_by(self.order_by.clone())
            .with_priority_range(self.min_priority, self.max_priority)
            .with_start_range(
                self.min_start.unwrap_or(defaults.min_start_date),
                self.max_start.unwrap_or(defaults.max_start_date),
            )
            .with_completion_range(self.min_completion, self.max_completion)
    }

    /// Execute the list command.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ValidationError` if `--min-priority` exceeds
    /// `--max-priority`, or `DbError` if the query fails.
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let params = self.parameters();
        // The repository answers an inverted range with an empty list; listing
        // rejects it here instead.
        if !params.is_valid_priority_range() {
            return Err(DbError::ValidationError {
                message: "Max priority can't be less than min priority".to_string(),
            });
        }

        let projects: Vec<Project> = db
            .repository_manager()
            .project()
            .get_all_projects(&params, false)
            .await?
            .into_iter()
            .map(Loaded::into_inner)
            .collect();

        Ok(format_project_table(&projects))
    }
}

/// Show a project
#[derive(Debug, Args)]
pub struct ShowProjectCommand {
    /// Project ID
    pub id: String,
}

impl ShowProjectCommand {
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let manager = db.repository_manager();
        let project = manager
            .project()
            .get_project_by_id(&self.id, false)
            .await?
            .ok_or_else(|| project_not_found(&self.id))?
            .into_inner();

        let tasks: Vec<_> = manager
            .task()
            .get_tasks_by_project_id(&self.id, &TaskParameters::default(), false)
            .await?
            .into_iter()
            .map(Loaded::into_inner)
            .collect();

        Ok(format_project_details(&project, &tasks))
    }
}

/// Create a project
#[derive(Debug, Args)]
pub struct AddProjectCommand {
    /// Project name
    pub name: String,

    /// Start date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date)]
    pub start: DateTime<Utc>,

    /// Completion date
    #[arg(long, value_parser = parse_date)]
    pub completed: Option<DateTime<Utc>>,

    /// Status: active, completed, on_hold
    #[arg(long, value_parser = parse_project_status, default_value = "active")]
    pub status: ProjectStatus,

    /// Priority (higher is more important)
    #[arg(short, long, default_value_t = 0)]
    pub priority: u32,
}

impl AddProjectCommand {
    /// Execute the add command. Returns a message naming the new id.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ValidationError` for an empty name, or `DbError`
    /// if the commit fails.
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DbError::ValidationError {
                message: "Project name cannot be empty".to_string(),
            });
        }

        let mut project = Project::new(name, self.start)
            .with_status(self.status)
            .with_priority(self.priority);
        project.completion_date = self.completed;

        let manager = db.repository_manager();
        let id = manager.project().create_project(project);
        manager.save().await?;

        debug!("Created project {}", id);
        Ok(format!("Created project: {}", id))
    }
}

/// Change fields of a project
#[derive(Debug, Args)]
pub struct UpdateProjectCommand {
    /// Project ID
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New start date
    #[arg(long, value_parser = parse_date)]
    pub start: Option<DateTime<Utc>>,

    /// New completion date
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_completed")]
    pub completed: Option<DateTime<Utc>>,

    /// Remove the completion date
    #[arg(long)]
    pub clear_completed: bool,

    /// New status
    #[arg(long, value_parser = parse_project_status)]
    pub status: Option<ProjectStatus>,

    /// New priority
    #[arg(short, long)]
    pub priority: Option<u32>,
}

impl UpdateProjectCommand {
    fn update(&self) -> ProjectUpdate {
        let mut update = ProjectUpdate {
            name: self.name.clone(),
            start_date: self.start,
            completion_date: None,
            status: self.status,
            priority: self.priority,
        };
        if self.clear_completed {
            update = update.clear_completion_date();
        } else if let Some(completed) = self.completed {
            update = update.with_completion_date(completed);
        }
        update
    }

    /// Execute the update command through a tracked read.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if the project does not exist,
    /// `DbError::ValidationError` if nothing would change, or `DbError` if
    /// the commit fails.
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let update = self.update();
        if !update.has_updates() {
            return Err(DbError::ValidationError {
                message: "No updates specified".to_string(),
            });
        }

        let manager = db.repository_manager();
        let mut project = manager
            .project()
            .get_project_by_id(&self.id, true)
            .await?
            .ok_or_else(|| project_not_found(&self.id))?;

        project.modify(|p| update.apply(p));
        let written = manager.save().await?;

        if written == 0 {
            Ok(format!("Project '{}' is unchanged", self.id))
        } else {
            Ok(format!("Updated project: {}", self.id))
        }
    }
}

/// Delete a project
#[derive(Debug, Args)]
pub struct DeleteProjectCommand {
    /// Project ID
    pub id: String,
}

impl DeleteProjectCommand {
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        let manager = db.repository_manager();
        let project = manager
            .project()
            .get_project_by_id(&self.id, false)
            .await?
            .ok_or_else(|| project_not_found(&self.id))?
            .into_inner();

        manager.project().delete_project(&project)?;
        manager.save().await?;

        Ok(format!("Deleted project: {}", self.id))
    }
}
