//! Import command for loading projects from JSON
//!
//! Implements the `dkt import` command. The input is a JSON array of
//! projects, each with optional nested tasks, as produced by `dkt export`.
//! Everything is staged in one unit of work and committed atomically.

use clap::Args;
use docket_db::{Database, DbError, NewProject};
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

/// Import projects and tasks from JSON
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Input file path (reads from stdin if not specified)
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

/// Result of the import command
#[derive(Debug)]
pub struct ImportResult {
    /// Number of projects imported
    pub projects: usize,
    /// Number of tasks imported
    pub tasks: usize,
    /// Input source
    pub source: String,
}

impl std::fmt::Display for ImportResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Import complete!")?;
        writeln!(f, "  Projects: {}", self.projects)?;
        writeln!(f, "  Tasks: {}", self.tasks)?;
        write!(f, "  Source: {}", self.source)
    }
}

impl ImportCommand {
    /// Execute the import command.
    ///
    /// Every project gets a fresh id; its tasks are created under it. If
    /// any record is rejected nothing is imported.
    ///
    /// # Errors
    ///
    /// Returns `DbError::InvalidPath` if the input cannot be read or parsed,
    /// or `DbError::Commit` if the store rejects a record.
    pub async fn execute(&self, db: &Database) -> Result<ImportResult, DbError> {
        let (projects, source) = self.read_projects()?;
        self.import(db, projects, source).await
    }

    /// Import already-parsed projects.
    pub async fn import(
        &self,
        db: &Database,
        projects: Vec<NewProject>,
        source: String,
    ) -> Result<ImportResult, DbError> {
        let manager = db.repository_manager();
        let mut task_count = 0;

        for new_project in &projects {
            let project_id = manager.project().create_project(new_project.to_entity());
            for new_task in &new_project.tasks {
                manager
                    .task()
                    .create_task(&project_id, new_task.to_entity());
                task_count += 1;
            }
        }

        manager.save().await?;
        debug!(
            "Imported {} projects and {} tasks",
            projects.len(),
            task_count
        );

        Ok(ImportResult {
            projects: projects.len(),
            tasks: task_count,
            source,
        })
    }

    fn read_projects(&self) -> Result<(Vec<NewProject>, String), DbError> {
        let source_path = self
            .input
            .clone()
            .unwrap_or_else(|| PathBuf::from("<stdin>"));

        let contents = match &self.input {
            Some(path) => std::fs::read_to_string(path).map_err(|e| DbError::InvalidPath {
                path: path.clone(),
                reason: e.to_string(),
            })?,
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .map_err(|e| DbError::InvalidPath {
                        path: source_path.clone(),
                        reason: e.to_string(),
                    })?;
                buffer
            }
        };

        let projects: Vec<NewProject> =
            serde_json::from_str(&contents).map_err(|e| DbError::InvalidPath {
                path: source_path.clone(),
                reason: format!("JSON parse error: {}", e),
            })?;

        Ok((projects, source_path.display().to_string()))
    }
}
