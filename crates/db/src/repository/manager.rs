//! One unit of work spanning both repositories

use super::project::ProjectRepository;
use super::task::TaskRepository;
use crate::error::DbResult;
use crate::session::Session;
use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::debug;

/// Owns the session and the repositories staging into it
///
/// Build one per logical unit of work, stage through `project()` and
/// `task()`, then `save()` once.
pub struct RepositoryManager {
    session: Arc<Session>,
    projects: ProjectRepository,
    tasks: TaskRepository,
}

impl RepositoryManager {
    pub fn new(client: Surreal<Db>) -> Self {
        let session = Arc::new(Session::new(client));
        Self {
            projects: ProjectRepository::new(Arc::clone(&session)),
            tasks: TaskRepository::new(Arc::clone(&session)),
            session,
        }
    }

    pub fn project(&self) -> &ProjectRepository {
        &self.projects
    }

    pub fn task(&self) -> &TaskRepository {
        &self.tasks
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Commit every staged change from both repositories atomically.
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// See `Session::commit`.
    pub async fn save(&self) -> DbResult<usize> {
        let written = self.session.commit().await?;
        debug!("Saved {} changes", written);
        Ok(written)
    }
}
