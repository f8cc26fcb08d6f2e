//! Database layer for Docket
//!
//! Provides SurrealDB connection management with an embedded RocksDB
//! backend, schema initialization, the project and task models, and the
//! session-based repositories used to read and stage changes.

pub mod error;
pub mod id;
pub mod models;
pub mod repository;
pub mod schema;
pub mod session;

pub use error::{DbError, DbResult};
pub use models::{Project, ProjectStatus, Task, TaskStatus};
pub use repository::{
    BaseRepository, Condition, Direction, Entity, NewProject, NewTask, OrderBy, PriorityRange,
    ProjectDateWindow, ProjectParameters, ProjectRepository, ProjectUpdate, Query,
    RepositoryManager, RequestParameters, Sortable, TaskParameters, TaskRepository, TaskUpdate,
};
pub use session::{Loaded, Session, Tracked};

use std::path::{Path, PathBuf};
use std::process::Command;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use tracing::debug;

/// Default database path relative to the project root
pub const DEFAULT_DB_PATH: &str = ".docket/data";

const NAMESPACE: &str = "docket";
const DATABASE: &str = "main";

/// Database wrapper providing connection management for SurrealDB
pub struct Database {
    client: Surreal<Db>,
    /// On-disk location; `None` for in-memory databases
    path: Option<PathBuf>,
}

impl Database {
    /// Connect to a SurrealDB database at the specified path.
    ///
    /// Creates the database directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `DbError::CreateDirectory` if directory creation fails.
    /// Returns `DbError::Connection` if database connection fails.
    pub async fn connect(path: &Path) -> DbResult<Self> {
        let path = Self::prepare_path(path)?;
        debug!("Opening database at {}", path.display());

        let client =
            Surreal::new::<RocksDb>(path.clone())
                .await
                .map_err(|e| DbError::Connection {
                    path: path.clone(),
                    source: Box::new(e),
                })?;

        Ok(Self {
            client,
            path: Some(path),
        })
    }

    /// Open a fresh, empty in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the engine fails to start.
    pub async fn connect_in_memory() -> DbResult<Self> {
        let client = Surreal::new::<Mem>(())
            .await
            .map_err(|e| DbError::Connection {
                path: PathBuf::from(":memory:"),
                source: Box::new(e),
            })?;

        Ok(Self { client, path: None })
    }

    /// Select the Docket namespace and database and initialize the schema.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Schema` if schema initialization fails.
    pub async fn init(&self) -> DbResult<()> {
        self.client
            .use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| DbError::Schema(Box::new(e)))?;

        schema::init_schema(&self.client).await?;

        Ok(())
    }

    /// Get a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Db> {
        &self.client
    }

    /// Get the path where the database is stored, if on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start a new unit of work.
    pub fn repository_manager(&self) -> RepositoryManager {
        RepositoryManager::new(self.client.clone())
    }

    /// Default database path inside the current git repository:
    /// `<project_root>/.docket/data`. `None` outside a git repository.
    pub fn default_path() -> Option<PathBuf> {
        find_project_root().map(|root| root.join(DEFAULT_DB_PATH))
    }

    fn prepare_path(path: &Path) -> DbResult<PathBuf> {
        let path = path.to_path_buf();

        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| DbError::CreateDirectory {
                path: path.clone(),
                source: e,
            })?;
        }

        Ok(path)
    }
}

static_assertions::assert_impl_all!(Database: Send, Sync);

/// Find the project root by running `git rev-parse --show-toplevel`.
///
/// Returns `None` if not in a git repository or the command fails.
pub fn find_project_root() -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if output.status.success() {
        let path_str = String::from_utf8(output.stdout).ok()?;
        Some(PathBuf::from(path_str.trim()))
    } else {
        None
    }
}

/// Test utilities for isolated in-memory databases
#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// A fresh in-memory database with the schema applied
    pub async fn memory_database() -> Database {
        let db = Database::connect_in_memory().await.unwrap();
        db.init().await.unwrap();
        db
    }

    /// A session over a fresh in-memory database
    pub async fn memory_session() -> Session {
        Session::new(memory_database().await.client().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn unique_temp_dir(label: &str) -> PathBuf {
        env::temp_dir().join(format!(
            "docket-test-{}-{}-{}",
            label,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn test_default_path_is_under_project_root() {
        if let Some(path) = Database::default_path() {
            assert!(
                path.ends_with(".docket/data"),
                "Path should end with .docket/data, got: {:?}",
                path
            );
            assert!(path.is_absolute());
        }
    }

    #[test]
    fn test_find_project_root_is_absolute_when_found() {
        if let Some(root) = find_project_root() {
            assert!(root.is_absolute(), "Project root should be absolute path");
            assert!(root.exists());
        }
    }

    #[tokio::test]
    async fn test_connect_and_init() {
        let temp_dir = unique_temp_dir("connect");

        let db = Database::connect(&temp_dir).await;
        assert!(db.is_ok(), "Failed to connect: {:?}", db.err());
        let db = db.unwrap();
        assert_eq!(db.path(), Some(temp_dir.as_path()));

        let init_result = db.init().await;
        assert!(
            init_result.is_ok(),
            "Failed to init: {:?}",
            init_result.err()
        );

        drop(db);
        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[tokio::test]
    async fn test_connect_creates_nested_directory() {
        let root = unique_temp_dir("nested");
        let nested = root.join("nested/db");

        let db = Database::connect(&nested).await;
        assert!(db.is_ok(), "Failed to connect: {:?}", db.err());
        assert!(nested.exists());

        drop(db);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_in_memory_database_has_no_path() {
        let db = Database::connect_in_memory().await.unwrap();
        db.init().await.unwrap();
        assert!(db.path().is_none());
    }

    #[test]
    fn test_prepare_path_existing_directory() {
        let temp_dir = env::temp_dir();
        let result = Database::prepare_path(&temp_dir);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), temp_dir);
    }
}
