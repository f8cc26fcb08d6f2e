use std::path::PathBuf;
use thiserror::Error;

/// Database error types for Docket
#[derive(Error, Debug)]
pub enum DbError {
    /// Error establishing connection to the database
    #[error("Failed to connect to database at {path}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: Box<surrealdb::Error>,
    },

    /// Error during schema initialization
    #[error("Failed to initialize database schema: {0}")]
    Schema(#[source] Box<surrealdb::Error>),

    /// Error executing a query
    #[error("Query execution failed")]
    Query(#[source] Box<surrealdb::Error>),

    /// Error with database path (invalid or inaccessible)
    #[error("Invalid database path: {path} - {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// A requested record does not exist
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Error creating database directory
    #[error("Failed to create database directory at {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error for invalid input or validation failure
    #[error("{message}")]
    ValidationError { message: String },

    /// A delete was staged for a record this session never loaded or created
    #[error("{table} '{id}' is not attached to this session")]
    Detached { table: &'static str, id: String },

    /// A single-record lookup matched more than one row
    #[error("Expected at most one {table} record, found {count}")]
    MultipleMatches { table: &'static str, count: usize },

    /// The store rejected the commit (constraint or assertion failure)
    #[error("Commit rejected while applying {mutation}")]
    Commit {
        mutation: String,
        #[source]
        source: Box<surrealdb::Error>,
    },

    /// The commit touched a record that changed underneath the session
    #[error("Concurrent modification detected while applying {mutation}")]
    ConcurrentModification {
        mutation: String,
        #[source]
        source: Box<surrealdb::Error>,
    },
}

impl From<surrealdb::Error> for DbError {
    fn from(err: surrealdb::Error) -> Self {
        DbError::Query(Box::new(err))
    }
}

impl DbError {
    /// Get the full error message including nested SurrealDB error details.
    ///
    /// This is useful for displaying detailed error information to users.
    pub fn full_message(&self) -> String {
        match self {
            DbError::Query(err) => format!("Query execution failed: {}", err),
            DbError::Commit { mutation, source } => {
                format!("Commit rejected while applying {}: {}", mutation, source)
            }
            DbError::ConcurrentModification { mutation, source } => format!(
                "Concurrent modification detected while applying {}: {}",
                mutation, source
            ),
            other => other.to_string(),
        }
    }

    /// Whether retrying the whole unit of work could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::ConcurrentModification { .. })
    }
}

/// Result type alias for database operations
pub type DbResult<T> = Result<T, DbError>;
