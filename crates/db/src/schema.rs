//! Database schema initialization for Docket
//!
//! Defines the SurrealDB schema for projects and tasks, the indexes that
//! back the range filters, and the cascade from a project to its tasks.

use crate::error::DbError;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

/// SQL statements for schema initialization
mod sql {
    /// Define the project table with all fields and range-filter indexes
    pub const DEFINE_PROJECT_TABLE: &str = r#"
        DEFINE TABLE IF NOT EXISTS project SCHEMAFULL;

        DEFINE FIELD IF NOT EXISTS name ON project TYPE string
            ASSERT string::len($value) > 0;

        DEFINE FIELD IF NOT EXISTS start_date ON project TYPE datetime;

        DEFINE FIELD IF NOT EXISTS completion_date ON project TYPE option<datetime>;

        DEFINE FIELD IF NOT EXISTS status ON project TYPE string
            ASSERT $value IN ["active", "completed", "on_hold"];

        DEFINE FIELD IF NOT EXISTS priority ON project TYPE int
            ASSERT $value >= 0;

        DEFINE INDEX IF NOT EXISTS project_priority ON project FIELDS priority;
        DEFINE INDEX IF NOT EXISTS project_start_date ON project FIELDS start_date;
        DEFINE INDEX IF NOT EXISTS project_completion_date ON project FIELDS completion_date;
    "#;

    /// Define the task table; every task links to its owning project
    pub const DEFINE_TASK_TABLE: &str = r#"
        DEFINE TABLE IF NOT EXISTS task SCHEMAFULL;

        DEFINE FIELD IF NOT EXISTS name ON task TYPE string
            ASSERT string::len($value) > 0;

        DEFINE FIELD IF NOT EXISTS description ON task TYPE string;

        DEFINE FIELD IF NOT EXISTS status ON task TYPE string
            ASSERT $value IN ["todo", "in_progress", "done"];

        DEFINE FIELD IF NOT EXISTS priority ON task TYPE int
            ASSERT $value >= 0;

        DEFINE FIELD IF NOT EXISTS project ON task TYPE record<project>;

        DEFINE INDEX IF NOT EXISTS task_priority ON task FIELDS priority;
        DEFINE INDEX IF NOT EXISTS task_project ON task FIELDS project;
    "#;

    /// Removing a project removes the tasks it owns
    pub const DEFINE_PROJECT_CASCADE: &str = r#"
        DEFINE EVENT IF NOT EXISTS project_cascade ON TABLE project
            WHEN $event = "DELETE"
            THEN (DELETE task WHERE project = $before.id);
    "#;
}

/// Initialize the database schema.
///
/// Creates the project and task tables with their indexes and the cascade
/// event. Idempotent: every definition uses `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns `DbError::Schema` if any schema definition fails.
pub async fn init_schema(client: &Surreal<Db>) -> Result<(), DbError> {
    for statement in [
        sql::DEFINE_PROJECT_TABLE,
        sql::DEFINE_TASK_TABLE,
        sql::DEFINE_PROJECT_CASCADE,
    ] {
        client
            .query(statement)
            .await
            .and_then(|response| response.check())
            .map_err(|e| DbError::Schema(Box::new(e)))?;
    }

    Ok(())
}
