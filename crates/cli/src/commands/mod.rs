//! CLI commands for Docket
//!
//! Each command opens one repository manager, performs its reads and staged
//! changes, and saves once.

pub mod export;
pub mod import;
pub mod project;
pub mod task;

pub use export::ExportCommand;
pub use import::ImportCommand;
pub use project::ProjectCommand;
pub use task::TaskCommand;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clap::Subcommand;
use docket_db::{Database, DbError, ProjectStatus, TaskStatus};

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage the tasks of a project
    #[command(subcommand)]
    Task(TaskCommand),

    /// Import projects and their tasks from JSON
    Import(ImportCommand),

    /// Export all projects and their tasks as JSON
    Export(ExportCommand),
}

impl Command {
    /// Execute the command and render its result for display.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the command fails.
    pub async fn execute(&self, db: &Database) -> Result<String, DbError> {
        match self {
            Command::Project(cmd) => cmd.execute(db).await,
            Command::Task(cmd) => cmd.execute(db).await,
            Command::Import(cmd) => cmd.execute(db).await.map(|r| r.to_string()),
            Command::Export(cmd) => cmd.execute(db).await.map(|r| r.to_string()),
        }
    }
}

/// Years the store can hold; wider chrono years are rejected on commit.
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Parse a date given as RFC 3339 or `YYYY-MM-DD` (midnight UTC).
///
/// Only years 0000 through 9999 are accepted.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, String> {
    let parsed = match DateTime::parse_from_rfc3339(input) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc()),
    };

    let date = parsed.ok_or_else(|| {
        format!(
            "invalid date '{}': expected YYYY-MM-DD or RFC 3339",
            input
        )
    })?;

    ensure_storable(input, date)
}

fn ensure_storable(input: &str, date: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    if STORABLE_YEARS.contains(&date.year()) {
        Ok(date)
    } else {
        Err(format!(
            "invalid date '{}': year must be between 0000 and 9999",
            input
        ))
    }
}

/// Parse a project status (`active`, `completed`, `on_hold`).
pub fn parse_project_status(input: &str) -> Result<ProjectStatus, String> {
    ProjectStatus::parse(&input.to_lowercase().replace('-', "_")).ok_or_else(|| {
        let allowed: Vec<&str> = ProjectStatus::all().iter().map(|s| s.as_str()).collect();
        format!(
            "invalid project status '{}': expected one of {}",
            input,
            allowed.join(", ")
        )
    })
}

/// Parse a task status (`todo`, `in_progress`, `done`).
pub fn parse_task_status(input: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(&input.to_lowercase().replace('-', "_")).ok_or_else(|| {
        let allowed: Vec<&str> = TaskStatus::all().iter().map(|s| s.as_str()).collect();
        format!(
            "invalid task status '{}': expected one of {}",
            input,
            allowed.join(", ")
        )
    })
}

/// Error for a project lookup that found nothing
pub(crate) fn project_not_found(id: &str) -> DbError {
    DbError::NotFound {
        entity: "Project",
        id: id.to_string(),
    }
}

/// Error for a task lookup that found nothing
pub(crate) fn task_not_found(id: &str) -> DbError {
    DbError::NotFound {
        entity: "Task",
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_plain_date_is_midnight_utc() {
        assert_eq!(
            parse_date("2024-03-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rfc3339_converts_to_utc() {
        assert_eq!(
            parse_date("2024-03-15T10:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_invalid_date() {
        let err = parse_date("15/03/2024").unwrap_err();
        assert!(err.contains("15/03/2024"));
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn test_dates_past_year_9999_are_rejected() {
        let far = Utc.with_ymd_and_hms(12000, 1, 1, 0, 0, 0).unwrap();
        let err = ensure_storable("+12000-01-01", far).unwrap_err();
        assert!(err.contains("between 0000 and 9999"), "got {}", err);

        let before_zero = Utc.with_ymd_and_hms(-1, 6, 1, 0, 0, 0).unwrap();
        assert!(ensure_storable("-0001-06-01", before_zero).is_err());

        assert!(parse_date("+12000-01-01").is_err());
        assert!(parse_date("9999-12-31").is_ok());
        assert!(parse_date("0000-01-01").is_ok());
    }

    #[test]
    fn test_parse_statuses_accept_hyphens_and_case() {
        assert_eq!(parse_project_status("On-Hold"), Ok(ProjectStatus::OnHold));
        assert_eq!(parse_task_status("IN_PROGRESS"), Ok(TaskStatus::InProgress));
    }

    #[test]
    fn test_parse_status_error_lists_choices() {
        let err = parse_task_status("blocked").unwrap_err();
        assert!(err.contains("todo, in_progress, done"), "got {}", err);
    }

    #[test]
    fn test_not_found_messages() {
        assert_eq!(project_not_found("p1").to_string(), "Project 'p1' not found");
        assert_eq!(task_not_found("t1").to_string(), "Task 't1' not found");
    }
}
