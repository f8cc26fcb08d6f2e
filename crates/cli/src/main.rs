use clap::Parser;
use docket_cli::Command;
use docket_db::{DEFAULT_DB_PATH, Database, DbError, DbResult};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable name for the database path
const DOCKET_DB_PATH_ENV: &str = "DOCKET_DB_PATH";

/// Docket - project and task tracking
#[derive(Parser)]
#[command(name = "dkt")]
#[command(version)]
#[command(about = "Track projects and their tasks", long_about = None)]
struct Args {
    /// Path to the database directory (can also be set via DOCKET_DB_PATH env var)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Command>,
}

/// Get the database path from command line, environment variable, or default.
///
/// Priority:
/// 1. Command line --db argument
/// 2. DOCKET_DB_PATH environment variable (if non-empty)
/// 3. `<git root>/.docket/data`
/// 4. `~/.docket/data`
fn resolve_db_path(cli_db: Option<PathBuf>) -> DbResult<PathBuf> {
    if let Some(path) = cli_db {
        return Ok(path);
    }

    if let Ok(env_path) = std::env::var(DOCKET_DB_PATH_ENV)
        && !env_path.is_empty()
    {
        return Ok(PathBuf::from(env_path));
    }

    if let Some(path) = Database::default_path() {
        return Ok(path);
    }

    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DB_PATH))
        .ok_or_else(|| DbError::InvalidPath {
            path: PathBuf::from(DEFAULT_DB_PATH),
            reason: "no git repository or home directory to place the database in".to_string(),
        })
}

/// Initialize logging from `RUST_LOG`, defaulting to warnings only.
///
/// Examples:
/// - `RUST_LOG=debug` - repository and session activity
/// - `RUST_LOG=docket_db=trace` - also the generated queries
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run_app().await {
        eprintln!("error: {}", e.full_message());
        process::exit(1);
    }
}

/// Main application logic - separated for testability
async fn run_app() -> Result<(), DbError> {
    let args = Args::parse();
    run_with_args(&args).await
}

/// Run the application with the given arguments
async fn run_with_args(args: &Args) -> Result<(), DbError> {
    let db_path = resolve_db_path(args.db.clone())?;

    let db = Database::connect(&db_path).await?;
    db.init().await?;

    match &args.command {
        Some(cmd) => {
            let result = cmd.execute(&db).await?;
            println!("{}", result);
        }
        None => {
            println!("Welcome to Docket!");
            println!("Use 'dkt --help' for usage information.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn unique_temp_dir(label: &str) -> PathBuf {
        env::temp_dir().join(format!(
            "docket-main-{}-{}-{:?}-{}",
            label,
            std::process::id(),
            std::thread::current().id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    /// Set an env var for the duration of `f`, restoring the previous value.
    fn with_env_var<F: FnOnce()>(value: &str, f: F) {
        let original = env::var(DOCKET_DB_PATH_ENV).ok();
        // SAFETY: env tests are serialized and restore the original value
        unsafe { env::set_var(DOCKET_DB_PATH_ENV, value) };

        f();

        // SAFETY: as above
        unsafe {
            match original {
                Some(val) => env::set_var(DOCKET_DB_PATH_ENV, val),
                None => env::remove_var(DOCKET_DB_PATH_ENV),
            }
        }
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["dkt"]).unwrap();
        assert!(args.db.is_none());
        assert!(args.command.is_none());
    }

    #[test]
    fn test_args_with_db_path() {
        let args = Args::try_parse_from(["dkt", "--db", "/tmp/test-db"]).unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/test-db")));
    }

    #[test]
    fn test_db_flag_is_global() {
        let args =
            Args::try_parse_from(["dkt", "project", "list", "--db", "/custom/path"]).unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/custom/path")));
        assert!(args.command.is_some());
    }

    #[test]
    fn test_project_add_requires_start() {
        let result = Args::try_parse_from(["dkt", "project", "add", "Website"]);
        match result {
            Err(e) => assert!(e.to_string().contains("--start"), "got: {}", e),
            Ok(_) => panic!("Expected error for missing --start"),
        }
    }

    #[test]
    fn test_project_add_rejects_bad_date() {
        let result =
            Args::try_parse_from(["dkt", "project", "add", "Website", "--start", "yesterday"]);
        match result {
            Err(e) => assert!(e.to_string().contains("yesterday"), "got: {}", e),
            Ok(_) => panic!("Expected error for invalid date"),
        }
    }

    #[test]
    fn test_task_add_rejects_bad_status() {
        let result =
            Args::try_parse_from(["dkt", "task", "add", "p1", "Draft", "--status", "blocked"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_project_list_accepts_all_filters() {
        let args = Args::try_parse_from([
            "dkt",
            "project",
            "list",
            "--order-by",
            "priority desc,name",
            "--min-priority",
            "1",
            "--max-priority",
            "5",
            "--min-start",
            "2024-01-01",
            "--max-completion",
            "2024-12-31T00:00:00Z",
        ])
        .unwrap();
        let debug = format!("{:?}", args.command.unwrap());
        assert!(debug.contains("priority desc,name"));
    }

    #[tokio::test]
    async fn test_run_with_args_no_command() {
        let temp_dir = unique_temp_dir("welcome");
        let args = Args {
            db: Some(temp_dir.clone()),
            command: None,
        };

        let result = run_with_args(&args).await;
        assert!(result.is_ok(), "run_with_args failed: {:?}", result.err());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[tokio::test]
    async fn test_run_with_project_add() {
        let temp_dir = unique_temp_dir("add");
        let args = Args::try_parse_from([
            "dkt",
            "--db",
            temp_dir.to_str().unwrap(),
            "project",
            "add",
            "Website",
            "--start",
            "2024-01-01",
            "--priority",
            "3",
        ])
        .unwrap();

        let result = run_with_args(&args).await;
        assert!(result.is_ok(), "project add failed: {:?}", result.err());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn test_resolve_db_path_cli_takes_priority() {
        let cli_path = PathBuf::from("/custom/path");
        let result = resolve_db_path(Some(cli_path.clone()));
        assert_eq!(result.unwrap(), cli_path);
    }

    #[test]
    #[serial]
    fn test_resolve_db_path_env_var_takes_priority_over_default() {
        with_env_var("/env/path", || {
            let result = resolve_db_path(None);
            assert_eq!(result.unwrap(), PathBuf::from("/env/path"));
        });
    }

    #[test]
    #[serial]
    fn test_resolve_db_path_cli_beats_env_var() {
        with_env_var("/env/path", || {
            let result = resolve_db_path(Some(PathBuf::from("/cli/path")));
            assert_eq!(result.unwrap(), PathBuf::from("/cli/path"));
        });
    }

    #[test]
    #[serial]
    fn test_resolve_db_path_empty_env_var_uses_default() {
        with_env_var("", || {
            let path = resolve_db_path(None).unwrap();
            assert!(
                path.ends_with(".docket/data"),
                "Expected path ending with .docket/data, got: {:?}",
                path
            );
        });
    }
}
