//! Command-line surface: argument parsing, error categories and rendering.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use miette::{Diagnostic, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

use crate::tracing::{LogLevel, TracingFormat};

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Tool resolution or runtime error exit code
pub const EXIT_RESOLVE: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(bu::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// No strategy could produce the tool (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(bu::cli::resolution))]
    Resolution {
        /// The error message, including the per-strategy failure chain
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(bu::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error with help text
    #[must_use]
    pub fn other_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert `bu_core::Error` to the matching `CliError` category.
impl From<bu_core::Error> for CliError {
    fn from(err: bu_core::Error) -> Self {
        match err {
            // Extract just the message to avoid "Configuration error: Configuration error:"
            bu_core::Error::Configuration { message } => Self::config(message),
            bu_core::Error::CacheCorruption { .. } => Self::other_with_help(
                err.to_string(),
                "The cache is never repaired automatically. \
                Inspect the file, then run `bu cache clean`",
            ),
            bu_core::Error::Platform { .. } => Self::other(err.to_string()),
            bu_core::Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::other_with_help(
                    format!("I/O {operation} failed{path_str}: {source}"),
                    "Check file permissions and ensure the path exists",
                )
            }
        }
    }
}

impl From<bu_core::ResolutionError> for CliError {
    fn from(err: bu_core::ResolutionError) -> Self {
        match err {
            bu_core::ResolutionError::Exhausted { .. } => Self::Resolution {
                message: err.to_string(),
                help: Some(
                    "Failures are listed in configured strategy order; the root cause may be \
                    several strategies back"
                        .to_string(),
                ),
            },
            bu_core::ResolutionError::Cache(inner) => inner.into(),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Resolution { .. } | CliError::Other { .. } => EXIT_RESOLVE,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Resolution { .. } => "resolution",
                CliError::Other { .. } => "other",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        // Flush before the process exits
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Main CLI entry point for bu.
///
/// A smart build tool wrapper.
#[derive(Parser, Debug)]
#[command(name = "bu")]
#[command(version)]
#[command(about = "A smart build tool wrapper")]
#[command(
    long_about = "A universal build tool wrapper that detects your project type, \
resolves the exact tool version it needs and runs it with your arguments.

Examples:
  bu build                    Run the detected tool's build command
  bu test                     Run tests using the detected tool
  bu --offline build          Build without touching the network
  bu which                    Show which executable would be run
  bu config                   Show the effective tool configuration
  bu cache list               List cached tools
  bu cache clean              Clear all cached tools
  bu completions bash         Generate bash completions"
)]
pub struct Cli {
    /// Forbid network access while resolving the tool.
    #[arg(
        long,
        global = true,
        help = "Never touch the network; use cached, host or local tools only"
    )]
    pub offline: bool,

    /// Shorthand for `--level debug`.
    #[arg(short, long, global = true, help = "Enable verbose output for debugging")]
    pub verbose: bool,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(
        long,
        global = true,
        help = "Log output format (written to stderr)",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    /// Emit JSON envelope regardless of format.
    #[arg(long, global = true, help = "Emit JSON envelope regardless of format")]
    pub json: bool,

    /// Cache root override.
    #[arg(
        long,
        global = true,
        env = "BU_CACHE_DIR",
        value_name = "DIR",
        help = "Tool cache directory [default: ~/.bu/cache]"
    )]
    pub cache_dir: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments to pass to the detected build tool.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "ARGS",
        help = "Arguments to pass to the detected build tool"
    )]
    pub args: Vec<String>,
}

impl Cli {
    /// Effective log level after applying `--verbose`.
    #[must_use]
    pub fn effective_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            self.level
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the resolved tool path that would be executed
    #[command(about = "Show the resolved tool path that would be executed")]
    Which,

    /// Show effective configuration (detected tool, version, strategies)
    #[command(about = "Show effective configuration (detected tool, version, strategies)")]
    Config,

    /// Cache management commands
    #[command(about = "Cache management commands")]
    Cache {
        /// Cache subcommand
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completions")]
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Cache management subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCommands {
    /// List cached tools
    #[command(about = "List cached tools")]
    List,

    /// Remove all cached tools
    #[command(about = "Remove all cached tools")]
    Clean,
}

/// Parse process arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Render a completion script for `shell`.
#[must_use]
pub fn generate_completions(shell: Shell) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, "bu", &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_no_args() {
        let cli = Cli::try_parse_from(["bu"]).unwrap();
        assert!(!cli.offline);
        assert!(!cli.verbose);
        assert!(!cli.json);
        assert!(cli.command.is_none());
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_cli_parsing_with_tool_args() {
        let cli = Cli::try_parse_from(["bu", "build", "--release"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.args, vec!["build", "--release"]);
    }

    #[test]
    fn test_flags_after_tool_args_are_passed_through() {
        let cli = Cli::try_parse_from(["bu", "--offline", "test", "--offline", "-v"]).unwrap();
        assert!(cli.offline);
        assert!(!cli.verbose);
        assert_eq!(cli.args, vec!["test", "--offline", "-v"]);
    }

    #[test]
    fn test_cli_parsing_verbose() {
        let cli = Cli::try_parse_from(["bu", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.effective_level(), LogLevel::Debug));

        let cli = Cli::try_parse_from(["bu", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_default_level_is_warn() {
        let cli = Cli::try_parse_from(["bu"]).unwrap();
        assert!(matches!(cli.effective_level(), LogLevel::Warn));
        assert!(matches!(cli.log_format, TracingFormat::Compact));
    }

    #[test]
    fn test_cli_parsing_subcommands() {
        let cli = Cli::try_parse_from(["bu", "which"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Which)));

        let cli = Cli::try_parse_from(["bu", "config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config)));

        let cli = Cli::try_parse_from(["bu", "cache", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Cache {
                command: CacheCommands::List
            })
        ));

        let cli = Cli::try_parse_from(["bu", "cache", "clean"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Cache {
                command: CacheCommands::Clean
            })
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bu", "which", "--offline", "--json"]).unwrap();
        assert!(cli.offline);
        assert!(cli.json);
    }

    #[test]
    fn test_cache_dir_flag() {
        let cli =
            Cli::try_parse_from(["bu", "--cache-dir", "/tmp/bu-cache", "cache", "list"]).unwrap();
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/bu-cache")));
    }

    #[test]
    fn test_completions_subcommand() {
        let cli = Cli::try_parse_from(["bu", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Bash })
        ));
        assert!(generate_completions(Shell::Bash).contains("bu"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&CliError::config("x")), EXIT_CLI);
        assert_eq!(exit_code_for(&CliError::other("x")), EXIT_RESOLVE);
        let exhausted = bu_core::ResolutionError::Exhausted {
            tool: "buck2".into(),
            version: "latest".into(),
            failures: Vec::new(),
        };
        assert_eq!(exit_code_for(&exhausted.into()), EXIT_RESOLVE);
    }

    #[test]
    fn test_configuration_error_keeps_message() {
        let err: CliError = bu_core::Error::configuration("bad strategy").into();
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: bad strategy");
    }

    #[test]
    fn test_cache_corruption_is_not_config() {
        let err: CliError = bu_core::Error::cache_corruption("/tmp/cache/buck2/1/buck2").into();
        assert!(matches!(err, CliError::Other { help: Some(_), .. }));
        assert!(err.to_string().contains("/tmp/cache/buck2/1/buck2"));
    }

    #[test]
    fn test_resolution_cache_failure_maps_to_inner() {
        let err: CliError =
            bu_core::ResolutionError::Cache(bu_core::Error::configuration("bad")).into();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn test_envelopes_serialize() {
        let ok = serde_json::to_value(OkEnvelope::new(serde_json::json!({"path": "/bin/make"})))
            .unwrap();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["data"]["path"], "/bin/make");

        let err = serde_json::to_value(ErrorEnvelope::new("boom")).unwrap();
        assert_eq!(err["status"], "error");
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
