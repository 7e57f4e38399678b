//! Subcommand handlers.
//!
//! Every handler prints its own output and returns the process exit code.

// Handlers write their results to stdout
#![allow(clippy::print_stdout)]

pub mod cache;
pub mod tool;

use bu_core::{
    CacheStore, PlatformTriple, Resolution, ResolutionContext, Resolver, StrategySet, ToolSpec,
    default_cache_dir,
};
use bu_tools_cargo::CargoSourceBuild;
use bu_tools_host::HostLookup;
use bu_tools_url::UrlDownload;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::cli::{
    CacheCommands, Cli, CliError, Commands, EXIT_OK, OkEnvelope, generate_completions,
};
use crate::config::Config;
use crate::project::{self, ProjectType};

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Forbid network access
    pub offline: bool,
    /// Cache root
    pub cache_dir: PathBuf,
    /// Emit JSON envelopes instead of text
    pub json: bool,
}

impl Settings {
    /// Settings from parsed arguments, defaulting the cache to `~/.bu/cache`.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            offline: cli.offline,
            cache_dir: cli.cache_dir.clone().unwrap_or_else(default_cache_dir),
            json: cli.json,
        }
    }
}

/// What would be resolved for a project directory.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Detected ecosystem
    pub project_type: ProjectType,
    /// Tool definition after merging config and version files
    pub spec: ToolSpec,
    /// Config files that contributed
    pub config_files: Vec<PathBuf>,
}

impl Plan {
    /// Detect the project in `dir` and load its configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no project is recognised or the
    /// config files are invalid.
    pub fn load(dir: &Path) -> Result<Self, CliError> {
        let config = Config::load(dir)?;
        Self::new(dir, &config)
    }

    /// Build a plan for `dir` with an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no project is recognised or the
    /// tool definition is invalid.
    pub fn new(dir: &Path, config: &Config) -> Result<Self, CliError> {
        let project_type = project::detect(dir).ok_or_else(|| {
            CliError::config_with_help(
                format!("No supported project found in {}", dir.display()),
                format!("Supported: {}", project::supported_summary()),
            )
        })?;
        let version = project_type.version(dir);
        let spec = config.tool_spec(project_type.tool_name(), version.as_deref())?;
        debug!(%project_type, tool = spec.name(), version = spec.version(), "Planned resolution");
        Ok(Self {
            project_type,
            spec,
            config_files: config.sources().to_vec(),
        })
    }

    /// Resolve the planned tool.
    ///
    /// # Errors
    ///
    /// Returns a resolution error carrying every strategy's failure.
    #[instrument(skip_all, fields(tool = self.spec.name()))]
    pub async fn resolve(&self, settings: &Settings) -> Result<Resolution, CliError> {
        let resolver = build_resolver(&settings.cache_dir)?;
        let ctx = ResolutionContext::new(PlatformTriple::current()?, settings.offline);
        Ok(resolver.resolve(&self.spec, &ctx).await?)
    }
}

/// Resolver over the production strategies.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn build_resolver(cache_dir: &Path) -> Result<Resolver, CliError> {
    let url = UrlDownload::new()
        .map_err(|e| CliError::other(format!("Failed to initialize downloader: {e}")))?;
    let strategies = StrategySet::new(HostLookup::new(), url, CargoSourceBuild::new());
    Ok(Resolver::new(CacheStore::new(cache_dir), strategies))
}

/// Current working directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be determined.
pub fn current_dir() -> Result<PathBuf, CliError> {
    std::env::current_dir()
        .map_err(|e| CliError::other(format!("Failed to read current directory: {e}")))
}

/// Print `data` wrapped in an ok envelope.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize>(data: T) -> Result<(), CliError> {
    let json = serde_json::to_string(&OkEnvelope::new(data))
        .map_err(|e| CliError::other(format!("Failed to serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Run commands that never resolve a tool, without an async runtime.
///
/// Returns `None` for commands that need [`execute`].
#[must_use]
pub fn execute_local(cli: &Cli) -> Option<Result<i32, CliError>> {
    match &cli.command {
        Some(Commands::Cache { command }) => {
            let settings = Settings::from_cli(cli);
            let store = CacheStore::new(&settings.cache_dir);
            Some(match command {
                CacheCommands::List => cache::list(&store, settings.json),
                CacheCommands::Clean => cache::clean(&store, settings.json),
            })
        }
        Some(Commands::Completions { shell }) => {
            print!("{}", generate_completions(*shell));
            Some(Ok(EXIT_OK))
        }
        Some(Commands::Which | Commands::Config) | None => None,
    }
}

/// Run the parsed command line.
///
/// # Errors
///
/// Returns the first error encountered; the caller maps it to an exit code.
pub async fn execute(cli: Cli) -> Result<i32, CliError> {
    if let Some(result) = execute_local(&cli) {
        return result;
    }
    let settings = Settings::from_cli(&cli);
    let dir = current_dir()?;
    match cli.command {
        Some(Commands::Which) => tool::which(&dir, &settings).await,
        Some(Commands::Config) => tool::config(&dir, &settings).await,
        _ => tool::run(&dir, &settings, &cli.args).await,
    }
}
