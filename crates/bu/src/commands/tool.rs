//! Commands that resolve the project's tool: dispatch, `which` and `config`.

use bu_core::{ResolutionSource, StrategyKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{Plan, Settings, print_json};
use crate::cli::{CliError, EXIT_OK};
use crate::dispatch;

/// Resolve the tool and hand control to it.
///
/// # Errors
///
/// Returns an error if detection, resolution or the hand-off fails.
pub async fn run(dir: &Path, settings: &Settings, args: &[String]) -> Result<i32, CliError> {
    let plan = Plan::load(dir)?;
    let resolution = plan.resolve(settings).await?;
    dispatch::verify(&resolution)?;
    dispatch::run(resolution.path(), args)
}

#[derive(Debug, Serialize)]
struct WhichOutput<'a> {
    path: &'a Path,
}

/// Print the executable that would be run.
///
/// # Errors
///
/// Returns an error if detection or resolution fails.
pub async fn which(dir: &Path, settings: &Settings) -> Result<i32, CliError> {
    let plan = Plan::load(dir)?;
    let resolution = plan.resolve(settings).await?;
    dispatch::verify(&resolution)?;

    if settings.json {
        print_json(WhichOutput {
            path: resolution.path(),
        })?;
    } else {
        println!("{}", resolution.path().display());
    }
    Ok(EXIT_OK)
}

/// Effective configuration for the current project.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    /// Tool name
    pub tool: String,
    /// Resolved version string
    pub version: String,
    /// Strategy trial order
    pub strategies: Vec<StrategyKind>,
    /// Resolved executable
    pub path: PathBuf,
    /// `cache` or the strategy that produced the executable
    pub resolved_via: String,
    /// Detected ecosystem
    pub project_type: String,
    /// Contributing config files
    pub config_files: Vec<PathBuf>,
}

impl ConfigReport {
    fn render(&self) -> String {
        let strategies: Vec<&str> = self.strategies.iter().map(|s| s.as_str()).collect();
        let mut out = format!(
            "Tool:         {}\nVersion:      {}\nStrategies:   {}\nPath:         {}\n\
            Resolved via: {}\nProject type: {}\n",
            self.tool,
            self.version,
            strategies.join(", "),
            self.path.display(),
            self.resolved_via,
            self.project_type,
        );
        if self.config_files.is_empty() {
            out.push_str("Config file:  (none)\n");
        }
        for file in &self.config_files {
            out.push_str(&format!("Config file:  {}\n", file.display()));
        }
        out
    }
}

/// Print the effective tool configuration, resolving the tool.
///
/// # Errors
///
/// Returns an error if detection or resolution fails.
pub async fn config(dir: &Path, settings: &Settings) -> Result<i32, CliError> {
    let plan = Plan::load(dir)?;
    let resolution = plan.resolve(settings).await?;
    dispatch::verify(&resolution)?;

    let report = ConfigReport {
        tool: plan.spec.name().to_string(),
        version: plan.spec.version().to_string(),
        strategies: plan.spec.strategies().to_vec(),
        resolved_via: match resolution.source() {
            ResolutionSource::Cache => "cache".to_string(),
            ResolutionSource::Strategy(kind) => format!("{kind} strategy"),
        },
        path: resolution.into_path(),
        project_type: plan.project_type.to_string(),
        config_files: plan.config_files,
    };

    if settings.json {
        print_json(&report)?;
    } else {
        print!("{}", report.render());
    }
    Ok(EXIT_OK)
}
