//! Host search-path strategy for bu.
//!
//! Looks for an executable named after the tool on the process search path
//! (`PATH`, plus `PATHEXT` handling on Windows).
//!
//! # Version is ignored
//!
//! This is a capability check, not a version match: *any* executable with the
//! right name satisfies it, whatever `version` the tool definition asks for.
//! Put `url` or `source` ahead of `host` in a tool's strategy list when the
//! exact version matters.

use async_trait::async_trait;
use bu_core::{
    Artifact, ResolutionContext, Strategy, StrategyError, StrategyKind, StrategyResult, ToolSpec,
};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Strategy that finds a tool already installed on the host.
///
/// Results are system-owned and never cached.
#[derive(Debug, Clone, Default)]
pub struct HostLookup {
    search: Option<Search>,
}

#[derive(Debug, Clone)]
struct Search {
    paths: OsString,
    cwd: PathBuf,
}

impl HostLookup {
    /// Search the process `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Search an explicit `PATH`-style list instead of the environment.
    ///
    /// Relative entries are resolved against `cwd`.
    #[must_use]
    pub fn with_search_path(paths: impl Into<OsString>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            search: Some(Search {
                paths: paths.into(),
                cwd: cwd.into(),
            }),
        }
    }

    fn find(&self, name: &str) -> Result<PathBuf, which::Error> {
        match &self.search {
            Some(search) => which::which_in(name, Some(&search.paths), &search.cwd),
            None => which::which(name),
        }
    }
}

#[async_trait]
impl Strategy for HostLookup {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Host
    }

    fn description(&self) -> &'static str {
        "Use an executable already on PATH (any version)"
    }

    fn needs_network(&self, _spec: &ToolSpec, _ctx: &ResolutionContext) -> bool {
        false
    }

    #[instrument(name = "host_lookup", skip_all, fields(tool = spec.name()))]
    async fn provide(&self, spec: &ToolSpec, _ctx: &ResolutionContext) -> StrategyResult<Artifact> {
        match self.find(spec.name()) {
            Ok(path) => {
                debug!(?path, "Found tool on host");
                Ok(Artifact::Host(path))
            }
            Err(e) => {
                debug!(error = %e, "Tool not found on host");
                Err(StrategyError::not_found(format!(
                    "{} is not on the search path",
                    spec.name()
                )))
            }
        }
    }
}
