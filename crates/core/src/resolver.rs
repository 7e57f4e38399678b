//! Strategy-chain resolution with cache short-circuit.
//!
//! ```text
//! resolve(spec, ctx)
//!   ├── cache hit?  -> return cached path, no strategy runs
//!   └── for kind in spec.strategies:
//!         ├── offline && needs network -> record OfflineViolation, skip
//!         ├── provide() ok  -> host: return as-is
//!         │                    other: insert into cache, return cache path
//!         └── provide() err -> record, try next
//!       all failed -> ResolutionError::Exhausted
//! ```

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheStore;
use crate::error::{ResolutionError, StrategyError, StrategyFailure};
use crate::spec::{StrategyKind, ToolSpec};
use crate::tools::{Artifact, ResolutionContext, StrategySet};

/// Where a resolved executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// An existing cache entry; no strategy ran.
    Cache,
    /// Produced by this strategy during the current resolution.
    Strategy(StrategyKind),
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Strategy(kind) => write!(f, "{kind}"),
        }
    }
}

/// A successfully resolved executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    path: PathBuf,
    source: ResolutionSource,
}

impl Resolution {
    /// Absolute path of the executable.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How the executable was obtained.
    #[must_use]
    pub fn source(&self) -> ResolutionSource {
        self.source
    }

    /// Whether the path points into the cache and may need verification.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        match self.source {
            ResolutionSource::Cache => true,
            ResolutionSource::Strategy(kind) => kind.is_cacheable(),
        }
    }

    /// Consume into the executable path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Orchestrates the strategy chain for a [`ToolSpec`].
#[derive(Debug, Clone)]
pub struct Resolver {
    cache: CacheStore,
    strategies: StrategySet,
}

impl Resolver {
    /// Create a resolver over `cache` using `strategies`.
    #[must_use]
    pub fn new(cache: CacheStore, strategies: StrategySet) -> Self {
        Self { cache, strategies }
    }

    /// The backing cache.
    #[must_use]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Resolve `spec` to an executable.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::Exhausted`] with every strategy's failure
    /// when none succeeds, or [`ResolutionError::Cache`] if a produced
    /// artifact could not be stored.
    #[instrument(name = "resolve", skip_all, fields(tool = spec.name(), version = spec.version()))]
    pub async fn resolve(
        &self,
        spec: &ToolSpec,
        ctx: &ResolutionContext,
    ) -> Result<Resolution, ResolutionError> {
        if let Some(path) = self.cache.lookup(spec.name(), spec.version()) {
            debug!(?path, "Resolved from cache");
            return Ok(Resolution {
                path,
                source: ResolutionSource::Cache,
            });
        }

        let mut failures = Vec::with_capacity(spec.strategies().len());

        for &kind in spec.strategies() {
            let strategy = self.strategies.get(kind);

            if ctx.offline() && strategy.needs_network(spec, ctx) {
                debug!(strategy = %kind, "Skipping network-bound strategy in offline mode");
                failures.push(StrategyFailure {
                    strategy: kind,
                    error: StrategyError::offline(format!(
                        "{kind} strategy for {} needs network access",
                        spec.name()
                    )),
                });
                continue;
            }

            debug!(strategy = %kind, "Trying strategy");
            match strategy.provide(spec, ctx).await {
                Ok(artifact) => return self.commit(spec, kind, artifact),
                Err(error) => {
                    warn!(strategy = %kind, kind = error.kind(), %error, "Strategy failed");
                    failures.push(StrategyFailure {
                        strategy: kind,
                        error,
                    });
                }
            }
        }

        Err(ResolutionError::Exhausted {
            tool: spec.name().to_string(),
            version: spec.version().to_string(),
            failures,
        })
    }

    fn commit(
        &self,
        spec: &ToolSpec,
        kind: StrategyKind,
        artifact: Artifact,
    ) -> Result<Resolution, ResolutionError> {
        let path = match artifact {
            // System-owned; may change between runs
            Artifact::Host(path) => path,
            Artifact::Staged(staged) => {
                let entry = self
                    .cache
                    .insert(spec.name(), spec.version(), staged.path())?;
                entry.path
            }
        };
        info!(strategy = %kind, ?path, "Resolved tool");
        Ok(Resolution {
            path,
            source: ResolutionSource::Strategy(kind),
        })
    }
}
