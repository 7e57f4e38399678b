//! Strategy trait for pluggable tool acquisition.
//!
//! This module defines the `Strategy` trait that allows different acquisition
//! methods (host search, URL download, source build) to be used uniformly by
//! the resolver.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::StrategyError;
use crate::platform::PlatformTriple;
use crate::spec::{StrategyKind, ToolSpec};

/// Result type for a single strategy attempt.
pub type StrategyResult<T> = std::result::Result<T, StrategyError>;

/// Per-invocation runtime parameters.
///
/// Built once and passed by reference through the whole chain; there is no
/// way to change it after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionContext {
    platform: PlatformTriple,
    offline: bool,
}

impl ResolutionContext {
    /// Create a new context.
    #[must_use]
    pub fn new(platform: PlatformTriple, offline: bool) -> Self {
        Self { platform, offline }
    }

    /// Target platform.
    #[must_use]
    pub fn platform(&self) -> PlatformTriple {
        self.platform
    }

    /// Whether network access is forbidden.
    #[must_use]
    pub fn offline(&self) -> bool {
        self.offline
    }
}

/// An executable materialized into a scratch directory.
///
/// The directory is deleted when this value is dropped, so a discarded or
/// cancelled artifact never outlives the resolution that produced it.
#[derive(Debug)]
pub struct StagedArtifact {
    dir: TempDir,
    path: PathBuf,
}

impl StagedArtifact {
    /// Wrap `path`, which must live inside `dir`.
    #[must_use]
    pub fn new(dir: TempDir, path: PathBuf) -> Self {
        debug_assert!(path.starts_with(dir.path()));
        Self { dir, path }
    }

    /// Path of the executable.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory that holds the executable.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// What a successful strategy returns.
#[derive(Debug)]
pub enum Artifact {
    /// An executable owned by the host system. Never cached.
    Host(PathBuf),
    /// A freshly materialized executable, to be copied into the cache.
    Staged(StagedArtifact),
}

/// One way of obtaining an executable for a [`ToolSpec`].
///
/// Implementations must honor [`ResolutionContext::offline`] on their own,
/// even though the resolver also skips network-bound strategies up front.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// The configuration identifier this strategy answers to.
    fn kind(&self) -> StrategyKind;

    /// Human-readable description for help text.
    fn description(&self) -> &'static str;

    /// Whether running for `spec` under `ctx` would touch the network.
    fn needs_network(&self, spec: &ToolSpec, ctx: &ResolutionContext) -> bool;

    /// Try to produce an executable.
    ///
    /// # Errors
    ///
    /// Returns the reason this strategy could not provide the tool. The
    /// resolver records it and moves on to the next strategy.
    async fn provide(&self, spec: &ToolSpec, ctx: &ResolutionContext) -> StrategyResult<Artifact>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_accessors() {
        let ctx = ResolutionContext::new(PlatformTriple::X86_64_LINUX_MUSL, true);
        assert_eq!(ctx.platform(), PlatformTriple::X86_64_LINUX_MUSL);
        assert!(ctx.offline());
    }

    #[test]
    fn test_staged_artifact_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("tool");
        std::fs::write(&exe, b"x").unwrap();
        let scratch = dir.path().to_path_buf();

        let staged = StagedArtifact::new(dir, exe.clone());
        assert_eq!(staged.path(), exe);
        assert_eq!(staged.dir(), scratch);
        drop(Artifact::Staged(staged));
        assert!(!scratch.exists());
    }
}
