//! Core of `bu`: resolving a build tool to an executable.
//!
//! A [`ToolSpec`] describes one tool and the ordered strategies that may
//! produce it. The [`Resolver`] consults the [`CacheStore`] first and only
//! runs strategies on a miss, storing every non-host result so a given
//! `(tool, version)` is materialized at most once.
//!
//! Strategy implementations live in their own crates (`bu-tools-host`,
//! `bu-tools-url`, `bu-tools-cargo`) and plug in through the
//! [`Strategy`] trait.

pub mod cache;
pub mod checksum;
pub mod error;
pub mod platform;
pub mod resolver;
pub mod spec;
pub mod tools;

pub use cache::{CacheEntry, CacheStore, default_cache_dir, ensure_runnable};
pub use checksum::{ChecksumVerifier, Hex256};
pub use error::{Error, ResolutionError, Result, StrategyError, StrategyFailure};
pub use platform::{Arch, Os, PlatformTriple};
pub use resolver::{Resolution, ResolutionSource, Resolver};
pub use spec::{
    LATEST_VERSION, StrategyKind, ToolSpec, ToolSpecBuilder, is_local_url, is_path_component,
};
pub use tools::{
    Artifact, ResolutionContext, StagedArtifact, Strategy, StrategyResult, StrategySet,
};
