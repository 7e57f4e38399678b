//! Strategy abstraction for obtaining tool executables.
//!
//! Each way of producing an executable (host search, verified download,
//! source build) implements [`Strategy`]. The set of strategies is closed:
//! [`StrategySet`] holds exactly one implementation per [`StrategyKind`] and
//! the resolver dispatches on the kind named in the tool's configuration.
//!
//! # Architecture
//!
//! - [`Strategy`] - Trait implemented by each acquisition method
//! - [`StrategySet`] - One registered implementation per [`StrategyKind`]
//! - [`ResolutionContext`] - Read-only runtime parameters (platform, offline)
//! - [`Artifact`] - What a strategy hands back to the resolver
//!
//! # Example
//!
//! ```ignore
//! use bu_core::tools::{ResolutionContext, StrategySet};
//!
//! let strategies = StrategySet::new(
//!     HostLookup::new(),
//!     UrlDownload::new()?,
//!     CargoSourceBuild::new(),
//! );
//! let ctx = ResolutionContext::new(PlatformTriple::current()?, offline);
//! let artifact = strategies.get(StrategyKind::Url).provide(&spec, &ctx).await?;
//! ```
//!
//! [`StrategyKind`]: crate::StrategyKind

mod registry;
mod strategy;

pub use registry::StrategySet;
pub use strategy::{Artifact, ResolutionContext, StagedArtifact, Strategy, StrategyResult};
