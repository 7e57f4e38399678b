//! Strategy registry.
//!
//! Holds one implementation per [`StrategyKind`] so the resolver can turn a
//! configured identifier into a strategy without open-ended lookup.

use std::sync::Arc;

use super::strategy::Strategy;
use crate::spec::StrategyKind;

/// One registered strategy for each [`StrategyKind`].
#[derive(Clone)]
pub struct StrategySet {
    host: Arc<dyn Strategy>,
    url: Arc<dyn Strategy>,
    source: Arc<dyn Strategy>,
}

impl StrategySet {
    /// Register the three strategies.
    #[must_use]
    pub fn new<H, U, S>(host: H, url: U, source: S) -> Self
    where
        H: Strategy + 'static,
        U: Strategy + 'static,
        S: Strategy + 'static,
    {
        Self::from_arcs(Arc::new(host), Arc::new(url), Arc::new(source))
    }

    /// Register strategies that are already shared.
    ///
    /// Useful when a caller keeps a handle, e.g. to inspect an instrumented
    /// strategy after resolution.
    #[must_use]
    pub fn from_arcs(
        host: Arc<dyn Strategy>,
        url: Arc<dyn Strategy>,
        source: Arc<dyn Strategy>,
    ) -> Self {
        debug_assert_eq!(host.kind(), StrategyKind::Host);
        debug_assert_eq!(url.kind(), StrategyKind::Url);
        debug_assert_eq!(source.kind(), StrategyKind::Source);
        Self { host, url, source }
    }

    /// Get the strategy for a kind.
    #[must_use]
    pub fn get(&self, kind: StrategyKind) -> &Arc<dyn Strategy> {
        match kind {
            StrategyKind::Host => &self.host,
            StrategyKind::Url => &self.url,
            StrategyKind::Source => &self.source,
        }
    }
}

impl std::fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategySet")
            .field("host", &self.host.description())
            .field("url", &self.url.description())
            .field("source", &self.source.description())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyError;
    use crate::spec::ToolSpec;
    use crate::tools::strategy::{Artifact, ResolutionContext, StrategyResult};
    use async_trait::async_trait;

    struct Named {
        kind: StrategyKind,
        description: &'static str,
    }

    #[async_trait]
    impl Strategy for Named {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn description(&self) -> &'static str {
            self.description
        }

        fn needs_network(&self, _spec: &ToolSpec, _ctx: &ResolutionContext) -> bool {
            false
        }

        async fn provide(
            &self,
            _spec: &ToolSpec,
            _ctx: &ResolutionContext,
        ) -> StrategyResult<Artifact> {
            Err(StrategyError::not_found(self.description))
        }
    }

    fn named(kind: StrategyKind, description: &'static str) -> Named {
        Named { kind, description }
    }

    #[test]
    fn test_get_dispatches_on_kind() {
        let set = StrategySet::new(
            named(StrategyKind::Host, "host"),
            named(StrategyKind::Url, "url"),
            named(StrategyKind::Source, "source"),
        );
        for kind in StrategyKind::ALL {
            assert_eq!(set.get(kind).kind(), kind);
            assert_eq!(set.get(kind).description(), kind.as_str());
        }
        let debug = format!("{set:?}");
        assert!(debug.starts_with("StrategySet"));
        assert!(debug.contains("source"));
    }
}
