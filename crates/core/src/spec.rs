//! Tool definitions.
//!
//! A [`ToolSpec`] is the immutable recipe for obtaining one tool: its name,
//! version and the ordered list of strategies to try. Specs are validated
//! once when built, so everything downstream can trust them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Version sentinel used when no version is pinned.
///
/// It is cached like any other version string: the first resolution wins.
pub const LATEST_VERSION: &str = "latest";

/// One way of obtaining an executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Search the executable search path.
    Host,
    /// Download from a templated URL.
    Url,
    /// Build from a git repository.
    Source,
}

impl StrategyKind {
    /// Every strategy, in declaration order.
    pub const ALL: [Self; 3] = [Self::Host, Self::Url, Self::Source];

    /// Identifier used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Url => "url",
            Self::Source => "source",
        }
    }

    /// Whether a successful result from this strategy is stored in the cache.
    ///
    /// Host results point at system-owned files that may change between runs.
    #[must_use]
    pub fn is_cacheable(self) -> bool {
        !matches!(self, Self::Host)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "host" => Ok(Self::Host),
            "url" => Ok(Self::Url),
            "source" => Ok(Self::Source),
            other => Err(Error::configuration(format!(
                "Unknown strategy '{other}' (expected one of: host, url, source)"
            ))),
        }
    }
}

/// Immutable acquisition recipe for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    name: String,
    version: String,
    url_template: Option<String>,
    sha256: Option<String>,
    git_url: Option<String>,
    strategies: Vec<StrategyKind>,
}

impl ToolSpec {
    /// Start building a spec for `name` at `version`.
    #[must_use]
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ToolSpecBuilder {
        ToolSpecBuilder {
            name: name.into(),
            version: version.into(),
            url_template: None,
            sha256: None,
            git_url: None,
            strategies: Vec::new(),
        }
    }

    /// Tool name; also the executable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version string, possibly [`LATEST_VERSION`].
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// URL template with `{version}` and `{platform}` placeholders.
    #[must_use]
    pub fn url_template(&self) -> Option<&str> {
        self.url_template.as_deref()
    }

    /// Expected SHA-256 of the downloaded artifact.
    #[must_use]
    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    /// Source repository for building from source.
    #[must_use]
    pub fn git_url(&self) -> Option<&str> {
        self.git_url.as_deref()
    }

    /// Strategies in trial order. Never empty.
    #[must_use]
    pub fn strategies(&self) -> &[StrategyKind] {
        &self.strategies
    }

    /// Whether the version is the `latest` sentinel.
    #[must_use]
    pub fn is_latest(&self) -> bool {
        self.version == LATEST_VERSION
    }
}

/// Builder for [`ToolSpec`]; validation happens in [`ToolSpecBuilder::build`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ToolSpecBuilder {
    name: String,
    version: String,
    url_template: Option<String>,
    sha256: Option<String>,
    git_url: Option<String>,
    strategies: Vec<StrategyKind>,
}

impl ToolSpecBuilder {
    /// Set the download URL template.
    pub fn url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = Some(template.into());
        self
    }

    /// Set the expected SHA-256 digest (hex).
    pub fn sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    /// Set the git repository used by the `source` strategy.
    pub fn git_url(mut self, url: impl Into<String>) -> Self {
        self.git_url = Some(url.into());
        self
    }

    /// Append one strategy to the trial order.
    pub fn strategy(mut self, kind: StrategyKind) -> Self {
        self.strategies.push(kind);
        self
    }

    /// Replace the trial order.
    pub fn strategies(mut self, kinds: impl IntoIterator<Item = StrategyKind>) -> Self {
        self.strategies = kinds.into_iter().collect();
        self
    }

    /// Replace the trial order from configuration identifiers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown identifier.
    pub fn strategy_names<S: AsRef<str>>(
        self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let kinds = names
            .into_iter()
            .map(|n| n.as_ref().parse::<StrategyKind>())
            .collect::<Result<Vec<_>>>()?;
        Ok(self.strategies(kinds))
    }

    /// Validate and freeze the spec.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the name or version is not a single
    /// path component, the strategy list is empty or repeats an entry, a
    /// strategy lacks the field it needs, or the digest is not 64 hex digits.
    pub fn build(self) -> Result<ToolSpec> {
        validate_component("tool name", &self.name)?;
        validate_component("version", &self.version)?;

        if self.strategies.is_empty() {
            return Err(Error::configuration(format!(
                "Tool '{}' has no strategies configured",
                self.name
            )));
        }
        for (i, kind) in self.strategies.iter().enumerate() {
            if self.strategies[..i].contains(kind) {
                return Err(Error::configuration(format!(
                    "Tool '{}' lists strategy '{kind}' more than once",
                    self.name
                )));
            }
        }
        if self.strategies.contains(&StrategyKind::Url) && self.url_template.is_none() {
            return Err(Error::configuration(format!(
                "Tool '{}' uses the 'url' strategy but has no url_template",
                self.name
            )));
        }
        if self.strategies.contains(&StrategyKind::Source) && self.git_url.is_none() {
            return Err(Error::configuration(format!(
                "Tool '{}' uses the 'source' strategy but has no git_url",
                self.name
            )));
        }
        if let Some(digest) = &self.sha256
            && (digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(Error::configuration(format!(
                "Tool '{}' has an invalid sha256 (expected 64 hex digits): {digest}",
                self.name
            )));
        }

        Ok(ToolSpec {
            name: self.name,
            version: self.version,
            url_template: self.url_template,
            sha256: self.sha256,
            git_url: self.git_url,
            strategies: self.strategies,
        })
    }
}

/// Names and versions become cache directory names.
fn validate_component(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::configuration(format!("{what} must not be empty")));
    }
    if !is_path_component(value) {
        return Err(Error::configuration(format!(
            "{what} '{value}' is not a valid path component"
        )));
    }
    Ok(())
}

/// Whether `value` can name a cache directory: non-blank, not `.` or `..`,
/// and free of path separators and NUL.
#[must_use]
pub fn is_path_component(value: &str) -> bool {
    !value.trim().is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0'])
}

/// Whether a location can be read without the network (`file://` URL).
#[must_use]
pub fn is_local_url(url: &str) -> bool {
    url.starts_with("file://")
}
