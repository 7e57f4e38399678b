//! Tool definitions from `bu.toml`.
//!
//! Two files are read, later ones overriding earlier ones per tool:
//!
//! 1. `<config dir>/bu/bu.toml` (e.g. `~/.config/bu/bu.toml`)
//! 2. `bu.toml` in the project directory
//!
//! ```toml
//! [tools.buck2]
//! version = "2024-01-01"
//! url_template = "https://example.com/{version}/buck2-{platform}.zst"
//! sha256 = "…"
//! git_url = "https://github.com/facebook/buck2"
//! strategies = ["url", "host"]
//! ```

use bu_core::{Error, LATEST_VERSION, Result, StrategyKind, ToolSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the project and user config directories.
pub const CONFIG_FILE: &str = "bu.toml";

/// One parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Tool definitions keyed by tool name
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfig>,
}

/// How to obtain one tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Version used when the project has no version file
    pub version: Option<String>,
    /// Download URL with `{version}` and `{platform}` placeholders
    pub url_template: Option<String>,
    /// Expected SHA-256 of the downloaded bytes
    pub sha256: Option<String>,
    /// Repository to build from
    pub git_url: Option<String>,
    /// Strategy trial order
    pub strategies: Option<Vec<StrategyKind>>,
}

impl ToolConfig {
    /// Strategy order for this tool, falling back to the default order.
    ///
    /// The default tries the host first, then every strategy the tool has
    /// the fields for.
    #[must_use]
    pub fn effective_strategies(&self) -> Vec<StrategyKind> {
        if let Some(strategies) = &self.strategies {
            return strategies.clone();
        }
        let mut strategies = vec![StrategyKind::Host];
        if self.url_template.is_some() {
            strategies.push(StrategyKind::Url);
        }
        if self.git_url.is_some() {
            strategies.push(StrategyKind::Source);
        }
        strategies
    }
}

/// Merged configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    tools: BTreeMap<String, ToolConfig>,
    sources: Vec<PathBuf>,
}

impl Config {
    /// Load the user file and then the project file from `project_dir`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the file that failed to parse.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        if let Some(user) = user_config_path() {
            paths.push(user);
        }
        paths.push(project_dir.join(CONFIG_FILE));
        Self::load_from(paths)
    }

    /// Load the given files in order; missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the file that failed to parse,
    /// or an I/O error if an existing file cannot be read.
    pub fn load_from(paths: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        let mut config = Self::default();
        for path in paths {
            if !path.is_file() {
                debug!(?path, "No config file");
                continue;
            }
            let content =
                fs::read_to_string(&path).map_err(|e| Error::io(e, &path, "read config"))?;
            let file = parse(&content, &path)?;
            debug!(?path, tools = file.tools.len(), "Loaded config file");
            config.merge(file, path);
        }
        Ok(config)
    }

    /// Overlay `file`; its entries replace existing ones wholesale.
    pub fn merge(&mut self, file: ConfigFile, origin: PathBuf) {
        self.tools.extend(file.tools);
        self.sources.push(origin);
    }

    /// Configuration for a tool, if any.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.get(name)
    }

    /// Files that contributed, in load order.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Build the spec for `name`.
    ///
    /// Version precedence: `detected_version` (from a project version file),
    /// then the configured `version`, then `latest`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the resulting spec is invalid.
    pub fn tool_spec(&self, name: &str, detected_version: Option<&str>) -> Result<ToolSpec> {
        let tool = self.tools.get(name).cloned().unwrap_or_default();
        let strategies = tool.effective_strategies();
        let version = detected_version
            .map(str::to_owned)
            .or(tool.version)
            .unwrap_or_else(|| LATEST_VERSION.to_string());

        let mut builder = ToolSpec::builder(name, version).strategies(strategies);
        if let Some(template) = tool.url_template {
            builder = builder.url_template(template);
        }
        if let Some(digest) = tool.sha256 {
            builder = builder.sha256(digest);
        }
        if let Some(git_url) = tool.git_url {
            builder = builder.git_url(git_url);
        }
        builder.build()
    }
}

/// Parse one configuration file.
///
/// # Errors
///
/// Returns a configuration error (prefixed with `origin`) on syntax errors,
/// unknown keys or unknown strategy identifiers.
pub fn parse(content: &str, origin: &Path) -> Result<ConfigFile> {
    toml::from_str(content)
        .map_err(|e| Error::configuration(format!("{}: {}", origin.display(), e.message())))
}

/// `<config dir>/bu/bu.toml`, if a config directory exists on this host.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bu").join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn config(toml: &str) -> Config {
        let mut config = Config::default();
        config.merge(parse(toml, Path::new("bu.toml")).unwrap(), "bu.toml".into());
        config
    }

    #[test]
    fn test_parse_full_tool() {
        let file = parse(
            &format!(
                r#"
                [tools.buck2]
                version = "2024-01-01"
                url_template = "https://example/{{version}}/buck2-{{platform}}.zst"
                sha256 = "{DIGEST}"
                git_url = "https://github.com/facebook/buck2"
                strategies = ["url", "host"]
                "#
            ),
            Path::new("bu.toml"),
        )
        .unwrap();

        let buck2 = &file.tools["buck2"];
        assert_eq!(buck2.version.as_deref(), Some("2024-01-01"));
        assert_eq!(
            buck2.strategies,
            Some(vec![StrategyKind::Url, StrategyKind::Host])
        );
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = parse(
            "[tools.buck2]\nstrategies = [\"http\"]\n",
            Path::new("/proj/bu.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("/proj/bu.toml"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = parse("[tools.buck2]\nchecksum = \"x\"\n", Path::new("bu.toml")).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(parse("[tool.buck2]\n", Path::new("bu.toml")).is_err());
    }

    #[test]
    fn test_default_strategy_order() {
        assert_eq!(
            ToolConfig::default().effective_strategies(),
            vec![StrategyKind::Host]
        );
        let tool = ToolConfig {
            url_template: Some("https://x/{version}".into()),
            git_url: Some("https://x/repo".into()),
            ..ToolConfig::default()
        };
        assert_eq!(
            tool.effective_strategies(),
            vec![StrategyKind::Host, StrategyKind::Url, StrategyKind::Source]
        );
    }

    #[test]
    fn test_unconfigured_tool_uses_host() {
        let spec = Config::default().tool_spec("make", None).unwrap();
        assert_eq!(spec.version(), LATEST_VERSION);
        assert_eq!(spec.strategies(), &[StrategyKind::Host]);
    }

    #[test]
    fn test_version_precedence() {
        let config = config("[tools.bazel]\nversion = \"6.0.0\"\n");
        assert_eq!(
            config.tool_spec("bazel", Some("7.1.0")).unwrap().version(),
            "7.1.0"
        );
        assert_eq!(config.tool_spec("bazel", None).unwrap().version(), "6.0.0");
        assert_eq!(
            Config::default().tool_spec("bazel", None).unwrap().version(),
            "latest"
        );
    }

    #[test]
    fn test_url_strategy_without_template_is_config_error() {
        let config = config("[tools.buck2]\nstrategies = [\"url\"]\n");
        assert!(matches!(
            config.tool_spec("buck2", None),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_empty_strategy_list_is_config_error() {
        let config = config("[tools.buck2]\nstrategies = []\n");
        assert!(config.tool_spec("buck2", None).is_err());
    }

    #[test]
    fn test_project_replaces_user_entry() {
        let temp = TempDir::new().unwrap();
        let user = temp.path().join("user.toml");
        let project = temp.path().join("bu.toml");
        fs::write(
            &user,
            "[tools.buck2]\nversion = \"1\"\ngit_url = \"https://x/repo\"\n\n[tools.zig]\n\
            version = \"0.12.0\"\n",
        )
        .unwrap();
        fs::write(&project, "[tools.buck2]\nversion = \"2\"\n").unwrap();

        let config = Config::load_from([user.clone(), project.clone()]).unwrap();

        let buck2 = config.tool("buck2").unwrap();
        assert_eq!(buck2.version.as_deref(), Some("2"));
        assert!(buck2.git_url.is_none());
        assert_eq!(config.tool("zig").unwrap().version.as_deref(), Some("0.12.0"));
        assert_eq!(config.sources(), &[user, project]);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from([temp.path().join("nope.toml")]).unwrap();
        assert!(config.sources().is_empty());
        assert!(config.tool("buck2").is_none());
    }
}
