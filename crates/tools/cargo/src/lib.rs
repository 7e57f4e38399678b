//! Build-from-source strategy for bu.
//!
//! Runs `cargo install --git <git_url>` into a private, temporary install
//! root and hands the resulting binary to the resolver, which copies it into
//! the cache. The install root is removed once the artifact is dropped.
//!
//! The tool version is passed as `--rev` unless it is `latest`, in which case
//! the repository's default branch is built.

use async_trait::async_trait;
use bu_core::cache::executable_name;
use bu_core::{
    Artifact, ResolutionContext, StagedArtifact, Strategy, StrategyError, StrategyKind,
    StrategyResult, ToolSpec, is_local_url,
};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Lines of build output kept in a [`StrategyError::BuildFailed`].
const OUTPUT_TAIL_LINES: usize = 40;

/// Strategy that builds a tool with `cargo install`.
#[derive(Debug, Clone)]
pub struct CargoSourceBuild {
    program: OsString,
}

impl Default for CargoSourceBuild {
    fn default() -> Self {
        Self::new()
    }
}

impl CargoSourceBuild {
    /// Use `cargo` from the search path.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("cargo")
    }

    /// Use a specific cargo executable.
    #[must_use]
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, spec: &ToolSpec, git_url: &str, root: &Path, offline: bool) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("install").arg("--git").arg(git_url);
        if !spec.is_latest() {
            cmd.arg("--rev").arg(spec.version());
        }
        cmd.arg("--root").arg(root);
        if offline {
            cmd.arg("--offline");
        }
        if !tracing::enabled!(tracing::Level::DEBUG) {
            cmd.arg("--quiet");
        }
        cmd.env("CARGO_TERM_COLOR", "never")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Whether a git location can be built without the network.
///
/// `file://` URLs and filesystem paths qualify; anything with a remote
/// scheme or scp-style `host:path` does not.
#[must_use]
pub fn is_local_git(url: &str) -> bool {
    if is_local_url(url) {
        return true;
    }
    let path = Path::new(url);
    path.is_absolute() || url.starts_with("./") || url.starts_with("../")
}

fn tail(bytes: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[async_trait]
impl Strategy for CargoSourceBuild {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Source
    }

    fn description(&self) -> &'static str {
        "Build from git_url with cargo install"
    }

    fn needs_network(&self, spec: &ToolSpec, _ctx: &ResolutionContext) -> bool {
        spec.git_url().is_some_and(|url| !is_local_git(url))
    }

    #[instrument(
        name = "source_build",
        skip_all,
        fields(tool = spec.name(), version = spec.version())
    )]
    async fn provide(&self, spec: &ToolSpec, ctx: &ResolutionContext) -> StrategyResult<Artifact> {
        let git_url = spec
            .git_url()
            .ok_or_else(|| StrategyError::not_found(format!("{} has no git_url", spec.name())))?;

        if ctx.offline() && !is_local_git(git_url) {
            return Err(StrategyError::offline(format!(
                "cannot fetch sources from {git_url}"
            )));
        }

        let root = tempfile::Builder::new()
            .prefix(&format!("bu-build-{}-", spec.name()))
            .tempdir()
            .map_err(|e| StrategyError::io(e, "create install root"))?;

        info!(%git_url, offline = ctx.offline(), "Building tool from source");
        let output = self
            .command(spec, git_url, root.path(), ctx.offline())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StrategyError::not_found(format!(
                        "{} is not installed",
                        self.program.to_string_lossy()
                    ))
                } else {
                    StrategyError::io(e, "spawn cargo")
                }
            })?;

        if !output.status.success() {
            let mut diagnostics = tail(&output.stderr, OUTPUT_TAIL_LINES);
            if diagnostics.is_empty() {
                diagnostics = tail(&output.stdout, OUTPUT_TAIL_LINES);
            }
            return Err(StrategyError::BuildFailed {
                status: output.status.to_string(),
                output: diagnostics,
            });
        }

        let binary = root.path().join("bin").join(executable_name(spec.name()));
        if !binary.is_file() {
            return Err(StrategyError::not_found(format!(
                "cargo install did not produce {}",
                binary.display()
            )));
        }

        debug!(path = ?binary, "Build finished");
        Ok(Artifact::Staged(StagedArtifact::new(root, binary)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bu_core::PlatformTriple;

    fn ctx(offline: bool) -> ResolutionContext {
        ResolutionContext::new(PlatformTriple::X86_64_LINUX_MUSL, offline)
    }

    fn spec(version: &str, git_url: &str) -> ToolSpec {
        ToolSpec::builder("buck2", version)
            .git_url(git_url)
            .strategy(StrategyKind::Source)
            .build()
            .unwrap()
    }

    #[test]
    fn test_local_git_detection() {
        assert!(is_local_git("file:///srv/git/buck2"));
        assert!(is_local_git("/srv/git/buck2"));
        assert!(is_local_git("../buck2"));
        assert!(!is_local_git("https://github.com/facebook/buck2"));
        assert!(!is_local_git("git@github.com:facebook/buck2.git"));
    }

    #[test]
    fn test_needs_network() {
        let build = CargoSourceBuild::new();
        let remote = spec("latest", "https://github.com/facebook/buck2");
        assert!(build.needs_network(&remote, &ctx(true)));
        assert!(!build.needs_network(&spec("latest", "/srv/git/buck2"), &ctx(true)));
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let out = b"a\nb\nc\nd\n";
        assert_eq!(tail(out, 2), "c\nd");
        assert_eq!(tail(out, 10), "a\nb\nc\nd");
    }

    #[tokio::test]
    async fn test_offline_remote_is_rejected_without_running_cargo() {
        let build = CargoSourceBuild::with_program("/nonexistent/cargo");
        let err = build
            .provide(&spec("latest", "https://github.com/facebook/buck2"), &ctx(true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "OfflineViolation");
    }

    #[tokio::test]
    async fn test_missing_cargo_is_not_found() {
        let build = CargoSourceBuild::with_program("/nonexistent/cargo");
        let err = build
            .provide(&spec("latest", "https://github.com/facebook/buck2"), &ctx(false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[cfg(unix)]
    mod fake_cargo {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Write a stand-in for cargo that logs its arguments to `args`.
        fn script(dir: &Path, body: &str) -> std::path::PathBuf {
            let path = dir.join("cargo");
            let args = dir.join("args");
            let content = format!("#!/bin/sh\necho \"$@\" > '{}'\n{body}\n", args.display());
            std::fs::write(&path, content).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        const INSTALLS: &str = r#"root=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--root" ]; then root="$2"; fi
  shift
done
mkdir -p "$root/bin"
printf 'built buck2' > "$root/bin/buck2""#;

        #[tokio::test]
        async fn test_builds_into_private_root() {
            let dir = TempDir::new().unwrap();
            let build = CargoSourceBuild::with_program(script(dir.path(), INSTALLS));

            let artifact = build
                .provide(&spec("v2024.01.01", "https://github.com/facebook/buck2"), &ctx(false))
                .await
                .unwrap();

            let Artifact::Staged(staged) = artifact else {
                panic!("source build must stage its output");
            };
            assert_eq!(std::fs::read(staged.path()).unwrap(), b"built buck2");
            let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
            assert!(args.starts_with(
                "install --git https://github.com/facebook/buck2 --rev v2024.01.01 --root "
            ));
            assert!(!args.contains("--offline"));

            let root = staged.dir().to_path_buf();
            drop(staged);
            assert!(!root.exists());
        }

        #[tokio::test]
        async fn test_offline_local_source_passes_offline_flag() {
            let dir = TempDir::new().unwrap();
            let build = CargoSourceBuild::with_program(script(dir.path(), INSTALLS));

            build
                .provide(&spec("latest", "file:///srv/git/buck2"), &ctx(true))
                .await
                .unwrap();

            let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
            assert!(args.contains("--offline"));
            assert!(!args.contains("--rev"));
        }

        #[tokio::test]
        async fn test_failed_build_carries_output() {
            let dir = TempDir::new().unwrap();
            let failing = "echo 'error[E0425]: cannot find value `x`' >&2\nexit 101";
            let build = CargoSourceBuild::with_program(script(dir.path(), failing));

            let err = build
                .provide(&spec("latest", "https://github.com/facebook/buck2"), &ctx(false))
                .await
                .unwrap_err();

            match err {
                StrategyError::BuildFailed { status, output } => {
                    assert!(status.contains("101"));
                    assert!(output.contains("error[E0425]"));
                }
                other => panic!("expected build failure, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_missing_binary_after_build() {
            let dir = TempDir::new().unwrap();
            let build = CargoSourceBuild::with_program(script(dir.path(), "exit 0"));

            let err = build
                .provide(&spec("latest", "https://github.com/facebook/buck2"), &ctx(false))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "NotFound");
        }
    }
}
