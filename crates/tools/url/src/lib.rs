//! Verified URL download strategy for bu.
//!
//! Downloads a prebuilt executable from a templated URL. Supports:
//! - Template variables: `{version}` and `{platform}` (a target triple such
//!   as `x86_64-unknown-linux-musl`)
//! - `http(s)://` and `file://` sources
//! - SHA-256 verification of the downloaded bytes
//! - zstd-compressed artifacts (`.zst` suffix or zstd frame magic)

use async_trait::async_trait;
use bu_core::cache::{executable_name, set_executable};
use bu_core::{
    Artifact, ChecksumVerifier, PlatformTriple, ResolutionContext, StagedArtifact, Strategy,
    StrategyError, StrategyKind, StrategyResult, ToolSpec, is_local_url,
};
use reqwest::{Client, Url};
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// First four bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Strategy that downloads a tool from `url_template`.
#[derive(Debug, Clone)]
pub struct UrlDownload {
    client: Client,
}

impl UrlDownload {
    /// Create a new download strategy.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client (TLS backend) cannot be
    /// initialized.
    pub fn new() -> StrategyResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("bu/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StrategyError::transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch the raw bytes behind `url`.
    async fn fetch(&self, url: &str) -> StrategyResult<Vec<u8>> {
        if is_local_url(url) {
            let path = file_url_path(url)?;
            debug!(?path, "Reading local artifact");
            return tokio::fs::read(&path).await.map_err(|e| {
                StrategyError::transport(format!("failed to read {}: {e}", path.display()))
            });
        }

        debug!(%url, "Downloading artifact");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StrategyError::transport(format!("failed to fetch {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(StrategyError::transport(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| StrategyError::transport(format!("failed to read body of {url}: {e}")))
    }
}

/// Substitute `{version}` and `{platform}` in a URL template.
#[must_use]
pub fn expand_template(template: &str, version: &str, platform: PlatformTriple) -> String {
    template
        .replace("{version}", version)
        .replace("{platform}", &platform.to_string())
}

/// The concrete download URL for `spec` under `ctx`.
///
/// # Errors
///
/// Returns [`StrategyError::NotFound`] when the spec has no `url_template`.
pub fn resolved_url(spec: &ToolSpec, ctx: &ResolutionContext) -> StrategyResult<String> {
    let template = spec
        .url_template()
        .ok_or_else(|| StrategyError::not_found(format!("{} has no url_template", spec.name())))?;
    Ok(expand_template(template, spec.version(), ctx.platform()))
}

fn file_url_path(url: &str) -> StrategyResult<PathBuf> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .ok_or_else(|| StrategyError::transport(format!("invalid file URL: {url}")))
}

fn is_zstd(url: &str, bytes: &[u8]) -> bool {
    let path_suffix = Url::parse(url).map_or_else(
        |_| url.ends_with(".zst"),
        |u| u.path().ends_with(".zst"),
    );
    path_suffix || bytes.starts_with(&ZSTD_MAGIC)
}

fn verify(spec: &ToolSpec, url: &str, bytes: &[u8]) -> StrategyResult<()> {
    let Some(expected) = spec.sha256() else {
        warn!(tool = spec.name(), %url, "No sha256 configured, skipping checksum verification");
        return Ok(());
    };
    let actual = ChecksumVerifier::digest(bytes);
    if ChecksumVerifier::matches(expected, &actual) {
        debug!(%actual, "Checksum verified");
        Ok(())
    } else {
        Err(StrategyError::ChecksumMismatch {
            expected: expected.to_lowercase(),
            actual: actual.to_string(),
        })
    }
}

fn stage(name: &str, bytes: &[u8], compressed: bool) -> StrategyResult<StagedArtifact> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("bu-{name}-"))
        .tempdir()
        .map_err(|e| StrategyError::io(e, "create download directory"))?;
    let path = dir.path().join(executable_name(name));

    if compressed {
        let decoded = zstd::stream::decode_all(bytes)
            .map_err(|e| StrategyError::decode(format!("invalid zstd stream: {e}")))?;
        std::fs::write(&path, decoded).map_err(|e| StrategyError::io(e, "write"))?;
    } else {
        std::fs::write(&path, bytes).map_err(|e| StrategyError::io(e, "write"))?;
    }
    set_executable(&path).map_err(|e| match e {
        bu_core::Error::Io { source, .. } => StrategyError::io(source, "set_permissions"),
        other => StrategyError::io(std::io::Error::other(other), "set_permissions"),
    })?;

    Ok(StagedArtifact::new(dir, path))
}

#[async_trait]
impl Strategy for UrlDownload {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Url
    }

    fn description(&self) -> &'static str {
        "Download a prebuilt binary from url_template"
    }

    fn needs_network(&self, spec: &ToolSpec, ctx: &ResolutionContext) -> bool {
        resolved_url(spec, ctx).is_ok_and(|url| !is_local_url(&url))
    }

    #[instrument(
        name = "url_download",
        skip_all,
        fields(tool = spec.name(), version = spec.version())
    )]
    async fn provide(&self, spec: &ToolSpec, ctx: &ResolutionContext) -> StrategyResult<Artifact> {
        let url = resolved_url(spec, ctx)?;

        if ctx.offline() && !is_local_url(&url) {
            return Err(StrategyError::offline(format!("cannot download {url}")));
        }

        info!(%url, "Downloading tool");
        let bytes = self.fetch(&url).await?;
        verify(spec, &url, &bytes)?;

        let compressed = is_zstd(&url, &bytes);
        let staged = stage(spec.name(), &bytes, compressed)?;
        debug!(path = ?staged.path(), compressed, "Staged download");
        Ok(Artifact::Staged(staged))
    }
}
