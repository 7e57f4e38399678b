//! On-disk cache of materialized tool executables.
//!
//! Entries are keyed by `(tool, version)` and the layout is part of the
//! persisted state, so it must stay stable:
//!
//! ```text
//! ~/.bu/cache/
//! ├── .staging/            # in-flight inserts, never visible to lookup
//! └── buck2/
//!     └── 2024-01-01/
//!         └── buck2        # exactly one executable, named after the tool
//! ```
//!
//! Inserts copy the artifact into a private staging directory and then rename
//! that directory into place. A concurrent `lookup` therefore sees either no
//! entry or a complete one. When two processes race on the same key the first
//! rename wins and the loser's copy is discarded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::{Error, Result};

const STAGING_DIR: &str = ".staging";

/// A committed cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Tool name
    pub name: String,
    /// Version string
    pub version: String,
    /// Path of the cached executable
    pub path: PathBuf,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
    /// Size of the executable in bytes
    pub size: u64,
}

/// Version-keyed executable cache.
///
/// Default location: `~/.bu/cache/`
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the entry for `(name, version)`.
    #[must_use]
    pub fn entry_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    /// Path the executable for `(name, version)` has once cached.
    #[must_use]
    pub fn executable_path(&self, name: &str, version: &str) -> PathBuf {
        self.entry_dir(name, version).join(executable_name(name))
    }

    /// Look up a committed entry.
    ///
    /// Only the presence of the entry directory is checked; whether the file
    /// inside is still runnable is verified at dispatch time.
    #[must_use]
    pub fn lookup(&self, name: &str, version: &str) -> Option<PathBuf> {
        let dir = self.entry_dir(name, version);
        if dir.is_dir() {
            let path = dir.join(executable_name(name));
            trace!(name, version, ?path, "Cache hit");
            Some(path)
        } else {
            trace!(name, version, "Cache miss");
            None
        }
    }

    /// Store a copy of `source` as the executable for `(name, version)`.
    ///
    /// If another process committed the same key first, its entry is kept
    /// and returned.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if staging or committing the entry fails. No
    /// partial entry is left behind in that case.
    pub fn insert(&self, name: &str, version: &str, source: &Path) -> Result<CacheEntry> {
        let staging_root = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging_root)
            .map_err(|e| Error::io(e, &staging_root, "create_dir_all"))?;

        // Removed on drop, including when the caller's future is cancelled
        let staged = tempfile::Builder::new()
            .prefix(&format!("{name}-{version}-"))
            .tempdir_in(&staging_root)
            .map_err(|e| Error::io(e, &staging_root, "create staging directory"))?;

        let staged_exe = staged.path().join(executable_name(name));
        fs::copy(source, &staged_exe).map_err(|e| Error::io(e, source, "copy"))?;
        set_executable(&staged_exe)?;
        fs::File::open(&staged_exe)
            .and_then(|f| f.sync_all())
            .map_err(|e| Error::io(e, &staged_exe, "sync"))?;

        let tool_dir = self.root.join(name);
        fs::create_dir_all(&tool_dir).map_err(|e| Error::io(e, &tool_dir, "create_dir_all"))?;

        let dest = self.entry_dir(name, version);
        match fs::rename(staged.path(), &dest) {
            Ok(()) => {
                info!(name, version, path = ?dest, "Stored tool in cache");
            }
            Err(e) if dest.is_dir() => {
                debug!(name, version, error = %e, "Lost insert race, keeping existing entry");
            }
            Err(e) => return Err(Error::io(e, &dest, "rename")),
        }
        drop(staged);

        self.entry(name, version)
    }

    /// Read the metadata of a committed entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheCorruption`] if the entry's executable is gone.
    pub fn entry(&self, name: &str, version: &str) -> Result<CacheEntry> {
        let path = self.executable_path(name, version);
        let meta = fs::metadata(&path).map_err(|_| Error::cache_corruption(&path))?;
        let created_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(CacheEntry {
            name: name.to_string(),
            version: version.to_string(),
            path,
            created_at,
            size: meta.len(),
        })
    }

    /// Enumerate committed entries, sorted by tool then version.
    ///
    /// Broken entries are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the cache directories cannot be read.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for tool in read_subdirs(&self.root)? {
            if tool == STAGING_DIR {
                continue;
            }
            for version in read_subdirs(&self.root.join(&tool))? {
                match self.entry(&tool, &version) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => warn!(tool, version, error = %e, "Skipping broken cache entry"),
                }
            }
        }
        entries.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        Ok(entries)
    }

    /// Remove every entry, leaving an empty root.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if removal fails.
    pub fn clear(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| Error::io(e, &self.root, "remove_dir_all"))?;
        }
        fs::create_dir_all(&self.root).map_err(|e| Error::io(e, &self.root, "create_dir_all"))?;
        info!(root = ?self.root, "Cleared tool cache");
        Ok(())
    }
}

/// Default cache root: `~/.bu/cache`.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bu")
        .join("cache")
}

/// File name of a tool's executable on the current host.
#[must_use]
pub fn executable_name(name: &str) -> String {
    format!("{name}{}", std::env::consts::EXE_SUFFIX)
}

/// Fail with [`Error::CacheCorruption`] unless `path` is a runnable file.
///
/// # Errors
///
/// Returns a cache corruption error when the file is missing, not a regular
/// file, or (on Unix) lacks every execute bit.
pub fn ensure_runnable(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|_| Error::cache_corruption(path))?;
    if !meta.is_file() {
        return Err(Error::cache_corruption(path));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(Error::cache_corruption(path));
        }
    }
    Ok(())
}

/// Set the executable bits on `path` (no-op off Unix).
///
/// # Errors
///
/// Returns an I/O error if the permissions cannot be changed.
pub fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(|e| Error::io(e, path, "metadata"))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).map_err(|e| Error::io(e, path, "set_permissions"))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn read_subdirs(dir: &Path) -> Result<Vec<String>> {
    let iter = match fs::read_dir(dir) {
        Ok(iter) => iter,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(e, dir, "read_dir")),
    };
    let mut names = Vec::new();
    for entry in iter {
        let entry = entry.map_err(|e| Error::io(e, dir, "read_dir"))?;
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
