//! `bu cache list` and `bu cache clean`.

use bu_core::{CacheEntry, CacheStore};
use serde::Serialize;

use super::print_json;
use crate::cli::{CliError, EXIT_OK};

/// Print every cached `(tool, version)`.
///
/// # Errors
///
/// Returns an error if the cache directory cannot be read.
pub fn list(store: &CacheStore, json: bool) -> Result<i32, CliError> {
    let entries = store.entries()?;
    if json {
        print_json(&entries)?;
        return Ok(EXIT_OK);
    }
    if entries.is_empty() {
        println!("Cache is empty");
        return Ok(EXIT_OK);
    }
    for entry in &entries {
        println!("{}", render_entry(entry));
    }
    Ok(EXIT_OK)
}

#[derive(Debug, Serialize)]
struct Cleaned {
    cleaned: bool,
}

/// Remove every cached tool.
///
/// # Errors
///
/// Returns an error if an entry cannot be removed.
pub fn clean(store: &CacheStore, json: bool) -> Result<i32, CliError> {
    store.clear()?;
    if json {
        print_json(Cleaned { cleaned: true })?;
    } else {
        println!("Cache cleaned");
    }
    Ok(EXIT_OK)
}

fn render_entry(entry: &CacheEntry) -> String {
    let key = format!("{}@{}", entry.name, entry.version);
    format!(
        "{key:<30} {:>10}  {}",
        format_size(entry.size),
        entry.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Human-readable byte count.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}
