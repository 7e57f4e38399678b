//! Hand-off to the resolved build tool.

use bu_core::{Resolution, ResolutionSource, ensure_runnable};
use std::path::Path;
use std::process::Command;
use tracing::{debug, instrument};

use crate::cli::CliError;

/// Check that a resolved executable can still be run.
///
/// Only cache hits are checked: a cached file may have been removed or
/// damaged since it was stored, and that is reported rather than repaired.
///
/// # Errors
///
/// Returns a cache corruption error when a cached executable is unusable.
pub fn verify(resolution: &Resolution) -> Result<(), CliError> {
    if resolution.source() == ResolutionSource::Cache {
        ensure_runnable(resolution.path())?;
    }
    Ok(())
}

/// Run `program` with `args`, inheriting stdio.
///
/// On Unix the current process is replaced and this only returns on
/// failure. Elsewhere the child's exit code is returned (1 if it had none).
///
/// # Errors
///
/// Returns an error if the program cannot be started.
#[instrument(skip(args), fields(argc = args.len()))]
pub fn run(program: &Path, args: &[String]) -> Result<i32, CliError> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    debug!("Dispatching");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = cmd.exec();
        Err(CliError::other_with_help(
            format!("Failed to execute {}: {err}", program.display()),
            "Check that the file is a valid executable for this platform",
        ))
    }

    #[cfg(not(unix))]
    {
        let status = cmd.status().map_err(|e| {
            CliError::other(format!("Failed to execute {}: {e}", program.display()))
        })?;
        Ok(status.code().unwrap_or(1))
    }
}
