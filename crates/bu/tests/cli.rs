//! End-to-end tests of the `bu` binary.
//!
//! Every test runs in an isolated home, config and cache directory with a
//! private `PATH`, so nothing on the host machine is touched or consulted.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["home", "config", "cache", "bin", "project"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        Self { root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    fn project(&self) -> PathBuf {
        self.path("project")
    }

    fn touch(&self, file: &str) {
        fs::write(self.project().join(file), "").unwrap();
    }

    fn bu(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bu"));
        cmd.current_dir(self.project())
            .env("HOME", self.path("home"))
            .env("XDG_CONFIG_HOME", self.path("config"))
            .env("BU_CACHE_DIR", self.path("cache"))
            .env("PATH", self.path("bin"))
            .env_remove("RUST_LOG");
        cmd
    }

    /// Install an executable shell script as `bin/<name>`.
    #[cfg(unix)]
    fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = self.path("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

fn cache_entries(cache: &Path) -> usize {
    fs::read_dir(cache)
        .map(|dir| {
            dir.flatten()
                .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
                .count()
        })
        .unwrap_or(0)
}

#[test]
fn help_describes_the_wrapper() {
    Sandbox::new()
        .bu()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build tool wrapper"));
}

#[test]
fn completions_are_generated() {
    Sandbox::new()
        .bu()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_bu"));
}

#[test]
fn empty_cache_is_reported() {
    Sandbox::new()
        .bu()
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache is empty"));
}

#[test]
fn cache_clean_on_missing_cache_succeeds() {
    Sandbox::new()
        .bu()
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleaned"));
}

#[test]
fn unknown_project_exits_with_config_error() {
    Sandbox::new()
        .bu()
        .arg("build")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No supported project"));
}

#[test]
fn unknown_project_json_envelope() {
    Sandbox::new()
        .bu()
        .args(["--json", "which"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""status":"error""#))
        .stdout(predicate::str::contains(r#""code":"config""#));
}

#[test]
fn invalid_config_exits_with_config_error() {
    let sandbox = Sandbox::new();
    sandbox.touch("Makefile");
    fs::write(
        sandbox.project().join("bu.toml"),
        "[tools.make]\nstrategies = [\"teleport\"]\n",
    )
    .unwrap();

    sandbox
        .bu()
        .arg("which")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("bu.toml"));
}

#[test]
fn missing_host_tool_exits_with_resolution_error() {
    let sandbox = Sandbox::new();
    sandbox.touch("Makefile");

    sandbox
        .bu()
        .arg("which")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Could not resolve make@latest"))
        .stderr(predicate::str::contains("[NotFound]"));
}

#[test]
fn offline_url_tool_without_cache_is_skipped() {
    let sandbox = Sandbox::new();
    sandbox.touch(".buckconfig");
    fs::write(
        sandbox.project().join("bu.toml"),
        "[tools.buck2]\nurl_template = \"https://example.invalid/{version}/buck2\"\n\
        strategies = [\"url\"]\n",
    )
    .unwrap();

    sandbox
        .bu()
        .args(["--offline", "which"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OfflineViolation"));
    assert_eq!(cache_entries(&sandbox.path("cache")), 0);
}

#[test]
fn damaged_cache_entry_is_reported_by_every_command() {
    let sandbox = Sandbox::new();
    sandbox.touch("Makefile");
    // Entry directory without its executable
    fs::create_dir_all(sandbox.path("cache").join("make").join("latest")).unwrap();

    for command in ["which", "config", "build"] {
        sandbox
            .bu()
            .arg(command)
            .assert()
            .code(3)
            .stderr(predicate::str::contains("missing or not runnable"));
    }
    assert!(sandbox.path("cache").join("make").join("latest").is_dir());
}

#[cfg(unix)]
mod host_dispatch {
    use super::*;

    #[test]
    fn which_prints_host_tool() {
        let sandbox = Sandbox::new();
        sandbox.touch("Makefile");
        let make = sandbox.script("make", "exit 0");

        sandbox
            .bu()
            .arg("which")
            .assert()
            .success()
            .stdout(predicate::str::contains(make.to_string_lossy().as_ref()));
        assert_eq!(cache_entries(&sandbox.path("cache")), 0);
    }

    #[test]
    fn arguments_are_passed_through_verbatim() {
        let sandbox = Sandbox::new();
        sandbox.touch("Makefile");
        sandbox.script("make", "echo \"make-args: $*\"");

        sandbox
            .bu()
            .args(["build", "--offline", "-v", "-j4"])
            .assert()
            .success()
            .stdout(predicate::str::contains("make-args: build --offline -v -j4"));
    }

    #[test]
    fn exit_code_is_the_tools() {
        let sandbox = Sandbox::new();
        sandbox.touch("Makefile");
        sandbox.script("make", "exit 7");

        sandbox.bu().arg("test").assert().code(7);
    }

    #[test]
    fn config_shows_resolution() {
        let sandbox = Sandbox::new();
        sandbox.touch("Makefile");
        sandbox.script("make", "exit 0");

        sandbox
            .bu()
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("Tool:         make"))
            .stdout(predicate::str::contains("Resolved via: host strategy"))
            .stdout(predicate::str::contains("Project type: Make"));
    }

    #[test]
    fn user_config_is_read_from_config_home() {
        let sandbox = Sandbox::new();
        sandbox.touch("Makefile");
        sandbox.script("make", "exit 0");
        let user_dir = sandbox.path("config").join("bu");
        fs::create_dir_all(&user_dir).unwrap();
        fs::write(user_dir.join("bu.toml"), "[tools.make]\nversion = \"4.4\"\n").unwrap();

        let output = sandbox.bu().args(["--json", "config"]).output().unwrap();
        if !cfg!(target_os = "linux") {
            // dirs only honours XDG_CONFIG_HOME on Linux
            return;
        }
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["data"]["version"], "4.4");
    }
}
