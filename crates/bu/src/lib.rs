//! bu - a smart build tool wrapper
//!
//! Detects the project type in the current directory, resolves the build
//! tool it needs through [`bu_core::Resolver`] and runs it with the caller's
//! arguments.
//!
//! # Modules
//!
//! - [`cli`]: argument parsing, error categories, exit codes
//! - [`config`]: `bu.toml` tool definitions
//! - [`project`]: marker-file detection and version files
//! - [`commands`]: subcommand handlers
//! - [`dispatch`]: hand-off to the resolved executable
//! - [`tracing`]: subscriber setup

pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod project;
pub mod tracing;
