//! bu CLI entry point.

// CLI binary needs to output to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

use bu::cli::{self, Cli, CliError, exit_code_for, render_error};
use bu::commands;
use bu::tracing::{TracingConfig, init_tracing};

fn main() {
    // Tracing may not be usable during a panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    let json = cli.json;

    let code = match start(cli) {
        Ok(code) => code,
        Err(err) => {
            render_error(&err, json);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn start(cli: Cli) -> Result<i32, CliError> {
    init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.effective_level().into(),
    })?;

    // Cache maintenance and completions skip the runtime
    if let Some(result) = commands::execute_local(&cli) {
        return result;
    }
    run_with_tokio(cli)
}

fn run_with_tokio(cli: Cli) -> Result<i32, CliError> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::other(format!("Failed to create tokio runtime: {e}")))?;

    rt.block_on(commands::execute(cli))
}
