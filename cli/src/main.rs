//! `escola`: terminal client for the school administration API.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use escola_cli::logging::{init_logging, LogConfig, LogFormat};
use escola_core::{ActionError, ApiError};

mod cli;
mod commands;
mod render;

use crate::cli::{Cli, LogFormatArg};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&log_config_from_cli(&cli));

    let mut panel = match commands::open_panel(&cli) {
        Ok(panel) => panel,
        Err(error) => {
            eprintln!("error: {error:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = commands::run(&cli, &mut panel);
    let noticed_error = render::print_notices(&panel.drain_notices());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if is_session_expired(&error) {
                eprintln!("sessão expirada; execute `escola login`");
            } else if !noticed_error {
                eprintln!("error: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn is_session_expired(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<ActionError>() {
        Some(err) => err.is_session_expired(),
        None => matches!(error.downcast_ref::<ApiError>(), Some(ApiError::SessionExpired)),
    }
}

/// Verbosity flags win over `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        with_ansi: io::stderr().is_terminal(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
    }
}
