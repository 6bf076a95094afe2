mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::Cli;
use findcomplain_core::{CoreError, ErrorExt, ErrorReporter};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    tracing::info!("Starting findcomplain {}", env!("CARGO_PKG_VERSION"));

    match commands::run(cli).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            let message = match e.downcast_ref::<CoreError>() {
                Some(core_error) => {
                    ErrorReporter::new().report_error(core_error);
                    core_error.user_friendly_message()
                }
                None => {
                    tracing::error!("Command failed: {:#}", e);
                    e.to_string()
                }
            };
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over `--log-level`. Logs go to stderr so JSON output on
/// stdout stays parseable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "findcomplain={level},findcomplain_core={level},findcomplain_client={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
