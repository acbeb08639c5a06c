mod app;
mod cli;
mod input;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use vidbatch_logging::{batch_error, batch_info};

use crate::cli::Cli;
use crate::logging::LogDestination;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(
        cli.log_level,
        &LogDestination::from_log_file(cli.log_file.as_deref()),
    );

    match app::run(&cli).await {
        Ok(summary) => {
            batch_info!(
                "Run complete: {} processed, {} succeeded, {} failed.",
                summary.processed,
                summary.succeeded,
                summary.failed()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            batch_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
