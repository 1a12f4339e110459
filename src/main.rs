use clap::Parser;
use owo_colors::OwoColorize;
use std::process::ExitCode;

use ticketdesk::cli::Cli;
use ticketdesk::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The TUI sets up file logging itself
    if !cli.command.is_interactive() {
        logging::init_stderr();
    }

    match cli.command.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
