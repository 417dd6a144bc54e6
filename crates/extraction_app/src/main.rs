use anyhow::Context;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod logging;
mod persistence;
mod progress;

fn main() {
    if let Err(error) = run() {
        eprintln!("doctask error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::ClientConfig::load(cli.config.as_deref())?;
    logging::initialize(
        logging::LogDestination::choose(config.log_to_file, cli.verbose),
        cli.verbose,
    );

    // One thread: the job tag in log lines is thread-local.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(commands::dispatch(cli.command, &config))
}
