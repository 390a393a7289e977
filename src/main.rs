// aws-sso-config - AWS SSO profile generator and per-repository profile resolver

mod accounts;
mod auth;
mod aws_config;
mod cli;
mod config;
mod env;
mod error;
mod models;
mod process;
mod profile;
mod reconcile;

use clap::Parser;
use error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first to get verbose flag
    let args = cli::Cli::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::execute(args).await
}
