mod cli;
mod config;
mod dataset;
mod tools;

use std::process::ExitCode;

use clap::Parser;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("corpus=info".parse()?),
        )
        .init();

    let cli = cli::Cli::parse();
    cli::dispatch(cli).await
}
