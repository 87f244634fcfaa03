// stresslens - main.rs
// Entry point for the prediction service CLI

use clap::Parser;
use stresslens::cli::{run, Cli};
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting stresslens v{}", env!("CARGO_PKG_VERSION"));

    run(Cli::parse())
}
