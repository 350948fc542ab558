//! hcexport CLI: help-center mirror and exporter.
//!
//! Fetches categories, sections, articles and attachments into a local cache,
//! then renders a static HTML site or a WordPress import feed.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
