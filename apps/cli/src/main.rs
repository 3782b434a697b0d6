//! PatentInsight CLI: patent-search relevance analysis pipeline.
//!
//! Enriches exported search results with fetched abstracts, scores them
//! against weighted keyword categories, and emits ranked JSON artifacts.

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
