//! genscribe CLI: generate content with a chat-completion API and keep it.
//!
//! Appends every welcome message and dropdown response to an append-only
//! log, and materializes extracted dropdown code into versioned directories.

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
