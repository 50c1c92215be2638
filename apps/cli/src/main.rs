//! SheetPrompt CLI — compile workbook knowledge into prompts and chat with a model.
//!
//! Turns documentation, type-definition and variable-mapping sheets into
//! prompt blocks, and keeps persisted multi-turn sessions with an
//! OpenAI-compatible endpoint.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
