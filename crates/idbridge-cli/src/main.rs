mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

fn main() {
    if let Err(e) = run() {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Keys(args) => match args.command {
            cli::KeysCommands::Generate(generate) => commands::keys::generate(&generate)?,
        },
        Commands::Token(args) => match args.command {
            cli::TokenCommands::Mint(mint) => commands::token::mint(&mint)?,
        },
    }

    Ok(())
}
