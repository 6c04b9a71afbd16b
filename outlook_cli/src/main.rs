use clap::Parser;
use owo_colors::OwoColorize;
use std::process;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "outlook_cli=info,outlook_core=warn",
        1 => "outlook_cli=debug,outlook_core=info",
        _ => "outlook_cli=trace,outlook_core=debug",
    };
    outlook_core::logging::init_tracing(filter);

    let result = match &cli.command {
        Commands::Login => login::run(&cli).await,
        Commands::Logout => logout::run(&cli).await,
        Commands::Whoami => whoami::run(&cli).await,
        Commands::Tools { schema } => tools::run(&cli, *schema).await,
        Commands::Call { tool, args, params } => {
            call::run(&cli, tool, args.as_deref(), params).await
        }
        Commands::Manifest { yaml } => manifest::run(*yaml).await,
        Commands::Config => config::run(&cli).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
