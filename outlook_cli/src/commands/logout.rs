use crate::cli::Cli;
use crate::commands::{connect, Result};
use owo_colors::OwoColorize;

pub async fn run(_cli: &Cli) -> Result<()> {
    let (_settings, client) = connect().await?;
    client.tokens().sign_out().await?;
    println!("{} cached credential removed", "✓".green().bold());
    Ok(())
}
