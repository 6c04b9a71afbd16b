use crate::cli::Cli;
use crate::commands::{connect, Result};
use crate::output::print_field;
use owo_colors::OwoColorize;

pub async fn run(_cli: &Cli) -> Result<()> {
    let (_settings, client) = connect().await?;
    let tokens = client.tokens();

    if let Some(credential) = tokens.current_credential().await {
        println!(
            "{} already signed in as {}",
            "✓".green().bold(),
            credential.account.as_deref().unwrap_or("unknown account").cyan()
        );
        return Ok(());
    }

    let credential = tokens
        .authenticate(|start| {
            println!();
            println!("{}", "Microsoft sign-in".bold().cyan());
            print_field("Open", &start.verification_uri);
            print_field("Enter code", &start.user_code.bold().to_string());
            println!();
            println!("{}", "Waiting for you to finish signing in...".dimmed());
        })
        .await?;

    println!(
        "{} signed in as {}",
        "✓".green().bold(),
        credential.account.as_deref().unwrap_or("unknown account").cyan()
    );
    Ok(())
}
