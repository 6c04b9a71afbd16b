use crate::cli::Cli;
use crate::commands::{connect, CommandError, Result};
use crate::output::{format_output, print_field};
use outlook_core::tools::find_tool;
use owo_colors::OwoColorize;
use serde_json::Value;

pub async fn run(cli: &Cli) -> Result<()> {
    let (_settings, client) = connect().await?;
    if !client.is_authenticated().await {
        return Err(CommandError::NotSignedIn);
    }

    let entry = find_tool("get_profile").ok_or_else(|| CommandError::ToolNotFound("get_profile".into()))?;
    let envelope = entry.call(&client, Default::default()).await;
    if !envelope.is_successful() {
        return Err(CommandError::ToolError(
            envelope.error().unwrap_or("profile lookup failed").to_string(),
        ));
    }

    format_output(envelope.data(), cli.output, |profile| {
        let field = |key: &str| profile.get(key).and_then(Value::as_str).unwrap_or("-").to_string();
        println!("{}", field("displayName").bold().cyan());
        print_field("Mail", &field("mail"));
        print_field("User principal", &field("userPrincipalName"));
        print_field("Id", &field("id"));
        Ok(())
    })
}
