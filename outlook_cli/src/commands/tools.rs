use crate::cli::Cli;
use crate::commands::Result;
use crate::output::format_output;
use outlook_core::{builtin_manifest, ToolDescriptor};
use owo_colors::OwoColorize;

pub async fn run(cli: &Cli, show_schema: bool) -> Result<()> {
    let mut tools: Vec<ToolDescriptor> = builtin_manifest().tools;
    if !show_schema {
        for tool in &mut tools {
            tool.input_schema = None;
        }
    }

    format_output(&tools, cli.output, |tools| {
        println!("{} {}", tools.len().to_string().green().bold(), "tools".bold());
        println!();
        for tool in tools {
            println!(
                "  {:<30} {}",
                tool.id.cyan(),
                tool.description.as_deref().unwrap_or("").dimmed()
            );
            if let Some(schema) = &tool.input_schema {
                println!("{}", serde_json::to_string_pretty(schema)?);
            }
        }
        Ok(())
    })
}
