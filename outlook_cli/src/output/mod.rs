use crate::cli::OutputFormat;
use crate::commands::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;

/// Prints `data` as JSON or YAML, or hands it to `pretty` for the default format.
pub fn format_output<T, F>(data: &T, format: OutputFormat, pretty: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> Result<()>,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
        OutputFormat::Pretty => pretty(data)?,
    }
    Ok(())
}

/// Pretty form of a tool envelope: status line, then the data or the error.
pub fn print_envelope(tool: &str, envelope: &Value) -> Result<()> {
    let ok = envelope
        .get("successful")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if ok {
        println!("{} {}", "✓".green().bold(), tool.cyan());
        let data = envelope.get("data").unwrap_or(&Value::Null);
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        let error = envelope
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        println!("{} {}", "✗".red().bold(), tool.cyan());
        println!("{}", error.red());
    }
    Ok(())
}

pub fn print_field(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label).dimmed(), value);
}
