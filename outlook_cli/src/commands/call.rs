use crate::cli::{Cli, OutputFormat};
use crate::commands::{connect, CommandError, Result};
use crate::output::print_envelope;
use outlook_core::ToolRegistry;
use serde_json::{Map, Value};

pub async fn run(cli: &Cli, tool: &str, args_json: Option<&str>, params: &[String]) -> Result<()> {
    let args = build_args(args_json, params)?;

    let (_settings, client) = connect().await?;
    let registry = ToolRegistry::builtin(client);
    if registry.get(tool).is_none() {
        return Err(CommandError::ToolNotFound(tool.to_string()));
    }

    let envelope = registry.call(tool, args).await?;
    let value = envelope.to_value();
    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&value)?),
        OutputFormat::Pretty => print_envelope(tool, &value)?,
    }

    if envelope.is_successful() {
        Ok(())
    } else {
        Err(CommandError::ToolError(
            envelope.error().unwrap_or("tool call failed").to_string(),
        ))
    }
}

/// Merges `--args` with trailing `key=value` pairs; pairs win on conflict.
fn build_args(args_json: Option<&str>, params: &[String]) -> Result<Map<String, Value>> {
    let mut args = Map::new();

    if let Some(s) = args_json.map(str::trim).filter(|s| !s.is_empty()) {
        match serde_json::from_str::<Value>(s)? {
            Value::Object(m) => args = m,
            _ => {
                return Err(CommandError::InvalidArgs(
                    "--args must be a JSON object".to_string(),
                ))
            }
        }
    }

    for param in params {
        let (key, raw) = param.split_once('=').ok_or_else(|| {
            CommandError::InvalidArgs(format!("expected key=value, got '{}'", param))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CommandError::InvalidArgs(format!("empty key in '{}'", param)));
        }
        // Bare words stay strings: `folder=inbox` rather than a JSON parse error.
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        args.insert(key.to_string(), value);
    }

    Ok(args)
}
