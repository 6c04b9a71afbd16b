use crate::cli::Cli;
use crate::commands::Result;
use crate::output::{format_output, print_field};
use outlook_core::Settings;
use owo_colors::OwoColorize;
use serde_json::{json, Value};

fn settings_view(settings: &Settings) -> Value {
    json!({
        "client_id": settings.client_id,
        "client_secret": settings.client_secret.as_ref().map(|_| "********"),
        "redirect_uri": settings.redirect_uri,
        "graph_endpoint": settings.graph_endpoint,
        "authority": settings.authority,
        "scopes": settings.scopes,
        "token_cache": settings.token_cache_path.display().to_string(),
        "manifest": settings.manifest_path.as_ref().map(|p| p.display().to_string()),
        "identifier": settings.identifier,
        "interactive_auth": settings.interactive_auth,
    })
}

pub async fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load()?;
    let view = settings_view(&settings);

    format_output(&view, cli.output, |view| {
        println!("{}", "Configuration".bold().cyan());
        if let Some(map) = view.as_object() {
            for (key, value) in map {
                let shown = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => "-".to_string(),
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(" "),
                    other => other.to_string(),
                };
                print_field(key, &shown);
            }
        }
        Ok(())
    })
}
