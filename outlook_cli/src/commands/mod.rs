pub mod call;
pub mod config;
pub mod login;
pub mod logout;
pub mod manifest;
pub mod tools;
pub mod whoami;

use std::sync::Arc;

use outlook_core::{GraphClient, OutlookError, Settings};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Not signed in. Run `outlook login` first.")]
    NotSignedIn,

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("{0}")]
    Core(#[from] OutlookError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Settings plus a client holding whatever credential is cached.
pub async fn connect() -> Result<(Settings, Arc<GraphClient>)> {
    let settings = Settings::load()?;
    let client = Arc::new(GraphClient::from_settings(&settings));
    if !client.tokens().load_cached().await {
        tracing::debug!("no usable cached credential");
    }
    Ok((settings, client))
}
