//! Environment-driven settings. A `.env` file in the working directory is
//! loaded first when present.

use std::path::PathBuf;

use crate::auth_store::default_cache_path;
use crate::error::OutlookError;

pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/common";
pub const DEFAULT_REDIRECT_URI: &str =
    "https://login.microsoftonline.com/common/oauth2/nativeclient";
pub const DEFAULT_IDENTIFIER: &str = "outlook-mcp";

pub const DEFAULT_SCOPES: &[&str] = &[
    "offline_access",
    "openid",
    "profile",
    "User.Read",
    "Mail.Read",
    "Mail.ReadWrite",
    "Mail.Send",
    "Calendars.Read",
    "Calendars.ReadWrite",
    "Contacts.Read",
    "Contacts.ReadWrite",
    "MailboxSettings.Read",
    "MailboxSettings.ReadWrite",
];

#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub graph_endpoint: String,
    pub authority: String,
    pub scopes: Vec<String>,
    pub token_cache_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
    pub identifier: String,
    pub interactive_auth: bool,
}

impl Settings {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn load() -> Result<Self, OutlookError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("ignoring unreadable .env: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, OutlookError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let client_id = get("OUTLOOK_CLIENT_ID").ok_or_else(|| {
            OutlookError::Configuration(
                "OUTLOOK_CLIENT_ID must be set to the Azure application (client) id".into(),
            )
        })?;

        let scopes = match get("OUTLOOK_SCOPES") {
            Some(raw) => raw
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
            None => DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        };

        let manifest_path = get("OUTLOOK_TOOLS_MANIFEST").map(PathBuf::from).or_else(|| {
            ["tools_manifest.json", "tools_manifest.yaml", "tools_manifest.yml"]
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file())
        });

        let interactive_auth = match get("OUTLOOK_INTERACTIVE_AUTH") {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                OutlookError::Configuration(format!(
                    "OUTLOOK_INTERACTIVE_AUTH must be true or false, got '{}'",
                    v
                ))
            })?,
            None => true,
        };

        Ok(Self {
            client_id,
            client_secret: get("OUTLOOK_CLIENT_SECRET"),
            redirect_uri: get("OUTLOOK_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            graph_endpoint: get("GRAPH_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GRAPH_ENDPOINT.to_string()),
            authority: get("AUTHORITY").unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
            scopes,
            token_cache_path: get("OUTLOOK_TOKEN_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_path),
            manifest_path,
            identifier: get("MCP_IDENTIFIER").unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string()),
            interactive_auth,
        })
    }

    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
