// src/error.rs
use serde_json::json;

use crate::auth_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum OutlookError {
    #[error("Not authenticated. Please authenticate first.")]
    AuthenticationRequired,

    #[error("Authentication expired. Please re-authenticate.")]
    AuthenticationExpired,

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Graph request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    LocalIo(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token cache error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Method not found")]
    MethodNotFound,

    #[error("Parse error")]
    ParseError,
}

impl OutlookError {
    pub fn code_str(&self) -> &'static str {
        match self {
            OutlookError::AuthenticationRequired => "auth_required",
            OutlookError::AuthenticationExpired => "auth_expired",
            OutlookError::Authentication(_) => "auth_failed",
            OutlookError::RequestFailed { .. } => "request_failed",
            OutlookError::Validation(_) | OutlookError::InvalidParams(_) => "invalid_params",
            OutlookError::LocalIo(_) | OutlookError::Io(_) => "local_io",
            OutlookError::Http(_) => "upstream_error",
            OutlookError::ToolNotFound(_) => "tool_not_found",
            OutlookError::MethodNotFound => "method_not_found",
            OutlookError::ParseError => "parse_error",
            _ => "internal_error",
        }
    }

    pub fn to_jsonrpc_error(&self) -> serde_json::Value {
        let (code, message) = match self {
            OutlookError::ToolNotFound(name) => (-32602, format!("Tool not found: {}", name)),
            OutlookError::InvalidParams(msg) | OutlookError::Validation(msg) => {
                (-32602, msg.to_string())
            }
            OutlookError::MethodNotFound => (-32601, "Method not found".to_string()),
            OutlookError::ParseError => (-32700, "Parse error".to_string()),
            err => (-32603, err.to_string()),
        };

        json!({
            "code": code,
            "message": message,
        })
    }
}

pub type Result<T> = std::result::Result<T, OutlookError>;
