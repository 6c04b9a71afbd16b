//! Outlook (Microsoft Graph) tools for MCP hosts.
//!
//! * [`token::TokenManager`] owns the credential: device-code sign-in, the
//!   on-disk cache and silent refresh.
//! * [`client::GraphClient`] issues authenticated REST calls and retries once
//!   after a 401.
//! * [`tools`] holds the tool functions and the static table naming them.
//! * [`manifest`] and [`registry`] decide which tools are exposed, and
//!   [`mcp_server`]/[`transport`] serve them over stdio.

pub mod auth_store;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod mcp_server;
pub mod oauth;
pub mod registry;
pub mod schema;
pub mod token;
pub mod tools;
pub mod transport;

pub use client::{GraphClient, GraphRequest};
pub use config::Settings;
pub use envelope::ResponseEnvelope;
pub use error::OutlookError;
pub use manifest::{bind, builtin_manifest, load_manifest, BoundTool, Manifest, ToolDescriptor};
pub use registry::ToolRegistry;
pub use token::TokenManager;

// Re-export the rmcp types that appear in this crate's public API
pub use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, InitializeResult, JsonObject,
    ListToolsResult, ProtocolVersion, ServerCapabilities, Tool,
};
