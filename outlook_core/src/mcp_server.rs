use std::sync::Arc;

use rmcp::model::*;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::GraphClient;
use crate::config::Settings;
use crate::envelope::ResponseEnvelope;
use crate::error::OutlookError;
use crate::registry::ToolRegistry;
use crate::schema::input_schema_for;
use crate::token::TokenManager;

const AUTH_STATUS: &str = "auth_status";
const AUTH_START: &str = "auth_start";
const AUTH_POLL: &str = "auth_poll";

#[derive(Debug, Deserialize, JsonSchema)]
struct AuthPollParams {
    /// device_code returned by auth_start
    device_code: String,
}

fn empty_schema() -> JsonObject {
    let mut schema = JsonObject::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), json!({}));
    schema
}

/// MCP server over a tool registry plus the device sign-in tools.
pub struct McpServer {
    registry: ToolRegistry,
    tokens: Arc<TokenManager>,
    identifier: String,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, tokens: Arc<TokenManager>, identifier: impl Into<String>) -> Self {
        Self {
            registry,
            tokens,
            identifier: identifier.into(),
        }
    }

    /// Registers tools from the configured manifest, or every built-in tool
    /// when there is none (or it cannot be read).
    pub fn from_settings(settings: &Settings, client: Arc<GraphClient>) -> Self {
        let tokens = client.tokens().clone();
        let registry = match &settings.manifest_path {
            Some(path) => match ToolRegistry::from_manifest(path, client.clone()) {
                Ok(registry) => {
                    info!(path = %path.display(), "loaded tool manifest");
                    registry
                }
                Err(e) => {
                    warn!(path = %path.display(), "manifest unusable, serving built-in tools: {}", e);
                    ToolRegistry::builtin(client)
                }
            },
            None => ToolRegistry::builtin(client),
        };
        Self::new(registry, tokens, settings.identifier.clone())
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: Some(ToolsCapability::default()),
            ..Default::default()
        }
    }

    pub async fn handle_initialize(
        &self,
        _request: InitializeRequestParam,
    ) -> Result<InitializeResult, OutlookError> {
        info!("MCP server initializing");
        Ok(InitializeResult {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: self.capabilities(),
            server_info: Implementation {
                name: self.identifier.clone(),
                title: Some("Outlook".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Outlook mail, calendar and contacts through Microsoft Graph. \
If a tool reports that you are not authenticated, call auth_start, show the user the \
code and URL, then call auth_poll with the device_code once they have signed in."
                    .to_string(),
            ),
        })
    }

    fn auth_tools(&self) -> Vec<Tool> {
        let tool = |name: &'static str, description: &'static str, schema: JsonObject| Tool {
            name: name.into(),
            title: None,
            description: Some(description.into()),
            input_schema: Arc::new(schema),
            output_schema: None,
            annotations: None,
            icons: None,
        };
        vec![
            tool(
                AUTH_STATUS,
                "Report whether the server holds a Microsoft credential and for which account.",
                empty_schema(),
            ),
            tool(
                AUTH_START,
                "Start Microsoft device sign-in. Returns user_code, verification_uri and device_code.",
                empty_schema(),
            ),
            tool(
                AUTH_POLL,
                "Check once whether device sign-in has completed; stores the credential when it has.",
                input_schema_for::<AuthPollParams>(),
            ),
        ]
    }

    pub async fn handle_list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListToolsResult, OutlookError> {
        let mut tools = self.registry.list_tools();
        tools.extend(self.auth_tools());
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    pub async fn handle_call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, OutlookError> {
        let args = request.arguments.unwrap_or_default();
        debug!(tool = %request.name, "tools/call");
        let envelope = match &*request.name {
            AUTH_STATUS => self.auth_status().await,
            AUTH_START => ResponseEnvelope::from_result(self.auth_start().await),
            AUTH_POLL => {
                let params: AuthPollParams = serde_json::from_value(Value::Object(args))
                    .map_err(|e| OutlookError::InvalidParams(e.to_string()))?;
                ResponseEnvelope::from_result(self.auth_poll(&params.device_code).await)
            }
            name => self.registry.call(name, args).await?,
        };
        Ok(envelope.into())
    }

    async fn auth_status(&self) -> ResponseEnvelope {
        let credential = self.tokens.current_credential().await;
        ResponseEnvelope::success(json!({
            "authenticated": self.tokens.is_authenticated().await,
            "token_valid": credential.is_some(),
            "account": credential.and_then(|c| c.account),
        }))
    }

    async fn auth_start(&self) -> Result<Value, OutlookError> {
        let start = self.tokens.start_device_flow().await?;
        info!(uri = %start.verification_uri, "device sign-in started");
        Ok(serde_json::to_value(start)?)
    }

    async fn auth_poll(&self, device_code: &str) -> Result<Value, OutlookError> {
        Ok(match self.tokens.poll_device_flow(device_code).await? {
            Some(credential) => json!({
                "status": "complete",
                "account": credential.account,
            }),
            None => json!({"status": "pending"}),
        })
    }

    pub async fn handle_list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListResourcesResult, OutlookError> {
        Ok(ListResourcesResult {
            resources: Vec::new(),
            next_cursor: None,
        })
    }

    pub async fn handle_list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListPromptsResult, OutlookError> {
        Ok(ListPromptsResult {
            prompts: Vec::new(),
            next_cursor: None,
        })
    }
}

/// JSON-RPC 2.0 framing around [`McpServer`].
pub struct JsonRpcHandler {
    server: McpServer,
}

fn to_result<T: serde::Serialize>(result: Result<T, OutlookError>) -> Result<Value, Value> {
    result
        .and_then(|r| serde_json::to_value(r).map_err(OutlookError::Json))
        .map_err(|e| e.to_jsonrpc_error())
}

fn params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, Value> {
    serde_json::from_value(params)
        .map_err(|e| OutlookError::InvalidParams(e.to_string()).to_jsonrpc_error())
}

impl JsonRpcHandler {
    pub fn new(server: McpServer) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &McpServer {
        &self.server
    }

    /// Handles one request. Notifications (no `id`) produce no response.
    pub async fn handle_request(&self, request: Value) -> Option<Value> {
        let id = request.get("id").cloned();
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        debug!(method, "json-rpc request");

        let Some(id) = id else {
            debug!(method, "notification");
            return None;
        };
        let raw = request.get("params").cloned().unwrap_or(Value::Null);
        let paged = || match raw.clone() {
            Value::Null => Ok(None),
            other => params::<Option<PaginatedRequestParam>>(other),
        };

        let result = match method {
            "initialize" => match params::<InitializeRequestParam>(raw.clone()) {
                Ok(req) => to_result(self.server.handle_initialize(req).await),
                Err(e) => Err(e),
            },
            "ping" => Ok(json!({})),
            "tools/list" => match paged() {
                Ok(req) => to_result(self.server.handle_list_tools(req).await),
                Err(e) => Err(e),
            },
            "tools/call" => match params::<CallToolRequestParam>(raw.clone()) {
                Ok(req) => to_result(self.server.handle_call_tool(req).await),
                Err(e) => Err(e),
            },
            "resources/list" => match paged() {
                Ok(req) => to_result(self.server.handle_list_resources(req).await),
                Err(e) => Err(e),
            },
            "prompts/list" => match paged() {
                Ok(req) => to_result(self.server.handle_list_prompts(req).await),
                Err(e) => Err(e),
            },
            _ => Err(OutlookError::MethodNotFound.to_jsonrpc_error()),
        };

        Some(match result {
            Ok(result) => json!({
                "jsonrpc": "2.0",
                "result": result,
                "id": id,
            }),
            Err(error) => json!({
                "jsonrpc": "2.0",
                "error": error,
                "id": id,
            }),
        })
    }
}
