//! Tool manifests: which tools to expose, under which ids, with which schemas.
//!
//! A manifest entry names a `target` (a tool function name, optionally prefixed
//! with a module path as `module:function`). Binding resolves the target against
//! the static [`TOOLS`](crate::tools::TOOLS) table and attaches the shared client.

use std::path::Path;
use std::sync::Arc;

use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::GraphClient;
use crate::envelope::ResponseEnvelope;
use crate::error::OutlookError;
use crate::schema::sanitize_schema;
use crate::tools::{find_tool, ToolEntry, TOOLS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<JsonObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

impl Manifest {
    /// Parses JSON, falling back to YAML (which also accepts most JSON).
    pub fn parse(text: &str) -> Result<Self, OutlookError> {
        match serde_json::from_str(text) {
            Ok(manifest) => Ok(manifest),
            Err(json_err) => serde_yaml::from_str(text).map_err(|yaml_err| {
                warn!("manifest is neither JSON ({}) nor YAML", json_err);
                OutlookError::Yaml(yaml_err)
            }),
        }
    }
}

/// Reads the tool descriptors from a JSON or YAML manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<ToolDescriptor>, OutlookError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        OutlookError::Configuration(format!("cannot read manifest {}: {}", path.display(), e))
    })?;
    let manifest = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
        Some("json") => serde_json::from_str(&text)?,
        _ => Manifest::parse(&text)?,
    };
    Ok(manifest.tools)
}

/// The static table rendered as a manifest.
pub fn builtin_manifest() -> Manifest {
    Manifest {
        tools: TOOLS
            .iter()
            .map(|entry| ToolDescriptor {
                id: entry.name.to_string(),
                target: entry.name.to_string(),
                description: Some(entry.description.to_string()),
                input_schema: Some((entry.input_schema)()),
            })
            .collect(),
    }
}

/// A tool entry bound to a client under its public id.
#[derive(Clone)]
pub struct BoundTool {
    name: String,
    description: String,
    input_schema: JsonObject,
    entry: &'static ToolEntry,
    client: Arc<GraphClient>,
}

impl std::fmt::Debug for BoundTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundTool")
            .field("name", &self.name)
            .field("target", &self.entry.name)
            .finish()
    }
}

impl BoundTool {
    pub fn builtin(entry: &'static ToolEntry, client: Arc<GraphClient>) -> Self {
        Self {
            name: entry.name.to_string(),
            description: entry.description.to_string(),
            input_schema: (entry.input_schema)(),
            entry,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &'static str {
        self.entry.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &JsonObject {
        &self.input_schema
    }

    pub fn to_mcp_tool(&self) -> Tool {
        Tool {
            name: self.name.clone().into(),
            title: None,
            description: Some(self.description.clone().into()),
            input_schema: Arc::new(self.input_schema.clone()),
            output_schema: None,
            annotations: None,
            icons: None,
        }
    }

    /// Forwards the caller's arguments unchanged to the tool function.
    pub async fn call(&self, args: JsonObject) -> ResponseEnvelope {
        self.entry.call(&self.client, args).await
    }

    pub async fn call_tool(&self, args: JsonObject) -> CallToolResult {
        self.call(args).await.into()
    }
}

/// Function part of a `module:function` target.
fn function_name(target: &str) -> &str {
    target.rsplit(':').next().unwrap_or(target).trim()
}

/// Resolves a descriptor against the static table.
pub fn bind(descriptor: &ToolDescriptor, client: Arc<GraphClient>) -> Result<BoundTool, OutlookError> {
    if descriptor.id.trim().is_empty() || descriptor.target.trim().is_empty() {
        return Err(OutlookError::InvalidParams(
            "manifest entries need both id and target".to_string(),
        ));
    }
    let function = function_name(&descriptor.target);
    let entry = find_tool(function).ok_or_else(|| OutlookError::ToolNotFound(function.to_string()))?;

    let input_schema = match &descriptor.input_schema {
        Some(schema) => match sanitize_schema(serde_json::Value::Object(schema.clone())) {
            serde_json::Value::Object(map) => map,
            _ => (entry.input_schema)(),
        },
        None => (entry.input_schema)(),
    };

    Ok(BoundTool {
        name: descriptor.id.clone(),
        description: descriptor
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| entry.description.to_string()),
        input_schema,
        entry,
        client,
    })
}
