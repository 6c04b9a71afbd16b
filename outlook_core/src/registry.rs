use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use tracing::{info, warn};

use crate::client::GraphClient;
use crate::envelope::ResponseEnvelope;
use crate::error::OutlookError;
use crate::manifest::{bind, load_manifest, BoundTool, ToolDescriptor};
use crate::tools::TOOLS;

/// Public tool ids bound to their handlers, in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<BoundTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tool in the static table under its own id.
    pub fn builtin(client: Arc<GraphClient>) -> Self {
        let mut registry = Self::new();
        for entry in TOOLS {
            registry.register(BoundTool::builtin(entry, client.clone()));
        }
        registry
    }

    /// Binds each descriptor; bad entries are skipped with a warning.
    pub fn from_descriptors(descriptors: &[ToolDescriptor], client: Arc<GraphClient>) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            if descriptor.id.trim().is_empty() || descriptor.target.trim().is_empty() {
                warn!(?descriptor, "skipping manifest entry without id or target");
                continue;
            }
            match bind(descriptor, client.clone()) {
                Ok(tool) => {
                    info!(id = %descriptor.id, target = %descriptor.target, "registered tool");
                    registry.register(tool);
                }
                Err(e) => warn!(id = %descriptor.id, target = %descriptor.target, "skipping tool: {}", e),
            }
        }
        info!(count = registry.len(), "tools registered from manifest");
        registry
    }

    pub fn from_manifest(path: &Path, client: Arc<GraphClient>) -> Result<Self, OutlookError> {
        let descriptors = load_manifest(path)?;
        Ok(Self::from_descriptors(&descriptors, client))
    }

    /// Later registrations under the same id replace earlier ones.
    pub fn register(&mut self, tool: BoundTool) {
        match self.index.get(tool.name()) {
            Some(&slot) => {
                warn!(id = tool.name(), "duplicate tool id, replacing earlier binding");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(tool.name().to_string(), self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&BoundTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundTool> {
        self.tools.iter()
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(BoundTool::to_mcp_tool).collect()
    }

    pub async fn call(&self, name: &str, args: JsonObject) -> Result<ResponseEnvelope, OutlookError> {
        let tool = self
            .get(name)
            .ok_or_else(|| OutlookError::ToolNotFound(name.to_string()))?;
        Ok(tool.call(args).await)
    }
}
