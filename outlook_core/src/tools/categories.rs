use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{put, user_path, ListOptions};
use crate::client::GraphClient;
use crate::error::OutlookError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetMasterCategoriesParams {
    #[serde(flatten)]
    pub options: ListOptions,
    pub user_id: Option<String>,
}

pub async fn get_master_categories(
    client: &GraphClient,
    p: GetMasterCategoriesParams,
) -> Result<Value, OutlookError> {
    let path = format!("{}/outlook/masterCategories", user_path(p.user_id.as_deref()));
    client.get(&path, p.options.query().build()).await
}

/// Outlook category color presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CategoryColor {
    Preset0,
    Preset1,
    Preset2,
    Preset3,
    Preset4,
    Preset5,
    Preset6,
    Preset7,
    Preset8,
    Preset9,
    Preset10,
    Preset11,
    Preset12,
    Preset13,
    Preset14,
    Preset15,
    Preset16,
    Preset17,
    Preset18,
    Preset19,
    Preset20,
    Preset21,
    Preset22,
    Preset23,
    Preset24,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateMasterCategoryParams {
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub color: Option<CategoryColor>,
}

pub async fn create_master_category(
    client: &GraphClient,
    p: CreateMasterCategoryParams,
) -> Result<Value, OutlookError> {
    let mut body = JsonObject::new();
    body.insert("displayName".into(), json!(p.display_name));
    put(&mut body, "color", p.color);
    client
        .post("/me/outlook/masterCategories", Value::Object(body))
        .await
}
