use reqwest::Method;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{put, user_path, Query};
use crate::client::{GraphClient, GraphRequest};
use crate::error::OutlookError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateMailFolderParams {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "isHidden")]
    pub is_hidden: Option<bool>,
    pub user_id: Option<String>,
}

pub async fn create_mail_folder(
    client: &GraphClient,
    p: CreateMailFolderParams,
) -> Result<Value, OutlookError> {
    let mut body = JsonObject::new();
    body.insert("displayName".into(), json!(p.display_name));
    put(&mut body, "isHidden", p.is_hidden);
    let path = format!("{}/mailFolders", user_path(p.user_id.as_deref()));
    client.post(&path, Value::Object(body)).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteMailFolderParams {
    pub folder_id: String,
    pub user_id: Option<String>,
}

pub async fn delete_mail_folder(
    client: &GraphClient,
    p: DeleteMailFolderParams,
) -> Result<Value, OutlookError> {
    let path = format!("{}/mailFolders/{}", user_path(p.user_id.as_deref()), p.folder_id);
    let result = client
        .call(Method::DELETE, &path, GraphRequest::new())
        .await?;
    match result {
        Value::Object(map) if map.is_empty() => Ok(json!({"deleted": true})),
        other => Ok(other),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListMailFoldersParams {
    /// Include folders hidden from the client UI
    pub include_hidden_folders: Option<bool>,
    pub user_id: Option<String>,
}

pub async fn list_mail_folders(
    client: &GraphClient,
    p: ListMailFoldersParams,
) -> Result<Value, OutlookError> {
    let query = Query::new()
        .flag("includeHiddenFolders", p.include_hidden_folders.filter(|h| *h))
        .build();
    let path = format!("{}/mailFolders", user_path(p.user_id.as_deref()));
    client.get(&path, query).await
}
