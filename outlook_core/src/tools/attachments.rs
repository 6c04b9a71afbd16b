use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::user_path;
use crate::client::GraphClient;
use crate::error::OutlookError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadAttachmentParams {
    pub message_id: String,
    pub attachment_id: String,
    /// Local path the decoded content is written to
    pub file_name: String,
    pub user_id: Option<String>,
}

pub async fn download_outlook_attachment(
    client: &GraphClient,
    p: DownloadAttachmentParams,
) -> Result<Value, OutlookError> {
    let path = format!(
        "{}/messages/{}/attachments/{}",
        user_path(p.user_id.as_deref()),
        p.message_id,
        p.attachment_id
    );
    let attachment = client.get(&path, Vec::new()).await?;

    let Some(encoded) = attachment.get("contentBytes").and_then(|v| v.as_str()) else {
        return Err(OutlookError::Validation(
            "Attachment does not contain downloadable content (contentBytes). It may be a link or embedded item."
                .to_string(),
        ));
    };
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| OutlookError::Validation(format!("Invalid attachment content: {}", e)))?;

    tokio::fs::write(&p.file_name, &bytes).await.map_err(|e| {
        OutlookError::LocalIo(format!("Error writing file {}: {}", p.file_name, e))
    })?;
    tracing::info!(file = %p.file_name, size = bytes.len(), "attachment saved");

    let content_type = attachment
        .get("contentType")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let name = attachment
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(&p.file_name);
    Ok(json!({
        "file_name": p.file_name,
        "size": bytes.len(),
        "content_type": content_type,
        "name": name,
    }))
}
