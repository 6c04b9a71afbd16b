use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::user_path;
use crate::client::GraphClient;
use crate::error::OutlookError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetProfileParams {
    /// User id or principal name; the signed-in user when absent
    pub user_id: Option<String>,
}

pub async fn get_profile(client: &GraphClient, p: GetProfileParams) -> Result<Value, OutlookError> {
    client.get(&user_path(p.user_id.as_deref()), Vec::new()).await
}
