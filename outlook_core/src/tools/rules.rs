use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::put;
use crate::client::GraphClient;
use crate::error::OutlookError;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmailRuleParams {
    pub display_name: String,
    /// Rule predicates, e.g. `{"fromAddresses": [{"emailAddress": {"address": "news@contoso.com"}}]}`
    pub conditions: JsonObject,
    /// Rule actions, e.g. `{"moveToFolder": "<folder id>", "stopProcessingRules": true}`
    pub actions: JsonObject,
    pub is_enabled: Option<bool>,
    /// Evaluation order among the inbox rules
    pub sequence: Option<u32>,
}

pub async fn create_email_rule(
    client: &GraphClient,
    p: CreateEmailRuleParams,
) -> Result<Value, OutlookError> {
    let mut rule = JsonObject::new();
    rule.insert("displayName".into(), json!(p.display_name));
    rule.insert("conditions".into(), Value::Object(p.conditions));
    rule.insert("actions".into(), Value::Object(p.actions));
    put(&mut rule, "isEnabled", p.is_enabled);
    put(&mut rule, "sequence", p.sequence);
    client
        .post("/me/mailFolders/inbox/messageRules", Value::Object(rule))
        .await
}
