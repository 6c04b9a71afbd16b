use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{put, user_path, Query};
use crate::client::GraphClient;
use crate::error::OutlookError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetMailboxSettingsParams {
    /// Settings to return, e.g. timeZone, automaticRepliesSetting
    pub select: Option<Vec<String>>,
    pub expand: Option<Vec<String>>,
    pub user_id: Option<String>,
}

pub async fn get_mailbox_settings(
    client: &GraphClient,
    p: GetMailboxSettingsParams,
) -> Result<Value, OutlookError> {
    let query = Query::new()
        .list("$select", p.select.as_deref())
        .list("$expand", p.expand.as_deref())
        .build();
    let path = format!("{}/mailboxSettings", user_path(p.user_id.as_deref()));
    client.get(&path, query).await
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetMailDeltaParams {
    /// Folder to track; inbox when absent
    pub folder_id: Option<String>,
    pub select: Option<Vec<String>>,
    pub expand: Option<Vec<String>>,
    pub filter: Option<String>,
    pub orderby: Option<Vec<String>>,
    pub search: Option<String>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
    /// Include the total item count
    pub count: Option<bool>,
    /// Token from the deltaLink of a previous round
    pub delta_token: Option<String>,
    /// Token from the nextLink of a previous page
    pub skip_token: Option<String>,
    pub user_id: Option<String>,
}

pub(crate) fn mail_delta_query(p: &GetMailDeltaParams) -> Vec<(String, String)> {
    Query::new()
        .list("$select", p.select.as_deref())
        .list("$expand", p.expand.as_deref())
        .text("$filter", p.filter.as_deref())
        .list("$orderby", p.orderby.as_deref())
        .text("$search", p.search.as_deref())
        .number("$top", p.top)
        .number("$skip", p.skip)
        .flag("$count", p.count)
        .text("$deltatoken", p.delta_token.as_deref())
        .text("$skiptoken", p.skip_token.as_deref())
        .build()
}

pub async fn get_mail_delta(
    client: &GraphClient,
    p: GetMailDeltaParams,
) -> Result<Value, OutlookError> {
    let folder = p
        .folder_id
        .as_deref()
        .filter(|f| !f.is_empty())
        .unwrap_or("inbox");
    let path = format!(
        "{}/mailFolders/{}/messages/delta",
        user_path(p.user_id.as_deref()),
        folder
    );
    client.get(&path, mail_delta_query(&p)).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetMailTipsParams {
    /// Recipient addresses to check
    #[serde(rename = "EmailAddresses")]
    pub email_addresses: Vec<String>,
    /// Comma-separated tips, e.g. "automaticReplies,mailboxFullStatus"
    #[serde(rename = "MailTipsOptions")]
    pub mail_tips_options: String,
    pub user_id: Option<String>,
}

pub async fn get_mail_tips(client: &GraphClient, p: GetMailTipsParams) -> Result<Value, OutlookError> {
    let path = format!("{}/getMailTips", user_path(p.user_id.as_deref()));
    client
        .post(
            &path,
            json!({
                "EmailAddresses": p.email_addresses,
                "MailTipsOptions": p.mail_tips_options,
            }),
        )
        .await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetSupportedLanguagesParams {
    pub user_id: Option<String>,
}

pub async fn get_supported_languages(
    client: &GraphClient,
    p: GetSupportedLanguagesParams,
) -> Result<Value, OutlookError> {
    let path = format!("{}/outlook/supportedLanguages", user_path(p.user_id.as_deref()));
    client.get(&path, Vec::new()).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TimeZoneStandard {
    Windows,
    Iana,
}

impl TimeZoneStandard {
    fn as_str(self) -> &'static str {
        match self {
            TimeZoneStandard::Windows => "Windows",
            TimeZoneStandard::Iana => "Iana",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetSupportedTimeZonesParams {
    /// Format of the returned zone names
    pub time_zone_standard: Option<TimeZoneStandard>,
}

pub(crate) fn supported_time_zones_path(standard: Option<TimeZoneStandard>) -> String {
    match standard {
        Some(s) => format!(
            "/me/outlook/supportedTimeZones(TimeZoneStandard=microsoft.graph.timeZoneStandard'{}')",
            s.as_str()
        ),
        None => "/me/outlook/supportedTimeZones".to_string(),
    }
}

pub async fn get_supported_time_zones(
    client: &GraphClient,
    p: GetSupportedTimeZonesParams,
) -> Result<Value, OutlookError> {
    client
        .get(&supported_time_zones_path(p.time_zone_standard), Vec::new())
        .await
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMailboxSettingsParams {
    /// e.g. `{"status": "scheduled", "externalReplyMessage": "..."}`
    pub automatic_replies_setting: Option<JsonObject>,
    /// e.g. `{"locale": "en-US"}`
    pub language: Option<JsonObject>,
    /// Windows or IANA time zone name
    pub time_zone: Option<String>,
    /// e.g. `{"daysOfWeek": ["monday"], "startTime": "08:00:00", "endTime": "17:00:00"}`
    pub working_hours: Option<JsonObject>,
}

pub async fn update_mailbox_settings(
    client: &GraphClient,
    p: UpdateMailboxSettingsParams,
) -> Result<Value, OutlookError> {
    let mut body = JsonObject::new();
    put(&mut body, "automaticRepliesSetting", p.automatic_replies_setting);
    put(&mut body, "language", p.language);
    put(&mut body, "timeZone", p.time_zone);
    put(&mut body, "workingHours", p.working_hours);
    if body.is_empty() {
        return Err(OutlookError::Validation(
            "At least one setting (automaticRepliesSetting, language, timeZone, or workingHours) must be provided.".to_string(),
        ));
    }
    client.patch("/me/mailboxSettings", Value::Object(body)).await
}
