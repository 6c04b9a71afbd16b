//! Graph-backed tool functions and the static table that names them.
//!
//! Every tool is an `async fn(&GraphClient, Params) -> Result<Value, OutlookError>`
//! with a typed, schema-deriving parameter struct. [`TOOLS`] binds each one to its
//! public id; [`invoke`] adds the authentication check, argument decoding and the
//! envelope around the call.

pub mod attachments;
pub mod calendar;
pub mod categories;
pub mod contacts;
pub mod folders;
pub mod mail;
pub mod profile;
pub mod rules;
pub mod settings;

use std::future::Future;

use futures::future::BoxFuture;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::GraphClient;
use crate::envelope::ResponseEnvelope;
use crate::error::OutlookError;
use crate::schema;

pub type ToolFuture<'a> = BoxFuture<'a, ResponseEnvelope>;
pub type ToolHandler = for<'a> fn(&'a GraphClient, JsonObject) -> ToolFuture<'a>;

/// One row of the static tool table.
#[derive(Clone, Copy)]
pub struct ToolEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: fn() -> JsonObject,
    pub handler: ToolHandler,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry").field("name", &self.name).finish()
    }
}

impl ToolEntry {
    pub async fn call(&self, client: &GraphClient, args: JsonObject) -> ResponseEnvelope {
        (self.handler)(client, args).await
    }
}

/// Runs a typed tool handler: authentication gate, argument decoding, envelope.
pub fn invoke<'a, P, F, Fut>(client: &'a GraphClient, args: JsonObject, handler: F) -> ToolFuture<'a>
where
    P: DeserializeOwned + Send + 'a,
    F: FnOnce(&'a GraphClient, P) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Value, OutlookError>> + Send + 'a,
{
    Box::pin(async move {
        if !client.is_authenticated().await {
            return ResponseEnvelope::from_result(Err(OutlookError::AuthenticationRequired));
        }
        let params = match serde_json::from_value::<P>(Value::Object(args)) {
            Ok(p) => p,
            Err(e) => {
                return ResponseEnvelope::from_result(Err(OutlookError::Validation(format!(
                    "Invalid arguments: {}",
                    e
                ))))
            }
        };
        let result = handler(client, params).await;
        if let Err(e) = &result {
            tracing::debug!(code = e.code_str(), "tool call failed: {}", e);
        }
        ResponseEnvelope::from_result(result)
    })
}

macro_rules! tool {
    ($name:literal, $params:ty, $handler:path, $description:literal) => {
        ToolEntry {
            name: $name,
            description: $description,
            input_schema: schema::input_schema_for::<$params>,
            handler: |client, args| invoke::<$params, _, _>(client, args, $handler),
        }
    };
}

pub static TOOLS: &[ToolEntry] = &[
    // mail
    tool!("add_mail_attachment", mail::AddMailAttachmentParams, mail::add_mail_attachment,
        "Add a small (<3 MB) file or item attachment to an existing message."),
    tool!("create_draft", mail::CreateDraftParams, mail::create_draft,
        "Create an email draft with subject, body, recipients and an optional attachment."),
    tool!("create_draft_reply", mail::CreateDraftReplyParams, mail::create_draft_reply,
        "Create a draft reply to an existing message, optionally adding CC/BCC recipients."),
    tool!("get_message", mail::GetMessageParams, mail::get_message,
        "Retrieve a message by id. Use select to request specific fields such as internetMessageHeaders."),
    tool!("move_message", mail::MoveMessageParams, mail::move_message,
        "Move a message to another folder (id or well-known name such as inbox, drafts, deleteditems)."),
    tool!("reply_email", mail::ReplyEmailParams, mail::reply_email,
        "Send a plain text reply to a message, with optional CC and BCC recipients."),
    tool!("search_messages", mail::SearchMessagesParams, mail::search_messages,
        "Search the mailbox by text, sender, subject and attachment presence, with paging."),
    tool!("send_email", mail::SendEmailParams, mail::send_email,
        "Send an email with subject, body, recipients and an optional attachment."),
    tool!("update_email", mail::UpdateEmailParams, mail::update_email,
        "Update subject, body, recipients or importance of a draft message."),
    tool!("list_messages", mail::ListMessagesParams, mail::list_messages,
        "List messages in a folder or the whole mailbox with filtering, sorting and paging. Filter by conversationId to read a thread."),
    tool!("list_outlook_attachments", mail::ListOutlookAttachmentsParams, mail::list_outlook_attachments,
        "List attachment metadata (id, name, contentType, size, isInline) for a message."),
    tool!("download_outlook_attachment", attachments::DownloadAttachmentParams, attachments::download_outlook_attachment,
        "Download a message attachment and write it to a local file."),
    // calendar
    tool!("create_calendar", calendar::CreateCalendarParams, calendar::create_calendar,
        "Create a new calendar with an optional color."),
    tool!("add_event_attachment", calendar::AddEventAttachmentParams, calendar::add_event_attachment,
        "Attach a file (from a path, plain text or base64) or an item to a calendar event."),
    tool!("create_event", calendar::CreateEventParams, calendar::create_event,
        "Create a calendar event. start_datetime must be before end_datetime."),
    tool!("delete_event", calendar::DeleteEventParams, calendar::delete_event,
        "Delete a calendar event, optionally suppressing cancellation notices."),
    tool!("get_event", calendar::GetEventParams, calendar::get_event,
        "Retrieve the full details of a calendar event."),
    tool!("update_calendar_event", calendar::UpdateCalendarEventParams, calendar::update_calendar_event,
        "Update selected fields of an existing calendar event."),
    tool!("get_schedule", calendar::GetScheduleParams, calendar::get_schedule,
        "Get free/busy availability for a set of addresses within a time window."),
    tool!("list_calendars", calendar::ListCalendarsParams, calendar::list_calendars,
        "List the user's calendars."),
    tool!("list_events", calendar::ListEventsParams, calendar::list_events,
        "List calendar events with filtering, sorting, paging and an optional response time zone."),
    tool!("list_event_attachments", calendar::ListEventAttachmentsParams, calendar::list_event_attachments,
        "List attachments of a calendar event."),
    tool!("list_reminders", calendar::ListRemindersParams, calendar::list_reminders,
        "List event reminders between two ISO 8601 datetimes."),
    // contacts
    tool!("create_contact", contacts::CreateContactParams, contacts::create_contact,
        "Create a personal contact."),
    tool!("get_contact", contacts::GetContactParams, contacts::get_contact,
        "Retrieve a contact by id."),
    tool!("get_contact_folders", contacts::GetContactFoldersParams, contacts::get_contact_folders,
        "List contact folders."),
    tool!("delete_contact", contacts::DeleteContactParams, contacts::delete_contact,
        "Delete a contact."),
    tool!("update_contact", contacts::UpdateContactParams, contacts::update_contact,
        "Update selected fields of a contact."),
    tool!("create_contact_folder", contacts::CreateContactFolderParams, contacts::create_contact_folder,
        "Create a contact folder, optionally under a parent folder."),
    tool!("list_contacts", contacts::ListContactsParams, contacts::list_contacts,
        "List contacts from the default or a specific contact folder."),
    // rules
    tool!("create_email_rule", rules::CreateEmailRuleParams, rules::create_email_rule,
        "Create an inbox message rule from conditions and actions."),
    // folders
    tool!("create_mail_folder", folders::CreateMailFolderParams, folders::create_mail_folder,
        "Create a top-level mail folder."),
    tool!("delete_mail_folder", folders::DeleteMailFolderParams, folders::delete_mail_folder,
        "Delete a mail folder."),
    tool!("list_mail_folders", folders::ListMailFoldersParams, folders::list_mail_folders,
        "List top-level mail folders such as Inbox, Drafts and Sent Items."),
    // categories
    tool!("get_master_categories", categories::GetMasterCategoriesParams, categories::get_master_categories,
        "List the user's master categories."),
    tool!("create_master_category", categories::CreateMasterCategoryParams, categories::create_master_category,
        "Create a master category with an optional preset color."),
    // settings
    tool!("get_mailbox_settings", settings::GetMailboxSettingsParams, settings::get_mailbox_settings,
        "Get mailbox settings such as automatic replies, language, time zone and working hours."),
    tool!("get_mail_delta", settings::GetMailDeltaParams, settings::get_mail_delta,
        "Track message changes in a folder using delta and skip tokens."),
    tool!("get_mail_tips", settings::GetMailTipsParams, settings::get_mail_tips,
        "Get mail tips (automatic replies, mailbox full, ...) for recipients."),
    tool!("get_supported_languages", settings::GetSupportedLanguagesParams, settings::get_supported_languages,
        "List the languages supported by the mailbox."),
    tool!("get_supported_time_zones", settings::GetSupportedTimeZonesParams, settings::get_supported_time_zones,
        "List supported time zones in Windows or IANA format."),
    tool!("update_mailbox_settings", settings::UpdateMailboxSettingsParams, settings::update_mailbox_settings,
        "Update automatic replies, language, time zone or working hours."),
    // profile
    tool!("get_profile", profile::GetProfileParams, profile::get_profile,
        "Get the profile of the signed-in user or the given user."),
];

pub fn find_tool(name: &str) -> Option<&'static ToolEntry> {
    TOOLS.iter().find(|t| t.name == name)
}

// ---- shared request building ----

/// Path prefix for a user-scoped resource: `/me` unless a user id is given.
pub(crate) fn user_path(user_id: Option<&str>) -> String {
    match user_id.map(str::trim).filter(|u| !u.is_empty()) {
        Some(user) => format!("/{}", user),
        None => "/me".to_string(),
    }
}

pub(crate) fn recipients(addresses: &[String]) -> Value {
    Value::Array(
        addresses
            .iter()
            .map(|a| json!({"emailAddress": {"address": a}}))
            .collect(),
    )
}

pub(crate) fn item_body(content: &str, is_html: Option<bool>) -> Value {
    json!({
        "contentType": if is_html.unwrap_or(false) { "HTML" } else { "Text" },
        "content": content,
    })
}

/// Inserts `value` under `key` only when it is present.
pub(crate) fn put<T: Serialize>(map: &mut JsonObject, key: &str, value: Option<T>) {
    if let Some(v) = value {
        map.insert(key.to_string(), json!(v));
    }
}

/// Quoted OData string literal.
pub(crate) fn odata_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Ordered query-string builder; absent or empty values are skipped.
#[derive(Debug, Default)]
pub(crate) struct Query(Vec<(String, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.0.push((key.to_string(), v.to_string()));
        }
        self
    }

    pub fn list(self, key: &str, values: Option<&[String]>) -> Self {
        let joined = values.filter(|v| !v.is_empty()).map(|v| v.join(","));
        self.text(key, joined.as_deref())
    }

    pub fn number(mut self, key: &str, value: Option<u32>) -> Self {
        if let Some(v) = value {
            self.0.push((key.to_string(), v.to_string()));
        }
        self
    }

    pub fn flag(mut self, key: &str, value: Option<bool>) -> Self {
        if let Some(v) = value {
            self.0.push((key.to_string(), v.to_string()));
        }
        self
    }

    pub fn build(self) -> Vec<(String, String)> {
        self.0
    }
}

/// `$filter` clauses joined with `and`.
#[derive(Debug, Default)]
pub(crate) struct Filter(Vec<String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: impl Into<String>) {
        self.0.push(clause.into());
    }

    pub fn build(self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join(" and "))
        }
    }
}

/// The `$select/$filter/$orderby/$top/$skip` family shared by collection listings.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListOptions {
    /// Properties to include in the response
    pub select: Option<Vec<String>>,
    /// OData filter expression
    pub filter: Option<String>,
    /// Properties to order by, e.g. `displayName desc`
    pub orderby: Option<Vec<String>>,
    /// Maximum number of items to return
    pub top: Option<u32>,
    /// Number of items to skip
    pub skip: Option<u32>,
}

impl ListOptions {
    pub(crate) fn query(&self) -> Query {
        Query::new()
            .list("$select", self.select.as_deref())
            .text("$filter", self.filter.as_deref())
            .list("$orderby", self.orderby.as_deref())
            .number("$top", self.top)
            .number("$skip", self.skip)
    }
}

/// A file attachment supplied inline as base64.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AttachmentInput {
    /// File name shown to recipients
    pub name: String,
    /// MIME type; defaults to application/octet-stream
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    /// Base64-encoded file content
    #[serde(rename = "contentBytes")]
    pub content_bytes: String,
}

impl AttachmentInput {
    pub(crate) fn to_file_attachment(&self) -> Result<Value, OutlookError> {
        if self.name.trim().is_empty() || self.content_bytes.is_empty() {
            return Err(OutlookError::Validation(
                "Attachments require a non-empty name and contentBytes.".to_string(),
            ));
        }
        Ok(json!({
            "@odata.type": "#microsoft.graph.fileAttachment",
            "name": self.name,
            "contentType": self.content_type.as_deref().unwrap_or("application/octet-stream"),
            "contentBytes": self.content_bytes,
        }))
    }
}
