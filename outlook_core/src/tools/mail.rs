use reqwest::Method;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{item_body, odata_str, put, recipients, user_path, AttachmentInput, Filter, Query};
use crate::client::{GraphClient, GraphRequest};
use crate::error::OutlookError;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddMailAttachmentParams {
    /// Id of the message to attach to
    pub message_id: String,
    /// Attachment name
    pub name: String,
    /// OData type, e.g. `#microsoft.graph.fileAttachment`
    pub odata_type: String,
    /// Base64-encoded content
    #[serde(rename = "contentBytes")]
    pub content_bytes: String,
    /// Content id for inline attachments
    #[serde(rename = "contentId")]
    pub content_id: Option<String>,
    /// Content location URL
    #[serde(rename = "contentLocation")]
    pub content_location: Option<String>,
    /// MIME type
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    /// Whether the attachment is shown inline
    #[serde(rename = "isInline")]
    pub is_inline: Option<bool>,
    /// Item payload for item attachments
    pub item: Option<JsonObject>,
    /// Mailbox owner; defaults to the signed-in user
    pub user_id: Option<String>,
}

pub async fn add_mail_attachment(
    client: &GraphClient,
    p: AddMailAttachmentParams,
) -> Result<Value, OutlookError> {
    let mut body = JsonObject::new();
    body.insert("@odata.type".into(), json!(p.odata_type));
    body.insert("name".into(), json!(p.name));
    body.insert("contentBytes".into(), json!(p.content_bytes));
    put(&mut body, "contentId", p.content_id);
    put(&mut body, "contentLocation", p.content_location);
    put(&mut body, "contentType", p.content_type);
    put(&mut body, "isInline", p.is_inline);
    put(&mut body, "item", p.item);

    let path = format!(
        "{}/messages/{}/attachments",
        user_path(p.user_id.as_deref()),
        p.message_id
    );
    client.post(&path, Value::Object(body)).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateDraftParams {
    pub subject: String,
    /// Body content
    pub body: String,
    /// Recipient addresses
    pub to_recipients: Vec<String>,
    pub cc_recipients: Option<Vec<String>>,
    pub bcc_recipients: Option<Vec<String>>,
    /// Treat the body as HTML
    pub is_html: Option<bool>,
    /// Conversation to thread the draft into
    pub conversation_id: Option<String>,
    pub attachment: Option<AttachmentInput>,
}

pub async fn create_draft(client: &GraphClient, p: CreateDraftParams) -> Result<Value, OutlookError> {
    let attachment = p
        .attachment
        .as_ref()
        .map(AttachmentInput::to_file_attachment)
        .transpose()?;

    let mut draft = JsonObject::new();
    draft.insert("subject".into(), json!(p.subject));
    draft.insert("body".into(), item_body(&p.body, p.is_html));
    draft.insert("toRecipients".into(), recipients(&p.to_recipients));
    if let Some(cc) = p.cc_recipients.filter(|v| !v.is_empty()) {
        draft.insert("ccRecipients".into(), recipients(&cc));
    }
    if let Some(bcc) = p.bcc_recipients.filter(|v| !v.is_empty()) {
        draft.insert("bccRecipients".into(), recipients(&bcc));
    }
    put(&mut draft, "conversationId", p.conversation_id.filter(|c| !c.is_empty()));

    let created = client.post("/me/messages", Value::Object(draft)).await?;

    if let (Some(attachment), Some(id)) = (attachment, created.get("id").and_then(|v| v.as_str())) {
        client
            .post(&format!("/me/messages/{}/attachments", id), attachment)
            .await?;
    }
    Ok(created)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateDraftReplyParams {
    /// Message being replied to
    pub message_id: String,
    /// Reply text
    pub comment: Option<String>,
    pub cc_emails: Option<Vec<String>>,
    pub bcc_emails: Option<Vec<String>>,
    pub user_id: Option<String>,
}

/// `{comment?, message: {ccRecipients?, bccRecipients?}?}`, or `None` when empty.
fn reply_body(
    comment: Option<String>,
    cc: Option<Vec<String>>,
    bcc: Option<Vec<String>>,
) -> Option<Value> {
    let mut body = JsonObject::new();
    put(&mut body, "comment", comment.filter(|c| !c.is_empty()));

    let mut message = JsonObject::new();
    if let Some(cc) = cc.filter(|v| !v.is_empty()) {
        message.insert("ccRecipients".into(), recipients(&cc));
    }
    if let Some(bcc) = bcc.filter(|v| !v.is_empty()) {
        message.insert("bccRecipients".into(), recipients(&bcc));
    }
    if !message.is_empty() {
        body.insert("message".into(), Value::Object(message));
    }

    (!body.is_empty()).then_some(Value::Object(body))
}

pub async fn create_draft_reply(
    client: &GraphClient,
    p: CreateDraftReplyParams,
) -> Result<Value, OutlookError> {
    let path = format!(
        "{}/messages/{}/createReply",
        user_path(p.user_id.as_deref()),
        p.message_id
    );
    let request = GraphRequest {
        body: reply_body(p.comment, p.cc_emails, p.bcc_emails),
        ..GraphRequest::default()
    };
    client.call(Method::POST, &path, request).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetMessageParams {
    pub message_id: String,
    /// Comma-separated properties to return
    pub select: Option<String>,
    pub user_id: Option<String>,
}

pub async fn get_message(client: &GraphClient, p: GetMessageParams) -> Result<Value, OutlookError> {
    let path = format!("{}/messages/{}", user_path(p.user_id.as_deref()), p.message_id);
    let query = Query::new().text("$select", p.select.as_deref()).build();
    client.get(&path, query).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MoveMessageParams {
    pub message_id: String,
    /// Destination folder id or well-known name (inbox, drafts, deleteditems, ...)
    pub destination_id: String,
    pub user_id: Option<String>,
}

pub async fn move_message(client: &GraphClient, p: MoveMessageParams) -> Result<Value, OutlookError> {
    let path = format!("{}/messages/{}/move", user_path(p.user_id.as_deref()), p.message_id);
    client
        .post(&path, json!({"destinationId": p.destination_id}))
        .await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReplyEmailParams {
    pub message_id: String,
    /// Reply text
    pub comment: String,
    pub cc_emails: Option<Vec<String>>,
    pub bcc_emails: Option<Vec<String>>,
    pub user_id: Option<String>,
}

pub async fn reply_email(client: &GraphClient, p: ReplyEmailParams) -> Result<Value, OutlookError> {
    let path = format!("{}/messages/{}/reply", user_path(p.user_id.as_deref()), p.message_id);
    let mut body = reply_body(None, p.cc_emails, p.bcc_emails)
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    body.insert("comment".into(), json!(p.comment));
    client
        .call_no_content(Method::POST, &path, GraphRequest::json(Value::Object(body)))
        .await?;
    Ok(json!({"message": "Reply sent successfully"}))
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchMessagesParams {
    /// Text matched against subject and body preview
    pub query: String,
    /// Sender address
    pub from_email: Option<String>,
    /// Text matched against the subject only
    pub subject: Option<String>,
    pub has_attachments: Option<bool>,
    /// Number of results to skip
    #[serde(rename = "from_index")]
    pub from_index: Option<u32>,
    /// Number of results to return
    #[serde(rename = "size")]
    pub size: Option<u32>,
    /// Accepted for compatibility; results are not re-ranked
    #[serde(rename = "enable_top_results")]
    pub enable_top_results: Option<bool>,
}

pub(crate) fn search_filter(p: &SearchMessagesParams) -> Option<String> {
    let mut filter = Filter::new();
    if !p.query.is_empty() {
        let q = odata_str(&p.query);
        filter.push(format!(
            "(contains(subject, {q}) or contains(bodyPreview, {q}))"
        ));
    }
    if let Some(subject) = p.subject.as_deref().filter(|s| !s.is_empty()) {
        filter.push(format!("contains(subject, {})", odata_str(subject)));
    }
    if let Some(from) = p.from_email.as_deref().filter(|s| !s.is_empty()) {
        filter.push(format!("from/emailAddress/address eq {}", odata_str(from)));
    }
    if let Some(has) = p.has_attachments {
        filter.push(format!("hasAttachments eq {}", has));
    }
    filter.build()
}

pub async fn search_messages(
    client: &GraphClient,
    p: SearchMessagesParams,
) -> Result<Value, OutlookError> {
    let query = Query::new()
        .text("$filter", search_filter(&p).as_deref())
        .number("$top", p.size)
        .number("$skip", p.from_index)
        .build();
    client.get("/me/messages", query).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendEmailParams {
    pub subject: String,
    /// Body content
    pub body: String,
    /// Primary recipient address
    pub to_email: String,
    /// Primary recipient display name; defaults to the address
    pub to_name: Option<String>,
    pub cc_emails: Option<Vec<String>>,
    pub bcc_emails: Option<Vec<String>>,
    /// Treat the body as HTML
    pub is_html: Option<bool>,
    pub attachment: Option<AttachmentInput>,
    /// Keep a copy in Sent Items (Graph default: true)
    pub save_to_sent_items: Option<bool>,
    pub user_id: Option<String>,
}

pub(crate) fn send_mail_body(p: &SendEmailParams) -> Result<Value, OutlookError> {
    let to_name = p
        .to_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&p.to_email);

    let mut message = JsonObject::new();
    message.insert("subject".into(), json!(p.subject));
    message.insert("body".into(), item_body(&p.body, p.is_html));
    message.insert(
        "toRecipients".into(),
        json!([{"emailAddress": {"address": p.to_email, "name": to_name}}]),
    );
    if let Some(cc) = p.cc_emails.as_deref().filter(|v| !v.is_empty()) {
        message.insert("ccRecipients".into(), recipients(cc));
    }
    if let Some(bcc) = p.bcc_emails.as_deref().filter(|v| !v.is_empty()) {
        message.insert("bccRecipients".into(), recipients(bcc));
    }
    if let Some(attachment) = &p.attachment {
        message.insert(
            "attachments".into(),
            json!([attachment.to_file_attachment()?]),
        );
    }

    let mut body = JsonObject::new();
    body.insert("message".into(), Value::Object(message));
    put(&mut body, "saveToSentItems", p.save_to_sent_items);
    Ok(Value::Object(body))
}

pub async fn send_email(client: &GraphClient, p: SendEmailParams) -> Result<Value, OutlookError> {
    let body = send_mail_body(&p)?;
    let path = format!("{}/sendMail", user_path(p.user_id.as_deref()));
    client
        .call_no_content(Method::POST, &path, GraphRequest::json(body))
        .await?;
    Ok(json!({"message": "Email sent successfully"}))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateEmailParams {
    /// Id of a draft message
    pub message_id: String,
    pub subject: Option<String>,
    /// Body object, e.g. `{"contentType": "text", "content": "Hello"}`
    pub body: Option<JsonObject>,
    pub to_recipients: Option<Vec<String>>,
    pub cc_recipients: Option<Vec<String>>,
    pub bcc_recipients: Option<Vec<String>>,
    /// low, normal or high
    pub importance: Option<String>,
    pub user_id: Option<String>,
}

const NOT_A_DRAFT: &str = "Cannot update received message. Only draft messages can be updated. \
Please use a draft message ID or create a draft first using outlook_create_draft.";

pub(crate) fn update_email_body(p: &UpdateEmailParams) -> Result<Value, OutlookError> {
    let mut update = JsonObject::new();
    put(&mut update, "subject", p.subject.as_ref());
    if let Some(body) = &p.body {
        if !body.contains_key("contentType") || !body.contains_key("content") {
            return Err(OutlookError::Validation(
                "Body must be an object with 'contentType' and 'content' fields, e.g. {\"contentType\": \"text\", \"content\": \"Hello\"}".to_string(),
            ));
        }
        update.insert("body".into(), Value::Object(body.clone()));
    }
    if let Some(to) = &p.to_recipients {
        update.insert("toRecipients".into(), recipients(to));
    }
    if let Some(cc) = &p.cc_recipients {
        update.insert("ccRecipients".into(), recipients(cc));
    }
    if let Some(bcc) = &p.bcc_recipients {
        update.insert("bccRecipients".into(), recipients(bcc));
    }
    put(&mut update, "importance", p.importance.as_ref());

    if update.is_empty() {
        return Err(OutlookError::Validation(
            "At least one field (subject, body, to_recipients, cc_recipients, bcc_recipients, or importance) must be provided to update.".to_string(),
        ));
    }
    Ok(Value::Object(update))
}

pub async fn update_email(client: &GraphClient, p: UpdateEmailParams) -> Result<Value, OutlookError> {
    let update = update_email_body(&p)?;
    let path = format!("{}/messages/{}", user_path(p.user_id.as_deref()), p.message_id);

    // A failed lookup falls through to the PATCH, which reports the real error.
    match client
        .get(&path, vec![("$select".to_string(), "isDraft".to_string())])
        .await
    {
        Ok(info) if !info.get("isDraft").and_then(|d| d.as_bool()).unwrap_or(false) => {
            return Err(OutlookError::Validation(NOT_A_DRAFT.to_string()));
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("draft check skipped: {}", e),
    }

    client.patch(&path, update).await.map_err(|e| match e {
        OutlookError::RequestFailed { status: 400, message } => {
            let lower = message.to_lowercase();
            if lower.contains("draft") || lower.contains("cannot") {
                OutlookError::Validation(format!(
                    "Cannot update this message. Only draft messages can be updated. Error: {}",
                    message
                ))
            } else {
                OutlookError::RequestFailed { status: 400, message }
            }
        }
        other => other,
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListMessagesParams {
    /// Folder id or well-known name (inbox, drafts, sentitems, deleteditems)
    pub folder: Option<String>,
    /// Only messages carrying all of these categories
    pub categories: Option<Vec<String>>,
    /// Only messages in this conversation (thread)
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
    /// Sender address
    pub from_address: Option<String>,
    pub has_attachments: Option<bool>,
    /// low, normal or high
    pub importance: Option<String>,
    pub is_read: Option<bool>,
    /// Properties to order by, e.g. `receivedDateTime desc`
    pub orderby: Option<Vec<String>>,
    /// receivedDateTime >= value (ISO 8601)
    pub received_date_time_ge: Option<String>,
    /// receivedDateTime > value (ISO 8601)
    pub received_date_time_gt: Option<String>,
    /// receivedDateTime <= value (ISO 8601)
    pub received_date_time_le: Option<String>,
    /// receivedDateTime < value (ISO 8601)
    pub received_date_time_lt: Option<String>,
    /// Properties to include
    pub select: Option<Vec<String>>,
    /// sentDateTime > value (ISO 8601)
    pub sent_date_time_gt: Option<String>,
    /// sentDateTime < value (ISO 8601)
    pub sent_date_time_lt: Option<String>,
    pub skip: Option<u32>,
    /// Exact subject
    pub subject: Option<String>,
    pub subject_contains: Option<String>,
    pub subject_endswith: Option<String>,
    pub subject_startswith: Option<String>,
    pub top: Option<u32>,
    pub user_id: Option<String>,
}

pub(crate) fn list_messages_filter(p: &ListMessagesParams) -> Option<String> {
    fn text(v: &Option<String>) -> Option<&str> {
        v.as_deref().filter(|s| !s.is_empty())
    }

    let mut filter = Filter::new();
    if let Some(v) = text(&p.conversation_id) {
        filter.push(format!("conversationId eq {}", odata_str(v)));
    }
    if let Some(v) = text(&p.from_address) {
        filter.push(format!("from/emailAddress/address eq {}", odata_str(v)));
    }
    if let Some(v) = p.has_attachments {
        filter.push(format!("hasAttachments eq {}", v));
    }
    if let Some(v) = text(&p.importance) {
        filter.push(format!("importance eq {}", odata_str(v)));
    }
    if let Some(v) = p.is_read {
        filter.push(format!("isRead eq {}", v));
    }
    for (op, value) in [
        ("ge", &p.received_date_time_ge),
        ("gt", &p.received_date_time_gt),
        ("le", &p.received_date_time_le),
        ("lt", &p.received_date_time_lt),
    ] {
        if let Some(v) = text(value) {
            filter.push(format!("receivedDateTime {} {}", op, v));
        }
    }
    for (op, value) in [("gt", &p.sent_date_time_gt), ("lt", &p.sent_date_time_lt)] {
        if let Some(v) = text(value) {
            filter.push(format!("sentDateTime {} {}", op, v));
        }
    }
    if let Some(v) = text(&p.subject) {
        filter.push(format!("subject eq {}", odata_str(v)));
    }
    if let Some(v) = text(&p.subject_contains) {
        filter.push(format!("contains(subject, {})", odata_str(v)));
    }
    if let Some(v) = text(&p.subject_startswith) {
        filter.push(format!("startswith(subject, {})", odata_str(v)));
    }
    if let Some(v) = text(&p.subject_endswith) {
        filter.push(format!("endswith(subject, {})", odata_str(v)));
    }
    for category in p.categories.iter().flatten() {
        filter.push(format!("categories/any(c:c eq {})", odata_str(category)));
    }
    filter.build()
}

pub async fn list_messages(client: &GraphClient, p: ListMessagesParams) -> Result<Value, OutlookError> {
    let query = Query::new()
        .text("$filter", list_messages_filter(&p).as_deref())
        .list("$orderby", p.orderby.as_deref())
        .list("$select", p.select.as_deref())
        .number("$skip", p.skip)
        .number("$top", p.top)
        .build();
    let user = user_path(p.user_id.as_deref());
    let path = match p.folder.as_deref().filter(|f| !f.is_empty()) {
        Some(folder) => format!("{}/mailFolders/{}/messages", user, folder),
        None => format!("{}/messages", user),
    };
    client.get(&path, query).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListOutlookAttachmentsParams {
    pub message_id: String,
    pub user_id: Option<String>,
}

pub async fn list_outlook_attachments(
    client: &GraphClient,
    p: ListOutlookAttachmentsParams,
) -> Result<Value, OutlookError> {
    let path = format!(
        "{}/messages/{}/attachments",
        user_path(p.user_id.as_deref()),
        p.message_id
    );
    let query = Query::new()
        .text("$select", Some("id,name,contentType,size,isInline,lastModifiedDateTime"))
        .build();
    client.get(&path, query).await
}
