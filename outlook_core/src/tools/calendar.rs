use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDateTime};
use reqwest::Method;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{item_body, odata_str, put, user_path, ListOptions, Query};
use crate::client::{GraphClient, GraphRequest};
use crate::error::OutlookError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum CalendarColor {
    Auto,
    LightBlue,
    LightGreen,
    LightOrange,
    LightGray,
    LightYellow,
    LightTeal,
    LightPink,
    LightBrown,
    LightPurple,
    LightRed,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateCalendarParams {
    /// Calendar name
    pub name: String,
    pub color: Option<CalendarColor>,
    /// Hex color such as `#FF0000`
    #[serde(rename = "hexColor")]
    pub hex_color: Option<String>,
    pub user_id: Option<String>,
}

pub async fn create_calendar(
    client: &GraphClient,
    p: CreateCalendarParams,
) -> Result<Value, OutlookError> {
    let mut body = JsonObject::new();
    body.insert("name".into(), json!(p.name));
    put(&mut body, "color", p.color);
    put(&mut body, "hexColor", p.hex_color);
    let path = format!("{}/calendars", user_path(p.user_id.as_deref()));
    client.post(&path, Value::Object(body)).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AttachmentKind {
    #[serde(rename = "#microsoft.graph.fileAttachment")]
    File,
    #[serde(rename = "#microsoft.graph.itemAttachment")]
    Item,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddEventAttachmentParams {
    pub event_id: String,
    /// Attachment name
    pub name: String,
    pub odata_type: AttachmentKind,
    /// Base64-encoded content, used when neither file_path nor text_content is given
    #[serde(rename = "contentBytes")]
    pub content_bytes: Option<String>,
    /// Local file to read and attach
    pub file_path: Option<String>,
    /// Plain text to attach
    pub text_content: Option<String>,
    /// Item payload for item attachments
    pub item: Option<JsonObject>,
    pub user_id: Option<String>,
}

/// Base64 content for an event attachment: file, then text, then raw bytes.
async fn attachment_content(p: &AddEventAttachmentParams) -> Result<Option<String>, OutlookError> {
    if let Some(path) = &p.file_path {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OutlookError::LocalIo(format!("File not found: {}", path)),
            _ => OutlookError::LocalIo(format!("Error reading file: {}", e)),
        })?;
        return Ok(Some(STANDARD.encode(bytes)));
    }
    if let Some(text) = &p.text_content {
        return Ok(Some(STANDARD.encode(text.as_bytes())));
    }
    Ok(p.content_bytes.clone())
}

pub async fn add_event_attachment(
    client: &GraphClient,
    p: AddEventAttachmentParams,
) -> Result<Value, OutlookError> {
    let content = attachment_content(&p).await?;

    let mut body = JsonObject::new();
    body.insert("@odata.type".into(), json!(p.odata_type));
    body.insert("name".into(), json!(p.name));
    put(&mut body, "contentBytes", content);
    put(&mut body, "item", p.item);

    let path = format!(
        "{}/events/{}/attachments",
        user_path(p.user_id.as_deref()),
        p.event_id
    );
    client.post(&path, Value::Object(body)).await
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct EmailAddress {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct Attendee {
    #[serde(rename = "emailAddress")]
    pub email_address: EmailAddress,
    /// required, optional or resource; defaults to required
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

fn attendees(list: &[Attendee]) -> Value {
    Value::Array(
        list.iter()
            .map(|a| {
                json!({
                    "emailAddress": a.email_address,
                    "type": a.kind.as_deref().unwrap_or("required"),
                })
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateEventParams {
    pub subject: String,
    /// Body content
    pub body: String,
    /// Start, ISO 8601 (e.g. 2025-03-10T09:00:00)
    pub start_datetime: String,
    /// End, ISO 8601; must be after the start
    pub end_datetime: String,
    /// Time zone for start and end, e.g. `Pacific Standard Time` or `UTC`
    pub time_zone: String,
    /// Location display name
    pub location: Option<String>,
    pub attendees_info: Option<Vec<Attendee>>,
    pub categories: Option<Vec<String>>,
    /// Treat the body as HTML
    pub is_html: Option<bool>,
    pub is_online_meeting: Option<bool>,
    /// e.g. teamsForBusiness
    pub online_meeting_provider: Option<String>,
    /// free, tentative, busy, oof or workingElsewhere
    pub show_as: Option<String>,
    pub user_id: Option<String>,
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.naive_utc()))
}

/// Rejects a window whose start is not before its end. Unparseable values are
/// left for Graph to judge.
pub(crate) fn ensure_chronological(start: &str, end: &str) -> Result<(), OutlookError> {
    match (parse_datetime(start), parse_datetime(end)) {
        (Some(s), Some(e)) if s >= e => Err(OutlookError::Validation(format!(
            "start_datetime ({}) must be before end_datetime ({})",
            start, end
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn event_body(p: &CreateEventParams) -> Value {
    let mut event = JsonObject::new();
    event.insert("subject".into(), json!(p.subject));
    event.insert("body".into(), item_body(&p.body, p.is_html));
    event.insert(
        "start".into(),
        json!({"dateTime": p.start_datetime, "timeZone": p.time_zone}),
    );
    event.insert(
        "end".into(),
        json!({"dateTime": p.end_datetime, "timeZone": p.time_zone}),
    );
    if let Some(location) = &p.location {
        event.insert("location".into(), json!({"displayName": location}));
    }
    if let Some(list) = &p.attendees_info {
        event.insert("attendees".into(), attendees(list));
    }
    put(&mut event, "categories", p.categories.as_ref());
    put(&mut event, "isOnlineMeeting", p.is_online_meeting);
    put(&mut event, "onlineMeetingProvider", p.online_meeting_provider.as_ref());
    put(&mut event, "showAs", p.show_as.as_ref());
    Value::Object(event)
}

pub async fn create_event(client: &GraphClient, p: CreateEventParams) -> Result<Value, OutlookError> {
    ensure_chronological(&p.start_datetime, &p.end_datetime)?;
    let path = format!("{}/events", user_path(p.user_id.as_deref()));
    client.post(&path, event_body(&p)).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteEventParams {
    pub event_id: String,
    /// Set to false to suppress cancellation notices
    pub send_notifications: Option<bool>,
    pub user_id: Option<String>,
}

pub async fn delete_event(client: &GraphClient, p: DeleteEventParams) -> Result<Value, OutlookError> {
    let path = format!("{}/events/{}", user_path(p.user_id.as_deref()), p.event_id);
    let mut request = GraphRequest::new();
    if p.send_notifications == Some(false) {
        request = request.with_header("Prefer", "outlook.notification-handling=suppress");
    }
    client.call_no_content(Method::DELETE, &path, request).await?;
    Ok(json!({"message": "Event deleted successfully"}))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetEventParams {
    pub event_id: String,
    pub user_id: Option<String>,
}

pub async fn get_event(client: &GraphClient, p: GetEventParams) -> Result<Value, OutlookError> {
    let path = format!("{}/events/{}", user_path(p.user_id.as_deref()), p.event_id);
    client.get(&path, Vec::new()).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateCalendarEventParams {
    pub event_id: String,
    pub subject: Option<String>,
    /// Body object, e.g. `{"contentType": "HTML", "content": "<p>Agenda</p>"}`
    pub body: Option<JsonObject>,
    /// New start, ISO 8601
    pub start_datetime: Option<String>,
    /// New end, ISO 8601
    pub end_datetime: Option<String>,
    /// Time zone applied to start and end
    pub time_zone: Option<String>,
    /// Location object, e.g. `{"displayName": "Room 4"}`
    pub location: Option<JsonObject>,
    pub attendees: Option<Vec<Attendee>>,
    pub categories: Option<Vec<String>>,
    /// free, tentative, busy, oof or workingElsewhere
    pub show_as: Option<String>,
    pub user_id: Option<String>,
}

fn time_slot(datetime: Option<&String>, time_zone: Option<&String>) -> Option<Value> {
    if datetime.is_none() && time_zone.is_none() {
        return None;
    }
    let mut slot = JsonObject::new();
    put(&mut slot, "dateTime", datetime);
    put(&mut slot, "timeZone", time_zone);
    Some(Value::Object(slot))
}

pub(crate) fn event_update_body(p: &UpdateCalendarEventParams) -> Result<Value, OutlookError> {
    let mut update = JsonObject::new();
    put(&mut update, "subject", p.subject.as_ref());
    put(&mut update, "body", p.body.as_ref());
    put(
        &mut update,
        "start",
        time_slot(p.start_datetime.as_ref(), p.time_zone.as_ref()),
    );
    put(
        &mut update,
        "end",
        time_slot(p.end_datetime.as_ref(), p.time_zone.as_ref()),
    );
    put(&mut update, "location", p.location.as_ref());
    if let Some(list) = &p.attendees {
        update.insert("attendees".into(), attendees(list));
    }
    put(&mut update, "categories", p.categories.as_ref());
    put(&mut update, "showAs", p.show_as.as_ref());

    if update.is_empty() {
        return Err(OutlookError::Validation(
            "At least one field must be provided to update the event.".to_string(),
        ));
    }
    Ok(Value::Object(update))
}

pub async fn update_calendar_event(
    client: &GraphClient,
    p: UpdateCalendarEventParams,
) -> Result<Value, OutlookError> {
    if let (Some(start), Some(end)) = (&p.start_datetime, &p.end_datetime) {
        ensure_chronological(start, end)?;
    }
    let update = event_update_body(&p)?;
    let path = format!("{}/events/{}", user_path(p.user_id.as_deref()), p.event_id);
    client.patch(&path, update).await
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct DateTimeTimeZone {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetScheduleParams {
    /// Addresses of the users, groups or rooms to check
    #[serde(rename = "Schedules")]
    pub schedules: Vec<String>,
    #[serde(rename = "StartTime")]
    pub start_time: DateTimeTimeZone,
    #[serde(rename = "EndTime")]
    pub end_time: DateTimeTimeZone,
    /// Slot length in minutes, e.g. "30"
    #[serde(rename = "availabilityViewInterval")]
    pub availability_view_interval: Option<String>,
}

pub async fn get_schedule(client: &GraphClient, p: GetScheduleParams) -> Result<Value, OutlookError> {
    let mut body = JsonObject::new();
    body.insert("schedules".into(), json!(p.schedules));
    body.insert("startTime".into(), json!(p.start_time));
    body.insert("endTime".into(), json!(p.end_time));
    if let Some(raw) = &p.availability_view_interval {
        let minutes: u32 = raw.trim().parse().map_err(|_| {
            OutlookError::Validation(format!(
                "availabilityViewInterval must be a whole number of minutes, got '{}'",
                raw
            ))
        })?;
        body.insert("availabilityViewInterval".into(), json!(minutes));
    }
    client.post("/me/calendar/getSchedule", Value::Object(body)).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListCalendarsParams {
    #[serde(flatten)]
    pub options: ListOptions,
    pub user_id: Option<String>,
}

pub async fn list_calendars(
    client: &GraphClient,
    p: ListCalendarsParams,
) -> Result<Value, OutlookError> {
    let path = format!("{}/calendars", user_path(p.user_id.as_deref()));
    client.get(&path, p.options.query().build()).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListEventAttachmentsParams {
    pub event_id: String,
    #[serde(flatten)]
    pub options: ListOptions,
    pub user_id: Option<String>,
}

pub async fn list_event_attachments(
    client: &GraphClient,
    p: ListEventAttachmentsParams,
) -> Result<Value, OutlookError> {
    let path = format!(
        "{}/events/{}/attachments",
        user_path(p.user_id.as_deref()),
        p.event_id
    );
    client.get(&path, p.options.query().build()).await
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListRemindersParams {
    /// Window start, ISO 8601
    pub start_date_time: String,
    /// Window end, ISO 8601
    pub end_date_time: String,
    pub user_id: Option<String>,
}

pub async fn list_reminders(
    client: &GraphClient,
    p: ListRemindersParams,
) -> Result<Value, OutlookError> {
    let path = format!(
        "{}/reminderView(startDateTime={},endDateTime={})",
        user_path(p.user_id.as_deref()),
        odata_str(&p.start_date_time),
        odata_str(&p.end_date_time)
    );
    client.get(&path, Vec::new()).await
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListEventsParams {
    /// Accepted for compatibility; recurring events are returned as stored
    pub expand_recurring_events: Option<bool>,
    /// OData filter expression
    pub filter: Option<String>,
    /// e.g. `start/dateTime desc`
    pub orderby: Option<Vec<String>>,
    pub select: Option<Vec<String>>,
    pub skip: Option<u32>,
    /// Time zone used for start and end in the response
    pub timezone: Option<String>,
    pub top: Option<u32>,
    pub user_id: Option<String>,
}

pub(crate) fn list_events_request(p: &ListEventsParams) -> GraphRequest {
    let query = Query::new()
        .text("$filter", p.filter.as_deref())
        .list("$orderby", p.orderby.as_deref())
        .list("$select", p.select.as_deref())
        .number("$skip", p.skip)
        .number("$top", p.top)
        .build();
    let mut request = GraphRequest::new().with_query(query);
    if let Some(tz) = p.timezone.as_deref().filter(|t| !t.is_empty()) {
        request = request.with_header("Prefer", format!("outlook.timezone=\"{}\"", tz));
    }
    request
}

pub async fn list_events(client: &GraphClient, p: ListEventsParams) -> Result<Value, OutlookError> {
    let path = format!("{}/events", user_path(p.user_id.as_deref()));
    client.call(Method::GET, &path, list_events_request(&p)).await
}
