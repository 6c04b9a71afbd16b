mod common;

use common::{args, signed_in_client, signed_out_client};
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use outlook_core::tools::{find_tool, TOOLS};
use outlook_core::ToolRegistry;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn every_tool_requires_authentication() {
    let server = MockServer::start_async().await;
    let client = signed_out_client(&server);

    for entry in TOOLS {
        let envelope = entry.call(&client, Default::default()).await;
        assert!(!envelope.is_successful(), "{} succeeded while signed out", entry.name);
        assert_eq!(
            envelope.error(),
            Some("Not authenticated. Please authenticate first."),
            "{}",
            entry.name
        );
        assert_eq!(envelope.data(), &json!({}));
    }
}

#[tokio::test]
async fn send_email_posts_once_and_reports_success() {
    let server = MockServer::start_async().await;
    let send = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1.0/me/sendMail")
                .header("Authorization", "Bearer test-token")
                .json_body(json!({
                    "message": {
                        "subject": "Hello",
                        "body": {"contentType": "Text", "content": "Hi there"},
                        "toRecipients": [
                            {"emailAddress": {"address": "bob@contoso.com", "name": "bob@contoso.com"}}
                        ]
                    }
                }));
            then.status(202);
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("send_email")
        .unwrap()
        .call(
            &client,
            args(json!({"subject": "Hello", "body": "Hi there", "to_email": "bob@contoso.com"})),
        )
        .await;

    send.assert_hits_async(1).await;
    assert!(envelope.is_successful());
    assert_eq!(
        envelope.to_value(),
        json!({"successful": true, "data": {"message": "Email sent successfully"}})
    );
}

#[tokio::test]
async fn list_messages_targets_folder_with_filter() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1.0/me/mailFolders/inbox/messages")
                .query_param("$filter", "isRead eq false")
                .query_param("$top", "10");
            then.status(200)
                .json_body(json!({"value": [{"id": "m1", "isRead": false}]}));
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("list_messages")
        .unwrap()
        .call(&client, args(json!({"folder": "inbox", "is_read": false, "top": 10})))
        .await;

    list.assert_async().await;
    assert!(envelope.is_successful());
    assert_eq!(envelope.data()["value"][0]["id"], "m1");
}

#[tokio::test]
async fn list_messages_for_another_user_escapes_quotes() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1.0/ada@contoso.com/messages")
                .query_param("$filter", "subject eq 'Bob''s report'");
            then.status(200).json_body(json!({"value": []}));
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("list_messages")
        .unwrap()
        .call(
            &client,
            args(json!({"user_id": "ada@contoso.com", "subject": "Bob's report"})),
        )
        .await;

    list.assert_async().await;
    assert!(envelope.is_successful());
}

#[tokio::test]
async fn invalid_arguments_become_failed_envelope() {
    let server = MockServer::start_async().await;
    let client = signed_in_client(&server).await;

    let envelope = find_tool("get_contact")
        .unwrap()
        .call(&client, args(json!({"user_id": "ada@contoso.com"})))
        .await;

    assert!(!envelope.is_successful());
    assert!(envelope.error().unwrap().starts_with("Invalid arguments"));
}

#[tokio::test]
async fn graph_failure_carries_status_and_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/me/contacts/missing");
            then.status(404).json_body(json!({
                "error": {"code": "ErrorItemNotFound", "message": "The specified object was not found in the store."}
            }));
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("get_contact")
        .unwrap()
        .call(&client, args(json!({"contact_id": "missing"})))
        .await;

    assert!(!envelope.is_successful());
    let error = envelope.error().unwrap();
    assert!(error.contains("404"), "{}", error);
    assert!(error.contains("The specified object was not found in the store."));
}

#[tokio::test]
async fn contact_round_trip() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1.0/me/contacts").json_body(json!({
                "givenName": "Ada",
                "surname": "Lovelace",
                "emailAddresses": [{"address": "ada@contoso.com", "name": "Ada"}],
                "homePhones": ["+44 20 7946 0000"]
            }));
            then.status(201)
                .json_body(json!({"id": "c1", "givenName": "Ada", "surname": "Lovelace"}));
        })
        .await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/me/contacts/c1");
            then.status(200)
                .json_body(json!({"id": "c1", "givenName": "Ada", "surname": "Lovelace"}));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/v1.0/me/contacts/c1");
            then.status(204);
        })
        .await;

    let client = signed_in_client(&server).await;
    let registry = ToolRegistry::builtin(client);

    let created = registry
        .call(
            "create_contact",
            args(json!({
                "givenName": "Ada",
                "surname": "Lovelace",
                "emailAddresses": [{"address": "ada@contoso.com", "name": "Ada"}],
                "homePhone": "+44 20 7946 0000"
            })),
        )
        .await
        .unwrap();
    assert!(created.is_successful(), "{:?}", created.error());
    let id = created.data()["id"].as_str().unwrap().to_string();

    let fetched = registry
        .call("get_contact", args(json!({"contact_id": id})))
        .await
        .unwrap();
    assert_eq!(fetched.data()["givenName"], "Ada");

    let deleted = registry
        .call("delete_contact", args(json!({"contact_id": "c1"})))
        .await
        .unwrap();
    assert_eq!(deleted.data(), &json!({"message": "Contact deleted successfully"}));

    create.assert_async().await;
    get.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn delete_event_can_suppress_notifications() {
    let server = MockServer::start_async().await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/v1.0/me/events/e1")
                .header("Prefer", "outlook.notification-handling=suppress");
            then.status(204);
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("delete_event")
        .unwrap()
        .call(&client, args(json!({"event_id": "e1", "send_notifications": false})))
        .await;

    delete.assert_async().await;
    assert_eq!(envelope.data(), &json!({"message": "Event deleted successfully"}));
}

#[tokio::test]
async fn create_event_rejects_reversed_times() {
    let server = MockServer::start_async().await;
    let client = signed_in_client(&server).await;

    let envelope = find_tool("create_event")
        .unwrap()
        .call(
            &client,
            args(json!({
                "subject": "Sync",
                "body": "Weekly",
                "start_datetime": "2025-03-01T10:00:00",
                "end_datetime": "2025-03-01T09:00:00",
                "time_zone": "UTC"
            })),
        )
        .await;

    assert!(!envelope.is_successful());
    assert!(envelope.error().unwrap().contains("must be before"));
}

#[tokio::test]
async fn download_attachment_writes_decoded_bytes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/me/messages/m1/attachments/a1");
            then.status(200).json_body(json!({
                "name": "notes.txt",
                "contentType": "text/plain",
                "contentBytes": "aGVsbG8gd29ybGQ="
            }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("saved.txt");
    let file_name = target.to_string_lossy().to_string();

    let client = signed_in_client(&server).await;
    let envelope = find_tool("download_outlook_attachment")
        .unwrap()
        .call(
            &client,
            args(json!({"message_id": "m1", "attachment_id": "a1", "file_name": file_name})),
        )
        .await;

    assert!(envelope.is_successful(), "{:?}", envelope.error());
    assert_eq!(
        envelope.data(),
        &json!({
            "file_name": file_name,
            "size": 11,
            "content_type": "text/plain",
            "name": "notes.txt"
        })
    );
    assert_eq!(std::fs::read(&target).unwrap(), b"hello world");
}

#[tokio::test]
async fn download_attachment_without_content_fails() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/me/messages/m1/attachments/ref");
            then.status(200)
                .json_body(json!({"name": "link", "contentType": "text/html"}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("never.bin");

    let client = signed_in_client(&server).await;
    let envelope = find_tool("download_outlook_attachment")
        .unwrap()
        .call(
            &client,
            args(json!({
                "message_id": "m1",
                "attachment_id": "ref",
                "file_name": target.to_string_lossy()
            })),
        )
        .await;

    assert!(!envelope.is_successful());
    assert!(!target.exists());
}

#[tokio::test]
async fn event_attachment_reads_local_file() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1.0/me/events/e1/attachments")
                .json_body(json!({
                    "@odata.type": "#microsoft.graph.fileAttachment",
                    "name": "agenda.txt",
                    "contentBytes": "YWdlbmRh"
                }));
            then.status(201).json_body(json!({"id": "att1"}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agenda.txt");
    std::fs::write(&path, "agenda").unwrap();

    let client = signed_in_client(&server).await;
    let envelope = find_tool("add_event_attachment")
        .unwrap()
        .call(
            &client,
            args(json!({
                "event_id": "e1",
                "name": "agenda.txt",
                "odata_type": "#microsoft.graph.fileAttachment",
                "file_path": path.to_string_lossy()
            })),
        )
        .await;

    upload.assert_async().await;
    assert_eq!(envelope.data()["id"], "att1");
}

#[tokio::test]
async fn event_attachment_missing_file() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1.0/me/events/e1/attachments");
            then.status(201).json_body(json!({"id": "att1"}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt");

    let client = signed_in_client(&server).await;
    let envelope = find_tool("add_event_attachment")
        .unwrap()
        .call(
            &client,
            args(json!({
                "event_id": "e1",
                "name": "absent.txt",
                "odata_type": "#microsoft.graph.fileAttachment",
                "file_path": path.to_string_lossy()
            })),
        )
        .await;

    upload.assert_hits_async(0).await;
    assert!(envelope.error().unwrap().starts_with("File not found"));
}

#[tokio::test]
async fn repeated_list_calls_build_the_same_request() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1.0/me/events")
                .query_param("$orderby", "start/dateTime")
                .query_param("$select", "subject,start,end")
                .query_param("$top", "5")
                .header("Prefer", "outlook.timezone=\"UTC\"");
            then.status(200).json_body(json!({"value": []}));
        })
        .await;

    let client = signed_in_client(&server).await;
    let call = json!({
        "orderby": ["start/dateTime"],
        "select": ["subject", "start", "end"],
        "top": 5,
        "timezone": "UTC"
    });
    let tool = find_tool("list_events").unwrap();
    let first = tool.call(&client, args(call.clone())).await;
    let second = tool.call(&client, args(call)).await;

    list.assert_hits_async(2).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn update_email_rejects_received_message() {
    let server = MockServer::start_async().await;
    let lookup = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1.0/me/messages/m1")
                .query_param("$select", "isDraft");
            then.status(200).json_body(json!({"isDraft": false}));
        })
        .await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH).path("/v1.0/me/messages/m1");
            then.status(200).json_body(json!({"id": "m1"}));
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("update_email")
        .unwrap()
        .call(&client, args(json!({"message_id": "m1", "subject": "New subject"})))
        .await;

    lookup.assert_async().await;
    patch.assert_hits_async(0).await;
    assert!(envelope.error().unwrap().starts_with("Cannot update received message"));
}

#[tokio::test]
async fn update_email_ignores_failed_draft_lookup() {
    let server = MockServer::start_async().await;
    let lookup = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/me/messages/d1");
            then.status(500)
                .json_body(json!({"error": {"message": "Service unavailable"}}));
        })
        .await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/v1.0/me/messages/d1")
                .json_body(json!({"subject": "New subject", "importance": "high"}));
            then.status(200)
                .json_body(json!({"id": "d1", "subject": "New subject"}));
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("update_email")
        .unwrap()
        .call(
            &client,
            args(json!({"message_id": "d1", "subject": "New subject", "importance": "high"})),
        )
        .await;

    lookup.assert_async().await;
    patch.assert_async().await;
    assert!(envelope.is_successful(), "{:?}", envelope.error());
    assert_eq!(envelope.data()["subject"], "New subject");
}

#[tokio::test]
async fn update_email_rewords_draft_rejection() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/me/messages/d2");
            then.status(200).json_body(json!({"isDraft": true}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/v1.0/me/messages/d2");
            then.status(400).json_body(json!({
                "error": {"code": "ErrorInvalidRequest", "message": "The item is not a draft."}
            }));
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("update_email")
        .unwrap()
        .call(&client, args(json!({"message_id": "d2", "subject": "x"})))
        .await;

    let error = envelope.error().unwrap();
    assert!(error.starts_with("Cannot update this message. Only draft messages can be updated."), "{}", error);
    assert!(error.ends_with("The item is not a draft."));
}

#[tokio::test]
async fn create_draft_uploads_attachment_to_new_draft() {
    let server = MockServer::start_async().await;
    let draft = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1.0/me/messages").json_body(json!({
                "subject": "Report",
                "body": {"contentType": "Text", "content": "See attached"},
                "toRecipients": [{"emailAddress": {"address": "bob@contoso.com"}}]
            }));
            then.status(201).json_body(json!({"id": "d1", "isDraft": true}));
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1.0/me/messages/d1/attachments")
                .json_body(json!({
                    "@odata.type": "#microsoft.graph.fileAttachment",
                    "name": "report.csv",
                    "contentType": "application/octet-stream",
                    "contentBytes": "YSxiCjEsMg=="
                }));
            then.status(201).json_body(json!({"id": "att1"}));
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("create_draft")
        .unwrap()
        .call(
            &client,
            args(json!({
                "subject": "Report",
                "body": "See attached",
                "to_recipients": ["bob@contoso.com"],
                "attachment": {"name": "report.csv", "contentBytes": "YSxiCjEsMg=="}
            })),
        )
        .await;

    draft.assert_async().await;
    upload.assert_async().await;
    assert_eq!(envelope.data()["id"], "d1");
}

#[tokio::test]
async fn get_schedule_sends_interval_as_number() {
    let server = MockServer::start_async().await;
    let schedule = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1.0/me/calendar/getSchedule")
                .json_body(json!({
                    "schedules": ["ada@contoso.com"],
                    "startTime": {"dateTime": "2025-03-10T09:00:00", "timeZone": "UTC"},
                    "endTime": {"dateTime": "2025-03-10T17:00:00", "timeZone": "UTC"},
                    "availabilityViewInterval": 30
                }));
            then.status(200).json_body(json!({"value": []}));
        })
        .await;

    let client = signed_in_client(&server).await;
    let tool = find_tool("get_schedule").unwrap();
    let window = |interval: &str| {
        args(json!({
            "Schedules": ["ada@contoso.com"],
            "StartTime": {"dateTime": "2025-03-10T09:00:00", "timeZone": "UTC"},
            "EndTime": {"dateTime": "2025-03-10T17:00:00", "timeZone": "UTC"},
            "availabilityViewInterval": interval
        }))
    };

    let ok = tool.call(&client, window("30")).await;
    assert!(ok.is_successful(), "{:?}", ok.error());

    let bad = tool.call(&client, window("half an hour")).await;
    assert!(bad.error().unwrap().contains("whole number of minutes"));

    schedule.assert_hits_async(1).await;
}

#[tokio::test]
async fn list_reminders_uses_reminder_view_function() {
    let server = MockServer::start_async().await;
    let reminders = server
        .mock_async(|when, then| {
            when.method(GET).path(
                "/v1.0/me/reminderView(startDateTime='2025-03-01T00:00:00',endDateTime='2025-03-08T00:00:00')",
            );
            then.status(200)
                .json_body(json!({"value": [{"eventSubject": "Standup"}]}));
        })
        .await;

    let client = signed_in_client(&server).await;
    let envelope = find_tool("list_reminders")
        .unwrap()
        .call(
            &client,
            args(json!({
                "startDateTime": "2025-03-01T00:00:00",
                "endDateTime": "2025-03-08T00:00:00"
            })),
        )
        .await;

    reminders.assert_async().await;
    assert_eq!(envelope.data()["value"][0]["eventSubject"], "Standup");
}
