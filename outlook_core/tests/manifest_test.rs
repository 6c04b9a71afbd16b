mod common;

use common::{args, signed_in_client, signed_out_client};
use httpmock::prelude::*;
use outlook_core::{load_manifest, ToolRegistry};
use serde_json::json;
use std::io::Write;

fn manifest_file(suffix: &str, text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn yaml_manifest_binds_renamed_tools() {
    let server = MockServer::start_async().await;
    let file = manifest_file(
        ".yaml",
        r#"
tools:
  - id: outlook_get_profile
    target: "profile:get_profile"
    description: Signed-in user's profile
  - id: outlook_list_messages
    target: list_messages
  - id: broken
    target: no_such_tool
  - id: ""
    target: get_profile
"#,
    );

    let registry = ToolRegistry::from_manifest(file.path(), signed_out_client(&server)).unwrap();
    assert_eq!(registry.len(), 2);

    let profile = registry.get("outlook_get_profile").unwrap();
    assert_eq!(profile.target(), "get_profile");
    assert_eq!(profile.description(), "Signed-in user's profile");
    assert!(registry.get("broken").is_none());

    let listed: Vec<String> = registry
        .list_tools()
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();
    assert_eq!(listed, vec!["outlook_get_profile", "outlook_list_messages"]);
}

#[tokio::test]
async fn json_manifest_schema_overrides_builtin() {
    let server = MockServer::start_async().await;
    let file = manifest_file(
        ".json",
        &json!({
            "tools": [{
                "id": "profile",
                "target": "get_profile",
                "input_schema": {
                    "type": "object",
                    "properties": {"user_id": {"type": ["string", "null"]}}
                }
            }]
        })
        .to_string(),
    );

    let descriptors = load_manifest(file.path()).unwrap();
    assert_eq!(descriptors.len(), 1);

    let registry = ToolRegistry::from_descriptors(&descriptors, signed_out_client(&server));
    let tool = registry.get("profile").unwrap();
    assert_eq!(
        tool.input_schema().get("properties"),
        Some(&json!({"user_id": {"type": "string"}}))
    );
}

#[tokio::test]
async fn missing_manifest_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_manifest(&dir.path().join("tools_manifest.yaml")).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[tokio::test]
async fn bound_tool_calls_through_shared_client() {
    let server = MockServer::start_async().await;
    let me = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/me");
            then.status(200)
                .json_body(json!({"displayName": "Ada Lovelace", "mail": "ada@contoso.com"}));
        })
        .await;

    let file = manifest_file(".yml", "tools:\n  - id: whoami\n    target: get_profile\n");
    let registry = ToolRegistry::from_manifest(file.path(), signed_in_client(&server).await).unwrap();

    let envelope = registry.call("whoami", args(json!({}))).await.unwrap();
    me.assert_async().await;
    assert!(envelope.is_successful());
    assert_eq!(envelope.data()["displayName"], "Ada Lovelace");

    let missing = registry.call("get_profile", args(json!({}))).await;
    assert!(missing.is_err());
}
