#![allow(dead_code)]

use std::sync::Arc;

use httpmock::MockServer;
use outlook_core::auth_store::{MemoryTokenStore, TokenStore};
use outlook_core::token::{AuthSettings, Credential, TokenCache};
use outlook_core::{GraphClient, JsonObject, TokenManager};
use serde_json::Value;

pub const CLIENT_ID: &str = "test-client";

fn auth(server: &MockServer) -> AuthSettings {
    AuthSettings {
        client_id: CLIENT_ID.into(),
        client_secret: None,
        authority: server.url("/common"),
        scopes: "User.Read Mail.ReadWrite".into(),
    }
}

/// A client holding a fresh cached credential (`Bearer test-token`).
pub async fn signed_in_client(server: &MockServer) -> Arc<GraphClient> {
    let store = Arc::new(MemoryTokenStore::new());
    store
        .save(
            CLIENT_ID,
            &TokenCache {
                credential: Credential {
                    access_token: "test-token".into(),
                    expires_at: chrono::Utc::now().timestamp() + 3600,
                    account: Some("ada@contoso.com".into()),
                },
                refresh_token: Some("refresh".into()),
                scope: None,
            },
        )
        .unwrap();
    let tokens = TokenManager::new(auth(server), store);
    assert!(tokens.load_cached().await);
    Arc::new(GraphClient::new(server.url("/v1.0"), Arc::new(tokens)))
}

/// A client that has never signed in.
pub fn signed_out_client(server: &MockServer) -> Arc<GraphClient> {
    let tokens = TokenManager::new(auth(server), Arc::new(MemoryTokenStore::new()));
    Arc::new(GraphClient::new(server.url("/v1.0"), Arc::new(tokens)))
}

pub fn args(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}
