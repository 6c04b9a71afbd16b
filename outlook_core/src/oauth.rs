use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OutlookError;

pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAuthStart {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: Option<String>,
    pub expires_in: i64,
    pub interval: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub id_token: Option<String>,
}

/// Result of a single device-code poll.
#[derive(Debug, Clone)]
pub enum DevicePoll {
    Pending,
    SlowDown,
    Complete(OAuthTokens),
}

fn endpoint(authority: &str, leaf: &str) -> String {
    format!("{}/oauth2/v2.0/{}", authority.trim_end_matches('/'), leaf)
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|s| s.as_str()).map(|s| s.to_string())
}

fn parse_tokens(v: &Value) -> Result<OAuthTokens, OutlookError> {
    let access_token = str_field(v, "access_token").ok_or_else(|| {
        OutlookError::Authentication("token response did not include an access_token".into())
    })?;
    Ok(OAuthTokens {
        access_token,
        refresh_token: str_field(v, "refresh_token"),
        expires_in: v.get("expires_in").and_then(|i| i.as_i64()),
        scope: str_field(v, "scope"),
        token_type: str_field(v, "token_type"),
        id_token: str_field(v, "id_token"),
    })
}

fn describe_error(v: &Value) -> String {
    match (str_field(v, "error"), str_field(v, "error_description")) {
        (Some(code), Some(desc)) => format!("{}: {}", code, desc),
        (Some(code), None) => code,
        _ => v.to_string(),
    }
}

async fn post_form(
    http: &reqwest::Client,
    url: String,
    form: &[(&str, String)],
) -> Result<(reqwest::StatusCode, Value), OutlookError> {
    let resp = http.post(url).form(form).send().await?;
    let status = resp.status();
    let v = resp.json::<Value>().await?;
    Ok((status, v))
}

pub async fn ms_device_authorize(
    http: &reqwest::Client,
    authority: &str,
    client_id: &str,
    scopes: &str,
) -> Result<DeviceAuthStart, OutlookError> {
    let body = [
        ("client_id", client_id.to_string()),
        ("scope", scopes.to_string()),
    ];
    let (status, v) = post_form(http, endpoint(authority, "devicecode"), &body).await?;
    if !status.is_success() {
        return Err(OutlookError::Authentication(format!(
            "device authorize failed: {}",
            describe_error(&v)
        )));
    }
    let device_code = str_field(&v, "device_code").ok_or_else(|| {
        OutlookError::Authentication("device authorize response had no device_code".into())
    })?;
    Ok(DeviceAuthStart {
        device_code,
        user_code: str_field(&v, "user_code").unwrap_or_default(),
        verification_uri: str_field(&v, "verification_uri").unwrap_or_default(),
        verification_uri_complete: str_field(&v, "verification_uri_complete"),
        expires_in: v["expires_in"].as_i64().unwrap_or(900),
        interval: v.get("interval").and_then(|i| i.as_i64()),
        message: str_field(&v, "message"),
    })
}

pub async fn ms_device_poll(
    http: &reqwest::Client,
    authority: &str,
    client_id: &str,
    device_code: &str,
) -> Result<DevicePoll, OutlookError> {
    let body = [
        ("grant_type", DEVICE_CODE_GRANT.to_string()),
        ("client_id", client_id.to_string()),
        ("device_code", device_code.to_string()),
    ];
    let (status, v) = post_form(http, endpoint(authority, "token"), &body).await?;
    if status.is_success() {
        return parse_tokens(&v).map(DevicePoll::Complete);
    }
    match v.get("error").and_then(|e| e.as_str()) {
        Some("authorization_pending") => Ok(DevicePoll::Pending),
        Some("slow_down") => Ok(DevicePoll::SlowDown),
        Some("expired_token") => Err(OutlookError::Authentication(
            "device code expired before sign-in completed".into(),
        )),
        Some("access_denied") => Err(OutlookError::Authentication(
            "sign-in was declined".into(),
        )),
        _ => Err(OutlookError::Authentication(format!(
            "poll failed: {}",
            describe_error(&v)
        ))),
    }
}

pub async fn ms_refresh_token(
    http: &reqwest::Client,
    authority: &str,
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
    scopes: &str,
) -> Result<OAuthTokens, OutlookError> {
    let mut body = vec![
        ("grant_type", "refresh_token".to_string()),
        ("client_id", client_id.to_string()),
        ("refresh_token", refresh_token.to_string()),
        ("scope", scopes.to_string()),
    ];
    if let Some(s) = client_secret {
        if !s.is_empty() {
            body.push(("client_secret", s.to_string()));
        }
    }
    let (status, v) = post_form(http, endpoint(authority, "token"), &body).await?;
    if !status.is_success() {
        return Err(OutlookError::Authentication(format!(
            "refresh failed: {}",
            describe_error(&v)
        )));
    }
    parse_tokens(&v)
}

/// Reads the signed-in account name out of an id token. The signature is not checked.
pub fn account_from_id_token(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    ["preferred_username", "upn", "email", "oid"]
        .iter()
        .find_map(|k| str_field(&claims, k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn id_token(claims: Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            engine.encode(br#"{"alg":"none"}"#),
            engine.encode(claims.to_string())
        )
    }

    #[test]
    fn account_prefers_username_claim() {
        let token = id_token(json!({"oid": "abc", "preferred_username": "ada@contoso.com"}));
        assert_eq!(account_from_id_token(&token).as_deref(), Some("ada@contoso.com"));
        let token = id_token(json!({"oid": "abc"}));
        assert_eq!(account_from_id_token(&token).as_deref(), Some("abc"));
        assert_eq!(account_from_id_token("garbage"), None);
    }

    #[tokio::test]
    async fn poll_maps_pending_and_terminal_errors() {
        let server = MockServer::start();
        let pending = server.mock(|when, then| {
            when.method(POST)
                .path("/common/oauth2/v2.0/token")
                .body_contains("device_code=pending-code");
            then.status(400)
                .json_body(json!({"error": "authorization_pending"}));
        });
        let denied = server.mock(|when, then| {
            when.method(POST)
                .path("/common/oauth2/v2.0/token")
                .body_contains("device_code=denied-code");
            then.status(400).json_body(json!({"error": "access_denied"}));
        });

        let http = reqwest::Client::new();
        let authority = server.url("/common");

        let outcome = ms_device_poll(&http, &authority, "cid", "pending-code")
            .await
            .unwrap();
        assert!(matches!(outcome, DevicePoll::Pending));

        let err = ms_device_poll(&http, &authority, "cid", "denied-code")
            .await
            .unwrap_err();
        assert!(matches!(err, OutlookError::Authentication(_)));

        pending.assert();
        denied.assert();
    }

    #[tokio::test]
    async fn device_authorize_reports_provider_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/common/oauth2/v2.0/devicecode");
            then.status(400).json_body(json!({
                "error": "invalid_client",
                "error_description": "AADSTS700016: Application not found"
            }));
        });

        let err = ms_device_authorize(&reqwest::Client::new(), &server.url("/common"), "cid", "User.Read")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_client"));
    }
}
