//! Credential lifecycle: device-code sign-in, durable caching and silent refresh.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth_store::{FileTokenStore, TokenStore};
use crate::config::Settings;
use crate::error::OutlookError;
use crate::oauth::{self, DeviceAuthStart, DevicePoll, OAuthTokens};

/// Seconds shaved off `expires_in` so a token is never used right at its edge.
const EXPIRY_SKEW_SECS: i64 = 60;
const DEFAULT_POLL_INTERVAL_SECS: i64 = 5;
const SLOW_DOWN_STEP_SECS: i64 = 5;

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    /// Unix seconds after which the token is treated as expired.
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= now_epoch()
    }
}

/// The serialized blob kept in the token store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCache {
    pub credential: Credential,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenCache {
    fn from_tokens(tokens: OAuthTokens, previous: Option<&TokenCache>) -> Self {
        let expires_in = tokens.expires_in.unwrap_or(3600);
        let account = tokens
            .id_token
            .as_deref()
            .and_then(oauth::account_from_id_token)
            .or_else(|| previous.and_then(|p| p.credential.account.clone()));
        Self {
            credential: Credential {
                access_token: tokens.access_token,
                expires_at: now_epoch() + expires_in - EXPIRY_SKEW_SECS,
                account,
            },
            refresh_token: tokens
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            scope: tokens.scope.or_else(|| previous.and_then(|p| p.scope.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub authority: String,
    pub scopes: String,
}

impl From<&Settings> for AuthSettings {
    fn from(s: &Settings) -> Self {
        Self {
            client_id: s.client_id.clone(),
            client_secret: s.client_secret.clone(),
            authority: s.authority.clone(),
            scopes: s.scope_string(),
        }
    }
}

pub struct TokenManager {
    auth: AuthSettings,
    store: Arc<dyn TokenStore>,
    http: reqwest::Client,
    state: Mutex<Option<TokenCache>>,
}

impl TokenManager {
    pub fn new(auth: AuthSettings, store: Arc<dyn TokenStore>) -> Self {
        Self {
            auth,
            store,
            http: reqwest::Client::new(),
            state: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            AuthSettings::from(settings),
            Arc::new(FileTokenStore::new(settings.token_cache_path.clone())),
        )
    }

    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.auth.client_id
    }

    /// Silent startup path: adopt a cached credential, refreshing it if it has
    /// expired. Returns whether a usable credential is now held.
    pub async fn load_cached(&self) -> bool {
        let Some(cached) = self.store.load(&self.auth.client_id) else {
            debug!("no cached credential");
            return false;
        };
        let mut state = self.state.lock().await;
        *state = Some(cached);
        match self.refresh_locked(&mut state, false).await {
            Ok(_) => {
                info!(
                    account = state
                        .as_ref()
                        .and_then(|c| c.credential.account.as_deref())
                        .unwrap_or("unknown"),
                    "restored cached credential"
                );
                true
            }
            Err(e) => {
                warn!("cached credential could not be refreshed: {}", e);
                *state = None;
                false
            }
        }
    }

    /// The held credential, if any and not yet expired.
    pub async fn current_credential(&self) -> Option<Credential> {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|c| c.credential.clone())
            .filter(|c| !c.is_expired())
    }

    /// True once a credential has been obtained, even if it now needs a refresh.
    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Refreshes the credential when it has expired. `Ok(true)` means a refresh happened.
    pub async fn refresh_if_expired(&self) -> Result<bool, OutlookError> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state, false).await
    }

    /// Unconditional silent refresh, used after the API rejects a token.
    pub async fn force_refresh(&self) -> Result<Credential, OutlookError> {
        let mut state = self.state.lock().await;
        match self.refresh_locked(&mut state, true).await {
            Ok(_) => state
                .as_ref()
                .map(|c| c.credential.clone())
                .ok_or(OutlookError::AuthenticationExpired),
            Err(OutlookError::AuthenticationRequired) => Err(OutlookError::AuthenticationRequired),
            Err(e) => {
                warn!("silent refresh failed: {}", e);
                // The rejected token must not be reported or reused as valid.
                if let Some(cache) = state.as_mut() {
                    cache.credential.expires_at = 0;
                    self.persist(cache);
                }
                Err(OutlookError::AuthenticationExpired)
            }
        }
    }

    /// A valid access token, refreshing first when the held one has expired.
    pub async fn bearer_token(&self) -> Result<String, OutlookError> {
        let mut state = self.state.lock().await;
        match self.refresh_locked(&mut state, false).await {
            Ok(_) => {}
            Err(OutlookError::AuthenticationRequired) => {
                return Err(OutlookError::AuthenticationRequired)
            }
            Err(e) => {
                warn!("silent refresh failed: {}", e);
                return Err(OutlookError::AuthenticationExpired);
            }
        }
        state
            .as_ref()
            .map(|c| c.credential.access_token.clone())
            .ok_or(OutlookError::AuthenticationRequired)
    }

    async fn refresh_locked(
        &self,
        state: &mut Option<TokenCache>,
        force: bool,
    ) -> Result<bool, OutlookError> {
        let cache = state.as_ref().ok_or(OutlookError::AuthenticationRequired)?;
        if !force && !cache.credential.is_expired() {
            return Ok(false);
        }
        let refresh_token = cache.refresh_token.as_deref().ok_or_else(|| {
            OutlookError::Authentication("no refresh token is cached".to_string())
        })?;
        debug!("refreshing access token");
        let tokens = oauth::ms_refresh_token(
            &self.http,
            &self.auth.authority,
            &self.auth.client_id,
            self.auth.client_secret.as_deref(),
            refresh_token,
            &self.auth.scopes,
        )
        .await?;
        let refreshed = TokenCache::from_tokens(tokens, Some(cache));
        self.persist(&refreshed);
        *state = Some(refreshed);
        Ok(true)
    }

    fn persist(&self, cache: &TokenCache) {
        if let Err(e) = self.store.save(&self.auth.client_id, cache) {
            warn!("could not persist token cache: {}", e);
        }
    }

    /// First step of the device-code flow. Errors are reported, not retried.
    pub async fn start_device_flow(&self) -> Result<DeviceAuthStart, OutlookError> {
        oauth::ms_device_authorize(
            &self.http,
            &self.auth.authority,
            &self.auth.client_id,
            &self.auth.scopes,
        )
        .await
    }

    /// One poll of the token endpoint. `Ok(None)` while the user has not finished.
    pub async fn poll_device_flow(
        &self,
        device_code: &str,
    ) -> Result<Option<Credential>, OutlookError> {
        match oauth::ms_device_poll(
            &self.http,
            &self.auth.authority,
            &self.auth.client_id,
            device_code,
        )
        .await?
        {
            DevicePoll::Pending | DevicePoll::SlowDown => Ok(None),
            DevicePoll::Complete(tokens) => Ok(Some(self.adopt(tokens).await)),
        }
    }

    /// Polls until the user completes sign-in or the device code expires.
    pub async fn complete_device_flow(
        &self,
        start: &DeviceAuthStart,
    ) -> Result<Credential, OutlookError> {
        let deadline = tokio::time::Instant::now()
            + Duration::from_secs(start.expires_in.max(0) as u64);
        let mut interval = start.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS).max(0);

        loop {
            match oauth::ms_device_poll(
                &self.http,
                &self.auth.authority,
                &self.auth.client_id,
                &start.device_code,
            )
            .await?
            {
                DevicePoll::Complete(tokens) => return Ok(self.adopt(tokens).await),
                DevicePoll::Pending => {}
                DevicePoll::SlowDown => interval += SLOW_DOWN_STEP_SECS,
            }
            let wait = Duration::from_secs(interval as u64);
            if tokio::time::Instant::now() + wait >= deadline {
                return Err(OutlookError::Authentication(
                    "timed out waiting for device sign-in".to_string(),
                ));
            }
            tokio::time::sleep(wait).await;
        }
    }

    /// Interactive sign-in. `prompt` is handed the code and URL to show the user.
    pub async fn authenticate<F>(&self, prompt: F) -> Result<Credential, OutlookError>
    where
        F: FnOnce(&DeviceAuthStart),
    {
        let start = self.start_device_flow().await?;
        prompt(&start);
        self.complete_device_flow(&start).await
    }

    /// [`authenticate`](Self::authenticate) on its own task, so the caller can
    /// keep serving while the user completes sign-in in a browser.
    pub fn spawn_authenticate<F>(
        self: &Arc<Self>,
        prompt: F,
    ) -> JoinHandle<Result<Credential, OutlookError>>
    where
        F: FnOnce(&DeviceAuthStart) + Send + 'static,
    {
        let tokens = Arc::clone(self);
        tokio::spawn(async move { tokens.authenticate(prompt).await })
    }

    pub async fn sign_out(&self) -> Result<(), OutlookError> {
        *self.state.lock().await = None;
        self.store.clear(&self.auth.client_id)?;
        info!("signed out");
        Ok(())
    }

    async fn adopt(&self, tokens: OAuthTokens) -> Credential {
        let mut state = self.state.lock().await;
        let cache = TokenCache::from_tokens(tokens, state.as_ref());
        self.persist(&cache);
        let credential = cache.credential.clone();
        info!(
            account = credential.account.as_deref().unwrap_or("unknown"),
            "signed in"
        );
        *state = Some(cache);
        credential
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_store::MemoryTokenStore;
    use httpmock::prelude::*;
    use serde_json::json;

    fn manager(authority: String, store: Arc<MemoryTokenStore>) -> TokenManager {
        TokenManager::new(
            AuthSettings {
                client_id: "cid".into(),
                client_secret: None,
                authority,
                scopes: "offline_access User.Read".into(),
            },
            store,
        )
    }

    fn cache(access: &str, expires_at: i64, refresh: Option<&str>) -> TokenCache {
        TokenCache {
            credential: Credential {
                access_token: access.into(),
                expires_at,
                account: Some("ada@contoso.com".into()),
            },
            refresh_token: refresh.map(|s| s.to_string()),
            scope: None,
        }
    }

    #[tokio::test]
    async fn unauthenticated_manager_has_no_credential() {
        let tm = manager("http://127.0.0.1:9".into(), Arc::new(MemoryTokenStore::new()));
        assert!(!tm.is_authenticated().await);
        assert!(tm.current_credential().await.is_none());
        assert!(matches!(
            tm.bearer_token().await,
            Err(OutlookError::AuthenticationRequired)
        ));
        assert!(!tm.load_cached().await);
    }

    #[tokio::test]
    async fn loads_valid_cache_without_network() {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save("cid", &cache("cached", now_epoch() + 600, Some("rt")))
            .unwrap();
        let tm = manager("http://127.0.0.1:9".into(), store);

        assert!(tm.load_cached().await);
        assert_eq!(tm.bearer_token().await.unwrap(), "cached");
        assert!(!tm.refresh_if_expired().await.unwrap());
    }

    #[tokio::test]
    async fn refreshes_expired_cache_and_persists() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/common/oauth2/v2.0/token")
                .body_contains("grant_type=refresh_token")
                .body_contains("refresh_token=rt-old");
            then.status(200).json_body(json!({
                "access_token": "fresh",
                "expires_in": 3600,
                "token_type": "Bearer"
            }));
        });

        let store = Arc::new(MemoryTokenStore::new());
        store
            .save("cid", &cache("stale", now_epoch() - 10, Some("rt-old")))
            .unwrap();
        let tm = manager(server.url("/common"), store.clone());

        assert!(tm.load_cached().await);
        refresh.assert();
        let cred = tm.current_credential().await.unwrap();
        assert_eq!(cred.access_token, "fresh");
        assert_eq!(cred.account.as_deref(), Some("ada@contoso.com"));

        let saved = store.load("cid").unwrap();
        assert_eq!(saved.credential.access_token, "fresh");
        assert_eq!(saved.refresh_token.as_deref(), Some("rt-old"));
    }

    #[tokio::test]
    async fn failed_refresh_reports_expired() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/common/oauth2/v2.0/token");
            then.status(400).json_body(json!({"error": "invalid_grant"}));
        });

        let store = Arc::new(MemoryTokenStore::new());
        store
            .save("cid", &cache("valid", now_epoch() + 600, Some("rt")))
            .unwrap();
        let tm = manager(server.url("/common"), store);
        assert!(tm.load_cached().await);

        assert!(matches!(
            tm.force_refresh().await,
            Err(OutlookError::AuthenticationExpired)
        ));
    }

    #[tokio::test]
    async fn rejected_token_is_invalidated_when_refresh_fails() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/common/oauth2/v2.0/token");
            then.status(400).json_body(json!({"error": "invalid_grant"}));
        });

        let store = Arc::new(MemoryTokenStore::new());
        store
            .save("cid", &cache("rejected", now_epoch() + 600, Some("rt")))
            .unwrap();
        let tm = manager(server.url("/common"), store.clone());
        assert!(tm.load_cached().await);

        assert!(tm.force_refresh().await.is_err());
        assert!(tm.current_credential().await.is_none());
        assert!(store.load("cid").unwrap().credential.is_expired());

        // Later calls retry the refresh instead of handing out the rejected token.
        assert!(matches!(
            tm.bearer_token().await,
            Err(OutlookError::AuthenticationExpired)
        ));
        refresh.assert_hits(2);
    }

    #[tokio::test]
    async fn device_flow_stores_credential() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/common/oauth2/v2.0/devicecode")
                .body_contains("client_id=cid");
            then.status(200).json_body(json!({
                "device_code": "dev-1",
                "user_code": "ABCD-EFGH",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 0
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/common/oauth2/v2.0/token")
                .body_contains("device_code=dev-1");
            then.status(200).json_body(json!({
                "access_token": "device-token",
                "refresh_token": "device-refresh",
                "expires_in": 3600
            }));
        });

        let store = Arc::new(MemoryTokenStore::new());
        let tm = manager(server.url("/common"), store.clone());

        let mut shown = None;
        let cred = tm
            .authenticate(|start| shown = Some(start.user_code.clone()))
            .await
            .unwrap();

        assert_eq!(shown.as_deref(), Some("ABCD-EFGH"));
        assert_eq!(cred.access_token, "device-token");
        assert!(tm.is_authenticated().await);
        assert_eq!(
            store.load("cid").unwrap().refresh_token.as_deref(),
            Some("device-refresh")
        );
    }

    #[tokio::test]
    async fn spawned_sign_in_does_not_block_caller() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/common/oauth2/v2.0/devicecode");
            then.status(200).json_body(json!({
                "device_code": "dev-2",
                "user_code": "WXYZ-1234",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 0
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/common/oauth2/v2.0/token")
                .body_contains("device_code=dev-2");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({"access_token": "late-token", "expires_in": 3600}));
        });

        let tm = Arc::new(manager(server.url("/common"), Arc::new(MemoryTokenStore::new())));
        let (shown_tx, shown_rx) = tokio::sync::oneshot::channel();
        let handle = tm.spawn_authenticate(move |start| {
            let _ = shown_tx.send(start.user_code.clone());
        });

        assert_eq!(shown_rx.await.unwrap(), "WXYZ-1234");
        // Still polling; the caller is free and sees no credential yet.
        assert!(!handle.is_finished());
        assert!(!tm.is_authenticated().await);

        let cred = handle.await.unwrap().unwrap();
        assert_eq!(cred.access_token, "late-token");
        assert!(tm.is_authenticated().await);
    }

    #[tokio::test]
    async fn device_flow_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/common/oauth2/v2.0/token");
            then.status(400)
                .json_body(json!({"error": "authorization_pending"}));
        });
        let tm = manager(server.url("/common"), Arc::new(MemoryTokenStore::new()));
        let start = DeviceAuthStart {
            device_code: "dev-2".into(),
            user_code: "CODE".into(),
            verification_uri: "https://microsoft.com/devicelogin".into(),
            verification_uri_complete: None,
            expires_in: 0,
            interval: Some(0),
            message: None,
        };

        let err = tm.complete_device_flow(&start).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(!tm.is_authenticated().await);
    }

    #[tokio::test]
    async fn sign_out_clears_store() {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save("cid", &cache("cached", now_epoch() + 600, None))
            .unwrap();
        let tm = manager("http://127.0.0.1:9".into(), store.clone());
        assert!(tm.load_cached().await);

        tm.sign_out().await.unwrap();
        assert!(!tm.is_authenticated().await);
        assert!(store.load("cid").is_none());
    }
}
