use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::Settings;
use crate::error::OutlookError;
use crate::token::TokenManager;

/// Optional parts of a Graph call. Query pairs keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct GraphRequest {
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl GraphRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Authenticated access to the Graph REST API.
pub struct GraphClient {
    base_url: String,
    http: reqwest::Client,
    tokens: Arc<TokenManager>,
}

impl GraphClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<TokenManager>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            tokens,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenManager::from_settings(settings).with_http(http.clone()));
        Self {
            base_url: settings.graph_endpoint.trim_end_matches('/').to_string(),
            http,
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated().await
    }

    /// Full request URL for `path` (which starts with `/`) and `query`.
    pub fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url, OutlookError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Issues a call and returns the decoded JSON body (`{}` when the body is empty).
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        request: GraphRequest,
    ) -> Result<Value, OutlookError> {
        let resp = self.send(method, path, &request).await?;
        let bytes = resp.bytes().await?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(json!({}));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Issues a call and drops the response without reading its body.
    pub async fn call_no_content(
        &self,
        method: Method,
        path: &str,
        request: GraphRequest,
    ) -> Result<(), OutlookError> {
        self.send(method, path, &request).await.map(|_| ())
    }

    pub async fn get(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<Value, OutlookError> {
        self.call(Method::GET, path, GraphRequest::new().with_query(query))
            .await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, OutlookError> {
        self.call(Method::POST, path, GraphRequest::json(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value, OutlookError> {
        self.call(Method::PATCH, path, GraphRequest::json(body)).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: &GraphRequest,
    ) -> Result<reqwest::Response, OutlookError> {
        let url = self.url(path, &request.query)?;
        let token = self.tokens.bearer_token().await?;
        debug!(method = %method, path, "graph request");

        let mut resp = self
            .dispatch(method.clone(), url.clone(), request, &token)
            .await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "access token rejected, attempting silent refresh");
            let credential = self.tokens.force_refresh().await?;
            resp = self
                .dispatch(method, url, request, &credential.access_token)
                .await?;
        }

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(request_failed(resp).await)
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        request: &GraphRequest,
        token: &str,
    ) -> Result<reqwest::Response, OutlookError> {
        let mut builder = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }
}

async fn request_failed(resp: reqwest::Response) -> OutlookError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });
    OutlookError::RequestFailed {
        status: status.as_u16(),
        message,
    }
}
