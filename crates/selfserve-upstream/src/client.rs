//! Authenticated HTTP access to an upstream platform.
//!
//! The client never interprets status codes; it hands the status and
//! decoded body back to the lifecycle managers, which own that mapping.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use crate::token::{self, AccessToken};

/// Raw answer from an upstream endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// JSON body; `Null` when empty, a JSON string when not JSON.
    pub body: Value,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Body rendered for error messages.
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A single upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            url: url.into(),
            body: None,
        }
    }
}

/// Trait abstracting an authenticated upstream platform.
///
/// One operation obtains one token via [`UpstreamApi::authenticate`] and
/// passes it to every call it makes.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Obtain a fresh bearer token for this platform.
    async fn authenticate(&self) -> Result<AccessToken, UpstreamError>;

    async fn send(
        &self,
        token: &AccessToken,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, UpstreamError>;

    async fn get(&self, token: &AccessToken, url: &str) -> Result<UpstreamResponse, UpstreamError> {
        self.send(token, UpstreamRequest::get(url)).await
    }

    async fn post(
        &self,
        token: &AccessToken,
        url: &str,
        body: Value,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.send(token, UpstreamRequest::post(url, body)).await
    }

    async fn delete(
        &self,
        token: &AccessToken,
        url: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.send(token, UpstreamRequest::delete(url)).await
    }
}

/// `reqwest`-backed [`UpstreamApi`].
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpUpstream {
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| UpstreamError::Unavailable {
                url: config.credentials.token_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    pub fn platform(&self) -> &str {
        &self.config.credentials.platform
    }
}

#[async_trait]
impl UpstreamApi for HttpUpstream {
    async fn authenticate(&self) -> Result<AccessToken, UpstreamError> {
        token::fetch_token(&self.http, &self.config.credentials).await
    }

    async fn send(
        &self,
        token: &AccessToken,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, UpstreamError> {
        debug!(
            platform = %self.platform(),
            method = %request.method,
            url = %request.url,
            "Upstream request"
        );

        let mut builder = self
            .http
            .request(request.method, &request.url)
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::from_transport(&request.url, e))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_transport(&request.url, e))?;

        debug!(url = %request.url, status, "Upstream response");

        Ok(UpstreamResponse::new(status, decode_body(&bytes)))
    }
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_json_text_and_empty_bodies() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
        assert_eq!(decode_body(br#"{"guid":"g"}"#), json!({"guid": "g"}));
        assert_eq!(decode_body(b"bad gateway"), json!("bad gateway"));
    }

    #[test]
    fn body_text_for_errors() {
        assert_eq!(UpstreamResponse::new(500, Value::Null).body_text(), "");
        assert_eq!(UpstreamResponse::new(500, json!("oops")).body_text(), "oops");
        assert_eq!(
            UpstreamResponse::new(400, json!({"error": "x"})).body_text(),
            r#"{"error":"x"}"#
        );
    }
}
