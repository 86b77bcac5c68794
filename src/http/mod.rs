//! HTTP plumbing for scenarios
//!
//! `HttpClient` wraps a reqwest client bound to the base URL of the service
//! under test. Responses are captured whole into `ApiResponse` so assertions
//! can inspect them after the call has completed.

mod builders;

pub use builders::{del, get, post, put, Delete, Get, Post, Put};

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::common::config::HttpConfig;
use crate::common::{Error, Result};
use crate::state::TestState;

/// A captured HTTP response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body; `null` when empty, a string when not JSON
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers.get(&name).map(String::as_str)
    }

    /// The response as one JSON document: `{status, headers, body}`
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "headers": self.headers,
            "body": self.body,
        })
    }
}

/// Extra request options, merged onto the outgoing request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add an `Authorization: Bearer <token>` header
    pub fn bearer(self, token: &str) -> Self {
        self.header(AUTHORIZATION.as_str(), format!("Bearer {}", token))
    }
}

/// Request options carrying the bearer token saved under `key`
///
/// Fails with `MissingStateKey` if no scenario has saved the token yet.
pub fn with_authorization(state: &TestState, key: &str) -> Result<RequestOptions> {
    let token = match state.require(key)? {
        Value::String(token) => token,
        other => {
            return Err(Error::StateType {
                key: key.to_string(),
                reason: format!("expected a token string, found {}", other),
            })
        }
    };
    Ok(RequestOptions::new().bearer(token))
}

/// Client bound to the base URL of the service under test
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    trace: bool,
}

impl HttpClient {
    /// Create a client with default settings
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(base_url, &HttpConfig::default())
    }

    /// Create a client from configuration
    pub fn from_config(base_url: &str, config: &HttpConfig) -> Result<Self> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| Error::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base URL".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let (name, value) = header_pair(name, value)?;
            headers.insert(name, value);
        }

        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
            trace: config.trace,
        })
    }

    /// Log each exchange at debug level
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request and capture the response
    ///
    /// Non-2xx statuses are returned as responses, not errors; only transport
    /// failures are errors.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        options: Option<&RequestOptions>,
    ) -> Result<ApiResponse> {
        let mut request = self.inner.request(method.clone(), url);
        if let Some(options) = options {
            for (name, value) in &options.headers {
                let (name, value) = header_pair(name, value)?;
                request = request.header(name, value);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        if self.trace {
            debug!(%method, %url, body = ?body, "http request");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(&method, url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::http(&method, url, e))?;
        let body = parse_body(&bytes);

        if self.trace {
            debug!(%method, %url, status, body = %body, "http response");
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::invalid_header(name, e))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| Error::invalid_header(name, e))?;
    Ok((header_name, header_value))
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(b"  \n"), Value::Null);
        assert_eq!(parse_body(br#"{"token":"t"}"#), json!({"token": "t"}));
        assert_eq!(parse_body(b"Not Found"), json!("Not Found"));
    }

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("http://localhost:3000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
        assert_eq!(client.url("/category"), "http://localhost:3000/api/category");
        assert_eq!(client.url("category/1"), "http://localhost:3000/api/category/1");
        assert_eq!(client.url(""), "http://localhost:3000/api");
        assert_eq!(client.url("https://other.host/x"), "https://other.host/x");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpClient::new("not a url"),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_invalid_default_header() {
        let mut config = HttpConfig::default();
        config.headers.insert("bad header".into(), "x".into());
        assert!(matches!(
            HttpClient::from_config("http://localhost", &config),
            Err(Error::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_with_authorization() {
        let mut state = TestState::new();
        assert!(matches!(
            with_authorization(&state, "userToken"),
            Err(Error::MissingStateKey(_))
        ));

        state.put("userToken", json!("abc.def"));
        let options = with_authorization(&state, "userToken").unwrap();
        assert_eq!(
            options.headers.get("authorization").map(String::as_str),
            Some("Bearer abc.def")
        );

        state.put("userToken", json!(42));
        assert!(matches!(
            with_authorization(&state, "userToken"),
            Err(Error::StateType { .. })
        ));
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let mut response = ApiResponse::new(200, Value::Null);
        response
            .headers
            .insert("content-type".into(), "application/json".into());
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.to_value()["status"], json!(200));
    }
}
