//! Authenticated HTTP + JSON transport for the GitLab REST API.
//!
//! Owns the single `reqwest::Client` (and therefore the connection pool) of an
//! API client, builds endpoint URLs, injects the access token and normalizes
//! non-2xx responses into `AppError::GitLabApi`.

use crate::error::AppError;
use reqwest::{header, Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Header carrying the token when header authentication is used.
pub const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Query parameter carrying the token when query authentication is used.
pub const PRIVATE_TOKEN_PARAM: &str = "private_token";

/// Maximum number of characters of a raw error body kept in messages.
const ERROR_BODY_PREVIEW: usize = 200;

/// GitLab API client configuration.
///
/// Passed explicitly into the client constructor instead of living in
/// hidden constants.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API version path segment (`v4`).
    pub api_version: String,

    /// Page size used when a caller does not specify one.
    pub default_page_size: u32,

    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,

    /// Idle pooled connections kept per host.
    pub max_idle_connections: usize,

    /// How the token is attached to regular requests.
    pub auth_mode: AuthMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_version: "v4".to_string(),
            default_page_size: 20,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_idle_connections: 4,
            auth_mode: AuthMode::QueryParam,
        }
    }
}

/// Where the access token goes on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// `?private_token=...`
    QueryParam,
    /// `PRIVATE-TOKEN: ...`
    Header,
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,

    /// Raw `Link` header, if present.
    pub link: Option<String>,

    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the `Link` header advertises a `rel="next"` page.
    pub fn has_next_page(&self) -> bool {
        has_next_link(self.link.as_deref())
    }
}

/// HTTP transport bound to one GitLab server and token.
#[derive(Debug, Clone)]
pub struct HttpJsonTransport {
    client: Client,
    api_base: String,
    token: String,
    auth_mode: AuthMode,
}

impl HttpJsonTransport {
    /// Create a transport for `server_url` (with or without trailing slash).
    pub fn new(server_url: &str, token: &str, config: &ClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .timeout(config.connect_timeout + config.read_timeout + config.write_timeout)
            .pool_max_idle_per_host(config.max_idle_connections)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: format!(
                "{}/api/{}",
                server_url.trim().trim_end_matches('/'),
                config.api_version
            ),
            token: token.trim().to_string(),
            auth_mode: config.auth_mode,
        })
    }

    /// Base URL of the API (e.g., `https://gitlab.com/api/v4`).
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Default authentication mode for regular requests.
    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    /// Build the URL for an endpoint.
    ///
    /// `path` must already be percent-encoded where needed. Query pairs are
    /// appended through the URL serializer, so `?` and `&` are always placed
    /// correctly.
    pub fn endpoint_url(
        &self,
        path: &str,
        query: &[(&str, String)],
        auth: AuthMode,
    ) -> Result<Url, AppError> {
        let mut url = Url::parse(&format!("{}{}", self.api_base, path))
            .map_err(|e| AppError::invalid_input_field(format!("Invalid server URL: {}", e), "url"))?;

        let mut pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        if auth == AuthMode::QueryParam {
            pairs.push((PRIVATE_TOKEN_PARAM, self.token.as_str()));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        Ok(url)
    }

    /// Send a request and read the whole response.
    ///
    /// Non-2xx responses are returned as-is; only transport failures are
    /// errors here.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        auth: AuthMode,
    ) -> Result<HttpResponse, AppError> {
        let url = self.endpoint_url(path, query, auth)?;
        log::debug!("GitLab API: {} {}", method, redact(&url));

        let mut request = self.client.request(method, url);
        if auth == AuthMode::Header {
            request = request.header(PRIVATE_TOKEN_HEADER, &self.token);
        }
        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request.send().await?;
        let status = response.status();
        let link = response
            .headers()
            .get(header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        log::debug!("GitLab API: {} -> {}", path, status.as_u16());
        Ok(HttpResponse { status, link, body })
    }

    /// GET an endpoint and decode its JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, u16), AppError> {
        let response = self
            .send::<()>(Method::GET, path, query, None, self.auth_mode)
            .await?;
        decode(response, path)
    }

    /// Send a JSON body and decode the JSON response.
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(T, u16), AppError> {
        let response = self
            .send(method, path, &[], Some(body), self.auth_mode)
            .await?;
        decode(response, path)
    }

    /// Send a body-less request whose response carries no payload.
    pub async fn send_empty(&self, method: Method, path: &str) -> Result<u16, AppError> {
        let response = self
            .send::<()>(method, path, &[], None, self.auth_mode)
            .await?;
        if response.is_success() {
            Ok(response.status.as_u16())
        } else {
            Err(rejection(&response, path))
        }
    }
}

/// Decode a successful response, or turn a non-2xx one into an error.
pub fn decode<T: DeserializeOwned>(response: HttpResponse, endpoint: &str) -> Result<(T, u16), AppError> {
    if !response.is_success() {
        return Err(rejection(&response, endpoint));
    }
    let status = response.status.as_u16();
    let data = serde_json::from_str::<T>(&response.body).map_err(|e| {
        log::warn!("Invalid JSON from {}: {}", endpoint, e);
        AppError::gitlab_api_full(format!("Invalid JSON response: {}", e), status, endpoint)
    })?;
    Ok((data, status))
}

/// Build the error for a non-2xx response.
pub fn rejection(response: &HttpResponse, endpoint: &str) -> AppError {
    AppError::gitlab_api_full(
        extract_error_message(&response.body),
        response.status.as_u16(),
        endpoint,
    )
}

/// Extract a human readable message from an error body.
///
/// GitLab returns errors as `{"message": ...}`, `{"error": ...}` or OAuth style
/// `{"error_description": ...}`; `message` may also be an object such as
/// `{"base": ["..."]}`, which is rendered as JSON text. Anything else yields
/// the first 200 characters of the raw body.
pub fn extract_error_message(body: &str) -> String {
    if body.trim().is_empty() {
        return "Unknown error".to_string();
    }

    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        ["message", "error", "error_description"]
            .iter()
            .filter_map(|key| v.get(key))
            .find(|value| !value.is_null())
            .map(|value| match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            })
    });

    from_json.unwrap_or_else(|| body.chars().take(ERROR_BODY_PREVIEW).collect())
}

/// Whether a `Link` header contains a `rel="next"` relation.
pub fn has_next_link(link: Option<&str>) -> bool {
    let Some(link) = link else {
        return false;
    };
    link.split(',').any(|entry| {
        entry.split(';').skip(1).any(|param| {
            let param = param.trim();
            match param.split_once('=') {
                Some((key, value)) => {
                    key.trim().eq_ignore_ascii_case("rel")
                        && value
                            .trim()
                            .trim_matches('"')
                            .split_whitespace()
                            .any(|rel| rel.eq_ignore_ascii_case("next"))
                }
                None => false,
            }
        })
    })
}

/// Render a URL for logs with the token value masked.
fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == PRIVATE_TOKEN_PARAM) {
        return url.to_string();
    }
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == PRIVATE_TOKEN_PARAM {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
