// Hand-crafted async HTTP client for the Meraki Dashboard API (v1).
//
// Base path: /api/v1/
// Auth: X-Cisco-Meraki-API-Key header
//
// Endpoint methods live in `organizations.rs` and `networks.rs` as inherent
// impls; this module owns URL construction, retries, pagination, and
// response decoding.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, LINK, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::{RetryPolicy, TransportConfig};
use crate::types::ErrorResponse;

/// Production Dashboard API root.
pub const DEFAULT_BASE_URL: &str = "https://api.meraki.com/api/v1";

/// Dashboard API key header.
const API_KEY_HEADER: &str = "x-cisco-meraki-api-key";

/// Fallback wait when a 429 arrives without a usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Meraki Dashboard API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl DashboardClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `X-Cisco-Meraki-API-Key` as a sensitive default header on
    /// every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|e| Error::InvalidApiKeyHeader(e.to_string()))?;
        key_value.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key_value);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = transport.build_client_with_headers(headers)?;
        Self::from_reqwest(base_url, http, transport.retry.clone())
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            retry,
        })
    }

    /// Ensure the base URL ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"organizations"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request execution ────────────────────────────────────────────

    /// Send a request, retrying transient failures per the retry policy.
    ///
    /// Returns the first non-transient response (success or not); the
    /// caller decodes it. A 429 that outlives every attempt becomes
    /// [`Error::RateLimited`].
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&[u8]>,
    ) -> Result<reqwest::Response, Error> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("{method} {url} (attempt {attempt}/{max_attempts})");

            let mut builder = self.http.request(method.clone(), url.clone());
            if let Some(bytes) = body {
                builder = builder
                    .header(CONTENT_TYPE, "application/json")
                    .body(bytes.to_vec());
            }

            let last_attempt = attempt >= max_attempts;
            match builder.send().await {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after_secs = parse_retry_after(resp.headers());
                    if last_attempt {
                        return Err(Error::RateLimited { retry_after_secs });
                    }
                    let delay = self
                        .retry
                        .retry_after(retry_after_secs)
                        .max(self.retry.delay_for(attempt));
                    warn!(%url, ?delay, "rate limited, backing off");
                    tokio::time::sleep(delay).await;
                }
                Ok(resp) if resp.status().is_server_error() && !last_attempt => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(%url, status = %resp.status(), ?delay, "server error, retrying");
                    tokio::time::sleep(delay).await;
                }
                Ok(resp) => return Ok(resp),
                Err(e) if (e.is_timeout() || e.is_connect()) && !last_attempt => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(%url, error = %e, ?delay, "transport error, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(Error::Transport(e)),
            }

            attempt += 1;
        }
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        let resp = self.execute(Method::GET, url, None).await?;
        self.handle_response(resp).await
    }

    /// GET every page of a list endpoint, following `Link: <...>; rel=next`.
    pub(crate) async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        per_page: u32,
    ) -> Result<Vec<T>, Error> {
        let mut url = self.url(path)?;
        url.query_pairs_mut()
            .append_pair("perPage", &per_page.to_string());

        let mut all = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            let resp = self.execute(Method::GET, url, None).await?;
            next = next_link(resp.headers());
            let page: Vec<T> = self.handle_response(resp).await?;
            debug!(received = page.len(), more = next.is_some(), "page fetched");
            all.extend(page);
        }
        Ok(all)
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        let bytes = serde_json::to_vec(body)?;
        let resp = self.execute(Method::PUT, url, Some(&bytes)).await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = body
                    .char_indices()
                    .nth(200)
                    .map_or(body.as_str(), |(i, _)| &body[..i]);
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body: body.clone(),
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: StatusCode, resp: reqwest::Response) -> Error {
        if status == StatusCode::UNAUTHORIZED {
            return Error::InvalidApiKey;
        }

        let raw = resp.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(err) if !err.errors.is_empty() => err.errors.join("; "),
            _ if raw.is_empty() => status.to_string(),
            _ => raw,
        };
        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

// ── Header helpers ───────────────────────────────────────────────────

fn parse_retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Extract the `rel=next` target from an RFC 8288 `Link` header.
fn next_link(headers: &HeaderMap) -> Option<Url> {
    let raw = headers.get(LINK)?.to_str().ok()?;
    raw.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| {
            let p = p.trim();
            p == "rel=next" || p == "rel=\"next\""
        });
        if !is_next {
            return None;
        }
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}
