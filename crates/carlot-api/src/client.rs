// HTTP client for the marketplace REST API
//
// Wraps `reqwest::Client` with base-URL joining, bearer auth, envelope
// unwrapping, and status-code classification. Endpoint knowledge (paths,
// payload types) lives with the typed gateway in `carlot-core`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::TokenSource;
use crate::envelope::{DataEnvelope, ErrorBody, ListEnvelope, Page};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the marketplace API.
///
/// All methods return unwrapped `data` payloads; the envelope is stripped
/// before the caller sees it.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `https://cars.example.com/api`.
    pub fn new(
        base_url: Url,
        transport: &TransportConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
            tokens,
            timeout: transport.timeout,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            base_url,
            tokens,
            timeout: Duration::from_secs(30),
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a full URL for an API path: `{base}/{path}`.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Percent-encode `raw` as a single path segment, so ids containing
    /// `/`, `?`, `#` or `%` cannot leave their place in the path.
    pub fn path_segment(raw: &str) -> Result<String, Error> {
        let invalid = || Error::InvalidPathSegment {
            segment: raw.to_owned(),
        };
        if matches!(raw, "" | "." | "..") {
            return Err(invalid());
        }
        let mut scratch = Url::parse("http://segment.invalid/")?;
        scratch
            .path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push(raw);
        Ok(scratch.path().trim_start_matches('/').to_owned())
    }

    // ── Typed helpers ────────────────────────────────────────────────

    /// GET a single record.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let req = self.request(Method::GET, path)?;
        self.send_data(req).await
    }

    /// GET a collection with query parameters.
    pub async fn list<T, Q>(&self, path: &str, query: &Q) -> Result<Page<T>, Error>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let req = self.request(Method::GET, path)?.query(query);
        let body = self.send(req).await?;
        let env: ListEnvelope<T> = decode(&body)?;
        Ok(Page::from(env))
    }

    /// POST a JSON body and decode the returned record.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let req = self.request(Method::POST, path)?.json(body);
        self.send_data(req).await
    }

    /// PUT a JSON body and decode the returned record.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let req = self.request(Method::PUT, path)?.json(body);
        self.send_data(req).await
    }

    /// PATCH a JSON body and decode the returned record.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let req = self.request(Method::PATCH, path)?.json(body);
        self.send_data(req).await
    }

    /// POST for side effects only. Any response body is ignored.
    pub async fn post_discard<B>(&self, path: &str, body: &B) -> Result<(), Error>
    where
        B: Serialize + ?Sized,
    {
        let req = self.request(Method::POST, path)?.json(body);
        self.send(req).await.map(|_| ())
    }

    /// DELETE a resource. Any response body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let req = self.request(Method::DELETE, path)?;
        self.send(req).await.map(|_| ())
    }

    // ── Request plumbing ─────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let url = self.url(path)?;
        debug!("{method} {url}");
        let builder = self.http.request(method, url);
        Ok(match self.tokens.bearer_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    async fn send_data<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, Error> {
        let body = self.send(req).await?;
        let env: DataEnvelope<T> = decode(&body)?;
        Ok(env.data)
    }

    /// Send the request; return the body on 2xx, a classified error otherwise.
    async fn send(&self, req: RequestBuilder) -> Result<String, Error> {
        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let path = resp.url().path().to_owned();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(%status, bytes = body.len(), "response received");

        if status.is_success() {
            Ok(body)
        } else {
            Err(status_error(status, &path, &body))
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else if err.is_connect() {
            Error::Unreachable {
                url: err
                    .url()
                    .map_or_else(|| self.base_url.to_string(), ToString::to_string),
                reason: err.to_string(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}

/// Map a non-2xx response onto the transport error taxonomy.
fn status_error(status: StatusCode, path: &str, body: &str) -> Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| {
        let preview: String = body.chars().take(200).collect();
        if preview.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_owned()
        } else {
            preview
        }
    });

    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized { message },
        StatusCode::FORBIDDEN => Error::Forbidden { message },
        StatusCode::NOT_FOUND => Error::NotFound { path: path.into() },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation {
            message,
            fields: parsed.errors,
        },
        s if s.is_server_error() => Error::Server {
            status: s.as_u16(),
            message,
        },
        s => Error::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}
