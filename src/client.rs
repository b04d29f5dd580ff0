use std::pin::Pin;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_TTFB};
use crate::sse::map_body_errors;

/// Endpoint used when none is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/generate";

/// Body of a generate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The prompt text, with line endings normalized.
    pub prompt: String,
    /// Identifier of the conversation.
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

impl ChatRequest {
    /// Creates a request for `prompt` in session `session_id`.
    pub fn new(prompt: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: session_id.into(),
        }
    }
}

/// Raw response body, chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Something that can deliver a request and hand back the streaming body.
///
/// Implementations return `Err` for requests that fail before any body is
/// available, including non-success status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response body.
    async fn post(&self, request: &ChatRequest) -> Result<ByteStream>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn post(&self, request: &ChatRequest) -> Result<ByteStream> {
        (**self).post(request).await
    }
}

/// HTTP transport for the generate endpoint.
///
/// Requests carry no timeout: a reply streams for as long as the server keeps
/// the connection open.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    api_url: Url,
}

impl HttpTransport {
    /// Create a transport that posts to `api_url`.
    pub fn new(api_url: &str) -> Result<Self> {
        let api_url = parse_api_url(api_url)?;
        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self { client, api_url })
    }

    /// The endpoint requests are posted to.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers
    }

    /// Convert a non-success response into an error, logging the body.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let body = match response.text().await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(error = %err, "could not read error response body");
                None
            }
        };
        tracing::warn!(status = status_code, body = ?body, "request rejected by server");
        Error::api(status_code, body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &ChatRequest) -> Result<ByteStream> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        tracing::info!(url = %self.api_url, session_id = %request.session_id, "sending prompt");

        let response = self
            .client
            .post(self.api_url.clone())
            .headers(Self::default_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_connect() {
                    Error::connection(e.to_string(), Some(Box::new(e)))
                } else {
                    Error::http_client(e.to_string(), Some(Box::new(e)))
                }
            })?;
        STREAM_TTFB.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        Ok(Box::pin(map_body_errors(response.bytes_stream())))
    }
}

/// Parse and check an endpoint URL.
pub fn parse_api_url(api_url: &str) -> Result<Url> {
    let url = Url::parse(api_url.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::validation(
            format!("unsupported URL scheme: {scheme}"),
            Some("api_url".to_string()),
        )),
    }
}
