//! HTTP transport: one request/response cycle at a time over a reusable
//! connection.
//!
//! The transport is an explicit resource. Each call consumes it for the
//! duration of one request/response cycle; callers serialize their own
//! access (the protocol clients take `&self` but never hold two responses
//! open on purpose). There is no internal locking.

use std::io::Read;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use parlor_types::ClientError;
use serde::Serialize;

/// Default server base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Map a [`reqwest::Error`] to [`ClientError::Transport`].
pub(crate) fn map_transport_error(err: reqwest::Error) -> ClientError {
    ClientError::Transport(Box::new(err))
}

fn normalize_base_url(base_url: &str) -> Result<String, ClientError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::InvalidArgument(format!(
            "base URL must start with http:// or https://: {base_url}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Asynchronous connection wrapper.
#[derive(Debug)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
}

impl Transport {
    /// Open a transport for the given base URL.
    ///
    /// Validates the URL scheme and trims any trailing slash; no connection
    /// is made until the first request.
    pub fn open(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url.as_ref())?,
        })
    }

    /// Base URL this transport targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET request.
    pub async fn get(&self, path: &str) -> Result<ResponseHandle, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;
        Ok(ResponseHandle { inner: response })
    }

    /// Issue a POST request with a JSON body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ResponseHandle, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        Ok(ResponseHandle { inner: response })
    }
}

impl Default for Transport {
    /// Transport against [`DEFAULT_BASE_URL`].
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Handle on one in-flight response.
pub struct ResponseHandle {
    inner: reqwest::Response,
}

impl ResponseHandle {
    /// HTTP status code as received.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Read the whole body as bytes.
    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        self.inner.bytes().await.map_err(map_transport_error)
    }

    /// Read the whole body as text. Lossy on invalid UTF-8 is not
    /// attempted; a body that is not UTF-8 surfaces as a transport error.
    pub async fn text(self) -> Result<String, ClientError> {
        self.inner.text().await.map_err(map_transport_error)
    }

    /// Read the body incrementally, one chunk at a time, as the server
    /// produces it.
    pub fn byte_stream(self) -> impl Stream<Item = Result<Bytes, ClientError>> + Send + 'static {
        self.inner.bytes_stream().map(|r| r.map_err(map_transport_error))
    }
}

/// Blocking connection wrapper. Mirror of [`Transport`].
///
/// Must not be driven from an async runtime thread; a caller with a UI
/// runs it on a worker thread to keep input handling responsive.
#[derive(Debug)]
pub struct BlockingTransport {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl BlockingTransport {
    /// Open a transport for the given base URL.
    pub fn open(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            http: reqwest::blocking::Client::new(),
            base_url: normalize_base_url(base_url.as_ref())?,
        })
    }

    /// Base URL this transport targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET request.
    pub fn get(&self, path: &str) -> Result<BlockingResponseHandle, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().map_err(map_transport_error)?;
        Ok(BlockingResponseHandle { inner: response })
    }

    /// Issue a POST request with a JSON body.
    pub fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<BlockingResponseHandle, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(map_transport_error)?;
        Ok(BlockingResponseHandle { inner: response })
    }
}

impl Default for BlockingTransport {
    /// Transport against [`DEFAULT_BASE_URL`].
    fn default() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Handle on one in-flight blocking response.
pub struct BlockingResponseHandle {
    inner: reqwest::blocking::Response,
}

impl BlockingResponseHandle {
    /// HTTP status code as received.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Read the whole body as bytes.
    pub fn bytes(self) -> Result<Bytes, ClientError> {
        self.inner.bytes().map_err(map_transport_error)
    }

    /// Read the whole body as text.
    pub fn text(self) -> Result<String, ClientError> {
        self.inner.text().map_err(map_transport_error)
    }

    /// Turn the handle into an incremental byte reader over the still-open
    /// body.
    pub fn into_reader(self) -> BodyReader {
        BodyReader { inner: self.inner }
    }
}

/// Incremental reader over one still-open blocking response body.
pub struct BodyReader {
    inner: reqwest::blocking::Response,
}

impl std::io::Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}
