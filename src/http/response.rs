//! Caller-facing response returned by the pool.

use crate::base::neterror::NetError;
use crate::http::charset;
use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode, Version};
use url::Url;

/// A fully received HTTP response.
///
/// The body is buffered before the transport handle goes back to the pool,
/// so a `PoolResponse` never holds pool resources.
#[derive(Debug, Clone)]
pub struct PoolResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
}

impl PoolResponse {
    /// Wrap a transport response for the request that was sent to `url`.
    pub fn from_http(response: Response<Bytes>, url: Url) -> Self {
        let (parts, body) = response.into_parts();
        Self { status: parts.status, version: parts.version, headers: parts.headers, url, body }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The URL the request was sent to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Charset label from `Content-Type`, already normalized by the pool.
    pub fn charset(&self) -> Option<String> {
        charset::charset(&self.headers)
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, NetError> {
        String::from_utf8(self.body.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    /// Body deserialized from JSON.
    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_slice(&self.body).map_err(|_| NetError::JsonParseError)
    }
}
