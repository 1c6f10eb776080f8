//! Caller-level request description and its translation into the
//! `http::Request` the transports execute.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Request};
use http_body_util::Full;
use url::Url;

/// A request to be sent through a [`ClientPool`](crate::pool::ClientPool).
#[derive(Debug, Clone)]
pub struct PoolRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl PoolRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: None }
    }

    /// Start building a request with a custom method.
    pub fn builder<U: AsRef<str>>(method: Method, url: U) -> PoolRequestBuilder {
        PoolRequestBuilder {
            method,
            url: url.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Start building a GET request.
    pub fn get<U: AsRef<str>>(url: U) -> PoolRequestBuilder {
        Self::builder(Method::GET, url)
    }

    /// Start building a POST request.
    pub fn post<U: AsRef<str>>(url: U) -> PoolRequestBuilder {
        Self::builder(Method::POST, url)
    }

    /// Start building a PUT request.
    pub fn put<U: AsRef<str>>(url: U) -> PoolRequestBuilder {
        Self::builder(Method::PUT, url)
    }

    /// Start building a DELETE request.
    pub fn delete<U: AsRef<str>>(url: U) -> PoolRequestBuilder {
        Self::builder(Method::DELETE, url)
    }

    /// Start building a HEAD request.
    pub fn head<U: AsRef<str>>(url: U) -> PoolRequestBuilder {
        Self::builder(Method::HEAD, url)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    pub fn into_url(self) -> Url {
        self.url
    }

    /// Translate into the message form the transports execute.
    ///
    /// The URI is absolute; transports decide how to put it on the wire.
    pub fn to_http_request(&self) -> Result<Request<Full<Bytes>>, NetError> {
        match self.url.scheme() {
            "http" | "https" => {}
            _ => return Err(NetError::UnknownUrlScheme),
        }
        if self.url.host_str().is_none() {
            return Err(NetError::InvalidUrl);
        }

        let body = self.body.clone().unwrap_or_default();
        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str())
            .body(Full::new(body))
            .map_err(|_| NetError::InvalidUrl)?;
        *request.headers_mut() = self.headers.clone();
        Ok(request)
    }
}

/// Builder for a [`PoolRequest`].
///
/// Invalid URLs and headers are remembered and reported by [`build`](Self::build).
#[derive(Debug)]
pub struct PoolRequestBuilder {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<NetError>,
}

impl PoolRequestBuilder {
    /// Add a header, replacing any previous value.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match (key.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                self.error.get_or_insert(NetError::InvalidHeader);
            }
        }
        self
    }

    /// Set request body.
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize>(mut self, json: &T) -> Self {
        match serde_json::to_vec(json) {
            Ok(bytes) => {
                self.body = Some(Bytes::from(bytes));
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            Err(_) => {
                self.error.get_or_insert(NetError::JsonParseError);
            }
        }
        self
    }

    pub fn build(self) -> Result<PoolRequest, NetError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let url = Url::parse(&self.url).map_err(|_| NetError::InvalidUrl)?;
        Ok(PoolRequest { method: self.method, url, headers: self.headers, body: self.body })
    }
}
