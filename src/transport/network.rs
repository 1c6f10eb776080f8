//! Default transport handle: HTTP/1.1 over hyper, TLS via BoringSSL.
//!
//! Each handle keeps at most one idle keep-alive connection per origin, so
//! DNS, TCP and TLS setup are paid once per origin per handle rather than
//! once per request. All handles from one factory share an [`HttpCache`].

use crate::base::neterror::NetError;
use crate::http::httpcache::{is_cacheable_method, HttpCache};
use crate::socket::connectjob::{build_tls_connector, ConnectJob};
use crate::transport::{CacheReadBehavior, Executing, Transport, TransportFactory, TransportPolicy};
use boring::ssl::SslConnector;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, HOST, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use http::{Request, Response, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::sync::Arc;
use url::{Position, Url};

/// Identifies a connection target (scheme, host, port).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    fn from_url(url: &Url) -> Option<Self> {
        Some(Origin {
            scheme: url.scheme().to_string(),
            host: url.host_str()?.to_string(),
            port: url.port_or_known_default()?,
        })
    }
}

type Connection = http1::SendRequest<Full<Bytes>>;

/// A reusable HTTP/1.1 client handle.
pub struct NetworkTransport {
    tls: SslConnector,
    cache: Arc<HttpCache>,
    cache_read_behavior: CacheReadBehavior,
    connections: HashMap<Origin, Connection>,
}

impl std::fmt::Debug for NetworkTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkTransport")
            .field("cache_read_behavior", &self.cache_read_behavior)
            .field("idle_connections", &self.connections.len())
            .finish()
    }
}

impl NetworkTransport {
    pub fn cache_read_behavior(&self) -> CacheReadBehavior {
        self.cache_read_behavior
    }

    /// Number of keep-alive connections parked on this handle.
    pub fn idle_connections(&self) -> usize {
        self.connections.len()
    }

    async fn send(
        &mut self,
        mut request: Request<Full<Bytes>>,
    ) -> Result<Response<Bytes>, NetError> {
        let url = Url::parse(&request.uri().to_string()).map_err(|_| NetError::InvalidUrl)?;
        let method = request.method().clone();

        if !is_cacheable_method(&method) {
            return self.round_trip(&url, request).await;
        }

        match self.cache_read_behavior {
            CacheReadBehavior::OnlyFromCache => {
                return self
                    .cache
                    .get_any(&url, &method)
                    .map(|entry| entry.to_response())
                    .ok_or(NetError::CacheMiss);
            }
            CacheReadBehavior::Normal => {
                if let Some(entry) = self.cache.get(&url, &method) {
                    tracing::trace!(url = %url, "serving fresh cached response");
                    return Ok(entry.to_response());
                }
            }
            CacheReadBehavior::MostRecent | CacheReadBehavior::NoCache => {}
        }

        // Caller-supplied validators are passed through untouched.
        let mut revalidating = false;
        if self.cache_read_behavior != CacheReadBehavior::NoCache
            && !is_conditional(request.headers())
        {
            if let Some(validators) = self.cache.conditional_headers(&url, &method) {
                request.headers_mut().extend(validators);
                revalidating = true;
            }
        }

        let response = self.round_trip(&url, request).await?;

        if revalidating && response.status() == StatusCode::NOT_MODIFIED {
            if let Some(entry) = self.cache.update_from_not_modified(&url, &method, &response) {
                tracing::trace!(url = %url, "cached response revalidated");
                return Ok(entry.to_response());
            }
            return Ok(response);
        }

        self.cache.store(&url, &method, &response);
        Ok(response)
    }

    async fn round_trip(
        &mut self,
        url: &Url,
        mut request: Request<Full<Bytes>>,
    ) -> Result<Response<Bytes>, NetError> {
        let origin = Origin::from_url(url).ok_or(NetError::InvalidUrl)?;

        *request.uri_mut() = origin_form(url)?;
        if !request.headers().contains_key(HOST) {
            let host = HeaderValue::from_str(&host_header(url)).map_err(|_| NetError::InvalidUrl)?;
            request.headers_mut().insert(HOST, host);
        }

        // Taken out of the map for the whole exchange: if the exchange fails
        // or the future is dropped, the connection goes with it.
        let mut connection = self.take_connection(&origin, url).await?;

        let response = connection.send_request(request).await.map_err(|e| {
            tracing::debug!(host = %origin.host, port = origin.port, error = %e, "request failed");
            map_hyper_error(&e)
        })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| {
                tracing::debug!(host = %origin.host, error = %e, "reading response body failed");
                NetError::HttpBodyError
            })?
            .to_bytes();

        self.connections.insert(origin, connection);
        Ok(Response::from_parts(parts, body))
    }

    async fn take_connection(
        &mut self,
        origin: &Origin,
        url: &Url,
    ) -> Result<Connection, NetError> {
        if let Some(mut connection) = self.connections.remove(origin) {
            if !connection.is_closed() && connection.ready().await.is_ok() {
                tracing::trace!(host = %origin.host, port = origin.port, "reusing connection");
                return Ok(connection);
            }
            tracing::trace!(host = %origin.host, port = origin.port, "dropping closed connection");
        }
        self.connect(url).await
    }

    async fn connect(&self, url: &Url) -> Result<Connection, NetError> {
        let socket = ConnectJob::connect(url, &self.tls).await?;
        let (sender, conn) = http1::handshake(TokioIo::new(socket)).await.map_err(|e| {
            tracing::debug!(error = %e, "HTTP/1.1 handshake failed");
            NetError::ConnectionFailed
        })?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection driver exited");
            }
        });

        Ok(sender)
    }
}

impl Transport for NetworkTransport {
    fn execute(&mut self, request: Request<Full<Bytes>>) -> Executing<'_> {
        Box::pin(self.send(request))
    }
}

/// Builds [`NetworkTransport`] handles sharing one response cache.
#[derive(Debug, Clone, Default)]
pub struct NetworkTransportFactory {
    cache: Arc<HttpCache>,
}

impl NetworkTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: Arc<HttpCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<HttpCache> {
        &self.cache
    }
}

impl TransportFactory for NetworkTransportFactory {
    type Transport = NetworkTransport;

    fn create(&self, policy: &TransportPolicy) -> Result<NetworkTransport, NetError> {
        let tls = build_tls_connector()?;
        tracing::debug!(
            cache_read_behavior = ?policy.cache_read_behavior,
            "constructed network transport"
        );
        Ok(NetworkTransport {
            tls,
            cache: Arc::clone(&self.cache),
            cache_read_behavior: policy.cache_read_behavior,
            connections: HashMap::new(),
        })
    }
}

fn is_conditional(headers: &HeaderMap) -> bool {
    headers.contains_key(IF_NONE_MATCH) || headers.contains_key(IF_MODIFIED_SINCE)
}

/// Path and query, the request-target sent on an HTTP/1.1 connection.
fn origin_form(url: &Url) -> Result<Uri, NetError> {
    url[Position::BeforePath..Position::AfterQuery]
        .parse()
        .map_err(|_| NetError::InvalidUrl)
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn map_hyper_error(e: &hyper::Error) -> NetError {
    if e.is_timeout() {
        NetError::ConnectionTimedOut
    } else if e.is_incomplete_message() {
        NetError::EmptyResponse
    } else if e.is_parse() {
        NetError::InvalidHttpResponse
    } else if e.is_canceled() || e.is_closed() {
        NetError::ConnectionClosed
    } else {
        NetError::ConnectionFailed
    }
}
