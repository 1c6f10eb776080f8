use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use boring::ssl::{SslConnector, SslMethod};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use url::{Host, Url};

/// ALPN list offered on TLS connections. Handles speak HTTP/1.1 only.
const ALPN_HTTP11: &[u8] = b"\x08http/1.1";

/// Build the TLS connector a transport handle uses for all its connections.
pub fn build_tls_connector() -> Result<SslConnector, NetError> {
    let mut builder = SslConnector::builder(SslMethod::tls()).map_err(|e| {
        tracing::debug!(error = %e, "failed to create TLS connector");
        NetError::TransportConstruction
    })?;
    builder.set_alpn_protos(ALPN_HTTP11).map_err(|e| {
        tracing::debug!(error = %e, "failed to configure ALPN");
        NetError::TransportConstruction
    })?;
    Ok(builder.build())
}

/// Manages the connection process: DNS -> TCP -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob;

impl ConnectJob {
    pub async fn connect(url: &Url, tls: &SslConnector) -> Result<SocketType, NetError> {
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;
        // IP literals skip DNS. `host` is what SNI and certificate checks
        // see, so IPv6 literals are kept unbracketed.
        let (host, addrs): (String, Vec<SocketAddr>) = match url.host() {
            Some(Host::Domain(domain)) => {
                // 1. DNS Resolution
                let addrs = tokio::net::lookup_host((domain, port)).await.dns_context(domain)?;
                (domain.to_string(), addrs.collect())
            }
            Some(Host::Ipv4(addr)) => (addr.to_string(), vec![SocketAddr::from((addr, port))]),
            Some(Host::Ipv6(addr)) => (addr.to_string(), vec![SocketAddr::from((addr, port))]),
            None => return Err(NetError::InvalidUrl),
        };
        if addrs.is_empty() {
            return Err(NetError::NameNotResolved);
        }

        // 2. TCP Connect, first address that answers wins
        let mut last_error = NetError::ConnectionFailed;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect(addr).await.connection_context(&host, port) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_error = e,
            }
        }
        let stream = stream.ok_or(last_error)?;
        let _ = stream.set_nodelay(true);

        // 3. SSL Handshake (if https)
        if url.scheme() == "https" {
            let config = tls.configure().map_err(|_| NetError::SslProtocolError)?;
            let tls_stream = tokio_boring::connect(config, &host, stream).await.map_err(|e| {
                tracing::debug!(host = %host, error = ?e, "SSL handshake failed");
                NetError::SslProtocolError
            })?;
            tracing::debug!(host = %host, port, "TLS connection established");
            Ok(SocketType::Ssl(tls_stream))
        } else {
            tracing::debug!(host = %host, port, "TCP connection established");
            Ok(SocketType::Tcp(stream))
        }
    }
}
