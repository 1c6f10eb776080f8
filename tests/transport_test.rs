use poolnet::{CacheReadBehavior, ClientPool, NetError, PoolRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Responder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Minimal keep-alive HTTP/1.1 server answering each request head with `respond`.
struct TestServer {
    base: String,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    async fn start<F>(respond: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::start_on(listener, respond)
    }

    fn start_on<F>(listener: TcpListener, respond: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let base = format!("http://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond: Responder = Arc::new(respond);

        {
            let connections = Arc::clone(&connections);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    let requests = Arc::clone(&requests);
                    let respond = Arc::clone(&respond);
                    tokio::spawn(async move {
                        serve_connection(socket, requests, respond).await;
                    });
                }
            });
        }

        Self { base, connections, requests }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_connection(
    mut socket: TcpStream,
    requests: Arc<Mutex<Vec<String>>>,
    respond: Responder,
) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let head = loop {
            if let Some(end) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
                let head: Vec<u8> = pending.drain(..end + 4).collect();
                break String::from_utf8_lossy(&head).to_lowercase();
            }
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => pending.extend_from_slice(&buf[..n]),
            }
        };

        let response = (*respond)(&head);
        requests.lock().unwrap().push(head);
        if socket.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

fn ok(body: &str) -> String {
    format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}", body.len(), body)
}

fn pool(behavior: CacheReadBehavior) -> ClientPool {
    ClientPool::builder().capacity(2).cache_read_behavior(behavior).build_default().unwrap()
}

fn get(url: String) -> PoolRequest {
    PoolRequest::get(url).build().unwrap()
}

#[tokio::test]
async fn test_keep_alive_connection_reused() {
    let server = TestServer::start(|_| ok("ok")).await;
    let pool = pool(CacheReadBehavior::NoCache);

    for _ in 0..3 {
        let response = pool.send(get(server.url("/"))).await.unwrap();
        assert_eq!(response.text().unwrap(), "ok");
    }

    assert_eq!(server.requests().len(), 3);
    assert_eq!(server.connections(), 1);
    assert_eq!(pool.clients_created(), 1);
}

#[tokio::test]
async fn test_request_head_uses_origin_form_and_host() {
    let server = TestServer::start(|_| ok("ok")).await;
    let pool = pool(CacheReadBehavior::NoCache);

    pool.send(get(server.url("/search?q=rust#top"))).await.unwrap();

    let head = &server.requests()[0];
    assert!(head.starts_with("get /search?q=rust http/1.1\r\n"), "head: {}", head);
    let host = server.base.trim_start_matches("http://");
    assert!(head.contains(&format!("host: {}\r\n", host)), "head: {}", head);
}

#[tokio::test]
async fn test_most_recent_revalidates_cached_entry() {
    let server = TestServer::start(|head| {
        if head.contains("if-none-match: \"v1\"") {
            "HTTP/1.1 304 Not Modified\r\nETag: \"v1\"\r\n\r\n".to_string()
        } else {
            concat!(
                "HTTP/1.1 200 OK\r\nETag: \"v1\"\r\nCache-Control: max-age=3600\r\n",
                "Content-Length: 5\r\n\r\nfresh",
            )
            .to_string()
        }
    })
    .await;
    let pool = pool(CacheReadBehavior::MostRecent);

    let first = pool.send(get(server.url("/doc"))).await.unwrap();
    let second = pool.send(get(server.url("/doc"))).await.unwrap();

    // Fresh entries still go to the server.
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].contains("if-none-match"));
    assert!(requests[1].contains("if-none-match: \"v1\""));

    assert_eq!(second.status(), 200);
    assert_eq!(first.bytes(), second.bytes());
    assert_eq!(second.text().unwrap(), "fresh");
}

#[tokio::test]
async fn test_normal_serves_fresh_entry_from_cache() {
    let server = TestServer::start(|_| {
        concat!(
            "HTTP/1.1 200 OK\r\nCache-Control: max-age=3600\r\n",
            "Content-Length: 6\r\n\r\ncached",
        )
        .to_string()
    })
    .await;
    let pool = pool(CacheReadBehavior::Normal);

    for _ in 0..3 {
        let response = pool.send(get(server.url("/static"))).await.unwrap();
        assert_eq!(response.text().unwrap(), "cached");
    }

    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_normal_refetches_varying_response() {
    let server = TestServer::start(|_| {
        concat!(
            "HTTP/1.1 200 OK\r\nCache-Control: max-age=3600\r\nVary: Accept\r\n",
            "Content-Length: 2\r\n\r\n{}",
        )
        .to_string()
    })
    .await;
    let pool = pool(CacheReadBehavior::Normal);

    pool.send(get(server.url("/api"))).await.unwrap();
    pool.send(get(server.url("/api"))).await.unwrap();

    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_no_cache_always_fetches() {
    let server = TestServer::start(|_| {
        "HTTP/1.1 200 OK\r\nCache-Control: max-age=3600\r\nContent-Length: 2\r\n\r\nok".to_string()
    })
    .await;
    let pool = pool(CacheReadBehavior::NoCache);

    pool.send(get(server.url("/a"))).await.unwrap();
    pool.send(get(server.url("/a"))).await.unwrap();

    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_only_from_cache_miss() {
    let server = TestServer::start(|_| ok("ok")).await;
    let pool = pool(CacheReadBehavior::OnlyFromCache);

    let err = pool.send(get(server.url("/missing"))).await.unwrap_err();
    assert_eq!(err, NetError::CacheMiss);
    assert_eq!(server.connections(), 0);
    assert_eq!(pool.available_slots(), 2);
}

#[tokio::test]
async fn test_connection_refused_keeps_pool_usable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let pool = pool(CacheReadBehavior::NoCache);

    let err = pool.send(get(format!("http://{}/", addr))).await.unwrap_err();
    assert!(err.is_network_error(), "unexpected error: {:?}", err);
    assert_eq!(pool.available_slots(), 2);
    assert_eq!(pool.idle_clients(), 1);

    // The same handle works once a server is reachable.
    let server = TestServer::start(|_| ok("back")).await;
    let response = pool.send(get(server.url("/"))).await.unwrap();
    assert_eq!(response.text().unwrap(), "back");
    assert_eq!(pool.clients_created(), 1);
}

#[tokio::test]
async fn test_server_quoted_charset_is_fixed() {
    let server = TestServer::start(|_| {
        concat!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=\"utf-8\"\r\n",
            "Content-Length: 2\r\n\r\nhi",
        )
        .to_string()
    })
    .await;
    let pool = pool(CacheReadBehavior::NoCache);

    let response = pool.send(get(server.url("/"))).await.unwrap();
    assert_eq!(
        response.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "text/html; charset=utf-8"
    );
    assert_eq!(response.charset().as_deref(), Some("utf-8"));
}

#[tokio::test]
async fn test_server_closing_connection_is_recovered() {
    let server = TestServer::start(|_| {
        "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 2\r\n\r\nok".to_string()
    })
    .await;
    let pool = pool(CacheReadBehavior::NoCache);

    pool.send(get(server.url("/"))).await.unwrap();
    pool.send(get(server.url("/"))).await.unwrap();

    assert_eq!(server.connections(), 2);
    assert_eq!(pool.clients_created(), 1);
}

#[tokio::test]
async fn test_ipv6_literal_host() {
    // Hosts without IPv6 loopback have nothing to test.
    let Ok(listener) = TcpListener::bind("[::1]:0").await else {
        return;
    };
    let server = TestServer::start_on(listener, |_| ok("v6"));
    let pool = pool(CacheReadBehavior::NoCache);

    let response = pool.send(get(server.url("/"))).await.unwrap();
    assert_eq!(response.text().unwrap(), "v6");

    let head = &server.requests()[0];
    let port = server.base.rsplit(':').next().unwrap();
    assert!(head.contains(&format!("host: [::1]:{}\r\n", port)), "head: {}", head);
}
