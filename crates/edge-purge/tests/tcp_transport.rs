use std::time::Duration;

use edge_cache::ExpireOptions;
use edge_core::{EdgeConfig, EsiConfig, InvalidationConfig, ServerConfig, UrlOptions, Widget, WidgetId};
use edge_purge::{
    BanRequest, BanTransport, CacheServer, Invalidator, MemoryRegistry, PurgeError, StaticRegistry,
    TcpBanTransport, TransportError,
};
use http::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A cache server stub answering every request with `response` and
/// forwarding the raw request bytes.
async fn stub_server(response: &'static str) -> (CacheServer, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.ends_with(b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    (CacheServer::new("127.0.0.1", port), rx)
}

/// A listener that accepts but never answers.
async fn silent_server() -> (CacheServer, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (CacheServer::new("127.0.0.1", port), listener)
}

async fn closed_port() -> CacheServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    CacheServer::new("127.0.0.1", port)
}

fn ban() -> Method {
    Method::from_bytes(b"BAN").unwrap()
}

#[tokio::test]
async fn test_wire_format() {
    let (server, mut requests) = stub_server("HTTP/1.1 200 Ban added\r\nContent-Length: 0\r\n\r\n").await;
    let transport = TcpBanTransport::new(Duration::from_secs(2));
    let request = BanRequest::new(ban(), r"^/news/?\?.*widget=7", Some("site".to_string()));

    let response = transport.send(&server, &request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(
        requests.recv().await.unwrap(),
        "BAN ^/news/?\\?.*widget=7 HTTP/1.1\r\nHost: site\r\nConnection: close\r\n\r\n"
    );
}

#[tokio::test]
async fn test_error_status() {
    let (server, _requests) = stub_server("HTTP/1.1 405 Not Allowed\r\n\r\n").await;
    let transport = TcpBanTransport::new(Duration::from_secs(2));

    let err = transport
        .send(&server, &BanRequest::new(ban(), "^/p", None))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Status(405)));
}

#[tokio::test]
async fn test_timeout() {
    let (server, _listener) = silent_server().await;
    let transport = TcpBanTransport::new(Duration::from_millis(100));

    let err = transport
        .send(&server, &BanRequest::new(ban(), "^/p", None))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout(d) if d == Duration::from_millis(100)));
}

#[tokio::test]
async fn test_connection_refused() {
    let server = closed_port().await;
    let transport = TcpBanTransport::new(Duration::from_secs(2));

    let err = transport
        .send(&server, &BanRequest::new(ban(), "^/p", None))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Connect { .. }));
}

#[derive(Debug)]
struct Headline;

impl Widget for Headline {
    fn id(&self) -> WidgetId {
        WidgetId(7)
    }

    fn owner_page_url(&self, _options: &UrlOptions) -> String {
        "http://site/news?id=4".to_string()
    }
}

#[tokio::test]
async fn test_invalidator_over_tcp() {
    let (first, mut first_requests) = stub_server("HTTP/1.1 200 OK\r\n\r\n").await;
    let (second, mut second_requests) = stub_server("HTTP/1.1 200 OK\r\n\r\n").await;
    let dead = closed_port().await;

    let registry = MemoryRegistry::new();
    for server in [first, dead, second] {
        registry.register(server);
    }

    let config = EdgeConfig {
        esi: EsiConfig::enabled(),
        invalidation: InvalidationConfig {
            timeout_ms: 1000,
            ..Default::default()
        },
        ..Default::default()
    };
    let invalidator = Invalidator::from_config(&config, registry).unwrap();

    let reports = invalidator.expire(&Headline, &ExpireOptions::new()).await.unwrap();

    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.succeeded(), 2);
        assert!(matches!(
            report.failures().next().map(|o| &o.result),
            Some(Err(TransportError::Connect { .. }))
        ));
    }

    for requests in [&mut first_requests, &mut second_requests] {
        let widget = requests.recv().await.unwrap();
        let page = requests.recv().await.unwrap();
        assert!(widget.starts_with("BAN ^/news\\?id=4/?&.*widget=7 HTTP/1.1\r\nHost: site\r\n"));
        assert!(page.starts_with("BAN ^/news\\?id=4/?($|\\?(?!.*(?<=[?&])widget=)) HTTP/1.1\r\n"));
    }
}

#[tokio::test]
async fn test_from_config_rejects_invalid_settings() {
    let config = EdgeConfig {
        invalidation: InvalidationConfig {
            servers: vec![ServerConfig {
                host: String::new(),
                port: 80,
            }],
            ..Default::default()
        },
        ..Default::default()
    };

    let registry = StaticRegistry::from_config(&config.invalidation);
    let result = Invalidator::from_config(&config, registry);

    assert!(matches!(result, Err(PurgeError::Config(_))));
}
