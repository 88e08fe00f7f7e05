//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_relay::config::ProxyConfig;
use api_relay::http::HttpServer;
use api_relay::lifecycle::Shutdown;
use api_relay::upstream::{Forwarder, TransportPolicy};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as the mock upstream saw it on the wire.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Every value of a header, in wire order.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .collect()
    }
}

/// Read a request head (and a Content-Length body, if any) from the socket.
pub async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }

    Some(RecordedRequest {
        request_line,
        headers,
        body,
    })
}

async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a mock upstream that answers every request with a fixed raw response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let (listener, addr) = bind_local().await;

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock upstream that reports every request it receives.
pub async fn start_recording_backend(
    response: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<RecordedRequest>) {
    let (listener, addr) = bind_local().await;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    let _ = tx.send(request);
                }
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Start a mock upstream that streams a chunked body on command.
///
/// Every `Some(chunk)` sent on the returned channel is written as one HTTP
/// chunk; `None` ends the body.
pub async fn start_streaming_backend() -> (SocketAddr, mpsc::UnboundedSender<Option<&'static str>>) {
    let (listener, addr) = bind_local().await;
    let (tx, mut rx) = mpsc::unbounded_channel::<Option<&'static str>>();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let _ = read_request(&mut socket).await;
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        while let Some(next) = rx.recv().await {
            let frame = match next {
                Some(chunk) => format!("{:x}\r\n{}\r\n", chunk.len(), chunk),
                None => "0\r\n\r\n".to_string(),
            };
            if socket.write_all(frame.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
            if next.is_none() {
                break;
            }
        }
        let _ = socket.shutdown().await;
    });

    (addr, tx)
}

/// Start a mock upstream that counts connections and hangs up without answering.
pub async fn start_hangup_backend() -> (SocketAddr, Arc<AtomicU32>) {
    let (listener, addr) = bind_local().await;
    let count = Arc::new(AtomicU32::new(0));
    let cc = count.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            cc.fetch_add(1, Ordering::SeqCst);
            let _ = read_request(&mut socket).await;
            drop(socket);
        }
    });

    (addr, count)
}

/// Start a mock upstream that reads the request and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let (listener, addr) = bind_local().await;

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    drop(listener);
    addr
}

/// Proxy configuration pointing at `target`, listening on an ephemeral port.
pub fn proxy_config(target: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.target = target.to_string();
    config
}

/// A forwarder for `config` using the direct transport.
pub fn forwarder(config: &ProxyConfig) -> Forwarder {
    let dispatcher = TransportPolicy::Direct
        .build_dispatcher(Duration::from_secs(config.upstream.timeout_secs))
        .unwrap();
    Forwarder::new(&config.upstream, dispatcher).unwrap()
}

/// Run `server` on an ephemeral port.
pub async fn spawn_server(server: HttpServer) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Start the relay in front of `target`.
pub async fn start_proxy(target: &str) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(proxy_config(target)).unwrap();
    spawn_server(server).await
}

/// Send a raw HTTP/1.1 request to `addr` and read until the peer closes.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).to_string()
}

/// Client that talks to the relay directly, never through an env proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
