// SPDX-License-Identifier: MIT
//!
//! In-process HTTP backend for tests
//!

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};

/// Canned responses for one path, served in order, the last one repeats
#[derive(Clone)]
pub struct Route {
    path: &'static str,
    responses: Arc<Mutex<VecDeque<(u16, String)>>>,
}

impl Route {
    fn next_response(&self) -> (u16, String) {
        let mut responses = self.responses.lock().unwrap();
        if 1 < responses.len() {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        }
    }
}

pub fn route(path: &'static str, status: u16, body: &str) -> Route {
    route_seq(path, vec![(status, body)])
}

pub fn route_seq(path: &'static str, responses: Vec<(u16, &str)>) -> Route {
    Route {
        path,
        responses: Arc::new(Mutex::new(
            responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
        )),
    }
}

/// Request as received by the backend
#[derive(Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub struct MockBackend {
    url: String,
    hits: Arc<AtomicUsize>,
    held: Arc<AtomicBool>,
    gate: Arc<Notify>,
    requests: mpsc::UnboundedReceiver<Recorded>,
}

impl MockBackend {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let held = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(Notify::new());
        let (tx, requests) = mpsc::unbounded_channel();

        let routes = Arc::new(routes);
        let (hits_srv, held_srv, gate_srv) = (hits.clone(), held.clone(), gate.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let hits = hits_srv.clone();
                let held = held_srv.clone();
                let gate = gate_srv.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &hits, &held, &gate, &tx).await;
                });
            }
        });

        Self {
            url,
            hits,
            held,
            gate,
            requests,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Following responses wait until [`MockBackend::release`]
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }

    /// Wait until the next request has fully arrived
    pub async fn next_request(&mut self) -> Recorded {
        self.requests.recv().await.unwrap()
    }

    /// Requests received so far and not yet taken
    pub fn received(&mut self) -> Vec<Recorded> {
        let mut received = vec![];
        while let Ok(req) = self.requests.try_recv() {
            received.push(req);
        }
        received
    }
}

/// URL where nothing listens
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn serve(
    mut stream: TcpStream,
    routes: &[Route],
    hits: &AtomicUsize,
    held: &AtomicBool,
    gate: &Notify,
    tx: &mpsc::UnboundedSender<Recorded>,
) -> std::io::Result<()> {
    let req = read_request(&mut stream).await?;
    hits.fetch_add(1, Ordering::SeqCst);

    let path = req.path.split('?').next().unwrap_or_default().to_string();
    let (status, body) = routes
        .iter()
        .find(|r| r.path == path)
        .map(|r| r.next_response())
        .unwrap_or((404, r#"{"detail": "Not Found"}"#.to_string()));
    let _ = tx.send(req);

    if held.load(Ordering::SeqCst) {
        gate.notified().await;
    }

    let reason = if status < 400 { "OK" } else { "Error" };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.shutdown().await
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Recorded> {
    let mut buf = Vec::new();
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        read_more(stream, &mut buf).await?;
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let mut req = Recorded {
        method,
        path,
        headers,
        body: buf[header_end..].to_vec(),
    };

    let chunked = req
        .header("transfer-encoding")
        .map_or(false, |v| v.contains("chunked"));
    if chunked {
        while !req.body.ends_with(b"0\r\n\r\n") {
            read_more(stream, &mut req.body).await?;
        }
        req.body = dechunk(&req.body);
    } else {
        let length = req
            .header("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        while req.body.len() < length {
            read_more(stream, &mut req.body).await?;
        }
    }
    Ok(req)
}

async fn read_more(stream: &mut TcpStream, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let mut chunk = [0u8; 8192];
    let n = stream.read(&mut chunk).await?;
    if n == 0 {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
    }
    buf.extend_from_slice(&chunk[..n]);
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn dechunk(mut body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(pos) = find(body, b"\r\n") {
        let size_str = String::from_utf8_lossy(&body[..pos]);
        let size = usize::from_str_radix(size_str.split(';').next().unwrap_or("0").trim(), 16)
            .unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = pos + 2;
        out.extend_from_slice(&body[start..start + size]);
        body = &body[start + size + 2..];
    }
    out
}
