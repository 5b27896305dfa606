//! Minimal HTTP/1.1 server that answers canned catalog responses for integration tests.
//!
//! Routes match on method, path and a list of substrings that must all appear
//! in the raw request (request line plus body). The first matching route wins;
//! anything else gets 404. Every request line is recorded so tests can assert
//! which calls were made.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    method: &'static str,
    path: String,
    needles: Vec<String>,
    status: u16,
    body: Vec<u8>,
}

impl Route {
    pub fn get(path: &str, body: impl Into<Vec<u8>>) -> Self {
        Route {
            method: "GET",
            path: path.to_string(),
            needles: Vec::new(),
            status: 200,
            body: body.into(),
        }
    }

    pub fn post(path: &str, body: impl Into<Vec<u8>>) -> Self {
        Route {
            method: "POST",
            ..Route::get(path, body)
        }
    }

    /// Only match requests containing `needle` (query string or form body).
    pub fn when(mut self, needle: &str) -> Self {
        self.needles.push(needle.to_string());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    fn matches(&self, method: &str, path: &str, raw: &str) -> bool {
        method.eq_ignore_ascii_case(self.method)
            && path == self.path
            && self.needles.iter().all(|n| raw.contains(n.as_str()))
    }
}

pub struct CatalogServer {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CatalogServer {
    /// Base URL without a trailing slash, e.g. "http://127.0.0.1:12345".
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Request lines received so far ("GET /manga?title=... HTTP/1.1").
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose path starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|line| {
                line.split_whitespace()
                    .nth(1)
                    .is_some_and(|target| target.starts_with(prefix))
            })
            .collect()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(routes: Vec<Route>) -> CatalogServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &routes, &log));
        }
    });
    CatalogServer {
        base: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, routes: &[Route], log: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let raw = match read_request(&mut stream) {
        Some(raw) => raw,
        None => return,
    };
    let request_line = raw.lines().next().unwrap_or("").to_string();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("");
    let path = target.split('?').next().unwrap_or("");
    log.lock().unwrap().push(request_line.clone());

    let (status, body): (u16, &[u8]) = match routes.iter().find(|r| r.matches(method, path, &raw)) {
        Some(route) => (route.status, &route.body),
        None => (404, br#"{"result":"error"}"#),
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason(status),
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

/// Reads headers and, when Content-Length is present, the body.
fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let want = content_length(&text[..end]);
            if data.len() >= end + 4 + want {
                break;
            }
        }
    }
    if data.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&data).into_owned())
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
