//! Fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::dispatch::NotificationSink;
use crate::error::{DispatchError, FetchError, FetchErrorKind, RenderError};
use crate::fetch::{DataSource, FetchResult, Quote};
use crate::render::Renderer;
use crate::subscriptions::SymbolTable;
use crate::view::View;

pub fn quote(symbol: &str, price: f64, change: f64, change_percent: &str) -> Quote {
    Quote {
        symbol: symbol.to_uppercase(),
        open: price,
        high: price,
        low: price,
        price,
        volume: 0,
        latest_trading_day: String::new(),
        previous_close: String::new(),
        change,
        change_percent: change_percent.to_string(),
    }
}

/// Answers every symbol with a flat quote unless told to fail it.
#[derive(Default)]
pub struct FakeSource {
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_uppercase());
        self
    }

    pub fn delayed(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_uppercase(), delay);
        self
    }

    pub fn called_symbols(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    pub fn call_times(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataSource for FakeSource {
    async fn fetch(&self, symbol: &str) -> FetchResult<Quote> {
        let symbol = symbol.to_uppercase();
        self.calls
            .lock()
            .unwrap()
            .push((symbol.clone(), Instant::now()));

        if let Some(delay) = self.delays.get(&symbol) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing.contains(&symbol) {
            return Err(FetchError::new(
                FetchErrorKind::NotFound,
                symbol,
                "Invalid API call",
            ));
        }

        Ok(quote(&symbol, 1.0, 1.0, "1%"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    View(String, View),
    Text(String, String),
    Image(String, PathBuf),
}

/// Records deliveries; destinations listed in `unreachable` fail.
#[derive(Default)]
pub struct RecordingSink {
    unreachable: HashSet<String>,
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(mut self, destination: &str) -> Self {
        self.unreachable.insert(destination.to_string());
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn check(&self, destination: &str) -> Result<(), DispatchError> {
        if self.unreachable.contains(destination) {
            Err(DispatchError::UnknownDestination(destination.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, destination: &str, view: &View) -> Result<(), DispatchError> {
        self.check(destination)?;
        self.sent
            .lock()
            .unwrap()
            .push(Sent::View(destination.to_string(), view.clone()));
        Ok(())
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), DispatchError> {
        self.check(destination)?;
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Text(destination.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_image(&self, destination: &str, path: &Path) -> Result<(), DispatchError> {
        self.check(destination)?;
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Image(destination.to_string(), path.to_path_buf()));
        Ok(())
    }
}

/// Pretends to render; remembers which symbols and names it was handed.
#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<(Vec<String>, SymbolTable)>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<(Vec<String>, SymbolTable)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, quotes: &[Quote], names: &SymbolTable) -> Result<PathBuf, RenderError> {
        if quotes.is_empty() {
            return Err(RenderError::NoQuotes);
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push((
            quotes.iter().map(|q| q.symbol.clone()).collect(),
            names.clone(),
        ));
        Ok(PathBuf::from(format!("render_{}.html", calls.len())))
    }
}

/// Local HTTP/1.1 server that answers every request with the same status and body
/// and keeps the raw requests it received.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = Arc::clone(&requests);
        let response = format!(
            "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                captured.lock().unwrap().push(request);
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            base_url,
            requests,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Client that never routes through a proxy from the environment.
    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        if let Some(end) = find(&data, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..end]).to_lowercase();
            let body = &data[end + 4..];
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok());

            let complete = match content_length {
                Some(length) => body.len() >= length,
                None if head.contains("transfer-encoding: chunked") => {
                    body.ends_with(b"0\r\n\r\n")
                }
                None => true,
            };
            if complete {
                break;
            }
        }

        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
