//! In-process fakes for the network seams, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::bunny::StreamApi;
use crate::bunny::UploadError;
use crate::bunny::types::{Collection, UploadResponse};
use crate::download::{DownloadError, Downloader};
use crate::vimeo::{SourceError, SourceSession};

/// Ordered log of calls across every fake sharing it.
pub type Events = Arc<Mutex<Vec<String>>>;

fn push(events: &Events, event: String) {
    events.lock().unwrap().push(event);
}

pub fn page_json(data: Vec<Value>, next: Option<&str>) -> Value {
    json!({
        "total": data.len(),
        "data": data,
        "paging": {"next": next},
    })
}

/// `ancestors` is root first; the wire format lists the immediate parent first.
pub fn folder_json(uri: &str, name: &str, ancestors: &[&str]) -> Value {
    let path: Vec<Value> = ancestors.iter().rev().map(|a| json!({"name": a})).collect();
    json!({
        "uri": uri,
        "name": name,
        "metadata": {"connections": {"ancestor_path": path}},
    })
}

pub fn video_json(n: u32, labels: &[&str]) -> Value {
    let download: Vec<Value> = labels
        .iter()
        .map(|label| json!({"rendition": label, "link": format!("https://dl.example/{n}/{label}")}))
        .collect();
    json!({
        "uri": format!("/videos/{n}"),
        "name": format!("Video {n}"),
        "link": format!("https://vimeo.com/{n}"),
        "download": download,
    })
}

#[derive(Default)]
pub struct FakeSource {
    responses: HashMap<String, Result<Value, u16>>,
    requests: Mutex<Vec<String>>,
    events: Events,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), Ok(body));
        self
    }

    pub fn with_status(mut self, path: &str, status: u16) -> Self {
        self.responses.insert(path.to_string(), Err(status));
        self
    }

    pub fn with_events(mut self, events: Events) -> Self {
        self.events = events;
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SourceSession for FakeSource {
    async fn get_json(&self, path: &str) -> Result<Value, SourceError> {
        self.requests.lock().unwrap().push(path.to_string());
        push(&self.events, format!("list {path}"));
        match self.responses.get(path) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(SourceError::HttpStatus {
                status: *status,
                url: path.to_string(),
            }),
            None => Err(SourceError::HttpStatus {
                status: 404,
                url: path.to_string(),
            }),
        }
    }
}

/// Writes a few bytes to the destination after an optional delay.
#[derive(Default)]
pub struct FakeDownloader {
    failing: HashSet<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
    events: Events,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_events(mut self, events: Events) -> Self {
        self.events = events;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Downloader for FakeDownloader {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        self.calls.lock().unwrap().push(url.to_string());
        push(&self.events, format!("download start {url}"));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = if self.failing.contains(url) {
            Err(DownloadError::RetriesExhausted {
                url: url.to_string(),
                attempts: 3,
                last_error: "HTTP error 503".into(),
            })
        } else {
            tokio::fs::write(dest, b"video-bytes")
                .await
                .map(|_| 11)
                .map_err(DownloadError::from)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        push(&self.events, format!("download end {url}"));
        result
    }
}

#[derive(Default)]
pub struct FakeStreamApi {
    collections: Mutex<Vec<Collection>>,
    next_id: AtomicU32,
    reject_uploads: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeStreamApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(self, guid: &str, name: &str) -> Self {
        self.collections.lock().unwrap().push(Collection {
            guid: Some(guid.to_string()),
            name: name.to_string(),
        });
        self
    }

    pub fn rejecting_uploads(mut self) -> Self {
        self.reject_uploads = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait::async_trait]
impl StreamApi for FakeStreamApi {
    async fn search_collections(
        &self,
        _library_id: &str,
        name: &str,
    ) -> Result<Vec<Collection>, UploadError> {
        self.calls.lock().unwrap().push(format!("search {name}"));
        let needle = name.to_lowercase();
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn create_collection(
        &self,
        _library_id: &str,
        name: &str,
    ) -> Result<Collection, UploadError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create_collection {name}"));
        let collection = Collection {
            guid: Some(self.next_id("col")),
            name: name.to_string(),
        };
        self.collections.lock().unwrap().push(collection.clone());
        Ok(collection)
    }

    async fn create_video(
        &self,
        _library_id: &str,
        title: &str,
        collection_id: &str,
    ) -> Result<String, UploadError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create_video {title} {collection_id}"));
        Ok(self.next_id("vid"))
    }

    async fn put_video_content(
        &self,
        _library_id: &str,
        video_id: &str,
        path: &Path,
    ) -> Result<UploadResponse, UploadError> {
        self.calls.lock().unwrap().push(format!("put {video_id}"));
        tokio::fs::metadata(path).await?;
        let status_code = if self.reject_uploads { 400 } else { 200 };
        Ok(UploadResponse {
            message: Some(if self.reject_uploads { "Rejected" } else { "OK" }.to_string()),
            status_code: Some(status_code),
        })
    }
}

/// One canned response served by [`StubServer`].
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    body: Vec<u8>,
    declared_len: Option<usize>,
    delay: Duration,
}

impl Reply {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.as_bytes().to_vec(),
            declared_len: None,
            delay: Duration::ZERO,
        }
    }

    /// Announce `len` bytes but close the connection after `body`.
    pub fn cut_short(mut self, len: usize) -> Self {
        self.declared_len = Some(len);
        self
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// HTTP/1.1 server on 127.0.0.1 that answers one request per connection
/// with the next scripted reply. The last reply repeats once the script runs
/// out.
pub struct StubServer {
    base: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(replies: Vec<Reply>) -> Self {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (served, log) = (hits.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await.unwrap_or_default();
                log.lock().unwrap().push(request);
                let n = served.fetch_add(1, Ordering::SeqCst);
                let Some(reply) = replies.get(n).or(replies.last()).cloned() else {
                    continue;
                };

                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                let head = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                    reply.status,
                    reply.declared_len.unwrap_or(reply.body.len()),
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&reply.body).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            base,
            hits,
            requests,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request text (head and body) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> std::io::Result<String> {
    use tokio::io::AsyncReadExt;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(String::from_utf8_lossy(&buf).into_owned());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + body_len {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
