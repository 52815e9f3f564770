// In-memory collaborators and log capture for unit tests.

use crate::fetch::{ImageFetcher, PageFetcher};
use crate::model::{ExtractionFailure, FetchError, Listing};
use crate::parser::Extractor;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Dispatch;
use tracing::dispatcher::DefaultGuard;

#[derive(Clone)]
pub enum FakePage {
    Body(String),
    NotFound,
    Fail(String),
    /// Answers after the given delay.
    Slow(Duration, String),
    /// Never answers.
    Hang,
    /// Holds the worker thread without yielding, then answers.
    Block(Duration, String),
}

#[derive(Default)]
pub struct FakePages {
    pages: HashMap<String, FakePage>,
}

impl FakePages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }
}

#[async_trait::async_trait]
impl PageFetcher for FakePages {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match self.pages.get(url).cloned() {
            Some(FakePage::Body(body)) => Ok(body),
            Some(FakePage::NotFound) | None => Err(FetchError::NotFound),
            Some(FakePage::Fail(cause)) => Err(FetchError::Transport(cause)),
            Some(FakePage::Slow(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(FakePage::Hang) => std::future::pending().await,
            Some(FakePage::Block(delay, body)) => {
                std::thread::sleep(delay);
                Ok(body)
            }
        }
    }
}

pub struct FakeImages {
    encoded: Option<String>,
}

impl FakeImages {
    pub fn returning(encoded: &str) -> Self {
        Self {
            encoded: Some(encoded.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl ImageFetcher for FakeImages {
    async fn fetch_base64(&self, _url: &str) -> Option<String> {
        self.encoded.clone()
    }
}

/// Extractor for a made-up host. A page body starting with `BAD` is a parse
/// failure, `PANIC` panics, anything else becomes the listing's model.
pub struct StubExtractor {
    host: &'static str,
    pages: Arc<FakePages>,
}

impl StubExtractor {
    pub fn new(host: &'static str, pages: FakePages) -> Self {
        Self {
            host,
            pages: Arc::new(pages),
        }
    }
}

#[async_trait::async_trait]
impl Extractor for StubExtractor {
    fn name(&self) -> &'static str {
        self.host
    }

    fn host(&self) -> &'static str {
        self.host
    }

    async fn extract(&self, url: &str) -> Result<Listing, ExtractionFailure> {
        let body = self
            .pages
            .fetch(url)
            .await
            .map_err(|e| ExtractionFailure::from_fetch(url, e))?;
        if body.starts_with("BAD") {
            return Err(ExtractionFailure::parse(url, "no listing markup"));
        }
        if body.starts_with("PANIC") {
            panic!("extractor blew up on {}", url);
        }
        let mut listing = Listing::empty(url);
        listing.model = Some(body);
        Ok(listing)
    }
}

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Log lines that mention `needle`.
    pub fn lines_with(&self, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| l.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A subscriber that writes into the returned buffer. Attach it to a future with
/// `WithSubscriber::with_subscriber` when the test runs on several threads.
pub fn log_dispatch() -> (LogBuffer, Dispatch) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (buffer, Dispatch::new(subscriber))
}

/// Routes this thread's `tracing` output into a buffer.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let (buffer, dispatch) = log_dispatch();
    let guard = tracing::dispatcher::set_default(&dispatch);
    (buffer, guard)
}
