//! Shared helpers for document integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use emojiart_core::{DocumentKey, MemoryStore};
use emojiart_document::{Document, DocumentConfig, ImageError, ImageFetcher};
use tokio::sync::oneshot;
use url::Url;

pub type Gate = oneshot::Sender<Result<Vec<u8>, ImageError>>;

/// Fetcher whose responses are released by the test, one gate per URL.
#[derive(Default)]
pub struct GatedFetcher {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<Vec<u8>, ImageError>>>>,
    calls: AtomicUsize,
}

impl GatedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register the next response for `url`.
    pub fn gate(&self, url: &Url) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("gates lock")
            .insert(url.as_str().to_string(), rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for GatedFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().expect("gates lock").remove(url.as_str());
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ImageError::Fetch("gate dropped".to_string()))),
            None => Err(ImageError::Fetch(format!("no response for {url}"))),
        }
    }
}

pub fn url(s: &str) -> Url {
    Url::parse(s).expect("valid url")
}

/// Encode a solid `width` x `height` PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let pixels = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(pixels)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn config() -> DocumentConfig {
    DocumentConfig::default().with_autosave_interval(Duration::from_secs(5))
}

pub fn document_with(store: &MemoryStore, fetcher: Arc<GatedFetcher>) -> Document {
    Document::new(
        DocumentKey::autosave(),
        Arc::new(store.clone()),
        fetcher,
        &config(),
    )
}

/// Wait for the next background result, failing the test after a few seconds.
pub async fn next_update(doc: &mut Document) {
    tokio::time::timeout(Duration::from_secs(5), doc.next_update())
        .await
        .expect("background result should arrive");
}
