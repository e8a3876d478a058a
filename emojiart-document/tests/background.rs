//! Background image resolution through a document.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config, document_with, next_update, png_bytes, url, GatedFetcher};
use emojiart_core::{Background, DocumentKey, MemoryStore, Scene};
use emojiart_document::{Document, DocumentEvent, ImageError, ImageStatus};

fn image_size(doc: &Document) -> Option<(u32, u32)> {
    doc.image().map(|image| (image.width, image.height))
}

#[tokio::test]
async fn test_remote_background_resolves() {
    let fetcher = GatedFetcher::new();
    let mut doc = document_with(&MemoryStore::new(), Arc::clone(&fetcher));
    let cat = url("https://example.com/cat.png");

    let gate = fetcher.gate(&cat);
    assert!(doc.set_background(Background::RemoteUrl(cat)));
    assert_eq!(doc.image_status(), &ImageStatus::Fetching);
    assert!(doc.image().is_none());

    gate.send(Ok(png_bytes(4, 3))).expect("fetch waiting");
    next_update(&mut doc).await;

    assert_eq!(doc.image_status(), &ImageStatus::Idle);
    assert_eq!(image_size(&doc), Some((4, 3)));
    let snapshot = doc.snapshot();
    assert_eq!(snapshot.image.as_ref().map(|i| i.width), Some(4));
    assert_eq!(snapshot.image_status, ImageStatus::Idle);
}

#[tokio::test]
async fn test_failed_fetch_then_blank() {
    let fetcher = GatedFetcher::new();
    let mut doc = document_with(&MemoryStore::new(), Arc::clone(&fetcher));
    let mut events = doc.events();
    let broken = url("https://example.com/broken.png");

    fetcher
        .gate(&broken)
        .send(Err(ImageError::Status(404)))
        .expect("gate open");
    doc.set_background(Background::RemoteUrl(broken.clone()));
    next_update(&mut doc).await;

    assert_eq!(doc.image_status(), &ImageStatus::Failed(broken.clone()));
    assert!(doc.image().is_none());

    doc.set_background(Background::Blank);
    assert_eq!(doc.image_status(), &ImageStatus::Idle);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&DocumentEvent::ImageFetchFailed(broken.clone())));
    assert_eq!(
        seen.iter()
            .filter(|e| matches!(e, DocumentEvent::ImageStatusChanged(_)))
            .cloned()
            .collect::<Vec<_>>(),
        vec![
            DocumentEvent::ImageStatusChanged(ImageStatus::Fetching),
            DocumentEvent::ImageStatusChanged(ImageStatus::Failed(broken)),
            DocumentEvent::ImageStatusChanged(ImageStatus::Idle),
        ]
    );
}

#[tokio::test]
async fn test_superseded_fetch_never_shows() {
    let fetcher = GatedFetcher::new();
    let mut doc = document_with(&MemoryStore::new(), Arc::clone(&fetcher));
    let a = url("https://example.com/a.png");
    let b = url("https://example.com/b.png");
    let gate_a = fetcher.gate(&a);
    let gate_b = fetcher.gate(&b);

    doc.set_background(Background::RemoteUrl(a));
    let _ = gate_a.send(Ok(png_bytes(2, 2)));
    // Give A every chance to finish before it is superseded.
    tokio::time::sleep(Duration::from_millis(200)).await;

    doc.set_background(Background::RemoteUrl(b));
    doc.apply_pending();
    assert!(doc.image().is_none());
    assert_eq!(doc.image_status(), &ImageStatus::Fetching);

    gate_b.send(Ok(png_bytes(3, 3))).expect("fetch waiting");
    next_update(&mut doc).await;
    assert_eq!(image_size(&doc), Some((3, 3)));

    doc.apply_pending();
    assert_eq!(image_size(&doc), Some((3, 3)));
}

#[tokio::test]
async fn test_same_url_after_failure_retries() {
    let fetcher = GatedFetcher::new();
    let mut doc = document_with(&MemoryStore::new(), Arc::clone(&fetcher));
    let flaky = url("https://example.com/flaky.png");

    fetcher
        .gate(&flaky)
        .send(Err(ImageError::Fetch("connection reset".to_string())))
        .expect("gate open");
    doc.set_background(Background::RemoteUrl(flaky.clone()));
    next_update(&mut doc).await;
    assert_eq!(doc.image_status(), &ImageStatus::Failed(flaky.clone()));

    let gate = fetcher.gate(&flaky);
    assert!(!doc.set_background(Background::RemoteUrl(flaky)));
    assert_eq!(doc.image_status(), &ImageStatus::Fetching);

    gate.send(Ok(png_bytes(1, 1))).expect("fetch waiting");
    next_update(&mut doc).await;
    assert_eq!(doc.image_status(), &ImageStatus::Idle);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_same_url_while_fetching_is_noop() {
    let fetcher = GatedFetcher::new();
    let mut doc = document_with(&MemoryStore::new(), Arc::clone(&fetcher));
    let a = url("https://example.com/a.png");
    let _gate = fetcher.gate(&a);

    doc.set_background(Background::RemoteUrl(a.clone()));
    assert!(!doc.set_background(Background::RemoteUrl(a)));
    assert_eq!(doc.undo_action_name(), Some("Set Background"));
    doc.undo();
    assert!(!doc.can_undo());
}

#[tokio::test]
async fn test_inline_background() {
    let mut doc = document_with(&MemoryStore::new(), GatedFetcher::new());

    doc.set_background(Background::InlineBytes(png_bytes(5, 2)));
    assert_eq!(doc.image_status(), &ImageStatus::Idle);
    assert_eq!(image_size(&doc), Some((5, 2)));

    doc.set_background(Background::InlineBytes(b"not an image".to_vec()));
    assert_eq!(doc.image_status(), &ImageStatus::Idle);
    assert!(doc.image().is_none());
}

#[tokio::test]
async fn test_undo_restores_remote_background() {
    let fetcher = GatedFetcher::new();
    let mut doc = document_with(&MemoryStore::new(), Arc::clone(&fetcher));
    let sky = url("https://example.com/sky.png");

    fetcher.gate(&sky).send(Ok(png_bytes(6, 6))).expect("gate open");
    doc.set_background(Background::RemoteUrl(sky.clone()));
    next_update(&mut doc).await;
    assert!(doc.image().is_some());

    doc.set_background(Background::Blank);
    assert!(doc.image().is_none());

    fetcher.gate(&sky).send(Ok(png_bytes(6, 6))).expect("gate open");
    assert!(doc.undo());
    assert_eq!(doc.background().url(), Some(&sky));
    assert_eq!(doc.image_status(), &ImageStatus::Fetching);

    next_update(&mut doc).await;
    assert_eq!(image_size(&doc), Some((6, 6)));
}

#[tokio::test]
async fn test_open_fetches_stored_background() {
    let meadow = url("https://example.com/meadow.png");
    let mut scene = Scene::new();
    scene.set_background(Background::RemoteUrl(meadow.clone()));
    scene.add_sticker("🐄", (50, 60), 40);
    let store = MemoryStore::new();
    store.insert(DocumentKey::autosave(), scene.encode().expect("encode"));

    let fetcher = GatedFetcher::new();
    fetcher.gate(&meadow).send(Ok(png_bytes(8, 4))).expect("gate open");
    let mut doc = Document::open(
        DocumentKey::autosave(),
        Arc::new(store),
        fetcher,
        &config(),
    )
    .await
    .document;

    assert_eq!(doc.image_status(), &ImageStatus::Fetching);
    assert_eq!(doc.snapshot().image_status, ImageStatus::Fetching);
    next_update(&mut doc).await;
    assert_eq!(image_size(&doc), Some((8, 4)));
    assert!(!doc.can_undo());
}
