//! Turning a background into a displayable image.
//!
//! Blank and inline backgrounds resolve immediately. Remote backgrounds start
//! a fetch task whose completion is sent back to the owning document. Every
//! resolution starts a new generation and aborts the previous task; a
//! completion is only accepted for the current generation.

use std::sync::Arc;

use emojiart_core::Background;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::document::Update;
use crate::error::ImageError;
use crate::fetch::ImageFetcher;
use crate::image::{decode_image, DecodedImage};

/// Progress of the background image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageStatus {
    /// Nothing in flight.
    #[default]
    Idle,
    /// A remote image is being fetched.
    Fetching,
    /// The last fetch of this URL failed.
    Failed(Url),
}

/// Outcome of a background fetch, tagged with the generation that started it.
#[derive(Debug)]
pub(crate) struct FetchCompletion {
    pub(crate) generation: u64,
    pub(crate) url: Url,
    pub(crate) result: Result<DecodedImage, ImageError>,
}

/// What a resolution produced.
#[derive(Debug)]
pub(crate) enum Resolution {
    /// Image known right away (`None` for blank or undecodable backgrounds).
    Ready(Option<Arc<DecodedImage>>),
    /// A fetch was started; a completion will follow.
    Pending,
}

pub(crate) struct ImageResolver {
    fetcher: Arc<dyn ImageFetcher>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    updates: mpsc::UnboundedSender<Update>,
}

impl ImageResolver {
    pub(crate) fn new(
        fetcher: Arc<dyn ImageFetcher>,
        updates: mpsc::UnboundedSender<Update>,
    ) -> Self {
        Self {
            fetcher,
            generation: 0,
            in_flight: None,
            updates,
        }
    }

    /// Resolve `background`, superseding any fetch in flight.
    pub(crate) fn resolve(&mut self, background: &Background) -> Resolution {
        self.cancel();
        match background {
            Background::Blank => Resolution::Ready(None),
            Background::InlineBytes(data) => match decode_image(data) {
                Ok(image) => Resolution::Ready(Some(Arc::new(image))),
                Err(e) => {
                    tracing::warn!("Inline background could not be decoded: {e}");
                    Resolution::Ready(None)
                }
            },
            Background::RemoteUrl(url) => {
                self.spawn_fetch(url.clone());
                Resolution::Pending
            }
        }
    }

    fn spawn_fetch(&mut self, url: Url) {
        let generation = self.generation;
        let fetcher = Arc::clone(&self.fetcher);
        let updates = self.updates.clone();
        tracing::debug!(%url, generation, "Fetching background image");

        self.in_flight = Some(tokio::spawn(async move {
            let result = match fetcher.fetch(&url).await {
                Ok(bytes) => tokio::task::spawn_blocking(move || decode_image(&bytes))
                    .await
                    .unwrap_or_else(|e| {
                        Err(ImageError::Decode(format!("decoder task failed: {e}")))
                    }),
                Err(e) => Err(e),
            };
            let completion = FetchCompletion {
                generation,
                url,
                result,
            };
            if updates.send(Update::Fetched(completion)).is_err() {
                tracing::debug!("Document closed before background fetch completed");
            }
        }));
    }

    /// Invalidate the current generation and abort its task.
    pub(crate) fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    /// Accept a completion if it belongs to the current generation.
    pub(crate) fn accept(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.in_flight = None;
        true
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ImageResolver {
    fn drop(&mut self) {
        self.cancel();
    }
}
