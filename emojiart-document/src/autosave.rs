//! Debounced saving of the current scene.

use std::sync::Arc;
use std::time::Duration;

use emojiart_core::{DocumentKey, PersistenceError, PersistencePort};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::document::Update;

struct Pending {
    sequence: u64,
    cancel: oneshot::Sender<()>,
}

/// Holds at most one pending save. Rescheduling replaces it, so a burst of
/// edits is written once, one interval after the last edit.
///
/// A save is only ever cancelled while it is still waiting out the interval.
/// Once a write has started it runs to completion, and writes are serialized
/// through `write_lock` so a newer save never overlaps an older one.
pub(crate) struct Autosave {
    port: Arc<dyn PersistencePort>,
    key: DocumentKey,
    interval: Duration,
    pending: Option<Pending>,
    sequence: u64,
    write_lock: Arc<Mutex<()>>,
    updates: mpsc::UnboundedSender<Update>,
}

impl Autosave {
    pub(crate) fn new(
        port: Arc<dyn PersistencePort>,
        key: DocumentKey,
        interval: Duration,
        updates: mpsc::UnboundedSender<Update>,
    ) -> Self {
        Self {
            port,
            key,
            interval,
            pending: None,
            sequence: 0,
            write_lock: Arc::new(Mutex::new(())),
            updates,
        }
    }

    pub(crate) fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Replace any pending save with one that writes `bytes` after the interval.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub(crate) fn schedule(&mut self, bytes: Vec<u8>) {
        self.cancel();
        self.sequence += 1;
        let sequence = self.sequence;
        let (cancel, mut cancelled) = oneshot::channel();
        let port = Arc::clone(&self.port);
        let key = self.key.clone();
        let interval = self.interval;
        let write_lock = Arc::clone(&self.write_lock);
        let updates = self.updates.clone();

        // Dropping the sender (the document went away) lets the save go ahead;
        // only an explicit cancel stops it.
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                Ok(()) = &mut cancelled => return,
            }
            let _guard = write_lock.lock().await;
            if cancelled.try_recv().is_ok() {
                return;
            }
            let result = port.save(&key, &bytes).await;
            match &result {
                Ok(()) => tracing::info!("Autosaved {key} ({} bytes)", bytes.len()),
                Err(e) => tracing::warn!("Autosave of {key} failed: {e}"),
            }
            let result = result.map_err(|e| e.to_string());
            if updates.send(Update::Saved { sequence, result }).is_err() {
                tracing::debug!("Document closed before autosave of {key} reported");
            }
        });
        self.pending = Some(Pending { sequence, cancel });
    }

    /// Drop the pending save, if it has not started writing.
    pub(crate) fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            // The task may already be writing or done; either way it no
            // longer counts as pending.
            let _ = pending.cancel.send(());
        }
    }

    /// Record that the save scheduled as `sequence` reported back.
    pub(crate) fn finished(&mut self, sequence: u64) {
        if self.pending.as_ref().is_some_and(|p| p.sequence == sequence) {
            self.pending = None;
        }
    }

    /// Check if a scheduled save has not reported back yet.
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Write `bytes` immediately, superseding any pending save.
    ///
    /// Waits for a save that is already writing to finish first.
    pub(crate) async fn save_now(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.cancel();
        let _guard = self.write_lock.lock().await;
        self.port.save(&self.key, bytes).await
    }
}
