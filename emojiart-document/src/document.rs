//! The document controller.
//!
//! A [`Document`] owns the current [`Scene`] and is the only place it changes.
//! Callers express edits as intents (`add_sticker`, `set_background`, ...);
//! each intent runs to completion, records an undo entry, reschedules the
//! autosave and publishes a fresh [`DocumentSnapshot`].
//!
//! Background fetches and autosave timers run on spawned tasks. Their results
//! come back through an internal channel and are applied by the owner with
//! [`Document::apply_pending`] or [`Document::next_update`], so observers only
//! ever see states produced on the owner.

use std::collections::HashSet;
use std::sync::Arc;

use emojiart_core::{
    Background, DocumentKey, PersistencePort, Scene, Sticker, StickerId, UndoLog,
};
use tokio::sync::{broadcast, mpsc, watch};
use url::Url;

use crate::autosave::Autosave;
use crate::config::DocumentConfig;
use crate::error::{DocumentError, DocumentResult};
use crate::fetch::ImageFetcher;
use crate::image::DecodedImage;
use crate::resolver::{FetchCompletion, ImageResolver, ImageStatus, Resolution};

/// Undo action name for background changes.
pub const ACTION_SET_BACKGROUND: &str = "Set Background";
/// Undo action name for new stickers.
pub const ACTION_ADD_STICKER: &str = "Add Sticker";
/// Undo action name for moves.
pub const ACTION_MOVE: &str = "Move";
/// Undo action name for rescales.
pub const ACTION_SCALE: &str = "Scale";
/// Undo action name for removals.
pub const ACTION_REMOVE: &str = "Remove";

const EVENT_CAPACITY: usize = 100;

/// Messages from spawned tasks back to the owning document.
#[derive(Debug)]
pub(crate) enum Update {
    Fetched(FetchCompletion),
    Saved {
        sequence: u64,
        result: Result<(), String>,
    },
}

/// Notifications broadcast to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The scene changed; carries the new revision.
    SceneChanged {
        /// Revision after the change.
        revision: u64,
    },
    /// The background image status changed.
    ImageStatusChanged(ImageStatus),
    /// Fetching the remote background failed.
    ImageFetchFailed(Url),
    /// An autosave or explicit save completed.
    Saved,
    /// A save failed. The scene is kept; the next save retries.
    SaveFailed(String),
}

/// Immutable view of the document published after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Increases by one for every scene change.
    pub revision: u64,
    /// The scene at this revision.
    pub scene: Scene,
    /// The resolved background image, if any.
    pub image: Option<Arc<DecodedImage>>,
    /// Background image status.
    pub image_status: ImageStatus,
    /// Whether an undo is available.
    pub can_undo: bool,
    /// Whether a redo is available.
    pub can_redo: bool,
}

/// Result of [`Document::open`].
///
/// Opening never fails outright: a missing or unreadable document yields an
/// empty scene, and the problem (if any) is reported in `error`.
pub struct OpenOutcome {
    /// The opened document.
    pub document: Document,
    /// Why the stored document could not be used, if it couldn't.
    pub error: Option<DocumentError>,
}

struct Gesture {
    action: String,
    before: Scene,
}

/// A single emoji art document.
pub struct Document {
    scene: Scene,
    revision: u64,
    image: Option<Arc<DecodedImage>>,
    image_status: ImageStatus,
    history: UndoLog,
    gesture: Option<Gesture>,
    resolver: ImageResolver,
    autosave: Autosave,
    updates: mpsc::UnboundedReceiver<Update>,
    snapshot_tx: watch::Sender<Arc<DocumentSnapshot>>,
    events_tx: broadcast::Sender<DocumentEvent>,
}

impl Document {
    /// Create a document with an empty scene.
    ///
    /// Nothing is loaded; the first edit schedules a save under `key`.
    ///
    /// # Panics
    ///
    /// Edits spawn autosave and fetch tasks, so the document must be used
    /// from within a tokio runtime. Intents panic otherwise.
    #[must_use]
    pub fn new(
        key: DocumentKey,
        port: Arc<dyn PersistencePort>,
        fetcher: Arc<dyn ImageFetcher>,
        config: &DocumentConfig,
    ) -> Self {
        Self::with_scene(Scene::new(), key, port, fetcher, config)
    }

    /// Open the document stored under `key`.
    ///
    /// A missing document opens empty without error. A corrupt or unreadable
    /// one opens empty and the cause is returned alongside. If the restored
    /// scene has a remote background, its fetch starts right away.
    pub async fn open(
        key: DocumentKey,
        port: Arc<dyn PersistencePort>,
        fetcher: Arc<dyn ImageFetcher>,
        config: &DocumentConfig,
    ) -> OpenOutcome {
        let (scene, error) = match port.load(&key).await {
            Ok(Some(bytes)) => match Scene::decode(&bytes) {
                Ok(scene) => {
                    tracing::info!("Loaded {key} ({} stickers)", scene.len());
                    (scene, None)
                }
                Err(e) => {
                    tracing::warn!("Discarding stored {key}: {e}");
                    (Scene::new(), Some(e.into()))
                }
            },
            Ok(None) => {
                tracing::debug!("No stored document under {key}, starting empty");
                (Scene::new(), None)
            }
            Err(e) => {
                tracing::warn!("Failed to load {key}: {e}");
                (Scene::new(), Some(e.into()))
            }
        };

        OpenOutcome {
            document: Self::with_scene(scene, key, port, fetcher, config),
            error,
        }
    }

    fn with_scene(
        scene: Scene,
        key: DocumentKey,
        port: Arc<dyn PersistencePort>,
        fetcher: Arc<dyn ImageFetcher>,
        config: &DocumentConfig,
    ) -> Self {
        let (updates_tx, updates) = mpsc::unbounded_channel();
        let history = config.undo_limit.map_or_else(UndoLog::new, UndoLog::with_limit);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot_tx, _) = watch::channel(Arc::new(DocumentSnapshot {
            revision: 0,
            scene: scene.clone(),
            image: None,
            image_status: ImageStatus::Idle,
            can_undo: false,
            can_redo: false,
        }));

        let mut document = Self {
            scene,
            revision: 0,
            image: None,
            image_status: ImageStatus::Idle,
            history,
            gesture: None,
            resolver: ImageResolver::new(fetcher, updates_tx.clone()),
            autosave: Autosave::new(port, key, config.autosave_interval, updates_tx),
            updates,
            snapshot_tx,
            events_tx,
        };
        if !document.scene.background().is_blank() {
            document.resolve_background();
            document.publish_snapshot();
        }
        document
    }

    // ---- Intents ----

    /// Replace the background.
    ///
    /// Returns `true` if the scene changed. Setting the same remote background
    /// again after its fetch failed retries the fetch without recording an
    /// undo entry.
    pub fn set_background(&mut self, background: Background) -> bool {
        let retry = match (&self.image_status, background.url()) {
            (ImageStatus::Failed(failed), Some(url)) => failed == url,
            _ => false,
        };
        let changed = self.apply(ACTION_SET_BACKGROUND, |scene| {
            scene.set_background(background);
        });
        let status = if changed || retry {
            self.resolve_background()
        } else {
            None
        };
        self.publish(changed, status);
        changed
    }

    /// Add a sticker on top of the others and return its id.
    pub fn add_sticker(
        &mut self,
        glyph: impl Into<String>,
        at: (i32, i32),
        size: u32,
    ) -> StickerId {
        let glyph = glyph.into();
        let mut id = StickerId::default();
        let changed = self.apply(ACTION_ADD_STICKER, |scene| {
            id = scene.add_sticker(glyph, at, size);
        });
        self.publish(changed, None);
        id
    }

    /// Translate one sticker. Unknown ids are ignored.
    pub fn move_sticker(&mut self, id: StickerId, dx: i32, dy: i32) -> bool {
        self.move_stickers(&[id], dx, dy)
    }

    /// Translate a set of stickers as one action. Unknown ids are ignored.
    pub fn move_stickers(&mut self, ids: &[StickerId], dx: i32, dy: i32) -> bool {
        let ids = unique(ids);
        let changed = self.apply(ACTION_MOVE, |scene| {
            for id in ids {
                scene.move_sticker(id, dx, dy);
            }
        });
        self.publish(changed, None);
        changed
    }

    /// Rescale one sticker. Unknown ids are ignored.
    pub fn scale_sticker(&mut self, id: StickerId, factor: f64) -> bool {
        self.scale_stickers(&[id], factor)
    }

    /// Rescale a set of stickers as one action. Unknown ids are ignored.
    pub fn scale_stickers(&mut self, ids: &[StickerId], factor: f64) -> bool {
        let ids = unique(ids);
        let changed = self.apply(ACTION_SCALE, |scene| {
            for id in ids {
                scene.scale_sticker(id, factor);
            }
        });
        self.publish(changed, None);
        changed
    }

    /// Remove one sticker. Unknown ids are ignored.
    pub fn remove_sticker(&mut self, id: StickerId) -> bool {
        self.remove_stickers(&[id])
    }

    /// Remove a set of stickers as one action. Unknown ids are ignored.
    pub fn remove_stickers(&mut self, ids: &[StickerId]) -> bool {
        let ids = unique(ids);
        let changed = self.apply(ACTION_REMOVE, |scene| {
            for id in ids {
                scene.remove_sticker(id);
            }
        });
        self.publish(changed, None);
        changed
    }

    /// Start grouping intents into a single undo entry named `action`.
    ///
    /// An already open gesture is closed first.
    pub fn begin_gesture(&mut self, action: impl Into<String>) {
        self.end_gesture();
        self.gesture = Some(Gesture {
            action: action.into(),
            before: self.scene.clone(),
        });
    }

    /// Close the open gesture, recording one undo entry if the scene changed.
    ///
    /// Returns `true` if an entry was recorded.
    pub fn end_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        if self.scene == gesture.before {
            return false;
        }
        tracing::debug!(action = %gesture.action, "Recorded gesture");
        self.history.record(gesture.action, gesture.before);
        self.publish_snapshot();
        true
    }

    /// Check if a gesture is open.
    #[must_use]
    pub fn in_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    /// Undo the last action. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.end_gesture();
        let Some((action, snapshot)) = self.history.undo(self.scene.clone()) else {
            return false;
        };
        tracing::debug!(%action, "Undo");
        self.restore(snapshot);
        true
    }

    /// Redo the last undone action. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.end_gesture();
        let Some((action, snapshot)) = self.history.redo(self.scene.clone()) else {
            return false;
        };
        tracing::debug!(%action, "Redo");
        self.restore(snapshot);
        true
    }

    /// Save the current scene immediately, replacing any pending autosave.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene cannot be encoded or the port fails.
    /// The scene is left as it is either way.
    pub async fn save_now(&mut self) -> DocumentResult<()> {
        let bytes = self.scene.encode()?;
        match self.autosave.save_now(&bytes).await {
            Ok(()) => {
                tracing::info!("Saved {} ({} bytes)", self.autosave.key(), bytes.len());
                self.emit(DocumentEvent::Saved);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Save of {} failed: {e}", self.autosave.key());
                self.emit(DocumentEvent::SaveFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Close the document: finish any gesture, stop fetching and save now.
    ///
    /// # Errors
    ///
    /// Returns an error if the final save fails.
    pub async fn close(mut self) -> DocumentResult<()> {
        self.end_gesture();
        self.resolver.cancel();
        self.save_now().await
    }

    // ---- Background task results ----

    /// Apply every completed background result without waiting.
    ///
    /// Returns the number of results applied.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates.try_recv() {
            self.handle_update(update);
            applied += 1;
        }
        applied
    }

    /// Wait for the next background result and apply it.
    ///
    /// Cancel safe. Waits forever if nothing is in flight.
    pub async fn next_update(&mut self) {
        if let Some(update) = self.updates.recv().await {
            self.handle_update(update);
        }
    }

    fn handle_update(&mut self, update: Update) {
        match update {
            Update::Fetched(completion) => self.finish_fetch(completion),
            Update::Saved { sequence, result } => {
                self.autosave.finished(sequence);
                match result {
                    Ok(()) => self.emit(DocumentEvent::Saved),
                    Err(message) => self.emit(DocumentEvent::SaveFailed(message)),
                }
            }
        }
    }

    fn finish_fetch(&mut self, completion: FetchCompletion) {
        let FetchCompletion {
            generation,
            url,
            result,
        } = completion;
        if !self.resolver.accept(generation) || self.scene.background().url() != Some(&url) {
            tracing::debug!(%url, generation, "Discarding stale background image");
            return;
        }

        let failed = match result {
            Ok(image) => {
                tracing::info!(
                    %url,
                    width = image.width,
                    height = image.height,
                    "Background image ready"
                );
                self.image = Some(Arc::new(image));
                false
            }
            Err(e) => {
                tracing::warn!(%url, "Background image failed: {e}");
                self.image = None;
                true
            }
        };
        let status = if failed {
            ImageStatus::Failed(url.clone())
        } else {
            ImageStatus::Idle
        };
        let status = self.set_status(status);
        self.publish_snapshot();
        if let Some(status) = status {
            self.emit(DocumentEvent::ImageStatusChanged(status));
        }
        if failed {
            self.emit(DocumentEvent::ImageFetchFailed(url));
        }
    }

    // ---- Accessors ----

    /// The key this document saves under.
    #[must_use]
    pub fn key(&self) -> &DocumentKey {
        self.autosave.key()
    }

    /// The current scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The current background.
    #[must_use]
    pub fn background(&self) -> &Background {
        self.scene.background()
    }

    /// All stickers, bottom-most first.
    #[must_use]
    pub fn stickers(&self) -> &[Sticker] {
        self.scene.stickers()
    }

    /// The resolved background image, if any.
    #[must_use]
    pub fn image(&self) -> Option<&Arc<DecodedImage>> {
        self.image.as_ref()
    }

    /// Background image status.
    #[must_use]
    pub fn image_status(&self) -> &ImageStatus {
        &self.image_status
    }

    /// Revision counter, bumped on every scene change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Check if an undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if a redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Name of the action the next undo reverts.
    #[must_use]
    pub fn undo_action_name(&self) -> Option<&str> {
        self.history.undo_action_name()
    }

    /// Name of the action the next redo reapplies.
    #[must_use]
    pub fn redo_action_name(&self) -> Option<&str> {
        self.history.redo_action_name()
    }

    /// Check if an autosave is scheduled and has not reported back yet.
    ///
    /// Turns false once the save's result has been applied by
    /// [`Document::apply_pending`] or [`Document::next_update`].
    #[must_use]
    pub fn has_pending_save(&self) -> bool {
        self.autosave.is_pending()
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DocumentSnapshot> {
        Arc::clone(&self.snapshot_tx.borrow())
    }

    /// Watch published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<DocumentSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Receive document events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events_tx.subscribe()
    }

    // ---- Internals ----

    /// Run `edit` against the scene. Records undo and schedules a save if the
    /// scene changed; does not publish.
    fn apply(&mut self, action: &str, edit: impl FnOnce(&mut Scene)) -> bool {
        let before = self.scene.clone();
        edit(&mut self.scene);
        if self.scene == before {
            tracing::trace!(action, "Intent left the scene unchanged");
            return false;
        }

        tracing::debug!(action, stickers = self.scene.len(), "Applied intent");
        if self.gesture.is_none() {
            self.history.record(action, before);
        }
        self.revision += 1;
        self.schedule_autosave();
        true
    }

    fn restore(&mut self, mut snapshot: Scene) {
        snapshot.reserve_ids_through(self.scene.last_sticker_id());
        let background_changed = snapshot.background() != self.scene.background();
        self.scene = snapshot;
        self.revision += 1;
        self.schedule_autosave();
        let status = if background_changed {
            self.resolve_background()
        } else {
            None
        };
        self.publish(true, status);
    }

    fn resolve_background(&mut self) -> Option<ImageStatus> {
        let status = match self.resolver.resolve(self.scene.background()) {
            Resolution::Ready(image) => {
                self.image = image;
                ImageStatus::Idle
            }
            Resolution::Pending => {
                self.image = None;
                ImageStatus::Fetching
            }
        };
        self.set_status(status)
    }

    /// Returns the new status if it differs from the old one.
    fn set_status(&mut self, status: ImageStatus) -> Option<ImageStatus> {
        if self.image_status == status {
            return None;
        }
        tracing::debug!(?status, "Image status changed");
        self.image_status = status.clone();
        Some(status)
    }

    fn schedule_autosave(&mut self) {
        match self.scene.encode() {
            Ok(bytes) => self.autosave.schedule(bytes),
            Err(e) => tracing::warn!("Skipping autosave, scene could not be encoded: {e}"),
        }
    }

    fn publish(&self, scene_changed: bool, status: Option<ImageStatus>) {
        if !scene_changed && status.is_none() {
            return;
        }
        self.publish_snapshot();
        if scene_changed {
            self.emit(DocumentEvent::SceneChanged {
                revision: self.revision,
            });
        }
        if let Some(status) = status {
            self.emit(DocumentEvent::ImageStatusChanged(status));
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(Arc::new(DocumentSnapshot {
            revision: self.revision,
            scene: self.scene.clone(),
            image: self.image.clone(),
            image_status: self.image_status.clone(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }));
    }

    fn emit(&self, event: DocumentEvent) {
        if let Err(e) = self.events_tx.send(event) {
            // No receivers is normal for headless use.
            tracing::trace!("Dropped document event: {e}");
        }
    }
}

fn unique(ids: &[StickerId]) -> HashSet<StickerId> {
    ids.iter().copied().collect()
}
