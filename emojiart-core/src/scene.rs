//! The scene: a background plus an ordered set of stickers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Background, CoreError, CoreResult, Sticker, StickerId};

/// Current persisted document format version.
pub const DOCUMENT_VERSION: u32 = 1;

/// A scene containing the background and all stickers.
///
/// Sticker order is z-order: later stickers draw on top. All operations are
/// pure value transformations; a `Scene` performs no I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SceneRepr", into = "SceneRepr")]
pub struct Scene {
    background: Background,
    stickers: Vec<Sticker>,
    /// Highest id ever allocated, including ids of removed stickers.
    last_sticker_id: StickerId,
}

impl Scene {
    /// Create an empty scene with a blank background.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current background.
    #[must_use]
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Replace the background wholesale.
    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }

    /// All stickers, bottom-most first.
    #[must_use]
    pub fn stickers(&self) -> &[Sticker] {
        &self.stickers
    }

    /// Get a sticker by id.
    #[must_use]
    pub fn sticker(&self, id: StickerId) -> Option<&Sticker> {
        self.stickers.iter().find(|s| s.id == id)
    }

    /// Check if a sticker with this id exists.
    #[must_use]
    pub fn contains(&self, id: StickerId) -> bool {
        self.sticker(id).is_some()
    }

    /// Get the number of stickers in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stickers.len()
    }

    /// Check if the scene has no stickers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stickers.is_empty()
    }

    /// The highest sticker id ever allocated in this scene.
    #[must_use]
    pub fn last_sticker_id(&self) -> StickerId {
        self.last_sticker_id
    }

    /// Make sure future ids are allocated above `id`.
    ///
    /// The counter only ever moves forward.
    pub fn reserve_ids_through(&mut self, id: StickerId) {
        self.last_sticker_id = self.last_sticker_id.max(id);
    }

    /// Append a new sticker on top of the others and return its id.
    ///
    /// A size of zero is clamped to 1. Glyph validity is the caller's concern.
    pub fn add_sticker(
        &mut self,
        glyph: impl Into<String>,
        at: (i32, i32),
        size: u32,
    ) -> StickerId {
        let id = self.last_sticker_id.next();
        self.last_sticker_id = id;
        self.stickers.push(Sticker::new(id, glyph.into(), at, size));
        id
    }

    /// Translate a sticker. Returns `false` (and does nothing) if the id is unknown.
    pub fn move_sticker(&mut self, id: StickerId, dx: i32, dy: i32) -> bool {
        let Some(sticker) = self.sticker_mut(id) else {
            return false;
        };
        sticker.offset(dx, dy);
        true
    }

    /// Rescale a sticker. Returns `false` (and does nothing) if the id is unknown.
    ///
    /// The new size is rounded half away from zero and clamped to at least 1.
    pub fn scale_sticker(&mut self, id: StickerId, factor: f64) -> bool {
        let Some(sticker) = self.sticker_mut(id) else {
            return false;
        };
        sticker.scale(factor);
        true
    }

    /// Remove a sticker. The id is not released for reuse.
    pub fn remove_sticker(&mut self, id: StickerId) -> Option<Sticker> {
        let index = self.stickers.iter().position(|s| s.id == id)?;
        Some(self.stickers.remove(index))
    }

    fn sticker_mut(&mut self, id: StickerId) -> Option<&mut Sticker> {
        self.stickers.iter_mut().find(|s| s.id == id)
    }

    /// Encode the scene into its canonical byte form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(CoreError::Serialization)
    }

    /// Decode a scene previously produced by [`Scene::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptDocument`] on malformed input, missing
    /// fields, type mismatches or a scene that violates id uniqueness.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::CorruptDocument(e.to_string()))
    }
}

fn current_version() -> u32 {
    DOCUMENT_VERSION
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneRepr {
    #[serde(default = "current_version")]
    version: u32,
    background: Background,
    stickers: Vec<Sticker>,
    #[serde(default)]
    last_sticker_id: Option<StickerId>,
}

impl From<Scene> for SceneRepr {
    fn from(scene: Scene) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            background: scene.background,
            stickers: scene.stickers,
            last_sticker_id: Some(scene.last_sticker_id),
        }
    }
}

impl TryFrom<SceneRepr> for Scene {
    type Error = String;

    fn try_from(repr: SceneRepr) -> Result<Self, Self::Error> {
        if repr.version != DOCUMENT_VERSION {
            return Err(format!("unsupported document version {}", repr.version));
        }

        let mut seen = HashSet::with_capacity(repr.stickers.len());
        for sticker in &repr.stickers {
            if !seen.insert(sticker.id) {
                return Err(format!("duplicate sticker id {}", sticker.id));
            }
            if sticker.size == 0 {
                return Err(format!("sticker {} has zero size", sticker.id));
            }
        }

        let highest = repr
            .stickers
            .iter()
            .map(|s| s.id)
            .max()
            .unwrap_or_default();
        let last_sticker_id = match repr.last_sticker_id {
            Some(stored) if stored < highest => {
                return Err(format!(
                    "sticker id {highest} is above the id counter {stored}"
                ));
            }
            Some(stored) => stored,
            None => highest,
        };

        Ok(Self {
            background: repr.background,
            stickers: repr.stickers,
            last_sticker_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_allocates_increasing_ids() {
        let mut scene = Scene::new();
        assert!(scene.is_empty());

        let a = scene.add_sticker("🙂", (10, 20), 50);
        let b = scene.add_sticker("🐢", (0, 0), 30);

        assert_eq!(a, StickerId::new(1));
        assert_eq!(b, StickerId::new(2));
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.stickers()[1].id, b);
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut scene = Scene::new();
        let a = scene.add_sticker("🙂", (0, 0), 10);
        let removed = scene.remove_sticker(a).expect("should remove");
        assert_eq!(removed.glyph, "🙂");

        let b = scene.add_sticker("🙂", (0, 0), 10);
        assert_eq!(b, StickerId::new(2));
        assert!(!scene.contains(a));
    }

    #[test]
    fn test_move_unknown_is_noop() {
        let mut scene = Scene::new();
        scene.add_sticker("🙂", (1, 1), 10);
        let before = scene.clone();

        assert!(!scene.move_sticker(StickerId::new(99), 5, 5));
        assert!(!scene.scale_sticker(StickerId::new(99), 2.0));
        assert!(scene.remove_sticker(StickerId::new(99)).is_none());
        assert_eq!(scene, before);
    }

    #[test]
    fn test_move_and_scale() {
        let mut scene = Scene::new();
        let id = scene.add_sticker("🙂", (10, 20), 50);

        assert!(scene.move_sticker(id, 5, -5));
        assert!(scene.scale_sticker(id, 1.25));

        let sticker = scene.sticker(id).expect("exists");
        assert_eq!((sticker.x, sticker.y), (15, 15));
        assert_eq!(sticker.size, 63); // 62.5 rounds away from zero
    }

    #[test]
    fn test_encode_shape() {
        let mut scene = Scene::new();
        scene.add_sticker("🙂", (10, 20), 50);
        let json: serde_json::Value =
            serde_json::from_slice(&scene.encode().expect("encode")).expect("json");

        assert_eq!(json["version"], 1);
        assert_eq!(json["background"], "blank");
        assert_eq!(json["lastStickerId"], 1);
        assert_eq!(
            json["stickers"][0],
            serde_json::json!({ "text": "🙂", "x": 10, "y": 20, "size": 50, "id": 1 })
        );
    }

    #[test]
    fn test_decode_round_trip_keeps_counter() {
        let mut scene = Scene::new();
        let a = scene.add_sticker("🙂", (0, 0), 10);
        scene.add_sticker("🐢", (3, 4), 12);
        scene.remove_sticker(a);

        let decoded = Scene::decode(&scene.encode().expect("encode")).expect("decode");
        assert_eq!(decoded, scene);
        assert_eq!(decoded.last_sticker_id(), StickerId::new(2));
    }

    #[test]
    fn test_decode_without_counter_uses_highest_id() {
        let json = br#"{"background":"blank","stickers":[{"text":"x","x":0,"y":0,"size":3,"id":7}]}"#;
        let scene = Scene::decode(json).expect("decode");
        assert_eq!(scene.last_sticker_id(), StickerId::new(7));
    }

    #[test]
    fn test_decode_rejects_corrupt_documents() {
        let cases: [&[u8]; 8] = [
            b"",
            b"not json",
            br#"{"stickers":[]}"#,
            br#"{"background":"blank"}"#,
            br#"{"background":"blank","stickers":[{"text":"x","x":"0","y":0,"size":3,"id":1}]}"#,
            br#"{"background":"blank","stickers":[{"text":"a","x":0,"y":0,"size":3,"id":1},{"text":"b","x":0,"y":0,"size":3,"id":1}]}"#,
            br#"{"background":"blank","stickers":[{"text":"a","x":0,"y":0,"size":0,"id":1}]}"#,
            br#"{"version":9,"background":"blank","stickers":[]}"#,
        ];
        for bytes in cases {
            let result = Scene::decode(bytes);
            assert!(
                matches!(result, Err(CoreError::CorruptDocument(_))),
                "{:?} should be corrupt",
                String::from_utf8_lossy(bytes)
            );
        }
    }

    #[test]
    fn test_decode_rejects_counter_below_ids() {
        let json = br#"{"background":"blank","lastStickerId":1,"stickers":[{"text":"x","x":0,"y":0,"size":3,"id":4}]}"#;
        assert!(matches!(
            Scene::decode(json),
            Err(CoreError::CorruptDocument(_))
        ));
    }

    #[test]
    fn test_reserve_ids_only_moves_forward() {
        let mut scene = Scene::new();
        scene.reserve_ids_through(StickerId::new(5));
        scene.reserve_ids_through(StickerId::new(2));
        assert_eq!(scene.add_sticker("🙂", (0, 0), 1), StickerId::new(6));
    }
}
