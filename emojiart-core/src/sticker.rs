//! Stickers - the emoji glyphs placed on a scene.

use serde::{Deserialize, Serialize};

/// Unique identifier for a sticker.
///
/// Ids are allocated by [`Scene`](crate::Scene) in increasing order and are
/// never reused within a document's lifetime.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StickerId(u64);

impl StickerId {
    /// Create an id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id following this one.
    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for StickerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A glyph positioned and sized in scene space.
///
/// `x` and `y` are offsets of the sticker's center from the scene origin.
/// `size` is the display size at scale 1.0 and is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sticker {
    /// The symbol shown, normally a single emoji grapheme cluster.
    #[serde(rename = "text")]
    pub glyph: String,
    /// Horizontal offset from the scene origin.
    pub x: i32,
    /// Vertical offset from the scene origin.
    pub y: i32,
    /// Display size at scale 1.0.
    pub size: u32,
    /// Unique identifier within the scene.
    pub id: StickerId,
}

impl Sticker {
    pub(crate) fn new(id: StickerId, glyph: String, (x, y): (i32, i32), size: u32) -> Self {
        Self {
            glyph,
            x,
            y,
            size: size.max(1),
            id,
        }
    }

    /// Translate by the given offset.
    pub(crate) fn offset(&mut self, dx: i32, dy: i32) {
        self.x = self.x.saturating_add(dx);
        self.y = self.y.saturating_add(dy);
    }

    /// Rescale, rounding half away from zero and never dropping below 1.
    ///
    /// Non-finite factors leave the size untouched.
    pub(crate) fn scale(&mut self, factor: f64) {
        if !factor.is_finite() {
            return;
        }
        let scaled = (f64::from(self.size) * factor)
            .round()
            .clamp(1.0, f64::from(u32::MAX));
        // Clamped into u32 range above
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            self.size = scaled as u32;
        }
    }
}
