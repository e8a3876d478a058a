//! Splitting emoji strings into individual glyphs.
//!
//! Emoji are frequently several code points long (ZWJ sequences, skin tone
//! modifiers, flags, keycaps), so glyphs are extended grapheme clusters.

use unicode_properties::UnicodeEmoji;
use unicode_segmentation::UnicodeSegmentation;

/// First code point that counts as an emoji on its own.
///
/// Below this, scalars such as digits, `#` and `*` carry the Emoji property
/// but only render as emoji when followed by a selector or keycap.
const STANDALONE_EMOJI_START: char = '\u{238D}';

/// Split a string into extended grapheme clusters.
#[must_use]
pub fn glyphs(text: &str) -> Vec<&str> {
    text.graphemes(true).collect()
}

/// Whether a glyph is an emoji rather than text.
///
/// The first scalar must have the Emoji property, and the glyph is either a
/// standalone emoji or a multi-scalar sequence such as `1️⃣`.
#[must_use]
pub fn is_emoji(glyph: &str) -> bool {
    let mut scalars = glyph.chars();
    let Some(first) = scalars.next() else {
        return false;
    };
    first.is_emoji_char() && (first >= STANDALONE_EMOJI_START || scalars.next().is_some())
}

/// Keep only emoji glyphs, dropping duplicates and keeping the first occurrence.
#[must_use]
pub fn unique_emoji(text: &str) -> String {
    let mut seen = Vec::new();
    for glyph in text.graphemes(true) {
        if is_emoji(glyph) && !seen.contains(&glyph) {
            seen.push(glyph);
        }
    }
    seen.concat()
}
