//! Named emoji palettes.
//!
//! A [`PaletteStore`] is an explicitly constructed service holding an ordered
//! list of palettes. It is independent of any document: UI code copies a glyph
//! out of a palette and passes it to a document's add-sticker intent. Every
//! mutation is persisted through the injected [`PersistencePort`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use emojiart_core::palette::PaletteStore;
//! use emojiart_core::persist::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = PaletteStore::open("default", Arc::new(MemoryStore::new())).await;
//! let animals = store.palette(0).expect("seeded with defaults");
//! assert_eq!(animals.name, "Animals");
//! # }
//! ```

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::glyph;
use crate::persist::{DocumentKey, PersistencePort};
use crate::PersistenceError;

/// Palettes created for a store that has nothing persisted yet.
pub const DEFAULT_PALETTES: [(&str, &str); 5] = [
    ("Animals", "🐢🐡🐠🐟🐬🐳🐋🦈🐊🐅🐆🦓🦍🐒🐔🐧🐦🐥🦆🦅"),
    ("Weather", "⚡️☄️💥🔥🌪🌈☀️🌤⛅️🌥☁️🌦🌧⛈🌩🌨❄️☃️⛄️🌬💨💧💦☔️☂️🌊🌫"),
    (
        "Vehicles",
        "🚗🚕🚙🚌🚎🏎🚓🚑🚒🚐🛻🚚🚛🚜🦼🛴🚲🛵🏍🛺🚨🚔🚍🚘🚖🚡🚠🚟🚃🚋🚞🚝🚄🚅🚈🚂🚆🚇🚊🚉✈️🛫🛬🛩💺🛰🚀🛸🚁⛵️🚤🛥🛳⛴🚢",
    ),
    ("Buildings", "🏕⛺️🛖🏠🏡🏘🏚🏗🏭🏢🏬🏣🏤🏥🏦🏨🏪🏫🏩💒🏛⛪️🕌🕍🛕🕋⛩"),
    (
        "People",
        "👮‍♂️👷‍♀️💂‍♀️🕵️‍♂️👩‍⚕️🧑‍⚕️👨‍⚕️🧑‍🌾🧑‍🍳👨‍🎓👩‍🎤🧑‍🎤👨‍🎤👩‍🏫🧑‍🏫👨‍🏫👩‍🏭🧑‍🏭👨‍🏭👩‍💻👨‍💻👩‍💼🧑‍💼👨‍💼👩‍🔧👨‍🔧👩‍🔬👨‍🔬👨‍🎨👨‍🚒👨‍✈️👩‍🚀🧑‍⚖️👰‍♂️🤵‍♂️👸🤴🥷🦸‍♂️🦹‍♂️🎅🧙‍♂️🧝‍♀️🧝🧝‍♂️🧛‍♀️🧟🧟‍♂️🧞‍♀️🧞🧞‍♂️🧜‍♂️🧚‍♂️",
    ),
];

/// A named set of emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// Display name.
    pub name: String,
    /// The emoji, concatenated.
    pub emojis: String,
    /// Unique identifier within the store.
    pub id: u32,
}

impl Palette {
    /// The individual emoji glyphs of this palette.
    #[must_use]
    pub fn glyphs(&self) -> Vec<&str> {
        glyph::glyphs(&self.emojis)
    }
}

/// Ordered, persisted list of palettes.
///
/// Cloning yields another handle to the same palettes.
#[derive(Clone)]
pub struct PaletteStore {
    name: String,
    palettes: Arc<RwLock<Vec<Palette>>>,
    port: Arc<dyn PersistencePort>,
}

impl std::fmt::Debug for PaletteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaletteStore")
            .field("name", &self.name)
            .field("palettes", &self.len())
            .finish_non_exhaustive()
    }
}

impl PaletteStore {
    /// Open the store called `name`, restoring persisted palettes.
    ///
    /// Falls back to the default palettes when nothing usable is stored.
    pub async fn open(name: impl Into<String>, port: Arc<dyn PersistencePort>) -> Self {
        let store = Self {
            name: name.into(),
            palettes: Arc::new(RwLock::new(Vec::new())),
            port,
        };

        let key = store.key();
        let restored = match store.port.load(&key).await {
            Ok(Some(bytes)) => match Self::from_bytes(&bytes) {
                Ok(palettes) => palettes,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable palettes under {key}: {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load palettes under {key}: {e}");
                Vec::new()
            }
        };

        if restored.is_empty() {
            store.write(|palettes| {
                for (name, emojis) in DEFAULT_PALETTES {
                    let id = next_id(palettes);
                    palettes.push(Palette {
                        name: name.to_string(),
                        emojis: emojis.to_string(),
                        id,
                    });
                }
            });
            store.persist().await;
        } else {
            tracing::info!("Restored {} palettes from {key}", restored.len());
            store.write(|palettes| *palettes = restored);
        }
        store
    }

    /// The store's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key the palettes are persisted under.
    #[must_use]
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(format!("PaletteStore:{}", self.name))
    }

    /// A copy of all palettes in order.
    #[must_use]
    pub fn palettes(&self) -> Vec<Palette> {
        self.read(<[Palette]>::to_vec)
    }

    /// Get the number of palettes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(<[Palette]>::len)
    }

    /// Check if the store has no palettes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The palette at `index`, clamped into range.
    #[must_use]
    pub fn palette(&self, index: usize) -> Option<Palette> {
        self.read(|palettes| {
            let last = palettes.len().checked_sub(1)?;
            palettes.get(index.min(last)).cloned()
        })
    }

    /// Look up a palette by id.
    #[must_use]
    pub fn palette_by_id(&self, id: u32) -> Option<Palette> {
        self.read(|palettes| palettes.iter().find(|p| p.id == id).cloned())
    }

    /// Insert a new palette at `index` (clamped) and return its id.
    pub async fn insert_palette(&self, name: &str, emojis: Option<&str>, index: usize) -> u32 {
        let id = self.write(|palettes| {
            let id = next_id(palettes);
            let index = index.min(palettes.len());
            palettes.insert(
                index,
                Palette {
                    name: name.to_string(),
                    emojis: emojis.unwrap_or_default().to_string(),
                    id,
                },
            );
            id
        });
        self.persist().await;
        id
    }

    /// Remove the palette at `index` and return the index to show next.
    ///
    /// The last remaining palette is never removed.
    pub async fn remove_palette(&self, index: usize) -> usize {
        let (removed, next) = self.write(|palettes| {
            let removed = palettes.len() > 1 && index < palettes.len();
            if removed {
                palettes.remove(index);
            }
            (removed, index % palettes.len().max(1))
        });
        if removed {
            self.persist().await;
        }
        next
    }

    /// Move the palette at `from` so it ends up at `to` (clamped).
    pub async fn move_palette(&self, from: usize, to: usize) -> bool {
        let moved = self.write(|palettes| {
            if from >= palettes.len() {
                return false;
            }
            let palette = palettes.remove(from);
            let to = to.min(palettes.len());
            palettes.insert(to, palette);
            from != to
        });
        if moved {
            self.persist().await;
        }
        moved
    }

    /// Rename a palette.
    pub async fn rename_palette(&self, id: u32, name: &str) -> bool {
        self.update(id, |palette| palette.name = name.to_string()).await
    }

    /// Add emoji to the front of a palette, dropping non-emoji and duplicates.
    pub async fn add_emojis(&self, id: u32, emojis: &str) -> bool {
        self.update(id, |palette| {
            palette.emojis = glyph::unique_emoji(&format!("{emojis}{}", palette.emojis));
        })
        .await
    }

    /// Remove every occurrence of `emoji` from a palette.
    pub async fn remove_emoji(&self, id: u32, emoji: &str) -> bool {
        self.update(id, |palette| {
            palette.emojis = glyph::glyphs(&palette.emojis)
                .into_iter()
                .filter(|g| *g != emoji)
                .collect();
        })
        .await
    }

    async fn update<F>(&self, id: u32, f: F) -> bool
    where
        F: FnOnce(&mut Palette),
    {
        let changed = self.write(|palettes| {
            let Some(palette) = palettes.iter_mut().find(|p| p.id == id) else {
                return false;
            };
            let before = palette.clone();
            f(palette);
            *palette != before
        });
        if changed {
            self.persist().await;
        }
        changed
    }

    /// Serialize palettes to their persisted form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(palettes: &[Palette]) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec(palettes).map_err(|e| PersistenceError::Serialization(e.to_string()))
    }

    /// Deserialize palettes from their persisted form.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a palette list.
    pub fn from_bytes(bytes: &[u8]) -> Result<Vec<Palette>, PersistenceError> {
        serde_json::from_slice(bytes).map_err(|e| PersistenceError::Serialization(e.to_string()))
    }

    fn read<R>(&self, f: impl FnOnce(&[Palette]) -> R) -> R {
        let palettes = self
            .palettes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&palettes)
    }

    fn write<R>(&self, f: impl FnOnce(&mut Vec<Palette>) -> R) -> R {
        let mut palettes = self
            .palettes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut palettes)
    }

    /// Save the current palettes. Failures are logged, never returned.
    async fn persist(&self) {
        let key = self.key();
        let bytes = match Self::to_bytes(&self.palettes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to serialize palettes for {key}: {e}");
                return;
            }
        };
        if let Err(e) = self.port.save(&key, &bytes).await {
            tracing::warn!("Failed to persist palettes to {key}: {e}");
        }
    }
}

/// One past the highest id, or the lowest free id once that would overflow.
fn next_id(palettes: &[Palette]) -> u32 {
    let highest = palettes.iter().map(|p| p.id).max().unwrap_or(0);
    highest.checked_add(1).unwrap_or_else(|| {
        (1..u32::MAX)
            .find(|id| palettes.iter().all(|p| p.id != *id))
            .unwrap_or(0)
    })
}
