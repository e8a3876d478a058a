//! # emojiart-core
//!
//! Document model for emoji sticker scenes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                emojiart-core                │
//! ├─────────────────────────────────────────────┤
//! │  Scene Model     │  Undo Log                │
//! │  - Background    │  - Named snapshots       │
//! │  - Stickers      │  - Redo stack            │
//! │  - Encode/decode │                          │
//! ├─────────────────────────────────────────────┤
//! │  Persistence     │  Palettes                │
//! │  - Port trait    │  - Named emoji sets      │
//! │  - File / memory │  - Glyph segmentation    │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod background;
pub mod error;
pub mod glyph;
pub mod history;
pub mod palette;
pub mod persist;
pub mod scene;
pub mod sticker;

pub use background::Background;
pub use error::{CoreError, CoreResult, PersistenceError};
pub use history::UndoLog;
pub use palette::{Palette, PaletteStore};
pub use persist::{DocumentKey, FileStore, MemoryStore, PersistencePort};
pub use scene::{Scene, DOCUMENT_VERSION};
pub use sticker::{Sticker, StickerId};

/// Core crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
