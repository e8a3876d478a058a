//! # emojiart-document
//!
//! The document controller for emoji art scenes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  intents   ┌──────────────┐  watch / broadcast  ┌───────────┐
//! │    caller    │──────────▶│   Document   │────────────────────▶│ observers │
//! └──────────────┘            └──────┬───────┘                     └───────────┘
//!                                    │ owns
//!              ┌─────────────────────┼─────────────────────┐
//!              ▼                     ▼                     ▼
//!      ┌──────────────┐      ┌──────────────┐      ┌──────────────┐
//!      │   UndoLog    │      │ImageResolver │      │   Autosave   │
//!      │  (snapshots) │      │ fetch+decode │      │ single timer │
//!      └──────────────┘      └──────┬───────┘      └──────┬───────┘
//!                                   │ ImageFetcher        │ PersistencePort
//!                                   ▼                     ▼
//!                             HTTP / data: / file:   FileStore / MemoryStore
//! ```
//!
//! Spawned work reports back through an internal channel; the owner applies
//! it with [`Document::apply_pending`] or [`Document::next_update`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod autosave;
pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod image;
pub mod resolver;

pub use config::DocumentConfig;
pub use document::{Document, DocumentEvent, DocumentSnapshot, OpenOutcome};
pub use error::{DocumentError, DocumentResult, ImageError};
pub use fetch::{HttpFetcher, ImageFetcher};
pub use crate::image::{decode_image, DecodedImage, ImageFormat};
pub use resolver::ImageStatus;

/// Document crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
