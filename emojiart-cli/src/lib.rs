//! # emojiart-cli
//!
//! Headless front-end for emoji art documents, mostly useful for poking at a
//! data directory by hand.
//!
//! ## Usage
//!
//! ```bash
//! emojiart --data-dir ./art add 🙂 10 20 --size 50
//! emojiart --data-dir ./art move -- 5 -5 1
//! emojiart --data-dir ./art background https://example.com/beach.jpg
//! emojiart --data-dir ./art show
//! emojiart --data-dir ./art palettes
//! ```
//!
//! Each invocation opens the document, applies one intent, waits for any
//! background fetch, saves and prints the result as JSON.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use emojiart_core::persist::AUTOSAVE_KEY;
use emojiart_core::{Background, DocumentKey, FileStore, PaletteStore, StickerId};
use emojiart_document::{Document, DocumentConfig, DocumentEvent, HttpFetcher, ImageStatus};
use url::Url;

/// Name of the palette store the CLI works with.
pub const PALETTE_STORE: &str = "default";

/// Command-line arguments for emojiart.
#[derive(Debug, Clone, Parser)]
#[command(name = "emojiart")]
#[command(about = "Edit EmojiArt documents from the command line")]
#[command(version)]
pub struct CliArgs {
    /// Directory documents and palettes are stored in
    #[arg(long, env = "EMOJIART_DATA_DIR", default_value = "emojiart-data")]
    pub data_dir: PathBuf,

    /// Document name within the data directory
    #[arg(long, short, default_value = AUTOSAVE_KEY)]
    pub document: String,

    /// Autosave quiescence window in milliseconds
    #[arg(long, env = "EMOJIART_AUTOSAVE_MS", default_value = "5000")]
    pub autosave_ms: u64,

    /// Timeout for fetching a remote background, in seconds
    #[arg(long, default_value = "30")]
    pub fetch_timeout_secs: u64,

    /// Let the autosave timer write the document instead of saving on exit
    #[arg(long)]
    pub wait_autosave: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// A single operation on the document or palettes.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print the document
    Show,
    /// Add a sticker
    #[command(allow_negative_numbers = true)]
    Add {
        /// The emoji to place
        glyph: String,
        /// Horizontal position
        x: i32,
        /// Vertical position
        y: i32,
        /// Sticker size
        #[arg(long, default_value = "40")]
        size: u32,
    },
    /// Move stickers by an offset
    #[command(allow_negative_numbers = true)]
    Move {
        /// Horizontal offset
        dx: i32,
        /// Vertical offset
        dy: i32,
        /// Sticker ids
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Rescale stickers by a factor
    Scale {
        /// Scale factor
        factor: f64,
        /// Sticker ids
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Remove stickers
    Remove {
        /// Sticker ids
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Set the background to `blank`, a URL, or an embedded image file
    Background {
        /// `blank` or an image URL
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        source: Option<String>,
        /// Embed the image at this path in the document
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List palettes
    Palettes,
    /// Add emoji to a palette, creating it if needed
    AddPalette {
        /// Palette name
        name: String,
        /// Emoji to add
        emojis: String,
    },
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Data directory for documents and palettes.
    pub data_dir: PathBuf,
    /// Document to operate on.
    pub document: DocumentKey,
    /// Document tunables.
    pub document_config: DocumentConfig,
    /// Wait for the autosave timer instead of saving on exit.
    pub wait_autosave: bool,
    /// The requested operation.
    pub command: Command,
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            data_dir: args.data_dir,
            document: DocumentKey::new(args.document),
            document_config: DocumentConfig::default()
                .with_autosave_interval(Duration::from_millis(args.autosave_ms))
                .with_fetch_timeout(Duration::from_secs(args.fetch_timeout_secs)),
            wait_autosave: args.wait_autosave,
            command: args.command,
        }
    }
}

/// Run one command, writing its report to `out`.
///
/// # Errors
///
/// Returns an error if the data directory is unusable, the arguments do not
/// describe a valid background, or the document cannot be saved.
pub async fn run(config: CliConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let store = Arc::new(
        FileStore::with_data_dir(&config.data_dir)
            .with_context(|| format!("cannot use data directory {}", config.data_dir.display()))?,
    );

    match &config.command {
        Command::Palettes => {
            let palettes = PaletteStore::open(PALETTE_STORE, store).await;
            return print_palettes(&palettes, out);
        }
        Command::AddPalette { name, emojis } => {
            let palettes = PaletteStore::open(PALETTE_STORE, store).await;
            let id = match palettes.palettes().into_iter().find(|p| p.name == *name) {
                Some(palette) => palette.id,
                None => palettes.insert_palette(name, None, 0).await,
            };
            palettes.add_emojis(id, emojis).await;
            return print_palettes(&palettes, out);
        }
        _ => {}
    }

    let fetcher = Arc::new(HttpFetcher::new(&config.document_config)?);
    let opened = Document::open(config.document, store, fetcher, &config.document_config).await;
    if let Some(e) = &opened.error {
        tracing::warn!("{e}; starting with an empty document");
    }
    let mut doc = opened.document;
    let mut events = doc.events();

    let changed = apply(&mut doc, config.command).await?;

    while *doc.image_status() == ImageStatus::Fetching {
        doc.next_update().await;
    }

    if changed {
        if config.wait_autosave {
            while doc.has_pending_save() {
                doc.next_update().await;
            }
            doc.apply_pending();
            while let Ok(event) = events.try_recv() {
                if let DocumentEvent::SaveFailed(message) = event {
                    anyhow::bail!("autosave failed: {message}");
                }
            }
        } else {
            doc.save_now().await?;
        }
    } else {
        tracing::debug!("Document unchanged, not saving");
    }

    print_document(&doc, out)
}

/// Apply one document command. Returns whether the scene changed.
async fn apply(doc: &mut Document, command: Command) -> anyhow::Result<bool> {
    let ids = |raw: Vec<u64>| -> Vec<StickerId> { raw.into_iter().map(StickerId::new).collect() };

    let changed = match command {
        Command::Show | Command::Palettes | Command::AddPalette { .. } => false,
        Command::Add { glyph, x, y, size } => {
            let id = doc.add_sticker(glyph, (x, y), size);
            tracing::info!("Added sticker {id}");
            true
        }
        Command::Move { dx, dy, ids: raw } => doc.move_stickers(&ids(raw), dx, dy),
        Command::Scale { factor, ids: raw } => doc.scale_stickers(&ids(raw), factor),
        Command::Remove { ids: raw } => doc.remove_stickers(&ids(raw)),
        Command::Background { source, file } => {
            let background = match (source.as_deref(), file) {
                (Some("blank"), _) => Background::Blank,
                (Some(source), _) => {
                    let url = Url::parse(source)
                        .with_context(|| format!("invalid background URL {source:?}"))?;
                    Background::from_dropped_url(&url)
                }
                (None, Some(path)) => Background::InlineBytes(
                    tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("cannot read {}", path.display()))?,
                ),
                (None, None) => anyhow::bail!("a background source or --file is required"),
            };
            doc.set_background(background)
        }
    };
    Ok(changed)
}

fn print_document(doc: &Document, out: &mut impl Write) -> anyhow::Result<()> {
    let image_status = match doc.image_status() {
        ImageStatus::Idle => serde_json::json!("idle"),
        ImageStatus::Fetching => serde_json::json!("fetching"),
        ImageStatus::Failed(url) => serde_json::json!({ "failed": url.as_str() }),
    };
    let image = doc
        .image()
        .map(|image| serde_json::json!({ "width": image.width, "height": image.height }));

    let report = serde_json::json!({
        "document": doc.key().as_str(),
        "scene": serde_json::to_value(doc.scene())?,
        "imageStatus": image_status,
        "image": image,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

fn print_palettes(palettes: &PaletteStore, out: &mut impl Write) -> anyhow::Result<()> {
    for palette in palettes.palettes() {
        writeln!(out, "{:>3}  {:<12} {}", palette.id, palette.name, palette.emojis)?;
    }
    Ok(())
}
