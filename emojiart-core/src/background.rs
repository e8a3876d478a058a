//! Scene backgrounds.

use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

/// The base image of a scene.
///
/// Equality is structural: two remote backgrounds are equal iff their URLs
/// are equal.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BackgroundRepr", into = "BackgroundRepr")]
pub enum Background {
    /// No background image.
    #[default]
    Blank,
    /// An image fetched from the network.
    RemoteUrl(Url),
    /// Encoded image bytes stored in the document itself.
    InlineBytes(Vec<u8>),
}

impl Background {
    /// Build a background from a URL dropped onto the canvas.
    ///
    /// Image search results wrap the real image location in an `imgurl`
    /// query parameter; when present, that URL is used instead.
    #[must_use]
    pub fn from_dropped_url(url: &Url) -> Self {
        let embedded = url
            .query_pairs()
            .find(|(key, _)| key == "imgurl")
            .and_then(|(_, value)| Url::parse(&value).ok());
        Self::RemoteUrl(embedded.unwrap_or_else(|| url.clone()))
    }

    /// The remote URL, if this is a remote background.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::RemoteUrl(url) => Some(url),
            _ => None,
        }
    }

    /// The inline image bytes, if this is an inline background.
    #[must_use]
    pub fn image_data(&self) -> Option<&[u8]> {
        match self {
            Self::InlineBytes(data) => Some(data),
            _ => None,
        }
    }

    /// Check if this is the blank background.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => f.write_str("Blank"),
            Self::RemoteUrl(url) => f.debug_tuple("RemoteUrl").field(&url.as_str()).finish(),
            Self::InlineBytes(data) => write!(f, "InlineBytes({} bytes)", data.len()),
        }
    }
}

/// Persisted form: `"blank" | { url } | { imageBytes }`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BackgroundRepr {
    Blank(BlankTag),
    Url(UrlRepr),
    Bytes(BytesRepr),
}

#[derive(Serialize, Deserialize)]
enum BlankTag {
    #[serde(rename = "blank")]
    Blank,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct UrlRepr {
    url: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct BytesRepr {
    image_bytes: String,
}

impl From<Background> for BackgroundRepr {
    fn from(background: Background) -> Self {
        match background {
            Background::Blank => Self::Blank(BlankTag::Blank),
            Background::RemoteUrl(url) => Self::Url(UrlRepr { url: url.into() }),
            Background::InlineBytes(data) => Self::Bytes(BytesRepr {
                image_bytes: base64::engine::general_purpose::STANDARD.encode(data),
            }),
        }
    }
}

impl TryFrom<BackgroundRepr> for Background {
    type Error = String;

    fn try_from(repr: BackgroundRepr) -> Result<Self, Self::Error> {
        match repr {
            BackgroundRepr::Blank(BlankTag::Blank) => Ok(Self::Blank),
            BackgroundRepr::Url(UrlRepr { url }) => Url::parse(&url)
                .map(Self::RemoteUrl)
                .map_err(|e| format!("invalid background url {url:?}: {e}")),
            BackgroundRepr::Bytes(BytesRepr { image_bytes }) => {
                base64::engine::general_purpose::STANDARD
                    .decode(image_bytes)
                    .map(Self::InlineBytes)
                    .map_err(|e| format!("invalid background image bytes: {e}"))
            }
        }
    }
}
