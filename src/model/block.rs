//! Pipeline stream elements, target content blocks and placeholder tokens.

use super::{
    Alignment, AssetRef, CodeLanguage, FloatAlignment, ImageDisplay, ImageItem, ListBlock,
    ListType, Paragraph,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Prefix shared by every placeholder token.
pub const TOKEN_PREFIX: &str = "PLACEHOLDER_";

/// One unit of the stream passed between conversion stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// A non-list paragraph
    Paragraph(Paragraph),
    /// A normalized list run
    List(ListBlock),
    /// A resolved, uploaded image
    Image(ImageItem),
}

/// Kind of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextKind {
    /// Body paragraph
    Paragraph,
    /// Heading with source level 1-3
    Heading {
        /// Source heading level
        level: u8,
    },
    /// Block quote
    Quote,
    /// Code listing
    Code {
        /// Detected language
        language: CodeLanguage,
    },
}

impl TextKind {
    /// The storymap text `type` for non-code kinds.
    ///
    /// Storymaps reserve `h1` for the story title, so source headings shift
    /// down one level.
    pub fn storymap_type(self) -> &'static str {
        match self {
            TextKind::Heading { level: 1 } => "h2",
            TextKind::Heading { level: 2 } => "h3",
            TextKind::Heading { .. } => "h4",
            TextKind::Quote => "quote",
            TextKind::Paragraph | TextKind::Code { .. } => "paragraph",
        }
    }
}

/// A block handed to the storymap tree builder. Text lives in the token table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Paragraph, heading, quote or code
    Text {
        /// Text kind
        kind: TextKind,
        /// Paragraph alignment
        alignment: Alignment,
        /// Placeholder for the markup text
        text: PlaceholderToken,
    },
    /// A list
    List {
        /// Ordered or unordered
        list_type: ListType,
        /// Number of items
        item_count: usize,
        /// Deepest rendered depth
        max_depth: u8,
        /// Placeholder for the list markup
        text: PlaceholderToken,
    },
    /// An image
    Image {
        /// Uploaded asset
        asset: AssetRef,
        /// Size setting
        display: ImageDisplay,
        /// Side for floating images
        float_alignment: Option<FloatAlignment>,
        /// Placeholder for the caption
        caption: Option<PlaceholderToken>,
        /// Placeholder for the alternative text
        alt: Option<PlaceholderToken>,
        /// Width in pixels
        width: Option<u32>,
        /// Height in pixels
        height: Option<u32>,
    },
    /// A horizontal rule
    Separator,
}

impl ContentBlock {
    /// All placeholder tokens carried by this block.
    pub fn tokens(&self) -> Vec<&PlaceholderToken> {
        match self {
            ContentBlock::Text { text, .. } | ContentBlock::List { text, .. } => vec![text],
            ContentBlock::Image { caption, alt, .. } => {
                caption.iter().chain(alt.iter()).collect()
            }
            ContentBlock::Separator => Vec::new(),
        }
    }
}

/// Which field a placeholder stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    /// Paragraph, heading or quote text
    Text,
    /// List markup
    List,
    /// Code content
    Code,
    /// Image caption
    Caption,
    /// Image alternative text
    Alt,
    /// Cover title
    Title,
    /// Cover summary
    Summary,
    /// Description block
    Description,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            TokenKind::Text => "TEXT",
            TokenKind::List => "LIST",
            TokenKind::Code => "CODE",
            TokenKind::Caption => "CAPTION",
            TokenKind::Alt => "ALT",
            TokenKind::Title => "TITLE",
            TokenKind::Summary => "SUMMARY",
            TokenKind::Description => "DESCRIPTION",
        }
    }
}

/// An opaque ASCII identifier standing in for real text,
/// shaped `PLACEHOLDER_{KIND}_{NNNN}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderToken(String);

impl PlaceholderToken {
    fn new(kind: TokenKind, seq: u32) -> Self {
        PlaceholderToken(format!("{}{}_{:04}", TOKEN_PREFIX, kind.as_str(), seq))
    }

    /// The token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string has the shape of a placeholder token.
    pub fn looks_like(value: &str) -> bool {
        let Some(rest) = value.strip_prefix(TOKEN_PREFIX) else {
            return false;
        };
        let Some((kind, seq)) = rest.rsplit_once('_') else {
            return false;
        };
        !kind.is_empty()
            && kind.bytes().all(|b| b.is_ascii_uppercase())
            && !seq.is_empty()
            && seq.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for PlaceholderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlaceholderToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Side table mapping each placeholder to its real text, in issue order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenTable {
    entries: Vec<(PlaceholderToken, String)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TokenTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for `text`.
    pub fn issue(&mut self, kind: TokenKind, text: impl Into<String>) -> PlaceholderToken {
        let seq = self.entries.len() as u32 + 1;
        let token = PlaceholderToken::new(kind, seq);
        self.index.insert(token.0.clone(), self.entries.len());
        self.entries.push((token.clone(), text.into()));
        token
    }

    /// Real text for a token.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.index
            .get(token)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Check whether the table knows a token.
    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no token has been issued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(token, text)` pairs in issue order.
    pub fn iter(&self) -> impl Iterator<Item = (&PlaceholderToken, &str)> {
        self.entries.iter().map(|(t, s)| (t, s.as_str()))
    }
}
