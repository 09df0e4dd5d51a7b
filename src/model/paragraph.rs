//! Paragraph and text-level types of the conversion IR.

use super::ListType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A paragraph after run extraction and style classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Styled spans in document order (empty for blank paragraphs)
    pub spans: Vec<StyledSpan>,

    /// Classified paragraph style
    pub style_kind: StyleKind,

    /// Paragraph alignment
    pub alignment: Alignment,

    /// Detected language for code paragraphs
    pub language: Option<CodeLanguage>,

    /// Authored list position for list items
    pub list: Option<ListMarker>,

    /// Index of the source paragraph in the document body
    pub source_index: usize,
}

impl Paragraph {
    /// Create an empty paragraph of the given kind.
    pub fn new(style_kind: StyleKind) -> Self {
        Self {
            spans: Vec::new(),
            style_kind,
            alignment: Alignment::default(),
            language: None,
            list: None,
            source_index: 0,
        }
    }

    /// Create a paragraph with plain text.
    pub fn with_text(style_kind: StyleKind, text: impl Into<String>) -> Self {
        let mut p = Self::new(style_kind);
        p.spans.push(StyledSpan::new(text));
        p
    }

    /// Create a list-item paragraph.
    pub fn list_item(text: impl Into<String>, depth: u8, list_type: ListType) -> Self {
        let mut p = Self::with_text(StyleKind::ListItem, text);
        p.list = Some(ListMarker { depth, list_type });
        p
    }

    /// Get plain text content of the paragraph.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Check if the paragraph has no spans or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }

    /// Check if this is a list item.
    pub fn is_list_item(&self) -> bool {
        self.style_kind == StyleKind::ListItem
    }
}

/// A run of text with uniform attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledSpan {
    /// The text content
    pub text: String,

    /// Character attributes
    pub style: TextStyle,

    /// Horizontal alignment of the owning paragraph
    pub alignment: Alignment,
}

impl StyledSpan {
    /// Create a span with default attributes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
            alignment: Alignment::default(),
        }
    }

    /// Create a span with the given character attributes.
    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            style,
            ..Self::new(text)
        }
    }

    /// Check whether another span can be merged into this one.
    pub fn same_attributes(&self, other: &StyledSpan) -> bool {
        self.style == other.style && self.alignment == other.alignment
    }
}

/// Character formatting taken from direct run properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextStyle {
    /// Bold text
    pub bold: bool,

    /// Italic text
    pub italic: bool,

    /// Underlined text
    pub underline: bool,

    /// Strikethrough text
    pub strikethrough: bool,

    /// Superscript
    pub superscript: bool,

    /// Subscript
    pub subscript: bool,

    /// Direct font color
    pub color: Option<Rgb>,

    /// Hyperlink target
    pub link: Option<String>,
}

impl TextStyle {
    /// Bold style.
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Default::default()
        }
    }

    /// Italic style.
    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Default::default()
        }
    }

    /// Check if any styling is applied.
    pub fn has_styling(&self) -> bool {
        self.bold
            || self.italic
            || self.underline
            || self.strikethrough
            || self.superscript
            || self.subscript
            || self.color.is_some()
            || self.link.is_some()
    }
}

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse a six-digit hex value such as `"FF0000"`. `"auto"` yields `None`.
    pub fn from_hex(val: &str) -> Option<Self> {
        if val.eq_ignore_ascii_case("auto") || val.len() != 6 || !val.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&val[0..2], 16).ok()?;
        let g = u8::from_str_radix(&val[2..4], 16).ok()?;
        let b = u8::from_str_radix(&val[4..6], 16).ok()?;
        Some(Rgb(r, g, b))
    }

    /// Uppercase hex without a leading `#`.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left alignment (default)
    #[default]
    Left,
    /// Center alignment
    Center,
    /// Right alignment
    Right,
    /// Justified alignment
    Justify,
}

impl Alignment {
    /// Map a `w:jc` value.
    pub fn from_jc(val: &str) -> Self {
        match val {
            "center" => Alignment::Center,
            "right" | "end" => Alignment::Right,
            "both" | "distribute" | "justify" => Alignment::Justify,
            _ => Alignment::Left,
        }
    }

    /// The storymap `textAlignment` value.
    pub fn storymap_value(self) -> &'static str {
        match self {
            Alignment::Left => "start",
            Alignment::Center => "center",
            Alignment::Right => "end",
            Alignment::Justify => "justify",
        }
    }
}

/// Paragraph style classification.
///
/// Style names are matched case-insensitively against a fixed set; anything
/// else falls back to [`StyleKind::Normal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleKind {
    /// Body text
    #[default]
    Normal,
    /// Heading 1
    Heading1,
    /// Heading 2
    Heading2,
    /// Heading 3
    Heading3,
    /// Block quote
    Quote,
    /// Code
    Code,
    /// Numbered or bulleted list item
    ListItem,
    /// Image caption
    Caption,
    /// Horizontal rule; never produced from a style name
    Separator,
}

impl StyleKind {
    /// Classify a style name or id.
    ///
    /// Returns `None` for styles outside the recognized set. `Normal` and
    /// `List Paragraph` are recognized as [`StyleKind::Normal`]; list items are
    /// decided by numbering, not by style.
    pub fn from_style_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "heading1" => Some(StyleKind::Heading1),
            "heading2" => Some(StyleKind::Heading2),
            "heading3" => Some(StyleKind::Heading3),
            "quote" => Some(StyleKind::Quote),
            "code" => Some(StyleKind::Code),
            "caption" => Some(StyleKind::Caption),
            "normal" | "listparagraph" | "" => Some(StyleKind::Normal),
            _ => None,
        }
    }

    /// Heading level (1-3) or None.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            StyleKind::Heading1 => Some(1),
            StyleKind::Heading2 => Some(2),
            StyleKind::Heading3 => Some(3),
            _ => None,
        }
    }

    /// Whether list numbering may turn a paragraph of this kind into a list item.
    pub fn yields_to_numbering(self) -> bool {
        matches!(self, StyleKind::Normal)
    }
}

/// Authored list position of a list-item paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMarker {
    /// Authored nesting depth (0 = top level)
    pub depth: u8,
    /// Authored list type
    pub list_type: ListType,
}

/// Languages understood by storymap code blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    /// Plain text
    #[default]
    Txt,
    /// SQL
    Sql,
    /// ArcGIS Arcade
    Arcade,
    /// JSON
    Json,
    /// Python
    Py,
    /// C#
    Cs,
    /// JavaScript
    Js,
    /// TypeScript
    Ts,
    /// JavaScript with JSX
    Jsx,
    /// TypeScript with JSX
    Tsx,
    /// CSS
    Css,
    /// HTML
    Html,
}

impl CodeLanguage {
    /// The storymap `lang` value.
    pub fn as_str(self) -> &'static str {
        match self {
            CodeLanguage::Txt => "txt",
            CodeLanguage::Sql => "sql",
            CodeLanguage::Arcade => "arcade",
            CodeLanguage::Json => "json",
            CodeLanguage::Py => "py",
            CodeLanguage::Cs => "cs",
            CodeLanguage::Js => "js",
            CodeLanguage::Ts => "ts",
            CodeLanguage::Jsx => "jsx",
            CodeLanguage::Tsx => "tsx",
            CodeLanguage::Css => "css",
            CodeLanguage::Html => "html",
        }
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
