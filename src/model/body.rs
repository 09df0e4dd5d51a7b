//! Source-level body elements produced by the document reader.

use super::{Alignment, FloatAlignment, ImageLayout, ListType, TextStyle};
use serde::{Deserialize, Serialize};

/// A top-level element of the document body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyElement {
    /// A paragraph
    Paragraph(SourceParagraph),
    /// A table; recognised but not converted
    Table(TableSummary),
    /// A horizontal rule
    Separator,
}

/// Shape of a table that was skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    /// Number of rows
    pub rows: usize,
    /// Number of cells in the widest row
    pub columns: usize,
}

/// A paragraph as authored, before style classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceParagraph {
    /// Style id from `w:pStyle`
    pub style_id: Option<String>,

    /// Human-readable style name resolved through the style sheet
    pub style_name: Option<String>,

    /// Paragraph alignment from `w:jc`
    pub alignment: Alignment,

    /// List numbering, if the paragraph is numbered
    pub numbering: Option<Numbering>,

    /// Inline runs in document order
    pub runs: Vec<TextRun>,

    /// Image anchors in document order
    pub anchors: Vec<ImageAnchor>,
}

impl SourceParagraph {
    /// Create a paragraph from runs with no style.
    pub fn with_runs(runs: Vec<TextRun>) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    /// Set the style name (and id).
    pub fn with_style(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.style_id = Some(name.replace(' ', ""));
        self.style_name = Some(name);
        self
    }

    /// Set the list numbering.
    pub fn with_numbering(mut self, level: u8, list_type: ListType) -> Self {
        self.numbering = Some(Numbering {
            num_id: "1".to_string(),
            level,
            list_type,
        });
        self
    }

    /// Add an image anchor.
    pub fn with_anchor(mut self, anchor: ImageAnchor) -> Self {
        self.anchors.push(anchor);
        self
    }

    /// The name used for style matching: the resolved name, else the id.
    pub fn style_label(&self) -> Option<&str> {
        self.style_name.as_deref().or(self.style_id.as_deref())
    }

    /// Concatenated run text.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Check whether the paragraph holds images but no text.
    pub fn is_image_only(&self) -> bool {
        !self.anchors.is_empty() && self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

/// List numbering attached to a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbering {
    /// Numbering instance id (`w:numId`)
    pub num_id: String,
    /// Authored level (`w:ilvl`)
    pub level: u8,
    /// Type of the level's numbering format
    pub list_type: ListType,
}

/// A run of text with direct formatting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Direct formatting
    pub style: TextStyle,
}

impl TextRun {
    /// Create a new text run with default style.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
        }
    }

    /// Create a text run with the given style.
    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Check if this run is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// An image anchored in a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAnchor {
    /// Relationship id of the image payload (`a:blip/@r:embed`)
    pub rel_id: Option<String>,

    /// Inline or floating
    pub layout: ImageLayout,

    /// Horizontal side for floating images
    pub float_alignment: FloatAlignment,

    /// Alternative text (`wp:docPr/@descr`)
    pub description: Option<String>,

    /// Drawing name (`wp:docPr/@name`)
    pub name: Option<String>,

    /// Caption written in a text box inside the drawing
    #[serde(default)]
    pub caption: Option<String>,
}

impl ImageAnchor {
    /// Create an inline anchor for a relationship.
    pub fn inline(rel_id: impl Into<String>) -> Self {
        Self {
            rel_id: Some(rel_id.into()),
            layout: ImageLayout::Inline,
            float_alignment: FloatAlignment::default(),
            description: None,
            name: None,
            caption: None,
        }
    }

    /// Create a floating anchor for a relationship.
    pub fn floating(rel_id: impl Into<String>, float_alignment: FloatAlignment) -> Self {
        Self {
            layout: ImageLayout::Floating,
            float_alignment,
            ..Self::inline(rel_id)
        }
    }

    /// Set the alternative text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the text-box caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// A label for diagnostics: relationship id, else drawing name.
    pub fn reference(&self) -> String {
        self.rel_id
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "<unnamed drawing>".to_string())
    }
}
