//! Document-level types.

use super::{BodyElement, Resource, SourceParagraph};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed DOCX document, as handed over by the document reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, creator, etc.)
    pub metadata: Metadata,

    /// Body elements in document order
    pub body: Vec<BodyElement>,

    /// Image payloads keyed by relationship id
    pub resources: HashMap<String, Resource>,

    /// Relationship ids whose payload could not be loaded, with the reason
    pub unresolved: HashMap<String, String>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            metadata: Metadata::default(),
            body: Vec::new(),
            resources: HashMap::new(),
            unresolved: HashMap::new(),
        }
    }

    /// Add a body element.
    pub fn push(&mut self, element: BodyElement) {
        self.body.push(element);
    }

    /// Add a resource to the document.
    pub fn add_resource(&mut self, id: impl Into<String>, resource: Resource) {
        self.resources.insert(id.into(), resource);
    }

    /// Get a resource by relationship id.
    pub fn get_resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Iterate over the paragraphs of the body in document order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &SourceParagraph> {
        self.body.iter().filter_map(|element| match element {
            BodyElement::Paragraph(p) => Some(p),
            BodyElement::Table(_) | BodyElement::Separator => None,
        })
    }

    /// Number of paragraphs in the body.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    /// Number of image anchors in the body.
    pub fn anchor_count(&self) -> usize {
        self.paragraphs().map(|p| p.anchors.len()).sum()
    }

    /// Check if the document has no body content.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.paragraphs()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Document metadata from the core properties part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Document author
    pub creator: Option<String>,

    /// Description / abstract
    pub description: Option<String>,

    /// Keywords, as authored
    pub keywords: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Split the keywords field into tags.
    pub fn tags(&self) -> Vec<String> {
        self.keywords
            .as_deref()
            .map(|k| {
                k.split([',', ';'])
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}
