//! Normalized list blocks.

use super::StyledSpan;
use serde::{Deserialize, Serialize};

/// Deepest nesting level storymap lists support (0-based).
pub const MAX_LIST_DEPTH: u8 = 1;

/// Marker prepended once per simulated level beyond [`MAX_LIST_DEPTH`].
pub const DEPTH_MARKER: &str = "---";

/// Ordered or unordered list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    /// Bulleted list
    #[default]
    Unordered,
    /// Numbered list
    Ordered,
}

impl ListType {
    /// Map a `w:numFmt` value.
    pub fn from_num_fmt(fmt: &str) -> Self {
        match fmt {
            "bullet" | "none" | "" => ListType::Unordered,
            _ => ListType::Ordered,
        }
    }

    /// The storymap text node type.
    pub fn storymap_type(self) -> &'static str {
        match self {
            ListType::Unordered => "bullet-list",
            ListType::Ordered => "numbered-list",
        }
    }

    /// The HTML container tag.
    pub fn tag(self) -> &'static str {
        match self {
            ListType::Unordered => "ul",
            ListType::Ordered => "ol",
        }
    }
}

/// A contiguous run of list items sharing one list type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBlock {
    /// Type of the whole block, fixed by its first item
    pub list_type: ListType,

    /// Items in document order
    pub items: Vec<ListItem>,
}

impl ListBlock {
    /// Create an empty block.
    pub fn new(list_type: ListType) -> Self {
        Self {
            list_type,
            items: Vec::new(),
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the block has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items whose authored type differed from the block type.
    pub fn coerced_count(&self) -> usize {
        self.items.iter().filter(|i| i.coerced).count()
    }

    /// Number of items that were remapped from a deeper level.
    pub fn flattened_count(&self) -> usize {
        self.items.iter().filter(|i| !i.prefix.is_empty()).count()
    }
}

/// One list entry after depth normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// Rendered depth: 0 or 1
    pub depth: u8,

    /// Depth after the no-skipped-levels clamp, before remapping
    pub nesting_depth: u8,

    /// Simulated-depth prefix (empty for depths 0 and 1)
    pub prefix: String,

    /// Whether the authored list type was overridden
    pub coerced: bool,

    /// Item content
    pub spans: Vec<StyledSpan>,

    /// Index of the source paragraph in the document body
    pub source_index: usize,
}

impl ListItem {
    /// Plain text including the prefix.
    pub fn plain_text(&self) -> String {
        let text: String = self.spans.iter().map(|s| s.text.as_str()).collect();
        if self.prefix.is_empty() {
            text
        } else {
            format!("{} {}", self.prefix, text)
        }
    }
}
