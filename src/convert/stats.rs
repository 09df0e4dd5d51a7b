//! Statistics collected while converting a document.

use serde::{Deserialize, Serialize};

/// Counters for one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Paragraphs extracted from the source
    pub paragraph_count: u32,

    /// Text blocks built (paragraphs, headings, quotes, code)
    pub text_block_count: u32,

    /// Heading blocks built
    pub heading_count: u32,

    /// Quote blocks built
    pub quote_count: u32,

    /// Code blocks built
    pub code_block_count: u32,

    /// Blank paragraphs kept as spacer blocks
    pub blank_count: u32,

    /// List blocks built
    pub list_count: u32,

    /// List items across all lists
    pub list_item_count: u32,

    /// List items whose authored type was overridden
    pub coerced_item_count: u32,

    /// List items remapped from a deeper level
    pub flattened_item_count: u32,

    /// Images uploaded and placed
    pub image_count: u32,

    /// Captions bound to images
    pub caption_count: u32,

    /// Images omitted because their payload was unavailable
    pub skipped_image_count: u32,

    /// Horizontal rules kept as separator blocks
    pub separator_count: u32,

    /// Tables dropped
    pub table_count: u32,

    /// Placeholder tokens issued
    pub placeholder_count: u32,
}

impl ConversionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment paragraph count.
    pub fn add_paragraph(&mut self) {
        self.paragraph_count += 1;
    }

    /// Increment image count.
    pub fn add_image(&mut self) {
        self.image_count += 1;
    }

    /// Record a list block and its items.
    pub fn add_list(&mut self, items: usize, coerced: usize, flattened: usize) {
        self.list_count += 1;
        self.list_item_count += items as u32;
        self.coerced_item_count += coerced as u32;
        self.flattened_item_count += flattened as u32;
    }

    /// Total number of content blocks built.
    pub fn block_count(&self) -> u32 {
        self.text_block_count + self.list_count + self.image_count + self.separator_count
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &ConversionStats) {
        self.paragraph_count += other.paragraph_count;
        self.text_block_count += other.text_block_count;
        self.heading_count += other.heading_count;
        self.quote_count += other.quote_count;
        self.code_block_count += other.code_block_count;
        self.blank_count += other.blank_count;
        self.list_count += other.list_count;
        self.list_item_count += other.list_item_count;
        self.coerced_item_count += other.coerced_item_count;
        self.flattened_item_count += other.flattened_item_count;
        self.image_count += other.image_count;
        self.caption_count += other.caption_count;
        self.skipped_image_count += other.skipped_image_count;
        self.separator_count += other.separator_count;
        self.table_count += other.table_count;
        self.placeholder_count += other.placeholder_count;
    }
}
