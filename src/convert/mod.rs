//! Conversion pipeline from a parsed document to placeholder-carrying
//! content blocks.
//!
//! Stages run in order over one document: run extraction, list
//! normalization, image resolution (which uploads payloads), and block
//! building.
//!
//! # Example
//!
//! ```no_run
//! use docx_storymap::convert::{ConvertOptions, Converter};
//! use docx_storymap::publish::MemoryPortal;
//!
//! fn main() -> docx_storymap::Result<()> {
//!     let doc = docx_storymap::parse_file("field-notes.docx")?;
//!     let mut portal = MemoryPortal::new();
//!
//!     let conversion = Converter::new(ConvertOptions::default()).convert(&doc, &mut portal)?;
//!     println!("{} blocks, {} placeholders", conversion.blocks.len(), conversion.tokens.len());
//!     Ok(())
//! }
//! ```

mod blocks;
mod extract;
mod images;
mod language;
mod lists;
mod stats;

pub use blocks::{BlockBuilder, BLANK_TEXT};
pub use extract::{Extraction, RunExtractor};
pub use images::ImageResolver;
pub use language::detect_language;
pub use lists::{coerce_entries, normalize_lists, CoercedEntry};
pub use stats::ConversionStats;

use crate::error::{Result, Warning};
use crate::model::{ContentBlock, Document, StyleKind, TokenTable};
use crate::publish::AssetUploader;
use log::{debug, info};

/// Options for document conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Merge adjacent runs with identical formatting
    pub merge_runs: bool,

    /// Merge consecutive code paragraphs into one code block
    pub merge_code_paragraphs: bool,

    /// Detect the language of code paragraphs
    pub detect_code_language: bool,
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable run merging.
    pub fn with_run_merge(mut self, merge: bool) -> Self {
        self.merge_runs = merge;
        self
    }

    /// Enable or disable code paragraph merging.
    pub fn with_code_merge(mut self, merge: bool) -> Self {
        self.merge_code_paragraphs = merge;
        self
    }

    /// Enable or disable code language detection.
    pub fn with_language_detection(mut self, detect: bool) -> Self {
        self.detect_code_language = detect;
        self
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            merge_runs: true,
            merge_code_paragraphs: true,
            detect_code_language: true,
        }
    }
}

/// Result of converting one document.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Content blocks in document order
    pub blocks: Vec<ContentBlock>,

    /// Real text for every placeholder in `blocks`
    pub tokens: TokenTable,

    /// Non-fatal conditions raised along the way
    pub warnings: Vec<Warning>,

    /// Conversion statistics
    pub stats: ConversionStats,
}

/// Runs the conversion stages.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    /// Create a converter.
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert a document, uploading its images through `uploader`.
    pub fn convert(&self, doc: &Document, uploader: &mut dyn AssetUploader) -> Result<Conversion> {
        let mut stats = ConversionStats::new();

        let extraction = RunExtractor::new()
            .with_merge(self.options.merge_runs)
            .with_language_detection(self.options.detect_code_language)
            .extract(doc);
        let mut warnings = extraction.warnings;
        stats.paragraph_count = extraction
            .paragraphs
            .iter()
            .filter(|p| p.style_kind != StyleKind::Separator)
            .count() as u32;
        stats.table_count = extraction.tables_skipped as u32;
        if extraction.tables_skipped > 0 {
            debug!("Dropped {} tables", extraction.tables_skipped);
        }

        let elements = normalize_lists(extraction.paragraphs);

        let before = warnings.len();
        let elements = ImageResolver::new(doc, uploader).resolve(elements, &mut warnings)?;
        stats.skipped_image_count = warnings[before..]
            .iter()
            .filter(|w| matches!(w, Warning::AssetResolution { .. }))
            .count() as u32;

        let mut tokens = TokenTable::new();
        let blocks = BlockBuilder::new()
            .with_code_merge(self.options.merge_code_paragraphs)
            .build(&elements, &mut tokens, &mut stats);

        info!(
            "Converted {} paragraphs into {} blocks ({} images, {} warnings)",
            stats.paragraph_count,
            blocks.len(),
            stats.image_count,
            warnings.len()
        );

        Ok(Conversion {
            blocks,
            tokens,
            warnings,
            stats,
        })
    }
}
