//! Run-model extraction: source paragraphs to styled spans and style tags.

use super::language::detect_language;
use crate::error::Warning;
use crate::model::{
    BodyElement, Document, ListMarker, Paragraph, SourceParagraph, StyleKind, StyledSpan,
};
use log::{debug, warn};
use std::collections::HashSet;

/// Output of the extractor.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Paragraphs in document order
    pub paragraphs: Vec<Paragraph>,

    /// Unsupported-style warnings, one per distinct style
    pub warnings: Vec<Warning>,

    /// Number of tables skipped
    pub tables_skipped: usize,
}

/// Walks paragraphs and runs of a parsed document.
#[derive(Debug, Clone)]
pub struct RunExtractor {
    merge_runs: bool,
    detect_language: bool,
}

impl RunExtractor {
    /// Create an extractor with run merging and language detection enabled.
    pub fn new() -> Self {
        Self {
            merge_runs: true,
            detect_language: true,
        }
    }

    /// Enable or disable merging of adjacent identical runs.
    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge_runs = merge;
        self
    }

    /// Enable or disable language detection on code paragraphs.
    pub fn with_language_detection(mut self, detect: bool) -> Self {
        self.detect_language = detect;
        self
    }

    /// Extract every paragraph of the document.
    pub fn extract(&self, doc: &Document) -> Extraction {
        let mut extraction = Extraction::default();
        let mut reported = HashSet::new();

        for (index, element) in doc.body.iter().enumerate() {
            match element {
                BodyElement::Paragraph(source) => {
                    let paragraph =
                        self.extract_paragraph(index, source, &mut reported, &mut extraction);
                    extraction.paragraphs.push(paragraph);
                }
                BodyElement::Table(_) => extraction.tables_skipped += 1,
                BodyElement::Separator => {
                    let mut separator = Paragraph::new(StyleKind::Separator);
                    separator.source_index = index;
                    extraction.paragraphs.push(separator);
                }
            }
        }

        debug!(
            "Extracted {} paragraphs ({} unsupported styles, {} tables skipped)",
            extraction.paragraphs.len(),
            extraction.warnings.len(),
            extraction.tables_skipped
        );
        extraction
    }

    fn extract_paragraph(
        &self,
        index: usize,
        source: &SourceParagraph,
        reported: &mut HashSet<String>,
        extraction: &mut Extraction,
    ) -> Paragraph {
        let mut style_kind = match source.style_label() {
            None => StyleKind::Normal,
            Some(label) => StyleKind::from_style_name(label).unwrap_or_else(|| {
                if reported.insert(label.to_string()) {
                    let warning = Warning::UnsupportedStyle {
                        style: label.to_string(),
                    };
                    warn!("{}", warning);
                    extraction.warnings.push(warning);
                }
                StyleKind::Normal
            }),
        };

        let mut list = None;
        if let Some(numbering) = &source.numbering {
            if style_kind.yields_to_numbering() {
                style_kind = StyleKind::ListItem;
                list = Some(ListMarker {
                    depth: numbering.level,
                    list_type: numbering.list_type,
                });
            }
        }

        let spans = self.spans(source);
        let language = if style_kind == StyleKind::Code && self.detect_language {
            let text: String = spans.iter().map(|s| s.text.as_str()).collect();
            Some(detect_language(&text))
        } else {
            None
        };

        Paragraph {
            spans,
            style_kind,
            alignment: source.alignment,
            language,
            list,
            source_index: index,
        }
    }

    fn spans(&self, source: &SourceParagraph) -> Vec<StyledSpan> {
        let mut spans: Vec<StyledSpan> = Vec::with_capacity(source.runs.len());
        for run in source.runs.iter().filter(|r| !r.is_empty()) {
            let span = StyledSpan {
                text: run.text.clone(),
                style: run.style.clone(),
                alignment: source.alignment,
            };
            match spans.last_mut() {
                Some(last) if self.merge_runs && last.same_attributes(&span) => {
                    last.text.push_str(&span.text);
                }
                _ => spans.push(span),
            }
        }
        spans
    }
}

impl Default for RunExtractor {
    fn default() -> Self {
        Self::new()
    }
}
