//! Block building: every text-bearing unit becomes a placeholder-carrying
//! content block, with its real markup stored in the token table.

use super::language::detect_language;
use super::stats::ConversionStats;
use crate::model::{
    Alignment, CodeLanguage, ContentBlock, Element, ImageDisplay, ImageItem, ListBlock,
    Paragraph, StyleKind, TextKind, TokenKind, TokenTable,
};
use crate::render::{escape_text, render_list, render_spans};
use log::{debug, trace};

/// Real text stored for a blank paragraph.
pub const BLANK_TEXT: &str = " ";

/// Builds content blocks from the resolved element stream.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    merge_code: bool,
}

impl BlockBuilder {
    /// Create a builder that merges consecutive code paragraphs.
    pub fn new() -> Self {
        Self { merge_code: true }
    }

    /// Enable or disable merging of consecutive code paragraphs.
    pub fn with_code_merge(mut self, merge: bool) -> Self {
        self.merge_code = merge;
        self
    }

    /// Build blocks in stream order, issuing tokens into `tokens`.
    pub fn build(
        &self,
        elements: &[Element],
        tokens: &mut TokenTable,
        stats: &mut ConversionStats,
    ) -> Vec<ContentBlock> {
        let mut blocks = Vec::with_capacity(elements.len());
        let mut i = 0;

        while i < elements.len() {
            match &elements[i] {
                Element::Paragraph(p) if p.style_kind == StyleKind::Code => {
                    let mut end = i + 1;
                    if self.merge_code {
                        while matches!(
                            elements.get(end),
                            Some(Element::Paragraph(next)) if next.style_kind == StyleKind::Code
                        ) {
                            end += 1;
                        }
                    }
                    let run: Vec<&Paragraph> = elements[i..end]
                        .iter()
                        .filter_map(|e| match e {
                            Element::Paragraph(p) => Some(p),
                            _ => None,
                        })
                        .collect();
                    blocks.push(code_block(&run, tokens, stats));
                    i = end;
                    continue;
                }
                Element::Paragraph(p) if p.style_kind == StyleKind::Separator => {
                    stats.separator_count += 1;
                    blocks.push(ContentBlock::Separator);
                }
                Element::Paragraph(p) => blocks.push(text_block(p, tokens, stats)),
                Element::List(block) => blocks.push(list_block(block, tokens, stats)),
                Element::Image(image) => blocks.push(image_block(image, tokens, stats)),
            }
            i += 1;
        }

        stats.placeholder_count = tokens.len() as u32;
        debug!(
            "Built {} blocks with {} placeholders",
            blocks.len(),
            tokens.len()
        );
        blocks
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn text_block(p: &Paragraph, tokens: &mut TokenTable, stats: &mut ConversionStats) -> ContentBlock {
    let kind = match p.style_kind.heading_level() {
        Some(level) => {
            stats.heading_count += 1;
            TextKind::Heading { level }
        }
        None if p.style_kind == StyleKind::Quote => {
            stats.quote_count += 1;
            TextKind::Quote
        }
        None => TextKind::Paragraph,
    };

    let markup = if p.is_blank() {
        stats.blank_count += 1;
        BLANK_TEXT.to_string()
    } else {
        render_spans(&p.spans)
    };

    stats.text_block_count += 1;
    let text = tokens.issue(TokenKind::Text, markup);
    trace!("{:?} block -> {}", kind, text);
    ContentBlock::Text {
        kind,
        alignment: p.alignment,
        text,
    }
}

fn code_block(
    run: &[&Paragraph],
    tokens: &mut TokenTable,
    stats: &mut ConversionStats,
) -> ContentBlock {
    let content = run
        .iter()
        .map(|p| p.plain_text())
        .collect::<Vec<_>>()
        .join("\n");

    let hinted = run.first().and_then(|p| p.language).unwrap_or_default();
    let language = match detect_language(&content) {
        CodeLanguage::Txt => hinted,
        detected => detected,
    };

    stats.text_block_count += 1;
    stats.code_block_count += 1;
    let text = tokens.issue(TokenKind::Code, content);
    trace!("Code block ({}, {} lines) -> {}", language, run.len(), text);
    ContentBlock::Text {
        kind: TextKind::Code { language },
        alignment: Alignment::Left,
        text,
    }
}

fn list_block(
    block: &ListBlock,
    tokens: &mut TokenTable,
    stats: &mut ConversionStats,
) -> ContentBlock {
    stats.add_list(block.len(), block.coerced_count(), block.flattened_count());
    let max_depth = block.items.iter().map(|i| i.depth).max().unwrap_or(0);
    let text = tokens.issue(TokenKind::List, render_list(block));
    ContentBlock::List {
        list_type: block.list_type,
        item_count: block.len(),
        max_depth,
        text,
    }
}

fn image_block(
    image: &ImageItem,
    tokens: &mut TokenTable,
    stats: &mut ConversionStats,
) -> ContentBlock {
    stats.add_image();
    let display = image.display();
    let caption = image.caption.as_deref().filter(|c| !c.is_empty()).map(|c| {
        stats.caption_count += 1;
        tokens.issue(TokenKind::Caption, escape_text(c))
    });
    let alt = image
        .alt_text
        .as_deref()
        .map(|a| tokens.issue(TokenKind::Alt, a));

    ContentBlock::Image {
        asset: image.asset.clone(),
        display,
        float_alignment: (display == ImageDisplay::Float).then_some(image.float_alignment),
        caption,
        alt,
        width: image.resource.width,
        height: image.resource.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AssetRef, FloatAlignment, ImageLayout, ListItem, ListType, Resource, StyledSpan,
        TextStyle,
    };

    fn build(elements: &[Element]) -> (Vec<ContentBlock>, TokenTable, ConversionStats) {
        let mut tokens = TokenTable::new();
        let mut stats = ConversionStats::new();
        let blocks = BlockBuilder::new().build(elements, &mut tokens, &mut stats);
        (blocks, tokens, stats)
    }

    fn text_of<'t>(block: &ContentBlock, tokens: &'t TokenTable) -> &'t str {
        match block {
            ContentBlock::Text { text, .. } | ContentBlock::List { text, .. } => {
                tokens.get(text.as_str()).unwrap()
            }
            other => panic!("no text on {:?}", other),
        }
    }

    #[test]
    fn test_heading_text_and_list() {
        let mut list = ListBlock::new(ListType::Unordered);
        for text in ["A", "B", "C"] {
            list.items.push(ListItem {
                depth: 0,
                nesting_depth: 0,
                prefix: String::new(),
                coerced: false,
                spans: vec![StyledSpan::new(text)],
                source_index: 0,
            });
        }
        let elements = vec![
            Element::Paragraph(Paragraph::with_text(StyleKind::Heading1, "Intro")),
            Element::Paragraph(Paragraph::with_text(StyleKind::Normal, "Hello, 世界")),
            Element::List(list),
        ];
        let (blocks, tokens, stats) = build(&elements);

        assert_eq!(blocks.len(), 3);
        assert!(matches!(
            &blocks[0],
            ContentBlock::Text { kind: TextKind::Heading { level: 1 }, .. }
        ));
        assert_eq!(text_of(&blocks[1], &tokens), "Hello, 世界");
        assert_eq!(text_of(&blocks[2], &tokens), "<li>A</li><li>B</li><li>C</li>");
        assert_eq!(tokens.len(), 3);
        assert_eq!(stats.heading_count, 1);
        assert_eq!(stats.list_item_count, 3);
        assert_eq!(stats.placeholder_count, 3);
        assert!(tokens.iter().all(|(t, _)| t.as_str().is_ascii()));
    }

    #[test]
    fn test_blank_paragraph_becomes_space() {
        let (blocks, tokens, stats) =
            build(&[Element::Paragraph(Paragraph::new(StyleKind::Normal))]);
        assert_eq!(text_of(&blocks[0], &tokens), " ");
        assert_eq!(stats.blank_count, 1);
    }

    #[test]
    fn test_separator_splits_code_and_carries_no_token() {
        let elements = vec![
            Element::Paragraph(Paragraph::with_text(StyleKind::Code, "a = 1")),
            Element::Paragraph(Paragraph::new(StyleKind::Separator)),
            Element::Paragraph(Paragraph::with_text(StyleKind::Code, "b = 2")),
        ];
        let (blocks, tokens, stats) = build(&elements);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1], ContentBlock::Separator);
        assert!(blocks[1].tokens().is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(stats.separator_count, 1);
        assert_eq!(stats.block_count(), 3);
    }

    #[test]
    fn test_consecutive_code_paragraphs_merge() {
        let mut first = Paragraph::with_text(StyleKind::Code, "SELECT name");
        first.language = Some(CodeLanguage::Txt);
        let elements = vec![
            Element::Paragraph(first),
            Element::Paragraph(Paragraph::with_text(StyleKind::Code, "FROM parcels")),
            Element::Paragraph(Paragraph::with_text(StyleKind::Normal, "after")),
        ];
        let (blocks, tokens, stats) = build(&elements);

        assert_eq!(blocks.len(), 2);
        assert!(matches!(
            &blocks[0],
            ContentBlock::Text { kind: TextKind::Code { language: CodeLanguage::Sql }, .. }
        ));
        assert_eq!(text_of(&blocks[0], &tokens), "SELECT name\nFROM parcels");
        assert_eq!(stats.code_block_count, 1);

        let mut tokens = TokenTable::new();
        let unmerged = BlockBuilder::new().with_code_merge(false).build(
            &elements,
            &mut tokens,
            &mut ConversionStats::new(),
        );
        assert_eq!(unmerged.len(), 3);
    }

    #[test]
    fn test_markup_is_stored_not_carried() {
        let mut p = Paragraph::new(StyleKind::Quote);
        p.spans = vec![
            StyledSpan::new("Fish & "),
            StyledSpan::styled("chips", TextStyle::bold()),
        ];
        p.alignment = Alignment::Center;
        let (blocks, tokens, _) = build(&[Element::Paragraph(p)]);

        match &blocks[0] {
            ContentBlock::Text {
                kind, alignment, text,
            } => {
                assert_eq!(*kind, TextKind::Quote);
                assert_eq!(*alignment, Alignment::Center);
                assert!(text.as_str().starts_with("PLACEHOLDER_TEXT_"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            text_of(&blocks[0], &tokens),
            "Fish &amp; <strong>chips</strong>"
        );
    }

    #[test]
    fn test_image_block_tokens() {
        let image = ImageItem {
            resource: Resource::png(vec![]).with_dimensions(400, 300),
            asset: AssetRef::ItemResource {
                resource_id: "image1.png".to_string(),
            },
            layout: ImageLayout::Floating,
            float_alignment: FloatAlignment::End,
            caption: Some("Figure A".to_string()),
            alt_text: Some("A river delta".to_string()),
            reference: "rId5".to_string(),
        };
        let (blocks, tokens, stats) = build(&[Element::Image(image)]);

        match &blocks[0] {
            ContentBlock::Image {
                display,
                float_alignment,
                caption,
                alt,
                ..
            } => {
                assert_eq!(*display, ImageDisplay::Float);
                assert_eq!(*float_alignment, Some(FloatAlignment::End));
                let caption = caption.as_ref().unwrap();
                assert_eq!(tokens.get(caption.as_str()), Some("Figure A"));
                assert!(alt.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(stats.caption_count, 1);
        assert_eq!(stats.image_count, 1);
    }
}
