//! HTML reader built on scraper.
//!
//! Produces the same source tree as the DOCX reader: headings, quotes, code
//! and captions become paragraph style names, list items become numbered
//! paragraphs, and `<img>` elements become anchors whose payloads are read
//! from disk relative to the page.

use super::options::ParseOptions;
use crate::error::Result;
use crate::model::{
    Alignment, BodyElement, Document, FloatAlignment, ImageAnchor, ListType, Metadata, Numbering,
    Resource, Rgb, SourceParagraph, TableSummary, TextRun, TextStyle,
};
use encoding_rs::{UTF_8, WINDOWS_1252};
use log::{debug, trace};
use scraper::{ElementRef, Html, Node};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Elements whose content is never rendered.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Elements that only group other blocks.
const CONTAINERS: &[&str] = &[
    "body", "div", "section", "article", "main", "header", "footer", "aside", "nav", "center",
    "form", "figure",
];

/// HTML reader producing the source [`Document`] tree.
pub struct HtmlParser {
    source: String,
    base_dir: Option<PathBuf>,
    options: ParseOptions,
}

impl HtmlParser {
    /// Open an HTML file; images resolve relative to its directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open an HTML file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        Ok(Self {
            source: decode_text(&data),
            base_dir: path.parent().map(Path::to_path_buf),
            options,
        })
    }

    /// Create a parser from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Create a parser from raw bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Self {
        Self {
            source: decode_text(data),
            base_dir: None,
            options,
        }
    }

    /// Create a parser from markup.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            source: html.into(),
            base_dir: None,
            options: ParseOptions::default(),
        }
    }

    /// Resolve relative image paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Parse the page into a document tree.
    pub fn parse(&self) -> Result<Document> {
        let html = Html::parse_document(&self.source);
        let root = html.root_element();

        let mut reader = PageReader {
            parser: self,
            doc: Document::new(),
            image_ids: HashMap::new(),
            list_seq: 0,
        };
        if let Some(head) = child_element(root, "head") {
            reader.doc.metadata = parse_head(head);
        }
        let body = child_element(root, "body").unwrap_or(root);
        reader.collect_blocks(body, None);

        let doc = reader.doc;
        debug!(
            "Parsed HTML: {} body elements, {} anchors, {} images loaded, {} unresolved",
            doc.body.len(),
            doc.anchor_count(),
            doc.resources.len(),
            doc.unresolved.len()
        );
        Ok(doc)
    }

    fn load_image(&self, src: &str) -> std::result::Result<Resource, String> {
        if !self.options.extract_resources {
            return Err("image extraction is disabled".to_string());
        }
        if src.starts_with("data:") {
            return Err("inline data URIs are not supported".to_string());
        }
        if src.contains("://") || src.starts_with("//") {
            return Err(format!("linked image {} is not embedded", src));
        }
        let relative = src.split(['?', '#']).next().unwrap_or(src);
        let path = match &self.base_dir {
            Some(dir) => dir.join(relative),
            None => return Err(format!("no base directory to resolve {}", relative)),
        };

        let size = fs::metadata(&path)
            .map_err(|e| format!("{}: {}", path.display(), e))?
            .len();
        if self.options.resource_limit_bytes().is_some_and(|max| size > max) {
            return Err(format!("{} exceeds the memory limit", relative));
        }
        let data = fs::read(&path).map_err(|e| format!("{}: {}", path.display(), e))?;

        let mut resource = Resource::from_bytes(data);
        if !resource.is_image() {
            return Err(format!("{} is not a supported image format", relative));
        }
        if let Some(name) = path.file_name() {
            resource = resource.with_filename(name.to_string_lossy());
        }
        Ok(resource)
    }
}

/// Walk state for one page.
struct PageReader<'p> {
    parser: &'p HtmlParser,
    doc: Document,
    image_ids: HashMap<String, String>,
    list_seq: u32,
}

impl PageReader<'_> {
    /// Collect the block-level children of `container`. Loose inline content
    /// between blocks forms its own paragraph, styled as `style`.
    fn collect_blocks(&mut self, container: ElementRef, style: Option<&str>) {
        let mut pending = SourceParagraph::default();

        for node in container.children() {
            let Some(el) = ElementRef::wrap(node) else {
                if let Node::Text(text) = node.value() {
                    push_text(text, &TextStyle::default(), &mut pending);
                }
                continue;
            };
            let name = el.value().name();
            if SKIPPED.contains(&name) {
                continue;
            }
            if !is_block(name) {
                self.collect_inline(el, &TextStyle::default(), &mut pending);
                continue;
            }

            self.flush(&mut pending, style);
            match name {
                "h1" | "h2" => self.push_paragraph(el, Some("Heading 1")),
                "h3" => self.push_paragraph(el, Some("Heading 2")),
                "h4" | "h5" | "h6" => self.push_paragraph(el, Some("Heading 3")),
                "p" => self.push_paragraph(el, style),
                "figcaption" => self.push_paragraph(el, Some("Caption")),
                "blockquote" => self.collect_blocks(el, Some("Quote")),
                "pre" => self.push_code(el),
                "ul" | "ol" => {
                    self.list_seq += 1;
                    let num_id = format!("html-{}", self.list_seq);
                    self.collect_list(el, &num_id, 0);
                }
                "hr" => self.doc.push(BodyElement::Separator),
                "table" => self.doc.push(BodyElement::Table(table_summary(el))),
                "img" => {
                    let mut paragraph = SourceParagraph::default();
                    paragraph.anchors.extend(self.image_anchor(el));
                    self.push(paragraph, None);
                }
                _ => self.collect_blocks(el, style),
            }
        }

        self.flush(&mut pending, style);
    }

    fn push_paragraph(&mut self, el: ElementRef, style: Option<&str>) {
        let mut paragraph = SourceParagraph {
            alignment: alignment(el),
            ..Default::default()
        };
        self.collect_inline(el, &TextStyle::default(), &mut paragraph);
        self.push(paragraph, style);
    }

    fn push_code(&mut self, pre: ElementRef) {
        let text: String = pre.text().collect();
        let text = text.strip_prefix('\n').unwrap_or(&text).trim_end();
        let paragraph = SourceParagraph::with_runs(vec![TextRun::new(text)]).with_style("Code");
        self.doc.push(BodyElement::Paragraph(paragraph));
    }

    fn collect_list(&mut self, list: ElementRef, num_id: &str, level: u8) {
        let list_type = if list.value().name() == "ol" {
            ListType::Ordered
        } else {
            ListType::Unordered
        };

        for item in list.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" {
                continue;
            }
            let mut paragraph = SourceParagraph {
                numbering: Some(Numbering {
                    num_id: num_id.to_string(),
                    level,
                    list_type,
                }),
                ..Default::default()
            };
            let mut nested = Vec::new();
            for node in item.children() {
                match ElementRef::wrap(node) {
                    Some(el) if matches!(el.value().name(), "ul" | "ol") => nested.push(el),
                    Some(el) => self.collect_inline(el, &TextStyle::default(), &mut paragraph),
                    None => {
                        if let Node::Text(text) = node.value() {
                            push_text(text, &TextStyle::default(), &mut paragraph);
                        }
                    }
                }
            }
            trim_runs(&mut paragraph);
            self.doc.push(BodyElement::Paragraph(paragraph));

            for sublist in nested {
                self.collect_list(sublist, num_id, level.saturating_add(1));
            }
        }
    }

    fn collect_inline(&mut self, el: ElementRef, inherited: &TextStyle, para: &mut SourceParagraph) {
        let name = el.value().name();
        if SKIPPED.contains(&name) {
            return;
        }
        match name {
            "br" => {
                para.runs.push(TextRun::styled("\n", inherited.clone()));
                return;
            }
            "img" => {
                para.anchors.extend(self.image_anchor(el));
                return;
            }
            _ => {}
        }

        let style = inline_style(el, inherited);
        for node in el.children() {
            match ElementRef::wrap(node) {
                Some(child) => self.collect_inline(child, &style, para),
                None => {
                    if let Node::Text(text) = node.value() {
                        push_text(text, &style, para);
                    }
                }
            }
        }
    }

    fn image_anchor(&mut self, img: ElementRef) -> Option<ImageAnchor> {
        let src = img.value().attr("src").map(str::trim).filter(|s| !s.is_empty())?;

        let rel_id = match self.image_ids.get(src) {
            Some(id) => id.clone(),
            None => {
                let id = format!("img{}", self.image_ids.len() + 1);
                self.image_ids.insert(src.to_string(), id.clone());
                match self.parser.load_image(src) {
                    Ok(resource) => self.doc.add_resource(id.clone(), resource),
                    Err(reason) => {
                        debug!("Image {} unresolved: {}", src, reason);
                        self.doc.unresolved.insert(id.clone(), reason);
                    }
                }
                id
            }
        };

        let float = img
            .value()
            .attr("align")
            .or_else(|| img.value().attr("style").and_then(|s| css_value(s, "float")))
            .and_then(FloatAlignment::from_position_align);
        let mut anchor = match float {
            Some(side) => ImageAnchor::floating(rel_id, side),
            None => ImageAnchor::inline(rel_id),
        };
        anchor.description = img
            .value()
            .attr("alt")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(String::from);
        anchor.name = img.value().attr("title").map(String::from);
        trace!("Image anchor {} -> {}", src, anchor.reference());
        Some(anchor)
    }

    fn push(&mut self, mut paragraph: SourceParagraph, style: Option<&str>) {
        trim_runs(&mut paragraph);
        if paragraph.runs.is_empty() && paragraph.anchors.is_empty() {
            return;
        }
        if let Some(style) = style {
            paragraph = paragraph.with_style(style);
        }
        self.doc.push(BodyElement::Paragraph(paragraph));
    }

    fn flush(&mut self, pending: &mut SourceParagraph, style: Option<&str>) {
        let paragraph = std::mem::take(pending);
        self.push(paragraph, style);
    }
}

fn is_block(name: &str) -> bool {
    CONTAINERS.contains(&name)
        || matches!(
            name,
            "h1" | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "p"
                | "figcaption"
                | "blockquote"
                | "pre"
                | "ul"
                | "ol"
                | "hr"
                | "table"
                | "img"
        )
}

fn child_element<'a>(parent: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == name)
}

fn parse_head(head: ElementRef) -> Metadata {
    let mut metadata = Metadata::default();
    for el in head.children().filter_map(ElementRef::wrap) {
        match el.value().name() {
            "title" => {
                let title: String = el.text().collect();
                let title = title.trim();
                if !title.is_empty() {
                    metadata.title = Some(title.to_string());
                }
            }
            "meta" => {
                let (Some(name), Some(content)) = (el.value().attr("name"), el.value().attr("content"))
                else {
                    continue;
                };
                let content = Some(content.trim().to_string());
                match name.to_ascii_lowercase().as_str() {
                    "description" => metadata.description = content,
                    "keywords" => metadata.keywords = content,
                    "author" => metadata.creator = content,
                    "subject" => metadata.subject = content,
                    _ => {}
                }
            }
            _ => {}
        }
    }
    metadata
}

fn inline_style(el: ElementRef, inherited: &TextStyle) -> TextStyle {
    let mut style = inherited.clone();
    match el.value().name() {
        "b" | "strong" => style.bold = true,
        "i" | "em" | "cite" | "var" => style.italic = true,
        "u" | "ins" => style.underline = true,
        "s" | "strike" | "del" => style.strikethrough = true,
        "sup" => style.superscript = true,
        "sub" => style.subscript = true,
        "a" => {
            if let Some(href) = el.value().attr("href").filter(|h| !h.starts_with('#')) {
                style.link = Some(href.to_string());
            }
        }
        _ => {}
    }
    let color = el
        .value()
        .attr("style")
        .and_then(|s| css_value(s, "color"))
        .or_else(|| el.value().attr("color"));
    if let Some(rgb) = color.and_then(|c| Rgb::from_hex(c.trim_start_matches('#'))) {
        style.color = Some(rgb);
    }
    style
}

fn alignment(el: ElementRef) -> Alignment {
    el.value()
        .attr("align")
        .or_else(|| el.value().attr("style").and_then(|s| css_value(s, "text-align")))
        .map(Alignment::from_jc)
        .unwrap_or_default()
}

/// Value of one declaration in an inline `style` attribute.
fn css_value<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case(property)
            .then(|| value.trim())
    })
}

/// Append text with HTML whitespace collapsed.
fn push_text(text: &str, style: &TextStyle, para: &mut SourceParagraph) {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = para
        .runs
        .last()
        .map_or(true, |r| r.text.ends_with([' ', '\n']));
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                collapsed.push(' ');
            }
            in_space = true;
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }
    if collapsed.is_empty() {
        return;
    }
    match para.runs.last_mut() {
        Some(last) if last.style == *style => last.text.push_str(&collapsed),
        _ => para.runs.push(TextRun::styled(collapsed, style.clone())),
    }
}

/// Drop trailing whitespace of the last run and empty runs.
fn trim_runs(para: &mut SourceParagraph) {
    while let Some(last) = para.runs.last_mut() {
        let trimmed = last.text.trim_end_matches(' ').len();
        last.text.truncate(trimmed);
        if !last.text.is_empty() {
            break;
        }
        para.runs.pop();
    }
}

fn table_summary(table: ElementRef) -> TableSummary {
    let rows: Vec<usize> = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .count()
        })
        .collect();
    TableSummary {
        rows: rows.len(),
        columns: rows.into_iter().max().unwrap_or(0),
    }
}

/// Decode page bytes as UTF-8, falling back to windows-1252.
fn decode_text(data: &[u8]) -> String {
    let (text, _, had_errors) = UTF_8.decode(data);
    if !had_errors {
        return text.into_owned();
    }
    let (text, _, _) = WINDOWS_1252.decode(data);
    text.into_owned()
}
