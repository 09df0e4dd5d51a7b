//! DOCX package reader built on zip and roxmltree.

use super::options::{ErrorMode, ParseOptions};
use crate::detect::MAIN_PART;
use crate::error::{Error, Result};
use crate::model::{
    Alignment, BodyElement, Document, FloatAlignment, ImageAnchor, ImageLayout, ListType,
    Metadata, Numbering, Resource, Rgb, SourceParagraph, TableSummary, TextRun, TextStyle,
};
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use roxmltree::Node;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const WPD_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

const RELS_PART: &str = "word/_rels/document.xml.rels";
const STYLES_PART: &str = "word/styles.xml";
const NUMBERING_PART: &str = "word/numbering.xml";
const CORE_PART: &str = "docProps/core.xml";

/// DOCX reader producing the source [`Document`] tree.
pub struct DocxParser {
    package: Package,
    options: ParseOptions,
}

impl DocxParser {
    /// Open a DOCX file from a path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a DOCX file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_seekable(BufReader::new(file), options)
    }

    /// Create a parser from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Create a parser from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        if !data.starts_with(b"PK\x03\x04") {
            return Err(Error::UnknownFormat);
        }
        Self::from_seekable(Cursor::new(data), options)
    }

    /// Create a parser from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ParseOptions::default())
    }

    /// Create a parser from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ParseOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }

    fn from_seekable<R: Read + Seek>(reader: R, options: ParseOptions) -> Result<Self> {
        let package = Package::read(reader, options.resource_limit_bytes())?;
        if !package.parts.contains_key(MAIN_PART) {
            return Err(Error::UnknownFormat);
        }
        Ok(Self { package, options })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(parts: &[(&str, &[u8])], options: ParseOptions) -> Self {
        let parts = parts
            .iter()
            .map(|(name, data)| (name.to_string(), data.to_vec()))
            .collect();
        Self {
            package: Package {
                parts,
                oversized: HashSet::new(),
            },
            options,
        }
    }

    /// Parse the package into a document tree.
    pub fn parse(&self) -> Result<Document> {
        let rels = self.parse_relationships()?;
        let styles = self.parse_styles()?;
        let numbering = self.parse_numbering()?;

        let mut doc = Document::new();
        doc.metadata = self.parse_core_properties()?;

        let text = self
            .package
            .text(MAIN_PART)?
            .ok_or_else(|| Error::MissingPart(MAIN_PART.to_string()))?;
        let xml = roxmltree::Document::parse(text)
            .map_err(|e| Error::Xml(format!("{}: {}", MAIN_PART, e)))?;
        let body = wml(xml.root_element(), "body")
            .ok_or_else(|| Error::DocxParse("document has no body".to_string()))?;

        let ctx = PartContext {
            rels: &rels,
            styles: &styles,
            numbering: &numbering,
        };
        self.collect_body(body, &ctx, &mut doc);
        self.load_resources(&rels, &mut doc);

        debug!(
            "Parsed DOCX: {} body elements, {} anchors, {} images loaded, {} unresolved",
            doc.body.len(),
            doc.anchor_count(),
            doc.resources.len(),
            doc.unresolved.len()
        );
        Ok(doc)
    }

    /// Parse an optional part, honouring the error mode when it is malformed.
    fn optional_xml(&self, name: &str) -> Result<Option<roxmltree::Document<'_>>> {
        let text = match self.package.text(name) {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(None),
            Err(e) => return self.tolerate(name, e),
        };
        match roxmltree::Document::parse(text) {
            Ok(xml) => Ok(Some(xml)),
            Err(e) => self.tolerate(name, Error::Xml(format!("{}: {}", name, e))),
        }
    }

    fn tolerate<T>(&self, name: &str, err: Error) -> Result<Option<T>> {
        match self.options.error_mode {
            ErrorMode::Lenient => {
                warn!("Ignoring malformed part {}: {}", name, err);
                Ok(None)
            }
            ErrorMode::Strict => Err(err),
        }
    }

    fn parse_relationships(&self) -> Result<HashMap<String, Relationship>> {
        let mut rels = HashMap::new();
        let Some(xml) = self.optional_xml(RELS_PART)? else {
            return Ok(rels);
        };
        for node in xml.root_element().children() {
            if node.tag_name().name() != "Relationship" {
                continue;
            }
            if let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target")) {
                rels.insert(
                    id.to_string(),
                    Relationship {
                        target: target.to_string(),
                        external: node.attribute("TargetMode") == Some("External"),
                    },
                );
            }
        }
        Ok(rels)
    }

    fn parse_styles(&self) -> Result<HashMap<String, StyleDef>> {
        let mut styles = HashMap::new();
        let Some(xml) = self.optional_xml(STYLES_PART)? else {
            return Ok(styles);
        };
        for node in xml.root_element().children() {
            if !is_wml(node, "style") || node.attribute((WML_NS, "type")) != Some("paragraph") {
                continue;
            }
            let Some(id) = node.attribute((WML_NS, "styleId")) else {
                continue;
            };
            let numbering = wml(node, "pPr")
                .and_then(|ppr| wml(ppr, "numPr"))
                .and_then(parse_num_pr);
            styles.insert(
                id.to_string(),
                StyleDef {
                    name: wml_attr(node, "name").map(String::from),
                    numbering,
                },
            );
        }
        Ok(styles)
    }

    fn parse_numbering(&self) -> Result<NumberingInfo> {
        let mut info = NumberingInfo::default();
        let Some(xml) = self.optional_xml(NUMBERING_PART)? else {
            return Ok(info);
        };

        for node in xml.root_element().children() {
            if node.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match node.tag_name().name() {
                "abstractNum" => {
                    let Some(abs_id) = node.attribute((WML_NS, "abstractNumId")) else {
                        continue;
                    };
                    let mut levels = HashMap::new();
                    for lvl in node.children().filter(|n| is_wml(*n, "lvl")) {
                        let Some(ilvl) = lvl
                            .attribute((WML_NS, "ilvl"))
                            .and_then(|v| v.parse::<u8>().ok())
                        else {
                            continue;
                        };
                        let num_fmt = wml_attr(lvl, "numFmt").unwrap_or("bullet");
                        levels.insert(ilvl, ListType::from_num_fmt(num_fmt));
                    }
                    info.abstract_levels.insert(abs_id.to_string(), levels);
                }
                "num" => {
                    let Some(num_id) = node.attribute((WML_NS, "numId")) else {
                        continue;
                    };
                    let Some(abs_id) = wml_attr(node, "abstractNumId") else {
                        continue;
                    };
                    info.num_to_abstract
                        .insert(num_id.to_string(), abs_id.to_string());
                }
                _ => {}
            }
        }
        Ok(info)
    }

    fn parse_core_properties(&self) -> Result<Metadata> {
        let mut meta = Metadata::default();
        let Some(xml) = self.optional_xml(CORE_PART)? else {
            return Ok(meta);
        };
        for node in xml.root_element().children().filter(|n| n.is_element()) {
            let value = node
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from);
            match node.tag_name().name() {
                "title" => meta.title = value,
                "subject" => meta.subject = value,
                "creator" => meta.creator = value,
                "description" => meta.description = value,
                "keywords" => meta.keywords = value,
                "created" => meta.created = value.as_deref().and_then(parse_w3c_date),
                "modified" => meta.modified = value.as_deref().and_then(parse_w3c_date),
                _ => {}
            }
        }
        Ok(meta)
    }

    fn collect_body(&self, container: Node, ctx: &PartContext, doc: &mut Document) {
        for child in container.children() {
            if child.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match child.tag_name().name() {
                "p" => doc.push(BodyElement::Paragraph(self.parse_paragraph(child, ctx))),
                "tbl" => {
                    let summary = table_summary(child);
                    debug!(
                        "Dropping table ({} rows x {} columns)",
                        summary.rows, summary.columns
                    );
                    doc.push(BodyElement::Table(summary));
                }
                "sdt" => {
                    if let Some(content) = wml(child, "sdtContent") {
                        self.collect_body(content, ctx, doc);
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_paragraph(&self, node: Node, ctx: &PartContext) -> SourceParagraph {
        let ppr = wml(node, "pPr");
        let style_id = ppr.and_then(|p| wml_attr(p, "pStyle"));
        let style = style_id.and_then(|id| ctx.styles.get(id));

        let alignment = ppr
            .and_then(|p| wml_attr(p, "jc"))
            .map(Alignment::from_jc)
            .unwrap_or_default();

        let direct = ppr.and_then(|p| wml(p, "numPr")).map(parse_num_pr);
        // An explicit numPr (even numId 0) overrides the style's numbering.
        let num_ref = match direct {
            Some(direct) => direct,
            None => style.and_then(|s| s.numbering.clone()),
        };
        let numbering = num_ref.map(|(num_id, level)| Numbering {
            list_type: ctx.numbering.list_type(&num_id, level),
            num_id,
            level,
        });

        let mut paragraph = SourceParagraph {
            style_id: style_id.map(String::from),
            style_name: style.and_then(|s| s.name.clone()),
            alignment,
            numbering,
            runs: Vec::new(),
            anchors: Vec::new(),
        };
        collect_inline(node, None, ctx, &mut paragraph);
        trace!(
            "Paragraph style={:?} runs={} anchors={}",
            paragraph.style_label(),
            paragraph.runs.len(),
            paragraph.anchors.len()
        );
        paragraph
    }

    fn load_resources(&self, rels: &HashMap<String, Relationship>, doc: &mut Document) {
        let rel_ids: Vec<String> = doc
            .paragraphs()
            .flat_map(|p| p.anchors.iter())
            .filter_map(|a| a.rel_id.clone())
            .collect();

        for rel_id in rel_ids {
            if doc.resources.contains_key(&rel_id) || doc.unresolved.contains_key(&rel_id) {
                continue;
            }
            match self.load_resource(&rel_id, rels) {
                Ok(resource) => doc.add_resource(rel_id, resource),
                Err(reason) => {
                    debug!("Image {} unresolved: {}", rel_id, reason);
                    doc.unresolved.insert(rel_id, reason);
                }
            }
        }
    }

    fn load_resource(
        &self,
        rel_id: &str,
        rels: &HashMap<String, Relationship>,
    ) -> std::result::Result<Resource, String> {
        if !self.options.extract_resources {
            return Err("image extraction is disabled".to_string());
        }
        let rel = rels
            .get(rel_id)
            .ok_or_else(|| "relationship not found".to_string())?;
        if rel.external {
            return Err(format!("linked image {} is not embedded", rel.target));
        }
        let path = resolve_part_path(&rel.target);
        if self.package.oversized.contains(&path) {
            return Err(format!("{} exceeds the memory limit", path));
        }
        let data = self
            .package
            .parts
            .get(&path)
            .ok_or_else(|| format!("media part {} is missing", path))?;

        let mut resource = Resource::from_bytes(data.clone());
        if !resource.is_image() {
            return Err(format!("{} is not a supported image format", path));
        }
        if let Some(name) = path.rsplit('/').next() {
            resource = resource.with_filename(name);
        }
        Ok(resource)
    }
}

/// Parts of the ZIP container, loaded eagerly.
struct Package {
    parts: HashMap<String, Vec<u8>>,
    oversized: HashSet<String>,
}

impl Package {
    fn read<R: Read + Seek>(reader: R, limit: Option<u64>) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut parts = HashMap::new();
        let mut oversized = HashSet::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let too_large = limit.is_some_and(|max| entry.size() > max);
            if too_large && name.starts_with("word/media/") {
                oversized.insert(name);
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            parts.insert(name, data);
        }
        Ok(Self { parts, oversized })
    }

    fn text(&self, name: &str) -> Result<Option<&str>> {
        let Some(data) = self.parts.get(name) else {
            return Ok(None);
        };
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::DocxParse(format!("{} is not UTF-8: {}", name, e)))?;
        Ok(Some(text.trim_start_matches('\u{feff}')))
    }
}

struct Relationship {
    target: String,
    external: bool,
}

struct StyleDef {
    name: Option<String>,
    numbering: Option<(String, u8)>,
}

#[derive(Default)]
struct NumberingInfo {
    abstract_levels: HashMap<String, HashMap<u8, ListType>>,
    num_to_abstract: HashMap<String, String>,
}

impl NumberingInfo {
    fn list_type(&self, num_id: &str, level: u8) -> ListType {
        self.num_to_abstract
            .get(num_id)
            .and_then(|abs| self.abstract_levels.get(abs))
            .and_then(|levels| levels.get(&level))
            .copied()
            .unwrap_or_default()
    }
}

struct PartContext<'a> {
    rels: &'a HashMap<String, Relationship>,
    styles: &'a HashMap<String, StyleDef>,
    numbering: &'a NumberingInfo,
}

fn is_wml(node: Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn wml<'a>(node: Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

fn wml_attr<'a>(node: Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

/// A WML toggle property: present with no val, or a val other than
/// `0`/`false`/`off`, means on.
fn wml_bool(parent: Node, name: &str) -> bool {
    wml(parent, name).is_some_and(|n| {
        n.attribute((WML_NS, "val"))
            .map_or(true, |v| !matches!(v, "0" | "false" | "off"))
    })
}

/// `(numId, ilvl)`; numId 0 yields `None`.
fn parse_num_pr(num_pr: Node) -> Option<(String, u8)> {
    let num_id = wml_attr(num_pr, "numId")?;
    if num_id == "0" {
        return None;
    }
    let level = wml_attr(num_pr, "ilvl")
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(0);
    Some((num_id.to_string(), level))
}

fn collect_inline(node: Node, link: Option<&str>, ctx: &PartContext, para: &mut SourceParagraph) {
    for child in node.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "r" => parse_run(child, link, para),
            "hyperlink" => {
                let target = child
                    .attribute((REL_NS, "id"))
                    .and_then(|id| ctx.rels.get(id))
                    .map(|rel| rel.target.clone())
                    .or_else(|| {
                        child
                            .attribute((WML_NS, "anchor"))
                            .map(|anchor| format!("#{}", anchor))
                    });
                collect_inline(child, target.as_deref().or(link), ctx, para);
            }
            "ins" | "moveTo" | "smartTag" | "fldSimple" | "customXml" | "dir" | "bdo" => {
                collect_inline(child, link, ctx, para)
            }
            "sdt" => {
                if let Some(content) = wml(child, "sdtContent") {
                    collect_inline(content, link, ctx, para);
                }
            }
            _ => {}
        }
    }
}

fn parse_run(run: Node, link: Option<&str>, para: &mut SourceParagraph) {
    let style = run_style(wml(run, "rPr"), link);
    let mut text = String::new();

    for child in run.children() {
        let name = child.tag_name().name();
        match child.tag_name().namespace() {
            Some(WML_NS) => match name {
                "t" => text.push_str(child.text().unwrap_or("")),
                "tab" => text.push('\t'),
                "cr" => text.push('\n'),
                "br" => {
                    if child.attribute((WML_NS, "type")).map_or(true, |t| t == "textWrapping") {
                        text.push('\n');
                    }
                }
                "noBreakHyphen" => text.push('-'),
                "drawing" => para.anchors.extend(parse_drawing(child)),
                _ => {}
            },
            Some(MC_NS) if name == "AlternateContent" => {
                if let Some(drawing) = child.descendants().find(|n| is_wml(*n, "drawing")) {
                    para.anchors.extend(parse_drawing(drawing));
                }
            }
            _ => {}
        }
    }

    if !text.is_empty() {
        para.runs.push(TextRun::styled(text, style));
    }
}

fn run_style(rpr: Option<Node>, link: Option<&str>) -> TextStyle {
    let mut style = TextStyle {
        link: link.map(String::from),
        ..Default::default()
    };
    let Some(rpr) = rpr else {
        return style;
    };

    style.bold = wml_bool(rpr, "b");
    style.italic = wml_bool(rpr, "i");
    style.strikethrough = wml_bool(rpr, "strike") || wml_bool(rpr, "dstrike");
    style.underline = wml(rpr, "u").is_some_and(|u| {
        u.attribute((WML_NS, "val"))
            .map_or(true, |v| v != "none")
    });
    match wml_attr(rpr, "vertAlign") {
        Some("superscript") => style.superscript = true,
        Some("subscript") => style.subscript = true,
        _ => {}
    }
    // Theme-bound colors follow the document theme, not direct formatting.
    style.color = wml(rpr, "color")
        .filter(|c| c.attribute((WML_NS, "themeColor")).is_none())
        .and_then(|c| c.attribute((WML_NS, "val")))
        .and_then(Rgb::from_hex);
    style
}

fn parse_drawing(drawing: Node) -> Option<ImageAnchor> {
    let container = drawing.children().find(|n| {
        n.tag_name().namespace() == Some(WPD_NS)
            && matches!(n.tag_name().name(), "inline" | "anchor")
    })?;

    let floating = container.tag_name().name() == "anchor";
    let position = container
        .children()
        .find(|n| n.tag_name().name() == "positionH" && n.tag_name().namespace() == Some(WPD_NS));
    let float_alignment = FloatAlignment::from_position(
        position
            .and_then(|pos| pos.children().find(|n| n.tag_name().name() == "align"))
            .and_then(|align| align.text()),
        position.and_then(|pos| pos.attribute("relativeFrom")),
    );

    let doc_pr = container
        .children()
        .find(|n| n.tag_name().name() == "docPr" && n.tag_name().namespace() == Some(WPD_NS));
    let description = doc_pr
        .and_then(|n| n.attribute("descr"))
        .map(str::trim)
        .filter(|d| !d.is_empty() && !is_generated_description(d))
        .map(String::from);

    Some(ImageAnchor {
        rel_id: find_blip_ref(container).map(String::from),
        layout: if floating {
            ImageLayout::Floating
        } else {
            ImageLayout::Inline
        },
        float_alignment,
        description,
        name: doc_pr.and_then(|n| n.attribute("name")).map(String::from),
        caption: text_box_caption(container),
    })
}

/// First caption-like paragraph inside the drawing's text boxes: a caption
/// style, or text opening with "Figure" or "Image".
fn text_box_caption(container: Node) -> Option<String> {
    container
        .descendants()
        .filter(|n| is_wml(*n, "txbxContent"))
        .flat_map(|content| content.descendants().filter(|n| is_wml(*n, "p")))
        .find_map(|p| {
            let text: String = p
                .descendants()
                .filter(|n| is_wml(*n, "t"))
                .filter_map(|t| t.text())
                .collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let caption_style = wml(p, "pPr")
                .and_then(|ppr| wml_attr(ppr, "pStyle"))
                .is_some_and(|style| style.to_lowercase().contains("caption"));
            let lower = text.to_lowercase();
            let labelled = lower.starts_with("figure") || lower.starts_with("image");
            (caption_style || labelled).then(|| text.to_string())
        })
}

fn find_blip_ref<'a>(container: Node<'a, 'a>) -> Option<&'a str> {
    let blip = container
        .descendants()
        .find(|n| n.tag_name().name() == "blip" && n.tag_name().namespace() == Some(DML_NS))?;
    blip.attribute((REL_NS, "embed"))
        .or_else(|| blip.attribute((REL_NS, "link")))
}

/// Word fills `descr` with machine-written alt text; it is not the author's.
fn is_generated_description(descr: &str) -> bool {
    let lower = descr.to_lowercase();
    lower.contains("generated") && (lower.contains("ai") || lower.contains("intelligence"))
}

fn table_summary(tbl: Node) -> TableSummary {
    let rows: Vec<usize> = tbl
        .children()
        .filter(|n| is_wml(*n, "tr"))
        .map(|tr| tr.children().filter(|n| is_wml(*n, "tc")).count())
        .collect();
    TableSummary {
        rows: rows.len(),
        columns: rows.iter().copied().max().unwrap_or(0),
    }
}

/// Resolve a relationship target against the `word/` folder.
fn resolve_part_path(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = vec!["word"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn parse_w3c_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
