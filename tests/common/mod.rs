//! Builds small DOCX packages in memory for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const IMAGE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const LINK_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

const STYLES: &str = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
<w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/></w:style>
<w:style w:type="paragraph" w:styleId="Code"><w:name w:val="Code"/></w:style>
<w:style w:type="paragraph" w:styleId="Caption"><w:name w:val="caption"/></w:style>
<w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/></w:style>
<w:style w:type="paragraph" w:styleId="Fancy"><w:name w:val="Fancy Banner"/></w:style>
</w:styles>"#;

/// numId 1 is decimal at level 0 and bullets below; numId 2 is bullets only.
const NUMBERING: &str = r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:abstractNum w:abstractNumId="0">
<w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl>
<w:lvl w:ilvl="1"><w:numFmt w:val="bullet"/></w:lvl>
<w:lvl w:ilvl="2"><w:numFmt w:val="bullet"/></w:lvl>
</w:abstractNum>
<w:abstractNum w:abstractNumId="1">
<w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl>
<w:lvl w:ilvl="1"><w:numFmt w:val="bullet"/></w:lvl>
</w:abstractNum>
<w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
<w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>"#;

/// A minimal PNG header carrying the given dimensions.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A run with optional run-property XML.
pub fn run(text: &str, rpr: &str) -> String {
    let props = if rpr.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{}</w:rPr>", rpr)
    };
    format!(
        r#"<w:r>{}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        props,
        escape(text)
    )
}

/// A paragraph from raw paragraph properties and inline content.
pub fn paragraph(ppr: &str, inline: &str) -> String {
    if ppr.is_empty() {
        format!("<w:p>{}</w:p>", inline)
    } else {
        format!("<w:p><w:pPr>{}</w:pPr>{}</w:p>", ppr, inline)
    }
}

/// A plain paragraph of one run.
pub fn text(content: &str) -> String {
    paragraph("", &run(content, ""))
}

/// A paragraph in a named style.
pub fn styled(style_id: &str, content: &str) -> String {
    paragraph(
        &format!(r#"<w:pStyle w:val="{}"/>"#, style_id),
        &run(content, ""),
    )
}

/// A numbered paragraph.
pub fn list_item(num_id: u32, level: u8, content: &str) -> String {
    paragraph(
        &format!(
            r#"<w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="{}"/><w:numId w:val="{}"/></w:numPr>"#,
            level, num_id
        ),
        &run(content, ""),
    )
}

/// A run holding an inline drawing.
pub fn inline_image(rel_id: &str, descr: &str) -> String {
    format!(
        r#"<w:r><w:drawing><wp:inline><wp:docPr id="1" name="Picture" descr="{}"/><a:graphic><a:graphicData><a:blip r:embed="{}"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
        escape(descr),
        rel_id
    )
}

/// A run holding a floating drawing aligned to one side.
pub fn floating_image(rel_id: &str, side: &str) -> String {
    format!(
        r#"<w:r><w:drawing><wp:anchor><wp:positionH relativeFrom="margin"><wp:align>{}</wp:align></wp:positionH><wp:wrapSquare wrapText="bothSides"/><wp:docPr id="2" name="Float"/><a:graphic><a:graphicData><a:blip r:embed="{}"/></a:graphicData></a:graphic></wp:anchor></w:drawing></w:r>"#,
        side, rel_id
    )
}

/// A one-cell table.
pub fn table(cell: &str) -> String {
    format!(
        "<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>",
        text(cell)
    )
}

/// Assembles a WordprocessingML package.
#[derive(Default)]
pub struct DocxBuilder {
    body: Vec<String>,
    relationships: Vec<String>,
    media: Vec<(String, Vec<u8>)>,
    core: Vec<(String, String)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw body XML.
    pub fn push(mut self, xml: impl Into<String>) -> Self {
        self.body.push(xml.into());
        self
    }

    /// Embed an image part under `word/media/` behind a relationship.
    pub fn image(mut self, rel_id: &str, file_name: &str, data: Vec<u8>) -> Self {
        self.relationships.push(format!(
            r#"<Relationship Id="{}" Type="{}" Target="media/{}"/>"#,
            rel_id, IMAGE_REL, file_name
        ));
        self.media.push((format!("word/media/{}", file_name), data));
        self
    }

    /// Add an external hyperlink relationship.
    pub fn hyperlink(mut self, rel_id: &str, target: &str) -> Self {
        self.relationships.push(format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}" TargetMode="External"/>"#,
            rel_id,
            LINK_REL,
            escape(target)
        ));
        self
    }

    /// Set a core property such as `dc:title` or `cp:keywords`.
    pub fn property(mut self, tag: &str, value: &str) -> Self {
        self.core.push((tag.to_string(), escape(value)));
        self
    }

    fn document_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W}" xmlns:r="{R}" xmlns:wp="{WP}" xmlns:a="{A}"><w:body>{}</w:body></w:document>"#,
            self.body.concat()
        )
    }

    fn rels_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            self.relationships.concat()
        )
    }

    fn core_xml(&self) -> String {
        let fields: String = self
            .core
            .iter()
            .map(|(tag, value)| format!("<{tag}>{value}</{tag}>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">{}</cp:coreProperties>"#,
            fields
        )
    }

    /// Serialize the package.
    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let mut parts: Vec<(String, Vec<u8>)> = vec![
            (
                "word/document.xml".to_string(),
                self.document_xml().into_bytes(),
            ),
            (
                "word/_rels/document.xml.rels".to_string(),
                self.rels_xml().into_bytes(),
            ),
            ("word/styles.xml".to_string(), STYLES.as_bytes().to_vec()),
            ("word/numbering.xml".to_string(), NUMBERING.as_bytes().to_vec()),
            ("docProps/core.xml".to_string(), self.core_xml().into_bytes()),
        ];
        parts.extend(self.media.iter().cloned());

        for (name, data) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(&data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    /// Write the package into a directory.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}
