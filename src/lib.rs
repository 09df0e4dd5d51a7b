//! # docx-storymap
//!
//! Converts DOCX documents and HTML pages into ArcGIS StoryMap stories.
//!
//! A document is read into a paragraph/run tree, normalized into content
//! blocks (text, headings, quotes, code, lists, images), and published as a
//! story item. Because the platform corrupts non-ASCII text submitted at
//! item creation, every text leaf is first sent as an ASCII placeholder and
//! replaced with its real content in a second, client-side pass.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docx_storymap::{parse_file, ConnectionProfile, PortalClient, Publisher, StoryOptions};
//!
//! fn main() -> docx_storymap::Result<()> {
//!     let doc = parse_file("field-notes.docx")?;
//!
//!     let profile = ConnectionProfile::load("profile.json")?;
//!     let mut publisher = Publisher::new(PortalClient::new(&profile)?);
//!
//!     let story = StoryOptions::from_metadata(&doc.metadata, "Field notes");
//!     let outcome = publisher.publish(&doc, &story)?;
//!     println!("Published item {}", outcome.item_id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Style mapping**: Heading 1-3, Quote, Code and Caption paragraph styles
//! - **Inline formatting**: bold, italic, underline, strikethrough,
//!   sub/superscript, font color and hyperlinks
//! - **Lists**: two-level storymap lists with deeper levels flattened
//! - **Images**: inline and floating images with captions and alt text
//! - **HTML input**: `.html` pages map onto the same tree, `<hr>` becomes a separator
//! - **Placeholder publishing**: strict two-phase text substitution

pub mod config;
pub mod convert;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod publish;
pub mod render;

// Re-export commonly used types
pub use config::{ConnectionProfile, DebugLevel, ProfileParams};
pub use convert::{Conversion, ConversionStats, ConvertOptions, Converter};
pub use detect::{
    detect_format_from_bytes, detect_format_from_path, is_docx, source_format_from_path, DocxFormat,
    SourceFormat,
};
pub use error::{Error, MismatchReport, RemoteStep, Result, Warning};
pub use model::{
    Alignment, AssetRef, ContentBlock, Document, Element, ImageItem, ListBlock, ListType,
    Metadata, Paragraph, PlaceholderToken, Resource, StyleKind, TextRun, TextStyle, TokenTable,
};
pub use parser::{DocxParser, ErrorMode, HtmlParser, ParseOptions};
pub use publish::{
    AssetUploader, ContentApi, Draft, ItemProperties, MemoryPortal, PortalClient,
    PublishOutcome, Publisher, StoryOptions,
};
pub use render::JsonFormat;

use std::io::Read;
use std::path::Path;

/// Parse a DOCX or HTML file and return its document tree.
///
/// The reader is chosen by extension, else by the file's leading bytes.
///
/// # Example
///
/// ```no_run
/// use docx_storymap::parse_file;
///
/// let doc = parse_file("report.docx").unwrap();
/// println!("Paragraphs: {}", doc.paragraph_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    parse_file_with_options(path, ParseOptions::default())
}

/// Parse a DOCX or HTML file with custom options.
///
/// # Example
///
/// ```no_run
/// use docx_storymap::{parse_file_with_options, ParseOptions};
///
/// let options = ParseOptions::new().lenient().with_memory_limit(64);
/// let doc = parse_file_with_options("report.docx", options).unwrap();
/// ```
pub fn parse_file_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Document> {
    let path = path.as_ref();
    match source_format_from_path(path)? {
        SourceFormat::Docx => DocxParser::open_with_options(path, options)?.parse(),
        SourceFormat::Html => HtmlParser::open_with_options(path, options)?.parse(),
    }
}

/// Parse HTML markup. Relative image paths stay unresolved.
///
/// # Example
///
/// ```
/// let doc = docx_storymap::parse_html("<h1>Intro</h1><hr><p>Body</p>").unwrap();
/// assert_eq!(doc.paragraph_count(), 2);
/// ```
pub fn parse_html(html: &str) -> Result<Document> {
    HtmlParser::from_html(html).parse()
}

/// Parse a DOCX from bytes.
pub fn parse_bytes(data: &[u8]) -> Result<Document> {
    let parser = DocxParser::from_bytes(data)?;
    parser.parse()
}

/// Parse a DOCX from bytes with custom options.
pub fn parse_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Document> {
    let parser = DocxParser::from_bytes_with_options(data, options)?;
    parser.parse()
}

/// Parse a DOCX from a reader.
///
/// # Example
///
/// ```no_run
/// use docx_storymap::parse_reader;
/// use std::fs::File;
///
/// let file = File::open("report.docx").unwrap();
/// let doc = parse_reader(file).unwrap();
/// ```
pub fn parse_reader<R: Read>(reader: R) -> Result<Document> {
    let parser = DocxParser::from_reader(reader)?;
    parser.parse()
}

/// Parse a DOCX from a reader with custom options.
pub fn parse_reader_with_options<R: Read>(reader: R, options: ParseOptions) -> Result<Document> {
    let parser = DocxParser::from_reader_with_options(reader, options)?;
    parser.parse()
}

/// Extract plain text from a DOCX or HTML file.
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let doc = parse_file(path)?;
    Ok(doc.plain_text())
}

/// Convert a DOCX or HTML file into content blocks, uploading its images.
pub fn convert_file<P: AsRef<Path>>(path: P, uploader: &mut dyn AssetUploader) -> Result<Conversion> {
    let doc = parse_file(path)?;
    Converter::default().convert(&doc, uploader)
}

/// Parse a DOCX or HTML file and publish it as a story.
///
/// # Example
///
/// ```no_run
/// use docx_storymap::{publish_file, MemoryPortal, StoryOptions};
///
/// let outcome = publish_file("report.docx", MemoryPortal::new(), &StoryOptions::new("Report"))?;
/// println!("{} placeholders substituted", outcome.replaced);
/// # Ok::<(), docx_storymap::Error>(())
/// ```
pub fn publish_file<P: AsRef<Path>, A: ContentApi>(
    path: P,
    api: A,
    story: &StoryOptions,
) -> Result<PublishOutcome> {
    let doc = parse_file(path)?;
    Publisher::new(api).publish(&doc, story)
}

/// Convert a DOCX or HTML file offline and return the final story JSON.
///
/// The publish protocol runs against an in-memory store, so the output is
/// exactly what a portal would end up holding.
pub fn to_storymap_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let path = path.as_ref();
    let doc = parse_file(path)?;
    let default_title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Story".to_string());
    let story = StoryOptions::from_metadata(&doc.metadata, &default_title);
    let outcome = Publisher::new(MemoryPortal::new()).publish(&doc, &story)?;
    render::to_json(&outcome.tree, format)
}

/// Builder for parsing and converting DOCX documents.
///
/// # Example
///
/// ```no_run
/// use docx_storymap::{DocxStorymap, MemoryPortal, StoryOptions};
///
/// let outcome = DocxStorymap::new()
///     .lenient()
///     .with_code_merge(false)
///     .parse("report.docx")?
///     .publish(MemoryPortal::lossy(), &StoryOptions::new("Report"))?;
/// # Ok::<(), docx_storymap::Error>(())
/// ```
pub struct DocxStorymap {
    parse_options: ParseOptions,
    convert_options: ConvertOptions,
}

impl DocxStorymap {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::default(),
            convert_options: ConvertOptions::default(),
        }
    }

    /// Enable lenient parsing mode.
    pub fn lenient(mut self) -> Self {
        self.parse_options = self.parse_options.lenient();
        self
    }

    /// Skip image payloads.
    pub fn text_only(mut self) -> Self {
        self.parse_options = self.parse_options.text_only();
        self
    }

    /// Cap the size of image payloads loaded, in MB.
    pub fn with_memory_limit_mb(mut self, mb: u32) -> Self {
        self.parse_options = self.parse_options.with_memory_limit(mb);
        self
    }

    /// Enable or disable merging of adjacent identical runs.
    pub fn with_run_merge(mut self, merge: bool) -> Self {
        self.convert_options = self.convert_options.with_run_merge(merge);
        self
    }

    /// Enable or disable merging of consecutive code paragraphs.
    pub fn with_code_merge(mut self, merge: bool) -> Self {
        self.convert_options = self.convert_options.with_code_merge(merge);
        self
    }

    /// Parse a DOCX or HTML file.
    pub fn parse<P: AsRef<Path>>(self, path: P) -> Result<Parsed> {
        let document = parse_file_with_options(path, self.parse_options)?;
        Ok(Parsed {
            document,
            convert_options: self.convert_options,
        })
    }

    /// Parse a DOCX from bytes.
    pub fn parse_bytes(self, data: &[u8]) -> Result<Parsed> {
        let document = DocxParser::from_bytes_with_options(data, self.parse_options)?.parse()?;
        Ok(Parsed {
            document,
            convert_options: self.convert_options,
        })
    }
}

impl Default for DocxStorymap {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed document with the conversion settings to apply.
pub struct Parsed {
    /// The parsed document
    pub document: Document,
    convert_options: ConvertOptions,
}

impl Parsed {
    /// Convert into content blocks.
    pub fn convert(&self, uploader: &mut dyn AssetUploader) -> Result<Conversion> {
        Converter::new(self.convert_options.clone()).convert(&self.document, uploader)
    }

    /// Publish as a story through a content API.
    pub fn publish<A: ContentApi>(&self, api: A, story: &StoryOptions) -> Result<PublishOutcome> {
        Publisher::new(api)
            .with_convert_options(self.convert_options.clone())
            .publish(&self.document, story)
    }

    /// Get plain text.
    pub fn plain_text(&self) -> String {
        self.document.plain_text()
    }

    /// Get the document.
    pub fn document(&self) -> &Document {
        &self.document
    }
}
