//! Input format detection and DOCX package validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

/// DOCX package information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxFormat {
    /// Number of entries in the ZIP container
    pub entry_count: usize,
    /// Whether the package carries a numbering part (lists)
    pub has_numbering: bool,
    /// Number of media parts (images)
    pub media_count: usize,
}

impl std::fmt::Display for DocxFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DOCX ({} parts, {} media)", self.entry_count, self.media_count)
    }
}

/// Input formats a reader exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// WordprocessingML package
    Docx,
    /// HTML page
    Html,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Docx => write!(f, "DOCX"),
            SourceFormat::Html => write!(f, "HTML"),
        }
    }
}

/// Bytes inspected when sniffing a file without a known extension.
const SNIFF_LEN: u64 = 512;

/// ZIP local file header magic: PK\x03\x04
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// The main document part every WordprocessingML package carries.
pub(crate) const MAIN_PART: &str = "word/document.xml";

/// Detect DOCX format from a file path.
///
/// # Example
/// ```no_run
/// use docx_storymap::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("report.docx").unwrap();
/// println!("{}", format);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<DocxFormat> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;
    if header != ZIP_MAGIC {
        return Err(Error::UnknownFormat);
    }
    reader.rewind()?;
    inspect_package(reader)
}

/// Detect DOCX format from the full file content.
///
/// # Returns
/// * `Ok(DocxFormat)` if the data is a ZIP package with a main document part
/// * `Err(Error::UnknownFormat)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<DocxFormat> {
    if !data.starts_with(ZIP_MAGIC) {
        return Err(Error::UnknownFormat);
    }
    inspect_package(Cursor::new(data))
}

/// Pick the reader for a file: by extension, else by its leading bytes.
pub fn source_format_from_path<P: AsRef<Path>>(path: P) -> Result<SourceFormat> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("docx") => return Ok(SourceFormat::Docx),
        Some("html" | "htm" | "xhtml") => return Ok(SourceFormat::Html),
        _ => {}
    }

    let mut header = Vec::new();
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut header)?;
    source_format_from_bytes(&header)
}

/// Pick the reader for content: a ZIP container is DOCX, markup is HTML.
pub fn source_format_from_bytes(data: &[u8]) -> Result<SourceFormat> {
    if data.starts_with(ZIP_MAGIC) {
        return Ok(SourceFormat::Docx);
    }
    if looks_like_html(data) {
        return Ok(SourceFormat::Html);
    }
    Err(Error::UnknownFormat)
}

fn looks_like_html(data: &[u8]) -> bool {
    let head = &data[..data.len().min(SNIFF_LEN as usize)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();
    text.starts_with("<!doctype html")
        || text.starts_with("<html")
        || text.contains("<body")
        || text.contains("<head")
}

fn inspect_package<R: Read + Seek>(reader: R) -> Result<DocxFormat> {
    let archive = zip::ZipArchive::new(reader).map_err(|_| Error::UnknownFormat)?;

    let mut has_main = false;
    let mut has_numbering = false;
    let mut media_count = 0;
    for name in archive.file_names() {
        match name {
            MAIN_PART => has_main = true,
            "word/numbering.xml" => has_numbering = true,
            _ if name.starts_with("word/media/") => media_count += 1,
            _ => {}
        }
    }

    if !has_main {
        return Err(Error::UnknownFormat);
    }

    Ok(DocxFormat {
        entry_count: archive.len(),
        has_numbering,
        media_count,
    })
}

/// Check if a file is a DOCX package.
pub fn is_docx<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes represent a DOCX package.
pub fn is_docx_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}
