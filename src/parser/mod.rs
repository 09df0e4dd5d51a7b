//! Document readers: DOCX packages and HTML pages.

mod docx_parser;
mod html_parser;
mod options;

pub use docx_parser::DocxParser;
pub use html_parser::HtmlParser;
pub use options::{ErrorMode, ParseOptions};
