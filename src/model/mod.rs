//! Document model types.
//!
//! Two layers live here: the source tree the DOCX reader produces
//! ([`Document`], [`BodyElement`], [`SourceParagraph`]) and the intermediate
//! representation the conversion stages pass along ([`Paragraph`],
//! [`ListBlock`], [`ImageItem`], [`Element`], [`ContentBlock`]).

mod block;
mod body;
mod document;
mod image;
mod list;
mod paragraph;
mod resource;

pub use block::{
    ContentBlock, Element, PlaceholderToken, TextKind, TokenKind, TokenTable, TOKEN_PREFIX,
};
pub use body::{BodyElement, ImageAnchor, Numbering, SourceParagraph, TableSummary, TextRun};
pub use document::{Document, Metadata};
pub use image::{FloatAlignment, ImageDisplay, ImageItem, ImageLayout};
pub use list::{ListBlock, ListItem, ListType, DEPTH_MARKER, MAX_LIST_DEPTH};
pub use paragraph::{
    Alignment, CodeLanguage, ListMarker, Paragraph, Rgb, StyleKind, StyledSpan, TextStyle,
};
pub use resource::{image_dimensions, AssetRef, Resource};
