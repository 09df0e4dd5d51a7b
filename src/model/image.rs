//! Resolved images.

use super::{AssetRef, Resource};
use serde::{Deserialize, Serialize};

/// Images wider than this (in pixels) may be shown at wide size.
pub const WIDE_MIN_WIDTH: u32 = 1200;

/// Minimum aspect ratio for wide display.
pub const WIDE_MIN_ASPECT: f64 = 16.0 / 9.0;

/// How an image was anchored in the source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageLayout {
    /// Anchored within the text flow
    #[default]
    Inline,
    /// Positioned with wrapping or absolute placement
    Floating,
}

/// Side a floating image sits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatAlignment {
    /// Left in left-to-right layouts
    Start,
    /// Right in left-to-right layouts; wrapped images sit here unless the
    /// drawing says otherwise
    #[default]
    End,
}

impl FloatAlignment {
    /// Map a `wp:positionH/wp:align` value.
    pub fn from_position_align(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "left" | "inside" => Some(FloatAlignment::Start),
            "right" | "outside" => Some(FloatAlignment::End),
            _ => None,
        }
    }

    /// Map a `wp:positionH/@relativeFrom` value. Only margin-side frames
    /// imply a side.
    pub fn from_relative_from(val: &str) -> Option<Self> {
        match val {
            "left" | "leftMargin" => Some(FloatAlignment::Start),
            "right" | "rightMargin" => Some(FloatAlignment::End),
            _ => None,
        }
    }

    /// Side of a wrapped drawing: the frame wins over the explicit
    /// alignment, and the default is [`FloatAlignment::End`].
    pub fn from_position(align: Option<&str>, relative_from: Option<&str>) -> Self {
        relative_from
            .and_then(Self::from_relative_from)
            .or_else(|| align.and_then(Self::from_position_align))
            .unwrap_or_default()
    }

    /// The storymap `floatAlignment` value.
    pub fn as_str(self) -> &'static str {
        match self {
            FloatAlignment::Start => "start",
            FloatAlignment::End => "end",
        }
    }
}

/// Storymap image size setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDisplay {
    /// Column width
    Standard,
    /// Wider than the text column
    Wide,
    /// Floated beside text
    Float,
}

impl ImageDisplay {
    /// The storymap `size` value.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageDisplay::Standard => "standard",
            ImageDisplay::Wide => "wide",
            ImageDisplay::Float => "float",
        }
    }
}

/// An image whose payload has been uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageItem {
    /// Binary payload
    pub resource: Resource,

    /// Reference returned by the asset upload
    pub asset: AssetRef,

    /// Inline or floating
    pub layout: ImageLayout,

    /// Side for floating images
    pub float_alignment: FloatAlignment,

    /// Caption from the drawing's text box, the following caption
    /// paragraph or the drawing description, in that order of preference
    pub caption: Option<String>,

    /// Alternative text
    pub alt_text: Option<String>,

    /// Relationship id or drawing name
    pub reference: String,
}

impl ImageItem {
    /// Display size: floating images float; large panoramic inline images
    /// go wide; everything else is standard.
    pub fn display(&self) -> ImageDisplay {
        if self.layout == ImageLayout::Floating {
            return ImageDisplay::Float;
        }
        let wide = matches!(
            (self.resource.width, self.resource.aspect_ratio()),
            (Some(w), Some(ratio)) if w > WIDE_MIN_WIDTH && ratio >= WIDE_MIN_ASPECT
        );
        if wide {
            ImageDisplay::Wide
        } else {
            ImageDisplay::Standard
        }
    }
}
