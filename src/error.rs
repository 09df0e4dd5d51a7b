//! Error and warning types for the conversion pipeline.
//!
//! Fatal conditions are [`Error`] values and stop the pipeline at the step
//! where they occur. Non-fatal conditions are [`Warning`] values; they are
//! logged when raised and collected into the run result.

use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for docx-storymap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that can occur while converting or publishing.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as DOCX.
    #[error("Unknown file format: not a DOCX or HTML document")]
    UnknownFormat,

    /// Error interpreting the DOCX structure.
    #[error("DOCX parsing error: {0}")]
    DocxParse(String),

    /// A required package part is missing.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// Malformed XML inside a package part.
    #[error("XML error: {0}")]
    Xml(String),

    /// The ZIP container could not be read.
    #[error("ZIP error: {0}")]
    Zip(String),

    /// Error while producing the storymap tree or its JSON text.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Invalid or incomplete connection configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tree retrieved from the remote store does not line up with the
    /// placeholder table built locally.
    #[error("Structural mismatch: {0}")]
    StructuralMismatch(MismatchReport),

    /// A remote operation failed.
    #[error("Remote call failed during {step}: {message}")]
    RemoteCall {
        /// The protocol step that failed
        step: RemoteStep,
        /// Failure description
        message: String,
    },

    /// A step after item creation failed; the item still holds placeholder
    /// text and may need to be removed.
    #[error("{source} (item {item_id} was left with placeholder text)")]
    ResidualItem {
        /// Id of the item created before the failure
        item_id: String,
        /// The failure itself
        source: Box<Error>,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a remote-call error for the given step.
    pub fn remote(step: RemoteStep, message: impl Into<String>) -> Self {
        Error::RemoteCall {
            step,
            message: message.into(),
        }
    }

    /// Attach the id of an item left behind by a failed publish.
    pub fn with_residual_item(self, item_id: impl Into<String>) -> Self {
        Error::ResidualItem {
            item_id: item_id.into(),
            source: Box::new(self),
        }
    }

    /// The failing remote step, if this is a remote-call error.
    pub fn remote_step(&self) -> Option<RemoteStep> {
        match self {
            Error::RemoteCall { step, .. } => Some(*step),
            Error::ResidualItem { source, .. } => source.remote_step(),
            _ => None,
        }
    }

    /// The mismatch report, if substitution was refused.
    pub fn mismatch(&self) -> Option<&MismatchReport> {
        match self {
            Error::StructuralMismatch(report) => Some(report),
            Error::ResidualItem { source, .. } => source.mismatch(),
            _ => None,
        }
    }

    /// Id of an item created before the failure, if any.
    pub fn residual_item(&self) -> Option<&str> {
        match self {
            Error::ResidualItem { item_id, .. } => Some(item_id),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            zip::result::ZipError::InvalidArchive(_) => Error::UnknownFormat,
            _ => Error::Zip(err.to_string()),
        }
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Remote operations of the publish protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStep {
    /// Token exchange with the portal
    Authenticate,
    /// Item creation with the placeholder tree
    CreateItem,
    /// Retrieval of the stored tree
    GetItemJson,
    /// Upload of the substituted tree
    UpdateItemJson,
    /// Upload of an image binary
    UploadAsset,
}

impl fmt::Display for RemoteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteStep::Authenticate => "authenticate",
            RemoteStep::CreateItem => "create item",
            RemoteStep::GetItemJson => "get item JSON",
            RemoteStep::UpdateItemJson => "update item JSON",
            RemoteStep::UploadAsset => "upload asset",
        };
        f.write_str(name)
    }
}

/// Everything that did not line up during a placeholder walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MismatchReport {
    /// Tokens from the table that were not found in the tree
    pub missing: Vec<String>,
    /// Tokens found more than once
    pub duplicated: Vec<String>,
    /// Placeholder-shaped values that are not in the table
    pub unknown: Vec<String>,
}

impl MismatchReport {
    /// Check whether the walk found nothing wrong.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty() && self.unknown.is_empty()
    }
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing [{}]", self.missing.join(", ")));
        }
        if !self.duplicated.is_empty() {
            parts.push(format!("duplicated [{}]", self.duplicated.join(", ")));
        }
        if !self.unknown.is_empty() {
            parts.push(format!("unknown [{}]", self.unknown.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("no differences")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

/// Non-fatal conditions collected during a run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// An image payload could not be extracted; the image is omitted.
    #[error("Image {reference} skipped: {reason}")]
    AssetResolution {
        /// Relationship id or anchor name
        reference: String,
        /// Why the payload was unavailable
        reason: String,
    },

    /// A paragraph style outside the recognized set, treated as normal.
    #[error("Unsupported paragraph style '{style}', treated as normal text")]
    UnsupportedStyle {
        /// The style name as authored
        style: String,
    },

    /// A directly submitted item field contains characters the local code
    /// page cannot represent.
    #[error("Item {field} contains characters outside the local code page: {characters}")]
    EncodingBypassRisk {
        /// Which item field
        field: String,
        /// The offending characters
        characters: String,
    },
}
