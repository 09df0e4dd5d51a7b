//! Remote content API seams.

use crate::error::Result;
use crate::model::{AssetRef, Resource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stores image payloads and hands back a reference usable in a story tree.
pub trait AssetUploader {
    /// Upload one image payload under a file name.
    fn upload_asset(&mut self, resource: &Resource, name: &str) -> Result<AssetRef>;
}

/// Item-level operations of a content store.
///
/// Every call is blocking. Failures are reported as
/// [`Error::RemoteCall`](crate::Error::RemoteCall) naming the step.
pub trait ContentApi: AssetUploader {
    /// Create a story item from a draft tree; returns the new item id.
    fn create_item(&mut self, draft: &Value, properties: &ItemProperties) -> Result<String>;

    /// Fetch the tree of an item as stored. When the item carries a builder
    /// draft resource (`draft_*.json`), the draft is read instead of the
    /// item data.
    fn get_item_json(&mut self, item_id: &str) -> Result<Value>;

    /// Replace the tree of an item, in the item data and in its builder
    /// draft resource when there is one.
    fn update_item_json(&mut self, item_id: &str, tree: &Value) -> Result<()>;
}

/// Prefix of the resource the story builder keeps its working copy in.
pub const DRAFT_RESOURCE_PREFIX: &str = "draft_";

/// Check whether an item resource name is a builder draft.
pub fn is_draft_resource(name: &str) -> bool {
    name.starts_with(DRAFT_RESOURCE_PREFIX) && name.ends_with(".json")
}

/// Item fields sent directly with `create_item`.
///
/// These travel outside the story tree and are not protected by
/// placeholder substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProperties {
    /// Item title
    pub title: String,

    /// Item tags
    pub tags: Vec<String>,

    /// Short summary (the item snippet)
    pub summary: Option<String>,

    /// Longer description
    pub description: Option<String>,
}

impl ItemProperties {
    /// Create properties with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Tags joined the way the portal expects them.
    pub fn tags_field(&self) -> String {
        self.tags.join(",")
    }
}
