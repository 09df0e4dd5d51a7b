//! In-process content store.
//!
//! Behaves like a portal for the purposes of the publish protocol: items get
//! ids, trees round-trip through storage and assets become item resources.
//! With builder drafts enabled, each item also gets a `draft_*.json` working
//! copy that reads prefer and updates keep in step, as the story builder
//! does on a portal. In lossy mode it reproduces the platform encoding defect by replacing
//! non-ASCII characters with `?` in everything submitted at creation time.

use super::api::{AssetUploader, ContentApi, ItemProperties, DRAFT_RESOURCE_PREFIX};
use crate::error::{Error, RemoteStep, Result};
use crate::model::{AssetRef, Resource};
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Hook applied to a stored tree when it is read back.
pub type TreeHook = Box<dyn FnMut(&mut Value) + Send>;

/// An item held by [`MemoryPortal`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    /// Item fields as received
    pub properties: ItemProperties,
    /// Current tree
    pub data: Value,
    /// Builder draft resource, when the store keeps one
    pub draft: Option<DraftCopy>,
    /// Number of times the tree was replaced
    pub revisions: u32,
}

/// The builder's working copy of a story tree, kept as an item resource.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftCopy {
    /// Resource name, `draft_*.json`
    pub name: String,
    /// Tree held in the resource
    pub data: Value,
}

/// A content store living in memory.
pub struct MemoryPortal {
    items: BTreeMap<String, StoredItem>,
    assets: BTreeMap<String, Resource>,
    calls: Vec<RemoteStep>,
    lossy: bool,
    drafts: bool,
    fail_on: Option<RemoteStep>,
    on_read: Option<TreeHook>,
    next_id: u32,
}

impl MemoryPortal {
    /// Create an empty store that keeps text intact.
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            assets: BTreeMap::new(),
            calls: Vec::new(),
            lossy: false,
            drafts: false,
            fail_on: None,
            on_read: None,
            next_id: 0,
        }
    }

    /// Create a store that corrupts non-ASCII text at item creation.
    pub fn lossy() -> Self {
        Self {
            lossy: true,
            ..Self::new()
        }
    }

    /// Give every created item a builder draft resource.
    pub fn with_builder_drafts(mut self) -> Self {
        self.drafts = true;
        self
    }

    /// Fail every call of the given step.
    pub fn with_failure(mut self, step: RemoteStep) -> Self {
        self.fail_on = Some(step);
        self
    }

    /// Alter trees as they are read back, e.g. to simulate server-side drift.
    pub fn with_read_hook(mut self, hook: impl FnMut(&mut Value) + Send + 'static) -> Self {
        self.on_read = Some(Box::new(hook));
        self
    }

    /// Look up an item.
    pub fn item(&self, item_id: &str) -> Option<&StoredItem> {
        self.items.get(item_id)
    }

    /// Number of stored items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Names of uploaded assets.
    pub fn asset_names(&self) -> Vec<&str> {
        self.assets.keys().map(String::as_str).collect()
    }

    /// Every remote step invoked so far, in order.
    pub fn calls(&self) -> &[RemoteStep] {
        &self.calls
    }

    fn enter(&mut self, step: RemoteStep) -> Result<()> {
        self.calls.push(step);
        if self.fail_on == Some(step) {
            return Err(Error::remote(step, "simulated failure"));
        }
        Ok(())
    }

    fn degrade(&self, text: &str) -> String {
        if self.lossy {
            degrade_text(text)
        } else {
            text.to_string()
        }
    }
}

impl Default for MemoryPortal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryPortal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPortal")
            .field("items", &self.items.len())
            .field("assets", &self.assets.len())
            .field("lossy", &self.lossy)
            .field("drafts", &self.drafts)
            .field("fail_on", &self.fail_on)
            .finish()
    }
}

impl AssetUploader for MemoryPortal {
    fn upload_asset(&mut self, resource: &Resource, name: &str) -> Result<AssetRef> {
        self.enter(RemoteStep::UploadAsset)?;
        let mut resource_id = name.to_string();
        let mut n = 1;
        while self.assets.contains_key(&resource_id) {
            n += 1;
            resource_id = format!("{}-{}", n, name);
        }
        self.assets.insert(resource_id.clone(), resource.clone());
        Ok(AssetRef::ItemResource { resource_id })
    }
}

impl ContentApi for MemoryPortal {
    fn create_item(&mut self, draft: &Value, properties: &ItemProperties) -> Result<String> {
        self.enter(RemoteStep::CreateItem)?;
        self.next_id += 1;
        let item_id = format!("item-{:04}", self.next_id);

        let mut data = draft.clone();
        if self.lossy {
            degrade_strings(&mut data);
        }
        let properties = ItemProperties {
            title: self.degrade(&properties.title),
            tags: properties.tags.iter().map(|t| self.degrade(t)).collect(),
            summary: properties.summary.as_deref().map(|s| self.degrade(s)),
            description: properties.description.as_deref().map(|s| self.degrade(s)),
        };

        let draft = self.drafts.then(|| DraftCopy {
            name: format!("{}{:04}.json", DRAFT_RESOURCE_PREFIX, self.next_id),
            data: data.clone(),
        });

        debug!("Stored {} ({})", item_id, properties.title);
        self.items.insert(
            item_id.clone(),
            StoredItem {
                properties,
                data,
                draft,
                revisions: 0,
            },
        );
        Ok(item_id)
    }

    fn get_item_json(&mut self, item_id: &str) -> Result<Value> {
        self.enter(RemoteStep::GetItemJson)?;
        let mut data = self
            .items
            .get(item_id)
            .map(|item| match &item.draft {
                Some(draft) => draft.data.clone(),
                None => item.data.clone(),
            })
            .ok_or_else(|| Error::remote(RemoteStep::GetItemJson, format!("item {} not found", item_id)))?;
        if let Some(hook) = self.on_read.as_mut() {
            hook(&mut data);
        }
        Ok(data)
    }

    fn update_item_json(&mut self, item_id: &str, tree: &Value) -> Result<()> {
        self.enter(RemoteStep::UpdateItemJson)?;
        let item = self.items.get_mut(item_id).ok_or_else(|| {
            Error::remote(RemoteStep::UpdateItemJson, format!("item {} not found", item_id))
        })?;
        item.data = tree.clone();
        if let Some(draft) = item.draft.as_mut() {
            draft.data = tree.clone();
        }
        item.revisions += 1;
        Ok(())
    }
}

fn degrade_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

fn degrade_strings(value: &mut Value) {
    match value {
        Value::String(s) => *s = degrade_text(s),
        Value::Array(items) => items.iter_mut().for_each(degrade_strings),
        Value::Object(map) => map.values_mut().for_each(degrade_strings),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
