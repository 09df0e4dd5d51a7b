//! Storymap tree construction.
//!
//! A story is a flat node map plus a resource map, tied together by ids:
//!
//! ```text
//! root ── story ─┬─ storycover (title, summary, optional image)
//!                ├─ navigation (hidden)
//!                ├─ description paragraph (optional)
//!                ├─ content nodes ...
//!                └─ credits
//! ```
//!
//! Text leaves hold placeholder tokens; structure is final.

use crate::model::{AssetRef, ContentBlock, PlaceholderToken, TextKind};
use serde_json::{json, Map, Value};

/// Id of the story node.
pub const ROOT_NODE_ID: &str = "n-root";

/// Theme applied to new stories.
pub const DEFAULT_THEME: &str = "summit";

/// An image reference with its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    /// Uploaded asset
    pub asset: AssetRef,
    /// Width in pixels
    pub width: Option<u32>,
    /// Height in pixels
    pub height: Option<u32>,
}

/// Tokens and image of the story cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryCover {
    /// Story title
    pub title: PlaceholderToken,
    /// Subtitle shown under the title
    pub summary: Option<PlaceholderToken>,
    /// Cover image
    pub image: Option<CoverImage>,
}

/// Assembles the node and resource maps of one story.
#[derive(Debug, Default)]
pub struct StoryTreeBuilder {
    nodes: Map<String, Value>,
    resources: Map<String, Value>,
    node_seq: u32,
    resource_seq: u32,
}

impl StoryTreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the whole story tree.
    pub fn build(
        mut self,
        cover: &StoryCover,
        description: Option<&PlaceholderToken>,
        blocks: &[ContentBlock],
    ) -> Value {
        let theme = self.add_resource(json!({
            "type": "story-theme",
            "data": { "themeId": DEFAULT_THEME, "themeBaseVariableOverrides": {} }
        }));

        let mut children = Vec::with_capacity(blocks.len() + 4);
        children.push(Value::String(self.cover_node(cover)));
        children.push(Value::String(self.add_node(json!({
            "type": "navigation",
            "data": { "links": [] },
            "config": { "isHidden": true }
        }))));
        if let Some(token) = description {
            children.push(Value::String(self.add_node(text_node(token, "paragraph", None))));
        }
        for block in blocks {
            let id = self.block_node(block);
            children.push(Value::String(id));
        }
        children.push(Value::String(self.add_node(json!({ "type": "credits" }))));

        self.nodes.insert(
            ROOT_NODE_ID.to_string(),
            json!({
                "type": "story",
                "data": { "storyTheme": theme },
                "config": { "coverDate": "" },
                "children": children
            }),
        );

        json!({
            "root": ROOT_NODE_ID,
            "nodes": Value::Object(self.nodes),
            "resources": Value::Object(self.resources)
        })
    }

    fn add_node(&mut self, node: Value) -> String {
        self.node_seq += 1;
        let id = format!("n-{:04}", self.node_seq);
        self.nodes.insert(id.clone(), node);
        id
    }

    fn add_resource(&mut self, resource: Value) -> String {
        self.resource_seq += 1;
        let id = format!("r-{:04}", self.resource_seq);
        self.resources.insert(id.clone(), resource);
        id
    }

    fn cover_node(&mut self, cover: &StoryCover) -> String {
        let mut node = json!({
            "type": "storycover",
            "data": {
                "type": "minimal",
                "title": cover.title.as_str(),
                "summary": cover.summary.as_ref().map_or("", |t| t.as_str()),
                "byline": "",
                "titlePanelPosition": "start"
            }
        });
        if let Some(image) = &cover.image {
            let resource = self.add_resource(image_resource(&image.asset, image.width, image.height));
            let image_node = self.add_node(json!({
                "type": "image",
                "data": { "image": resource },
                "config": { "size": "standard" }
            }));
            node["children"] = json!([image_node]);
        }
        self.add_node(node)
    }

    fn block_node(&mut self, block: &ContentBlock) -> String {
        match block {
            ContentBlock::Text {
                kind: TextKind::Code { language },
                text,
                ..
            } => self.add_node(json!({
                "type": "code",
                "data": {
                    "content": text.as_str(),
                    "lang": language.as_str(),
                    "lineNumbers": true
                }
            })),
            ContentBlock::Text {
                kind,
                alignment,
                text,
            } => {
                let alignment = alignment.storymap_value();
                let alignment = (alignment != "start").then_some(alignment);
                self.add_node(text_node(text, kind.storymap_type(), alignment))
            }
            ContentBlock::List {
                list_type, text, ..
            } => self.add_node(text_node(text, list_type.storymap_type(), None)),
            ContentBlock::Image {
                asset,
                display,
                float_alignment,
                caption,
                alt,
                width,
                height,
            } => {
                let resource = self.add_resource(image_resource(asset, *width, *height));
                let mut data = json!({ "image": resource });
                if let Some(caption) = caption {
                    data["caption"] = json!(caption.as_str());
                }
                if let Some(alt) = alt {
                    data["alt"] = json!(alt.as_str());
                }
                let mut config = json!({ "size": display.as_str() });
                if let Some(side) = float_alignment {
                    config["floatAlignment"] = json!(side.as_str());
                }
                self.add_node(json!({ "type": "image", "data": data, "config": config }))
            }
            ContentBlock::Separator => self.add_node(json!({ "type": "separator" })),
        }
    }
}

fn text_node(token: &PlaceholderToken, text_type: &str, alignment: Option<&str>) -> Value {
    let mut data = json!({ "text": token.as_str(), "type": text_type });
    if let Some(alignment) = alignment {
        data["textAlignment"] = json!(alignment);
    }
    json!({ "type": "text", "data": data })
}

fn image_resource(asset: &AssetRef, width: Option<u32>, height: Option<u32>) -> Value {
    let mut data = match asset {
        AssetRef::ItemResource { resource_id } => json!({
            "resourceId": resource_id,
            "provider": "item-resource"
        }),
        AssetRef::Uri { src } => json!({ "src": src, "provider": "uri" }),
    };
    if let Some(width) = width {
        data["width"] = json!(width);
    }
    if let Some(height) = height {
        data["height"] = json!(height);
    }
    json!({ "type": "image", "data": data })
}

/// Ids of the story node's children, in order.
pub fn story_children(tree: &Value) -> Vec<&str> {
    let root = tree["root"].as_str().unwrap_or(ROOT_NODE_ID);
    tree["nodes"][root]["children"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
