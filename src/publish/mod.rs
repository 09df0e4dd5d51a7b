//! Publishing a converted story through a content API.
//!
//! Text with non-ASCII characters does not survive item creation on the
//! platform, so publishing happens in two phases:
//!
//! 1. The complete story tree is built with every text leaf set to an
//!    ASCII placeholder token, and the item is created from it.
//! 2. The stored tree is fetched back, every token is replaced by its real
//!    text on the client, and the tree is written again.
//!
//! Substitution is strict: every token must appear exactly once, and no
//! unknown token may appear. Otherwise the run stops before the update
//! call and the item stays in its placeholder state.

mod api;
mod encoding;
mod memory;
mod portal;
mod substitute;

pub use api::{
    is_draft_resource, AssetUploader, ContentApi, ItemProperties, DRAFT_RESOURCE_PREFIX,
};
pub use encoding::{check_field, is_representable, unrepresentable};
pub use memory::{DraftCopy, MemoryPortal, StoredItem, TreeHook};
pub use portal::{normalize_portal_url, story_url, PortalClient};
pub use substitute::{count_tokens, substitute, verify};

use crate::convert::{ConversionStats, ConvertOptions, Converter};
use crate::error::{Error, Result, Warning};
use crate::model::{Document, Metadata, Resource, TokenKind, TokenTable};
use crate::render::{escape_text, CoverImage, StoryCover, StoryTreeBuilder};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

/// What to publish the document as.
#[derive(Debug, Clone, Default)]
pub struct StoryOptions {
    /// Story and item title
    pub title: String,
    /// Item tags
    pub tags: Vec<String>,
    /// Cover subtitle and item snippet
    pub summary: Option<String>,
    /// Item description, also placed as the first story paragraph
    pub description: Option<String>,
    /// Cover image payload
    pub cover_image: Option<Resource>,
}

impl StoryOptions {
    /// Create options with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Take title, summary, description and tags from document metadata,
    /// falling back to `default_title`.
    pub fn from_metadata(metadata: &Metadata, default_title: &str) -> Self {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Self {
            title: non_empty(&metadata.title).unwrap_or_else(|| default_title.to_string()),
            tags: metadata.tags(),
            summary: non_empty(&metadata.subject),
            description: non_empty(&metadata.description),
            cover_image: None,
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

    /// Set the cover image.
    pub fn with_cover_image(mut self, image: Resource) -> Self {
        self.cover_image = Some(image);
        self
    }

    /// Item fields sent with `create_item`.
    pub fn item_properties(&self) -> ItemProperties {
        ItemProperties {
            title: self.title.clone(),
            tags: self.tags.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
        }
    }

    /// Warn about item fields the local code page cannot carry.
    pub fn encoding_warnings(&self) -> Vec<Warning> {
        let tags = self.tags.join(",");
        let mut fields = vec![("title", self.title.as_str())];
        if let Some(summary) = &self.summary {
            fields.push(("summary", summary));
        }
        if let Some(description) = &self.description {
            fields.push(("description", description));
        }
        if !tags.is_empty() {
            fields.push(("tags", &tags));
        }
        fields
            .into_iter()
            .filter_map(|(field, value)| check_field(field, value))
            .collect()
    }
}

/// A story tree ready for item creation.
#[derive(Debug, Clone, Serialize)]
pub struct Draft {
    /// Tree with placeholder tokens in every text leaf
    pub tree: Value,
    /// Real text per token
    pub tokens: TokenTable,
    /// Item fields
    pub properties: ItemProperties,
    /// Non-fatal conditions so far
    pub warnings: Vec<Warning>,
    /// Conversion statistics
    pub stats: ConversionStats,
}

/// Result of a completed publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    /// Id of the created item
    pub item_id: String,
    /// Final tree as written
    pub tree: Value,
    /// Number of substituted values
    pub replaced: usize,
    /// Non-fatal conditions of the run
    pub warnings: Vec<Warning>,
    /// Conversion statistics
    pub stats: ConversionStats,
}

/// Runs conversion and the publish protocol against a content API.
pub struct Publisher<A: ContentApi> {
    api: A,
    options: ConvertOptions,
}

impl<A: ContentApi> Publisher<A> {
    /// Create a publisher with default conversion options.
    pub fn new(api: A) -> Self {
        Self {
            api,
            options: ConvertOptions::default(),
        }
    }

    /// Set conversion options.
    pub fn with_convert_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    /// The content API.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// The content API, mutably.
    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    /// Give back the content API.
    pub fn into_inner(self) -> A {
        self.api
    }

    /// Convert a document and publish it as a new story item.
    pub fn publish(&mut self, doc: &Document, story: &StoryOptions) -> Result<PublishOutcome> {
        let draft = self.prepare(doc, story)?;
        self.publish_draft(draft)
    }

    /// Convert a document and build its placeholder tree.
    ///
    /// Images are uploaded here; no item is created.
    pub fn prepare(&mut self, doc: &Document, story: &StoryOptions) -> Result<Draft> {
        let mut warnings = story.encoding_warnings();

        let conversion = Converter::new(self.options.clone()).convert(doc, &mut self.api)?;
        warnings.extend(conversion.warnings);
        let mut tokens = conversion.tokens;

        let image = match &story.cover_image {
            Some(resource) => {
                let name = resource.suggested_filename("cover");
                let asset = self.api.upload_asset(resource, &name)?;
                Some(CoverImage {
                    asset,
                    width: resource.width,
                    height: resource.height,
                })
            }
            None => None,
        };
        let cover = StoryCover {
            title: tokens.issue(TokenKind::Title, story.title.as_str()),
            summary: story
                .summary
                .as_deref()
                .map(|s| tokens.issue(TokenKind::Summary, s)),
            image,
        };
        let description = story
            .description
            .as_deref()
            .map(|d| tokens.issue(TokenKind::Description, escape_text(d)));

        let tree = StoryTreeBuilder::new().build(&cover, description.as_ref(), &conversion.blocks);
        let mut stats = conversion.stats;
        stats.placeholder_count = tokens.len() as u32;

        let report = verify(&tree, &tokens);
        if !report.is_clean() {
            return Err(Error::StructuralMismatch(report));
        }
        debug!("Draft tree holds {} placeholders", tokens.len());

        Ok(Draft {
            tree,
            tokens,
            properties: story.item_properties(),
            warnings,
            stats,
        })
    }

    /// Create the item from a draft, then substitute and write back.
    pub fn publish_draft(&mut self, draft: Draft) -> Result<PublishOutcome> {
        let item_id = self.api.create_item(&draft.tree, &draft.properties)?;
        info!("Created item {} with placeholder text", item_id);

        let (tree, replaced) = self
            .finish_item(&item_id, &draft.tokens)
            .map_err(|e| e.with_residual_item(item_id.as_str()))?;
        info!("Updated item {} with final text", item_id);

        Ok(PublishOutcome {
            item_id,
            tree,
            replaced,
            warnings: draft.warnings,
            stats: draft.stats,
        })
    }

    fn finish_item(&mut self, item_id: &str, tokens: &TokenTable) -> Result<(Value, usize)> {
        let mut tree = self.api.get_item_json(item_id)?;
        let replaced = substitute(&mut tree, tokens)?;
        debug!("Substituted {} placeholders", replaced);
        self.api.update_item_json(item_id, &tree)?;
        Ok((tree, replaced))
    }
}
