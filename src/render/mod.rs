//! Rendering: inline markup for text leaves, the storymap node tree and
//! JSON output.

mod json;
mod markup;
mod storymap;

pub use json::{to_json, JsonFormat};
pub use markup::{escape_text, render_list, render_span, render_spans};
pub use storymap::{
    story_children, CoverImage, StoryCover, StoryTreeBuilder, DEFAULT_THEME, ROOT_NODE_ID,
};
