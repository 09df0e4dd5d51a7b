//! List normalization: contiguous list-item paragraphs become list blocks
//! with a single list type and at most two rendered levels.

use crate::model::{
    Element, ListBlock, ListItem, ListType, Paragraph, DEPTH_MARKER, MAX_LIST_DEPTH,
};
use log::debug;

/// Depth and type decision for one list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercedEntry {
    /// Rendered depth (0 or 1)
    pub depth: u8,
    /// Depth after clamping, before remapping
    pub nesting_depth: u8,
    /// Simulated-depth prefix
    pub prefix: String,
    /// Whether the authored type differed from the block type
    pub coerced: bool,
}

/// Coerce a flat `(authored depth, authored type)` sequence.
///
/// Depths are taken relative to the shallowest entry of the run and clamped
/// so that no level is skipped; depths past [`MAX_LIST_DEPTH`] render at that depth with
/// one [`DEPTH_MARKER`] per extra level. The first entry's type is
/// authoritative for the whole run.
pub fn coerce_entries(entries: &[(u8, ListType)]) -> (ListType, Vec<CoercedEntry>) {
    let Some(&(_, block_type)) = entries.first() else {
        return (ListType::default(), Vec::new());
    };
    let base = entries.iter().map(|&(depth, _)| depth).min().unwrap_or(0);

    let mut previous: Option<u8> = None;
    let coerced = entries
        .iter()
        .map(|&(authored, list_type)| {
            let allowed = previous.map_or(0, |p| p.saturating_add(1));
            let nesting_depth = authored.saturating_sub(base).min(allowed);
            previous = Some(nesting_depth);

            let (depth, prefix) = if nesting_depth > MAX_LIST_DEPTH {
                let extra = usize::from(nesting_depth - MAX_LIST_DEPTH);
                (MAX_LIST_DEPTH, DEPTH_MARKER.repeat(extra))
            } else {
                (nesting_depth, String::new())
            };

            CoercedEntry {
                depth,
                nesting_depth,
                prefix,
                coerced: list_type != block_type,
            }
        })
        .collect();

    (block_type, coerced)
}

/// Replace runs of list-item paragraphs with list blocks.
pub fn normalize_lists(paragraphs: Vec<Paragraph>) -> Vec<Element> {
    let mut elements = Vec::with_capacity(paragraphs.len());
    let mut pending: Vec<Paragraph> = Vec::new();

    for paragraph in paragraphs {
        if paragraph.is_list_item() {
            pending.push(paragraph);
            continue;
        }
        if !pending.is_empty() {
            elements.push(Element::List(build_block(std::mem::take(&mut pending))));
        }
        elements.push(Element::Paragraph(paragraph));
    }
    if !pending.is_empty() {
        elements.push(Element::List(build_block(pending)));
    }
    elements
}

fn build_block(run: Vec<Paragraph>) -> ListBlock {
    let entries: Vec<(u8, ListType)> = run
        .iter()
        .map(|p| {
            p.list
                .map(|m| (m.depth, m.list_type))
                .unwrap_or((0, ListType::default()))
        })
        .collect();
    let (list_type, coerced) = coerce_entries(&entries);

    let mut block = ListBlock::new(list_type);
    for (paragraph, entry) in run.into_iter().zip(coerced) {
        block.items.push(ListItem {
            depth: entry.depth,
            nesting_depth: entry.nesting_depth,
            prefix: entry.prefix,
            coerced: entry.coerced,
            spans: paragraph.spans,
            source_index: paragraph.source_index,
        });
    }

    debug!(
        "List block: {} items as {:?} ({} coerced, {} flattened)",
        block.len(),
        block.list_type,
        block.coerced_count(),
        block.flattened_count()
    );
    block
}
