//! Integration tests for parsing and converting DOCX packages.

mod common;

use common::*;
use docx_storymap::model::{CodeLanguage, ImageDisplay, TextKind};
use docx_storymap::{
    parse_bytes, parse_bytes_with_options, to_storymap_json, AssetRef, ContentBlock, Conversion,
    Converter, DocxStorymap, JsonFormat, ListType, MemoryPortal, ParseOptions, Warning,
};
use serde_json::Value;

fn field_notes() -> DocxBuilder {
    DocxBuilder::new()
        .image("rId10", "image1.png", png(640, 480))
        .hyperlink("rId20", "example.com/docs")
        .property("dc:title", "Field notes")
        .property("cp:keywords", "rivers; survey")
        .push(styled("Heading1", "Field notes"))
        .push(paragraph(
            "",
            &format!("{}{}", run("Hello, ", ""), run("世界", "<w:b/>")),
        ))
        .push(list_item(1, 0, "one"))
        .push(list_item(1, 1, "two"))
        .push(list_item(1, 2, "three"))
        .push(paragraph("", &inline_image("rId10", "Valley map")))
        .push(styled("Caption", "Figure 1: Valley"))
        .push(styled("Code", "SELECT name"))
        .push(styled("Code", "FROM parcels;"))
        .push(table("cell"))
        .push(paragraph(
            "",
            &format!(
                r#"{}<w:hyperlink r:id="rId20">{}</w:hyperlink>"#,
                run("See ", ""),
                run("docs", "")
            ),
        ))
}

fn convert(builder: &DocxBuilder) -> (Conversion, MemoryPortal) {
    let doc = parse_bytes(&builder.build()).unwrap();
    let mut portal = MemoryPortal::new();
    let conversion = Converter::default().convert(&doc, &mut portal).unwrap();
    (conversion, portal)
}

fn text_of<'a>(conversion: &'a Conversion, block: &ContentBlock) -> Vec<&'a str> {
    block
        .tokens()
        .into_iter()
        .map(|t| conversion.tokens.get(t.as_str()).unwrap())
        .collect()
}

#[test]
fn test_parse_metadata_and_body() {
    let doc = parse_bytes(&field_notes().build()).unwrap();

    assert_eq!(doc.metadata.title.as_deref(), Some("Field notes"));
    assert_eq!(doc.metadata.tags(), vec!["rivers", "survey"]);
    assert_eq!(doc.anchor_count(), 1);
    assert!(doc.get_resource("rId10").is_some());
    assert!(doc.plain_text().contains("Hello, 世界"));
}

#[test]
fn test_convert_field_notes() {
    let (conversion, portal) = convert(&field_notes());
    let blocks = &conversion.blocks;
    assert_eq!(blocks.len(), 6);

    assert!(matches!(
        &blocks[0],
        ContentBlock::Text { kind: TextKind::Heading { level: 1 }, .. }
    ));
    assert_eq!(text_of(&conversion, &blocks[0]), vec!["Field notes"]);

    assert!(matches!(
        &blocks[1],
        ContentBlock::Text { kind: TextKind::Paragraph, .. }
    ));
    assert_eq!(
        text_of(&conversion, &blocks[1]),
        vec!["Hello, <strong>世界</strong>"]
    );

    match &blocks[2] {
        ContentBlock::List {
            list_type,
            item_count,
            max_depth,
            ..
        } => {
            assert_eq!(*list_type, ListType::Ordered);
            assert_eq!(*item_count, 3);
            assert_eq!(*max_depth, 1);
        }
        other => panic!("expected a list, got {:?}", other),
    }
    assert_eq!(
        text_of(&conversion, &blocks[2]),
        vec!["<li>one<ol><li>two</li><li>--- three</li></ol></li>"]
    );

    match &blocks[3] {
        ContentBlock::Image {
            asset,
            display,
            float_alignment,
            width,
            height,
            ..
        } => {
            assert_eq!(
                *asset,
                AssetRef::ItemResource {
                    resource_id: "image1.png".to_string()
                }
            );
            assert_eq!(*display, ImageDisplay::Standard);
            assert_eq!(*float_alignment, None);
            assert_eq!((*width, *height), (Some(640), Some(480)));
        }
        other => panic!("expected an image, got {:?}", other),
    }
    assert_eq!(
        text_of(&conversion, &blocks[3]),
        vec!["Figure 1: Valley", "Valley map"]
    );

    assert!(matches!(
        &blocks[4],
        ContentBlock::Text { kind: TextKind::Code { language: CodeLanguage::Sql }, .. }
    ));
    assert_eq!(
        text_of(&conversion, &blocks[4]),
        vec!["SELECT name\nFROM parcels;"]
    );

    assert_eq!(
        text_of(&conversion, &blocks[5]),
        vec![
            "See <a href=\"https://example.com/docs\" rel=\"noopener noreferrer\" target=\"_blank\">docs</a>"
        ]
    );

    assert_eq!(portal.asset_names(), vec!["image1.png"]);
    assert!(conversion.warnings.is_empty());
}

#[test]
fn test_conversion_stats() {
    let (conversion, _) = convert(&field_notes());
    let stats = &conversion.stats;

    assert_eq!(stats.table_count, 1);
    assert_eq!(stats.list_count, 1);
    assert_eq!(stats.list_item_count, 3);
    assert_eq!(stats.coerced_item_count, 2);
    assert_eq!(stats.flattened_item_count, 1);
    assert_eq!(stats.image_count, 1);
    assert_eq!(stats.caption_count, 1);
    assert_eq!(stats.skipped_image_count, 0);
    assert_eq!(stats.placeholder_count as usize, conversion.tokens.len());
}

#[test]
fn test_missing_image_payload_is_skipped() {
    let builder = DocxBuilder::new()
        .push(text("Before"))
        .push(paragraph("", &inline_image("rId99", "Lost")))
        .push(styled("Caption", "Orphan caption"))
        .push(text("After"));
    let (conversion, portal) = convert(&builder);

    assert!(portal.asset_names().is_empty());
    assert_eq!(conversion.stats.skipped_image_count, 1);
    assert!(matches!(
        &conversion.warnings[..],
        [Warning::AssetResolution { reference, .. }] if reference == "rId99"
    ));

    let texts: Vec<&str> = conversion
        .blocks
        .iter()
        .flat_map(|b| text_of(&conversion, b))
        .collect();
    assert_eq!(texts, vec!["Before", "Orphan caption", "After"]);
}

#[test]
fn test_floating_image_beside_text() {
    let builder = DocxBuilder::new()
        .image("rId3", "side.png", png(300, 200))
        .push(paragraph(
            "",
            &format!("{}{}", run("Beside the map", ""), floating_image("rId3", "right")),
        ));
    let (conversion, _) = convert(&builder);

    assert_eq!(conversion.blocks.len(), 2);
    assert_eq!(text_of(&conversion, &conversion.blocks[0]), vec!["Beside the map"]);
    assert!(matches!(
        &conversion.blocks[1],
        ContentBlock::Image {
            display: ImageDisplay::Float,
            float_alignment: Some(side),
            ..
        } if side.as_str() == "end"
    ));
}

#[test]
fn test_unsupported_style_warned_once() {
    let builder = DocxBuilder::new()
        .push(styled("Fancy", "One"))
        .push(styled("Fancy", "Two"))
        .push(styled("Quote", "Said"));
    let (conversion, _) = convert(&builder);

    assert_eq!(
        conversion.warnings,
        vec![Warning::UnsupportedStyle {
            style: "Fancy Banner".to_string()
        }]
    );
    assert_eq!(conversion.blocks.len(), 3);
    assert!(matches!(
        &conversion.blocks[2],
        ContentBlock::Text { kind: TextKind::Quote, .. }
    ));
}

#[test]
fn test_bullet_first_list_stays_unordered() {
    let builder = DocxBuilder::new()
        .push(list_item(2, 0, "alpha"))
        .push(list_item(1, 0, "beta"))
        .push(text("done"));
    let (conversion, _) = convert(&builder);

    assert!(matches!(
        &conversion.blocks[0],
        ContentBlock::List { list_type: ListType::Unordered, item_count: 2, .. }
    ));
    assert_eq!(
        text_of(&conversion, &conversion.blocks[0]),
        vec!["<li>alpha</li><li>beta</li>"]
    );
}

#[test]
fn test_blank_paragraph_keeps_spacing() {
    let builder = DocxBuilder::new()
        .push(text("Top"))
        .push("<w:p/>")
        .push(text("Bottom"));
    let (conversion, _) = convert(&builder);

    let texts: Vec<&str> = conversion
        .blocks
        .iter()
        .flat_map(|b| text_of(&conversion, b))
        .collect();
    assert_eq!(texts, vec!["Top", " ", "Bottom"]);
}

#[test]
fn test_text_only_skips_images() {
    let data = field_notes().build();
    let doc = parse_bytes_with_options(&data, ParseOptions::new().text_only()).unwrap();
    assert!(doc.resources.is_empty());

    let mut portal = MemoryPortal::new();
    let conversion = Converter::default().convert(&doc, &mut portal).unwrap();
    assert_eq!(conversion.stats.skipped_image_count, 1);
    assert!(portal.asset_names().is_empty());
}

#[test]
fn test_builder_without_code_merge() {
    let parsed = DocxStorymap::new()
        .with_code_merge(false)
        .parse_bytes(&field_notes().build())
        .unwrap();
    let conversion = parsed.convert(&mut MemoryPortal::new()).unwrap();

    // Code paragraphs stay separate.
    assert_eq!(conversion.blocks.len(), 7);
}

#[test]
fn test_to_storymap_json_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = field_notes().write_to(dir.path(), "notes.docx");

    let json = to_storymap_json(&path, JsonFormat::Compact).unwrap();
    let tree: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(tree["root"], "n-root");
    let text = json.as_str();
    assert!(text.contains("Hello, <strong>世界</strong>"));
    assert!(!text.contains("PLACEHOLDER_"));
}

#[test]
fn test_html_page_to_storymap_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("valley.png"), png(640, 480)).unwrap();
    let path = dir.path().join("notes.html");
    std::fs::write(
        &path,
        r#"<!DOCTYPE html>
<html>
  <head><title>Field notes</title></head>
  <body>
    <h1>Survey</h1>
    <p>Hello, <strong>世界</strong></p>
    <hr>
    <ul><li>one</li><li>two</li></ul>
    <figure>
      <img src="valley.png" alt="Valley map">
      <figcaption>Figure 1: Valley</figcaption>
    </figure>
  </body>
</html>"#,
    )
    .unwrap();

    let json = to_storymap_json(&path, JsonFormat::Compact).unwrap();
    let tree: Value = serde_json::from_str(&json).unwrap();
    let nodes = &tree["nodes"];
    let children: Vec<&Value> = nodes["n-root"]["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|id| &nodes[id.as_str().unwrap()])
        .collect();
    let types: Vec<&str> = children
        .iter()
        .map(|n| n["data"]["type"].as_str().unwrap_or(n["type"].as_str().unwrap()))
        .collect();

    assert_eq!(
        types,
        vec![
            "minimal",
            "navigation",
            "h2",
            "paragraph",
            "separator",
            "bullet-list",
            "image",
            "credits"
        ]
    );
    assert_eq!(children[0]["data"]["title"], "Field notes");
    assert_eq!(children[6]["data"]["caption"], "Figure 1: Valley");
    assert_eq!(children[6]["data"]["alt"], "Valley map");
    assert!(json.contains("Hello, <strong>世界</strong>"));
    assert!(!json.contains("PLACEHOLDER_"));
}
