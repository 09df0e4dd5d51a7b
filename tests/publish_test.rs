//! Integration tests for the placeholder publish protocol.

mod common;

use common::*;
use docx_storymap::publish::count_tokens;
use docx_storymap::render::story_children;
use docx_storymap::{
    parse_bytes, publish_file, Document, Error, MemoryPortal, PublishOutcome, Publisher,
    RemoteStep, Resource, StoryOptions, Warning,
};
use regex::Regex;
use serde_json::{json, Value};

fn hello_world() -> Document {
    let data = DocxBuilder::new()
        .image("rId4", "image1.png", png(800, 600))
        .push(styled("Heading1", "Río Grande"))
        .push(paragraph(
            "",
            &format!("{}{}", run("Hello, ", ""), run("世界", "<w:b/>")),
        ))
        .push(list_item(2, 0, "Ñandú"))
        .push(list_item(2, 1, "Ω"))
        .push(paragraph("", &inline_image("rId4", "Mapa del río")))
        .push(styled("Caption", "Vista «norte»"))
        .build();
    parse_bytes(&data).unwrap()
}

fn strings(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().flat_map(strings).collect(),
        Value::Object(map) => map.values().flat_map(strings).collect(),
        _ => Vec::new(),
    }
}

fn nodes_of_type<'a>(tree: &'a Value, node_type: &str) -> Vec<&'a Value> {
    tree["nodes"]
        .as_object()
        .map(|nodes| {
            nodes
                .values()
                .filter(|n| n["type"] == node_type)
                .collect()
        })
        .unwrap_or_default()
}

/// Overwrite the first string value starting with `prefix`.
fn replace_first(value: &mut Value, prefix: &str, with: &str) -> bool {
    match value {
        Value::String(s) if s.starts_with(prefix) => {
            *s = with.to_string();
            true
        }
        Value::Array(items) => items.iter_mut().any(|v| replace_first(v, prefix, with)),
        Value::Object(map) => map.values_mut().any(|v| replace_first(v, prefix, with)),
        _ => false,
    }
}

fn publish(
    portal: MemoryPortal,
    story: &StoryOptions,
) -> (docx_storymap::Result<PublishOutcome>, MemoryPortal) {
    let mut publisher = Publisher::new(portal);
    let result = publisher.publish(&hello_world(), story);
    (result, publisher.into_inner())
}

#[test]
fn test_non_ascii_survives_lossy_portal() {
    let story = StoryOptions::new("Río notes").with_summary("Spring survey");
    let (result, portal) = publish(MemoryPortal::lossy(), &story);
    let outcome = result.unwrap();

    let stored = portal.item(&outcome.item_id).unwrap();
    assert_eq!(stored.data, outcome.tree);
    assert_eq!(stored.revisions, 1);

    let texts = strings(&stored.data);
    assert!(texts.contains(&"Río Grande"));
    assert!(texts.contains(&"Hello, <strong>世界</strong>"));
    assert!(texts.contains(&"<li>Ñandú<ul><li>Ω</li></ul></li>"));
    assert!(texts.contains(&"Vista «norte»"));
    assert!(texts.contains(&"Mapa del río"));
    assert!(texts.contains(&"Río notes"));
    assert!(!texts.iter().any(|t| t.contains("PLACEHOLDER_")));

    // Directly submitted item fields are not protected.
    assert_eq!(stored.properties.title, "R?o notes");
    assert_eq!(
        portal.calls(),
        &[
            RemoteStep::UploadAsset,
            RemoteStep::CreateItem,
            RemoteStep::GetItemJson,
            RemoteStep::UpdateItemJson
        ]
    );
}

#[test]
fn test_draft_is_ascii_with_unique_tokens() {
    let mut publisher = Publisher::new(MemoryPortal::new());
    let story = StoryOptions::new("Río notes")
        .with_summary("Primavera")
        .with_description("Notas de campo");
    let draft = publisher.prepare(&hello_world(), &story).unwrap();

    assert!(strings(&draft.tree).iter().all(|s| s.is_ascii()));

    let shape = Regex::new(r"^PLACEHOLDER_[A-Z]+_\d{4}$").unwrap();
    let counts = count_tokens(&draft.tree);
    assert_eq!(counts.len(), draft.tokens.len());
    for (token, count) in &counts {
        assert_eq!(*count, 1, "{} appears {} times", token, count);
        assert!(shape.is_match(token), "malformed token {}", token);
        assert!(draft.tokens.contains(token));
    }
    assert_eq!(draft.stats.placeholder_count as usize, draft.tokens.len());

    // Nothing was created yet.
    assert_eq!(publisher.api().item_count(), 0);
}

#[test]
fn test_story_layout() {
    let image = Resource::png(png(1600, 900)).with_dimensions(1600, 900);
    let story = StoryOptions::new("Field notes")
        .with_description("Notes & <sketches>")
        .with_cover_image(image);
    let (result, portal) = publish(MemoryPortal::new(), &story);
    let outcome = result.unwrap();
    let tree = &outcome.tree;

    let children = story_children(tree);
    let types: Vec<&str> = children
        .iter()
        .map(|id| tree["nodes"][*id]["type"].as_str().unwrap())
        .collect();
    assert_eq!(types.first(), Some(&"storycover"));
    assert_eq!(types[1], "navigation");
    assert_eq!(types.last(), Some(&"credits"));

    let description = &tree["nodes"][children[2]]["data"];
    assert_eq!(description["text"], "Notes &amp; &lt;sketches&gt;");

    let cover = nodes_of_type(tree, "storycover")[0];
    assert_eq!(cover["data"]["title"], "Field notes");
    assert_eq!(cover["children"].as_array().map(Vec::len), Some(1));

    assert!(portal.asset_names().contains(&"cover.png"));
    assert_eq!(
        portal.item(&outcome.item_id).unwrap().properties.description.as_deref(),
        Some("Notes & <sketches>")
    );
}

#[test]
fn test_lost_token_stops_before_update() {
    let portal = MemoryPortal::lossy().with_read_hook(|tree| {
        replace_first(tree, "PLACEHOLDER_TEXT_", "edited on the server");
    });
    let (result, portal) = publish(portal, &StoryOptions::new("Notes"));

    let err = result.unwrap_err();
    assert_eq!(err.residual_item(), Some("item-0001"));
    let report = err.mismatch().expect("structural mismatch");
    assert_eq!(report.missing.len(), 1);
    assert!(report.duplicated.is_empty());
    assert!(report.unknown.is_empty());
    assert!(!portal.calls().contains(&RemoteStep::UpdateItemJson));
    let stored = portal.item("item-0001").unwrap();
    assert_eq!(stored.revisions, 0);
    assert!(strings(&stored.data).iter().any(|s| s.starts_with("PLACEHOLDER_")));
}

#[test]
fn test_unknown_and_duplicated_tokens() {
    let portal = MemoryPortal::new().with_read_hook(|tree| {
        let title = nodes_of_type(tree, "storycover")[0]["data"]["title"].clone();
        tree["nodes"]["n-9998"] = json!({ "type": "text", "data": { "text": title } });
        tree["nodes"]["n-9999"] =
            json!({ "type": "text", "data": { "text": "PLACEHOLDER_TEXT_9999" } });
    });
    let (result, portal) = publish(portal, &StoryOptions::new("Notes"));

    match result {
        Err(Error::ResidualItem { item_id, source }) => {
            assert_eq!(item_id, "item-0001");
            let Error::StructuralMismatch(report) = *source else {
                panic!("expected a structural mismatch");
            };
            assert!(report.missing.is_empty());
            assert_eq!(report.duplicated.len(), 1);
            assert!(report.duplicated[0].starts_with("PLACEHOLDER_TITLE_"));
            assert_eq!(report.unknown, vec!["PLACEHOLDER_TEXT_9999".to_string()]);
        }
        other => panic!("expected a structural mismatch, got {:?}", other),
    }
    assert_eq!(portal.item("item-0001").unwrap().revisions, 0);
}

#[test]
fn test_remote_failures_name_their_step() {
    let (result, portal) = publish(
        MemoryPortal::new().with_failure(RemoteStep::UploadAsset),
        &StoryOptions::new("Notes"),
    );
    assert_eq!(result.unwrap_err().remote_step(), Some(RemoteStep::UploadAsset));
    assert_eq!(portal.item_count(), 0);

    let (result, portal) = publish(
        MemoryPortal::new().with_failure(RemoteStep::CreateItem),
        &StoryOptions::new("Notes"),
    );
    assert_eq!(result.unwrap_err().remote_step(), Some(RemoteStep::CreateItem));
    assert_eq!(portal.item_count(), 0);

    let (result, portal) = publish(
        MemoryPortal::new().with_failure(RemoteStep::UpdateItemJson),
        &StoryOptions::new("Notes"),
    );
    let err = result.unwrap_err();
    assert_eq!(err.remote_step(), Some(RemoteStep::UpdateItemJson));
    assert_eq!(err.residual_item(), Some("item-0001"));
    assert_eq!(portal.item("item-0001").unwrap().revisions, 0);
}

#[test]
fn test_builder_draft_receives_final_text() {
    let story = StoryOptions::new("Río notes");
    let (result, portal) = publish(MemoryPortal::lossy().with_builder_drafts(), &story);
    let outcome = result.unwrap();

    let stored = portal.item(&outcome.item_id).unwrap();
    let draft = stored.draft.as_ref().expect("draft resource");
    assert!(draft.name.starts_with("draft_"));
    assert_eq!(draft.data, outcome.tree);
    assert_eq!(stored.data, outcome.tree);
    assert!(strings(&draft.data).contains(&"Hello, <strong>世界</strong>"));
}

#[test]
fn test_encoding_risk_reported() {
    let story = StoryOptions::new("Café").with_summary("Hello, 世界");
    let (result, _) = publish(MemoryPortal::new(), &story);
    let outcome = result.unwrap();

    let risks: Vec<&Warning> = outcome
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::EncodingBypassRisk { .. }))
        .collect();
    assert_eq!(risks.len(), 1);
    assert!(matches!(
        risks[0],
        Warning::EncodingBypassRisk { field, characters } if field == "summary" && characters.contains('世')
    ));
}

#[test]
fn test_publish_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = DocxBuilder::new()
        .push(text("Uno, dos, tres"))
        .write_to(dir.path(), "conteo.docx");

    let outcome = publish_file(&path, MemoryPortal::lossy(), &StoryOptions::new("Conteo")).unwrap();
    assert_eq!(outcome.replaced, 2);
    assert!(strings(&outcome.tree).contains(&"Uno, dos, tres"));
}
