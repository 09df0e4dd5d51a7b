//! Strict placeholder substitution over a retrieved story tree.
//!
//! The walk runs in two passes. The first only counts: every table token
//! must appear exactly once as a string value and no other
//! placeholder-shaped value may appear. The second pass replaces, and runs
//! only when the first found nothing wrong, so a failed check leaves the
//! tree untouched.

use crate::error::{Error, MismatchReport, Result};
use crate::model::{PlaceholderToken, TokenTable};
use serde_json::Value;
use std::collections::BTreeMap;

/// Count placeholder-shaped string values in a tree. Object keys are not
/// counted.
pub fn count_tokens(tree: &Value) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    visit(tree, &mut |s| {
        if PlaceholderToken::looks_like(s) {
            *counts.entry(s.to_string()).or_insert(0) += 1;
        }
    });
    counts
}

/// Compare a tree against the token table without modifying it.
pub fn verify(tree: &Value, tokens: &TokenTable) -> MismatchReport {
    let counts = count_tokens(tree);
    let mut report = MismatchReport::default();

    for (token, _) in tokens.iter() {
        match counts.get(token.as_str()).copied().unwrap_or(0) {
            0 => report.missing.push(token.to_string()),
            1 => {}
            _ => report.duplicated.push(token.to_string()),
        }
    }
    report.unknown = counts
        .keys()
        .filter(|value| !tokens.contains(value))
        .cloned()
        .collect();

    report
}

/// Replace every token in `tree` with its real text.
///
/// Returns the number of replaced values. On any mismatch the tree is left
/// as it was and [`Error::StructuralMismatch`] is returned.
pub fn substitute(tree: &mut Value, tokens: &TokenTable) -> Result<usize> {
    let report = verify(tree, tokens);
    if !report.is_clean() {
        return Err(Error::StructuralMismatch(report));
    }

    let mut replaced = 0;
    replace(tree, tokens, &mut replaced);
    Ok(replaced)
}

fn visit<'v>(value: &'v Value, f: &mut impl FnMut(&'v str)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|v| visit(v, f)),
        Value::Object(map) => map.values().for_each(|v| visit(v, f)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn replace(value: &mut Value, tokens: &TokenTable, replaced: &mut usize) {
    match value {
        Value::String(s) => {
            if let Some(text) = tokens.get(s) {
                *s = text.to_string();
                *replaced += 1;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| replace(v, tokens, replaced)),
        Value::Object(map) => map.values_mut().for_each(|v| replace(v, tokens, replaced)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenKind;
    use serde_json::json;

    fn fixture() -> (Value, TokenTable) {
        let mut tokens = TokenTable::new();
        let title = tokens.issue(TokenKind::Title, "Río Grande");
        let text = tokens.issue(TokenKind::Text, "Hello, 世界");
        let tree = json!({
            "root": "n-root",
            "nodes": {
                "n-0001": { "type": "storycover", "data": { "title": title.as_str() } },
                "n-0002": { "type": "text", "data": { "text": text.as_str(), "type": "paragraph" } }
            }
        });
        (tree, tokens)
    }

    #[test]
    fn test_substitute_round_trip() {
        let (mut tree, tokens) = fixture();
        let original = tree.clone();

        assert_eq!(substitute(&mut tree, &tokens).unwrap(), 2);
        assert_eq!(tree["nodes"]["n-0002"]["data"]["text"], "Hello, 世界");
        assert_eq!(tree["nodes"]["n-0001"]["data"]["title"], "Río Grande");

        // Only the substituted leaves differ.
        tree["nodes"]["n-0001"]["data"]["title"] = original["nodes"]["n-0001"]["data"]["title"].clone();
        tree["nodes"]["n-0002"]["data"]["text"] = original["nodes"]["n-0002"]["data"]["text"].clone();
        assert_eq!(tree, original);
    }

    #[test]
    fn test_missing_token_leaves_tree_untouched() {
        let (mut tree, tokens) = fixture();
        tree["nodes"]["n-0002"]["data"]["text"] = json!("Hello, ??");
        let before = tree.clone();

        match substitute(&mut tree, &tokens) {
            Err(Error::StructuralMismatch(report)) => {
                assert_eq!(report.missing, vec!["PLACEHOLDER_TEXT_0002"]);
                assert!(report.unknown.is_empty());
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
        assert_eq!(tree, before);
    }

    #[test]
    fn test_duplicated_and_unknown_tokens() {
        let (mut tree, tokens) = fixture();
        tree["nodes"]["n-0003"] = json!({ "data": { "text": "PLACEHOLDER_TEXT_0002" } });
        tree["nodes"]["n-0004"] = json!({ "data": { "text": "PLACEHOLDER_TEXT_0042" } });

        let report = verify(&tree, &tokens);
        assert_eq!(report.duplicated, vec!["PLACEHOLDER_TEXT_0002"]);
        assert_eq!(report.unknown, vec!["PLACEHOLDER_TEXT_0042"]);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_count_ignores_keys_and_plain_values() {
        let tree = json!({
            "PLACEHOLDER_TEXT_0001": "plain",
            "list": ["PLACEHOLDER_LIST_0002", 3, null, true]
        });
        let counts = count_tokens(&tree);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("PLACEHOLDER_LIST_0002"), Some(&1));
    }
}
