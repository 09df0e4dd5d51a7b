//! JSON serialization of story trees and conversion reports.

use crate::error::{Error, Result};
use serde::Serialize;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize a value to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_pretty() {
        let tree = json!({ "root": "n-root", "nodes": { "n-0001": { "type": "credits" } } });

        let json = to_json(&tree, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"root\""));
        assert!(json.contains("credits"));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact_keeps_unicode() {
        let tree = json!({ "text": "Hello, 世界" });

        let json = to_json(&tree, JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
        assert_eq!(json, "{\"text\":\"Hello, 世界\"}");
    }
}
