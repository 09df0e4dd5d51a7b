//! Code-language detection for code paragraphs.
//!
//! Heuristic and order-sensitive: the first family with a matching pattern
//! wins, then keyword scoring, then prose that talks about a language.

use crate::model::CodeLanguage;
use log::trace;
use regex::Regex;
use std::sync::OnceLock;

/// Detect the language of a code snippet.
pub fn detect_language(code: &str) -> CodeLanguage {
    let code = code.trim();
    if code.chars().count() < 3 {
        return CodeLanguage::Txt;
    }
    let detected = detector().detect(code);
    trace!("Detected code language {} for {:?}", detected, truncate(code));
    detected
}

fn detector() -> &'static LanguageDetector {
    static DETECTOR: OnceLock<LanguageDetector> = OnceLock::new();
    DETECTOR.get_or_init(LanguageDetector::new)
}

fn truncate(code: &str) -> String {
    code.chars().take(40).collect()
}

struct LanguageDetector {
    sql: Vec<Regex>,
    arcade: Vec<Regex>,
    python: Vec<Regex>,
    csharp: Vec<Regex>,
    javascript: Vec<Regex>,
    typescript: Vec<Regex>,
    markup_tag: Vec<Regex>,
    css: Vec<Regex>,
    html_tag: Vec<Regex>,
    html_attr: Vec<Regex>,
    html_strong: Vec<Regex>,
    word: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(&format!("(?im){}", p)).ok())
        .collect()
}

const KEYWORDS: &[(CodeLanguage, &[&str])] = &[
    (
        CodeLanguage::Py,
        &[
            "def", "import", "class", "self", "none", "true", "false", "if", "elif", "else", "for",
            "in", "try", "except",
        ],
    ),
    (
        CodeLanguage::Js,
        &[
            "function", "const", "let", "var", "return", "true", "false", "null", "undefined",
            "this", "new",
        ],
    ),
    (
        CodeLanguage::Sql,
        &[
            "select", "from", "where", "insert", "update", "delete", "create", "drop", "alter",
            "join",
        ],
    ),
    (
        CodeLanguage::Cs,
        &[
            "using", "namespace", "public", "private", "class", "void", "string", "int", "bool",
        ],
    ),
    (
        CodeLanguage::Html,
        &["div", "span", "class", "id", "style", "href", "src"],
    ),
    (
        CodeLanguage::Css,
        &["margin", "padding", "color", "background", "width", "height", "font"],
    ),
    (
        CodeLanguage::Arcade,
        &["when", "feature", "geometry", "text", "count", "iif"],
    ),
];

impl LanguageDetector {
    fn new() -> Self {
        Self {
            sql: compile(&[
                r"SELECT\s+.+?\s+FROM",
                r"INSERT\s+INTO",
                r"UPDATE\s+.+?\s+SET",
                r"CREATE\s+TABLE",
                r"ALTER\s+TABLE",
                r"DROP\s+TABLE",
                r"JOIN\s+\w+\s+ON",
                r"WHERE\s+\w+\s*[=<>]",
                r"ORDER\s+BY\s+\w+",
                r"GROUP\s+BY\s+\w+",
            ]),
            arcade: compile(&[
                r"Geometry\(",
                r"(Feature|FeatureSet)\(",
                r"When\(",
                r"(Text|Count|Concatenate|IIf|IsEmpty)\(",
                r"\$feature",
                r"\$map",
                r"//.*$",
            ]),
            python: compile(&[
                r"\bdef\s+\w+\s*\(",
                r"\bclass\s+\w+\s*:",
                r"import\s+[\w.]+",
                r"from\s+[\w.]+\s+import",
                r#"if\s+__name__\s*==\s*['"]__main__['"]"#,
                r"arcpy\.\w+",
                r"#.*?$",
            ]),
            csharp: compile(&[
                r"using\s+System;",
                r"namespace\s+\w+",
                r"(public|private|protected)\s+(class|interface)",
                r"(public|private|protected)\s+\w+\s+\w+\s*\(",
                r"Console\.(Write|WriteLine)",
            ]),
            javascript: compile(&[
                r"function\s+\w+\s*\(",
                r"(const|let|var)\s+\w+\s*=",
                r"=>",
                r"console\.(log|warn|error)",
                r"document\.get(Element|ElementsByTagName)",
                r"window\.\w+",
                r"new\s+\w+\(",
            ]),
            typescript: compile(&[
                r"interface\s+\w+",
                r"type\s+\w+\s*=",
                r":\s*\w+[\[\]<>]*(\s*=|\))",
                r"<\w+>[\(\[]",
                r"as\s+\w+",
            ]),
            markup_tag: compile(&[r#"<\w+(\s+\w+=["'].+?["'])*>"#]),
            css: compile(&[
                r"[\w-]+\s*:\s*[^;]+;",
                r"\.\w+[\w-]*\s*\{",
                r"#\w+[\w-]*\s*\{",
                r"@(media|keyframes|import|font-face)",
                r"(margin|padding|color|background|font|display):",
            ]),
            html_tag: compile(&[r"</?[a-z][a-z0-9]*\b[^>]*>"]),
            html_attr: compile(&[r#"\s+(href|src|alt|class|id|style)=["'][^'"]*["']"#]),
            html_strong: compile(&[
                r"<!DOCTYPE\s+html",
                r"<html>|<html\s+",
                r"<(div|span|p|a|img|h[1-6])(\s+[^>]*)?>",
            ]),
            word: compile(&[r"\b(\w+)\b"]),
        }
    }

    fn detect(&self, code: &str) -> CodeLanguage {
        let lower = code.to_lowercase();

        if any_match(&self.sql, &lower) {
            return CodeLanguage::Sql;
        }
        if any_match(&self.arcade, code) {
            return CodeLanguage::Arcade;
        }
        if is_json(code) {
            return CodeLanguage::Json;
        }
        if any_match(&self.python, code) {
            return CodeLanguage::Py;
        }
        if any_match(&self.csharp, code) {
            return CodeLanguage::Cs;
        }
        if let Some(lang) = self.script_language(code) {
            return lang;
        }
        if self.is_css(code) {
            return CodeLanguage::Css;
        }
        if self.is_html(code) {
            return CodeLanguage::Html;
        }
        if let Some(lang) = self.keyword_language(&lower) {
            return lang;
        }
        language_named_in_prose(&lower).unwrap_or_default()
    }

    fn script_language(&self, code: &str) -> Option<CodeLanguage> {
        let js = any_match(&self.javascript, code);
        let ts = any_match(&self.typescript, code);
        if !js && !ts {
            return None;
        }
        let markup = any_match(&self.markup_tag, code);
        Some(match (markup, ts) {
            (true, true) => CodeLanguage::Tsx,
            (true, false) => CodeLanguage::Jsx,
            (false, true) => CodeLanguage::Ts,
            (false, false) => CodeLanguage::Js,
        })
    }

    fn is_css(&self, code: &str) -> bool {
        if !code.contains('{') || !(code.contains('}') || code.contains(';')) {
            return false;
        }
        let matches = count_matching(&self.css, code);
        matches >= 2 || (matches >= 1 && code.len() < 100)
    }

    fn is_html(&self, code: &str) -> bool {
        if !code.contains('<') || !code.contains('>') {
            return false;
        }
        let tags = count_all(&self.html_tag, code);
        let attrs = count_all(&self.html_attr, code);
        if tags >= 2 || (tags >= 1 && attrs >= 1) {
            let open = code.matches('<').count() as i64;
            let close = code.matches('>').count() as i64;
            if (open - close).abs() <= 2 {
                return true;
            }
        }
        any_match(&self.html_strong, code)
    }

    /// Best keyword score of at least 2; ties go to the earlier family.
    fn keyword_language(&self, lower: &str) -> Option<CodeLanguage> {
        let words: Vec<&str> = self
            .word
            .iter()
            .flat_map(|re| re.find_iter(lower).map(|m| m.as_str()))
            .collect();

        let mut best: Option<(CodeLanguage, usize)> = None;
        for (lang, keywords) in KEYWORDS {
            let score = words.iter().filter(|w| keywords.contains(w)).count();
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((*lang, score));
            }
        }
        best.filter(|(_, score)| *score >= 2).map(|(lang, _)| lang)
    }
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

fn count_matching(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().filter(|re| re.is_match(text)).count()
}

fn count_all(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().map(|re| re.find_iter(text).count()).sum()
}

fn is_json(code: &str) -> bool {
    let bracketed = (code.starts_with('{') && code.ends_with('}'))
        || (code.starts_with('[') && code.ends_with(']'));
    bracketed && serde_json::from_str::<serde_json::Value>(code).is_ok()
}

/// Prose describing code ("example syntax in Python") names its language.
fn language_named_in_prose(lower: &str) -> Option<CodeLanguage> {
    let about_code = (lower.contains("code") && (lower.contains("style") || lower.contains("add")))
        || lower.contains("syntax")
        || lower.contains("example");
    if !about_code {
        return None;
    }
    [
        ("python", CodeLanguage::Py),
        ("javascript", CodeLanguage::Js),
        ("html", CodeLanguage::Html),
        ("css", CodeLanguage::Css),
        ("sql", CodeLanguage::Sql),
        ("c#", CodeLanguage::Cs),
        ("csharp", CodeLanguage::Cs),
    ]
    .into_iter()
    .find(|(name, _)| lower.contains(name))
    .map(|(_, lang)| lang)
}
