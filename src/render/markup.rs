//! Storymap inline markup: escaped text wrapped in a small HTML subset.

use crate::model::{ListBlock, ListItem, StyledSpan, TextStyle};

/// Escape text for a rich-text field. Line breaks become `<br>`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("<br>"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Render styled spans as inline markup.
pub fn render_spans(spans: &[StyledSpan]) -> String {
    spans.iter().map(render_span).collect()
}

/// Render one span.
///
/// Wrapping order, innermost first: link, subscript, superscript, emphasis,
/// strong, underline, strikethrough, color.
pub fn render_span(span: &StyledSpan) -> String {
    if span.text.is_empty() {
        return String::new();
    }
    wrap(escape_text(&span.text), &span.style)
}

fn wrap(mut html: String, style: &TextStyle) -> String {
    if let Some(url) = &style.link {
        html = format!(
            "<a href=\"{}\" rel=\"noopener noreferrer\" target=\"_blank\">{}</a>",
            escape_text(&link_href(url)),
            html
        );
    }
    if style.subscript {
        html = format!("<sub>{}</sub>", html);
    }
    if style.superscript {
        html = format!("<sup>{}</sup>", html);
    }
    if style.italic {
        html = format!("<em>{}</em>", html);
    }
    if style.bold {
        html = format!("<strong>{}</strong>", html);
    }
    if style.underline {
        html = format!("<u>{}</u>", html);
    }
    if style.strikethrough {
        html = format!("<s>{}</s>", html);
    }
    if let Some(color) = style.color {
        html = format!("<span class=\"sm-text-color-{}\">{}</span>", color.to_hex(), html);
    }
    html
}

/// Link target with a scheme; bare hosts get `https://`.
fn link_href(url: &str) -> String {
    let url = url.trim();
    if url.starts_with('#') || url.contains("://") || url.starts_with("mailto:") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Render a list block as `<li>` items.
///
/// Depth-1 items nest inside the preceding depth-0 item, in a container of
/// the block's own list type.
pub fn render_list(block: &ListBlock) -> String {
    let tag = block.list_type.tag();
    let mut out = String::new();
    let mut item_open = false;
    let mut nested_open = false;

    for item in &block.items {
        if item.depth == 0 || !item_open {
            if nested_open {
                out.push_str(&format!("</{}>", tag));
                nested_open = false;
            }
            if item_open {
                out.push_str("</li>");
            }
            out.push_str("<li>");
            out.push_str(&render_item(item));
            item_open = true;
        } else {
            if !nested_open {
                out.push_str(&format!("<{}>", tag));
                nested_open = true;
            }
            out.push_str("<li>");
            out.push_str(&render_item(item));
            out.push_str("</li>");
        }
    }

    if nested_open {
        out.push_str(&format!("</{}>", tag));
    }
    if item_open {
        out.push_str("</li>");
    }
    out
}

fn render_item(item: &ListItem) -> String {
    let content = render_spans(&item.spans);
    if item.prefix.is_empty() {
        content
    } else {
        format!("{} {}", item.prefix, content)
    }
}
