//! Lightweight-markup conversion of DOM fragments.
//!
//! The record assemblers serialize runs of sibling nodes through here before
//! handing the result to the cross-reference classifier, which expects links
//! as `[text](target)` and inline icons as `![](src)`.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Dom, NodeId};
use crate::text::{collapse_whitespace, normalize_text};

static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Convert a run of sibling nodes to a single trimmed markup fragment.
pub fn to_markup(dom: &Dom, nodes: &[NodeId]) -> String {
    let mut out = String::new();
    for &node in nodes {
        render_block(dom, node, &mut out);
    }
    let out = BLANKS_RE.replace_all(&out, "\n\n");
    let out = normalize_text(out.trim());
    // One spell page leaves this quotation unclosed.
    out.replacen("\"stordito per 1 minuto ", "\"stordito per 1 minuto\"", 1)
}

fn render_block(dom: &Dom, id: NodeId, out: &mut String) {
    match dom.tag(id) {
        Some("p") | Some("div") => {
            let inner = render_children(dom, id);
            let inner = inner.trim();
            if !inner.is_empty() {
                out.push_str(inner);
                out.push_str("\n\n");
            }
        }
        Some("ul") | Some("ol") => {
            for li in dom.element_children(id) {
                if dom.tag(li) == Some("li") {
                    let item = render_children(dom, li);
                    out.push_str("- ");
                    out.push_str(item.trim());
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        Some(h) if h.len() == 2 && h.starts_with('h') && h.as_bytes()[1].is_ascii_digit() => {
            let level = (h.as_bytes()[1] - b'0') as usize;
            let inner = render_children(dom, id);
            out.push_str(&"#".repeat(level.clamp(1, 6)));
            out.push(' ');
            out.push_str(inner.trim());
            out.push_str("\n\n");
        }
        Some("hr") => out.push_str("---\n\n"),
        _ => out.push_str(&render_inline(dom, id)),
    }
}

fn render_children(dom: &Dom, id: NodeId) -> String {
    dom.children(id).map(|c| render_inline(dom, c)).collect()
}

fn render_inline(dom: &Dom, id: NodeId) -> String {
    if let Some(text) = dom.text_node(id) {
        return collapse_whitespace(text);
    }
    if dom.is_comment(id) {
        return String::new();
    }
    match dom.tag(id) {
        Some("b") | Some("strong") => {
            let inner = render_children(dom, id);
            let inner = inner.trim();
            if inner.is_empty() {
                String::new()
            } else {
                format!("**{}**", inner)
            }
        }
        Some("em") | Some("i") => {
            let inner = render_children(dom, id);
            let inner = inner.trim();
            if inner.is_empty() {
                String::new()
            } else {
                format!("_{}_", inner)
            }
        }
        Some("a") => {
            let inner = render_children(dom, id);
            match dom.attr(id, "href") {
                Some(href) => format!("[{}]({})", inner.trim(), href),
                None => inner,
            }
        }
        Some("img") => format!("![]({})", dom.attr(id, "src").unwrap_or_default()),
        Some("br") => "\n".to_string(),
        _ => render_children(dom, id),
    }
}
