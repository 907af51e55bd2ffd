//! Record assembly: one module per rule category.
//!
//! Each module enumerates its pages, drives the container through the block
//! splitter and the segmentation engine, and folds the resulting entries
//! into a typed record. An entry key the record type does not model is a
//! hard failure at this boundary, never inside the engine, so the same
//! segmentation output can be reused once the field is modeled.

pub mod actions;
pub mod conditions;
pub mod spells;
pub mod traits;

use serde::Serialize;

use crate::dom::{Dom, NodeId};
use crate::error::ParseError;
use crate::parser::labels::is_label;
use crate::text::collapse_whitespace;

pub const BASE_URL: &str = "https://www.archiviodeicercatori.it";

/// Provenance attached to every record.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub manual: String,
    pub page: u32,
    pub archivio_url: String,
    pub nethys_url: String,
}

/// The English Archives of Nethys URL the upstream authors link right after
/// a Fonte label. Pages carry several bold "Fonte" markers (the statblock
/// citation is one of them); any of them may hold the link among its
/// following siblings.
pub fn nethys_url(dom: &Dom, scope: NodeId) -> Result<String, ParseError> {
    let markers = dom.select(scope, |d, id| {
        is_label(d, id) && d.subtree_text(id).contains("Fonte")
    });
    if markers.is_empty() {
        return Err(ParseError::MissingNode("Fonte label"));
    }

    for marker in markers {
        let mut cur = dom.next_element_sibling(marker);
        while let Some(id) = cur {
            if let Some(href) = dom.attr(id, "href") {
                if href.contains("2e.aonprd.com") {
                    return Ok(href.to_string());
                }
            }
            cur = dom.next_element_sibling(id);
        }
    }
    Err(ParseError::MissingNode("nethys url"))
}

/// Trait names: the `span.tratto` tags inside a header group.
pub fn trait_spans(dom: &Dom, nodes: &[NodeId]) -> Vec<NodeId> {
    let mut spans = Vec::new();
    for &node in nodes {
        if dom.has_class(node, "tratto") {
            spans.push(node);
        }
        spans.extend(dom.select(node, |d, id| d.has_class(id, "tratto")));
    }
    spans
}

pub fn trait_names(dom: &Dom, nodes: &[NodeId]) -> Vec<String> {
    trait_spans(dom, nodes)
        .into_iter()
        .map(|id| collapse_whitespace(&dom.subtree_text(id)).trim().to_string())
        .collect()
}

/// First bold/strong element sibling after `node`: the candidate label that
/// seeds segmentation. `None` when the block carries no labeled entries.
pub fn first_label_after(dom: &Dom, node: NodeId) -> Option<NodeId> {
    let mut cur = dom.next_element_sibling(node);
    while let Some(id) = cur {
        if is_label(dom, id) {
            return Some(id);
        }
        cur = dom.next_element_sibling(id);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nethys_url_after_fonte() {
        let dom = Dom::parse_fragment(
            r#"<p><strong>Fonte</strong> <em>Manuale di Gioco, pag. 468</em>
               <a href="https://2e.aonprd.com/Rules.aspx?ID=429">Nethys</a></p>"#,
        );
        let url = nethys_url(&dom, dom.body()).unwrap();
        assert_eq!(url, "https://2e.aonprd.com/Rules.aspx?ID=429");
    }

    #[test]
    fn later_fonte_markers_are_searched_too() {
        // The statblock's own bold Fonte has no aonprd sibling; the footer's
        // does.
        let dom = Dom::parse_fragment(
            r#"<p><strong>Fonte</strong> <em>Manuale di Gioco, pag. 343</em></p>
               <p><strong>Fonte</strong>
                  <a href="https://2e.aonprd.com/Spells.aspx?ID=150">AoN</a></p>"#,
        );
        let url = nethys_url(&dom, dom.body()).unwrap();
        assert_eq!(url, "https://2e.aonprd.com/Spells.aspx?ID=150");
    }

    #[test]
    fn missing_nethys_url_is_an_error() {
        let dom = Dom::parse_fragment("<p><strong>Fonte</strong> <em>x</em></p>");
        assert!(matches!(
            nethys_url(&dom, dom.body()),
            Err(ParseError::MissingNode("nethys url"))
        ));
    }

    #[test]
    fn collects_trait_names() {
        let dom = Dom::parse_fragment(
            r#"<p><span class="tratto">Magico</span> <span class="tratto">Raro</span></p>"#,
        );
        let p = dom.find(dom.body(), |d, id| d.tag(id) == Some("p")).unwrap();
        assert_eq!(trait_names(&dom, &[p]), vec!["Magico", "Raro"]);
    }
}
