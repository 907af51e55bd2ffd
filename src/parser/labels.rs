//! Label-delimited segmentation.
//!
//! Entry blocks carry their key/value structure only as typography: a run of
//! bold elements introduces a key, everything up to the next bold run is the
//! value. `segment` walks a sibling stream from the first candidate label and
//! produces an ordered key → serialized-content mapping.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::dom::{Dom, NodeId};
use crate::error::ParseError;
use crate::markdown;
use crate::parser::links;
use crate::parser::tables::Tables;
use crate::text::collapse_whitespace;

/// Ordered label → content mapping. Keys are not guaranteed unique across a
/// document; within one pass a duplicate key silently overwrites the earlier
/// value (last write wins), keeping its original position.
#[derive(Debug, Default)]
pub struct Entries(Vec<(String, String)>);

impl Entries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Serialized as a JSON object in entry order.
impl Serialize for Entries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// True for the bold/strong elements that introduce labels.
pub fn is_label(dom: &Dom, id: NodeId) -> bool {
    matches!(dom.tag(id), Some("b") | Some("strong"))
}

/// Segment the sibling stream starting at `start` into labeled entries.
///
/// `start` is the first candidate label; `None` (the caller's structural
/// search found nothing) yields an empty mapping. Each value is the run of
/// sibling nodes up to the next bold/strong element, serialized, rewritten
/// through the cross-reference classifier, stripped of one trailing
/// semicolon, and trimmed.
pub fn segment(
    dom: &Dom,
    start: Option<NodeId>,
    base: Option<&str>,
    tables: &Tables,
) -> Result<Entries, ParseError> {
    let mut entries = Entries::new();
    let mut cursor = start;

    while let Some(label) = cursor {
        // A label is maximal: keep absorbing immediately-following bold runs,
        // looking through whitespace-only text and comments.
        let mut key = collapse_whitespace(&dom.subtree_text(label)).trim().to_string();
        let mut tail = label;
        while let Some(next) = dom.next_significant_sibling(tail) {
            if !is_label(dom, next) {
                break;
            }
            let extra = collapse_whitespace(&dom.subtree_text(next));
            let extra = extra.trim();
            if !extra.is_empty() {
                key.push(' ');
                key.push_str(extra);
            }
            tail = next;
        }

        // Content run: every sibling up to the next label or end of stream.
        let mut content = Vec::new();
        let mut node = dom.next_sibling(tail);
        while let Some(id) = node {
            if is_label(dom, id) {
                break;
            }
            content.push(id);
            node = dom.next_sibling(id);
        }

        let value = markdown::to_markup(dom, &content);
        let value = links::replace_links(&value, base, tables)?;
        entries.insert(key, strip_trailing_semicolon(&value));

        cursor = node;
    }

    Ok(entries)
}

/// Remove at most one trailing semicolon, then trim again.
fn strip_trailing_semicolon(value: &str) -> String {
    let value = value.trim();
    value.strip_suffix(';').unwrap_or(value).trim().to_string()
}
