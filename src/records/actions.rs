//! Basic actions and exploration activities.
//!
//! Both live on single index pages where each block is anchored by an
//! `<a name>` element immediately followed by the bold title. The two
//! categories share the block layout; only the accepted entry keys differ.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use super::{Source, BASE_URL};
use crate::dom::{Dom, NodeId};
use crate::error::ParseError;
use crate::fetch::PageCache;
use crate::markdown;
use crate::parser::labels::{self, Entries};
use crate::parser::links::{self, ActionCost};
use crate::parser::tables::Tables;
use crate::parser::blocks;
use crate::text::normalize_name;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicAction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub name: String,
    pub action: Option<ActionCost>,
    pub traits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    pub text: String,
    pub source: Source,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationActivity {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub name: String,
    pub action: Option<ActionCost>,
    pub traits: Vec<String>,
    pub text: String,
    pub source: Source,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ActionRecord {
    Basic(BasicAction),
    Exploration(ExplorationActivity),
}

impl ActionRecord {
    pub fn id(&self) -> &str {
        match self {
            ActionRecord::Basic(a) => &a.id,
            ActionRecord::Exploration(a) => &a.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ActionRecord::Basic(a) => &a.name,
            ActionRecord::Exploration(a) => &a.name,
        }
    }
}

/// Shared shape of one anchored block before the entries are folded into
/// category-specific fields.
#[derive(Debug)]
struct ActionBlock {
    id: String,
    name: String,
    action: Option<ActionCost>,
    traits: Vec<String>,
    text: String,
    entries: Entries,
}

pub async fn generate(cache: &PageCache<'_>, tables: &Tables) -> Result<Vec<ActionRecord>> {
    let mut output = Vec::new();

    let page_url = format!("{}/giocare/modalita-incontro/", BASE_URL);
    let mut dom = cache.fetch(&page_url).await?;
    for title in anchored_titles(&dom) {
        let label = dom.subtree_text(title).trim().to_string();
        let block = process_block(&mut dom, title, "/giocare/modalita-incontro/", tables)
            .with_context(|| format!("parsing action: {}", label))?;

        let mut record = BasicAction {
            kind: "basic-action",
            id: block.id.clone(),
            name: block.name,
            action: block.action,
            traits: block.traits,
            trigger: None,
            requirements: None,
            frequency: None,
            text: block.text,
            source: Source {
                manual: "Manuale di Gioco".to_string(),
                page: 468,
                archivio_url: format!("{}#{}", page_url, block.id),
                nethys_url: "https://2e.aonprd.com/Rules.aspx?ID=429".to_string(),
            },
        };
        for (key, value) in block.entries.iter() {
            match key {
                "Innesco" => record.trigger = Some(value.to_string()),
                "Requisiti" => record.requirements = Some(value.to_string()),
                "Frequenza" => record.frequency = Some(value.to_string()),
                _ => {
                    return Err(ParseError::UnknownEntry {
                        key: key.to_string(),
                        value: value.to_string(),
                    })
                    .with_context(|| format!("parsing action: {}", label))
                }
            }
        }
        output.push(ActionRecord::Basic(record));
    }

    let page_url = format!("{}/giocare/modalita-esplorazione/", BASE_URL);
    let mut dom = cache.fetch(&page_url).await?;
    for title in anchored_titles(&dom) {
        let label = dom.subtree_text(title).trim().to_string();
        let block = process_block(&mut dom, title, "/giocare/modalita-incontro/", tables)
            .with_context(|| format!("parsing activity: {}", label))?;

        // Activities carry no labeled entries; anything segmented out is a
        // layout we have never seen.
        if let Some((key, value)) = block.entries.iter().next() {
            return Err(ParseError::UnknownEntry {
                key: key.to_string(),
                value: value.to_string(),
            })
            .with_context(|| format!("parsing activity: {}", label));
        }

        output.push(ActionRecord::Exploration(ExplorationActivity {
            kind: "exploration-activity",
            id: block.id.clone(),
            name: block.name,
            action: block.action,
            traits: block.traits,
            text: block.text,
            source: Source {
                manual: "Manuale di Gioco".to_string(),
                page: 479,
                archivio_url: format!("{}#{}", page_url, block.id),
                nethys_url: "https://2e.aonprd.com/Rules.aspx?ID=469".to_string(),
            },
        }));
    }

    info!("extracted {} actions", output.len());
    Ok(output)
}

/// Bold titles immediately preceded by their `<a name>` anchor, inside a
/// text widget.
fn anchored_titles(dom: &Dom) -> Vec<NodeId> {
    dom.select(dom.body(), |d, id| {
        d.tag(id) == Some("strong")
            && d.prev_element_sibling(id)
                .is_some_and(|a| d.tag(a) == Some("a") && d.attr(a, "name").is_some())
            && d.ancestor_with_class(id, "fusion-text").is_some()
    })
}

fn process_block(
    dom: &mut Dom,
    title: NodeId,
    base: &str,
    tables: &Tables,
) -> Result<ActionBlock, ParseError> {
    let container = dom
        .ancestor_with_class(title, "fusion-text")
        .ok_or(ParseError::MissingNode("text widget container"))?;
    blocks::unwrap_divider_wrappers(dom, container);

    let id = dom
        .prev_element_sibling(title)
        .and_then(|a| dom.attr(a, "name"))
        .ok_or(ParseError::MissingNode("block anchor"))?
        .to_string();
    let name = dom.subtree_text(title).trim().to_string();
    let icon = dom
        .find(title, |d, n| d.tag(n) == Some("img"))
        .and_then(|img| dom.attr(img, "src"))
        .map(str::to_string);
    let action = links::parse_action_icon(icon.as_deref())?;

    let trait_spans = super::trait_spans(dom, &[container]);
    let traits = trait_spans
        .iter()
        .map(|&t| dom.subtree_text(t).trim().to_string())
        .collect();

    // Entries start at the first bold sibling after the traits (or the
    // title, when the block has none). Some blocks put the entries in their
    // own paragraph after a divider instead.
    let first_part = trait_spans.last().copied().unwrap_or(title);
    let mut first_label = super::first_label_after(dom, first_part);
    if first_label.is_none() {
        let dividers = dom.select(container, |d, n| d.tag(n) == Some("hr"));
        if dividers.len() > 1 {
            first_label = label_after_divider(dom, container);
        }
    }
    let entries = labels::segment(dom, first_label, Some(base), tables)?;

    // Description: every paragraph after the one holding the entries (or the
    // title, when there are none).
    let anchor_p = ancestor_paragraph(dom, first_label.unwrap_or(title))
        .ok_or(ParseError::MissingNode("block paragraph"))?;
    let mut paragraphs = Vec::new();
    let mut cur = dom.next_element_sibling(anchor_p);
    while let Some(p) = cur {
        if dom.tag(p) == Some("p") {
            paragraphs.push(p);
        }
        cur = dom.next_element_sibling(p);
    }
    let text = markdown::to_markup(dom, &paragraphs);
    let text = links::replace_links(&text, Some(base), tables)?;

    Ok(ActionBlock {
        id,
        name: normalize_name(&name),
        action,
        traits,
        text,
        entries,
    })
}

fn label_after_divider(dom: &Dom, container: NodeId) -> Option<NodeId> {
    let kids = dom.element_children(container);
    for pair in kids.windows(2) {
        if dom.tag(pair[0]) == Some("hr") && dom.tag(pair[1]) == Some("p") {
            if let Some(label) = dom
                .element_children(pair[1])
                .into_iter()
                .find(|&c| labels::is_label(dom, c))
            {
                return Some(label);
            }
        }
    }
    None
}

fn ancestor_paragraph(dom: &Dom, id: NodeId) -> Option<NodeId> {
    let mut cur = dom.parent(id);
    while let Some(n) = cur {
        if dom.tag(n) == Some("p") {
            return Some(n);
        }
        cur = dom.parent(n);
    }
    None
}
