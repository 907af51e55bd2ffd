//! Traits: the categorized list on `/tratti/`, then one page per trait.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use super::{Source, BASE_URL};
use crate::dom::{Dom, NodeId};
use crate::error::ParseError;
use crate::fetch::PageCache;
use crate::markdown;
use crate::parser::blocks;
use crate::parser::links;
use crate::parser::sources;
use crate::parser::tables::Tables;
use crate::text::normalize_text;

#[derive(Debug, Clone)]
pub struct ShortTrait {
    pub id: String,
    pub name: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitRecord {
    pub id: String,
    pub name: String,
    pub categories: Vec<String>,
    pub text: String,
    pub source: Source,
}

/// Collect the trait list. A trait listed under several category headings
/// accumulates all of them.
pub async fn short_list(cache: &PageCache<'_>) -> Result<Vec<ShortTrait>> {
    let url = format!("{}/tratti/", BASE_URL);
    let dom = cache.fetch(&url).await?;

    let spans = dom.select(dom.body(), |d, id| {
        d.tag(id) == Some("span")
            && d.has_class(id, "tratto")
            && d.parent(id).is_some_and(|p| d.tag(p) == Some("p"))
    });

    let mut traits: Vec<ShortTrait> = Vec::new();
    for span in spans {
        let link = dom
            .find(span, |d, id| d.tag(id) == Some("a"))
            .ok_or(ParseError::MissingNode("trait link"))?;
        let name = normalize_text(dom.subtree_text(link).trim());
        let href = dom
            .attr(link, "href")
            .ok_or(ParseError::MissingNode("trait href"))?;
        let id = href
            .trim_start_matches('/')
            .split('/')
            .nth(1)
            .unwrap_or("")
            .to_string();

        // Category: the heading right before the span's paragraph.
        let category = dom
            .parent(span)
            .and_then(|p| dom.prev_element_sibling(p))
            .filter(|&h| dom.tag(h) == Some("h2"))
            .map(|h| normalize_text(dom.subtree_text(h).trim()));

        match traits.iter_mut().find(|t| t.name == name) {
            Some(prev) => {
                if let Some(c) = category {
                    prev.categories.push(c);
                }
            }
            None => traits.push(ShortTrait {
                id,
                name,
                categories: category.into_iter().collect(),
            }),
        }
    }

    Ok(traits)
}

pub async fn generate(cache: &PageCache<'_>, tables: &Tables) -> Result<Vec<TraitRecord>> {
    let traits = short_list(cache).await?;
    info!("found {} traits in the index", traits.len());

    let pb = ProgressBar::new(traits.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut output = Vec::new();
    for short in traits {
        let url = format!("{}/tratti/{}/", BASE_URL, short.id);
        let dom = cache
            .fetch(&url)
            .await
            .with_context(|| format!("parsing trait: {} ({})", short.name, short.id))?;
        let record = parse_trait_page(&dom, &short, &url, tables)
            .with_context(|| format!("parsing trait: {} ({})", short.name, short.id))?;
        output.push(record);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(output)
}

fn parse_trait_page(
    dom: &Dom,
    short: &ShortTrait,
    url: &str,
    tables: &Tables,
) -> Result<TraitRecord> {
    let nethys_url = super::nethys_url(dom, dom.body())?;

    let first = first_block(dom).ok_or(ParseError::MissingNode("trait source block"))?;

    let source_el = if matches!(dom.tag(first), Some("em") | Some("i")) {
        first
    } else {
        dom.find(first, |d, id| d.tag(id) == Some("em"))
            .ok_or(ParseError::MissingNode("source citation"))?
    };
    let citation = sources::parse_citation(&dom.subtree_text(source_el), tables)?;

    let body_start = dom
        .next_element_sibling(first)
        .filter(|&p| dom.tag(p) == Some("p"))
        .ok_or(ParseError::MissingNode("trait description"))?;
    let group = blocks::paragraph_group(dom, body_start);
    let text = markdown::to_markup(dom, &group);
    let text = links::replace_links(&text, None, tables)?;

    Ok(TraitRecord {
        id: short.id.clone(),
        name: short.name.clone(),
        categories: short.categories.clone(),
        text,
        source: Source {
            manual: citation.manual,
            page: citation.page,
            archivio_url: url.to_string(),
            nethys_url,
        },
    })
}

/// The block holding the citation, right under the page heading. Four
/// layouts occur upstream: `h1 hr p`, `h1 hr em`, `h1 hr i`, and `h1 p`
/// where the paragraph wraps an `em > i`.
fn first_block(dom: &Dom) -> Option<NodeId> {
    let containers = dom.select(dom.body(), |d, id| d.has_class(id, "fusion-text"));
    for container in containers {
        let kids = dom.element_children(container);
        for (i, &kid) in kids.iter().enumerate() {
            if dom.tag(kid) != Some("h1") {
                continue;
            }
            match kids.get(i + 1).and_then(|&n| dom.tag(n)) {
                Some("hr") => {
                    if let Some(&after) = kids.get(i + 2) {
                        if matches!(dom.tag(after), Some("p") | Some("em") | Some("i")) {
                            return Some(after);
                        }
                    }
                }
                Some("p") => {
                    let p = kids[i + 1];
                    let wraps_italic_source = dom.element_children(p).iter().any(|&em| {
                        dom.tag(em) == Some("em")
                            && dom
                                .element_children(em)
                                .iter()
                                .any(|&it| dom.tag(it) == Some("i"))
                    });
                    if wraps_italic_source {
                        return Some(p);
                    }
                }
                _ => {}
            }
        }
    }
    None
}
