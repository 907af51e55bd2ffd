//! Conditions, all hosted on the single `/condizioni/` page.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use super::{Source, BASE_URL};
use crate::dom::{Dom, NodeId};
use crate::error::ParseError;
use crate::fetch::PageCache;
use crate::markdown;
use crate::parser::links;
use crate::parser::tables::Tables;
use crate::text::normalize_name;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRecord {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub name: String,
    pub text: String,
    pub source: Source,
}

pub async fn generate(cache: &PageCache<'_>, tables: &Tables) -> Result<Vec<ConditionRecord>> {
    let url = format!("{}/condizioni/", BASE_URL);
    let dom = cache.fetch(&url).await?;

    let titles: Vec<NodeId> = dom.select(dom.body(), |d, id| {
        d.tag(id) == Some("h5")
            && d.parent(id)
                .is_some_and(|p| d.has_class(p, "fusion-text"))
    });

    let mut output = Vec::new();
    for title in titles {
        let name = dom.subtree_text(title).trim().to_string();
        let record =
            extract(&dom, title, &name, &url, tables).with_context(|| format!("parsing condition: {}", name))?;
        output.push(record);
    }
    info!("extracted {} conditions", output.len());
    Ok(output)
}

fn extract(
    dom: &Dom,
    title: NodeId,
    name: &str,
    page_url: &str,
    tables: &Tables,
) -> Result<ConditionRecord> {
    // Each title is preceded by an <a name="..."> anchor element.
    let anchor = dom
        .prev_element_sibling(title)
        .and_then(|prev| {
            if dom.attr(prev, "name").is_some() {
                Some(prev)
            } else {
                dom.find(prev, |d, id| d.attr(id, "name").is_some())
            }
        })
        .and_then(|a| dom.attr(a, "name"))
        .ok_or(ParseError::MissingNode("condition anchor"))?
        .to_string();

    if !tables.conditions.contains_key(anchor.as_str()) {
        return Err(ParseError::UnknownCondition {
            name: anchor,
            href: page_url.to_string(),
        }
        .into());
    }

    // Everything after the title inside its container is the condition text.
    let mut content = Vec::new();
    let mut node = dom.next_sibling(title);
    while let Some(id) = node {
        content.push(id);
        node = dom.next_sibling(id);
    }
    let text = markdown::to_markup(dom, &content);
    let text = links::replace_links(&text, Some("/condizioni"), tables)?;

    Ok(ConditionRecord {
        kind: "condition",
        id: anchor.clone(),
        name: normalize_name(name),
        text,
        source: Source {
            manual: "Manuale di Gioco".to_string(),
            page: 618,
            archivio_url: format!("{}#{}", page_url, anchor),
            nethys_url: "https://2e.aonprd.com/Conditions.aspx".to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <div class="fusion-text">
            <p><a name="prono"></a></p>
            <h5>PRONO</h5>
            <p>Sei sdraiato a terra e sei <a href="#impreparato">impreparato</a>.</p>
            <p>Puoi usare l'azione Alzarsi.</p>
        </div>"##;

    #[test]
    fn extracts_a_condition() {
        let dom = Dom::parse_fragment(PAGE);
        let title = dom.find(dom.body(), |d, id| d.tag(id) == Some("h5")).unwrap();
        let r = extract(
            &dom,
            title,
            "PRONO",
            "https://www.archiviodeicercatori.it/condizioni/",
            &Tables::default(),
        )
        .unwrap();
        assert_eq!(r.id, "prono");
        assert_eq!(r.name, "Prono");
        assert!(r.text.contains("[impreparato](/conditions/impreparato)"));
        assert!(r.text.contains("Alzarsi"));
        assert_eq!(
            r.source.archivio_url,
            "https://www.archiviodeicercatori.it/condizioni/#prono"
        );
    }

    #[test]
    fn parses_the_index_snapshot() {
        let html = std::fs::read_to_string("tests/fixtures/condizioni.html").unwrap();
        let dom = Dom::parse(&html);
        let titles = dom.select(dom.body(), |d, id| {
            d.tag(id) == Some("h5")
                && d.parent(id).is_some_and(|p| d.has_class(p, "fusion-text"))
        });
        assert_eq!(titles.len(), 2);

        let r = extract(
            &dom,
            titles[1],
            "ACCECATO",
            "https://www.archiviodeicercatori.it/condizioni/",
            &Tables::default(),
        )
        .unwrap();
        assert_eq!(r.id, "accecato");
        assert_eq!(r.name, "Accecato");
        // the misspelled fragment on the live page gets corrected
        assert!(r.text.contains("[nascosti](/conditions/nascosto)"));
        assert!(r.text.contains("immune agli effetti visivi"));
    }

    #[test]
    fn unknown_anchor_fails() {
        let dom = Dom::parse_fragment(
            r#"<div class="fusion-text"><p><a name="ignota"></a></p><h5>IGNOTA</h5><p>x</p></div>"#,
        );
        let title = dom.find(dom.body(), |d, id| d.tag(id) == Some("h5")).unwrap();
        assert!(extract(&dom, title, "IGNOTA", "u", &Tables::default()).is_err());
    }
}
