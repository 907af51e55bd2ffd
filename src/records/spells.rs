//! Spells: a short list from the four tradition index tables, then one
//! statblock page per spell.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use serde::Serialize;
use tracing::info;

use super::{Source, BASE_URL};
use crate::dom::Dom;
use crate::error::ParseError;
use crate::fetch::PageCache;
use crate::markdown;
use crate::parser::blocks;
use crate::parser::labels::{self, Entries};
use crate::parser::links;
use crate::parser::sources;
use crate::parser::tables::Tables;
use crate::text::normalize_text;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(INCANTESIMO|TRUCCHETTO)\s+(\d+)\s*$").unwrap());

const TRADITION_PAGES: [&str; 4] = ["arcana", "divina", "occulta", "primeva"];

/// One row of a tradition index table.
#[derive(Debug, Clone)]
pub struct ShortSpell {
    pub id: String,
    pub name: String,
    pub short_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellRecord {
    pub id: String,
    pub name: String,
    pub short_text: String,
    pub text: String,
    pub cantrip: bool,
    pub level: u32,
    pub traits: Vec<String>,
    pub traditions: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bloodlines: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_cast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saving_throw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    pub heightened_effects: Entries,
    pub source: Source,
}

/// Collect the deduplicated spell list from the tradition index tables.
/// A spell listed under several traditions keeps its first position but the
/// later row wins.
pub async fn short_list(cache: &PageCache<'_>) -> Result<Vec<ShortSpell>> {
    let mut spells: Vec<ShortSpell> = Vec::new();

    for tradition in TRADITION_PAGES {
        let url = format!("{}/incantesimi/tradizione-{}/", BASE_URL, tradition);
        let dom = cache.fetch(&url).await?;

        let table = dom
            .find(dom.body(), |d, id| {
                d.tag(id) == Some("table") && d.has_class(id, "tablepress")
            })
            .ok_or(ParseError::MissingNode("spell index table"))
            .with_context(|| format!("listing tradition: {}", tradition))?;

        let rows = dom.select(table, |d, id| d.tag(id) == Some("tr"));
        for &row in rows.iter().skip(1) {
            let link = dom
                .find(row, |d, id| {
                    d.tag(id) == Some("a")
                        && d.parent(id).is_some_and(|td| d.has_class(td, "column-1"))
                })
                .ok_or(ParseError::MissingNode("spell index link"))
                .with_context(|| format!("listing tradition: {}", tradition))?;

            let name = normalize_text(dom.subtree_text(link).trim());
            let href = dom
                .attr(link, "href")
                .ok_or(ParseError::MissingNode("spell index href"))?;
            let id = href
                .trim_start_matches('/')
                .split('/')
                .nth(1)
                .unwrap_or("")
                .to_string();
            let short_text = dom
                .find(row, |d, n| d.has_class(n, "column-4"))
                .map(|td| normalize_text(dom.subtree_text(td).trim()))
                .unwrap_or_default();

            let entry = ShortSpell { id, name, short_text };
            match spells.iter_mut().find(|s| s.name == entry.name) {
                Some(slot) => *slot = entry,
                None => spells.push(entry),
            }
        }
    }

    Ok(spells)
}

pub async fn generate(cache: &PageCache<'_>, tables: &Tables) -> Result<Vec<SpellRecord>> {
    let spells = short_list(cache).await?;
    info!("found {} spells in the tradition indexes", spells.len());

    let pb = ProgressBar::new(spells.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut output = Vec::new();
    for base in spells {
        let url = format!("{}/incantesimi/{}/", BASE_URL, base.id);
        let mut dom = cache
            .fetch(&url)
            .await
            .with_context(|| format!("parsing spell: {} ({})", base.name, base.id))?;
        let record = parse_spell_page(&mut dom, &base, &url, tables)
            .with_context(|| format!("parsing spell: {} ({})", base.name, base.id))?;
        output.push(record);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(output)
}

fn parse_spell_page(
    dom: &mut Dom,
    base: &ShortSpell,
    url: &str,
    tables: &Tables,
) -> Result<SpellRecord> {
    // The statblock is the text widget around the first bold paragraph child.
    let title_el = dom
        .find(dom.body(), |d, id| {
            labels::is_label(d, id)
                && d.parent(id).is_some_and(|p| d.tag(p) == Some("p"))
                && d.parent(id)
                    .and_then(|p| d.parent(p))
                    .is_some_and(|c| d.has_class(c, "fusion-text"))
        })
        .ok_or(ParseError::MissingNode("spell title"))?;
    let container = dom
        .parent(title_el)
        .and_then(|p| dom.parent(p))
        .ok_or(ParseError::MissingNode("spell statblock"))?;

    let title = normalize_text(&dom.subtree_text(title_el));
    let caps = TITLE_RE
        .captures(&title)
        .ok_or_else(|| ParseError::BadTitle { title: title.clone() })?;
    let cantrip = &caps[2] == "TRUCCHETTO";
    let level: u32 = caps[3]
        .parse()
        .map_err(|_| ParseError::BadTitle { title: title.clone() })?;

    let nethys_url = super::nethys_url(dom, dom.body())?;

    let groups = blocks::split_groups(dom, container);
    let header = groups
        .first()
        .ok_or(ParseError::MissingNode("spell header block"))?;

    let traits = super::trait_names(dom, header);
    let source_em = header
        .iter()
        .find_map(|&n| dom.find(n, |d, id| d.tag(id) == Some("em")))
        .ok_or(ParseError::MissingNode("source citation"))?;
    let citation = sources::parse_citation(&dom.subtree_text(source_em), tables)?;

    let first_label = super::trait_spans(dom, header)
        .last()
        .and_then(|&t| super::first_label_after(dom, t));
    let entries = labels::segment(dom, first_label, None, tables)?;

    let description = groups
        .get(1)
        .ok_or(ParseError::MissingNode("spell description block"))?;
    let text = markdown::to_markup(dom, description);
    let text = links::replace_links(&text, None, tables)?;

    let mut heightened_effects = Entries::new();
    if let Some(group) = groups.get(2) {
        let first = group.iter().find_map(|&n| {
            if labels::is_label(dom, n) {
                Some(n)
            } else {
                dom.find(n, |d, id| labels::is_label(d, id))
            }
        });
        heightened_effects = labels::segment(dom, first, None, tables)?;
    }

    let mut record = SpellRecord {
        id: base.id.clone(),
        name: base.name.clone(),
        short_text: base.short_text.clone(),
        text,
        cantrip,
        level,
        traits,
        traditions: Vec::new(),
        bloodlines: None,
        raw_cast: None,
        radius: None,
        targets: None,
        saving_throw: None,
        duration: None,
        area: None,
        deities: None,
        requirements: None,
        trigger: None,
        cost: None,
        heightened_effects,
        source: Source {
            manual: citation.manual,
            page: citation.page,
            archivio_url: url.to_string(),
            nethys_url,
        },
    };

    for (key, value) in entries.iter() {
        match key {
            "Tradizioni:" => {
                if value.contains("arcana") {
                    record.traditions.push("arcane");
                }
                if value.contains("primeva") {
                    record.traditions.push("primal");
                }
                if value.contains("divina") {
                    record.traditions.push("divine");
                }
                if value.contains("occulta") {
                    record.traditions.push("occult");
                }
            }
            "Linee di Sangue:" => {
                record.bloodlines = Some(value.split(", ").map(str::to_string).collect())
            }
            "Lancio" => record.raw_cast = Some(value.to_string()),
            "Bersaglio" | "Bersagli" => record.targets = Some(value.to_string()),
            "Raggio" => record.radius = Some(value.to_string()),
            // the index page sometimes pluralizes the label
            "Tiro Salvezza" | "Tiri Salvezza" => record.saving_throw = Some(value.to_string()),
            "Durata" => record.duration = Some(value.to_string()),
            "Area" => record.area = Some(value.to_string()),
            "Divinità:" => {
                record.deities = Some(
                    links::remove_links(value)
                        .split(", ")
                        .map(|s| s.trim().to_string())
                        .collect(),
                )
            }
            "Requisiti" => record.requirements = Some(value.to_string()),
            "Innesco" => record.trigger = Some(value.to_string()),
            "Costo" => record.cost = Some(value.to_string()),
            // One page wraps its deity list across two rows, splitting on a
            // bare comma label.
            "," if record.deities.is_some() && base.name == "Ingrandire" => {
                if let Some(deities) = record.deities.as_mut() {
                    deities.extend(
                        links::remove_links(value)
                            .split(", ")
                            .map(|s| s.trim().to_string()),
                    );
                }
            }
            _ => {
                return Err(ParseError::UnknownEntry {
                    key: key.to_string(),
                    value: value.to_string(),
                }
                .into())
            }
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIREBALL: &str = r#"
        <div class="fusion-text">
            <p><b>PALLA DI FUOCO INCANTESIMO 3</b><br>
               <span class="tratto">Evocazione</span> <span class="tratto">Fuoco</span><br>
               <em>Fonte: Manuale di Gioco, pag. 338</em><br>
               <b>Tradizioni:</b> arcana, primeva<br>
               <b>Lancio</b> <img src="/wp/2-azioni.png"> somatica, verbale<br>
               <b>Raggio</b> 150 metri; <b>Area</b> esplosione di 6 metri<br>
               <b>Tiro Salvezza</b> Riflessi base</p>
            <hr>
            <p>Una sfera rovente esplode nell'area.</p>
            <hr>
            <p><b>Intensificato (+1)</b> Il danno aumenta di 2d6.</p>
        </div>
        <div class="fusion-text">
            <p><strong>Fonte</strong>
               <a href="https://2e.aonprd.com/Spells.aspx?ID=97">Archives of Nethys</a></p>
        </div>"#;

    fn base() -> ShortSpell {
        ShortSpell {
            id: "palla-di-fuoco".to_string(),
            name: "Palla di Fuoco".to_string(),
            short_text: "Un'esplosione di fuoco.".to_string(),
        }
    }

    #[test]
    fn parses_a_full_statblock() {
        let mut dom = Dom::parse_fragment(FIREBALL);
        let r = parse_spell_page(
            &mut dom,
            &base(),
            "https://www.archiviodeicercatori.it/incantesimi/palla-di-fuoco/",
            &Tables::default(),
        )
        .unwrap();

        assert_eq!(r.level, 3);
        assert!(!r.cantrip);
        assert_eq!(r.traits, vec!["Evocazione", "Fuoco"]);
        assert_eq!(r.traditions, vec!["arcane", "primal"]);
        assert_eq!(r.raw_cast.as_deref(), Some("[AA] somatica, verbale"));
        assert_eq!(r.radius.as_deref(), Some("150 metri"));
        assert_eq!(r.area.as_deref(), Some("esplosione di 6 metri"));
        assert_eq!(r.saving_throw.as_deref(), Some("Riflessi base"));
        assert_eq!(r.text, "Una sfera rovente esplode nell'area.");
        assert_eq!(
            r.heightened_effects.get("Intensificato (+1)"),
            Some("Il danno aumenta di 2d6.")
        );
        assert_eq!(r.source.manual, "Manuale di Gioco");
        assert_eq!(r.source.page, 338);
        assert_eq!(r.source.nethys_url, "https://2e.aonprd.com/Spells.aspx?ID=97");
    }

    #[test]
    fn cantrip_titles_set_the_flag() {
        let html = r#"
            <div class="fusion-text">
                <p><b>LUCE DANZANTE TRUCCHETTO 1</b><br>
                   <span class="tratto">Evocazione</span><br>
                   <em>Fonte: Manuale di Gioco, pag. 350</em></p>
                <hr>
                <p>Crei fino a quattro luci fluttuanti.</p>
            </div>
            <p><strong>Fonte</strong> <a href="https://2e.aonprd.com/Spells.aspx?ID=88">AoN</a></p>"#;
        let mut dom = Dom::parse_fragment(html);
        let r = parse_spell_page(&mut dom, &base(), "u", &Tables::default()).unwrap();
        assert!(r.cantrip);
        assert_eq!(r.level, 1);
        assert!(r.heightened_effects.is_empty());
    }

    #[test]
    fn parses_a_page_snapshot() {
        let html = std::fs::read_to_string("tests/fixtures/guarigione.html").unwrap();
        let mut dom = Dom::parse(&html);
        let base = ShortSpell {
            id: "guarigione".to_string(),
            name: "Guarigione".to_string(),
            short_text: "Energia positiva che cura o ferisce.".to_string(),
        };
        let r = parse_spell_page(
            &mut dom,
            &base,
            "https://www.archiviodeicercatori.it/incantesimi/guarigione/",
            &Tables::default(),
        )
        .unwrap();

        assert_eq!(r.level, 1);
        assert_eq!(r.traits, vec!["Guarigione", "Necromanzia", "Positivo"]);
        assert_eq!(r.traditions, vec!["primal", "divine"]);
        assert_eq!(r.raw_cast.as_deref(), Some("[A] a [AAA]"));
        assert_eq!(r.radius.as_deref(), Some("9 metri"));
        assert_eq!(r.targets.as_deref(), Some("1 creatura vivente o 1 non morto"));
        assert!(r.text.contains("[stordito](/conditions/stordito)"));
        assert!(r.text.contains("[guarigione di massa](/spell/guarigione-di-massa)"));
        assert_eq!(r.heightened_effects.len(), 1);
        assert_eq!(r.source.page, 343);
        assert_eq!(
            r.source.nethys_url,
            "https://2e.aonprd.com/Spells.aspx?ID=150"
        );
    }

    #[test]
    fn unparseable_title_is_an_error() {
        let html = r#"
            <div class="fusion-text">
                <p><b>PAGINA SENZA LIVELLO</b></p>
                <hr>
                <p>x</p>
            </div>"#;
        let mut dom = Dom::parse_fragment(html);
        let err = parse_spell_page(&mut dom, &base(), "u", &Tables::default()).unwrap_err();
        assert!(err.to_string().contains("can't parse title"));
    }

    #[test]
    fn unknown_entry_key_is_an_error() {
        let html = r#"
            <div class="fusion-text">
                <p><b>PROVA INCANTESIMO 1</b><br>
                   <span class="tratto">Evocazione</span><br>
                   <em>Fonte: Manuale di Gioco, pag. 1</em><br>
                   <b>Componente</b> segreta</p>
                <hr>
                <p>x</p>
            </div>
            <p><strong>Fonte</strong> <a href="https://2e.aonprd.com/x">AoN</a></p>"#;
        let mut dom = Dom::parse_fragment(html);
        let err = parse_spell_page(&mut dom, &base(), "u", &Tables::default()).unwrap_err();
        assert!(err.to_string().contains("unknown info entry"));
    }
}
