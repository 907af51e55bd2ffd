//! Cross-reference classification.
//!
//! Serialized content reaches this module as lightweight markup, with links
//! written `[text](target)` and inline icons `![](src)`. Every link is mapped
//! to a canonical target domain by an ordered rule set; the first matching
//! rule wins. An href matching no rule is a hard failure so that new upstream
//! link shapes surface immediately instead of leaking into records.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use super::tables::Tables;
use crate::error::ParseError;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+?)\)").unwrap());
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[\]\(([^)]+?)\)").unwrap());
static FEAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/talenti/(?:talenti-generici|talenti-di-abilita)/([^/]+)").unwrap()
});
static SKILL_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/abilita/\w+#").unwrap());

/// Where a classified link points, or `PlainText` when the reference is
/// dropped and only the display text survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossRef {
    Feat(String),
    Condition(String),
    Action(String),
    Trait(String),
    Spell(String),
    Deity(String),
    Monster(String),
    PlainText,
}

impl CrossRef {
    /// Canonical target path, or `None` for dropped references.
    pub fn target_path(&self) -> Option<String> {
        match self {
            CrossRef::Feat(name) => Some(format!("/feats/{}", name)),
            CrossRef::Condition(name) => Some(format!("/conditions/{}", name)),
            CrossRef::Action(name) => Some(format!("/actions/{}", name)),
            CrossRef::Trait(name) => Some(format!("/traits/{}", name)),
            CrossRef::Spell(name) => Some(format!("/spell/{}", name)),
            CrossRef::Deity(name) => Some(format!("/deity/{}", name)),
            CrossRef::Monster(name) => Some(format!("/monsters/{}", name)),
            CrossRef::PlainText => None,
        }
    }
}

/// Classify one raw href. `base` is prefixed onto same-page fragment links.
pub fn classify(
    raw_href: &str,
    text: &str,
    base: Option<&str>,
    tables: &Tables,
) -> Result<CrossRef, ParseError> {
    let mut href = raw_href.to_string();

    // Known upstream authoring errors, corrected before any matching.
    if href == "/tratti7uditivo/" {
        href = "/tratti/uditivo/".to_string();
    }
    if href == "http://adcpf2.seedcommunity.it/incantesimi/rituali/liberta/" && text == "stordita" {
        href = "/condizioni#stordito".to_string();
    }

    if href.starts_with('#') {
        if let Some(base) = base {
            href = format!("{}{}", base, href);
        }
    }

    if let Some(caps) = FEAT_RE.captures(&href) {
        return Ok(CrossRef::Feat(caps[1].to_string()));
    }

    if href == "/condizione/#nascosto" // upstream typo for /condizioni
        || href.starts_with("/condizioni/#")
        || href.starts_with("/condizioni#")
    {
        let mut name = fragment(&href);
        // Misspelled fragments observed upstream.
        if name == "osservata" {
            name = "osservato".to_string();
        }
        if name == "nascosta" {
            name = "nascosto".to_string();
        }
        if !tables.conditions.contains_key(name.as_str()) {
            return Err(ParseError::UnknownCondition { name, href });
        }
        return Ok(CrossRef::Condition(name));
    }

    if href.starts_with("/giocare/modalita-incontro#")
        || href.starts_with("/abilita#")
        || SKILL_ANCHOR_RE.is_match(&href)
    {
        return Ok(CrossRef::Action(fragment(&href)));
    }

    if href.starts_with("/tratto/") || href.starts_with("/tratti/") {
        return Ok(CrossRef::Trait(path_segment(&href, 1)));
    }

    if href.starts_with("/incantesimi/") && !tables.spell_index_pages.contains(&href.as_str()) {
        return Ok(CrossRef::Spell(path_segment(&href, 1)));
    }

    if href.starts_with("/ambientazione/divinita/") {
        return Ok(CrossRef::Deity(path_segment(&href, 2)));
    }

    if href.starts_with("/creature/mostri/") && href != "/creature/mostri/modelli/" {
        return Ok(CrossRef::Monster(path_segment(&href, 2)));
    }

    if tables.drop_exact.contains(&href.as_str())
        || tables.drop_prefixes.iter().any(|p| href.starts_with(p))
    {
        return Ok(CrossRef::PlainText);
    }

    if href == "http://url" {
        if !tables.allowed_broken.contains(&text) {
            warn!("broken link {} ({})", href, text);
        }
        return Ok(CrossRef::PlainText);
    }

    Err(ParseError::UnknownLink {
        href: raw_href.to_string(),
        text: text.to_string(),
    })
}

/// Rewrite every link and inline icon in a markup fragment.
pub fn replace_links(text: &str, base: Option<&str>, tables: &Tables) -> Result<String, ParseError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in LINK_RE.captures_iter(text) {
        let m = caps.get(0).expect("capture 0 always present");
        out.push_str(&text[last..m.start()]);
        let display = &caps[1];
        match classify(&caps[2], display, base, tables)?.target_path() {
            Some(path) => {
                let _ = write!(out, "[{}]({})", display, path);
            }
            None => out.push_str(display),
        }
        last = m.end();
    }
    out.push_str(&text[last..]);

    let text = out;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in IMAGE_RE.captures_iter(&text) {
        let m = caps.get(0).expect("capture 0 always present");
        out.push_str(&text[last..m.start()]);
        match try_parse_action_icon(&caps[1]) {
            Some(cost) => {
                let _ = write!(out, "[{}]", cost.code());
            }
            None => {
                return Err(ParseError::UnknownIcon {
                    src: caps[1].to_string(),
                })
            }
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Strip link syntax, keeping only display text.
pub fn remove_links(text: &str) -> String {
    LINK_RE.replace_all(text, "$1").into_owned()
}

fn fragment(href: &str) -> String {
    href.split('#').nth(1).unwrap_or("").to_string()
}

fn path_segment(href: &str, idx: usize) -> String {
    href.trim_start_matches('/')
        .split('/')
        .nth(idx)
        .unwrap_or("")
        .to_string()
}

// ── action-cost icons ──

/// Action cost encoded upstream as a small inline image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionCost {
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "reaction")]
    Reaction,
}

impl ActionCost {
    /// Compact display code used when icons are substituted inline.
    pub fn code(self) -> &'static str {
        match self {
            ActionCost::One => "A",
            ActionCost::Two => "AA",
            ActionCost::Three => "AAA",
            ActionCost::Free => "F",
            ActionCost::Reaction => "R",
        }
    }
}

/// Recognize an action-cost icon by its path, or `None`.
pub fn try_parse_action_icon(src: &str) -> Option<ActionCost> {
    if src.contains("reaction") {
        return Some(ActionCost::Reaction);
    }
    if src.contains("1-azione") {
        return Some(ActionCost::One);
    }
    if src.contains("2-azioni") {
        return Some(ActionCost::Two);
    }
    if src.contains("3-azioni") {
        return Some(ActionCost::Three);
    }
    if src.contains("free") {
        return Some(ActionCost::Free);
    }
    None
}

/// Icon classification where the slot may legitimately be empty: a missing
/// icon is "no action cost", an unrecognized one is a hard failure.
pub fn parse_action_icon(src: Option<&str>) -> Result<Option<ActionCost>, ParseError> {
    match src {
        None => Ok(None),
        Some(s) => try_parse_action_icon(s)
            .map(Some)
            .ok_or_else(|| ParseError::UnknownIcon { src: s.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Tables {
        Tables::default()
    }

    #[test]
    fn feat_links_keep_the_feat_name() {
        let t = tables();
        let r = classify("/talenti/talenti-generici/attacco-poderoso/", "Attacco Poderoso", None, &t).unwrap();
        assert_eq!(r, CrossRef::Feat("attacco-poderoso".to_string()));
        let r = classify("/talenti/talenti-di-abilita/intimidire-a-vista/", "x", None, &t).unwrap();
        assert_eq!(r.target_path().unwrap(), "/feats/intimidire-a-vista");
    }

    #[test]
    fn feat_rule_beats_drop_rules() {
        // Deliberately ambiguous: add a drop prefix that also covers feats.
        let mut t = tables();
        t.drop_prefixes.push("/talenti");
        let r = classify("/talenti/talenti-generici/attacco-poderoso/", "x", None, &t).unwrap();
        assert!(matches!(r, CrossRef::Feat(_)));
    }

    #[test]
    fn feat_index_pages_are_dropped() {
        let t = tables();
        let r = classify("/talenti/talenti-generici/", "Talenti Generici", None, &t).unwrap();
        assert_eq!(r, CrossRef::PlainText);
    }

    #[test]
    fn condition_fragments_resolve_localized() {
        let t = tables();
        let r = classify("/condizioni#prono", "prono", None, &t).unwrap();
        assert_eq!(r.target_path().unwrap(), "/conditions/prono");
    }

    #[test]
    fn misspelled_condition_fragments_are_corrected() {
        let t = tables();
        let a = classify("/condizioni#osservata", "osservata", None, &t).unwrap();
        let b = classify("/condizioni#osservato", "osservato", None, &t).unwrap();
        assert_eq!(a, b);
        let n = classify("/condizioni#nascosta", "nascosta", None, &t).unwrap();
        assert_eq!(n, CrossRef::Condition("nascosto".to_string()));
    }

    #[test]
    fn unknown_condition_fragment_fails() {
        let t = tables();
        let err = classify("/condizioni#sconosciuto", "x", None, &t).unwrap_err();
        assert!(matches!(err, ParseError::UnknownCondition { .. }));
    }

    #[test]
    fn fragment_links_use_the_base() {
        let t = tables();
        let r = classify("#stordito", "stordito", Some("/condizioni"), &t).unwrap();
        assert_eq!(r, CrossRef::Condition("stordito".to_string()));
    }

    #[test]
    fn authoring_errors_are_corrected_first() {
        let t = tables();
        let r = classify("/tratti7uditivo/", "uditivo", None, &t).unwrap();
        assert_eq!(r, CrossRef::Trait("uditivo".to_string()));
        let r = classify(
            "http://adcpf2.seedcommunity.it/incantesimi/rituali/liberta/",
            "stordita",
            None,
            &t,
        )
        .unwrap();
        assert_eq!(r, CrossRef::Condition("stordito".to_string()));
    }

    #[test]
    fn action_anchors() {
        let t = tables();
        let r = classify("/giocare/modalita-incontro#colpire", "Colpire", None, &t).unwrap();
        assert_eq!(r.target_path().unwrap(), "/actions/colpire");
        let r = classify("/abilita/atletica#spingere", "Spingere", None, &t).unwrap();
        assert_eq!(r, CrossRef::Action("spingere".to_string()));
    }

    #[test]
    fn spells_but_not_index_pages() {
        let t = tables();
        let r = classify("/incantesimi/palla-di-fuoco/", "palla di fuoco", None, &t).unwrap();
        assert_eq!(r.target_path().unwrap(), "/spell/palla-di-fuoco");
        // index pages are excluded from the spell rule and match nothing else
        let err = classify("/incantesimi/tradizione-arcana/", "arcani", None, &t).unwrap_err();
        assert!(matches!(err, ParseError::UnknownLink { .. }));
    }

    #[test]
    fn deities_and_monsters() {
        let t = tables();
        let r = classify("/ambientazione/divinita/gozreh/", "Gozreh", None, &t).unwrap();
        assert_eq!(r.target_path().unwrap(), "/deity/gozreh");
        let r = classify("/creature/mostri/goblin-guerriero/", "goblin", None, &t).unwrap();
        assert_eq!(r.target_path().unwrap(), "/monsters/goblin-guerriero");
        // the template listing is carved out of the monster rule and falls
        // through to the hard failure
        let err = classify("/creature/mostri/modelli/", "modelli", None, &t).unwrap_err();
        assert!(matches!(err, ParseError::UnknownLink { .. }));
    }

    #[test]
    fn drop_rules_keep_display_text_only() {
        let t = tables();
        for href in ["/classi/mago/", "/oggetti/equipaggiamento/#corda", "/giocare/x", "/stirpi/nano/"] {
            let out = replace_links(&format!("vedi [qualcosa]({})", href), None, &t).unwrap();
            assert_eq!(out, "vedi qualcosa");
        }
    }

    #[test]
    fn broken_link_placeholder_is_recovered() {
        let t = tables();
        let r = classify("http://url", "CD", None, &t).unwrap();
        assert_eq!(r, CrossRef::PlainText);
        // unknown display text still recovers, only louder
        let r = classify("http://url", "qualcos'altro", None, &t).unwrap();
        assert_eq!(r, CrossRef::PlainText);
    }

    #[test]
    fn unmatched_href_is_fatal() {
        let t = tables();
        let err = classify("/pagina-nuova/", "testo", None, &t).unwrap_err();
        match err {
            ParseError::UnknownLink { href, text } => {
                assert_eq!(href, "/pagina-nuova/");
                assert_eq!(text, "testo");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rewrites_inline() {
        let t = tables();
        let out = replace_links(
            "diventi [prono](/condizioni#prono) e [affaticato](/condizioni#affaticato)",
            None,
            &t,
        )
        .unwrap();
        assert_eq!(
            out,
            "diventi [prono](/conditions/prono) e [affaticato](/conditions/affaticato)"
        );
    }

    #[test]
    fn icon_mapping() {
        assert_eq!(try_parse_action_icon("/wp/uploads/2-azioni.png"), Some(ActionCost::Two));
        assert_eq!(try_parse_action_icon("icons/free-action.webp"), Some(ActionCost::Free));
        assert_eq!(try_parse_action_icon("icons/reaction.png"), Some(ActionCost::Reaction));
        assert_eq!(try_parse_action_icon("icons/boh.png"), None);
    }

    #[test]
    fn required_icon_failure_and_absent_icon() {
        assert!(parse_action_icon(Some("icons/boh.png")).is_err());
        assert_eq!(parse_action_icon(None).unwrap(), None);
        assert_eq!(
            parse_action_icon(Some("x/1-azione.png")).unwrap(),
            Some(ActionCost::One)
        );
    }

    #[test]
    fn icons_in_markup_become_codes() {
        let t = tables();
        let out = replace_links("Lancio ![](img/2-azioni.png) somatica", None, &t).unwrap();
        assert_eq!(out, "Lancio [AA] somatica");
        let err = replace_links("![](img/ignota.png)", None, &t).unwrap_err();
        assert!(matches!(err, ParseError::UnknownIcon { .. }));
    }

    #[test]
    fn remove_links_keeps_text() {
        assert_eq!(remove_links("[Gozreh](/deity/gozreh), [Nethys](/deity/nethys)"), "Gozreh, Nethys");
    }
}
