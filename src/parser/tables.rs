//! Process-wide lookup tables.
//!
//! Built once at startup and passed by reference into the classifier, the
//! citation parser and the record assemblers. Immutable after construction,
//! so the pipeline stays a pure function of its input tree.

use std::collections::HashMap;

/// Closed vocabularies and pattern lists the classifier and citation parser
/// match against.
pub struct Tables {
    /// Localized condition anchor → English condition name.
    pub conditions: HashMap<&'static str, &'static str>,
    /// Manual titles accepted in "Fonte:" citations.
    pub manuals: Vec<&'static str>,
    /// Spell-section index pages that are not spells themselves.
    pub spell_index_pages: Vec<&'static str>,
    /// Exact hrefs whose links are dropped, keeping the display text.
    pub drop_exact: Vec<&'static str>,
    /// Href prefixes for rule categories not modeled yet; links are dropped.
    pub drop_prefixes: Vec<&'static str>,
    /// Display texts where the `http://url` placeholder is known benign.
    pub allowed_broken: Vec<&'static str>,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            conditions: condition_map(),
            manuals: vec![
                "Manuale di Gioco",
                "Bestiario",
                "Guida del Game Master",
                "Presagi Perduti: Divinità e Magia",
                "Presagi Perduti: Atlante",
                "Era delle Ceneri: Domani Brucerà",
                "Era delle Ceneri: Il Culto delle Ceneri",
                "Era delle Ceneri: La Collina dei Cavalieri Infernali",
            ],
            spell_index_pages: vec![
                "/incantesimi/incantesimi-focalizzati/",
                "/incantesimi/tradizione-arcana/",
                "/incantesimi/tradizione-divina/",
                "/incantesimi/tradizione-primeva/",
                "/incantesimi/tradizione-occulta/",
                "/incantesimi/rituali/",
                "/incantesimi/",
            ],
            drop_exact: vec![
                "/abilita",
                "/creature",
                "/tratti",
                "/ambientazione/lingue/",
                "/condizioni",
                "/condizioni/",
                "/talenti/talenti-generici/",
                "/talenti/talenti-di-abilita/",
                "/incantesimi",
                // absolute URL left in by the upstream authors
                "https://archiviodeicercatori.it/giocare/prove-specifiche-e-prove-speciali/#tiri-per-colpire",
            ],
            drop_prefixes: vec![
                "/abilita/",
                "/creature/capacita",
                "/archetipi",
                "/stirpi",
                "/classi",
                "/oggetti",
                "/giocare",
                "/game-master/",
                "/introduzione/",
                "/pericoli",
                "/incantesimi#",
            ],
            allowed_broken: vec!["CD", "Volume", "penalità alle prove", "Attivazione"],
        }
    }
}

fn condition_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("abbagliato", "Dazzled"),
        ("accecato", "Blinded"),
        ("accelerato", "Quickened"),
        ("affascinato", "Fascinated"),
        ("affaticato", "Fatigued"),
        ("afferrato", "Grabbed"),
        ("amichevole", "Friendly"),
        ("assordato", "Deafened"),
        ("collaborativo", "Helpful"),
        ("condannato", "Doomed"),
        ("confuso", "Confused"),
        ("controllato", "Controlled"),
        ("danno-persistente", "Persistent Damage"),
        ("ferito", "Wounded"),
        ("immobilizzato", "Immobilized"),
        ("impreparato", "Flat-Footed"),
        ("in-fuga", "Fleeing"),
        ("indebolito", "Enfeebled"),
        ("indifferente", "Indifferent"),
        ("ingombrato", "Encumbered"),
        ("inosservato", "Unnoticed"),
        ("invisibile", "Invisible"),
        ("maldestro", "Clumsy"),
        ("maldisposto", "Unfriendly"),
        ("morente", "Dying"),
        ("nascosto", "Hidden"),
        ("nauseato", "Sickened"),
        ("non-individuato", "Undetected"),
        ("occultato", "Concealed"),
        ("osservato", "Observed"),
        ("ostile", "Hostile"),
        ("paralizzato", "Paralyzed"),
        ("pietrificato", "Petrified"),
        ("privo-di-sensi", "Unconscious"),
        ("prono", "Prone"),
        ("rallentato", "Slowed"),
        ("risucchiato", "Drained"),
        ("rotto", "Broken"),
        ("sbigottito", "Stupefied"),
        ("spaventato", "Frightened"),
        ("stordito", "Stunned"),
        ("trattenuto", "Restrained"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_table_is_complete() {
        let tables = Tables::default();
        assert_eq!(tables.conditions.len(), 42);
        assert_eq!(tables.conditions.get("prono"), Some(&"Prone"));
        assert_eq!(tables.conditions.get("danno-persistente"), Some(&"Persistent Damage"));
    }

    #[test]
    fn lookups_are_case_sensitive() {
        let tables = Tables::default();
        assert!(tables.conditions.get("Prono").is_none());
    }
}
