//! "Fonte: <manuale>, pag. <n>" citation parsing.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::tables::Tables;
use crate::error::ParseError;

// The comma before "pag." is sometimes missing upstream.
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Fonte:\s*([^,]+?),?\s*pag\.\s*(\d+)").unwrap());

/// Manual name and page extracted from a citation sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub manual: String,
    pub page: u32,
}

/// Parse a citation sentence. The manual must match the closed vocabulary
/// exactly; this never guesses.
pub fn parse_citation(sentence: &str, tables: &Tables) -> Result<Citation, ParseError> {
    let caps = CITATION_RE
        .captures(sentence)
        .ok_or_else(|| ParseError::InvalidCitation {
            text: sentence.to_string(),
        })?;
    let manual = caps[1].to_string();
    if !tables.manuals.contains(&manual.as_str()) {
        return Err(ParseError::InvalidCitation {
            text: sentence.to_string(),
        });
    }
    let page = caps[2]
        .parse()
        .map_err(|_| ParseError::InvalidCitation {
            text: sentence.to_string(),
        })?;
    Ok(Citation { manual, page })
}
