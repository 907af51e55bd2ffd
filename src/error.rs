use thiserror::Error;

/// Fatal conditions raised while parsing one entry. Each variant carries
/// enough context (offending href, fragment, key) to triage whether the
/// upstream page changed shape or a new rule is needed. Any of these aborts
/// the current document; no partial record is emitted.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A hyperlink matched none of the cross-reference rules.
    #[error("unknown link: {href} ({text})")]
    UnknownLink { href: String, text: String },

    /// A condition fragment is missing from the localized condition table.
    #[error("unknown condition {name} ({href})")]
    UnknownCondition { name: String, href: String },

    /// An inline icon matched none of the action-cost substrings.
    #[error("unknown image: {src}")]
    UnknownIcon { src: String },

    /// A "Fonte: ..." sentence did not parse, or named an unknown manual.
    #[error("invalid source: {text}")]
    InvalidCitation { text: String },

    /// A segmented entry key is not modeled by the record type being built.
    #[error("unknown info entry: {key} - {value}")]
    UnknownEntry { key: String, value: String },

    /// A title line did not match the expected NAME KIND LEVEL shape.
    #[error("can't parse title {title:?}")]
    BadTitle { title: String },

    /// A structural search came up empty where the layout requires a node.
    #[error("{0} not found")]
    MissingNode(&'static str),
}
