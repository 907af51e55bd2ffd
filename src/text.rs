//! Text cleanup shared by the converter and the record assemblers.

/// Canonicalize the typographic characters the upstream CMS sprinkles in:
/// curly apostrophes, opening curly quotes, non-breaking spaces.
pub fn normalize_text(text: &str) -> String {
    text.replace('\u{2019}', "'")
        .replace('\u{201C}', "\"")
        .replace('\u{00A0}', " ")
}

// Short connectives the upstream writes lowercase inside rule names.
const LOWERCASE_WORDS: &[&str] = &["del", "dal", "con", "della", "dello"];

/// Title-case an Italian rule name: words of three letters or more are
/// capitalized unless they are known connectives.
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String| {
        if word.is_empty() {
            return;
        }
        if word.chars().count() <= 2 || LOWERCASE_WORDS.contains(&word.as_str()) {
            out.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
        word.clear();
    };

    for ch in lower.chars() {
        if ch.is_alphanumeric() {
            word.push(ch);
        } else {
            flush(&mut word, &mut out);
            out.push(ch);
        }
    }
    flush(&mut word, &mut out);
    out
}

/// Collapse whitespace runs to single spaces. Leading and trailing runs are
/// kept as one space each so adjacent inline fragments do not glue together;
/// block-level callers trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}
