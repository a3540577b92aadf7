//! Literal escaping and parameter validation for generated queries

use regex::Regex;
use skos_core::{Result, SkosError};
use std::sync::OnceLock;

/// Characters with special meaning in the Lucene query parser.
/// `*` is deliberately absent so prefix wildcards reach the index.
pub const LUCENE_ESCAPE_CHARS: &str = " +-&|!(){}[]^\"~?:\\/";

/// Escape text for a single- or double-quoted SPARQL string literal
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Backslash-escape Lucene special characters
pub fn escape_lucene(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if LUCENE_ESCAPE_CHARS.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape XPath regex metacharacters, turning `*` into `.*`
pub fn wildcard_to_regex(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 8);
    for c in term.chars() {
        match c {
            '*' => out.push_str(".*"),
            '\\' | '.' | '+' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' | '-' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Trim, collapse repeated wildcards and default to prefix search
pub fn normalize_term(term: &str) -> String {
    let mut term = collapse_wildcards(term.trim());
    if !term.contains('*') {
        term.push('*');
    }
    term
}

/// Replace runs of `*` with a single `*`
pub fn collapse_wildcards(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    let mut prev_star = false;
    for c in term.chars() {
        if c == '*' && prev_star {
            continue;
        }
        prev_star = c == '*';
        out.push(c);
    }
    out
}

/// Lowercase for case-insensitive comparisons, as SPARQL `LCASE` would
pub fn lowercase(text: &str) -> String {
    text.to_lowercase()
}

fn lang_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{1,8}(-[A-Za-z0-9]{1,8})*$").unwrap_or_else(|_| unreachable!())
    })
}

fn qname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*:[A-Za-z0-9_][A-Za-z0-9_.-]*$")
            .unwrap_or_else(|_| unreachable!())
    })
}

/// Validate a BCP 47 style language tag
pub fn lang_tag(lang: &str) -> Result<&str> {
    if lang_tag_regex().is_match(lang) {
        Ok(lang)
    } else {
        Err(SkosError::InvalidParameter(format!("invalid language tag: {lang:?}")))
    }
}

/// Format a URI as an IRI reference, rejecting characters that could break out of `<...>`
pub fn iri(uri: &str) -> Result<String> {
    let invalid = uri.is_empty()
        || uri
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "<>\"{}|^`\\".contains(c));
    if invalid {
        return Err(SkosError::InvalidParameter(format!("invalid IRI: {uri:?}")));
    }
    Ok(format!("<{uri}>"))
}

/// Property given either as `prefix:name` or as a full URI
pub fn property(prop: &str) -> Result<String> {
    if prop.contains("://") {
        iri(prop)
    } else if qname_regex().is_match(prop) {
        Ok(prop.to_string())
    } else {
        Err(SkosError::InvalidParameter(format!("invalid property: {prop:?}")))
    }
}

/// Alternation path over several properties, parenthesized when needed
pub fn property_path(props: &[String]) -> Result<String> {
    if props.is_empty() {
        return Err(SkosError::InvalidParameter(
            "at least one hierarchy property is required".to_string(),
        ));
    }
    let terms = props
        .iter()
        .map(|p| property(p))
        .collect::<Result<Vec<_>>>()?;
    Ok(if terms.len() == 1 {
        terms[0].clone()
    } else {
        format!("({})", terms.join("|"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal(r"it's a \ test"), r"it\'s a \\ test");
        assert_eq!(escape_literal("say \"hi\"\n"), "say \\\"hi\\\"\\n");
    }

    #[test]
    fn test_escape_lucene_keeps_wildcard() {
        assert_eq!(escape_lucene("a+b*"), "a\\+b*");
        assert_eq!(escape_lucene("black sea"), "black\\ sea");
        assert_eq!(escape_lucene("(x):y/z"), "\\(x\\)\\:y\\/z");
    }

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  bass "), "bass*");
        assert_eq!(normalize_term("bass*"), "bass*");
        assert_eq!(normalize_term("**bass***"), "*bass*");
        assert_eq!(normalize_term(""), "*");
    }

    #[test]
    fn test_wildcard_to_regex() {
        assert_eq!(wildcard_to_regex("a*b.c"), "a.*b\\.c");
        assert_eq!(wildcard_to_regex("(x)"), "\\(x\\)");
    }

    #[test]
    fn test_iri_validation() {
        assert_eq!(iri("http://ex.org/a").unwrap(), "<http://ex.org/a>");
        assert!(iri("http://ex.org/a> . ?s ?p ?o . <x").is_err());
        assert!(iri("").is_err());
        assert!(iri("http://ex.org/a b").is_err());
    }

    #[test]
    fn test_property_forms() {
        assert_eq!(property("skos:broader").unwrap(), "skos:broader");
        assert_eq!(
            property("http://www.w3.org/2004/02/skos/core#broader").unwrap(),
            "<http://www.w3.org/2004/02/skos/core#broader>"
        );
        assert!(property("skos:broader }").is_err());
        assert_eq!(
            property_path(&["skos:broader".to_string(), "isothes:broaderGeneric".to_string()])
                .unwrap(),
            "(skos:broader|isothes:broaderGeneric)"
        );
        assert!(property_path(&[]).is_err());
    }

    #[test]
    fn test_lang_tag_validation() {
        assert!(lang_tag("en").is_ok());
        assert!(lang_tag("en-GB").is_ok());
        assert!(lang_tag("zh-Hant-TW").is_ok());
        assert!(lang_tag("en') }").is_err());
        assert!(lang_tag("").is_err());
    }

    proptest! {
        #[test]
        fn prop_normalized_term_always_has_wildcard(term in "[a-zA-Z *]{0,20}") {
            prop_assert!(normalize_term(&term).contains('*'));
        }

        #[test]
        fn prop_normalize_is_idempotent(term in "[a-z0-9 *'\\\\]{0,20}") {
            let once = normalize_term(&term);
            prop_assert_eq!(normalize_term(&once), once.clone());
        }

        #[test]
        fn prop_escaped_literal_has_no_bare_quote(text in ".{0,40}") {
            let escaped = escape_literal(&text);
            let mut prev_backslashes = 0usize;
            for c in escaped.chars() {
                if c == '\'' || c == '"' {
                    prop_assert!(prev_backslashes % 2 == 1);
                }
                prev_backslashes = if c == '\\' { prev_backslashes + 1 } else { 0 };
            }
        }
    }
}
