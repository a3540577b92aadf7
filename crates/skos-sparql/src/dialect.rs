//! SPARQL dialect strategies
//!
//! A dialect supplies the three clauses whose syntax differs between triple
//! stores: the text-search clause, the language clause, and the ORDER BY
//! expression. Everything else in a query is shared.
//!
//! Author: hephaex@gmail.com

use crate::escape::{escape_literal, escape_lucene, lowercase, wildcard_to_regex};
use crate::scope::GraphScope;
use skos_core::Dialect;
use std::sync::Arc;

/// Result cap requested from a text index; index defaults are too small for large vocabularies
pub const TEXT_INDEX_MAX_RESULTS: usize = 100_000;

/// Jena's virtual graph spanning all named graphs
pub const JENA_UNION_GRAPH: &str = "urn:x-arq:UnionGraph";

/// Clause-producing capabilities that differ between triple stores
pub trait DialectStrategy: Send + Sync + std::fmt::Debug {
    /// Dialect name for logging
    fn name(&self) -> &str;

    /// Pattern binding `?s` and `?match` to resources whose `property` value
    /// matches `term`. `property` is a prefixed name, an IRI, or a variable.
    /// `term` is already normalized; `lang` already validated.
    fn text_search_clause(
        &self,
        property: &str,
        term: &str,
        lang: Option<&str>,
        scope: &GraphScope,
    ) -> String;

    /// Restrict `?match` to a language, in the dialect's own syntax
    fn language_clause(&self, lang: &str) -> String;

    /// ORDER BY expression for sorting by `expression`
    fn order_by_clause(&self, expression: &str, lang: Option<&str>) -> String;
}

/// Create a dialect strategy by configuration value
pub fn create_dialect(dialect: Dialect, collation_enabled: bool) -> Arc<dyn DialectStrategy> {
    match dialect {
        Dialect::Generic => Arc::new(GenericDialect),
        Dialect::JenaText => Arc::new(JenaTextDialect::new(collation_enabled)),
    }
}

// ============================================================================
// Generic SPARQL 1.1
// ============================================================================

/// Plain SPARQL 1.1 using string functions over label properties
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDialect;

impl GenericDialect {
    /// FILTER condition over `?match` for exact, prefix, suffix or infix patterns
    fn match_condition(term: &str) -> String {
        let star_count = term.matches('*').count();
        if star_count == 0 {
            let lit = escape_literal(&lowercase(term));
            return format!("LCASE(STR(?match)) = '{lit}'");
        }
        if star_count == 1 && term.len() > 1 {
            if let Some(prefix) = term.strip_suffix('*') {
                let lit = escape_literal(&lowercase(prefix));
                return format!("STRSTARTS(LCASE(STR(?match)), '{lit}')");
            }
            if let Some(suffix) = term.strip_prefix('*') {
                let lit = escape_literal(&lowercase(suffix));
                return format!("STRENDS(LCASE(STR(?match)), '{lit}')");
            }
        }
        let pattern = escape_literal(&wildcard_to_regex(term));
        format!("REGEX(STR(?match), '^{pattern}$', 'i')")
    }
}

impl DialectStrategy for GenericDialect {
    fn name(&self) -> &str {
        "Generic"
    }

    fn text_search_clause(
        &self,
        property: &str,
        term: &str,
        lang: Option<&str>,
        _scope: &GraphScope,
    ) -> String {
        let condition = Self::match_condition(term);
        let lang_cond = lang
            .map(|l| format!(" && {}", self.language_clause(l)))
            .unwrap_or_default();
        format!("?s {property} ?match . FILTER ({condition}{lang_cond})")
    }

    fn language_clause(&self, lang: &str) -> String {
        format!("LANGMATCHES(lang(?match), '{}')", escape_literal(lang))
    }

    fn order_by_clause(&self, expression: &str, _lang: Option<&str>) -> String {
        // no portable collation function in SPARQL 1.1
        expression.to_string()
    }
}

// ============================================================================
// Jena Text (Lucene index)
// ============================================================================

/// Fuseki with a jena-text index, queried through `text:query`
#[derive(Debug, Clone, Copy)]
pub struct JenaTextDialect {
    collation_enabled: bool,
    max_results: usize,
}

impl JenaTextDialect {
    pub fn new(collation_enabled: bool) -> Self {
        Self {
            collation_enabled,
            max_results: TEXT_INDEX_MAX_RESULTS,
        }
    }

    /// Override the index result cap
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

impl Default for JenaTextDialect {
    fn default() -> Self {
        Self::new(false)
    }
}

impl DialectStrategy for JenaTextDialect {
    fn name(&self) -> &str {
        "JenaText"
    }

    fn text_search_clause(
        &self,
        property: &str,
        term: &str,
        lang: Option<&str>,
        scope: &GraphScope,
    ) -> String {
        // Lucene escaping first, then SPARQL quoting
        let lucene = escape_literal(&escape_lucene(term));
        let lang_clause = lang
            .map(|l| format!(" {}", self.language_clause(l)))
            .unwrap_or_default();
        let clause = format!(
            "(?s ?score ?match) text:query ({property} '{lucene}' {}{lang_clause}) .",
            self.max_results
        );
        if scope.is_union() {
            format!("GRAPH <{JENA_UNION_GRAPH}> {{ {clause} }}")
        } else {
            clause
        }
    }

    fn language_clause(&self, lang: &str) -> String {
        format!("'lang:{}*'", escape_literal(lang))
    }

    fn order_by_clause(&self, expression: &str, lang: Option<&str>) -> String {
        match lang {
            Some(lang) if self.collation_enabled => {
                format!("arq:collation('{}', {expression})", escape_literal(lang))
            }
            _ => expression.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_match_conditions() {
        let scope = GraphScope::Default;
        let d = GenericDialect;
        assert_eq!(
            d.text_search_clause("?prop", "bass", None, &scope),
            "?s ?prop ?match . FILTER (LCASE(STR(?match)) = 'bass')"
        );
        assert_eq!(
            d.text_search_clause("?prop", "Bass*", Some("en"), &scope),
            "?s ?prop ?match . FILTER (STRSTARTS(LCASE(STR(?match)), 'bass') && LANGMATCHES(lang(?match), 'en'))"
        );
        assert!(d
            .text_search_clause("skos:prefLabel", "*fish", None, &scope)
            .contains("STRENDS(LCASE(STR(?match)), 'fish')"));
        assert!(d
            .text_search_clause("?prop", "b*ss*", None, &scope)
            .contains("REGEX(STR(?match), '^b.*ss.*$', 'i')"));
        assert!(d
            .text_search_clause("?prop", "*", None, &scope)
            .contains("REGEX(STR(?match), '^.*$', 'i')"));
    }

    #[test]
    fn test_generic_escapes_quotes() {
        let clause = GenericDialect.text_search_clause("?prop", "o'neil*", None, &GraphScope::Default);
        assert!(clause.contains(r"STRSTARTS(LCASE(STR(?match)), 'o\'neil')"));
    }

    #[test]
    fn test_jena_text_clause() {
        let d = JenaTextDialect::default();
        assert_eq!(
            d.text_search_clause("?prop", "black sea*", Some("en"), &GraphScope::Default),
            r"(?s ?score ?match) text:query (?prop 'black\\ sea*' 100000 'lang:en*') ."
        );
        let union = GraphScope::Union(vec!["http://ex.org/g".to_string()]);
        assert_eq!(
            d.text_search_clause("skos:prefLabel", "b*", None, &union),
            "GRAPH <urn:x-arq:UnionGraph> { (?s ?score ?match) text:query (skos:prefLabel 'b*' 100000) . }"
        );
    }

    #[test]
    fn test_jena_escapes_quote_after_lucene() {
        let d = JenaTextDialect::default();
        let clause = d.text_search_clause("?prop", "it's*", None, &GraphScope::Default);
        assert!(clause.contains(r"'it\'s*'"));
    }

    #[test]
    fn test_order_by_collation() {
        assert_eq!(
            GenericDialect.order_by_clause("LCASE(?match)", Some("fi")),
            "LCASE(?match)"
        );
        assert_eq!(
            JenaTextDialect::new(false).order_by_clause("LCASE(?match)", Some("fi")),
            "LCASE(?match)"
        );
        assert_eq!(
            JenaTextDialect::new(true).order_by_clause("LCASE(?match)", Some("fi")),
            "arq:collation('fi', LCASE(?match))"
        );
    }

    #[test]
    fn test_create_dialect() {
        assert_eq!(create_dialect(Dialect::Generic, true).name(), "Generic");
        assert_eq!(create_dialect(Dialect::JenaText, false).name(), "JenaText");
    }
}
