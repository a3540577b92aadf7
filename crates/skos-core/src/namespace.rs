//! Namespace prefix table
//!
//! Immutable prefix -> namespace mapping used to expand qualified names,
//! shorten URIs in results, and declare prefixes in generated queries.

use serde::{Deserialize, Serialize};

/// Well-known namespaces, in declaration order
const DEFAULT_NAMESPACES: &[(&str, &str)] = &[
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("skosxl", "http://www.w3.org/2008/05/skos-xl#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("dc", "http://purl.org/dc/terms/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("dc11", "http://purl.org/dc/elements/1.1/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("isothes", "http://purl.org/iso25964/skos-thes#"),
    ("text", "http://jena.apache.org/text#"),
    ("arq", "http://jena.apache.org/ARQ/function#"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTable {
    entries: Vec<(String, String)>,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_NAMESPACES
                .iter()
                .map(|(p, ns)| (p.to_string(), ns.to_string()))
                .collect(),
        }
    }
}

impl NamespaceTable {
    /// Empty table
    pub fn empty() -> Self {
        Self { entries: vec![] }
    }

    /// Add or replace a prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let namespace = namespace.into();
        match self.entries.iter_mut().find(|(p, _)| *p == prefix) {
            Some(entry) => entry.1 = namespace,
            None => self.entries.push((prefix, namespace)),
        }
        self
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.as_str())
    }

    /// Expand `prefix:local` into a full URI; anything else is returned unchanged
    pub fn expand(&self, qname: &str) -> String {
        if let Some((prefix, local)) = qname.split_once(':') {
            if !local.starts_with("//") {
                if let Some(ns) = self.namespace(prefix) {
                    return format!("{ns}{local}");
                }
            }
        }
        qname.to_string()
    }

    /// Shorten a URI to `prefix:local` using the longest matching namespace
    pub fn shorten(&self, uri: &str) -> Option<String> {
        self.entries
            .iter()
            .filter(|(_, ns)| uri.starts_with(ns.as_str()) && uri.len() > ns.len())
            .max_by_key(|(_, ns)| ns.len())
            .and_then(|(prefix, ns)| {
                let local = &uri[ns.len()..];
                let valid = local
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
                valid.then(|| format!("{prefix}:{local}"))
            })
    }

    /// Shorten if possible, otherwise return the URI itself
    pub fn shorten_or_uri(&self, uri: &str) -> String {
        self.shorten(uri).unwrap_or_else(|| uri.to_string())
    }

    /// PREFIX declarations for every prefix the query uses but does not declare
    pub fn prefix_declarations(&self, query: &str) -> String {
        let mut out = String::new();
        for (prefix, ns) in &self.entries {
            let used = format!("{prefix}:");
            let declared = format!("PREFIX {prefix}:");
            if uses_prefix(query, &used) && !query.contains(&declared) {
                out.push_str(&format!("PREFIX {prefix}: <{ns}>\n"));
            }
        }
        out
    }

    /// Query text with the needed PREFIX declarations prepended
    pub fn with_prefixes(&self, query: &str) -> String {
        format!("{}{}", self.prefix_declarations(query), query)
    }
}

/// Whether `needle` occurs as a prefix token, not as the tail of a longer name or inside an IRI
fn uses_prefix(query: &str, needle: &str) -> bool {
    let mut in_iri = false;
    let bytes = query.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' if !in_iri => {
                // `<` also opens comparisons; only treat it as an IRI when no whitespace follows
                in_iri = bytes.get(i + 1).is_some_and(|b| !b.is_ascii_whitespace() && *b != b'=');
            }
            b'>' if in_iri => in_iri = false,
            _ if !in_iri && bytes[i..].starts_with(needle.as_bytes()) => {
                let boundary = i == 0 || {
                    let prev = bytes[i - 1];
                    !(prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'?' || prev == b'$')
                };
                if boundary {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_and_shorten() {
        let ns = NamespaceTable::default();
        assert_eq!(
            ns.expand("skos:Concept"),
            "http://www.w3.org/2004/02/skos/core#Concept"
        );
        assert_eq!(ns.expand("http://ex.org/x"), "http://ex.org/x");
        assert_eq!(ns.expand("unknown:x"), "unknown:x");

        assert_eq!(
            ns.shorten("http://www.w3.org/2004/02/skos/core#prefLabel").as_deref(),
            Some("skos:prefLabel")
        );
        assert_eq!(ns.shorten("http://www.skosmos.skos/test/ta1"), None);
        assert_eq!(ns.shorten_or_uri("http://ex.org/a"), "http://ex.org/a");
    }

    #[test]
    fn test_with_prefix_extends_table() {
        let ns = NamespaceTable::default().with_prefix("test", "http://www.skosmos.skos/test/");
        assert_eq!(
            ns.shorten("http://www.skosmos.skos/test/ta111").as_deref(),
            Some("test:ta111")
        );
    }

    #[test]
    fn test_prefix_declarations_only_for_used_prefixes() {
        let ns = NamespaceTable::default();
        let query = "SELECT ?s WHERE { ?s skos:prefLabel ?l . ?s a <http://ex.org/dc:x> }";
        let decl = ns.prefix_declarations(query);
        assert_eq!(decl, "PREFIX skos: <http://www.w3.org/2004/02/skos/core#>\n");
    }

    #[test]
    fn test_prefix_declarations_skip_declared_and_suffix_matches() {
        let ns = NamespaceTable::default();
        let query = "PREFIX skos: <http://www.w3.org/2004/02/skos/core#>\nSELECT ?s WHERE { ?s skos:notation ?n . ?s dcterms:modified ?d }";
        let decl = ns.prefix_declarations(query);
        assert!(!decl.contains("PREFIX skos:"));
        assert!(decl.contains("PREFIX dcterms:"));
        // `dc:` is not a prefix of `dcterms:`
        assert!(!decl.contains("PREFIX dc:"));
    }

    #[test]
    fn test_less_than_comparison_is_not_an_iri() {
        let ns = NamespaceTable::default();
        let query = "FILTER(?a < 3 && ?b = skos:Concept)";
        assert!(ns.prefix_declarations(query).contains("PREFIX skos:"));
    }
}
