//! SPARQL result containers
//!
//! Tabular results follow the SPARQL 1.1 Query Results JSON format; graph
//! results are read from N-Triples.

use oxrdf::vocab::xsd;
use oxttl::NTriplesParser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// RDF Terms
// ============================================================================

/// RDF term bound to a result variable or appearing in a triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JsonTerm")]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RdfTerm {
    Iri {
        value: String,
    },
    Literal {
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
    },
    Blank {
        value: String,
    },
}

impl RdfTerm {
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri {
            value: value.into(),
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            lang: Some(lang.into()),
            datatype: None,
        }
    }

    /// Lexical value regardless of term kind
    pub fn value(&self) -> &str {
        match self {
            Self::Iri { value } | Self::Literal { value, .. } | Self::Blank { value } => value,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri { value } => Some(value),
            _ => None,
        }
    }

    /// Language tag of a literal; empty tags read as `None`
    pub fn lang(&self) -> Option<&str> {
        match self {
            Self::Literal { lang, .. } => lang.as_deref().filter(|l| !l.is_empty()),
            _ => None,
        }
    }

    /// Boolean value of an `xsd:boolean` literal (`true`/`1`)
    pub fn as_bool(&self) -> bool {
        matches!(self.value(), "true" | "1")
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.value().trim().parse().ok()
    }
}

/// Wire form of a term in SPARQL JSON results
#[derive(Debug, Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang", alias = "lang")]
    lang: Option<String>,
    datatype: Option<String>,
}

impl TryFrom<JsonTerm> for RdfTerm {
    type Error = String;

    fn try_from(term: JsonTerm) -> Result<Self, Self::Error> {
        match term.kind.as_str() {
            "uri" | "iri" => Ok(Self::Iri { value: term.value }),
            "literal" | "typed-literal" => Ok(Self::Literal {
                value: term.value,
                lang: term.lang,
                datatype: term.datatype,
            }),
            "bnode" | "blank" => Ok(Self::Blank { value: term.value }),
            other => Err(format!("unknown RDF term type: {other}")),
        }
    }
}

// ============================================================================
// Tabular Results
// ============================================================================

/// One row of a SELECT result
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Solution(HashMap<String, RdfTerm>);

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by fixtures and tests
    pub fn bind(mut self, var: impl Into<String>, term: RdfTerm) -> Self {
        self.0.insert(var.into(), term);
        self
    }

    pub fn get(&self, var: &str) -> Option<&RdfTerm> {
        self.0.get(var)
    }

    /// IRI value of a variable, if bound to an IRI
    pub fn iri(&self, var: &str) -> Option<&str> {
        self.get(var).and_then(RdfTerm::as_iri)
    }

    /// Lexical value of a variable, if bound
    pub fn value(&self, var: &str) -> Option<&str> {
        self.get(var).map(RdfTerm::value)
    }

    /// Language tag of a literal variable
    pub fn lang(&self, var: &str) -> Option<&str> {
        self.get(var).and_then(RdfTerm::lang)
    }

    pub fn bool(&self, var: &str) -> bool {
        self.get(var).map(RdfTerm::as_bool).unwrap_or(false)
    }

    pub fn is_bound(&self, var: &str) -> bool {
        self.0.contains_key(var)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct ResultHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct ResultBindings {
    #[serde(default)]
    bindings: Vec<Solution>,
}

/// SELECT query result
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultTable {
    #[serde(default)]
    head: ResultHead,
    #[serde(default)]
    results: ResultBindings,
}

impl ResultTable {
    pub fn new(vars: Vec<String>, rows: Vec<Solution>) -> Self {
        Self {
            head: ResultHead { vars },
            results: ResultBindings { bindings: rows },
        }
    }

    /// Parse `application/sparql-results+json`
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    pub fn vars(&self) -> &[String] {
        &self.head.vars
    }

    pub fn rows(&self) -> &[Solution] {
        &self.results.bindings
    }

    pub fn len(&self) -> usize {
        self.results.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }
}

// ============================================================================
// Graph Results
// ============================================================================

/// RDF statement from a CONSTRUCT/DESCRIBE result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Triple {
    pub subject: RdfTerm,
    pub predicate: String,
    pub object: RdfTerm,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("N-Triples syntax error: {message}")]
pub struct NTriplesError {
    pub message: String,
}

impl From<oxrdf::Subject> for RdfTerm {
    fn from(subject: oxrdf::Subject) -> Self {
        match subject {
            oxrdf::Subject::NamedNode(node) => Self::iri(node.into_string()),
            oxrdf::Subject::BlankNode(node) => Self::Blank {
                value: node.as_str().to_string(),
            },
        }
    }
}

impl From<oxrdf::Term> for RdfTerm {
    fn from(term: oxrdf::Term) -> Self {
        match term {
            oxrdf::Term::NamedNode(node) => Self::iri(node.into_string()),
            oxrdf::Term::BlankNode(node) => Self::Blank {
                value: node.as_str().to_string(),
            },
            oxrdf::Term::Literal(literal) => {
                let lang = literal.language().map(str::to_string);
                // plain and language-tagged literals carry no explicit datatype
                let datatype = Some(literal.datatype())
                    .filter(|dt| lang.is_none() && *dt != xsd::STRING)
                    .map(|dt| dt.as_str().to_string());
                Self::Literal {
                    value: literal.value().to_string(),
                    lang,
                    datatype,
                }
            }
        }
    }
}

impl From<oxrdf::Triple> for Triple {
    fn from(triple: oxrdf::Triple) -> Self {
        Self {
            subject: triple.subject.into(),
            predicate: triple.predicate.into_string(),
            object: triple.object.into(),
        }
    }
}

/// Parse an N-Triples document
pub fn parse_ntriples(body: &str) -> Result<Vec<Triple>, NTriplesError> {
    NTriplesParser::new()
        .for_reader(body.as_bytes())
        .map(|triple| {
            triple.map(Triple::from).map_err(|e| NTriplesError {
                message: e.to_string(),
            })
        })
        .collect()
}

// ============================================================================
// Raw Result
// ============================================================================

/// Result of executing one query, before transformation
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Table(ResultTable),
    Graph(Vec<Triple>),
}

impl RawResult {
    pub fn into_table(self) -> Option<ResultTable> {
        match self {
            Self::Table(table) => Some(table),
            Self::Graph(_) => None,
        }
    }

    pub fn into_graph(self) -> Option<Vec<Triple>> {
        match self {
            Self::Graph(triples) => Some(triples),
            Self::Table(_) => None,
        }
    }

    /// Rows for SELECT results, triples for graph results
    pub fn size(&self) -> usize {
        match self {
            Self::Table(table) => table.len(),
            Self::Graph(triples) => triples.len(),
        }
    }
}
