//! SKOS Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used by the vocabulary query engine:
//! - Error taxonomy shared by every layer
//! - Typed records produced from SPARQL results (label hits, hierarchy nodes, breadcrumbs)
//! - SPARQL result containers and the `Transport` trait
//! - Configuration, namespace table and vocabulary registry
//!
//! Author: hephaex@gmail.com

pub mod config;
pub mod namespace;
pub mod rdf;
pub mod vocabulary;

pub use config::{
    AppConfig, ConfigError, Dialect, EndpointBinding, GraphTarget, LoggingConfig, SparqlConfig,
    VocabularyConfig,
};
pub use namespace::NamespaceTable;
pub use rdf::{NTriplesError, RawResult, RdfTerm, ResultTable, Solution, Triple};
pub use vocabulary::{Vocabulary, VocabularyRegistry};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Maximum number of query characters carried in a `QueryFailed` error
pub const QUERY_EXCERPT_LEN: usize = 200;

/// Core error types for vocabulary query operations
#[derive(Error, Debug)]
pub enum SkosError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Query failed at {endpoint}: {reason} (query: {query})")]
    QueryFailed {
        endpoint: String,
        query: String,
        reason: String,
    },

    #[error("URI {uri} matches several vocabularies: {}", candidates.join(", "))]
    AmbiguousVocabulary { uri: String, candidates: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SkosError {
    /// Build a `QueryFailed` error, truncating the query text for diagnostics
    pub fn query_failed(
        endpoint: impl Into<String>,
        query: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::QueryFailed {
            endpoint: endpoint.into(),
            query: excerpt(query, QUERY_EXCERPT_LEN),
            reason: reason.to_string(),
        }
    }
}

impl From<ConfigError> for SkosError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SkosError>;

/// Truncate text on a character boundary, marking the cut with an ellipsis
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

// ============================================================================
// Request Context
// ============================================================================

/// Per-request language state threaded through every engine call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// UI language used for labels
    pub language: String,

    /// Content language, when different from the UI language
    pub content_language: Option<String>,
}

impl RequestContext {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            content_language: None,
        }
    }

    pub fn with_content_language(mut self, lang: impl Into<String>) -> Self {
        self.content_language = Some(lang.into());
        self
    }

    /// Language for vocabulary content: the content language if set, else the UI language
    pub fn content_lang(&self) -> &str {
        self.content_language.as_deref().unwrap_or(&self.language)
    }
}

// ============================================================================
// Search Parameters
// ============================================================================

/// Parameters of a free-text concept search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Raw search term; `*` acts as wildcard
    pub term: String,

    /// Display language for returned labels (`None` = any)
    pub lang: Option<String>,

    /// Language of labels to match (`None` = any language)
    pub search_lang: Option<String>,

    /// Vocabulary ids to search; empty means all configured vocabularies
    pub vocabularies: Vec<String>,

    /// Limit hits to instances of these classes
    pub types: Vec<String>,

    /// Limit hits to members of this group
    pub group: Option<String>,

    /// Limit hits to transitive narrowers of this concept
    pub parent: Option<String>,

    /// Limit hits to these concept schemes
    pub schemes: Vec<String>,

    /// Also match hidden labels
    pub hidden: bool,

    /// Return a single best match per concept
    pub unique: bool,

    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            hidden: true,
            ..Default::default()
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_search_lang(mut self, lang: impl Into<String>) -> Self {
        self.search_lang = Some(lang.into());
        self
    }

    pub fn with_vocabulary(mut self, id: impl Into<String>) -> Self {
        self.vocabularies.push(id.into());
        self
    }

    pub fn with_type(mut self, class: impl Into<String>) -> Self {
        self.types.push(class.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.schemes.push(scheme.into());
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_pagination(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// True when the term carries no character other than `*` and whitespace
    pub fn is_wildcard_only(&self) -> bool {
        self.term.trim().chars().all(|c| c == '*')
    }

    /// Searches with only a wildcard term still run if a group or parent limit narrows them
    pub fn should_short_circuit(&self) -> bool {
        self.is_wildcard_only() && self.group.is_none() && self.parent.is_none()
    }
}

/// Validated limit/offset pair; `None` means unbounded on that side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Pagination {
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self { limit, offset }
    }

    /// Validate caller-supplied signed values
    pub fn try_new(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        let convert = |name: &str, v: Option<i64>| -> Result<Option<usize>> {
            match v {
                None => Ok(None),
                Some(n) if n < 0 => Err(SkosError::InvalidParameter(format!(
                    "{name} must be non-negative, got {n}"
                ))),
                Some(n) => usize::try_from(n).map(Some).map_err(|_| {
                    SkosError::InvalidParameter(format!("{name} out of range: {n}"))
                }),
            }
        };
        Ok(Self {
            limit: convert("limit", limit)?,
            offset: convert("offset", offset)?,
        })
    }

    /// Rows a store must return so that this page can be cut from a merge of
    /// several result lists
    pub fn window(&self) -> Self {
        Self {
            limit: self
                .limit
                .map(|limit| limit.saturating_add(self.offset.unwrap_or(0))),
            offset: None,
        }
    }

    /// Apply to an in-memory result list
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0);
        let iter = items.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

// ============================================================================
// Search Results
// ============================================================================

/// Which vocabulary a result URI belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Attribution {
    /// Belongs to the vocabulary that was queried
    Local { vocab: String },
    /// Found in the queried vocabulary but its URI space belongs to another one
    External { vocab: String, found_in: String },
    /// No configured vocabulary claims the URI
    Foreign { found_in: Option<String> },
}

impl Attribution {
    /// Vocabulary the result was retrieved from
    pub fn queried_vocab(&self) -> Option<&str> {
        match self {
            Self::Local { vocab } => Some(vocab),
            Self::External { found_in, .. } => Some(found_in),
            Self::Foreign { found_in } => found_in.as_deref(),
        }
    }
}

/// A concept matched by a label search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelHit {
    pub uri: String,

    /// URI with the owning vocabulary's URI space stripped
    pub local_name: Option<String>,

    /// Preferred label in the display language
    pub pref_label: Option<String>,

    /// Preferred label that matched when it differs from the display label
    pub matched_pref_label: Option<String>,

    pub alt_label: Option<String>,
    pub hidden_label: Option<String>,

    /// Language of the label that matched
    pub lang: Option<String>,

    pub notation: Option<String>,

    /// Shortened type names
    pub types: Vec<String>,

    /// Named graph the hit was read from, if the query spanned graphs
    pub graph: Option<String>,

    pub attribution: Attribution,
}

/// Entry of an alphabetical index listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphabeticalHit {
    pub uri: String,
    pub local_name: Option<String>,
    pub pref_label: String,
    pub alt_label: Option<String>,
    pub lang: Option<String>,
    pub qualifier: Option<String>,
}

// ============================================================================
// Hierarchy
// ============================================================================

/// Node of a concept hierarchy as read from a transitive-closure query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub uri: String,
    pub label: Option<String>,
    pub notation: Option<String>,

    /// Direct broader (or other hierarchy property) targets
    pub direct: Vec<String>,

    /// True when the node is a top concept of some scheme
    pub is_top: bool,

    /// Some other node of the same closure lists this one as direct broader
    pub has_narrower: bool,
}

impl ConceptNode {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_direct(mut self, broader: impl Into<String>) -> Self {
        self.direct.push(broader.into());
        self
    }

    pub fn with_top(mut self, is_top: bool) -> Self {
        self.is_top = is_top;
        self
    }
}

/// Flat transitive-closure map keyed by concept URI
pub type TransitiveClosure = BTreeMap<String, ConceptNode>;

/// Placeholder label shown for hidden breadcrumb nodes
pub const HIDDEN_CRUMB_LABEL: &str = "...";

/// One element of a breadcrumb path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
    pub uri: String,
    pub pref_label: Option<String>,

    /// Set on the placeholder standing in for a compressed run
    #[serde(default)]
    pub hidden: bool,

    /// Original label of a node hidden by path compression
    pub hidden_label: Option<String>,
}

impl Crumb {
    pub fn new(uri: impl Into<String>, label: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            pref_label: label,
            hidden: false,
            hidden_label: None,
        }
    }

    /// Replace the label with the placeholder, keeping the original recoverable
    pub fn hide(&mut self) {
        if !self.hidden {
            self.hidden = true;
            self.hidden_label = self.pref_label.take();
            self.pref_label = Some(HIDDEN_CRUMB_LABEL.to_string());
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Label as stored before any compression
    pub fn original_label(&self) -> Option<&str> {
        if self.is_hidden() {
            self.hidden_label.as_deref()
        } else {
            self.pref_label.as_deref()
        }
    }
}

/// Ordered root-to-leaf sequence
pub type BreadcrumbPath = Vec<Crumb>;

/// Breadcrumb paths for one concept, compressed for display plus the raw ancestry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbPaths {
    /// Display paths: each compressed run collapses into one placeholder
    pub breadcrumbs: Vec<BreadcrumbPath>,

    /// For each display path, the hidden nodes its placeholder stands for
    pub combined: Vec<BreadcrumbPath>,

    /// Uncompressed paths with original labels
    pub raw: Vec<BreadcrumbPath>,
}

/// Top concept of a concept scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopConcept {
    pub uri: String,
    pub top_concept_of: String,
    pub label: String,
    pub notation: Option<String>,
    pub has_children: bool,
}

/// Narrower concept of a concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildConcept {
    pub uri: String,
    pub pref_label: Option<String>,
    pub notation: Option<String>,
    pub has_children: bool,

    /// Set when the child is a collection that should be expanded into its members
    #[serde(skip)]
    pub is_collection: bool,

    /// Collection this concept was expanded from
    pub collection: Option<String>,
}

/// Narrower entry listed under a node of a parent list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrowerEntry {
    pub uri: String,
    pub label: Option<String>,
    pub notation: Option<String>,
    pub has_children: bool,
}

/// Ancestor of a concept with its narrower siblings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentListEntry {
    pub uri: String,
    pub pref_label: Option<String>,
    pub notation: Option<String>,
    pub broader: Vec<String>,
    pub narrower: Vec<NarrowerEntry>,

    /// Schemes this node is a top concept of, sorted
    pub tops: Vec<String>,
}

// ============================================================================
// Property Values
// ============================================================================

/// Value of a (possibly transitive) concept property
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub label: Option<String>,
}

/// Properties of a concept read from a graph result, keyed by shortened property name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConceptDescription {
    pub uri: String,
    pub properties: BTreeMap<String, Vec<RdfTerm>>,

    /// Labels of the resources the concept points to (and of its properties)
    pub related_labels: BTreeMap<String, Vec<RdfTerm>>,

    /// Groups the concept is a member of
    pub groups: Vec<String>,
}

// ============================================================================
// Groups, Schemes, Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptGroup {
    pub uri: String,
    pub pref_label: Option<String>,
    pub child_groups: Vec<String>,
    pub has_members: bool,
    pub notation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub uri: String,
    pub is_super: bool,
    pub has_members: bool,
    pub types: Vec<String>,
    pub pref_label: Option<String>,
    pub notation: Option<String>,
}

/// Recently created or modified concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub uri: String,
    pub pref_label: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeSubject {
    pub uri: String,
    pub pref_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptScheme {
    pub uri: String,
    pub label: Option<String>,
    pub pref_label: Option<String>,
    pub title: Option<String>,
    pub subject: Option<SchemeSubject>,
}

/// Concept or collection class used in a vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub uri: String,
    pub label: Option<String>,
    pub superclass: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptCount {
    pub type_uri: String,
    pub count: u64,
    pub label: Option<String>,
}

/// Label counts: language -> shortened label property -> count
pub type LangCounts = BTreeMap<String, BTreeMap<String, u64>>;

// ============================================================================
// Traits
// ============================================================================

/// Shape of result a query produces, which selects content negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryForm {
    /// SELECT: tabular bindings
    Select,
    /// CONSTRUCT / DESCRIBE: an RDF graph
    Construct,
}

/// Executes SPARQL query text against an endpoint
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Run one query; every failure maps to `SkosError::QueryFailed`
    async fn execute(
        &self,
        endpoint: &str,
        query: &str,
        form: QueryForm,
        timeout: Duration,
    ) -> Result<RawResult>;

    /// Transport name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
