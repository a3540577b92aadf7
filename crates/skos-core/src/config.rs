//! Configuration Management
//!
//! Handles configuration from a TOML file and environment variables,
//! with defaults suited to a local Fuseki endpoint.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Global SPARQL settings and default endpoint
    pub sparql: SparqlConfig,

    /// Configured vocabularies
    pub vocabularies: Vec<VocabularyConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.sparql.apply_env()?;

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.sparql.apply_env()?;

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Check invariants the engine relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sparql.default_endpoint.trim().is_empty() {
            return Err(ConfigError::MissingRequired("sparql.default_endpoint".to_string()));
        }
        if self.sparql.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sparql.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for vocab in &self.vocabularies {
            if vocab.id.trim().is_empty() {
                return Err(ConfigError::MissingRequired("vocabularies.id".to_string()));
            }
            if !seen.insert(vocab.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: "vocabularies.id".to_string(),
                    value: vocab.id.clone(),
                });
            }
            if vocab.uri_space.trim().is_empty() {
                return Err(ConfigError::MissingRequired(format!(
                    "vocabularies.{}.uri_space",
                    vocab.id
                )));
            }
        }
        Ok(())
    }

    /// Binding used for global and cross-vocabulary operations
    pub fn default_binding(&self) -> EndpointBinding {
        EndpointBinding {
            dialect: self.sparql.default_dialect,
            endpoint_url: self.sparql.default_endpoint.clone(),
            graph: GraphTarget::Wildcard,
            timeout_secs: self.sparql.timeout_secs,
        }
    }

    /// Resolve a vocabulary's binding, filling unset fields from the global settings
    pub fn binding_for(&self, vocab: &VocabularyConfig) -> EndpointBinding {
        let graph = match &vocab.graph {
            Some(g) if !g.is_empty() => GraphTarget::Named(g.clone()),
            _ => GraphTarget::Default,
        };
        EndpointBinding {
            dialect: vocab.dialect.unwrap_or(self.sparql.default_dialect),
            endpoint_url: vocab
                .endpoint
                .clone()
                .unwrap_or_else(|| self.sparql.default_endpoint.clone()),
            graph,
            timeout_secs: vocab.timeout_secs.unwrap_or(self.sparql.timeout_secs),
        }
    }
}

/// Global SPARQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparqlConfig {
    /// Endpoint used for global and multi-vocabulary queries
    pub default_endpoint: String,

    /// Dialect of the default endpoint and of vocabularies that set none
    pub default_dialect: Dialect,

    /// Timeout for interactive lookups, in seconds
    pub timeout_secs: u64,

    /// Timeout for statistics queries, in seconds
    pub admin_timeout_secs: u64,

    /// Use locale-aware collation in ORDER BY where the dialect supports it
    pub collation_enabled: bool,

    /// Result cap for transitive closure queries
    pub transitive_limit: usize,

    /// Default page size for searches
    pub search_results_size: usize,

    /// UI languages in priority order
    pub languages: Vec<String>,
}

impl Default for SparqlConfig {
    fn default() -> Self {
        Self {
            default_endpoint: "http://localhost:3030/skosmos/sparql".to_string(),
            default_dialect: Dialect::Generic,
            timeout_secs: 20,
            admin_timeout_secs: 60,
            collation_enabled: false,
            transitive_limit: 1000,
            search_results_size: 20,
            languages: vec!["en".to_string()],
        }
    }
}

impl SparqlConfig {
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("SKOS_SPARQL_ENDPOINT") {
            self.default_endpoint = url;
        }
        if let Ok(dialect) = std::env::var("SKOS_SPARQL_DIALECT") {
            self.default_dialect = dialect.parse()?;
        }
        if let Ok(timeout) = std::env::var("SKOS_SPARQL_TIMEOUT") {
            self.timeout_secs = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SKOS_SPARQL_TIMEOUT".to_string(),
                value: timeout,
            })?;
        }
        if let Ok(flag) = std::env::var("SKOS_COLLATION_ENABLED") {
            self.collation_enabled = flag.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SKOS_COLLATION_ENABLED".to_string(),
                value: flag,
            })?;
        }
        // Comma-separated, priority order
        if let Ok(langs) = std::env::var("SKOS_LANGUAGES") {
            self.languages = langs
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn admin_timeout(&self) -> Duration {
        Duration::from_secs(self.admin_timeout_secs)
    }
}

/// Supported SPARQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// Plain SPARQL 1.1
    Generic,
    /// Fuseki with a jena-text Lucene index
    #[serde(alias = "JenaTextSparql", alias = "IndexedFullText")]
    JenaText,
}

impl std::str::FromStr for Dialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" | "genericsparql" => Ok(Self::Generic),
            "jenatext" | "jena-text" | "jenatextsparql" | "indexedfulltext" => Ok(Self::JenaText),
            _ => Err(ConfigError::InvalidValue {
                key: "dialect".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic => write!(f, "Generic"),
            Self::JenaText => write!(f, "JenaText"),
        }
    }
}

/// Graph a binding targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphTarget {
    /// The endpoint's default graph
    Default,
    /// One named graph
    Named(String),
    /// Any graph, captured in `?graph`
    Wildcard,
}

/// Endpoint, graph and dialect a vocabulary is queried through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointBinding {
    pub dialect: Dialect,
    pub endpoint_url: String,
    pub graph: GraphTarget,
    pub timeout_secs: u64,
}

impl EndpointBinding {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn named_graph(&self) -> Option<&str> {
        match &self.graph {
            GraphTarget::Named(g) => Some(g),
            _ => None,
        }
    }
}

/// Per-vocabulary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Short identifier
    pub id: String,

    /// Namespace all concept URIs of this vocabulary start with
    pub uri_space: String,

    /// Named graph holding the vocabulary
    pub graph: Option<String>,

    /// Endpoint override
    pub endpoint: Option<String>,

    /// Dialect override
    pub dialect: Option<Dialect>,

    /// Timeout override, in seconds
    pub timeout_secs: Option<u64>,

    /// Content languages
    pub languages: Vec<String>,

    pub default_language: Option<String>,

    /// Properties followed for hierarchy display
    pub hierarchy_properties: Vec<String>,

    /// Schemes whose top concepts form the hierarchy roots
    pub main_concept_schemes: Vec<String>,

    /// Class of concept groups
    pub group_class: Option<String>,

    /// Class of thesaurus arrays, expanded in place of narrower concepts
    pub array_class: Option<String>,

    /// Classes listed in the alphabetical index
    pub index_classes: Vec<String>,

    pub show_deprecated: bool,

    /// Match `skos:notation` values in searches
    pub search_by_notation: bool,

    /// Property used as a secondary sort key in the alphabetical index
    pub alphabetical_qualifier: Option<String>,

    /// Date property used for change lists
    pub change_property: String,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            uri_space: String::new(),
            graph: None,
            endpoint: None,
            dialect: None,
            timeout_secs: None,
            languages: vec![],
            default_language: None,
            hierarchy_properties: vec!["skos:broader".to_string()],
            main_concept_schemes: vec![],
            group_class: None,
            array_class: None,
            index_classes: vec![],
            show_deprecated: false,
            search_by_notation: false,
            alphabetical_qualifier: None,
            change_property: "dc:created".to_string(),
        }
    }
}

impl VocabularyConfig {
    pub fn new(id: impl Into<String>, uri_space: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri_space: uri_space.into(),
            ..Default::default()
        }
    }

    pub fn with_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Requested language if the vocabulary has it, else its default language
    pub fn verify_language<'a>(&'a self, lang: &'a str) -> &'a str {
        if self.languages.is_empty() || self.languages.iter().any(|l| l == lang) {
            return lang;
        }
        self.default_language
            .as_deref()
            .or_else(|| self.languages.first().map(String::as_str))
            .unwrap_or(lang)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[sparql]
default_endpoint = "http://localhost:13030/skosmos-test/sparql"
default_dialect = "JenaText"
collation_enabled = true
languages = ["en", "fi"]

[[vocabularies]]
id = "test"
uri_space = "http://www.skosmos.skos/test/"
graph = "http://www.skosmos.skos/test/"
default_language = "en"
languages = ["en"]

[[vocabularies]]
id = "groups"
uri_space = "http://www.skosmos.skos/groups/"
dialect = "Generic"
endpoint = "http://other:3030/ds/sparql"
timeout_secs = 5
"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sparql.timeout_secs, 20);
        assert_eq!(config.sparql.transitive_limit, 1000);
        assert_eq!(config.sparql.default_dialect, Dialect::Generic);
        assert!(!config.sparql.collation_enabled);
    }

    #[test]
    fn test_dialect_parse() {
        assert_eq!("generic".parse::<Dialect>().unwrap(), Dialect::Generic);
        assert_eq!("JenaText".parse::<Dialect>().unwrap(), Dialect::JenaText);
        assert_eq!("jena-text".parse::<Dialect>().unwrap(), Dialect::JenaText);
        assert!("virtuoso".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_parse_toml_and_bindings() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.vocabularies.len(), 2);
        assert!(config.sparql.collation_enabled);
        assert_eq!(config.sparql.timeout_secs, 20);

        let test = config.binding_for(&config.vocabularies[0]);
        assert_eq!(test.dialect, Dialect::JenaText);
        assert_eq!(test.endpoint_url, "http://localhost:13030/skosmos-test/sparql");
        assert_eq!(test.named_graph(), Some("http://www.skosmos.skos/test/"));
        assert_eq!(test.timeout_secs, 20);

        let groups = config.binding_for(&config.vocabularies[1]);
        assert_eq!(groups.dialect, Dialect::Generic);
        assert_eq!(groups.graph, GraphTarget::Default);
        assert_eq!(groups.timeout(), Duration::from_secs(5));

        assert_eq!(config.default_binding().graph, GraphTarget::Wildcard);
    }

    #[test]
    fn test_duplicate_vocabulary_ids_rejected() {
        let toml = r#"
[[vocabularies]]
id = "test"
uri_space = "http://ex.org/a/"

[[vocabularies]]
id = "test"
uri_space = "http://ex.org/b/"
"#;
        let err = AppConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_uri_space_rejected() {
        let toml = "[[vocabularies]]\nid = \"x\"\n";
        let err = AppConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    fn test_verify_language() {
        let mut vocab = VocabularyConfig::new("test", "http://www.skosmos.skos/test/");
        assert_eq!(vocab.verify_language("sv"), "sv");

        vocab.languages = vec!["fi".to_string(), "en".to_string()];
        vocab.default_language = Some("en".to_string());
        assert_eq!(vocab.verify_language("fi"), "fi");
        assert_eq!(vocab.verify_language("sv"), "en");
    }
}
