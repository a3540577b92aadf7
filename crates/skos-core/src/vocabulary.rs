//! Vocabulary registry
//!
//! Read-only view over the configured vocabularies, built once at startup.
//! Resolves which vocabulary a URI belongs to and which binding to query.

use crate::config::{AppConfig, EndpointBinding, VocabularyConfig};
use crate::{Attribution, NamespaceTable, Result, SkosError};

/// A configured vocabulary with its resolved endpoint binding
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub config: VocabularyConfig,
    pub binding: EndpointBinding,
}

impl Vocabulary {
    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn uri_space(&self) -> &str {
        &self.config.uri_space
    }

    pub fn graph(&self) -> Option<&str> {
        self.binding.named_graph()
    }

    /// Whether the URI lies inside this vocabulary's URI space
    pub fn owns(&self, uri: &str) -> bool {
        !self.config.uri_space.is_empty() && uri.starts_with(&self.config.uri_space)
    }

    /// URI with the URI space stripped; `None` for URIs outside it
    pub fn local_name(&self, uri: &str) -> Option<String> {
        uri.strip_prefix(self.config.uri_space.as_str())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
    }
}

/// All configured vocabularies plus the default binding
#[derive(Debug, Clone)]
pub struct VocabularyRegistry {
    vocabularies: Vec<Vocabulary>,
    default_binding: EndpointBinding,
    namespaces: NamespaceTable,
}

impl VocabularyRegistry {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let vocabularies: Vec<Vocabulary> = config
            .vocabularies
            .iter()
            .map(|v| Vocabulary {
                binding: config.binding_for(v),
                config: v.clone(),
            })
            .collect();

        // vocabulary ids double as namespace prefixes for their URI spaces
        let namespaces = vocabularies
            .iter()
            .filter(|v| is_prefix_name(v.id()))
            .fold(NamespaceTable::default(), |ns, v| {
                if ns.namespace(v.id()).is_some() {
                    ns
                } else {
                    ns.with_prefix(v.id(), v.uri_space())
                }
            });

        Ok(Self {
            vocabularies,
            default_binding: config.default_binding(),
            namespaces,
        })
    }

    pub fn vocabularies(&self) -> &[Vocabulary] {
        &self.vocabularies
    }

    pub fn default_binding(&self) -> &EndpointBinding {
        &self.default_binding
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    pub fn get(&self, id: &str) -> Result<&Vocabulary> {
        self.vocabularies
            .iter()
            .find(|v| v.id() == id)
            .ok_or_else(|| SkosError::InvalidParameter(format!("unknown vocabulary: {id}")))
    }

    /// Position in configuration order, used as a stable tie-break
    pub fn position(&self, id: &str) -> usize {
        self.vocabularies
            .iter()
            .position(|v| v.id() == id)
            .unwrap_or(usize::MAX)
    }

    /// First vocabulary stored in the given named graph
    pub fn by_graph(&self, graph: &str) -> Option<&Vocabulary> {
        self.vocabularies.iter().find(|v| v.graph() == Some(graph))
    }

    /// Vocabularies whose URI space contains the URI, longest URI space first
    pub fn candidates(&self, uri: &str) -> Vec<&Vocabulary> {
        let mut found: Vec<&Vocabulary> = self.vocabularies.iter().filter(|v| v.owns(uri)).collect();
        let longest = found.iter().map(|v| v.uri_space().len()).max().unwrap_or(0);
        found.retain(|v| v.uri_space().len() == longest);
        found
    }

    /// Guess which vocabulary a URI originates from.
    ///
    /// Several vocabularies may share a URI space; the preferred one wins if it
    /// is among them, otherwise the first in configuration order is returned
    /// and the ambiguity is logged.
    pub fn guess(&self, uri: &str, preferred: Option<&str>) -> Option<&Vocabulary> {
        let candidates = self.candidates(uri);
        match candidates.as_slice() {
            [] => None,
            [single] => Some(*single),
            many => {
                if let Some(hit) = preferred.and_then(|p| many.iter().find(|v| v.id() == p).copied()) {
                    return Some(hit);
                }
                let err = SkosError::AmbiguousVocabulary {
                    uri: uri.to_string(),
                    candidates: many.iter().map(|v| v.id().to_string()).collect(),
                };
                tracing::warn!(error = %err, "Falling back to first configured vocabulary");
                many.first().copied()
            }
        }
    }

    /// Attribute a result URI read from `found_in` (the queried vocabulary, if known)
    pub fn attribute(&self, uri: &str, found_in: Option<&str>) -> Attribution {
        match self.guess(uri, found_in) {
            Some(owner) if Some(owner.id()) == found_in || found_in.is_none() => {
                Attribution::Local {
                    vocab: owner.id().to_string(),
                }
            }
            Some(owner) => Attribution::External {
                vocab: owner.id().to_string(),
                found_in: found_in.unwrap_or_default().to_string(),
            },
            None => Attribution::Foreign {
                found_in: found_in.map(str::to_string),
            },
        }
    }
}

fn is_prefix_name(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dialect, GraphTarget};

    fn registry() -> VocabularyRegistry {
        let mut config = AppConfig::default();
        config.vocabularies = vec![
            VocabularyConfig::new("test", "http://www.skosmos.skos/test/")
                .with_graph("http://www.skosmos.skos/test/"),
            VocabularyConfig::new("dup1", "http://www.skosmos.skos/dup/")
                .with_graph("http://www.skosmos.skos/dup1/"),
            VocabularyConfig::new("dup2", "http://www.skosmos.skos/dup/")
                .with_graph("http://www.skosmos.skos/dup2/")
                .with_dialect(Dialect::JenaText),
        ];
        VocabularyRegistry::from_config(&config).unwrap()
    }

    #[test]
    fn test_local_name() {
        let reg = registry();
        let test = reg.get("test").unwrap();
        assert_eq!(
            test.local_name("http://www.skosmos.skos/test/ta111").as_deref(),
            Some("ta111")
        );
        assert_eq!(test.local_name("http://other.org/x"), None);
        assert!(reg.get("missing").is_err());
    }

    #[test]
    fn test_guess_single_and_none() {
        let reg = registry();
        let v = reg.guess("http://www.skosmos.skos/test/ta1", None).unwrap();
        assert_eq!(v.id(), "test");
        assert!(reg.guess("http://www.w3.org/2004/02/skos/core#Concept", None).is_none());
    }

    #[test]
    fn test_guess_disambiguates_by_preference() {
        let reg = registry();
        let uri = "http://www.skosmos.skos/dup/d1";
        assert_eq!(reg.guess(uri, Some("dup2")).unwrap().id(), "dup2");
        assert_eq!(reg.guess(uri, Some("test")).unwrap().id(), "dup1");
        assert_eq!(reg.guess(uri, None).unwrap().id(), "dup1");
    }

    #[test]
    fn test_attribution() {
        let reg = registry();
        assert_eq!(
            reg.attribute("http://www.skosmos.skos/test/ta1", Some("test")),
            Attribution::Local {
                vocab: "test".to_string()
            }
        );
        assert_eq!(
            reg.attribute("http://www.skosmos.skos/test/ta1", Some("dup1")),
            Attribution::External {
                vocab: "test".to_string(),
                found_in: "dup1".to_string()
            }
        );
        assert_eq!(
            reg.attribute("http://external.org/c1", Some("test")),
            Attribution::Foreign {
                found_in: Some("test".to_string())
            }
        );
    }

    #[test]
    fn test_bindings_and_graph_lookup() {
        let reg = registry();
        assert_eq!(reg.default_binding().graph, GraphTarget::Wildcard);
        assert_eq!(reg.get("dup2").unwrap().binding.dialect, Dialect::JenaText);
        assert_eq!(
            reg.by_graph("http://www.skosmos.skos/dup1/").map(Vocabulary::id),
            Some("dup1")
        );
        assert_eq!(reg.position("dup2"), 2);
        assert_eq!(
            reg.namespaces().shorten("http://www.skosmos.skos/test/ta1").as_deref(),
            Some("test:ta1")
        );
    }
}
