//! Engine façade
//!
//! One entry point per logical operation. Each call builds a query for the
//! vocabulary's binding, executes it through the transport, and turns the raw
//! result into typed records. The engine holds only the immutable registry and
//! settings; every request gets fresh builder and transformer state.
//!
//! Author: hephaex@gmail.com

use crate::dialect::create_dialect;
use crate::hierarchy::{HierarchyBuilder, HierarchyDiagnostics};
use crate::query::{IndexLetter, QueryBuilder, SearchOptions};
use crate::results::{
    alphabet_index, expand_collections, merge_search_results, LanguageFallback,
    ResultTransformer, ScopeRank, SearchBatch,
};
use crate::scope::GraphScope;
use crate::transport::HttpTransport;
use futures::future::try_join_all;
use skos_core::{
    AlphabeticalHit, AppConfig, BreadcrumbPaths, ChangeEntry, ChildConcept, ConceptCount,
    ConceptDescription, ConceptGroup, ConceptScheme, EndpointBinding, GroupMember, LabelHit,
    LangCounts, NamespaceTable, Pagination, ParentListEntry, PropertyValue, QueryForm,
    RequestContext, ResultTable, Result, SearchQuery, SkosError, SparqlConfig, TopConcept,
    TransitiveClosure, Transport, Triple, TypeInfo, Vocabulary, VocabularyRegistry,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Search planning
// ============================================================================

/// One query issued for a multi-vocabulary search
#[derive(Debug)]
enum SearchPart<'v> {
    /// Through a single vocabulary's own binding
    Single(&'v Vocabulary),
    /// Through the default binding over several named graphs
    Union {
        graphs: Vec<String>,
        members: Vec<&'v Vocabulary>,
    },
}

/// Vocabularies living in named graphs of the default endpoint share one union
/// query; the rest are queried through their own bindings.
fn plan_search<'v>(default: &EndpointBinding, vocabs: &[&'v Vocabulary]) -> Vec<SearchPart<'v>> {
    if vocabs.is_empty() {
        return vec![SearchPart::Union {
            graphs: Vec::new(),
            members: Vec::new(),
        }];
    }

    let (shared, own): (Vec<&Vocabulary>, Vec<&Vocabulary>) =
        vocabs.iter().copied().partition(|v| {
            v.graph().is_some()
                && v.binding.endpoint_url == default.endpoint_url
                && v.binding.dialect == default.dialect
        });

    let mut parts: Vec<SearchPart<'v>> = own.into_iter().map(SearchPart::Single).collect();
    match shared.len() {
        0 => {}
        1 => parts.push(SearchPart::Single(shared[0])),
        _ => parts.push(SearchPart::Union {
            graphs: shared
                .iter()
                .filter_map(|v| v.graph().map(str::to_string))
                .collect(),
            members: shared,
        }),
    }
    parts
}

fn search_options(vocabs: &[&Vocabulary]) -> SearchOptions {
    if vocabs.is_empty() {
        return SearchOptions::default();
    }
    SearchOptions {
        search_by_notation: vocabs.iter().any(|v| v.config.search_by_notation),
        show_deprecated: vocabs.iter().all(|v| v.config.show_deprecated),
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Query engine over the configured vocabularies
pub struct Engine {
    registry: Arc<VocabularyRegistry>,
    namespaces: Arc<NamespaceTable>,
    transport: Arc<dyn Transport>,
    settings: SparqlConfig,
    diagnostics: Arc<HierarchyDiagnostics>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("vocabularies", &self.registry.vocabularies().len())
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl Engine {
    /// Engine talking HTTP to the configured endpoints
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config, Arc::new(HttpTransport::new()?))
    }

    pub fn new(config: &AppConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let registry = VocabularyRegistry::from_config(config)?;
        tracing::info!(
            vocabularies = registry.vocabularies().len(),
            endpoint = %config.sparql.default_endpoint,
            transport = transport.name(),
            "SPARQL engine initialized"
        );
        Ok(Self {
            namespaces: Arc::new(registry.namespaces().clone()),
            registry: Arc::new(registry),
            transport,
            settings: config.sparql.clone(),
            diagnostics: Arc::new(HierarchyDiagnostics::new()),
        })
    }

    pub fn registry(&self) -> &VocabularyRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &SparqlConfig {
        &self.settings
    }

    /// Data-quality counters shared by every breadcrumb request
    pub fn diagnostics(&self) -> &HierarchyDiagnostics {
        &self.diagnostics
    }

    pub fn vocabulary(&self, id: &str) -> Result<&Vocabulary> {
        self.registry.get(id)
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn builder(&self, binding: &EndpointBinding, scope: GraphScope) -> QueryBuilder {
        QueryBuilder::new(
            create_dialect(binding.dialect, self.settings.collation_enabled),
            scope,
            self.namespaces.clone(),
        )
    }

    fn vocab_builder(&self, vocab: &Vocabulary) -> QueryBuilder {
        self.builder(&vocab.binding, GraphScope::for_binding(&vocab.binding, Vec::new()))
    }

    /// Builder for the default binding, limited to the graphs of vocabularies
    /// served by the same endpoint
    fn default_builder(&self) -> QueryBuilder {
        let binding = self.registry.default_binding();
        let graphs = self
            .registry
            .vocabularies()
            .iter()
            .filter(|v| v.binding.endpoint_url == binding.endpoint_url)
            .filter_map(|v| v.graph().map(str::to_string))
            .collect();
        self.builder(binding, GraphScope::for_binding(binding, graphs))
    }

    fn lang<'c>(&self, vocab: &'c Vocabulary, ctx: &'c RequestContext) -> &'c str {
        vocab.config.verify_language(ctx.content_lang())
    }

    /// Language used when no label exists in the requested one
    fn fallback_lang<'c>(&'c self, vocab: &'c Vocabulary, lang: &'c str) -> &'c str {
        vocab
            .config
            .default_language
            .as_deref()
            .or_else(|| vocab.config.languages.first().map(String::as_str))
            .or_else(|| self.settings.languages.first().map(String::as_str))
            .unwrap_or(lang)
    }

    fn transformer(&self, lang: &str) -> ResultTransformer<'_> {
        ResultTransformer::new(
            &self.registry,
            LanguageFallback::new(lang, &self.settings.languages),
        )
    }

    fn hierarchy_props(vocab: &Vocabulary, props: &[String]) -> Vec<String> {
        if props.is_empty() {
            vocab.config.hierarchy_properties.clone()
        } else {
            props.to_vec()
        }
    }

    async fn select(
        &self,
        binding: &EndpointBinding,
        query: String,
        timeout: Duration,
    ) -> Result<ResultTable> {
        let raw = self
            .transport
            .execute(&binding.endpoint_url, &query, QueryForm::Select, timeout)
            .await?;
        raw.into_table().ok_or_else(|| {
            SkosError::query_failed(&binding.endpoint_url, &query, "expected a result table")
        })
    }

    async fn construct(&self, binding: &EndpointBinding, query: String) -> Result<Vec<Triple>> {
        let raw = self
            .transport
            .execute(
                &binding.endpoint_url,
                &query,
                QueryForm::Construct,
                binding.timeout(),
            )
            .await?;
        raw.into_graph().ok_or_else(|| {
            SkosError::query_failed(&binding.endpoint_url, &query, "expected an RDF graph")
        })
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Concept search over one, several or all vocabularies.
    ///
    /// Wildcard-only terms return nothing without contacting a store. A search
    /// answered by one query is paginated by the store; results from several
    /// bindings are fetched up to `limit + offset` each, then merged,
    /// de-duplicated and paginated here.
    pub async fn search_concepts(&self, search: &SearchQuery) -> Result<Vec<LabelHit>> {
        if search.should_short_circuit() {
            tracing::debug!(term = %search.term, "Wildcard-only search term, nothing to query");
            return Ok(Vec::new());
        }
        let page = Pagination::try_new(search.limit, search.offset)?;

        let vocabs: Vec<&Vocabulary> = if search.vocabularies.is_empty() {
            self.registry.vocabularies().iter().collect()
        } else {
            search
                .vocabularies
                .iter()
                .map(|id| self.registry.get(id))
                .collect::<Result<_>>()?
        };

        let transformer = self.transformer(search.lang.as_deref().unwrap_or_default());
        let parts = if let [vocab] = vocabs.as_slice() {
            vec![SearchPart::Single(*vocab)]
        } else {
            plan_search(self.registry.default_binding(), &vocabs)
        };
        tracing::debug!(term = %search.term, queries = parts.len(), "Concept search");

        let store_page = if parts.len() == 1 { page } else { page.window() };
        let batches = try_join_all(
            parts
                .iter()
                .map(|part| self.run_search_part(part, search, store_page, &transformer)),
        )
        .await?;

        let merged = merge_search_results(&self.registry, batches);
        if parts.len() == 1 {
            Ok(merged)
        } else {
            Ok(page.slice(merged))
        }
    }

    async fn run_search_part(
        &self,
        part: &SearchPart<'_>,
        search: &SearchQuery,
        page: Pagination,
        transformer: &ResultTransformer<'_>,
    ) -> Result<SearchBatch> {
        match part {
            SearchPart::Single(vocab) => {
                let query = self
                    .vocab_builder(vocab)
                    .concept_search_query(search, search_options(&[*vocab]), page)?;
                let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
                Ok(SearchBatch {
                    scope: ScopeRank::Named,
                    hits: transformer.concept_search(&table, Some(*vocab)),
                })
            }
            SearchPart::Union { graphs, members } => {
                let binding = self.registry.default_binding();
                let query = self
                    .builder(binding, GraphScope::Union(graphs.clone()))
                    .concept_search_query(search, search_options(members), page)?;
                let table = self.select(binding, query, binding.timeout()).await?;
                Ok(SearchBatch {
                    scope: ScopeRank::Union,
                    hits: transformer.concept_search(&table, None),
                })
            }
        }
    }

    // ------------------------------------------------------------------------
    // Single-resource lookups
    // ------------------------------------------------------------------------

    /// Labels by language; a `None` vocabulary queries the default binding
    pub async fn query_label(
        &self,
        vocab: Option<&str>,
        uri: &str,
        lang: Option<&str>,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let (binding, builder) = match vocab {
            Some(id) => {
                let vocab = self.registry.get(id)?;
                (&vocab.binding, self.vocab_builder(vocab))
            }
            None => (self.registry.default_binding(), self.default_builder()),
        };
        let table = self
            .select(binding, builder.label_query(uri, lang)?, binding.timeout())
            .await?;
        Ok(self.transformer(lang.unwrap_or_default()).labels(&table))
    }

    /// Single best label for the request language
    pub async fn resource_label(
        &self,
        vocab: Option<&str>,
        uri: &str,
        ctx: &RequestContext,
    ) -> Result<Option<String>> {
        let Some(labels) = self.query_label(vocab, uri, None).await? else {
            return Ok(None);
        };
        let fallback = LanguageFallback::new(ctx.content_lang(), &self.settings.languages);
        Ok(labels
            .into_iter()
            .min_by_key(|(lang, _)| fallback.rank(Some(lang.as_str()).filter(|l| !l.is_empty())))
            .map(|(_, label)| label))
    }

    pub async fn query_notation(&self, vocab: &str, uri: &str) -> Result<Option<String>> {
        let vocab = self.registry.get(vocab)?;
        let query = self.vocab_builder(vocab).notation_query(uri)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer("").notation(&table))
    }

    pub async fn query_super_properties(
        &self,
        vocab: &str,
        uri: &str,
    ) -> Result<Option<Vec<String>>> {
        let vocab = self.registry.get(vocab)?;
        let query = self.vocab_builder(vocab).super_properties_query(uri)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer("").super_properties(&table))
    }

    /// Values of one property; `None` when the concept does not exist
    pub async fn query_property(
        &self,
        vocab: &str,
        uri: &str,
        prop: &str,
        ctx: &RequestContext,
        any_lang: bool,
    ) -> Result<Option<BTreeMap<String, PropertyValue>>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self
            .vocab_builder(vocab)
            .property_query(uri, prop, lang, any_lang)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).property_values(&table))
    }

    // ------------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------------

    /// Transitive closure along `props` (the vocabulary's hierarchy properties
    /// when empty), at most `limit` nodes
    pub async fn query_transitive(
        &self,
        vocab: &str,
        uri: &str,
        props: &[String],
        ctx: &RequestContext,
        limit: usize,
        any_lang: bool,
    ) -> Result<Option<TransitiveClosure>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let props = Self::hierarchy_props(vocab, props);
        let query = self
            .vocab_builder(vocab)
            .transitive_query(uri, &props, lang, limit, any_lang)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).transitive(&table))
    }

    /// Narrower concepts, with collections replaced by their members
    pub async fn query_children(
        &self,
        vocab: &str,
        uri: &str,
        ctx: &RequestContext,
    ) -> Result<Option<Vec<ChildConcept>>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let fallback = self.fallback_lang(vocab, lang);
        let props = Self::hierarchy_props(vocab, &[]);
        let builder = self.vocab_builder(vocab);
        let transformer = self.transformer(lang);

        let query = builder.children_query(
            uri,
            lang,
            fallback,
            &props,
            vocab.config.array_class.as_deref(),
        )?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        let Some(children) = transformer.children(&table) else {
            return Ok(None);
        };

        let collections: Vec<String> = children
            .iter()
            .filter(|c| c.is_collection)
            .map(|c| c.uri.clone())
            .collect();
        if collections.is_empty() {
            return Ok(Some(children));
        }

        tracing::debug!(uri, collections = collections.len(), "Expanding collection children");
        let query = builder.collection_members_query(&collections, lang, fallback, &props)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        let members = transformer.collection_members(&table);
        Ok(Some(expand_collections(children, &members)))
    }

    /// Top concepts of the given schemes, or of the main schemes when empty
    pub async fn query_top_concepts(
        &self,
        vocab: &str,
        schemes: &[String],
        ctx: &RequestContext,
    ) -> Result<Vec<TopConcept>> {
        let vocab = self.registry.get(vocab)?;
        let schemes = if schemes.is_empty() {
            vocab.config.main_concept_schemes.as_slice()
        } else {
            schemes
        };
        if schemes.is_empty() {
            return Err(SkosError::InvalidParameter(format!(
                "no concept scheme given and none configured for {}",
                vocab.id()
            )));
        }
        let lang = self.lang(vocab, ctx);
        let fallback = self.fallback_lang(vocab, lang);
        let query = self
            .vocab_builder(vocab)
            .top_concepts_query(schemes, lang, fallback)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).top_concepts(&table))
    }

    /// Ancestor tree with narrower siblings at each level
    pub async fn query_parent_list(
        &self,
        vocab: &str,
        uri: &str,
        ctx: &RequestContext,
    ) -> Result<Option<BTreeMap<String, ParentListEntry>>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let fallback = self.fallback_lang(vocab, lang);
        let props = Self::hierarchy_props(vocab, &[]);
        let query = self
            .vocab_builder(vocab)
            .parent_list_query(uri, lang, fallback, &props)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).parent_list(&table))
    }

    /// Breadcrumb paths from the roots down to `uri`
    pub async fn breadcrumbs(
        &self,
        vocab: &str,
        uri: &str,
        ctx: &RequestContext,
    ) -> Result<BreadcrumbPaths> {
        let closure = self
            .query_transitive(vocab, uri, &[], ctx, self.settings.transitive_limit, true)
            .await?;
        let Some(closure) = closure else {
            return Ok(BreadcrumbPaths::default());
        };
        Ok(HierarchyBuilder::new(&closure, &self.diagnostics).breadcrumbs(uri))
    }

    // ------------------------------------------------------------------------
    // Groups and change list
    // ------------------------------------------------------------------------

    fn group_class(vocab: &Vocabulary) -> Result<&str> {
        vocab.config.group_class.as_deref().ok_or_else(|| {
            SkosError::InvalidParameter(format!("no group class configured for {}", vocab.id()))
        })
    }

    pub async fn list_concept_groups(
        &self,
        vocab: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<ConceptGroup>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self
            .vocab_builder(vocab)
            .concept_groups_query(Self::group_class(vocab)?, lang)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).concept_groups(&table))
    }

    pub async fn list_group_contents(
        &self,
        vocab: &str,
        group: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<GroupMember>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self.vocab_builder(vocab).group_contents_query(
            Self::group_class(vocab)?,
            group,
            lang,
            vocab.config.show_deprecated,
        )?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).group_contents(&table))
    }

    /// Newest concepts first, one page per `offset` step
    pub async fn query_change_list(
        &self,
        vocab: &str,
        ctx: &RequestContext,
        offset: usize,
    ) -> Result<Vec<ChangeEntry>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self.vocab_builder(vocab).change_list_query(
            lang,
            offset,
            &vocab.config.change_property,
        )?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).change_list(&table))
    }

    // ------------------------------------------------------------------------
    // Alphabetical index
    // ------------------------------------------------------------------------

    pub async fn query_first_characters(
        &self,
        vocab: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<String>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self
            .vocab_builder(vocab)
            .first_characters_query(lang, &vocab.config.index_classes)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).first_characters(&table))
    }

    /// Index tokens: letters, then `!*` and `0-9` when such labels exist
    pub async fn alphabet(&self, vocab: &str, ctx: &RequestContext) -> Result<Vec<String>> {
        let first = self.query_first_characters(vocab, ctx).await?;
        Ok(alphabet_index(&first))
    }

    pub async fn query_concepts_alphabetical(
        &self,
        vocab: &str,
        letter: &str,
        ctx: &RequestContext,
        page: Pagination,
    ) -> Result<Vec<AlphabeticalHit>> {
        let letter = IndexLetter::parse(letter)?;
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self.vocab_builder(vocab).alphabetical_query(
            &letter,
            lang,
            page,
            &vocab.config.index_classes,
            vocab.config.show_deprecated,
            vocab.config.alphabetical_qualifier.as_deref(),
        )?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).alphabetical(&table, Some(vocab)))
    }

    // ------------------------------------------------------------------------
    // Schemes and descriptions
    // ------------------------------------------------------------------------

    pub async fn query_concept_schemes(
        &self,
        vocab: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<ConceptScheme>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self.vocab_builder(vocab).concept_schemes_query(lang)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).concept_schemes(&table))
    }

    pub async fn query_concept_scheme(
        &self,
        vocab: &str,
        scheme: &str,
    ) -> Result<ConceptDescription> {
        let vocab = self.registry.get(vocab)?;
        let query = self.vocab_builder(vocab).concept_scheme_query(scheme)?;
        let triples = self.construct(&vocab.binding, query).await?;
        Ok(self.transformer("").describe(&triples, scheme))
    }

    /// One description per requested URI, in request order
    pub async fn query_concept_info(
        &self,
        vocab: &str,
        uris: &[String],
    ) -> Result<Vec<ConceptDescription>> {
        let vocab = self.registry.get(vocab)?;
        let query = self
            .vocab_builder(vocab)
            .concept_info_query(uris, vocab.config.array_class.as_deref())?;
        let triples = self.construct(&vocab.binding, query).await?;
        let transformer = self.transformer("");
        Ok(uris
            .iter()
            .map(|uri| transformer.describe(&triples, uri))
            .filter(|d| !d.properties.is_empty())
            .collect())
    }

    // ------------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------------

    pub async fn query_types(&self, vocab: &str, ctx: &RequestContext) -> Result<Vec<TypeInfo>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self.vocab_builder(vocab).types_query(lang)?;
        let table = self.select(&vocab.binding, query, vocab.binding.timeout()).await?;
        Ok(self.transformer(lang).types(&table))
    }

    pub async fn count_concepts(
        &self,
        vocab: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<ConceptCount>> {
        let vocab = self.registry.get(vocab)?;
        let lang = self.lang(vocab, ctx);
        let query = self.vocab_builder(vocab).count_concepts_query(
            vocab.config.array_class.as_deref(),
            vocab.config.group_class.as_deref(),
        )?;
        let table = self
            .select(&vocab.binding, query, self.settings.admin_timeout())
            .await?;
        Ok(self.transformer(lang).concept_counts(&table))
    }

    /// Label counts per language; `langs` defaults to the vocabulary's languages
    pub async fn count_lang_concepts(&self, vocab: &str, langs: &[String]) -> Result<LangCounts> {
        let vocab = self.registry.get(vocab)?;
        let langs = if langs.is_empty() {
            vocab.config.languages.as_slice()
        } else {
            langs
        };
        let query = self
            .vocab_builder(vocab)
            .count_lang_concepts_query(langs, &vocab.config.index_classes)?;
        let table = self
            .select(&vocab.binding, query, self.settings.admin_timeout())
            .await?;
        Ok(self.transformer("").lang_counts(&table, langs))
    }

    // ------------------------------------------------------------------------
    // Vocabulary resolution
    // ------------------------------------------------------------------------

    /// Vocabulary whose URI space contains `uri`
    pub fn guess_vocabulary(&self, uri: &str, preferred: Option<&str>) -> Option<&Vocabulary> {
        self.registry.guess(uri, preferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skos_core::{Dialect, VocabularyConfig};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.sparql.default_endpoint = "http://store/sparql".to_string();
        config.vocabularies = vec![
            VocabularyConfig::new("a", "http://a/").with_graph("http://a/"),
            VocabularyConfig::new("b", "http://b/").with_graph("http://b/"),
            VocabularyConfig::new("c", "http://c/")
                .with_graph("http://c/")
                .with_endpoint("http://other/sparql"),
            VocabularyConfig::new("d", "http://d/"),
        ];
        config
    }

    #[test]
    fn test_plan_groups_shared_endpoint_graphs() {
        let registry = VocabularyRegistry::from_config(&config()).unwrap();
        let vocabs: Vec<&Vocabulary> = registry.vocabularies().iter().collect();
        let parts = plan_search(registry.default_binding(), &vocabs);

        assert_eq!(parts.len(), 3);
        let singles: Vec<&str> = parts
            .iter()
            .filter_map(|p| match p {
                SearchPart::Single(v) => Some(v.id()),
                _ => None,
            })
            .collect();
        assert_eq!(singles, vec!["c", "d"]);
        match parts.last() {
            Some(SearchPart::Union { graphs, members }) => {
                assert_eq!(graphs, &vec!["http://a/".to_string(), "http://b/".to_string()]);
                assert_eq!(members.len(), 2);
            }
            other => panic!("expected union part, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_single_shared_vocabulary_uses_own_binding() {
        let registry = VocabularyRegistry::from_config(&config()).unwrap();
        let vocabs = vec![registry.get("a").unwrap(), registry.get("d").unwrap()];
        let parts = plan_search(registry.default_binding(), &vocabs);
        assert!(parts.iter().all(|p| matches!(p, SearchPart::Single(_))));
    }

    #[test]
    fn test_plan_dialect_mismatch_is_not_shared() {
        let mut config = config();
        config.vocabularies[1] = VocabularyConfig::new("b", "http://b/")
            .with_graph("http://b/")
            .with_dialect(Dialect::JenaText);
        let registry = VocabularyRegistry::from_config(&config).unwrap();
        let vocabs = vec![registry.get("a").unwrap(), registry.get("b").unwrap()];
        let parts = plan_search(registry.default_binding(), &vocabs);
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_plan_without_vocabularies_queries_all_graphs() {
        let registry = VocabularyRegistry::from_config(&AppConfig::default()).unwrap();
        let parts = plan_search(registry.default_binding(), &[]);
        match parts.as_slice() {
            [SearchPart::Union { graphs, members }] => {
                assert!(graphs.is_empty());
                assert!(members.is_empty());
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn test_search_options_combine() {
        let mut a = VocabularyConfig::new("a", "http://a/");
        a.search_by_notation = true;
        a.show_deprecated = true;
        let b = VocabularyConfig::new("b", "http://b/");
        let mut config = AppConfig::default();
        config.vocabularies = vec![a, b];
        let registry = VocabularyRegistry::from_config(&config).unwrap();
        let vocabs: Vec<&Vocabulary> = registry.vocabularies().iter().collect();

        let options = search_options(&vocabs);
        assert!(options.search_by_notation);
        assert!(!options.show_deprecated);
    }
}
