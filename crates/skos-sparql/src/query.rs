//! SPARQL query construction
//!
//! Every builder is pure: identical parameters produce identical text. Values
//! supplied by callers are validated (IRIs, language tags, properties) or
//! escaped (literals) before they are spliced into a query, and the PREFIX
//! declarations a query uses are prepended last.
//!
//! Author: hephaex@gmail.com

use crate::dialect::DialectStrategy;
use crate::escape::{
    escape_literal, iri, lang_tag, lowercase, normalize_term, property, property_path,
};
use crate::scope::GraphScope;
use skos_core::{NamespaceTable, Pagination, Result, SearchQuery, SkosError};
use std::sync::Arc;

/// Class listed when a caller gives no class filter
pub const SKOS_CONCEPT: &str = "http://www.w3.org/2004/02/skos/core#Concept";

/// Entries per change-list page
pub const CHANGE_LIST_PAGE_SIZE: usize = 200;

/// Label properties whose values are counted per language
pub const COUNTED_LABEL_PROPERTIES: [&str; 3] =
    ["skos:prefLabel", "skos:altLabel", "skos:hiddenLabel"];

// ============================================================================
// Parameter Types
// ============================================================================

/// Alphabetical index key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLetter {
    /// `*`: every label
    All,
    /// `0-9`: labels starting with a digit
    Digits,
    /// `!*`: labels starting with neither a letter nor a digit
    Special,
    /// Labels starting with this (lowercased) text
    Letter(String),
}

impl IndexLetter {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "*" => Ok(Self::All),
            "0-9" => Ok(Self::Digits),
            "!*" => Ok(Self::Special),
            "" => Err(SkosError::InvalidParameter(
                "alphabetical index letter must not be empty".to_string(),
            )),
            letter => Ok(Self::Letter(lowercase(letter))),
        }
    }

    /// Regular expression for the tokens a text index cannot answer
    fn pattern(&self) -> Option<&'static str> {
        match self {
            Self::All => Some(".*"),
            Self::Digits => Some("[0-9].*"),
            Self::Special => Some(r"[^\\p{L}0-9].*"),
            Self::Letter(_) => None,
        }
    }
}

/// Per-vocabulary switches that shape a concept search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Match `skos:notation` values like labels
    pub search_by_notation: bool,
    pub show_deprecated: bool,
}

/// `\nLIMIT n\nOFFSET m`, leaving out absent or zero parts
pub fn limit_offset(page: Pagination) -> String {
    let mut out = String::new();
    if let Some(limit) = page.limit.filter(|l| *l > 0) {
        out.push_str(&format!("\nLIMIT {limit}"));
    }
    if let Some(offset) = page.offset.filter(|o| *o > 0) {
        out.push_str(&format!("\nOFFSET {offset}"));
    }
    out
}

fn lang_filter(var: &str, lang: &str) -> Result<String> {
    Ok(format!(
        "FILTER (langMatches(lang({var}), '{}'))",
        lang_tag(lang)?
    ))
}

fn values_clause(var: &str, constants: &[String]) -> String {
    let rows: Vec<String> = constants.iter().map(|c| format!("({c})")).collect();
    format!("VALUES ({var}) {{ {} }}", rows.join(" "))
}

/// prefLabel in the requested language, else the fallback language, else any
fn label_with_fallback(subject: &str, var: &str, lang: &str, fallback: &str) -> Result<String> {
    let lang = lang_tag(lang)?;
    let fallback = lang_tag(fallback)?;
    Ok(format!(
        r#"OPTIONAL {{
      {subject} skos:prefLabel {var} .
      FILTER (langMatches(lang({var}), '{lang}'))
    }}
    OPTIONAL {{
      {subject} skos:prefLabel {var} .
      FILTER (langMatches(lang({var}), '{fallback}'))
    }}
    OPTIONAL {{ # any language
      {subject} skos:prefLabel {var} .
    }}"#
    ))
}

fn deprecated_filter(var: &str, show_deprecated: bool) -> String {
    if show_deprecated {
        String::new()
    } else {
        format!("FILTER NOT EXISTS {{ {var} owl:deprecated true }}")
    }
}

// ============================================================================
// Query Builder
// ============================================================================

/// Builds query text for one endpoint binding
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Arc<dyn DialectStrategy>,
    scope: GraphScope,
    namespaces: Arc<NamespaceTable>,
}

impl QueryBuilder {
    pub fn new(
        dialect: Arc<dyn DialectStrategy>,
        scope: GraphScope,
        namespaces: Arc<NamespaceTable>,
    ) -> Self {
        Self {
            dialect,
            scope,
            namespaces,
        }
    }

    pub fn dialect(&self) -> &dyn DialectStrategy {
        self.dialect.as_ref()
    }

    pub fn scope(&self) -> &GraphScope {
        &self.scope
    }

    fn finish(&self, query: String) -> String {
        self.namespaces.with_prefixes(&query)
    }

    /// Class given as prefixed name or URI, as an IRI reference
    fn class_iri(&self, class: &str) -> Result<String> {
        iri(&self.namespaces.expand(class))
    }

    fn class_values(&self, classes: &[String]) -> Result<String> {
        let constants = if classes.is_empty() {
            vec![iri(SKOS_CONCEPT)?]
        } else {
            classes
                .iter()
                .map(|c| self.class_iri(c))
                .collect::<Result<Vec<_>>>()?
        };
        Ok(values_clause("?type", &constants))
    }

    // ------------------------------------------------------------------------
    // Single-resource lookups
    // ------------------------------------------------------------------------

    /// Labels of a resource from prefLabel, rdfs:label or title properties
    pub fn label_query(&self, uri: &str, lang: Option<&str>) -> Result<String> {
        let uri = iri(uri)?;
        let fcl = self.scope.from_clause()?;
        let cond = match lang {
            Some(lang) => lang_filter("?label", lang)?,
            None => String::new(),
        };
        Ok(self.finish(format!(
            r#"SELECT ?label {fcl}
WHERE {{
  {uri} a ?type .
  OPTIONAL {{
    {uri} skos:prefLabel ?label .
    {cond}
  }}
  OPTIONAL {{
    {uri} rdfs:label ?label .
    {cond}
  }}
  OPTIONAL {{
    {uri} dc:title ?label .
    {cond}
  }}
  OPTIONAL {{
    {uri} dc11:title ?label .
    {cond}
  }}
}}"#
        )))
    }

    pub fn notation_query(&self, uri: &str) -> Result<String> {
        let uri = iri(uri)?;
        let fcl = self.scope.from_clause()?;
        Ok(self.finish(format!(
            "SELECT ?notation {fcl}\nWHERE {{\n  {uri} skos:notation ?notation .\n}}"
        )))
    }

    pub fn super_properties_query(&self, uri: &str) -> Result<String> {
        let uri = iri(uri)?;
        let fcl = self.scope.from_clause()?;
        Ok(self.finish(format!(
            "SELECT ?superProperty {fcl}\nWHERE {{\n  {uri} rdfs:subPropertyOf ?superProperty\n}}"
        )))
    }

    /// Values of one property of a concept, with their prefLabels
    pub fn property_query(
        &self,
        uri: &str,
        prop: &str,
        lang: &str,
        any_lang: bool,
    ) -> Result<String> {
        let uri = iri(uri)?;
        let prop = property(prop)?;
        let lang = lang_tag(lang)?;
        let fcl = self.scope.from_clause()?;
        let other_lang = if any_lang {
            "OPTIONAL { ?object skos:prefLabel ?label }"
        } else {
            ""
        };
        Ok(self.finish(format!(
            r#"SELECT ?object ?label {fcl}
WHERE {{
  {uri} a skos:Concept .
  OPTIONAL {{
    {uri} {prop} ?object .
    OPTIONAL {{
      ?object skos:prefLabel ?label .
      FILTER (langMatches(lang(?label), '{lang}'))
    }}
    OPTIONAL {{
      ?object skos:prefLabel ?label .
      FILTER (lang(?label) = '')
    }}
    {other_lang}
  }}
}}"#
        )))
    }

    // ------------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------------

    /// Transitive closure over `props` starting at `uri` (the concept included).
    ///
    /// Direct targets are concatenated per node in a subquery so that `limit`
    /// caps nodes rather than edges.
    pub fn transitive_query(
        &self,
        uri: &str,
        props: &[String],
        lang: &str,
        limit: usize,
        any_lang: bool,
    ) -> Result<String> {
        if limit == 0 {
            return Err(SkosError::InvalidParameter(
                "transitive limit must be positive".to_string(),
            ));
        }
        let uri = iri(uri)?;
        let path = property_path(props)?;
        let lang = lang_tag(lang)?;
        let fcl = self.scope.from_clause()?;
        let other_lang = if any_lang {
            "OPTIONAL { ?object skos:prefLabel ?label }"
        } else {
            ""
        };
        Ok(self.finish(format!(
            r#"SELECT * {fcl}
WHERE {{
  SELECT ?object ?label ?top (GROUP_CONCAT(STR(?dir);separator=' ') as ?direct)
  WHERE {{
    {uri} a skos:Concept .
    OPTIONAL {{
      {uri} {path}* ?object .
      OPTIONAL {{
        ?object {path} ?dir .
      }}
      BIND(EXISTS {{ ?object skos:topConceptOf ?scheme }} AS ?top)
    }}
    OPTIONAL {{
      ?object skos:prefLabel ?label .
      FILTER (langMatches(lang(?label), '{lang}'))
    }}
    {other_lang}
  }}
  GROUP BY ?object ?label ?top
}}
LIMIT {limit}"#
        )))
    }

    /// Direct narrower concepts of `uri`, flagging collection-typed children
    pub fn children_query(
        &self,
        uri: &str,
        lang: &str,
        fallback: &str,
        props: &[String],
        array_class: Option<&str>,
    ) -> Result<String> {
        let uri = iri(uri)?;
        let path = property_path(props)?;
        let fcl = self.scope.from_clause()?;
        let labels = label_with_fallback("?child", "?label", lang, fallback)?;
        let array_type = match array_class {
            Some(class) => format!("\n      UNION {{ ?child a {} }}", self.class_iri(class)?),
            None => String::new(),
        };
        Ok(self.finish(format!(
            r#"SELECT ?child ?label ?grandchildren ?notation ?collection {fcl}
WHERE {{
  {uri} a skos:Concept .
  OPTIONAL {{
    ?child {path} {uri} .
    {labels}
    OPTIONAL {{
      ?child skos:notation ?notation .
    }}
    BIND (EXISTS {{ ?a {path} ?child . }} AS ?grandchildren)
    BIND (EXISTS {{
      {{ ?child a skos:Collection }}
      UNION {{ ?child a skos:OrderedCollection }}{array_type}
    }} AS ?collection)
  }}
}}"#
        )))
    }

    /// Members of collections, in the order the store lists them
    pub fn collection_members_query(
        &self,
        collections: &[String],
        lang: &str,
        fallback: &str,
        props: &[String],
    ) -> Result<String> {
        if collections.is_empty() {
            return Err(SkosError::InvalidParameter(
                "no collections to expand".to_string(),
            ));
        }
        let constants = collections
            .iter()
            .map(|c| iri(c))
            .collect::<Result<Vec<_>>>()?;
        let values = values_clause("?collection", &constants);
        let path = property_path(props)?;
        let fcl = self.scope.from_clause()?;
        let labels = label_with_fallback("?child", "?label", lang, fallback)?;
        Ok(self.finish(format!(
            r#"SELECT ?collection ?child ?label ?grandchildren ?notation {fcl}
WHERE {{
  {values}
  {{ ?collection skos:member ?child . }}
  UNION
  {{ ?collection skos:memberList/rdf:rest*/rdf:first ?child . }}
  {labels}
  OPTIONAL {{
    ?child skos:notation ?notation .
  }}
  BIND (EXISTS {{ ?a {path} ?child . }} AS ?grandchildren)
}}"#
        )))
    }

    pub fn top_concepts_query(
        &self,
        schemes: &[String],
        lang: &str,
        fallback: &str,
    ) -> Result<String> {
        if schemes.is_empty() {
            return Err(SkosError::InvalidParameter(
                "at least one concept scheme is required".to_string(),
            ));
        }
        let constants = schemes
            .iter()
            .map(|s| iri(s))
            .collect::<Result<Vec<_>>>()?;
        let values = values_clause("?topuri", &constants);
        let fcl = self.scope.from_clause()?;
        let labels = label_with_fallback("?top", "?label", lang, fallback)?;
        Ok(self.finish(format!(
            r#"SELECT DISTINCT ?top ?topuri ?label ?notation ?children {fcl}
WHERE {{
  ?top skos:topConceptOf ?topuri .
  {labels}
  OPTIONAL {{ ?top skos:notation ?notation . }}
  BIND (EXISTS {{ ?top skos:narrower ?a . }} AS ?children)
  {values}
}}"#
        )))
    }

    /// Every ancestor of `uri` with its broader links and narrower siblings
    pub fn parent_list_query(
        &self,
        uri: &str,
        lang: &str,
        fallback: &str,
        props: &[String],
    ) -> Result<String> {
        let uri = iri(uri)?;
        let path = property_path(props)?;
        let fcl = self.scope.from_clause()?;
        let labels = label_with_fallback("?broad", "?lab", lang, fallback)?;
        let child_labels = label_with_fallback("?children", "?childlab", lang, fallback)?;
        Ok(self.finish(format!(
            r#"SELECT ?broad ?parent ?children ?grandchildren
(SAMPLE(?lab) as ?label) (SAMPLE(?childlab) as ?childlabel) (GROUP_CONCAT(?topcs; separator=' ') as ?tops)
(SAMPLE(?nota) as ?notation) (SAMPLE(?childnota) as ?childnotation) {fcl}
WHERE {{
  {uri} a skos:Concept .
  OPTIONAL {{
    {uri} {path}* ?broad .
    {labels}
    OPTIONAL {{ ?broad skos:notation ?nota . }}
    OPTIONAL {{ ?broad {path} ?parent . }}
    OPTIONAL {{
      ?broad skos:narrower ?children .
      {child_labels}
      OPTIONAL {{ ?children skos:notation ?childnota . }}
    }}
    BIND (EXISTS {{ ?children skos:narrower ?a . }} AS ?grandchildren)
    OPTIONAL {{ ?broad skos:topConceptOf ?topcs . }}
  }}
}}
GROUP BY ?broad ?parent ?children ?grandchildren"#
        )))
    }

    // ------------------------------------------------------------------------
    // Groups and change lists
    // ------------------------------------------------------------------------

    pub fn concept_groups_query(&self, group_class: &str, lang: &str) -> Result<String> {
        let class = self.class_iri(group_class)?;
        let lang = lang_tag(lang)?;
        let fcl = self.scope.from_clause()?;
        Ok(self.finish(format!(
            r#"SELECT ?group (GROUP_CONCAT(DISTINCT STR(?child);separator=' ') as ?children) ?label ?members ?notation {fcl}
WHERE {{
  ?group a {class} .
  OPTIONAL {{
    ?group skos:member|isothes:subGroup ?child .
    ?child a {class}
  }}
  BIND (EXISTS {{ ?group skos:member ?submembers }} as ?members)
  OPTIONAL {{ ?group skos:prefLabel ?label }}
  OPTIONAL {{ ?group rdfs:label ?label }}
  FILTER (langMatches(lang(?label), '{lang}'))
  OPTIONAL {{ ?group skos:notation ?notation }}
}}
GROUP BY ?group ?label ?members ?notation
ORDER BY lcase(?label)"#
        )))
    }

    pub fn group_contents_query(
        &self,
        group_class: &str,
        group: &str,
        lang: &str,
        show_deprecated: bool,
    ) -> Result<String> {
        let class = self.class_iri(group_class)?;
        let group = iri(group)?;
        let lang = lang_tag(lang)?;
        let fcl = self.scope.from_clause()?;
        let deprecated = deprecated_filter("?conc", show_deprecated);
        Ok(self.finish(format!(
            r#"SELECT ?conc ?super ?label ?members ?type ?notation {fcl}
WHERE {{
  {group} a {class} .
  {{ {group} skos:member ?conc . }} UNION {{ ?conc isothes:superGroup {group} }}
  {deprecated}
  ?conc a ?type .
  OPTIONAL {{
    ?conc skos:prefLabel ?label .
    FILTER (langMatches(lang(?label), '{lang}'))
  }}
  OPTIONAL {{ ?conc skos:prefLabel ?label . }}
  OPTIONAL {{ ?conc skos:notation ?notation }}
  BIND (EXISTS {{ ?submembers isothes:superGroup ?conc }} as ?super)
  BIND (EXISTS {{ ?conc skos:member ?submembers }} as ?members)
}}
ORDER BY lcase(?label)"#
        )))
    }

    /// Concepts by date property, newest month first, one page of 200
    pub fn change_list_query(&self, lang: &str, offset: usize, prop: &str) -> Result<String> {
        let lang = lang_tag(lang)?;
        let prop = property(prop)?;
        let fcl = self.scope.from_clause()?;
        let page = limit_offset(Pagination::new(Some(CHANGE_LIST_PAGE_SIZE), Some(offset)));
        Ok(self.finish(format!(
            r#"SELECT DISTINCT ?concept ?date ?label {fcl}
WHERE {{
  ?concept a skos:Concept .
  ?concept {prop} ?date .
  ?concept skos:prefLabel ?label .
  FILTER (langMatches(lang(?label), '{lang}'))
}}
ORDER BY DESC(YEAR(?date)) DESC(MONTH(?date)) LCASE(?label){page}"#
        )))
    }

    // ------------------------------------------------------------------------
    // Alphabetical index
    // ------------------------------------------------------------------------

    /// Distinct uppercased first characters of prefLabels
    pub fn first_characters_query(&self, lang: &str, classes: &[String]) -> Result<String> {
        let lang = lang_tag(lang)?;
        let fcl = self.scope.from_clause()?;
        let values = self.class_values(classes)?;
        Ok(self.finish(format!(
            r#"SELECT DISTINCT (ucase(str(substr(?label, 1, 1))) as ?l) {fcl}
WHERE {{
  ?c skos:prefLabel ?label .
  ?c a ?type
  FILTER (langMatches(lang(?label), '{lang}'))
  {values}
}}"#
        )))
    }

    /// Concepts whose pref- or altLabel starts with `letter`.
    ///
    /// Letters go through the dialect's text clause; the special tokens are
    /// answered with regular expressions on every dialect.
    pub fn alphabetical_query(
        &self,
        letter: &IndexLetter,
        lang: &str,
        page: Pagination,
        classes: &[String],
        show_deprecated: bool,
        qualifier: Option<&str>,
    ) -> Result<String> {
        let lang = lang_tag(lang)?;
        let values = self.class_values(classes)?;
        let deprecated = deprecated_filter("?s", show_deprecated);
        let (qualifier_var, qualifier_clause, qualifier_order) = match qualifier {
            Some(q) => (
                " ?qualifier",
                format!("OPTIONAL {{ ?s {} ?qualifier }}", property(q)?),
                " LCASE(STR(?qualifier))",
            ),
            None => ("", String::new(), ""),
        };

        let matching = match letter.pattern() {
            Some(pattern) => format!(
                r#"{{
      ?s skos:prefLabel ?label .
      FILTER (regex(str(?label), '^{pattern}$', 'i') && langMatches(lang(?label), '{lang}'))
    }}
    UNION
    {{
      {{
        ?s skos:altLabel ?alabel .
        FILTER (regex(str(?alabel), '^{pattern}$', 'i') && langMatches(lang(?alabel), '{lang}'))
      }}
      {{
        ?s skos:prefLabel ?label .
        FILTER (langMatches(lang(?label), '{lang}'))
      }}
    }}"#
            ),
            None => {
                let prefix = match letter {
                    IndexLetter::Letter(l) => l.as_str(),
                    _ => "",
                };
                let term = format!("{prefix}*");
                let lit = escape_literal(prefix);
                let pref =
                    self.dialect
                        .text_search_clause("skos:prefLabel", &term, Some(lang), &self.scope);
                let alt =
                    self.dialect
                        .text_search_clause("skos:altLabel", &term, Some(lang), &self.scope);
                format!(
                    r#"{{
      {pref}
      FILTER (STRSTARTS(LCASE(STR(?match)), '{lit}'))
      FILTER EXISTS {{ ?s skos:prefLabel ?match }}
      BIND (?match AS ?label)
    }}
    UNION
    {{
      {alt}
      FILTER (STRSTARTS(LCASE(STR(?match)), '{lit}'))
      FILTER EXISTS {{ ?s skos:altLabel ?match }}
      BIND (?match AS ?alabel)
      {{
        ?s skos:prefLabel ?label .
        FILTER (langMatches(lang(?label), '{lang}'))
      }}
    }}"#
                )
            }
        };

        let pattern = self.scope.wrap(&format!(
            r#"    {matching}
    ?s a ?type .
    {qualifier_clause}
    {deprecated}"#
        ))?;
        let order = self
            .dialect
            .order_by_clause("LCASE(STR(COALESCE(?alabel, ?label)))", Some(lang));
        let page = limit_offset(page);
        Ok(self.finish(format!(
            r#"SELECT DISTINCT ?s ?label ?alabel{qualifier_var}
WHERE {{
  {pattern}
  {values}
}}
ORDER BY {order} STR(?s){qualifier_order}{page}"#
        )))
    }

    // ------------------------------------------------------------------------
    // Concept search
    // ------------------------------------------------------------------------

    /// Free-text concept search.
    ///
    /// Each match is encoded as `<priority><lang>@<label>`; priorities are
    /// prefLabel 1, altLabel 3, hiddenLabel 5, plus one when the matched
    /// language differs from the display language. In unique mode the minimum
    /// encoded value picks one match per concept; the outer query unpacks it
    /// into `?plabel`, `?alabel` or `?hlabel`.
    pub fn concept_search_query(
        &self,
        search: &SearchQuery,
        options: SearchOptions,
        page: Pagination,
    ) -> Result<String> {
        let lang = search.lang.as_deref().map(lang_tag).transpose()?;
        let search_lang = search.search_lang.as_deref().map(lang_tag).transpose()?;

        let inner = if search.is_wildcard_only() {
            // only reachable with a group or parent limit
            let cond = match lang {
                Some(lang) => format!(" FILTER (LANGMATCHES(LANG(?label), '{lang}'))"),
                None => String::new(),
            };
            format!("?s skos:prefLabel ?label .{cond} BIND(?label AS ?match)")
        } else {
            self.concept_search_inner(search, lang, search_lang, options)?
        };

        let label_priority = if search.is_wildcard_only() {
            ""
        } else {
            r#"FILTER(BOUND(?s))
  BIND(STR(SUBSTR(?hit,1,1)) AS ?pri)
  BIND(IF((SUBSTR(STRBEFORE(?hit, '@'),1) != ?pri), STRLANG(STRAFTER(?hit, '@'), SUBSTR(STRBEFORE(?hit, '@'),2)), STRAFTER(?hit, '@')) AS ?match)
  BIND(IF((?pri = "1" || ?pri = "2") && ?match != ?label, ?match, ?unbound) as ?plabel)
  BIND(IF((?pri = "3" || ?pri = "4"), ?match, ?unbound) as ?alabel)
  BIND(IF((?pri = "5" || ?pri = "6"), ?match, ?unbound) as ?hlabel)"#
        };

        let types = if search.types.is_empty() {
            vec![SKOS_CONCEPT.to_string()]
        } else {
            search.types.clone()
        };
        let type_cond = types
            .iter()
            .map(|t| self.class_iri(t).map(|c| format!("{{ ?s a {c} }}")))
            .collect::<Result<Vec<_>>>()?
            .join(" UNION ");

        let scheme_cond = if search.schemes.is_empty() {
            String::new()
        } else {
            let branches = search
                .schemes
                .iter()
                .map(|s| iri(s).map(|s| format!("{{?s skos:inScheme {s}}}")))
                .collect::<Result<Vec<_>>>()?;
            format!("{{{}}}", branches.join(" UNION "))
        };

        let mut limit_cond = String::new();
        if let Some(parent) = &search.parent {
            limit_cond.push_str(&format!("?s skos:broader+ {} .", iri(parent)?));
        }
        if let Some(group) = &search.group {
            limit_cond.push_str(&format!("{} skos:member ?s .", iri(group)?));
        }
        let deprecated = deprecated_filter("?s", options.show_deprecated);

        let pattern = self.scope.wrap(&format!(
            r#"  {{
  {inner}
  }}
  {label_priority}
  {type_cond}
  {{ {limit_cond}
   ?s a ?type .
   {scheme_cond}
  }}
  {deprecated}"#
        ))?;

        let order = self.dialect.order_by_clause("LCASE(STR(?match))", lang);
        let order_extra = self.scope.order_extra();
        let page = limit_offset(page);
        Ok(self.finish(format!(
            r#"SELECT DISTINCT ?s ?label ?plabel ?alabel ?hlabel ?graph ?notation (GROUP_CONCAT(DISTINCT STR(?type);separator=' ') as ?types)
WHERE {{
 {pattern}
}}
GROUP BY ?s ?match ?label ?plabel ?alabel ?hlabel ?notation ?graph
ORDER BY {order} LANG(?match){order_extra}{page}"#
        )))
    }

    fn concept_search_inner(
        &self,
        search: &SearchQuery,
        lang: Option<&str>,
        search_lang: Option<&str>,
        options: SearchOptions,
    ) -> Result<String> {
        let term = normalize_term(&search.term);

        let mut props = vec!["(skos:prefLabel 1)", "(skos:altLabel 3)"];
        if search.hidden {
            props.push("(skos:hiddenLabel 5)");
        }
        if options.search_by_notation {
            props.push("(skos:notation 1)");
        }
        let props = props.join(" ");

        let text_cond = self
            .dialect
            .text_search_clause("?prop", &term, search_lang, &self.scope);
        let raw_term = escape_literal(&term.replace('*', ""));

        let label_cond = match lang {
            Some(lang) => format!("LANGMATCHES(lang(?label), '{lang}')"),
            None => "lang(?match) = '' || LANGMATCHES(lang(?label), lang(?match))".to_string(),
        };
        // without a display-language prefLabel, use one in the matched language
        let label_fallback = if search_lang != lang {
            "OPTIONAL { ?s skos:prefLabel ?label . FILTER (LANGMATCHES(LANG(?label), LANG(?match))) }"
        } else {
            ""
        };
        let npri = match lang {
            Some(lang) => format!("BIND(IF(langMatches(LANG(?match),'{lang}'), ?pri, ?pri+1) AS ?npri)"),
            None => "BIND(?pri AS ?npri)".to_string(),
        };
        let (hit_var, hit_group) = if search.unique {
            ("(MIN(?matchstr) AS ?hit)", "GROUP BY ?s ?label ?notation")
        } else {
            ("(?matchstr AS ?hit)", "")
        };

        Ok(format!(
            r#"SELECT DISTINCT ?s ?label ?notation {hit_var}
   WHERE {{
     {{
      VALUES (?prop ?pri) {{ {props} }}
      {text_cond}
      ?s ?prop ?match }}
     UNION
     {{ ?s skos:notation "{raw_term}" }}
     OPTIONAL {{
      ?s skos:prefLabel ?label .
      FILTER ({label_cond})
     }}
     {label_fallback}
     {npri}
     BIND(CONCAT(STR(?npri), LANG(?match), '@', STR(?match)) AS ?matchstr)
     OPTIONAL {{ ?s skos:notation ?notation }}
   }}
   {hit_group}"#
        ))
    }

    // ------------------------------------------------------------------------
    // Schemes, descriptions, statistics
    // ------------------------------------------------------------------------

    pub fn concept_schemes_query(&self, lang: &str) -> Result<String> {
        let lang = lang_tag(lang)?;
        let fcl = self.scope.from_clause()?;
        Ok(self.finish(format!(
            r#"SELECT ?cs ?label ?preflabel ?title ?domain ?domainLabel {fcl}
WHERE {{
  ?cs a skos:ConceptScheme .
  OPTIONAL {{
    ?cs dcterms:subject ?domain .
    ?domain skos:prefLabel ?domainLabel .
    FILTER (langMatches(lang(?domainLabel), '{lang}'))
  }}
  OPTIONAL {{
    ?cs rdfs:label ?label .
    FILTER (langMatches(lang(?label), '{lang}'))
  }}
  OPTIONAL {{
    ?cs skos:prefLabel ?preflabel .
    FILTER (langMatches(lang(?preflabel), '{lang}'))
  }}
  OPTIONAL {{
    {{ ?cs dc11:title ?title }}
    UNION
    {{ ?cs dcterms:title ?title }}
    FILTER (langMatches(lang(?title), '{lang}'))
  }}
}}
ORDER BY ?cs"#
        )))
    }

    /// CONSTRUCT of a scheme's own statements, without its top-concept list
    pub fn concept_scheme_query(&self, scheme: &str) -> Result<String> {
        let scheme = iri(scheme)?;
        let fcl = self.scope.from_clause()?;
        Ok(self.finish(format!(
            r#"CONSTRUCT {{
  {scheme} ?property ?value .
}} {fcl}
WHERE {{
  {scheme} ?property ?value .
  FILTER (?property != skos:hasTopConcept)
}}"#
        )))
    }

    /// CONSTRUCT describing concepts: their statements, labels and notations
    /// of the resources they point to, and the groups they belong to
    pub fn concept_info_query(&self, uris: &[String], array_class: Option<&str>) -> Result<String> {
        if uris.is_empty() {
            return Err(SkosError::InvalidParameter(
                "no concepts to describe".to_string(),
            ));
        }
        let constants = uris.iter().map(|u| iri(u)).collect::<Result<Vec<_>>>()?;
        let values = values_clause("?uri", &constants);
        let (array_construct, array_pattern) = match array_class {
            Some(class) => {
                let class = self.class_iri(class)?;
                (
                    format!("\n  ?x skos:member ?o . ?x skos:prefLabel ?xl . ?x a {class} ."),
                    format!(
                        r#"
    OPTIONAL {{
      ?x skos:member ?o .
      ?x a {class} .
      ?x skos:prefLabel ?xl .
    }}"#
                    ),
                )
            }
            None => (String::new(), String::new()),
        };
        let pattern = self.scope.wrap(&format!(
            r#"  {{
    ?uri ?p ?o .
    OPTIONAL {{ ?p rdfs:label ?proplabel . }}
    OPTIONAL {{
      {{ ?o a ?ot . }}
      UNION
      {{ ?o skos:prefLabel ?opl . }}
      UNION
      {{ ?o rdfs:label ?ol . }}
      UNION
      {{ ?o skos:notation ?on . }}
    }}{array_pattern}
  }}
  UNION
  {{
    ?group skos:member ?uri .
    OPTIONAL {{ ?group skos:prefLabel ?grouplabel . }}
  }}"#
        ))?;
        Ok(self.finish(format!(
            r#"CONSTRUCT {{
  ?uri ?p ?o .
  ?p rdfs:label ?proplabel .
  ?o a ?ot .
  ?o skos:prefLabel ?opl .
  ?o rdfs:label ?ol .
  ?o skos:notation ?on .
  ?group skos:member ?uri .
  ?group skos:prefLabel ?grouplabel .{array_construct}
}}
WHERE {{
  {values}
  {pattern}
}}"#
        )))
    }

    /// Concept and collection classes in use, with labels and superclasses
    pub fn types_query(&self, lang: &str) -> Result<String> {
        let lang = lang_tag(lang)?;
        let fcl = self.scope.from_clause()?;
        Ok(self.finish(format!(
            r#"SELECT DISTINCT ?type ?label ?superclass {fcl}
WHERE {{
  {{
    {{ BIND( skos:Concept as ?type ) }}
    UNION
    {{ BIND( skos:Collection as ?type ) }}
    UNION
    {{ BIND( isothes:ConceptGroup as ?type ) }}
    UNION
    {{ BIND( isothes:ThesaurusArray as ?type ) }}
    UNION
    {{ ?type rdfs:subClassOf/rdfs:subClassOf* skos:Concept . }}
    UNION
    {{ ?type rdfs:subClassOf/rdfs:subClassOf* skos:Collection . }}
  }}
  OPTIONAL {{
    ?type rdfs:label ?label .
    FILTER (langMatches(lang(?label), '{lang}'))
  }}
  OPTIONAL {{
    ?type rdfs:subClassOf ?superclass .
  }}
  FILTER EXISTS {{
    ?s a ?type .
    ?s skos:prefLabel ?prefLabel .
  }}
}}"#
        )))
    }

    /// Instances per concept or collection class
    pub fn count_concepts_query(&self, array: Option<&str>, group: Option<&str>) -> Result<String> {
        let fcl = self.scope.from_clause()?;
        let mut optional = String::new();
        if let Some(array) = array {
            optional.push_str(&format!(
                " UNION {{ ?type rdfs:subClassOf* {} }}",
                self.class_iri(array)?
            ));
        }
        if let Some(group) = group {
            optional.push_str(&format!(
                " UNION {{ ?type rdfs:subClassOf* {} }}",
                self.class_iri(group)?
            ));
        }
        Ok(self.finish(format!(
            r#"SELECT (COUNT(?conc) as ?c) ?type ?typelabel {fcl}
WHERE {{
  {{
    ?conc a ?type .
    {{ ?type rdfs:subClassOf* skos:Concept . }} UNION {{ ?type rdfs:subClassOf* skos:Collection . }}{optional}
  }}
  OPTIONAL {{ ?type rdfs:label ?typelabel . }}
}}
GROUP BY ?type ?typelabel"#
        )))
    }

    /// Label counts per language and label property
    pub fn count_lang_concepts_query(&self, langs: &[String], classes: &[String]) -> Result<String> {
        if langs.is_empty() {
            return Err(SkosError::InvalidParameter(
                "at least one language is required".to_string(),
            ));
        }
        let quoted = langs
            .iter()
            .map(|l| lang_tag(l).map(|l| format!("'{l}'")))
            .collect::<Result<Vec<_>>>()?
            .join(",");
        let values = self.class_values(classes)?;
        let props: Vec<String> = COUNTED_LABEL_PROPERTIES
            .iter()
            .map(|p| p.to_string())
            .collect();
        let values_prop = values_clause("?prop", &props);
        let pattern = self.scope.wrap(&format!(
            r#"    {values}
    {values_prop}
    ?conc a ?type .
    ?conc ?prop ?label .
    BIND(LANG(?label) AS ?lang)
    FILTER(?lang IN ({quoted}))"#
        ))?;
        Ok(self.finish(format!(
            r#"SELECT ?lang ?prop (COUNT(?label) as ?count)
WHERE {{
  {pattern}
}}
GROUP BY ?lang ?prop ?type"#
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{GenericDialect, JenaTextDialect};
    use proptest::prelude::*;

    const TA111: &str = "http://www.skosmos.skos/test/ta111";
    const TEST_GRAPH: &str = "http://www.skosmos.skos/test/";

    fn generic(scope: GraphScope) -> QueryBuilder {
        QueryBuilder::new(
            Arc::new(GenericDialect),
            scope,
            Arc::new(NamespaceTable::default()),
        )
    }

    fn jena(scope: GraphScope, collation: bool) -> QueryBuilder {
        QueryBuilder::new(
            Arc::new(JenaTextDialect::new(collation)),
            scope,
            Arc::new(NamespaceTable::default()),
        )
    }

    fn named() -> GraphScope {
        GraphScope::Named(TEST_GRAPH.to_string())
    }

    fn broader() -> Vec<String> {
        vec!["skos:broader".to_string()]
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(limit_offset(Pagination::default()), "");
        assert_eq!(limit_offset(Pagination::new(Some(2), Some(1))), "\nLIMIT 2\nOFFSET 1");
        assert_eq!(limit_offset(Pagination::new(Some(0), Some(3))), "\nOFFSET 3");
        assert_eq!(limit_offset(Pagination::new(Some(5), Some(0))), "\nLIMIT 5");
    }

    #[test]
    fn test_index_letter_parse() {
        assert_eq!(IndexLetter::parse("*").unwrap(), IndexLetter::All);
        assert_eq!(IndexLetter::parse("0-9").unwrap(), IndexLetter::Digits);
        assert_eq!(IndexLetter::parse("!*").unwrap(), IndexLetter::Special);
        assert_eq!(
            IndexLetter::parse("B").unwrap(),
            IndexLetter::Letter("b".to_string())
        );
        assert!(IndexLetter::parse("").is_err());
    }

    #[test]
    fn test_label_query_declares_prefixes_and_graph() {
        let q = generic(named()).label_query(TA111, Some("en")).unwrap();
        assert!(q.starts_with("PREFIX skos: <http://www.w3.org/2004/02/skos/core#>\n"));
        assert!(q.contains("PREFIX dc11: <http://purl.org/dc/elements/1.1/>"));
        assert!(q.contains("SELECT ?label FROM <http://www.skosmos.skos/test/>"));
        assert!(q.contains("<http://www.skosmos.skos/test/ta111> skos:prefLabel ?label ."));
        assert!(q.contains("FILTER (langMatches(lang(?label), 'en'))"));
    }

    #[test]
    fn test_builders_are_pure() {
        let b = generic(named());
        assert_eq!(
            b.transitive_query(TA111, &broader(), "en", 10, false).unwrap(),
            b.transitive_query(TA111, &broader(), "en", 10, false).unwrap()
        );
    }

    #[test]
    fn test_transitive_query() {
        let q = generic(named())
            .transitive_query(TA111, &broader(), "en", 10, true)
            .unwrap();
        assert!(q.contains("<http://www.skosmos.skos/test/ta111> skos:broader* ?object ."));
        assert!(q.contains("?object skos:broader ?dir ."));
        assert!(q.contains("GROUP BY ?object ?label ?top"));
        assert!(q.contains("OPTIONAL { ?object skos:prefLabel ?label }"));
        assert!(q.trim_end().ends_with("LIMIT 10"));

        let multi = vec!["skos:broader".to_string(), "isothes:broaderPartitive".to_string()];
        let q = generic(named())
            .transitive_query(TA111, &multi, "en", 10, false)
            .unwrap();
        assert!(q.contains("(skos:broader|isothes:broaderPartitive)* ?object"));
        assert!(q.contains("PREFIX isothes:"));

        assert!(generic(named())
            .transitive_query(TA111, &broader(), "en", 0, false)
            .is_err());
    }

    #[test]
    fn test_malformed_parameters_rejected() {
        let b = generic(named());
        assert!(b.label_query("http://ex.org/a> . ?s ?p ?o", None).is_err());
        assert!(b.label_query(TA111, Some("en') || true || ('")).is_err());
        assert!(b.property_query(TA111, "skos:broader } ", "en", false).is_err());
        assert!(b.children_query(TA111, "en", "en", &[], None).is_err());
        assert!(b.top_concepts_query(&[], "en", "en").is_err());
    }

    #[test]
    fn test_children_query_flags_collections() {
        let q = generic(named())
            .children_query(
                TA111,
                "en",
                "fi",
                &broader(),
                Some("isothes:ThesaurusArray"),
            )
            .unwrap();
        assert!(q.contains("?child skos:broader <http://www.skosmos.skos/test/ta111> ."));
        assert!(q.contains("FILTER (langMatches(lang(?label), 'fi'))"));
        assert!(q.contains("UNION { ?child a <http://purl.org/iso25964/skos-thes#ThesaurusArray> }"));
        assert!(q.contains("AS ?collection)"));
    }

    #[test]
    fn test_change_list_query_pages_by_200() {
        let q = generic(named())
            .change_list_query("en", 400, "dc:modified")
            .unwrap();
        assert!(q.contains("?concept dc:modified ?date ."));
        assert!(q.ends_with("LCASE(?label)\nLIMIT 200\nOFFSET 400"));
        assert!(q.contains("PREFIX dc: <http://purl.org/dc/terms/>"));
    }

    #[test]
    fn test_alphabetical_query_generic_letter() {
        let q = generic(named())
            .alphabetical_query(
                &IndexLetter::parse("B").unwrap(),
                "en",
                Pagination::new(Some(2), Some(1)),
                &[],
                false,
                None,
            )
            .unwrap();
        assert!(q.contains("GRAPH <http://www.skosmos.skos/test/> {"));
        assert!(q.contains("FILTER (STRSTARTS(LCASE(STR(?match)), 'b'))"));
        assert!(q.contains("BIND (?match AS ?alabel)"));
        assert!(q.contains("VALUES (?type) { (<http://www.w3.org/2004/02/skos/core#Concept>) }"));
        assert!(q.contains("FILTER NOT EXISTS { ?s owl:deprecated true }"));
        assert!(q.ends_with(
            "ORDER BY LCASE(STR(COALESCE(?alabel, ?label))) STR(?s)\nLIMIT 2\nOFFSET 1"
        ));
    }

    #[test]
    fn test_alphabetical_query_jena_collation_and_qualifier() {
        let q = jena(named(), true)
            .alphabetical_query(
                &IndexLetter::parse("b").unwrap(),
                "fi",
                Pagination::default(),
                &["skos:Concept".to_string()],
                true,
                Some("skos:notation"),
            )
            .unwrap();
        assert!(q.contains("text:query (skos:prefLabel 'b*' 100000 'lang:fi*')"));
        assert!(q.contains("OPTIONAL { ?s skos:notation ?qualifier }"));
        assert!(!q.contains("owl:deprecated"));
        assert!(q.ends_with(
            "ORDER BY arq:collation('fi', LCASE(STR(COALESCE(?alabel, ?label)))) STR(?s) LCASE(STR(?qualifier))"
        ));
        assert!(q.contains("PREFIX arq:"));
        assert!(q.contains("PREFIX text:"));
    }

    #[test]
    fn test_alphabetical_special_tokens_use_regex_on_every_dialect() {
        for builder in [generic(named()), jena(named(), false)] {
            let q = builder
                .alphabetical_query(
                    &IndexLetter::Special,
                    "en",
                    Pagination::default(),
                    &[],
                    false,
                    None,
                )
                .unwrap();
            assert!(q.contains(r"regex(str(?label), '^[^\\p{L}0-9].*$', 'i')"));
            assert!(!q.contains("text:query"));

            let q = builder
                .alphabetical_query(&IndexLetter::Digits, "en", Pagination::default(), &[], false, None)
                .unwrap();
            assert!(q.contains("regex(str(?alabel), '^[0-9].*$', 'i')"));
        }
    }

    #[test]
    fn test_concept_search_query_generic() {
        let search = SearchQuery::new("bass").with_lang("en").with_search_lang("en");
        let q = generic(named())
            .concept_search_query(&search, SearchOptions::default(), Pagination::default())
            .unwrap();
        assert!(q.contains("VALUES (?prop ?pri) { (skos:prefLabel 1) (skos:altLabel 3) (skos:hiddenLabel 5) }"));
        assert!(q.contains("STRSTARTS(LCASE(STR(?match)), 'bass') && LANGMATCHES(lang(?match), 'en')"));
        assert!(q.contains(r#"{ ?s skos:notation "bass" }"#));
        assert!(q.contains("{ ?s a <http://www.w3.org/2004/02/skos/core#Concept> }"));
        assert!(q.contains("FILTER NOT EXISTS { ?s owl:deprecated true }"));
        assert!(q.contains("(?matchstr AS ?hit)"));
        assert!(q.contains("ORDER BY LCASE(STR(?match)) LANG(?match)"));
        assert!(!q.contains("?graph IN"));
    }

    #[test]
    fn test_concept_search_query_options() {
        let search = SearchQuery::new("tu*")
            .with_lang("en")
            .with_search_lang("fi")
            .with_hidden(false)
            .with_unique(true)
            .with_type("skos:Collection")
            .with_scheme("http://www.skosmos.skos/test/conceptscheme")
            .with_parent("http://www.skosmos.skos/test/ta1")
            .with_group("http://www.skosmos.skos/test/group");
        let options = SearchOptions {
            search_by_notation: true,
            show_deprecated: true,
        };
        let q = generic(named())
            .concept_search_query(&search, options, Pagination::default())
            .unwrap();
        assert!(q.contains("{ (skos:prefLabel 1) (skos:altLabel 3) (skos:notation 1) }"));
        assert!(q.contains("(MIN(?matchstr) AS ?hit)"));
        assert!(q.contains("GROUP BY ?s ?label ?notation"));
        assert!(q.contains("FILTER (LANGMATCHES(LANG(?label), LANG(?match)))"));
        assert!(q.contains("{{?s skos:inScheme <http://www.skosmos.skos/test/conceptscheme>}}"));
        assert!(q.contains("?s skos:broader+ <http://www.skosmos.skos/test/ta1> ."));
        assert!(q.contains("<http://www.skosmos.skos/test/group> skos:member ?s ."));
        assert!(q.contains("{ ?s a <http://www.w3.org/2004/02/skos/core#Collection> }"));
        assert!(!q.contains("owl:deprecated"));
    }

    #[test]
    fn test_concept_search_union_scope_filters_graphs() {
        let scope = GraphScope::Union(vec![
            "http://www.skosmos.skos/test/".to_string(),
            "http://www.skosmos.skos/groups/".to_string(),
        ]);
        let q = jena(scope, false)
            .concept_search_query(
                &SearchQuery::new("bass"),
                SearchOptions::default(),
                Pagination::default(),
            )
            .unwrap();
        assert!(q.contains("GRAPH <urn:x-arq:UnionGraph> { (?s ?score ?match) text:query (?prop 'bass*' 100000) . }"));
        assert!(q.contains("GRAPH ?graph {"));
        assert!(q.contains(
            "FILTER (?graph IN (<http://www.skosmos.skos/test/>,<http://www.skosmos.skos/groups/>))"
        ));
        assert!(q.ends_with("LANG(?match) ?graph"));
        assert!(q.contains("BIND(?pri AS ?npri)"));
    }

    #[test]
    fn test_concept_search_pushes_pagination_to_store() {
        let b = generic(named());
        let search = SearchQuery::new("bass").with_lang("en");
        let q = b
            .concept_search_query(&search, SearchOptions::default(), Pagination::new(Some(1), None))
            .unwrap();
        assert!(q.ends_with("LANG(?match)\nLIMIT 1"));

        let q = b
            .concept_search_query(
                &search,
                SearchOptions::default(),
                Pagination::new(Some(10), Some(20)),
            )
            .unwrap();
        assert!(q.ends_with("LIMIT 10\nOFFSET 20"));
    }

    #[test]
    fn test_concept_search_wildcard_with_group_lists_labels() {
        let search = SearchQuery::new("*")
            .with_lang("en")
            .with_group("http://www.skosmos.skos/test/group");
        let q = generic(named())
            .concept_search_query(&search, SearchOptions::default(), Pagination::default())
            .unwrap();
        assert!(q.contains(
            "?s skos:prefLabel ?label . FILTER (LANGMATCHES(LANG(?label), 'en')) BIND(?label AS ?match)"
        ));
        assert!(!q.contains("?hit"));
    }

    #[test]
    fn test_count_lang_concepts_query() {
        let q = generic(named())
            .count_lang_concepts_query(&["en".to_string(), "fi".to_string()], &[])
            .unwrap();
        assert!(q.contains("FILTER(?lang IN ('en','fi'))"));
        assert!(q.contains("VALUES (?prop) { (skos:prefLabel) (skos:altLabel) (skos:hiddenLabel) }"));
        assert!(generic(named()).count_lang_concepts_query(&[], &[]).is_err());
    }

    #[test]
    fn test_concept_info_query_is_construct() {
        let q = generic(named())
            .concept_info_query(&[TA111.to_string()], Some("isothes:ThesaurusArray"))
            .unwrap();
        assert!(q.contains("CONSTRUCT {"));
        assert!(q.contains("VALUES (?uri) { (<http://www.skosmos.skos/test/ta111>) }"));
        assert!(q.contains("?x a <http://purl.org/iso25964/skos-thes#ThesaurusArray> ."));
        assert!(generic(named()).concept_info_query(&[], None).is_err());
    }

    #[test]
    fn test_count_concepts_query() {
        let q = generic(GraphScope::Default)
            .count_concepts_query(Some("isothes:ThesaurusArray"), None)
            .unwrap();
        assert!(q.contains("SELECT (COUNT(?conc) as ?c) ?type ?typelabel \nWHERE"));
        assert!(q.contains(
            "UNION { ?type rdfs:subClassOf* <http://purl.org/iso25964/skos-thes#ThesaurusArray> }"
        ));
    }

    proptest! {
        #[test]
        fn prop_prefix_search_is_default(term in "[a-z][a-z ]{0,12}[a-z]") {
            let b = generic(named());
            let page = Pagination::default();
            let plain = b
                .concept_search_query(&SearchQuery::new(term.clone()).with_lang("en"), SearchOptions::default(), page)
                .unwrap();
            let starred = b
                .concept_search_query(&SearchQuery::new(format!("{term}*")).with_lang("en"), SearchOptions::default(), page)
                .unwrap();
            prop_assert_eq!(plain, starred);
        }

        #[test]
        fn prop_search_term_cannot_close_literal(term in "[a-z'\"\\\\ ]{1,16}") {
            let search = SearchQuery::new(term).with_lang("en").with_search_lang("en");
            let q = jena(named(), false)
                .concept_search_query(&search, SearchOptions::default(), Pagination::default());
            prop_assert!(q.is_ok());
            let q = q.unwrap();
            let open = "text:query (?prop '";
            if let Some(start) = q.find(open) {
                let rest = &q[start + open.len()..];
                let end = rest.find("' 100000 'lang:en*')");
                prop_assert!(end.is_some());
                let literal = &rest[..end.unwrap_or(0)];
                let mut backslashes = 0usize;
                for c in literal.chars() {
                    if c == '\'' {
                        prop_assert!(backslashes % 2 == 1);
                    }
                    backslashes = if c == '\\' { backslashes + 1 } else { 0 };
                }
            }
        }
    }
}
