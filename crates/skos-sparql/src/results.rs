//! Result transformation
//!
//! Converts SELECT tables and CONSTRUCT graphs into the typed records of
//! `skos-core`. Label-bearing rows go through `LanguageFallback`, result URIs
//! are attributed through the vocabulary registry, and search results from
//! several bindings are merged with an explicit de-duplication priority.
//!
//! Author: hephaex@gmail.com

use crate::query::COUNTED_LABEL_PROPERTIES;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use skos_core::{
    AlphabeticalHit, Attribution, ChangeEntry, ChildConcept, ConceptCount, ConceptDescription,
    ConceptGroup, ConceptNode, ConceptScheme, GroupMember, LabelHit, LangCounts, NamespaceTable,
    NarrowerEntry, ParentListEntry, PropertyValue, RdfTerm, ResultTable, SchemeSubject, Solution,
    TopConcept, TransitiveClosure, Triple, TypeInfo, Vocabulary, VocabularyRegistry,
};
use std::collections::{BTreeMap, HashMap, HashSet};

const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
const SKOS_MEMBER: &str = "http://www.w3.org/2004/02/skos/core#member";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

// ============================================================================
// Language Fallback
// ============================================================================

/// Ranks label languages: requested first, then configured languages in
/// priority order, then anything else
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageFallback {
    requested: String,
    configured: Vec<String>,
}

impl LanguageFallback {
    pub fn new(requested: impl Into<String>, configured: &[String]) -> Self {
        Self {
            requested: requested.into(),
            configured: configured.to_vec(),
        }
    }

    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Lower is better; untagged literals rank with "any language"
    pub fn rank(&self, lang: Option<&str>) -> usize {
        let any = self.configured.len() + 1;
        match lang {
            Some(tag) if lang_matches(tag, &self.requested) => 0,
            Some(tag) => self
                .configured
                .iter()
                .position(|c| lang_matches(tag, c))
                .map_or(any, |p| p + 1),
            None => any,
        }
    }

    /// Best-ranked term; the first one wins ties
    pub fn pick<'t>(&self, terms: impl IntoIterator<Item = &'t RdfTerm>) -> Option<&'t RdfTerm> {
        terms.into_iter().min_by_key(|t| self.rank(t.lang()))
    }

    fn offer(&self, slot: &mut Option<RdfTerm>, candidate: Option<&RdfTerm>) {
        if let Some(candidate) = candidate {
            let better = slot
                .as_ref()
                .map_or(true, |cur| self.rank(candidate.lang()) < self.rank(cur.lang()));
            if better {
                *slot = Some(candidate.clone());
            }
        }
    }

    /// Label text, suffixed with ` (xx)` when it is not in the requested language
    pub fn display(&self, label: &RdfTerm) -> String {
        match label.lang() {
            Some(tag) if !lang_matches(tag, &self.requested) => {
                format!("{} ({tag})", label.value())
            }
            _ => label.value().to_string(),
        }
    }
}

/// `tag` equals `lang` or is a subtag of it (`en-GB` matches `en`)
fn lang_matches(tag: &str, lang: &str) -> bool {
    tag.eq_ignore_ascii_case(lang)
        || (tag.len() > lang.len()
            && tag.as_bytes()[lang.len()] == b'-'
            && tag[..lang.len()].eq_ignore_ascii_case(lang))
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Parse `xsd:date` or `xsd:dateTime` lexical forms
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|d| d.date())
        })
}

/// Index letters sorted, then `!*` and `0-9` when such labels exist
pub fn alphabet_index(first_characters: &[String]) -> Vec<String> {
    let mut letters = Vec::new();
    let mut digits = false;
    let mut special = false;
    for token in first_characters {
        match token.chars().next() {
            Some(c) if c.is_alphabetic() => letters.push(token.clone()),
            Some(c) if c.is_ascii_digit() => digits = true,
            Some(_) => special = true,
            None => {}
        }
    }
    letters.sort();
    letters.dedup();
    if special {
        letters.push("!*".to_string());
    }
    if digits {
        letters.push("0-9".to_string());
    }
    letters
}

// ============================================================================
// Search Result Merging
// ============================================================================

/// How narrowly the binding that produced a batch was scoped
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScopeRank {
    /// A single vocabulary's own graph or endpoint
    Named,
    /// The union of several graphs on a shared endpoint
    Union,
}

/// Hits returned by one query
#[derive(Debug, Clone)]
pub struct SearchBatch {
    pub scope: ScopeRank,
    pub hits: Vec<LabelHit>,
}

fn matched_label(hit: &LabelHit) -> &str {
    hit.matched_pref_label
        .as_deref()
        .or(hit.alt_label.as_deref())
        .or(hit.hidden_label.as_deref())
        .or(hit.pref_label.as_deref())
        .unwrap_or(&hit.uri)
}

type Priority = (u8, u8, ScopeRank, usize);

/// Display-language prefLabel, other prefLabel, altLabel, hiddenLabel
fn match_rank(hit: &LabelHit) -> u8 {
    if hit.matched_pref_label.is_some() {
        1
    } else if hit.alt_label.is_some() {
        2
    } else if hit.hidden_label.is_some() {
        3
    } else {
        0
    }
}

fn priority(registry: &VocabularyRegistry, scope: ScopeRank, hit: &LabelHit) -> Priority {
    let local = matches!(hit.attribution, Attribution::Local { .. });
    let position = hit
        .attribution
        .queried_vocab()
        .map_or(usize::MAX, |v| registry.position(v));
    (match_rank(hit), u8::from(!local), scope, position)
}

/// Stable k-way merge on the lowercase matched label. Hits within a batch
/// keep their order; ties go to the earlier batch.
fn interleave<T>(batches: Vec<Vec<(T, LabelHit)>>) -> Vec<(T, LabelHit)> {
    let total = batches.iter().map(Vec::len).sum();
    let mut queues: Vec<_> = batches
        .into_iter()
        .map(|batch| batch.into_iter().peekable())
        .collect();
    let mut out = Vec::with_capacity(total);
    loop {
        let next = queues
            .iter_mut()
            .enumerate()
            .filter_map(|(i, queue)| {
                queue
                    .peek()
                    .map(|(_, hit)| (matched_label(hit).to_lowercase(), i))
            })
            .min();
        let Some((_, i)) = next else {
            break;
        };
        out.extend(queues[i].next());
    }
    out
}

/// Merge batches into a result set in which every URI appears once.
///
/// A single batch keeps the order the store returned it in, collation
/// included. Several batches are interleaved by matched label without
/// reordering any batch.
///
/// Among hits for one URI the winner is the best label match, then the hit
/// attributed to the vocabulary owning the URI, then the one from the
/// narrower scope, then the one from the vocabulary configured first. The
/// winner keeps its own position.
pub fn merge_search_results(
    registry: &VocabularyRegistry,
    batches: Vec<SearchBatch>,
) -> Vec<LabelHit> {
    let ranked = interleave(
        batches
            .into_iter()
            .map(|batch| {
                let scope = batch.scope;
                batch
                    .hits
                    .into_iter()
                    .map(|hit| (priority(registry, scope, &hit), hit))
                    .collect()
            })
            .collect(),
    );

    let mut winners: HashMap<&str, usize> = HashMap::new();
    for (i, (rank, hit)) in ranked.iter().enumerate() {
        winners
            .entry(hit.uri.as_str())
            .and_modify(|w| {
                if *rank < ranked[*w].0 {
                    *w = i;
                }
            })
            .or_insert(i);
    }
    let keep: HashSet<usize> = winners.into_values().collect();

    ranked
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, (_, hit))| hit)
        .collect()
}

/// Replace collection children by their members, keeping member order and
/// returning every concept once
pub fn expand_collections(
    children: Vec<ChildConcept>,
    members: &[(String, ChildConcept)],
) -> Vec<ChildConcept> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        if child.is_collection {
            for (_, member) in members.iter().filter(|(c, _)| *c == child.uri) {
                if seen.insert(member.uri.clone()) {
                    out.push(member.clone());
                }
            }
        } else if seen.insert(child.uri.clone()) {
            out.push(child);
        }
    }
    out
}

// ============================================================================
// Result Transformer
// ============================================================================

/// Typed transforms for every query the engine issues
#[derive(Debug, Clone)]
pub struct ResultTransformer<'a> {
    registry: &'a VocabularyRegistry,
    fallback: LanguageFallback,
}

impl<'a> ResultTransformer<'a> {
    pub fn new(registry: &'a VocabularyRegistry, fallback: LanguageFallback) -> Self {
        Self { registry, fallback }
    }

    pub fn fallback(&self) -> &LanguageFallback {
        &self.fallback
    }

    fn namespaces(&self) -> &NamespaceTable {
        self.registry.namespaces()
    }

    /// Labels by language; `None` when the resource does not exist
    pub fn labels(&self, table: &ResultTable) -> Option<BTreeMap<String, String>> {
        if table.is_empty() {
            return None;
        }
        let mut labels = BTreeMap::new();
        for row in table.rows() {
            if let Some(label) = row.get("label") {
                labels
                    .entry(label.lang().unwrap_or_default().to_string())
                    .or_insert_with(|| label.value().to_string());
            }
        }
        Some(labels)
    }

    pub fn notation(&self, table: &ResultTable) -> Option<String> {
        table
            .rows()
            .iter()
            .find_map(|row| row.value("notation"))
            .map(str::to_string)
    }

    pub fn super_properties(&self, table: &ResultTable) -> Option<Vec<String>> {
        let mut supers = Vec::new();
        for row in table.rows() {
            if let Some(uri) = row.iri("superProperty") {
                push_unique(&mut supers, uri);
            }
        }
        (!supers.is_empty()).then_some(supers)
    }

    /// Property values keyed by value; `None` when the concept does not exist
    pub fn property_values(&self, table: &ResultTable) -> Option<BTreeMap<String, PropertyValue>> {
        if table.is_empty() {
            return None;
        }
        let mut values: BTreeMap<String, Option<RdfTerm>> = BTreeMap::new();
        for row in table.rows() {
            let Some(object) = row.value("object") else {
                continue;
            };
            let slot = values.entry(object.to_string()).or_default();
            self.fallback.offer(slot, row.get("label"));
        }
        Some(
            values
                .into_iter()
                .map(|(k, label)| {
                    let label = label.map(|l| l.value().to_string());
                    (k, PropertyValue { label })
                })
                .collect(),
        )
    }

    /// Flat closure map; `None` when the concept does not exist.
    ///
    /// `has_narrower` is derived from the edges inside the returned closure:
    /// it marks nodes on the path towards the queried concept, not every
    /// concept that has narrowers in the vocabulary.
    pub fn transitive(&self, table: &ResultTable) -> Option<TransitiveClosure> {
        if table.is_empty() {
            return None;
        }
        let mut labels: HashMap<String, Option<RdfTerm>> = HashMap::new();
        let mut closure = TransitiveClosure::new();
        for row in table.rows() {
            let Some(uri) = row.value("object") else {
                continue;
            };
            let node = closure
                .entry(uri.to_string())
                .or_insert_with(|| ConceptNode::new(uri));
            for broader in split_list(row.value("direct")) {
                push_unique(&mut node.direct, &broader);
            }
            node.is_top |= row.bool("top");
            self.fallback
                .offer(labels.entry(uri.to_string()).or_default(), row.get("label"));
        }
        for (uri, label) in labels {
            if let (Some(node), Some(label)) = (closure.get_mut(&uri), label) {
                node.label = Some(label.value().to_string());
            }
        }
        let targets: HashSet<String> = closure.values().flat_map(|n| n.direct.clone()).collect();
        for node in closure.values_mut() {
            node.has_narrower = targets.contains(&node.uri);
        }
        Some(closure)
    }

    fn child_from_row(&self, row: &Solution, var: &str) -> Option<(ChildConcept, Option<RdfTerm>)> {
        let uri = row.iri(var)?;
        let child = ChildConcept {
            uri: uri.to_string(),
            pref_label: None,
            notation: row.value("notation").map(str::to_string),
            has_children: row.bool("grandchildren"),
            is_collection: row.bool("collection"),
            collection: None,
        };
        Some((child, row.get("label").cloned()))
    }

    /// Narrower concepts in store order; `None` when the concept does not exist
    pub fn children(&self, table: &ResultTable) -> Option<Vec<ChildConcept>> {
        if table.is_empty() {
            return None;
        }
        let mut children: Vec<(ChildConcept, Option<RdfTerm>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in table.rows() {
            let Some((child, label)) = self.child_from_row(row, "child") else {
                continue;
            };
            match index.get(&child.uri) {
                Some(&i) => self.fallback.offer(&mut children[i].1, label.as_ref()),
                None => {
                    index.insert(child.uri.clone(), children.len());
                    children.push((child, label));
                }
            }
        }
        Some(self.with_display_labels(children))
    }

    /// Members per collection, in the order the store lists them
    pub fn collection_members(&self, table: &ResultTable) -> Vec<(String, ChildConcept)> {
        let mut members: Vec<(String, (ChildConcept, Option<RdfTerm>))> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        for row in table.rows() {
            let Some(collection) = row.iri("collection") else {
                continue;
            };
            let Some((mut child, label)) = self.child_from_row(row, "child") else {
                continue;
            };
            child.is_collection = false;
            child.collection = Some(collection.to_string());
            let key = (collection.to_string(), child.uri.clone());
            match index.get(&key) {
                Some(&i) => self.fallback.offer(&mut members[i].1 .1, label.as_ref()),
                None => {
                    index.insert(key, members.len());
                    members.push((collection.to_string(), (child, label)));
                }
            }
        }
        members
            .into_iter()
            .map(|(collection, (mut child, label))| {
                child.pref_label = label.map(|l| self.fallback.display(&l));
                (collection, child)
            })
            .collect()
    }

    fn with_display_labels(&self, rows: Vec<(ChildConcept, Option<RdfTerm>)>) -> Vec<ChildConcept> {
        rows.into_iter()
            .map(|(mut child, label)| {
                child.pref_label = label.map(|l| self.fallback.display(&l));
                child
            })
            .collect()
    }

    pub fn top_concepts(&self, table: &ResultTable) -> Vec<TopConcept> {
        let mut tops: Vec<(TopConcept, Option<RdfTerm>)> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        for row in table.rows() {
            let (Some(uri), Some(scheme)) = (row.iri("top"), row.iri("topuri")) else {
                continue;
            };
            let key = (uri.to_string(), scheme.to_string());
            match index.get(&key) {
                Some(&i) => self.fallback.offer(&mut tops[i].1, row.get("label")),
                None => {
                    index.insert(key, tops.len());
                    tops.push((
                        TopConcept {
                            uri: uri.to_string(),
                            top_concept_of: scheme.to_string(),
                            label: String::new(),
                            notation: row.value("notation").map(str::to_string),
                            has_children: row.bool("children"),
                        },
                        row.get("label").cloned(),
                    ));
                }
            }
        }
        tops.into_iter()
            .map(|(mut top, label)| {
                top.label = label
                    .map(|l| self.fallback.display(&l))
                    .unwrap_or_else(|| top.uri.clone());
                top
            })
            .collect()
    }

    /// Ancestors keyed by URI; `None` when the concept does not exist
    pub fn parent_list(&self, table: &ResultTable) -> Option<BTreeMap<String, ParentListEntry>> {
        if table.is_empty() {
            return None;
        }
        let mut entries: BTreeMap<String, ParentListEntry> = BTreeMap::new();
        let mut labels: HashMap<String, Option<RdfTerm>> = HashMap::new();
        for row in table.rows() {
            let Some(uri) = row.iri("broad") else {
                continue;
            };
            let entry = entries.entry(uri.to_string()).or_insert_with(|| ParentListEntry {
                uri: uri.to_string(),
                ..Default::default()
            });
            self.fallback
                .offer(labels.entry(uri.to_string()).or_default(), row.get("label"));
            if let Some(notation) = row.value("notation") {
                entry.notation = Some(notation.to_string());
            }
            if let Some(parent) = row.iri("parent") {
                push_unique(&mut entry.broader, parent);
            }
            for top in split_list(row.value("tops")) {
                push_unique(&mut entry.tops, &top);
            }
            entry.tops.sort();
            if let Some(child) = row.iri("children") {
                if !entry.narrower.iter().any(|n| n.uri == child) {
                    entry.narrower.push(NarrowerEntry {
                        uri: child.to_string(),
                        label: row.get("childlabel").map(|l| self.fallback.display(l)),
                        notation: row.value("childnotation").map(str::to_string),
                        has_children: row.bool("grandchildren"),
                    });
                }
            }
        }
        for (uri, label) in labels {
            if let (Some(entry), Some(label)) = (entries.get_mut(&uri), label) {
                entry.pref_label = Some(self.fallback.display(&label));
            }
        }
        Some(entries)
    }

    pub fn concept_groups(&self, table: &ResultTable) -> Vec<ConceptGroup> {
        let mut groups: Vec<ConceptGroup> = Vec::new();
        for row in table.rows() {
            let Some(uri) = row.iri("group") else {
                continue;
            };
            if let Some(group) = groups.iter_mut().find(|g| g.uri == uri) {
                for child in split_list(row.value("children")) {
                    push_unique(&mut group.child_groups, &child);
                }
                continue;
            }
            groups.push(ConceptGroup {
                uri: uri.to_string(),
                pref_label: row.value("label").map(str::to_string),
                child_groups: split_list(row.value("children")),
                has_members: row.bool("members"),
                notation: row.value("notation").map(str::to_string),
            });
        }
        groups
    }

    pub fn group_contents(&self, table: &ResultTable) -> Vec<GroupMember> {
        let mut members: Vec<(GroupMember, Option<RdfTerm>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in table.rows() {
            let Some(uri) = row.iri("conc") else {
                continue;
            };
            let i = *index.entry(uri.to_string()).or_insert_with(|| {
                members.push((
                    GroupMember {
                        uri: uri.to_string(),
                        is_super: row.bool("super"),
                        has_members: row.bool("members"),
                        types: Vec::new(),
                        pref_label: None,
                        notation: row.value("notation").map(str::to_string),
                    },
                    None,
                ));
                members.len() - 1
            });
            let (member, label) = &mut members[i];
            if let Some(class) = row.iri("type") {
                push_unique(&mut member.types, &self.namespaces().shorten_or_uri(class));
            }
            self.fallback.offer(label, row.get("label"));
        }
        members
            .into_iter()
            .map(|(mut member, label)| {
                member.pref_label = label.map(|l| l.value().to_string());
                member
            })
            .collect()
    }

    pub fn change_list(&self, table: &ResultTable) -> Vec<ChangeEntry> {
        table
            .rows()
            .iter()
            .filter_map(|row| {
                let uri = row.iri("concept")?;
                Some(ChangeEntry {
                    uri: uri.to_string(),
                    pref_label: row.value("label").map(str::to_string),
                    date: row.value("date").and_then(parse_date),
                })
            })
            .collect()
    }

    pub fn first_characters(&self, table: &ResultTable) -> Vec<String> {
        table
            .rows()
            .iter()
            .filter_map(|row| row.value("l"))
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn alphabetical(
        &self,
        table: &ResultTable,
        vocab: Option<&Vocabulary>,
    ) -> Vec<AlphabeticalHit> {
        table
            .rows()
            .iter()
            .filter_map(|row| {
                let uri = row.iri("s")?;
                let label = row.get("label")?;
                Some(AlphabeticalHit {
                    uri: uri.to_string(),
                    local_name: vocab.and_then(|v| v.local_name(uri)),
                    pref_label: label.value().to_string(),
                    alt_label: row.value("alabel").map(str::to_string),
                    lang: label.lang().map(str::to_string),
                    qualifier: row.value("qualifier").map(str::to_string),
                })
            })
            .collect()
    }

    /// Search hits from one query. `queried` is the vocabulary whose binding
    /// ran it; for union queries the vocabulary is looked up from `?graph`.
    pub fn concept_search(
        &self,
        table: &ResultTable,
        queried: Option<&Vocabulary>,
    ) -> Vec<LabelHit> {
        let mut hits = Vec::new();
        for row in table.rows() {
            let Some(uri) = row.iri("s") else {
                continue;
            };
            let graph = row.iri("graph").map(str::to_string);
            let found_in = queried.or_else(|| {
                graph
                    .as_deref()
                    .and_then(|g| self.registry.by_graph(g))
            });
            let found_in_id = found_in.map(Vocabulary::id);
            let owner = self.registry.guess(uri, found_in_id);

            let mut hit = LabelHit {
                uri: uri.to_string(),
                local_name: owner.and_then(|v| v.local_name(uri)),
                pref_label: row.value("label").map(str::to_string),
                matched_pref_label: None,
                alt_label: None,
                hidden_label: None,
                lang: row.lang("label").map(str::to_string),
                notation: row.value("notation").map(str::to_string),
                types: split_list(row.value("types"))
                    .iter()
                    .map(|t| self.namespaces().shorten_or_uri(t))
                    .collect(),
                graph,
                attribution: self.registry.attribute(uri, found_in_id),
            };

            if let Some(plabel) = row.get("plabel") {
                hit.matched_pref_label = Some(plabel.value().to_string());
                hit.lang = plabel.lang().map(str::to_string);
            } else if let Some(alabel) = row.get("alabel") {
                hit.alt_label = Some(alabel.value().to_string());
                hit.lang = alabel.lang().map(str::to_string);
            } else if let Some(hlabel) = row.get("hlabel") {
                hit.hidden_label = Some(hlabel.value().to_string());
                hit.lang = hlabel.lang().map(str::to_string);
            }
            hits.push(hit);
        }
        hits
    }

    pub fn concept_schemes(&self, table: &ResultTable) -> Vec<ConceptScheme> {
        let mut schemes: Vec<ConceptScheme> = Vec::new();
        for row in table.rows() {
            let Some(uri) = row.iri("cs") else {
                continue;
            };
            if schemes.iter().any(|s| s.uri == uri) {
                continue;
            }
            let subject = match (row.iri("domain"), row.value("domainLabel")) {
                (Some(domain), Some(label)) => Some(SchemeSubject {
                    uri: domain.to_string(),
                    pref_label: label.to_string(),
                }),
                _ => None,
            };
            schemes.push(ConceptScheme {
                uri: uri.to_string(),
                label: row.value("label").map(str::to_string),
                pref_label: row.value("preflabel").map(str::to_string),
                title: row.value("title").map(str::to_string),
                subject,
            });
        }
        schemes
    }

    /// Statements about `uri` keyed by shortened predicate, plus the labels
    /// and groups the CONSTRUCT brought along
    pub fn describe(&self, triples: &[Triple], uri: &str) -> ConceptDescription {
        let mut description = ConceptDescription {
            uri: uri.to_string(),
            ..Default::default()
        };
        for triple in triples {
            let subject = triple.subject.value();
            if triple.subject.as_iri() == Some(uri) {
                let values = description
                    .properties
                    .entry(self.namespaces().shorten_or_uri(&triple.predicate))
                    .or_default();
                if !values.contains(&triple.object) {
                    values.push(triple.object.clone());
                }
            } else if triple.predicate == SKOS_MEMBER && triple.object.as_iri() == Some(uri) {
                push_unique(&mut description.groups, subject);
            }
            if subject != uri && (triple.predicate == SKOS_PREF_LABEL || triple.predicate == RDFS_LABEL)
            {
                let labels = description
                    .related_labels
                    .entry(subject.to_string())
                    .or_default();
                if !labels.contains(&triple.object) {
                    labels.push(triple.object.clone());
                }
            }
        }
        description
    }

    pub fn types(&self, table: &ResultTable) -> Vec<TypeInfo> {
        let mut types: Vec<(TypeInfo, Option<RdfTerm>)> = Vec::new();
        for row in table.rows() {
            let Some(uri) = row.iri("type") else {
                continue;
            };
            match types.iter_mut().find(|(t, _)| t.uri == uri) {
                Some((info, label)) => {
                    if info.superclass.is_none() {
                        info.superclass = row.iri("superclass").map(str::to_string);
                    }
                    self.fallback.offer(label, row.get("label"));
                }
                None => types.push((
                    TypeInfo {
                        uri: uri.to_string(),
                        label: None,
                        superclass: row.iri("superclass").map(str::to_string),
                    },
                    row.get("label").cloned(),
                )),
            }
        }
        types
            .into_iter()
            .map(|(mut info, label)| {
                info.label = label.map(|l| l.value().to_string());
                info
            })
            .collect()
    }

    /// Instance counts per class; type labels only in the requested language
    pub fn concept_counts(&self, table: &ResultTable) -> Vec<ConceptCount> {
        let mut counts: Vec<ConceptCount> = Vec::new();
        for row in table.rows() {
            let Some(uri) = row.iri("type") else {
                continue;
            };
            let label = row
                .get("typelabel")
                .filter(|l| self.fallback.rank(l.lang()) == 0)
                .map(|l| l.value().to_string());
            let count = row.get("c").and_then(RdfTerm::as_u64).unwrap_or(0);
            match counts.iter_mut().find(|c| c.type_uri == uri) {
                Some(existing) => {
                    if existing.label.is_none() {
                        existing.label = label;
                    }
                }
                None => counts.push(ConceptCount {
                    type_uri: uri.to_string(),
                    count,
                    label,
                }),
            }
        }
        counts
    }

    /// Label counts with every language and label property present, zero by default
    pub fn lang_counts(&self, table: &ResultTable, langs: &[String]) -> LangCounts {
        let mut counts: LangCounts = langs
            .iter()
            .map(|lang| {
                let props: BTreeMap<String, u64> = COUNTED_LABEL_PROPERTIES
                    .iter()
                    .map(|p| (p.to_string(), 0u64))
                    .collect();
                (lang.clone(), props)
            })
            .collect();
        for row in table.rows() {
            let (Some(lang), Some(prop)) = (row.value("lang"), row.iri("prop")) else {
                continue;
            };
            let count = row.get("count").and_then(RdfTerm::as_u64).unwrap_or(0);
            *counts
                .entry(lang.to_string())
                .or_default()
                .entry(self.namespaces().shorten_or_uri(prop))
                .or_default() += count;
        }
        counts
    }
}
