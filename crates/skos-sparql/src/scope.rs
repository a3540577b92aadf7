//! Graph scoping of generated queries

use crate::escape::iri;
use skos_core::{EndpointBinding, GraphTarget, Result};

/// Which graphs a query may read from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GraphScope {
    /// The endpoint's default graph
    #[default]
    Default,
    /// A single named graph
    Named(String),
    /// Any of the listed graphs, bound to `?graph`; an empty list admits every graph
    Union(Vec<String>),
}

impl GraphScope {
    /// Scope for a binding; wildcard bindings are limited to `union_graphs`
    pub fn for_binding(binding: &EndpointBinding, union_graphs: Vec<String>) -> Self {
        match &binding.graph {
            GraphTarget::Default => Self::Default,
            GraphTarget::Named(graph) => Self::Named(graph.clone()),
            GraphTarget::Wildcard => Self::Union(union_graphs),
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Self::Union(_))
    }

    /// `FROM` clause for simple lookups; only a named graph needs one
    pub fn from_clause(&self) -> Result<String> {
        match self {
            Self::Named(graph) => Ok(format!("FROM {}", iri(graph)?)),
            _ => Ok(String::new()),
        }
    }

    /// Restrict `?graph` to the listed graphs
    pub fn graph_filter(&self) -> Result<String> {
        match self {
            Self::Union(graphs) if !graphs.is_empty() => {
                let list = graphs
                    .iter()
                    .map(|g| iri(g))
                    .collect::<Result<Vec<_>>>()?
                    .join(",");
                Ok(format!("FILTER (?graph IN ({list}))"))
            }
            _ => Ok(String::new()),
        }
    }

    /// Wrap a group graph pattern so it is matched inside the scoped graph(s)
    pub fn wrap(&self, pattern: &str) -> Result<String> {
        match self {
            Self::Default => Ok(pattern.to_string()),
            Self::Named(graph) => Ok(format!("GRAPH {} {{\n{pattern}\n }}", iri(graph)?)),
            Self::Union(_) => Ok(format!(
                "GRAPH ?graph {{\n{pattern}\n }}\n {}",
                self.graph_filter()?
            )),
        }
    }

    /// Extra ORDER BY key keeping hits from different graphs apart
    pub fn order_extra(&self) -> &'static str {
        if self.is_union() {
            " ?graph"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skos_core::Dialect;

    fn binding(graph: GraphTarget) -> EndpointBinding {
        EndpointBinding {
            dialect: Dialect::Generic,
            endpoint_url: "http://localhost:3030/ds/sparql".to_string(),
            graph,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_scope_for_binding() {
        assert_eq!(
            GraphScope::for_binding(&binding(GraphTarget::Default), vec![]),
            GraphScope::Default
        );
        assert_eq!(
            GraphScope::for_binding(&binding(GraphTarget::Named("http://ex.org/g".into())), vec![]),
            GraphScope::Named("http://ex.org/g".to_string())
        );
        assert!(GraphScope::for_binding(&binding(GraphTarget::Wildcard), vec![]).is_union());
    }

    #[test]
    fn test_from_clause_and_wrap() {
        let named = GraphScope::Named("http://ex.org/g".to_string());
        assert_eq!(named.from_clause().unwrap(), "FROM <http://ex.org/g>");
        assert!(named.wrap("?s ?p ?o").unwrap().starts_with("GRAPH <http://ex.org/g> {"));

        assert_eq!(GraphScope::Default.from_clause().unwrap(), "");
        assert_eq!(GraphScope::Default.wrap("?s ?p ?o").unwrap(), "?s ?p ?o");
    }

    #[test]
    fn test_union_filter_limits_graphs() {
        let scope = GraphScope::Union(vec!["http://ex.org/a".into(), "http://ex.org/b".into()]);
        assert_eq!(
            scope.graph_filter().unwrap(),
            "FILTER (?graph IN (<http://ex.org/a>,<http://ex.org/b>))"
        );
        let wrapped = scope.wrap("?s ?p ?o").unwrap();
        assert!(wrapped.starts_with("GRAPH ?graph {"));
        assert!(wrapped.ends_with("FILTER (?graph IN (<http://ex.org/a>,<http://ex.org/b>))"));

        assert_eq!(GraphScope::Union(vec![]).graph_filter().unwrap(), "");
    }

    #[test]
    fn test_rejects_malformed_graph() {
        assert!(GraphScope::Named("http://ex.org/g> }".into()).from_clause().is_err());
    }
}
