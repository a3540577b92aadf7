//! SKOS SPARQL - Query generation and result processing
//!
//! This crate turns logical vocabulary operations into SPARQL and back:
//! - `QueryBuilder` renders escaped, graph-scoped query text
//! - `DialectStrategy` supplies text search, language and ordering clauses
//!   for plain SPARQL 1.1 or a Jena text index
//! - `HttpTransport` executes queries over the SPARQL 1.1 Protocol
//! - `ResultTransformer` maps result tables and graphs into typed records
//! - `HierarchyBuilder` reconstructs breadcrumb paths from closures
//! - `Engine` ties them together per vocabulary binding
//!
//! Author: hephaex@gmail.com

pub mod dialect;
pub mod engine;
pub mod escape;
pub mod hierarchy;
pub mod query;
pub mod results;
pub mod scope;
pub mod transport;

pub use dialect::{create_dialect, DialectStrategy, GenericDialect, JenaTextDialect};
pub use engine::Engine;
pub use hierarchy::{HierarchyBuilder, HierarchyDiagnostics, MAX_VISIBLE_CRUMBS};
pub use query::{IndexLetter, QueryBuilder, SearchOptions};
pub use results::{LanguageFallback, ResultTransformer};
pub use scope::GraphScope;
pub use transport::HttpTransport;
