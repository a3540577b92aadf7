//! HTTP transport for SPARQL endpoints
//!
//! Sends query text as an HTML form POST (SPARQL 1.1 Protocol) and negotiates
//! JSON results for SELECT and N-Triples for CONSTRUCT. One request per call,
//! no retries.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use skos_core::rdf::parse_ntriples;
use skos_core::{QueryForm, RawResult, ResultTable, Result, SkosError, Transport};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
pub const N_TRIPLES: &str = "application/n-triples";

/// reqwest-backed transport shared by all endpoint bindings
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("skosq/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SkosError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (proxies, TLS roots)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        endpoint: &str,
        query: &str,
        form: QueryForm,
        timeout: Duration,
    ) -> Result<RawResult> {
        let accept = match form {
            QueryForm::Select => SPARQL_RESULTS_JSON,
            QueryForm::Construct => N_TRIPLES,
        };

        let response = self
            .client
            .post(endpoint)
            .header(ACCEPT, accept)
            .form(&[("query", query)])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("timed out after {}ms", timeout.as_millis())
                } else {
                    format!("request failed: {e}")
                };
                SkosError::query_failed(endpoint, query, reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SkosError::query_failed(
                endpoint,
                query,
                format!("HTTP {status}: {}", skos_core::excerpt(&body, 200)),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SkosError::query_failed(endpoint, query, format!("reading body: {e}")))?;

        match form {
            QueryForm::Select => ResultTable::from_json(&body)
                .map(RawResult::Table)
                .map_err(|e| {
                    SkosError::query_failed(endpoint, query, format!("invalid results JSON: {e}"))
                }),
            QueryForm::Construct => parse_ntriples(&body)
                .map(RawResult::Graph)
                .map_err(|e| SkosError::query_failed(endpoint, query, e)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        endpoint: &str,
        query: &str,
        form: QueryForm,
        timeout: Duration,
    ) -> Result<RawResult> {
        let id = Uuid::new_v4().simple().to_string();
        let query_id = &id[..8];
        tracing::debug!(query_id, endpoint, query, "Executing SPARQL query");

        let started = Instant::now();
        let result = self.send(endpoint, query, form, timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(raw) => {
                tracing::debug!(query_id, size = raw.size(), elapsed_ms, "SPARQL query completed")
            }
            Err(e) => tracing::warn!(query_id, elapsed_ms, error = %e, "SPARQL query failed"),
        }
        result
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_name() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.name(), "http");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_query_failed() {
        let transport = HttpTransport::new().unwrap();
        // port 9 (discard) on localhost is not expected to accept HTTP
        let err = transport
            .execute(
                "http://127.0.0.1:9/sparql",
                "SELECT * WHERE { ?s ?p ?o }",
                QueryForm::Select,
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        match err {
            SkosError::QueryFailed { endpoint, query, .. } => {
                assert_eq!(endpoint, "http://127.0.0.1:9/sparql");
                assert_eq!(query, "SELECT * WHERE { ?s ?p ?o }");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
