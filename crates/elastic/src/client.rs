//! The `DocumentStore` trait and its HTTP implementation.

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::bulk::{build_ndjson, check_bulk_response};
use crate::error::{ElasticError, ElasticResult};

/// Operations the indexer needs from a search backend.
///
/// Implementations only have to be safe for use from a single consumer
/// thread, but `Send + Sync` keeps them shareable across the lifecycle
/// controller and the worker.
pub trait DocumentStore: Send + Sync {
    /// Create the index with the given mappings. Idempotent.
    fn create_index(&self, mappings: &Value) -> ElasticResult<()>;

    /// Index one document; upsert when `id` is given, create otherwise.
    fn index(&self, doc_type: &str, doc: &Value, id: Option<&str>) -> ElasticResult<()>;

    /// Index a batch of documents of one type.
    fn bulk(&self, doc_type: &str, docs: &[Value]) -> ElasticResult<()>;

    /// Run a query, returning the backend's hit envelope
    /// (`hits.total`, `hits.hits[..]._source`).
    fn search(&self, doc_type: &str, query: &Value) -> ElasticResult<Value>;

    /// Delete every document of `doc_type` matching the query.
    fn delete_by_query(&self, doc_type: &str, query: &Value) -> ElasticResult<()>;

    /// Number of documents of `doc_type`.
    fn count(&self, doc_type: &str) -> ElasticResult<u64>;

    /// Drop the whole index. Succeeds when the index does not exist.
    fn delete_index(&self) -> ElasticResult<()>;
}

/// HTTP client for an Elasticsearch-compatible backend, bound to one index.
#[derive(Debug)]
pub struct ElasticClient {
    http: Client,
    base: Url,
    index: String,
}

impl ElasticClient {
    /// Connect to the first node of `nodes`, targeting `index`.
    pub fn new(nodes: &[String], index: impl Into<String>) -> ElasticResult<Self> {
        let raw = nodes.first().cloned().unwrap_or_default();
        let base = Url::parse(&raw).map_err(|e| ElasticError::BadUrl {
            url: raw,
            reason: e.to_string(),
        })?;
        Ok(ElasticClient {
            http: Client::new(),
            base,
            index: index.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().expect("base url cannot be a base");
            path.pop_if_empty();
            path.push(&self.index);
            for s in segments {
                path.push(s);
            }
        }
        url
    }

    fn check(operation: &'static str, response: Response) -> ElasticResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(ElasticError::ResponseCode {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    fn read_json(operation: &'static str, response: Response) -> ElasticResult<Value> {
        response
            .json()
            .map_err(|source| ElasticError::Connection { operation, source })
    }
}

impl DocumentStore for ElasticClient {
    fn create_index(&self, mappings: &Value) -> ElasticResult<()> {
        const OP: &str = "create_index";
        let response = self
            .http
            .put(self.url(&[]))
            .json(mappings)
            .send()
            .map_err(|source| ElasticError::Connection {
                operation: OP,
                source,
            })?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().unwrap_or_default();
            if body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            return Err(ElasticError::ResponseCode {
                operation: OP,
                status: 400,
                body,
            });
        }
        Self::check(OP, response).map(|_| ())
    }

    fn index(&self, doc_type: &str, doc: &Value, id: Option<&str>) -> ElasticResult<()> {
        const OP: &str = "index";
        let request = match id {
            Some(id) => self.http.put(self.url(&[doc_type, id])),
            None => self.http.post(self.url(&[doc_type])),
        };
        let response = request
            .json(doc)
            .send()
            .map_err(|source| ElasticError::Connection {
                operation: OP,
                source,
            })?;
        Self::check(OP, response).map(|_| ())
    }

    fn bulk(&self, doc_type: &str, docs: &[Value]) -> ElasticResult<()> {
        const OP: &str = "bulk";
        if docs.is_empty() {
            return Ok(());
        }
        let body = build_ndjson(docs);
        let response = self
            .http
            .post(self.url(&[doc_type, "_bulk"]))
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .map_err(|source| ElasticError::Connection {
                operation: OP,
                source,
            })?;
        let response = Self::check(OP, response)?;
        check_bulk_response(&Self::read_json(OP, response)?)
    }

    fn search(&self, doc_type: &str, query: &Value) -> ElasticResult<Value> {
        const OP: &str = "search";
        let response = self
            .http
            .post(self.url(&[doc_type, "_search"]))
            .json(query)
            .send()
            .map_err(|source| ElasticError::Connection {
                operation: OP,
                source,
            })?;
        let response = Self::check(OP, response)?;
        Self::read_json(OP, response)
    }

    fn delete_by_query(&self, doc_type: &str, query: &Value) -> ElasticResult<()> {
        const OP: &str = "delete_by_query";
        let response = self
            .http
            .post(self.url(&[doc_type, "_delete_by_query"]))
            .json(query)
            .send()
            .map_err(|source| ElasticError::Connection {
                operation: OP,
                source,
            })?;
        Self::check(OP, response).map(|_| ())
    }

    fn count(&self, doc_type: &str) -> ElasticResult<u64> {
        const OP: &str = "count";
        let response = self
            .http
            .get(self.url(&[doc_type, "_count"]))
            .send()
            .map_err(|source| ElasticError::Connection {
                operation: OP,
                source,
            })?;
        let response = Self::check(OP, response)?;
        let body = Self::read_json(OP, response)?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }

    fn delete_index(&self) -> ElasticResult<()> {
        const OP: &str = "delete_index";
        let response = self
            .http
            .delete(self.url(&[]))
            .send()
            .map_err(|source| ElasticError::Connection {
                operation: OP,
                source,
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(OP, response).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_index_scoped_urls() {
        let client =
            ElasticClient::new(&["http://localhost:9200/".to_string()], "eos").unwrap();
        assert_eq!(client.url(&[]).as_str(), "http://localhost:9200/eos");
        assert_eq!(
            client.url(&["accounts", "_search"]).as_str(),
            "http://localhost:9200/eos/accounts/_search"
        );
    }

    #[test]
    fn rejects_bad_node_url() {
        let err = ElasticClient::new(&["not a url".to_string()], "eos").unwrap_err();
        assert!(matches!(err, ElasticError::BadUrl { .. }));
    }

    #[test]
    fn rejects_empty_node_list() {
        assert!(ElasticClient::new(&[], "eos").is_err());
    }
}
