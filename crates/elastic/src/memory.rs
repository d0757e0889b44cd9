//! In-memory `DocumentStore` for tests.
//!
//! Supports the two query shapes the indexer issues: a single `term` and a
//! `bool.must` conjunction of `term`s.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::client::DocumentStore;
use crate::error::ElasticResult;

#[derive(Debug, Clone)]
struct Doc {
    id: String,
    source: Value,
}

#[derive(Default)]
struct Inner {
    created: bool,
    deletions: usize,
    next_id: u64,
    docs: HashMap<String, Vec<Doc>>,
}

/// A document store living entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

/// Pull the `term` clauses out of a query: either a bare term or a
/// `bool.must` list of terms.
fn term_clauses(query: &Value) -> Vec<(String, Value)> {
    let query = &query["query"];
    let mut terms = Vec::new();

    let mut collect = |clause: &Value| {
        if let Some(term) = clause.get("term").and_then(Value::as_object) {
            for (field, value) in term {
                terms.push((field.clone(), value.clone()));
            }
        }
    };

    if query.get("term").is_some() {
        collect(query);
    } else if let Some(must) = query["bool"]["must"].as_array() {
        for clause in must {
            collect(clause);
        }
    }
    terms
}

fn matches(doc: &Value, terms: &[(String, Value)]) -> bool {
    terms.iter().all(|(field, value)| &doc[field] == value)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `create_index` ran.
    pub fn index_created(&self) -> bool {
        self.inner.lock().created
    }

    /// How many times `delete_index` ran.
    pub fn index_deletions(&self) -> usize {
        self.inner.lock().deletions
    }

    /// Snapshot of all documents of a type.
    pub fn docs(&self, doc_type: &str) -> Vec<Value> {
        self.inner
            .lock()
            .docs
            .get(doc_type)
            .map(|docs| docs.iter().map(|d| d.source.clone()).collect())
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    fn create_index(&self, _mappings: &Value) -> ElasticResult<()> {
        self.inner.lock().created = true;
        Ok(())
    }

    fn index(&self, doc_type: &str, doc: &Value, id: Option<&str>) -> ElasticResult<()> {
        let mut inner = self.inner.lock();
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                inner.next_id += 1;
                format!("mem-{}", inner.next_id)
            }
        };
        let docs = inner.docs.entry(doc_type.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.source = doc.clone(),
            None => docs.push(Doc {
                id,
                source: doc.clone(),
            }),
        }
        Ok(())
    }

    fn bulk(&self, doc_type: &str, docs: &[Value]) -> ElasticResult<()> {
        for doc in docs {
            self.index(doc_type, doc, None)?;
        }
        Ok(())
    }

    fn search(&self, doc_type: &str, query: &Value) -> ElasticResult<Value> {
        let terms = term_clauses(query);
        let inner = self.inner.lock();
        let hits: Vec<Value> = inner
            .docs
            .get(doc_type)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches(&d.source, &terms))
                    .map(|d| json!({"_id": d.id, "_source": d.source}))
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({"hits": {"total": hits.len(), "hits": hits}}))
    }

    fn delete_by_query(&self, doc_type: &str, query: &Value) -> ElasticResult<()> {
        let terms = term_clauses(query);
        let mut inner = self.inner.lock();
        if let Some(docs) = inner.docs.get_mut(doc_type) {
            docs.retain(|d| !matches(&d.source, &terms));
        }
        Ok(())
    }

    fn count(&self, doc_type: &str) -> ElasticResult<u64> {
        Ok(self
            .inner
            .lock()
            .docs
            .get(doc_type)
            .map_or(0, |docs| docs.len() as u64))
    }

    fn delete_index(&self) -> ElasticResult<()> {
        let mut inner = self.inner.lock();
        inner.docs.clear();
        inner.deletions += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_count() {
        let store = MemoryStore::new();
        store.index("accounts", &json!({"name": "alice"}), None).unwrap();
        store.index("accounts", &json!({"name": "bob"}), None).unwrap();
        assert_eq!(store.count("accounts").unwrap(), 2);
        assert_eq!(store.count("blocks").unwrap(), 0);
    }

    #[test]
    fn upsert_by_id() {
        let store = MemoryStore::new();
        store
            .index("accounts", &json!({"name": "alice", "v": 1}), Some("a1"))
            .unwrap();
        store
            .index("accounts", &json!({"name": "alice", "v": 2}), Some("a1"))
            .unwrap();
        assert_eq!(store.count("accounts").unwrap(), 1);
        assert_eq!(store.docs("accounts")[0]["v"], 2);
    }

    #[test]
    fn term_search() {
        let store = MemoryStore::new();
        store.index("accounts", &json!({"name": "alice"}), None).unwrap();
        store.index("accounts", &json!({"name": "bob"}), None).unwrap();

        let hits = store
            .search("accounts", &json!({"query": {"term": {"name": "alice"}}}))
            .unwrap();
        assert_eq!(hits["hits"]["total"], 1);
        assert_eq!(hits["hits"]["hits"][0]["_source"]["name"], "alice");
    }

    #[test]
    fn bool_must_delete_by_query() {
        let store = MemoryStore::new();
        store
            .bulk(
                "pub_keys",
                &[
                    json!({"account": "alice", "permission": "owner"}),
                    json!({"account": "alice", "permission": "active"}),
                    json!({"account": "bob", "permission": "owner"}),
                ],
            )
            .unwrap();

        let query = json!({"query": {"bool": {"must": [
            {"term": {"account": "alice"}},
            {"term": {"permission": "owner"}},
        ]}}});
        store.delete_by_query("pub_keys", &query).unwrap();

        assert_eq!(store.count("pub_keys").unwrap(), 2);
        assert!(store
            .docs("pub_keys")
            .iter()
            .all(|d| !(d["account"] == "alice" && d["permission"] == "owner")));
    }

    #[test]
    fn delete_index_clears() {
        let store = MemoryStore::new();
        store.index("blocks", &json!({"block_num": 1}), None).unwrap();
        store.delete_index().unwrap();
        assert_eq!(store.count("blocks").unwrap(), 0);
        assert_eq!(store.index_deletions(), 1);
    }
}
