//! Document store client for the chainsearch indexing bridge.
//!
//! The `DocumentStore` trait defines the operations the indexer needs from
//! a search backend. `ElasticClient` implements it against an
//! Elasticsearch-compatible HTTP API; `MemoryStore` implements it in memory
//! for tests.
//!
//! All operations target a single index; documents are partitioned by a
//! type name (`accounts`, `blocks`, ...). The client performs no retries:
//! callers decide whether a failure is fatal.

pub mod bulk;
pub mod client;
pub mod error;
pub mod memory;

pub use client::{DocumentStore, ElasticClient};
pub use error::{ElasticError, ElasticResult};
pub use memory::MemoryStore;
