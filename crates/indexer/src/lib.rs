//! The chainsearch indexing pipeline.
//!
//! Bridges a host node's event signals into an Elasticsearch-compatible
//! document store. Ingress callbacks stage events into bounded queues; a
//! single consumer worker drains them, filters actions, resolves payloads
//! through the ABI registry, projects account authority changes, and writes
//! documents through the store client.
//!
//! The host builds an [`Indexer`], starts it against a
//! [`chainsearch_chain::ChainEmitter`], and shuts it down when quitting;
//! everything in between runs on the worker thread.

pub mod config;
pub mod filter;
pub mod mappings;
pub mod metrics;
pub mod plugin;
pub mod projector;
pub mod queues;
pub mod variant;
pub mod worker;

pub use config::{load_config, load_config_from_str, ConfigError, IndexerConfig};
pub use filter::{ActionFilter, FilterEntry, FilterParseError};
pub use metrics::IndexerMetrics;
pub use plugin::{Indexer, IndexerState, QuitHandle, StartError};
pub use queues::{Batch, StagingQueues};
pub use variant::VariantResolver;

/// Milliseconds since the Unix epoch, the timestamp unit of every document.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Document type names within the single backing index.
pub mod doc_types {
    pub const BLOCK_STATES: &str = "block_states";
    pub const BLOCKS: &str = "blocks";
    pub const TRANSACTIONS: &str = "transactions";
    pub const TRANSACTION_TRACES: &str = "transaction_traces";
    pub const ACTION_TRACES: &str = "action_traces";
    pub const ACCOUNTS: &str = "accounts";
    pub const PUB_KEYS: &str = "pub_keys";
    pub const ACCOUNT_CONTROLS: &str = "account_controls";
}
