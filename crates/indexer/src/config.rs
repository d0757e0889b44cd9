//! Indexer configuration: types, YAML loading, validation.

use serde::Deserialize;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error when loading config.
    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// YAML parsing error.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    /// Validation failed with one or more errors.
    #[error("config validation failed:\n{}", .0.join("\n"))]
    ValidationFailed(Vec<String>),
}

/// Configuration for the indexing pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    /// Search backend base URLs; the first one is used.
    #[serde(default = "IndexerConfig::default_nodes")]
    pub nodes: Vec<String>,

    /// Name of the single index hosting every document type.
    #[serde(default = "IndexerConfig::default_index_name")]
    pub index_name: String,

    /// Per-queue staging bound before producers are slowed down.
    #[serde(default = "IndexerConfig::default_max_queue_size")]
    pub max_queue_size: usize,

    /// Maximum number of cached per-account deserializers.
    #[serde(default = "IndexerConfig::default_abi_cache_size")]
    pub abi_cache_size: usize,

    /// Recursion bound when decoding payloads against an ABI.
    #[serde(default = "IndexerConfig::default_abi_serializer_max_depth")]
    pub abi_serializer_max_depth: usize,

    /// First block height to index traces and blocks from. 0 opens the
    /// gate immediately.
    #[serde(default)]
    pub start_block_num: u32,

    /// Drop and recreate the index on startup.
    #[serde(default = "IndexerConfig::default_delete_index_on_startup")]
    pub delete_index_on_startup: bool,

    /// Include filter entries, `account:action:actor` with empty positions
    /// as wildcards; a bare `*` (or an empty list) admits everything.
    #[serde(default)]
    pub filter_on: Vec<String>,

    /// Exclude filter entries, same format as `filter_on`.
    #[serde(default)]
    pub filter_out: Vec<String>,

    #[serde(default = "IndexerConfig::default_store")]
    pub store_blocks: bool,

    #[serde(default = "IndexerConfig::default_store")]
    pub store_block_states: bool,

    #[serde(default = "IndexerConfig::default_store")]
    pub store_transactions: bool,

    #[serde(default = "IndexerConfig::default_store")]
    pub store_transaction_traces: bool,

    #[serde(default = "IndexerConfig::default_store")]
    pub store_action_traces: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            nodes: Self::default_nodes(),
            index_name: Self::default_index_name(),
            max_queue_size: Self::default_max_queue_size(),
            abi_cache_size: Self::default_abi_cache_size(),
            abi_serializer_max_depth: Self::default_abi_serializer_max_depth(),
            start_block_num: 0,
            delete_index_on_startup: Self::default_delete_index_on_startup(),
            filter_on: Vec::new(),
            filter_out: Vec::new(),
            store_blocks: true,
            store_block_states: true,
            store_transactions: true,
            store_transaction_traces: true,
            store_action_traces: true,
        }
    }
}

impl IndexerConfig {
    fn default_nodes() -> Vec<String> {
        vec!["http://localhost:9200/".to_string()]
    }

    fn default_index_name() -> String {
        "eos".to_string()
    }

    const fn default_max_queue_size() -> usize {
        1024
    }

    const fn default_abi_cache_size() -> usize {
        2048
    }

    const fn default_abi_serializer_max_depth() -> usize {
        32
    }

    const fn default_delete_index_on_startup() -> bool {
        true
    }

    const fn default_store() -> bool {
        true
    }
}

/// Load and validate configuration from a YAML file.
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<IndexerConfig, ConfigError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path_str.clone(),
        source: e,
    })?;

    load_config_from_str(&content, &path_str)
}

/// Load and validate configuration from a YAML string.
pub fn load_config_from_str(
    content: &str,
    source_name: &str,
) -> Result<IndexerConfig, ConfigError> {
    let config: IndexerConfig = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
        path: source_name.to_string(),
        source: e,
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Validate every field, collecting all failures.
pub fn validate_config(config: &IndexerConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.nodes.is_empty() {
        errors.push("nodes must not be empty".to_string());
    }
    if config.index_name.is_empty() {
        errors.push("index_name must not be empty".to_string());
    }
    if config.max_queue_size == 0 {
        errors.push("max_queue_size must be greater than 0".to_string());
    }
    if config.abi_cache_size == 0 {
        errors.push("abi_cache_size must be greater than 0".to_string());
    }
    if config.abi_serializer_max_depth == 0 {
        errors.push("abi_serializer_max_depth must be greater than 0".to_string());
    }

    for entry in &config.filter_on {
        if entry != "*" {
            if let Err(e) = entry.parse::<crate::filter::FilterEntry>() {
                errors.push(format!("filter_on entry '{entry}': {e}"));
            }
        }
    }
    for entry in &config.filter_out {
        if entry == "*" {
            errors.push("filter_out does not accept '*'".to_string());
        } else if let Err(e) = entry.parse::<crate::filter::FilterEntry>() {
            errors.push(format!("filter_out entry '{entry}': {e}"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(errors))
    }
}
