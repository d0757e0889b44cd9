//! Consumer-side metrics.

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Counters and gauges recorded by the consumer worker.
#[derive(Default)]
pub struct IndexerMetrics {
    /// Documents written, across all document types.
    pub documents_indexed: Counter,
    /// Batches drained from the staging queues.
    pub batches_processed: Counter,
    /// Store failures routed through the fatal handler.
    pub fatal_errors: Counter,
    /// Highest accepted block height observed.
    pub block_height: Gauge,
    /// Events still staged at the last drain.
    pub queue_depth: Gauge,
}

impl IndexerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every metric under the `chainsearch` prefix.
    pub fn register(&self, registry: &mut Registry) {
        let sub = registry.sub_registry_with_prefix("chainsearch");
        sub.register(
            "documents_indexed",
            "Documents written to the search store",
            self.documents_indexed.clone(),
        );
        sub.register(
            "batches_processed",
            "Batches drained from the staging queues",
            self.batches_processed.clone(),
        );
        sub.register(
            "fatal_errors",
            "Store failures routed to the fatal handler",
            self.fatal_errors.clone(),
        );
        sub.register(
            "block_height",
            "Highest accepted block height observed",
            self.block_height.clone(),
        );
        sub.register(
            "queue_depth",
            "Events staged at the last drain",
            self.queue_depth.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn registers_and_encodes() {
        let metrics = IndexerMetrics::new();
        let mut registry = Registry::default();
        metrics.register(&mut registry);

        metrics.documents_indexed.inc_by(3);
        metrics.block_height.set(42);

        let mut out = String::new();
        encode(&mut out, &registry).unwrap();
        assert!(out.contains("chainsearch_documents_indexed_total 3"));
        assert!(out.contains("chainsearch_block_height 42"));
    }
}
