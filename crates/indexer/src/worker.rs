//! The consumer worker: drains the staging queues and writes documents.
//!
//! One plain thread. Each sweep processes applied transaction traces, then
//! accepted transaction metadata, then accepted blocks, then irreversible
//! blocks, each FIFO. Store failures route through a single fatal handler
//! that requests host-wide shutdown; there are no retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chainsearch_abi::AbiCache;
use chainsearch_chain::{
    ActionTrace, BlockState, Checksum256, TransactionMeta, TransactionTrace, SYSTEM_ACCOUNT,
};
use chainsearch_elastic::{DocumentStore, ElasticError, ElasticResult};
use serde_json::{json, Value};

use crate::config::IndexerConfig;
use crate::doc_types;
use crate::filter::ActionFilter;
use crate::metrics::IndexerMetrics;
use crate::now_millis;
use crate::plugin::{IndexerState, QuitHandle};
use crate::projector;
use crate::queues::StagingQueues;
use crate::variant::VariantResolver;

/// Batches slower than this get a summary log line.
const SLOW_BATCH: Duration = Duration::from_millis(500);

pub(crate) struct Worker {
    store: Arc<dyn DocumentStore>,
    queues: Arc<StagingQueues>,
    state: Arc<IndexerState>,
    filter: ActionFilter,
    cache: AbiCache,
    metrics: Arc<IndexerMetrics>,
    quit: QuitHandle,
    chain_id: Checksum256,
    start_block_num: u32,
    store_blocks: bool,
    store_block_states: bool,
    store_transactions: bool,
    store_transaction_traces: bool,
    store_action_traces: bool,
}

impl Worker {
    pub(crate) fn new(
        config: &IndexerConfig,
        store: Arc<dyn DocumentStore>,
        queues: Arc<StagingQueues>,
        state: Arc<IndexerState>,
        filter: ActionFilter,
        metrics: Arc<IndexerMetrics>,
        quit: QuitHandle,
        chain_id: Checksum256,
    ) -> Self {
        Worker {
            store,
            queues,
            state,
            filter,
            cache: AbiCache::new(config.abi_cache_size, config.abi_serializer_max_depth),
            metrics,
            quit,
            chain_id,
            start_block_num: config.start_block_num,
            store_blocks: config.store_blocks,
            store_block_states: config.store_block_states,
            store_transactions: config.store_transactions,
            store_transaction_traces: config.store_transaction_traces,
            store_action_traces: config.store_action_traces,
        }
    }

    pub(crate) fn run(mut self) {
        loop {
            let batch = self.queues.wait_drain();
            let done = self.queues.is_done();
            let total = batch.total();

            if total > 0 {
                self.metrics.batches_processed.inc();
            }
            self.metrics.queue_depth.set(total as i64);
            if done {
                log::info!("draining staging queues, {total} event(s) pending");
            }

            self.process_batch(
                "process_applied_transaction",
                &batch.transaction_traces,
                Self::process_applied_transaction,
            );
            self.process_batch(
                "process_accepted_transaction",
                &batch.transaction_metas,
                Self::process_accepted_transaction,
            );
            self.process_batch(
                "process_accepted_block",
                &batch.block_states,
                Self::process_accepted_block,
            );
            self.process_batch(
                "process_irreversible_block",
                &batch.irreversible_blocks,
                Self::process_irreversible_block,
            );

            if done && total == 0 {
                break;
            }
        }
        log::info!("consumer thread shut down gracefully");
    }

    fn process_batch<T>(
        &mut self,
        operation: &'static str,
        items: &std::collections::VecDeque<Arc<T>>,
        mut process: impl FnMut(&mut Self, &T) -> ElasticResult<()>,
    ) {
        let start = Instant::now();
        for item in items {
            if let Err(e) = process(self, item.as_ref()) {
                self.fatal(operation, &e);
            }
        }
        let elapsed = start.elapsed();
        if elapsed > SLOW_BATCH {
            let size = items.len();
            let per = elapsed / size.max(1) as u32;
            log::info!("{operation}, time per: {per:?}, size: {size}, time: {elapsed:?}");
        }
    }

    fn gate_open(&self) -> bool {
        self.state.start_block_reached()
    }

    /// All store failures funnel through here: log the operation and ask
    /// the host to quit so the backend can be fixed and the node restarted.
    fn fatal(&self, operation: &'static str, error: &ElasticError) {
        log::error!("search store failure during {operation}: {error}; requesting shutdown");
        self.metrics.fatal_errors.inc();
        self.quit.request();
    }

    /// Walk one action-trace node: project system actions, and stage a
    /// document when the gate is open, traces are stored and the filter
    /// admits the action. Children are visited depth-first after the node.
    fn add_action_trace(
        &mut self,
        bulk: &mut Vec<Value>,
        atrace: &ActionTrace,
        executed: bool,
        now: u64,
    ) -> ElasticResult<bool> {
        if executed && atrace.receipt.receiver == SYSTEM_ACCOUNT {
            projector::update_account(&*self.store, &mut self.cache, &atrace.act, now)?;
        }

        let mut added = false;
        if self.gate_open() && self.store_action_traces && self.filter.include(&atrace.act) {
            let mut doc = VariantResolver::new(&mut self.cache, &*self.store)
                .action_trace_node_value(atrace);
            doc["createdAt"] = json!(now);
            bulk.push(doc);
            added = true;
        }

        for inline in &atrace.inline_traces {
            added |= self.add_action_trace(bulk, inline, executed, now)?;
        }
        Ok(added)
    }

    fn process_applied_transaction(&mut self, trace: &TransactionTrace) -> ElasticResult<()> {
        let now = now_millis();
        let executed = trace.executed();
        let mut bulk: Vec<Value> = Vec::new();

        let mut wrote_traces = false;
        for atrace in &trace.action_traces {
            wrote_traces |= self.add_action_trace(&mut bulk, atrace, executed, now)?;
        }

        if wrote_traces {
            let count = bulk.len() as u64;
            self.store.bulk(doc_types::ACTION_TRACES, &bulk)?;
            self.metrics.documents_indexed.inc_by(count);
        }

        if !self.gate_open() || !self.store_transaction_traces {
            return Ok(());
        }
        // no transaction trace doc when every action trace was filtered out
        if !wrote_traces {
            return Ok(());
        }

        let mut doc =
            VariantResolver::new(&mut self.cache, &*self.store).transaction_trace_value(trace);
        doc["createAt"] = json!(now);
        self.store.index(doc_types::TRANSACTION_TRACES, &doc, None)?;
        self.metrics.documents_indexed.inc();
        Ok(())
    }

    /// Runs for every accepted transaction regardless of the gate so that
    /// account-related activity is captured from the first block.
    fn process_accepted_transaction(&mut self, meta: &TransactionMeta) -> ElasticResult<()> {
        if !self.store_transactions {
            return Ok(());
        }
        let now = now_millis();

        let mut doc =
            VariantResolver::new(&mut self.cache, &*self.store).transaction_value(&meta.trx);
        doc["trx_id"] = json!(meta.id.to_string());

        match meta.resolved_signing_keys(&self.chain_id) {
            Ok(keys) if !keys.is_empty() => {
                let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
                doc["signing_keys"] = json!(keys);
            }
            Ok(_) => {}
            Err(e) => log::debug!("signing keys for {} not recoverable: {e}", meta.id),
        }

        doc["accepted"] = json!(meta.accepted);
        doc["implicit"] = json!(meta.implicit);
        doc["scheduled"] = json!(meta.scheduled);
        doc["createdAt"] = json!(now);

        self.store.index(doc_types::TRANSACTIONS, &doc, None)?;
        self.metrics.documents_indexed.inc();
        Ok(())
    }

    fn process_accepted_block(&mut self, bs: &BlockState) -> ElasticResult<()> {
        if !self.gate_open() {
            if bs.block_num >= self.start_block_num {
                log::info!("start block {} reached at block {}", self.start_block_num, bs.block_num);
                self.state.open_gate();
            } else {
                return Ok(());
            }
        }

        self.metrics.block_height.set(i64::from(bs.block_num));
        if bs.block_num % 1000 == 0 {
            log::info!("block_num: {}", bs.block_num);
        }

        let now = now_millis();

        if self.store_block_states {
            let doc = json!({
                "block_num": bs.block_num,
                "block_id": bs.id.to_string(),
                "validated": bs.validated,
                "in_current_chain": bs.in_current_chain,
                "block_header_state": {
                    "block_num": bs.block_num,
                    "id": bs.id.to_string(),
                    "previous": bs.previous_id().to_string(),
                    "timestamp_ms": bs.block.timestamp_ms,
                    "producer": bs.block.producer.to_string(),
                },
                "createAt": now,
            });
            self.store.index(doc_types::BLOCK_STATES, &doc, None)?;
            self.metrics.documents_indexed.inc();
        }

        if !self.store_blocks {
            return Ok(());
        }

        let block_value =
            VariantResolver::new(&mut self.cache, &*self.store).block_value(&bs.block);
        let doc = json!({
            "block_num": bs.block_num,
            "block_id": bs.id.to_string(),
            "irreversible": false,
            "block": block_value,
            "createAt": now,
        });
        self.store.index(doc_types::BLOCKS, &doc, None)?;
        self.metrics.documents_indexed.inc();
        Ok(())
    }

    fn process_irreversible_block(&mut self, bs: &BlockState) -> ElasticResult<()> {
        if !self.gate_open() {
            return Ok(());
        }
        // reserved: the blocks document carries an `irreversible` field but
        // flipping it here is not projected yet
        log::debug!("irreversible block {} observed", bs.block_num);
        Ok(())
    }
}
