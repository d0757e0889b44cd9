//! Lifecycle controller: wiring the pipeline to the host.
//!
//! Startup: prepare the index, seed the system account, spawn the consumer
//! thread, then subscribe the four ingress callbacks. Shutdown runs in
//! reverse: the subscription handles drop first so no late event can reach
//! the queues while the worker drains and exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use chainsearch_chain::{ChainEmitter, Checksum256, Subscription, SYSTEM_ACCOUNT};
use chainsearch_elastic::{DocumentStore, ElasticError};
use thiserror::Error;

use crate::config::{validate_config, ConfigError, IndexerConfig};
use crate::doc_types;
use crate::filter::ActionFilter;
use crate::mappings::index_mappings;
use crate::metrics::IndexerMetrics;
use crate::now_millis;
use crate::projector;
use crate::queues::StagingQueues;
use crate::worker::Worker;

/// Errors from bringing the pipeline up.
#[derive(Debug, Error)]
pub enum StartError {
    /// Index preparation or seeding failed.
    #[error("search store initialization failed: {0}")]
    Store(#[from] ElasticError),

    /// The consumer thread could not be spawned.
    #[error("failed to spawn consumer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Host-supplied hook the worker invokes on a fatal store failure to
/// request process-wide shutdown.
#[derive(Clone)]
pub struct QuitHandle(Arc<dyn Fn() + Send + Sync>);

impl QuitHandle {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        QuitHandle(Arc::new(f))
    }

    /// A handle that ignores quit requests; for tests and tooling.
    pub fn noop() -> Self {
        QuitHandle(Arc::new(|| {}))
    }

    pub(crate) fn request(&self) {
        (self.0)()
    }
}

impl std::fmt::Debug for QuitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("QuitHandle")
    }
}

/// Cross-thread pipeline state.
pub struct IndexerState {
    start_block_reached: AtomicBool,
    startup: AtomicBool,
}

impl IndexerState {
    /// `start_block_num` of 0 opens the gate from the beginning.
    pub fn new(start_block_num: u32) -> Self {
        IndexerState {
            start_block_reached: AtomicBool::new(start_block_num == 0),
            startup: AtomicBool::new(true),
        }
    }

    pub fn start_block_reached(&self) -> bool {
        self.start_block_reached.load(Ordering::Acquire)
    }

    pub(crate) fn open_gate(&self) {
        self.start_block_reached.store(true, Ordering::Release);
    }

    pub fn in_startup(&self) -> bool {
        self.startup.load(Ordering::Acquire)
    }

    fn leave_startup(&self) {
        self.startup.store(false, Ordering::Release);
    }
}

/// The indexing bridge: owns the staging queues, the consumer thread and
/// the ingress subscriptions.
pub struct Indexer {
    config: IndexerConfig,
    store: Arc<dyn DocumentStore>,
    queues: Arc<StagingQueues>,
    state: Arc<IndexerState>,
    metrics: Arc<IndexerMetrics>,
    filter: ActionFilter,
    chain_id: Checksum256,
    quit: QuitHandle,
    worker: Option<JoinHandle<()>>,
    subscriptions: Vec<Subscription>,
}

impl Indexer {
    /// Validate the configuration and assemble the pipeline, without
    /// touching the store yet.
    pub fn new(
        config: IndexerConfig,
        store: Arc<dyn DocumentStore>,
        chain_id: Checksum256,
        quit: QuitHandle,
    ) -> Result<Self, ConfigError> {
        validate_config(&config)?;
        let filter = ActionFilter::from_config(&config)
            .map_err(|e| ConfigError::ValidationFailed(vec![e.to_string()]))?;

        Ok(Indexer {
            queues: Arc::new(StagingQueues::new(config.max_queue_size)),
            state: Arc::new(IndexerState::new(config.start_block_num)),
            metrics: Arc::new(IndexerMetrics::new()),
            filter,
            config,
            store,
            chain_id,
            quit,
            worker: None,
            subscriptions: Vec::new(),
        })
    }

    /// Metrics handle for registry hookup by the host.
    pub fn metrics(&self) -> Arc<IndexerMetrics> {
        self.metrics.clone()
    }

    /// Pipeline state handle, observable by the host.
    pub fn state(&self) -> Arc<IndexerState> {
        self.state.clone()
    }

    /// Prepare the index, spawn the consumer and subscribe to the host.
    pub fn start(&mut self, emitter: &ChainEmitter) -> Result<(), StartError> {
        if self.worker.is_some() {
            log::warn!("indexer already started");
            return Ok(());
        }

        if self.config.delete_index_on_startup {
            log::info!("dropping index '{}'", self.config.index_name);
            self.store.delete_index()?;
        }
        log::info!("creating index '{}'", self.config.index_name);
        self.store.create_index(&index_mappings())?;

        if self.store.count(doc_types::ACCOUNTS)? == 0 {
            projector::create_account(&*self.store, SYSTEM_ACCOUNT, now_millis())?;
        }

        log::info!("starting indexer consumer thread");
        let worker = Worker::new(
            &self.config,
            self.store.clone(),
            self.queues.clone(),
            self.state.clone(),
            self.filter.clone(),
            self.metrics.clone(),
            self.quit.clone(),
            self.chain_id,
        );
        self.worker = Some(
            std::thread::Builder::new()
                .name("chainsearch-consumer".to_string())
                .spawn(move || worker.run())?,
        );

        let queues = self.queues.clone();
        self.subscriptions.push(emitter.on_accepted_transaction(move |meta| {
            queues.push_accepted_transaction(meta.clone());
        }));
        let queues = self.queues.clone();
        self.subscriptions.push(emitter.on_applied_transaction(move |trace| {
            queues.push_applied_transaction(trace.clone());
        }));
        let queues = self.queues.clone();
        self.subscriptions.push(emitter.on_accepted_block(move |state| {
            queues.push_accepted_block(state.clone());
        }));
        let queues = self.queues.clone();
        self.subscriptions.push(emitter.on_irreversible_block(move |state| {
            queues.push_irreversible_block(state.clone());
        }));

        self.state.leave_startup();
        Ok(())
    }

    /// Unsubscribe, signal the worker and wait for it to drain and exit.
    pub fn shutdown(&mut self) {
        if self.worker.is_none() && self.subscriptions.is_empty() {
            return;
        }
        log::info!("indexer shutdown in progress; draining staged events may take a while");

        // release the ingress first so no late event lands mid-drain
        self.subscriptions.clear();
        self.queues.set_done();

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("consumer thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
