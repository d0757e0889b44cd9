//! Bounded staging queues between the host's signal threads and the
//! consumer worker.
//!
//! One mutex guards the four FIFOs and the shared adaptive-sleep counter;
//! one condition variable wakes the consumer. A producer that finds its
//! queue over the bound still appends its event, but first sleeps for the
//! accumulated adaptive time, slowing the host without dropping anything.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chainsearch_chain::{BlockState, TransactionMeta, TransactionTrace};
use parking_lot::{Condvar, Mutex};

/// Adaptive sleep step per overflow observation.
const SLEEP_STEP_MS: u64 = 10;
/// Accumulated sleep above this is worth a warning.
const SLEEP_WARN_MS: u64 = 1000;

#[derive(Default)]
struct Inner {
    transaction_metas: VecDeque<Arc<TransactionMeta>>,
    transaction_traces: VecDeque<Arc<TransactionTrace>>,
    block_states: VecDeque<Arc<BlockState>>,
    irreversible_blocks: VecDeque<Arc<BlockState>>,
    sleep_ms: u64,
}

impl Inner {
    fn all_empty(&self) -> bool {
        self.transaction_metas.is_empty()
            && self.transaction_traces.is_empty()
            && self.block_states.is_empty()
            && self.irreversible_blocks.is_empty()
    }

    fn depth(&self) -> usize {
        self.transaction_metas.len()
            + self.transaction_traces.len()
            + self.block_states.len()
            + self.irreversible_blocks.len()
    }
}

/// Everything drained from the queues in one sweep.
#[derive(Default)]
pub struct Batch {
    pub transaction_traces: VecDeque<Arc<TransactionTrace>>,
    pub transaction_metas: VecDeque<Arc<TransactionMeta>>,
    pub block_states: VecDeque<Arc<BlockState>>,
    pub irreversible_blocks: VecDeque<Arc<BlockState>>,
}

impl Batch {
    pub fn total(&self) -> usize {
        self.transaction_traces.len()
            + self.transaction_metas.len()
            + self.block_states.len()
            + self.irreversible_blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// The four staging queues and their shared coordination state.
pub struct StagingQueues {
    inner: Mutex<Inner>,
    cond: Condvar,
    done: AtomicBool,
    max_queue_size: usize,
}

impl StagingQueues {
    pub fn new(max_queue_size: usize) -> Self {
        StagingQueues {
            inner: Mutex::new(Inner::default()),
            cond: Condvar::new(),
            done: AtomicBool::new(false),
            max_queue_size,
        }
    }

    fn enqueue<T, F>(&self, select: F, item: T)
    where
        F: Fn(&mut Inner) -> &mut VecDeque<T>,
    {
        let mut inner = self.inner.lock();
        let queue_size = select(&mut inner).len();
        if queue_size > self.max_queue_size {
            inner.sleep_ms += SLEEP_STEP_MS;
            let sleep_ms = inner.sleep_ms;
            drop(inner);
            self.cond.notify_one();
            if sleep_ms > SLEEP_WARN_MS {
                log::warn!("staging queue backlog: size {queue_size}, sleeping {sleep_ms}ms");
            }
            std::thread::sleep(Duration::from_millis(sleep_ms));
            inner = self.inner.lock();
        } else {
            inner.sleep_ms = inner.sleep_ms.saturating_sub(SLEEP_STEP_MS);
        }
        select(&mut inner).push_back(item);
        drop(inner);
        self.cond.notify_one();
    }

    pub fn push_accepted_transaction(&self, meta: Arc<TransactionMeta>) {
        self.enqueue(|i| &mut i.transaction_metas, meta);
    }

    pub fn push_applied_transaction(&self, trace: Arc<TransactionTrace>) {
        self.enqueue(|i| &mut i.transaction_traces, trace);
    }

    pub fn push_accepted_block(&self, state: Arc<BlockState>) {
        self.enqueue(|i| &mut i.block_states, state);
    }

    pub fn push_irreversible_block(&self, state: Arc<BlockState>) {
        self.enqueue(|i| &mut i.irreversible_blocks, state);
    }

    /// Block until at least one queue is non-empty or `done`, then move
    /// everything out in one O(1) sweep per queue.
    pub fn wait_drain(&self) -> Batch {
        let mut inner = self.inner.lock();
        while inner.all_empty() && !self.done.load(Ordering::Acquire) {
            self.cond.wait(&mut inner);
        }
        Batch {
            transaction_traces: std::mem::take(&mut inner.transaction_traces),
            transaction_metas: std::mem::take(&mut inner.transaction_metas),
            block_states: std::mem::take(&mut inner.block_states),
            irreversible_blocks: std::mem::take(&mut inner.irreversible_blocks),
        }
    }

    /// Signal shutdown; wakes the consumer so it can drain and exit.
    pub fn set_done(&self) {
        self.done.store(true, Ordering::Release);
        self.cond.notify_all();
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Total staged events across all queues.
    pub fn depth(&self) -> usize {
        self.inner.lock().depth()
    }

    /// Current adaptive producer sleep.
    pub fn current_sleep_ms(&self) -> u64 {
        self.inner.lock().sleep_ms
    }
}
