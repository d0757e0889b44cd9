//! Signal hub between the host node and its plugins.
//!
//! The host publishes four event kinds; consumers register callbacks and
//! receive each event as a shared `Arc`. Subscriptions are scoped: dropping
//! the returned handle unsubscribes, so a consumer that tears down its
//! handles before joining its worker cannot observe late events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::block::BlockState;
use crate::transaction::{TransactionMeta, TransactionTrace};

/// The four signal kinds the host emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    AcceptedTransaction,
    AppliedTransaction,
    AcceptedBlock,
    IrreversibleBlock,
}

type Callback<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

#[derive(Default)]
struct Slots {
    accepted_transaction: Vec<(u64, Callback<TransactionMeta>)>,
    applied_transaction: Vec<(u64, Callback<TransactionTrace>)>,
    accepted_block: Vec<(u64, Callback<BlockState>)>,
    irreversible_block: Vec<(u64, Callback<BlockState>)>,
}

struct Inner {
    slots: Mutex<Slots>,
    next_id: AtomicU64,
}

/// Event emitter the host drives and plugins subscribe to.
#[derive(Clone)]
pub struct ChainEmitter {
    inner: Arc<Inner>,
}

impl Default for ChainEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped subscription handle; dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    inner: Weak<Inner>,
    kind: SignalKind,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut slots = inner.slots.lock();
            match self.kind {
                SignalKind::AcceptedTransaction => {
                    slots.accepted_transaction.retain(|(id, _)| *id != self.id)
                }
                SignalKind::AppliedTransaction => {
                    slots.applied_transaction.retain(|(id, _)| *id != self.id)
                }
                SignalKind::AcceptedBlock => {
                    slots.accepted_block.retain(|(id, _)| *id != self.id)
                }
                SignalKind::IrreversibleBlock => {
                    slots.irreversible_block.retain(|(id, _)| *id != self.id)
                }
            }
        }
    }
}

impl ChainEmitter {
    pub fn new() -> Self {
        ChainEmitter {
            inner: Arc::new(Inner {
                slots: Mutex::new(Slots::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn subscription(&self, kind: SignalKind, id: u64) -> Subscription {
        Subscription {
            inner: Arc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn on_accepted_transaction(
        &self,
        f: impl Fn(&Arc<TransactionMeta>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.inner
            .slots
            .lock()
            .accepted_transaction
            .push((id, Arc::new(f)));
        self.subscription(SignalKind::AcceptedTransaction, id)
    }

    pub fn on_applied_transaction(
        &self,
        f: impl Fn(&Arc<TransactionTrace>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.inner
            .slots
            .lock()
            .applied_transaction
            .push((id, Arc::new(f)));
        self.subscription(SignalKind::AppliedTransaction, id)
    }

    pub fn on_accepted_block(
        &self,
        f: impl Fn(&Arc<BlockState>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.inner
            .slots
            .lock()
            .accepted_block
            .push((id, Arc::new(f)));
        self.subscription(SignalKind::AcceptedBlock, id)
    }

    pub fn on_irreversible_block(
        &self,
        f: impl Fn(&Arc<BlockState>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.inner
            .slots
            .lock()
            .irreversible_block
            .push((id, Arc::new(f)));
        self.subscription(SignalKind::IrreversibleBlock, id)
    }

    pub fn emit_accepted_transaction(&self, meta: Arc<TransactionMeta>) {
        let callbacks: Vec<_> = {
            let slots = self.inner.slots.lock();
            slots
                .accepted_transaction
                .iter()
                .map(|(_, f)| f.clone())
                .collect()
        };
        for f in callbacks {
            f(&meta);
        }
    }

    pub fn emit_applied_transaction(&self, trace: Arc<TransactionTrace>) {
        let callbacks: Vec<_> = {
            let slots = self.inner.slots.lock();
            slots
                .applied_transaction
                .iter()
                .map(|(_, f)| f.clone())
                .collect()
        };
        for f in callbacks {
            f(&trace);
        }
    }

    pub fn emit_accepted_block(&self, state: Arc<BlockState>) {
        let callbacks: Vec<_> = {
            let slots = self.inner.slots.lock();
            slots.accepted_block.iter().map(|(_, f)| f.clone()).collect()
        };
        for f in callbacks {
            f(&state);
        }
    }

    pub fn emit_irreversible_block(&self, state: Arc<BlockState>) {
        let callbacks: Vec<_> = {
            let slots = self.inner.slots.lock();
            slots
                .irreversible_block
                .iter()
                .map(|(_, f)| f.clone())
                .collect()
        };
        for f in callbacks {
            f(&state);
        }
    }
}
