//! ABI-aware document rendering.
//!
//! Entities serialize through serde with packed action payloads as hex;
//! the resolver then rewrites each action's `data` into a structured value
//! when the account's ABI is known, preserving the original bytes under
//! `hex_data`. Missing or failing ABIs leave the hex untouched, so a
//! partially resolvable entity still yields a useful document.

use chainsearch_abi::AbiCache;
use chainsearch_chain::{Action, ActionTrace, SignedBlock, SignedTransaction, TransactionTrace};
use chainsearch_elastic::DocumentStore;
use serde_json::{json, Value};

fn base_value<T: serde::Serialize>(entity: &T) -> Value {
    serde_json::to_value(entity).unwrap_or(Value::Null)
}

/// Rewrites action payloads through the ABI registry.
pub struct VariantResolver<'a> {
    cache: &'a mut AbiCache,
    store: &'a dyn DocumentStore,
}

impl<'a> VariantResolver<'a> {
    pub fn new(cache: &'a mut AbiCache, store: &'a dyn DocumentStore) -> Self {
        VariantResolver { cache, store }
    }

    /// Render one action, decoding `data` when the contract's ABI resolves
    /// the action type.
    pub fn action_value(&mut self, act: &Action) -> Value {
        let mut value = base_value(act);

        let Some(serializer) = self.cache.resolve(act.account, self.store) else {
            return value;
        };
        let Some(type_name) = serializer.action_type(act.name) else {
            return value;
        };
        match serializer.deserialize(type_name, &act.data) {
            Ok(decoded) => {
                value["hex_data"] = json!(hex::encode(&act.data));
                value["data"] = decoded;
            }
            Err(e) => {
                log::debug!(
                    "payload of {}::{} does not decode, keeping raw bytes: {e}",
                    act.account,
                    act.name
                );
            }
        }
        value
    }

    /// Render one action-trace node without its inline children; the
    /// per-node `action_traces` documents carry the tree structure only
    /// through ordering.
    pub fn action_trace_node_value(&mut self, trace: &ActionTrace) -> Value {
        let mut value = base_value(trace);
        if let Some(map) = value.as_object_mut() {
            map.remove("inline_traces");
        }
        value["act"] = self.action_value(&trace.act);
        value
    }

    /// Render a full action-trace tree.
    fn action_trace_tree_value(&mut self, trace: &ActionTrace) -> Value {
        let mut value = base_value(trace);
        value["act"] = self.action_value(&trace.act);
        value["inline_traces"] = Value::Array(
            trace
                .inline_traces
                .iter()
                .map(|child| self.action_trace_tree_value(child))
                .collect(),
        );
        value
    }

    /// Render a whole transaction trace, inline children included.
    pub fn transaction_trace_value(&mut self, trace: &TransactionTrace) -> Value {
        let mut value = base_value(trace);
        value["action_traces"] = Value::Array(
            trace
                .action_traces
                .iter()
                .map(|t| self.action_trace_tree_value(t))
                .collect(),
        );
        value
    }

    /// Render a signed transaction with decoded action payloads.
    pub fn transaction_value(&mut self, trx: &SignedTransaction) -> Value {
        let mut value = base_value(trx);
        value["actions"] = Value::Array(
            trx.actions.iter().map(|act| self.action_value(act)).collect(),
        );
        value
    }

    /// Render a block body with every carried transaction resolved.
    pub fn block_value(&mut self, block: &SignedBlock) -> Value {
        let mut value = base_value(block);
        if let Some(transactions) = value["transactions"].as_array_mut() {
            for (slot, carried) in transactions.iter_mut().zip(&block.transactions) {
                slot["trx"] = self.transaction_value(&carried.trx);
            }
        }
        value
    }
}
