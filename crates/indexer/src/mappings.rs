//! Index mappings supplied at `create_index` time.

use serde_json::{json, Value};

/// Mappings for the single index hosting every document type.
///
/// Name-like and id-like fields are exact-match keywords; timestamps are
/// epoch-millisecond dates. Payload-bearing subtrees (`block`, decoded
/// action data, stored ABIs) stay dynamic since their shape follows
/// per-account schemas.
pub fn index_mappings() -> Value {
    json!({
        "mappings": {
            "block_states": {
                "properties": {
                    "block_num": {"type": "long"},
                    "block_id": {"type": "keyword"},
                    "validated": {"type": "boolean"},
                    "in_current_chain": {"type": "boolean"},
                    "block_header_state": {"type": "object", "dynamic": true},
                    "createAt": {"type": "date", "format": "epoch_millis"},
                }
            },
            "blocks": {
                "properties": {
                    "block_num": {"type": "long"},
                    "block_id": {"type": "keyword"},
                    "irreversible": {"type": "boolean"},
                    "block": {"type": "object", "dynamic": true},
                    "createAt": {"type": "date", "format": "epoch_millis"},
                }
            },
            "transactions": {
                "properties": {
                    "trx_id": {"type": "keyword"},
                    "signing_keys": {"type": "keyword"},
                    "accepted": {"type": "boolean"},
                    "implicit": {"type": "boolean"},
                    "scheduled": {"type": "boolean"},
                    "createdAt": {"type": "date", "format": "epoch_millis"},
                }
            },
            "transaction_traces": {
                "properties": {
                    "id": {"type": "keyword"},
                    "createAt": {"type": "date", "format": "epoch_millis"},
                }
            },
            "action_traces": {
                "properties": {
                    "createdAt": {"type": "date", "format": "epoch_millis"},
                }
            },
            "accounts": {
                "properties": {
                    "name": {"type": "keyword"},
                    "abi": {"type": "object", "dynamic": true},
                    "createAt": {"type": "date", "format": "epoch_millis"},
                    "updateAt": {"type": "date", "format": "epoch_millis"},
                }
            },
            "pub_keys": {
                "properties": {
                    "account": {"type": "keyword"},
                    "public_key": {"type": "keyword"},
                    "permission": {"type": "keyword"},
                    "createAt": {"type": "date", "format": "epoch_millis"},
                }
            },
            "account_controls": {
                "properties": {
                    "controlled_account": {"type": "keyword"},
                    "controlled_permission": {"type": "keyword"},
                    "controlling_account": {"type": "keyword"},
                    "createAt": {"type": "date", "format": "epoch_millis"},
                }
            },
        }
    })
}
