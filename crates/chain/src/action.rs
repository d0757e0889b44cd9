//! Actions and action traces.

use serde::{Deserialize, Serialize};

use crate::authority::PermissionLevel;
use crate::name::{AccountName, ActionName};

/// Outcome status carried on transaction receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Executed,
    SoftFail,
    HardFail,
    Delayed,
    Expired,
}

/// A single action: a call into `account`'s contract with a packed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub account: AccountName,
    pub name: ActionName,
    pub authorization: Vec<PermissionLevel>,
    /// Packed payload; rendered as hex until an ABI resolves it.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// Receipt attached to one executed action trace node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReceipt {
    pub receiver: AccountName,
    pub status: TransactionStatus,
}

/// Record of executing one action, with inline children forming a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTrace {
    pub act: Action,
    pub receipt: ActionReceipt,
    pub inline_traces: Vec<ActionTrace>,
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_data_serializes_as_hex() {
        let act = Action {
            account: "token".parse().unwrap(),
            name: "transfer".parse().unwrap(),
            authorization: vec![],
            data: vec![0xde, 0xad],
        };
        let json = serde_json::to_value(&act).unwrap();
        assert_eq!(json["data"], "dead");

        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, act);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_value(TransactionStatus::SoftFail).unwrap();
        assert_eq!(json, "soft_fail");
    }
}
