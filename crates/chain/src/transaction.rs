//! Signed transactions, acceptance metadata and applied traces.

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionTrace, TransactionStatus};
use crate::crypto::{sha256, Checksum256, PublicKey, Signature};
use crate::error::CryptoError;
use crate::pack::ByteWriter;

/// A transaction together with the signatures authorizing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Expiration, milliseconds since Unix epoch.
    pub expiration_ms: u64,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<Signature>,
}

impl SignedTransaction {
    /// Canonical packed form of the transaction body (without signatures);
    /// the payload the signatures commit to.
    pub fn packed(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_u64(self.expiration_ms);
        w.write_u16(self.ref_block_num);
        w.write_u32(self.ref_block_prefix);
        w.write_varuint32(self.actions.len() as u32);
        for act in &self.actions {
            w.write_name(act.account);
            w.write_name(act.name);
            w.write_varuint32(act.authorization.len() as u32);
            for auth in &act.authorization {
                w.write_name(auth.actor);
                w.write_name(auth.permission);
            }
            w.write_bytes(&act.data);
        }
        w.into_bytes()
    }

    /// The digest each signature signs: chain id, packed body, and a zeroed
    /// context-free-data hash.
    pub fn signing_digest(&self, chain_id: &Checksum256) -> Checksum256 {
        let mut payload = Vec::new();
        payload.extend_from_slice(chain_id.as_bytes());
        payload.extend_from_slice(&self.packed());
        payload.extend_from_slice(&[0u8; 32]);
        sha256(&payload)
    }

    /// Recover the public keys behind every signature.
    pub fn signature_keys(&self, chain_id: &Checksum256) -> Result<Vec<PublicKey>, CryptoError> {
        let digest = self.signing_digest(chain_id);
        self.signatures
            .iter()
            .map(|sig| sig.recover(&digest))
            .collect()
    }
}

/// Metadata the host attaches to an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    pub id: Checksum256,
    pub trx: SignedTransaction,
    /// Keys the host already recovered, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_keys: Option<Vec<PublicKey>>,
    pub accepted: bool,
    pub implicit: bool,
    pub scheduled: bool,
}

impl TransactionMeta {
    /// The transaction's signing keys: precomputed when present, recovered
    /// from the signatures and the chain id otherwise.
    pub fn resolved_signing_keys(
        &self,
        chain_id: &Checksum256,
    ) -> Result<Vec<PublicKey>, CryptoError> {
        match &self.signing_keys {
            Some(keys) => Ok(keys.clone()),
            None => self.trx.signature_keys(chain_id),
        }
    }
}

/// Receipt of a whole transaction within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub status: TransactionStatus,
    pub cpu_usage_us: u32,
    pub net_usage_words: u32,
}

/// Trace of an applied transaction: its receipt (when known) and the root
/// action traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub id: Checksum256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<TransactionReceipt>,
    pub action_traces: Vec<ActionTrace>,
}

impl TransactionTrace {
    /// True when the transaction executed successfully.
    pub fn executed(&self) -> bool {
        self.receipt
            .as_ref()
            .is_some_and(|r| r.status == TransactionStatus::Executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Secp256k1, SecretKey};

    fn sample_transaction() -> SignedTransaction {
        SignedTransaction {
            expiration_ms: 1_500_000_000_000,
            ref_block_num: 7,
            ref_block_prefix: 0xdead_beef,
            actions: vec![Action {
                account: "token".parse().unwrap(),
                name: "transfer".parse().unwrap(),
                authorization: vec![crate::authority::PermissionLevel {
                    actor: "alice".parse().unwrap(),
                    permission: "active".parse().unwrap(),
                }],
                data: vec![1, 2, 3],
            }],
            signatures: vec![],
        }
    }

    fn sign_transaction(trx: &mut SignedTransaction, chain_id: &Checksum256, secret: &SecretKey) {
        let secp = Secp256k1::new();
        let digest = trx.signing_digest(chain_id);
        let msg = secp256k1::Message::from_digest_slice(digest.as_bytes()).unwrap();
        let (recid, compact) = secp
            .sign_ecdsa_recoverable(&msg, secret)
            .serialize_compact();
        let mut raw = [0u8; 65];
        raw[0] = recid.to_i32() as u8;
        raw[1..].copy_from_slice(&compact);
        trx.signatures.push(Signature::from_bytes(raw));
    }

    #[test]
    fn packed_is_deterministic() {
        let trx = sample_transaction();
        assert_eq!(trx.packed(), trx.packed());
        assert!(!trx.packed().is_empty());
    }

    #[test]
    fn digest_depends_on_chain_id() {
        let trx = sample_transaction();
        let a = trx.signing_digest(&sha256(b"chain-a"));
        let b = trx.signing_digest(&sha256(b"chain-b"));
        assert_ne!(a, b);
    }

    #[test]
    fn recovers_keys_from_signatures() {
        let secp = Secp256k1::new();
        let chain_id = sha256(b"test-chain");
        let secret = SecretKey::from_slice(&[0x17u8; 32]).unwrap();
        let mut trx = sample_transaction();
        sign_transaction(&mut trx, &chain_id, &secret);

        let keys = trx.signature_keys(&chain_id).unwrap();
        assert_eq!(
            keys,
            vec![PublicKey::from_bytes(secret.public_key(&secp).serialize())]
        );
    }

    #[test]
    fn meta_prefers_precomputed_keys() {
        let chain_id = sha256(b"test-chain");
        let precomputed = vec![PublicKey::from_bytes([9u8; 33])];
        let meta = TransactionMeta {
            id: sha256(b"id"),
            trx: sample_transaction(),
            signing_keys: Some(precomputed.clone()),
            accepted: true,
            implicit: false,
            scheduled: false,
        };
        assert_eq!(meta.resolved_signing_keys(&chain_id).unwrap(), precomputed);
    }

    #[test]
    fn executed_requires_receipt() {
        let mut trace = TransactionTrace {
            id: sha256(b"t"),
            receipt: None,
            action_traces: vec![],
        };
        assert!(!trace.executed());

        trace.receipt = Some(TransactionReceipt {
            status: TransactionStatus::Executed,
            cpu_usage_us: 100,
            net_usage_words: 12,
        });
        assert!(trace.executed());

        trace.receipt = Some(TransactionReceipt {
            status: TransactionStatus::HardFail,
            cpu_usage_us: 100,
            net_usage_words: 12,
        });
        assert!(!trace.executed());
    }
}
