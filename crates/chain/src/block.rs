//! Blocks and block states.

use serde::{Deserialize, Serialize};

use crate::action::TransactionStatus;
use crate::crypto::Checksum256;
use crate::name::AccountName;
use crate::transaction::SignedTransaction;

/// A transaction carried in a block together with its receipt status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransaction {
    pub status: TransactionStatus,
    pub trx: SignedTransaction,
}

/// A produced block body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub previous: Checksum256,
    /// Production time, milliseconds since Unix epoch.
    pub timestamp_ms: u64,
    pub producer: AccountName,
    pub transactions: Vec<BlockTransaction>,
}

/// Chain state for a block as seen by fork choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub block_num: u32,
    pub id: Checksum256,
    pub validated: bool,
    pub in_current_chain: bool,
    pub block: SignedBlock,
}

impl BlockState {
    /// Id of the previous block.
    pub fn previous_id(&self) -> &Checksum256 {
        &self.block.previous
    }
}
