//! Chain data model for the chainsearch indexing bridge.
//!
//! This crate defines the event types the host node emits (transaction
//! metadata, applied transaction traces, block states), the value types they
//! are built from (names, checksums, keys, authorities), the packed binary
//! codec used for action payloads and transaction signing, and the
//! `ChainEmitter` signal hub the indexer subscribes to.

pub mod action;
pub mod authority;
pub mod block;
pub mod crypto;
pub mod emitter;
pub mod error;
pub mod name;
pub mod pack;
pub mod transaction;

pub use action::{Action, ActionReceipt, ActionTrace, TransactionStatus};
pub use authority::{
    Authority, DeleteAuth, KeyWeight, NewAccount, PermissionLevel, PermissionLevelWeight, SetAbi,
    UpdateAuth,
};
pub use block::{BlockState, BlockTransaction, SignedBlock};
pub use crypto::{sha256, Checksum256, PublicKey, Signature};
pub use emitter::{ChainEmitter, SignalKind, Subscription};
pub use error::{CryptoError, NameError, PackError};
pub use name::{AccountName, ActionName, Name, PermissionName};
pub use pack::{ByteReader, ByteWriter};
pub use transaction::{
    SignedTransaction, TransactionMeta, TransactionReceipt, TransactionTrace,
};

/// The distinguished account whose actions define accounts, authorities and
/// ABIs on the host chain.
pub const SYSTEM_ACCOUNT: AccountName = Name::from_static("eosio");

/// Built-in permission names.
pub const OWNER_PERMISSION: PermissionName = Name::from_static("owner");
pub const ACTIVE_PERMISSION: PermissionName = Name::from_static("active");

/// System action names observed by the account projector.
pub const NEWACCOUNT_ACTION: ActionName = Name::from_static("newaccount");
pub const SETABI_ACTION: ActionName = Name::from_static("setabi");
pub const UPDATEAUTH_ACTION: ActionName = Name::from_static("updateauth");
pub const DELETEAUTH_ACTION: ActionName = Name::from_static("deleteauth");
