//! Account authority structures and the system action payloads that carry
//! them.

use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::error::PackError;
use crate::name::{AccountName, PermissionName};
use crate::pack::ByteReader;

/// An actor acting under one of its permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: AccountName,
    pub permission: PermissionName,
}

/// A public key and its voting weight within an authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
    pub key: PublicKey,
    pub weight: u16,
}

/// A controlling account permission and its weight within an authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevelWeight {
    pub permission: PermissionLevel,
    pub weight: u16,
}

/// The authority bound to one of an account's permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub threshold: u32,
    pub keys: Vec<KeyWeight>,
    pub accounts: Vec<PermissionLevelWeight>,
}

impl Authority {
    /// Decode from the packed payload representation.
    pub fn unpack(r: &mut ByteReader<'_>) -> Result<Self, PackError> {
        let threshold = r.read_u32()?;
        let key_count = r.read_varuint32()? as usize;
        let mut keys = Vec::with_capacity(key_count.min(64));
        for _ in 0..key_count {
            let key = r.read_public_key()?;
            let weight = r.read_u16()?;
            keys.push(KeyWeight { key, weight });
        }
        let account_count = r.read_varuint32()? as usize;
        let mut accounts = Vec::with_capacity(account_count.min(64));
        for _ in 0..account_count {
            let actor = r.read_name()?;
            let permission = r.read_name()?;
            let weight = r.read_u16()?;
            accounts.push(PermissionLevelWeight {
                permission: PermissionLevel { actor, permission },
                weight,
            });
        }
        Ok(Authority {
            threshold,
            keys,
            accounts,
        })
    }
}

/// Payload of the system `newaccount` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub creator: AccountName,
    pub name: AccountName,
    pub owner: Authority,
    pub active: Authority,
}

impl NewAccount {
    pub fn unpack(data: &[u8]) -> Result<Self, PackError> {
        let mut r = ByteReader::new(data);
        let creator = r.read_name()?;
        let name = r.read_name()?;
        let owner = Authority::unpack(&mut r)?;
        let active = Authority::unpack(&mut r)?;
        Ok(NewAccount {
            creator,
            name,
            owner,
            active,
        })
    }
}

/// Payload of the system `updateauth` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAuth {
    pub account: AccountName,
    pub permission: PermissionName,
    pub parent: PermissionName,
    pub auth: Authority,
}

impl UpdateAuth {
    pub fn unpack(data: &[u8]) -> Result<Self, PackError> {
        let mut r = ByteReader::new(data);
        let account = r.read_name()?;
        let permission = r.read_name()?;
        let parent = r.read_name()?;
        let auth = Authority::unpack(&mut r)?;
        Ok(UpdateAuth {
            account,
            permission,
            parent,
            auth,
        })
    }
}

/// Payload of the system `deleteauth` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteAuth {
    pub account: AccountName,
    pub permission: PermissionName,
}

impl DeleteAuth {
    pub fn unpack(data: &[u8]) -> Result<Self, PackError> {
        let mut r = ByteReader::new(data);
        let account = r.read_name()?;
        let permission = r.read_name()?;
        Ok(DeleteAuth {
            account,
            permission,
        })
    }
}

/// Payload of the system `setabi` action. The ABI itself stays packed here;
/// decoding it is the schema layer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAbi {
    pub account: AccountName,
    pub abi: Vec<u8>,
}

impl SetAbi {
    pub fn unpack(data: &[u8]) -> Result<Self, PackError> {
        let mut r = ByteReader::new(data);
        let account = r.read_name()?;
        let abi = r.read_bytes()?;
        Ok(SetAbi { account, abi })
    }
}
