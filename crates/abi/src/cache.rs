//! Bounded least-recently-used registry of per-account deserializers.
//!
//! The cache is owned by the consumer thread alone, so it carries no lock.
//! A miss is resolved by searching the `accounts` collection; only accounts
//! with a parsable ABI are cached, so a later `setabi` is always observed.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chainsearch_chain::{AccountName, ByteReader, SYSTEM_ACCOUNT};
use chainsearch_elastic::{DocumentStore, ElasticResult};
use lru::LruCache;
use serde_json::{json, Value};

use crate::def::AbiDef;
use crate::error::{AbiError, AbiResult};
use crate::serializer::AbiSerializer;

/// Decode a varuint-prefixed byte blob as a packed `AbiDef`.
///
/// Registered for the system account's rewritten `setabi.abi` field so the
/// ABI lands in documents as structured data instead of opaque bytes.
fn unpack_nested_abi(r: &mut ByteReader<'_>) -> AbiResult<Value> {
    let raw = r.read_bytes()?;
    let def = AbiDef::unpack(&raw)?;
    serde_json::to_value(&def).map_err(|e| AbiError::Json(e.to_string()))
}

/// LRU cache mapping accounts to their deserializers.
pub struct AbiCache {
    entries: LruCache<AccountName, Arc<AbiSerializer>>,
    max_depth: usize,
}

impl AbiCache {
    /// A cache holding at most `capacity` deserializers.
    pub fn new(capacity: usize, max_depth: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity >= 1");
        AbiCache {
            entries: LruCache::new(capacity),
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Whether `account` is cached, without touching recency.
    pub fn contains(&self, account: AccountName) -> bool {
        self.entries.peek(&account).is_some()
    }

    /// Drop the cached deserializer for `account`.
    pub fn invalidate(&mut self, account: AccountName) {
        self.entries.pop(&account);
    }

    /// The deserializer for `account`: cached, or fetched from the
    /// `accounts` collection. `None` when the account has no usable ABI;
    /// store or parse failures are logged and degrade to `None` so callers
    /// fall back to raw payload bytes.
    pub fn resolve(
        &mut self,
        account: AccountName,
        store: &dyn DocumentStore,
    ) -> Option<Arc<AbiSerializer>> {
        if account.is_empty() {
            return None;
        }
        if let Some(serializer) = self.entries.get(&account) {
            return Some(serializer.clone());
        }

        let def = match self.fetch_abi(account, store) {
            Ok(Some(def)) => def,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("abi lookup for {account} failed: {e}");
                return None;
            }
        };

        let serializer = Arc::new(self.build_serializer(account, def));
        self.entries.push(account, serializer.clone());
        Some(serializer)
    }

    fn build_serializer(&self, account: AccountName, mut def: AbiDef) -> AbiSerializer {
        let mut nested_abi = false;
        if account == SYSTEM_ACCOUNT {
            // store setabi.abi as a structured AbiDef instead of bytes
            if let Some(field) = def
                .struct_mut("setabi")
                .and_then(|s| s.fields.iter_mut().find(|f| f.name == "abi"))
            {
                if field.type_name == "bytes" {
                    field.type_name = "abi_def".to_string();
                    nested_abi = true;
                }
            }
        }

        let mut serializer = AbiSerializer::from_def(&def, self.max_depth);
        if nested_abi {
            serializer.register_specialized("abi_def", unpack_nested_abi);
        }
        serializer
    }

    fn fetch_abi(
        &self,
        account: AccountName,
        store: &dyn DocumentStore,
    ) -> ElasticResult<Option<AbiDef>> {
        let query = json!({"query": {"term": {"name": account.to_string()}}});
        let result = store.search("accounts", &query)?;
        if result["hits"]["total"] != json!(1) {
            return Ok(None);
        }

        let abi = &result["hits"]["hits"][0]["_source"]["abi"];
        if abi.is_null() {
            return Ok(None);
        }
        match serde_json::from_value::<AbiDef>(abi.clone()) {
            Ok(def) => Ok(Some(def)),
            Err(e) => {
                log::info!("stored abi for {account} does not parse: {e}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ActionDef, FieldDef, StructDef};
    use chainsearch_chain::{ByteWriter, Name};
    use chainsearch_elastic::MemoryStore;

    fn put_account_with_abi(store: &MemoryStore, name: &str, def: &AbiDef) {
        let doc = json!({
            "name": name,
            "abi": serde_json::to_value(def).unwrap(),
            "createAt": 0,
        });
        store.index("accounts", &doc, None).unwrap();
    }

    fn trivial_abi(struct_name: &str) -> AbiDef {
        AbiDef {
            version: "chainsearch::abi/1.0".to_string(),
            structs: vec![StructDef {
                name: struct_name.to_string(),
                base: String::new(),
                fields: vec![FieldDef {
                    name: "value".to_string(),
                    type_name: "uint64".to_string(),
                }],
            }],
            actions: vec![ActionDef {
                name: struct_name.parse().unwrap(),
                type_name: struct_name.to_string(),
            }],
            ..AbiDef::default()
        }
    }

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn resolves_and_caches() {
        let store = MemoryStore::new();
        put_account_with_abi(&store, "alice", &trivial_abi("ping"));

        let mut cache = AbiCache::new(4, 32);
        assert!(cache.resolve(name("alice"), &store).is_some());
        assert_eq!(cache.len(), 1);

        // hit without another store round trip: drop the doc and resolve again
        store.delete_index().unwrap();
        assert!(cache.resolve(name("alice"), &store).is_some());
    }

    #[test]
    fn missing_abi_not_cached() {
        let store = MemoryStore::new();
        let mut cache = AbiCache::new(4, 32);

        assert!(cache.resolve(name("alice"), &store).is_none());
        assert_eq!(cache.len(), 0);

        // once an ABI appears, a fresh resolve picks it up
        put_account_with_abi(&store, "alice", &trivial_abi("ping"));
        assert!(cache.resolve(name("alice"), &store).is_some());
    }

    #[test]
    fn wildcard_account_resolves_to_none() {
        let store = MemoryStore::new();
        let mut cache = AbiCache::new(4, 32);
        assert!(cache.resolve(Name::default(), &store).is_none());
    }

    #[test]
    fn evicts_least_recently_used() {
        let store = MemoryStore::new();
        for acct in ["aaa", "bbb", "ccc"] {
            put_account_with_abi(&store, acct, &trivial_abi("ping"));
        }

        let mut cache = AbiCache::new(2, 32);
        cache.resolve(name("aaa"), &store).unwrap();
        cache.resolve(name("bbb"), &store).unwrap();
        // refresh aaa so bbb is the least recently used
        cache.resolve(name("aaa"), &store).unwrap();
        cache.resolve(name("ccc"), &store).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(name("aaa")));
        assert!(!cache.contains(name("bbb")));
        assert!(cache.contains(name("ccc")));
    }

    #[test]
    fn never_exceeds_capacity() {
        let store = MemoryStore::new();
        let mut cache = AbiCache::new(3, 32);
        for i in 0..10 {
            let acct = format!("acct{}", (b'a' + i) as char);
            put_account_with_abi(&store, &acct, &trivial_abi("ping"));
            cache.resolve(name(&acct), &store).unwrap();
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn invalidate_forces_refetch() {
        let store = MemoryStore::new();
        put_account_with_abi(&store, "alice", &trivial_abi("ping"));

        let mut cache = AbiCache::new(4, 32);
        cache.resolve(name("alice"), &store).unwrap();
        cache.invalidate(name("alice"));
        assert!(!cache.contains(name("alice")));

        // the store is empty of alice now, so a refetch finds nothing
        store.delete_index().unwrap();
        assert!(cache.resolve(name("alice"), &store).is_none());
    }

    #[test]
    fn system_setabi_decodes_nested_abi() {
        let system_abi = AbiDef {
            version: "chainsearch::abi/1.0".to_string(),
            structs: vec![StructDef {
                name: "setabi".to_string(),
                base: String::new(),
                fields: vec![
                    FieldDef {
                        name: "account".to_string(),
                        type_name: "name".to_string(),
                    },
                    FieldDef {
                        name: "abi".to_string(),
                        type_name: "bytes".to_string(),
                    },
                ],
            }],
            actions: vec![ActionDef {
                name: name("setabi"),
                type_name: "setabi".to_string(),
            }],
            ..AbiDef::default()
        };

        let store = MemoryStore::new();
        put_account_with_abi(&store, &SYSTEM_ACCOUNT.to_string(), &system_abi);

        let mut cache = AbiCache::new(4, 32);
        let serializer = cache.resolve(SYSTEM_ACCOUNT, &store).unwrap();

        // payload: account name + packed nested abi as a bytes blob
        let nested = trivial_abi("ping");
        let mut w = ByteWriter::new();
        w.write_name(name("alice"));
        w.write_bytes(&nested.pack());

        let value = serializer.deserialize("setabi", &w.into_bytes()).unwrap();
        assert_eq!(value["account"], "alice");
        assert_eq!(value["abi"]["version"], "chainsearch::abi/1.0");
        assert_eq!(value["abi"]["structs"][0]["name"], "ping");
    }

    #[test]
    fn non_system_setabi_stays_bytes() {
        let mut abi = AbiDef::default();
        abi.structs.push(StructDef {
            name: "setabi".to_string(),
            base: String::new(),
            fields: vec![
                FieldDef {
                    name: "account".to_string(),
                    type_name: "name".to_string(),
                },
                FieldDef {
                    name: "abi".to_string(),
                    type_name: "bytes".to_string(),
                },
            ],
        });

        let store = MemoryStore::new();
        put_account_with_abi(&store, "notsystem", &abi);

        let mut cache = AbiCache::new(4, 32);
        let serializer = cache.resolve(name("notsystem"), &store).unwrap();

        let mut w = ByteWriter::new();
        w.write_name(name("alice"));
        w.write_bytes(&[1, 2, 3]);

        let value = serializer.deserialize("setabi", &w.into_bytes()).unwrap();
        assert_eq!(value["abi"], "010203");
    }
}
