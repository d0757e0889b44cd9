//! Account projection: mirroring system actions into `accounts`,
//! `pub_keys` and `account_controls` documents.

use chainsearch_abi::{AbiCache, AbiDef};
use chainsearch_chain::{
    AccountName, Action, Authority, DeleteAuth, KeyWeight, NewAccount, PermissionLevelWeight,
    PermissionName, SetAbi, UpdateAuth, ACTIVE_PERMISSION, DELETEAUTH_ACTION, NEWACCOUNT_ACTION,
    OWNER_PERMISSION, SETABI_ACTION, SYSTEM_ACCOUNT, UPDATEAUTH_ACTION,
};
use chainsearch_elastic::{DocumentStore, ElasticResult};
use serde_json::{json, Value};

use crate::doc_types;

/// Project one executed system action into the account collections.
///
/// Non-system actions are ignored. A payload that fails to decode aborts
/// only this projection (logged, not propagated); store failures bubble up
/// to the worker's fatal handler.
pub fn update_account(
    store: &dyn DocumentStore,
    cache: &mut AbiCache,
    act: &Action,
    now: u64,
) -> ElasticResult<()> {
    if act.account != SYSTEM_ACCOUNT {
        return Ok(());
    }

    if act.name == NEWACCOUNT_ACTION {
        let newacc = match NewAccount::unpack(&act.data) {
            Ok(v) => v,
            Err(e) => return skip("newaccount", e),
        };
        create_account(store, newacc.name, now)?;
        add_pub_keys(store, &newacc.owner.keys, newacc.name, OWNER_PERMISSION, now)?;
        add_account_control(store, &newacc.owner.accounts, newacc.name, OWNER_PERMISSION, now)?;
        add_pub_keys(store, &newacc.active.keys, newacc.name, ACTIVE_PERMISSION, now)?;
        add_account_control(
            store,
            &newacc.active.accounts,
            newacc.name,
            ACTIVE_PERMISSION,
            now,
        )?;
    } else if act.name == UPDATEAUTH_ACTION {
        let update = match UpdateAuth::unpack(&act.data) {
            Ok(v) => v,
            Err(e) => return skip("updateauth", e),
        };
        remove_pub_keys(store, update.account, update.permission)?;
        remove_account_control(store, update.account, update.permission)?;
        let Authority { keys, accounts, .. } = &update.auth;
        add_pub_keys(store, keys, update.account, update.permission, now)?;
        add_account_control(store, accounts, update.account, update.permission, now)?;
    } else if act.name == DELETEAUTH_ACTION {
        let del = match DeleteAuth::unpack(&act.data) {
            Ok(v) => v,
            Err(e) => return skip("deleteauth", e),
        };
        remove_pub_keys(store, del.account, del.permission)?;
        remove_account_control(store, del.account, del.permission)?;
    } else if act.name == SETABI_ACTION {
        let setabi = match SetAbi::unpack(&act.data) {
            Ok(v) => v,
            Err(e) => return skip("setabi", e),
        };
        set_abi(store, cache, &setabi, now)?;
    }

    Ok(())
}

fn skip(action: &str, e: chainsearch_chain::PackError) -> ElasticResult<()> {
    log::warn!("skipping {action} projection, payload does not unpack: {e}");
    Ok(())
}

/// Seed a bare `accounts` document.
pub fn create_account(
    store: &dyn DocumentStore,
    name: AccountName,
    now: u64,
) -> ElasticResult<()> {
    let doc = json!({
        "name": name.to_string(),
        "createAt": now,
    });
    store.index(doc_types::ACCOUNTS, &doc, None)
}

/// Look up the `accounts` document for `name`: its store id and source.
pub fn find_account(
    store: &dyn DocumentStore,
    name: AccountName,
) -> ElasticResult<Option<(String, Value)>> {
    let query = json!({"query": {"term": {"name": name.to_string()}}});
    let result = store.search(doc_types::ACCOUNTS, &query)?;
    if result["hits"]["total"] != json!(1) {
        return Ok(None);
    }
    let hit = &result["hits"]["hits"][0];
    let id = hit["_id"].as_str().unwrap_or_default().to_string();
    Ok(Some((id, hit["_source"].clone())))
}

fn set_abi(
    store: &dyn DocumentStore,
    cache: &mut AbiCache,
    setabi: &SetAbi,
    now: u64,
) -> ElasticResult<()> {
    // drop the stale deserializer before anything else can consume it
    cache.invalidate(setabi.account);

    if find_account(store, setabi.account)?.is_none() {
        create_account(store, setabi.account, now)?;
    }
    let Some((id, source)) = find_account(store, setabi.account)? else {
        return Ok(());
    };

    let def = match AbiDef::unpack(&setabi.abi) {
        Ok(def) => def,
        Err(e) => {
            log::warn!("abi for {} does not unpack: {e}", setabi.account);
            return Ok(());
        }
    };
    let abi_value = serde_json::to_value(&def).unwrap_or(Value::Null);

    let doc = json!({
        "name": source["name"],
        "abi": abi_value,
        "updateAt": now,
        "createAt": source["createAt"],
    });
    store.index(doc_types::ACCOUNTS, &doc, Some(&id))
}

fn add_pub_keys(
    store: &dyn DocumentStore,
    keys: &[KeyWeight],
    name: AccountName,
    permission: PermissionName,
    now: u64,
) -> ElasticResult<()> {
    if keys.is_empty() {
        return Ok(());
    }
    let docs: Vec<Value> = keys
        .iter()
        .map(|kw| {
            json!({
                "account": name.to_string(),
                "public_key": kw.key.to_string(),
                "permission": permission.to_string(),
                "createAt": now,
            })
        })
        .collect();
    store.bulk(doc_types::PUB_KEYS, &docs)
}

fn remove_pub_keys(
    store: &dyn DocumentStore,
    name: AccountName,
    permission: PermissionName,
) -> ElasticResult<()> {
    let query = json!({"query": {"bool": {"must": [
        {"term": {"account": name.to_string()}},
        {"term": {"permission": permission.to_string()}},
    ]}}});
    store.delete_by_query(doc_types::PUB_KEYS, &query)
}

fn add_account_control(
    store: &dyn DocumentStore,
    controlling: &[PermissionLevelWeight],
    name: AccountName,
    permission: PermissionName,
    now: u64,
) -> ElasticResult<()> {
    if controlling.is_empty() {
        return Ok(());
    }
    let docs: Vec<Value> = controlling
        .iter()
        .map(|plw| {
            json!({
                "controlled_account": name.to_string(),
                "controlled_permission": permission.to_string(),
                "controlling_account": plw.permission.actor.to_string(),
                "createAt": now,
            })
        })
        .collect();
    store.bulk(doc_types::ACCOUNT_CONTROLS, &docs)
}

fn remove_account_control(
    store: &dyn DocumentStore,
    name: AccountName,
    permission: PermissionName,
) -> ElasticResult<()> {
    let query = json!({"query": {"bool": {"must": [
        {"term": {"controlled_account": name.to_string()}},
        {"term": {"controlled_permission": permission.to_string()}},
    ]}}});
    store.delete_by_query(doc_types::ACCOUNT_CONTROLS, &query)
}
