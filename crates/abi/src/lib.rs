//! ABI schema registry for the chainsearch indexing bridge.
//!
//! An account's ABI describes how its packed action payloads decode into
//! structured values. This crate models the schema (`AbiDef`), decodes
//! payloads against it (`AbiSerializer`), and keeps a bounded
//! least-recently-used registry of per-account serializers (`AbiCache`)
//! backed by the `accounts` collection of the document store.

pub mod cache;
pub mod def;
pub mod error;
pub mod serializer;

pub use cache::AbiCache;
pub use def::{AbiDef, ActionDef, FieldDef, StructDef, TypeDef};
pub use error::{AbiError, AbiResult};
pub use serializer::AbiSerializer;
