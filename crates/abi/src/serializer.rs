//! Schema-driven decoding of packed payloads.

use std::collections::HashMap;

use chainsearch_chain::{ActionName, ByteReader};
use serde_json::{Map, Value};

use crate::def::{AbiDef, StructDef};
use crate::error::{AbiError, AbiResult};

/// A decoder overriding the schema for one type name.
pub type SpecializedUnpack = fn(&mut ByteReader<'_>) -> AbiResult<Value>;

/// Decodes packed payloads into structured values against one ABI.
pub struct AbiSerializer {
    typedefs: HashMap<String, String>,
    structs: HashMap<String, StructDef>,
    actions: HashMap<ActionName, String>,
    specialized: HashMap<String, SpecializedUnpack>,
    max_depth: usize,
}

impl AbiSerializer {
    /// Index an ABI for decoding. `max_depth` bounds nesting through
    /// structs, arrays, optionals and typedefs.
    pub fn from_def(def: &AbiDef, max_depth: usize) -> Self {
        let typedefs = def
            .types
            .iter()
            .map(|t| (t.new_type_name.clone(), t.type_name.clone()))
            .collect();
        let structs = def
            .structs
            .iter()
            .map(|s| (s.name.clone(), s.clone()))
            .collect();
        let actions = def
            .actions
            .iter()
            .map(|a| (a.name, a.type_name.clone()))
            .collect();
        AbiSerializer {
            typedefs,
            structs,
            actions,
            specialized: HashMap::new(),
            max_depth,
        }
    }

    /// The struct name decoding `action`'s payload, when the ABI binds one.
    pub fn action_type(&self, action: ActionName) -> Option<&str> {
        self.actions.get(&action).map(String::as_str)
    }

    /// Override decoding of `type_name` with a custom unpacker.
    pub fn register_specialized(&mut self, type_name: impl Into<String>, f: SpecializedUnpack) {
        self.specialized.insert(type_name.into(), f);
    }

    /// Decode a whole buffer as `type_name`; trailing bytes are an error.
    pub fn deserialize(&self, type_name: &str, data: &[u8]) -> AbiResult<Value> {
        let mut r = ByteReader::new(data);
        let value = self.decode(type_name, &mut r, 0)?;
        r.finish()?;
        Ok(value)
    }

    fn decode(&self, type_name: &str, r: &mut ByteReader<'_>, depth: usize) -> AbiResult<Value> {
        if depth > self.max_depth {
            return Err(AbiError::DepthExceeded(self.max_depth));
        }

        if let Some(base) = type_name.strip_suffix("[]") {
            let count = r.read_varuint32()? as usize;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(self.decode(base, r, depth + 1)?);
            }
            return Ok(Value::Array(items));
        }

        if let Some(base) = type_name.strip_suffix('?') {
            return if r.read_u8()? == 0 {
                Ok(Value::Null)
            } else {
                self.decode(base, r, depth + 1)
            };
        }

        // specialized unpackers win over everything, including typedefs:
        // the cache rewrites field types to point at them by name
        if let Some(f) = self.specialized.get(type_name) {
            return f(r);
        }

        if let Some(alias) = self.typedefs.get(type_name) {
            return self.decode(alias, r, depth + 1);
        }

        if let Some(value) = self.decode_builtin(type_name, r)? {
            return Ok(value);
        }

        if let Some(def) = self.structs.get(type_name) {
            return self.decode_struct(def, r, depth);
        }

        Err(AbiError::UnknownType(type_name.to_string()))
    }

    fn decode_builtin(
        &self,
        type_name: &str,
        r: &mut ByteReader<'_>,
    ) -> AbiResult<Option<Value>> {
        let value = match type_name {
            "name" => Value::String(r.read_name()?.to_string()),
            "bool" => Value::Bool(r.read_u8()? != 0),
            "uint8" => Value::from(r.read_u8()?),
            "uint16" => Value::from(r.read_u16()?),
            "uint32" => Value::from(r.read_u32()?),
            "uint64" => Value::from(r.read_u64()?),
            "int8" => Value::from(r.read_i8()?),
            "int16" => Value::from(r.read_i16()?),
            "int32" => Value::from(r.read_i32()?),
            "int64" => Value::from(r.read_i64()?),
            "varuint32" => Value::from(r.read_varuint32()?),
            "time_point_ms" => Value::from(r.read_u64()?),
            "bytes" => Value::String(hex::encode(r.read_bytes()?)),
            "string" => Value::String(r.read_string()?),
            "checksum256" => Value::String(r.read_checksum256()?.to_string()),
            "public_key" => Value::String(r.read_public_key()?.to_string()),
            "signature" => Value::String(r.read_signature()?.to_string()),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn decode_struct(
        &self,
        def: &StructDef,
        r: &mut ByteReader<'_>,
        depth: usize,
    ) -> AbiResult<Value> {
        let mut out = Map::new();

        if !def.base.is_empty() {
            let base = self.decode(&def.base, r, depth + 1)?;
            if let Value::Object(fields) = base {
                out.extend(fields);
            }
        }

        for field in &def.fields {
            let value = self.decode(&field.type_name, r, depth + 1)?;
            out.insert(field.name.clone(), value);
        }
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ActionDef, FieldDef, TypeDef};
    use chainsearch_chain::ByteWriter;
    use serde_json::json;

    fn transfer_abi() -> AbiDef {
        AbiDef {
            version: "chainsearch::abi/1.0".to_string(),
            types: vec![TypeDef {
                new_type_name: "account_name".to_string(),
                type_name: "name".to_string(),
            }],
            structs: vec![StructDef {
                name: "transfer".to_string(),
                base: String::new(),
                fields: vec![
                    FieldDef {
                        name: "from".to_string(),
                        type_name: "account_name".to_string(),
                    },
                    FieldDef {
                        name: "to".to_string(),
                        type_name: "account_name".to_string(),
                    },
                    FieldDef {
                        name: "amount".to_string(),
                        type_name: "uint64".to_string(),
                    },
                    FieldDef {
                        name: "memo".to_string(),
                        type_name: "string".to_string(),
                    },
                ],
            }],
            actions: vec![ActionDef {
                name: "transfer".parse().unwrap(),
                type_name: "transfer".to_string(),
            }],
        }
    }

    #[test]
    fn decodes_struct_payload() {
        let ser = AbiSerializer::from_def(&transfer_abi(), 32);

        let mut w = ByteWriter::new();
        w.write_name("alice".parse().unwrap());
        w.write_name("bob".parse().unwrap());
        w.write_u64(1000);
        w.write_string("rent");

        let value = ser.deserialize("transfer", &w.into_bytes()).unwrap();
        assert_eq!(
            value,
            json!({"from": "alice", "to": "bob", "amount": 1000, "memo": "rent"})
        );
    }

    #[test]
    fn maps_action_to_type() {
        let ser = AbiSerializer::from_def(&transfer_abi(), 32);
        assert_eq!(ser.action_type("transfer".parse().unwrap()), Some("transfer"));
        assert_eq!(ser.action_type("unknown".parse().unwrap()), None);
    }

    #[test]
    fn arrays_and_optionals() {
        let abi = AbiDef {
            structs: vec![StructDef {
                name: "holder".to_string(),
                base: String::new(),
                fields: vec![
                    FieldDef {
                        name: "values".to_string(),
                        type_name: "uint32[]".to_string(),
                    },
                    FieldDef {
                        name: "note".to_string(),
                        type_name: "string?".to_string(),
                    },
                ],
            }],
            ..AbiDef::default()
        };
        let ser = AbiSerializer::from_def(&abi, 32);

        let mut w = ByteWriter::new();
        w.write_varuint32(3);
        w.write_u32(1);
        w.write_u32(2);
        w.write_u32(3);
        w.write_u8(0); // absent optional

        let value = ser.deserialize("holder", &w.into_bytes()).unwrap();
        assert_eq!(value, json!({"values": [1, 2, 3], "note": null}));
    }

    #[test]
    fn base_struct_fields_come_first() {
        let abi = AbiDef {
            structs: vec![
                StructDef {
                    name: "header".to_string(),
                    base: String::new(),
                    fields: vec![FieldDef {
                        name: "seq".to_string(),
                        type_name: "uint64".to_string(),
                    }],
                },
                StructDef {
                    name: "entry".to_string(),
                    base: "header".to_string(),
                    fields: vec![FieldDef {
                        name: "tag".to_string(),
                        type_name: "string".to_string(),
                    }],
                },
            ],
            ..AbiDef::default()
        };
        let ser = AbiSerializer::from_def(&abi, 32);

        let mut w = ByteWriter::new();
        w.write_u64(9);
        w.write_string("x");

        let value = ser.deserialize("entry", &w.into_bytes()).unwrap();
        assert_eq!(value, json!({"seq": 9, "tag": "x"}));
    }

    #[test]
    fn unknown_type_errors() {
        let ser = AbiSerializer::from_def(&AbiDef::default(), 32);
        assert_eq!(
            ser.deserialize("mystery", &[]),
            Err(AbiError::UnknownType("mystery".to_string()))
        );
    }

    #[test]
    fn cyclic_typedef_hits_depth_guard() {
        let abi = AbiDef {
            types: vec![
                TypeDef {
                    new_type_name: "a".to_string(),
                    type_name: "b".to_string(),
                },
                TypeDef {
                    new_type_name: "b".to_string(),
                    type_name: "a".to_string(),
                },
            ],
            ..AbiDef::default()
        };
        let ser = AbiSerializer::from_def(&abi, 8);
        assert_eq!(ser.deserialize("a", &[]), Err(AbiError::DepthExceeded(8)));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let ser = AbiSerializer::from_def(&transfer_abi(), 32);
        let mut w = ByteWriter::new();
        w.write_name("alice".parse().unwrap());
        w.write_name("bob".parse().unwrap());
        w.write_u64(1);
        w.write_string("");
        w.write_u8(0xaa); // junk
        assert!(matches!(
            ser.deserialize("transfer", &w.into_bytes()),
            Err(AbiError::Pack(_))
        ));
    }

    #[test]
    fn specialized_unpacker_wins() {
        fn fixed(_r: &mut ByteReader<'_>) -> AbiResult<Value> {
            Ok(json!("specialized"))
        }

        let mut ser = AbiSerializer::from_def(&AbiDef::default(), 32);
        ser.register_specialized("magic", fixed);
        assert_eq!(ser.deserialize("magic", &[]).unwrap(), json!("specialized"));
    }
}
