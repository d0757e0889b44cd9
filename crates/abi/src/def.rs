//! The ABI schema model.
//!
//! An `AbiDef` exists in two forms: as JSON stored under `accounts.abi` in
//! the document store, and packed into the payload of the system `setabi`
//! action. Sections this indexer does not consume (tables, ricardian
//! clauses, extensions) are ignored when unpacking.

use chainsearch_chain::{ActionName, ByteReader, ByteWriter, PackError};
use serde::{Deserialize, Serialize};

/// A typedef: `new_type_name` is an alias for `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One field of a struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A named struct, optionally extending a base struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// Binding from an action name to the struct decoding its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: ActionName,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// An account's ABI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDef {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
}

impl AbiDef {
    /// Decode the packed form carried by `setabi`.
    ///
    /// Reads version, typedefs, structs and actions; any later schema
    /// sections are left unread.
    pub fn unpack(data: &[u8]) -> Result<Self, PackError> {
        let mut r = ByteReader::new(data);
        let version = r.read_string()?;

        let type_count = r.read_varuint32()? as usize;
        let mut types = Vec::with_capacity(type_count.min(256));
        for _ in 0..type_count {
            let new_type_name = r.read_string()?;
            let type_name = r.read_string()?;
            types.push(TypeDef {
                new_type_name,
                type_name,
            });
        }

        let struct_count = r.read_varuint32()? as usize;
        let mut structs = Vec::with_capacity(struct_count.min(256));
        for _ in 0..struct_count {
            let name = r.read_string()?;
            let base = r.read_string()?;
            let field_count = r.read_varuint32()? as usize;
            let mut fields = Vec::with_capacity(field_count.min(256));
            for _ in 0..field_count {
                let field_name = r.read_string()?;
                let type_name = r.read_string()?;
                fields.push(FieldDef {
                    name: field_name,
                    type_name,
                });
            }
            structs.push(StructDef { name, base, fields });
        }

        let action_count = r.read_varuint32()? as usize;
        let mut actions = Vec::with_capacity(action_count.min(256));
        for _ in 0..action_count {
            let name = r.read_name()?;
            let type_name = r.read_string()?;
            actions.push(ActionDef { name, type_name });
        }

        Ok(AbiDef {
            version,
            types,
            structs,
            actions,
        })
    }

    /// Pack into the `setabi` payload form.
    pub fn pack(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_string(&self.version);
        w.write_varuint32(self.types.len() as u32);
        for t in &self.types {
            w.write_string(&t.new_type_name);
            w.write_string(&t.type_name);
        }
        w.write_varuint32(self.structs.len() as u32);
        for s in &self.structs {
            w.write_string(&s.name);
            w.write_string(&s.base);
            w.write_varuint32(s.fields.len() as u32);
            for f in &s.fields {
                w.write_string(&f.name);
                w.write_string(&f.type_name);
            }
        }
        w.write_varuint32(self.actions.len() as u32);
        for a in &self.actions {
            w.write_name(a.name);
            w.write_string(&a.type_name);
        }
        w.into_bytes()
    }

    /// Mutable access to a struct by name.
    pub fn struct_mut(&mut self, name: &str) -> Option<&mut StructDef> {
        self.structs.iter_mut().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_abi() -> AbiDef {
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
    fn pack_unpack_round_trip() {
        let abi = sample_abi();
        let decoded = AbiDef::unpack(&abi.pack()).unwrap();
        assert_eq!(decoded, abi);
    }

    #[test]
    fn json_round_trip_uses_type_key() {
        let abi = sample_abi();
        let json = serde_json::to_value(&abi).unwrap();
        assert_eq!(json["structs"][0]["fields"][0]["type"], "account_name");
        let back: AbiDef = serde_json::from_value(json).unwrap();
        assert_eq!(back, abi);
    }

    #[test]
    fn missing_sections_default() {
        let abi: AbiDef = serde_json::from_str(r#"{"version": "x"}"#).unwrap();
        assert!(abi.structs.is_empty());
        assert!(abi.actions.is_empty());
    }

    #[test]
    fn unpack_rejects_truncated() {
        let mut bytes = sample_abi().pack();
        bytes.truncate(bytes.len() / 2);
        assert!(AbiDef::unpack(&bytes).is_err());
    }
}
