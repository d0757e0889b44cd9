//! 64-bit base-32 chain names.
//!
//! A name packs up to 13 characters of the alphabet `.1-5a-z` into a `u64`:
//! twelve 5-bit symbols and one trailing 4-bit symbol. `Name::default()`
//! (raw value 0) renders as the empty string and serves as the wildcard
//! sentinel in filter entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::NameError;

/// Alphabet indexed by symbol value.
const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// A 64-bit chain name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

/// Account names, e.g. `alice` or the system account.
pub type AccountName = Name;
/// Action names, e.g. `newaccount`.
pub type ActionName = Name;
/// Permission names, e.g. `owner`.
pub type PermissionName = Name;

const fn char_to_symbol(c: u8) -> u64 {
    match c {
        b'a'..=b'z' => (c - b'a') as u64 + 6,
        b'1'..=b'5' => (c - b'1') as u64 + 1,
        b'.' => 0,
        _ => panic!("invalid name character"),
    }
}

impl Name {
    /// Wrap a raw 64-bit name value.
    pub const fn from_raw(value: u64) -> Self {
        Name(value)
    }

    /// The raw 64-bit value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// True for the empty name, the wildcard sentinel.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Encode a name from a string literal at compile time.
    ///
    /// Panics at compile time on invalid input; use `FromStr` for runtime
    /// parsing with proper errors.
    pub const fn from_static(s: &'static str) -> Self {
        let bytes = s.as_bytes();
        assert!(bytes.len() <= 13, "name exceeds 13 characters");
        let mut value: u64 = 0;
        let mut i = 0;
        while i < bytes.len() {
            let sym = char_to_symbol(bytes[i]);
            if i < 12 {
                value |= (sym & 0x1f) << (64 - 5 * (i + 1));
            } else {
                assert!(sym < 16, "13th character out of range");
                value |= sym & 0x0f;
            }
            i += 1;
        }
        Name(value)
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() > 13 {
            return Err(NameError::TooLong(s.to_string()));
        }
        let mut value: u64 = 0;
        for (i, &c) in bytes.iter().enumerate() {
            let sym = match c {
                b'a'..=b'z' => (c - b'a') as u64 + 6,
                b'1'..=b'5' => (c - b'1') as u64 + 1,
                b'.' => 0,
                _ => {
                    return Err(NameError::InvalidCharacter {
                        name: s.to_string(),
                        ch: c as char,
                    })
                }
            };
            if i < 12 {
                value |= (sym & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if sym >= 16 {
                    return Err(NameError::ThirteenthCharacter(s.to_string()));
                }
                value |= sym & 0x0f;
            }
        }
        Ok(Name(value))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = [b'.'; 13];
        let mut tmp = self.0;
        for i in 0..13 {
            let mask = if i == 0 { 0x0f } else { 0x1f };
            chars[12 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= if i == 0 { 4 } else { 5 };
        }
        let end = chars
            .iter()
            .rposition(|&c| c != b'.')
            .map_or(0, |pos| pos + 1);
        // the alphabet is ASCII, so the slice is always valid UTF-8
        f.write_str(std::str::from_utf8(&chars[..end]).expect("ascii"))
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for s in ["eosio", "alice", "bob", "a", "abc.def", "12345abcdefgj"] {
            let name: Name = s.parse().unwrap();
            assert_eq!(name.to_string(), s, "round trip of {s}");
        }
    }

    #[test]
    fn empty_is_wildcard() {
        let name: Name = "".parse().unwrap();
        assert!(name.is_empty());
        assert_eq!(name, Name::default());
        assert_eq!(name.to_string(), "");
    }

    #[test]
    fn trailing_dots_trimmed() {
        let padded: Name = "alice..".parse().unwrap();
        assert_eq!(padded, "alice".parse::<Name>().unwrap());
        assert_eq!(padded.to_string(), "alice");
    }

    #[test]
    fn const_and_runtime_agree() {
        assert_eq!(Name::from_static("eosio"), "eosio".parse::<Name>().unwrap());
        assert_eq!(
            Name::from_static("newaccount"),
            "newaccount".parse::<Name>().unwrap()
        );
    }

    #[test]
    fn rejects_invalid() {
        assert!(matches!(
            "Alice".parse::<Name>(),
            Err(NameError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            "0abc".parse::<Name>(),
            Err(NameError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            "aaaaaaaaaaaaaa".parse::<Name>(),
            Err(NameError::TooLong(_))
        ));
        // 13th character must fit in 4 bits ('.' through 'j')
        assert!(matches!(
            "aaaaaaaaaaaaz".parse::<Name>(),
            Err(NameError::ThirteenthCharacter(_))
        ));
    }

    #[test]
    fn serde_as_string() {
        let name: Name = "alice".parse().unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"alice\"");
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
