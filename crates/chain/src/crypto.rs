//! Checksums, public keys and recoverable signatures.
//!
//! Documents store all three as lowercase hex strings. Signatures are the
//! 65-byte compact recoverable form (recovery id byte first), which lets the
//! indexer derive signing keys when the host did not precompute them.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, Secp256k1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

fn secp() -> &'static Secp256k1<All> {
    static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();
    SECP.get_or_init(Secp256k1::new)
}

macro_rules! hex_newtype {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Wrap raw bytes.
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// The raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }

        impl FromStr for $name {
            type Err = CryptoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = hex::decode(s).map_err(|e| CryptoError::Hex(e.to_string()))?;
                let bytes: [u8; $len] = raw.try_into().map_err(|raw: Vec<u8>| {
                    CryptoError::Length {
                        expected: $len,
                        got: raw.len(),
                    }
                })?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_newtype!(
    /// A 32-byte digest: block ids, transaction ids, the chain id.
    Checksum256,
    32
);

hex_newtype!(
    /// A 33-byte compressed secp256k1 public key.
    PublicKey,
    33
);

hex_newtype!(
    /// A 65-byte compact recoverable signature: recovery id, then r || s.
    Signature,
    65
);

/// SHA-256 of a byte string.
pub fn sha256(bytes: &[u8]) -> Checksum256 {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Checksum256(hasher.finalize().into())
}

impl Signature {
    /// Recover the signing public key from a 32-byte digest.
    pub fn recover(&self, digest: &Checksum256) -> Result<PublicKey, CryptoError> {
        let recid = RecoveryId::from_i32(i32::from(self.0[0]))
            .map_err(|_| CryptoError::RecoveryId(self.0[0]))?;
        let recoverable = RecoverableSignature::from_compact(&self.0[1..], recid)
            .map_err(|e| CryptoError::Recovery(e.to_string()))?;
        let msg = Message::from_digest_slice(digest.as_bytes())
            .map_err(|e| CryptoError::Recovery(e.to_string()))?;
        let pubkey = secp()
            .recover_ecdsa(&msg, &recoverable)
            .map_err(|e| CryptoError::Recovery(e.to_string()))?;
        Ok(PublicKey(pubkey.serialize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::SecretKey;

    fn sign(secret: &SecretKey, digest: &Checksum256) -> Signature {
        let msg = Message::from_digest_slice(digest.as_bytes()).unwrap();
        let recoverable = secp().sign_ecdsa_recoverable(&msg, secret);
        let (recid, compact) = recoverable.serialize_compact();
        let mut raw = [0u8; 65];
        raw[0] = recid.to_i32() as u8;
        raw[1..].copy_from_slice(&compact);
        Signature(raw)
    }

    fn expected_key(secret: &SecretKey) -> PublicKey {
        PublicKey(secret.public_key(secp()).serialize())
    }

    #[test]
    fn recovers_signing_key() {
        let secret = SecretKey::from_slice(&[0x42u8; 32]).unwrap();
        let digest = sha256(b"signed payload");

        let sig = sign(&secret, &digest);
        let recovered = sig.recover(&digest).unwrap();

        assert_eq!(recovered, expected_key(&secret));
    }

    #[test]
    fn forged_recovery_id_changes_key() {
        let secret = SecretKey::from_slice(&[0x42u8; 32]).unwrap();
        let digest = sha256(b"forged recovery id");

        let mut sig = sign(&secret, &digest);
        sig.0[0] ^= 1;

        match sig.recover(&digest) {
            Ok(other) => assert_ne!(other, expected_key(&secret)),
            // flipping the id can also push the point off the curve
            Err(CryptoError::Recovery(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn rejects_bad_recovery_id() {
        let digest = sha256(b"x");
        let sig = Signature([7u8; 65]);
        assert!(matches!(
            sig.recover(&digest),
            Err(CryptoError::RecoveryId(7))
        ));
    }

    #[test]
    fn hex_round_trip() {
        let digest = sha256(b"abc");
        let text = digest.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<Checksum256>().unwrap(), digest);
    }

    #[test]
    fn hex_rejects_wrong_length() {
        assert!(matches!(
            "ab".parse::<Checksum256>(),
            Err(CryptoError::Length {
                expected: 32,
                got: 1
            })
        ));
    }
}
