//! Document identifiers
//!
//! Identifiers are 12-byte values rendered as 24 hex characters, the same
//! shape document stores such as MongoDB use for `_id`. In storage they are
//! written as extended JSON (`{"$oid": "..."}`); over the wire they are plain
//! strings.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the hex rendering of an identifier.
pub const OBJECT_ID_HEX_LEN: usize = 24;

/// Key used for identifiers in the storage-native JSON form.
pub const OID_KEY: &str = "$oid";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid identifier")]
pub struct ObjectIdError(pub String);

/// A storage identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh identifier: 4 bytes of big-endian unix seconds
    /// followed by 8 random bytes.
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[4..]);
        Self(bytes)
    }

    /// Parse the 24-character hex form. Upper and lower case are accepted.
    pub fn parse_str(raw: &str) -> Result<Self, ObjectIdError> {
        if !is_valid(raw) {
            return Err(ObjectIdError(raw.to_string()));
        }

        let mut bytes = [0u8; 12];
        for (i, pair) in raw.as_bytes().chunks(2).enumerate() {
            bytes[i] = (hex_value(pair[0]) << 4) | hex_value(pair[1]);
        }
        Ok(Self(bytes))
    }

    /// Lower-case hex rendering.
    pub fn to_hex(&self) -> String {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::with_capacity(OBJECT_ID_HEX_LEN);
        for byte in self.0 {
            out.push(DIGITS[(byte >> 4) as usize] as char);
            out.push(DIGITS[(byte & 0x0f) as usize] as char);
        }
        out
    }

    /// Seconds since the unix epoch embedded in the identifier.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Storage-native JSON form.
    pub fn to_extended_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(1);
        map.insert(OID_KEY.to_string(), serde_json::Value::String(self.to_hex()));
        serde_json::Value::Object(map)
    }

    /// Read an identifier from either the storage-native form or a bare
    /// hex string.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::parse_str(s).ok(),
            serde_json::Value::Object(map) if map.len() == 1 => map
                .get(OID_KEY)
                .and_then(|v| v.as_str())
                .and_then(|s| Self::parse_str(s).ok()),
            _ => None,
        }
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(OID_KEY, &self.to_hex())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Extended {
                #[serde(rename = "$oid")]
                oid: String,
            },
        }

        let raw = match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => s,
            Repr::Extended { oid } => oid,
        };
        ObjectId::parse_str(&raw).map_err(de::Error::custom)
    }
}

/// True iff `raw` is exactly 24 hex characters.
pub fn is_valid(raw: &str) -> bool {
    raw.len() == OBJECT_ID_HEX_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Alias of [`is_valid`] under the codec naming.
pub fn validate(raw: &str) -> bool {
    is_valid(raw)
}

pub fn encode(id: &ObjectId) -> String {
    id.to_hex()
}

pub fn decode(raw: &str) -> Result<ObjectId, ObjectIdError> {
    ObjectId::parse_str(raw)
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}
