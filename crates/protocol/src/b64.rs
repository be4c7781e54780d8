//! Serde-Hilfsmodul fuer Base64-kodierte Byte-Felder
//!
//! Verwendung: `#[serde(with = "crate::b64")]` auf einem `Vec<u8>`-Feld.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(bytes))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
}

/// Kodiert Bytes als Base64-String
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Dekodiert einen Base64-String
pub fn decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(s.as_bytes())
}
