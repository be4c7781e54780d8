//! Schluessel-Eintraege und Container-Schluessel-Saetze
//!
//! Ein `WrappedKeyEntry` existiert pro Mitglied und Schluessel-Generation.
//! Das Schluessel-Material eines Containers ist die Liste aller Eintraege
//! plus die aktive `keyId`.

use serde::{Deserialize, Serialize};
use tresor_core::types::{KeyId, KeyLocation, UserId};

use crate::error::WireResult;

// ---------------------------------------------------------------------------
// WrappedKeyEntry
// ---------------------------------------------------------------------------

/// Eingewickelter Content-Key fuer genau ein Mitglied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKeyEntry {
    pub user_id: UserId,
    /// Generation, die dieser Eintrag oeffnet
    pub key_id: KeyId,
    /// `[eph_pub 32][nonce 12][ciphertext]`
    #[serde(with = "crate::b64")]
    pub wrapped_key: Vec<u8>,
    pub schema_version: u32,
}

impl WrappedKeyEntry {
    /// Sucht den Eintrag eines Benutzers fuer eine bestimmte Generation
    pub fn finden<'a>(
        entries: &'a [WrappedKeyEntry],
        user_id: &UserId,
        key_id: &KeyId,
    ) -> Option<&'a WrappedKeyEntry> {
        entries
            .iter()
            .find(|e| &e.user_id == user_id && &e.key_id == key_id)
    }
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// Mitglied eines Containers mit seinem oeffentlichen Langzeit-Schluessel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: UserId,
    /// Base58 der DER-kodierten SubjectPublicKeyInfo (Ed25519)
    pub public_key: String,
}

impl Member {
    pub fn new(user_id: UserId, public_key: impl Into<String>) -> Self {
        Self {
            user_id,
            public_key: public_key.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContainerKeySet
// ---------------------------------------------------------------------------

/// Schluessel-Satz eines Containers wie ihn der Relay liefert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerKeySet {
    /// Aktive Generation
    pub key_id: KeyId,
    pub keys: Vec<WrappedKeyEntry>,
}

impl ContainerKeySet {
    /// Alle Generationen, fuer die es mindestens einen Eintrag gibt
    pub fn generationen(&self) -> Vec<KeyId> {
        let mut ids: Vec<KeyId> = Vec::new();
        for entry in &self.keys {
            if !ids.contains(&entry.key_id) {
                ids.push(entry.key_id.clone());
            }
        }
        ids
    }

    pub fn to_json(&self) -> WireResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> WireResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

// ---------------------------------------------------------------------------
// MembershipUpdate
// ---------------------------------------------------------------------------

/// Atomare Aktualisierung von Mitgliedschaft und Schluessel-Satz
///
/// `entries` enthaelt die vollstaendige Liste (bestehende plus neue
/// Eintraege). Der Relay ersetzt den Schluessel-Satz in einem Schritt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipUpdate {
    pub location: KeyLocation,
    pub key_id: KeyId,
    pub entries: Vec<WrappedKeyEntry>,
    pub members: Vec<UserId>,
    /// `true` wenn eine neue Generation erzeugt wurde
    pub rotated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eintrag(user: &str, key: &str) -> WrappedKeyEntry {
        WrappedKeyEntry {
            user_id: UserId::new(user),
            key_id: KeyId::new(key),
            wrapped_key: vec![1, 2, 3, 255],
            schema_version: 2,
        }
    }

    #[test]
    fn eintrag_json_format() {
        let json = serde_json::to_value(eintrag("alice", "k1")).unwrap();
        assert_eq!(json["userId"], "alice");
        assert_eq!(json["keyId"], "k1");
        assert_eq!(json["wrappedKey"], "AQID/w==");
        assert_eq!(json["schemaVersion"], 2);
    }

    #[test]
    fn ungueltiges_base64_wird_abgelehnt() {
        let json = r#"{"userId":"a","keyId":"k","wrappedKey":"!!!","schemaVersion":2}"#;
        assert!(serde_json::from_str::<WrappedKeyEntry>(json).is_err());
    }

    #[test]
    fn eintrag_finden_nach_generation() {
        let entries = vec![eintrag("alice", "k1"), eintrag("alice", "k2")];
        let gefunden =
            WrappedKeyEntry::finden(&entries, &UserId::new("alice"), &KeyId::new("k2")).unwrap();
        assert_eq!(gefunden.key_id, KeyId::new("k2"));
        assert!(
            WrappedKeyEntry::finden(&entries, &UserId::new("bob"), &KeyId::new("k1")).is_none()
        );
    }

    #[test]
    fn generationen_in_reihenfolge() {
        let set = ContainerKeySet {
            key_id: KeyId::new("k2"),
            keys: vec![eintrag("a", "k1"), eintrag("b", "k1"), eintrag("a", "k2")],
        };
        assert_eq!(set.generationen(), vec![KeyId::new("k1"), KeyId::new("k2")]);
    }
}
