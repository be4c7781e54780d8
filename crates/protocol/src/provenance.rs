//! Provenienz-Datensaetze und Verifikations-Anfragen
//!
//! Ein `ProvenanceRecord` wird in jeden verschluesselten Payload und jedes
//! eingewickelte Schluessel-Paket eingebettet und danach nie veraendert.

use serde::{Deserialize, Serialize};
use tresor_core::types::{ContextId, ResourceId, UserId};

/// Identitaet des Relays, ueber den ein Datensatz erstellt wurde
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayIdentity {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

impl RelayIdentity {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pub_key: None,
            instance_id: None,
        }
    }
}

/// Herkunftsnachweis eines Payloads oder Schluessel-Pakets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    pub creator_user_id: UserId,
    /// Base58 der DER-kodierten SubjectPublicKeyInfo (Ed25519)
    pub creator_pub_key: String,
    pub context_id: ContextId,
    pub resource_id: ResourceId,
    /// Unix-Zeit in Millisekunden
    pub timestamp: i64,
    pub random_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_resource_id: Option<String>,
    pub relay_identity: RelayIdentity,
}

impl ProvenanceRecord {
    /// Baut die Verifikations-Anfrage fuer den Ersteller dieses Datensatzes
    pub fn verification_request(&self) -> VerificationRequest {
        VerificationRequest {
            context_id: self.context_id.clone(),
            sender_id: self.creator_user_id.clone(),
            sender_pub_key: self.creator_pub_key.clone(),
            timestamp: self.timestamp,
            relay_identity: self.relay_identity.clone(),
        }
    }
}

/// Anfrage an den externen Authentizitaets-Pruefer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub context_id: ContextId,
    pub sender_id: UserId,
    pub sender_pub_key: String,
    pub timestamp: i64,
    pub relay_identity: RelayIdentity,
}

/// Unverschluesselte Metadaten, die der Relay zu jedem Datensatz liefert
///
/// Der Relay kann diese Felder frei setzen; `assert_binding` prueft sie
/// gegen den signierten Provenienz-Datensatz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEnvelope {
    pub context_id: ContextId,
    pub resource_id: ResourceId,
    pub last_modifier_id: UserId,
    /// Unix-Zeit in Millisekunden
    pub last_modification_date: i64,
}
