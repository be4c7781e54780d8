//! Signierte Payload-Umschlaege
//!
//! Jeder Payload traegt seinen Provenienz-Datensatz und eine Ed25519-Signatur
//! des Erstellers ueber Provenienz und Daten. Der Umschlag wird als JSON
//! serialisiert und mit dem Content-Key versiegelt; die KeyId steckt in der
//! AAD. Der Relay kann so weder Inhalt lesen noch Autorenschaft faelschen.

use serde::{Deserialize, Serialize};
use tresor_protocol::ProvenanceRecord;

use super::decrypt::decrypt_with_key;
use super::encrypt::encrypt_with_key;
use crate::error::{CryptoError, CryptoResult};
use crate::identity::{Identity, PublicIdentity};
use crate::types::{ContentKey, EncryptedPayload, Nonce};

const SIGNATUR_DOMAIN: &[u8] = b"tresor-payload-v1";

#[derive(Debug, Serialize, Deserialize)]
struct SignedEnvelope {
    provenance: ProvenanceRecord,
    #[serde(with = "tresor_protocol::b64")]
    data: Vec<u8>,
    #[serde(with = "tresor_protocol::b64")]
    signature: Vec<u8>,
}

/// Geoeffneter und verifizierter Payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPayload {
    pub provenance: ProvenanceRecord,
    pub data: Vec<u8>,
}

fn signatur_bytes(provenance: &ProvenanceRecord, data: &[u8]) -> CryptoResult<Vec<u8>> {
    let prov = serde_json::to_vec(provenance)?;
    let mut out = Vec::with_capacity(SIGNATUR_DOMAIN.len() + 8 + prov.len() + data.len());
    out.extend_from_slice(SIGNATUR_DOMAIN);
    out.extend_from_slice(&(prov.len() as u32).to_be_bytes());
    out.extend_from_slice(&prov);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    Ok(out)
}

/// Signiert und versiegelt einen Payload
///
/// Der Ersteller im Provenienz-Datensatz muss zur signierenden Identitaet
/// passen.
pub fn seal_payload(
    data: &[u8],
    provenance: &ProvenanceRecord,
    identity: &Identity,
    key: &ContentKey,
) -> CryptoResult<Vec<u8>> {
    if provenance.creator_pub_key != identity.public_identity().to_base58() {
        return Err(CryptoError::UngueltigeDaten(
            "Provenienz-Ersteller passt nicht zur signierenden Identitaet".to_string(),
        ));
    }

    let signature = identity.sign(&signatur_bytes(provenance, data)?);
    let envelope = SignedEnvelope {
        provenance: provenance.clone(),
        data: data.to_vec(),
        signature,
    };
    let plaintext = serde_json::to_vec(&envelope)?;
    Ok(encrypt_with_key(&plaintext, key, Nonce::zufaellig())?.to_bytes())
}

/// Oeffnet einen versiegelten Payload und prueft die Ersteller-Signatur
pub fn open_payload(bytes: &[u8], key: &ContentKey) -> CryptoResult<OpenedPayload> {
    let payload = EncryptedPayload::from_bytes(bytes)
        .ok_or_else(|| CryptoError::UngueltigeDaten("Ungueltige Payload-Struktur".to_string()))?;
    let plaintext = decrypt_with_key(&payload, key)?;
    let envelope: SignedEnvelope = serde_json::from_slice(&plaintext)?;

    let creator = PublicIdentity::from_base58(&envelope.provenance.creator_pub_key)?;
    let signed = signatur_bytes(&envelope.provenance, &envelope.data)?;
    if !creator.verify(&signed, &envelope.signature) {
        tracing::warn!(
            ersteller = %envelope.provenance.creator_user_id,
            resource = %envelope.provenance.resource_id,
            "Payload-Signatur ungueltig"
        );
        return Err(CryptoError::SignaturVerifikation(format!(
            "Payload von {} nicht authentisch",
            envelope.provenance.creator_user_id
        )));
    }

    Ok(OpenedPayload {
        provenance: envelope.provenance,
        data: envelope.data,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e2e::encrypt::encrypt_frame;
    use crate::types::KeySchema;
    use tresor_core::types::{ContextId, ResourceId, UserId};
    use tresor_protocol::RelayIdentity;

    fn provenienz(identity: &Identity) -> ProvenanceRecord {
        ProvenanceRecord {
            creator_user_id: UserId::new("alice"),
            creator_pub_key: identity.public_identity().to_base58(),
            context_id: ContextId::new("ctx"),
            resource_id: ResourceId::new("doc-1"),
            timestamp: 1_700_000_000_000,
            random_id: "zufall".into(),
            container_id: None,
            container_resource_id: None,
            relay_identity: RelayIdentity::new("wss://relay"),
        }
    }

    #[test]
    fn versiegeln_und_oeffnen() {
        let alice = Identity::generate();
        let key = ContentKey::generate(KeySchema::AKTUELL);
        let prov = provenienz(&alice);

        let sealed = seal_payload(b"geheimer Inhalt", &prov, &alice, &key).unwrap();
        let opened = open_payload(&sealed, &key).unwrap();
        assert_eq!(opened.data, b"geheimer Inhalt");
        assert_eq!(opened.provenance, prov);
    }

    #[test]
    fn fremde_identitaet_darf_nicht_versiegeln() {
        let alice = Identity::generate();
        let mallory = Identity::generate();
        let key = ContentKey::generate(KeySchema::AKTUELL);
        assert!(seal_payload(b"x", &provenienz(&alice), &mallory, &key).is_err());
    }

    #[test]
    fn gefaelschte_autorenschaft_wird_erkannt() {
        // Wer den Content-Key kennt, kann einen Umschlag mit fremder
        // Provenienz bauen, aber nicht gueltig signieren.
        let alice = Identity::generate();
        let mallory = Identity::generate();
        let key = ContentKey::generate(KeySchema::AKTUELL);

        let envelope = SignedEnvelope {
            provenance: provenienz(&alice),
            data: b"untergeschoben".to_vec(),
            signature: mallory.sign(b"beliebig"),
        };
        let plaintext = serde_json::to_vec(&envelope).unwrap();
        let sealed = encrypt_frame(&plaintext, &key, 0).unwrap().to_bytes();

        assert!(matches!(
            open_payload(&sealed, &key),
            Err(CryptoError::SignaturVerifikation(_))
        ));
    }

    #[test]
    fn falscher_schluessel_schlaegt_fehl() {
        let alice = Identity::generate();
        let key = ContentKey::generate(KeySchema::AKTUELL);
        let anderer = ContentKey::generate(KeySchema::AKTUELL);
        let sealed = seal_payload(b"x", &provenienz(&alice), &alice, &key).unwrap();
        assert!(open_payload(&sealed, &anderer).is_err());
    }
}
