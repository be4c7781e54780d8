//! Key Provider
//!
//! Erzeugt Content-Keys und Container-Secrets, wickelt sie pro Mitglied ein
//! und loest eigene Eintraege wieder auf.
//!
//! ## Schluessel-Paket
//! Eingewickelt wird nicht nur das Schluessel-Material, sondern ein
//! `KeyPackage` (JSON) mit KeyId, Schema, Location, optionaler
//! Secret-Bindung und dem Provenienz-Datensatz des Erstellers. Das Paket
//! ist mit dem Ed25519-Schluessel des Erstellers signiert; wer nur den
//! oeffentlichen Schluessel eines Empfaengers kennt, kann Eintraege bauen,
//! aber keine fremde Autorenschaft behaupten.
//!
//! ## AAD
//! ```text
//! "tresor-entry-v1" [schema(4)] [location] [key_id_len(4)] [key_id] [user_len(4)] [user]
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tresor_core::types::{KeyId, KeyLocation, UserId};
use tresor_crypto::{
    unwrap_for_recipient, wrap_for_recipient, ContainerSecret, ContentKey, CryptoError, Identity,
    KeySchema, PublicIdentity,
};
use tresor_protocol::{Member, ProvenanceRecord, StatusCode, VerificationRequest, WrappedKeyEntry};

use crate::error::{EngineError, EngineResult};
use crate::verifier::VerifierHandle;

const AAD_DOMAIN: &[u8] = b"tresor-entry-v1";
const SECRET_DOMAIN: &[u8] = b"tresor-secret-v1";
const PAKET_DOMAIN: &[u8] = b"tresor-key-package-v1";

// ---------------------------------------------------------------------------
// Anfrage- und Ergebnistypen
// ---------------------------------------------------------------------------

/// Welche Generationen einer Location aufgeloest werden sollen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyIdSelector {
    One(KeyId),
    Many(Vec<KeyId>),
}

impl KeyIdSelector {
    fn ids(&self) -> &[KeyId] {
        match self {
            Self::One(id) => std::slice::from_ref(id),
            Self::Many(ids) => ids,
        }
    }
}

/// Eine Anfrage innerhalb von `resolve_and_verify`
#[derive(Debug, Clone)]
pub struct KeyResolutionRequest {
    pub entries: Vec<WrappedKeyEntry>,
    pub key_ids: KeyIdSelector,
    pub location: KeyLocation,
    pub expected_secret: Option<ContainerSecret>,
    /// Ersteller muss dieses Mitglied sein (Benutzer und Schluessel)
    pub expected_creator: Option<Member>,
}

/// Ergebnis pro angefragter Generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResolution {
    Resolved(ContentKey),
    Failed(StatusCode),
}

impl KeyResolution {
    pub fn key(&self) -> Option<&ContentKey> {
        match self {
            Self::Resolved(key) => Some(key),
            Self::Failed(_) => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Resolved(_) => None,
            Self::Failed(status) => Some(*status),
        }
    }
}

/// `KeyLocation -> (KeyId -> KeyResolution)`
pub type ResolutionMap = HashMap<KeyLocation, HashMap<KeyId, KeyResolution>>;

/// Inhalt eines eingewickelten Eintrags
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPackage {
    key_id: KeyId,
    #[serde(with = "tresor_protocol::b64")]
    key: Vec<u8>,
    schema_version: u32,
    location: KeyLocation,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_b64")]
    secret_binding: Option<Vec<u8>>,
    provenance: ProvenanceRecord,
}

impl Drop for KeyPackage {
    fn drop(&mut self) {
        self.key.iter_mut().for_each(|b| *b = 0);
    }
}

/// Signiertes Paket, so wie es eingewickelt wird
#[derive(Serialize, Deserialize)]
struct SignedKeyPackage {
    #[serde(with = "tresor_protocol::b64")]
    package: Vec<u8>,
    #[serde(with = "tresor_protocol::b64")]
    signature: Vec<u8>,
}

impl Drop for SignedKeyPackage {
    fn drop(&mut self) {
        self.package.iter_mut().for_each(|b| *b = 0);
    }
}

mod opt_b64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => s.serialize_some(&tresor_protocol::b64::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| tresor_protocol::b64::decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Erfolgreich ausgewickelter eigener Eintrag
struct Unwrapped {
    key: ContentKey,
    secret_binding: Option<Vec<u8>>,
    provenance: ProvenanceRecord,
}

// ---------------------------------------------------------------------------
// KeyProvider
// ---------------------------------------------------------------------------

/// Erzeugt, verteilt und loest Content-Keys fuer den lokalen Benutzer auf
pub struct KeyProvider {
    user_id: UserId,
    identity: Arc<Identity>,
    verifier: VerifierHandle,
    aktuelles_schema: KeySchema,
}

impl KeyProvider {
    pub fn new(
        user_id: UserId,
        identity: Arc<Identity>,
        verifier: VerifierHandle,
        aktuelles_schema: KeySchema,
    ) -> Self {
        Self {
            user_id,
            identity,
            verifier,
            aktuelles_schema,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn aktuelles_schema(&self) -> KeySchema {
        self.aktuelles_schema
    }

    /// Neuer zufaelliger Schluessel mit frischer KeyId und aktuellem Schema
    pub fn generate_key(&self) -> ContentKey {
        ContentKey::generate(self.aktuelles_schema)
    }

    pub fn generate_secret(&self) -> ContainerSecret {
        ContainerSecret::generate()
    }

    /// Wickelt `key` fuer jeden Benutzer ein
    ///
    /// Ein ungueltiger oeffentlicher Schluessel laesst den gesamten Aufruf
    /// fehlschlagen, bevor irgendein Eintrag erzeugt wird. Der Ersteller in
    /// `provenance` muss die eigene Identitaet sein, da sie das Paket signiert.
    pub fn wrap_for_users(
        &self,
        users: &[Member],
        key: &ContentKey,
        provenance: &ProvenanceRecord,
        location: &KeyLocation,
        secret: Option<&ContainerSecret>,
    ) -> EngineResult<Vec<WrappedKeyEntry>> {
        if provenance.creator_pub_key != self.identity.public_identity().to_base58() {
            return Err(CryptoError::UngueltigeDaten(
                "Provenienz-Ersteller passt nicht zur signierenden Identitaet".to_string(),
            )
            .into());
        }
        let empfaenger = users
            .iter()
            .map(|m| {
                PublicIdentity::from_base58(&m.public_key)
                    .map(|pk| (m, pk))
                    .map_err(|e| EngineError::UngueltigerSchluessel {
                        user_id: m.user_id.clone(),
                        grund: e.to_string(),
                    })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let package = KeyPackage {
            key_id: key.key_id.clone(),
            key: key.key.as_bytes().to_vec(),
            schema_version: key.schema.version(),
            location: location.clone(),
            secret_binding: secret.map(|s| secret_binding(s, &key.key_id, location)),
            provenance: provenance.clone(),
        };
        let paket = serde_json::to_vec(&package).map_err(CryptoError::from)?;
        let signiert = SignedKeyPackage {
            signature: self.identity.sign(&paket_signatur_bytes(&paket)),
            package: paket,
        };
        let plaintext = serde_json::to_vec(&signiert).map_err(CryptoError::from)?;

        let mut entries = Vec::with_capacity(empfaenger.len());
        for (member, pk) in empfaenger {
            let aad = entry_aad(key.schema.version(), location, &key.key_id, &member.user_id);
            let wrapped_key = wrap_for_recipient(&plaintext, &pk.x25519(), &aad)?;
            entries.push(WrappedKeyEntry {
                user_id: member.user_id.clone(),
                key_id: key.key_id.clone(),
                wrapped_key,
                schema_version: key.schema.version(),
            });
        }

        tracing::debug!(
            location = %location,
            key_id = %key.key_id,
            anzahl = entries.len(),
            "Schluessel eingewickelt"
        );
        Ok(entries)
    }

    /// Wie `wrap_for_users`, aber nur fuer Benutzer ohne Eintrag fuer `key.key_id`
    pub fn wrap_missing_for_users(
        &self,
        existing: &[WrappedKeyEntry],
        new_users: &[Member],
        key: &ContentKey,
        provenance: &ProvenanceRecord,
        location: &KeyLocation,
        secret: Option<&ContainerSecret>,
    ) -> EngineResult<Vec<WrappedKeyEntry>> {
        let vorhanden: HashSet<&UserId> = existing
            .iter()
            .filter(|e| e.key_id == key.key_id)
            .map(|e| &e.user_id)
            .collect();
        let fehlend: Vec<Member> = new_users
            .iter()
            .filter(|m| !vorhanden.contains(&m.user_id))
            .cloned()
            .collect();
        if fehlend.is_empty() {
            return Ok(Vec::new());
        }
        self.wrap_for_users(&fehlend, key, provenance, location, secret)
    }

    /// Prueft die Secret-Bindung der eigenen Eintraege
    ///
    /// `true` nur wenn es mindestens einen eigenen Eintrag gibt und jeder
    /// eigene Eintrag auswickelbar und an `expected` gebunden ist. Schlaegt
    /// nie fehl.
    pub fn verify_secret(
        &self,
        entries: &[WrappedKeyEntry],
        location: &KeyLocation,
        expected: &ContainerSecret,
    ) -> bool {
        let mut gesehen = false;
        for entry in entries.iter().filter(|e| e.user_id == self.user_id) {
            gesehen = true;
            match self.unwrap_entry(entry, location) {
                Ok(u) if secret_passt(&u, expected, location) => {}
                _ => {
                    tracing::warn!(
                        location = %location,
                        key_id = %entry.key_id,
                        "Secret-Bindung stimmt nicht"
                    );
                    return false;
                }
            }
        }
        gesehen
    }

    /// Loest eigene Eintraege fuer mehrere Locations auf und prueft die
    /// Ersteller gesammelt in einem Verifier-Batch
    ///
    /// Pro Element wird ein `StatusCode` geliefert; nur Verifier-Fehler und
    /// Protokollverletzungen des Verifiers lassen den gesamten Batch scheitern.
    pub async fn resolve_and_verify(
        &self,
        batch: Vec<KeyResolutionRequest>,
    ) -> EngineResult<ResolutionMap> {
        let mut ergebnis: ResolutionMap = HashMap::new();
        let mut offen: Vec<(KeyLocation, ContentKey)> = Vec::new();
        let mut anfragen: Vec<VerificationRequest> = Vec::new();

        for request in &batch {
            for key_id in request.key_ids.ids() {
                let aufgeloest = self
                    .find_and_unwrap(&request.entries, key_id, &request.location)
                    .and_then(|u| match &request.expected_secret {
                        Some(secret) if !secret_passt(&u, secret, &request.location) => {
                            Err(StatusCode::SecretMismatch)
                        }
                        _ => Ok(u),
                    })
                    .and_then(|u| match &request.expected_creator {
                        Some(m) if !ersteller_passt(&u.provenance, m) => {
                            Err(StatusCode::CreatorMismatch)
                        }
                        _ => Ok(u),
                    });

                match aufgeloest {
                    Ok(u) => {
                        anfragen.push(u.provenance.verification_request());
                        offen.push((request.location.clone(), u.key));
                    }
                    Err(status) => {
                        tracing::debug!(
                            location = %request.location,
                            key_id = %key_id,
                            status = %status,
                            "Schluessel nicht aufgeloest"
                        );
                        ergebnis
                            .entry(request.location.clone())
                            .or_default()
                            .insert(key_id.clone(), KeyResolution::Failed(status));
                    }
                }
            }
        }

        let antworten = self.verifier.verify(&anfragen).await?;
        for ((location, key), akzeptiert) in offen.into_iter().zip(antworten) {
            let resolution = if akzeptiert {
                KeyResolution::Resolved(key.clone())
            } else {
                tracing::warn!(location = %location, key_id = %key.key_id, "Ersteller abgelehnt");
                KeyResolution::Failed(StatusCode::VerificationRejected)
            };
            ergebnis
                .entry(location)
                .or_default()
                .insert(key.key_id.clone(), resolution);
        }
        Ok(ergebnis)
    }

    /// Einzelpfad ohne Secret-Bindung und ohne Verifier (die Paket-Signatur
    /// wird trotzdem geprueft)
    pub fn resolve_one(
        &self,
        entries: &[WrappedKeyEntry],
        key_id: &KeyId,
        location: &KeyLocation,
    ) -> EngineResult<ContentKey> {
        if let Some(entry) = WrappedKeyEntry::finden(entries, &self.user_id, key_id) {
            KeySchema::from_version(entry.schema_version)
                .map_err(|_| EngineError::UnbekanntesSchema(entry.schema_version))?;
        }
        self.find_and_unwrap(entries, key_id, location)
            .map(|u| u.key)
            .map_err(|status| EngineError::Aufloesung {
                location: location.clone(),
                key_id: key_id.clone(),
                status,
            })
    }

    // -----------------------------------------------------------------------
    // intern
    // -----------------------------------------------------------------------

    fn find_and_unwrap(
        &self,
        entries: &[WrappedKeyEntry],
        key_id: &KeyId,
        location: &KeyLocation,
    ) -> Result<Unwrapped, StatusCode> {
        let entry = WrappedKeyEntry::finden(entries, &self.user_id, key_id)
            .ok_or(StatusCode::KeyEntryMissing)?;
        self.unwrap_entry(entry, location)
    }

    fn unwrap_entry(
        &self,
        entry: &WrappedKeyEntry,
        location: &KeyLocation,
    ) -> Result<Unwrapped, StatusCode> {
        let schema =
            KeySchema::from_version(entry.schema_version).map_err(|_| StatusCode::UnknownSchema)?;
        let aad = entry_aad(entry.schema_version, location, &entry.key_id, &entry.user_id);
        let plaintext =
            unwrap_for_recipient(&entry.wrapped_key, &self.identity.x25519_secret(), &aad)
                .map_err(|_| StatusCode::UnwrapFailed)?;
        let signiert: SignedKeyPackage =
            serde_json::from_slice(plaintext.as_bytes()).map_err(|_| StatusCode::UnwrapFailed)?;
        let mut package: KeyPackage =
            serde_json::from_slice(&signiert.package).map_err(|_| StatusCode::UnwrapFailed)?;

        let echt = PublicIdentity::from_base58(&package.provenance.creator_pub_key)
            .map(|pk| pk.verify(&paket_signatur_bytes(&signiert.package), &signiert.signature))
            .unwrap_or(false);
        if !echt {
            tracing::warn!(
                location = %location,
                key_id = %entry.key_id,
                ersteller = %package.provenance.creator_user_id,
                "Schluessel-Paket nicht vom angegebenen Ersteller signiert"
            );
            return Err(StatusCode::InvalidSignature);
        }

        if &package.location != location {
            return Err(StatusCode::LocationMismatch);
        }
        if package.key_id != entry.key_id || package.schema_version != entry.schema_version {
            return Err(StatusCode::UnwrapFailed);
        }

        let key = ContentKey::from_parts(
            package.key_id.clone(),
            std::mem::take(&mut package.key),
            schema,
        )
        .map_err(|_| StatusCode::UnwrapFailed)?;
        Ok(Unwrapped {
            key,
            secret_binding: package.secret_binding.take(),
            provenance: package.provenance.clone(),
        })
    }
}

/// AAD eines Eintrags: Schema, Location, KeyId und Empfaenger
fn entry_aad(
    schema_version: u32,
    location: &KeyLocation,
    key_id: &KeyId,
    user_id: &UserId,
) -> Vec<u8> {
    let mut aad = Vec::new();
    aad.extend_from_slice(AAD_DOMAIN);
    aad.extend_from_slice(&schema_version.to_be_bytes());
    aad.extend_from_slice(&location.to_bytes());
    aad.extend_from_slice(&(key_id.as_str().len() as u32).to_be_bytes());
    aad.extend_from_slice(key_id.as_str().as_bytes());
    aad.extend_from_slice(&(user_id.as_str().len() as u32).to_be_bytes());
    aad.extend_from_slice(user_id.as_str().as_bytes());
    aad
}

/// `SHA-256("tresor-secret-v1" || secret || key_id || location)`
fn secret_binding(secret: &ContainerSecret, key_id: &KeyId, location: &KeyLocation) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(SECRET_DOMAIN);
    hasher.update(secret.as_bytes());
    hasher.update((key_id.as_str().len() as u32).to_be_bytes());
    hasher.update(key_id.as_str().as_bytes());
    hasher.update(location.to_bytes());
    hasher.finalize().to_vec()
}

/// Eintrag fuer `empfaenger`, dessen Paket `behauptet` als Ersteller nennt,
/// aber von `faelscher` signiert ist
#[cfg(test)]
pub(crate) fn gefaelschter_eintrag(
    faelscher: &Identity,
    behauptet: &ProvenanceRecord,
    empfaenger: &Member,
    key: &ContentKey,
    location: &KeyLocation,
) -> WrappedKeyEntry {
    let package = KeyPackage {
        key_id: key.key_id.clone(),
        key: key.key.as_bytes().to_vec(),
        schema_version: key.schema.version(),
        location: location.clone(),
        secret_binding: None,
        provenance: behauptet.clone(),
    };
    let paket = serde_json::to_vec(&package).unwrap();
    let signiert = SignedKeyPackage {
        signature: faelscher.sign(&paket_signatur_bytes(&paket)),
        package: paket,
    };
    let pk = PublicIdentity::from_base58(&empfaenger.public_key).unwrap();
    let aad = entry_aad(key.schema.version(), location, &key.key_id, &empfaenger.user_id);
    let plaintext = serde_json::to_vec(&signiert).unwrap();
    WrappedKeyEntry {
        user_id: empfaenger.user_id.clone(),
        key_id: key.key_id.clone(),
        wrapped_key: wrap_for_recipient(&plaintext, &pk.x25519(), &aad).unwrap(),
        schema_version: key.schema.version(),
    }
}

fn paket_signatur_bytes(package: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PAKET_DOMAIN.len() + package.len());
    out.extend_from_slice(PAKET_DOMAIN);
    out.extend_from_slice(package);
    out
}

fn ersteller_passt(provenance: &ProvenanceRecord, erwartet: &Member) -> bool {
    provenance.creator_user_id == erwartet.user_id
        && provenance.creator_pub_key == erwartet.public_key
}

fn secret_passt(u: &Unwrapped, expected: &ContainerSecret, location: &KeyLocation) -> bool {
    match &u.secret_binding {
        Some(binding) => *binding == secret_binding(expected, &u.key.key_id, location),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::UserVerifier;
    use async_trait::async_trait;
    use tresor_core::types::{ContextId, ResourceId};
    use tresor_protocol::RelayIdentity;

    struct Teilnehmer {
        provider: KeyProvider,
        member: Member,
    }

    fn teilnehmer(name: &str, verifier: VerifierHandle) -> Teilnehmer {
        let identity = Arc::new(Identity::generate());
        let member = Member::new(UserId::new(name), identity.public_identity().to_base58());
        Teilnehmer {
            provider: KeyProvider::new(UserId::new(name), identity, verifier, KeySchema::AKTUELL),
            member,
        }
    }

    fn ort(res: &str) -> KeyLocation {
        KeyLocation::new(ContextId::new("ctx"), ResourceId::new(res))
    }

    fn provenienz(t: &Teilnehmer, location: &KeyLocation) -> ProvenanceRecord {
        ProvenanceRecord {
            creator_user_id: t.member.user_id.clone(),
            creator_pub_key: t.member.public_key.clone(),
            context_id: location.context_id.clone(),
            resource_id: location.resource_id.clone(),
            timestamp: 1_700_000_000_000,
            random_id: "r".into(),
            container_id: None,
            container_resource_id: None,
            relay_identity: RelayIdentity::new("wss://relay"),
        }
    }

    fn anfrage(
        entries: &[WrappedKeyEntry],
        key_id: &KeyId,
        location: &KeyLocation,
        secret: Option<&ContainerSecret>,
    ) -> KeyResolutionRequest {
        KeyResolutionRequest {
            entries: entries.to_vec(),
            key_ids: KeyIdSelector::One(key_id.clone()),
            location: location.clone(),
            expected_secret: secret.cloned(),
            expected_creator: None,
        }
    }

    struct LehntAllesAb;

    #[async_trait]
    impl UserVerifier for LehntAllesAb {
        async fn verify(&self, r: &[VerificationRequest]) -> anyhow::Result<Vec<bool>> {
            Ok(vec![false; r.len()])
        }
    }

    struct ZuKurz;

    #[async_trait]
    impl UserVerifier for ZuKurz {
        async fn verify(&self, _: &[VerificationRequest]) -> anyhow::Result<Vec<bool>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn mitglieder_loesen_auf_nicht_mitglieder_nicht() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let bob = teilnehmer("bob", VerifierHandle::default());
        let eve = teilnehmer("eve", VerifierHandle::default());
        let loc = ort("doc");
        let secret = alice.provider.generate_secret();
        let key = alice.provider.generate_key();

        let entries = alice
            .provider
            .wrap_for_users(
                &[alice.member.clone(), bob.member.clone()],
                &key,
                &provenienz(&alice, &loc),
                &loc,
                Some(&secret),
            )
            .unwrap();
        assert_eq!(entries.len(), 2);

        for t in [&alice, &bob] {
            let map = t
                .provider
                .resolve_and_verify(vec![anfrage(&entries, &key.key_id, &loc, Some(&secret))])
                .await
                .unwrap();
            assert_eq!(map[&loc][&key.key_id], KeyResolution::Resolved(key.clone()));
        }

        let map = eve
            .provider
            .resolve_and_verify(vec![anfrage(&entries, &key.key_id, &loc, Some(&secret))])
            .await
            .unwrap();
        assert_eq!(
            map[&loc][&key.key_id],
            KeyResolution::Failed(StatusCode::KeyEntryMissing)
        );
    }

    #[tokio::test]
    async fn falsches_secret_liefert_secret_mismatch() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let loc = ort("doc");
        let key = alice.provider.generate_key();
        let secret = alice.provider.generate_secret();
        let entries = alice
            .provider
            .wrap_for_users(
                &[alice.member.clone()],
                &key,
                &provenienz(&alice, &loc),
                &loc,
                Some(&secret),
            )
            .unwrap();

        let fremd = alice.provider.generate_secret();
        let map = alice
            .provider
            .resolve_and_verify(vec![anfrage(&entries, &key.key_id, &loc, Some(&fremd))])
            .await
            .unwrap();
        assert_eq!(
            map[&loc][&key.key_id].status(),
            Some(StatusCode::SecretMismatch)
        );

        assert!(alice.provider.verify_secret(&entries, &loc, &secret));
        assert!(!alice.provider.verify_secret(&entries, &loc, &fremd));
        // Ohne eigenen Eintrag gibt es nichts zu bestaetigen
        assert!(!alice.provider.verify_secret(&[], &loc, &secret));
    }

    #[tokio::test]
    async fn eintrag_einer_anderen_ressource_oeffnet_nicht() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let loc_a = ort("a");
        let loc_b = ort("b");
        let key = alice.provider.generate_key();
        let entries = alice
            .provider
            .wrap_for_users(
                &[alice.member.clone()],
                &key,
                &provenienz(&alice, &loc_a),
                &loc_a,
                None,
            )
            .unwrap();

        let map = alice
            .provider
            .resolve_and_verify(vec![anfrage(&entries, &key.key_id, &loc_b, None)])
            .await
            .unwrap();
        assert_eq!(map[&loc_b][&key.key_id].status(), Some(StatusCode::UnwrapFailed));
        assert!(alice.provider.resolve_one(&entries, &key.key_id, &loc_b).is_err());
        assert_eq!(
            alice.provider.resolve_one(&entries, &key.key_id, &loc_a).unwrap(),
            key
        );
    }

    #[tokio::test]
    async fn unbekanntes_schema() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let loc = ort("doc");
        let key = alice.provider.generate_key();
        let mut entries = alice
            .provider
            .wrap_for_users(&[alice.member.clone()], &key, &provenienz(&alice, &loc), &loc, None)
            .unwrap();
        entries[0].schema_version = 99;

        let map = alice
            .provider
            .resolve_and_verify(vec![anfrage(&entries, &key.key_id, &loc, None)])
            .await
            .unwrap();
        assert_eq!(map[&loc][&key.key_id].status(), Some(StatusCode::UnknownSchema));
        assert!(matches!(
            alice.provider.resolve_one(&entries, &key.key_id, &loc),
            Err(EngineError::UnbekanntesSchema(99))
        ));
    }

    #[tokio::test]
    async fn abgelehnter_ersteller() {
        let alice = teilnehmer("alice", VerifierHandle::new(Arc::new(LehntAllesAb)));
        let loc = ort("doc");
        let key = alice.provider.generate_key();
        let entries = alice
            .provider
            .wrap_for_users(&[alice.member.clone()], &key, &provenienz(&alice, &loc), &loc, None)
            .unwrap();

        let map = alice
            .provider
            .resolve_and_verify(vec![anfrage(&entries, &key.key_id, &loc, None)])
            .await
            .unwrap();
        assert_eq!(
            map[&loc][&key.key_id].status(),
            Some(StatusCode::VerificationRejected)
        );
    }

    #[tokio::test]
    async fn verifier_laengenfehler_laesst_batch_scheitern() {
        let alice = teilnehmer("alice", VerifierHandle::new(Arc::new(ZuKurz)));
        let loc = ort("doc");
        let key = alice.provider.generate_key();
        let entries = alice
            .provider
            .wrap_for_users(&[alice.member.clone()], &key, &provenienz(&alice, &loc), &loc, None)
            .unwrap();

        let result = alice
            .provider
            .resolve_and_verify(vec![anfrage(&entries, &key.key_id, &loc, None)])
            .await;
        assert!(matches!(
            result,
            Err(EngineError::MalformedVerifierResponse { .. })
        ));
    }

    #[test]
    fn ungueltiger_schluessel_laesst_alles_scheitern() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let loc = ort("doc");
        let key = alice.provider.generate_key();
        let kaputt = Member::new(UserId::new("mallory"), "kein-schluessel");

        let result = alice.provider.wrap_for_users(
            &[alice.member.clone(), kaputt],
            &key,
            &provenienz(&alice, &loc),
            &loc,
            None,
        );
        match result {
            Err(EngineError::UngueltigerSchluessel { user_id, .. }) => {
                assert_eq!(user_id, UserId::new("mallory"));
            }
            other => panic!("Erwartet UngueltigerSchluessel, erhalten {other:?}"),
        }
    }

    #[test]
    fn fehlende_eintraege_nur_fuer_neue() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let bob = teilnehmer("bob", VerifierHandle::default());
        let loc = ort("doc");
        let key = alice.provider.generate_key();
        let prov = provenienz(&alice, &loc);
        let existing = alice
            .provider
            .wrap_for_users(&[alice.member.clone()], &key, &prov, &loc, None)
            .unwrap();

        let neu = alice
            .provider
            .wrap_missing_for_users(
                &existing,
                &[alice.member.clone(), bob.member.clone()],
                &key,
                &prov,
                &loc,
                None,
            )
            .unwrap();
        assert_eq!(neu.len(), 1);
        assert_eq!(neu[0].user_id, UserId::new("bob"));
    }

    #[tokio::test]
    async fn mehrere_generationen_in_einem_batch() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let loc = ort("doc");
        let prov = provenienz(&alice, &loc);
        let k1 = alice.provider.generate_key();
        let k2 = alice.provider.generate_key();
        let mut entries = alice
            .provider
            .wrap_for_users(&[alice.member.clone()], &k1, &prov, &loc, None)
            .unwrap();
        entries.extend(
            alice
                .provider
                .wrap_for_users(&[alice.member.clone()], &k2, &prov, &loc, None)
                .unwrap(),
        );

        let fehlt = KeyId::new("gibt-es-nicht");
        let map = alice
            .provider
            .resolve_and_verify(vec![KeyResolutionRequest {
                entries,
                key_ids: KeyIdSelector::Many(vec![
                    k1.key_id.clone(),
                    k2.key_id.clone(),
                    fehlt.clone(),
                ]),
                location: loc.clone(),
                expected_secret: None,
                expected_creator: None,
            }])
            .await
            .unwrap();
        let eintraege = &map[&loc];
        assert_eq!(eintraege.len(), 3);
        assert_eq!(eintraege[&k1.key_id].key(), Some(&k1));
        assert_eq!(eintraege[&k2.key_id].key(), Some(&k2));
        assert_eq!(eintraege[&fehlt].status(), Some(StatusCode::KeyEntryMissing));
    }

    #[tokio::test]
    async fn fremd_signiertes_paket_wird_abgelehnt() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let bob = teilnehmer("bob", VerifierHandle::default());
        let mallory = teilnehmer("mallory", VerifierHandle::default());
        let loc = ort("doc");
        let key = mallory.provider.generate_key();

        // behauptet bob als Ersteller, signiert aber mit mallorys Schluessel
        let eintrag = gefaelschter_eintrag(
            &mallory.provider.identity,
            &provenienz(&bob, &loc),
            &alice.member,
            &key,
            &loc,
        );
        let map = alice
            .provider
            .resolve_and_verify(vec![anfrage(&[eintrag.clone()], &key.key_id, &loc, None)])
            .await
            .unwrap();
        assert_eq!(map[&loc][&key.key_id].status(), Some(StatusCode::InvalidSignature));
        assert!(matches!(
            alice.provider.resolve_one(&[eintrag], &key.key_id, &loc),
            Err(EngineError::Aufloesung { status: StatusCode::InvalidSignature, .. })
        ));
    }

    #[test]
    fn einwickeln_nur_mit_eigener_provenienz() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let bob = teilnehmer("bob", VerifierHandle::default());
        let loc = ort("doc");
        let key = alice.provider.generate_key();

        let result = alice.provider.wrap_for_users(
            &[alice.member.clone()],
            &key,
            &provenienz(&bob, &loc),
            &loc,
            None,
        );
        assert!(matches!(result, Err(EngineError::Krypto(_))));
    }

    #[tokio::test]
    async fn erwarteter_ersteller_muss_passen() {
        let alice = teilnehmer("alice", VerifierHandle::default());
        let bob = teilnehmer("bob", VerifierHandle::default());
        let loc = ort("doc");
        let key = bob.provider.generate_key();
        let entries = bob
            .provider
            .wrap_for_users(&[alice.member.clone()], &key, &provenienz(&bob, &loc), &loc, None)
            .unwrap();

        let mut von_alice = anfrage(&entries, &key.key_id, &loc, None);
        von_alice.expected_creator = Some(alice.member.clone());
        let mut von_bob = anfrage(&entries, &key.key_id, &loc, None);
        von_bob.expected_creator = Some(bob.member.clone());

        let map = alice.provider.resolve_and_verify(vec![von_alice]).await.unwrap();
        assert_eq!(map[&loc][&key.key_id].status(), Some(StatusCode::CreatorMismatch));
        let map = alice.provider.resolve_and_verify(vec![von_bob]).await.unwrap();
        assert_eq!(map[&loc][&key.key_id].key(), Some(&key));
    }
}
