//! Engine-Session
//!
//! Haelt alle Komponenten einer angemeldeten Sitzung zusammen. Es gibt keinen
//! globalen Zustand: die Session wird beim Start erzeugt und mit `shutdown()`
//! beendet, was auch alle Live-Raeume abbricht.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use tresor_core::types::{KeyLocation, ResourceId, UserId};
use tresor_core::{EngineConfig, EngineEvent};
use tresor_crypto::{
    open_payload, seal_payload, ContainerSecret, ContentKey, CryptoError, EncryptedPayload,
    Identity, KeySchema, OpenedPayload,
};
use tresor_protocol::{
    ContainerKeySet, Member, RelayIdentity, ServerEnvelope, StatusCode, WireError,
    METHODE_SCHLUESSEL_ABRUFEN,
};

use crate::error::{EngineError, EngineResult};
use crate::events::EventBus;
use crate::gateway::{retry_once_on_stale_key, RelayGateway};
use crate::integrity::{CreateOptions, IntegrityValidator};
use crate::key_cache::{ContainerKeys, KeyCache};
use crate::key_provider::{KeyIdSelector, KeyProvider, KeyResolution, KeyResolutionRequest};
use crate::live::{LiveGroupRekeying, LiveSignaling, RaumKontext};
use crate::rekey::{MembershipChange, RekeyPlan, RekeyProtocol};
use crate::verifier::{UserVerifier, VerifierHandle};

struct SessionInner {
    user_id: UserId,
    identity: Arc<Identity>,
    config: EngineConfig,
    provider: Arc<KeyProvider>,
    validator: Arc<IntegrityValidator>,
    verifier: VerifierHandle,
    gateway: Arc<dyn RelayGateway>,
    cache: Arc<KeyCache>,
    rekey: RekeyProtocol,
    events: EventBus,
    shutdown_tx: watch::Sender<bool>,
    raeume: DashMap<KeyLocation, LiveGroupRekeying>,
    /// Bestaetigte Container-Secrets; gelten fuer jedes spaetere Neuladen
    secrets: DashMap<KeyLocation, ContainerSecret>,
}

/// Sitzungs-Kontext der Engine
#[derive(Clone)]
pub struct EngineSession {
    inner: Arc<SessionInner>,
}

impl EngineSession {
    pub fn neu(
        config: EngineConfig,
        user_id: UserId,
        identity: Identity,
        relay: RelayIdentity,
        gateway: Arc<dyn RelayGateway>,
    ) -> EngineResult<Self> {
        config.validieren()?;
        let schema = KeySchema::from_version(config.schluessel.aktuelles_schema)
            .map_err(|_| EngineError::UnbekanntesSchema(config.schluessel.aktuelles_schema))?;

        let identity = Arc::new(identity);
        let pub_key = identity.public_identity().to_base58();
        let verifier = VerifierHandle::default();
        let provider = Arc::new(KeyProvider::new(
            user_id.clone(),
            Arc::clone(&identity),
            verifier.clone(),
            schema,
        ));
        let validator = Arc::new(IntegrityValidator::new(
            user_id.clone(),
            pub_key,
            relay,
            config.zeitabweichung_ms(),
        ));
        let cache = Arc::new(KeyCache::neu());
        let events = EventBus::neu();
        let rekey = RekeyProtocol::new(
            Arc::clone(&provider),
            Arc::clone(&validator),
            Arc::clone(&gateway),
            Arc::clone(&cache),
            events.clone(),
        );
        let (shutdown_tx, _) = watch::channel(false);

        tracing::info!(user = %user_id, schema = schema.version(), "Engine-Session gestartet");

        Ok(Self {
            inner: Arc::new(SessionInner {
                user_id,
                identity,
                config,
                provider,
                validator,
                verifier,
                gateway,
                cache,
                rekey,
                events,
                shutdown_tx,
                raeume: DashMap::new(),
                secrets: DashMap::new(),
            }),
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.inner.user_id
    }

    /// Eigener Eintrag fuer Mitgliederlisten
    pub fn member(&self) -> Member {
        Member::new(
            self.inner.user_id.clone(),
            self.inner.identity.public_identity().to_base58(),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn validator(&self) -> &IntegrityValidator {
        &self.inner.validator
    }

    pub fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.abonnieren()
    }

    /// Aktueller Schluessel-Snapshot eines Containers
    pub fn keys(&self, location: &KeyLocation) -> Option<Arc<ContainerKeys>> {
        self.inner.cache.snapshot(location)
    }

    /// Tauscht den Authentizitaets-Pruefer aus; gilt ab der naechsten Verifikation
    pub fn set_user_verifier(&self, verifier: Arc<dyn UserVerifier>) {
        self.inner.verifier.set(verifier);
    }

    pub fn set_relay_identity(&self, relay: RelayIdentity) {
        self.inner.validator.set_relay_identity(relay);
    }

    // -----------------------------------------------------------------------
    // Container-Schluessel
    // -----------------------------------------------------------------------

    /// Legt Schluessel und Secret eines neuen Containers an
    ///
    /// Der Relay sieht das Secret nie. Die Session merkt es sich und prueft
    /// jeden spaeter geladenen Schluessel-Satz dagegen.
    pub async fn create_container(
        &self,
        location: &KeyLocation,
        members: &[Member],
    ) -> EngineResult<ContainerSecret> {
        let secret = self.inner.provider.generate_secret();
        self.inner
            .rekey
            .create_container_keys(location, members, &secret)
            .await?;
        self.inner.secrets.insert(location.clone(), secret.clone());
        Ok(secret)
    }

    /// Laedt den Schluessel-Satz vom Relay, loest alle eigenen Generationen
    /// auf und ersetzt den Cache-Eintrag
    ///
    /// Die aktive Generation muss aufloesbar sein; aeltere Generationen ohne
    /// eigenen Eintrag sind erlaubt (Hinzufuegen ohne Backfill). Ohne
    /// `expected_secret` gilt das zuletzt bestaetigte Secret der Location;
    /// passt der Satz nicht dazu, schlaegt das Laden mit `SecretMismatch` fehl.
    pub async fn refresh_keys(
        &self,
        location: &KeyLocation,
        expected_secret: Option<ContainerSecret>,
    ) -> EngineResult<Arc<ContainerKeys>> {
        let inner = &self.inner;
        let anfrage = serde_json::to_value(location).map_err(WireError::from)?;
        let antwort = inner
            .gateway
            .request(METHODE_SCHLUESSEL_ABRUFEN, anfrage)
            .await?;
        let set = ContainerKeySet::from_json(antwort)?;
        let expected_secret =
            expected_secret.or_else(|| inner.secrets.get(location).map(|s| s.clone()));

        let mut ergebnis = inner
            .provider
            .resolve_and_verify(vec![KeyResolutionRequest {
                entries: set.keys.clone(),
                key_ids: KeyIdSelector::Many(set.generationen()),
                location: location.clone(),
                expected_secret: expected_secret.clone(),
                expected_creator: None,
            }])
            .await?;
        let aufgeloest: HashMap<_, _> = ergebnis.remove(location).unwrap_or_default();

        match aufgeloest.get(&set.key_id) {
            Some(KeyResolution::Resolved(_)) => {}
            Some(KeyResolution::Failed(status)) => {
                return Err(EngineError::Aufloesung {
                    location: location.clone(),
                    key_id: set.key_id,
                    status: *status,
                });
            }
            None => {
                return Err(EngineError::Aufloesung {
                    location: location.clone(),
                    key_id: set.key_id,
                    status: StatusCode::KeyEntryMissing,
                });
            }
        }

        let keys: Vec<ContentKey> = aufgeloest
            .into_values()
            .filter_map(|r| match r {
                KeyResolution::Resolved(key) => Some(key),
                KeyResolution::Failed(status) => {
                    tracing::debug!(
                        location = %location,
                        status = %status,
                        "Aeltere Generation nicht lesbar"
                    );
                    None
                }
            })
            .collect();

        tracing::debug!(
            location = %location,
            key_id = %set.key_id,
            generationen = keys.len(),
            "Schluessel-Satz geladen"
        );
        if let Some(secret) = expected_secret {
            inner.secrets.insert(location.clone(), secret);
        }
        Ok(inner
            .cache
            .einsetzen(location.clone(), ContainerKeys::new(set.key_id, set.keys, keys)))
    }

    /// Vergisst Schluessel, Secret und Cache-Zustand eines Containers
    /// (z.B. nach dem Austritt)
    pub fn forget_container(&self, location: &KeyLocation) {
        self.inner.cache.entfernen(location);
        self.inner.secrets.remove(location);
        tracing::debug!(location = %location, "Container vergessen");
    }

    /// Mitgliederaenderung mit Rotation oder Ergaenzung
    pub async fn update_membership(&self, change: MembershipChange) -> EngineResult<RekeyPlan> {
        if self.inner.cache.snapshot(&change.location).is_none() {
            self.refresh_keys(&change.location, None).await?;
        }
        let location = change.location.clone();
        let secret = change.secret.clone();
        let plan = self.inner.rekey.update_membership(change).await?;
        self.inner.secrets.insert(location, secret);
        Ok(plan)
    }

    // -----------------------------------------------------------------------
    // Payloads
    // -----------------------------------------------------------------------

    /// Signiert und verschluesselt `data` mit dem aktiven Container-Schluessel
    pub async fn encrypt(
        &self,
        location: &KeyLocation,
        resource_id: &ResourceId,
        data: &[u8],
    ) -> EngineResult<Vec<u8>> {
        let keys = match self.inner.cache.snapshot(location) {
            Some(keys) => keys,
            None => self.refresh_keys(location, None).await?,
        };
        let key = keys
            .aktiv()
            .ok_or_else(|| EngineError::KeinSchluessel(location.clone()))?;
        let provenienz = self.inner.validator.create(
            &location.context_id,
            resource_id,
            CreateOptions {
                parent_container_id: Some(location.context_id.to_string()),
                parent_resource_id: Some(location.resource_id.to_string()),
                creator: None,
            },
        );
        Ok(seal_payload(data, &provenienz, &self.inner.identity, key)?)
    }

    /// Oeffnet einen Payload, prueft Signatur, Ersteller und optional die
    /// Bindung an den Server-Umschlag
    ///
    /// Eine unbekannte KeyId fuehrt zu genau einem Neuladen des Schluessel-Satzes.
    pub async fn decrypt(
        &self,
        location: &KeyLocation,
        bytes: &[u8],
        envelope: Option<&ServerEnvelope>,
    ) -> EngineResult<OpenedPayload> {
        let inner = &self.inner;
        let key_id = EncryptedPayload::from_bytes(bytes)
            .and_then(|p| p.key_id())
            .ok_or_else(|| CryptoError::UngueltigeDaten("Ungueltige Payload-Struktur".into()))?;
        if inner.cache.ist_zurueckgezogen(location, &key_id) {
            return Err(EngineError::SchluesselZurueckgezogen(key_id));
        }

        let bekannt = inner
            .cache
            .snapshot(location)
            .filter(|keys| keys.schluessel(&key_id).is_some());
        let keys = match bekannt {
            Some(keys) => keys,
            None => self.refresh_keys(location, None).await?,
        };
        let key = keys
            .schluessel(&key_id)
            .ok_or_else(|| EngineError::UnbekannteKeyId(key_id.clone()))?;

        let geoeffnet = open_payload(bytes, key)?;
        let akzeptiert = inner
            .verifier
            .verify(&[geoeffnet.provenance.verification_request()])
            .await?;
        if akzeptiert.first() != Some(&true) {
            return Err(EngineError::VerifikationAbgelehnt(
                geoeffnet.provenance.creator_user_id,
            ));
        }
        if let Some(envelope) = envelope {
            inner.validator.assert_binding(&geoeffnet.provenance, envelope)?;
        }
        Ok(geoeffnet)
    }

    /// Verschluesselt und sendet einen Payload; nach einer veralteten KeyId
    /// wird genau einmal neu geladen und wiederholt
    pub async fn submit(
        &self,
        method: &str,
        location: &KeyLocation,
        resource_id: &ResourceId,
        data: &[u8],
    ) -> EngineResult<serde_json::Value> {
        let session = self;
        retry_once_on_stale_key(
            move || async move {
                let payload = session.encrypt(location, resource_id, data).await?;
                let anfrage = serde_json::json!({
                    "location": location,
                    "resourceId": resource_id,
                    "payload": tresor_protocol::b64::encode(&payload),
                });
                session
                    .inner
                    .gateway
                    .request(method, anfrage)
                    .await
                    .map_err(EngineError::from)
            },
            move || async move { session.refresh_keys(location, None).await.map(|_| ()) },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Live-Raeume
    // -----------------------------------------------------------------------

    /// Live-Raum zu `location`; wird beim ersten Aufruf angelegt
    pub fn live_room(
        &self,
        location: &KeyLocation,
        signaling: Arc<dyn LiveSignaling>,
    ) -> LiveGroupRekeying {
        let inner = &self.inner;
        inner
            .raeume
            .entry(location.clone())
            .or_insert_with(|| {
                let raum = LiveGroupRekeying::neu(
                    location.clone(),
                    signaling,
                    RaumKontext {
                        provider: Arc::clone(&inner.provider),
                        identity: Arc::clone(&inner.identity),
                        validator: Arc::clone(&inner.validator),
                        events: inner.events.clone(),
                        einstellungen: inner.config.live.clone(),
                        shutdown_rx: inner.shutdown_tx.subscribe(),
                    },
                );
                raum.ttl_rotation_starten();
                tracing::debug!(room = %location, "Live-Raum angelegt");
                raum
            })
            .clone()
    }

    /// Bricht einen Live-Raum ab und entfernt ihn
    pub fn leave_live_room(&self, location: &KeyLocation) {
        if let Some((_, raum)) = self.inner.raeume.remove(location) {
            raum.cancel();
        }
    }

    /// Beendet die Session: alle Live-Raeume werden abgebrochen
    pub fn shutdown(&self) {
        let inner = &self.inner;
        inner.shutdown_tx.send_replace(true);
        let raeume: Vec<LiveGroupRekeying> =
            inner.raeume.iter().map(|r| r.value().clone()).collect();
        inner.raeume.clear();
        for raum in &raeume {
            raum.cancel();
        }
        inner.events.senden(EngineEvent::SessionBeendet);
        tracing::info!(user = %inner.user_id, raeume = raeume.len(), "Engine-Session beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
