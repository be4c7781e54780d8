//! Gemeinsame Test-Infrastruktur: In-Memory-Relay, Verifier, Side-Channel-Hub
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tresor_core::types::{ContextId, KeyLocation, ResourceId, UserId};
use tresor_core::EngineConfig;
use tresor_crypto::{EncryptedPayload, Identity};
use tresor_engine::{
    EngineError, EngineResult, EngineSession, LiveGroupRekeying, LiveSignaling, RelayError,
    RelayGateway, UserVerifier,
};
use tresor_protocol::{
    ContainerKeySet, LiveKeyMessage, MembershipUpdate, RelayIdentity, VerificationRequest,
    METHODE_MITGLIEDER_AKTUALISIEREN, METHODE_SCHLUESSEL_ABRUFEN,
};

/// RPC-Methode zum Ablegen eines Payloads
pub const METHODE_INHALT_ABLEGEN: &str = "content.put";

pub fn ort(resource: &str) -> KeyLocation {
    KeyLocation::new(ContextId::new("team"), ResourceId::new(resource))
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Relay ohne Transport: speichert Schluessel-Saetze und Payloads
#[derive(Default)]
pub struct InMemoryRelay {
    saetze: Mutex<HashMap<KeyLocation, ContainerKeySet>>,
    payloads: Mutex<Vec<Vec<u8>>>,
    aufrufe: Mutex<Vec<String>>,
}

impl InMemoryRelay {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn satz(&self, location: &KeyLocation) -> Option<ContainerKeySet> {
        self.saetze.lock().get(location).cloned()
    }

    /// Tauscht den Schluessel-Satz aus, wie es ein boeswilliger Relay koennte
    pub fn ersetzen(&self, location: &KeyLocation, satz: ContainerKeySet) {
        self.saetze.lock().insert(location.clone(), satz);
    }

    pub fn aufrufe(&self, methode: &str) -> usize {
        self.aufrufe.lock().iter().filter(|m| *m == methode).count()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().clone()
    }

    fn ablegen(&self, payload: serde_json::Value) -> Result<serde_json::Value, RelayError> {
        let location: KeyLocation = serde_json::from_value(payload["location"].clone())
            .map_err(|e| RelayError::Abgelehnt(e.to_string()))?;
        let bytes = payload["payload"]
            .as_str()
            .and_then(|s| tresor_protocol::b64::decode(s).ok())
            .ok_or_else(|| RelayError::Abgelehnt("payload fehlt".into()))?;
        let key_id = EncryptedPayload::from_bytes(&bytes)
            .and_then(|p| p.key_id())
            .ok_or_else(|| RelayError::Abgelehnt("keine KeyId".into()))?;

        let aktiv = self
            .satz(&location)
            .map(|s| s.key_id)
            .ok_or_else(|| RelayError::Abgelehnt("unbekannter Container".into()))?;
        if aktiv != key_id {
            return Err(RelayError::UngueltigeKeyId(key_id.to_string()));
        }
        self.payloads.lock().push(bytes);
        Ok(serde_json::json!({ "ok": true }))
    }
}

#[async_trait]
impl RelayGateway for InMemoryRelay {
    async fn request(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, RelayError> {
        self.aufrufe.lock().push(method.to_string());
        match method {
            METHODE_SCHLUESSEL_ABRUFEN => {
                let location: KeyLocation = serde_json::from_value(payload)
                    .map_err(|e| RelayError::Abgelehnt(e.to_string()))?;
                let satz = self
                    .satz(&location)
                    .ok_or_else(|| RelayError::Abgelehnt("unbekannter Container".into()))?;
                serde_json::to_value(satz).map_err(|e| RelayError::Transport(e.to_string()))
            }
            METHODE_MITGLIEDER_AKTUALISIEREN => {
                let update: MembershipUpdate = serde_json::from_value(payload)
                    .map_err(|e| RelayError::Abgelehnt(e.to_string()))?;
                self.saetze.lock().insert(
                    update.location,
                    ContainerKeySet {
                        key_id: update.key_id,
                        keys: update.entries,
                    },
                );
                Ok(serde_json::Value::Null)
            }
            METHODE_INHALT_ABLEGEN => self.ablegen(payload),
            andere => Err(RelayError::Abgelehnt(format!("unbekannte Methode {andere}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Lehnt genau einen Absender ab
pub struct AblehnenderVerifier(pub UserId);

#[async_trait]
impl UserVerifier for AblehnenderVerifier {
    async fn verify(&self, requests: &[VerificationRequest]) -> anyhow::Result<Vec<bool>> {
        Ok(requests.iter().map(|r| r.sender_id != self.0).collect())
    }
}

/// Antwortet mit einem Element zu wenig
pub struct KaputterVerifier;

#[async_trait]
impl UserVerifier for KaputterVerifier {
    async fn verify(&self, requests: &[VerificationRequest]) -> anyhow::Result<Vec<bool>> {
        Ok(vec![true; requests.len().saturating_sub(1)])
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub fn session(name: &str, relay: &Arc<InMemoryRelay>) -> EngineSession {
    session_mit_config(name, relay, EngineConfig::default())
}

pub fn session_mit_config(
    name: &str,
    relay: &Arc<InMemoryRelay>,
    config: EngineConfig,
) -> EngineSession {
    // Mehrfacher Aufruf ist erlaubt, nur der erste Subscriber gewinnt
    let _ = tresor_observability::logging_aus_config(&config.logging);
    EngineSession::neu(
        config,
        UserId::new(name),
        Identity::generate(),
        RelayIdentity::new("wss://relay.test"),
        relay.clone(),
    )
    .unwrap()
}

/// Config mit kurzen Live-TTLs
pub fn live_config(anfrage_ms: u64, ack_ms: u64, schluessel_ms: u64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.live.anfrage_ttl_ms = anfrage_ms;
    config.live.ack_ttl_ms = ack_ms;
    config.live.schluessel_ttl_ms = schluessel_ms;
    config
}

// ---------------------------------------------------------------------------
// Side-Channel
// ---------------------------------------------------------------------------

/// Verteilt Nachrichten an alle angemeldeten Teilnehmer ausser dem Absender
#[derive(Default)]
pub struct SideChannelHub {
    teilnehmer: Mutex<Vec<(UserId, mpsc::UnboundedSender<LiveKeyMessage>)>>,
}

impl SideChannelHub {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Meldet einen Teilnehmer an; eingehende Nachrichten gehen an `raum`
    pub fn verbinden(
        self: &Arc<Self>,
        session: &EngineSession,
        location: &KeyLocation,
    ) -> LiveGroupRekeying {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.teilnehmer.lock().push((session.user_id().clone(), tx));

        let raum = session.live_room(
            location,
            Arc::new(HubSignaling {
                absender: session.user_id().clone(),
                hub: Arc::clone(self),
            }),
        );
        let empfaenger = raum.clone();
        tokio::spawn(async move {
            while let Some(nachricht) = rx.recv().await {
                if let Err(e) = empfaenger.handle_message(nachricht).await {
                    tracing::warn!(fehler = %e, "Nachricht nicht verarbeitet");
                }
            }
        });
        raum
    }

    /// Teilnehmer ohne Empfang (Nachrichten an ihn gehen verloren)
    pub fn stumm(
        self: &Arc<Self>,
        session: &EngineSession,
        location: &KeyLocation,
    ) -> LiveGroupRekeying {
        session.live_room(
            location,
            Arc::new(HubSignaling {
                absender: session.user_id().clone(),
                hub: Arc::clone(self),
            }),
        )
    }
}

pub struct HubSignaling {
    absender: UserId,
    hub: Arc<SideChannelHub>,
}

#[async_trait]
impl LiveSignaling for HubSignaling {
    async fn senden(&self, nachricht: &LiveKeyMessage) -> EngineResult<()> {
        for (user, tx) in self.hub.teilnehmer.lock().iter() {
            if user != &self.absender {
                tx.send(nachricht.clone())
                    .map_err(|e| EngineError::SideChannel(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Wartet bis `bedingung` gilt (max. 2 s)
pub async fn warten_bis(mut bedingung: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if bedingung() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    bedingung()
}
