//! Live-Raum: Gruppen-Rekeying ueber den Side-Channel
//!
//! ## Schluessel anfragen
//! Ein neues Mitglied sendet eine signierte `key_request` und wartet bis
//! zur Anfrage-TTL. Die erste gueltige und verifizierte Antwort wird
//! installiert, danach ist der Raum `Active`. Ohne Antwort zurueck nach `Idle`.
//!
//! ## Neuer Schluessel
//! Der Initiator schlaegt eine neue Generation vor (ein Eintrag pro
//! verbundenem Mitglied) und sammelt Bestaetigungen bis alle da sind oder
//! die Ack-TTL ablaeuft. Danach wird der Frame-Schluessel atomar getauscht.
//! Mitglieder ohne Bestaetigung werden protokolliert und im Ereignis gemeldet.
//!
//! ## Authentizitaet
//! Anfragen und Bestaetigungen sind vom Absender signiert. Vorgeschlagene
//! und beantwortete Schluessel werden nur installiert, wenn das signierte
//! Schluessel-Paket vom angegebenen Initiator bzw. Antwortenden stammt.
//!
//! Ausgeloest durch Mitgliederaenderung oder Ablauf der Schluessel-TTL.
//! Initiator ist das Mitglied mit der kleinsten UserId.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tresor_core::config::LiveEinstellungen;
use tresor_core::types::{KeyId, KeyLocation, UserId};
use tresor_core::EngineEvent;
use tresor_crypto::{ContentKey, Identity, PublicIdentity};
use tresor_protocol::live::{ack_signing_bytes, request_signing_bytes};
use tresor_protocol::{LiveKeyMessage, Member, WrappedKeyEntry};

use super::ring::FrameKeyRing;
use super::signaling::LiveSignaling;
use super::state::LiveState;
use crate::error::{EngineError, EngineResult};
use crate::events::EventBus;
use crate::integrity::{CreateOptions, IntegrityValidator};
use crate::key_provider::{KeyIdSelector, KeyProvider, KeyResolution, KeyResolutionRequest};

/// Puffer der Antwort- und Ack-Sammler
const SAMMLER_PUFFER: usize = 64;

/// Gemeinsame Abhaengigkeiten aller Raeume einer Session
#[derive(Clone)]
pub struct RaumKontext {
    pub provider: Arc<KeyProvider>,
    pub identity: Arc<Identity>,
    pub validator: Arc<IntegrityValidator>,
    pub events: EventBus,
    pub einstellungen: LiveEinstellungen,
    /// Shutdown-Signal der Session
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Ergebnis eines `update_key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub key_id: KeyId,
    /// Inklusive Initiator
    pub bestaetigt: Vec<UserId>,
    /// Verbundene Mitglieder ohne Bestaetigung innerhalb der Ack-TTL
    pub verworfen: Vec<UserId>,
}

type AntwortSammler = DashMap<String, mpsc::Sender<(Member, KeyId, WrappedKeyEntry)>>;
type AckSammler = DashMap<String, mpsc::Sender<(UserId, KeyId)>>;

/// Meldet einen Sammler an und beim Drop wieder ab
struct Anmeldung<'a, T> {
    map: &'a DashMap<String, mpsc::Sender<T>>,
    id: String,
}

impl<'a, T> Anmeldung<'a, T> {
    fn neu(map: &'a DashMap<String, mpsc::Sender<T>>, id: String) -> (Self, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(SAMMLER_PUFFER);
        map.insert(id.clone(), tx);
        (Self { map, id }, rx)
    }
}

impl<T> Drop for Anmeldung<'_, T> {
    fn drop(&mut self) {
        self.map.remove(&self.id);
    }
}

struct RaumInner {
    room: KeyLocation,
    user_id: UserId,
    kontext: RaumKontext,
    signaling: Arc<dyn LiveSignaling>,
    ring: FrameKeyRing,
    zustand: RwLock<LiveState>,
    mitglieder: RwLock<Vec<Member>>,
    antworten: AntwortSammler,
    acks: AckSammler,
    abbruch_tx: watch::Sender<bool>,
    /// Serialisiert Vorschlaege dieses Teilnehmers
    rotation: Mutex<()>,
}

/// Live-Gruppen-Rekeying eines Raums
#[derive(Clone)]
pub struct LiveGroupRekeying {
    inner: Arc<RaumInner>,
}

impl LiveGroupRekeying {
    pub fn neu(room: KeyLocation, signaling: Arc<dyn LiveSignaling>, kontext: RaumKontext) -> Self {
        let (abbruch_tx, _) = watch::channel(false);
        let user_id = kontext.provider.user_id().clone();
        Self {
            inner: Arc::new(RaumInner {
                room,
                user_id,
                kontext,
                signaling,
                ring: FrameKeyRing::neu(),
                zustand: RwLock::new(LiveState::Idle),
                mitglieder: RwLock::new(Vec::new()),
                antworten: DashMap::new(),
                acks: DashMap::new(),
                abbruch_tx,
                rotation: Mutex::new(()),
            }),
        }
    }

    pub fn room(&self) -> &KeyLocation {
        &self.inner.room
    }

    pub fn zustand(&self) -> LiveState {
        *self.inner.zustand.read()
    }

    pub fn aktive_key_id(&self) -> Option<KeyId> {
        self.inner.ring.aktive_key_id()
    }

    pub fn mitglieder(&self) -> Vec<Member> {
        self.inner.mitglieder.read().clone()
    }

    /// Ersetzt die Liste der verbundenen Mitglieder
    pub fn mitglieder_setzen(&self, mitglieder: Vec<Member>) {
        *self.inner.mitglieder.write() = mitglieder;
    }

    /// Initiator ist das Mitglied mit der kleinsten UserId
    pub fn ist_initiator(&self) -> bool {
        self.inner
            .mitglieder
            .read()
            .iter()
            .map(|m| &m.user_id)
            .chain(std::iter::once(&self.inner.user_id))
            .min()
            == Some(&self.inner.user_id)
    }

    // -----------------------------------------------------------------------
    // Schluessel anfragen
    // -----------------------------------------------------------------------

    /// Fragt die verbundenen Mitglieder nach dem aktuellen Schluessel
    ///
    /// `Ok(None)` wenn bis zur Anfrage-TTL keine gueltige Antwort kam.
    pub async fn request_key(&self, mitglieder: Vec<Member>) -> EngineResult<Option<KeyId>> {
        self.mitglieder_setzen(mitglieder);
        let inner = &self.inner;
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp_millis();
        let signature = inner.kontext.identity.sign(&request_signing_bytes(
            &request_id,
            &inner.room,
            &inner.user_id,
            timestamp,
        ));

        let (_anmeldung, mut rx) = Anmeldung::neu(&inner.antworten, request_id.clone());
        self.zustand_setzen(LiveState::RequestSent);
        let anfrage = LiveKeyMessage::KeyRequest {
            request_id: request_id.clone(),
            room: inner.room.clone(),
            requester: inner.user_id.clone(),
            requester_pub_key: inner.kontext.identity.public_identity().to_base58(),
            timestamp,
            signature,
        };
        if let Err(e) = inner.signaling.senden(&anfrage).await {
            self.ruhezustand();
            return Err(e);
        }
        self.zustand_setzen(LiveState::CollectingResponses);

        let frist = Instant::now() + inner.kontext.einstellungen.anfrage_ttl();
        let abbruch = self.abbruch_signal();
        tokio::pin!(abbruch);

        loop {
            tokio::select! {
                Some((responder, key_id, entry)) = rx.recv() => {
                    match self.aufloesen(vec![entry], &key_id, &responder).await {
                        Ok(Some(key)) => {
                            inner.ring.installieren(key)?;
                            self.zustand_setzen(LiveState::Active);
                            tracing::info!(
                                room = %inner.room,
                                key_id = %key_id,
                                responder = %responder.user_id,
                                "Live-Schluessel erhalten"
                            );
                            return Ok(Some(key_id));
                        }
                        Ok(None) => continue,
                        Err(e) => {
                            self.ruhezustand();
                            return Err(e);
                        }
                    }
                }
                _ = tokio::time::sleep_until(frist) => break,
                _ = &mut abbruch => {
                    self.ruhezustand();
                    return Err(EngineError::Abgebrochen);
                }
            }
        }

        tracing::info!(
            room = %inner.room,
            request_id = %request_id,
            "Keine Antwort innerhalb der Anfrage-TTL"
        );
        self.ruhezustand();
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Neuer Schluessel
    // -----------------------------------------------------------------------

    /// Schlaegt eine neue Generation vor und aktiviert sie nach den Bestaetigungen
    pub async fn update_key(&self) -> EngineResult<UpdateOutcome> {
        let inner = &self.inner;
        let _sperre = inner.rotation.lock().await;

        let mut mitglieder = self.mitglieder();
        if !mitglieder.iter().any(|m| m.user_id == inner.user_id) {
            mitglieder.push(Member::new(
                inner.user_id.clone(),
                inner.kontext.identity.public_identity().to_base58(),
            ));
        }

        let key = inner.kontext.provider.generate_key();
        let key_id = key.key_id.clone();
        let provenienz = inner.kontext.validator.create(
            &inner.room.context_id,
            &inner.room.resource_id,
            CreateOptions::default(),
        );
        let entries =
            inner
                .kontext
                .provider
                .wrap_for_users(&mitglieder, &key, &provenienz, &inner.room, None)?;
        inner.ring.bekannt_machen(key);

        let proposal_id = uuid::Uuid::new_v4().simple().to_string();
        let (_anmeldung, mut rx) = Anmeldung::neu(&inner.acks, proposal_id.clone());
        self.zustand_setzen(LiveState::KeyProposed);
        let vorschlag = LiveKeyMessage::KeyProposal {
            proposal_id: proposal_id.clone(),
            room: inner.room.clone(),
            key_id: key_id.clone(),
            entries,
            initiator: inner.user_id.clone(),
        };
        if let Err(e) = inner.signaling.senden(&vorschlag).await {
            self.ruhezustand();
            return Err(e);
        }
        self.zustand_setzen(LiveState::AwaitingAcks);

        let erwartet: BTreeSet<UserId> = mitglieder
            .iter()
            .map(|m| m.user_id.clone())
            .filter(|u| u != &inner.user_id)
            .collect();
        let mut bestaetigt: BTreeSet<UserId> = BTreeSet::new();

        let frist = Instant::now() + inner.kontext.einstellungen.ack_ttl();
        let abbruch = self.abbruch_signal();
        tokio::pin!(abbruch);

        while !erwartet.is_subset(&bestaetigt) {
            tokio::select! {
                Some((member, ack_key_id)) = rx.recv() => {
                    if ack_key_id == key_id && erwartet.contains(&member) {
                        bestaetigt.insert(member);
                    }
                }
                _ = tokio::time::sleep_until(frist) => {
                    tracing::warn!(
                        room = %inner.room,
                        key_id = %key_id,
                        bestaetigt = bestaetigt.len(),
                        erwartet = erwartet.len(),
                        "Ack-TTL abgelaufen"
                    );
                    break;
                }
                _ = &mut abbruch => {
                    self.ruhezustand();
                    return Err(EngineError::Abgebrochen);
                }
            }
        }

        inner.ring.aktivieren(&key_id)?;
        self.zustand_setzen(LiveState::Active);

        let verworfen: Vec<UserId> = erwartet.difference(&bestaetigt).cloned().collect();
        bestaetigt.insert(inner.user_id.clone());
        let bestaetigt: Vec<UserId> = bestaetigt.into_iter().collect();
        if !verworfen.is_empty() {
            tracing::warn!(
                room = %inner.room,
                key_id = %key_id,
                verworfen = ?verworfen,
                "Mitglieder ohne Bestaetigung"
            );
        }
        tracing::info!(
            room = %inner.room,
            key_id = %key_id,
            bestaetigt = bestaetigt.len(),
            "Live-Schluessel aktiv"
        );

        inner.kontext.events.senden(EngineEvent::LiveSchluesselAktiv {
            location: inner.room.clone(),
            key_id: key_id.clone(),
            bestaetigt: bestaetigt.clone(),
            verworfen: verworfen.clone(),
        });
        Ok(UpdateOutcome {
            key_id,
            bestaetigt,
            verworfen,
        })
    }

    /// Neue Mitgliederliste; der Initiator rotiert den Schluessel
    pub async fn membership_changed(
        &self,
        mitglieder: Vec<Member>,
    ) -> EngineResult<Option<UpdateOutcome>> {
        self.mitglieder_setzen(mitglieder);
        if !self.ist_initiator() {
            return Ok(None);
        }
        self.update_key().await.map(Some)
    }

    /// Verwirft eine fruehere Generation bei allen Teilnehmern
    pub async fn retire_key(&self, key_id: &KeyId) -> EngineResult<()> {
        let inner = &self.inner;
        inner.ring.zurueckziehen(key_id)?;
        inner
            .signaling
            .senden(&LiveKeyMessage::KeyRetire {
                room: inner.room.clone(),
                key_id: key_id.clone(),
                initiator: inner.user_id.clone(),
            })
            .await?;
        inner.kontext.events.senden(EngineEvent::LiveSchluesselZurueckgezogen {
            location: inner.room.clone(),
            key_id: key_id.clone(),
        });
        Ok(())
    }

    /// Startet die zeitgesteuerte Rotation (nur wenn eine Schluessel-TTL gesetzt ist)
    pub fn ttl_rotation_starten(&self) -> Option<JoinHandle<()>> {
        let ttl = self.inner.kontext.einstellungen.schluessel_ttl()?;
        let raum = self.clone();
        let abbruch = self.abbruch_signal();

        Some(tokio::spawn(async move {
            tokio::pin!(abbruch);
            let mut intervall = tokio::time::interval_at(Instant::now() + ttl, ttl);
            loop {
                tokio::select! {
                    _ = intervall.tick() => {
                        if raum.ist_initiator() && raum.aktive_key_id().is_some() {
                            tracing::debug!(room = %raum.room(), "Schluessel-TTL abgelaufen");
                            if let Err(e) = raum.update_key().await {
                                tracing::warn!(
                                    room = %raum.room(),
                                    fehler = %e,
                                    "TTL-Rotation fehlgeschlagen"
                                );
                            }
                        }
                    }
                    _ = &mut abbruch => break,
                }
            }
            tracing::debug!(room = %raum.room(), "TTL-Rotation beendet");
        }))
    }

    // -----------------------------------------------------------------------
    // Eingehende Nachrichten
    // -----------------------------------------------------------------------

    /// Verarbeitet eine Nachricht vom Side-Channel
    ///
    /// Nachrichten fuer andere Raeume, eigene Nachrichten und Nachrichten von
    /// Nicht-Mitgliedern werden ignoriert.
    pub async fn handle_message(&self, nachricht: LiveKeyMessage) -> EngineResult<()> {
        if nachricht.room() != &self.inner.room {
            return Ok(());
        }
        tracing::trace!(room = %self.inner.room, op = nachricht.op(), "Side-Channel-Nachricht");

        match nachricht {
            LiveKeyMessage::KeyRequest {
                request_id,
                requester,
                requester_pub_key,
                timestamp,
                signature,
                ..
            } => {
                self.anfrage_beantworten(
                    request_id,
                    requester,
                    requester_pub_key,
                    timestamp,
                    signature,
                )
                .await
            }
            LiveKeyMessage::KeyResponse {
                request_id,
                key_id,
                entry,
                responder,
                ..
            } => {
                if entry.user_id != self.inner.user_id {
                    return Ok(());
                }
                let Some(responder) = self.mitglied(&responder) else {
                    return Ok(());
                };
                let sammler = self.inner.antworten.get(&request_id).map(|s| s.clone());
                if let Some(tx) = sammler {
                    let _ = tx.try_send((responder, key_id, entry));
                }
                Ok(())
            }
            LiveKeyMessage::KeyProposal {
                proposal_id,
                key_id,
                entries,
                initiator,
                ..
            } => self.vorschlag_annehmen(proposal_id, key_id, entries, initiator).await,
            LiveKeyMessage::KeyAck {
                proposal_id,
                key_id,
                member,
                signature,
                ..
            } => {
                let sammler = self.inner.acks.get(&proposal_id).map(|s| s.clone());
                let Some(tx) = sammler else {
                    return Ok(());
                };
                if !self.ack_ist_echt(&proposal_id, &key_id, &member, &signature) {
                    tracing::warn!(
                        room = %self.inner.room,
                        member = %member,
                        "Bestaetigung nicht authentisch"
                    );
                    return Ok(());
                }
                let _ = tx.try_send((member, key_id));
                Ok(())
            }
            LiveKeyMessage::KeyRetire {
                key_id, initiator, ..
            } => {
                if initiator == self.inner.user_id || self.mitglied(&initiator).is_none() {
                    return Ok(());
                }
                match self.inner.ring.zurueckziehen(&key_id) {
                    Ok(()) => {
                        self.inner
                            .kontext
                            .events
                            .senden(EngineEvent::LiveSchluesselZurueckgezogen {
                                location: self.inner.room.clone(),
                                key_id,
                            });
                    }
                    Err(e) => {
                        tracing::warn!(
                            room = %self.inner.room,
                            fehler = %e,
                            "Zurueckziehen abgelehnt"
                        );
                    }
                }
                Ok(())
            }
        }
    }

    async fn anfrage_beantworten(
        &self,
        request_id: String,
        requester: UserId,
        requester_pub_key: String,
        timestamp: i64,
        signature: Vec<u8>,
    ) -> EngineResult<()> {
        let inner = &self.inner;
        if requester == inner.user_id {
            return Ok(());
        }
        let Some(member) = self.mitglied(&requester) else {
            tracing::debug!(
                room = %inner.room,
                requester = %requester,
                "Anfrage von Nicht-Mitglied"
            );
            return Ok(());
        };
        if member.public_key != requester_pub_key {
            tracing::warn!(
                room = %inner.room,
                requester = %requester,
                "Anfrage mit fremdem Schluessel"
            );
            return Ok(());
        }
        let signiert = request_signing_bytes(&request_id, &inner.room, &requester, timestamp);
        let gueltig = PublicIdentity::from_base58(&requester_pub_key)
            .map(|pk| pk.verify(&signiert, &signature))
            .unwrap_or(false);
        if !gueltig {
            tracing::warn!(
                room = %inner.room,
                requester = %requester,
                "Anfrage-Signatur ungueltig"
            );
            return Ok(());
        }
        let Some(key) = inner.ring.aktiv() else {
            return Ok(());
        };

        let provenienz = inner.kontext.validator.create(
            &inner.room.context_id,
            &inner.room.resource_id,
            CreateOptions::default(),
        );
        let Some(entry) = inner
            .kontext
            .provider
            .wrap_for_users(&[member], &key, &provenienz, &inner.room, None)?
            .into_iter()
            .next()
        else {
            return Ok(());
        };

        inner
            .signaling
            .senden(&LiveKeyMessage::KeyResponse {
                request_id,
                room: inner.room.clone(),
                key_id: key.key_id.clone(),
                entry,
                responder: inner.user_id.clone(),
            })
            .await
    }

    async fn vorschlag_annehmen(
        &self,
        proposal_id: String,
        key_id: KeyId,
        entries: Vec<WrappedKeyEntry>,
        initiator: UserId,
    ) -> EngineResult<()> {
        let inner = &self.inner;
        if initiator == inner.user_id {
            return Ok(());
        }
        let Some(von) = self.mitglied(&initiator) else {
            tracing::warn!(
                room = %inner.room,
                initiator = %initiator,
                "Vorschlag von Nicht-Mitglied"
            );
            return Ok(());
        };
        let Some(key) = self.aufloesen(entries, &key_id, &von).await? else {
            return Ok(());
        };
        inner.ring.installieren(key)?;
        self.zustand_setzen(LiveState::Active);
        tracing::debug!(
            room = %inner.room,
            key_id = %key_id,
            initiator = %initiator,
            "Vorgeschlagener Schluessel installiert"
        );

        let signature = inner.kontext.identity.sign(&ack_signing_bytes(
            &proposal_id,
            &inner.room,
            &key_id,
            &inner.user_id,
        ));
        inner
            .signaling
            .senden(&LiveKeyMessage::KeyAck {
                proposal_id,
                room: inner.room.clone(),
                key_id,
                member: inner.user_id.clone(),
                signature,
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Frames
    // -----------------------------------------------------------------------

    pub fn encrypt_frame(&self, plaintext: &[u8], seq: u32) -> EngineResult<Vec<u8>> {
        self.inner.ring.verschluesseln(plaintext, seq)
    }

    /// Auch fruehere, noch nicht zurueckgezogene Generationen
    pub fn decrypt_frame(&self, data: &[u8]) -> EngineResult<Vec<u8>> {
        self.inner.ring.entschluesseln(data)
    }

    // -----------------------------------------------------------------------
    // Lebenszyklus
    // -----------------------------------------------------------------------

    /// Bricht alle wartenden Ablaeufe und die TTL-Rotation dieses Raums ab
    pub fn cancel(&self) {
        self.inner.abbruch_tx.send_replace(true);
        self.zustand_setzen(LiveState::Idle);
        tracing::debug!(room = %self.inner.room, "Live-Raum abgebrochen");
    }

    // -----------------------------------------------------------------------
    // intern
    // -----------------------------------------------------------------------

    fn mitglied(&self, user_id: &UserId) -> Option<Member> {
        self.inner
            .mitglieder
            .read()
            .iter()
            .find(|m| &m.user_id == user_id)
            .cloned()
    }

    fn zustand_setzen(&self, neu: LiveState) {
        let alt = std::mem::replace(&mut *self.inner.zustand.write(), neu);
        if alt != neu {
            tracing::debug!(room = %self.inner.room, von = %alt, nach = %neu, "Zustandswechsel");
        }
    }

    /// `Active` wenn ein Schluessel installiert ist, sonst `Idle`
    fn ruhezustand(&self) {
        let zustand = if self.inner.ring.aktive_key_id().is_some() {
            LiveState::Active
        } else {
            LiveState::Idle
        };
        self.zustand_setzen(zustand);
    }

    /// Signatur eines `key_ack` gegen den Schluessel des Mitglieds
    fn ack_ist_echt(
        &self,
        proposal_id: &str,
        key_id: &KeyId,
        member: &UserId,
        signature: &[u8],
    ) -> bool {
        let Some(eintrag) = self.mitglied(member) else {
            return false;
        };
        let signiert = ack_signing_bytes(proposal_id, &self.inner.room, key_id, member);
        PublicIdentity::from_base58(&eintrag.public_key)
            .map(|pk| pk.verify(&signiert, signature))
            .unwrap_or(false)
    }

    /// Loest einen Eintrag auf; das Paket muss von `von` stammen und der
    /// Verifier muss den Ersteller akzeptieren
    async fn aufloesen(
        &self,
        entries: Vec<WrappedKeyEntry>,
        key_id: &KeyId,
        von: &Member,
    ) -> EngineResult<Option<ContentKey>> {
        let room = &self.inner.room;
        let mut ergebnis = self
            .inner
            .kontext
            .provider
            .resolve_and_verify(vec![KeyResolutionRequest {
                entries,
                key_ids: KeyIdSelector::One(key_id.clone()),
                location: room.clone(),
                expected_secret: None,
                expected_creator: Some(von.clone()),
            }])
            .await?;

        match ergebnis.remove(room).and_then(|mut m| m.remove(key_id)) {
            Some(KeyResolution::Resolved(key)) => Ok(Some(key)),
            Some(KeyResolution::Failed(status)) => {
                tracing::warn!(
                    room = %room,
                    key_id = %key_id,
                    status = %status,
                    von = %von.user_id,
                    "Live-Schluessel verworfen"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Endet bei Abbruch des Raums oder Shutdown der Session
    fn abbruch_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut raum = self.inner.abbruch_tx.subscribe();
        let mut session = self.inner.kontext.shutdown_rx.clone();
        async move {
            loop {
                if *raum.borrow() || *session.borrow() {
                    return;
                }
                tokio::select! {
                    r = raum.changed() => if r.is_err() { return },
                    r = session.changed() => if r.is_err() { return },
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
