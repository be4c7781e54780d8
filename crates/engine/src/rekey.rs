//! Re-keying bei Mitgliederaenderungen
//!
//! ## Ablauf
//! 1. `entfernt = alt - neu`, `hinzugefuegt = neu - alt`
//! 2. Rotation noetig wenn `entfernt` nicht leer, `force_new_key`, oder der
//!    aktive Schluessel ein aelteres Schema hat
//! 3. Rotation: neuer Schluessel, eingewickelt fuer die gesamte neue Mitgliedschaft
//! 4. Sonst: fehlende Eintraege fuer neue Mitglieder, nur fuer den aktiven
//!    Schluessel (aeltere Generationen nur mit explizitem Backfill)
//! 5. Ergebnis geht als eine atomare Aktualisierung an den Relay
//!
//! Vor 3/4 muss `verify_secret` bestehen, sonst wird ohne Draht-Aufruf mit
//! einem Manipulationsfehler abgebrochen.

use std::collections::HashSet;
use std::sync::Arc;

use tresor_core::types::{KeyId, KeyLocation, UserId};
use tresor_core::EngineEvent;
use tresor_crypto::{ContainerSecret, ContentKey};
use tresor_protocol::{
    Member, MembershipUpdate, ProvenanceRecord, WireError, WrappedKeyEntry,
    METHODE_MITGLIEDER_AKTUALISIEREN,
};

use crate::error::{EngineError, EngineResult};
use crate::events::EventBus;
use crate::gateway::RelayGateway;
use crate::integrity::{CreateOptions, IntegrityValidator};
use crate::key_cache::{ContainerKeys, KeyCache};
use crate::key_provider::KeyProvider;

/// Eingabe einer Mitgliederaenderung
#[derive(Debug, Clone)]
pub struct MembershipChange {
    pub location: KeyLocation,
    pub alte_mitglieder: Vec<UserId>,
    pub neue_mitglieder: Vec<Member>,
    pub secret: ContainerSecret,
    pub force_new_key: bool,
    /// Neue Mitglieder erhalten auch Eintraege fuer aeltere Generationen
    pub backfill: bool,
}

/// Berechnete Aktualisierung, noch nicht an den Relay gesendet
#[derive(Debug, Clone)]
pub struct RekeyPlan {
    pub location: KeyLocation,
    /// Aktive Generation nach der Aktualisierung
    pub key_id: KeyId,
    /// Vollstaendige Eintragsliste (bestehende plus neue)
    pub entries: Vec<WrappedKeyEntry>,
    pub members: Vec<UserId>,
    pub rotated: bool,
    pub hinzugefuegt: Vec<UserId>,
    pub entfernt: Vec<UserId>,
    pub neue_eintraege: usize,
    neuer_schluessel: Option<ContentKey>,
}

impl RekeyPlan {
    /// Nichts zu senden
    pub fn ist_leer(&self) -> bool {
        !self.rotated && self.neue_eintraege == 0
    }

    fn update(&self) -> MembershipUpdate {
        MembershipUpdate {
            location: self.location.clone(),
            key_id: self.key_id.clone(),
            entries: self.entries.clone(),
            members: self.members.clone(),
            rotated: self.rotated,
        }
    }
}

pub struct RekeyProtocol {
    provider: Arc<KeyProvider>,
    validator: Arc<IntegrityValidator>,
    gateway: Arc<dyn RelayGateway>,
    cache: Arc<KeyCache>,
    events: EventBus,
}

impl RekeyProtocol {
    pub fn new(
        provider: Arc<KeyProvider>,
        validator: Arc<IntegrityValidator>,
        gateway: Arc<dyn RelayGateway>,
        cache: Arc<KeyCache>,
        events: EventBus,
    ) -> Self {
        Self {
            provider,
            validator,
            gateway,
            cache,
            events,
        }
    }

    fn provenienz(&self, location: &KeyLocation) -> ProvenanceRecord {
        self.validator
            .create(&location.context_id, &location.resource_id, CreateOptions::default())
    }

    /// Erste Generation eines neuen Containers
    pub fn plan_initial(
        &self,
        location: &KeyLocation,
        members: &[Member],
        secret: &ContainerSecret,
    ) -> EngineResult<RekeyPlan> {
        let key = self.provider.generate_key();
        let entries = self.provider.wrap_for_users(
            members,
            &key,
            &self.provenienz(location),
            location,
            Some(secret),
        )?;
        Ok(RekeyPlan {
            location: location.clone(),
            key_id: key.key_id.clone(),
            neue_eintraege: entries.len(),
            entries,
            members: members.iter().map(|m| m.user_id.clone()).collect(),
            rotated: true,
            hinzugefuegt: members.iter().map(|m| m.user_id.clone()).collect(),
            entfernt: Vec::new(),
            neuer_schluessel: Some(key),
        })
    }

    /// Berechnet die Aktualisierung gegen den aktuellen Snapshot
    pub fn plan(&self, change: &MembershipChange, keys: &ContainerKeys) -> EngineResult<RekeyPlan> {
        let location = &change.location;
        if !self
            .provider
            .verify_secret(&keys.entries, location, &change.secret)
        {
            return Err(EngineError::Manipulation(format!(
                "Container-Secret fuer {location} passt nicht zum Schluessel-Satz"
            )));
        }
        let aktiv = keys
            .aktiv()
            .ok_or_else(|| EngineError::KeinSchluessel(location.clone()))?;

        let neu: HashSet<&UserId> = change.neue_mitglieder.iter().map(|m| &m.user_id).collect();
        let alt: HashSet<&UserId> = change.alte_mitglieder.iter().collect();
        let mut entfernt: Vec<UserId> = alt.difference(&neu).map(|u| (*u).clone()).collect();
        entfernt.sort();
        let hinzugefuegt_members: Vec<Member> = change
            .neue_mitglieder
            .iter()
            .filter(|m| !alt.contains(&m.user_id))
            .cloned()
            .collect();
        let hinzugefuegt: Vec<UserId> =
            hinzugefuegt_members.iter().map(|m| m.user_id.clone()).collect();

        let rotation = !entfernt.is_empty()
            || change.force_new_key
            || aktiv.schema < self.provider.aktuelles_schema();

        let provenienz = self.provenienz(location);
        let mut entries = keys.entries.clone();
        let (key_id, neue, neuer_schluessel) = if rotation {
            let key = self.provider.generate_key();
            let neue = self.provider.wrap_for_users(
                &change.neue_mitglieder,
                &key,
                &provenienz,
                location,
                Some(&change.secret),
            )?;
            (key.key_id.clone(), neue, Some(key))
        } else {
            let mut neue = self.provider.wrap_missing_for_users(
                &keys.entries,
                &hinzugefuegt_members,
                aktiv,
                &provenienz,
                location,
                Some(&change.secret),
            )?;
            if change.backfill {
                for aelter in keys.aeltere() {
                    neue.extend(self.provider.wrap_missing_for_users(
                        &keys.entries,
                        &hinzugefuegt_members,
                        &aelter,
                        &provenienz,
                        location,
                        Some(&change.secret),
                    )?);
                }
            }
            (aktiv.key_id.clone(), neue, None)
        };

        tracing::info!(
            location = %location,
            rotation,
            entfernt = entfernt.len(),
            hinzugefuegt = hinzugefuegt.len(),
            neue_eintraege = neue.len(),
            "Re-keying geplant"
        );

        let neue_eintraege = neue.len();
        entries.extend(neue);
        Ok(RekeyPlan {
            location: location.clone(),
            key_id,
            entries,
            members: change
                .neue_mitglieder
                .iter()
                .map(|m| m.user_id.clone())
                .collect(),
            rotated: rotation,
            hinzugefuegt,
            entfernt,
            neue_eintraege,
            neuer_schluessel,
        })
    }

    /// Sendet den Plan als eine atomare Aktualisierung und schreibt den Cache fort
    pub async fn commit(
        &self,
        plan: RekeyPlan,
        vorher: Option<&ContainerKeys>,
    ) -> EngineResult<Arc<ContainerKeys>> {
        let payload = serde_json::to_value(plan.update()).map_err(WireError::from)?;
        self.gateway
            .request(METHODE_MITGLIEDER_AKTUALISIEREN, payload)
            .await?;

        let event = if plan.rotated {
            EngineEvent::SchluesselRotiert {
                location: plan.location.clone(),
                key_id: plan.key_id.clone(),
                entfernt: plan.entfernt.clone(),
            }
        } else {
            EngineEvent::MitgliederErgaenzt {
                location: plan.location.clone(),
                key_id: plan.key_id.clone(),
                hinzugefuegt: plan.hinzugefuegt.clone(),
            }
        };

        let RekeyPlan {
            location,
            key_id,
            entries,
            neuer_schluessel,
            ..
        } = plan;
        let naechste = match vorher {
            Some(keys) => keys.fortschreiben(key_id, entries, neuer_schluessel),
            None => ContainerKeys::new(key_id, entries, neuer_schluessel.into_iter().collect()),
        };
        let snapshot = self.cache.einsetzen(location, naechste);
        self.events.senden(event);
        Ok(snapshot)
    }

    /// Plant und sendet eine Mitgliederaenderung unter der Rotations-Sperre
    pub async fn update_membership(&self, change: MembershipChange) -> EngineResult<RekeyPlan> {
        let _sperre = self.cache.rotation_sperren(&change.location).await;
        let keys = self
            .cache
            .snapshot(&change.location)
            .ok_or_else(|| EngineError::KeinSchluessel(change.location.clone()))?;

        let plan = self.plan(&change, &keys)?;
        if plan.ist_leer() {
            tracing::debug!(location = %change.location, "Keine Aenderung noetig");
            return Ok(plan);
        }
        self.commit(plan.clone(), Some(&keys)).await?;
        Ok(plan)
    }

    /// Legt die erste Generation eines Containers an und sendet sie
    pub async fn create_container_keys(
        &self,
        location: &KeyLocation,
        members: &[Member],
        secret: &ContainerSecret,
    ) -> EngineResult<RekeyPlan> {
        let _sperre = self.cache.rotation_sperren(location).await;
        let plan = self.plan_initial(location, members, secret)?;
        self.commit(plan.clone(), None).await?;
        Ok(plan)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
