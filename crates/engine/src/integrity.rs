//! Integrity Validator
//!
//! Erstellt und prueft Provenienz-Datensaetze. Zustandslos bis auf die
//! austauschbare "aktuell bekannte" Relay-Identitaet.

use std::collections::{BTreeSet, HashSet};

use parking_lot::RwLock;
use tresor_core::types::{ContextId, ResourceId, UserId};
use tresor_protocol::{ProvenanceRecord, RelayIdentity, ServerEnvelope, StatusCode};

use crate::error::{EngineError, EngineResult};

/// Abweichender Ersteller (z.B. beim Import im Namen eines anderen Mitglieds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorOverride {
    pub user_id: UserId,
    pub pub_key: String,
}

/// Optionale Angaben zu `create`
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub parent_container_id: Option<String>,
    pub parent_resource_id: Option<String>,
    pub creator: Option<CreatorOverride>,
}

pub struct IntegrityValidator {
    user_id: UserId,
    pub_key: String,
    relay: RwLock<RelayIdentity>,
    zeitabweichung_ms: i64,
}

impl IntegrityValidator {
    pub fn new(
        user_id: UserId,
        pub_key: String,
        relay: RelayIdentity,
        zeitabweichung_ms: i64,
    ) -> Self {
        Self {
            user_id,
            pub_key,
            relay: RwLock::new(relay),
            zeitabweichung_ms,
        }
    }

    pub fn relay_identity(&self) -> RelayIdentity {
        self.relay.read().clone()
    }

    /// Ersetzt die aktuell bekannte Relay-Identitaet (z.B. nach Reconnect)
    pub fn set_relay_identity(&self, relay: RelayIdentity) {
        tracing::info!(url = %relay.url, "Relay-Identitaet aktualisiert");
        *self.relay.write() = relay;
    }

    /// Stempelt Zeit, Zufalls-ID, Ersteller und aktuelle Relay-Identitaet
    pub fn create(
        &self,
        context_id: &ContextId,
        resource_id: &ResourceId,
        options: CreateOptions,
    ) -> ProvenanceRecord {
        let (creator_user_id, creator_pub_key) = match options.creator {
            Some(o) => (o.user_id, o.pub_key),
            None => (self.user_id.clone(), self.pub_key.clone()),
        };
        ProvenanceRecord {
            creator_user_id,
            creator_pub_key,
            context_id: context_id.clone(),
            resource_id: resource_id.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            random_id: uuid::Uuid::new_v4().simple().to_string(),
            container_id: options.parent_container_id,
            container_resource_id: options.parent_resource_id,
            relay_identity: self.relay_identity(),
        }
    }

    /// Prueft einen Datensatz gegen den unverschluesselten Server-Umschlag
    pub fn assert_binding(
        &self,
        record: &ProvenanceRecord,
        envelope: &ServerEnvelope,
    ) -> EngineResult<()> {
        if record.context_id != envelope.context_id {
            return Err(EngineError::BindungVerletzt(format!(
                "contextId {} != {}",
                record.context_id, envelope.context_id
            )));
        }
        if record.resource_id != envelope.resource_id {
            return Err(EngineError::BindungVerletzt(format!(
                "resourceId {} != {}",
                record.resource_id, envelope.resource_id
            )));
        }
        if record.creator_user_id != envelope.last_modifier_id {
            return Err(EngineError::BindungVerletzt(format!(
                "Ersteller {} != letzter Bearbeiter {}",
                record.creator_user_id, envelope.last_modifier_id
            )));
        }
        let abweichung = (record.timestamp - envelope.last_modification_date).abs();
        if abweichung > self.zeitabweichung_ms {
            return Err(EngineError::BindungVerletzt(format!(
                "Zeitabweichung {abweichung} ms > {} ms",
                self.zeitabweichung_ms
            )));
        }
        Ok(())
    }

    /// Indizes aller spaeteren Vorkommen eines `(randomId, timestamp)`-Paars
    pub fn detect_duplicates(records: &[ProvenanceRecord]) -> BTreeSet<usize> {
        let mut gesehen: HashSet<(&str, i64)> = HashSet::with_capacity(records.len());
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| !gesehen.insert((r.random_id.as_str(), r.timestamp)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Prueft eine Seite: pro Element Bindung und Duplikate, nie Abbruch
    pub fn validate_page(
        &self,
        page: &[(ProvenanceRecord, ServerEnvelope)],
    ) -> Vec<Result<(), StatusCode>> {
        let records: Vec<ProvenanceRecord> = page.iter().map(|(r, _)| r.clone()).collect();
        let duplikate = Self::detect_duplicates(&records);

        let ergebnis: Vec<Result<(), StatusCode>> = page
            .iter()
            .enumerate()
            .map(|(i, (record, envelope))| {
                if duplikate.contains(&i) {
                    return Err(StatusCode::Duplicate);
                }
                self.assert_binding(record, envelope)
                    .map_err(|_| StatusCode::BindingMismatch)
            })
            .collect();

        let abgelehnt = ergebnis.iter().filter(|r| r.is_err()).count();
        if abgelehnt > 0 {
            tracing::warn!(abgelehnt, gesamt = page.len(), "Seite enthaelt ungueltige Datensaetze");
        }
        ergebnis
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
