//! Schluessel-Cache pro Container
//!
//! `KeyLocation -> Arc<ContainerKeys>`. Leser arbeiten mit dem Snapshot, den
//! sie beim Start geholt haben; Schreiber ersetzen den ganzen Snapshot.
//! Rotationen einer Location werden ueber eine eigene async-Sperre
//! serialisiert.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tresor_core::types::{KeyId, KeyLocation};
use tresor_crypto::ContentKey;
use tresor_protocol::WrappedKeyEntry;

/// Aufgeloeste Schluessel eines Containers (eine Epoche)
#[derive(Debug, Clone)]
pub struct ContainerKeys {
    pub active: KeyId,
    pub entries: Vec<WrappedKeyEntry>,
    keys: HashMap<KeyId, ContentKey>,
}

impl ContainerKeys {
    pub fn new(active: KeyId, entries: Vec<WrappedKeyEntry>, keys: Vec<ContentKey>) -> Self {
        Self {
            active,
            entries,
            keys: keys.into_iter().map(|k| (k.key_id.clone(), k)).collect(),
        }
    }

    /// Aktiver Schluessel, falls aufgeloest
    pub fn aktiv(&self) -> Option<&ContentKey> {
        self.keys.get(&self.active)
    }

    pub fn schluessel(&self, key_id: &KeyId) -> Option<&ContentKey> {
        self.keys.get(key_id)
    }

    /// Alle aufgeloesten Generationen ausser der aktiven
    pub fn aeltere(&self) -> Vec<ContentKey> {
        self.keys
            .values()
            .filter(|k| k.key_id != self.active)
            .cloned()
            .collect()
    }

    pub fn anzahl(&self) -> usize {
        self.keys.len()
    }

    /// Naechste Epoche: neue aktive Generation und Eintragsliste, bekannte
    /// Schluessel bleiben erhalten
    pub fn fortschreiben(
        &self,
        active: KeyId,
        entries: Vec<WrappedKeyEntry>,
        neuer_schluessel: Option<ContentKey>,
    ) -> ContainerKeys {
        let mut keys = self.keys.clone();
        if let Some(key) = neuer_schluessel {
            keys.insert(key.key_id.clone(), key);
        }
        ContainerKeys {
            active,
            entries,
            keys,
        }
    }
}

#[derive(Default)]
pub struct KeyCache {
    eintraege: DashMap<KeyLocation, Arc<ContainerKeys>>,
    zurueckgezogen: DashMap<KeyLocation, HashSet<KeyId>>,
    sperren: DashMap<KeyLocation, Arc<Mutex<()>>>,
}

impl KeyCache {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, location: &KeyLocation) -> Option<Arc<ContainerKeys>> {
        self.eintraege.get(location).map(|e| Arc::clone(&*e))
    }

    /// Ersetzt den Snapshot einer Location; zurueckgezogene Schluessel
    /// werden dabei ausgefiltert
    pub fn einsetzen(
        &self,
        location: KeyLocation,
        mut keys: ContainerKeys,
    ) -> Arc<ContainerKeys> {
        if let Some(ids) = self.zurueckgezogen.get(&location) {
            keys.keys.retain(|id, _| !ids.contains(id));
        }
        let keys = Arc::new(keys);
        self.eintraege.insert(location, Arc::clone(&keys));
        keys
    }

    /// Zieht eine Generation zurueck; die aktive bleibt unangetastet
    pub fn zurueckziehen(&self, location: &KeyLocation, key_id: &KeyId) -> bool {
        if let Some(snapshot) = self.snapshot(location) {
            if &snapshot.active == key_id {
                return false;
            }
            let mut neu = (*snapshot).clone();
            neu.keys.remove(key_id);
            self.eintraege.insert(location.clone(), Arc::new(neu));
        }
        self.zurueckgezogen
            .entry(location.clone())
            .or_default()
            .insert(key_id.clone());
        tracing::info!(location = %location, key_id = %key_id, "Schluessel zurueckgezogen");
        true
    }

    pub fn ist_zurueckgezogen(&self, location: &KeyLocation, key_id: &KeyId) -> bool {
        self.zurueckgezogen
            .get(location)
            .is_some_and(|ids| ids.contains(key_id))
    }

    /// Vergisst alles zu einer Location: Snapshot, zurueckgezogene Ids und
    /// die Rotations-Sperre, sofern sie gerade niemand haelt
    pub fn entfernen(&self, location: &KeyLocation) {
        self.eintraege.remove(location);
        self.zurueckgezogen.remove(location);
        self.sperren.remove_if(location, |_, sperre| Arc::strong_count(sperre) == 1);
    }

    /// Exklusive Rotations-Sperre einer Location
    pub async fn rotation_sperren(&self, location: &KeyLocation) -> OwnedMutexGuard<()> {
        let sperre = Arc::clone(
            &*self
                .sperren
                .entry(location.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        sperre.lock_owned().await
    }
}
