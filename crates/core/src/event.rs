//! Engine-Ereignisse
//!
//! Ereignisse fliessen ueber einen pro Session erzeugten Event-Bus
//! (siehe `tresor_engine::events::EventBus`). Es gibt keinen globalen
//! Zustand: jede Session besitzt ihren eigenen Bus und schliesst ihn beim
//! Beenden.

use crate::types::{KeyId, KeyLocation, UserId};
use serde::{Deserialize, Serialize};

/// Alle Ereignisse, die die Engine nach aussen meldet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Container-Schluessel wurde rotiert (neue Generation)
    SchluesselRotiert {
        location: KeyLocation,
        key_id: KeyId,
        entfernt: Vec<UserId>,
    },
    /// Fehlende Eintraege fuer neue Mitglieder wurden ergaenzt
    MitgliederErgaenzt {
        location: KeyLocation,
        key_id: KeyId,
        hinzugefuegt: Vec<UserId>,
    },
    /// Live-Raum hat einen neuen aktiven Schluessel
    LiveSchluesselAktiv {
        location: KeyLocation,
        key_id: KeyId,
        bestaetigt: Vec<UserId>,
        verworfen: Vec<UserId>,
    },
    /// Ein Live-Schluessel wurde zurueckgezogen
    LiveSchluesselZurueckgezogen { location: KeyLocation, key_id: KeyId },
    /// Session wurde beendet
    SessionBeendet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextId, ResourceId};

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = EngineEvent::SchluesselRotiert {
            location: KeyLocation::new(ContextId::new("c"), ResourceId::new("r")),
            key_id: KeyId::generate(),
            entfernt: vec![UserId::new("bob")],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"schluessel_rotiert""#));
        let back: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
