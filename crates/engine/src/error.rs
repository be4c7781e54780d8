//! Fehlertypen der Engine
//!
//! Batch-Pfade liefern pro Element `StatusCode`s; die Varianten hier sind
//! harte Fehler (Protokollverletzung, Manipulation in Einzelpfaden,
//! Adapter-Ausfall, Transport).

use thiserror::Error;
use tresor_core::types::{KeyId, KeyLocation, UserId};
use tresor_core::TresorError;
use tresor_crypto::CryptoError;
use tresor_protocol::{StatusCode, WireError};

use crate::gateway::RelayError;

/// Result-Alias fuer Engine-Operationen
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Krypto-Fehler: {0}")]
    Krypto(#[from] CryptoError),

    #[error("Draht-Format-Fehler: {0}")]
    Wire(#[from] WireError),

    #[error("Relay-Fehler: {0}")]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Kern(#[from] TresorError),

    /// Einzelpfad: Schluessel konnte nicht aufgeloest werden
    #[error("Schluessel {key_id} fuer {location} nicht aufloesbar: {status}")]
    Aufloesung {
        location: KeyLocation,
        key_id: KeyId,
        status: StatusCode,
    },

    #[error("Unbekannte Schema-Version: {0}")]
    UnbekanntesSchema(u32),

    /// Container-Secret passt nicht: Update wird vor jedem Draht-Aufruf abgebrochen
    #[error("Manipulation erkannt: {0}")]
    Manipulation(String),

    #[error("Provenienz-Bindung verletzt: {0}")]
    BindungVerletzt(String),

    /// Verifier-Implementierung ist fehlgeschlagen (nicht: hat abgelehnt)
    #[error("Verifier-Fehler: {0}")]
    VerifierUnhandled(String),

    /// Verifier hat den Ersteller eines Payloads abgelehnt
    #[error("Ersteller {0} vom Verifier abgelehnt")]
    VerifikationAbgelehnt(UserId),

    #[error("Verifier-Antwort ungueltig: {erwartet} Anfragen, {erhalten} Antworten")]
    MalformedVerifierResponse { erwartet: usize, erhalten: usize },

    #[error("Ungueltiger oeffentlicher Schluessel fuer {user_id}: {grund}")]
    UngueltigerSchluessel { user_id: UserId, grund: String },

    #[error("Kein Schluessel fuer {0}")]
    KeinSchluessel(KeyLocation),

    #[error("Unbekannte KeyId {0}")]
    UnbekannteKeyId(KeyId),

    #[error("Schluessel {0} ist zurueckgezogen")]
    SchluesselZurueckgezogen(KeyId),

    #[error("Aktiver Schluessel {0} kann nicht zurueckgezogen werden")]
    AktiverSchluessel(KeyId),

    #[error("Side-Channel-Fehler: {0}")]
    SideChannel(String),

    #[error("Abgebrochen")]
    Abgebrochen,
}

impl EngineError {
    /// `true` wenn der Relay die verwendete KeyId als veraltet abgelehnt hat
    pub fn ist_veraltete_key_id(&self) -> bool {
        matches!(self, Self::Relay(RelayError::UngueltigeKeyId(_)))
    }

    /// `true` fuer Fehler, die auf Manipulation oder Replay hindeuten
    pub fn ist_manipulation(&self) -> bool {
        match self {
            Self::Manipulation(_) | Self::BindungVerletzt(_) => true,
            Self::Aufloesung { status, .. } => status.ist_manipulation(),
            _ => false,
        }
    }
}
