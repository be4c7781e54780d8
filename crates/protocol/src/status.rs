//! Status-Codes fuer Batch-Ergebnisse
//!
//! Batch-Pfade schlagen pro Element nie fehl, sondern liefern einen dieser
//! Codes. Der numerische Code ist stabil und darf nicht umnummeriert werden.

use serde::{Deserialize, Serialize};

use crate::error::WireError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// Schema-Version des Eintrags ist unbekannt
    UnknownSchema,
    /// Kein Eintrag fuer den eigenen Benutzer und die angefragte Generation
    KeyEntryMissing,
    /// Entschluesseln des Eintrags fehlgeschlagen
    UnwrapFailed,
    /// Eingebettete Location passt nicht zur angefragten
    LocationMismatch,
    /// Container-Secret-Bindung passt nicht
    SecretMismatch,
    /// Pruefer hat den Ersteller abgelehnt
    VerificationRejected,
    /// Provenienz passt nicht zum Server-Umschlag
    BindingMismatch,
    /// `(randomId, timestamp)` kam auf der Seite bereits vor
    Duplicate,
    /// Signatur des Payloads oder Schluessel-Pakets ungueltig
    InvalidSignature,
    /// Ersteller des Schluessel-Pakets ist nicht der erwartete Absender
    CreatorMismatch,
}

impl StatusCode {
    /// Stabiler numerischer Code
    pub fn code(self) -> u16 {
        match self {
            Self::UnknownSchema => 4001,
            Self::KeyEntryMissing => 4002,
            Self::UnwrapFailed => 4003,
            Self::LocationMismatch => 4004,
            Self::SecretMismatch => 4005,
            Self::VerificationRejected => 4006,
            Self::BindingMismatch => 4007,
            Self::Duplicate => 4008,
            Self::InvalidSignature => 4009,
            Self::CreatorMismatch => 4010,
        }
    }

    /// `true` fuer Codes, die auf Manipulation oder Replay hindeuten
    pub fn ist_manipulation(self) -> bool {
        matches!(
            self,
            Self::SecretMismatch
                | Self::BindingMismatch
                | Self::Duplicate
                | Self::LocationMismatch
                | Self::InvalidSignature
                | Self::CreatorMismatch
        )
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = WireError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Ok(match code {
            4001 => Self::UnknownSchema,
            4002 => Self::KeyEntryMissing,
            4003 => Self::UnwrapFailed,
            4004 => Self::LocationMismatch,
            4005 => Self::SecretMismatch,
            4006 => Self::VerificationRejected,
            4007 => Self::BindingMismatch,
            4008 => Self::Duplicate,
            4009 => Self::InvalidSignature,
            4010 => Self::CreatorMismatch,
            other => return Err(WireError::UnbekannterStatusCode(other)),
        })
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialisierung_screaming_snake_case() {
        let json = serde_json::to_string(&StatusCode::KeyEntryMissing).unwrap();
        assert_eq!(json, r#""KEY_ENTRY_MISSING""#);
    }

    #[test]
    fn numerischer_code_ist_umkehrbar() {
        let code = StatusCode::SecretMismatch.code();
        assert_eq!(StatusCode::try_from(code).unwrap(), StatusCode::SecretMismatch);
        assert!(StatusCode::try_from(1).is_err());
    }

    #[test]
    fn verifikation_ist_keine_manipulation() {
        assert!(!StatusCode::VerificationRejected.ist_manipulation());
        assert!(StatusCode::Duplicate.ist_manipulation());
    }
}
