//! Fehler beim Kodieren und Dekodieren von Draht-Formaten

use thiserror::Error;

pub type WireResult<T> = std::result::Result<T, WireError>;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64-Fehler: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unbekannter Status-Code: {0}")]
    UnbekannterStatusCode(u16),
}
