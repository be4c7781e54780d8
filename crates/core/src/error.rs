//! Fehlertypen fuer Tresor
//!
//! Allgemeiner Fehler-Enum fuer Konfiguration und uebergreifende Zustaende.
//! Die Fach-Crates (crypto, engine) definieren eigene Fehler und
//! konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Tresor
pub type Result<T> = std::result::Result<T, TresorError>;

/// Uebergreifende Fehler im Tresor-System
#[derive(Debug, Error)]
pub enum TresorError {
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Ungueltige ID: {0}")]
    UngueltigeId(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl TresorError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}
