//! tresor-core – Gemeinsame Typen, Konfiguration und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Tresor-Crates gemeinsam genutzt werden: Identifikatoren fuer
//! Container und Ressourcen, Schluessel-IDs, Engine-Ereignisse und die
//! Engine-Konfiguration.

pub mod config;
pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use config::EngineConfig;
pub use error::{Result, TresorError};
pub use event::EngineEvent;
pub use types::{ContextId, KeyId, KeyLocation, ResourceId, UserId};
