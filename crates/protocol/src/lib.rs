//! tresor-protocol – Draht-Formate
//!
//! Dieses Crate definiert alle Strukturen, die zwischen Engine, Relay und
//! anderen Mitgliedern ausgetauscht werden. Alle Formate sind JSON mit
//! camelCase-Feldnamen; Binaerdaten werden als Base64 (Standard-Alphabet)
//! kodiert.

pub mod b64;
pub mod error;
pub mod keys;
pub mod live;
pub mod provenance;
pub mod status;

pub use error::{WireError, WireResult};
pub use keys::{ContainerKeySet, Member, MembershipUpdate, WrappedKeyEntry};
pub use live::LiveKeyMessage;
pub use provenance::{ProvenanceRecord, RelayIdentity, ServerEnvelope, VerificationRequest};
pub use status::StatusCode;

/// RPC-Methode: Schluessel-Satz eines Containers abrufen
pub const METHODE_SCHLUESSEL_ABRUFEN: &str = "container.getKeys";

/// RPC-Methode: atomare Mitglieder- und Schluessel-Aktualisierung
pub const METHODE_MITGLIEDER_AKTUALISIEREN: &str = "container.updateMembership";
