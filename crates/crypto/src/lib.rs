//! # tresor-crypto
//!
//! Kryptografische Bausteine der Tresor-Engine.
//!
//! ## Module
//! - `e2e` - Schluessel-Wrapping, Payload-Versiegelung, Frame-Verschluesselung
//! - `identity` - Ed25519 Langzeit-Identitaetsschluessel (plus X25519-Ableitung)
//! - `types` - Gemeinsame Typen (ContentKey, ContainerSecret, SecretBytes, ...)
//! - `error` - Fehlertypen

pub mod e2e;
pub mod error;
pub mod identity;
pub mod types;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult};
pub use identity::{Identity, PublicIdentity};
pub use types::{
    AeadAlgorithm, ContainerSecret, ContentKey, EncryptedPayload, KeySchema, Nonce, SecretBytes,
};

pub use e2e::{
    decrypt_frame, decrypt_frame_bytes, encrypt_frame, hkdf_derive, open_payload, seal_payload,
    unwrap_for_recipient, wrap_for_recipient, OpenedPayload,
};
