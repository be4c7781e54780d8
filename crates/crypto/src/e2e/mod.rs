//! Ende-zu-Ende Verschluesselung
//!
//! Der Relay sieht nur Ciphertext und eingewickelte Schluessel.
//!
//! ## Ablauf
//! 1. Jeder Benutzer hat eine `Identity` (Ed25519 Langzeit-Key)
//! 2. Content-Keys werden pro Mitglied per X25519 + HKDF + AES-256-GCM eingewickelt
//! 3. Payloads werden signiert und mit dem Content-Key versiegelt
//! 4. Live-Frames werden mit dem aktiven Raum-Schluessel verschluesselt
//! 5. Die KeyId steckt in der AAD jedes Ciphertexts

mod aead;
pub mod decrypt;
pub mod encrypt;
pub mod kdf;
pub mod seal;
pub mod wrap;

pub use decrypt::{decrypt_frame, decrypt_frame_bytes};
pub use encrypt::encrypt_frame;
pub use kdf::hkdf_derive;
pub use seal::{open_payload, seal_payload, OpenedPayload};
pub use wrap::{unwrap_for_recipient, wrap_for_recipient};
