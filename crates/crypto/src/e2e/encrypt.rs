//! Verschluesselung mit einem Content-Key
//!
//! ## Format
//! ```text
//! [nonce(12)] [aad_len(2)] [aad] [ciphertext + auth_tag(16)]
//! ```
//!
//! ## Nonce-Aufbau (Live-Frames)
//! ```text
//! [sequence(4)] [random(8)]
//! ```
//!
//! ## AAD
//! ```text
//! [key_id_len(1)] [key_id]
//! ```

use rand_core::{OsRng, RngCore};

use super::aead;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{ContentKey, EncryptedPayload, Nonce};

/// AAD, die einen Ciphertext an eine Schluessel-Generation bindet
pub(crate) fn key_id_aad(key: &ContentKey) -> CryptoResult<Vec<u8>> {
    let raw = key.key_id.as_str().as_bytes();
    let len = u8::try_from(raw.len())
        .map_err(|_| CryptoError::UngueltigeDaten("KeyId laenger als 255 Bytes".to_string()))?;
    let mut aad = Vec::with_capacity(1 + raw.len());
    aad.push(len);
    aad.extend_from_slice(raw);
    Ok(aad)
}

pub(crate) fn encrypt_with_key(
    plaintext: &[u8],
    key: &ContentKey,
    nonce: Nonce,
) -> CryptoResult<EncryptedPayload> {
    let aad = key_id_aad(key)?;
    let ciphertext = aead::encrypt(
        key.algorithm(),
        key.key.as_bytes(),
        nonce.as_bytes(),
        plaintext,
        &aad,
    )?;
    Ok(EncryptedPayload {
        nonce,
        ciphertext,
        aad,
    })
}

/// Verschluesselt einen Live-Frame mit dem aktiven Raum-Schluessel
///
/// # Parameter
/// - `plaintext`: Rohe Frame-Daten
/// - `key`: Aktiver Content-Key des Raums
/// - `seq`: Frame-Sequenz-Nummer
pub fn encrypt_frame(
    plaintext: &[u8],
    key: &ContentKey,
    seq: u32,
) -> CryptoResult<EncryptedPayload> {
    let mut random_bytes = [0u8; 8];
    OsRng.fill_bytes(&mut random_bytes);
    encrypt_with_key(plaintext, key, Nonce::aus_seq(seq, random_bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
